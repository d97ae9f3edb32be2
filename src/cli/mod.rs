//! Command-line parsing for the RIDF design-storm generator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting and arrangement code. Every flag with a natural environment override
//! reads `RIDF_*`; `app::run` loads a `.env` file before parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    DEFAULT_STORM_HOURS, DurationUnit, Orientation, RunConfig, StormSettings,
};
use crate::fit::{FitOptions, InitialGuess};
use crate::math::LmOptions;
use crate::models::ModelKind;
use crate::storm::Decumulation;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ridf", version, about = "RIDF table to alternating-block design storm")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RIDF_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a design storm from an RIDF CSV (the default command).
    Storm(StormArgs),
    /// Fit one model to every row of an RIDF CSV and print the coefficients.
    Fit(FitArgs),
    /// Fit every registered model and rank them by RMSE.
    Compare(CompareArgs),
    /// Evaluate a saved coefficient file at new coordinates.
    Estimate(EstimateArgs),
    /// List the registered curve models.
    Models,
}

/// Solver options shared by every fitting command.
#[derive(Debug, Args, Clone)]
pub struct FitFlags {
    /// Solver start: `auto` (seeded from each row), `ones`, or a comma list like `10,8,0.5`.
    #[arg(long, env = "RIDF_INITIAL_GUESS", default_value = "auto", value_parser = parse_initial_guess)]
    pub initial_guess: InitialGuess,

    /// Levenberg–Marquardt iteration limit per row.
    #[arg(long, env = "RIDF_MAX_ITERATIONS", default_value_t = LmOptions::default().max_iterations)]
    pub max_iterations: usize,

    /// Stop once an accepted step reduces the SSE by less than this fraction.
    #[arg(long, env = "RIDF_FTOL", default_value_t = LmOptions::default().ftol)]
    pub ftol: f64,

    /// Stop once a step is shorter than this fraction of the parameter norm.
    #[arg(long, env = "RIDF_XTOL", default_value_t = LmOptions::default().xtol)]
    pub xtol: f64,
}

impl FitFlags {
    pub fn options(&self) -> FitOptions {
        FitOptions {
            initial_guess: self.initial_guess.clone(),
            solver: LmOptions {
                max_iterations: self.max_iterations,
                ftol: self.ftol,
                xtol: self.xtol,
            },
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct StormArgs {
    /// RIDF CSV: first column return period, headers durations.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Design storm CSV output (stdout when omitted).
    #[arg(short, long, env = "RIDF_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Curve model used for both fits.
    #[arg(short, long, value_enum, env = "RIDF_MODEL", default_value_t = ModelKind::HoerlModified)]
    pub model: ModelKind,

    /// Unit of the duration headers.
    #[arg(long, value_enum, env = "RIDF_DURATION_UNIT", default_value_t = DurationUnit::Minutes)]
    pub duration_unit: DurationUnit,

    /// Return periods (years) to extrapolate before the duration fit.
    #[arg(
        long = "extra-return-period",
        env = "RIDF_EXTRA_RETURN_PERIODS",
        value_delimiter = ',',
        default_value = "150"
    )]
    pub extra_return_periods: Vec<f64>,

    /// Storm length in hours; curves are evaluated at 1..=N.
    #[arg(long, env = "RIDF_STORM_HOURS", default_value_t = DEFAULT_STORM_HOURS)]
    pub storm_hours: usize,

    /// How increments are derived from the cumulative series.
    #[arg(long, value_enum, env = "RIDF_DECUMULATION", default_value_t = Decumulation::PreviousMinusCurrent)]
    pub decumulation: Decumulation,

    /// Write both fits' coefficients to JSON.
    #[arg(long = "export-coefficients", value_name = "JSON")]
    pub export_coefficients: Option<PathBuf>,

    /// Write a markdown bundle of every intermediate table into DIR.
    #[arg(long = "debug-bundle", value_name = "DIR", env = "RIDF_DEBUG_BUNDLE")]
    pub debug_bundle: Option<PathBuf>,

    /// Do not print the run summary.
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub fit: FitFlags,
}

impl StormArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            settings: StormSettings {
                model: self.model,
                duration_unit: self.duration_unit,
                extra_return_periods: self.extra_return_periods.clone(),
                storm_hours: self.storm_hours,
                decumulation: self.decumulation,
                fit: self.fit.options(),
            },
            export_coefficients: self.export_coefficients.clone(),
            debug_bundle: self.debug_bundle.clone(),
            quiet: self.quiet,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    #[arg(short, long, value_enum, env = "RIDF_MODEL", default_value_t = ModelKind::HoerlModified)]
    pub model: ModelKind,

    #[arg(long, value_enum, env = "RIDF_DURATION_UNIT", default_value_t = DurationUnit::Minutes)]
    pub duration_unit: DurationUnit,

    /// `duration`: one curve per return period; `return-period`: one curve per duration.
    #[arg(long, value_enum, default_value_t = Orientation::Duration)]
    pub orientation: Orientation,

    /// Write the coefficients to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    #[command(flatten)]
    pub fit: FitFlags,
}

#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    #[arg(long, value_enum, env = "RIDF_DURATION_UNIT", default_value_t = DurationUnit::Minutes)]
    pub duration_unit: DurationUnit,

    #[command(flatten)]
    pub fit: FitFlags,
}

#[derive(Debug, Args, Clone)]
pub struct EstimateArgs {
    /// Coefficient JSON from `ridf fit --export` or `ridf storm --export-coefficients`.
    #[arg(long, value_name = "JSON")]
    pub coefficients: PathBuf,

    /// Stage to evaluate (default: the first stage in the file).
    #[arg(long)]
    pub stage: Option<String>,

    /// Coordinates to evaluate at, comma separated, in the stage's x units.
    #[arg(long, value_delimiter = ',', required = true, num_args = 1..)]
    pub at: Vec<f64>,
}

/// Parse `auto`, `ones`, or a comma-separated list of numbers.
pub fn parse_initial_guess(raw: &str) -> Result<InitialGuess, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(InitialGuess::Auto),
        "ones" => Ok(InitialGuess::Ones),
        list => {
            let values = list
                .split(',')
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|x| x.is_finite())
                        .ok_or_else(|| format!("'{}' is not a finite number", v.trim()))
                })
                .collect::<Result<Vec<f64>, String>>()?;
            Ok(InitialGuess::Fixed(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storm_defaults() {
        let cli = Cli::try_parse_from(["ridf", "storm", "table.csv"]).unwrap();
        let Command::Storm(args) = cli.command else {
            panic!("expected storm");
        };
        let config = args.run_config();
        assert_eq!(config.input, PathBuf::from("table.csv"));
        assert!(config.output.is_none());
        assert_eq!(config.settings.model, ModelKind::HoerlModified);
        assert_eq!(config.settings.fit.solver, LmOptions::default());
        assert_eq!(config.settings.extra_return_periods, vec![150.0]);
        assert_eq!(config.settings.storm_hours, 24);
        assert_eq!(config.settings.fit.initial_guess, InitialGuess::Auto);
        assert_eq!(config.settings.decumulation, Decumulation::PreviousMinusCurrent);
    }

    #[test]
    fn storm_flags() {
        let cli = Cli::try_parse_from([
            "ridf",
            "-vv",
            "storm",
            "table.csv",
            "-o",
            "storm.csv",
            "--model",
            "sigmoid",
            "--duration-unit",
            "hours",
            "--extra-return-period",
            "150,200",
            "--decumulation",
            "current-minus-previous",
            "--initial-guess",
            "1,2,0.5",
            "--max-iterations",
            "50",
            "--ftol",
            "1e-10",
            "--xtol",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Storm(args) = cli.command else {
            panic!("expected storm");
        };
        let config = args.run_config();
        assert_eq!(config.settings.model, ModelKind::Sigmoid);
        assert_eq!(config.settings.duration_unit, DurationUnit::Hours);
        assert_eq!(config.settings.extra_return_periods, vec![150.0, 200.0]);
        assert_eq!(config.settings.decumulation, Decumulation::CurrentMinusPrevious);
        assert_eq!(config.settings.fit.initial_guess, InitialGuess::Fixed(vec![1.0, 2.0, 0.5]));
        assert_eq!(config.settings.fit.solver.max_iterations, 50);
        assert_eq!(config.settings.fit.solver.ftol, 1e-10);
        assert_eq!(config.settings.fit.solver.xtol, 0.0);
    }

    #[test]
    fn fit_defaults_to_hoerl_modified() {
        let cli = Cli::try_parse_from(["ridf", "fit", "table.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, ModelKind::HoerlModified);
        assert_eq!(args.orientation, Orientation::Duration);
    }

    #[test]
    fn estimate_requires_points() {
        assert!(Cli::try_parse_from(["ridf", "estimate", "--coefficients", "c.json"]).is_err());
        let cli = Cli::try_parse_from(["ridf", "estimate", "--coefficients", "c.json", "--at", "1,2.5"]).unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.at, vec![1.0, 2.5]);
    }

    #[test]
    fn initial_guess_values() {
        assert_eq!(parse_initial_guess("Auto").unwrap(), InitialGuess::Auto);
        assert_eq!(parse_initial_guess("ones").unwrap(), InitialGuess::Ones);
        assert_eq!(parse_initial_guess(" 1, 2 ").unwrap(), InitialGuess::Fixed(vec![1.0, 2.0]));
        assert!(parse_initial_guess("1,x").is_err());
    }
}
