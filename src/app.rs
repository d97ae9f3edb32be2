//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - runs the pipeline for the chosen subcommand
//! - prints reports and writes optional exports

use std::io::{self, Write};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CompareArgs, EstimateArgs, FitArgs, StormArgs};
use crate::error::AppError;
use crate::io::{CoefficientFile, CoefficientStage};

pub mod pipeline;

const SUBCOMMANDS: [&str; 5] = ["storm", "fit", "compare", "estimate", "models"];

/// Entry point for the `ridf` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Storm(args) => handle_storm(args),
        Command::Fit(args) => handle_fit(args),
        Command::Compare(args) => handle_compare(args),
        Command::Estimate(args) => handle_estimate(args),
        Command::Models => {
            print!("{}", crate::report::format_models());
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("RIDF_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_storm(args: StormArgs) -> Result<(), AppError> {
    let config = args.run_config();
    let run = pipeline::run_storm(&config)?;

    match &config.output {
        Some(path) => {
            crate::io::write_storm_csv(path, &run.storm)?;
            info!(path = %path.display(), "design storm written");
        }
        None => {
            crate::io::write_storm(io::stdout().lock(), &run.storm)
                .map_err(|e| AppError::new(2, format!("Failed to write design storm: {e}")))?;
        }
    }

    // The summary goes to stderr when the storm itself is on stdout.
    if !config.quiet {
        let summary = crate::report::format_storm_summary(&run, &config.settings);
        if config.output.is_some() {
            println!("{summary}");
        } else {
            eprintln!("{summary}");
        }
    }

    if let Some(path) = &config.export_coefficients {
        let file = CoefficientFile::new(vec![
            CoefficientStage::new("return-period", "return_period_yr", &run.return_period_fit),
            CoefficientStage::new("duration", "duration_hr", &run.duration_fit),
        ]);
        crate::io::write_coefficients_json(path, &file)?;
        info!(path = %path.display(), "coefficients written");
    }
    if let Some(dir) = &config.debug_bundle {
        let path = crate::debug::write_debug_bundle(dir, &run, &config.settings)?;
        eprintln!("debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let table = crate::io::read_ridf_csv(&args.input)?;
    let coefficients =
        pipeline::fit_table(&table, args.duration_unit, args.orientation, args.model, &args.fit.options())?;

    let (stage, x_axis) = match args.orientation {
        crate::domain::Orientation::Duration => ("duration", "duration_hr"),
        crate::domain::Orientation::ReturnPeriod => ("return-period", "return_period_yr"),
    };
    println!("{}", crate::report::format_coefficients(stage, &coefficients));

    if let Some(path) = &args.export {
        let file = CoefficientFile::new(vec![CoefficientStage::new(stage, x_axis, &coefficients)]);
        crate::io::write_coefficients_json(path, &file)?;
        info!(path = %path.display(), "coefficients written");
    }
    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let table = crate::io::read_ridf_csv(&args.input)?;
    let hours = pipeline::to_hours(&table, args.duration_unit)?;
    let comparison = crate::fit::compare_models(&hours, &args.fit.options());
    println!("{}", crate::report::format_comparison(&comparison));

    if comparison.best().is_none() {
        return Err(AppError::new(4, "No model could be fit to every row of the table."));
    }
    Ok(())
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let file = crate::io::read_coefficients_json(&args.coefficients)?;
    let stage = file.stage(args.stage.as_deref())?;
    let coefficients = stage.to_table()?;

    let values = crate::estimate::estimate(
        &coefficients,
        &coefficients.row_labels(),
        coefficients.model(),
        args.at.clone(),
    )?;

    let mut out = io::stdout().lock();
    crate::io::write_table(&mut out, &stage.x_axis, &values)
        .map_err(|e| AppError::new(2, format!("Failed to write estimates: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush stdout: {e}")))?;
    Ok(())
}

/// Rewrite argv so `ridf` defaults to `ridf storm`.
///
/// Rules:
/// - `ridf table.csv ...`           -> `ridf storm table.csv ...`
/// - `ridf -v table.csv ...`        -> `ridf storm -v table.csv ...`
/// - `ridf` / `--help` / `--version` -> unchanged (show top-level help/version)
/// - `ridf <subcommand> ...`        -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version || SUBCOMMANDS.contains(&arg1.as_str()) {
        return argv;
    }

    // A leading run of -v flags may precede an explicit subcommand.
    let first_non_verbose = argv
        .iter()
        .skip(1)
        .find(|a| !matches!(a.as_str(), "-v" | "-vv" | "-vvv" | "--verbose"));
    if first_non_verbose.is_some_and(|a| SUBCOMMANDS.contains(&a.as_str())) {
        return argv;
    }

    argv.insert(1, "storm".to_string());
    argv
}
