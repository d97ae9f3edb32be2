//! Run configuration shared by the CLI, the pipeline and the exports.
//!
//! Everything the pipeline needs is passed in explicitly through these values;
//! there is no process-wide settings object.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::StormError;
use crate::fit::FitOptions;
use crate::models::ModelKind;
use crate::storm::Decumulation;

/// Unit of the duration coordinates in an input table.
///
/// Fits always run in hours; minute-scale coordinates are converted by the
/// pipeline before the first fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Minutes,
    Hours,
}

impl DurationUnit {
    pub fn to_hours(self, value: f64) -> f64 {
        match self {
            DurationUnit::Minutes => value / 60.0,
            DurationUnit::Hours => value,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationUnit::Minutes => "min",
            DurationUnit::Hours => "hr",
        }
    }
}

/// Which axis of the input table a standalone fit runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// One curve per return period, `x` = duration (hours).
    #[default]
    Duration,
    /// One curve per duration, `x` = return period (years).
    ReturnPeriod,
}

pub const DEFAULT_EXTRA_RETURN_PERIODS: [f64; 1] = [150.0];
pub const DEFAULT_STORM_HOURS: usize = 24;

/// Numeric settings of one design-storm run.
#[derive(Debug, Clone)]
pub struct StormSettings {
    pub model: ModelKind,
    pub duration_unit: DurationUnit,
    /// Return periods (years) to extrapolate and append before the duration fit.
    pub extra_return_periods: Vec<f64>,
    /// Storm length; the duration curves are evaluated at `1..=storm_hours`.
    pub storm_hours: usize,
    pub decumulation: Decumulation,
    pub fit: FitOptions,
}

impl Default for StormSettings {
    fn default() -> Self {
        Self {
            model: ModelKind::HoerlModified,
            duration_unit: DurationUnit::default(),
            extra_return_periods: DEFAULT_EXTRA_RETURN_PERIODS.to_vec(),
            storm_hours: DEFAULT_STORM_HOURS,
            decumulation: Decumulation::default(),
            fit: FitOptions::default(),
        }
    }
}

impl StormSettings {
    /// Hourly query points `1, 2, ..., storm_hours`.
    pub fn query_hours(&self) -> Vec<f64> {
        (1..=self.storm_hours).map(|h| h as f64).collect()
    }

    pub fn validate(&self) -> Result<(), StormError> {
        if self.storm_hours == 0 {
            return Err(StormError::InvalidConfig("storm length must be at least 1 hour".to_string()));
        }
        if let Some(rp) = self
            .extra_return_periods
            .iter()
            .find(|rp| !rp.is_finite() || **rp <= 0.0)
        {
            return Err(StormError::InvalidConfig(format!(
                "extra return period {rp} must be a positive number of years"
            )));
        }
        self.fit.validate()
    }
}

/// A full `ridf storm` invocation as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    /// Design storm CSV; `None` writes to stdout.
    pub output: Option<PathBuf>,
    pub settings: StormSettings,
    pub export_coefficients: Option<PathBuf>,
    pub debug_bundle: Option<PathBuf>,
    /// Suppress the terminal summary.
    pub quiet: bool,
}
