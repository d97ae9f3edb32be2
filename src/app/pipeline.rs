//! Shared design-storm pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! minutes -> hours -> fit across return periods -> extrapolate -> fit across
//! durations -> estimate hourly values -> alternating block arrangement.
//!
//! The CLI then only decides what to print and where to write.

use tracing::{debug, info, warn};

use crate::domain::{DurationUnit, Orientation, RunConfig, StormSettings};
use crate::error::{AppError, Axis, StormError};
use crate::estimate::estimate;
use crate::fit::{CoefficientTable, FitOptions, fit_labeled_rows, fit_rows};
use crate::models::ModelKind;
use crate::report::format_table;
use crate::storm::{DesignStormTable, arrange_with};
use crate::table::{EstimatedTable, LabeledTable, OrderedCoordinateTable};

/// Every intermediate table of one storm run, in pipeline order.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Input with duration headers in hours; rows are return periods.
    pub input: LabeledTable,
    /// One curve per duration, `x` = return period.
    pub return_period_fit: CoefficientTable,
    /// Rows estimated for the extra return periods, if any were new.
    pub extrapolated: Option<EstimatedTable>,
    /// Input plus extrapolated rows.
    pub completed: LabeledTable,
    /// One curve per return period, `x` = duration (hours).
    pub duration_fit: CoefficientTable,
    /// Hourly intensities: rows = query hours, columns = return periods.
    pub intensities: EstimatedTable,
    pub storm: DesignStormTable,
}

/// Read the configured CSV and run the full pipeline.
pub fn run_storm(config: &RunConfig) -> Result<RunOutput, AppError> {
    let table = crate::io::read_ridf_csv(&config.input)?;
    Ok(run_storm_with_table(&table, &config.settings)?)
}

/// Run the full pipeline on an already-parsed table.
pub fn run_storm_with_table(table: &OrderedCoordinateTable, settings: &StormSettings) -> Result<RunOutput, StormError> {
    settings.validate()?;
    let model = settings.model.model();

    // 1) Durations to hours.
    let hours = to_hours(table, settings.duration_unit)?;
    info!(
        stage = "input",
        return_periods = hours.nrows(),
        durations = hours.ncols(),
        unit = ?settings.duration_unit,
        "durations converted to hours"
    );
    debug!("input table\n{}", format_table("return_period", &hours));

    // 2) One curve per duration across return periods, in whatever order the rows came.
    let by_duration = orient(&hours, Orientation::ReturnPeriod);
    let return_period_fit = fit_labeled_rows(model, &by_duration, &settings.fit)?;
    info!(stage = "return-period fit", model = model.name(), rows = return_period_fit.len(), "fit complete");

    // 3) Extrapolate return periods that are not already rows.
    let mut extra: Vec<f64> = Vec::new();
    for &rp in &settings.extra_return_periods {
        if hours.row_labels().contains(&rp) || extra.contains(&rp) {
            warn!(return_period = rp, "return period already present; not extrapolated");
        } else {
            extra.push(rp);
        }
    }
    let extrapolated = if extra.is_empty() {
        None
    } else {
        let rows = estimate(&return_period_fit, by_duration.row_labels(), model, extra)?;
        info!(stage = "extrapolate", return_periods = ?rows.row_labels(), "return periods extrapolated");
        debug!("extrapolated rows\n{}", format_table("return_period", &rows));
        Some(rows)
    };

    let completed = match &extrapolated {
        Some(rows) => hours.append_rows(rows)?,
        None => hours.table().clone(),
    };
    let completed = OrderedCoordinateTable::new(completed, Axis::Duration)?;

    // 4) One curve per return period across durations.
    let duration_fit = fit_rows(model, &completed, &settings.fit)?;
    info!(stage = "duration fit", model = model.name(), rows = duration_fit.len(), "fit complete");

    // 5) Hourly intensities, rows = hours, columns = return periods.
    let intensities = estimate(&duration_fit, completed.row_labels(), model, settings.query_hours())?;
    info!(stage = "estimate", hours = intensities.nrows(), return_periods = intensities.ncols(), "hourly values estimated");
    debug!("estimated intensities\n{}", format_table("duration_hr", &intensities));

    // 6) Alternating block arrangement.
    let storm = arrange_with(&intensities, settings.decumulation);
    info!(stage = "arrange", blocks = storm.len(), "design storm arranged");
    debug!("design storm\n{}", format_table("duration_hr", storm.table()));

    Ok(RunOutput {
        input: hours.into_inner(),
        return_period_fit,
        extrapolated,
        completed: completed.into_inner(),
        duration_fit,
        intensities,
        storm,
    })
}

/// Fit `model` to the input table along one axis (durations converted to hours first).
pub fn fit_table(
    table: &OrderedCoordinateTable,
    unit: DurationUnit,
    orientation: Orientation,
    model: ModelKind,
    opts: &FitOptions,
) -> Result<CoefficientTable, StormError> {
    let hours = to_hours(table, unit)?;
    let coefficients = fit_labeled_rows(model.model(), &orient(&hours, orientation), opts)?;
    info!(model = model.name(), ?orientation, rows = coefficients.len(), "fit complete");
    Ok(coefficients)
}

/// Re-label duration headers in hours.
pub fn to_hours(table: &OrderedCoordinateTable, unit: DurationUnit) -> Result<OrderedCoordinateTable, StormError> {
    OrderedCoordinateTable::new(table.map_col_labels(|d| unit.to_hours(d)), Axis::Duration)
}

/// View an hour-based input table with `x` along the requested axis.
///
/// The return-period orientation transposes, so its `x` values are the input's
/// row labels in file order; they are not required to be sorted.
pub fn orient(hours: &OrderedCoordinateTable, orientation: Orientation) -> LabeledTable {
    match orientation {
        Orientation::Duration => hours.table().clone(),
        Orientation::ReturnPeriod => hours.transpose(),
    }
}
