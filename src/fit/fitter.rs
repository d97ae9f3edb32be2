//! Row-wise curve fitting.
//!
//! Given:
//! - a model `f(x; p)` with `k` parameters
//! - a table whose column coordinates are the shared `x` values
//!
//! we solve, independently for every row, the nonlinear least squares problem
//! `min_p Σ_j (row_j - f(x_j; p))²` and return one parameter vector per row.
//!
//! Rows are fit in parallel; the coefficient table always comes back in the
//! source row order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StormError;
use crate::fit::seed::seed_params;
use crate::math::{LmOptions, levenberg_marquardt};
use crate::models::{CurveModel, ModelKind};
use crate::table::{LabeledTable, OrderedCoordinateTable};

/// Starting point policy for the nonlinear solver.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitialGuess {
    /// Seed each row from its own data (see `fit::seed`); falls back to ones.
    #[default]
    Auto,
    /// Every parameter starts at 1.0.
    Ones,
    /// The same explicit vector for every row.
    Fixed(Vec<f64>),
}

impl InitialGuess {
    fn resolve(&self, model: &CurveModel, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        match self {
            InitialGuess::Auto => seed_params(model, xs, ys).unwrap_or_else(|| vec![1.0; model.param_count()]),
            InitialGuess::Ones => vec![1.0; model.param_count()],
            InitialGuess::Fixed(values) => values.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    pub initial_guess: InitialGuess,
    pub solver: LmOptions,
}

impl FitOptions {
    /// Reject solver settings that could never stop or never start.
    pub fn validate(&self) -> Result<(), StormError> {
        let solver = &self.solver;
        if solver.max_iterations == 0 {
            return Err(StormError::InvalidConfig("max iterations must be at least 1".to_string()));
        }
        for (name, value) in [("ftol", solver.ftol), ("xtol", solver.xtol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(StormError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        Ok(())
    }
}

/// Fitted parameters for one source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFit {
    pub label: f64,
    pub params: Vec<f64>,
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
}

/// One parameter vector per source row, in the source row order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    model: ModelKind,
    rows: Vec<RowFit>,
}

impl CoefficientTable {
    /// Rebuild a coefficient table (e.g. from an export), checking every row's arity.
    pub fn from_rows(model: ModelKind, rows: Vec<RowFit>) -> Result<Self, StormError> {
        let k = model.model().param_count();
        if let Some(row) = rows.iter().find(|r| r.params.len() != k) {
            return Err(StormError::ShapeMismatch(format!(
                "row {} has {} parameter(s), model `{}` takes {k}",
                row.label,
                row.params.len(),
                model.name()
            )));
        }
        Ok(Self { model, rows })
    }

    pub fn kind(&self) -> ModelKind {
        self.model
    }

    pub fn model(&self) -> &'static CurveModel {
        self.model.model()
    }

    pub fn rows(&self) -> &[RowFit] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_labels(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.label).collect()
    }

    pub fn params(&self, row: usize) -> &[f64] {
        &self.rows[row].params
    }

    pub fn total_sse(&self) -> f64 {
        self.rows.iter().map(|r| r.sse).sum()
    }

    /// Smallest and largest per-row RMSE.
    pub fn rmse_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.rows.iter().map(|r| r.rmse);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Fit `model` independently to every row of `table`.
///
/// Requires at least `k + 1` columns. If several rows fail to converge, the
/// error names the first failing row in table order.
pub fn fit_rows(
    model: &CurveModel,
    table: &OrderedCoordinateTable,
    opts: &FitOptions,
) -> Result<CoefficientTable, StormError> {
    fit_labeled_rows(model, table.table(), opts)
}

/// [`fit_rows`] for a table whose column coordinates are in any order.
///
/// Each row is an independent least-squares problem, so the order of the `x`
/// values does not change the fit. The pipeline uses this for the transposed
/// table, whose coordinates are the input's return-period rows.
pub fn fit_labeled_rows(
    model: &CurveModel,
    table: &LabeledTable,
    opts: &FitOptions,
) -> Result<CoefficientTable, StormError> {
    opts.validate()?;
    let k = model.param_count();
    let required = k + 1;
    if table.ncols() < required {
        return Err(StormError::TooFewColumns {
            model: model.name(),
            columns: table.ncols(),
            required,
        });
    }
    if let InitialGuess::Fixed(values) = &opts.initial_guess {
        if values.len() != k {
            return Err(StormError::InvalidConfig(format!(
                "initial guess has {} value(s), model `{}` takes {k}",
                values.len(),
                model.name()
            )));
        }
    }

    let xs = table.col_labels();
    let results: Vec<Result<RowFit, StormError>> = (0..table.nrows())
        .into_par_iter()
        .map(|i| fit_row(model, xs, &table.row(i), table.row_labels()[i], opts))
        .collect();

    let rows = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(CoefficientTable {
        model: model.kind(),
        rows,
    })
}

fn fit_row(model: &CurveModel, xs: &[f64], ys: &[f64], label: f64, opts: &FitOptions) -> Result<RowFit, StormError> {
    let initial = opts.initial_guess.resolve(model, xs, ys);
    let f = |x: f64, p: &[f64]| model.eval(x, p);

    match levenberg_marquardt(f, xs, ys, &initial, &opts.solver) {
        Ok(sol) => {
            debug!(
                model = model.name(),
                row = label,
                iterations = sol.iterations,
                sse = sol.sse,
                stop = ?sol.stop,
                "row fit converged"
            );
            Ok(RowFit {
                label,
                rmse: (sol.sse / xs.len() as f64).sqrt(),
                params: sol.params,
                sse: sol.sse,
                iterations: sol.iterations,
            })
        }
        Err(failure) => {
            warn!(
                model = model.name(),
                row = label,
                iterations = failure.iterations,
                reason = %failure.reason,
                "row fit failed"
            );
            Err(StormError::FitConvergenceFailure {
                model: model.name(),
                row_label: label,
                reason: failure.reason,
                sse: failure.sse,
                params: failure.params,
                iterations: failure.iterations,
            })
        }
    }
}
