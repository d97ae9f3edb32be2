//! Fit every registered model to the same table and rank them by RMSE.
//!
//! A model is skipped, with the reason recorded, when the table has too few
//! columns for its parameter count or when any row fails to converge. Ties on
//! RMSE keep registry order.

use tracing::info;

use crate::fit::fitter::{CoefficientTable, FitOptions, fit_rows};
use crate::models::{ModelKind, registry};
use crate::table::OrderedCoordinateTable;

#[derive(Debug, Clone)]
pub struct ModelScore {
    pub model: ModelKind,
    /// Sum of squared residuals over every cell of the table.
    pub sse: f64,
    /// Root mean squared residual over every cell of the table.
    pub rmse: f64,
    pub coefficients: CoefficientTable,
}

#[derive(Debug, Clone)]
pub struct ModelComparison {
    /// Successful fits, best first.
    pub ranked: Vec<ModelScore>,
    pub skipped: Vec<(ModelKind, String)>,
}

impl ModelComparison {
    pub fn best(&self) -> Option<&ModelScore> {
        self.ranked.first()
    }
}

pub fn compare_models(table: &OrderedCoordinateTable, opts: &FitOptions) -> ModelComparison {
    let cells = (table.nrows() * table.ncols()) as f64;
    let mut ranked = Vec::new();
    let mut skipped = Vec::new();

    for model in registry() {
        match fit_rows(model, table, opts) {
            Ok(coefficients) => {
                let sse = coefficients.total_sse();
                let rmse = (sse / cells).sqrt();
                info!(model = model.name(), sse, rmse, "model fit");
                ranked.push(ModelScore {
                    model: model.kind(),
                    sse,
                    rmse,
                    coefficients,
                });
            }
            Err(err) => {
                info!(model = model.name(), error = %err, "model skipped");
                skipped.push((model.kind(), err.to_string()));
            }
        }
    }

    ranked.sort_by(|a, b| a.rmse.total_cmp(&b.rmse));
    ModelComparison { ranked, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Axis;
    use crate::table::LabeledTable;

    #[test]
    fn exact_model_ranks_first_and_small_tables_skip_wide_models() {
        let truth = ModelKind::Logarithmic.model();
        let xs = vec![1.0, 2.0, 3.0, 6.0];
        let rows: Vec<Vec<f64>> = [vec![90.0, -20.0], vec![110.0, -25.0]]
            .iter()
            .map(|p| truth.eval_many(&xs, p))
            .collect();
        let table = LabeledTable::from_rows(vec![2.0, 10.0], xs, &rows).unwrap();
        let table = OrderedCoordinateTable::new(table, Axis::Duration).unwrap();

        let cmp = compare_models(&table, &FitOptions::default());
        let best = cmp.best().unwrap();
        assert!(best.rmse < 1e-6, "best rmse {}", best.rmse);
        assert_eq!(cmp.ranked.len() + cmp.skipped.len(), ModelKind::ALL.len());
        assert!(
            cmp.skipped
                .iter()
                .any(|(kind, reason)| *kind == ModelKind::WeibullGeneral && reason.contains("at least 5"))
        );
        for pair in cmp.ranked.windows(2) {
            assert!(pair[0].rmse <= pair[1].rmse);
        }
    }
}
