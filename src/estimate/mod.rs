//! Evaluate fitted curves at new coordinates.
//!
//! For every query `x` and every fitted row `r`, the output cell `(x, r)` is
//! `model(x; params_r)`. Output rows follow the queries exactly as given
//! (repeats included) and output columns are the source row labels. This is a
//! direct evaluation, not a refit; out-of-domain queries yield `NaN`/`inf`.

use nalgebra::DMatrix;
use tracing::debug;

use crate::error::StormError;
use crate::fit::CoefficientTable;
use crate::models::CurveModel;
use crate::table::{EstimatedTable, LabeledTable};

/// Ordered query coordinates. A single value becomes a one-element list.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoints(Vec<f64>);

impl QueryPoints {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<f64> for QueryPoints {
    fn from(x: f64) -> Self {
        QueryPoints(vec![x])
    }
}

impl From<Vec<f64>> for QueryPoints {
    fn from(xs: Vec<f64>) -> Self {
        QueryPoints(xs)
    }
}

impl From<&[f64]> for QueryPoints {
    fn from(xs: &[f64]) -> Self {
        QueryPoints(xs.to_vec())
    }
}

/// Evaluate every fitted row of `coefficients` at every query coordinate.
///
/// `source_row_labels` are the labels of the table the coefficients were fit
/// on; they must match the coefficient rows exactly, as must `model`.
pub fn estimate(
    coefficients: &CoefficientTable,
    source_row_labels: &[f64],
    model: &CurveModel,
    queries: impl Into<QueryPoints>,
) -> Result<EstimatedTable, StormError> {
    let queries = queries.into();
    if queries.0.is_empty() {
        return Err(StormError::EmptyQuery);
    }
    if coefficients.kind() != model.kind() {
        return Err(StormError::ShapeMismatch(format!(
            "coefficients were fit with `{}` but evaluated with `{}`",
            coefficients.model().name(),
            model.name()
        )));
    }
    let labels = coefficients.row_labels();
    if labels.as_slice() != source_row_labels {
        return Err(StormError::ShapeMismatch(format!(
            "coefficient rows {labels:?} do not match source rows {source_row_labels:?}"
        )));
    }

    let xs = queries.as_slice();
    let values = DMatrix::from_fn(xs.len(), coefficients.len(), |i, j| {
        model.eval(xs[i], coefficients.params(j))
    });
    debug!(
        model = model.name(),
        queries = xs.len(),
        columns = coefficients.len(),
        "estimated values"
    );

    LabeledTable::new(xs.to_vec(), labels, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::RowFit;
    use crate::models::ModelKind;

    fn coefficients() -> CoefficientTable {
        let rows = vec![
            RowFit {
                label: 2.0,
                params: vec![100.0, -20.0],
                sse: 0.0,
                rmse: 0.0,
                iterations: 1,
            },
            RowFit {
                label: 10.0,
                params: vec![120.0, -25.0],
                sse: 0.0,
                rmse: 0.0,
                iterations: 1,
            },
        ];
        CoefficientTable::from_rows(ModelKind::Logarithmic, rows).unwrap()
    }

    #[test]
    fn evaluates_each_query_for_each_row() {
        let model = ModelKind::Logarithmic.model();
        let xs = [1.0, 2.0, 24.0];
        let out = estimate(&coefficients(), &[2.0, 10.0], model, &xs[..]).unwrap();

        assert_eq!(out.row_labels(), &xs);
        assert_eq!(out.col_labels(), &[2.0, 10.0]);
        for (i, &x) in xs.iter().enumerate() {
            assert_eq!(out.get(i, 0), model.eval(x, &[100.0, -20.0]));
            assert_eq!(out.get(i, 1), model.eval(x, &[120.0, -25.0]));
        }
    }

    #[test]
    fn scalar_query_and_repeats() {
        let model = ModelKind::Logarithmic.model();
        let single = estimate(&coefficients(), &[2.0, 10.0], model, 150.0).unwrap();
        assert_eq!(single.nrows(), 1);
        assert_eq!(single.row_labels(), &[150.0]);

        let repeated = estimate(&coefficients(), &[2.0, 10.0], model, vec![3.0, 3.0]).unwrap();
        assert_eq!(repeated.row_labels(), &[3.0, 3.0]);
        assert_eq!(repeated.row(0), repeated.row(1));
    }

    #[test]
    fn out_of_domain_queries_are_values_not_errors() {
        let model = ModelKind::Logarithmic.model();
        let out = estimate(&coefficients(), &[2.0, 10.0], model, 0.0).unwrap();
        assert!(out.get(0, 0).is_infinite());
    }

    #[test]
    fn mismatched_wiring_is_a_shape_error() {
        let model = ModelKind::Logarithmic.model();
        let err = estimate(&coefficients(), &[2.0, 5.0], model, 1.0).unwrap_err();
        assert!(matches!(err, StormError::ShapeMismatch(_)));

        let err = estimate(&coefficients(), &[2.0, 10.0], ModelKind::Weibull.model(), 1.0).unwrap_err();
        assert!(matches!(err, StormError::ShapeMismatch(_)));

        let err = estimate(&coefficients(), &[2.0, 10.0], model, Vec::new()).unwrap_err();
        assert!(matches!(err, StormError::EmptyQuery));
    }
}
