//! Numeric tables keyed by numeric row and column coordinates.
//!
//! Every stage of the pipeline consumes one of these tables and produces a new
//! one; nothing here mutates a table after it has been handed on.
//!
//! - `LabeledTable`: rows × columns of `f64`, each axis labelled by a coordinate
//! - `OrderedCoordinateTable`: a `LabeledTable` whose column coordinates are
//!   known to be non-decreasing (checked once, at construction)

pub mod ordered;

pub use ordered::*;

use nalgebra::DMatrix;

use crate::error::StormError;

/// Table produced by the value estimator: query coordinates × source row labels.
pub type EstimatedTable = LabeledTable;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    row_labels: Vec<f64>,
    col_labels: Vec<f64>,
    values: DMatrix<f64>,
}

impl LabeledTable {
    pub fn new(row_labels: Vec<f64>, col_labels: Vec<f64>, values: DMatrix<f64>) -> Result<Self, StormError> {
        if values.nrows() != row_labels.len() || values.ncols() != col_labels.len() {
            return Err(StormError::InvalidTable(format!(
                "{}x{} values do not match {} row label(s) and {} column label(s)",
                values.nrows(),
                values.ncols(),
                row_labels.len(),
                col_labels.len()
            )));
        }
        Ok(Self {
            row_labels,
            col_labels,
            values,
        })
    }

    /// Build a table from row-major data. Every row must have one value per column label.
    pub fn from_rows(row_labels: Vec<f64>, col_labels: Vec<f64>, rows: &[Vec<f64>]) -> Result<Self, StormError> {
        if rows.len() != row_labels.len() {
            return Err(StormError::InvalidTable(format!(
                "{} row(s) of data for {} row label(s)",
                rows.len(),
                row_labels.len()
            )));
        }
        let ncols = col_labels.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(StormError::InvalidTable(format!(
                "row {} ({}) has {} value(s), expected {ncols}",
                i,
                row_labels[i],
                row.len()
            )));
        }
        let values = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(row_labels, col_labels, values)
    }

    pub fn row_labels(&self) -> &[f64] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[f64] {
        &self.col_labels
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn ncols(&self) -> usize {
        self.col_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows() == 0 || self.ncols() == 0
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.values.row(row).iter().copied().collect()
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        self.values.column(col).iter().copied().collect()
    }

    /// Swap rows and columns, labels included.
    pub fn transpose(&self) -> LabeledTable {
        LabeledTable {
            row_labels: self.col_labels.clone(),
            col_labels: self.row_labels.clone(),
            values: self.values.transpose(),
        }
    }

    /// Return a copy with every column label passed through `f`.
    pub fn map_col_labels(&self, f: impl Fn(f64) -> f64) -> LabeledTable {
        LabeledTable {
            row_labels: self.row_labels.clone(),
            col_labels: self.col_labels.iter().map(|&c| f(c)).collect(),
            values: self.values.clone(),
        }
    }

    /// Return a copy with values replaced; shape and labels are kept.
    pub fn with_values(&self, values: DMatrix<f64>) -> Result<LabeledTable, StormError> {
        Self::new(self.row_labels.clone(), self.col_labels.clone(), values)
    }

    /// Return a copy whose values were edited in place by `edit`.
    pub fn with_edited_values(&self, edit: impl FnOnce(&mut DMatrix<f64>)) -> LabeledTable {
        let mut values = self.values.clone();
        edit(&mut values);
        debug_assert_eq!(values.shape(), self.values.shape());
        LabeledTable {
            row_labels: self.row_labels.clone(),
            col_labels: self.col_labels.clone(),
            values,
        }
    }

    /// Stack `other` below `self`. Column labels must match exactly.
    pub fn append_rows(&self, other: &LabeledTable) -> Result<LabeledTable, StormError> {
        if self.col_labels != other.col_labels {
            return Err(StormError::ShapeMismatch(format!(
                "cannot append rows with columns {:?} to a table with columns {:?}",
                other.col_labels, self.col_labels
            )));
        }
        let nrows = self.nrows() + other.nrows();
        let top = self.nrows();
        let values = DMatrix::from_fn(nrows, self.ncols(), |i, j| {
            if i < top {
                self.values[(i, j)]
            } else {
                other.values[(i - top, j)]
            }
        });
        let mut row_labels = self.row_labels.clone();
        row_labels.extend_from_slice(&other.row_labels);
        Ok(LabeledTable {
            row_labels,
            col_labels: self.col_labels.clone(),
            values,
        })
    }

    /// Return the rows at `order` (source indices), in that order.
    ///
    /// # Panics
    /// Panics if an index in `order` is out of range.
    pub fn select_rows(&self, order: &[usize]) -> LabeledTable {
        let values = DMatrix::from_fn(order.len(), self.ncols(), |i, j| self.values[(order[i], j)]);
        LabeledTable {
            row_labels: order.iter().map(|&i| self.row_labels[i]).collect(),
            col_labels: self.col_labels.clone(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LabeledTable {
        LabeledTable::from_rows(
            vec![2.0, 5.0],
            vec![1.0, 2.0, 3.0],
            &[vec![10.0, 8.0, 6.0], vec![12.0, 9.0, 7.0]],
        )
        .unwrap()
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = LabeledTable::from_rows(vec![2.0, 5.0], vec![1.0, 2.0], &[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, StormError::InvalidTable(_)));
    }

    #[test]
    fn transpose_swaps_labels_and_values() {
        let t = sample().transpose();
        assert_eq!(t.row_labels(), &[1.0, 2.0, 3.0]);
        assert_eq!(t.col_labels(), &[2.0, 5.0]);
        assert_eq!(t.row(2), vec![6.0, 7.0]);
    }

    #[test]
    fn append_rows_requires_matching_columns() {
        let table = sample();
        let extra = LabeledTable::from_rows(vec![150.0], vec![1.0, 2.0, 3.0], &[vec![20.0, 15.0, 11.0]]).unwrap();
        let joined = table.append_rows(&extra).unwrap();
        assert_eq!(joined.row_labels(), &[2.0, 5.0, 150.0]);
        assert_eq!(joined.row(2), vec![20.0, 15.0, 11.0]);

        let wrong = LabeledTable::from_rows(vec![150.0], vec![1.0, 2.0], &[vec![20.0, 15.0]]).unwrap();
        assert!(matches!(table.append_rows(&wrong), Err(StormError::ShapeMismatch(_))));
    }

    #[test]
    fn select_rows_follows_order() {
        let picked = sample().select_rows(&[1, 0, 1]);
        assert_eq!(picked.row_labels(), &[5.0, 2.0, 5.0]);
        assert_eq!(picked.column(0), vec![12.0, 10.0, 12.0]);
    }
}
