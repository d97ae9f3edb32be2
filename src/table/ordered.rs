use std::ops::Deref;

use crate::error::{Axis, StormError};
use crate::table::LabeledTable;

/// A table whose column coordinates are non-decreasing left to right.
///
/// The only way to obtain one is [`OrderedCoordinateTable::new`], so holding a
/// value is proof that the headers were checked.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCoordinateTable {
    axis: Axis,
    table: LabeledTable,
}

impl OrderedCoordinateTable {
    pub fn new(table: LabeledTable, axis: Axis) -> Result<Self, StormError> {
        if table.is_empty() {
            return Err(StormError::InvalidTable(format!(
                "{axis} table has no data ({} row(s), {} column(s))",
                table.nrows(),
                table.ncols()
            )));
        }
        let cols = table.col_labels();
        if let Some(j) = cols.iter().position(|c| !c.is_finite()) {
            return Err(StormError::InvalidTable(format!(
                "{axis} header {j} is not a finite number"
            )));
        }
        for j in 1..cols.len() {
            if cols[j] < cols[j - 1] {
                return Err(StormError::UnorderedColumns {
                    axis,
                    index: j,
                    previous: cols[j - 1],
                    current: cols[j],
                });
            }
        }
        Ok(Self { axis, table })
    }

    /// What the column coordinates measure.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn table(&self) -> &LabeledTable {
        &self.table
    }

    pub fn into_inner(self) -> LabeledTable {
        self.table
    }
}

impl Deref for OrderedCoordinateTable {
    type Target = LabeledTable;

    fn deref(&self) -> &LabeledTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_non_decreasing_headers() {
        let table = LabeledTable::from_rows(vec![2.0], vec![5.0, 10.0, 10.0, 60.0], &[vec![4.0, 3.0, 3.0, 1.0]]).unwrap();
        let ordered = OrderedCoordinateTable::new(table, Axis::Duration).unwrap();
        assert_eq!(ordered.axis(), Axis::Duration);
        assert_eq!(ordered.ncols(), 4);
    }

    #[test]
    fn rejects_decreasing_header_with_position() {
        let table = LabeledTable::from_rows(vec![2.0], vec![5.0, 60.0, 30.0], &[vec![4.0, 3.0, 2.0]]).unwrap();
        let err = OrderedCoordinateTable::new(table, Axis::Duration).unwrap_err();
        match err {
            StormError::UnorderedColumns {
                axis,
                index,
                previous,
                current,
            } => {
                assert_eq!(axis, Axis::Duration);
                assert_eq!(index, 2);
                assert_eq!(previous, 60.0);
                assert_eq!(current, 30.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_table() {
        let table = LabeledTable::from_rows(vec![], vec![1.0], &[]).unwrap();
        assert!(matches!(
            OrderedCoordinateTable::new(table, Axis::ReturnPeriod),
            Err(StormError::InvalidTable(_))
        ));
    }
}
