//! Alternating Block Method.
//!
//! Turns a single-event table (rows = increasing durations, values =
//! cumulative amounts, one column per return period) into a design storm:
//!
//! 1. decumulate rows back to front, so each row reads its unmodified
//!    predecessor
//! 2. split rows by the parity of their 1-based position
//! 3. sort the even-position rows ascending on the first column
//! 4. emit sorted even rows, then odd rows in their original order
//!
//! With a decreasing series, the largest block ends up mid-event and the
//! smallest blocks at both ends.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::LabeledTable;

/// How a row's increment is derived from its predecessor `prev` and itself `cur`.
///
/// The first row always keeps its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Decumulation {
    /// `prev - cur`: how much the longer duration reduced the value.
    #[default]
    PreviousMinusCurrent,
    /// `cur - prev`: forward difference; conserves the cumulative total.
    CurrentMinusPrevious,
}

/// Final storm sequence: rows in block order, labelled with their source duration.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignStormTable {
    table: LabeledTable,
}

impl DesignStormTable {
    pub fn table(&self) -> &LabeledTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.nrows() == 0
    }

    /// Source duration of each block, in block order.
    pub fn durations(&self) -> &[f64] {
        self.table.row_labels()
    }

    /// Scenario (return period) labels.
    pub fn scenarios(&self) -> &[f64] {
        self.table.col_labels()
    }

    /// `(block number starting at 1, source duration, values)` in chronological order.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, f64, Vec<f64>)> + '_ {
        (0..self.len()).map(move |i| (i + 1, self.table.row_labels()[i], self.table.row(i)))
    }

    /// Sum of every block, per scenario.
    pub fn totals(&self) -> Vec<f64> {
        (0..self.table.ncols())
            .map(|j| self.table.column(j).iter().sum())
            .collect()
    }
}

/// Convert cumulative values to per-step increments.
///
/// Rows are processed from the last to the second so that every row reads the
/// untouched value of the row before it.
pub fn decumulate(cumulative: &LabeledTable, direction: Decumulation) -> LabeledTable {
    cumulative.with_edited_values(|values| {
        for i in (1..values.nrows()).rev() {
            for j in 0..values.ncols() {
                let prev = values[(i - 1, j)];
                let cur = values[(i, j)];
                values[(i, j)] = match direction {
                    Decumulation::PreviousMinusCurrent => prev - cur,
                    Decumulation::CurrentMinusPrevious => cur - prev,
                };
            }
        }
    })
}

/// Arrange with the default (`prev - cur`) decumulation.
pub fn arrange(cumulative: &LabeledTable) -> DesignStormTable {
    arrange_with(cumulative, Decumulation::default())
}

/// Build the design storm from a cumulative table ordered by increasing duration.
///
/// Tables with fewer than two rows are returned unchanged.
pub fn arrange_with(cumulative: &LabeledTable, direction: Decumulation) -> DesignStormTable {
    if cumulative.nrows() < 2 {
        return DesignStormTable {
            table: cumulative.clone(),
        };
    }

    let increments = decumulate(cumulative, direction);
    debug!(rows = increments.nrows(), ?direction, "decumulated");

    // Position is 1-based: index 1 is position 2 (even).
    let (mut even, odd): (Vec<usize>, Vec<usize>) = (0..increments.nrows()).partition(|i| (i + 1) % 2 == 0);
    if increments.ncols() > 0 {
        even.sort_by(|&a, &b| increments.get(a, 0).total_cmp(&increments.get(b, 0)));
    }

    let order: Vec<usize> = even.into_iter().chain(odd).collect();
    debug!(?order, "block order");

    DesignStormTable {
        table: increments.select_rows(&order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cumulative_fixture() -> LabeledTable {
        LabeledTable::from_rows(
            vec![1.0, 2.0, 3.0],
            vec![2.0, 10.0],
            &[vec![10.0, 12.0], vec![16.0, 18.0], vec![20.0, 21.0]],
        )
        .unwrap()
    }

    #[test]
    fn decumulation_subtracts_current_from_previous() {
        let inc = decumulate(&cumulative_fixture(), Decumulation::PreviousMinusCurrent);
        assert_eq!(inc.row(0), vec![10.0, 12.0]);
        assert_eq!(inc.row(1), vec![-6.0, -6.0]);
        assert_eq!(inc.row(2), vec![-4.0, -3.0]);
    }

    #[test]
    fn fixture_arranges_even_rows_first() {
        let storm = arrange(&cumulative_fixture());
        assert_eq!(storm.durations(), &[2.0, 1.0, 3.0]);
        assert_eq!(storm.table().row(0), vec![-6.0, -6.0]);
        assert_eq!(storm.table().row(1), vec![10.0, 12.0]);
        assert_eq!(storm.table().row(2), vec![-4.0, -3.0]);
        assert_eq!(storm.scenarios(), &[2.0, 10.0]);
    }

    #[test]
    fn forward_decumulation_conserves_total() {
        let cumulative = cumulative_fixture();
        let storm = arrange_with(&cumulative, Decumulation::CurrentMinusPrevious);
        let totals = storm.totals();
        for (j, total) in totals.iter().enumerate() {
            let max = cumulative.column(j).into_iter().fold(f64::NEG_INFINITY, f64::max);
            assert!((total - max).abs() < 1e-12, "column {j}: {total} vs {max}");
        }
    }

    #[test]
    fn even_rows_sorted_and_odd_rows_keep_order() {
        // Decreasing intensity-like series over 1..=24 hours.
        let hours: Vec<f64> = (1..=24).map(|h| h as f64).collect();
        let rows: Vec<Vec<f64>> = hours.iter().map(|h| vec![100.0 / h.sqrt(), 140.0 / h.sqrt()]).collect();
        let table = LabeledTable::from_rows(hours.clone(), vec![2.0, 100.0], &rows).unwrap();

        let storm = arrange(&table);
        assert_eq!(storm.len(), 24);

        let first: Vec<f64> = storm.table().column(0);
        for w in first[..12].windows(2) {
            assert!(w[0] <= w[1]);
        }
        let odd_durations: Vec<f64> = storm.durations()[12..].to_vec();
        let expected: Vec<f64> = hours.iter().copied().step_by(2).collect();
        assert_eq!(odd_durations, expected);

        let (peak, _) = first
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!(peak > 0 && peak < 23, "peak at {peak}");
    }

    #[test]
    fn ties_keep_original_relative_order() {
        let table = LabeledTable::from_rows(
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![5.0],
            &[vec![10.0], vec![9.0], vec![10.0], vec![9.0], vec![10.0]],
        )
        .unwrap();
        // Increments: [10, 1, -1, 1, -1]; even positions 2 and 4 tie at 1.
        let storm = arrange(&table);
        assert_eq!(storm.durations(), &[2.0, 4.0, 1.0, 3.0, 5.0]);
    }

    #[test]
    fn short_tables_are_returned_unchanged() {
        let single = LabeledTable::from_rows(vec![1.0], vec![2.0], &[vec![7.0]]).unwrap();
        let storm = arrange(&single);
        assert_eq!(storm.table(), &single);

        let blocks: Vec<_> = storm.blocks().collect();
        assert_eq!(blocks, vec![(1, 1.0, vec![7.0])]);
    }
}
