//! CSV ingest of RIDF tables.
//!
//! Expected layout:
//!
//! ```text
//! return_period,5,10,15,30,60,120
//! 2,120.4,98.1,85.0,61.2,40.3,25.9
//! 5,150.2,121.7,104.9,75.0,49.6,31.8
//! ```
//!
//! - the first header cell is a free-form name and is ignored
//! - the remaining header cells are numeric duration coordinates
//! - every data row starts with its numeric label (return period, years)
//! - every value is a finite, non-negative intensity
//!
//! Any violation is a hard error naming the offending line; nothing is
//! skipped. The column order invariant is checked once, by
//! `OrderedCoordinateTable::new`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::error::{AppError, Axis, StormError};
use crate::table::{LabeledTable, OrderedCoordinateTable};

/// Parse an RIDF table from CSV text.
pub fn parse_ridf<R: Read>(reader: R) -> Result<OrderedCoordinateTable, StormError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| StormError::InvalidTable(format!("failed to read CSV headers: {e}")))?
        .clone();
    let col_labels = parse_header(&headers)?;

    let mut row_labels = Vec::new();
    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Data starts on line 2.
        let line = idx + 2;
        let record = result.map_err(|e| StormError::InvalidTable(format!("line {line}: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != col_labels.len() + 1 {
            return Err(StormError::InvalidTable(format!(
                "line {line}: expected {} field(s), found {}",
                col_labels.len() + 1,
                record.len()
            )));
        }

        let label = parse_number(&record[0])
            .ok_or_else(|| StormError::InvalidTable(format!("line {line}: row label '{}' is not a number", &record[0])))?;
        row_labels.push(label);
        rows.push(parse_values(&record, line)?);
    }

    if rows.is_empty() {
        return Err(StormError::InvalidTable("table has no data rows".to_string()));
    }
    debug!(rows = rows.len(), columns = col_labels.len(), "parsed RIDF table");

    let table = LabeledTable::from_rows(row_labels, col_labels, &rows)?;
    OrderedCoordinateTable::new(table, Axis::Duration)
}

/// Open and parse an RIDF CSV file.
pub fn read_ridf_csv(path: &Path) -> Result<OrderedCoordinateTable, AppError> {
    let file =
        File::open(path).map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    parse_ridf(file).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))
}

fn parse_header(headers: &StringRecord) -> Result<Vec<f64>, StormError> {
    if headers.len() < 2 {
        return Err(StormError::InvalidTable(
            "header needs a label column followed by at least one coordinate".to_string(),
        ));
    }
    headers
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, cell)| {
            parse_number(cell)
                .ok_or_else(|| StormError::InvalidTable(format!("header column {i} ('{cell}') is not a number")))
        })
        .collect()
}

fn parse_values(record: &StringRecord, line: usize) -> Result<Vec<f64>, StormError> {
    record
        .iter()
        .skip(1)
        .enumerate()
        .map(|(j, cell)| match parse_number(cell) {
            Some(v) if v >= 0.0 => Ok(v),
            Some(v) => Err(StormError::InvalidTable(format!(
                "line {line}, column {}: intensity {v} is negative",
                j + 1
            ))),
            None => Err(StormError::InvalidTable(format!(
                "line {line}, column {}: '{cell}' is not a finite number",
                j + 1
            ))),
        })
        .collect()
}

fn parse_number(cell: &str) -> Option<f64> {
    // Spreadsheet exports often prefix the first cell with a UTF-8 BOM.
    let cell = cell.trim().trim_start_matches('\u{feff}');
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
