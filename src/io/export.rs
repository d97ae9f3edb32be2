//! Export tables to CSV.
//!
//! The first column holds the row coordinate, the header row holds the column
//! coordinates. Coordinates print without a trailing `.0` (`150`, `1.5`), so a
//! storm written here reads back as an ordinary RIDF-shaped table.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::storm::DesignStormTable;
use crate::table::LabeledTable;

/// Write `table` as CSV, naming the row-label column `index_name`.
pub fn write_table<W: Write>(writer: W, index_name: &str, table: &LabeledTable) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec![index_name.to_string()];
    header.extend(table.col_labels().iter().map(|c| c.to_string()));
    out.write_record(&header)?;

    for (i, label) in table.row_labels().iter().enumerate() {
        let mut record = vec![label.to_string()];
        record.extend(table.row(i).iter().map(|v| v.to_string()));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the design storm in block order: `duration_hr` then one column per return period.
pub fn write_storm<W: Write>(writer: W, storm: &DesignStormTable) -> Result<(), csv::Error> {
    write_table(writer, "duration_hr", storm.table())
}

pub fn write_storm_csv(path: &Path, storm: &DesignStormTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create output CSV '{}': {e}", path.display())))?;
    write_storm(file, storm).map_err(|e| AppError::new(2, format!("Failed to write output CSV: {e}")))
}
