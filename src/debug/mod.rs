//! Debug bundle writer for inspecting every intermediate table of a storm run.

use std::fs::{File, create_dir_all};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::StormSettings;
use crate::error::AppError;
use crate::fit::CoefficientTable;
use crate::table::LabeledTable;

/// Write a markdown bundle into `dir` and return the file path.
pub fn write_debug_bundle(dir: &Path, run: &RunOutput, settings: &StormSettings) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(2, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("ridf_debug_{}_{ts}.md", settings.model.name()));

    let file = File::create(&path).map_err(|e| AppError::new(2, format!("Failed to create debug file: {e}")))?;
    let mut out = BufWriter::new(file);
    write_bundle(&mut out, run, settings)
        .and_then(|()| out.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write debug file: {e}")))?;
    Ok(path)
}

/// Write the bundle's markdown to `out`.
pub fn write_bundle<W: Write>(out: &mut W, run: &RunOutput, settings: &StormSettings) -> io::Result<()> {
    writeln!(out, "# ridf debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- model: {} ({})", settings.model.name(), settings.model.model().formula())?;
    writeln!(out, "- duration_unit: {:?}", settings.duration_unit)?;
    writeln!(out, "- extra_return_periods: {}", fmt_vec(&settings.extra_return_periods))?;
    writeln!(out, "- storm_hours: {}", settings.storm_hours)?;
    writeln!(out, "- decumulation: {:?}", settings.decumulation)?;
    writeln!(
        out,
        "- solver: initial_guess={:?}, max_iterations={}, ftol={:e}, xtol={:e}",
        settings.fit.initial_guess, settings.fit.solver.max_iterations, settings.fit.solver.ftol, settings.fit.solver.xtol
    )?;

    table_section(out, "Input (hours)", "return_period", &run.input)?;
    coefficient_section(out, "Return-period fit (one curve per duration)", &run.return_period_fit)?;
    match &run.extrapolated {
        Some(extra) => table_section(out, "Extrapolated rows", "return_period", extra)?,
        None => writeln!(out, "\n## Extrapolated rows\nnone")?,
    }
    table_section(out, "Completed table", "return_period", &run.completed)?;
    coefficient_section(out, "Duration fit (one curve per return period)", &run.duration_fit)?;
    table_section(out, "Estimated intensities", "duration_hr", &run.intensities)?;
    table_section(out, "Design storm (block order)", "duration_hr", run.storm.table())
}

fn table_section<W: Write>(out: &mut W, title: &str, index_name: &str, table: &LabeledTable) -> io::Result<()> {
    writeln!(out, "\n## {title}")?;
    let header: Vec<String> = table.col_labels().iter().map(|c| format!("{c}")).collect();
    writeln!(out, "| {index_name} | {} |", header.join(" | "))?;
    writeln!(out, "|{}", " - |".repeat(table.ncols() + 1))?;
    for (i, label) in table.row_labels().iter().enumerate() {
        let cells: Vec<String> = table.row(i).iter().map(|v| format!("{v:.6}")).collect();
        writeln!(out, "| {label} | {} |", cells.join(" | "))?;
    }
    Ok(())
}

fn coefficient_section<W: Write>(out: &mut W, title: &str, coefficients: &CoefficientTable) -> io::Result<()> {
    writeln!(out, "\n## {title}")?;
    let names = coefficients.model().param_names().join(" | ");
    writeln!(out, "| row | {names} | sse | iterations |")?;
    writeln!(out, "|{}", " - |".repeat(coefficients.model().param_count() + 3))?;
    for row in coefficients.rows() {
        let params: Vec<String> = row.params.iter().map(|p| format!("{p:.6}")).collect();
        writeln!(out, "| {} | {} | {:.6e} | {} |", row.label, params.join(" | "), row.sse, row.iterations)?;
    }
    Ok(())
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_storm_with_table;
    use crate::error::Axis;
    use crate::models::ModelKind;
    use crate::table::OrderedCoordinateTable;

    fn logarithmic_run() -> (RunOutput, StormSettings) {
        let minutes = [60.0, 120.0, 180.0, 360.0];
        let rps = [2.0, 10.0, 100.0];
        let rows: Vec<Vec<f64>> = rps
            .iter()
            .map(|&t: &f64| minutes.iter().map(|&m: &f64| 150.0 - 30.0 * (m / 60.0).ln() + 15.0 * t.ln()).collect())
            .collect();
        let table = LabeledTable::from_rows(rps.to_vec(), minutes.to_vec(), &rows).unwrap();
        let table = OrderedCoordinateTable::new(table, Axis::Duration).unwrap();
        let settings = StormSettings {
            model: ModelKind::Logarithmic,
            storm_hours: 6,
            ..StormSettings::default()
        };
        let run = run_storm_with_table(&table, &settings).unwrap();
        (run, settings)
    }

    /// Accepts `budget` bytes, then fails every write.
    struct ShortWriter {
        budget: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn bundle_lists_every_stage() {
        let (run, settings) = logarithmic_run();

        let mut buf = Vec::new();
        write_bundle(&mut buf, &run, &settings).unwrap();
        let md = String::from_utf8(buf).unwrap();
        for heading in [
            "## Input (hours)",
            "## Return-period fit",
            "## Extrapolated rows",
            "## Completed table",
            "## Duration fit",
            "## Estimated intensities",
            "## Design storm (block order)",
        ] {
            assert!(md.contains(heading), "missing {heading}");
        }
        assert!(md.contains("| row | a | b | sse | iterations |"));
        assert!(md.contains("| 150 |"));
    }

    #[test]
    fn write_errors_propagate() {
        let (run, settings) = logarithmic_run();
        for budget in [0, 64, 1024] {
            let err = write_bundle(&mut ShortWriter { budget }, &run, &settings).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        }
    }

    #[test]
    fn bundle_file_lands_in_the_directory() {
        let (run, settings) = logarithmic_run();
        let dir = std::env::temp_dir().join(format!("ridf_debug_test_{}", std::process::id()));

        let path = write_debug_bundle(&dir, &run, &settings).unwrap();
        assert!(path.starts_with(&dir));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ridf_debug_logarithmic_"), "{name}");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# ridf debug bundle"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
