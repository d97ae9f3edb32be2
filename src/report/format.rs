//! Formatted terminal output.
//!
//! We keep formatting code in one place so the fitting and arrangement code
//! stays free of presentation concerns.

use crate::app::pipeline::RunOutput;
use crate::domain::StormSettings;
use crate::fit::{CoefficientTable, ModelComparison};
use crate::models::registry;
use crate::table::LabeledTable;

const CELL: usize = 12;

/// Format a table with its row coordinates in the first column.
pub fn format_table(index_name: &str, table: &LabeledTable) -> String {
    let mut out = String::new();

    let mut header = format!("{:<CELL$}", truncate(index_name, CELL));
    for c in table.col_labels() {
        header.push_str(&format!(" {:>CELL$}", fmt_coord(*c)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let rule = vec!["-".repeat(CELL); table.ncols() + 1].join(" ");
    out.push_str(&rule);
    out.push('\n');

    for (i, label) in table.row_labels().iter().enumerate() {
        let mut line = format!("{:<CELL$}", fmt_coord(*label));
        for v in table.row(i) {
            line.push_str(&format!(" {:>CELL$.4}", v));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Format one coefficient table: parameters per row plus fit diagnostics.
pub fn format_coefficients(title: &str, coefficients: &CoefficientTable) -> String {
    let model = coefficients.model();
    let mut out = String::new();

    out.push_str(&format!("{title}: {} ({})\n", model.name(), model.formula()));

    let mut header = format!("{:<CELL$}", "row");
    for name in model.param_names() {
        header.push_str(&format!(" {:>CELL$}", name));
    }
    header.push_str(&format!(" {:>CELL$} {:>6}", "rmse", "iters"));
    out.push_str(header.trim_end());
    out.push('\n');

    for row in coefficients.rows() {
        let mut line = format!("{:<CELL$}", fmt_coord(row.label));
        for p in &row.params {
            line.push_str(&format!(" {:>CELL$.6}", p));
        }
        line.push_str(&format!(" {:>CELL$.4e} {:>6}", row.rmse, row.iterations));
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Format the end-of-run summary of a design storm run.
pub fn format_storm_summary(run: &RunOutput, settings: &StormSettings) -> String {
    let mut out = String::new();
    let model = settings.model.model();

    out.push_str("=== ridf - design storm (alternating block) ===\n");
    out.push_str(&format!("Model: {} ({})\n", model.name(), model.formula()));
    out.push_str(&format!(
        "Input: {} return period(s) x {} duration(s) | duration=[{}, {}]hr\n",
        run.input.nrows(),
        run.input.ncols(),
        fmt_coord(run.input.col_labels().first().copied().unwrap_or(f64::NAN)),
        fmt_coord(run.input.col_labels().last().copied().unwrap_or(f64::NAN)),
    ));
    match &run.extrapolated {
        Some(extra) => out.push_str(&format!("Extrapolated return periods: {}\n", fmt_vec(extra.row_labels()))),
        None => out.push_str("Extrapolated return periods: none\n"),
    }

    out.push_str("\nFit diagnostics:\n");
    for (stage, coefficients) in [
        ("return-period", &run.return_period_fit),
        ("duration", &run.duration_fit),
    ] {
        let (lo, hi) = coefficients.rmse_range().unwrap_or((f64::NAN, f64::NAN));
        out.push_str(&format!(
            "- {stage:<14} rows={:<3} SSE={:.4e} RMSE=[{:.4e}, {:.4e}]\n",
            coefficients.len(),
            coefficients.total_sse(),
            lo,
            hi
        ));
    }

    out.push_str(&format!("\nDesign storm ({} blocks, {:?}):\n", run.storm.len(), settings.decumulation));
    out.push_str(&format_table("duration_hr", run.storm.table()));
    out.push_str(&format!("{:<CELL$}", "total"));
    let mut totals = String::new();
    for t in run.storm.totals() {
        totals.push_str(&format!(" {:>CELL$.4}", t));
    }
    out.push_str(totals.trim_end());
    out.push('\n');

    out
}

/// Format a model comparison, best first, with skipped models listed after.
pub fn format_comparison(comparison: &ModelComparison) -> String {
    let mut out = String::new();

    out.push_str("Model diagnostics (best first):\n");
    for (rank, score) in comparison.ranked.iter().enumerate() {
        let chosen = if rank == 0 { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<16} SSE={:.6e} RMSE={:.6e}\n",
            score.model.name(),
            score.sse,
            score.rmse
        ));
    }
    for (kind, reason) in &comparison.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.name()));
    }

    out
}

/// List every registered model with its formula and parameters.
pub fn format_models() -> String {
    let mut out = String::new();
    for model in registry() {
        out.push_str(&format!(
            "{:<16} {:<34} [{}]\n",
            model.name(),
            model.formula(),
            model.param_names().join(", ")
        ));
    }
    out
}

fn fmt_coord(v: f64) -> String {
    format!("{v}")
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| fmt_coord(*x)).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{CoefficientTable, RowFit};
    use crate::models::ModelKind;

    #[test]
    fn table_has_header_rule_and_rows() {
        let table = LabeledTable::from_rows(vec![2.0, 1.0], vec![2.0, 150.0], &[vec![1.5, 2.0], vec![10.0, 12.25]])
            .unwrap();
        let text = format_table("duration_hr", &table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("duration_hr"));
        assert!(lines[0].ends_with("150"));
        assert!(lines[1].starts_with("------------"));
        assert!(lines[2].starts_with('2'));
        assert!(lines[3].ends_with("12.2500"));
    }

    #[test]
    fn coefficients_list_param_names() {
        let rows = vec![RowFit {
            label: 25.0,
            params: vec![120.0, -24.0],
            sse: 0.0,
            rmse: 0.0,
            iterations: 3,
        }];
        let table = CoefficientTable::from_rows(ModelKind::Logarithmic, rows).unwrap();
        let text = format_coefficients("duration", &table);
        assert!(text.starts_with("duration: logarithmic"));
        assert!(text.lines().nth(1).unwrap().contains("rmse"));
        assert!(text.lines().nth(2).unwrap().starts_with("25"));
    }

    #[test]
    fn models_listing_covers_registry() {
        let text = format_models();
        assert_eq!(text.lines().count(), registry().len());
        assert!(text.contains("hoerl-modified"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("return_period_years", 8), "return_.");
        assert_eq!(truncate("rp", 8), "rp");
    }
}
