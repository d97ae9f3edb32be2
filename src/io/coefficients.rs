//! Read/write coefficient JSON files.
//!
//! A coefficient file is the portable form of one or more fits: per stage, the
//! model, its formula and parameter names, and one fitted row per source row
//! (label, parameters, SSE, RMSE, iterations). `ridf estimate` rebuilds a
//! `CoefficientTable` from a stage and evaluates it at new coordinates.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, StormError};
use crate::fit::{CoefficientTable, RowFit};
use crate::models::ModelKind;

pub const TOOL_NAME: &str = "ridf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub stages: Vec<CoefficientStage>,
}

/// One fitted coefficient table plus what is needed to read it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientStage {
    /// Pipeline stage name, e.g. `return-period` or `duration`.
    pub stage: String,
    pub model: ModelKind,
    pub formula: String,
    pub params: Vec<String>,
    /// Name and unit of the independent variable the rows were fit against.
    pub x_axis: String,
    pub rows: Vec<RowFit>,
}

impl CoefficientStage {
    pub fn new(stage: impl Into<String>, x_axis: impl Into<String>, coefficients: &CoefficientTable) -> Self {
        let model = coefficients.model();
        Self {
            stage: stage.into(),
            model: coefficients.kind(),
            formula: model.formula().to_string(),
            params: model.param_names().iter().map(|p| p.to_string()).collect(),
            x_axis: x_axis.into(),
            rows: coefficients.rows().to_vec(),
        }
    }

    /// Rebuild the coefficient table, checking parameter names and arity against the model.
    pub fn to_table(&self) -> Result<CoefficientTable, StormError> {
        let expected = self.model.model().param_names();
        if self.params.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(StormError::ShapeMismatch(format!(
                "stage `{}` lists parameters {:?}, model `{}` takes {:?}",
                self.stage,
                self.params,
                self.model.name(),
                expected
            )));
        }
        CoefficientTable::from_rows(self.model, self.rows.clone())
    }
}

impl CoefficientFile {
    pub fn new(stages: Vec<CoefficientStage>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated_at: Utc::now(),
            stages,
        }
    }

    /// Find a stage by name; `None` picks the first one.
    pub fn stage(&self, name: Option<&str>) -> Result<&CoefficientStage, StormError> {
        let found = match name {
            Some(name) => self.stages.iter().find(|s| s.stage == name),
            None => self.stages.first(),
        };
        found.ok_or_else(|| {
            let available: Vec<&str> = self.stages.iter().map(|s| s.stage.as_str()).collect();
            StormError::InvalidConfig(format!(
                "coefficient file has no stage {}; available: {available:?}",
                name.map(|n| format!("`{n}`")).unwrap_or_else(|| "at all".to_string())
            ))
        })
    }
}

pub fn write_coefficients<W: Write>(writer: W, file: &CoefficientFile) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, file)
}

pub fn read_coefficients<R: Read>(reader: R) -> serde_json::Result<CoefficientFile> {
    serde_json::from_reader(reader)
}

pub fn write_coefficients_json(path: &Path, file: &CoefficientFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create coefficient JSON '{}': {e}", path.display())))?;
    write_coefficients(out, file).map_err(|e| AppError::new(2, format!("Failed to write coefficient JSON: {e}")))
}

pub fn read_coefficients_json(path: &Path) -> Result<CoefficientFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open coefficient JSON '{}': {e}", path.display())))?;
    read_coefficients(file).map_err(|e| AppError::new(2, format!("Invalid coefficient JSON: {e}")))
}
