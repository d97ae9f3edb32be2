use thiserror::Error;

/// Error surfaced by the `ridf` binary: a message plus the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Which coordinate axis a table's column headers describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Duration,
    ReturnPeriod,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Duration => write!(f, "duration"),
            Axis::ReturnPeriod => write!(f, "return period"),
        }
    }
}

/// Errors raised by the table, fitting, estimation and arrangement stages.
///
/// None of these are retried or downgraded inside the library; they propagate
/// to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum StormError {
    #[error(
        "{axis} headers must be non-decreasing left to right: column {index} ({current}) follows {previous}"
    )]
    UnorderedColumns {
        axis: Axis,
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error(
        "model `{model}` did not converge for row {row_label} after {iterations} iteration(s): {reason} (sse={sse:.6e}, params={params:?})"
    )]
    FitConvergenceFailure {
        model: &'static str,
        row_label: f64,
        reason: String,
        sse: f64,
        params: Vec<f64>,
        iterations: usize,
    },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("model `{model}` needs at least {required} columns per row, table has {columns}")]
    TooFewColumns {
        model: &'static str,
        columns: usize,
        required: usize,
    },

    #[error("query coordinates must not be empty")]
    EmptyQuery,

    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<StormError> for AppError {
    fn from(err: StormError) -> Self {
        let code = match &err {
            StormError::UnorderedColumns { .. }
            | StormError::TooFewColumns { .. }
            | StormError::EmptyQuery
            | StormError::InvalidTable(_)
            | StormError::InvalidConfig(_) => 2,
            StormError::FitConvergenceFailure { .. } => 4,
            StormError::ShapeMismatch(_) => 5,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storm_errors_map_to_exit_codes() {
        let unordered = StormError::UnorderedColumns {
            axis: Axis::Duration,
            index: 2,
            previous: 60.0,
            current: 30.0,
        };
        let app: AppError = unordered.into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("column 2 (30) follows 60"));

        let fit = StormError::FitConvergenceFailure {
            model: "weibull",
            row_label: 25.0,
            reason: "iteration limit reached".to_string(),
            sse: 1.0,
            params: vec![1.0, 2.0, 3.0],
            iterations: 400,
        };
        let app: AppError = fit.into();
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().contains("row 25"));

        let app: AppError = StormError::ShapeMismatch("rows".to_string()).into();
        assert_eq!(app.exit_code(), 5);
    }
}
