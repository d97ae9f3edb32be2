//! Reporting utilities: formatted terminal output for tables, fits and runs.

pub mod format;

pub use format::*;
