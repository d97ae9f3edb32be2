//! Input/output helpers.
//!
//! - RIDF CSV ingest + validation (`ingest`)
//! - table and design storm CSV export (`export`)
//! - coefficient JSON read/write (`coefficients`)

pub mod coefficients;
pub mod export;
pub mod ingest;

pub use coefficients::*;
pub use export::*;
pub use ingest::*;
