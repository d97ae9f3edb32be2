//! Configuration types used throughout the pipeline.
//!
//! - input conventions (`DurationUnit`, `Orientation`)
//! - numeric run settings (`StormSettings`)
//! - a full invocation with paths (`RunConfig`)

pub mod types;

pub use types::*;
