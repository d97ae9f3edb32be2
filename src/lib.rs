//! `ridf-storm` library crate.
//!
//! Turns a Rainfall Intensity-Duration-Frequency table into an alternating
//! block design storm. The binary (`ridf`) is a thin wrapper around this
//! library so the pipeline stages are testable without spawning processes.

pub mod app;
pub mod cli;
pub mod debug;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod storm;
pub mod table;
