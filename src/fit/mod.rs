//! Curve fitting.
//!
//! Responsibilities:
//!
//! - seed each row's parameters from its data (`seed`)
//! - fit a model to every table row independently, in parallel (`fitter`)
//! - fit every registered model and rank them (`compare`)

pub mod compare;
pub mod fitter;
pub mod seed;

pub use compare::*;
pub use fitter::*;
pub use seed::*;
