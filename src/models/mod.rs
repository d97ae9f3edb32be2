//! Curve model registry.
//!
//! Models are implemented as small, pure functions so that fitting and
//! estimation code can stay generic over them.

pub mod model;

pub use model::*;
