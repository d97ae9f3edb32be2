//! Linear least squares solver.
//!
//! Every damped Levenberg–Marquardt step is a small linear least squares
//! problem of the form:
//!
//! ```text
//! minimize ‖A δ - b‖²
//! ```
//!
//! where `A` stacks the Jacobian on top of a diagonal damping block, so it is
//! always tall (more rows than columns).
//!
//! Implementation choices:
//! - SVD solves tall systems robustly; nalgebra's `QR::solve` is intended for
//!   square systems and will panic for non-square matrices.
//! - Parameter dimension is tiny (2–4 columns), so SVD cost is negligible next
//!   to model evaluation.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the inputs are non-finite or the system is too
/// ill-conditioned to solve.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.iter().any(|v| !v.is_finite()) || b.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}
