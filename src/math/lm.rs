//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ (y_i - f(x_i; p))²` over `p` starting from a caller-supplied
//! guess. Each iteration:
//!
//! 1. builds a central-difference Jacobian `J` at the current `p`
//! 2. solves the damped step `[J; √λ·D] δ ≈ [r; 0]` (Marquardt scaling,
//!    `D² = diag(JᵀJ)`) with the SVD solver
//! 3. accepts `p + δ` if it lowers the SSE (λ ÷ 10), else raises λ × 10 and
//!    retries from the same `p`
//!
//! The solver is deterministic: the same inputs always give the same iterates.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
const DIAG_FLOOR: f64 = 1e-12;

/// Stopping tolerances for the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Relative SSE reduction below which an accepted step ends the search.
    pub ftol: f64,
    /// Relative step length below which the search ends.
    pub xtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            ftol: 1.49e-8,
            xtol: 1.49e-8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Residuals are zero to machine precision.
    ZeroResidual,
    SseTolerance,
    StepTolerance,
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub stop: StopReason,
}

/// Why (and where) the solver gave up.
#[derive(Debug, Clone)]
pub struct LmFailure {
    pub reason: String,
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
}

/// Fit `f` to `(xs, ys)` starting from `initial`.
///
/// `xs` and `ys` must have the same length.
pub fn levenberg_marquardt<F>(
    f: F,
    xs: &[f64],
    ys: &[f64],
    initial: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, LmFailure>
where
    F: Fn(f64, &[f64]) -> f64,
{
    debug_assert_eq!(xs.len(), ys.len());

    let mut p = initial.to_vec();
    let mut sse = sum_squares(&f, xs, ys, &p);
    if !sse.is_finite() || p.iter().any(|v| !v.is_finite()) {
        return Err(LmFailure {
            reason: "initial guess gives a non-finite residual".to_string(),
            params: p,
            sse,
            iterations: 0,
        });
    }

    let zero_tol = 1e-30 * (1.0 + ys.iter().map(|y| y * y).sum::<f64>());
    let mut lambda = LAMBDA_INIT;

    for iter in 0..opts.max_iterations {
        if sse <= zero_tol {
            return Ok(LmSolution {
                params: p,
                sse,
                iterations: iter,
                stop: StopReason::ZeroResidual,
            });
        }

        let jac = jacobian(&f, xs, &p);
        let resid = DVector::from_iterator(xs.len(), xs.iter().zip(ys).map(|(&x, &y)| y - f(x, &p)));
        let diag: Vec<f64> = (0..p.len())
            .map(|j| jac.column(j).norm_squared().max(DIAG_FLOOR))
            .collect();
        let p_norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
        let step_floor = opts.xtol * (p_norm + opts.xtol);

        loop {
            if let Some(delta) = damped_step(&jac, &resid, &diag, lambda) {
                let step_norm = delta.norm();
                let trial: Vec<f64> = p.iter().zip(delta.iter()).map(|(a, d)| a + d).collect();
                let trial_sse = sum_squares(&f, xs, ys, &trial);

                if trial_sse.is_finite() && trial_sse < sse && trial.iter().all(|v| v.is_finite()) {
                    let reduction = (sse - trial_sse) / sse;
                    p = trial;
                    sse = trial_sse;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);

                    if reduction <= opts.ftol {
                        return Ok(LmSolution {
                            params: p,
                            sse,
                            iterations: iter + 1,
                            stop: StopReason::SseTolerance,
                        });
                    }
                    if step_norm <= step_floor {
                        return Ok(LmSolution {
                            params: p,
                            sse,
                            iterations: iter + 1,
                            stop: StopReason::StepTolerance,
                        });
                    }
                    break;
                }

                // No descent even for a negligible step: `p` is a minimum.
                if step_norm <= step_floor {
                    return Ok(LmSolution {
                        params: p,
                        sse,
                        iterations: iter + 1,
                        stop: StopReason::StepTolerance,
                    });
                }
            }

            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Err(LmFailure {
                    reason: "damping exhausted without reducing the residual".to_string(),
                    params: p,
                    sse,
                    iterations: iter + 1,
                });
            }
        }
    }

    Err(LmFailure {
        reason: format!("iteration limit ({}) reached", opts.max_iterations),
        params: p,
        sse,
        iterations: opts.max_iterations,
    })
}

/// Sum of squared residuals; `NaN`/`inf` propagate so callers can reject the point.
pub fn sum_squares<F>(f: &F, xs: &[f64], ys: &[f64], params: &[f64]) -> f64
where
    F: Fn(f64, &[f64]) -> f64,
{
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - f(x, params);
            r * r
        })
        .sum()
}

fn jacobian<F>(f: &F, xs: &[f64], p: &[f64]) -> DMatrix<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let eps_cbrt = f64::EPSILON.cbrt();
    let mut jac = DMatrix::<f64>::zeros(xs.len(), p.len());
    let mut plus = p.to_vec();
    let mut minus = p.to_vec();

    for j in 0..p.len() {
        let h = eps_cbrt * p[j].abs().max(1.0);
        plus[j] = p[j] + h;
        minus[j] = p[j] - h;
        for (i, &x) in xs.iter().enumerate() {
            let fp = f(x, &plus);
            let fm = f(x, &minus);
            let central = (fp - fm) / (2.0 * h);
            jac[(i, j)] = if central.is_finite() {
                central
            } else {
                // Near a domain edge one side may be undefined; fall back to a one-sided difference.
                let f0 = f(x, p);
                let forward = (fp - f0) / h;
                if forward.is_finite() { forward } else { (f0 - fm) / h }
            };
        }
        plus[j] = p[j];
        minus[j] = p[j];
    }

    jac
}

fn damped_step(jac: &DMatrix<f64>, resid: &DVector<f64>, diag: &[f64], lambda: f64) -> Option<DVector<f64>> {
    let n = jac.nrows();
    let k = jac.ncols();

    let mut a = DMatrix::<f64>::zeros(n + k, k);
    a.view_mut((0, 0), (n, k)).copy_from(jac);
    for j in 0..k {
        a[(n + j, j)] = (lambda * diag[j]).sqrt();
    }

    let mut b = DVector::<f64>::zeros(n + k);
    b.rows_mut(0, n).copy_from(resid);

    solve_least_squares(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solves_linear_problem_exactly() {
        let line = |x: f64, p: &[f64]| p[0] + p[1] * x;
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 + 3.0 * x).collect();

        let sol = levenberg_marquardt(line, &xs, &ys, &[1.0, 1.0], &LmOptions::default()).unwrap();
        assert_relative_eq!(sol.params[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(sol.params[1], 3.0, epsilon = 1e-8);
        assert!(sol.sse < 1e-12);
    }

    #[test]
    fn recovers_exponential_decay() {
        let decay = |x: f64, p: &[f64]| p[0] * (-p[1] * x).exp();
        let xs: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 5.0 * (-0.7 * x).exp()).collect();

        let sol = levenberg_marquardt(decay, &xs, &ys, &[1.0, 1.0], &LmOptions::default()).unwrap();
        assert_relative_eq!(sol.params[0], 5.0, max_relative = 1e-6);
        assert_relative_eq!(sol.params[1], 0.7, max_relative = 1e-6);
    }

    #[test]
    fn zero_residual_at_start_stops_immediately() {
        let constant = |_: f64, p: &[f64]| p[0];
        let sol = levenberg_marquardt(constant, &[1.0, 2.0], &[4.0, 4.0], &[4.0], &LmOptions::default()).unwrap();
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.stop, StopReason::ZeroResidual);
    }

    #[test]
    fn non_finite_start_is_a_failure() {
        let log = |x: f64, p: &[f64]| p[0] + p[1] * x.ln();
        let err = levenberg_marquardt(log, &[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0], &[1.0, 1.0], &LmOptions::default())
            .unwrap_err();
        assert_eq!(err.iterations, 0);
        assert!(err.reason.contains("non-finite"));
    }

    #[test]
    fn iteration_limit_is_a_failure() {
        let decay = |x: f64, p: &[f64]| p[0] * (-p[1] * x).exp();
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 5.0 * (-0.7 * x).exp() + 0.01 * x).collect();
        let opts = LmOptions {
            max_iterations: 1,
            ftol: 0.0,
            xtol: 0.0,
        };
        let err = levenberg_marquardt(decay, &xs, &ys, &[1.0, 1.0], &opts).unwrap_err();
        assert_eq!(err.iterations, 1);
        assert!(err.reason.contains("iteration limit"));
    }
}
