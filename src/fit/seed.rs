//! Data-derived starting points for the nonlinear solver.
//!
//! Levenberg–Marquardt only finds the minimum nearest its start, so the
//! default policy seeds every row from the data instead of a fixed vector:
//!
//! - `weibull`, `weibull-general`, `sigmoid` are linear in some parameters once
//!   the others are fixed. We grid-search the nonlinear ones (log-spaced, like a
//!   decay-rate grid) and solve the linear ones by OLS, keeping the lowest SSE.
//! - `hoerl-modified` and `vapor-pressure` are linear in `ln y`:
//!   `ln y = ln a + (1/x)·ln b + c·ln x` and `ln y = a + b/x + c·ln x`.
//! - `logarithmic` is linear in `(a, b)` outright.
//!
//! Every seed is a pure function of the data, so fits stay reproducible.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::math::{solve_least_squares, sum_squares};
use crate::models::{CurveModel, ModelKind};

const RATE_STEPS: usize = 40;
const RATE_STEPS_2D: usize = 25;
const SHAPE_STEPS: usize = 8;
const CENTER_STEPS: usize = 21;
const SCALE_STEPS: usize = 15;

/// Starting parameters for `model` on `(xs, ys)`, or `None` when the data do
/// not support the heuristic (e.g. non-positive values for a log transform).
pub fn seed_params(model: &CurveModel, xs: &[f64], ys: &[f64]) -> Option<Vec<f64>> {
    if xs.is_empty() || xs.len() != ys.len() || xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return None;
    }
    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    match model.kind() {
        ModelKind::Weibull => {
            let grid: Vec<Vec<f64>> = rate_grid(x_min, x_max, RATE_STEPS)?.into_iter().map(|c| vec![c]).collect();
            best_separable(
                model,
                xs,
                ys,
                &grid,
                |x, g| vec![1.0, -(-g[0] * x).exp()],
                |beta, g| vec![beta[0], beta[1], g[0]],
            )
        }
        ModelKind::WeibullGeneral => {
            let rates = rate_grid(x_min, x_max, RATE_STEPS_2D)?;
            let shapes = lin_space(0.25, 2.0, SHAPE_STEPS);
            let grid: Vec<Vec<f64>> = rates
                .iter()
                .flat_map(|&c| shapes.iter().map(move |&d| vec![c, d]))
                .collect();
            best_separable(
                model,
                xs,
                ys,
                &grid,
                |x, g| vec![1.0, -(-g[0] * x.powf(g[1])).exp()],
                |beta, g| vec![beta[0], beta[1], g[0], g[1]],
            )
        }
        ModelKind::Sigmoid => {
            let span = x_max - x_min;
            if span <= 0.0 {
                return None;
            }
            let scales = log_space(span / 50.0, span * 2.0, SCALE_STEPS)?;
            let signed: Vec<f64> = scales.iter().copied().chain(scales.iter().map(|s| -s)).collect();
            let centers = lin_space(x_min - span, x_max + span, CENTER_STEPS);
            let grid: Vec<Vec<f64>> = centers
                .iter()
                .flat_map(|&b| signed.iter().map(move |&c| vec![b, c]))
                .collect();
            best_separable(
                model,
                xs,
                ys,
                &grid,
                |x, g| vec![1.0 / (1.0 + (-(x - g[0]) / g[1]).exp())],
                |beta, g| vec![beta[0], g[0], g[1]],
            )
        }
        ModelKind::HoerlModified | ModelKind::VaporPressure => {
            if x_min <= 0.0 || ys.iter().any(|&y| y <= 0.0) {
                return None;
            }
            let design = DMatrix::from_fn(xs.len(), 3, |i, j| match j {
                0 => 1.0,
                1 => 1.0 / xs[i],
                _ => xs[i].ln(),
            });
            let target = DVector::from_iterator(ys.len(), ys.iter().map(|y| y.ln()));
            let beta = solve_least_squares(&design, &target)?;
            if model.kind() == ModelKind::HoerlModified {
                Some(vec![beta[0].exp(), beta[1].exp(), beta[2]])
            } else {
                Some(vec![beta[0], beta[1], beta[2]])
            }
        }
        ModelKind::Logarithmic => {
            if x_min <= 0.0 {
                return None;
            }
            let design = DMatrix::from_fn(xs.len(), 2, |i, j| if j == 0 { 1.0 } else { xs[i].ln() });
            let target = DVector::from_row_slice(ys);
            let beta = solve_least_squares(&design, &target)?;
            Some(vec![beta[0], beta[1]])
        }
    }
}

/// Grid-search the nonlinear parameters `g` and solve the linear ones by OLS.
///
/// `basis(x, g)` gives the design row for the linear coefficients and
/// `assemble(beta, g)` rebuilds the full parameter vector. Ties on SSE go to
/// the earlier grid entry.
fn best_separable<B, A>(
    model: &CurveModel,
    xs: &[f64],
    ys: &[f64],
    grid: &[Vec<f64>],
    basis: B,
    assemble: A,
) -> Option<Vec<f64>>
where
    B: Fn(f64, &[f64]) -> Vec<f64> + Sync,
    A: Fn(&[f64], &[f64]) -> Vec<f64> + Sync,
{
    let target = DVector::from_row_slice(ys);
    let eval = |x: f64, p: &[f64]| model.eval(x, p);

    let candidates: Vec<(usize, f64, Vec<f64>)> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, g)| {
            let rows: Vec<Vec<f64>> = xs.iter().map(|&x| basis(x, g)).collect();
            let width = rows.first()?.len();
            let design = DMatrix::from_fn(xs.len(), width, |i, j| rows[i][j]);
            let beta = solve_least_squares(&design, &target)?;
            let params = assemble(beta.as_slice(), g);
            let sse = sum_squares(&eval, xs, ys, &params);
            sse.is_finite().then_some((idx, sse, params))
        })
        .collect();

    candidates
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(_, _, params)| params)
}

/// Decay rates spanning the inverse of the x range.
fn rate_grid(x_min: f64, x_max: f64, steps: usize) -> Option<Vec<f64>> {
    if x_min > 0.0 && x_max > x_min {
        log_space(0.05 / x_max, 20.0 / x_min, steps)
    } else {
        log_space(1e-3, 10.0, steps)
    }
}

/// `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Option<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) || steps < 2 {
        return None;
    }
    let ln_min = min.ln();
    let step = (max.ln() - ln_min) / (steps as f64 - 1.0);
    Some((0..steps).map(|i| (ln_min + step * i as f64).exp()).collect())
}

fn lin_space(min: f64, max: f64, steps: usize) -> Vec<f64> {
    let step = (max - min) / (steps.max(2) as f64 - 1.0);
    (0..steps).map(|i| min + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_is_inclusive() {
        let v = log_space(0.1, 10.0, 3).unwrap();
        assert_eq!(v.len(), 3);
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[1] - 1.0).abs() < 1e-12);
        assert!((v[2] - 10.0).abs() < 1e-9);
        assert!(log_space(1.0, 1.0, 5).is_none());
    }

    #[test]
    fn log_linear_models_seed_exactly() {
        let model = ModelKind::HoerlModified.model();
        let xs = [0.25, 0.5, 1.0, 2.0, 6.0, 24.0];
        let ys: Vec<f64> = xs.iter().map(|&x| model.eval(x, &[60.0, 0.9, -0.6])).collect();
        let seed = seed_params(model, &xs, &ys).unwrap();
        assert!((seed[0] - 60.0).abs() < 1e-8);
        assert!((seed[1] - 0.9).abs() < 1e-10);
        assert!((seed[2] + 0.6).abs() < 1e-10);
    }

    #[test]
    fn weibull_seed_lands_near_truth() {
        let model = ModelKind::Weibull.model();
        let xs = [1.0, 2.0, 3.0, 6.0, 12.0, 24.0];
        let ys: Vec<f64> = xs.iter().map(|&x| model.eval(x, &[10.0, 8.0, 0.5])).collect();
        let seed = seed_params(model, &xs, &ys).unwrap();
        assert!((seed[0] - 10.0).abs() < 0.5);
        assert!((seed[2] - 0.5).abs() < 0.1);
    }

    #[test]
    fn log_transforms_need_positive_data() {
        let model = ModelKind::VaporPressure.model();
        assert!(seed_params(model, &[1.0, 2.0, 3.0], &[1.0, -1.0, 2.0]).is_none());
        let model = ModelKind::Logarithmic.model();
        assert!(seed_params(model, &[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }
}
