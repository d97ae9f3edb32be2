//! Parametric intensity curves and their registry.
//!
//! Each model is a descriptor holding a pure function `f(x, p)` and its declared
//! parameter names. The parameter count is `params.len()`, checked when the
//! static registry is built. Models do not validate their domain: `x <= 0` for
//! the logarithmic forms yields `NaN`/`inf` rather than an error.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Identifies one entry of the model registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `a - b·exp(-c·x)`
    Weibull,
    /// `a - b·exp(-c·x^d)`
    WeibullGeneral,
    /// `a / (1 + exp(-(x - b) / c))`
    Sigmoid,
    /// `a · b^(1/x) · x^c`
    HoerlModified,
    /// `exp(a + b/x + c·ln x)`
    VaporPressure,
    /// `a + b·ln x`
    Logarithmic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::Weibull,
        ModelKind::WeibullGeneral,
        ModelKind::Sigmoid,
        ModelKind::HoerlModified,
        ModelKind::VaporPressure,
        ModelKind::Logarithmic,
    ];

    /// Registry descriptor for this kind.
    pub fn model(self) -> &'static CurveModel {
        let idx = match self {
            ModelKind::Weibull => 0,
            ModelKind::WeibullGeneral => 1,
            ModelKind::Sigmoid => 2,
            ModelKind::HoerlModified => 3,
            ModelKind::VaporPressure => 4,
            ModelKind::Logarithmic => 5,
        };
        &REGISTRY[idx]
    }

    pub fn name(self) -> &'static str {
        self.model().name()
    }
}

/// Immutable description of a parametric curve.
#[derive(Debug)]
pub struct CurveModel {
    kind: ModelKind,
    name: &'static str,
    formula: &'static str,
    params: &'static [&'static str],
    func: fn(f64, &[f64]) -> f64,
}

impl CurveModel {
    const fn new(
        kind: ModelKind,
        name: &'static str,
        formula: &'static str,
        params: &'static [&'static str],
        func: fn(f64, &[f64]) -> f64,
    ) -> Self {
        assert!(!params.is_empty(), "a curve model needs at least one parameter");
        Self {
            kind,
            name,
            formula,
            params,
            func,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn formula(&self) -> &'static str {
        self.formula
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> &'static [&'static str] {
        self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Evaluate `f(x; params)`.
    ///
    /// `params` must hold exactly `param_count()` values.
    pub fn eval(&self, x: f64, params: &[f64]) -> f64 {
        debug_assert_eq!(params.len(), self.param_count());
        (self.func)(x, params)
    }

    /// Elementwise evaluation over `xs`.
    pub fn eval_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x, params)).collect()
    }
}

static REGISTRY: [CurveModel; 6] = [
    CurveModel::new(ModelKind::Weibull, "weibull", "a - b*exp(-c*x)", &["a", "b", "c"], weibull),
    CurveModel::new(
        ModelKind::WeibullGeneral,
        "weibull-general",
        "a - b*exp(-c*x^d)",
        &["a", "b", "c", "d"],
        weibull_general,
    ),
    CurveModel::new(ModelKind::Sigmoid, "sigmoid", "a / (1 + exp(-(x - b)/c))", &["a", "b", "c"], sigmoid),
    CurveModel::new(
        ModelKind::HoerlModified,
        "hoerl-modified",
        "a * b^(1/x) * x^c",
        &["a", "b", "c"],
        hoerl_modified,
    ),
    CurveModel::new(
        ModelKind::VaporPressure,
        "vapor-pressure",
        "exp(a + b/x + c*ln(x))",
        &["a", "b", "c"],
        vapor_pressure,
    ),
    CurveModel::new(ModelKind::Logarithmic, "logarithmic", "a + b*ln(x)", &["a", "b"], logarithmic),
];

/// Every registered model, in declaration order.
pub fn registry() -> &'static [CurveModel] {
    &REGISTRY
}

fn weibull(x: f64, p: &[f64]) -> f64 {
    p[0] - p[1] * (-p[2] * x).exp()
}

fn weibull_general(x: f64, p: &[f64]) -> f64 {
    p[0] - p[1] * (-p[2] * x.powf(p[3])).exp()
}

fn sigmoid(x: f64, p: &[f64]) -> f64 {
    p[0] / (1.0 + (-(x - p[1]) / p[2]).exp())
}

fn hoerl_modified(x: f64, p: &[f64]) -> f64 {
    p[0] * p[1].powf(1.0 / x) * x.powf(p[2])
}

fn vapor_pressure(x: f64, p: &[f64]) -> f64 {
    (p[0] + p[1] / x + p[2] * x.ln()).exp()
}

fn logarithmic(x: f64, p: &[f64]) -> f64 {
    p[0] + p[1] * x.ln()
}
