//! Levenberg-Marquardt least squares for the kinetic models.

use ndarray::{Array1, Array2};

use crate::consts::{LM_MAX_ITERATIONS, LM_RELATIVE_TOLERANCE};
use crate::error::FitError;
use crate::math::linear_solver::solve;

use super::ModelKind;

/// Damping is abandoned as converged past this value: no step reduces the cost.
const LAMBDA_CEILING: f64 = 1e20;

/// Floor for the diagonal scale used in damping.
const DIAGONAL_FLOOR: f64 = 1e-12;

/// Lower bound on the damping factor after repeated successful steps.
const LAMBDA_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct LmConfig {
    pub max_iterations: usize,
    /// Relative cost decrease of an accepted step below which the fit stops.
    pub relative_tolerance: f64,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: LM_MAX_ITERATIONS,
            relative_tolerance: LM_RELATIVE_TOLERANCE,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// A converged fit of one model to one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub kind: ModelKind,
    pub params: Vec<f64>,
    /// Residual sum of squares at `params`.
    pub rss: f64,
    pub iterations: usize,
}

impl FitResult {
    /// Parameter by name, e.g. `"koff"`.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.kind
            .param_names()
            .iter()
            .position(|&n| n == name)
            .map(|i| self.params[i])
    }

    /// Degrees of freedom left for `points` samples.
    pub fn dof(&self, points: usize) -> usize {
        points.saturating_sub(self.kind.param_count())
    }
}

/// Keep every parameter at or above the smallest positive normal value.
fn validate(params: &mut [f64]) {
    for p in params.iter_mut() {
        *p = p.max(f64::MIN_POSITIVE);
    }
}

fn cost(kind: ModelKind, t: &[f64], y: &[f64], params: &[f64]) -> f64 {
    t.iter()
        .zip(y)
        .map(|(&t, &y)| {
            let r = y - kind.value(t, params);
            r * r
        })
        .sum()
}

/// Normal equations `JᵀJ` and `Jᵀr` at `params`.
fn normal_equations(
    kind: ModelKind,
    t: &[f64],
    y: &[f64],
    params: &[f64],
) -> (Array2<f64>, Array1<f64>) {
    let m = params.len();
    let mut hessian = Array2::<f64>::zeros((m, m));
    let mut gradient = Array1::<f64>::zeros(m);
    let mut row = vec![0.0; m];

    for (&t, &y) in t.iter().zip(y) {
        kind.jacobian(t, params, &mut row);
        let r = y - kind.value(t, params);
        for i in 0..m {
            gradient[i] += row[i] * r;
            for j in i..m {
                hessian[[i, j]] += row[i] * row[j];
            }
        }
    }
    for i in 0..m {
        for j in 0..i {
            hessian[[i, j]] = hessian[[j, i]];
        }
    }
    (hessian, gradient)
}

/// Fit `kind` to the samples `(t, y)` starting from `initial`.
pub fn fit(
    kind: ModelKind,
    t: &[f64],
    y: &[f64],
    initial: &[f64],
    config: &LmConfig,
) -> Result<FitResult, FitError> {
    assert_eq!(t.len(), y.len(), "time and value lengths differ");
    assert_eq!(initial.len(), kind.param_count(), "wrong parameter count");

    let params_needed = kind.param_count();
    if t.len() <= params_needed {
        return Err(FitError::InsufficientData {
            points: t.len(),
            params: params_needed,
        });
    }

    let mut params = initial.to_vec();
    validate(&mut params);
    let mut current = cost(kind, t, y, &params);
    if !current.is_finite() {
        return Err(FitError::NonFinite);
    }

    let done = |params: Vec<f64>, rss: f64, iterations: usize| FitResult {
        kind,
        params,
        rss,
        iterations,
    };

    let mut lambda = config.initial_lambda;
    for iteration in 1..=config.max_iterations {
        if current == 0.0 {
            return Ok(done(params, current, iteration - 1));
        }

        let (hessian, gradient) = normal_equations(kind, t, y, &params);
        let mut damped = hessian.clone();
        for i in 0..params.len() {
            damped[[i, i]] += lambda * hessian[[i, i]].max(DIAGONAL_FLOOR);
        }
        let delta = solve(&damped, &gradient).ok_or(FitError::Singular)?;

        let mut trial: Vec<f64> = params.iter().zip(delta.iter()).map(|(p, d)| p + d).collect();
        validate(&mut trial);
        let trial_cost = cost(kind, t, y, &trial);

        if trial_cost.is_finite() && trial_cost < current {
            let improvement = (current - trial_cost) / current;
            params = trial;
            current = trial_cost;
            lambda = (lambda * config.lambda_down).max(LAMBDA_FLOOR);
            if improvement < config.relative_tolerance {
                return Ok(done(params, current, iteration));
            }
        } else {
            lambda *= config.lambda_up;
            if lambda > LAMBDA_CEILING {
                return Ok(done(params, current, iteration));
            }
        }
    }

    Err(FitError::TooManyIterations {
        max: config.max_iterations,
    })
}
