use crate::consts::F_TEST_ALPHA;
use crate::math::f_distribution_sf;

use super::lm::FitResult;

/// Outcome of the residual F-test between a model and its nested extension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NestedComparison {
    pub f_statistic: f64,
    pub p_value: f64,
    pub accepted: bool,
}

/// Compare `simple` against `extended` on `points` samples.
///
/// `F = (RSS_s/dof_s) / (RSS_e/dof_e)`; the extension is accepted only if it
/// lowers the RSS and the upper-tail p-value is below [`F_TEST_ALPHA`].
pub fn compare_nested(simple: &FitResult, extended: &FitResult, points: usize) -> NestedComparison {
    let dof_s = simple.dof(points);
    let dof_e = extended.dof(points);
    if dof_s == 0 || dof_e == 0 || extended.rss >= simple.rss {
        return NestedComparison {
            f_statistic: 0.0,
            p_value: 1.0,
            accepted: false,
        };
    }

    let residual_s = simple.rss / dof_s as f64;
    let residual_e = extended.rss / dof_e as f64;
    let f_statistic = if residual_e > 0.0 {
        residual_s / residual_e
    } else {
        f64::INFINITY
    };
    let p_value = f_distribution_sf(f_statistic, dof_s as f64, dof_e as f64);
    NestedComparison {
        f_statistic,
        p_value,
        accepted: p_value < F_TEST_ALPHA,
    }
}
