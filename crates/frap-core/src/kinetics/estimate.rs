//! Starting points for the optimizer.

use std::f64::consts::{LN_2, PI};

use crate::consts::DECAY_OFFSET_FRACTION;

use super::lm::FitResult;

/// Time of the first sample at or past `target` in the given direction,
/// falling back to the trace duration.
fn crossing_time(t: &[f64], y: &[f64], crossed: impl Fn(f64) -> bool) -> f64 {
    let duration = t.last().copied().unwrap_or(1.0);
    y.iter()
        .zip(t)
        .skip(1)
        .find(|&(&v, _)| crossed(v))
        .map(|(_, &t)| t)
        .filter(|&t| t > 0.0)
        .unwrap_or(if duration > 0.0 { duration } else { 1.0 })
}

/// `[B, A, koff]` for a bleaching decay: `B` is the minimum, the half-decay
/// time gives `koff`, and `A` follows from the value at the half point.
pub fn decay(t: &[f64], y: &[f64]) -> Vec<f64> {
    let b = y.iter().copied().fold(f64::INFINITY, f64::min);
    let first = y.first().copied().unwrap_or(b);
    let mid = 0.5 * (first + b);
    let half_time = crossing_time(t, y, |v| v < mid);
    vec![b, 2.0 * (mid - b), LN_2 / half_time]
}

/// Mean of the last tenth of the trace (at least one sample).
fn plateau(y: &[f64]) -> f64 {
    let tail = (y.len() / 10).max(1).min(y.len());
    y[y.len() - tail..].iter().sum::<f64>() / tail as f64
}

/// `[i0, A, koff]` for a reaction-limited recovery.
pub fn reaction(t: &[f64], y: &[f64]) -> Vec<f64> {
    let i0 = y[0];
    let a = plateau(y) - i0;
    let half = i0 + 0.5 * a;
    let half_time = crossing_time(t, y, |v| v >= half);
    vec![i0, a, LN_2 / half_time]
}

/// `[i0, A, tD]` for a diffusion-limited recovery of a circular spot of
/// `area_px` pixels, assuming diffusion coefficient `d_guess`.
pub fn diffusion(y: &[f64], area_px: usize, pixel_size: f64, d_guess: f64) -> Vec<f64> {
    let i0 = y[0];
    let a = plateau(y) - i0;
    vec![i0, a, diffusion_time(area_px, pixel_size, d_guess)]
}

/// `tD = r²/(4D)` with `r² = area/π`.
pub fn diffusion_time(area_px: usize, pixel_size: f64, d: f64) -> f64 {
    area_px as f64 * pixel_size * pixel_size / (4.0 * PI * d)
}

/// Inverse of [`diffusion_time`]: `D = r²/(4·tD)`.
pub fn diffusion_coefficient(area_px: usize, pixel_size: f64, td: f64) -> f64 {
    area_px as f64 * pixel_size * pixel_size / (4.0 * PI * td)
}

/// Seed a 5-parameter decay-envelope model from its 3-parameter fit.
///
/// A fraction of `i0` moves into the offset `B` so the value at `t = 0`
/// stays the same; `tau` starts at the global bleaching rate.
pub fn with_decay_envelope(simple: &FitResult, tau: f64) -> Vec<f64> {
    let p = &simple.params;
    let b = DECAY_OFFSET_FRACTION * p[0];
    vec![p[0] - b, p[1], p[2], b, tau]
}
