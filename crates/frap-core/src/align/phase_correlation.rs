use ndarray::Array2;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{FrapError, Result};
use crate::frame::AlignmentOffset;

/// Phase correlation against a fixed reference frame.
///
/// The reference spectrum is computed once and reused for every target.
pub struct PhaseCorrelator {
    reference_fft: Array2<Complex<f64>>,
}

impl PhaseCorrelator {
    pub fn new(reference: &Array2<f32>) -> Self {
        Self {
            reference_fft: fft2d(&apply_hann(reference)),
        }
    }

    /// Whole-pixel offset that maps `target` back onto the reference:
    /// `aligned[row, col] = target[row - dy, col - dx]`.
    pub fn offset_to(&self, target: &Array2<f32>) -> Result<AlignmentOffset> {
        let (h, w) = self.reference_fft.dim();
        let (th, tw) = target.dim();
        if h != th || w != tw {
            return Err(FrapError::InvalidDimensions {
                width: tw as u32,
                height: th as u32,
            });
        }

        let target_fft = fft2d(&apply_hann(target));
        let cross_power = normalized_cross_power(&self.reference_fft, &target_fft);
        let correlation = ifft2d(&cross_power);
        let (peak_row, peak_col) = find_peak(&correlation);

        // Wrap-around to signed offsets
        let dy = if peak_row > h / 2 {
            peak_row as i64 - h as i64
        } else {
            peak_row as i64
        };
        let dx = if peak_col > w / 2 {
            peak_col as i64 - w as i64
        } else {
            peak_col as i64
        };
        Ok(AlignmentOffset { dx, dy })
    }
}

/// Offset between two frames of equal size.
pub fn compute_offset(reference: &Array2<f32>, target: &Array2<f32>) -> Result<AlignmentOffset> {
    PhaseCorrelator::new(reference).offset_to(target)
}

fn apply_hann(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
        data[[row, col]] * (wy * wx) as f32
    })
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v as f64, 0.0));

    for mut row in result.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        fft_row.process(&mut buf);
        row.iter_mut().zip(buf).for_each(|(d, v)| *d = v);
    }
    for mut col in result.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        fft_col.process(&mut buf);
        col.iter_mut().zip(buf).for_each(|(d, v)| *d = v);
    }

    result
}

/// Inverse 2D FFT, real part, normalized.
fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    for mut col in work.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        ifft_col.process(&mut buf);
        col.iter_mut().zip(buf).for_each(|(d, v)| *d = v);
    }
    for mut row in work.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        ifft_row.process(&mut buf);
        row.iter_mut().zip(buf).for_each(|(d, v)| *d = v);
    }

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = ref_fft.clone();
    result.zip_mut_with(tgt_fft, |r, t| {
        let cross = *r * t.conj();
        let mag = cross.norm();
        *r = if mag > 1e-12 {
            cross / mag
        } else {
            Complex::new(0.0, 0.0)
        };
    });
    result
}

/// Position of the maximum, first in raster order on ties.
fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &v) in data.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (row, col);
        }
    }
    best
}
