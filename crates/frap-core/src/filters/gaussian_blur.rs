use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Apply a Gaussian blur to a score map using separable 1D convolution with
/// clamped (edge-replicating) boundaries.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let rows = convolve_rows(data, &kernel);
    convolve_rows(&rows.t().to_owned(), &kernel).t().to_owned()
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as isize;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|x| (-(x * x) as f32 / s2).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

fn convolve_line(src: &[f32], dst: &mut [f32], kernel: &[f32]) {
    let n = src.len() as isize;
    let radius = (kernel.len() / 2) as isize;
    for (i, out) in dst.iter_mut().enumerate() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, &kv)| {
                let j = (i as isize + k as isize - radius).clamp(0, n - 1);
                src[j as usize] * kv
            })
            .sum();
    }
}

fn filter_row(src: ArrayView1<f32>, mut dst: ArrayViewMut1<f32>, kernel: &[f32]) {
    let src = src.to_vec();
    let mut out = vec![0.0f32; src.len()];
    convolve_line(&src, &mut out, kernel);
    dst.iter_mut().zip(out).for_each(|(d, v)| *d = v);
}

fn convolve_rows(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let mut result = Array2::<f32>::zeros(data.dim());

    if data.len() >= PARALLEL_PIXEL_THRESHOLD {
        data.axis_iter(Axis(0))
            .into_par_iter()
            .zip(result.axis_iter_mut(Axis(0)).into_par_iter())
            .for_each(|(src, dst)| filter_row(src, dst, kernel));
    } else {
        data.axis_iter(Axis(0))
            .zip(result.axis_iter_mut(Axis(0)))
            .for_each(|(src, dst)| filter_row(src, dst, kernel));
    }
    result
}
