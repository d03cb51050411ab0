use std::f64::consts::PI;

use ndarray::Array2;

use crate::consts::SCORE_BLUR_SIGMA;
use crate::events::EventMap;
use crate::filters::gaussian_blur::gaussian_blur_array;

use super::{Candidate, SegmentParams};

/// A local maximum of the smoothed score map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScorePeak {
    pub row: usize,
    pub col: usize,
    pub score: f32,
}

/// Disk-shaped candidate regions for one frame.
///
/// The frame's event scores are smoothed, peaks above the score threshold are
/// kept with a minimum separation, and each peak gets the largest radius whose
/// radial mean score still exceeds the threshold.
pub fn frame_candidates(events: &EventMap, frame: usize, params: &SegmentParams) -> Vec<Candidate> {
    let scores = gaussian_blur_array(&events.score_map(frame), SCORE_BLUR_SIGMA);
    let threshold = params.score_threshold as f32;
    let min_radius = min_separation(params.min_region_size);

    find_peaks(&scores, threshold, min_radius)
        .into_iter()
        .filter_map(|peak| {
            let radius = fit_radius(&scores, peak, threshold);
            let pixels = disk_pixels(scores.dim(), peak, radius);
            (pixels.len() >= params.min_region_size).then_some(Candidate { frame, pixels })
        })
        .collect()
}

/// Minimum peak separation: the radius of a disk of `min_region_size` pixels,
/// but never below 2.
pub fn min_separation(min_region_size: usize) -> f64 {
    (min_region_size as f64 / PI).sqrt().max(2.0)
}

/// Local maxima above `threshold`, strongest first, with non-maximum
/// suppression inside `min_radius`.
pub fn find_peaks(scores: &Array2<f32>, threshold: f32, min_radius: f64) -> Vec<ScorePeak> {
    let (h, w) = scores.dim();
    let reach = min_radius.ceil() as isize;

    let mut peaks = Vec::new();
    for row in 0..h {
        for col in 0..w {
            let v = scores[[row, col]];
            if v <= threshold {
                continue;
            }
            let mut is_max = true;
            'window: for dr in -reach..=reach {
                for dc in -reach..=reach {
                    let (nr, nc) = (row as isize + dr, col as isize + dc);
                    if (dr == 0 && dc == 0) || nr < 0 || nc < 0 || nr >= h as isize || nc >= w as isize
                    {
                        continue;
                    }
                    let other = scores[[nr as usize, nc as usize]];
                    // Ties go to the earlier pixel in raster order.
                    let earlier = (dr, dc) < (0, 0);
                    if other > v || (earlier && other == v) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                peaks.push(ScorePeak { row, col, score: v });
            }
        }
    }

    peaks.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<ScorePeak> = Vec::with_capacity(peaks.len());
    for peak in peaks {
        let clear = kept.iter().all(|k| {
            let dr = k.row as f64 - peak.row as f64;
            let dc = k.col as f64 - peak.col as f64;
            (dr * dr + dc * dc).sqrt() >= min_radius
        });
        if clear {
            kept.push(peak);
        }
    }
    kept
}

/// Radius of the disk around `peak` whose radial mean stays above `threshold`.
pub fn fit_radius(scores: &Array2<f32>, peak: ScorePeak, threshold: f32) -> usize {
    let (h, w) = scores.dim();
    let limit = h.max(w);
    let mut window = 2 * march_radius(scores, peak, threshold) + 2;

    loop {
        let profile = radial_mean(scores, peak, window);
        let last_above = profile
            .iter()
            .position(|&m| m <= threshold as f64)
            .map(|first_below| first_below.saturating_sub(1))
            .unwrap_or(profile.len() - 1);

        if last_above + 1 < profile.len() || window >= limit {
            return last_above;
        }
        window *= 2;
    }
}

/// Initial radius: average distance reached along the four axis directions
/// before the score drops to the threshold.
fn march_radius(scores: &Array2<f32>, peak: ScorePeak, threshold: f32) -> usize {
    let (h, w) = scores.dim();
    let directions: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    let total: usize = directions
        .iter()
        .map(|&(dr, dc)| {
            let mut steps = 0usize;
            loop {
                let nr = peak.row as isize + dr * (steps as isize + 1);
                let nc = peak.col as isize + dc * (steps as isize + 1);
                if nr < 0 || nc < 0 || nr >= h as isize || nc >= w as isize {
                    break;
                }
                if scores[[nr as usize, nc as usize]] <= threshold {
                    break;
                }
                steps += 1;
            }
            steps
        })
        .sum();
    total.div_ceil(4)
}

/// Mean score per integer radial bin `0..=window` around `peak`.
fn radial_mean(scores: &Array2<f32>, peak: ScorePeak, window: usize) -> Vec<f64> {
    let (h, w) = scores.dim();
    let mut sums = vec![0.0f64; window + 1];
    let mut counts = vec![0usize; window + 1];

    let row_lo = peak.row.saturating_sub(window);
    let row_hi = (peak.row + window).min(h - 1);
    let col_lo = peak.col.saturating_sub(window);
    let col_hi = (peak.col + window).min(w - 1);

    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            let dr = row as f64 - peak.row as f64;
            let dc = col as f64 - peak.col as f64;
            let bin = (dr * dr + dc * dc).sqrt().round() as usize;
            if bin <= window {
                sums[bin] += scores[[row, col]] as f64;
                counts[bin] += 1;
            }
        }
    }

    sums.iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect()
}

/// Flat indices of pixels within `radius + 0.5` of `peak`.
pub fn disk_pixels(dim: (usize, usize), peak: ScorePeak, radius: usize) -> Vec<usize> {
    let (h, w) = dim;
    let reach = radius as f64 + 0.5;
    let mut pixels = Vec::new();
    for row in peak.row.saturating_sub(radius)..=(peak.row + radius).min(h - 1) {
        for col in peak.col.saturating_sub(radius)..=(peak.col + radius).min(w - 1) {
            let dr = row as f64 - peak.row as f64;
            let dc = col as f64 - peak.col as f64;
            if (dr * dr + dc * dc).sqrt() <= reach {
                pixels.push(row * w + col);
            }
        }
    }
    pixels
}
