use super::Detection;

/// Single-event detector on the discrete second derivative of a trace.
///
/// A step down between frames `k-1` and `k` produces the Laplacian pair
/// `(-d, +d)` at `(k-1, k)`, so the largest first difference of the Laplacian
/// marks the drop. It is accepted when half of that difference stands out from
/// the remaining Laplacian samples by more than the score threshold. Those
/// samples must have nonzero spread, so a noise-free trace never scores.
#[derive(Clone, Debug)]
pub struct LaplacianDetector {
    threshold_sq: f64,
}

impl LaplacianDetector {
    pub fn new(score_threshold: f64) -> Self {
        Self {
            threshold_sq: score_threshold * score_threshold,
        }
    }

    pub fn detect(&self, trace: &[f64]) -> Option<Detection> {
        let n = trace.len();
        if n < 4 {
            return None;
        }
        let lap = laplacian(trace);

        // Candidate j marks a drop into frame j + 1, which must leave two
        // post-event samples.
        let (best_j, max_delta) = (0..n - 2)
            .map(|j| (j, lap[j + 1] - lap[j]))
            .fold((0, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if max_delta <= 0.0 {
            return None;
        }

        let rest = lap
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != best_j && i != best_j + 1)
            .map(|(_, &v)| v);
        let (mean, variance) = mean_variance(rest);
        if variance <= 0.0 {
            return None;
        }
        let centered = 0.5 * max_delta - mean;
        let score = centered * centered / variance;

        (score > self.threshold_sq).then(|| Detection {
            frame: best_j + 1,
            magnitude: score.sqrt(),
        })
    }
}

/// Discrete Laplacian with kernel `[1, -2, 1]` and mirrored boundaries.
pub fn laplacian(trace: &[f64]) -> Vec<f64> {
    let n = trace.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| {
            let prev = if i == 0 { trace[1] } else { trace[i - 1] };
            let next = if i == n - 1 { trace[n - 2] } else { trace[i + 1] };
            prev - 2.0 * trace[i] + next
        })
        .collect()
}

fn mean_variance(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        count += 1;
        sum += v;
        sum_sq += v * v;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    (mean, (sum_sq / count as f64 - mean * mean).max(0.0))
}
