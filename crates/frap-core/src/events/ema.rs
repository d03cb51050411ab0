use crate::consts::EMA_WEIGHT_FRACTION;

use super::Detection;

/// Online change-point detector that runs an exponentially weighted mean and
/// variance backwards in time and flags the first significant upward jump,
/// which is a forward-in-time intensity drop.
///
/// The weighted variance can shrink well below the noise level on a short
/// quiet stretch, so the score is taken against the larger of it and a plain
/// sample variance of the spin-up samples, scaled to the same innovation
/// units. A trace whose reference variance is zero never scores.
#[derive(Clone, Debug)]
pub struct EmaDetector {
    alpha: f64,
    spin_up: usize,
    threshold_sq: f64,
}

impl EmaDetector {
    /// `window` is the number of observations that carry 99.9% of the weight.
    pub fn new(window: usize, score_threshold: f64) -> Self {
        let k = window.max(1);
        Self {
            alpha: ema_alpha(k),
            spin_up: k.max(2),
            threshold_sq: score_threshold * score_threshold,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn detect(&self, trace: &[f64]) -> Option<Detection> {
        let n = trace.len();
        if n < 3 {
            return None;
        }

        let mut ema = trace[n - 1];
        let mut var = 0.0_f64;
        let mut floor = SpinUpVariance::default();
        // An innovation `x - ema` has variance sigma^2 * 2 / (2 - alpha).
        let inflation = 2.0 / (2.0 - self.alpha);

        for i in 0..n {
            let idx = n - 1 - i;
            if i < self.spin_up {
                floor.push(trace[idx]);
            }
            let delta = trace[idx] - ema;
            let delta2 = delta * delta;

            if i >= self.spin_up && delta > 0.0 {
                let reference = var.max(inflation * floor.variance());
                if reference > 0.0 {
                    let score = delta2 / reference;
                    if score > self.threshold_sq {
                        return Some(Detection {
                            frame: idx + 1,
                            magnitude: score.sqrt(),
                        });
                    }
                }
            }

            ema += self.alpha * delta;
            var = (1.0 - self.alpha) * (var + self.alpha * delta2);
        }

        None
    }
}

/// Welford accumulator over the samples seen during spin-up.
#[derive(Default)]
struct SpinUpVariance {
    count: usize,
    mean: f64,
    m2: f64,
}

impl SpinUpVariance {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let d = x - self.mean;
        self.mean += d / self.count as f64;
        self.m2 += d * (x - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

/// Smoothing factor such that the first `k` observations carry
/// `EMA_WEIGHT_FRACTION` of the total weight.
pub fn ema_alpha(k: usize) -> f64 {
    1.0 - ((1.0 - EMA_WEIGHT_FRACTION).ln() / k.max(1) as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_concentrates_weight_in_window() {
        let k = 20;
        let alpha = ema_alpha(k);
        let tail = (1.0 - alpha).powi(k as i32);
        assert!((tail - 0.001).abs() < 1e-9, "tail weight {tail}");
    }

    #[test]
    fn flat_trace_has_no_event() {
        let detector = EmaDetector::new(5, 3.0);
        assert!(detector.detect(&[7.0; 30]).is_none());
    }

    #[test]
    fn upward_step_is_ignored() {
        let mut trace = vec![10.0; 15];
        trace.extend(vec![50.0; 15]);
        let detector = EmaDetector::new(5, 3.0);
        assert!(detector.detect(&trace).is_none());
    }

    fn jitter(i: usize) -> f64 {
        if i % 2 == 0 {
            0.5
        } else {
            -0.5
        }
    }

    #[test]
    fn clean_drop_is_found() {
        let trace: Vec<f64> = (0..30)
            .map(|i| if i < 12 { 100.0 } else { 20.0 } + jitter(i))
            .collect();
        let detector = EmaDetector::new(5, 3.0);
        let event = detector.detect(&trace).unwrap();
        assert_eq!(event.frame, 12);
    }

    #[test]
    fn noise_free_tail_never_scores() {
        let mut trace = vec![101.0];
        trace.extend(vec![100.0; 20]);
        assert!(EmaDetector::new(10, 4.0).detect(&trace).is_none());

        let mut trace = vec![100.0; 12];
        trace.extend(vec![20.0; 18]);
        assert!(EmaDetector::new(5, 3.0).detect(&trace).is_none());
    }

    #[test]
    fn spin_up_variance_matches_sample_variance() {
        let mut acc = SpinUpVariance::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.push(x);
        }
        assert!((acc.variance() - 32.0 / 7.0).abs() < 1e-12);
    }
}
