use ndarray::Array2;

use crate::consts::OTSU_HISTOGRAM_BINS;

/// Integer histogram of a float image over its own value range.
#[derive(Clone, Debug)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub min: f64,
    pub max: f64,
}

impl Histogram {
    /// Bin `data` into `bins` equal-width bins spanning `[min, max]`.
    pub fn from_array(data: &Array2<f64>, bins: usize) -> Self {
        let bins = bins.max(2);
        let (min, max) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let mut counts = vec![0u64; bins];
        if !min.is_finite() || !max.is_finite() {
            return Self {
                counts,
                min: 0.0,
                max: 0.0,
            };
        }
        let mut histogram = Self { counts, min, max };
        for &v in data.iter() {
            let bin = histogram.bin_of(v);
            histogram.counts[bin] += 1;
        }
        histogram
    }

    /// Bin that `v` is counted in. Values outside `[min, max]` clamp to the
    /// end bins.
    pub fn bin_of(&self, v: f64) -> usize {
        let bins = self.bins();
        if self.max <= self.min || v <= self.min {
            return 0;
        }
        let scaled = (v - self.min) / (self.max - self.min) * bins as f64;
        (scaled as usize).min(bins - 1)
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Upper edge of bin `bin` in data units.
    pub fn upper_edge(&self, bin: usize) -> f64 {
        let width = (self.max - self.min) / self.bins() as f64;
        self.min + width * (bin + 1) as f64
    }
}

/// Otsu's method on a histogram: the bin index that maximizes between-class
/// variance. Pixels in bins `<= index` are background.
pub fn otsu_bin(counts: &[u64]) -> usize {
    let total: f64 = counts.iter().map(|&c| c as f64).sum();
    let sum_all: f64 = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_bg = 0.0_f64;
    let mut sum_bg = 0.0_f64;
    let mut best_variance = 0.0_f64;
    let mut best_bin = 0usize;

    for (i, &count) in counts.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += i as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if between > best_variance {
            best_variance = between;
            best_bin = i;
        }
    }

    best_bin
}

/// Otsu split of a float image.
#[derive(Clone, Debug)]
pub struct OtsuSplit {
    pub histogram: Histogram,
    /// Last background bin.
    pub bin: usize,
}

impl OtsuSplit {
    pub fn new(data: &Array2<f64>) -> Self {
        let histogram = Histogram::from_array(data, OTSU_HISTOGRAM_BINS);
        let bin = otsu_bin(&histogram.counts);
        Self { histogram, bin }
    }

    /// Upper edge of the last background bin, in data units.
    pub fn threshold(&self) -> f64 {
        self.histogram.upper_edge(self.bin)
    }

    /// Foreground test by bin index, so it agrees with the histogram the
    /// split was computed on even for values lying exactly on a bin edge.
    pub fn is_foreground(&self, v: f64) -> bool {
        self.histogram.bin_of(v) > self.bin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_histogram_splits_between_modes() {
        let mut counts = vec![0u64; 10];
        counts[1] = 50;
        counts[2] = 30;
        counts[7] = 40;
        counts[8] = 60;
        let bin = otsu_bin(&counts);
        assert!((2..7).contains(&bin), "bin={bin}");
    }

    #[test]
    fn edge_value_follows_its_bin() {
        // Range [0, 4] in 4 bins puts 1.0 exactly on the edge between bins 0 and 1.
        let data = Array2::from_shape_vec((1, 4), vec![0.0, 1.0, 3.0, 4.0]).unwrap();
        let h = Histogram::from_array(&data, 4);
        assert_eq!(h.upper_edge(0), 1.0);
        assert_eq!(h.bin_of(1.0), 1);

        let split = OtsuSplit {
            histogram: h,
            bin: 0,
        };
        assert_eq!(split.threshold(), 1.0);
        assert!(split.is_foreground(1.0));
        assert!(!split.is_foreground(0.0));
    }

    #[test]
    fn flat_image_has_no_foreground() {
        let data = Array2::from_elem((3, 3), 5.0);
        let split = OtsuSplit::new(&data);
        assert!(!split.is_foreground(5.0));
    }

    #[test]
    fn flat_image_has_single_bin() {
        let data = Array2::from_elem((4, 4), 3.0);
        let h = Histogram::from_array(&data, 16);
        assert_eq!(h.counts[0], 16);
    }
}
