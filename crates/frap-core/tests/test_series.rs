use approx::assert_relative_eq;
use ndarray::Array2;

use frap_core::cancel::CancellationToken;
use frap_core::error::FrapError;
use frap_core::frame::{Calibration, Samples, Stack};
use frap_core::regions::{build_label_mask, number_regions, Candidate, RegionLabelMask};
use frap_core::series::{aggregate, normalize};

/// 4x4 frames where pixel `p` of frame `f` holds `10·f + p`.
fn ramp_stack(frames: usize) -> Stack {
    let samples: Vec<u16> = (0..frames)
        .flat_map(|f| (0..16).map(move |p| (10 * f + p) as u16))
        .collect();
    Stack::new(4, 4, frames, Samples::U16(samples), Calibration::default()).unwrap()
}

/// Region 1 = pixels {0, 1}, region 2 = {5, 6, 9, 10}; pixel 15 is background.
fn label_mask() -> RegionLabelMask {
    let mut foreground = Array2::from_elem((4, 4), true);
    foreground[[3, 3]] = false;
    let regions = number_regions(
        vec![
            Candidate {
                frame: 2,
                pixels: vec![0, 1],
            },
            Candidate {
                frame: 3,
                pixels: vec![5, 6, 9, 10],
            },
        ],
        &foreground,
        1,
    )
    .unwrap();
    build_label_mask(&regions, &foreground, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn test_region_means_per_frame() {
    for frames in [3, 6] {
        let set = aggregate(&ramp_stack(frames), &label_mask(), &CancellationToken::new()).unwrap();
        assert_eq!(set.regions.len(), 2);
        assert_eq!(set.regions[0].region_id, 1);
        assert_eq!(set.regions[1].region_id, 2);

        for f in 0..frames {
            let base = 10.0 * f as f64;
            assert_relative_eq!(set.regions[0].means[f], base + 0.5);
            assert_relative_eq!(set.regions[1].means[f], base + 7.5);
        }
    }
}

#[test]
fn test_reference_trace_excludes_regions_and_background() {
    let set = aggregate(&ramp_stack(5), &label_mask(), &CancellationToken::new()).unwrap();
    // Remaining foreground: {2,3,4,7,8,11,12,13,14}
    let expected = (2 + 3 + 4 + 7 + 8 + 11 + 12 + 13 + 14) as f64 / 9.0;
    assert_eq!(set.foreground.len(), 5);
    for (f, &v) in set.foreground.iter().enumerate() {
        assert_relative_eq!(v, expected + 10.0 * f as f64, epsilon = 1e-9);
    }
}

#[test]
fn test_label_counts_match_mask() {
    let mask = label_mask();
    assert_eq!(mask.label_counts(), vec![1, 2, 4, 9]);
    let groups = mask.pixels_by_label();
    assert_eq!(groups[0], vec![15]);
    assert_eq!(groups[1], vec![0, 1]);
}

#[test]
fn test_aggregate_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        aggregate(&ramp_stack(6), &label_mask(), &cancel),
        Err(FrapError::Cancelled)
    ));
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn test_normalize_corrects_for_acquisition_bleaching() {
    // Reference loses 10% per frame; region tracks it before the bleach.
    let foreground: Vec<f64> = (0..6).map(|i| 1000.0 * 0.9f64.powi(i)).collect();
    let mut region: Vec<f64> = foreground.iter().map(|v| v * 0.5).collect();
    region[3] *= 0.2;
    region[4] *= 0.6;

    let n = normalize(&region, &foreground, 3);
    assert_relative_eq!(n[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(n[2], 1.0, epsilon = 1e-12);
    assert_relative_eq!(n[3], 0.2, epsilon = 1e-12);
    assert_relative_eq!(n[4], 0.6, epsilon = 1e-12);
    assert_relative_eq!(n[5], 1.0, epsilon = 1e-12);
}

#[test]
fn test_normalize_zero_reference_is_nan() {
    let n = normalize(&[5.0, 5.0, 2.0], &[10.0, 0.0, 10.0], 2);
    assert!(n[1].is_nan());
    // Baseline uses only the finite pre-bleach ratio.
    assert_relative_eq!(n[0], 1.0);
    assert_relative_eq!(n[2], 0.4);
}
