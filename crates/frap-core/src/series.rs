use rayon::prelude::*;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::Result;
use crate::frame::Stack;
use crate::regions::RegionLabelMask;
use crate::trace::SampleReader;

/// Mean intensity of one region in every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionTimeSeries {
    pub region_id: u8,
    pub means: Vec<f64>,
}

/// Per-region means plus the never-bleached foreground reference trace.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesSet {
    pub regions: Vec<RegionTimeSeries>,
    pub foreground: Vec<f64>,
}

/// Per-label sums of one frame.
fn frame_sums(reader: &SampleReader<'_>, labels: &[u8], frame: usize, bins: usize) -> Vec<f64> {
    let mut sums = vec![0.0f64; bins];
    for (pixel, &label) in labels.iter().enumerate() {
        if label != 0 {
            sums[label as usize] += reader.sample(frame, pixel);
        }
    }
    sums
}

/// Mean intensity per label per frame.
///
/// Pixel counts are taken once from the mask; frames are summed in parallel
/// and the per-frame sums are transposed into one trace per label.
pub fn aggregate(
    stack: &Stack,
    mask: &RegionLabelMask,
    cancel: &CancellationToken,
) -> Result<TimeSeriesSet> {
    assert_eq!(
        mask.labels().dim(),
        (stack.height(), stack.width()),
        "label mask does not match stack dimensions"
    );
    let reader = SampleReader::new(stack);
    let labels: Vec<u8> = mask.labels().iter().copied().collect();
    let counts = mask.label_counts();
    let bins = counts.len();
    let frames = stack.frame_count();

    let per_frame: Vec<Vec<f64>> = if frames >= PARALLEL_FRAME_THRESHOLD {
        (0..frames)
            .into_par_iter()
            .map(|f| {
                cancel.check()?;
                Ok(frame_sums(&reader, &labels, f, bins))
            })
            .collect::<Result<_>>()?
    } else {
        (0..frames)
            .map(|f| {
                cancel.check()?;
                Ok(frame_sums(&reader, &labels, f, bins))
            })
            .collect::<Result<_>>()?
    };

    let trace_of = |label: usize| -> Vec<f64> {
        let n = counts[label].max(1) as f64;
        per_frame.iter().map(|sums| sums[label] / n).collect()
    };

    let regions: Vec<RegionTimeSeries> = (1..=mask.region_count())
        .map(|id| RegionTimeSeries {
            region_id: id as u8,
            means: trace_of(id),
        })
        .collect();
    let foreground = trace_of(mask.foreground_label() as usize);

    debug!(regions = regions.len(), frames, "Region time series aggregated");
    Ok(TimeSeriesSet {
        regions,
        foreground,
    })
}

/// Region intensity relative to the reference, normalized to its pre-bleach mean.
///
/// Frames where the reference is zero yield `NaN`. With no pre-bleach frames
/// the ratio itself is returned.
pub fn normalize(region: &[f64], foreground: &[f64], bleach_frame: usize) -> Vec<f64> {
    assert_eq!(region.len(), foreground.len(), "trace lengths differ");
    let ratio: Vec<f64> = region
        .iter()
        .zip(foreground)
        .map(|(&r, &f)| if f != 0.0 { r / f } else { f64::NAN })
        .collect();

    let pre = &ratio[..bleach_frame.min(ratio.len())];
    let finite: Vec<f64> = pre.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return ratio;
    }
    let baseline = finite.iter().sum::<f64>() / finite.len() as f64;
    if baseline == 0.0 {
        return ratio;
    }
    ratio.into_iter().map(|v| v / baseline).collect()
}
