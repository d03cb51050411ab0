pub mod circular;
pub mod morphological;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::consts::{MAX_BORDER, MAX_REGIONS};
use crate::detection::morphology::dilate;
use crate::error::{FrapError, Result};
use crate::events::EventMap;

/// Segmentation settings, taken from the analysis configuration.
#[derive(Clone, Debug)]
pub struct SegmentParams {
    pub min_region_size: usize,
    pub score_threshold: f64,
    pub circular: bool,
    pub fill_holes: bool,
    pub bleached_border: usize,
}

/// Footprint proposed for one frame, before global numbering.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub frame: usize,
    pub pixels: Vec<usize>,
}

/// A bleached region. Created once per analysis and immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Label in `1..=N`.
    pub id: u8,
    /// First frame after the bleach.
    pub bleach_frame: usize,
    /// Flat (row-major) pixel indices in raster order.
    pub pixels: Vec<usize>,
    /// Geometric centroid as (row, col).
    pub centroid: (f64, f64),
}

impl Region {
    pub fn size(&self) -> usize {
        self.pixels.len()
    }
}

/// One label per pixel: 0 = background, `1..=N` = region id,
/// `N + 1` = foreground that was never bleached.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionLabelMask {
    labels: Array2<u8>,
    region_count: usize,
}

impl RegionLabelMask {
    pub fn labels(&self) -> &Array2<u8> {
        &self.labels
    }

    pub fn region_count(&self) -> usize {
        self.region_count
    }

    /// Label of the unbleached reference foreground.
    pub fn foreground_label(&self) -> u8 {
        (self.region_count + 1) as u8
    }

    /// Pixel count of every label `0..=N+1`.
    pub fn label_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.region_count + 2];
        for &l in self.labels.iter() {
            counts[l as usize] += 1;
        }
        counts
    }

    /// Flat pixel indices grouped by label, index `l` holds label `l`.
    pub fn pixels_by_label(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.region_count + 2];
        for (i, &l) in self.labels.iter().enumerate() {
            groups[l as usize].push(i);
        }
        groups
    }
}

/// Result of segmentation: the numbered regions and their label mask.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub regions: Vec<Region>,
    pub label_mask: RegionLabelMask,
}

/// Turn per-frame event maps into a fixed, numbered set of regions.
///
/// Frames are segmented in parallel; ids are then assigned sequentially in
/// frame order so numbering is deterministic.
pub fn segment_regions(
    events: &EventMap,
    foreground: &Array2<bool>,
    params: &SegmentParams,
    cancel: &CancellationToken,
) -> Result<Segmentation> {
    let frames = events.event_frames();
    let per_frame: Vec<Vec<Candidate>> = frames
        .par_iter()
        .map(|&frame| {
            cancel.check()?;
            Ok(if params.circular {
                circular::frame_candidates(events, frame, params)
            } else {
                morphological::frame_candidates(events, frame, params)
            })
        })
        .collect::<Result<_>>()?;

    let candidates: Vec<Candidate> = per_frame.into_iter().flatten().collect();
    debug!(
        frames = frames.len(),
        candidates = candidates.len(),
        "Per-frame segmentation complete"
    );

    let regions = number_regions(candidates, foreground, params.min_region_size)?;
    let label_mask = build_label_mask(&regions, foreground, params.bleached_border)?;
    info!(regions = regions.len(), "Regions segmented");

    Ok(Segmentation {
        regions,
        label_mask,
    })
}

/// Assign ids `1..=N` to candidates in order. Each candidate keeps only
/// foreground pixels not claimed by an earlier one and is dropped if fewer
/// than `min_size` remain.
pub fn number_regions(
    candidates: Vec<Candidate>,
    foreground: &Array2<bool>,
    min_size: usize,
) -> Result<Vec<Region>> {
    let width = foreground.ncols();
    let fg: Vec<bool> = foreground.iter().copied().collect();
    let mut claimed = vec![false; fg.len()];
    let mut accepted: Vec<(usize, Vec<usize>)> = Vec::new();

    for candidate in candidates {
        let mut pixels: Vec<usize> = candidate
            .pixels
            .into_iter()
            .filter(|&p| fg[p] && !claimed[p])
            .collect();
        pixels.sort_unstable();
        pixels.dedup();
        if pixels.len() < min_size.max(1) {
            continue;
        }
        for &p in &pixels {
            claimed[p] = true;
        }
        accepted.push((candidate.frame, pixels));
    }

    if accepted.len() > MAX_REGIONS {
        return Err(FrapError::TooManyRegions {
            count: accepted.len(),
            max: MAX_REGIONS,
        });
    }

    Ok(accepted
        .into_iter()
        .enumerate()
        .map(|(i, (bleach_frame, pixels))| {
            let n = pixels.len() as f64;
            let (sr, sc) = pixels.iter().fold((0.0, 0.0), |(sr, sc), &p| {
                (sr + (p / width) as f64, sc + (p % width) as f64)
            });
            Region {
                id: (i + 1) as u8,
                bleach_frame,
                pixels,
                centroid: (sr / n, sc / n),
            }
        })
        .collect())
}

/// Paint regions and the remaining foreground into a label mask.
///
/// With `border > 0`, foreground within `min(border, MAX_BORDER)` pixels of any
/// region is moved to background so the reference trace does not mix in
/// partially bleached signal.
pub fn build_label_mask(
    regions: &[Region],
    foreground: &Array2<bool>,
    border: usize,
) -> Result<RegionLabelMask> {
    let (h, w) = foreground.dim();
    let fg_label = (regions.len() + 1) as u8;
    let mut labels = foreground.mapv(|v| if v { fg_label } else { 0 });

    for region in regions {
        for &p in &region.pixels {
            labels[[p / w, p % w]] = region.id;
        }
    }

    let border = border.min(MAX_BORDER);
    if border > 0 && !regions.is_empty() {
        let mut bleached = Array2::from_elem((h, w), false);
        for region in regions {
            for &p in &region.pixels {
                bleached[[p / w, p % w]] = true;
            }
        }
        let halo = dilate(&bleached, border);
        labels.zip_mut_with(&halo, |label, &near| {
            if near && *label == fg_label {
                *label = 0;
            }
        });
    }

    if !labels.iter().any(|&l| l == fg_label) {
        return Err(FrapError::NoReferencePixels);
    }

    Ok(RegionLabelMask {
        labels,
        region_count: regions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_foreground(h: usize, w: usize) -> Array2<bool> {
        Array2::from_elem((h, w), true)
    }

    fn block(w: usize, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Vec<usize> {
        rows.flat_map(|r| cols.clone().map(move |c| r * w + c))
            .collect()
    }

    #[test]
    fn overlapping_candidates_keep_first_claim() {
        let fg = full_foreground(10, 10);
        let candidates = vec![
            Candidate {
                frame: 3,
                pixels: block(10, 0..4, 0..4),
            },
            Candidate {
                frame: 5,
                pixels: block(10, 2..6, 2..6),
            },
        ];
        let regions = number_regions(candidates, &fg, 4).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, 1);
        assert_eq!(regions[0].size(), 16);
        assert_eq!(regions[1].id, 2);
        assert_eq!(regions[1].bleach_frame, 5);
        assert_eq!(regions[1].size(), 12);
    }

    #[test]
    fn too_many_regions_is_an_error() {
        let fg = full_foreground(40, 40);
        let candidates = (0..1600)
            .map(|p| Candidate {
                frame: 1,
                pixels: vec![p],
            })
            .collect();
        let err = number_regions(candidates, &fg, 1).unwrap_err();
        assert!(matches!(err, FrapError::TooManyRegions { count: 1600, .. }));
    }

    #[test]
    fn label_mask_without_reference_is_an_error() {
        let fg = full_foreground(4, 4);
        let regions = number_regions(
            vec![Candidate {
                frame: 1,
                pixels: (0..16).collect(),
            }],
            &fg,
            1,
        )
        .unwrap();
        assert!(matches!(
            build_label_mask(&regions, &fg, 0),
            Err(FrapError::NoReferencePixels)
        ));
    }

    #[test]
    fn border_clears_reference_near_regions() {
        let fg = full_foreground(12, 12);
        let regions = number_regions(
            vec![Candidate {
                frame: 2,
                pixels: block(12, 5..7, 5..7),
            }],
            &fg,
            1,
        )
        .unwrap();
        let mask = build_label_mask(&regions, &fg, 2).unwrap();
        let counts = mask.label_counts();
        assert_eq!(counts[1], 4);
        // 6x6 halo minus the 2x2 region
        assert_eq!(counts[0], 32);
        assert_eq!(counts[2], 144 - 36);
        assert_eq!(mask.foreground_label(), 2);
    }
}
