use crate::consts::{CLOSING_RADIUS, SPECKLE_EROSION_RADIUS};
use crate::detection::components::connected_components;
use crate::detection::morphology::{closing, erode, fill_holes};
use crate::events::EventMap;

use super::{Candidate, SegmentParams};

/// Candidate regions for one frame from the binary map of that frame's events.
///
/// Steps: rasterize -> 3x3 closing -> 5x5 erosion (speckle removal) ->
/// optional hole filling -> connected components with size filter.
pub fn frame_candidates(events: &EventMap, frame: usize, params: &SegmentParams) -> Vec<Candidate> {
    let raster = events.frame_mask(frame);
    let closed = closing(&raster, CLOSING_RADIUS);
    let mut cleaned = erode(&closed, SPECKLE_EROSION_RADIUS);
    if params.fill_holes {
        cleaned = fill_holes(&cleaned);
    }

    connected_components(&cleaned, params.min_region_size)
        .into_iter()
        .map(|c| Candidate {
            frame,
            pixels: c.pixels,
        })
        .collect()
}
