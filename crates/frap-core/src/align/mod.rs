pub mod phase_correlation;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::{FrapError, Result};
use crate::frame::{AlignmentOffset, Samples, Stack};

pub use phase_correlation::{compute_offset, PhaseCorrelator};

/// Pixel rectangle of the source frames kept after alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// A drift-corrected stack and the per-frame offsets that produced it.
#[derive(Clone, Debug)]
pub struct AlignedStack {
    pub stack: Stack,
    /// One offset per frame; frame 0 is the reference and always zero.
    pub offsets: Vec<AlignmentOffset>,
    /// Region of the reference frame covered by every shifted frame.
    pub crop: CropRect,
}

/// Area covered by every frame once shifted by its offset.
pub fn common_overlap(width: usize, height: usize, offsets: &[AlignmentOffset]) -> Option<CropRect> {
    let max_dx = offsets.iter().map(|o| o.dx).max().unwrap_or(0);
    let min_dx = offsets.iter().map(|o| o.dx).min().unwrap_or(0);
    let max_dy = offsets.iter().map(|o| o.dy).max().unwrap_or(0);
    let min_dy = offsets.iter().map(|o| o.dy).min().unwrap_or(0);

    let col_lo = max_dx.max(0);
    let col_hi = (width as i64 + min_dx.min(0)).min(width as i64);
    let row_lo = max_dy.max(0);
    let row_hi = (height as i64 + min_dy.min(0)).min(height as i64);
    if col_hi <= col_lo || row_hi <= row_lo {
        return None;
    }
    Some(CropRect {
        x: col_lo as usize,
        y: row_lo as usize,
        width: (col_hi - col_lo) as usize,
        height: (row_hi - row_lo) as usize,
    })
}

fn shift_and_crop<T: Copy>(
    src: &[T],
    width: usize,
    height: usize,
    offsets: &[AlignmentOffset],
    crop: CropRect,
) -> Vec<T> {
    let frame_len = width * height;
    let mut out = Vec::with_capacity(crop.width * crop.height * offsets.len());
    for (f, offset) in offsets.iter().enumerate() {
        let frame = &src[f * frame_len..(f + 1) * frame_len];
        for row in crop.y..crop.y + crop.height {
            let src_row = (row as i64 - offset.dy) as usize;
            let start = src_row * width + (crop.x as i64 - offset.dx) as usize;
            out.extend_from_slice(&frame[start..start + crop.width]);
        }
    }
    out
}

/// Register every frame to frame 0 by whole-pixel phase correlation, shift
/// the frames and crop the stack to their common overlap.
pub fn align_stack(stack: &Stack, cancel: &CancellationToken) -> Result<AlignedStack> {
    let (width, height) = (stack.width(), stack.height());
    let correlator = PhaseCorrelator::new(&stack.frame_array(0));

    let mut offsets = vec![AlignmentOffset::default()];
    let rest: Vec<AlignmentOffset> = (1..stack.frame_count())
        .into_par_iter()
        .map(|i| {
            cancel.check()?;
            correlator.offset_to(&stack.frame_array(i))
        })
        .collect::<Result<_>>()?;
    offsets.extend(rest);

    let crop = common_overlap(width, height, &offsets).ok_or(FrapError::InvalidDimensions {
        width: 0,
        height: 0,
    })?;
    for (i, o) in offsets.iter().enumerate().filter(|(_, o)| o.dx != 0 || o.dy != 0) {
        debug!(frame = i, dx = o.dx, dy = o.dy, "Frame drift");
    }

    let samples = match stack.samples() {
        Samples::U8(v) => Samples::U8(shift_and_crop(v, width, height, &offsets, crop)),
        Samples::U16(v) => Samples::U16(shift_and_crop(v, width, height, &offsets, crop)),
        Samples::F32(v) => Samples::F32(shift_and_crop(v, width, height, &offsets, crop)),
    };
    let aligned = Stack::new(
        crop.width,
        crop.height,
        stack.frame_count(),
        samples,
        stack.calibration.clone(),
    )?;

    info!(
        width = crop.width,
        height = crop.height,
        x = crop.x,
        y = crop.y,
        "Stack aligned and cropped"
    );
    Ok(AlignedStack {
        stack: aligned,
        offsets,
        crop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_of_opposite_shifts() {
        let offsets = [
            AlignmentOffset::default(),
            AlignmentOffset { dx: 2, dy: -1 },
            AlignmentOffset { dx: -3, dy: 0 },
        ];
        let crop = common_overlap(20, 10, &offsets).unwrap();
        assert_eq!(
            crop,
            CropRect {
                x: 2,
                y: 0,
                width: 15,
                height: 9
            }
        );
    }

    #[test]
    fn no_overlap_is_none() {
        let offsets = [AlignmentOffset::default(), AlignmentOffset { dx: 12, dy: 0 }];
        assert!(common_overlap(10, 10, &offsets).is_none());
    }
}
