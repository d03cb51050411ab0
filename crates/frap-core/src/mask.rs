use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detection::threshold::OtsuSplit;
use crate::frame::Stack;
use crate::trace::SampleReader;

/// How frames are collapsed before thresholding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Per-pixel maximum over time. Keeps bleached pixels in the foreground.
    #[default]
    Max,
    /// Per-pixel mean over time.
    Average,
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "Max"),
            Self::Average => write!(f, "Average"),
        }
    }
}

/// Binary foreground mask of a stack and the values it was derived from.
#[derive(Clone, Debug)]
pub struct ForegroundMask {
    pub mask: Array2<bool>,
    pub threshold: f64,
    pub projection: Array2<f64>,
}

impl ForegroundMask {
    pub fn pixel_count(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }
}

/// Collapse the time axis of `stack` into a single image.
pub fn project(stack: &Stack, projection: Projection) -> Array2<f64> {
    let reader = SampleReader::new(stack);
    let frames = stack.frame_count();
    let values: Vec<f64> = (0..stack.pixel_count())
        .into_par_iter()
        .map(|p| {
            let samples = (0..frames).map(|f| reader.sample(f, p));
            match projection {
                Projection::Max => samples.fold(f64::NEG_INFINITY, f64::max),
                Projection::Average => samples.sum::<f64>() / frames as f64,
            }
        })
        .collect();
    Array2::from_shape_vec((stack.height(), stack.width()), values)
        .expect("projection length matches dimensions")
}

/// Foreground mask from an Otsu threshold of the projected stack.
pub fn build_foreground_mask(stack: &Stack, projection: Projection) -> ForegroundMask {
    let projected = project(stack, projection);
    let split = OtsuSplit::new(&projected);
    ForegroundMask {
        mask: projected.mapv(|v| split.is_foreground(v)),
        threshold: split.threshold(),
        projection: projected,
    }
}
