use std::path::PathBuf;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{FrapError, Result};

/// Spatial and temporal calibration of a stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Edge length of one pixel in `distance_unit`.
    pub pixel_size: f64,
    pub distance_unit: String,
    /// Time between consecutive frames in `time_unit`.
    pub frame_interval: f64,
    pub time_unit: String,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixel_size: 1.0,
            distance_unit: "pixel".into(),
            frame_interval: 1.0,
            time_unit: "frame".into(),
        }
    }
}

impl Calibration {
    /// Calibrated area of `pixels` pixels.
    pub fn area(&self, pixels: usize) -> f64 {
        pixels as f64 * self.pixel_size * self.pixel_size
    }

    /// Calibrated time of frame `index`.
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 * self.frame_interval
    }
}

/// Numeric type of the raw samples in a stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    U8,
    U16,
    F32,
}

impl PixelType {
    pub fn bit_depth(&self) -> u8 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::F32 => 32,
        }
    }
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit unsigned"),
            Self::U16 => write!(f, "16-bit unsigned"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}

/// Raw samples of every frame, frame-major then row-major.
#[derive(Clone, Debug, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            Self::U8(_) => PixelType::U8,
            Self::U16(_) => PixelType::U16,
            Self::F32(_) => PixelType::F32,
        }
    }
}

/// An immutable time-lapse stack of `frames` images of `height` x `width`.
#[derive(Clone, Debug)]
pub struct Stack {
    width: usize,
    height: usize,
    frames: usize,
    samples: Samples,
    pub calibration: Calibration,
}

impl Stack {
    pub fn new(
        width: usize,
        height: usize,
        frames: usize,
        samples: Samples,
        calibration: Calibration,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FrapError::InvalidDimensions {
                width: width as u32,
                height: height as u32,
            });
        }
        if frames == 0 {
            return Err(FrapError::EmptySequence);
        }
        let expected = width * height * frames;
        if samples.len() != expected {
            return Err(FrapError::UnsupportedPixelFormat(format!(
                "expected {expected} samples for {width}x{height}x{frames}, got {}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            frames,
            samples,
            calibration,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn pixel_type(&self) -> PixelType {
        self.samples.pixel_type()
    }

    /// Copy one frame out as an `f32` array of shape (height, width).
    pub fn frame_array(&self, index: usize) -> Array2<f32> {
        assert!(index < self.frames, "frame {index} out of range");
        let n = self.pixel_count();
        let start = index * n;
        let values: Vec<f32> = match &self.samples {
            Samples::U8(v) => v[start..start + n].iter().map(|&s| s as f32).collect(),
            Samples::U16(v) => v[start..start + n].iter().map(|&s| s as f32).collect(),
            Samples::F32(v) => v[start..start + n].to_vec(),
        };
        Array2::from_shape_vec((self.height, self.width), values)
            .expect("frame length matches dimensions")
    }
}

/// Integer translation of a frame relative to the reference frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignmentOffset {
    pub dx: i64,
    pub dy: i64,
}

/// Metadata about the source of a stack.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub total_frames: usize,
    pub width: u32,
    pub height: u32,
    pub pixel_type: PixelType,
    pub observer: Option<String>,
    pub instrument: Option<String>,
}
