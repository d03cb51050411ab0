pub mod ema;
pub mod laplacian;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::frame::Stack;
use crate::trace::SampleReader;

pub use ema::EmaDetector;
pub use laplacian::LaplacianDetector;

/// Frame and standard score of the drop found in one trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// First frame after the drop.
    pub frame: usize,
    /// Standard score at acceptance, `>= 0`.
    pub magnitude: f64,
}

/// A detected bleach event at one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BleachEvent {
    pub pixel: usize,
    pub frame: usize,
    pub magnitude: f64,
}

/// Which change-point strategy scans the pixel traces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorKind {
    /// Reverse exponential moving average.
    #[default]
    Ema,
    /// Largest jump of the discrete Laplacian.
    Laplacian,
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ema => write!(f, "Reverse EMA"),
            Self::Laplacian => write!(f, "Laplacian"),
        }
    }
}

/// A configured event detector.
#[derive(Clone, Debug)]
pub enum EventDetector {
    Ema(EmaDetector),
    Laplacian(LaplacianDetector),
}

impl EventDetector {
    pub fn new(kind: DetectorKind, score_threshold: f64, ema_window: usize) -> Self {
        match kind {
            DetectorKind::Ema => Self::Ema(EmaDetector::new(ema_window, score_threshold)),
            DetectorKind::Laplacian => Self::Laplacian(LaplacianDetector::new(score_threshold)),
        }
    }

    /// At most one bleach event in `trace`.
    pub fn detect(&self, trace: &[f64]) -> Option<Detection> {
        match self {
            Self::Ema(d) => d.detect(trace),
            Self::Laplacian(d) => d.detect(trace),
        }
    }
}

/// Per-pixel detection results for one stack.
#[derive(Clone, Debug)]
pub struct EventMap {
    width: usize,
    height: usize,
    detections: Vec<Option<Detection>>,
}

impl EventMap {
    /// Build a map from per-pixel detections in raster order.
    pub fn from_detections(width: usize, height: usize, detections: Vec<Option<Detection>>) -> Self {
        assert_eq!(
            detections.len(),
            width * height,
            "detection count does not match dimensions"
        );
        Self {
            width,
            height,
            detections,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, pixel: usize) -> Option<Detection> {
        self.detections[pixel]
    }

    /// All events in pixel order.
    pub fn events(&self) -> impl Iterator<Item = BleachEvent> + '_ {
        self.detections.iter().enumerate().filter_map(|(pixel, d)| {
            d.map(|d| BleachEvent {
                pixel,
                frame: d.frame,
                magnitude: d.magnitude,
            })
        })
    }

    pub fn event_count(&self) -> usize {
        self.detections.iter().filter(|d| d.is_some()).count()
    }

    /// Distinct event frames in ascending order.
    pub fn event_frames(&self) -> Vec<usize> {
        let mut frames: Vec<usize> = self.events().map(|e| e.frame).collect();
        frames.sort_unstable();
        frames.dedup();
        frames
    }

    /// Binary image of pixels whose event happened at `frame`.
    pub fn frame_mask(&self, frame: usize) -> Array2<bool> {
        Array2::from_shape_fn((self.height, self.width), |(row, col)| {
            matches!(self.detections[row * self.width + col], Some(d) if d.frame == frame)
        })
    }

    /// Event magnitudes of pixels whose event happened at `frame`, zero elsewhere.
    pub fn score_map(&self, frame: usize) -> Array2<f32> {
        Array2::from_shape_fn((self.height, self.width), |(row, col)| {
            match self.detections[row * self.width + col] {
                Some(d) if d.frame == frame => d.magnitude.min(f32::MAX as f64) as f32,
                _ => 0.0,
            }
        })
    }
}

/// Scan every foreground pixel's trace for a bleach event.
///
/// Pixels are processed in parallel; each writes only its own slot, and the
/// cancellation token is polled once per pixel.
pub fn detect_events(
    stack: &Stack,
    foreground: &Array2<bool>,
    detector: &EventDetector,
    cancel: &CancellationToken,
) -> Result<EventMap> {
    assert_eq!(
        foreground.dim(),
        (stack.height(), stack.width()),
        "foreground mask does not match stack dimensions"
    );
    let reader = SampleReader::new(stack);
    let flags: Vec<bool> = foreground.iter().copied().collect();

    let detections: Vec<Option<Detection>> = flags
        .par_iter()
        .enumerate()
        .map(|(pixel, &is_foreground)| {
            cancel.check()?;
            if !is_foreground {
                return Ok(None);
            }
            Ok(detector.detect(&reader.trace(pixel)))
        })
        .collect::<Result<_>>()?;

    let map = EventMap {
        width: stack.width(),
        height: stack.height(),
        detections,
    };
    debug!(events = map.event_count(), "Bleach event scan complete");
    Ok(map)
}
