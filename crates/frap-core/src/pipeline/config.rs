use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_DIFFUSION_COEFFICIENT, DEFAULT_EMA_WINDOW, DEFAULT_MIN_REGION_SIZE,
    DEFAULT_SCORE_THRESHOLD, MAX_BORDER,
};
use crate::events::{DetectorKind, EventDetector};
use crate::frame::Calibration;
use crate::kinetics::{KineticsSettings, LmConfig};
use crate::mask::Projection;
use crate::regions::SegmentParams;

/// Options of one FRAP analysis. Immutable once the run starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Smallest region kept, in pixels.
    pub min_region_size: usize,
    /// Standard score a drop must exceed to count as a bleach event.
    pub score_threshold: f64,
    /// Effective window of the reverse EMA detector, in frames.
    pub ema_window_size: usize,
    /// Disk-shaped regions from score peaks instead of morphological cleanup.
    pub circular_region_mode: bool,
    /// Width of the unbleached margin dropped from the reference, 0..=5.
    pub bleached_border: usize,
    /// Try the decay-envelope extension of each model family.
    pub nested_models: bool,
    /// Diffusion coefficient used to seed diffusion fits.
    pub assumed_diffusion_coefficient: f64,
    /// Where per-region CSV files go. Nothing is written when unset.
    pub results_dir: Option<PathBuf>,
    pub detector: DetectorKind,
    pub projection: Projection,
    pub fill_holes: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_region_size: DEFAULT_MIN_REGION_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            ema_window_size: DEFAULT_EMA_WINDOW,
            circular_region_mode: false,
            bleached_border: 0,
            nested_models: true,
            assumed_diffusion_coefficient: DEFAULT_DIFFUSION_COEFFICIENT,
            results_dir: None,
            detector: DetectorKind::default(),
            projection: Projection::default(),
            fill_holes: true,
        }
    }
}

impl AnalysisConfig {
    /// Configured border, clamped to the supported range.
    pub fn bleached_border(&self) -> usize {
        self.bleached_border.min(MAX_BORDER)
    }

    pub fn event_detector(&self) -> EventDetector {
        EventDetector::new(self.detector, self.score_threshold, self.ema_window_size)
    }

    pub fn segment_params(&self) -> SegmentParams {
        SegmentParams {
            min_region_size: self.min_region_size,
            score_threshold: self.score_threshold,
            circular: self.circular_region_mode,
            fill_holes: self.fill_holes,
            bleached_border: self.bleached_border(),
        }
    }

    pub fn kinetics_settings(&self, calibration: &Calibration) -> KineticsSettings {
        KineticsSettings {
            nested_models: self.nested_models,
            diffusion_coefficient_guess: self.assumed_diffusion_coefficient,
            frame_interval: calibration.frame_interval,
            pixel_size: calibration.pixel_size,
            lm: LmConfig::default(),
        }
    }
}

impl std::fmt::Display for AnalysisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} detector (threshold {}), {} regions >= {} px, border {}, {} projection{}",
            self.detector,
            self.score_threshold,
            if self.circular_region_mode {
                "circular"
            } else {
                "morphological"
            },
            self.min_region_size,
            self.bleached_border(),
            self.projection,
            if self.nested_models {
                ", nested models"
            } else {
                ""
            }
        )
    }
}

/// Replaces parts of the calibration read from the input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOverride {
    pub pixel_size: Option<f64>,
    pub distance_unit: Option<String>,
    pub frame_interval: Option<f64>,
    pub time_unit: Option<String>,
}

impl CalibrationOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, base: &Calibration) -> Calibration {
        Calibration {
            pixel_size: self.pixel_size.unwrap_or(base.pixel_size),
            distance_unit: self
                .distance_unit
                .clone()
                .unwrap_or_else(|| base.distance_unit.clone()),
            frame_interval: self.frame_interval.unwrap_or(base.frame_interval),
            time_unit: self
                .time_unit
                .clone()
                .unwrap_or_else(|| base.time_unit.clone()),
        }
    }
}

/// A complete file-to-results run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// SER file or directory of frame images.
    pub input: PathBuf,
    /// Where the region label mask image is written, if anywhere.
    #[serde(default)]
    pub label_mask_output: Option<PathBuf>,
    /// Correct stage drift before analysis.
    #[serde(default = "default_align")]
    pub align: bool,
    #[serde(default)]
    pub calibration: CalibrationOverride,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_align() -> bool {
    true
}

impl PipelineConfig {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            label_mask_output: None,
            align: default_align(),
            calibration: CalibrationOverride::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}
