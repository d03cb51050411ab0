use std::path::PathBuf;

use crate::align::AlignedStack;
use crate::frame::{AlignmentOffset, Calibration};
use crate::kinetics::KineticsReport;
use crate::mask::ForegroundMask;
use crate::regions::{Region, RegionLabelMask};
use crate::series::TimeSeriesSet;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Reading,
    Alignment,
    Masking,
    EventDetection,
    Segmentation,
    Aggregation,
    Fitting,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading frames"),
            Self::Alignment => write!(f, "Correcting drift"),
            Self::Masking => write!(f, "Building foreground mask"),
            Self::EventDetection => write!(f, "Detecting bleach events"),
            Self::Segmentation => write!(f, "Segmenting regions"),
            Self::Aggregation => write!(f, "Aggregating time series"),
            Self::Fitting => write!(f, "Fitting kinetic models"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Everything one analysis of a stack produces.
#[derive(Clone, Debug)]
pub struct AnalysisOutput {
    pub calibration: Calibration,
    pub foreground: ForegroundMask,
    pub event_count: usize,
    pub regions: Vec<Region>,
    pub label_mask: RegionLabelMask,
    pub series: TimeSeriesSet,
    pub kinetics: KineticsReport,
}

/// Result of a file-to-results run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub analysis: AnalysisOutput,
    /// Per-frame drift; empty when alignment was disabled.
    pub offsets: Vec<AlignmentOffset>,
    pub written: Vec<PathBuf>,
}

impl RunOutput {
    pub(super) fn new(
        analysis: AnalysisOutput,
        aligned: Option<AlignedStack>,
        written: Vec<PathBuf>,
    ) -> Self {
        Self {
            analysis,
            offsets: aligned.map(|a| a.offsets).unwrap_or_default(),
            written,
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., region count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
