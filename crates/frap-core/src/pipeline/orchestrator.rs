use std::sync::Arc;

use tracing::{info, warn};

use crate::align::align_stack;
use crate::cancel::CancellationToken;
use crate::consts::MIN_FRAMES;
use crate::error::{FrapError, Result};
use crate::events::detect_events;
use crate::frame::Stack;
use crate::io::image_io::save_label_mask;
use crate::io::load_stack;
use crate::io::results::write_results;
use crate::kinetics::fit_kinetics;
use crate::mask::build_foreground_mask;
use crate::regions::segment_regions;
use crate::series::aggregate;

use super::config::{AnalysisConfig, PipelineConfig};
use super::types::{AnalysisOutput, PipelineStage, ProgressReporter, RunOutput};

/// Analyze an already aligned stack.
///
/// Input errors (too few frames, no foreground, too many regions, nothing
/// left as reference) abort the run; individual fit failures do not.
pub fn analyze(
    stack: &Stack,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<AnalysisOutput> {
    if stack.frame_count() < MIN_FRAMES {
        return Err(FrapError::StackTooShort {
            frames: stack.frame_count(),
            required: MIN_FRAMES,
        });
    }
    info!(
        width = stack.width(),
        height = stack.height(),
        frames = stack.frame_count(),
        config = %config,
        "Starting FRAP analysis"
    );

    reporter.begin_stage(PipelineStage::Masking, None);
    let foreground = build_foreground_mask(stack, config.projection);
    reporter.finish_stage();
    if foreground.pixel_count() == 0 {
        return Err(FrapError::NoForeground);
    }
    info!(
        pixels = foreground.pixel_count(),
        threshold = foreground.threshold,
        "Foreground mask built"
    );
    cancel.check()?;

    reporter.begin_stage(PipelineStage::EventDetection, Some(foreground.pixel_count()));
    let events = detect_events(stack, &foreground.mask, &config.event_detector(), cancel)?;
    reporter.advance(foreground.pixel_count());
    reporter.finish_stage();
    info!(events = events.event_count(), "Bleach events detected");

    reporter.begin_stage(PipelineStage::Segmentation, None);
    let segmentation = segment_regions(&events, &foreground.mask, &config.segment_params(), cancel)?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Aggregation, Some(stack.frame_count()));
    let series = aggregate(stack, &segmentation.label_mask, cancel)?;
    reporter.advance(stack.frame_count());
    reporter.finish_stage();

    let regions = segmentation.regions;
    reporter.begin_stage(PipelineStage::Fitting, Some(regions.len()));
    let kinetics = fit_kinetics(
        &series,
        &regions,
        &config.kinetics_settings(&stack.calibration),
        cancel,
    )?;
    reporter.advance(regions.len());
    reporter.finish_stage();

    Ok(AnalysisOutput {
        calibration: stack.calibration.clone(),
        foreground,
        event_count: events.event_count(),
        regions,
        label_mask: segmentation.label_mask,
        series,
        kinetics,
    })
}

/// Load, optionally align, analyze, then write the label mask and CSVs.
///
/// Output files are only written after the analysis completed, so a failed
/// or cancelled run leaves nothing behind.
pub fn run_analysis(
    config: &PipelineConfig,
    cancel: &CancellationToken,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RunOutput> {
    reporter.begin_stage(PipelineStage::Reading, None);
    let mut stack = load_stack(&config.input, None)?;
    reporter.finish_stage();
    if !config.calibration.is_empty() {
        stack.calibration = config.calibration.apply(&stack.calibration);
    }
    info!(
        input = %config.input.display(),
        frames = stack.frame_count(),
        pixel_type = %stack.pixel_type(),
        "Stack loaded"
    );
    cancel.check()?;

    let aligned = if config.align && stack.frame_count() >= MIN_FRAMES {
        reporter.begin_stage(PipelineStage::Alignment, Some(stack.frame_count()));
        let aligned = align_stack(&stack, cancel)?;
        reporter.advance(stack.frame_count());
        reporter.finish_stage();
        Some(aligned)
    } else {
        None
    };
    let working = aligned.as_ref().map(|a| &a.stack).unwrap_or(&stack);

    let analysis = analyze(working, &config.analysis, cancel, &reporter)?;
    cancel.check()?;

    reporter.begin_stage(PipelineStage::Writing, None);
    let mut written = Vec::new();
    if let Some(path) = &config.label_mask_output {
        match save_label_mask(analysis.label_mask.labels(), path) {
            Ok(()) => written.push(path.clone()),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write label mask"),
        }
    }
    if let Some(dir) = &config.analysis.results_dir {
        written.extend(write_results(dir, &analysis));
    }
    reporter.finish_stage();

    Ok(RunOutput::new(analysis, aligned, written))
}
