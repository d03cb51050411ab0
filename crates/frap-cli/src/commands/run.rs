use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use frap_core::cancel::CancellationToken;
use frap_core::events::DetectorKind;
use frap_core::mask::Projection;
use frap_core::pipeline::config::{CalibrationOverride, PipelineConfig};
use frap_core::pipeline::run_analysis;

use crate::progress::BarReporter;
use crate::summary::{print_results, print_run_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum DetectorArg {
    Ema,
    Laplacian,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProjectionArg {
    Max,
    Average,
}

#[derive(Args)]
pub struct RunArgs {
    /// SER file or directory of frame images
    pub file: Option<PathBuf>,

    /// Pipeline config file (TOML); other flags are ignored when given
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Smallest region kept, in pixels
    #[arg(long, default_value = "20")]
    pub min_region_size: usize,

    /// Standard score a drop must exceed
    #[arg(long, default_value = "4.0")]
    pub score_threshold: f64,

    /// Effective EMA window, in frames
    #[arg(long, default_value = "10")]
    pub ema_window: usize,

    /// Bleach event detector
    #[arg(long, value_enum, default_value = "ema")]
    pub detector: DetectorArg,

    /// Projection used for the foreground mask
    #[arg(long, value_enum, default_value = "max")]
    pub projection: ProjectionArg,

    /// Disk-shaped regions from score peaks
    #[arg(long)]
    pub circular: bool,

    /// Unbleached margin dropped from the reference (0-5 px)
    #[arg(long, default_value = "0")]
    pub border: usize,

    /// Skip the decay-envelope model extensions
    #[arg(long)]
    pub no_nested: bool,

    /// Do not fill holes in morphological regions
    #[arg(long)]
    pub no_fill_holes: bool,

    /// Assumed diffusion coefficient used to seed diffusion fits
    #[arg(long, default_value = "1.0")]
    pub diffusion_coefficient: f64,

    /// Skip drift correction
    #[arg(long)]
    pub no_align: bool,

    /// Pixel size in distance units
    #[arg(long)]
    pub pixel_size: Option<f64>,

    /// Distance unit name
    #[arg(long)]
    pub distance_unit: Option<String>,

    /// Time between frames in time units
    #[arg(long)]
    pub frame_interval: Option<f64>,

    /// Time unit name
    #[arg(long)]
    pub time_unit: Option<String>,

    /// Directory for per-region CSV files (must exist)
    #[arg(short, long)]
    pub results_dir: Option<PathBuf>,

    /// Label mask image path (.png or .tiff)
    #[arg(long)]
    pub label_mask: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid pipeline config")?
    } else {
        build_config_from_args(args)?
    };

    print_run_summary(&config);

    let reporter = Arc::new(BarReporter::new());
    let cancel = CancellationToken::new();
    let output = run_analysis(&config, &cancel, reporter.clone())
        .with_context(|| format!("Analysis of {} failed", config.input.display()))?;
    reporter.finish();

    print_results(&output);
    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> Result<PipelineConfig> {
    let input = args
        .file
        .clone()
        .context("An input file is required when no --config is given")?;
    let mut config = PipelineConfig::new(input);
    config.align = !args.no_align;
    config.label_mask_output = args.label_mask.clone();
    config.calibration = CalibrationOverride {
        pixel_size: args.pixel_size,
        distance_unit: args.distance_unit.clone(),
        frame_interval: args.frame_interval,
        time_unit: args.time_unit.clone(),
    };

    let analysis = &mut config.analysis;
    analysis.min_region_size = args.min_region_size;
    analysis.score_threshold = args.score_threshold;
    analysis.ema_window_size = args.ema_window;
    analysis.circular_region_mode = args.circular;
    analysis.bleached_border = args.border;
    analysis.nested_models = !args.no_nested;
    analysis.fill_holes = !args.no_fill_holes;
    analysis.assumed_diffusion_coefficient = args.diffusion_coefficient;
    analysis.results_dir = args.results_dir.clone();
    analysis.detector = match args.detector {
        DetectorArg::Ema => DetectorKind::Ema,
        DetectorArg::Laplacian => DetectorKind::Laplacian,
    };
    analysis.projection = match args.projection {
        ProjectionArg::Max => Projection::Max,
        ProjectionArg::Average => Projection::Average,
    };
    Ok(config)
}
