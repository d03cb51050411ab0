use std::path::PathBuf;

use frap_core::events::DetectorKind;
use frap_core::frame::Calibration;
use frap_core::kinetics::ModelKind;
use frap_core::mask::Projection;
use frap_core::pipeline::config::{AnalysisConfig, CalibrationOverride, PipelineConfig};
use frap_core::pipeline::PipelineStage;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_analysis_defaults() {
    let config = AnalysisConfig::default();
    assert_eq!(config.min_region_size, 20);
    assert_eq!(config.score_threshold, 4.0);
    assert_eq!(config.ema_window_size, 10);
    assert!(!config.circular_region_mode);
    assert_eq!(config.bleached_border, 0);
    assert!(config.nested_models);
    assert_eq!(config.assumed_diffusion_coefficient, 1.0);
    assert!(config.results_dir.is_none());
    assert_eq!(config.detector, DetectorKind::Ema);
    assert_eq!(config.projection, Projection::Max);
}

#[test]
fn test_pipeline_defaults_align() {
    let config = PipelineConfig::new(PathBuf::from("cells.ser"));
    assert!(config.align);
    assert!(config.calibration.is_empty());
    assert!(config.label_mask_output.is_none());
}

#[test]
fn test_border_is_clamped() {
    let config = AnalysisConfig {
        bleached_border: 12,
        ..Default::default()
    };
    assert_eq!(config.bleached_border(), 5);
    assert_eq!(config.segment_params().bleached_border, 5);
}

#[test]
fn test_kinetics_settings_take_calibration() {
    let calibration = Calibration {
        pixel_size: 0.2,
        distance_unit: "um".into(),
        frame_interval: 0.5,
        time_unit: "s".into(),
    };
    let config = AnalysisConfig {
        nested_models: false,
        assumed_diffusion_coefficient: 3.0,
        ..Default::default()
    };
    let settings = config.kinetics_settings(&calibration);
    assert_eq!(settings.frame_interval, 0.5);
    assert_eq!(settings.pixel_size, 0.2);
    assert_eq!(settings.diffusion_coefficient_guess, 3.0);
    assert!(!settings.nested_models);
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn test_toml_roundtrip() {
    let mut config = PipelineConfig::new(PathBuf::from("data/cells.ser"));
    config.label_mask_output = Some(PathBuf::from("out/labels.tif"));
    config.calibration.frame_interval = Some(0.25);
    config.calibration.time_unit = Some("s".into());
    config.analysis.results_dir = Some(PathBuf::from("out"));
    config.analysis.detector = DetectorKind::Laplacian;
    config.analysis.circular_region_mode = true;

    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: PipelineConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_json_roundtrip() {
    let mut config = PipelineConfig::new(PathBuf::from("frames"));
    config.align = false;
    config.analysis.projection = Projection::Average;
    config.analysis.min_region_size = 8;

    let json = serde_json::to_string(&config).unwrap();
    let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let text = r#"
        input = "cells.ser"

        [analysis]
        min_region_size = 50
        bleached_border = 3
    "#;
    let parsed: PipelineConfig = toml::from_str(text).unwrap();
    assert_eq!(parsed.input, PathBuf::from("cells.ser"));
    assert!(parsed.align);
    assert_eq!(parsed.analysis.min_region_size, 50);
    assert_eq!(parsed.analysis.bleached_border, 3);
    assert_eq!(parsed.analysis.score_threshold, 4.0);
    assert!(parsed.calibration.is_empty());
}

// ---------------------------------------------------------------------------
// Calibration override
// ---------------------------------------------------------------------------

#[test]
fn test_override_replaces_only_given_fields() {
    let base = Calibration {
        pixel_size: 1.0,
        distance_unit: "pixel".into(),
        frame_interval: 0.1,
        time_unit: "s".into(),
    };
    let over = CalibrationOverride {
        pixel_size: Some(0.065),
        distance_unit: Some("um".into()),
        ..Default::default()
    };
    assert!(!over.is_empty());
    let merged = over.apply(&base);
    assert_eq!(merged.pixel_size, 0.065);
    assert_eq!(merged.distance_unit, "um");
    assert_eq!(merged.frame_interval, 0.1);
    assert_eq!(merged.time_unit, "s");
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_detector_display() {
    assert_eq!(DetectorKind::Ema.to_string(), "Reverse EMA");
    assert_eq!(DetectorKind::Laplacian.to_string(), "Laplacian");
}

#[test]
fn test_model_display() {
    assert_eq!(ModelKind::ReactionSimple.to_string(), "Reaction");
    assert_eq!(ModelKind::DiffusionDecay.to_string(), "Diffusion + decay");
}

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(PipelineStage::Fitting.to_string(), "Fitting kinetic models");
    assert_eq!(PipelineStage::Alignment.to_string(), "Correcting drift");
}

#[test]
fn test_analysis_config_display_mentions_detector() {
    let text = AnalysisConfig::default().to_string();
    assert!(text.contains("Reverse EMA"), "{text}");
    assert!(text.contains("nested models"), "{text}");
}
