#[allow(dead_code)]
mod common;

use std::f64::consts::LN_2;

use frap_core::cancel::CancellationToken;
use frap_core::error::{FitError, FrapError};
use frap_core::kinetics::{
    estimate, fit_family, fit_kinetics, fit_region, lm, soumpasis, FamilyFit, KineticsSettings,
    LmConfig, ModelKind, FOREGROUND_FIT_ID,
};
use frap_core::regions::Region;
use frap_core::series::{RegionTimeSeries, TimeSeriesSet};

const TRUE_REACTION: [f64; 3] = [0.3, 0.5, 0.2];

/// `[i0, A, koff, B, tau]` of a recovery under residual bleaching.
const TRUE_ENVELOPE: [f64; 5] = [0.2, 0.5, 0.5, 0.1, 0.01];

/// Signal-to-noise ratio of the round-trip traces, in decibels.
const SNR_DB: f64 = 20.0;

fn true_reaction(t: f64) -> f64 {
    ModelKind::ReactionSimple.value(t, &TRUE_REACTION)
}

/// Diffusion recovery of an 80-pixel spot, 0.1 units per pixel, D = 0.5.
fn true_diffusion(t: f64) -> f64 {
    let td = estimate::diffusion_time(80, 0.1, 0.5);
    0.2 + 0.6 * soumpasis(t, td)
}

/// `n` samples of `f` over `duration` with Gaussian noise at [`SNR_DB`]
/// relative to the RMS of the clean signal.
fn snr_trace(n: usize, duration: f64, seed: u64, f: impl Fn(f64) -> f64) -> (Vec<f64>, Vec<f64>) {
    let dt = duration / n as f64;
    let power = (0..n).map(|j| f(j as f64 * dt).powi(2)).sum::<f64>() / n as f64;
    let sigma = power.sqrt() * 10f64.powf(-SNR_DB / 20.0);
    common::noisy_trace(n, dt, sigma, seed, f)
}

/// Low-noise traces for the selection and reporting paths.
fn reaction_trace(seed: u64) -> (Vec<f64>, Vec<f64>) {
    common::noisy_trace(60, 1.0, 0.003, seed, true_reaction)
}

fn diffusion_trace(seed: u64) -> (Vec<f64>, Vec<f64>) {
    common::noisy_trace(100, 0.01, 0.002, seed, true_diffusion)
}

fn fit_reaction_family(t: &[f64], y: &[f64], tau_seed: f64) -> FamilyFit {
    let initial = estimate::reaction(t, y);
    let (family, _) = fit_family(
        ModelKind::ReactionSimple,
        t,
        y,
        &initial,
        tau_seed,
        true,
        &LmConfig::default(),
    );
    family.expect("simple reaction fit")
}

fn region(id: u8, bleach_frame: usize, size: usize) -> Region {
    Region {
        id,
        bleach_frame,
        pixels: (0..size).collect(),
        centroid: (0.0, 0.0),
    }
}

// ---------------------------------------------------------------------------
// Levenberg-Marquardt
// ---------------------------------------------------------------------------

#[test]
fn test_reaction_parameters_recovered() {
    let (t, y) = reaction_trace(1);
    let seed = estimate::reaction(&t, &y);
    let fit = lm::fit(ModelKind::ReactionSimple, &t, &y, &seed, &LmConfig::default()).unwrap();

    for (name, (&got, &want)) in ["i0", "A", "koff"]
        .iter()
        .zip(fit.params.iter().zip(&TRUE_REACTION))
    {
        assert!((got - want).abs() / want < 0.05, "{name}: {got} vs {want}");
    }
    assert!(fit.rss < 60.0 * 4.0 * 0.003 * 0.003);
}

#[test]
fn test_exact_decay_is_fitted_exactly() {
    let t: Vec<f64> = (0..50).map(|j| j as f64).collect();
    let y: Vec<f64> = t.iter().map(|&t| 200.0 + 800.0 * (-0.05 * t).exp()).collect();
    let seed = estimate::decay(&t, &y);
    let fit = lm::fit(ModelKind::Decay, &t, &y, &seed, &LmConfig::default()).unwrap();
    assert!((fit.params[0] - 200.0).abs() < 1e-6);
    assert!((fit.params[1] - 800.0).abs() < 1e-6);
    assert!((fit.params[2] - 0.05).abs() < 1e-9);
    assert_eq!(fit.param("koff"), Some(fit.params[2]));
}

#[test]
fn test_too_few_points_is_an_error() {
    let t = [0.0, 1.0, 2.0];
    let y = [0.1, 0.4, 0.6];
    let err = lm::fit(
        ModelKind::ReactionSimple,
        &t,
        &y,
        &[0.1, 0.5, 0.5],
        &LmConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        FitError::InsufficientData {
            points: 3,
            params: 3
        }
    );
}

#[test]
fn test_iteration_cap() {
    let (t, y) = reaction_trace(2);
    let config = LmConfig {
        max_iterations: 1,
        relative_tolerance: 0.0,
        ..LmConfig::default()
    };
    let err = lm::fit(ModelKind::ReactionSimple, &t, &y, &[1.0, 1.0, 5.0], &config).unwrap_err();
    assert_eq!(err, FitError::TooManyIterations { max: 1 });
}

#[test]
fn test_diffusion_coefficient_recovered() {
    let (t, y) = diffusion_trace(5);
    let seed = estimate::diffusion(&y, 80, 0.1, 1.0);
    let fit = lm::fit(ModelKind::DiffusionSimple, &t, &y, &seed, &LmConfig::default()).unwrap();
    let d = estimate::diffusion_coefficient(80, 0.1, fit.param("tD").unwrap());
    assert!((d - 0.5).abs() / 0.5 < 0.1, "D = {d}");
}

#[test]
fn test_reaction_round_trip_at_20_db() {
    let trials = 20;
    let recovered = (0..trials)
        .filter(|&seed| {
            let (t, y) = snr_trace(5000, 30.0, 400 + seed, true_reaction);
            let seed_params = estimate::reaction(&t, &y);
            let config = LmConfig::default();
            let Ok(fit) = lm::fit(ModelKind::ReactionSimple, &t, &y, &seed_params, &config) else {
                return false;
            };
            fit.params
                .iter()
                .zip(&TRUE_REACTION)
                .all(|(got, want)| (got - want).abs() / want < 0.05)
        })
        .count();
    assert!(recovered >= 18, "recovered in {recovered} of {trials}");
}

#[test]
fn test_diffusion_round_trip_at_20_db() {
    let trials = 10;
    let recovered = (0..trials)
        .filter(|&seed| {
            let (t, y) = snr_trace(5000, 1.0, 600 + seed, true_diffusion);
            let seed_params = estimate::diffusion(&y, 80, 0.1, 1.0);
            let config = LmConfig::default();
            let Ok(fit) = lm::fit(ModelKind::DiffusionSimple, &t, &y, &seed_params, &config) else {
                return false;
            };
            let d = estimate::diffusion_coefficient(80, 0.1, fit.params[2]);
            (d - 0.5).abs() / 0.5 < 0.1
        })
        .count();
    assert!(recovered >= 9, "recovered in {recovered} of {trials}");
}

// ---------------------------------------------------------------------------
// Nested models
// ---------------------------------------------------------------------------

#[test]
fn test_f_test_rejects_needless_extension() {
    let trials = 20;
    let rejected = (0..trials)
        .filter(|&seed| {
            let (t, y) = snr_trace(500, 30.0, 100 + seed, true_reaction);
            fit_reaction_family(&t, &y, 1e-3).best().kind == ModelKind::ReactionSimple
        })
        .count();
    assert!(rejected >= 19, "extension accepted in {} of {trials}", trials as usize - rejected);
}

#[test]
fn test_f_test_accepts_real_envelope() {
    let trials = 10;
    let accepted = (0..trials)
        .filter(|&seed| {
            let (t, y) = snr_trace(500, 60.0, 200 + seed, |t| {
                ModelKind::ReactionDecay.value(t, &TRUE_ENVELOPE)
            });
            let family = fit_reaction_family(&t, &y, TRUE_ENVELOPE[4]);
            family.best().kind == ModelKind::ReactionDecay
        })
        .count();
    assert!(accepted >= 9, "extension accepted in {accepted} of {trials}");
}

#[test]
fn test_family_without_nesting_skips_extension() {
    let (t, y) = reaction_trace(3);
    let initial = estimate::reaction(&t, &y);
    let (family, errors) = fit_family(
        ModelKind::ReactionSimple,
        &t,
        &y,
        &initial,
        1e-3,
        false,
        &LmConfig::default(),
    );
    let family = family.unwrap();
    assert!(errors.is_empty());
    assert!(family.extended.is_none());
    assert!(family.comparison.is_none());
    assert_eq!(family.best().kind, ModelKind::ReactionSimple);
}

// ---------------------------------------------------------------------------
// Per-region fitting
// ---------------------------------------------------------------------------

#[test]
fn test_region_selects_diffusion_family() {
    let (_, recovery) = diffusion_trace(9);
    let mut means = vec![1.0; 5];
    means.extend(recovery);

    let settings = KineticsSettings {
        frame_interval: 0.01,
        pixel_size: 0.1,
        diffusion_coefficient_guess: 1.0,
        ..Default::default()
    };
    let result = fit_region(&region(1, 5, 80), &means, 1e-3, &settings);

    assert_eq!(result.region_id, 1);
    assert_eq!(result.area_px, 80);
    assert!(result.reaction.is_some());
    let selected = result.selected.as_ref().unwrap();
    assert!(selected.kind.is_diffusion(), "{}", selected.kind);
    let d = result.diffusion_coefficient.unwrap();
    assert!((d - 0.5).abs() / 0.5 < 0.1, "D = {d}");
    assert!(result.half_life.unwrap() > 0.0);
}

#[test]
fn test_region_reaction_half_life() {
    let (_, recovery) = reaction_trace(4);
    let mut means = vec![1.0; 8];
    means.extend(recovery);

    let settings = KineticsSettings {
        nested_models: false,
        ..Default::default()
    };
    let result = fit_region(&region(2, 8, 30), &means, 1e-3, &settings);
    let selected = result.selected.as_ref().unwrap();
    assert_eq!(selected.kind, ModelKind::ReactionSimple);
    let expected = LN_2 / TRUE_REACTION[2];
    let half_life = result.half_life.unwrap();
    assert!((half_life - expected).abs() / expected < 0.05, "{half_life}");
    assert!(result.diffusion_coefficient.is_none());
    assert!(result.bleach_half_life.is_none());
}

#[test]
fn test_short_recovery_records_failures() {
    let means = vec![1.0, 1.0, 1.0, 1.0, 0.3, 0.5, 0.6];
    let result = fit_region(&region(3, 4, 20), &means, 1e-3, &KineticsSettings::default());

    assert!(result.selected.is_none());
    assert!(result.half_life.is_none());
    assert_eq!(result.failures.len(), 2);
    for failure in &result.failures {
        assert_eq!(failure.region_id, 3);
        assert!(matches!(
            failure.error,
            FitError::InsufficientData { points: 3, .. }
        ));
    }
    let models: Vec<ModelKind> = result.failures.iter().map(|f| f.model).collect();
    assert_eq!(models, [ModelKind::ReactionSimple, ModelKind::DiffusionSimple]);
}

// ---------------------------------------------------------------------------
// Whole report
// ---------------------------------------------------------------------------

fn series_with_decay(foreground: Vec<f64>) -> (TimeSeriesSet, Vec<Region>) {
    let (_, recovery) = reaction_trace(6);
    let mut means = vec![1.0; 10];
    means.extend(recovery);
    let set = TimeSeriesSet {
        regions: vec![RegionTimeSeries {
            region_id: 1,
            means,
        }],
        foreground,
    };
    (set, vec![region(1, 10, 25)])
}

#[test]
fn test_report_has_global_bleaching_half_life() {
    let foreground: Vec<f64> = (0..70)
        .map(|j| 200.0 + 800.0 * (-0.02 * j as f64).exp())
        .collect();
    let (set, regions) = series_with_decay(foreground);
    let report = fit_kinetics(
        &set,
        &regions,
        &KineticsSettings::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert!(report.global_failure.is_none());
    let half_life = report.global_half_life.unwrap();
    assert!((half_life - LN_2 / 0.02).abs() < 1e-4, "{half_life}");
    assert_eq!(report.regions.len(), 1);
    assert!(report.regions[0].selected.is_some());
}

#[test]
fn test_global_failure_is_recorded() {
    let (set, regions) = series_with_decay(vec![500.0; 3]);
    let report = fit_kinetics(
        &set,
        &regions,
        &KineticsSettings::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert!(report.global_decay.is_none());
    let failure = report.global_failure.unwrap();
    assert_eq!(failure.region_id, FOREGROUND_FIT_ID);
    assert_eq!(failure.model, ModelKind::Decay);
    // Regions are still fitted.
    assert!(report.regions[0].selected.is_some());
}

#[test]
fn test_fit_kinetics_cancelled() {
    let (set, regions) = series_with_decay(vec![500.0; 70]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        fit_kinetics(&set, &regions, &KineticsSettings::default(), &cancel),
        Err(FrapError::Cancelled)
    ));
}
