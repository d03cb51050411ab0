pub mod estimate;
pub mod lm;
pub mod models;
pub mod selection;

use std::f64::consts::LN_2;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::consts::DEFAULT_DIFFUSION_COEFFICIENT;
use crate::error::{FitError, FitFailure, Result};
use crate::regions::Region;
use crate::series::TimeSeriesSet;

pub use lm::{FitResult, LmConfig};
pub use models::{soumpasis, ModelKind};
pub use selection::{compare_nested, NestedComparison};

/// Label used in [`FitFailure`] for the foreground reference trace.
pub const FOREGROUND_FIT_ID: u8 = 0;

/// Settings for the kinetic fits of one analysis.
#[derive(Clone, Debug)]
pub struct KineticsSettings {
    /// Try the decay-envelope extension of each family.
    pub nested_models: bool,
    /// Diffusion coefficient used to seed `tD`.
    pub diffusion_coefficient_guess: f64,
    pub frame_interval: f64,
    pub pixel_size: f64,
    pub lm: LmConfig,
}

impl Default for KineticsSettings {
    fn default() -> Self {
        Self {
            nested_models: true,
            diffusion_coefficient_guess: DEFAULT_DIFFUSION_COEFFICIENT,
            frame_interval: 1.0,
            pixel_size: 1.0,
            lm: LmConfig::default(),
        }
    }
}

/// Fits of one model family: the 3-parameter model and, when tried and
/// converged, its 5-parameter extension with the F-test between them.
#[derive(Clone, Debug, PartialEq)]
pub struct FamilyFit {
    pub simple: FitResult,
    pub extended: Option<FitResult>,
    pub comparison: Option<NestedComparison>,
}

impl FamilyFit {
    /// The extension if the F-test accepted it, the simple model otherwise.
    pub fn best(&self) -> &FitResult {
        match (&self.extended, &self.comparison) {
            (Some(ext), Some(c)) if c.accepted => ext,
            _ => &self.simple,
        }
    }
}

/// Everything the fitter learned about one region.
#[derive(Clone, Debug)]
pub struct RegionKinetics {
    pub region_id: u8,
    pub bleach_frame: usize,
    pub area_px: usize,
    pub reaction: Option<FamilyFit>,
    pub diffusion: Option<FamilyFit>,
    /// Lower-RSS result of the two families' best fits.
    pub selected: Option<FitResult>,
    /// Recovery half-life in calibrated time units.
    pub half_life: Option<f64>,
    /// `ln2/tau` when the selected model carries a decay envelope.
    pub bleach_half_life: Option<f64>,
    /// Only for diffusion models.
    pub diffusion_coefficient: Option<f64>,
    pub failures: Vec<FitFailure>,
}

/// Global bleaching fit plus all per-region results.
#[derive(Clone, Debug)]
pub struct KineticsReport {
    pub global_decay: Option<FitResult>,
    /// Photobleaching half-life of the reference trace.
    pub global_half_life: Option<f64>,
    pub global_failure: Option<FitFailure>,
    pub regions: Vec<RegionKinetics>,
}

/// `t_j = j·Δt` for `j in 0..n`.
pub fn time_axis(n: usize, frame_interval: f64) -> Vec<f64> {
    (0..n).map(|j| j as f64 * frame_interval).collect()
}

/// Fit `B + A·exp(-koff·t)` to the reference trace.
pub fn fit_global_decay(
    trace: &[f64],
    frame_interval: f64,
    config: &LmConfig,
) -> std::result::Result<FitResult, FitError> {
    let t = time_axis(trace.len(), frame_interval);
    let seed = estimate::decay(&t, trace);
    lm::fit(ModelKind::Decay, &t, trace, &seed, config)
}

/// Fit one family and, if requested, its decay-envelope extension.
///
/// Returns the family (absent when the simple model failed) and every fit
/// error met along the way.
pub fn fit_family(
    kind: ModelKind,
    t: &[f64],
    y: &[f64],
    seed: &[f64],
    tau_seed: f64,
    nested: bool,
    config: &LmConfig,
) -> (Option<FamilyFit>, Vec<(ModelKind, FitError)>) {
    let mut errors = Vec::new();
    let simple = match lm::fit(kind, t, y, seed, config) {
        Ok(fit) => fit,
        Err(e) => {
            errors.push((kind, e));
            return (None, errors);
        }
    };

    let mut family = FamilyFit {
        simple,
        extended: None,
        comparison: None,
    };
    if let (true, Some(ext_kind)) = (nested, kind.extension()) {
        let ext_seed = estimate::with_decay_envelope(&family.simple, tau_seed);
        match lm::fit(ext_kind, t, y, &ext_seed, config) {
            Ok(ext) => {
                family.comparison = Some(compare_nested(&family.simple, &ext, y.len()));
                family.extended = Some(ext);
            }
            Err(e) => errors.push((ext_kind, e)),
        }
    }
    (Some(family), errors)
}

/// Recovery half-life of a fitted recovery model.
pub fn recovery_half_life(fit: &FitResult) -> Option<f64> {
    if fit.kind.is_diffusion() {
        fit.param("tD").map(diffusion_half_life)
    } else {
        fit.param("koff").map(|k| LN_2 / k)
    }
}

/// Time at which the Soumpasis recovery reaches half its amplitude.
///
/// The recovery depends on `x = 2tD/t` only, so the crossing `x*` of
/// `exp(-x)(I0(x) + I1(x)) = 1/2` is found by bisection and `t½ = 2tD/x*`.
pub fn diffusion_half_life(td: f64) -> f64 {
    let g = |x: f64| crate::math::i0e(x) + crate::math::i1e(x) - 0.5;
    let (mut lo, mut hi) = (0.0f64, 100.0f64);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if g(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    2.0 * td / (0.5 * (lo + hi))
}

/// Fit every model family to one region's post-bleach trace.
pub fn fit_region(
    region: &Region,
    means: &[f64],
    tau_seed: f64,
    settings: &KineticsSettings,
) -> RegionKinetics {
    let recovery = &means[region.bleach_frame.min(means.len())..];
    let t = time_axis(recovery.len(), settings.frame_interval);
    let mut failures = Vec::new();

    let mut run = |kind: ModelKind, seed: Option<Vec<f64>>| -> Option<FamilyFit> {
        let Some(seed) = seed else {
            failures.push(FitFailure {
                region_id: region.id,
                model: kind,
                error: FitError::InsufficientData {
                    points: recovery.len(),
                    params: kind.param_count(),
                },
            });
            return None;
        };
        let (family, errors) = fit_family(
            kind,
            &t,
            recovery,
            &seed,
            tau_seed,
            settings.nested_models,
            &settings.lm,
        );
        for (model, error) in errors {
            warn!(region = region.id, %model, %error, "Fit failed");
            failures.push(FitFailure {
                region_id: region.id,
                model,
                error,
            });
        }
        family
    };

    let enough = recovery.len() > ModelKind::ReactionSimple.param_count();
    let reaction = run(
        ModelKind::ReactionSimple,
        enough.then(|| estimate::reaction(&t, recovery)),
    );
    let diffusion = run(
        ModelKind::DiffusionSimple,
        enough.then(|| {
            estimate::diffusion(
                recovery,
                region.size(),
                settings.pixel_size,
                settings.diffusion_coefficient_guess,
            )
        }),
    );

    let selected = match (&reaction, &diffusion) {
        (Some(r), Some(d)) => Some(if d.best().rss < r.best().rss {
            d.best().clone()
        } else {
            r.best().clone()
        }),
        (Some(r), None) => Some(r.best().clone()),
        (None, Some(d)) => Some(d.best().clone()),
        (None, None) => None,
    };

    let half_life = selected.as_ref().and_then(recovery_half_life);
    let bleach_half_life = selected
        .as_ref()
        .filter(|fit| fit.kind.has_decay_envelope())
        .and_then(|fit| fit.param("tau"))
        .map(|tau| LN_2 / tau);
    let diffusion_coefficient = selected
        .as_ref()
        .filter(|fit| fit.kind.is_diffusion())
        .and_then(|fit| fit.param("tD"))
        .map(|td| estimate::diffusion_coefficient(region.size(), settings.pixel_size, td));

    match &selected {
        Some(fit) => info!(
            region = region.id,
            model = %fit.kind,
            params = ?fit.params,
            rss = fit.rss,
            half_life = ?half_life,
            bleach_half_life = ?bleach_half_life,
            diffusion_coefficient = ?diffusion_coefficient,
            "Region kinetics"
        ),
        None => warn!(region = region.id, "No model could be fitted"),
    }

    RegionKinetics {
        region_id: region.id,
        bleach_frame: region.bleach_frame,
        area_px: region.size(),
        reaction,
        diffusion,
        selected,
        half_life,
        bleach_half_life,
        diffusion_coefficient,
        failures,
    }
}

/// Fit the global decay, then every region in parallel.
///
/// Per-fit errors never abort the run; only cancellation does.
pub fn fit_kinetics(
    series: &TimeSeriesSet,
    regions: &[Region],
    settings: &KineticsSettings,
    cancel: &CancellationToken,
) -> Result<KineticsReport> {
    assert_eq!(
        series.regions.len(),
        regions.len(),
        "one time series per region expected"
    );
    cancel.check()?;

    let (global_decay, global_failure) =
        match fit_global_decay(&series.foreground, settings.frame_interval, &settings.lm) {
            Ok(fit) => (Some(fit), None),
            Err(error) => {
                warn!(%error, "Global bleaching fit failed");
                (
                    None,
                    Some(FitFailure {
                        region_id: FOREGROUND_FIT_ID,
                        model: ModelKind::Decay,
                        error,
                    }),
                )
            }
        };
    let global_koff = global_decay.as_ref().and_then(|fit| fit.param("koff"));
    let global_half_life = global_koff.map(|k| LN_2 / k);
    if let Some(fit) = &global_decay {
        info!(
            params = ?fit.params,
            half_life = ?global_half_life,
            "Global bleaching decay"
        );
    }
    let tau_seed = global_koff.unwrap_or(f64::MIN_POSITIVE);

    let results: Vec<RegionKinetics> = regions
        .par_iter()
        .zip(series.regions.par_iter())
        .map(|(region, ts)| {
            cancel.check()?;
            debug_assert_eq!(region.id, ts.region_id);
            Ok(fit_region(region, &ts.means, tau_seed, settings))
        })
        .collect::<Result<_>>()?;

    debug!(regions = results.len(), "Kinetic fits complete");
    Ok(KineticsReport {
        global_decay,
        global_half_life,
        global_failure,
        regions: results,
    })
}
