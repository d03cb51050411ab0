use crate::math::{i0e, i1e};

/// The closed set of kinetic models the fitter knows.
///
/// Parameter layouts:
/// - `Decay`: `[B, A, koff]`, `B + A·exp(-koff·t)`
/// - `ReactionSimple`: `[i0, A, koff]`, `i0 + A·(1 - exp(-koff·t))`
/// - `ReactionDecay`: `[i0, A, koff, B, tau]`, reaction recovery times `exp(-tau·t)`, plus `B`
/// - `DiffusionSimple`: `[i0, A, tD]`, `i0 + A·exp(-2tD/t)·(I0(2tD/t) + I1(2tD/t))`
/// - `DiffusionDecay`: `[i0, A, tD, B, tau]`, diffusion recovery times `exp(-tau·t)`, plus `B`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Decay,
    ReactionSimple,
    ReactionDecay,
    DiffusionSimple,
    DiffusionDecay,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decay => write!(f, "Decay"),
            Self::ReactionSimple => write!(f, "Reaction"),
            Self::ReactionDecay => write!(f, "Reaction + decay"),
            Self::DiffusionSimple => write!(f, "Diffusion"),
            Self::DiffusionDecay => write!(f, "Diffusion + decay"),
        }
    }
}

impl ModelKind {
    pub fn param_count(&self) -> usize {
        self.param_names().len()
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            Self::Decay => &["B", "A", "koff"],
            Self::ReactionSimple => &["i0", "A", "koff"],
            Self::ReactionDecay => &["i0", "A", "koff", "B", "tau"],
            Self::DiffusionSimple => &["i0", "A", "tD"],
            Self::DiffusionDecay => &["i0", "A", "tD", "B", "tau"],
        }
    }

    pub fn is_diffusion(&self) -> bool {
        matches!(self, Self::DiffusionSimple | Self::DiffusionDecay)
    }

    /// Whether the model carries a residual-bleaching envelope.
    pub fn has_decay_envelope(&self) -> bool {
        matches!(self, Self::ReactionDecay | Self::DiffusionDecay)
    }

    /// The 5-parameter extension of a 3-parameter recovery model.
    pub fn extension(&self) -> Option<ModelKind> {
        match self {
            Self::ReactionSimple => Some(Self::ReactionDecay),
            Self::DiffusionSimple => Some(Self::DiffusionDecay),
            _ => None,
        }
    }

    /// Model value at time `t`.
    pub fn value(&self, t: f64, p: &[f64]) -> f64 {
        debug_assert_eq!(p.len(), self.param_count());
        match self {
            Self::Decay => p[0] + p[1] * (-p[2] * t).exp(),
            Self::ReactionSimple => reaction(t, p),
            Self::ReactionDecay => p[3] + reaction(t, p) * (-p[4] * t).exp(),
            Self::DiffusionSimple => p[0] + p[1] * soumpasis(t, p[2]),
            Self::DiffusionDecay => p[3] + (p[0] + p[1] * soumpasis(t, p[2])) * (-p[4] * t).exp(),
        }
    }

    /// Partial derivatives of [`value`](Self::value) with respect to each
    /// parameter, written into `out`.
    pub fn jacobian(&self, t: f64, p: &[f64], out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.param_count());
        match self {
            Self::Decay => {
                let e = (-p[2] * t).exp();
                out[0] = 1.0;
                out[1] = e;
                out[2] = -p[1] * t * e;
            }
            Self::ReactionSimple => {
                let e = (-p[2] * t).exp();
                out[0] = 1.0;
                out[1] = 1.0 - e;
                out[2] = p[1] * t * e;
            }
            Self::ReactionDecay => {
                let e = (-p[2] * t).exp();
                let d = (-p[4] * t).exp();
                out[0] = d;
                out[1] = (1.0 - e) * d;
                out[2] = p[1] * t * e * d;
                out[3] = 1.0;
                out[4] = -t * reaction(t, p) * d;
            }
            Self::DiffusionSimple => {
                out[0] = 1.0;
                out[1] = soumpasis(t, p[2]);
                out[2] = p[1] * soumpasis_dtd(t, p[2]);
            }
            Self::DiffusionDecay => {
                let d = (-p[4] * t).exp();
                let g = soumpasis(t, p[2]);
                out[0] = d;
                out[1] = g * d;
                out[2] = p[1] * soumpasis_dtd(t, p[2]) * d;
                out[3] = 1.0;
                out[4] = -t * (p[0] + p[1] * g) * d;
            }
        }
    }
}

#[inline]
fn reaction(t: f64, p: &[f64]) -> f64 {
    p[0] + p[1] * (1.0 - (-p[2] * t).exp())
}

/// Normalized Soumpasis recovery `exp(-x)·(I0(x) + I1(x))` with `x = 2tD/t`.
/// Rises from 0 at `t = 0` to 1 as `t → ∞`.
pub fn soumpasis(t: f64, td: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let x = 2.0 * td / t;
    i0e(x) + i1e(x)
}

/// `∂/∂tD` of [`soumpasis`], from `I0' = I1` and `I1' = I0 - I1/x`.
fn soumpasis_dtd(t: f64, td: f64) -> f64 {
    if t <= 0.0 || td <= 0.0 {
        return 0.0;
    }
    let x = 2.0 * td / t;
    -i1e(x) / td
}
