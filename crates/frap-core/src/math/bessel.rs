//! Modified Bessel functions of the first kind, orders 0 and 1.
//!
//! Polynomial approximations from Abramowitz & Stegun 9.8.1-9.8.4: a power
//! series in `(x/3.75)^2` below 3.75 and an asymptotic expansion in `3.75/x`
//! above it. The `*e` variants return `exp(-|x|) * I(x)` and stay finite for
//! arguments where `I(x)` itself overflows.

const SMALL_LIMIT: f64 = 3.75;

/// 9.8.1, `|x| <= 3.75`.
const I0_SMALL: [f64; 7] = [
    1.0, 3.5156229, 3.0899424, 1.2067492, 0.2659732, 0.0360768, 0.0045813,
];

/// 9.8.2, `x >= 3.75`, coefficients of `sqrt(x) * exp(-x) * I0(x)`.
const I0_LARGE: [f64; 9] = [
    0.39894228,
    0.01328592,
    0.00225319,
    -0.00157565,
    0.00916281,
    -0.02057706,
    0.02635537,
    -0.01647633,
    0.00392377,
];

/// 9.8.3, `|x| <= 3.75`, coefficients of `I1(x) / x`.
const I1_SMALL: [f64; 7] = [
    0.5, 0.87890594, 0.51498869, 0.15084934, 0.02658733, 0.00301532, 0.00032411,
];

/// 9.8.4, `x >= 3.75`, coefficients of `sqrt(x) * exp(-x) * I1(x)`.
const I1_LARGE: [f64; 9] = [
    0.39894228,
    -0.03988024,
    -0.00362018,
    0.00163801,
    -0.01031555,
    0.02282967,
    -0.02895312,
    0.01787654,
    -0.00420059,
];

#[inline]
fn horner(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

/// `I0(x)`. Even.
pub fn i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < SMALL_LIMIT {
        let t = x / SMALL_LIMIT;
        horner(&I0_SMALL, t * t)
    } else {
        horner(&I0_LARGE, SMALL_LIMIT / ax) * ax.exp() / ax.sqrt()
    }
}

/// `I1(x)`. Odd: `i1(-x) == -i1(x)`.
pub fn i1(x: f64) -> f64 {
    let ax = x.abs();
    if ax < SMALL_LIMIT {
        let t = x / SMALL_LIMIT;
        x * horner(&I1_SMALL, t * t)
    } else {
        let v = horner(&I1_LARGE, SMALL_LIMIT / ax) * ax.exp() / ax.sqrt();
        v.copysign(x)
    }
}

/// `exp(-|x|) * I0(x)`.
pub fn i0e(x: f64) -> f64 {
    let ax = x.abs();
    if ax < SMALL_LIMIT {
        i0(x) * (-ax).exp()
    } else {
        horner(&I0_LARGE, SMALL_LIMIT / ax) / ax.sqrt()
    }
}

/// `exp(-|x|) * I1(x)`.
pub fn i1e(x: f64) -> f64 {
    let ax = x.abs();
    if ax < SMALL_LIMIT {
        i1(x) * (-ax).exp()
    } else {
        (horner(&I1_LARGE, SMALL_LIMIT / ax) / ax.sqrt()).copysign(x)
    }
}
