//! Normal distribution helpers
//!
//! Polynomial and rational approximations of the standard normal CDF and
//! its inverse, used by confidence intervals and the parametric quantile
//! accumulator.

/// 1/√(2π)
const FRAC_1_SQRT_2PI: f64 = 0.3989422804014327;

/// Standard normal CDF Φ(x) = P(Z ≤ x) for Z ~ N(0, 1)
///
/// Polynomial approximation (Abramowitz & Stegun 26.2.17, Horner form),
/// maximum absolute error below 7.5e-8.
///
/// NaN returns NaN; ±∞ return 1.0 / 0.0.
///
/// # Example
///
/// ```
/// use statkit::math::standard_normal_cdf;
///
/// assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-3);
/// ```
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }

    // Φ(-x) = 1 - Φ(x), evaluate for |x|
    let abs_x = x.abs();
    let k = 1.0 / (1.0 + 0.2316419 * abs_x);
    let density = FRAC_1_SQRT_2PI * (-0.5 * abs_x * abs_x).exp();

    let poly = k
        * (0.319381530
            + k * (-0.356563782 + k * (1.781477937 + k * (-1.821255978 + k * 1.330274429))));

    let upper_tail = density * poly;

    if x >= 0.0 {
        1.0 - upper_tail
    } else {
        upper_tail
    }
}

/// Inverse standard normal CDF (quantile function)
///
/// Given a probability `p` in (0, 1), returns `z` such that Φ(z) = p.
/// Rational approximation (Abramowitz & Stegun 26.2.23), maximum absolute
/// error below 4.5e-4.
///
/// Returns NaN for `p` outside [0, 1] or NaN, -∞ for `p == 0.0` and
/// ∞ for `p == 1.0`.
///
/// # Example
///
/// ```
/// use statkit::math::inverse_standard_normal_cdf;
///
/// assert!(inverse_standard_normal_cdf(0.5).abs() < 1e-4);
/// assert!((inverse_standard_normal_cdf(0.975) - 1.96).abs() < 0.01);
/// ```
pub fn inverse_standard_normal_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    // Evaluate on the lower tail, mirror for p > 0.5
    let (q, sign) = if p > 0.5 { (1.0 - p, 1.0) } else { (p, -1.0) };

    let t = (-2.0 * q.ln()).sqrt();

    const C0: f64 = 2.515517;
    const C1: f64 = 0.802853;
    const C2: f64 = 0.010328;
    const D1: f64 = 1.432788;
    const D2: f64 = 0.189269;
    const D3: f64 = 0.001308;

    let z = t - (C0 + C1 * t + C2 * t * t) / (1.0 + D1 * t + D2 * t * t + D3 * t * t * t);

    sign * z
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn cdf_in_zero_one(x in -8.0_f64..8.0) {
            let c = standard_normal_cdf(x);
            prop_assert!((0.0..=1.0).contains(&c), "cdf({}) = {} out of [0,1]", x, c);
        }

        #[test]
        fn cdf_monotonic(x1 in -8.0_f64..8.0, x2 in -8.0_f64..8.0) {
            let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
            prop_assert!(standard_normal_cdf(lo) <= standard_normal_cdf(hi) + 1e-15);
        }

        #[test]
        fn inverse_roundtrip(p in 0.001_f64..0.999) {
            let z = inverse_standard_normal_cdf(p);
            let back = standard_normal_cdf(z);
            prop_assert!((back - p).abs() < 0.005, "roundtrip error {} at p={}", (back - p).abs(), p);
        }
    }
}
