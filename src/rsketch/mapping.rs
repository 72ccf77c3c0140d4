//! Value ↔ bucket-index mapping.
//!
//! A mapping is a pure function γ from positive reals to bucket indices such
//! that consecutive buckets cover (approximately, for the interpolated
//! variants) a geometric range with ratio `gamma = (1 + alpha) / (1 -
//! alpha)`. `index` and `value` are exact inverses of each other at the
//! bucket center, so round-trip error never compounds across a merge or a
//! repeated query; the only source of error is each variant's approximation
//! of `log_gamma` on the way in.

use crate::common::validation::validate_alpha;
use crate::error::{Result, SketchError};

/// Which index-computation strategy a mapping uses, trading CPU cost for
/// bucket density.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    /// Exact `ceil(log_gamma(x))`; one `ln` call per insert.
    Logarithmic,
    /// IEEE-754 exponent/mantissa decomposition with a linear term in
    /// `m - 1` approximating `log2(m)`. Faster, at the cost of a small,
    /// bounded distortion absorbed by shrinking the usable `alpha`.
    LinearInterpolation,
    /// Same decomposition with a cubic polynomial in `m - 1`, fit to match
    /// `log2` at both octave endpoints so the approximation stays
    /// continuous (and therefore monotonic) across octave boundaries.
    CubicInterpolation,
}

/// Cubic fit for `log2(1 + u)` on `u ∈ [0, 1)`: matches value and slope at
/// `u = 0` and value at `u = 1`, so `f(0) = 0` and `f(1) = 1` exactly —
/// required for the approximation to stay continuous across octave
/// boundaries, where `m` wraps from just under 2 back to 1.
const CUBIC_C1: f64 = 1.442_695_040_888_963_4; // 1 / ln 2
const CUBIC_C2: f64 = -0.648_385_116_897_640_2;
const CUBIC_C3: f64 = 0.205_690_076_008_676_8;

/// Maximum absolute deviation of the linear approximation `m - 1` from
/// `log2(m)` on `m ∈ [1, 2)`, attained at `m = 1 / ln 2`. This is the global
/// cap the interpolation distortion term saturates at once a bucket spans a
/// large fraction of an octave.
const LOG2_LINEAR_MAX_ERROR: f64 = 0.086_071_332_055_9;

/// Lipschitz constant of `dev(u) = log2(1 + u) - u` on `u ∈ [0, 1)` — how
/// steeply the linear approximation's own error can change per unit of
/// mantissa fraction, attained at `u = 0`. Used to bound the interpolation
/// distortion term for narrow buckets, where it's far below the global cap.
const LOG2_LINEAR_ERROR_LIPSCHITZ: f64 = 1.0 / std::f64::consts::LN_2 - 1.0;

/// An immutable value↔bucket-index mapping.
///
/// Mappings are plain values, not trait objects: the controller matches on
/// `kind` so the hot insert/query path carries no virtual dispatch, and a
/// mapping is freely `Copy` and shareable across threads since it holds no
/// interior mutability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexMapping {
    kind: MappingKind,
    gamma: f64,
    gamma_ln: f64,
    /// Scales an approximate `log2(x)` into gamma-log units. Unused by
    /// `Logarithmic`, which works directly in natural log.
    multiplier: f64,
}

impl IndexMapping {
    /// Builds a mapping for the given `alpha` (relative accuracy, `(0, 1)`).
    pub fn new(kind: MappingKind, alpha: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        let effective_alpha = match kind {
            MappingKind::Logarithmic | MappingKind::CubicInterpolation => alpha,
            MappingKind::LinearInterpolation => shrink_alpha_for_linear(alpha),
        };
        let gamma = (1.0 + effective_alpha) / (1.0 - effective_alpha);
        let gamma_ln = gamma.ln();
        let multiplier = std::f64::consts::LN_2 / gamma_ln;
        Ok(Self {
            kind,
            gamma,
            gamma_ln,
            multiplier,
        })
    }

    /// The relative accuracy this mapping's bucket ratio corresponds to
    /// (recovered from `gamma`, which for `LinearInterpolation` reflects
    /// the already-shrunk effective alpha, not the alpha requested at
    /// construction).
    pub fn alpha(&self) -> f64 {
        (self.gamma - 1.0) / (self.gamma + 1.0)
    }

    /// The mapping variant in use.
    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    /// Maps a strictly positive, finite, non-subnormal value to its bucket
    /// index.
    ///
    /// # Errors
    /// Returns `OutOfRange` for non-finite, non-positive, or subnormal
    /// inputs; the caller routes these into the zero-weight counter, per
    /// the sketch's near-zero handling.
    pub fn index(&self, x: f64) -> Result<i32> {
        if !(x.is_finite() && x >= f64::MIN_POSITIVE) {
            return Err(SketchError::OutOfRange { param: "x", value: x });
        }
        Ok(self.approx_log_gamma(x).ceil() as i32)
    }

    /// Maps a bucket index back to its representative positive value: the
    /// exact inverse of `approx_log_gamma` evaluated at the bucket's
    /// center, `index - 0.5`.
    pub fn value(&self, index: i32) -> f64 {
        let center = index as f64 - 0.5;
        match self.kind {
            MappingKind::Logarithmic => {
                // Use the Datadog-derived optimal center `2/(gamma+1)`
                // rather than a literal geometric midpoint: it is the
                // choice that makes the realized relative-error band
                // exactly symmetric, `[1 - alpha, 1 + alpha)`.
                2.0 * self.gamma.powi(index) / (self.gamma + 1.0)
            }
            MappingKind::LinearInterpolation => {
                let s = center / self.multiplier;
                let e = s.floor();
                let u = s - e;
                (1.0 + u) * 2f64.powf(e)
            }
            MappingKind::CubicInterpolation => {
                let s = center / self.multiplier;
                let e = s.floor();
                let target = s - e;
                let u = invert_cubic(target);
                (1.0 + u) * 2f64.powf(e)
            }
        }
    }

    /// The approximate (or, for `Logarithmic`, exact) `log_gamma(x)`.
    fn approx_log_gamma(&self, x: f64) -> f64 {
        match self.kind {
            MappingKind::Logarithmic => x.ln() / self.gamma_ln,
            MappingKind::LinearInterpolation => {
                let (mantissa, exponent) = decompose(x);
                let approx_log2 = f64::from(exponent) + (mantissa - 1.0);
                approx_log2 * self.multiplier
            }
            MappingKind::CubicInterpolation => {
                let (mantissa, exponent) = decompose(x);
                let u = mantissa - 1.0;
                let approx_log2 =
                    f64::from(exponent) + u * (CUBIC_C1 + u * (CUBIC_C2 + u * CUBIC_C3));
                approx_log2 * self.multiplier
            }
        }
    }
}

/// Inverts `u * (C1 + C2*u + C3*u^2) = target` for `u ∈ [0, 1)` via Newton
/// iteration; the cubic is monotonic on this interval so a few steps from
/// the `u ≈ target` starting guess converge comfortably.
fn invert_cubic(target: f64) -> f64 {
    let mut u = target.clamp(0.0, 1.0);
    for _ in 0..8 {
        let f = u * (CUBIC_C1 + u * (CUBIC_C2 + u * CUBIC_C3)) - target;
        let fp = CUBIC_C1 + u * (2.0 * CUBIC_C2 + 3.0 * CUBIC_C3 * u);
        if fp.abs() < 1e-12 {
            break;
        }
        u -= f / fp;
    }
    u.clamp(0.0, 1.0)
}

/// Upper bound, in natural-log units, on `LinearInterpolation`'s realized
/// round-trip error at a given effective alpha: the exact bucket half-width
/// term (`0.5 * gamma_ln`, from the ceil/center construction) plus the log2
/// approximation's own distortion, bounded by whichever is smaller of its
/// local Lipschitz estimate (tight for narrow buckets) and its global
/// maximum (reached once a bucket spans a large fraction of an octave).
fn linear_realized_ln_error(alpha_eff: f64) -> f64 {
    let gamma_ln = ((1.0 + alpha_eff) / (1.0 - alpha_eff)).ln();
    let bucket_term = 0.5 * gamma_ln;
    let interp_term = (LOG2_LINEAR_ERROR_LIPSCHITZ * 0.5 * gamma_ln)
        .min(LOG2_LINEAR_MAX_ERROR * std::f64::consts::LN_2);
    bucket_term + interp_term
}

/// Shrinks `alpha` to the largest effective alpha for `LinearInterpolation`
/// whose realized round-trip error still fits inside the caller's requested
/// bound, found by bisection. There's no closed form here: the
/// approximation's distortion term saturates at a fixed cap once buckets
/// grow wide, so the realized-error curve isn't linear in alpha and can't be
/// inverted by a single subtraction.
fn shrink_alpha_for_linear(alpha: f64) -> f64 {
    let target = (1.0 + alpha).ln();
    let mut lo = 1e-9;
    let mut hi = alpha;
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if linear_realized_ln_error(mid) <= target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Decomposes a finite, positive, normal `x` into mantissa `m ∈ [1, 2)` and
/// exponent `e` such that `x = m * 2^e`, via the IEEE-754 bit layout.
fn decompose(x: f64) -> (f64, i32) {
    let bits = x.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32 - 1023;
    let mantissa_bits = (bits & 0x000f_ffff_ffff_ffff) | (1023u64 << 52);
    (f64::from_bits(mantissa_bits), exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapping(kind: MappingKind, alpha: f64) -> IndexMapping {
        IndexMapping::new(kind, alpha).unwrap()
    }

    #[test]
    fn rejects_bad_alpha() {
        assert!(IndexMapping::new(MappingKind::Logarithmic, 0.0).is_err());
        assert!(IndexMapping::new(MappingKind::Logarithmic, 1.0).is_err());
        assert!(IndexMapping::new(MappingKind::Logarithmic, -0.1).is_err());
    }

    #[test]
    fn rejects_nonpositive_x() {
        let m = mapping(MappingKind::Logarithmic, 0.01);
        assert!(m.index(0.0).is_err());
        assert!(m.index(-1.0).is_err());
        assert!(m.index(f64::NAN).is_err());
    }

    #[test]
    fn logarithmic_round_trip_is_tight() {
        let alpha = 0.01;
        let m = mapping(MappingKind::Logarithmic, alpha);
        for exp in -10..10 {
            let x = 1.3_f64 * 2f64.powi(exp);
            let idx = m.index(x).unwrap();
            let v = m.value(idx);
            let rel_err = (v - x).abs() / x;
            assert!(rel_err <= alpha + 1e-9, "x={x} v={v} err={rel_err}");
        }
    }

        // `Logarithmic` is exact and `LinearInterpolation` now shrinks its
        // effective alpha to cover its own approximation error (see
        // `shrink_alpha_for_linear`), so both are held to the caller's own
        // `alpha`. `CubicInterpolation`'s fit is far tighter in practice but
        // carries no analogous shrink, so it keeps a looser, documented
        // multiple rather than the tight bound.
        #[test]
        fn round_trip_logarithmic(exp in -20i32..20, frac in 1.0f64..2.0) {
            let alpha = 0.01;
            let m = mapping(MappingKind::Logarithmic, alpha);
            let x = frac * 2f64.powi(exp);
            let idx = m.index(x).unwrap();
            let v = m.value(idx);
            let rel_err = (v - x).abs() / x;
            prop_assert!(rel_err <= alpha + 1e-9);
        }

        #[test]
        fn round_trip_linear(exp in -20i32..20, frac in 0.001f64..0.9, alpha_frac in 0.01f64..0.9) {
            let alpha = alpha_frac;
            let m = mapping(MappingKind::LinearInterpolation, alpha);
            let x = (1.0 + frac) * 2f64.powi(exp);
            let idx = m.index(x).unwrap();
            let v = m.value(idx);
            let rel_err = (v - x).abs() / x;
            prop_assert!(rel_err <= alpha + 1e-9, "x={x} v={v} alpha={alpha} err={rel_err}");
        }

        #[test]
        fn round_trip_cubic(exp in -20i32..20, frac in 1.0f64..2.0) {
            let alpha = 0.02;
            let m = mapping(MappingKind::CubicInterpolation, alpha);
            let x = frac * 2f64.powi(exp);
            let idx = m.index(x).unwrap();
            let v = m.value(idx);
            let rel_err = (v - x).abs() / x;
            prop_assert!(rel_err <= 3.0 * alpha);
        }

        #[test]
        fn index_is_monotonic_nondecreasing(exp in -20i32..20, frac in 1.0f64..2.0) {
            let m = mapping(MappingKind::CubicInterpolation, 0.02);
            let x = frac * 2f64.powi(exp);
            let idx_a = m.index(x).unwrap();
            let idx_b = m.index(x * 1.0001).unwrap();
            prop_assert!(idx_b >= idx_a);
        }
    }
}
