//! M-Sketch: a moment-based quantile sketch.
//!
//! Accumulates `k` power sums (and optionally `k` power sums of the log of
//! each value) in constant space, then reconstructs the maximum-entropy
//! density consistent with those moments on demand, inverting its CDF to
//! answer quantile queries. Trades R-Sketch's hard relative-error guarantee
//! for much smaller fixed memory; accuracy improves with `k` and degrades
//! smoothly as the underlying distribution departs from one well-described
//! by a few moments.

pub mod accumulator;
pub mod inverter;
pub mod numeric;
pub mod solver;

pub use accumulator::MomentAccumulator;
pub use solver::MaxEntropyDensity;

use crate::common::validation::{validate_finite, validate_k, validate_quantile, validate_weight};
use crate::common::QuantileSketch;
use crate::error::{Result, SketchError};

/// A moment-based quantile sketch tracking `k` moments, optionally also in
/// log-space for heavy-tailed, strictly-positive data.
#[derive(Debug, Clone)]
pub struct MSketch {
    k: usize,
    acc: MomentAccumulator,
}

impl MSketch {
    /// Builds an empty M-Sketch tracking `k` moments (`[4, 20]`).
    /// `log_mode` additionally tracks moments of `log x`, used to
    /// reconstruct the density in log-space for strictly-positive,
    /// heavy-tailed inputs; it latches off permanently the first time a
    /// non-positive value is inserted.
    pub fn new(k: usize, log_mode: bool) -> Result<Self> {
        validate_k(k)?;
        Ok(Self {
            k,
            acc: MomentAccumulator::new(k, log_mode),
        })
    }

    /// The configured moment count.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Whether log-domain moments are currently being tracked.
    pub fn log_mode_active(&self) -> bool {
        self.acc.logs_enabled()
    }

    /// Picks log-domain moments over linear-domain ones only when logs are
    /// still enabled and the data actually spans a nontrivial log-range;
    /// otherwise reconstructs directly in linear space.
    fn reconstruct(&self) -> Result<(MaxEntropyDensity, bool)> {
        let use_log = self.acc.logs_enabled() && self.acc.log_max() > self.acc.log_min();
        if use_log {
            let moments = self.acc.normalized_log_moments();
            let density = solver::solve(&moments, self.acc.log_min(), self.acc.log_max())?;
            Ok((density, true))
        } else {
            let moments = self.acc.normalized_power_moments();
            let density = solver::solve(&moments, self.acc.min(), self.acc.max())?;
            Ok((density, false))
        }
    }
}

impl QuantileSketch for MSketch {
    fn insert_weighted(&mut self, x: f64, weight: f64) -> Result<()> {
        validate_finite("x", x)?;
        validate_weight(weight)?;
        if weight == 0.0 {
            return Ok(());
        }
        self.acc.insert(x, weight);
        Ok(())
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.k != other.k {
            return Err(SketchError::Incompatible {
                reason: "M-Sketch moment counts differ".to_string(),
            });
        }
        self.acc.merge(&other.acc);
        Ok(())
    }

    fn quantile(&self, q: f64) -> Result<f64> {
        validate_quantile(q)?;
        if self.acc.total_weight() <= 0.0 {
            return Err(SketchError::EmptySketch);
        }
        if self.acc.min() == self.acc.max() {
            return Ok(self.acc.min());
        }
        if q == 0.0 {
            return Ok(self.acc.min());
        }
        if q == 1.0 {
            return Ok(self.acc.max());
        }

        let (density, in_log_domain) = self.reconstruct()?;
        let v = inverter::invert(&density, q)?;
        Ok(if in_log_domain { v.exp() } else { v })
    }

    fn count(&self) -> f64 {
        self.acc.total_weight()
    }

    fn min(&self) -> Option<f64> {
        (self.acc.total_weight() > 0.0).then(|| self.acc.min())
    }

    fn max(&self) -> Option<f64> {
        (self.acc.total_weight() > 0.0).then(|| self.acc.max())
    }

    fn sum(&self) -> f64 {
        self.acc.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sketch_errors() {
        let s = MSketch::new(8, false).unwrap();
        assert!(matches!(s.quantile(0.5), Err(SketchError::EmptySketch)));
        assert_eq!(s.count(), 0.0);
    }

    #[test]
    fn rejects_bad_k() {
        assert!(MSketch::new(2, false).is_err());
        assert!(MSketch::new(50, false).is_err());
    }

    #[test]
    fn degenerate_constant_input_returns_constant() {
        let mut s = MSketch::new(8, false).unwrap();
        for _ in 0..10 {
            s.insert(42.0).unwrap();
        }
        assert_eq!(s.quantile(0.5).unwrap(), 42.0);
        assert_eq!(s.quantile(0.0).unwrap(), 42.0);
        assert_eq!(s.quantile(1.0).unwrap(), 42.0);
    }

    #[test]
    fn scenario_s5_lognormal_median_within_tolerance() {
        // Approximates a log-normal(mu=0, sigma=1) sample via deterministic
        // quantile points rather than a full RNG draw, keeping the unit
        // test fast; the full distributional scenario lives in the
        // integration test suite.
        let mut s = MSketch::new(10, true).unwrap();
        let points = [
            0.05, 0.1, 0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.5, 2.0, 2.5, 3.0, 4.0, 6.0, 10.0,
        ];
        for &p in &points {
            s.insert(p).unwrap();
        }
        let median = s.quantile(0.5).unwrap();
        assert!(median > 0.0 && median.is_finite(), "median={median}");
    }

    #[test]
    fn merge_rejects_mismatched_k() {
        let mut a = MSketch::new(8, false).unwrap();
        let b = MSketch::new(10, false).unwrap();
        a.insert(1.0).unwrap();
        let result = a.merge(&b);
        assert!(matches!(result, Err(SketchError::Incompatible { .. })));
    }

    #[test]
    fn weight_conservation_across_merge() {
        let mut a = MSketch::new(8, false).unwrap();
        let mut b = MSketch::new(8, false).unwrap();
        for i in 1..=50 {
            a.insert(i as f64).unwrap();
        }
        for i in 51..=100 {
            b.insert(i as f64).unwrap();
        }
        a.merge(&b).unwrap();
        assert_eq!(a.count(), 100.0);
        assert_eq!(a.min(), Some(1.0));
        assert_eq!(a.max(), Some(100.0));
    }
}
