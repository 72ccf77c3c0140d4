//! R-Sketch: a relative-error quantile sketch in the DDSketch family.
//!
//! Decomposes into an [`IndexMapping`] (value↔bucket-index), two
//! [`BucketStore`]s (positive and negative magnitudes), and this
//! controller, which routes inserts by sign, answers quantile queries by
//! cumulative-weight scan, and enforces an optional size cap via bucket
//! collapse.

pub mod mapping;
pub mod store;

pub use mapping::{IndexMapping, MappingKind};
pub use store::{BucketStore, StorageKind};

use crate::common::validation::{
    validate_alpha, validate_finite, validate_quantile, validate_size_cap, validate_weight,
};
use crate::common::QuantileSketch;
use crate::error::{Result, SketchError};

/// Which tail to protect when a store exceeds its configured size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseStrategy {
    /// Collapse the lowest-indexed buckets; protects high quantiles.
    /// Default for latency-style data.
    Low,
    /// Collapse the highest-indexed buckets; protects low quantiles.
    High,
    /// Alternate between both ends; used when the tail of interest is
    /// unknown.
    BothEnds,
}

/// A relative-error quantile sketch: for any queried rank `q`, the returned
/// value `v` satisfies `|v - v*| <= alpha * |v*|` (excluding any region that
/// has been collapsed under the size cap).
#[derive(Debug, Clone)]
pub struct RSketch {
    mapping: IndexMapping,
    storage_kind: StorageKind,
    size_cap: Option<usize>,
    collapse: CollapseStrategy,
    positive: BucketStore,
    negative: BucketStore,
    zero_weight: f64,
    total_weight: f64,
    min: f64,
    max: f64,
    sum: f64,
    /// Which end `BothEnds` collapses next; toggled on every collapse so
    /// the strategy alternates rather than always favoring one side.
    collapse_toggle: bool,
}

impl RSketch {
    /// Builds an empty R-Sketch.
    ///
    /// # Errors
    /// `InvalidConfig` if `alpha` is outside `(0, 1)` or `size_cap` is
    /// `Some(0)`.
    pub fn new(
        alpha: f64,
        mapping_kind: MappingKind,
        storage_kind: StorageKind,
        size_cap: Option<usize>,
        collapse: CollapseStrategy,
    ) -> Result<Self> {
        validate_alpha(alpha)?;
        validate_size_cap(size_cap)?;
        let mapping = IndexMapping::new(mapping_kind, alpha)?;
        Ok(Self {
            mapping,
            storage_kind,
            size_cap,
            collapse,
            positive: BucketStore::new(storage_kind),
            negative: BucketStore::new(storage_kind),
            zero_weight: 0.0,
            total_weight: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            collapse_toggle: false,
        })
    }

    /// The relative accuracy this sketch was configured with.
    pub fn alpha(&self) -> f64 {
        self.mapping.alpha()
    }

    /// The mapping variant in use.
    pub fn mapping_kind(&self) -> MappingKind {
        self.mapping.kind()
    }

    /// The storage variant in use.
    pub fn storage_kind(&self) -> StorageKind {
        self.storage_kind
    }

    fn compatible_with(&self, other: &Self) -> bool {
        self.mapping == other.mapping && self.storage_kind == other.storage_kind
    }

    /// Applies `collapse` to `store` until it fits within `cap`. The size
    /// cap is enforced per-store (not across positive+negative combined):
    /// the distilled spec left this open-ended, and applying it per-store
    /// means collapsing one tail never touches the other.
    fn collapse_store(
        store: &mut BucketStore,
        cap: usize,
        collapse: CollapseStrategy,
        toggle: &mut bool,
    ) {
        while store.size() > cap {
            let excess = store.size() - cap;
            match collapse {
                CollapseStrategy::Low => store.collapse_lowest_n(excess),
                CollapseStrategy::High => store.collapse_highest_n(excess),
                CollapseStrategy::BothEnds => {
                    if *toggle {
                        store.collapse_highest_n(1);
                    } else {
                        store.collapse_lowest_n(1);
                    }
                    *toggle = !*toggle;
                }
            }
        }
    }

    fn enforce_size_cap(&mut self) {
        let Some(cap) = self.size_cap else {
            return;
        };
        Self::collapse_store(&mut self.positive, cap, self.collapse, &mut self.collapse_toggle);
        Self::collapse_store(&mut self.negative, cap, self.collapse, &mut self.collapse_toggle);
    }
}

impl QuantileSketch for RSketch {
    fn insert_weighted(&mut self, x: f64, weight: f64) -> Result<()> {
        validate_finite("x", x)?;
        validate_weight(weight)?;
        if weight == 0.0 {
            return Ok(());
        }

        if x == 0.0 {
            self.zero_weight += weight;
        } else if x > 0.0 {
            match self.mapping.index(x) {
                Ok(index) => self.positive.add(index, weight),
                Err(_) => self.zero_weight += weight,
            }
        } else {
            match self.mapping.index(-x) {
                Ok(index) => self.negative.add(index, weight),
                Err(_) => self.zero_weight += weight,
            }
        }

        self.total_weight += weight;
        self.sum += x * weight;
        self.min = self.min.min(x);
        self.max = self.max.max(x);

        self.enforce_size_cap();
        Ok(())
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        if !self.compatible_with(other) {
            return Err(SketchError::Incompatible {
                reason: "R-Sketch configurations differ (mapping or storage kind)".to_string(),
            });
        }
        if other.total_weight == 0.0 {
            return Ok(());
        }

        self.positive.merge(&other.positive);
        self.negative.merge(&other.negative);
        self.zero_weight += other.zero_weight;
        self.total_weight += other.total_weight;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);

        self.enforce_size_cap();
        Ok(())
    }

    fn quantile(&self, q: f64) -> Result<f64> {
        validate_quantile(q)?;
        if self.total_weight <= 0.0 {
            return Err(SketchError::EmptySketch);
        }
        if q == 0.0 {
            return Ok(self.min);
        }
        if q == 1.0 {
            return Ok(self.max);
        }

        let mut target = q * self.total_weight;

        for (index, weight) in self.negative.iter_desc() {
            if target <= weight {
                return Ok((-self.mapping.value(index)).clamp(self.min, self.max));
            }
            target -= weight;
        }

        if target <= self.zero_weight {
            return Ok(0.0_f64.max(self.min).min(self.max));
        }
        target -= self.zero_weight;

        for (index, weight) in self.positive.iter_asc() {
            if target <= weight {
                return Ok(self.mapping.value(index).clamp(self.min, self.max));
            }
            target -= weight;
        }

        Ok(self.max)
    }

    fn count(&self) -> f64 {
        self.total_weight
    }

    fn min(&self) -> Option<f64> {
        (self.total_weight > 0.0).then_some(self.min)
    }

    fn max(&self) -> Option<f64> {
        (self.total_weight > 0.0).then_some(self.max)
    }

    fn sum(&self) -> f64 {
        self.sum
    }
}
