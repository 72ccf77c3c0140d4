//! relerr-quantiles: mergeable quantile sketches for streaming data.
//!
//! Two complementary sketches, unified behind [`common::QuantileSketch`]:
//!
//! - [`rsketch::RSketch`]: a relative-error sketch in the DDSketch family.
//!   Bounds error in value space via a value↔bucket-index mapping plus a
//!   bucket-count store, with optional bounded-memory compaction under a
//!   size cap.
//! - [`msketch::MSketch`]: a moment-based sketch. Summarizes a stream by
//!   power sums and recovers the quantile CDF on demand via a
//!   maximum-entropy density reconstruction.
//!
//! Both sketches are mergeable (compatible configurations only), validate
//! their construction parameters eagerly, and are single-threaded per
//! instance with no internal synchronization — shard independently and
//! merge at a coordinator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod common;
pub mod error;
pub mod msketch;
pub mod rsketch;

pub use common::QuantileSketch;
pub use error::{Result, SketchError};
pub use msketch::MSketch;
pub use rsketch::{CollapseStrategy, MappingKind, RSketch, StorageKind};
