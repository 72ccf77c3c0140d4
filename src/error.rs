//! Error types for sketch operations

use std::fmt;

/// Errors that can occur while constructing, updating, or querying a sketch
#[derive(Debug, Clone, PartialEq)]
pub enum SketchError {
    /// A query argument (quantile rank, or a value outside a mapping's
    /// representable domain) fell outside its required range
    OutOfRange {
        /// Name of the parameter that was out of range
        param: &'static str,
        /// The offending value
        value: f64,
    },

    /// `quantile` was called on a sketch that has not observed any weight
    EmptySketch,

    /// Attempted to merge two sketches built with incompatible configuration
    Incompatible {
        /// Why the two sketches cannot be merged
        reason: String,
    },

    /// The max-entropy solver failed to converge even after dropping
    /// moments down to the minimum supported order
    NumericNonConvergence {
        /// Diagnostic detail (iteration count, last gradient norm, etc.)
        detail: String,
    },

    /// A constructor argument violated the sketch's configuration contract
    InvalidConfig {
        /// Name of the offending parameter
        param: &'static str,
        /// Human-readable description of the violated constraint
        detail: String,
    },
}

impl fmt::Display for SketchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchError::OutOfRange { param, value } => {
                write!(f, "'{param}' out of range: {value}")
            }
            SketchError::EmptySketch => write!(f, "sketch has not observed any weight"),
            SketchError::Incompatible { reason } => write!(f, "incompatible sketches: {reason}"),
            SketchError::NumericNonConvergence { detail } => {
                write!(f, "solver did not converge: {detail}")
            }
            SketchError::InvalidConfig { param, detail } => {
                write!(f, "invalid config for '{param}': {detail}")
            }
        }
    }
}

impl std::error::Error for SketchError {}

/// Result type alias for sketch operations
pub type Result<T> = std::result::Result<T, SketchError>;
