//! Validation utilities for sketch construction and query parameters

use crate::error::{Result, SketchError};

/// Minimum number of moments an M-Sketch may be configured with
pub const MIN_MOMENTS: usize = 4;
/// Maximum number of moments an M-Sketch may be configured with
pub const MAX_MOMENTS: usize = 20;

/// Validate that alpha (relative accuracy) lies in the open interval (0, 1)
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha.is_finite() && alpha > 0.0 && alpha < 1.0) {
        return Err(SketchError::InvalidConfig {
            param: "alpha",
            detail: "must be in (0, 1)".to_string(),
        });
    }
    Ok(())
}

/// Validate that a quantile rank lies in the closed interval [0, 1]
pub fn validate_quantile(q: f64) -> Result<()> {
    if !(q.is_finite() && (0.0..=1.0).contains(&q)) {
        return Err(SketchError::OutOfRange { param: "q", value: q });
    }
    Ok(())
}

/// Validate a size cap: `None` means unbounded, `Some(0)` is rejected
pub fn validate_size_cap(size_cap: Option<usize>) -> Result<()> {
    if let Some(0) = size_cap {
        return Err(SketchError::InvalidConfig {
            param: "size_cap",
            detail: "must be greater than 0 when bounded".to_string(),
        });
    }
    Ok(())
}

/// Validate the moment count `k` for an M-Sketch: `[4, 20]`
pub fn validate_k(k: usize) -> Result<()> {
    if !(MIN_MOMENTS..=MAX_MOMENTS).contains(&k) {
        return Err(SketchError::InvalidConfig {
            param: "k",
            detail: format!("must be in range [{MIN_MOMENTS}, {MAX_MOMENTS}]"),
        });
    }
    Ok(())
}

/// Validate an insert weight: must be finite and non-negative
pub fn validate_weight(weight: f64) -> Result<()> {
    if !(weight.is_finite() && weight >= 0.0) {
        return Err(SketchError::OutOfRange {
            param: "weight",
            value: weight,
        });
    }
    Ok(())
}

/// Validate an insert value: must be finite (Non-goal: no NaN/Inf support)
pub fn validate_finite(param: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(SketchError::OutOfRange { param, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_bounds() {
        assert!(validate_alpha(0.01).is_ok());
        assert!(validate_alpha(0.0).is_err());
        assert!(validate_alpha(1.0).is_err());
        assert!(validate_alpha(f64::NAN).is_err());
    }

    #[test]
    fn quantile_bounds() {
        assert!(validate_quantile(0.0).is_ok());
        assert!(validate_quantile(1.0).is_ok());
        assert!(validate_quantile(-0.01).is_err());
        assert!(validate_quantile(1.01).is_err());
    }

    #[test]
    fn size_cap_rejects_zero() {
        assert!(validate_size_cap(None).is_ok());
        assert!(validate_size_cap(Some(128)).is_ok());
        assert!(validate_size_cap(Some(0)).is_err());
    }

    #[test]
    fn k_bounds() {
        assert!(validate_k(4).is_ok());
        assert!(validate_k(20).is_ok());
        assert!(validate_k(3).is_err());
        assert!(validate_k(21).is_err());
    }
}
