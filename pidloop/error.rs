//! Error types for the control core

use thiserror::Error;

/// Root error type for pidloop
#[derive(Error, Debug)]
pub enum PidLoopError {
    /// A tunable parameter was given a value it cannot hold.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub type PidLoopResult<T> = Result<T, PidLoopError>;

/// Reject NaN and infinities.
pub(crate) fn require_finite(name: &'static str, value: f64) -> PidLoopResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PidLoopError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}

/// Reject anything that is not a finite, non-negative magnitude.
pub(crate) fn require_non_negative(name: &'static str, value: f64) -> PidLoopResult<f64> {
    let value = require_finite(name, value)?;
    if value < 0.0 {
        return Err(PidLoopError::InvalidParameter {
            name,
            value,
            reason: "must be >= 0",
        });
    }
    Ok(value)
}

/// Reject anything that is not finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f64) -> PidLoopResult<f64> {
    let value = require_finite(name, value)?;
    if value <= 0.0 {
        return Err(PidLoopError::InvalidParameter {
            name,
            value,
            reason: "must be > 0",
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_finite() {
        assert!(require_finite("p", 1.5).is_ok());
        assert!(require_finite("p", -3.0).is_ok());
        assert!(require_finite("p", f64::NAN).is_err());
        assert!(require_finite("p", f64::INFINITY).is_err());
    }

    #[test]
    fn test_require_positive_rejects_zero() {
        let err = require_positive("mass", 0.0).unwrap_err();
        assert!(err.to_string().contains("mass"));
        assert!(matches!(
            err,
            PidLoopError::InvalidParameter { name: "mass", reason: "must be > 0", .. }
        ));
        assert!(require_positive("mass", 1e-9).is_ok());
    }

    #[test]
    fn test_require_non_negative_accepts_zero() {
        assert_eq!(require_non_negative("saturation", 0.0).unwrap(), 0.0);
        assert!(require_non_negative("saturation", -1.0).is_err());
    }
}
