// THEORY:
// A `Confidence` is the strength of a classification or segmentation decision. It
// is not a calibrated probability, but it is always a finite number inside
// `[0, 1]`. Making it a newtype means no stage can ever report a value outside
// that range: the only way to obtain one is through a checked constructor.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("confidence {0} is outside [0, 1]")]
pub struct ConfidenceError(pub f64);

/// A finite score in `[0, 1]`, serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, ConfidenceError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfidenceError(value))
        }
    }

    /// Clamps into `[0, 1]`; NaN becomes 0.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() { Self(0.0) } else { Self(value.clamp(0.0, 1.0)) }
    }

    /// Rounds half away from zero to `decimals` digits before validating.
    pub fn rounded(value: f64, decimals: u32) -> Result<Self, ConfidenceError> {
        let scale = 10f64.powi(decimals as i32);
        Self::new((value * scale).round() / scale)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
