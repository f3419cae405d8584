// Sample validation error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Sample error code constants
///
/// Single source of truth for the numeric codes reported by `SampleError`.
///
/// Error code range: 1001-1004
pub struct SampleErrorCodes {}

impl SampleErrorCodes {
    /// A required band key was absent from the raw sample
    pub const MISSING_BAND: i32 = 1001;

    /// The raw sample carried a band key outside the fixed five
    pub const UNKNOWN_BAND: i32 = 1002;

    /// A band magnitude was NaN or infinite
    pub const NON_FINITE_BAND: i32 = 1003;

    /// Quality was outside [0, 1] or not a finite number
    pub const QUALITY_OUT_OF_RANGE: i32 = 1004;
}

/// Log a rejected sample with structured context
///
/// Rejections are expected during replay of noisy recordings, so they are
/// logged at warn level rather than error.
pub fn log_sample_error(err: &SampleError, context: &str) {
    warn!(
        "Sample rejected in {}: code={}, component=BandAggregator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Malformed-input errors raised before a sample enters the aggregation window
///
/// Error code range: 1001-1004
#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Band key missing from the raw sample
    MissingBand { band: String },

    /// Band key not one of delta/theta/alpha/beta/gamma
    UnknownBand { band: String },

    /// Band magnitude is NaN or infinite
    NonFiniteBand { band: String, value: f32 },

    /// Quality outside the closed unit interval
    QualityOutOfRange { quality: f32 },
}

impl ErrorCode for SampleError {
    fn code(&self) -> i32 {
        match self {
            SampleError::MissingBand { .. } => SampleErrorCodes::MISSING_BAND,
            SampleError::UnknownBand { .. } => SampleErrorCodes::UNKNOWN_BAND,
            SampleError::NonFiniteBand { .. } => SampleErrorCodes::NON_FINITE_BAND,
            SampleError::QualityOutOfRange { .. } => SampleErrorCodes::QUALITY_OUT_OF_RANGE,
        }
    }

    fn message(&self) -> String {
        match self {
            SampleError::MissingBand { band } => format!("Sample is missing band '{}'", band),
            SampleError::UnknownBand { band } => format!("Sample has unknown band '{}'", band),
            SampleError::NonFiniteBand { band, value } => {
                format!("Band '{}' has non-finite magnitude {}", band, value)
            }
            SampleError::QualityOutOfRange { quality } => {
                format!("Quality must be within [0, 1] (got {})", quality)
            }
        }
    }
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SampleError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SampleError {}
