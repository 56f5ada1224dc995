//! Error types for time arithmetic and timecode conversion.

use thiserror::Error;

/// Errors produced by the time primitives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("{0} is not a supported timecode rate")]
    InvalidTimecodeRate(f64),

    #[error("timecode '{timecode}' uses the drop-frame divider ';' but {rate} is not a drop-frame rate")]
    NonDropFrameRate { timecode: String, rate: f64 },

    #[error("invalid timecode string: '{0}'")]
    InvalidTimecodeString(String),

    #[error("timecode '{timecode}' has frames beyond {}", .nominal_fps - 1)]
    TimecodeRateMismatch { timecode: String, nominal_fps: i64 },

    #[error("cannot format a negative time as timecode")]
    NegativeValue,

    #[error("{0} cannot be formatted as drop-frame timecode")]
    InvalidRateForDropFrameTimecode(f64),

    #[error("invalid time string: '{0}'")]
    InvalidTimeString(String),

    #[error("rate must be positive and finite, got {0}")]
    InvalidRate(f64),

    #[error("time range duration must not be negative")]
    NegativeDuration,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

/// Result type alias for time operations.
pub type Result<T> = std::result::Result<T, TimeError>;
