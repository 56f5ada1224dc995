//! Timeweave Core - exact time primitives for editorial timelines
//!
//! This crate provides the time vocabulary used throughout Timeweave:
//! - Time representation (RationalTime, FrameRate)
//! - Half-open ranges (TimeRange) and affine maps (TimeTransform)
//! - SMPTE timecode and clock-style time strings

pub mod error;
pub mod range;
pub mod time;
pub mod timecode;
pub mod transform;

pub use error::{Result, TimeError};
pub use range::TimeRange;
pub use time::{ratio_from_f64, ratio_to_f64, AsRate, FrameRate, RationalTime, MAX_DENOMINATOR};
pub use timecode::{is_drop_frame_rate, is_valid_timecode_rate, DropFrame};
pub use transform::TimeTransform;

/// Re-exported so callers can build exact rates without naming the crate.
pub use num_rational::Rational64;
