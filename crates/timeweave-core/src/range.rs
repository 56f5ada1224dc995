//! Half-open time ranges.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TimeError};
use crate::time::RationalTime;

/// Schema label used for the serialized form.
pub const TIME_RANGE_SCHEMA: &str = "TimeRange.1";

/// A time range covering `[start_time, start_time + duration)`.
///
/// A zero-duration range marks a single instant. It contains no times, but
/// it overlaps any range that contains its start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeRangeRepr", into = "TimeRangeRepr")]
pub struct TimeRange {
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    /// Create a new time range. The duration is not validated.
    #[inline]
    pub const fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// Create a new time range, rejecting negative durations.
    pub fn try_new(start_time: RationalTime, duration: RationalTime) -> Result<Self> {
        if duration.value() < Rational64::from_integer(0) {
            return Err(TimeError::NegativeDuration);
        }
        Ok(Self::new(start_time, duration))
    }

    /// Shorthand for a range whose start and duration share an integer rate.
    pub fn from_frames(start: i64, duration: i64, rate: i64) -> Self {
        Self::new(RationalTime::new(start, rate), RationalTime::new(duration, rate))
    }

    /// Build a range from a start and an exclusive end.
    /// The duration is expressed at `start`'s rate.
    pub fn range_from_start_end_time(start: RationalTime, end_exclusive: RationalTime) -> Self {
        Self::new(
            start,
            RationalTime::duration_from_start_end_time(start, end_exclusive),
        )
    }

    /// Empty range at zero.
    pub const EMPTY: Self = Self {
        start_time: RationalTime::ZERO,
        duration: RationalTime::ZERO,
    };

    /// Whether this range has zero duration.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.duration.is_zero()
    }

    /// `start + duration`, expressed at the duration's rate.
    pub fn end_time_exclusive(&self) -> RationalTime {
        self.start_time.rescaled_to(self.duration) + self.duration
    }

    /// The last whole frame inside the range.
    ///
    /// For ranges of at most one frame this is the start time. A fractional
    /// duration yields the floor of the exclusive end.
    pub fn end_time_inclusive(&self) -> RationalTime {
        let one = Rational64::from_integer(1);
        if self.duration.value() > one {
            let end = self.end_time_exclusive();
            if !self.duration.value().is_integer() {
                end.floor()
            } else {
                end - RationalTime::from_ratio(one, end.rate())
            }
        } else {
            self.start_time
        }
    }

    /// The same start with `other` added to the duration.
    pub fn duration_extended_by(&self, other: RationalTime) -> Self {
        Self::new(self.start_time, self.duration + other)
    }

    /// The smallest range covering both `self` and `other`.
    pub fn extended_by(&self, other: &Self) -> Self {
        let start = self.start_time.min(other.start_time);
        let end = self.end_time_exclusive().max(other.end_time_exclusive());
        Self::range_from_start_end_time(start, end)
    }

    /// Clamp a time into `[start_time, end_time_inclusive]`.
    pub fn clamped_time(&self, time: RationalTime) -> RationalTime {
        time.max(self.start_time).min(self.end_time_inclusive())
    }

    /// Clamp `other` so that it fits inside this range.
    pub fn clamped_range(&self, other: &Self) -> Self {
        let start = self.start_time.max(other.start_time);
        let end = self.end_time_exclusive().min(other.end_time_exclusive());
        if end <= start {
            return Self::new(start, RationalTime::zero_at(other.duration.rate()));
        }
        Self::range_from_start_end_time(start, end)
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(&self, time: RationalTime) -> bool {
        time >= self.start_time && time < self.end_time_exclusive()
    }

    /// Check if `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &Self) -> bool {
        self.start_time <= other.start_time
            && self.end_time_exclusive() >= other.end_time_exclusive()
    }

    /// A time overlaps a range exactly when the range contains it.
    #[inline]
    pub fn overlaps(&self, time: RationalTime) -> bool {
        self.contains(time)
    }

    /// Check if this range overlaps with another.
    ///
    /// Two instants overlap when they are the same time. An instant and a
    /// span overlap when the span contains the instant.
    pub fn overlaps_range(&self, other: &Self) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start_time == other.start_time,
            (true, false) => other.contains(self.start_time),
            (false, true) => self.contains(other.start_time),
            (false, false) => self.intersects(other),
        }
    }

    /// The ranges share a stretch of positive length.
    pub fn intersects(&self, other: &Self) -> bool {
        self.start_time < other.end_time_exclusive() && other.start_time < self.end_time_exclusive()
    }

    /// This range ends strictly before `other` starts.
    pub fn before(&self, other: &Self) -> bool {
        self.end_time_exclusive() < other.start_time
    }

    /// This range ends strictly before `time`.
    pub fn before_time(&self, time: RationalTime) -> bool {
        self.end_time_exclusive() < time
    }

    /// This range ends exactly where `other` starts.
    pub fn meets(&self, other: &Self) -> bool {
        self.end_time_exclusive() == other.start_time
    }

    /// Both ranges start together and this one ends first.
    pub fn begins(&self, other: &Self) -> bool {
        self.start_time == other.start_time
            && self.end_time_exclusive() < other.end_time_exclusive()
    }

    /// This range starts at `time`.
    pub fn begins_at(&self, time: RationalTime) -> bool {
        self.start_time == time
    }

    /// Both ranges end together and this one starts later.
    pub fn finishes(&self, other: &Self) -> bool {
        self.end_time_exclusive() == other.end_time_exclusive()
            && self.start_time > other.start_time
    }

    /// This range ends at `time`.
    pub fn finishes_at(&self, time: RationalTime) -> bool {
        self.end_time_exclusive() == time
    }

    /// Get the intersection of two ranges, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start_time.max(other.start_time);
        let end = self.end_time_exclusive().min(other.end_time_exclusive());

        if start < end {
            Some(Self::range_from_start_end_time(start, end))
        } else {
            None
        }
    }

    /// The same range with both halves at `rate`.
    pub fn rescaled_to(&self, rate: impl crate::time::AsRate) -> Self {
        let rate = rate.as_rate();
        Self::new(self.start_time.rescaled_to(rate), self.duration.rescaled_to(rate))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, +{})", self.start_time, self.duration)
    }
}

#[derive(Serialize, Deserialize)]
struct TimeRangeRepr {
    #[serde(rename = "OTIO_SCHEMA", default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    start_time: RationalTime,
    duration: RationalTime,
}

impl From<TimeRange> for TimeRangeRepr {
    fn from(r: TimeRange) -> Self {
        Self {
            schema: Some(TIME_RANGE_SCHEMA.to_string()),
            start_time: r.start_time,
            duration: r.duration,
        }
    }
}

impl TryFrom<TimeRangeRepr> for TimeRange {
    type Error = TimeError;

    fn try_from(repr: TimeRangeRepr) -> Result<Self> {
        match repr.schema.as_deref() {
            None | Some(TIME_RANGE_SCHEMA) => TimeRange::try_new(repr.start_time, repr.duration),
            Some(other) => Err(TimeError::TypeMismatch {
                expected: TIME_RANGE_SCHEMA.to_string(),
                found: other.to_string(),
            }),
        }
    }
}
