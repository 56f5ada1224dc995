//! Affine maps on the time axis.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

use crate::error::{Result, TimeError};
use crate::range::TimeRange;
use crate::time::{ratio_from_f64, ratio_to_f64, RationalTime};

/// Schema label used for the serialized form.
pub const TIME_TRANSFORM_SCHEMA: &str = "TimeTransform.1";

/// Maps a time `t` to `t * scale + offset`, optionally rescaled to `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeTransformRepr", into = "TimeTransformRepr")]
pub struct TimeTransform {
    pub offset: RationalTime,
    pub scale: Rational64,
    pub rate: Option<Rational64>,
}

impl Default for TimeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TimeTransform {
    pub const IDENTITY: Self = Self {
        offset: RationalTime::ZERO,
        scale: Rational64::new_raw(1, 1),
        rate: None,
    };

    pub fn new(offset: RationalTime, scale: Rational64, rate: Option<Rational64>) -> Self {
        Self {
            offset,
            scale,
            rate,
        }
    }

    /// A pure shift by `offset`.
    pub fn offset_by(offset: RationalTime) -> Self {
        Self::new(offset, Rational64::from_integer(1), None)
    }

    pub fn applied_to_time(&self, time: RationalTime) -> RationalTime {
        let scaled = time * self.scale + self.offset;
        match self.rate {
            Some(rate) => scaled.rescaled_to(rate),
            None => scaled,
        }
    }

    /// Maps both ends of `range`. A negative scale gives a negative duration.
    pub fn applied_to_range(&self, range: &TimeRange) -> TimeRange {
        TimeRange::range_from_start_end_time(
            self.applied_to_time(range.start_time),
            self.applied_to_time(range.end_time_exclusive()),
        )
    }

    /// The transform that undoes this one, if the scale is non-zero.
    /// The inverse carries no target rate.
    pub fn inverted(&self) -> Option<Self> {
        if *self.scale.numer() == 0 {
            return None;
        }
        let inv = self.scale.recip();
        Some(Self::new(-(self.offset * inv), inv, None))
    }
}

/// `a * b` applies `b` first, then `a`.
impl Mul for TimeTransform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            offset: rhs.offset * self.scale + self.offset,
            scale: self.scale * rhs.scale,
            rate: self.rate.or(rhs.rate),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TimeTransformRepr {
    #[serde(rename = "OTIO_SCHEMA", default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    offset: RationalTime,
    scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rate: Option<f64>,
}

impl From<TimeTransform> for TimeTransformRepr {
    fn from(t: TimeTransform) -> Self {
        Self {
            schema: Some(TIME_TRANSFORM_SCHEMA.to_string()),
            offset: t.offset,
            scale: ratio_to_f64(t.scale),
            rate: t.rate.map(ratio_to_f64),
        }
    }
}

impl TryFrom<TimeTransformRepr> for TimeTransform {
    type Error = TimeError;

    fn try_from(repr: TimeTransformRepr) -> Result<Self> {
        if let Some(schema) = repr.schema.as_deref() {
            if schema != TIME_TRANSFORM_SCHEMA {
                return Err(TimeError::TypeMismatch {
                    expected: TIME_TRANSFORM_SCHEMA.to_string(),
                    found: schema.to_string(),
                });
            }
        }
        let scale = ratio_from_f64(repr.scale).ok_or_else(|| TimeError::TypeMismatch {
            expected: "finite scale".to_string(),
            found: repr.scale.to_string(),
        })?;
        // Older files write a non-positive rate to mean "none".
        let rate = match repr.rate {
            Some(r) if r > 0.0 => Some(ratio_from_f64(r).ok_or(TimeError::InvalidRate(r))?),
            _ => None,
        };
        Ok(Self::new(repr.offset, scale, rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rt(v: i64) -> RationalTime {
        RationalTime::new(v, 24)
    }

    #[test]
    fn test_identity() {
        let t = rt(17);
        assert_eq!(TimeTransform::IDENTITY.applied_to_time(t), t);
    }

    #[test]
    fn test_offset_and_scale() {
        let xf = TimeTransform::new(rt(10), Rational64::from_integer(2), None);
        assert_eq!(xf.applied_to_time(rt(5)), rt(20));
        let range = xf.applied_to_range(&TimeRange::from_frames(0, 4, 24));
        assert_eq!(range, TimeRange::from_frames(10, 8, 24));
    }

    #[test]
    fn test_rate_rescales_result() {
        let xf = TimeTransform::new(
            RationalTime::zero_at(24),
            Rational64::from_integer(1),
            Some(Rational64::from_integer(48)),
        );
        let out = xf.applied_to_time(rt(3));
        assert_eq!(out.rate(), Rational64::from_integer(48));
        assert_eq!(out.value(), Rational64::from_integer(6));
    }

    #[test]
    fn test_composition_applies_right_first() {
        let shift = TimeTransform::offset_by(rt(10));
        let double = TimeTransform::new(rt(0), Rational64::from_integer(2), None);
        let t = rt(3);
        assert_eq!(
            (double * shift).applied_to_time(t),
            double.applied_to_time(shift.applied_to_time(t))
        );
        assert_eq!(
            (shift * double).applied_to_time(t),
            shift.applied_to_time(double.applied_to_time(t))
        );
        assert_eq!((double * shift).applied_to_time(t), rt(26));
    }

    #[test]
    fn test_inverted() {
        let xf = TimeTransform::new(rt(6), Rational64::new(3, 2), None);
        let inv = xf.inverted().unwrap();
        assert_eq!(inv.applied_to_time(xf.applied_to_time(rt(8))), rt(8));
        let freeze = TimeTransform::new(rt(6), Rational64::from_integer(0), None);
        assert!(freeze.inverted().is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let xf = TimeTransform::new(rt(6), Rational64::new(1, 2), None);
        let json = serde_json::to_value(xf).unwrap();
        assert_eq!(json["OTIO_SCHEMA"], "TimeTransform.1");
        let back: TimeTransform = serde_json::from_value(json).unwrap();
        assert_eq!(back, xf);
    }
}
