//! Time representation for frame-accurate editing
//!
//! A `RationalTime` is a `(value, rate)` pair meaning `value / rate` seconds.
//! Both halves are exact rationals so rescaling between rates never loses
//! precision, and comparisons are made on exact seconds rather than on the
//! raw values.

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::error::{Result, TimeError};

/// Schema label used for the serialized form.
pub const RATIONAL_TIME_SCHEMA: &str = "RationalTime.1";

/// Convert an exact rational to the nearest `f64`.
#[inline]
pub fn ratio_to_f64(r: Rational64) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}

/// Largest denominator kept when a float is turned into a fraction.
pub const MAX_DENOMINATOR: i64 = 1_000_000;

/// Floats this close to a whole number are read as that whole number.
const GRID_TOLERANCE: f64 = 1e-9;

/// Approximate a float by the closest fraction whose denominator is at
/// most [`MAX_DENOMINATOR`]. Values within a hair of a whole number snap
/// onto it.
pub fn ratio_from_f64(f: f64) -> Option<Rational64> {
    if !f.is_finite() || f.abs() >= i64::MAX as f64 {
        return None;
    }
    let whole = f.round();
    let tolerance = GRID_TOLERANCE.max(4.0 * f64::EPSILON * f.abs());
    if (f - whole).abs() <= tolerance {
        return Some(Rational64::from_integer(whole as i64));
    }
    limit_denominator(f, MAX_DENOMINATOR)
}

/// Best rational approximation of `f` with a bounded denominator, walking
/// the continued fraction expansion and trying the last semiconvergent.
fn limit_denominator(f: f64, max_denominator: i64) -> Option<Rational64> {
    let target = f.abs();
    let (mut p0, mut q0, mut p1, mut q1) = (0_i64, 1_i64, 1_i64, 0_i64);
    let mut x = target;
    let mut bounded = false;
    loop {
        let a = x.floor();
        if a >= i64::MAX as f64 {
            break;
        }
        let a_int = a as i64;
        let Some(q2) = a_int.checked_mul(q1).and_then(|v| v.checked_add(q0)) else {
            break;
        };
        if q2 > max_denominator {
            bounded = true;
            break;
        }
        let Some(p2) = a_int.checked_mul(p1).and_then(|v| v.checked_add(p0)) else {
            break;
        };
        (p0, q0, p1, q1) = (p1, q1, p2, q2);
        let frac = x - a;
        let close = (p1 as f64 / q1 as f64 - target).abs() <= f64::EPSILON * target.max(1.0);
        if frac == 0.0 || close {
            break;
        }
        x = 1.0 / frac;
    }
    if q1 == 0 {
        return None;
    }
    let (mut numer, mut denom) = (p1, q1);
    if bounded {
        let k = (max_denominator - q0) / q1;
        let semi = k
            .checked_mul(p1)
            .and_then(|v| v.checked_add(p0))
            .zip(k.checked_mul(q1).and_then(|v| v.checked_add(q0)));
        if let Some((sp, sq)) = semi {
            let semi_err = (sp as f64 / sq as f64 - target).abs();
            let conv_err = (p1 as f64 / q1 as f64 - target).abs();
            if sq > 0 && semi_err < conv_err {
                (numer, denom) = (sp, sq);
            }
        }
    }
    if f < 0.0 {
        numer = -numer;
    }
    Some(Rational64::new(numer, denom))
}

/// Nearest bounded fraction to `f`, saturating at the ends of the `i64`
/// range. Used when exact arithmetic would overflow.
fn saturating_ratio(f: f64) -> Rational64 {
    ratio_from_f64(f).unwrap_or_else(|| {
        if f.is_nan() {
            Rational64::from_integer(0)
        } else if f > 0.0 {
            Rational64::from_integer(i64::MAX)
        } else {
            Rational64::from_integer(-i64::MAX)
        }
    })
}

/// Anything that can name a rate: an integer, an exact rational, a
/// `FrameRate`, or another `RationalTime` (whose rate is used).
pub trait AsRate {
    fn as_rate(&self) -> Rational64;
}

impl AsRate for i64 {
    fn as_rate(&self) -> Rational64 {
        Rational64::from_integer(*self)
    }
}

impl AsRate for Rational64 {
    fn as_rate(&self) -> Rational64 {
        *self
    }
}

impl AsRate for RationalTime {
    fn as_rate(&self) -> Rational64 {
        self.rate
    }
}

impl AsRate for FrameRate {
    fn as_rate(&self) -> Rational64 {
        Rational64::new(self.numerator as i64, self.denominator as i64)
    }
}

/// A point in time expressed as `value` units of `1 / rate` seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RationalTimeRepr", into = "RationalTimeRepr")]
pub struct RationalTime {
    value: Rational64,
    rate: Rational64,
}

impl RationalTime {
    /// Create a time of `value` frames at an integer `rate`.
    ///
    /// # Panics
    /// Panics if `rate` is not positive.
    #[inline]
    pub fn new(value: i64, rate: i64) -> Self {
        Self::from_ratio(Rational64::from_integer(value), Rational64::from_integer(rate))
    }

    /// Create a time from exact rational value and rate.
    ///
    /// # Panics
    /// Panics if `rate` is not positive.
    #[inline]
    pub fn from_ratio(value: Rational64, rate: Rational64) -> Self {
        assert!(
            rate > Rational64::from_integer(0),
            "RationalTime rate must be positive"
        );
        Self { value, rate }
    }

    /// Fallible constructor for untrusted rates.
    pub fn try_from_ratio(value: Rational64, rate: Rational64) -> Result<Self> {
        if rate <= Rational64::from_integer(0) {
            return Err(TimeError::InvalidRate(ratio_to_f64(rate)));
        }
        Ok(Self { value, rate })
    }

    /// Create a time from floating point value and rate.
    ///
    /// Each float is replaced by the closest fraction with a bounded
    /// denominator, and a value within a hair of a whole frame lands exactly
    /// on that frame.
    pub fn from_f64(value: f64, rate: f64) -> Result<Self> {
        let rate_ratio = ratio_from_f64(rate)
            .filter(|r| *r > Rational64::from_integer(0))
            .ok_or(TimeError::InvalidRate(rate))?;
        let value_ratio = ratio_from_f64(value).ok_or_else(|| TimeError::TypeMismatch {
            expected: "finite time value".to_string(),
            found: value.to_string(),
        })?;
        Ok(Self {
            value: value_ratio,
            rate: rate_ratio,
        })
    }

    /// Create a RationalTime from a frame number and rate.
    #[inline]
    pub fn from_frames(frames: i64, rate: impl AsRate) -> Self {
        Self::from_ratio(Rational64::from_integer(frames), rate.as_rate())
    }

    /// Create a RationalTime from exact seconds (rate 1).
    #[inline]
    pub fn from_seconds(seconds: Rational64) -> Self {
        Self {
            value: seconds,
            rate: Rational64::from_integer(1),
        }
    }

    /// Create a RationalTime from seconds as a float.
    /// Note: May introduce small precision errors.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        // Use a high denominator for reasonable precision
        const PRECISION: i64 = 1_000_000;
        Self::from_seconds(Rational64::new(
            (seconds * PRECISION as f64).round() as i64,
            PRECISION,
        ))
    }

    #[inline]
    pub fn value(self) -> Rational64 {
        self.value
    }

    #[inline]
    pub fn rate(self) -> Rational64 {
        self.rate
    }

    #[inline]
    pub fn value_f64(self) -> f64 {
        ratio_to_f64(self.value)
    }

    #[inline]
    pub fn rate_f64(self) -> f64 {
        ratio_to_f64(self.rate)
    }

    /// Exact number of seconds, or the nearest bounded fraction when the
    /// exact quotient does not fit.
    #[inline]
    pub fn to_seconds(self) -> Rational64 {
        self.value
            .checked_div(&self.rate)
            .unwrap_or_else(|| saturating_ratio(self.value_f64() / self.rate_f64()))
    }

    /// Convert to seconds as f64.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        ratio_to_f64(self.to_seconds())
    }

    /// The value this time would have at `new_rate`.
    pub fn value_rescaled_to(self, new_rate: impl AsRate) -> Rational64 {
        let new_rate = new_rate.as_rate();
        self.checked_value_rescaled_to(new_rate)
            .unwrap_or_else(|| saturating_ratio(self.value_f64_at(new_rate)))
    }

    /// Exact rescale, or `None` if it overflows.
    pub fn checked_value_rescaled_to(self, new_rate: impl AsRate) -> Option<Rational64> {
        let new_rate = new_rate.as_rate();
        if new_rate == self.rate {
            return Some(self.value);
        }
        self.value.checked_mul(&new_rate)?.checked_div(&self.rate)
    }

    fn value_f64_at(self, rate: Rational64) -> f64 {
        self.value_f64() * ratio_to_f64(rate) / self.rate_f64()
    }

    /// The same instant expressed at `new_rate`.
    pub fn rescaled_to(self, new_rate: impl AsRate) -> Self {
        let new_rate = new_rate.as_rate();
        Self::from_ratio(self.value_rescaled_to(new_rate), new_rate)
    }

    /// Frame number at `rate`, rounded towards negative infinity.
    #[inline]
    pub fn to_frames(self, rate: impl AsRate) -> i64 {
        self.value_rescaled_to(rate).floor().to_integer()
    }

    /// True when both times agree within `delta` units of `other`'s rate.
    pub fn almost_equal(self, other: Self, delta: f64) -> bool {
        let diff = match self
            .checked_value_rescaled_to(other.rate)
            .and_then(|v| v.checked_sub(&other.value))
        {
            Some(diff) => ratio_to_f64(diff),
            None => self.value_f64_at(other.rate) - other.value_f64(),
        };
        diff.abs() <= delta
    }

    /// Largest whole value at the same rate that does not exceed this one.
    pub fn floor(self) -> Self {
        Self {
            value: self.value.floor(),
            rate: self.rate,
        }
    }

    pub fn ceil(self) -> Self {
        Self {
            value: self.value.ceil(),
            rate: self.rate,
        }
    }

    pub fn round(self) -> Self {
        Self {
            value: self.value.round(),
            rate: self.rate,
        }
    }

    /// Zero time constant.
    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
        rate: Rational64::new_raw(1, 1),
    };

    /// Zero at a specific rate.
    pub fn zero_at(rate: impl AsRate) -> Self {
        Self::from_ratio(Rational64::from_integer(0), rate.as_rate())
    }

    /// Check if this time is zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }

    /// Get the absolute value of this time.
    #[inline]
    pub fn abs(self) -> Self {
        if *self.value.numer() < 0 {
            -self
        } else {
            self
        }
    }

    /// Duration between `start` and `end_exclusive`, expressed at `start`'s rate.
    pub fn duration_from_start_end_time(start: Self, end_exclusive: Self) -> Self {
        let rate = start.rate;
        let value = end_exclusive
            .checked_value_rescaled_to(rate)
            .and_then(|end| end.checked_sub(&start.value))
            .unwrap_or_else(|| {
                saturating_ratio(end_exclusive.value_f64_at(rate) - start.value_f64())
            });
        Self { value, rate }
    }

    /// Exact sum at the larger of the two rates, or `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (a, b, rate) = self.common_values(rhs)?;
        Some(Self {
            value: a.checked_add(&b)?,
            rate,
        })
    }

    /// Exact difference at the larger of the two rates, or `None` on overflow.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let (a, b, rate) = self.common_values(rhs)?;
        Some(Self {
            value: a.checked_sub(&b)?,
            rate,
        })
    }

    /// Bring two times to the larger of their rates.
    fn common_values(self, other: Self) -> Option<(Rational64, Rational64, Rational64)> {
        if self.rate == other.rate {
            Some((self.value, other.value, self.rate))
        } else if self.rate > other.rate {
            Some((self.value, other.checked_value_rescaled_to(self.rate)?, self.rate))
        } else {
            Some((self.checked_value_rescaled_to(other.rate)?, other.value, other.rate))
        }
    }

    /// Combine two times in floating point at the larger rate and snap the
    /// result back onto a bounded fraction.
    fn approximate(self, rhs: Self, op: fn(f64, f64) -> f64) -> Self {
        let rate = self.rate.max(rhs.rate);
        Self {
            value: saturating_ratio(op(self.value_f64_at(rate), rhs.value_f64_at(rate))),
            rate,
        }
    }

    fn with_value(self, value: Option<Rational64>, fallback: f64) -> Self {
        Self {
            value: value.unwrap_or_else(|| saturating_ratio(fallback)),
            rate: self.rate,
        }
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.to_seconds() == other.to_seconds()
    }
}

impl Eq for RationalTime {}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RationalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_seconds().cmp(&other.to_seconds())
    }
}

impl Hash for RationalTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_seconds().hash(state);
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs)
            .unwrap_or_else(|| self.approximate(rhs, |a, b| a + b))
    }
}

impl AddAssign for RationalTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs)
            .unwrap_or_else(|| self.approximate(rhs, |a, b| a - b))
    }
}

impl SubAssign for RationalTime {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            value: -self.value,
            rate: self.rate,
        }
    }
}

impl Mul<i64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        let value = self.value.checked_mul(&Rational64::from_integer(rhs));
        self.with_value(value, self.value_f64() * rhs as f64)
    }
}

impl Mul<Rational64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: Rational64) -> Self {
        let value = self.value.checked_mul(&rhs);
        self.with_value(value, self.value_f64() * ratio_to_f64(rhs))
    }
}

impl Div<i64> for RationalTime {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        let value = self.value.checked_div(&Rational64::from_integer(rhs));
        self.with_value(value, self.value_f64() / rhs as f64)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.rate)
    }
}

#[derive(Serialize, Deserialize)]
struct RationalTimeRepr {
    #[serde(rename = "OTIO_SCHEMA", default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    value: f64,
    rate: f64,
}

impl From<RationalTime> for RationalTimeRepr {
    fn from(t: RationalTime) -> Self {
        Self {
            schema: Some(RATIONAL_TIME_SCHEMA.to_string()),
            value: t.value_f64(),
            rate: t.rate_f64(),
        }
    }
}

impl TryFrom<RationalTimeRepr> for RationalTime {
    type Error = TimeError;

    fn try_from(repr: RationalTimeRepr) -> Result<Self> {
        match repr.schema.as_deref() {
            None | Some(RATIONAL_TIME_SCHEMA) => RationalTime::from_f64(repr.value, repr.rate),
            Some(other) => Err(TimeError::TypeMismatch {
                expected: RATIONAL_TIME_SCHEMA.to_string(),
                found: other.to_string(),
            }),
        }
    }
}

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 24000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame.
    #[inline]
    pub fn frame_duration(self) -> RationalTime {
        RationalTime::from_frames(1, self)
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_48: Self = Self::new(48, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
