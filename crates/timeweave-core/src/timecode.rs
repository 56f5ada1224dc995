//! SMPTE timecode and clock-style time strings.
//!
//! Timecode is only defined for the fixed set of broadcast rates in
//! [`VALID_TIMECODE_RATES`]. The NTSC rates 29.97 and 59.94 (in both their
//! decimal and `x000/1001` spellings) additionally support drop-frame
//! counting, which skips two (or four) frame numbers at the start of every
//! minute not divisible by ten.

use num_rational::Rational64;
use num_traits::CheckedAdd;

use crate::error::{Result, TimeError};
use crate::time::{ratio_to_f64, AsRate, RationalTime};

/// Rates accepted for timecode conversion, as `(numerator, denominator)`.
pub const VALID_TIMECODE_RATES: [(i64, i64); 16] = [
    (1, 1),
    (12, 1),
    (2397, 100),
    (2997, 125),
    (1199, 50),
    (24000, 1001),
    (24, 1),
    (25, 1),
    (2997, 100),
    (30000, 1001),
    (30, 1),
    (48, 1),
    (50, 1),
    (2997, 50),
    (60000, 1001),
    (60, 1),
];

/// Rates that count in drop-frame when asked to infer.
pub const DROP_FRAME_RATES: [(i64, i64); 4] = [(2997, 100), (30000, 1001), (2997, 50), (60000, 1001)];

/// How to choose between drop-frame and non-drop-frame output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropFrame {
    /// Drop-frame exactly when the rate is an NTSC drop-frame rate.
    #[default]
    InferFromRate,
    ForceYes,
    ForceNo,
}

fn rate_in(rate: Rational64, table: &[(i64, i64)]) -> bool {
    table
        .iter()
        .any(|&(n, d)| Rational64::new(n, d) == rate)
}

/// Whether `rate` is one of the supported timecode rates.
pub fn is_valid_timecode_rate(rate: impl AsRate) -> bool {
    rate_in(rate.as_rate(), &VALID_TIMECODE_RATES)
}

/// Whether `rate` counts in drop-frame by default.
pub fn is_drop_frame_rate(rate: impl AsRate) -> bool {
    rate_in(rate.as_rate(), &DROP_FRAME_RATES)
}

/// Frame numbers skipped per minute for a drop-frame rate.
fn dropped_frames_per_minute(rate: Rational64) -> i64 {
    if rate.round() == Rational64::from_integer(30) {
        2
    } else {
        4
    }
}

impl RationalTime {
    /// Parse `HH:MM:SS:FF` (or `HH:MM:SS;FF` for drop-frame) at `rate`.
    pub fn from_timecode(timecode: &str, rate: impl AsRate) -> Result<Self> {
        let rate = rate.as_rate();
        if !is_valid_timecode_rate(rate) {
            return Err(TimeError::InvalidTimecodeRate(ratio_to_f64(rate)));
        }

        let drop_frame = timecode.contains(';');
        if drop_frame && !is_drop_frame_rate(rate) {
            return Err(TimeError::NonDropFrameRate {
                timecode: timecode.to_string(),
                rate: ratio_to_f64(rate),
            });
        }

        let invalid = || TimeError::InvalidTimecodeString(timecode.to_string());
        let fields: Vec<i64> = timecode
            .split([':', ';'])
            .map(|f| f.trim().parse::<i64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid())?;
        let [hours, minutes, seconds, frames] = fields[..] else {
            return Err(invalid());
        };
        if [hours, minutes, seconds, frames].iter().any(|v| *v < 0) {
            return Err(invalid());
        }

        let nominal_fps = rate.ceil().to_integer();
        if frames >= nominal_fps {
            return Err(TimeError::TimecodeRateMismatch {
                timecode: timecode.to_string(),
                nominal_fps,
            });
        }

        let dropped = if drop_frame {
            dropped_frames_per_minute(rate)
        } else {
            0
        };
        // Field values this large cannot be counted in frames.
        let total_minutes = hours
            .checked_mul(60)
            .and_then(|m| m.checked_add(minutes))
            .ok_or_else(invalid)?;
        let value = total_minutes
            .checked_mul(60)
            .and_then(|s| s.checked_add(seconds))
            .and_then(|s| s.checked_mul(nominal_fps))
            .and_then(|f| f.checked_add(frames))
            .and_then(|f| {
                let skipped = dropped.checked_mul(total_minutes - total_minutes / 10)?;
                f.checked_sub(skipped)
            })
            .ok_or_else(invalid)?;

        Ok(Self::from_ratio(Rational64::from_integer(value), rate))
    }

    /// Format this time as timecode at `rate`.
    ///
    /// Times past 24 hours wrap around.
    pub fn to_timecode(self, rate: impl AsRate, drop_frame: DropFrame) -> Result<String> {
        let mut rate = rate.as_rate();
        let frames_in_rate = self.value_rescaled_to(rate);
        if frames_in_rate < Rational64::from_integer(0) {
            return Err(TimeError::NegativeValue);
        }
        if !is_valid_timecode_rate(rate) {
            return Err(TimeError::InvalidTimecodeRate(ratio_to_f64(rate)));
        }

        let df_rate = is_drop_frame_rate(rate);
        let use_drop_frame = match drop_frame {
            DropFrame::ForceYes if !df_rate => {
                return Err(TimeError::InvalidRateForDropFrameTimecode(ratio_to_f64(rate)))
            }
            DropFrame::ForceYes => true,
            DropFrame::ForceNo => false,
            DropFrame::InferFromRate => df_rate,
        };

        let dropped = if use_drop_frame {
            dropped_frames_per_minute(rate)
        } else {
            // 23.976 and friends are labelled as plain 24 in non-drop timecode.
            if rate.round() == Rational64::from_integer(24) {
                rate = Rational64::from_integer(24);
            }
            0
        };
        let divider = if use_drop_frame { ';' } else { ':' };

        let frames_per_hour = (rate * 3600).round().to_integer();
        let frames_per_day = frames_per_hour * 24;
        let frames_per_ten_minutes = (rate * 600).round().to_integer();
        let frames_per_minute = rate.round().to_integer() * 60 - dropped;

        let mut value = frames_in_rate.floor().to_integer() % frames_per_day;

        if use_drop_frame {
            let ten_minute_chunks = value / frames_per_ten_minutes;
            let remainder = value % frames_per_ten_minutes;
            value += dropped * 9 * ten_minute_chunks;
            if remainder > dropped {
                value += dropped * ((remainder - dropped) / frames_per_minute);
            }
        }

        let nominal_fps = rate.ceil().to_integer();
        let frames = value % nominal_fps;
        let total_seconds = value / nominal_fps;
        let seconds = total_seconds % 60;
        let minutes = (total_seconds / 60) % 60;
        let hours = total_seconds / 3600;

        Ok(format!(
            "{:02}:{:02}:{:02}{}{:02}",
            hours, minutes, seconds, divider, frames
        ))
    }

    /// Parse a clock string `HH:MM:SS.fraction` and express it at `rate`.
    pub fn from_time_string(time_string: &str, rate: impl AsRate) -> Result<Self> {
        let rate = rate.as_rate();
        if !is_valid_timecode_rate(rate) {
            return Err(TimeError::InvalidTimecodeRate(ratio_to_f64(rate)));
        }
        let invalid = || TimeError::InvalidTimeString(time_string.to_string());

        let (negative, body) = match time_string.trim().strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, time_string.trim()),
        };
        let parts: Vec<&str> = body.split(':').collect();
        let [hours, minutes, seconds] = parts[..] else {
            return Err(invalid());
        };
        let hours: i64 = hours.parse().map_err(|_| invalid())?;
        let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
        let seconds = parse_decimal(seconds).ok_or_else(invalid)?;

        let whole = hours
            .checked_mul(3600)
            .and_then(|s| s.checked_add(minutes.checked_mul(60)?))
            .ok_or_else(invalid)?;
        let mut total = Rational64::from_integer(whole)
            .checked_add(&seconds)
            .ok_or_else(invalid)?;
        if negative {
            total = -total;
        }
        Ok(Self::from_seconds(total).rescaled_to(rate))
    }

    /// Format as `HH:MM:SS.ffffff`, trimming trailing zeros of the fraction.
    pub fn to_time_string(self) -> String {
        let seconds_total = self.to_seconds();
        let negative = seconds_total < Rational64::from_integer(0);
        let seconds_total = if negative { -seconds_total } else { seconds_total };

        let day = Rational64::from_integer(86_400);
        let within_day = seconds_total - (seconds_total / day).floor() * day;

        let hours = (within_day / 3600).floor();
        let rest = within_day - hours * 3600;
        let minutes = (rest / 60).floor();
        let seconds = rest - minutes * 60;
        let whole_seconds = seconds.floor();

        let micros = ((seconds - whole_seconds) * 1_000_000)
            .round()
            .to_integer()
            .min(999_999);
        let fraction = if micros == 0 {
            ".0".to_string()
        } else {
            format!(".{:06}", micros).trim_end_matches('0').to_string()
        };

        format!(
            "{}{:02}:{:02}:{:02}{}",
            if negative { "-" } else { "" },
            hours.to_integer(),
            minutes.to_integer(),
            whole_seconds.to_integer(),
            fraction
        )
    }
}

/// Parse a non-negative decimal such as `"07.25"` exactly.
fn parse_decimal(s: &str) -> Option<Rational64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 18 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let mut value = Rational64::from_integer(whole);
    if !frac.is_empty() {
        let digits: i64 = frac.parse().ok()?;
        value = value.checked_add(&Rational64::new(digits, 10_i64.pow(frac.len() as u32)))?;
    }
    Some(value)
}
