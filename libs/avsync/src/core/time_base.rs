// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Rational time bases and tick rescaling.
//!
//! Every timestamp in the crate is an integer tick count interpreted through a
//! [`Rational`] time base. Conversions go through `i128` so that
//! `value * num * den` never overflows for any `i64` tick count and any `i32`
//! time base, which keeps them exact up to the final rounding step.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// A rational number `num / den`, used as seconds-per-tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// One tick per millisecond (FLV, RTMP).
    pub const MILLISECONDS: Rational = Rational::new(1, 1_000);
    /// One tick per microsecond (the demuxer-internal base).
    pub const MICROSECONDS: Rational = Rational::new(1, 1_000_000);
    /// One tick per nanosecond (wall clock).
    pub const NANOSECONDS: Rational = Rational::new(1, 1_000_000_000);
    /// The 90 kHz MPEG clock.
    pub const MPEG_90K: Rational = Rational::new(1, 90_000);

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Both terms non-zero.
    pub fn is_valid(self) -> bool {
        self.num != 0 && self.den != 0
    }

    pub fn invert(self) -> Self {
        Self::new(self.den, self.num)
    }

    /// Lossy conversion for display and logging only.
    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

/// Rounding applied to the final division of a rescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Toward zero.
    Zero,
    /// Away from zero.
    Inf,
    /// Toward negative infinity.
    Down,
    /// Toward positive infinity.
    Up,
    /// To nearest, halfway cases away from zero.
    NearInf,
}

/// `value * b / c` with the given rounding, saturated to the `i64` range.
///
/// # Panics
///
/// Panics if `c` is zero.
pub fn rescale_rnd(value: i64, b: i64, c: i64, rounding: Rounding) -> i64 {
    assert!(c != 0, "rescale divisor must be non-zero");
    saturate(div_round(value as i128 * b as i128, c as i128, rounding))
}

/// Rescale a tick count between time bases, rounding to nearest.
///
/// This is the plain form used for durations: no value is treated specially.
///
/// # Panics
///
/// Panics if either time base has a zero denominator or `to` has a zero
/// numerator.
pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    rescale_q_rnd(value, from, to, Rounding::NearInf)
}

/// Rescale a tick count between time bases with an explicit rounding mode.
///
/// # Panics
///
/// Same conditions as [`rescale`].
pub fn rescale_q_rnd(value: i64, from: Rational, to: Rational, rounding: Rounding) -> i64 {
    check_time_base(from, "source");
    check_time_base(to, "target");
    let n = value as i128 * from.num as i128 * to.den as i128;
    let d = from.den as i128 * to.num as i128;
    saturate(div_round(n, d, rounding))
}

/// Rescale a presentation or decode timestamp.
///
/// Rounds to nearest and keeps the result inside the representable range.
/// `i64::MIN` and `i64::MAX` are treated as markers and pass through untouched,
/// so an unset timestamp stored as a sentinel survives the conversion.
pub fn rescale_timestamp(value: i64, from: Rational, to: Rational) -> i64 {
    if value == i64::MIN || value == i64::MAX {
        check_time_base(from, "source");
        check_time_base(to, "target");
        return value;
    }
    rescale_q_rnd(value, from, to, Rounding::NearInf).clamp(i64::MIN + 1, i64::MAX - 1)
}

/// Exact ordering of `a` (in `tb_a`) against `b` (in `tb_b`).
///
/// Compares the cross products as integers; no floating point is involved, so
/// two timestamps that denote the same instant always compare equal.
pub fn compare_ts(a: i64, tb_a: Rational, b: i64, tb_b: Rational) -> Ordering {
    check_time_base(tb_a, "left");
    check_time_base(tb_b, "right");
    // Fold the denominators' signs into the numerators so both scale factors
    // below are positive.
    let (a_num, a_den) = normalized(tb_a);
    let (b_num, b_den) = normalized(tb_b);
    let lhs = a as i128 * a_num * b_den;
    let rhs = b as i128 * b_num * a_den;
    lhs.cmp(&rhs)
}

/// Convert ticks into a wall-clock span. Negative tick counts map to zero.
pub fn ticks_to_duration(ticks: i64, time_base: Rational) -> Duration {
    let nanos = rescale(ticks, time_base, Rational::NANOSECONDS);
    if nanos <= 0 {
        Duration::ZERO
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

/// Convert a wall-clock span into ticks of `time_base`.
pub fn duration_to_ticks(duration: Duration, time_base: Rational) -> i64 {
    let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
    rescale(nanos, Rational::NANOSECONDS, time_base)
}

/// The nominal frame model of a stream: frame `n` starts at `n / frame_rate`
/// seconds, expressed in the stream's time base.
///
/// Each timestamp is rescaled from the exact frame index, so rounding never
/// accumulates over a session even when one frame is not a whole number of
/// ticks (30 fps in 1/1000). [`ticks`](Self::ticks) is the rounded length of
/// a single frame, for packet durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDuration {
    frame_rate: Rational,
    ticks: i64,
    time_base: Rational,
}

impl FrameDuration {
    /// # Panics
    ///
    /// Panics if `frame_rate` or `time_base` has a zero term.
    pub fn nominal(frame_rate: Rational, time_base: Rational) -> Self {
        assert!(frame_rate.is_valid(), "frame rate {frame_rate} must be non-zero");
        let ticks = rescale(1, frame_rate.invert(), time_base);
        Self {
            frame_rate,
            ticks,
            time_base,
        }
    }

    /// Rounded ticks per frame.
    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    /// Timestamp of the `index`-th frame, rounded to the nearest tick.
    pub fn pts_for(&self, index: u64) -> i64 {
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        rescale(index, self.frame_rate.invert(), self.time_base)
    }
}

fn check_time_base(tb: Rational, which: &str) {
    assert!(tb.den != 0, "{which} time base {tb} has a zero denominator");
    assert!(tb.num != 0, "{which} time base {tb} has a zero numerator");
}

fn normalized(tb: Rational) -> (i128, i128) {
    if tb.den < 0 {
        (-(tb.num as i128), -(tb.den as i128))
    } else {
        (tb.num as i128, tb.den as i128)
    }
}

fn div_round(n: i128, d: i128, rounding: Rounding) -> i128 {
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    let floor = n.div_euclid(d);
    let rem = n.rem_euclid(d);
    if rem == 0 {
        return floor;
    }
    match rounding {
        Rounding::Down => floor,
        Rounding::Up => floor + 1,
        Rounding::Zero => {
            if n < 0 {
                floor + 1
            } else {
                floor
            }
        }
        Rounding::Inf => {
            if n < 0 {
                floor
            } else {
                floor + 1
            }
        }
        Rounding::NearInf => match (2 * rem).cmp(&d) {
            Ordering::Less => floor,
            Ordering::Greater => floor + 1,
            Ordering::Equal if n < 0 => floor,
            Ordering::Equal => floor + 1,
        },
    }
}

fn saturate(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
