//! Epoch normalization.
//!
//! Cluster APIs report timestamps in seconds, milliseconds, microseconds or
//! nanoseconds without saying which. Everything in this crate works in whole
//! seconds, so raw values are reduced by their decimal magnitude:
//!
//! | digits  | read as      | divisor        |
//! |---------|--------------|----------------|
//! | <= 10   | seconds      | 1              |
//! | 11..=13 | milliseconds | 1000           |
//! | > 13    | finer        | 10^(digits-10) |
//!
//! The digit count is a heuristic. A second-resolution epoch past the year
//! 2286 has 11 digits and is misread as milliseconds; callers holding such
//! values must not pass them through here.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::types::TimeUnit;

/// Whole seconds since 1970-01-01T00:00:00Z.
pub type Epoch = i64;

const SECONDS_DIGITS: u32 = 10;
const MILLIS_DIGITS: u32 = 13;

/// Reduce a timestamp of unknown magnitude to whole seconds.
///
/// # Examples
///
/// ```
/// use hourglass_core::epoch::normalize;
///
/// assert_eq!(normalize(1459287636), 1459287636);
/// assert_eq!(normalize(1459287636999), 1459287636);
/// assert_eq!(normalize(1459287636123456789), 1459287636);
/// ```
pub fn normalize(raw: i64) -> Epoch {
    let digits = raw.unsigned_abs().checked_ilog10().map_or(1, |log| log + 1);
    if digits <= SECONDS_DIGITS {
        raw
    } else if digits <= MILLIS_DIGITS {
        raw / 1_000
    } else {
        raw / 10_i64.pow(digits - SECONDS_DIGITS)
    }
}

/// Parse a textual timestamp and normalize it.
///
/// Fails with [`Error::InvalidEpoch`] when the text is not an integer.
pub fn parse_epoch(raw: &str) -> Result<Epoch> {
    raw.trim()
        .parse::<i64>()
        .map(normalize)
        .map_err(|_| Error::InvalidEpoch {
            value: raw.to_string(),
        })
}

/// The current time in whole seconds.
pub fn now() -> Epoch {
    Utc::now().timestamp()
}

/// Move `count` units back from `reference` (or from now).
///
/// A negative `count` moves forward. Uses the fixed multipliers of
/// [`TimeUnit::seconds`], so months are 30 days and years 365.
pub fn point_of_reference(unit: TimeUnit, count: i64, reference: Option<Epoch>) -> Epoch {
    let reference = normalize(reference.unwrap_or_else(now));
    reference - unit.seconds() * count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_by_magnitude() {
        let cases = [
            (1459287636, 1459287636),
            (14592876369, 14592876),
            (145928763699, 145928763),
            (1459287636999, 1459287636),
            (1459287636000000, 1459287636),
            (145928763600000000, 1459287636),
            (145928763600000001, 1459287636),
            (1459287636123456789, 1459287636),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize(raw), expected, "raw value {raw}");
        }
    }

    #[test]
    fn test_normalize_small_values() {
        assert_eq!(normalize(0), 0);
        assert_eq!(normalize(7), 7);
        assert_eq!(normalize(-86_400), -86_400);
    }

    #[test]
    fn test_normalize_millisecond_idempotence() {
        for epoch in [1, 86_400, 1_000_000_000, 1459287636, 9_999_999_999] {
            assert_eq!(normalize(epoch * 1_000), normalize(epoch), "epoch {epoch}");
        }
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("1459287636999").unwrap(), 1459287636);
        assert_eq!(parse_epoch(" 1459287636 ").unwrap(), 1459287636);

        let err = parse_epoch("yesterday").unwrap_err();
        assert!(matches!(err, Error::InvalidEpoch { .. }));
        assert!(parse_epoch("").is_err());
        assert!(parse_epoch("1459287636.5").is_err());
    }

    #[test]
    fn test_point_of_reference() {
        let epoch = 1459288037;
        let cases = [
            (TimeUnit::Seconds, epoch - 1),
            (TimeUnit::Minutes, epoch - 60),
            (TimeUnit::Hours, epoch - 3600),
            (TimeUnit::Days, epoch - 86400),
            (TimeUnit::Weeks, epoch - 86400 * 7),
            (TimeUnit::Months, epoch - 86400 * 30),
            (TimeUnit::Years, epoch - 86400 * 365),
        ];
        for (unit, expected) in cases {
            assert_eq!(point_of_reference(unit, 1, Some(epoch)), expected, "{unit}");
        }
    }

    #[test]
    fn test_point_of_reference_forward_and_millis() {
        assert_eq!(
            point_of_reference(TimeUnit::Days, -2, Some(1459288037000)),
            1459288037 + 2 * 86400
        );
    }
}
