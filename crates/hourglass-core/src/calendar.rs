//! Calendar windows.
//!
//! A relative window is counted in whole calendar units from a point of
//! reference, e.g. "the last three days" or "this month and the next two".
//! An absolute window is spelled out by two literal dates.
//!
//! All arithmetic happens in UTC. Months and years are stepped by calendar
//! field, so they follow real month lengths and leap years.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use tracing::debug;

use crate::epoch::{self, Epoch};
use crate::error::{Error, Result};
use crate::pattern::parse_timestamp;
use crate::types::{DateRange, TimeUnit, WeekStart};

/// Resolve a window of calendar units relative to `reference`.
///
/// `from` and `to` are unit offsets from the start of the current unit;
/// negative values are in the past. `-1..=-1` with days is "yesterday",
/// `0..=0` is "today". `reference` defaults to now.
///
/// # Examples
///
/// ```
/// use hourglass_core::calendar::relative_window;
/// use hourglass_core::types::{TimeUnit, WeekStart};
///
/// // 2017-04-03T22:50:17Z
/// let range = relative_window(TimeUnit::Years, -1, -1, Some(1491259817), WeekStart::Sunday).unwrap();
/// assert_eq!(range.to_string(), "2016-01-01T00:00:00Z - 2016-12-31T23:59:59Z");
/// ```
pub fn relative_window(
    unit: TimeUnit,
    from: i64,
    to: i64,
    reference: Option<Epoch>,
    week_starts_on: WeekStart,
) -> Result<DateRange> {
    if !unit.is_calendar() {
        let names: Vec<_> = TimeUnit::CALENDAR.iter().map(TimeUnit::as_str).collect();
        return Err(Error::configuration(format!(
            "\"unit\" must be one of: {names:?}, got \"{unit}\""
        )));
    }
    if to < from {
        return Err(Error::configuration(format!(
            "\"range_to\" ({to}) must be greater than or equal to \"range_from\" ({from})"
        )));
    }

    let reference = epoch::normalize(reference.unwrap_or_else(epoch::now));
    let reference = to_datetime(reference)?;
    let origin = truncate(reference, unit, week_starts_on)?;
    let count = to
        .checked_sub(from)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(|| {
            Error::configuration(format!("range from {from} to {to} spans too many units"))
        })?;

    let (start, next) = match unit {
        TimeUnit::Months => {
            let start = step_months(origin, from)?;
            (start, step_months(start, count)?)
        }
        TimeUnit::Years => {
            let start = step_months(origin, from.saturating_mul(12))?;
            (start, step_months(start, count.saturating_mul(12))?)
        }
        _ => {
            let start = step_seconds(origin, unit, from)?;
            (start, step_seconds(start, unit, count)?)
        }
    };

    debug!(
        %unit,
        from,
        to,
        %reference,
        point_of_reference = %origin,
        %start,
        %next,
        "Resolved relative window"
    );

    DateRange::new(timestamp(start), timestamp(next) - 1)
}

/// Resolve a window between two literal dates.
///
/// `from` is read with `from_format` and becomes the start. `to` is read with
/// `to_format`, and the window runs to the last second of the unit that `to`
/// falls in.
///
/// # Examples
///
/// ```
/// use hourglass_core::calendar::absolute_window;
/// use hourglass_core::types::TimeUnit;
///
/// let range = absolute_window(TimeUnit::Months, "2017.01", "2017.01", Some("%Y.%m"), Some("%Y.%m")).unwrap();
/// assert_eq!(range.to_string(), "2017-01-01T00:00:00Z - 2017-01-31T23:59:59Z");
/// ```
pub fn absolute_window(
    unit: TimeUnit,
    from: &str,
    to: &str,
    from_format: Option<&str>,
    to_format: Option<&str>,
) -> Result<DateRange> {
    let (Some(from_format), Some(to_format)) = (from_format, to_format) else {
        return Err(Error::configuration(
            "Must provide \"date_from_format\" and \"date_to_format\"",
        ));
    };

    let start = parse_literal(from, from_format, "date_from")?;
    let last = parse_literal(to, to_format, "date_to")?;

    let next = match unit {
        TimeUnit::Months => step_months(first_of_month(last)?, 1)?,
        TimeUnit::Years => step_months(first_of_year(last)?, 12)?,
        _ => step_seconds(last, unit, 1)?,
    };

    debug!(%unit, %start, %last, %next, "Resolved absolute window");

    DateRange::new(timestamp(start), timestamp(next) - 1).map_err(|_| {
        Error::configuration(format!(
            "\"date_to\" {to:?} resolves before \"date_from\" {from:?}"
        ))
    })
}

fn parse_literal(value: &str, format: &str, field: &str) -> Result<NaiveDateTime> {
    parse_timestamp(value, format).map_err(|e| {
        Error::configuration(format!(
            "Unable to parse \"{field}\" {value:?} with format {format:?}: {e}"
        ))
    })
}

/// Start of the unit containing `at`.
fn truncate(at: NaiveDateTime, unit: TimeUnit, week_starts_on: WeekStart) -> Result<NaiveDateTime> {
    let midnight = at.date().and_time(chrono::NaiveTime::MIN);
    match unit {
        TimeUnit::Hours => at
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .ok_or_else(|| out_of_range(at)),
        TimeUnit::Days => Ok(midnight),
        TimeUnit::Weeks => {
            // Sunday starts shift the Monday-based offset by one, so a
            // Sunday reference falls back to the previous Sunday
            let into_week = at.weekday().num_days_from_monday()
                + u32::from(week_starts_on == WeekStart::Sunday);
            Ok(midnight - TimeDelta::days(i64::from(into_week)))
        }
        TimeUnit::Months => first_of_month(at),
        TimeUnit::Years => first_of_year(at),
        TimeUnit::Seconds | TimeUnit::Minutes => Ok(at),
    }
}

fn first_of_month(at: NaiveDateTime) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .ok_or_else(|| out_of_range(at))
}

fn first_of_year(at: NaiveDateTime) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(at.year(), 1, 1)
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .ok_or_else(|| out_of_range(at))
}

/// Move `count` months, backwards when negative.
fn step_months(at: NaiveDateTime, count: i64) -> Result<NaiveDateTime> {
    let months = u32::try_from(count.unsigned_abs())
        .map(Months::new)
        .map_err(|_| out_of_range(at))?;
    let stepped = if count < 0 {
        at.checked_sub_months(months)
    } else {
        at.checked_add_months(months)
    };
    stepped.ok_or_else(|| out_of_range(at))
}

fn step_seconds(at: NaiveDateTime, unit: TimeUnit, count: i64) -> Result<NaiveDateTime> {
    count
        .checked_mul(unit.seconds())
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| out_of_range(at))
}

fn to_datetime(epoch: Epoch) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(epoch, 0)
        .map(|at| at.naive_utc())
        .ok_or_else(|| Error::configuration(format!("epoch {epoch} is out of range")))
}

fn timestamp(at: NaiveDateTime) -> Epoch {
    at.and_utc().timestamp()
}

fn out_of_range(at: NaiveDateTime) -> Error {
    Error::configuration(format!("window around {at} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// 2017-04-03T22:50:17Z, a Monday.
    const REFERENCE: Epoch = 1491259817;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Epoch {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap().timestamp()
    }

    fn relative(unit: TimeUnit, from: i64, to: i64, week: WeekStart) -> (Epoch, Epoch) {
        let range = relative_window(unit, from, to, Some(REFERENCE), week).unwrap();
        (range.start(), range.end())
    }

    #[test]
    fn test_relative_hours_and_days() {
        assert_eq!(
            relative(TimeUnit::Hours, -1, -1, WeekStart::Sunday),
            (at(2017, 4, 3, 21, 0, 0), at(2017, 4, 3, 21, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Days, -3, -1, WeekStart::Sunday),
            (at(2017, 3, 31, 0, 0, 0), at(2017, 4, 2, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Days, 0, 0, WeekStart::Sunday),
            (at(2017, 4, 3, 0, 0, 0), at(2017, 4, 3, 23, 59, 59))
        );
    }

    #[test]
    fn test_relative_weeks() {
        assert_eq!(
            relative(TimeUnit::Weeks, -1, -1, WeekStart::Sunday),
            (at(2017, 3, 26, 0, 0, 0), at(2017, 4, 1, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Weeks, -1, -1, WeekStart::Monday),
            (at(2017, 3, 27, 0, 0, 0), at(2017, 4, 2, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Weeks, 0, 2, WeekStart::Sunday),
            (at(2017, 4, 2, 0, 0, 0), at(2017, 4, 22, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Weeks, 0, 2, WeekStart::Monday),
            (at(2017, 4, 3, 0, 0, 0), at(2017, 4, 23, 23, 59, 59))
        );
    }

    #[test]
    fn test_relative_week_from_a_sunday() {
        // 2017-04-02 is a Sunday; Sunday weeks step back to the previous one
        let sunday = at(2017, 4, 2, 12, 0, 0);
        let range = relative_window(TimeUnit::Weeks, 0, 0, Some(sunday), WeekStart::Sunday).unwrap();
        assert_eq!(range.start(), at(2017, 3, 26, 0, 0, 0));
        assert_eq!(range.end(), at(2017, 4, 1, 23, 59, 59));

        let saturday = at(2017, 4, 1, 12, 0, 0);
        let range = relative_window(TimeUnit::Weeks, 0, 0, Some(saturday), WeekStart::Sunday).unwrap();
        assert_eq!(range.start(), at(2017, 3, 26, 0, 0, 0));

        let range = relative_window(TimeUnit::Weeks, 0, 0, Some(sunday), WeekStart::Monday).unwrap();
        assert_eq!(range.start(), at(2017, 3, 27, 0, 0, 0));
    }

    #[test]
    fn test_relative_span_overflow_rejected() {
        let err = relative_window(TimeUnit::Days, 0, i64::MAX, Some(REFERENCE), WeekStart::Sunday)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let err = relative_window(TimeUnit::Days, i64::MIN, 0, Some(REFERENCE), WeekStart::Sunday)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_relative_months() {
        assert_eq!(
            relative(TimeUnit::Months, -4, -1, WeekStart::Sunday),
            (at(2016, 12, 1, 0, 0, 0), at(2017, 3, 31, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Months, 7, 10, WeekStart::Sunday),
            (at(2017, 11, 1, 0, 0, 0), at(2018, 2, 28, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Months, 9, 10, WeekStart::Sunday),
            (at(2018, 1, 1, 0, 0, 0), at(2018, 2, 28, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Months, -1, 2, WeekStart::Sunday),
            (at(2017, 3, 1, 0, 0, 0), at(2017, 6, 30, 23, 59, 59))
        );
    }

    #[test]
    fn test_relative_years() {
        assert_eq!(
            relative(TimeUnit::Years, -1, -1, WeekStart::Sunday),
            (at(2016, 1, 1, 0, 0, 0), at(2016, 12, 31, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Years, -3, -1, WeekStart::Sunday),
            (at(2014, 1, 1, 0, 0, 0), at(2016, 12, 31, 23, 59, 59))
        );
        assert_eq!(
            relative(TimeUnit::Years, 0, 2, WeekStart::Sunday),
            (at(2017, 1, 1, 0, 0, 0), at(2019, 12, 31, 23, 59, 59))
        );
    }

    #[test]
    fn test_relative_accepts_millisecond_reference() {
        let range =
            relative_window(TimeUnit::Days, -1, -1, Some(REFERENCE * 1000), WeekStart::Sunday).unwrap();
        assert_eq!(range.start(), at(2017, 4, 2, 0, 0, 0));
    }

    #[test]
    fn test_relative_start_never_after_end() {
        for unit in TimeUnit::CALENDAR {
            for (from, to) in [(-5, -5), (-5, 0), (0, 0), (3, 12), (-1, 1)] {
                for week in [WeekStart::Sunday, WeekStart::Monday] {
                    let range = relative_window(unit, from, to, Some(REFERENCE), week).unwrap();
                    assert!(range.start() <= range.end(), "{unit} {from}..{to}");
                }
            }
        }
    }

    #[test]
    fn test_relative_rejects_bad_input() {
        let err = relative_window(TimeUnit::Minutes, -1, -1, Some(REFERENCE), WeekStart::Sunday)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(relative_window(TimeUnit::Seconds, 0, 0, None, WeekStart::Sunday).is_err());

        let err = relative_window(TimeUnit::Days, -1, -3, Some(REFERENCE), WeekStart::Sunday)
            .unwrap_err();
        assert!(err.to_string().contains("range_to"));
    }

    #[test]
    fn test_absolute_months() {
        let range =
            absolute_window(TimeUnit::Months, "2017.01", "2017.01", Some("%Y.%m"), Some("%Y.%m"))
                .unwrap();
        assert_eq!(range.start(), at(2017, 1, 1, 0, 0, 0));
        assert_eq!(range.end(), at(2017, 1, 31, 23, 59, 59));

        let range =
            absolute_window(TimeUnit::Months, "2016.11", "2016.12", Some("%Y.%m"), Some("%Y.%m"))
                .unwrap();
        assert_eq!(range.start(), at(2016, 11, 1, 0, 0, 0));
        assert_eq!(range.end(), at(2016, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_absolute_years_and_days() {
        let range = absolute_window(TimeUnit::Years, "2017", "2017", Some("%Y"), Some("%Y")).unwrap();
        assert_eq!(range.start(), at(2017, 1, 1, 0, 0, 0));
        assert_eq!(range.end(), at(2017, 12, 31, 23, 59, 59));

        let range = absolute_window(
            TimeUnit::Days,
            "2017.02.27",
            "2017.02.28",
            Some("%Y.%m.%d"),
            Some("%Y.%m.%d"),
        )
        .unwrap();
        assert_eq!(range.start(), at(2017, 2, 27, 0, 0, 0));
        assert_eq!(range.end(), at(2017, 2, 28, 23, 59, 59));

        let range = absolute_window(
            TimeUnit::Hours,
            "2017-01-01T05",
            "2017-01-01T05",
            Some("%Y-%m-%dT%H"),
            Some("%Y-%m-%dT%H"),
        )
        .unwrap();
        assert_eq!(range.end(), at(2017, 1, 1, 5, 59, 59));
    }

    #[test]
    fn test_absolute_mixed_formats() {
        let range = absolute_window(
            TimeUnit::Weeks,
            "2017-01",
            "2017.01.15",
            Some("%G-%V"),
            Some("%Y.%m.%d"),
        )
        .unwrap();
        assert_eq!(range.start(), at(2017, 1, 2, 0, 0, 0));
        assert_eq!(range.end(), at(2017, 1, 21, 23, 59, 59));
    }

    #[test]
    fn test_absolute_errors() {
        let err = absolute_window(TimeUnit::Days, "2017.01.01", "2017.01.02", None, Some("%Y.%m.%d"))
            .unwrap_err();
        assert!(err.to_string().contains("date_from_format"));

        let err = absolute_window(
            TimeUnit::Days,
            "2017/01/01",
            "2017.01.02",
            Some("%Y.%m.%d"),
            Some("%Y.%m.%d"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unable to parse"));

        let err = absolute_window(
            TimeUnit::Days,
            "2017.03.01",
            "2017.01.02",
            Some("%Y.%m.%d"),
            Some("%Y.%m.%d"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
