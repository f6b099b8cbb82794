//! Common value types: time units, week conventions and date ranges.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::epoch::Epoch;
use crate::error::{Error, Result};

/// Unit of time used for offsets and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    /// Every unit, smallest first.
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Seconds,
        TimeUnit::Minutes,
        TimeUnit::Hours,
        TimeUnit::Days,
        TimeUnit::Weeks,
        TimeUnit::Months,
        TimeUnit::Years,
    ];

    /// Units accepted for calendar windows relative to a point of reference.
    pub const CALENDAR: [TimeUnit; 5] = [
        TimeUnit::Hours,
        TimeUnit::Days,
        TimeUnit::Weeks,
        TimeUnit::Months,
        TimeUnit::Years,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// Whether the unit can be used for relative calendar windows.
    pub fn is_calendar(&self) -> bool {
        Self::CALENDAR.contains(self)
    }

    /// Fixed number of seconds in one unit.
    ///
    /// Months count as 30 days and years as 365 days. Calendar windows never
    /// use this for months or years.
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3_600,
            TimeUnit::Days => 86_400,
            TimeUnit::Weeks => 7 * 86_400,
            TimeUnit::Months => 30 * 86_400,
            TimeUnit::Years => 365 * 86_400,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = TimeUnit::ALL.iter().map(TimeUnit::as_str).collect();
                Error::configuration(format!("\"unit\" must be one of: {names:?}"))
            })
    }
}

/// First day of the week for week-sized windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl FromStr for WeekStart {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" => Ok(WeekStart::Sunday),
            "monday" => Ok(WeekStart::Monday),
            other => Err(Error::configuration(format!(
                "\"week_starts_on\" must be either \"sunday\" or \"monday\", got {other:?}"
            ))),
        }
    }
}

/// An inclusive window of epoch seconds.
///
/// `end` is the last second inside the window, one second before the next
/// window would begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: Epoch,
    end: Epoch,
}

impl DateRange {
    /// Create a range, rejecting an end that precedes the start.
    pub fn new(start: Epoch, end: Epoch) -> Result<Self> {
        if start > end {
            return Err(Error::configuration(format!(
                "range end {end} precedes range start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Epoch {
        self.start
    }

    pub fn end(&self) -> Epoch {
        self.end
    }

    /// Whether `epoch` falls inside the window (both ends inclusive).
    pub fn contains(&self, epoch: Epoch) -> bool {
        (self.start..=self.end).contains(&epoch)
    }

    /// Start and end as UTC datetimes, for display.
    pub fn to_datetimes(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((
            DateTime::from_timestamp(self.start, 0)?,
            DateTime::from_timestamp(self.end, 0)?,
        ))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetimes() {
            Some((start, end)) => write!(
                f,
                "{} - {}",
                start.format("%Y-%m-%dT%H:%M:%SZ"),
                end.format("%Y-%m-%dT%H:%M:%SZ")
            ),
            None => write!(f, "{} - {}", self.start, self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_from_str() {
        assert_eq!("days".parse::<TimeUnit>().unwrap(), TimeUnit::Days);
        assert_eq!("years".parse::<TimeUnit>().unwrap(), TimeUnit::Years);
        let err = "fortnights".parse::<TimeUnit>().unwrap_err();
        assert!(err.to_string().contains("\"unit\" must be one of"));
    }

    #[test]
    fn test_time_unit_seconds() {
        assert_eq!(TimeUnit::Seconds.seconds(), 1);
        assert_eq!(TimeUnit::Weeks.seconds(), 604_800);
        assert_eq!(TimeUnit::Months.seconds(), 2_592_000);
        assert_eq!(TimeUnit::Years.seconds(), 31_536_000);
    }

    #[test]
    fn test_calendar_units() {
        assert!(!TimeUnit::Seconds.is_calendar());
        assert!(!TimeUnit::Minutes.is_calendar());
        assert!(TimeUnit::Hours.is_calendar());
        assert!(TimeUnit::Years.is_calendar());
    }

    #[test]
    fn test_week_start_parsing() {
        assert_eq!("Monday".parse::<WeekStart>().unwrap(), WeekStart::Monday);
        assert_eq!(WeekStart::default(), WeekStart::Sunday);
        assert!("friday".parse::<WeekStart>().is_err());
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(10, 9).is_err());
        let range = DateRange::new(10, 10).unwrap();
        assert!(range.contains(10));
        assert!(!range.contains(11));
    }

    #[test]
    fn test_date_range_display() {
        let range = DateRange::new(1_483_228_800, 1_485_907_199).unwrap();
        assert_eq!(
            range.to_string(),
            "2017-01-01T00:00:00Z - 2017-01-31T23:59:59Z"
        );
    }

    #[test]
    fn test_time_unit_serde() {
        let unit: TimeUnit = serde_json::from_str("\"months\"").unwrap();
        assert_eq!(unit, TimeUnit::Months);
        assert_eq!(serde_json::to_string(&TimeUnit::Hours).unwrap(), "\"hours\"");
    }
}
