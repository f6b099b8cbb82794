//! Reading a rendered timestring back into a datetime.
//!
//! The reader follows strftime/strptime conventions for the tokens listed in
//! the module docs, plus `%w` (weekday, Sunday = 0) which is only ever added
//! internally. Fields that are absent default to 1900-01-01T00:00:00.
//!
//! Week numbers alone do not name a day, so week-based timestrings get a
//! synthetic Monday appended before parsing. ISO weeks are read as Gregorian
//! (`%Y`/`%W`) weeks first and then corrected, see [`correct_iso_week`].

use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::WeekStart;

const WEEK_TOKENS: [&str; 3] = ["%W", "%U", "%V"];
const WEEKDAY_TOKEN: &str = "%w";
const MONDAY: char = '1';
const FIRST_DAY: char = '1';

/// Parse `timestamp` as rendered by `timestring`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hourglass_core::pattern::parse_timestamp;
///
/// let iso = parse_timestamp("2014-42", "%G-%V").unwrap();
/// let gregorian = parse_timestamp("2014-42", "%Y-%W").unwrap();
/// assert_eq!(iso.date(), NaiveDate::from_ymd_opt(2014, 10, 13).unwrap());
/// assert_eq!(gregorian.date(), NaiveDate::from_ymd_opt(2014, 10, 20).unwrap());
/// ```
pub fn parse_timestamp(timestamp: &str, timestring: &str) -> Result<NaiveDateTime> {
    let mut text = timestamp.to_string();
    let mut format = timestring.to_string();
    let mut iso_week = false;

    if WEEK_TOKENS.iter().any(|token| format.contains(token)) {
        format.push_str(WEEKDAY_TOKEN);
        text.push(MONDAY);
        if format.contains("%V") && format.contains("%G") {
            iso_week = true;
            format = format.replace("%G", "%Y").replace("%V", "%W");
        }
    } else if format.contains("%m") && !format.contains("%d") {
        format.push_str("%d");
        text.push(FIRST_DAY);
    }

    let parsed = strptime(&text, &format)?;
    if iso_week {
        correct_iso_week(parsed, &format, &text)
    } else {
        Ok(parsed)
    }
}

/// Shift a Gregorian-week reading onto the matching ISO week.
///
/// Steps back one week when the candidate's ISO `YYYYWW` sorts after its
/// Gregorian `%Y%W`, or when rendering the candidate again does not give
/// back the text it was read from. Covers years whose ISO week 1 begins in
/// the previous Gregorian year and years where Gregorian week 53 rolls over.
fn correct_iso_week(candidate: NaiveDateTime, format: &str, text: &str) -> Result<NaiveDateTime> {
    let iso = candidate.iso_week();
    let iso_week = format!("{:04}{:02}", iso.year(), iso.week());
    let gregorian_week = strftime(&candidate, "%Y%W")?;
    let rerendered = strftime(&candidate, format)?;

    debug!(
        %candidate,
        %iso_week,
        %gregorian_week,
        %rerendered,
        "Checking ISO week reading"
    );

    if iso_week > gregorian_week || rerendered != text {
        Ok(candidate - TimeDelta::days(7))
    } else {
        Ok(candidate)
    }
}

fn strftime(at: &NaiveDateTime, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", at.format(format))
        .map_err(|_| Error::configuration(format!("invalid timestring {format:?}")))?;
    Ok(out)
}

/// Calendar fields collected while reading.
#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    ordinal: Option<u32>,
    week: Option<(u32, WeekStart)>,
    /// Days since Monday.
    weekday: Option<u32>,
}

impl Fields {
    fn into_datetime(self) -> Option<NaiveDateTime> {
        let year = self.year.unwrap_or(1900);

        let day_of_year = match (self.ordinal, self.week, self.weekday) {
            (Some(ordinal), _, _) => Some(i64::from(ordinal)),
            (None, Some((week, start)), Some(weekday)) => {
                Some(day_of_year_from_week(year, week, weekday, start)?)
            }
            _ => None,
        };

        let date = match day_of_year {
            // may land in the previous or next year
            Some(day) => NaiveDate::from_yo_opt(year, 1)?
                .checked_add_signed(TimeDelta::days(day - 1))?,
            None => NaiveDate::from_ymd_opt(year, self.month.unwrap_or(1), self.day.unwrap_or(1))?,
        };

        date.and_hms_opt(self.hour, self.minute, self.second)
    }
}

/// One-based day of `year` for a week number and weekday.
///
/// Week 1 starts on the year's first Monday (or Sunday); days before it
/// belong to week 0.
fn day_of_year_from_week(year: i32, week: u32, weekday: u32, start: WeekStart) -> Option<i64> {
    let new_year = NaiveDate::from_yo_opt(year, 1)?.weekday();
    let (first_weekday, weekday) = match start {
        WeekStart::Monday => (new_year.num_days_from_monday(), weekday),
        WeekStart::Sunday => (new_year.num_days_from_sunday(), (weekday + 1) % 7),
    };
    let (first_weekday, weekday, week) =
        (i64::from(first_weekday), i64::from(weekday), i64::from(week));

    if week == 0 {
        Some(1 + weekday - first_weekday)
    } else {
        let week_zero_length = (7 - first_weekday) % 7;
        Some(1 + week_zero_length + 7 * (week - 1) + weekday)
    }
}

fn strptime(text: &str, format: &str) -> Result<NaiveDateTime> {
    let mismatch = || {
        Error::configuration(format!(
            "time data {text:?} does not match format {format:?}"
        ))
    };

    let mut input = text.chars().peekable();
    let mut spec = format.chars();
    let mut fields = Fields::default();

    while let Some(c) = spec.next() {
        if c != '%' {
            match input.next() {
                Some(got) if got.eq_ignore_ascii_case(&c) => continue,
                _ => return Err(mismatch()),
            }
        }

        let token = spec.next().ok_or_else(|| {
            Error::configuration(format!("stray '%' at end of format {format:?}"))
        })?;
        let mut number = |min, max| read_number(&mut input, min, max).ok_or_else(mismatch);

        match token {
            '%' => match input.next() {
                Some('%') => {}
                _ => return Err(mismatch()),
            },
            'Y' => fields.year = Some(number(4, 4)? as i32),
            'y' => {
                let short = number(2, 2)? as i32;
                fields.year = Some(if short <= 68 { 2000 + short } else { 1900 + short });
            }
            'm' => fields.month = Some(number(1, 2)?),
            'd' => fields.day = Some(number(1, 2)?),
            'H' => fields.hour = number(1, 2)?,
            'M' => fields.minute = number(1, 2)?,
            'S' => fields.second = number(1, 2)?,
            'j' => fields.ordinal = Some(day_of_year(number(1, 3)?).ok_or_else(mismatch)?),
            'W' => fields.week = Some((week_number(number(1, 2)?).ok_or_else(mismatch)?, WeekStart::Monday)),
            'U' => fields.week = Some((week_number(number(1, 2)?).ok_or_else(mismatch)?, WeekStart::Sunday)),
            'w' => {
                let sunday_based = number(1, 1)?;
                if sunday_based > 6 {
                    return Err(mismatch());
                }
                fields.weekday = Some((sunday_based + 6) % 7);
            }
            'G' | 'V' => {
                return Err(Error::configuration(format!(
                    "ISO year '%G' and ISO week '%V' must be used together, got {format:?}"
                )));
            }
            other => {
                return Err(Error::configuration(format!(
                    "bad directive '%{other}' in format {format:?}"
                )));
            }
        }
    }

    if input.next().is_some() {
        return Err(Error::configuration(format!(
            "unconverted data remains in {text:?} for format {format:?}"
        )));
    }

    fields.into_datetime().ok_or_else(|| {
        Error::configuration(format!(
            "time data {text:?} for format {format:?} is not a valid date"
        ))
    })
}

fn week_number(week: u32) -> Option<u32> {
    (week <= 53).then_some(week)
}

fn day_of_year(day: u32) -> Option<u32> {
    (1..=366).contains(&day).then_some(day)
}

/// Read between `min` and `max` ASCII digits.
fn read_number(input: &mut Peekable<Chars<'_>>, min: usize, max: usize) -> Option<u32> {
    let mut value = 0;
    let mut taken = 0;
    while taken < max {
        let Some(digit) = input.peek().and_then(|c| c.to_digit(10)) else {
            break;
        };
        value = value * 10 + digit;
        input.next();
        taken += 1;
    }
    (taken >= min).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        datetime(y, m, d, 0, 0, 0)
    }

    #[test]
    fn test_parse_calendar_dates() {
        let cases = [
            ("2014.01.19", "%Y.%m.%d", date(2014, 1, 19)),
            ("14.01.19", "%y.%m.%d", date(2014, 1, 19)),
            ("2014-01-19", "%Y-%m-%d", date(2014, 1, 19)),
            ("2010-12-29", "%Y-%m-%d", date(2010, 12, 29)),
            ("2012-12", "%Y-%m", date(2012, 12, 1)),
            ("2011.01", "%Y.%m", date(2011, 1, 1)),
            ("2017", "%Y", date(2017, 1, 1)),
            ("2010.12.29.12", "%Y.%m.%d.%H", datetime(2010, 12, 29, 12, 0, 0)),
            ("2009101112136", "%Y%m%d%H%M%S", datetime(2009, 10, 11, 12, 13, 6)),
            ("2016-03-30t16", "%Y-%m-%dt%H", datetime(2016, 3, 30, 16, 0, 0)),
            ("2016.060", "%Y.%j", date(2016, 2, 29)),
        ];
        for (text, format, expected) in cases {
            assert_eq!(parse_timestamp(text, format).unwrap(), expected, "{text} / {format}");
        }
    }

    #[test]
    fn test_parse_week_numbers() {
        let cases = [
            ("2014-28", "%Y-%W", date(2014, 7, 14)),
            ("2014-28", "%Y-%U", date(2014, 7, 14)),
            // in 2014 ISO weeks ran one ahead of Gregorian weeks
            ("2014-42", "%Y-%W", date(2014, 10, 20)),
            ("2014-42", "%G-%V", date(2014, 10, 13)),
            ("2014-43", "%G-%V", date(2014, 10, 20)),
            ("2008-52", "%G-%V", date(2008, 12, 22)),
            ("2008-52", "%Y-%W", date(2008, 12, 29)),
            ("2009-01", "%Y-%W", date(2009, 1, 5)),
            ("2009-01", "%G-%V", date(2008, 12, 29)),
            // same week number in both conventions
            ("2017-16", "%Y-%W", date(2017, 4, 17)),
            ("2017-16", "%G-%V", date(2017, 4, 17)),
            ("2017-02", "%Y-%W", date(2017, 1, 9)),
            ("2017-02", "%G-%V", date(2017, 1, 9)),
            ("2010-01", "%G-%V", date(2010, 1, 4)),
            ("2010-01", "%Y-%W", date(2010, 1, 4)),
            // Gregorian week 53 of 2009 rolls into 2010
            ("2009-53", "%Y-%W", date(2010, 1, 4)),
            ("2009-53", "%G-%V", date(2009, 12, 28)),
        ];
        for (text, format, expected) in cases {
            assert_eq!(parse_timestamp(text, format).unwrap(), expected, "{text} / {format}");
        }
    }

    #[test]
    fn test_week_zero_lands_before_first_monday() {
        // 2014-01-01 is a Wednesday; week 0 Monday is 2013-12-30
        assert_eq!(parse_timestamp("2014-00", "%Y-%W").unwrap(), date(2013, 12, 30));
    }

    #[test]
    fn test_literals_match_case_insensitively() {
        assert_eq!(
            parse_timestamp("2016-03-30T16", "%Y-%m-%dt%H").unwrap(),
            datetime(2016, 3, 30, 16, 0, 0)
        );
    }

    #[test]
    fn test_parse_rejects_mismatches() {
        assert!(parse_timestamp("2014/01/19", "%Y.%m.%d").is_err());
        assert!(parse_timestamp("2014.01.19x", "%Y.%m.%d").is_err());
        assert!(parse_timestamp("meh", "%Y.%m").is_err());
        assert!(parse_timestamp("2014.02.30", "%Y.%m.%d").is_err());
        assert!(parse_timestamp("2014.01.19.25", "%Y.%m.%d.%H").is_err());
        assert!(parse_timestamp("2014-60", "%Y-%W").is_err());
    }

    #[test]
    fn test_day_of_year_bounds() {
        assert_eq!(
            parse_timestamp("2016.366", "%Y.%j").unwrap(),
            datetime(2016, 12, 31, 0, 0, 0)
        );
        assert_eq!(parse_timestamp("2017.001", "%Y.%j").unwrap(), datetime(2017, 1, 1, 0, 0, 0));
        assert!(parse_timestamp("2017.000", "%Y.%j").is_err());
        assert!(parse_timestamp("2017.367", "%Y.%j").is_err());
        assert!(parse_timestamp("2017.999", "%Y.%j").is_err());
    }

    #[test]
    fn test_iso_tokens_must_be_paired() {
        let err = parse_timestamp("2014-42", "%Y-%V").unwrap_err();
        assert!(err.to_string().contains("must be used together"));
        assert!(parse_timestamp("2014", "%G").is_err());
    }

    #[test]
    fn test_bad_directive() {
        let err = parse_timestamp("2014x", "%Y%q").unwrap_err();
        assert!(err.to_string().contains("bad directive"));
    }

    #[test]
    fn test_literal_percent() {
        assert_eq!(parse_timestamp("100%2014", "100%%%Y").unwrap(), date(2014, 1, 1));
    }
}
