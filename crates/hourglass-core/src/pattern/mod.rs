//! Timestring patterns for timestamp-bearing resource names.
//!
//! A timestring is a template such as `logstash-%Y.%m.%d` where each token
//! after the `%` escape marker stands for one calendar field:
//!
//! | token | field                          | digits |
//! |-------|--------------------------------|--------|
//! | `Y`   | year                           | 4      |
//! | `G`   | ISO year                       | 4      |
//! | `y`   | year within the century        | 2      |
//! | `m`   | month                          | 2      |
//! | `W`   | week of year, Monday first     | 2      |
//! | `U`   | week of year, Sunday first     | 2      |
//! | `V`   | ISO week                       | 2      |
//! | `d`   | day of month                   | 2      |
//! | `H`   | hour (24h)                     | 2      |
//! | `M`   | minute                         | 2      |
//! | `S`   | second                         | 2      |
//! | `j`   | day of year                    | 3      |
//!
//! The same template is used three ways: rendered into a concrete name for
//! the current UTC time, turned into a regex that finds the date inside an
//! arbitrary name, and used to read that date back.

mod parse;

pub use parse::parse_timestamp;

use std::fmt::Write;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::epoch::Epoch;
use crate::error::{Error, Result};

/// The marker that introduces a date token.
pub const ESCAPE: char = '%';

/// Opening character of a remote date-math expression.
const DATEMATH_OPENER: char = '<';

/// Number of digits a recognized token renders to.
pub fn token_width(token: char) -> Option<usize> {
    match token {
        'Y' | 'G' => Some(4),
        'y' | 'm' | 'W' | 'U' | 'V' | 'd' | 'H' | 'M' | 'S' => Some(2),
        'j' => Some(3),
        _ => None,
    }
}

/// Build the regex fragment matching a rendered `timestring`.
///
/// Escape markers are dropped, recognized tokens become fixed-width digit
/// runs, `.` and `-` are escaped, and every other character is kept as is.
///
/// # Examples
///
/// ```
/// use hourglass_core::pattern::date_regex;
///
/// assert_eq!(date_regex("%Y-%m-%dt%H"), r"\d{4}\-\d{2}\-\d{2}t\d{2}");
/// ```
pub fn date_regex(timestring: &str) -> String {
    let mut regex = String::with_capacity(timestring.len() * 3);
    let mut prev = None;

    for curr in timestring.chars() {
        if curr == ESCAPE {
            // dropped
        } else if let Some(width) = token_width(curr).filter(|_| prev == Some(ESCAPE)) {
            let _ = write!(regex, r"\d{{{width}}}");
        } else if curr == '.' || curr == '-' {
            regex.push('\\');
            regex.push(curr);
        } else {
            regex.push(curr);
        }
        prev = Some(curr);
    }

    debug!(%timestring, %regex, "Derived date regex");
    regex
}

/// Render `template` with the current UTC time.
///
/// Names starting with `<` are remote date-math expressions and come back
/// unchanged; resolve them with [`crate::datemath::parse_date_math`].
pub fn render(template: &str) -> String {
    render_at(template, Utc::now())
}

/// Render `template` for the given instant.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hourglass_core::pattern::render_at;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
/// assert_eq!(render_at("logs-%Y.%m.%d", at), "logs-2024.03.09");
/// assert_eq!(render_at("<logs-{now/d}>", at), "<logs-{now/d}>");
/// ```
pub fn render_at(template: &str, at: DateTime<Utc>) -> String {
    if template.starts_with(DATEMATH_OPENER) {
        info!(name = %template, "Name uses remote date math, leaving it for the cluster");
        return template.to_string();
    }

    let mut rendered = String::with_capacity(template.len() + 8);
    let mut prev = None;

    for curr in template.chars() {
        if curr == ESCAPE {
            // dropped
        } else if token_width(curr).is_some() && prev == Some(ESCAPE) {
            let spec = [ESCAPE, curr].iter().collect::<String>();
            let _ = write!(rendered, "{}", at.format(&spec));
        } else {
            rendered.push(curr);
        }
        prev = Some(curr);
    }

    debug!(%template, %rendered, "Rendered name");
    rendered
}

/// A timestring compiled once and reused for many names.
///
/// # Examples
///
/// ```
/// use hourglass_core::pattern::PatternTemplate;
///
/// let pattern = PatternTemplate::compile("%Y.%m.%d").unwrap();
/// let epoch = pattern.search("logstash-2017.04.03").unwrap();
/// assert_eq!(epoch, Some(1491177600));
/// assert_eq!(pattern.search("no-date-here").unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct PatternTemplate {
    timestring: String,
    regex: Regex,
}

impl PatternTemplate {
    /// Compile `timestring` into a searchable pattern.
    ///
    /// Characters other than tokens, `.` and `-` reach the regex engine
    /// unescaped, so a template that is not a valid regex is rejected here.
    pub fn compile(timestring: &str) -> Result<Self> {
        let pattern = format!("(?P<date>{})", date_regex(timestring));
        let regex = Regex::new(&pattern).map_err(|e| {
            Error::configuration(format!(
                "timestring {timestring:?} does not produce a usable pattern: {e}"
            ))
        })?;

        Ok(Self {
            timestring: timestring.to_string(),
            regex,
        })
    }

    pub fn timestring(&self) -> &str {
        &self.timestring
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Whether `haystack` contains a date in this pattern's shape.
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    /// Render the template with the current UTC time.
    pub fn render(&self) -> String {
        render(&self.timestring)
    }

    /// Render the template for the given instant.
    pub fn render_at(&self, at: DateTime<Utc>) -> String {
        render_at(&self.timestring, at)
    }

    /// Find the first date in `haystack` and return it as an epoch.
    ///
    /// Returns `Ok(None)` when nothing matches, and an error when the matched
    /// digits do not form a valid date.
    pub fn search(&self, haystack: &str) -> Result<Option<Epoch>> {
        let Some(found) = self.regex.captures(haystack).and_then(|c| c.name("date")) else {
            return Ok(None);
        };
        let parsed = parse_timestamp(found.as_str(), &self.timestring)?;
        Ok(Some(parsed.and_utc().timestamp()))
    }
}

/// Read a unit count embedded in a name, e.g. the `30` of `keep-30-days`.
///
/// The first capture group of `pattern` is parsed as an integer; `None` when
/// nothing matches or the capture is not numeric.
pub fn unit_count_from_name(name: &str, pattern: &Regex) -> Option<i64> {
    let captured = pattern.captures(name)?.get(1)?;
    match captured.as_str().parse() {
        Ok(count) => Some(count),
        Err(e) => {
            debug!(name, capture = captured.as_str(), error = %e, "Unable to convert value to integer");
            None
        }
    }
}
