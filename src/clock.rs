// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Wall clock and elapsed-time formatting, backed by chrono.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use regex::Regex;

use crate::error::Result;

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Formats a local timestamp with a strftime pattern. An invalid pattern
/// yields the pattern text itself rather than panicking.
pub fn format_instant(at: &DateTime<Local>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(pattern)).is_err() {
        return pattern.to_string();
    }
    out
}

/// Formats an elapsed number of seconds.
///
/// `%H` is total hours (at least two digits, never wrapped at 24), `%M` and
/// `%S` are the minute and second remainders, `%%` is a literal percent.
/// Any other specifier is rendered against the UTC instant `epoch + secs`,
/// which gives `date -u` semantics (`%j`, `%s`, ...). Negative input counts as zero.
pub fn format_duration(secs: i64, pattern: &str) -> String {
    let secs = secs.max(0);
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    let instant = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();
    let mut out = String::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('H') => out.push_str(&format!("{:02}", h)),
            Some('M') => out.push_str(&format!("{:02}", m)),
            Some('S') => out.push_str(&format!("{:02}", s)),
            Some('%') => out.push('%'),
            Some(other) => {
                let spec = format!("%{}", other);
                let mut piece = String::new();
                if write!(piece, "{}", instant.format(&spec)).is_err() {
                    piece = spec;
                }
                out.push_str(&piece);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Hours, minutes and seconds of an elapsed time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hms {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Hms {
    /// `None` if the total does not fit in an `i64`.
    pub fn total_seconds(&self) -> Option<i64> {
        self.hours
            .checked_mul(3600)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)
    }
}

/// Compiled reader for text produced by [`format_duration`] with the same pattern.
#[derive(Clone, Debug)]
pub struct DurationParser {
    regex: Regex,
}

impl DurationParser {
    pub fn new(pattern: &str) -> Result<DurationParser> {
        let mut re = String::from("^");
        let mut literal = String::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let group = match chars.next() {
                Some('%') | None => {
                    literal.push('%');
                    continue;
                }
                Some('H') => r"(?P<h>\d+)",
                Some('M') => r"(?P<m>\d+)",
                Some('S') => r"(?P<s>\d+)",
                Some(_) => ".*?",
            };
            re.push_str(&regex::escape(&literal));
            literal.clear();
            re.push_str(group);
        }
        re.push_str(&regex::escape(&literal));
        re.push('$');
        Ok(DurationParser {
            regex: Regex::new(&re)?,
        })
    }

    /// `None` when `text` does not have the pattern's shape.
    pub fn parse(&self, text: &str) -> Option<Hms> {
        let caps = self.regex.captures(text)?;
        let field = |name: &str| -> Option<i64> {
            match caps.name(name) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        Some(Hms {
            hours: field("h")?,
            minutes: field("m")?,
            seconds: field("s")?,
        })
    }
}
