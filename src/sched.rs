//! Schedule tag grammar and cycle matcher.
//!
//! A schedule is a whitespace-separated sequence of `KEY=VALUE` terms kept
//! in a resource tag. Comma and asterisk are forbidden by provider tag
//! rules, so whitespace separates terms and `_` is the wildcard:
//!
//! ```text
//! d=01 d=15 H=03 H=19 M=00      3:00 and 19:00 on the 1st and 15th
//! d=_ H:M=23:00                 23:00 every day
//! u=1 H:M=14:20                 14:20 every Monday
//! uTH:M=5T03:00                 3:00 every Friday
//! dTH:M=01T00:00                midnight on the 1st of the month
//! ```
//!
//! Keys echo standard date-format letters: `d` day-of-month (`01`..`31` or
//! `_`), `u` ISO weekday (`1` Monday .. `7` Sunday), `H` hour (`00`..`23`
//! or `_`), `M` minute (multiples of the cycle length only). `H:M`, `uTH:M`
//! and `dTH:M` are compound terms matched against the whole tuple.
//!
//! Parsing and matching are pure; all I/O stays with the caller.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::clock::CycleInstant;
use crate::constants::cycle::CYCLE_MINUTES;

/// Errors that can occur when parsing a schedule tag value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized term '{0}': expected KEY=VALUE")]
    UnrecognizedToken(String),
    #[error("unknown key '{key}' in term '{term}'")]
    UnknownKey { key: String, term: String },
    #[error("invalid value in term '{term}': {reason}")]
    InvalidValue { term: String, reason: String },
    #[error("schedule leaves the {0} dimension unconstrained")]
    Unconstrained(&'static str),
    #[error("schedule is empty")]
    Empty,
}

/// A parsed schedule tag value.
///
/// Term sets are kept as ordered sets, so duplicate terms collapse and two
/// schedules written in different term orders compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    days: BTreeSet<u8>,
    day_wildcard: bool,
    weekdays: BTreeSet<u8>,
    hours: BTreeSet<u8>,
    hour_wildcard: bool,
    minutes: BTreeSet<u8>,
    /// `H:M` terms: (hour, minute), matched jointly
    times: BTreeSet<(u8, u8)>,
    /// `uTH:M` terms: (weekday, hour, minute)
    week_times: BTreeSet<(u8, u8, u8)>,
    /// `dTH:M` terms: (day, hour, minute)
    month_times: BTreeSet<(u8, u8, u8)>,
}

impl Schedule {
    /// Parse a tag value into a schedule.
    ///
    /// Every token must be a recognized term; a schedule is rejected unless
    /// each of the day, hour, and minute dimensions is constrained. When any
    /// partial term is present, the partial terms alone must constrain all
    /// three dimensions; a full compound (`uTH:M`/`dTH:M`) is a complete
    /// schedule only on its own or next to an already-complete partial set.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let mut sched = Schedule::default();
        for token in value.split_whitespace() {
            sched.parse_term(token)?;
        }
        sched.check_complete()?;
        Ok(sched)
    }

    fn parse_term(&mut self, term: &str) -> Result<(), ParseError> {
        let (key, value) = term
            .split_once('=')
            .ok_or_else(|| ParseError::UnrecognizedToken(term.to_string()))?;
        match key {
            "d" => {
                if value == "_" {
                    self.day_wildcard = true;
                } else {
                    self.days.insert(two_digit(term, value, 1, 31, "day")?);
                }
            }
            "u" => {
                self.weekdays.insert(weekday(term, value)?);
            }
            "H" => {
                if value == "_" {
                    self.hour_wildcard = true;
                } else {
                    self.hours.insert(two_digit(term, value, 0, 23, "hour")?);
                }
            }
            "M" => {
                self.minutes.insert(minute(term, value)?);
            }
            "H:M" => {
                self.times.insert(time_of_day(term, value)?);
            }
            "uTH:M" => {
                let (day_part, time_part) = split_compound(term, value)?;
                let u = weekday(term, day_part)?;
                let (h, m) = time_of_day(term, time_part)?;
                self.week_times.insert((u, h, m));
            }
            "dTH:M" => {
                let (day_part, time_part) = split_compound(term, value)?;
                let d = two_digit(term, day_part, 1, 31, "day")?;
                let (h, m) = time_of_day(term, time_part)?;
                self.month_times.insert((d, h, m));
            }
            _ => {
                return Err(ParseError::UnknownKey {
                    key: key.to_string(),
                    term: term.to_string(),
                })
            }
        }
        Ok(())
    }

    fn check_complete(&self) -> Result<(), ParseError> {
        let has_partial = self.day_wildcard
            || self.hour_wildcard
            || !self.days.is_empty()
            || !self.weekdays.is_empty()
            || !self.hours.is_empty()
            || !self.minutes.is_empty()
            || !self.times.is_empty();
        let has_full = !self.week_times.is_empty() || !self.month_times.is_empty();

        if has_partial {
            let day = self.day_wildcard || !self.days.is_empty() || !self.weekdays.is_empty();
            let hour = self.hour_wildcard || !self.hours.is_empty() || !self.times.is_empty();
            let minute = !self.minutes.is_empty() || !self.times.is_empty();
            if !day {
                return Err(ParseError::Unconstrained("day"));
            }
            if !hour {
                return Err(ParseError::Unconstrained("hour"));
            }
            if !minute {
                return Err(ParseError::Unconstrained("minute"));
            }
            Ok(())
        } else if has_full {
            Ok(())
        } else {
            Err(ParseError::Empty)
        }
    }

    /// Test whether this schedule selects the given cycle.
    ///
    /// Each dimension may be satisfied independently by a single-dimension
    /// term, jointly with its neighbor by an `H:M` term, or jointly with
    /// both others by a matched full compound.
    pub fn matches(&self, cycle: CycleInstant) -> bool {
        let (dom, dow, hour, minute) = cycle.fields();

        let full = self.week_times.contains(&(dow, hour, minute))
            || self.month_times.contains(&(dom, hour, minute));
        let time = self.times.contains(&(hour, minute));

        let day_ok =
            full || self.day_wildcard || self.days.contains(&dom) || self.weekdays.contains(&dow);
        let hour_ok = full || time || self.hour_wildcard || self.hours.contains(&hour);
        let minute_ok = full || time || self.minutes.contains(&minute);

        day_ok && hour_ok && minute_ok
    }
}

fn invalid(term: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidValue {
        term: term.to_string(),
        reason: reason.into(),
    }
}

/// Two-digit literal in `[min, max]`, as used for day, hour, and minute.
fn two_digit(term: &str, value: &str, min: u8, max: u8, what: &str) -> Result<u8, ParseError> {
    if value.len() != 2 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(term, format!("{} must be two digits", what)));
    }
    let n: u8 = value
        .parse()
        .map_err(|_| invalid(term, format!("bad {} literal", what)))?;
    if n < min || n > max {
        return Err(invalid(
            term,
            format!("{} {} is outside {:02}-{:02}", what, n, min, max),
        ));
    }
    Ok(n)
}

/// Single-digit ISO weekday, `1` (Monday) through `7` (Sunday).
fn weekday(term: &str, value: &str) -> Result<u8, ParseError> {
    if value.len() != 1 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(term, "weekday must be a single digit"));
    }
    let n: u8 = value
        .parse()
        .map_err(|_| invalid(term, "bad weekday literal"))?;
    if !(1..=7).contains(&n) {
        return Err(invalid(term, format!("weekday {} is outside 1-7", n)));
    }
    Ok(n)
}

/// Minute literal; must be a multiple of the cycle length in every term
/// shape, not just `M=`.
fn minute(term: &str, value: &str) -> Result<u8, ParseError> {
    let m = two_digit(term, value, 0, 59, "minute")?;
    if u32::from(m) % CYCLE_MINUTES != 0 {
        return Err(invalid(
            term,
            format!("minute {:02} is not a multiple of {}", m, CYCLE_MINUTES),
        ));
    }
    Ok(m)
}

/// `HH:MM` with the minute restricted to cycle multiples.
fn time_of_day(term: &str, value: &str) -> Result<(u8, u8), ParseError> {
    let (h, m) = value
        .split_once(':')
        .ok_or_else(|| invalid(term, "expected HH:MM"))?;
    Ok((two_digit(term, h, 0, 23, "hour")?, minute(term, m)?))
}

/// `<day>T<HH:MM>` for the weekly and monthly compound terms.
fn split_compound<'a>(term: &str, value: &'a str) -> Result<(&'a str, &'a str), ParseError> {
    value
        .split_once('T')
        .ok_or_else(|| invalid(term, "expected <day>T<HH:MM>"))
}
