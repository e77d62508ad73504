// File: src/clock.rs
//
// Cycle clock: all scheduling in this system happens on a discrete
// 10-minute UTC grid. A CycleInstant is a UTC timestamp floored to that
// grid with seconds zeroed; it is the canonical "now" for a whole scan.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Timelike, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::cycle::{CYCLE_MINUTES, EXPIRE_AFTER_MINUTES};

/// A UTC timestamp whose minute is a multiple of the cycle length and whose
/// seconds are zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleInstant(DateTime<Utc>);

impl CycleInstant {
    /// Round a wall-clock reading down to the enclosing cycle boundary
    pub fn floor(now: DateTime<Utc>) -> Self {
        let cycle_secs = i64::from(CYCLE_MINUTES) * 60;
        let secs = now.timestamp();
        let floored = secs - secs.rem_euclid(cycle_secs);
        Self(DateTime::<Utc>::from_timestamp(floored, 0).unwrap_or(now))
    }

    /// Wrap an already-aligned timestamp; None if it is off the grid
    pub fn from_aligned(at: DateTime<Utc>) -> Option<Self> {
        let aligned = at.minute() % CYCLE_MINUTES == 0
            && at.second() == 0
            && at.timestamp_subsec_nanos() == 0;
        aligned.then_some(Self(at))
    }

    /// (day-of-month, ISO weekday 1-7, hour, minute) of this cycle
    pub fn fields(&self) -> (u8, u8, u8, u8) {
        (
            self.0.day() as u8,
            self.0.weekday().number_from_monday() as u8,
            self.0.hour() as u8,
            self.0.minute() as u8,
        )
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// ISO-8601 form, e.g. `2031-07-04T14:00:00Z`
    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Compact form used in child names, e.g. `20310704T1400Z`
    pub fn to_compact(&self) -> String {
        self.0.format("%Y%m%dT%H%MZ").to_string()
    }

    /// Parse the ISO form, rejecting instants off the cycle grid
    pub fn parse_iso(s: &str) -> Result<Self, String> {
        let at = DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("bad timestamp '{}': {}", s, e))?
            .with_timezone(&Utc);
        Self::from_aligned(at)
            .ok_or_else(|| format!("timestamp '{}' is not on a cycle boundary", s))
    }

    /// Wall-clock instant past which a request from this cycle is stale
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.0 + Duration::minutes(EXPIRE_AFTER_MINUTES)
    }

    /// Expiration discipline: true once the cutoff has been reached
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.cutoff()
    }
}

impl fmt::Display for CycleInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl Serialize for CycleInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso())
    }
}

impl<'de> Deserialize<'de> for CycleInstant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_iso(&s).map_err(D::Error::custom)
    }
}
