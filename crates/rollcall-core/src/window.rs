//! Reference timezone and bind-window computation.
//!
//! Raw events are stored with absolute UTC timestamps, but faculty describe a
//! class by its calendar date and local start/end time. Both directions of the
//! mapping go through the institution's [`ReferenceZone`]:
//!
//! - recording: `recorded_at` → calendar `date` in the reference zone;
//! - binding: `(class_date, start, end)` in the reference zone → an absolute
//!   `[start, end]` UTC window.

use std::{fmt, str::FromStr};

use chrono::{
  DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone,
  Timelike, Utc,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Reference zone ──────────────────────────────────────────────────────────

/// The institution's local timezone, expressed as a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(FixedOffset);

impl ReferenceZone {
  pub fn new(offset: FixedOffset) -> Self { Self(offset) }

  pub fn utc() -> Self { Self(Utc.fix()) }

  pub fn offset(&self) -> FixedOffset { self.0 }

  /// The calendar date `at` falls on in this zone.
  pub fn date_of<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> NaiveDate {
    at.with_timezone(&self.0).date_naive()
  }

  /// Interpret a local wall-clock date and time in this zone.
  pub fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    // A fixed offset has no gaps or folds, so the mapping is always unique.
    let local = date.and_time(time);
    DateTime::from_naive_utc_and_offset(
      local - TimeDelta::seconds(i64::from(self.0.local_minus_utc())),
      Utc,
    )
  }
}

impl Default for ReferenceZone {
  fn default() -> Self { Self::utc() }
}

impl FromStr for ReferenceZone {
  type Err = Error;

  /// Accepts `Z`, `UTC`, or `±HH:MM`.
  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
      return Ok(Self::utc());
    }

    let bad = || Error::validation(format!("invalid UTC offset: {s:?}"));

    let (sign, rest) = match s.as_bytes().first() {
      Some(b'+') => (1, &s[1..]),
      Some(b'-') => (-1, &s[1..]),
      _ => return Err(bad()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(bad)?;
    if hours.len() != 2 || minutes.len() != 2 {
      return Err(bad());
    }
    let hours: i32 = hours.parse().map_err(|_| bad())?;
    let minutes: i32 = minutes.parse().map_err(|_| bad())?;
    if minutes >= 60 {
      return Err(bad());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
      .map(Self)
      .ok_or_else(bad)
  }
}

impl fmt::Display for ReferenceZone {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Serialize for ReferenceZone {
  fn serialize<S: serde::Serializer>(
    &self,
    serializer: S,
  ) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ReferenceZone {
  fn deserialize<D: serde::Deserializer<'de>>(
    deserializer: D,
  ) -> std::result::Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

// ─── Input parsing ───────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
    .map_err(|e| Error::validation(format!("invalid {field} {raw:?}: {e}")))
}

/// Parse an `HH:MM` (24h) time of day.
pub fn parse_time_of_day(raw: &str, field: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(raw.trim(), "%H:%M")
    .map_err(|e| Error::validation(format!("invalid {field} {raw:?}: {e}")))
}

// ─── Bind window ─────────────────────────────────────────────────────────────

/// The absolute, inclusive `[start, end]` range a bind operation scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BindWindow {
  pub class_date: NaiveDate,
  pub start:      DateTime<Utc>,
  /// The last representable instant of the end minute, so an event stamped
  /// `10:00:59` still belongs to a class ending at `10:00`.
  pub end:        DateTime<Utc>,
}

impl BindWindow {
  pub fn new(
    zone: ReferenceZone,
    class_date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
  ) -> Result<Self> {
    let start = truncate_to_minute(start);
    let end = truncate_to_minute(end);
    if end < start {
      return Err(Error::validation(format!(
        "end time {} is before start time {}",
        end.format("%H:%M"),
        start.format("%H:%M"),
      )));
    }

    let end_of_minute = TimeDelta::minutes(1) - TimeDelta::nanoseconds(1);

    Ok(Self {
      class_date,
      start: zone.to_utc(class_date, start),
      end: zone.to_utc(class_date, end) + end_of_minute,
    })
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at <= self.end
  }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
  t.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(t)
}
