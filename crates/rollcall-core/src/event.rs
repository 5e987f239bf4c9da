//! Attendance events: the rows the engine records, binds and aggregates.
//!
//! An event starts life *unbound* (`subject_key == None`): the capture device
//! knows who was present and when, but not which class was running. A later
//! bind operation attaches the subject exactly once.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  directory::{StudentKey, SubjectKey, required_key},
  window::ReferenceZone,
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Presence mark carried by an event. Only [`AttendanceStatus::Present`]
/// counts as attended when computing percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
}

impl AttendanceStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Present => "Present",
      Self::Absent => "Absent",
      Self::Late => "Late",
    }
  }

  pub fn is_attended(&self) -> bool { matches!(self, Self::Present) }
}

impl FromStr for AttendanceStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "present" => Ok(Self::Present),
      "absent" => Ok(Self::Absent),
      "late" => Ok(Self::Late),
      _ => Err(Error::validation(format!("unrecognized status: {s:?}"))),
    }
  }
}

impl fmt::Display for AttendanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A persisted attendance row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
  pub event_id:    Uuid,
  pub student_key: StudentKey,
  /// `None` until a bind operation attributes the event to a class.
  pub subject_key: Option<SubjectKey>,
  /// Calendar date of `recorded_at` in the reference zone.
  pub date:        NaiveDate,
  pub status:      AttendanceStatus,
  /// When the raw mark was captured; the binder tests window membership
  /// against this, not against `date`.
  pub recorded_at: DateTime<Utc>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl AttendanceEvent {
  pub fn is_bound(&self) -> bool { self.subject_key.is_some() }
}

// ─── NewEvent ────────────────────────────────────────────────────────────────

/// A validated, unbound event ready to be upserted.
///
/// Input to [`crate::store::AttendanceStore::upsert_unbound`]. `date` is
/// derived from `recorded_at` by [`NewEvent::new`]; constructing one by hand
/// with a mismatched date is a caller bug the store does not repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
  pub student_key: StudentKey,
  pub status:      AttendanceStatus,
  pub recorded_at: DateTime<Utc>,
  pub date:        NaiveDate,
}

impl NewEvent {
  pub fn new(
    zone: ReferenceZone,
    student_key: StudentKey,
    status: AttendanceStatus,
    recorded_at: DateTime<Utc>,
  ) -> Self {
    Self {
      date: zone.date_of(&recorded_at),
      student_key,
      status,
      recorded_at,
    }
  }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// An event as submitted by a capture device or HTTP client.
///
/// Every field is optional so that missing and malformed input both surface
/// as [`Error::Validation`] rather than as a transport-level decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInput {
  pub student_key: Option<String>,
  /// `Present`, `Absent` or `Late`; matched case-insensitively.
  pub status:      Option<String>,
  /// RFC 3339 timestamp with an explicit offset.
  pub recorded_at: Option<String>,
}

impl EventInput {
  pub fn new(
    student_key: impl Into<String>,
    status: impl Into<String>,
    recorded_at: impl Into<String>,
  ) -> Self {
    Self {
      student_key: Some(student_key.into()),
      status:      Some(status.into()),
      recorded_at: Some(recorded_at.into()),
    }
  }

  /// Check every field and derive the calendar date in `zone`.
  pub fn validate(&self, zone: ReferenceZone) -> Result<NewEvent> {
    let student_key =
      required_key(self.student_key.as_deref(), StudentKey::parse)?;

    let status = self
      .status
      .as_deref()
      .filter(|s| !s.trim().is_empty())
      .ok_or_else(|| Error::validation("missing status"))?
      .parse::<AttendanceStatus>()?;

    let raw_at = self
      .recorded_at
      .as_deref()
      .filter(|s| !s.trim().is_empty())
      .ok_or_else(|| Error::validation("missing recorded_at"))?;
    let recorded_at = DateTime::parse_from_rfc3339(raw_at.trim())
      .map_err(|e| {
        Error::validation(format!("invalid recorded_at {raw_at:?}: {e}"))
      })?
      .with_timezone(&Utc);

    Ok(NewEvent::new(zone, student_key, status, recorded_at))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ist() -> ReferenceZone { "+05:30".parse().unwrap() }

  #[test]
  fn status_parsing_is_case_insensitive() {
    assert_eq!(
      "present".parse::<AttendanceStatus>().unwrap(),
      AttendanceStatus::Present
    );
    assert_eq!(
      " ABSENT ".parse::<AttendanceStatus>().unwrap(),
      AttendanceStatus::Absent
    );
    assert_eq!(
      "Late".parse::<AttendanceStatus>().unwrap(),
      AttendanceStatus::Late
    );
    assert!(matches!(
      "excused".parse::<AttendanceStatus>(),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn only_present_counts_as_attended() {
    assert!(AttendanceStatus::Present.is_attended());
    assert!(!AttendanceStatus::Late.is_attended());
    assert!(!AttendanceStatus::Absent.is_attended());
  }

  #[test]
  fn validate_derives_local_date() {
    let input = EventInput::new("S1", "Present", "2025-09-17T20:00:00Z");
    let event = input.validate(ist()).unwrap();
    assert_eq!(event.student_key.as_str(), "S1");
    assert_eq!(event.status, AttendanceStatus::Present);
    assert_eq!(event.date.to_string(), "2025-09-18");
  }

  #[test]
  fn validate_rejects_missing_fields() {
    let base = EventInput::new("S1", "Present", "2025-09-18T09:05:00+05:30");

    let mut no_student = base.clone();
    no_student.student_key = None;
    assert!(matches!(
      no_student.validate(ist()),
      Err(Error::Validation(ref m)) if m == "missing student key"
    ));

    let mut no_status = base.clone();
    no_status.status = Some("  ".into());
    assert!(matches!(
      no_status.validate(ist()),
      Err(Error::Validation(ref m)) if m == "missing status"
    ));

    let mut no_time = base;
    no_time.recorded_at = None;
    assert!(matches!(
      no_time.validate(ist()),
      Err(Error::Validation(ref m)) if m == "missing recorded_at"
    ));
  }

  #[test]
  fn validate_rejects_timestamps_without_offset() {
    let input = EventInput::new("S1", "Present", "2025-09-18 09:05:00");
    assert!(matches!(input.validate(ist()), Err(Error::Validation(_))));
  }
}
