//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (nanosecond
//! precision, `Z` suffix) so that comparing the text compares the instants.
//! Dates are `YYYY-MM-DD`. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rollcall_core::{
  directory::{FacultyKey, Student, StudentKey, Subject, SubjectKey},
  event::{AttendanceEvent, AttendanceStatus, NewEvent},
  summary::{HistoryEntry, RosterEntry, StudentSummary, SubjectSummary, Tally},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_ts(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_ts(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn decode_status(s: &str) -> Result<AttendanceStatus> {
  match s {
    "Present" => Ok(AttendanceStatus::Present),
    "Absent" => Ok(AttendanceStatus::Absent),
    "Late" => Ok(AttendanceStatus::Late),
    other => Err(Error::Decode(format!("unknown status: {other:?}"))),
  }
}

fn decode_key<K>(s: &str, parse: fn(&str) -> rollcall_core::Result<K>) -> Result<K> {
  parse(s).map_err(|e| Error::Decode(e.to_string()))
}

// ─── Write-side rows ─────────────────────────────────────────────────────────

/// Column values for one unbound upsert, encoded ahead of the blocking call.
pub struct UnboundRow {
  pub student_key: StudentKey,
  pub event_id:    String,
  pub date:        String,
  pub status:      &'static str,
  pub recorded_at: String,
}

impl From<NewEvent> for UnboundRow {
  fn from(event: NewEvent) -> Self {
    Self {
      event_id:    encode_uuid(Uuid::new_v4()),
      date:        encode_date(event.date),
      status:      event.status.as_str(),
      recorded_at: encode_ts(event.recorded_at),
      student_key: event.student_key,
    }
  }
}

// ─── Read-side rows ──────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, student_key, subject_key, date, status, \
                                 recorded_at, created_at, updated_at";

/// Raw strings read directly from an `attendance` row.
pub struct RawEvent {
  pub event_id:    String,
  pub student_key: String,
  pub subject_key: Option<String>,
  pub date:        String,
  pub status:      String,
  pub recorded_at: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      student_key: row.get(1)?,
      subject_key: row.get(2)?,
      date:        row.get(3)?,
      status:      row.get(4)?,
      recorded_at: row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<AttendanceEvent> {
    Ok(AttendanceEvent {
      event_id:    decode_uuid(&self.event_id)?,
      student_key: decode_key(&self.student_key, StudentKey::parse)?,
      subject_key: self
        .subject_key
        .as_deref()
        .map(|s| decode_key(s, SubjectKey::parse))
        .transpose()?,
      date:        decode_date(&self.date)?,
      status:      decode_status(&self.status)?,
      recorded_at: decode_ts(&self.recorded_at)?,
      created_at:  decode_ts(&self.created_at)?,
      updated_at:  decode_ts(&self.updated_at)?,
    })
  }
}

pub struct RawStudent {
  pub student_key: String,
  pub name:        String,
  pub department:  String,
  pub semester:    u8,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_key: row.get(0)?,
      name:        row.get(1)?,
      department:  row.get(2)?,
      semester:    row.get(3)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_key: decode_key(&self.student_key, StudentKey::parse)?,
      name:        self.name,
      department:  self.department,
      semester:    self.semester,
    })
  }
}

pub struct RawSubject {
  pub subject_key: String,
  pub name:        String,
  pub faculty_key: String,
  pub department:  String,
  pub semester:    u8,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_key: row.get(0)?,
      name:        row.get(1)?,
      faculty_key: row.get(2)?,
      department:  row.get(3)?,
      semester:    row.get(4)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_key: decode_key(&self.subject_key, SubjectKey::parse)?,
      name:        self.name,
      owner:       decode_key(&self.faculty_key, FacultyKey::parse)?,
      department:  self.department,
      semester:    self.semester,
    })
  }
}

/// One grouped row of a summary query: the group's key and display name plus
/// its class and attended counts.
pub struct RawTally {
  pub key:           String,
  pub name:          String,
  pub total_classes: u32,
  pub attended:      u32,
}

impl RawTally {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      key:           row.get(0)?,
      name:          row.get(1)?,
      total_classes: row.get(2)?,
      attended:      row.get(3)?,
    })
  }

  fn tally(&self) -> Tally { Tally::new(self.total_classes, self.attended) }

  pub fn into_student_summary(self) -> Result<StudentSummary> {
    let tally = self.tally();
    Ok(StudentSummary::new(
      decode_key(&self.key, StudentKey::parse)?,
      self.name,
      tally,
    ))
  }

  pub fn into_subject_summary(self) -> Result<SubjectSummary> {
    let tally = self.tally();
    Ok(SubjectSummary::new(
      decode_key(&self.key, SubjectKey::parse)?,
      self.name,
      tally,
    ))
  }
}

pub struct RawRosterEntry {
  pub student_key:  String,
  pub student_name: String,
  pub date:         String,
  pub status:       String,
}

impl RawRosterEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_key:  row.get(0)?,
      student_name: row.get(1)?,
      date:         row.get(2)?,
      status:       row.get(3)?,
    })
  }

  pub fn into_entry(self) -> Result<RosterEntry> {
    Ok(RosterEntry {
      student_key:  decode_key(&self.student_key, StudentKey::parse)?,
      student_name: self.student_name,
      date:         decode_date(&self.date)?,
      status:       decode_status(&self.status)?,
    })
  }
}

pub struct RawHistoryEntry {
  pub event_id:     String,
  pub date:         String,
  pub status:       String,
  pub subject_key:  String,
  pub subject_name: String,
  pub recorded_at:  String,
}

impl RawHistoryEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      date:         row.get(1)?,
      status:       row.get(2)?,
      subject_key:  row.get(3)?,
      subject_name: row.get(4)?,
      recorded_at:  row.get(5)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      event_id:     decode_uuid(&self.event_id)?,
      date:         decode_date(&self.date)?,
      status:       decode_status(&self.status)?,
      subject_key:  decode_key(&self.subject_key, SubjectKey::parse)?,
      subject_name: self.subject_name,
      recorded_at:  decode_ts(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sort_as_text() {
    let a = DateTime::parse_from_rfc3339("2025-09-18T03:30:00Z")
      .unwrap()
      .with_timezone(&Utc);
    let b = DateTime::parse_from_rfc3339("2025-09-18T03:30:00.5Z")
      .unwrap()
      .with_timezone(&Utc);
    let (ea, eb) = (encode_ts(a), encode_ts(b));
    assert_eq!(ea, "2025-09-18T03:30:00.000000000Z");
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_ts(&eb).unwrap(), b);
  }

  #[test]
  fn unknown_status_is_a_decode_error() {
    assert!(matches!(decode_status("present"), Err(Error::Decode(_))));
  }
}
