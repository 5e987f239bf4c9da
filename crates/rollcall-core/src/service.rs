//! [`Attendance`], the engine's public face.
//!
//! Wraps an [`AttendanceStore`] together with the institution's reference
//! timezone. Each method validates raw input, converts local wall-clock values
//! through the zone, and delegates the set operation to the backend:
//!
//! | Method | Role |
//! |--------|------|
//! | [`record`](Attendance::record), [`record_bulk`](Attendance::record_bulk) | event recorder |
//! | [`assign`](Attendance::assign) | time-range binder |
//! | [`summary_by_subject`](Attendance::summary_by_subject), [`summary_by_student`](Attendance::summary_by_student), [`class_roster`](Attendance::class_roster), [`history`](Attendance::history) | summary aggregator |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  directory::{Principal, StudentKey, SubjectKey, required_key},
  event::{AttendanceEvent, EventInput},
  store::{AttendanceStore, BindOutcome, BindRequest},
  summary::{HistoryEntry, RosterEntry, StudentSummary, SubjectSummary},
  window::{BindWindow, ReferenceZone, parse_date, parse_time_of_day},
};

/// A bind request as submitted by a faculty client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignInput {
  pub subject_key: Option<String>,
  /// `YYYY-MM-DD`, interpreted in the reference zone.
  pub class_date:  Option<String>,
  /// `HH:MM`, 24h.
  pub start_time:  Option<String>,
  /// `HH:MM`, 24h; the whole minute is included.
  pub end_time:    Option<String>,
}

impl AssignInput {
  pub fn new(
    subject_key: impl Into<String>,
    class_date: impl Into<String>,
    start_time: impl Into<String>,
    end_time: impl Into<String>,
  ) -> Self {
    Self {
      subject_key: Some(subject_key.into()),
      class_date:  Some(class_date.into()),
      start_time:  Some(start_time.into()),
      end_time:    Some(end_time.into()),
    }
  }

  fn validate(
    &self,
    zone: ReferenceZone,
    principal: &Principal,
  ) -> crate::Result<BindRequest> {
    let subject_key =
      required_key(self.subject_key.as_deref(), SubjectKey::parse)?;
    let class_date = parse_date(
      required(self.class_date.as_deref(), "class_date")?,
      "class_date",
    )?;
    let start = parse_time_of_day(
      required(self.start_time.as_deref(), "start_time")?,
      "start_time",
    )?;
    let end = parse_time_of_day(
      required(self.end_time.as_deref(), "end_time")?,
      "end_time",
    )?;

    Ok(BindRequest {
      principal: principal.clone(),
      subject_key,
      window: BindWindow::new(zone, class_date, start, end)?,
    })
  }
}

fn required<'a>(raw: Option<&'a str>, field: &str) -> crate::Result<&'a str> {
  raw
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| Error::validation(format!("missing {field}")))
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The attendance engine, generic over its storage backend.
#[derive(Debug, Clone)]
pub struct Attendance<S> {
  store: S,
  zone:  ReferenceZone,
}

impl<S: AttendanceStore> Attendance<S> {
  pub fn new(store: S, zone: ReferenceZone) -> Self { Self { store, zone } }

  pub fn store(&self) -> &S { &self.store }

  pub fn zone(&self) -> ReferenceZone { self.zone }

  // ── Recorder ──────────────────────────────────────────────────────────

  /// Record one raw presence mark, unbound. Returns the id of the row that
  /// now holds it, which is the pre-existing row when the student already has
  /// an unbound mark for that date.
  pub async fn record(&self, input: EventInput) -> Result<Uuid, S::Error> {
    let event = input.validate(self.zone)?;
    let stored = self.store.upsert_unbound(event).await?;
    tracing::debug!(
      event_id = %stored.event_id,
      student = %stored.student_key,
      date = %stored.date,
      status = %stored.status,
      "recorded attendance event"
    );
    Ok(stored.event_id)
  }

  /// Record a batch atomically. Every item is validated before anything is
  /// written; one bad item rejects the whole batch.
  pub async fn record_bulk(
    &self,
    inputs: Vec<EventInput>,
  ) -> Result<usize, S::Error> {
    let events = inputs
      .iter()
      .enumerate()
      .map(|(i, input)| {
        input.validate(self.zone).map_err(|e| match e {
          Error::Validation(msg) => Error::Validation(format!("event {i}: {msg}")),
          other => other,
        })
      })
      .collect::<crate::Result<Vec<_>>>()?;

    let count = self.store.upsert_unbound_batch(events).await?;
    tracing::info!(count, "recorded attendance batch");
    Ok(count)
  }

  // ── Binder ────────────────────────────────────────────────────────────

  /// Attribute every unbound event recorded during a class to its subject.
  ///
  /// `principal` must own the subject. Zero candidates is not an error.
  pub async fn assign(
    &self,
    principal: &Principal,
    input: AssignInput,
  ) -> Result<BindOutcome, S::Error> {
    let request = input.validate(self.zone, principal)?;
    let subject = request.subject_key.clone();
    let window = request.window;

    let outcome = self.store.bind_window(request).await?;
    tracing::info!(
      faculty = %principal.faculty_key,
      subject = %subject,
      class_date = %window.class_date,
      window_start = %window.start,
      window_end = %window.end,
      updated = outcome.updated_count,
      skipped = outcome.skipped_count,
      "bound attendance window"
    );
    Ok(outcome)
  }

  // ── Aggregator ────────────────────────────────────────────────────────

  pub async fn summary_by_subject(
    &self,
    subject_key: &str,
  ) -> Result<Vec<StudentSummary>, S::Error> {
    let subject_key = SubjectKey::parse(subject_key)?;
    self.store.summary_by_subject(subject_key).await
  }

  pub async fn summary_by_student(
    &self,
    student_key: &str,
  ) -> Result<Vec<SubjectSummary>, S::Error> {
    let student_key = StudentKey::parse(student_key)?;
    self.store.summary_by_student(student_key).await
  }

  pub async fn class_roster(
    &self,
    subject_key: &str,
    date: &str,
  ) -> Result<Vec<RosterEntry>, S::Error> {
    let subject_key = SubjectKey::parse(subject_key)?;
    let date = parse_date(date, "date")?;
    self.store.class_roster(subject_key, date).await
  }

  pub async fn history(
    &self,
    student_key: &str,
    subject_key: &str,
  ) -> Result<Vec<HistoryEntry>, S::Error> {
    let student_key = StudentKey::parse(student_key)?;
    let subject_key = SubjectKey::parse(subject_key)?;
    self.store.history(student_key, subject_key).await
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  pub async fn get_event(
    &self,
    event_id: Uuid,
  ) -> Result<Option<AttendanceEvent>, S::Error> {
    self.store.get_event(event_id).await
  }

  /// Bound events for a subject between two dates, both inclusive.
  pub async fn events_by_subject(
    &self,
    subject_key: &str,
    from: &str,
    to: &str,
  ) -> Result<Vec<AttendanceEvent>, S::Error> {
    let subject_key = SubjectKey::parse(subject_key)?;
    let from: NaiveDate = parse_date(from, "from")?;
    let to: NaiveDate = parse_date(to, "to")?;
    if from > to {
      return Err(
        Error::validation(format!("from {from} is after to {to}")).into(),
      );
    }
    self.store.events_by_subject(subject_key, from, to).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::directory::FacultyKey;

  fn principal() -> Principal {
    Principal::new(FacultyKey::parse("F1").unwrap())
  }

  fn ist() -> ReferenceZone { "+05:30".parse().unwrap() }

  #[test]
  fn assign_input_builds_request() {
    let input = AssignInput::new("SUBJ1", "2025-09-18", "09:00", "09:50");
    let request = input.validate(ist(), &principal()).unwrap();
    assert_eq!(request.subject_key.as_str(), "SUBJ1");
    assert_eq!(request.principal, principal());
    assert_eq!(request.window.class_date.to_string(), "2025-09-18");
  }

  #[test]
  fn assign_input_reports_each_missing_field() {
    let full = AssignInput::new("SUBJ1", "2025-09-18", "09:00", "09:50");

    let cases: [(fn(&mut AssignInput), &str); 4] = [
      (|i| i.subject_key = None, "missing subject key"),
      (|i| i.class_date = None, "missing class_date"),
      (|i| i.start_time = Some(String::new()), "missing start_time"),
      (|i| i.end_time = None, "missing end_time"),
    ];

    for (mutate, expected) in cases {
      let mut input = full.clone();
      mutate(&mut input);
      let err = input.validate(ist(), &principal()).unwrap_err();
      assert!(
        matches!(err, Error::Validation(ref m) if m == expected),
        "expected {expected:?}, got {err:?}"
      );
    }
  }

  #[test]
  fn assign_input_rejects_unparseable_times() {
    let input = AssignInput::new("SUBJ1", "2025-09-18", "9", "09:50");
    assert!(matches!(
      input.validate(ist(), &principal()),
      Err(Error::Validation(_))
    ));
  }
}
