//! The `AttendanceStore` trait and supporting request/response types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rollcall-store-sqlite`). It exposes the set operations the engine is
//! built from: upsert by partial key, window scan, conditional bulk bind, and
//! grouped reads. Input validation happens before a backend is called, in
//! [`crate::Attendance`].

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Classify,
  directory::{
    Faculty, FacultyKey, Principal, Student, StudentKey, Subject, SubjectKey,
  },
  event::{AttendanceEvent, NewEvent},
  summary::{HistoryEntry, RosterEntry, StudentSummary, SubjectSummary},
  window::BindWindow,
};

// ─── Bind types ──────────────────────────────────────────────────────────────

/// A validated request to attribute every unbound event inside `window` to
/// `subject_key`.
#[derive(Debug, Clone)]
pub struct BindRequest {
  pub principal:   Principal,
  pub subject_key: SubjectKey,
  pub window:      BindWindow,
}

/// Result of a bind. `updated_count + skipped_count` equals the number of
/// candidates the window selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindOutcome {
  pub updated_count: u64,
  /// Candidates left unbound because the student already has a row for this
  /// subject on the class date.
  pub skipped_count: u64,
}

impl BindOutcome {
  pub fn candidates(&self) -> u64 { self.updated_count + self.skipped_count }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an attendance store backend.
///
/// Every mutating method runs in a single backend transaction: it either
/// applies fully or leaves the store untouched.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error
    + Classify
    + From<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Directory ─────────────────────────────────────────────────────────

  /// Insert or update a faculty member. `password_hash` is an argon2 PHC
  /// string; `None` leaves any stored hash unchanged.
  fn put_faculty(
    &self,
    faculty: Faculty,
    password_hash: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or update a subject and enroll every existing student of the
  /// same department and semester. Fails if the owner is unknown.
  fn put_subject(
    &self,
    subject: Subject,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or update a student and enroll them in every existing subject of
  /// the same department and semester.
  fn put_student(
    &self,
    student: Student,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Enroll a student in a subject. Idempotent.
  fn enroll(
    &self,
    student_key: StudentKey,
    subject_key: SubjectKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_student(
    &self,
    student_key: StudentKey,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    subject_key: SubjectKey,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// The stored password hash for a faculty member. Returns `None` if the
  /// faculty member does not exist or has no credentials.
  fn faculty_password_hash(
    &self,
    faculty_key: FacultyKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  // ── Recording ─────────────────────────────────────────────────────────

  /// Insert an unbound event, or overwrite `status` and `recorded_at` of the
  /// existing unbound row for the same `(student_key, date)`.
  fn upsert_unbound(
    &self,
    event: NewEvent,
  ) -> impl Future<Output = Result<AttendanceEvent, Self::Error>> + Send + '_;

  /// Apply [`AttendanceStore::upsert_unbound`] to every item atomically.
  /// Returns the number of items applied.
  fn upsert_unbound_batch(
    &self,
    events: Vec<NewEvent>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Binding ───────────────────────────────────────────────────────────

  /// Verify ownership, select unbound candidates inside the window, and bind
  /// every candidate that would not collide with an existing bound row.
  fn bind_window(
    &self,
    request: BindRequest,
  ) -> impl Future<Output = Result<BindOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceEvent>, Self::Error>> + Send + '_;

  /// Every row, bound or not, for one student on one date.
  fn events_on(
    &self,
    student_key: StudentKey,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + '_;

  /// Bound events for a subject with `from <= date <= to`, ordered by date
  /// then student key.
  fn events_by_subject(
    &self,
    subject_key: SubjectKey,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + '_;

  /// Per-student tallies for one subject, ordered by student name.
  fn summary_by_subject(
    &self,
    subject_key: SubjectKey,
  ) -> impl Future<Output = Result<Vec<StudentSummary>, Self::Error>> + Send + '_;

  /// Per-subject tallies for one student over the subjects they are
  /// enrolled in, ordered by subject name.
  fn summary_by_student(
    &self,
    student_key: StudentKey,
  ) -> impl Future<Output = Result<Vec<SubjectSummary>, Self::Error>> + Send + '_;

  /// Bound events for a subject on one date, ordered by student name.
  fn class_roster(
    &self,
    subject_key: SubjectKey,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<RosterEntry>, Self::Error>> + Send + '_;

  /// Bound events for one student and subject, ordered by date.
  fn history(
    &self,
    student_key: StudentKey,
    subject_key: SubjectKey,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;
}
