//! [`SqliteStore`], the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use rollcall_core::{
  directory::{Faculty, FacultyKey, Student, StudentKey, Subject, SubjectKey},
  event::{AttendanceEvent, NewEvent},
  store::{AttendanceStore, BindOutcome, BindRequest},
  summary::{HistoryEntry, RosterEntry, StudentSummary, SubjectSummary},
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, RawEvent, RawHistoryEntry, RawRosterEntry, RawStudent,
    RawSubject, RawTally, UnboundRow, encode_date, encode_ts, encode_uuid,
  },
  schema::SCHEMA,
};

/// Outcome of a closure that may reject the request on a domain rule. The
/// transaction is dropped, and so rolled back, whenever the inner value is
/// `Err`.
type Checked<T> = std::result::Result<T, rollcall_core::Error>;

// ─── SQL ─────────────────────────────────────────────────────────────────────

const UPSERT_UNBOUND: &str = "
INSERT INTO attendance (
    event_id, student_key, subject_key, date, status,
    recorded_at, created_at, updated_at
) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?6)
ON CONFLICT (student_key, date) WHERE subject_key IS NULL DO UPDATE SET
    status      = excluded.status,
    recorded_at = excluded.recorded_at,
    updated_at  = excluded.updated_at
RETURNING event_id, student_key, subject_key, date, status,
          recorded_at, created_at, updated_at";

const COUNT_CANDIDATES: &str = "
SELECT COUNT(*) FROM attendance
 WHERE subject_key IS NULL
   AND date = ?1
   AND recorded_at BETWEEN ?2 AND ?3";

// A candidate whose student already has a bound row for this subject on the
// class date is left unbound.
const BIND_CANDIDATES: &str = "
UPDATE attendance
   SET subject_key = ?4, updated_at = ?5
 WHERE subject_key IS NULL
   AND date = ?1
   AND recorded_at BETWEEN ?2 AND ?3
   AND NOT EXISTS (
       SELECT 1 FROM attendance AS bound
        WHERE bound.student_key = attendance.student_key
          AND bound.subject_key = ?4
          AND bound.date        = attendance.date
   )";

const SUMMARY_BY_SUBJECT: &str = "
SELECT a.student_key, st.name, COUNT(*),
       SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END)
  FROM attendance a
  JOIN students st ON st.student_key = a.student_key
 WHERE a.subject_key = ?1
 GROUP BY a.student_key, st.name
 ORDER BY st.name, a.student_key";

const SUMMARY_BY_STUDENT: &str = "
SELECT a.subject_key, sub.name, COUNT(*),
       SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END)
  FROM attendance a
  JOIN subjects sub   ON sub.subject_key = a.subject_key
  JOIN enrollments en ON en.subject_key = a.subject_key
                     AND en.student_key = a.student_key
 WHERE a.student_key = ?1
 GROUP BY a.subject_key, sub.name
 ORDER BY sub.name, a.subject_key";

const CLASS_ROSTER: &str = "
SELECT a.student_key, st.name, a.date, a.status
  FROM attendance a
  JOIN students st ON st.student_key = a.student_key
 WHERE a.subject_key = ?1 AND a.date = ?2
 ORDER BY st.name, a.student_key";

const HISTORY: &str = "
SELECT a.event_id, a.date, a.status, a.subject_key, sub.name, a.recorded_at
  FROM attendance a
  JOIN subjects sub ON sub.subject_key = a.subject_key
 WHERE a.student_key = ?1 AND a.subject_key = ?2
 ORDER BY a.date, a.recorded_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rollcall attendance store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for SqliteStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SqliteStore").finish_non_exhaustive()
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let version: i64 = self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
      })
      .await?;
    tracing::debug!(version, "sqlite schema ready");
    Ok(())
  }
}

/// Whether a row with `key` exists in `table`. `table` and `column` are
/// always literals from this module.
fn exists(
  conn: &rusqlite::Connection,
  table: &str,
  column: &str,
  key: &str,
) -> rusqlite::Result<bool> {
  let sql = format!("SELECT 1 FROM {table} WHERE {column} = ?1");
  Ok(conn.query_row(&sql, params![key], |_| Ok(())).optional()?.is_some())
}

/// Upsert one unbound row. Returns `None` without writing when the student
/// is unknown.
fn upsert_unbound_row(
  conn: &rusqlite::Connection,
  row: &UnboundRow,
  now: &str,
) -> rusqlite::Result<Option<RawEvent>> {
  if !exists(conn, "students", "student_key", row.student_key.as_str())? {
    return Ok(None);
  }
  let mut stmt = conn.prepare_cached(UPSERT_UNBOUND)?;
  let raw = stmt.query_row(
    params![
      row.event_id,
      row.student_key.as_str(),
      row.date,
      row.status,
      row.recorded_at,
      now,
    ],
    RawEvent::from_row,
  )?;
  Ok(Some(raw))
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn put_faculty(
    &self,
    faculty: Faculty,
    password_hash: Option<String>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO faculty (faculty_key, name, department, password_hash)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (faculty_key) DO UPDATE SET
             name          = excluded.name,
             department    = excluded.department,
             password_hash = COALESCE(excluded.password_hash, faculty.password_hash)",
          params![
            faculty.faculty_key.as_str(),
            faculty.name,
            faculty.department,
            password_hash,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)
  }

  async fn put_subject(&self, subject: Subject) -> Result<()> {
    let enrolled: Checked<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "faculty", "faculty_key", subject.owner.as_str())? {
          return Ok(Err(rollcall_core::Error::FacultyNotFound(subject.owner)));
        }
        tx.execute(
          "INSERT INTO subjects (subject_key, name, faculty_key, department, semester)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (subject_key) DO UPDATE SET
             name        = excluded.name,
             faculty_key = excluded.faculty_key,
             department  = excluded.department,
             semester    = excluded.semester",
          params![
            subject.subject_key.as_str(),
            subject.name,
            subject.owner.as_str(),
            subject.department,
            subject.semester,
          ],
        )?;
        let enrolled = tx.execute(
          "INSERT OR IGNORE INTO enrollments (student_key, subject_key)
           SELECT student_key, ?1 FROM students
            WHERE department = ?2 AND semester = ?3",
          params![
            subject.subject_key.as_str(),
            subject.department,
            subject.semester
          ],
        )?;
        tx.commit()?;
        Ok(Ok(enrolled))
      })
      .await
      .map_err(Error::from_write)?;

    let enrolled = enrolled?;
    tracing::debug!(enrolled, "stored subject");
    Ok(())
  }

  async fn put_student(&self, student: Student) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO students (student_key, name, department, semester)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (student_key) DO UPDATE SET
             name       = excluded.name,
             department = excluded.department,
             semester   = excluded.semester",
          params![
            student.student_key.as_str(),
            student.name,
            student.department,
            student.semester,
          ],
        )?;
        tx.execute(
          "INSERT OR IGNORE INTO enrollments (student_key, subject_key)
           SELECT ?1, subject_key FROM subjects
            WHERE department = ?2 AND semester = ?3",
          params![
            student.student_key.as_str(),
            student.department,
            student.semester
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)
  }

  async fn enroll(
    &self,
    student_key: StudentKey,
    subject_key: SubjectKey,
  ) -> Result<()> {
    let outcome: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "students", "student_key", student_key.as_str())? {
          return Ok(Err(rollcall_core::Error::StudentNotFound(student_key)));
        }
        if !exists(&tx, "subjects", "subject_key", subject_key.as_str())? {
          return Ok(Err(rollcall_core::Error::SubjectNotFound(subject_key)));
        }
        tx.execute(
          "INSERT OR IGNORE INTO enrollments (student_key, subject_key)
           VALUES (?1, ?2)",
          params![student_key.as_str(), subject_key.as_str()],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .map_err(Error::from_write)?;
    Ok(outcome?)
  }

  async fn get_student(&self, student_key: StudentKey) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT student_key, name, department, semester
               FROM students WHERE student_key = ?1",
            params![student_key.as_str()],
            RawStudent::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn get_subject(&self, subject_key: SubjectKey) -> Result<Option<Subject>> {
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subject_key, name, faculty_key, department, semester
               FROM subjects WHERE subject_key = ?1",
            params![subject_key.as_str()],
            RawSubject::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn faculty_password_hash(
    &self,
    faculty_key: FacultyKey,
  ) -> Result<Option<String>> {
    let hash: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT password_hash FROM faculty WHERE faculty_key = ?1",
            params![faculty_key.as_str()],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;
    Ok(hash.flatten())
  }

  // ── Recording ─────────────────────────────────────────────────────────────

  async fn upsert_unbound(&self, event: NewEvent) -> Result<AttendanceEvent> {
    let row = UnboundRow::from(event);
    let now = encode_ts(Utc::now());

    let raw: Checked<RawEvent> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(raw) = upsert_unbound_row(&tx, &row, &now)? else {
          return Ok(Err(rollcall_core::Error::StudentNotFound(row.student_key)));
        };
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await
      .map_err(Error::from_write)?;

    raw?.into_event()
  }

  async fn upsert_unbound_batch(&self, events: Vec<NewEvent>) -> Result<usize> {
    let rows: Vec<UnboundRow> = events.into_iter().map(UnboundRow::from).collect();
    let now = encode_ts(Utc::now());

    let applied: Checked<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for row in &rows {
          if upsert_unbound_row(&tx, row, &now)?.is_none() {
            return Ok(Err(rollcall_core::Error::StudentNotFound(
              row.student_key.clone(),
            )));
          }
        }
        tx.commit()?;
        Ok(Ok(rows.len()))
      })
      .await
      .map_err(Error::from_write)?;

    Ok(applied?)
  }

  // ── Binding ───────────────────────────────────────────────────────────────

  async fn bind_window(&self, request: BindRequest) -> Result<BindOutcome> {
    let BindRequest { principal, subject_key, window } = request;
    let faculty_key = principal.faculty_key;
    let date  = encode_date(window.class_date);
    let start = encode_ts(window.start);
    let end   = encode_ts(window.end);
    let now   = encode_ts(Utc::now());

    let outcome: Checked<BindOutcome> = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the candidate count and
        // the update see the same rows.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !exists(&tx, "faculty", "faculty_key", faculty_key.as_str())? {
          return Ok(Err(rollcall_core::Error::FacultyNotFound(faculty_key)));
        }
        let owner: Option<String> = tx
          .query_row(
            "SELECT faculty_key FROM subjects WHERE subject_key = ?1",
            params![subject_key.as_str()],
            |r| r.get(0),
          )
          .optional()?;
        match owner {
          None => {
            return Ok(Err(rollcall_core::Error::SubjectNotFound(subject_key)));
          }
          Some(owner) if owner != faculty_key.as_str() => {
            return Ok(Err(rollcall_core::Error::NotSubjectOwner {
              faculty: faculty_key,
              subject: subject_key,
            }));
          }
          Some(_) => {}
        }

        let candidates: i64 =
          tx.query_row(COUNT_CANDIDATES, params![date, start, end], |r| r.get(0))?;
        let candidates = candidates as u64;
        tracing::debug!(candidates, subject = %subject_key, "bind window scanned");
        if candidates == 0 {
          return Ok(Ok(BindOutcome::default()));
        }

        let updated = tx.execute(
          BIND_CANDIDATES,
          params![date, start, end, subject_key.as_str(), now],
        )? as u64;
        tx.commit()?;

        Ok(Ok(BindOutcome {
          updated_count: updated,
          skipped_count: candidates.saturating_sub(updated),
        }))
      })
      .await
      .map_err(Error::from_write)?;

    Ok(outcome?)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_event(&self, event_id: Uuid) -> Result<Option<AttendanceEvent>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM attendance WHERE event_id = ?1");
    let id_str = encode_uuid(event_id);

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, params![id_str], RawEvent::from_row).optional()?)
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn events_on(
    &self,
    student_key: StudentKey,
    date: NaiveDate,
  ) -> Result<Vec<AttendanceEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM attendance
        WHERE student_key = ?1 AND date = ?2
        ORDER BY subject_key IS NOT NULL, subject_key"
    );
    let date_str = encode_date(date);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![student_key.as_str(), date_str], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn events_by_subject(
    &self,
    subject_key: SubjectKey,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<AttendanceEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM attendance
        WHERE subject_key = ?1 AND date BETWEEN ?2 AND ?3
        ORDER BY date, student_key"
    );
    let (from, to) = (encode_date(from), encode_date(to));

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![subject_key.as_str(), from, to], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn summary_by_subject(
    &self,
    subject_key: SubjectKey,
  ) -> Result<Vec<StudentSummary>> {
    let raws: Vec<RawTally> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(SUMMARY_BY_SUBJECT)?;
        let rows = stmt
          .query_map(params![subject_key.as_str()], RawTally::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTally::into_student_summary).collect()
  }

  async fn summary_by_student(
    &self,
    student_key: StudentKey,
  ) -> Result<Vec<SubjectSummary>> {
    let raws: Vec<RawTally> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(SUMMARY_BY_STUDENT)?;
        let rows = stmt
          .query_map(params![student_key.as_str()], RawTally::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTally::into_subject_summary).collect()
  }

  async fn class_roster(
    &self,
    subject_key: SubjectKey,
    date: NaiveDate,
  ) -> Result<Vec<RosterEntry>> {
    let date_str = encode_date(date);

    let raws: Vec<RawRosterEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(CLASS_ROSTER)?;
        let rows = stmt
          .query_map(
            params![subject_key.as_str(), date_str],
            RawRosterEntry::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRosterEntry::into_entry).collect()
  }

  async fn history(
    &self,
    student_key: StudentKey,
    subject_key: SubjectKey,
  ) -> Result<Vec<HistoryEntry>> {
    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(HISTORY)?;
        let rows = stmt
          .query_map(
            params![student_key.as_str(), subject_key.as_str()],
            RawHistoryEntry::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }
}
