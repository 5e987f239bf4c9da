//! SQL schema for the Rollcall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Directory tables. Only the columns the engine reads are kept here.
CREATE TABLE IF NOT EXISTS faculty (
    faculty_key   TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    department    TEXT NOT NULL,
    password_hash TEXT               -- argon2 PHC string or NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_key TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    faculty_key TEXT NOT NULL REFERENCES faculty(faculty_key) ON DELETE RESTRICT,
    department  TEXT NOT NULL,
    semester    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_key TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    department  TEXT NOT NULL,
    semester    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollments (
    student_key TEXT NOT NULL REFERENCES students(student_key) ON DELETE CASCADE,
    subject_key TEXT NOT NULL REFERENCES subjects(subject_key) ON DELETE CASCADE,
    PRIMARY KEY (student_key, subject_key)
);

-- Attendance events. subject_key is NULL until a bind attributes the row.
-- Timestamps are fixed-width RFC 3339 UTC so text order is time order.
CREATE TABLE IF NOT EXISTS attendance (
    event_id    TEXT PRIMARY KEY,
    student_key TEXT NOT NULL REFERENCES students(student_key) ON DELETE CASCADE,
    subject_key TEXT REFERENCES subjects(subject_key) ON DELETE CASCADE,
    date        TEXT NOT NULL,   -- YYYY-MM-DD in the reference zone
    status      TEXT NOT NULL CHECK (status IN ('Present', 'Absent', 'Late')),
    recorded_at TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    -- NULLs are distinct here, so this only constrains bound rows.
    UNIQUE (student_key, subject_key, date)
);

-- At most one unbound row per student per day.
CREATE UNIQUE INDEX IF NOT EXISTS attendance_unbound_uniq
    ON attendance(student_key, date) WHERE subject_key IS NULL;

CREATE INDEX IF NOT EXISTS attendance_window_idx
    ON attendance(date, recorded_at);
CREATE INDEX IF NOT EXISTS attendance_subject_date_idx
    ON attendance(subject_key, date);

CREATE INDEX IF NOT EXISTS subjects_cohort_idx ON subjects(department, semester);
CREATE INDEX IF NOT EXISTS students_cohort_idx ON students(department, semester);

PRAGMA user_version = 1;
";
