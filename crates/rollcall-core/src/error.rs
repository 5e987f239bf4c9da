//! Error types for `rollcall-core`.

use thiserror::Error;

use crate::directory::{FacultyKey, StudentKey, SubjectKey};

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or missing caller input. Nothing has been written.
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("student not found: {0}")]
  StudentNotFound(StudentKey),

  #[error("subject not found: {0}")]
  SubjectNotFound(SubjectKey),

  #[error("faculty not found: {0}")]
  FacultyNotFound(FacultyKey),

  #[error("faculty {faculty} does not own subject {subject}")]
  NotSubjectOwner {
    faculty: FacultyKey,
    subject: SubjectKey,
  },

  /// A write violated a uniqueness invariant the upsert/skip logic should
  /// have prevented.
  #[error("conflict: {0}")]
  Conflict(String),
}

impl Error {
  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Backend-independent error category, used by outer layers (e.g. HTTP) to
/// pick a response without knowing the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Authorization,
  Conflict,
  /// Underlying persistence failure; surfaced unchanged, never retried.
  Store,
}

/// Implemented by every error type that can leave the engine.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::StudentNotFound(_)
      | Self::SubjectNotFound(_)
      | Self::FacultyNotFound(_) => ErrorKind::NotFound,
      Self::NotSubjectOwner { .. } => ErrorKind::Authorization,
      Self::Conflict(_) => ErrorKind::Conflict,
    }
  }
}
