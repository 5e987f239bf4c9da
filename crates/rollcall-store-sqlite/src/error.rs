//! Error type for `rollcall-store-sqlite`.

use rollcall_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] rollcall_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// Classify a failed write: uniqueness and foreign-key violations become
  /// [`rollcall_core::Error::Conflict`], everything else stays a database
  /// error.
  pub(crate) fn from_write(err: tokio_rusqlite::Error) -> Self {
    match &err {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
        failure,
        _,
      )) if failure.code == rusqlite::ErrorCode::ConstraintViolation => {
        Self::Core(rollcall_core::Error::Conflict(err.to_string()))
      }
      _ => Self::Database(err),
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Database(_) | Self::Uuid(_) | Self::Decode(_) => ErrorKind::Store,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
