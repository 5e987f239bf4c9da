//! Directory entities the engine references but does not own.
//!
//! Students, faculty and subjects are identified by stable natural keys
//! (enrollment number, staff id, subject code). The engine only needs their
//! display names, the subject's owning faculty, and the department/semester
//! pair used for enrollment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Keys ────────────────────────────────────────────────────────────────────

macro_rules! natural_key {
  ($(#[$meta:meta])* $name:ident, $what:literal) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      /// Build a key from caller input. Surrounding whitespace is dropped; an
      /// empty key is rejected.
      pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
          return Err(Error::validation(concat!("missing ", $what)));
        }
        Ok(Self(trimmed.to_owned()))
      }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }
  };
}

natural_key!(
  /// A student's enrollment number (USN).
  StudentKey,
  "student key"
);
natural_key!(
  /// A subject code, e.g. `"21CS51"`.
  SubjectKey,
  "subject key"
);
natural_key!(
  /// A faculty member's staff identifier.
  FacultyKey,
  "faculty key"
);

/// Parse an optional raw key, treating `None` the same as an empty string.
pub(crate) fn required_key<K>(
  raw: Option<&str>,
  parse: fn(&str) -> Result<K>,
) -> Result<K> {
  parse(raw.unwrap_or_default())
}

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_key: StudentKey,
  pub name:        String,
  pub department:  String,
  pub semester:    u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
  pub faculty_key: FacultyKey,
  pub name:        String,
  pub department:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_key: SubjectKey,
  pub name:        String,
  /// The only faculty allowed to bind attendance to this subject.
  pub owner:       FacultyKey,
  pub department:  String,
  pub semester:    u8,
}

// ─── Principal ───────────────────────────────────────────────────────────────

/// The authenticated faculty member on whose behalf an operation runs.
///
/// Produced by whatever layer authenticates the caller and passed explicitly
/// into [`crate::Attendance::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub faculty_key: FacultyKey,
}

impl Principal {
  pub fn new(faculty_key: FacultyKey) -> Self { Self { faculty_key } }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_trimmed() {
    let key = StudentKey::parse("  1RV21CS001 ").unwrap();
    assert_eq!(key.as_str(), "1RV21CS001");
    assert_eq!(key.to_string(), "1RV21CS001");
  }

  #[test]
  fn blank_key_is_a_validation_error() {
    let err = SubjectKey::parse("   ").unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m == "missing subject key"));
  }

  #[test]
  fn absent_key_is_a_validation_error() {
    let err = required_key(None, FacultyKey::parse).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn keys_serialize_as_plain_strings() {
    let key = FacultyKey::parse("F1").unwrap();
    assert_eq!(serde_json::to_string(&key).unwrap(), "\"F1\"");
  }
}
