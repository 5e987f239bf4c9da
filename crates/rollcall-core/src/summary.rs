//! Read models produced by the aggregator.
//!
//! None of these are stored; backends compute them from bound events on every
//! call. Unbound events never contribute.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  directory::{StudentKey, SubjectKey},
  event::AttendanceStatus,
};

// ─── Tally ───────────────────────────────────────────────────────────────────

/// Class count and attended count for one (student, subject) group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
  pub total_classes: u32,
  pub attended:      u32,
}

impl Tally {
  pub fn new(total_classes: u32, attended: u32) -> Self {
    Self { total_classes, attended }
  }

  /// `100 * attended / total_classes`, rounded half-up to two decimals.
  ///
  /// Computed in integer hundredths-of-a-percent so `2/3` yields exactly
  /// `66.67` and `1/8` yields `12.5`. An empty tally reports `0.0`; groups
  /// built from existing rows always have `total_classes >= 1`.
  pub fn percentage(&self) -> f64 {
    if self.total_classes == 0 {
      return 0.0;
    }
    let total = u64::from(self.total_classes);
    let scaled = u64::from(self.attended) * 10_000;
    let hundredths = (2 * scaled + total) / (2 * total);
    hundredths as f64 / 100.0
  }
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// One student's record within a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
  pub student_key:   StudentKey,
  pub student_name:  String,
  pub total_classes: u32,
  pub attended:      u32,
  pub percentage:    f64,
}

impl StudentSummary {
  pub fn new(student_key: StudentKey, student_name: String, tally: Tally) -> Self {
    Self {
      student_key,
      student_name,
      total_classes: tally.total_classes,
      attended: tally.attended,
      percentage: tally.percentage(),
    }
  }
}

/// One subject's record for a single student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
  pub subject_key:   SubjectKey,
  pub subject_name:  String,
  pub total_classes: u32,
  pub attended:      u32,
  pub percentage:    f64,
}

impl SubjectSummary {
  pub fn new(subject_key: SubjectKey, subject_name: String, tally: Tally) -> Self {
    Self {
      subject_key,
      subject_name,
      total_classes: tally.total_classes,
      attended: tally.attended,
      percentage: tally.percentage(),
    }
  }
}

// ─── Roster and history ──────────────────────────────────────────────────────

/// A line of a class roster: who was marked what on the class date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
  pub student_key:  StudentKey,
  pub student_name: String,
  pub date:         NaiveDate,
  pub status:       AttendanceStatus,
}

/// A single bound event in a student's history for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub event_id:     Uuid,
  pub date:         NaiveDate,
  pub status:       AttendanceStatus,
  pub subject_key:  SubjectKey,
  pub subject_name: String,
  pub recorded_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn two_of_three_rounds_to_66_67() {
    assert_eq!(Tally::new(3, 2).percentage(), 66.67);
  }

  #[test]
  fn one_of_three_rounds_down() {
    assert_eq!(Tally::new(3, 1).percentage(), 33.33);
  }

  #[test]
  fn exact_half_hundredth_rounds_up() {
    // 1/8 = 12.5 exactly; 1/16 = 6.25; 1/32 = 3.125 -> 3.13
    assert_eq!(Tally::new(8, 1).percentage(), 12.5);
    assert_eq!(Tally::new(16, 1).percentage(), 6.25);
    assert_eq!(Tally::new(32, 1).percentage(), 3.13);
  }

  #[test]
  fn bounds() {
    assert_eq!(Tally::new(5, 5).percentage(), 100.0);
    assert_eq!(Tally::new(5, 0).percentage(), 0.0);
    assert_eq!(Tally::default().percentage(), 0.0);
  }
}
