//! Read-only report endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/subjects/{key}/summary` | Per-student percentages |
//! | `GET` | `/subjects/{key}/roster` | `?date=YYYY-MM-DD` required |
//! | `GET` | `/subjects/{key}/events` | `?from=&to=` required, both inclusive |
//! | `GET` | `/students/{key}/summary` | Per-subject percentages over enrolled subjects |
//! | `GET` | `/students/{key}/history` | `?subject=` required |
//!
//! Query parameters are optional at the extractor level so that a missing one
//! is reported as a validation error in the usual JSON shape.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use rollcall_core::{
  Attendance,
  event::AttendanceEvent,
  store::AttendanceStore,
  summary::{HistoryEntry, RosterEntry, StudentSummary, SubjectSummary},
};
use serde::Deserialize;

use crate::error::ApiError;

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
  value
    .as_deref()
    .filter(|v| !v.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest(format!("missing query parameter {name:?}")))
}

// ─── Subject reports ─────────────────────────────────────────────────────────

/// `GET /subjects/{key}/summary`
pub async fn subject_summary<S>(
  State(app): State<Arc<Attendance<S>>>,
  Path(key): Path<String>,
) -> Result<Json<Vec<StudentSummary>>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let rows = app
    .summary_by_subject(&key)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct RosterParams {
  pub date: Option<String>,
}

/// `GET /subjects/{key}/roster?date=`
pub async fn roster<S>(
  State(app): State<Arc<Attendance<S>>>,
  Path(key): Path<String>,
  Query(params): Query<RosterParams>,
) -> Result<Json<Vec<RosterEntry>>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let date = required(&params.date, "date")?;
  let rows = app
    .class_roster(&key, date)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub from: Option<String>,
  pub to:   Option<String>,
}

/// `GET /subjects/{key}/events?from=&to=`
pub async fn subject_events<S>(
  State(app): State<Arc<Attendance<S>>>,
  Path(key): Path<String>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<AttendanceEvent>>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let from = required(&params.from, "from")?;
  let to = required(&params.to, "to")?;
  let rows = app
    .events_by_subject(&key, from, to)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(rows))
}

// ─── Student reports ─────────────────────────────────────────────────────────

/// `GET /students/{key}/summary`
pub async fn student_summary<S>(
  State(app): State<Arc<Attendance<S>>>,
  Path(key): Path<String>,
) -> Result<Json<Vec<SubjectSummary>>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let rows = app
    .summary_by_student(&key)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub subject: Option<String>,
}

/// `GET /students/{key}/history?subject=`
pub async fn history<S>(
  State(app): State<Arc<Attendance<S>>>,
  Path(key): Path<String>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let subject = required(&params.subject, "subject")?;
  let rows = app
    .history(&key, subject)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(rows))
}
