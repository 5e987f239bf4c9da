//! Handlers for `/events` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events` | Body: [`EventInput`]; returns 201 + `{"event_id"}` |
//! | `POST` | `/events/bulk` | Body: `[EventInput]`; all-or-nothing, returns `{"count"}` |
//! | `GET`  | `/events/{id}` | Single stored event, bound or not |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rollcall_core::{
  Attendance,
  event::{AttendanceEvent, EventInput},
  store::AttendanceStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Recorded {
  pub event_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkRecorded {
  pub count: usize,
}

/// `POST /events`
pub async fn create<S>(
  State(app): State<Arc<Attendance<S>>>,
  Json(body): Json<EventInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + 'static,
{
  let event_id = app.record(body).await.map_err(ApiError::from_engine)?;
  Ok((StatusCode::CREATED, Json(Recorded { event_id })))
}

/// `POST /events/bulk`
pub async fn create_bulk<S>(
  State(app): State<Arc<Attendance<S>>>,
  Json(body): Json<Vec<EventInput>>,
) -> Result<Json<BulkRecorded>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let count = app.record_bulk(body).await.map_err(ApiError::from_engine)?;
  Ok(Json(BulkRecorded { count }))
}

/// `GET /events/{id}`
pub async fn get_one<S>(
  State(app): State<Arc<Attendance<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AttendanceEvent>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let event = app
    .get_event(id)
    .await
    .map_err(ApiError::from_engine)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  Ok(Json(event))
}
