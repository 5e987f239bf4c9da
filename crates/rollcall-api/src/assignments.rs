//! `POST /assignments`: bind a class window's unbound events to a subject.
//!
//! Requires Basic credentials; the authenticated faculty member must own the
//! subject named in the body.

use std::sync::Arc;

use axum::{Json, extract::State};
use rollcall_core::{
  Attendance,
  service::AssignInput,
  store::{AttendanceStore, BindOutcome},
};

use crate::{auth::Authenticated, error::ApiError};

pub async fn create<S>(
  State(app): State<Arc<Attendance<S>>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<AssignInput>,
) -> Result<Json<BindOutcome>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let outcome = app
    .assign(&principal, body)
    .await
    .map_err(ApiError::from_engine)?;
  Ok(Json(outcome))
}
