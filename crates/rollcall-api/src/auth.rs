//! HTTP Basic-auth extractor resolving the caller to a faculty [`Principal`].
//!
//! The username is the faculty key; the password is checked against the
//! argon2 PHC string stored for that faculty member.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rollcall_core::{
  Attendance,
  directory::{FacultyKey, Principal},
  store::AttendanceStore,
};

use crate::error::ApiError;

/// Present in a handler's arguments means the request carried valid faculty
/// credentials.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

/// Split a `Basic` authorization header into username and password.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Check `password` against an argon2 PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|hash| Argon2::default().verify_password(password.as_bytes(), &hash))
    .is_ok()
}

impl<S> FromRequestParts<Arc<Attendance<S>>> for Authenticated
where
  S: AttendanceStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<Attendance<S>>,
  ) -> Result<Self, Self::Rejection> {
    let (username, password) = basic_credentials(&parts.headers)?;
    let faculty_key = FacultyKey::parse(&username).map_err(|_| ApiError::Unauthorized)?;

    let hash = state
      .store()
      .faculty_password_hash(faculty_key.clone())
      .await
      .map_err(ApiError::from_engine)?;

    match hash {
      Some(phc) if verify_password(&password, &phc) => {
        Ok(Authenticated(Principal::new(faculty_key)))
      }
      _ => {
        tracing::debug!(faculty = %faculty_key, "rejected credentials");
        Err(ApiError::Unauthorized)
      }
    }
  }
}
