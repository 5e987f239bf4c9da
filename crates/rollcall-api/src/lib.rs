//! JSON REST API for Rollcall.
//!
//! Exposes an axum [`Router`] backed by any [`AttendanceStore`] wrapped in an
//! [`Attendance`] engine. TLS and transport concerns are the caller's
//! responsibility; faculty authentication for binds is handled here by
//! [`auth::Authenticated`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(Arc::new(engine)))
//! ```

pub mod assignments;
pub mod auth;
pub mod error;
pub mod events;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rollcall_core::{Attendance, store::AttendanceStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `app`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(app: Arc<Attendance<S>>) -> Router<()>
where
  S: AttendanceStore + 'static,
{
  Router::new()
    // Recording
    .route("/events", post(events::create::<S>))
    .route("/events/bulk", post(events::create_bulk::<S>))
    .route("/events/{id}", get(events::get_one::<S>))
    // Binding
    .route("/assignments", post(assignments::create::<S>))
    // Reports
    .route("/subjects/{key}/summary", get(reports::subject_summary::<S>))
    .route("/subjects/{key}/roster", get(reports::roster::<S>))
    .route("/subjects/{key}/events", get(reports::subject_events::<S>))
    .route("/students/{key}/summary", get(reports::student_summary::<S>))
    .route("/students/{key}/history", get(reports::history::<S>))
    .with_state(app)
}

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use rollcall_core::{
    directory::{Faculty, FacultyKey, Student, StudentKey, Subject, SubjectKey},
    window::ReferenceZone,
  };
  use rollcall_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  /// F1 (password "secret") owns SUBJ1; F2 (password "other") owns SUBJ2.
  /// S1 and S2 (CS, sem 5) are enrolled in both subjects.
  async fn make_app() -> Arc<Attendance<SqliteStore>> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for (key, password, subject) in [("F1", "secret", "SUBJ1"), ("F2", "other", "SUBJ2")] {
      let salt = SaltString::generate(&mut OsRng);
      let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string();
      store
        .put_faculty(
          Faculty {
            faculty_key: FacultyKey::parse(key).unwrap(),
            name:        format!("Faculty {key}"),
            department:  "CS".into(),
          },
          Some(hash),
        )
        .await
        .unwrap();
      store
        .put_subject(Subject {
          subject_key: SubjectKey::parse(subject).unwrap(),
          name:        format!("Subject {subject}"),
          owner:       FacultyKey::parse(key).unwrap(),
          department:  "CS".into(),
          semester:    5,
        })
        .await
        .unwrap();
    }
    for (key, name) in [("S1", "Asha"), ("S2", "Bala")] {
      store
        .put_student(Student {
          student_key: StudentKey::parse(key).unwrap(),
          name:        name.into(),
          department:  "CS".into(),
          semester:    5,
        })
        .await
        .unwrap();
    }
    let zone: ReferenceZone = "+05:30".parse().unwrap();
    Arc::new(Attendance::new(store, zone))
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn send(
    app: &Arc<Attendance<SqliteStore>>,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
      builder = builder.header(header::AUTHORIZATION, auth);
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = api_router(app.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn event(student: &str, status: &str, at: &str) -> Value {
    json!({ "student_key": student, "status": status, "recorded_at": at })
  }

  fn assignment(subject: &str, date: &str, start: &str, end: &str) -> Value {
    json!({
      "subject_key": subject,
      "class_date":  date,
      "start_time":  start,
      "end_time":    end,
    })
  }

  // ── Recording ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn record_returns_201_and_the_event_is_readable() {
    let app = make_app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/events",
      None,
      Some(event("S1", "present", "2025-09-18T09:05:00+05:30")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["event_id"].as_str().unwrap().to_owned();

    let (status, body) = send(&app, "GET", &format!("/events/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_key"], "S1");
    assert_eq!(body["status"], "Present");
    assert_eq!(body["date"], "2025-09-18");
    assert_eq!(body["subject_key"], Value::Null);
  }

  #[tokio::test]
  async fn record_missing_status_is_400() {
    let app = make_app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/events",
      None,
      Some(json!({ "student_key": "S1", "recorded_at": "2025-09-18T09:05:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("missing status"));
  }

  #[tokio::test]
  async fn record_unknown_student_is_404() {
    let app = make_app().await;
    let (status, _) = send(
      &app,
      "POST",
      "/events",
      None,
      Some(event("S9", "Present", "2025-09-18T09:05:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn unknown_event_id_is_404() {
    let app = make_app().await;
    let (status, _) = send(
      &app,
      "GET",
      "/events/00000000-0000-0000-0000-000000000000",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn bulk_with_one_malformed_entry_writes_nothing() {
    let app = make_app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/events/bulk",
      None,
      Some(json!([
        event("S1", "Present", "2025-09-18T09:05:00+05:30"),
        { "student_key": "S2", "recorded_at": "2025-09-18T09:06:00+05:30" },
      ])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("event 1"));

    let rows = app
      .store()
      .events_on(
        StudentKey::parse("S1").unwrap(),
        "2025-09-18".parse().unwrap(),
      )
      .await
      .unwrap();
    assert!(rows.is_empty());
  }

  #[tokio::test]
  async fn bulk_returns_count() {
    let app = make_app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/events/bulk",
      None,
      Some(json!([
        event("S1", "Present", "2025-09-18T09:05:00+05:30"),
        event("S2", "Absent", "2025-09-18T09:06:00+05:30"),
      ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
  }

  // ── Binding ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn assignment_requires_credentials() {
    let app = make_app().await;
    let req = Request::builder()
      .method("POST")
      .uri("/assignments")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(
        assignment("SUBJ1", "2025-09-18", "09:00", "09:50").to_string(),
      ))
      .unwrap();
    let resp = api_router(app).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn assignment_with_wrong_password_is_401() {
    let app = make_app().await;
    let (status, _) = send(
      &app,
      "POST",
      "/assignments",
      Some(&auth_header("F1", "wrong")),
      Some(assignment("SUBJ1", "2025-09-18", "09:00", "09:50")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn assignment_binds_then_reports_zero() {
    let app = make_app().await;
    for (student, at) in [
      ("S1", "2025-09-18T09:05:00+05:30"),
      ("S2", "2025-09-18T09:40:00+05:30"),
    ] {
      let (status, _) =
        send(&app, "POST", "/events", None, Some(event(student, "Present", at))).await;
      assert_eq!(status, StatusCode::CREATED);
    }

    let auth = auth_header("F1", "secret");
    let body = assignment("SUBJ1", "2025-09-18", "09:00", "09:50");

    let (status, out) =
      send(&app, "POST", "/assignments", Some(&auth), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out, json!({ "updated_count": 2, "skipped_count": 0 }));

    let (_, out) = send(&app, "POST", "/assignments", Some(&auth), Some(body)).await;
    assert_eq!(out, json!({ "updated_count": 0, "skipped_count": 0 }));

    let (status, roster) = send(
      &app,
      "GET",
      "/subjects/SUBJ1/roster?date=2025-09-18",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster.as_array().unwrap().len(), 2);
    assert_eq!(roster[0]["student_name"], "Asha");
  }

  #[tokio::test]
  async fn assignment_by_non_owner_is_403() {
    let app = make_app().await;
    send(
      &app,
      "POST",
      "/events",
      None,
      Some(event("S1", "Present", "2025-09-18T09:05:00+05:30")),
    )
    .await;

    let (status, _) = send(
      &app,
      "POST",
      "/assignments",
      Some(&auth_header("F2", "other")),
      Some(assignment("SUBJ1", "2025-09-18", "09:00", "09:50")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn reversed_window_is_400() {
    let app = make_app().await;
    let (status, _) = send(
      &app,
      "POST",
      "/assignments",
      Some(&auth_header("F1", "secret")),
      Some(assignment("SUBJ1", "2025-09-18", "10:00", "09:00")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn summaries_and_history_reflect_bound_events() {
    let app = make_app().await;
    let auth = auth_header("F1", "secret");
    for (date, status) in [
      ("2025-09-18", "Present"),
      ("2025-09-19", "Present"),
      ("2025-09-20", "Absent"),
    ] {
      send(
        &app,
        "POST",
        "/events",
        None,
        Some(event("S1", status, &format!("{date}T09:05:00+05:30"))),
      )
      .await;
      send(
        &app,
        "POST",
        "/assignments",
        Some(&auth),
        Some(assignment("SUBJ1", date, "09:00", "09:50")),
      )
      .await;
    }

    let (status, rows) = send(&app, "GET", "/subjects/SUBJ1/summary", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["student_key"], "S1");
    assert_eq!(rows[0]["total_classes"], 3);
    assert_eq!(rows[0]["attended"], 2);
    assert_eq!(rows[0]["percentage"], 66.67);

    let (_, rows) = send(&app, "GET", "/students/S1/summary", None, None).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["subject_key"], "SUBJ1");

    let (_, rows) =
      send(&app, "GET", "/students/S1/history?subject=SUBJ1", None, None).await;
    let dates: Vec<_> = rows
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["date"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(dates, ["2025-09-18", "2025-09-19", "2025-09-20"]);

    let (_, rows) = send(
      &app,
      "GET",
      "/subjects/SUBJ1/events?from=2025-09-19&to=2025-09-19",
      None,
      None,
    )
    .await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn report_query_errors_are_400() {
    let app = make_app().await;

    let (status, body) = send(&app, "GET", "/subjects/SUBJ1/roster", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("date"));

    let (status, _) = send(
      &app,
      "GET",
      "/subjects/SUBJ1/events?from=2025-09-20&to=2025-09-19",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
      send(&app, "GET", "/subjects/SUBJ1/roster?date=18-09-2025", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }
}
