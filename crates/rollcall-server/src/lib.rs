//! Process wiring for the Rollcall HTTP server: configuration, directory
//! seeding and the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::{Json, Router, routing::get};
use rollcall_core::{
  Attendance,
  directory::{Faculty, Student, StudentKey, Subject, SubjectKey},
  store::AttendanceStore,
  window::ReferenceZone,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `ROLLCALL_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  pub store_path:       PathBuf,
  /// The institution's timezone; dates and bind windows are interpreted here.
  #[serde(default)]
  pub reference_offset: ReferenceZone,
  /// Optional JSON [`DirectorySeed`] applied at startup.
  #[serde(default)]
  pub directory_path:   Option<PathBuf>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

impl ServerConfig {
  /// Load from an optional TOML file, then let `ROLLCALL_*` variables
  /// override individual keys.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("ROLLCALL"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Directory seed ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FacultyEntry {
  #[serde(flatten)]
  pub faculty:       Faculty,
  /// argon2 PHC string; faculty without one cannot bind attendance.
  #[serde(default)]
  pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Enrollment {
  pub student_key: StudentKey,
  pub subject_key: SubjectKey,
}

/// Directory entries loaded from a JSON file at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectorySeed {
  pub faculty:     Vec<FacultyEntry>,
  pub subjects:    Vec<Subject>,
  pub students:    Vec<Student>,
  /// Extra enrollments beyond the automatic department/semester matching.
  pub enrollments: Vec<Enrollment>,
}

impl DirectorySeed {
  pub fn from_path(path: &Path) -> anyhow::Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read directory file {path:?}"))?;
    serde_json::from_str(&raw)
      .with_context(|| format!("failed to parse directory file {path:?}"))
  }

  /// Upsert every entry. Faculty go first so subject owners resolve.
  pub async fn apply<S: AttendanceStore>(self, store: &S) -> Result<(), S::Error> {
    let counts = (
      self.faculty.len(),
      self.subjects.len(),
      self.students.len(),
      self.enrollments.len(),
    );

    for entry in self.faculty {
      store.put_faculty(entry.faculty, entry.password_hash).await?;
    }
    for subject in self.subjects {
      store.put_subject(subject).await?;
    }
    for student in self.students {
      store.put_student(student).await?;
    }
    for e in self.enrollments {
      store.enroll(e.student_key, e.subject_key).await?;
    }

    tracing::info!(
      faculty = counts.0,
      subjects = counts.1,
      students = counts.2,
      enrollments = counts.3,
      "directory loaded"
    );
    Ok(())
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: `/health` plus the JSON API under `/api`, with
/// per-request tracing spans.
pub fn app<S>(engine: Arc<Attendance<S>>) -> Router
where
  S: AttendanceStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", rollcall_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use rollcall_core::directory::FacultyKey;
  use rollcall_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  const SEED: &str = r#"{
    "faculty": [
      { "faculty_key": "F1", "name": "Dr. Rao", "department": "CS",
        "password_hash": "$argon2id$placeholder" },
      { "faculty_key": "F2", "name": "Dr. Iyer", "department": "EE" }
    ],
    "subjects": [
      { "subject_key": "SUBJ1", "name": "Operating Systems", "owner": "F1",
        "department": "CS", "semester": 5 },
      { "subject_key": "SUBJ2", "name": "Circuits", "owner": "F2",
        "department": "EE", "semester": 3 }
    ],
    "students": [
      { "student_key": "S1", "name": "Asha", "department": "CS", "semester": 5 }
    ],
    "enrollments": [ { "student_key": "S1", "subject_key": "SUBJ2" } ]
  }"#;

  #[tokio::test]
  async fn seed_populates_directory() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let seed: DirectorySeed = serde_json::from_str(SEED).unwrap();
    seed.apply(&store).await.unwrap();

    let subject = store
      .get_subject(SubjectKey::parse("SUBJ1").unwrap())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(subject.owner, FacultyKey::parse("F1").unwrap());

    assert_eq!(
      store
        .faculty_password_hash(FacultyKey::parse("F1").unwrap())
        .await
        .unwrap()
        .as_deref(),
      Some("$argon2id$placeholder")
    );
    assert!(
      store
        .faculty_password_hash(FacultyKey::parse("F2").unwrap())
        .await
        .unwrap()
        .is_none()
    );
  }

  #[test]
  fn empty_seed_is_valid() {
    let seed: DirectorySeed = serde_json::from_str("{}").unwrap();
    assert!(seed.faculty.is_empty() && seed.students.is_empty());
  }

  #[test]
  fn config_defaults_apply() {
    let cfg: ServerConfig =
      serde_json::from_value(json!({ "store_path": "rollcall.db" })).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.reference_offset, ReferenceZone::utc());
    assert!(cfg.directory_path.is_none());

    let cfg: ServerConfig = serde_json::from_value(json!({
      "store_path": "rollcall.db",
      "reference_offset": "+05:30",
    }))
    .unwrap();
    assert_eq!(cfg.reference_offset.to_string(), "+05:30");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/data/rollcall.db")),
      PathBuf::from(home).join("data/rollcall.db")
    );
    assert_eq!(
      expand_tilde(Path::new("/var/rollcall.db")),
      PathBuf::from("/var/rollcall.db")
    );
  }

  #[tokio::test]
  async fn health_and_api_are_mounted() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let router = app(Arc::new(Attendance::new(store, ReferenceZone::utc())));

    let resp = router
      .clone()
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
      .oneshot(
        Request::get("/api/subjects/SUBJ1/summary")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
