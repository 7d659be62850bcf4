//! Read handlers. All of them answer from the engine's current snapshot.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/catalog` | The whole snapshot |
//! | `GET` | `/status` | Loading flags and per-slice errors |
//! | `GET` | `/grades/:grade` | Grade page; `?language=` |
//! | `GET` | `/grades/:grade/subjects/:subject/resources` | `?language=` |
//! | `GET` | `/grades/:grade/subjects/:subject/videos` | `?language=` |
//! | `GET` | `/resources/recent` | `?limit=&grade=&language=` |
//!
//! Without `?language=` the engine-wide selection applies.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use torch_core::{
  catalog::{Grade, Settings, Subject},
  language::{LanguageOption, LanguageSelection},
  materialize::{SharedRecord, SubjectResources},
  store::ChangeFeedStore,
};
use torch_sync::{
  CatalogSnapshot, LoadingFlags, Slice, SyncEngine,
  language::{filter_records, filter_resources, shows_record},
  queries::{CatalogStats, GradePage},
};

use crate::{AppState, auth::is_authorized, error::ApiError};

const DEFAULT_RECENT_LIMIT: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct LanguageParams {
  pub language: Option<String>,
}

/// The requested selection, or the engine-wide one when none was given.
fn selection<S: ChangeFeedStore>(
  engine: &SyncEngine<S>,
  requested: Option<&str>,
) -> Result<LanguageSelection, ApiError> {
  let Some(key) = requested else {
    return Ok(engine.language().current());
  };
  let selection = LanguageSelection::parse(key);
  if !engine.language().is_offered(&selection) {
    return Err(ApiError::BadRequest(format!("unknown language: {key}")));
  }
  Ok(selection)
}

// ─── Snapshot and status ──────────────────────────────────────────────────────

/// `GET /catalog`
pub async fn snapshot<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
) -> Json<Arc<CatalogSnapshot>> {
  Json(state.engine.snapshot())
}

#[derive(Debug, Serialize)]
pub struct Status {
  pub ready:    bool,
  pub loading:  LoadingFlags,
  pub errors:   BTreeMap<Slice, String>,
  pub revision: u64,
}

/// `GET /status`
pub async fn status<S: ChangeFeedStore>(State(state): State<AppState<S>>) -> Json<Status> {
  let snapshot = state.engine.snapshot();
  Json(Status {
    ready:    !snapshot.is_loading(),
    loading:  snapshot.loading,
    errors:   snapshot.errors.clone(),
    revision: snapshot.revision,
  })
}

/// `GET /stats`
pub async fn stats<S: ChangeFeedStore>(State(state): State<AppState<S>>) -> Json<CatalogStats> {
  Json(state.engine.snapshot().stats())
}

/// `GET /session` — whether the supplied credentials may mutate.
pub async fn session<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Json<Value> {
  Json(json!({ "authorized": is_authorized(&headers, &state.auth) }))
}

// ─── Languages ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Languages {
  pub current:   LanguageSelection,
  pub available: Vec<LanguageOption>,
}

/// `GET /languages`
pub async fn languages<S: ChangeFeedStore>(State(state): State<AppState<S>>) -> Json<Languages> {
  let filter = state.engine.language();
  Json(Languages {
    current:   filter.current(),
    available: filter.available_languages().to_vec(),
  })
}

// ─── Grades and subjects ──────────────────────────────────────────────────────

/// `GET /grades`
pub async fn grades<S: ChangeFeedStore>(State(state): State<AppState<S>>) -> Json<Vec<Grade>> {
  Json(state.engine.snapshot().grades.values().cloned().collect())
}

/// `GET /subjects`
pub async fn subjects<S: ChangeFeedStore>(State(state): State<AppState<S>>) -> Json<Vec<Subject>> {
  Json(state.engine.snapshot().subjects.values().cloned().collect())
}

/// `GET /grades/:grade` — 404 if the grade does not exist.
pub async fn grade_page<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
  Path(grade): Path<String>,
  Query(params): Query<LanguageParams>,
) -> Result<Json<GradePage>, ApiError> {
  let selection = selection(&state.engine, params.language.as_deref())?;
  let page = state
    .engine
    .snapshot()
    .grade_page(&grade)
    .ok_or_else(|| ApiError::NotFound(format!("grade {grade}")))?;
  Ok(Json(page.for_language(&selection)))
}

/// `GET /grades/:grade/subjects`
pub async fn grade_subjects<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
  Path(grade): Path<String>,
) -> Json<Vec<Subject>> {
  let snapshot = state.engine.snapshot();
  Json(snapshot.subjects_for_grade(&grade).into_iter().cloned().collect())
}

/// `GET /grades/:grade/subjects/:subject/resources` — unknown pairs answer
/// with empty buckets.
pub async fn resources<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
  Path((grade, subject)): Path<(String, String)>,
  Query(params): Query<LanguageParams>,
) -> Result<Json<SubjectResources>, ApiError> {
  let selection = selection(&state.engine, params.language.as_deref())?;
  let buckets = state.engine.snapshot().resources_for(&grade, &subject);
  Ok(Json(filter_resources(&selection, &buckets)))
}

/// `GET /grades/:grade/subjects/:subject/videos`
pub async fn videos<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
  Path((grade, subject)): Path<(String, String)>,
  Query(params): Query<LanguageParams>,
) -> Result<Json<Vec<SharedRecord>>, ApiError> {
  let selection = selection(&state.engine, params.language.as_deref())?;
  let snapshot = state.engine.snapshot();
  Ok(Json(filter_records(&selection, snapshot.videos_for(&grade, &subject))))
}

// ─── Resources ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub limit:    Option<usize>,
  pub grade:    Option<String>,
  pub language: Option<String>,
}

/// `GET /resources/recent`
pub async fn recent<S: ChangeFeedStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<SharedRecord>>, ApiError> {
  let selection = selection(&state.engine, params.language.as_deref())?;
  let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
  let recent = state
    .engine
    .snapshot()
    .recent_resources(usize::MAX, params.grade.as_deref())
    .into_iter()
    .filter(|r| shows_record(&selection, r))
    .take(limit)
    .collect();
  Ok(Json(recent))
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// `GET /settings`
pub async fn settings<S: ChangeFeedStore>(State(state): State<AppState<S>>) -> Json<Settings> {
  Json(state.engine.snapshot().settings.clone())
}
