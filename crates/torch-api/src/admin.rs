//! Mutation handlers. Every one requires [`Admin`] credentials.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/resources` | Body: placement, type, details; returns `{"id"}` |
//! | `DELETE` | `/resources/:id` | |
//! | `PUT` | `/grades/:grade` | Body: `{"display":"Grade 6"}` |
//! | `DELETE` | `/grades/:grade` | |
//! | `PUT` | `/subjects/:subject` | Body: `{"display":…,"grades":[…]}` |
//! | `PATCH` | `/subjects/:subject` | Merges the given fields |
//! | `DELETE` | `/subjects/:subject` | |
//! | `PATCH` | `/settings` | Partial settings |
//! | `PUT` | `/language` | Body: `{"language":"tamil"}` |
//!
//! Writes answer `202 Accepted` once the store has acknowledged them.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use torch_core::{
  catalog::{GradeInput, SettingsPatch, SubjectInput},
  language::LanguageSelection,
  resource::{PaperMeta, PaperType, ResourceDetails, ResourceType},
  store::{ChangeFeedStore, Fields},
};
use tracing::info;

use crate::{AppState, auth::Admin, error::ApiError};

// ─── Resources ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResourceBody {
  pub resource_type:  ResourceType,
  pub grade:          String,
  pub subject:        String,
  /// Defaults to the catalog's fallback language.
  #[serde(default)]
  pub language:       Option<String>,
  #[serde(default)]
  pub paper_type:     Option<PaperType>,
  #[serde(default)]
  pub paper_category: Option<String>,
  #[serde(default)]
  pub school:         Option<String>,
  #[serde(flatten)]
  pub details:        ResourceDetails,
}

/// `POST /resources`
pub async fn add_resource<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Json(body): Json<NewResourceBody>,
) -> Result<impl IntoResponse, ApiError> {
  let engine = &state.engine;
  let language = body
    .language
    .unwrap_or_else(|| engine.config().default_language.clone());
  let m = engine.mutations();

  let id = match body.resource_type {
    ResourceType::Textbook => {
      m.add_textbook(&body.grade, &body.subject, &language, body.details).await?
    }
    ResourceType::Videos => {
      m.add_video(&body.grade, &body.subject, &language, body.details).await?
    }
    ResourceType::Notes => {
      m.add_note(&body.grade, &body.subject, &language, body.details).await?
    }
    ResourceType::Papers => {
      let category = body
        .paper_category
        .ok_or_else(|| ApiError::BadRequest("papers need a paperCategory".into()))?;
      let paper = PaperMeta {
        paper_type: body.paper_type.unwrap_or(PaperType::Term),
        category,
        school: body.school,
      };
      m.add_paper(&body.grade, &body.subject, &language, paper, body.details).await?
    }
  };
  Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

/// `DELETE /resources/:id`
pub async fn delete_resource<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().delete_resource(&id).await?;
  Ok(StatusCode::ACCEPTED)
}

// ─── Grades and subjects ──────────────────────────────────────────────────────

/// `PUT /grades/:grade`
pub async fn put_grade<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Path(grade): Path<String>,
  Json(body): Json<GradeInput>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().add_grade(&grade, body).await?;
  Ok(StatusCode::ACCEPTED)
}

/// `DELETE /grades/:grade`
pub async fn delete_grade<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Path(grade): Path<String>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().delete_grade(&grade).await?;
  Ok(StatusCode::ACCEPTED)
}

/// `PUT /subjects/:subject`
pub async fn put_subject<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Path(subject): Path<String>,
  Json(body): Json<SubjectInput>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().add_subject(&subject, body).await?;
  Ok(StatusCode::ACCEPTED)
}

/// `PATCH /subjects/:subject`
pub async fn patch_subject<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Path(subject): Path<String>,
  Json(fields): Json<Fields>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().update_subject(&subject, fields).await?;
  Ok(StatusCode::ACCEPTED)
}

/// `DELETE /subjects/:subject`
pub async fn delete_subject<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Path(subject): Path<String>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().delete_subject(&subject).await?;
  Ok(StatusCode::ACCEPTED)
}

// ─── Settings and language ────────────────────────────────────────────────────

/// `PATCH /settings`
pub async fn patch_settings<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Json(patch): Json<SettingsPatch>,
) -> Result<StatusCode, ApiError> {
  state.engine.mutations().update_settings(patch).await?;
  Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct SelectLanguage {
  pub language: String,
}

/// `PUT /language` — changes the engine-wide default selection.
pub async fn select_language<S: ChangeFeedStore>(
  _admin: Admin,
  State(state): State<AppState<S>>,
  Json(body): Json<SelectLanguage>,
) -> Result<StatusCode, ApiError> {
  let selection = LanguageSelection::parse(&body.language);
  let filter = state.engine.language();
  if !filter.is_offered(&selection) {
    return Err(ApiError::BadRequest(format!("unknown language: {}", body.language)));
  }
  info!(language = %body.language, "language selection changed");
  filter.select(selection);
  Ok(StatusCode::NO_CONTENT)
}
