//! JSON REST API for the Torch catalog.
//!
//! Exposes an axum [`Router`] backed by a running [`SyncEngine`]. Reads are
//! served from the engine's current snapshot; writes go through its mutation
//! façade and answer `202 Accepted`, since their effect only becomes visible
//! once the store's feed delivers the next snapshot.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", torch_api::api_router(state))
//! ```

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use torch_core::store::ChangeFeedStore;
use torch_sync::SyncEngine;

pub use auth::AuthConfig;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: ChangeFeedStore> {
  pub engine: Arc<SyncEngine<S>>,
  pub auth:   Arc<AuthConfig>,
}

impl<S: ChangeFeedStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), auth: self.auth.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: ChangeFeedStore>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Snapshot and status
    .route("/catalog", get(catalog::snapshot::<S>))
    .route("/status", get(catalog::status::<S>))
    .route("/stats", get(catalog::stats::<S>))
    .route("/session", get(catalog::session::<S>))
    // Languages
    .route("/languages", get(catalog::languages::<S>))
    .route("/language", put(admin::select_language::<S>))
    // Grades and subjects
    .route("/grades", get(catalog::grades::<S>))
    .route(
      "/grades/{grade}",
      get(catalog::grade_page::<S>)
        .put(admin::put_grade::<S>)
        .delete(admin::delete_grade::<S>),
    )
    .route("/grades/{grade}/subjects", get(catalog::grade_subjects::<S>))
    .route(
      "/grades/{grade}/subjects/{subject}/resources",
      get(catalog::resources::<S>),
    )
    .route(
      "/grades/{grade}/subjects/{subject}/videos",
      get(catalog::videos::<S>),
    )
    .route("/subjects", get(catalog::subjects::<S>))
    .route(
      "/subjects/{subject}",
      put(admin::put_subject::<S>)
        .patch(admin::patch_subject::<S>)
        .delete(admin::delete_subject::<S>),
    )
    // Resources
    .route("/resources", post(admin::add_resource::<S>))
    .route("/resources/recent", get(catalog::recent::<S>))
    .route(
      "/resources/{id}",
      axum::routing::delete(admin::delete_resource::<S>),
    )
    // Settings
    .route(
      "/settings",
      get(catalog::settings::<S>).patch(admin::patch_settings::<S>),
    )
    .with_state(state)
}
