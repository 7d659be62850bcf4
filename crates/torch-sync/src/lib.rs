//! The Torch catalog sync engine.
//!
//! Subscribes to the four live collections of a
//! [`ChangeFeedStore`](torch_core::store::ChangeFeedStore), materializes every
//! snapshot into query-ready views, and publishes one consistent
//! [`CatalogSnapshot`] that readers observe through a `watch` channel.
//!
//! Writes go through [`Mutations`] and are never applied locally: their
//! effect becomes visible only when the store's feed delivers the next
//! snapshot.
//!
//! ```rust,ignore
//! let engine = SyncEngine::init(store, CatalogConfig::default());
//! let snapshot = engine.ready().await;
//! let page = snapshot.grade_page("grade6");
//! engine.dispose();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod language;
pub mod mutations;
pub mod queries;
pub mod state;

mod feeds;

pub use config::CatalogConfig;
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use language::LanguageFilter;
pub use mutations::Mutations;
pub use state::{CatalogSnapshot, LoadingFlags, Slice, SliceUpdate};
