//! Core types and trait definitions for the Torch resource catalog.
//!
//! Records, the materialised per-grade/subject views, language selection and
//! the [`store::ChangeFeedStore`] abstraction live here. No HTTP or database
//! code.

pub mod catalog;
pub mod error;
pub mod labels;
pub mod language;
pub mod materialize;
pub mod resource;
pub mod store;

pub use error::{Error, Result};
