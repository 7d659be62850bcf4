//! Error types for `torch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A live subscription could not deliver a snapshot.
  #[error("feed error: {0}")]
  Feed(String),

  #[error("document {0:?} is not a JSON object")]
  NotAnObject(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
