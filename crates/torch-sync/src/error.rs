//! Error types for `torch-sync`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A write was rejected by the backing store.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid input: {0}")]
  Invalid(String),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
