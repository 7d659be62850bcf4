//! Admin credentials.
//!
//! Reads are public. Mutation handlers take an [`Admin`] argument, which only
//! extracts when the request carries HTTP Basic credentials matching the
//! configured username and argon2 hash.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use torch_core::store::ChangeFeedStore;

use crate::{AppState, error::ApiError};

/// The one account allowed to mutate the catalog.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl AuthConfig {
  /// Whether `credentials` name this account and match its hash. An
  /// unparseable stored hash matches nothing.
  pub fn accepts(&self, credentials: &Credentials) -> bool {
    if credentials.username != self.username {
      return false;
    }
    PasswordHash::new(&self.password_hash).is_ok_and(|hash| {
      Argon2::default()
        .verify_password(credentials.password.as_bytes(), &hash)
        .is_ok()
    })
  }
}

/// A username/password pair taken from an `Authorization: Basic` header.
#[derive(Debug, PartialEq, Eq)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl Credentials {
  /// `None` when the header is absent, not Basic, or not valid base64 UTF-8
  /// of the form `user:password`.
  pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let decoded = B64.decode(value.strip_prefix("Basic ")?).ok()?;
    let (username, password) = std::str::from_utf8(&decoded).ok()?.split_once(':')?;
    Some(Self { username: username.to_owned(), password: password.to_owned() })
  }
}

/// The "may this caller mutate" boolean, for endpoints that only report it.
pub fn is_authorized(headers: &HeaderMap, config: &AuthConfig) -> bool {
  Credentials::from_headers(headers).is_some_and(|c| config.accepts(&c))
}

/// Proof that the request was made by the admin account.
pub struct Admin;

impl<S: ChangeFeedStore> FromRequestParts<AppState<S>> for Admin {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    if is_authorized(&parts.headers, &state.auth) {
      Ok(Admin)
    } else {
      Err(ApiError::Unauthorized)
    }
  }
}
