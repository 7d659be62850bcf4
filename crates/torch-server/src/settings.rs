//! Server configuration, read from TOML and `TORCH_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use torch_sync::CatalogConfig;

/// Top-level configuration for the Torch server binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default)]
  pub catalog:            CatalogConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Layer the optional file at `path` under the environment.
  ///
  /// Nested keys use a double underscore, e.g.
  /// `TORCH_CATALOG__DEFAULT_LANGUAGE=sinhala`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TORCH")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The store path with a leading `~` expanded to the home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn minimal_file_takes_defaults() {
    let cfg = parse(
      r#"
        store_path         = "/var/lib/torch/catalog.db"
        auth_username      = "admin"
        auth_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$abc$def"
      "#,
    );
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.catalog, CatalogConfig::default());
  }

  #[test]
  fn catalog_table_overrides_language() {
    let cfg = parse(
      r#"
        host               = "0.0.0.0"
        port               = 3000
        store_path         = "catalog.db"
        auth_username      = "admin"
        auth_password_hash = "x"

        [catalog]
        default_language = "tamil"
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:3000");
    assert_eq!(cfg.catalog.default_language, "tamil");
    assert_eq!(cfg.catalog.settings_document, "general");
  }

  #[test]
  fn missing_credentials_fail() {
    let result = Config::builder()
      .add_source(File::from_str(r#"store_path = "x.db""#, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize::<ServerConfig>();
    assert!(result.is_err());
  }

  #[test]
  fn tilde_expands_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/torch/catalog.db"));
    assert_eq!(expanded, PathBuf::from(home).join("torch/catalog.db"));
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
