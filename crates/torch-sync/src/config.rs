//! Engine configuration.

use serde::{Deserialize, Serialize};
use torch_core::{
  language::{LanguageOption, default_languages},
  materialize::{DEFAULT_LANGUAGE, MaterializeOptions},
};

/// Catalog-wide settings for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
  /// Primary language of records that carry no language tag.
  #[serde(default = "default_language")]
  pub default_language:  String,
  /// Languages offered by the language selector.
  #[serde(default = "default_languages")]
  pub languages:         Vec<LanguageOption>,
  /// Id of the singleton document in the `settings` collection.
  #[serde(default = "default_settings_document")]
  pub settings_document: String,
}

fn default_language() -> String { DEFAULT_LANGUAGE.to_owned() }

fn default_settings_document() -> String { "general".to_owned() }

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      default_language:  default_language(),
      languages:         default_languages(),
      settings_document: default_settings_document(),
    }
  }
}

impl CatalogConfig {
  pub fn materialize_options(&self) -> MaterializeOptions {
    MaterializeOptions { default_language: self.default_language.clone() }
  }
}
