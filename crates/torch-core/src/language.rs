//! Language selection and the visibility predicate.

use serde::{Deserialize, Serialize};

/// The sentinel key that selects every language.
pub const ALL_LANGUAGES: &str = "all";

/// Which language the reader has chosen to see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LanguageSelection {
  #[default]
  All,
  Only(String),
}

impl LanguageSelection {
  pub fn parse(key: &str) -> Self {
    if key == ALL_LANGUAGES {
      Self::All
    } else {
      Self::Only(key.to_owned())
    }
  }

  pub fn key(&self) -> &str {
    match self {
      Self::All => ALL_LANGUAGES,
      Self::Only(tag) => tag,
    }
  }

  /// Whether a resource tagged `tag` is visible under this selection.
  ///
  /// Exact, case-sensitive tag match. Multi-language records are checked by
  /// the caller once per tag.
  pub fn admits(&self, tag: &str) -> bool {
    match self {
      Self::All => true,
      Self::Only(selected) => selected == tag,
    }
  }
}

impl From<String> for LanguageSelection {
  fn from(key: String) -> Self {
    if key == ALL_LANGUAGES { Self::All } else { Self::Only(key) }
  }
}

impl From<LanguageSelection> for String {
  fn from(sel: LanguageSelection) -> Self {
    match sel {
      LanguageSelection::All => ALL_LANGUAGES.to_owned(),
      LanguageSelection::Only(tag) => tag,
    }
  }
}

/// A language the catalog offers for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
  pub key:     String,
  pub display: String,
  #[serde(default)]
  pub color:   Option<String>,
}

impl LanguageOption {
  pub fn new(key: &str, display: &str, color: &str) -> Self {
    Self {
      key:     key.to_owned(),
      display: display.to_owned(),
      color:   Some(color.to_owned()),
    }
  }
}

/// The languages offered out of the box.
pub fn default_languages() -> Vec<LanguageOption> {
  vec![
    LanguageOption::new("sinhala", "සිංහල", "#dc3545"),
    LanguageOption::new("tamil", "தமிழ்", "#198754"),
    LanguageOption::new("english", "English", "#0d6efd"),
  ]
}
