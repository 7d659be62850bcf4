//! Grades, subjects and site settings.
//!
//! Existence of a grade or subject is defined solely by presence in its live
//! collection. Resources reference them by id as soft foreign keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, Fields};

/// Remove a typed key from the passthrough map. A non-string value under a
/// typed key is discarded so it cannot collide with the typed field.
fn take_str(fields: &mut Fields, key: &str) -> Option<String> {
  match fields.remove(key) {
    Some(Value::String(s)) => Some(s),
    _ => None,
  }
}

// ─── Grade ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grade {
  pub id:      String,
  /// Human label; falls back to the id.
  pub display: String,
  #[serde(flatten)]
  pub fields:  Fields,
}

impl Grade {
  pub fn from_document(doc: &Document) -> Self {
    let mut fields = doc.fields.clone();
    fields.remove("id");
    let display = take_str(&mut fields, "display").unwrap_or_else(|| doc.id.clone());
    Self { id: doc.id.clone(), display, fields }
  }
}

/// Body of a grade write. The document id is supplied separately.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradeInput {
  pub display: String,
  #[serde(default, flatten)]
  pub extra:   Fields,
}

impl GradeInput {
  /// Stored fields for grade `id`; grades are always written as active.
  pub fn into_fields(self, id: &str) -> Fields {
    let mut fields = self.extra;
    fields.insert("display".into(), Value::String(self.display));
    fields.insert("id".into(), Value::String(id.to_owned()));
    fields.insert("active".into(), Value::Bool(true));
    fields
  }
}

// ─── Subject ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
  pub id:      String,
  pub display: String,
  /// Grade ids this subject is offered under. May be empty.
  pub grades:  Vec<String>,
  #[serde(flatten)]
  pub fields:  Fields,
}

impl Subject {
  pub fn from_document(doc: &Document) -> Self {
    let mut fields = doc.fields.clone();
    fields.remove("id");
    let display = take_str(&mut fields, "display").unwrap_or_else(|| doc.id.clone());
    let grades = match fields.remove("grades") {
      Some(Value::Array(items)) => items
        .into_iter()
        .filter_map(|v| match v {
          Value::String(s) => Some(s),
          _ => None,
        })
        .collect(),
      _ => Vec::new(),
    };
    Self { id: doc.id.clone(), display, grades, fields }
  }

  pub fn offered_in(&self, grade_id: &str) -> bool {
    self.grades.iter().any(|g| g == grade_id)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectInput {
  pub display: String,
  #[serde(default)]
  pub grades:  Vec<String>,
  #[serde(default, flatten)]
  pub extra:   Fields,
}

impl SubjectInput {
  pub fn into_fields(self, id: &str) -> Fields {
    let mut fields = self.extra;
    fields.insert("display".into(), Value::String(self.display));
    fields.insert(
      "grades".into(),
      Value::Array(self.grades.into_iter().map(Value::String).collect()),
    );
    fields.insert("id".into(), Value::String(id.to_owned()));
    fields
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// The singleton site settings document. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub whatsapp: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub facebook: Option<String>,
  #[serde(flatten)]
  pub fields:   Fields,
}

impl Settings {
  pub const FIELDS: [&'static str; 4] = ["whatsapp", "email", "phone", "facebook"];

  pub fn from_document(doc: &Document) -> Self {
    let mut fields = doc.fields.clone();
    Self {
      whatsapp: take_str(&mut fields, "whatsapp"),
      email: take_str(&mut fields, "email"),
      phone: take_str(&mut fields, "phone"),
      facebook: take_str(&mut fields, "facebook"),
      fields,
    }
  }

  /// The fields written when the settings document is first created.
  pub fn bootstrap_fields() -> Fields {
    Self::FIELDS
      .iter()
      .map(|k| ((*k).to_owned(), Value::String(String::new())))
      .collect()
  }
}

/// A partial settings update; absent fields are left as stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
  pub whatsapp: Option<String>,
  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub facebook: Option<String>,
  #[serde(default, flatten)]
  pub extra:    Fields,
}

impl SettingsPatch {
  pub fn into_fields(self) -> Fields {
    let mut fields = self.extra;
    let known = [
      ("whatsapp", self.whatsapp),
      ("email", self.email),
      ("phone", self.phone),
      ("facebook", self.facebook),
    ];
    for (key, value) in known {
      if let Some(v) = value {
        fields.insert(key.to_owned(), Value::String(v));
      }
    }
    fields
  }

  pub fn is_empty(&self) -> bool {
    self.whatsapp.is_none()
      && self.email.is_none()
      && self.phone.is_none()
      && self.facebook.is_none()
      && self.extra.is_empty()
  }
}
