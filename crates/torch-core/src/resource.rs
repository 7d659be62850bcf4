//! Resource records — the atomic unit of the catalog.
//!
//! A resource is one file or link entry (textbook, past paper, note, video)
//! filed under a grade and a subject. On the wire a resource is a loosely
//! shaped document; here it is decoded once into a [`ResourceRecord`] whose
//! [`ResourceKind`] carries only the fields relevant to its type.
//!
//! Decoding never fails. A document the catalog cannot place (unknown type,
//! missing grade, ...) decodes to [`ResourceKind::Unrecognized`] and is kept
//! in the flat listing only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

use crate::store::{Document, Fields};

/// Wire field names of a resource document.
pub mod wire {
  pub const ID: &str = "id";
  pub const GRADE: &str = "grade";
  pub const SUBJECT: &str = "subject";
  pub const RESOURCE_TYPE: &str = "resourceType";
  pub const LANGUAGES: &str = "languages";
  pub const LANGUAGE: &str = "language";
  pub const UPLOAD_DATE: &str = "uploadDate";
  pub const PAPER_TYPE: &str = "paperType";
  pub const PAPER_CATEGORY: &str = "paperCategory";
  pub const SCHOOL: &str = "school";
  pub const TITLE: &str = "title";
  pub const NAME: &str = "name";
  pub const DESCRIPTION: &str = "description";
  pub const URL: &str = "url";
  pub const ADDED_BY: &str = "addedBy";
}

/// The term buckets every subject starts with.
pub const TERM_KEYS: [&str; 3] = ["term1", "term2", "term3"];

// ─── Type tags ───────────────────────────────────────────────────────────────

/// The closed set of resource types the catalog files into nested views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
  Textbook,
  Papers,
  Videos,
  Notes,
}

impl ResourceType {
  pub const ALL: [Self; 4] = [Self::Textbook, Self::Papers, Self::Videos, Self::Notes];

  /// The discriminant stored in the `resourceType` field.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Textbook => "textbook",
      Self::Papers => "papers",
      Self::Videos => "videos",
      Self::Notes => "notes",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.as_str() == s)
  }
}

/// Whether a past paper belongs to a school term or to a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperType {
  Term,
  Chapter,
}

impl PaperType {
  /// Anything other than `"term"` (including absence) is a chapter paper.
  pub fn from_wire(value: Option<&str>) -> Self {
    match value {
      Some("term") => Self::Term,
      _ => Self::Chapter,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Term => "term",
      Self::Chapter => "chapter",
    }
  }
}

/// Paper-only metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMeta {
  pub paper_type: PaperType,
  /// `term1`..`term3` for term papers, a free-form chapter key otherwise.
  pub category:   String,
  pub school:     Option<String>,
}

/// The typed, per-type part of a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
  Textbook,
  Paper(PaperMeta),
  Video,
  Note,
  /// A record the catalog cannot file into any bucket.
  Unrecognized {
    /// The raw `resourceType` value, if there was one.
    resource_type: Option<String>,
    reason:        String,
  },
}

impl ResourceKind {
  pub fn resource_type(&self) -> Option<ResourceType> {
    match self {
      Self::Textbook => Some(ResourceType::Textbook),
      Self::Paper(_) => Some(ResourceType::Papers),
      Self::Video => Some(ResourceType::Videos),
      Self::Note => Some(ResourceType::Notes),
      Self::Unrecognized { .. } => None,
    }
  }

  pub fn is_recognized(&self) -> bool {
    !matches!(self, Self::Unrecognized { .. })
  }
}

// ─── ResourceRecord ──────────────────────────────────────────────────────────

/// A decoded resource document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
  pub id:          String,
  pub grade:       String,
  pub subject:     String,
  /// Every language tag on the record, in stored order.
  pub languages:   Vec<String>,
  /// The primary language: `languages[0]`, or the configured fallback when
  /// the record carries no tags. Used by single-language consumers only.
  pub language:    String,
  /// Store-assigned upload time; `None` when missing or unparseable.
  pub upload_date: Option<DateTime<Utc>>,
  pub kind:        ResourceKind,
  /// The full stored field map, passed through untouched.
  pub fields:      Fields,
}

impl ResourceRecord {
  /// Decode a stored document. `fallback_language` becomes the primary
  /// language of records without any language tag.
  pub fn from_document(doc: &Document, fallback_language: &str) -> Self {
    let languages: Vec<String> = doc
      .fields
      .get(wire::LANGUAGES)
      .and_then(Value::as_array)
      .map(|tags| {
        tags
          .iter()
          .filter_map(Value::as_str)
          .map(str::to_owned)
          .collect()
      })
      .unwrap_or_default();

    let language = languages
      .first()
      .cloned()
      .unwrap_or_else(|| fallback_language.to_owned());

    let upload_date = doc
      .str_field(wire::UPLOAD_DATE)
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|dt| dt.with_timezone(&Utc));

    let grade = doc.str_field(wire::GRADE).unwrap_or_default().to_owned();
    let subject = doc.str_field(wire::SUBJECT).unwrap_or_default().to_owned();

    Self {
      id: doc.id.clone(),
      kind: decode_kind(doc, &grade, &subject),
      grade,
      subject,
      languages,
      language,
      upload_date,
      fields: doc.fields.clone(),
    }
  }

  /// Upload time for recency ordering; missing dates sort as the epoch.
  pub fn upload_timestamp(&self) -> DateTime<Utc> {
    self.upload_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
  }

  /// A display title, falling back through `title` and `name`.
  pub fn title(&self) -> Option<&str> {
    self
      .fields
      .get(wire::TITLE)
      .or_else(|| self.fields.get(wire::NAME))
      .and_then(Value::as_str)
  }
}

fn decode_kind(doc: &Document, grade: &str, subject: &str) -> ResourceKind {
  let raw_type = doc.str_field(wire::RESOURCE_TYPE);
  let unrecognized = |reason: &str| ResourceKind::Unrecognized {
    resource_type: raw_type.map(str::to_owned),
    reason:        reason.to_owned(),
  };

  if grade.is_empty() {
    return unrecognized("missing grade");
  }
  if subject.is_empty() {
    return unrecognized("missing subject");
  }

  let Some(raw) = raw_type else {
    return unrecognized("missing resourceType");
  };

  match ResourceType::parse(raw) {
    Some(ResourceType::Textbook) => ResourceKind::Textbook,
    Some(ResourceType::Videos) => ResourceKind::Video,
    Some(ResourceType::Notes) => ResourceKind::Note,
    Some(ResourceType::Papers) => match doc.str_field(wire::PAPER_CATEGORY) {
      Some(category) => ResourceKind::Paper(PaperMeta {
        paper_type: PaperType::from_wire(doc.str_field(wire::PAPER_TYPE)),
        category:   category.to_owned(),
        school:     doc.str_field(wire::SCHOOL).map(str::to_owned),
      }),
      None => unrecognized("missing paperCategory"),
    },
    None => unrecognized("unknown resourceType"),
  }
}

/// Serialises as the stored wire shape plus `id` and the derived primary
/// `language`.
impl Serialize for ResourceRecord {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let passthrough = self
      .fields
      .iter()
      .filter(|(k, _)| k.as_str() != wire::ID && k.as_str() != wire::LANGUAGE);

    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry(wire::ID, &self.id)?;
    map.serialize_entry(wire::LANGUAGE, &self.language)?;
    for (k, v) in passthrough {
      map.serialize_entry(k, v)?;
    }
    map.end()
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Caller-supplied description of a new resource. Type, placement, language
/// and upload time are added by the mutation that files it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetails {
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  pub url:         String,
  #[serde(default)]
  pub added_by:    Option<String>,
  /// Any further fields (`driveLink`, `youtubeUrl`, `fileId`, ...).
  #[serde(default, flatten)]
  pub extra:       Fields,
}

impl ResourceDetails {
  /// The stored field map. `name` mirrors `title` for older readers.
  pub fn into_fields(self) -> Fields {
    let mut fields = self.extra;
    fields.insert(wire::TITLE.into(), Value::String(self.title.clone()));
    fields.insert(wire::NAME.into(), Value::String(self.title));
    fields.insert(
      wire::DESCRIPTION.into(),
      Value::String(self.description.unwrap_or_default()),
    );
    fields.insert(wire::URL.into(), Value::String(self.url));
    if let Some(by) = self.added_by {
      fields.insert(wire::ADDED_BY.into(), Value::String(by));
    }
    fields
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn doc(v: Value) -> Document {
    Document::from_value("r1", v).unwrap()
  }

  #[test]
  fn decodes_term_paper() {
    let r = ResourceRecord::from_document(
      &doc(json!({
        "grade": "grade6", "subject": "math", "resourceType": "papers",
        "paperType": "term", "paperCategory": "term2", "school": "Royal",
        "languages": ["tamil"], "uploadDate": "2024-03-01T10:00:00Z"
      })),
      "english",
    );
    assert_eq!(
      r.kind,
      ResourceKind::Paper(PaperMeta {
        paper_type: PaperType::Term,
        category:   "term2".into(),
        school:     Some("Royal".into()),
      })
    );
    assert_eq!(r.language, "tamil");
    assert!(r.upload_date.is_some());
  }

  #[test]
  fn any_other_paper_type_is_a_chapter_paper() {
    let r = ResourceRecord::from_document(
      &doc(json!({
        "grade": "g", "subject": "s", "resourceType": "papers",
        "paperCategory": "ch3"
      })),
      "english",
    );
    assert!(matches!(
      r.kind,
      ResourceKind::Paper(PaperMeta { paper_type: PaperType::Chapter, .. })
    ));
  }

  #[test]
  fn empty_languages_fall_back_without_inventing_tags() {
    let r = ResourceRecord::from_document(
      &doc(json!({ "grade": "g", "subject": "s", "resourceType": "notes",
                   "languages": [] })),
      "sinhala",
    );
    assert_eq!(r.language, "sinhala");
    assert!(r.languages.is_empty());
  }

  #[test]
  fn unknown_type_is_unrecognized_not_an_error() {
    let r = ResourceRecord::from_document(
      &doc(json!({ "grade": "g", "subject": "s", "resourceType": "quiz" })),
      "english",
    );
    assert_eq!(
      r.kind,
      ResourceKind::Unrecognized {
        resource_type: Some("quiz".into()),
        reason:        "unknown resourceType".into(),
      }
    );
  }

  #[test]
  fn missing_grade_is_unrecognized() {
    let r = ResourceRecord::from_document(
      &doc(json!({ "subject": "s", "resourceType": "textbook" })),
      "english",
    );
    assert!(!r.kind.is_recognized());
  }

  #[test]
  fn invalid_upload_date_sorts_as_epoch() {
    let r = ResourceRecord::from_document(
      &doc(json!({ "grade": "g", "subject": "s", "resourceType": "videos",
                   "uploadDate": "yesterday" })),
      "english",
    );
    assert_eq!(r.upload_date, None);
    assert_eq!(r.upload_timestamp(), DateTime::<Utc>::UNIX_EPOCH);
  }

  #[test]
  fn serialises_passthrough_fields_with_id_and_language() {
    let r = ResourceRecord::from_document(
      &doc(json!({
        "grade": "g", "subject": "s", "resourceType": "videos",
        "languages": ["english"], "language": "stale", "youtubeUrl": "u"
      })),
      "english",
    );
    let out = serde_json::to_value(&r).unwrap();
    assert_eq!(out["id"], "r1");
    assert_eq!(out["language"], "english");
    assert_eq!(out["youtubeUrl"], "u");
    assert_eq!(out["resourceType"], "videos");
  }

  #[test]
  fn type_names_agree_between_serde_and_wire() {
    for ty in ResourceType::ALL {
      assert_eq!(serde_json::to_value(ty).unwrap(), ty.as_str());
      assert_eq!(ResourceType::parse(ty.as_str()), Some(ty));
    }
    assert_eq!(ResourceType::parse("Textbook"), None);
  }

  #[test]
  fn details_mirror_title_into_name() {
    let details: ResourceDetails = serde_json::from_value(json!({
      "title": "Algebra", "url": "https://drive/x", "fileId": "x"
    }))
    .unwrap();
    let fields = details.into_fields();
    assert_eq!(fields["name"], "Algebra");
    assert_eq!(fields["fileId"], "x");
    assert_eq!(fields["description"], "");
  }
}
