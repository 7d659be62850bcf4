//! Display labels in the catalog's three languages.
//!
//! Subject names resolve in order: the subject's own `nameSinhala` /
//! `nameTamil` field, the built-in dictionary keyed by subject id, then the
//! stored display name. Resource type labels fall back to English for any
//! language without a translation.

use serde::Serialize;

use crate::{
  catalog::Subject,
  language::LanguageSelection,
  materialize::DEFAULT_LANGUAGE,
  resource::ResourceType,
};

/// One phrase in each supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Phrase {
  english: &'static str,
  sinhala: &'static str,
  tamil:   &'static str,
}

impl Phrase {
  const fn new(english: &'static str, sinhala: &'static str, tamil: &'static str) -> Self {
    Self { english, sinhala, tamil }
  }

  fn get(&self, language: &str) -> Option<&'static str> {
    match language {
      "english" => Some(self.english),
      "sinhala" => Some(self.sinhala),
      "tamil" => Some(self.tamil),
      _ => None,
    }
  }
}

const TEXTBOOKS: Phrase = Phrase::new("Textbooks", "පෙළපොත්", "பாடப்புத்தகங்கள்");
const NOTES: Phrase = Phrase::new("Short Notes", "කෙටි සටහන්", "சிறு குறிப்புகள்");
const PAPERS: Phrase =
  Phrase::new("Past Papers", "පසුගිය ප්‍රශ්න පත්‍ර", "பழைய வினாத்தாள்கள்");
const VIDEOS: Phrase = Phrase::new("Videos", "වීඩියෝ", "காணொளிகள்");

/// Subject names keyed by subject id.
const SUBJECTS: &[(&str, Phrase)] = &[
  ("mathematics", Phrase::new("Mathematics", "ගණිතය", "கணிதம்")),
  ("science", Phrase::new("Science", "විද්‍යාව", "விஞ்ஞானம்")),
  ("history", Phrase::new("History", "ඉතිහාසය", "வரலாறு")),
  ("geography", Phrase::new("Geography", "භූගෝල විද්‍යාව", "புவியியல்")),
  ("english", Phrase::new("English Language", "ඉංග්‍රීසි භාෂාව", "ஆங்கில மொழி")),
  ("sinhala", Phrase::new("Sinhala Language", "සිංහල භාෂාව", "சிங்கள மொழி")),
  ("tamil", Phrase::new("Tamil Language", "දෙමළ භාෂාව", "தமிழ் மொழி")),
  (
    "ict",
    Phrase::new(
      "Information and Communication Technology (ICT)",
      "තොරතුරු හා සන්නිවේදන තාක්ෂණය",
      "தகவல் மற்றும் தகவல் தொடர்பு தொழில்நுட்பம்",
    ),
  ),
  ("religion", Phrase::new("Religion", "ආගම", "சமயம்")),
  ("civics", Phrase::new("Civic Education", "පුරවැසි අධ්‍යාපනය", "குடியியல் கல்வி")),
  ("biology", Phrase::new("Biology", "ජීව විද්‍යාව", "உயிரியல்")),
  ("chemistry", Phrase::new("Chemistry", "රසායන විද්‍යාව", "இரசாயனவியல்")),
  ("physics", Phrase::new("Physics", "භෞතික විද්‍යාව", "பெளதிகவியல்")),
  ("combined_maths", Phrase::new("Combined Mathematics", "සංයුක්ත ගණිතය", "இணைந்த கணிதம்")),
  ("accounting", Phrase::new("Accounting", "ගිණුම්කරණය", "கணக்கீடு")),
  ("business_studies", Phrase::new("Business Studies", "ව්‍යාපාර අධ්‍යයනය", "வர்த்தக கல்வி")),
  ("economics", Phrase::new("Economics", "ආර්ථික විද්‍යාව", "பொருளியல்")),
];

/// The language labels are rendered in. "All languages" reads as English.
pub fn label_language(selection: &LanguageSelection) -> &str {
  match selection {
    LanguageSelection::All => DEFAULT_LANGUAGE,
    LanguageSelection::Only(tag) => tag,
  }
}

/// The heading for a resource type, e.g. "Past Papers".
pub fn resource_type_label(resource_type: ResourceType, language: &str) -> &'static str {
  let phrase = match resource_type {
    ResourceType::Textbook => TEXTBOOKS,
    ResourceType::Papers => PAPERS,
    ResourceType::Videos => VIDEOS,
    ResourceType::Notes => NOTES,
  };
  phrase.get(language).unwrap_or(phrase.english)
}

/// The name to show for `subject` in `language`.
pub fn subject_name(subject: &Subject, language: &str) -> String {
  let own = match language {
    "sinhala" => subject.fields.get("nameSinhala"),
    "tamil" => subject.fields.get("nameTamil"),
    _ => None,
  };
  if let Some(name) = own.and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
    return name.to_owned();
  }

  SUBJECTS
    .iter()
    .find(|(id, _)| *id == subject.id)
    .and_then(|(_, phrase)| phrase.get(language))
    .map_or_else(|| subject.display.clone(), str::to_owned)
}

/// Headings for every resource type in one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeLabels {
  pub textbooks: &'static str,
  pub papers:    &'static str,
  pub notes:     &'static str,
  pub videos:    &'static str,
}

impl TypeLabels {
  pub fn for_language(language: &str) -> Self {
    Self {
      textbooks: resource_type_label(ResourceType::Textbook, language),
      papers:    resource_type_label(ResourceType::Papers, language),
      notes:     resource_type_label(ResourceType::Notes, language),
      videos:    resource_type_label(ResourceType::Videos, language),
    }
  }
}
