//! Read-side queries over a [`CatalogSnapshot`].

use std::collections::BTreeMap;

use serde::Serialize;
use torch_core::{
  catalog::{Grade, Subject},
  labels::{TypeLabels, label_language, subject_name},
  language::LanguageSelection,
  materialize::{DEFAULT_LANGUAGE, SharedRecord, SubjectResources},
  resource::ResourceKind,
};

use crate::{
  language::{filter_records, filter_resources},
  state::CatalogSnapshot,
};

/// One subject as shown on a grade page.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectPage {
  pub subject:   Subject,
  /// The subject's name in the page's label language.
  pub name:      String,
  pub resources: SubjectResources,
  pub videos:    Vec<SharedRecord>,
}

/// Everything a grade page shows.
#[derive(Debug, Clone, Serialize)]
pub struct GradePage {
  pub grade:    Grade,
  /// Resource type headings in the page's label language.
  pub labels:   TypeLabels,
  /// Keyed by subject id.
  pub subjects: BTreeMap<String, SubjectPage>,
}

impl GradePage {
  /// The same page with only records visible under `selection`, labelled
  /// in the selected language.
  pub fn for_language(&self, selection: &LanguageSelection) -> Self {
    let language = label_language(selection);
    let subjects = self
      .subjects
      .iter()
      .map(|(id, page)| {
        let page = SubjectPage {
          subject:   page.subject.clone(),
          name:      subject_name(&page.subject, language),
          resources: filter_resources(selection, &page.resources),
          videos:    filter_records(selection, &page.videos),
        };
        (id.clone(), page)
      })
      .collect();
    Self {
      grade: self.grade.clone(),
      labels: TypeLabels::for_language(language),
      subjects,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
  pub total_grades:       usize,
  pub total_subjects:     usize,
  /// Every record that is not a video, placed or not.
  pub total_resources:    usize,
  pub total_videos:       usize,
  /// Records per language tag. A record with several tags counts once under
  /// each; an untagged record counts under its fallback language.
  pub language_breakdown: BTreeMap<String, usize>,
}

impl CatalogSnapshot {
  /// Subjects offered under `grade`, in id order.
  pub fn subjects_for_grade(&self, grade: &str) -> Vec<&Subject> {
    self.subjects.values().filter(|s| s.offered_in(grade)).collect()
  }

  /// The buckets for one pair. Unknown pairs get empty default buckets.
  pub fn resources_for(&self, grade: &str, subject: &str) -> SubjectResources {
    self.views.resources_for(grade, subject).cloned().unwrap_or_default()
  }

  pub fn videos_for(&self, grade: &str, subject: &str) -> &[SharedRecord] {
    self.views.videos_for(grade, subject)
  }

  /// `None` if the grade is not in the grades collection. Labels are in
  /// English; see [`GradePage::for_language`].
  pub fn grade_page(&self, grade: &str) -> Option<GradePage> {
    let entry = self.grades.get(grade)?;
    let language = DEFAULT_LANGUAGE;
    let subjects = self
      .subjects_for_grade(grade)
      .into_iter()
      .map(|subject| {
        let page = SubjectPage {
          subject:   subject.clone(),
          name:      subject_name(subject, language),
          resources: self.resources_for(grade, &subject.id),
          videos:    self.videos_for(grade, &subject.id).to_vec(),
        };
        (subject.id.clone(), page)
      })
      .collect();
    Some(GradePage {
      grade: entry.clone(),
      labels: TypeLabels::for_language(language),
      subjects,
    })
  }

  /// Newest first by upload time, optionally limited to one grade. Records
  /// without a usable date sort as the epoch; ties keep feed order.
  pub fn recent_resources(&self, limit: usize, grade: Option<&str>) -> Vec<SharedRecord> {
    let mut recent: Vec<SharedRecord> = self
      .views
      .all_resources
      .iter()
      .filter(|r| grade.is_none_or(|g| r.grade == g))
      .cloned()
      .collect();
    recent.sort_by(|a, b| b.upload_timestamp().cmp(&a.upload_timestamp()));
    recent.truncate(limit);
    recent
  }

  pub fn stats(&self) -> CatalogStats {
    let mut stats = CatalogStats {
      total_grades: self.grades.len(),
      total_subjects: self.subjects.len(),
      ..CatalogStats::default()
    };

    for record in &self.views.all_resources {
      if matches!(record.kind, ResourceKind::Video) {
        stats.total_videos += 1;
      } else {
        stats.total_resources += 1;
      }

      let tags = if record.languages.is_empty() {
        std::slice::from_ref(&record.language)
      } else {
        record.languages.as_slice()
      };
      for tag in tags {
        *stats.language_breakdown.entry(tag.clone()).or_default() += 1;
      }
    }
    stats
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::{Value, json};
  use torch_core::{
    materialize::{MaterializeOptions, materialize},
    store::Document,
  };

  use super::*;
  use crate::state::SliceUpdate;

  fn doc(id: &str, v: Value) -> Document {
    Document::from_value(id, v).unwrap()
  }

  fn snapshot() -> CatalogSnapshot {
    let grades = vec![
      Grade::from_document(&doc("grade6", json!({ "display": "Grade 6" }))),
      Grade::from_document(&doc("grade7", json!({ "display": "Grade 7" }))),
    ];
    let subjects = vec![
      Subject::from_document(&doc("math", json!({ "grades": ["grade6", "grade7"] }))),
      Subject::from_document(&doc("science", json!({ "grades": ["grade7"],
                                                      "nameTamil": "அறிவியல்" }))),
      Subject::from_document(&doc("art", json!({ "grades": [] }))),
    ];
    let resources = [
      doc("t1", json!({ "grade": "grade6", "subject": "math", "resourceType": "textbook",
                        "languages": ["sinhala", "tamil"],
                        "uploadDate": "2024-02-01T00:00:00Z" })),
      doc("v1", json!({ "grade": "grade6", "subject": "math", "resourceType": "videos",
                        "languages": ["english"],
                        "uploadDate": "2024-03-01T00:00:00Z" })),
      doc("n1", json!({ "grade": "grade7", "subject": "science", "resourceType": "notes",
                        "uploadDate": "2024-01-01T00:00:00Z" })),
      doc("q1", json!({ "grade": "grade6", "subject": "math", "resourceType": "quiz" })),
    ];

    CatalogSnapshot::default()
      .apply(SliceUpdate::Grades(grades))
      .apply(SliceUpdate::Subjects(subjects))
      .apply(SliceUpdate::Resources(materialize(&resources, &MaterializeOptions::default())))
  }

  #[test]
  fn subjects_for_grade_follows_membership() {
    let s = snapshot();
    let ids: Vec<_> = s.subjects_for_grade("grade7").iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["math", "science"]);
    assert!(s.subjects_for_grade("grade9").is_empty());
  }

  #[test]
  fn unknown_pair_gets_default_buckets() {
    let r = snapshot().resources_for("grade9", "history");
    assert!(r.is_empty());
    assert_eq!(r.papers.terms.len(), 3);
    assert!(snapshot().videos_for("grade9", "history").is_empty());
  }

  #[test]
  fn grade_page_collects_offered_subjects() {
    let s = snapshot();
    let page = s.grade_page("grade6").unwrap();
    assert_eq!(page.grade.display, "Grade 6");
    assert_eq!(page.subjects.keys().collect::<Vec<_>>(), ["math"]);
    assert_eq!(page.subjects["math"].resources.len(), 1);
    assert_eq!(page.subjects["math"].videos.len(), 1);
    assert!(s.grade_page("grade9").is_none());
  }

  #[test]
  fn grade_page_for_language_filters_every_category() {
    let page = snapshot().grade_page("grade6").unwrap();
    let tamil = page.for_language(&LanguageSelection::parse("tamil"));
    assert_eq!(tamil.subjects["math"].resources.len(), 1);
    assert!(tamil.subjects["math"].videos.is_empty());

    let english = page.for_language(&LanguageSelection::parse("english"));
    assert!(english.subjects["math"].resources.is_empty());
    assert_eq!(english.subjects["math"].videos.len(), 1);
  }

  #[test]
  fn grade_page_labels_follow_the_selection() {
    let page = snapshot().grade_page("grade7").unwrap();
    assert_eq!(page.labels.papers, "Past Papers");
    assert_eq!(page.subjects["science"].name, "Science");
    assert_eq!(page.subjects["math"].name, "math");

    let sinhala = page.for_language(&LanguageSelection::parse("sinhala"));
    assert_eq!(sinhala.labels.textbooks, "පෙළපොත්");
    assert_eq!(sinhala.subjects["science"].name, "විද්‍යාව");

    let tamil = page.for_language(&LanguageSelection::parse("tamil"));
    assert_eq!(tamil.labels.notes, "சிறு குறிப்புகள்");
    assert_eq!(tamil.subjects["science"].name, "அறிவியல்");

    let all = page.for_language(&LanguageSelection::All);
    assert_eq!(all.labels.videos, "Videos");
  }

  #[test]
  fn recent_resources_newest_first_with_undated_last() {
    let s = snapshot();
    let ids: Vec<_> = s.recent_resources(10, None).iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, ["v1", "t1", "n1", "q1"]);

    let grade7: Vec<_> = s.recent_resources(10, Some("grade7")).iter().map(|r| r.id.clone()).collect();
    assert_eq!(grade7, ["n1"]);
    assert_eq!(s.recent_resources(2, None).len(), 2);
  }

  #[test]
  fn recent_resources_ties_keep_feed_order() {
    let docs = [
      doc("a", json!({ "grade": "g", "subject": "s", "resourceType": "notes" })),
      doc("b", json!({ "grade": "g", "subject": "s", "resourceType": "notes" })),
    ];
    let s = CatalogSnapshot {
      views: Arc::new(materialize(&docs, &MaterializeOptions::default())),
      ..CatalogSnapshot::default()
    };
    let ids: Vec<_> = s.recent_resources(5, None).iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, ["a", "b"]);
  }

  #[test]
  fn stats_count_every_language_tag() {
    let stats = snapshot().stats();
    assert_eq!(stats.total_grades, 2);
    assert_eq!(stats.total_subjects, 3);
    assert_eq!(stats.total_videos, 1);
    assert_eq!(stats.total_resources, 3);
    assert_eq!(stats.language_breakdown["sinhala"], 1);
    assert_eq!(stats.language_breakdown["tamil"], 1);
    assert_eq!(stats.language_breakdown["english"], 3);
  }
}
