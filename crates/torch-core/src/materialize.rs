//! The view materializer.
//!
//! Turns the flat resource collection into the nested, query-ready views the
//! catalog pages read. Materialization is a pure function of its input: it
//! holds no state between calls and always derives every view from the same
//! list, so the flat listing and the nested maps can never disagree.

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;

use crate::{
  resource::{PaperMeta, PaperType, ResourceKind, ResourceRecord, TERM_KEYS},
  store::Document,
};

/// Fallback primary language for records without any language tag.
pub const DEFAULT_LANGUAGE: &str = "english";

/// Records are shared between the flat list and the nested buckets.
pub type SharedRecord = Arc<ResourceRecord>;

/// `grade id → subject id → T`.
pub type GradeSubjectMap<T> = BTreeMap<String, BTreeMap<String, T>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOptions {
  pub default_language: String,
}

impl Default for MaterializeOptions {
  fn default() -> Self {
    Self { default_language: DEFAULT_LANGUAGE.to_owned() }
  }
}

// ─── Buckets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperBuckets {
  /// Always holds `term1`..`term3`; unexpected term keys are added on demand.
  pub terms:    BTreeMap<String, Vec<SharedRecord>>,
  pub chapters: BTreeMap<String, Vec<SharedRecord>>,
}

impl Default for PaperBuckets {
  fn default() -> Self {
    Self {
      terms:    TERM_KEYS.iter().map(|k| ((*k).to_owned(), Vec::new())).collect(),
      chapters: BTreeMap::new(),
    }
  }
}

/// Everything filed under one `(grade, subject)` pair, videos aside.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubjectResources {
  /// Keyed by primary language; same-language textbooks accumulate.
  pub textbooks: BTreeMap<String, Vec<SharedRecord>>,
  pub papers:    PaperBuckets,
  /// Keyed by record id.
  pub notes:     BTreeMap<String, SharedRecord>,
}

impl SubjectResources {
  pub fn len(&self) -> usize {
    let textbooks: usize = self.textbooks.values().map(Vec::len).sum();
    let terms: usize = self.papers.terms.values().map(Vec::len).sum();
    let chapters: usize = self.papers.chapters.values().map(Vec::len).sum();
    textbooks + terms + chapters + self.notes.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// A copy keeping only records for which `keep` holds. Bucket keys (and the
  /// three default terms) survive even when emptied.
  pub fn filtered(&self, keep: impl Fn(&ResourceRecord) -> bool) -> Self {
    let filter_lists = |map: &BTreeMap<String, Vec<SharedRecord>>| -> BTreeMap<String, Vec<SharedRecord>> {
      map
        .iter()
        .map(|(k, list)| {
          let kept: Vec<SharedRecord> = list.iter().filter(|r| keep(r)).cloned().collect();
          (k.clone(), kept)
        })
        .collect()
    };
    Self {
      textbooks: filter_lists(&self.textbooks),
      papers:    PaperBuckets {
        terms:    filter_lists(&self.papers.terms),
        chapters: filter_lists(&self.papers.chapters),
      },
      notes:     self
        .notes
        .iter()
        .filter(|(_, r)| keep(r))
        .map(|(k, r)| (k.clone(), r.clone()))
        .collect(),
    }
  }
}

// ─── Materialized views ──────────────────────────────────────────────────────

/// The full set of derived views over one resource snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedViews {
  pub resources:     GradeSubjectMap<SubjectResources>,
  pub videos:        GradeSubjectMap<Vec<SharedRecord>>,
  /// Every record in input order, placed or not.
  pub all_resources: Vec<SharedRecord>,
}

impl MaterializedViews {
  pub fn resources_for(&self, grade: &str, subject: &str) -> Option<&SubjectResources> {
    self.resources.get(grade)?.get(subject)
  }

  pub fn videos_for(&self, grade: &str, subject: &str) -> &[SharedRecord] {
    self
      .videos
      .get(grade)
      .and_then(|by_subject| by_subject.get(subject))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Number of records filed into any nested bucket.
  pub fn bucketed_count(&self) -> usize {
    let resources: usize = self
      .resources
      .values()
      .flat_map(BTreeMap::values)
      .map(SubjectResources::len)
      .sum();
    let videos: usize = self
      .videos
      .values()
      .flat_map(BTreeMap::values)
      .map(Vec::len)
      .sum();
    resources + videos
  }

  /// Records kept in the flat list only.
  pub fn excluded(&self) -> impl Iterator<Item = &SharedRecord> {
    self.all_resources.iter().filter(|r| !r.kind.is_recognized())
  }
}

/// Decode and materialize a resource snapshot, in feed order.
pub fn materialize(docs: &[Document], options: &MaterializeOptions) -> MaterializedViews {
  materialize_records(
    docs
      .iter()
      .map(|doc| ResourceRecord::from_document(doc, &options.default_language)),
  )
}

/// Materialize already-decoded records, in input order.
pub fn materialize_records(
  records: impl IntoIterator<Item = ResourceRecord>,
) -> MaterializedViews {
  let mut views = MaterializedViews::default();

  for record in records {
    let record = Arc::new(record);
    views.all_resources.push(record.clone());

    // Without a placement there is no pair to file under.
    if record.grade.is_empty() || record.subject.is_empty() {
      continue;
    }

    let bucket = views
      .resources
      .entry(record.grade.clone())
      .or_default()
      .entry(record.subject.clone())
      .or_default();
    let videos = views
      .videos
      .entry(record.grade.clone())
      .or_default()
      .entry(record.subject.clone())
      .or_default();

    match &record.kind {
      ResourceKind::Textbook => {
        bucket
          .textbooks
          .entry(record.language.clone())
          .or_default()
          .push(record.clone());
      }
      ResourceKind::Paper(PaperMeta { paper_type, category, .. }) => {
        let target = match paper_type {
          PaperType::Term => &mut bucket.papers.terms,
          PaperType::Chapter => &mut bucket.papers.chapters,
        };
        target.entry(category.clone()).or_default().push(record.clone());
      }
      ResourceKind::Video => videos.push(record.clone()),
      ResourceKind::Note => {
        bucket.notes.insert(record.id.clone(), record.clone());
      }
      ResourceKind::Unrecognized { .. } => {}
    }
  }

  views
}
