//! The catalog snapshot and the pure transition that advances it.
//!
//! A [`CatalogSnapshot`] is immutable once published. Every incoming feed
//! event becomes one [`SliceUpdate`], and [`CatalogSnapshot::apply`] derives
//! the next snapshot from the current one. Nothing else mutates state.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::Serialize;
use torch_core::{
  catalog::{Grade, Settings, Subject},
  materialize::MaterializedViews,
};

// ─── Slices ──────────────────────────────────────────────────────────────────

/// One independently fed part of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slice {
  Grades,
  Subjects,
  Resources,
  Settings,
}

impl Slice {
  pub const ALL: [Slice; 4] =
    [Slice::Grades, Slice::Subjects, Slice::Resources, Slice::Settings];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Grades => "grades",
      Self::Subjects => "subjects",
      Self::Resources => "resources",
      Self::Settings => "settings",
    }
  }
}

impl fmt::Display for Slice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-slice loading state. A slice stops loading once its first snapshot
/// (or its first error) has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadingFlags {
  pub grades:    bool,
  pub subjects:  bool,
  pub resources: bool,
  pub settings:  bool,
}

impl Default for LoadingFlags {
  fn default() -> Self {
    Self { grades: true, subjects: true, resources: true, settings: true }
  }
}

impl LoadingFlags {
  pub fn get(&self, slice: Slice) -> bool {
    match slice {
      Slice::Grades => self.grades,
      Slice::Subjects => self.subjects,
      Slice::Resources => self.resources,
      Slice::Settings => self.settings,
    }
  }

  fn finish(&mut self, slice: Slice) {
    match slice {
      Slice::Grades => self.grades = false,
      Slice::Subjects => self.subjects = false,
      Slice::Resources => self.resources = false,
      Slice::Settings => self.settings = false,
    }
  }

  pub fn any(&self) -> bool {
    Slice::ALL.iter().any(|s| self.get(*s))
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything a reader sees, taken from one consistent point in time.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
  pub grades:   BTreeMap<String, Grade>,
  pub subjects: BTreeMap<String, Subject>,
  /// `resources`, `videos` and `allResources`, always from one feed event.
  #[serde(flatten)]
  pub views:    Arc<MaterializedViews>,
  pub settings: Settings,
  pub loading:  LoadingFlags,
  /// The last feed error per slice; cleared by that slice's next snapshot.
  pub errors:   BTreeMap<Slice, String>,
  /// Incremented on every applied update.
  pub revision: u64,
}

/// A whole-slice replacement derived from one feed event.
#[derive(Debug, Clone)]
pub enum SliceUpdate {
  Grades(Vec<Grade>),
  Subjects(Vec<Subject>),
  Resources(MaterializedViews),
  Settings(Settings),
  /// The feed for a slice failed; the slice falls back to its empty default.
  Failed(Slice, String),
}

impl SliceUpdate {
  pub fn slice(&self) -> Slice {
    match self {
      Self::Grades(_) => Slice::Grades,
      Self::Subjects(_) => Slice::Subjects,
      Self::Resources(_) => Slice::Resources,
      Self::Settings(_) => Slice::Settings,
      Self::Failed(slice, _) => *slice,
    }
  }
}

impl CatalogSnapshot {
  pub fn is_loading(&self) -> bool { self.loading.any() }

  /// The snapshot that follows `self` once `update` is applied.
  pub fn apply(&self, update: SliceUpdate) -> Self {
    let mut next = self.clone();
    let slice = update.slice();

    let error = match update {
      SliceUpdate::Grades(grades) => {
        next.grades = grades.into_iter().map(|g| (g.id.clone(), g)).collect();
        None
      }
      SliceUpdate::Subjects(subjects) => {
        next.subjects = subjects.into_iter().map(|s| (s.id.clone(), s)).collect();
        None
      }
      SliceUpdate::Resources(views) => {
        next.views = Arc::new(views);
        None
      }
      SliceUpdate::Settings(settings) => {
        next.settings = settings;
        None
      }
      SliceUpdate::Failed(_, message) => {
        next.reset(slice);
        Some(message)
      }
    };

    match error {
      Some(message) => {
        next.errors.insert(slice, message);
      }
      None => {
        next.errors.remove(&slice);
      }
    }
    next.loading.finish(slice);
    next.revision += 1;
    next
  }

  fn reset(&mut self, slice: Slice) {
    match slice {
      Slice::Grades => self.grades.clear(),
      Slice::Subjects => self.subjects.clear(),
      Slice::Resources => self.views = Arc::default(),
      Slice::Settings => self.settings = Settings::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use torch_core::{
    materialize::{MaterializeOptions, materialize},
    store::Document,
  };
  use serde_json::json;

  use super::*;

  fn grade(id: &str) -> Grade {
    Grade::from_document(&Document::from_value(id, json!({ "display": id })).unwrap())
  }

  #[test]
  fn starts_loading_everything() {
    let s = CatalogSnapshot::default();
    assert!(s.is_loading());
    assert!(Slice::ALL.iter().all(|slice| s.loading.get(*slice)));
  }

  #[test]
  fn each_slice_finishes_loading_independently() {
    let s = CatalogSnapshot::default()
      .apply(SliceUpdate::Grades(vec![grade("grade6")]))
      .apply(SliceUpdate::Failed(Slice::Subjects, "denied".into()));
    assert!(!s.loading.grades);
    assert!(!s.loading.subjects);
    assert!(s.loading.resources);
    assert!(s.is_loading());

    let s = s
      .apply(SliceUpdate::Resources(MaterializedViews::default()))
      .apply(SliceUpdate::Settings(Settings::default()));
    assert!(!s.is_loading());
    assert_eq!(s.revision, 4);
  }

  #[test]
  fn failure_empties_the_slice_and_records_the_error() {
    let s = CatalogSnapshot::default()
      .apply(SliceUpdate::Grades(vec![grade("grade6")]))
      .apply(SliceUpdate::Failed(Slice::Grades, "offline".into()));
    assert!(s.grades.is_empty());
    assert_eq!(s.errors[&Slice::Grades], "offline");
  }

  #[test]
  fn next_snapshot_clears_the_error() {
    let s = CatalogSnapshot::default()
      .apply(SliceUpdate::Failed(Slice::Grades, "offline".into()))
      .apply(SliceUpdate::Grades(vec![grade("grade7")]));
    assert!(s.errors.is_empty());
    assert!(s.grades.contains_key("grade7"));
  }

  #[test]
  fn repeated_failure_keeps_the_latest_message() {
    let s = CatalogSnapshot::default()
      .apply(SliceUpdate::Failed(Slice::Settings, "first".into()))
      .apply(SliceUpdate::Failed(Slice::Settings, "second".into()));
    assert_eq!(s.errors[&Slice::Settings], "second");
  }

  #[test]
  fn resource_views_are_replaced_wholesale() {
    let docs = [Document::from_value(
      "r1",
      json!({ "grade": "g", "subject": "s", "resourceType": "videos" }),
    )
    .unwrap()];
    let s = CatalogSnapshot::default()
      .apply(SliceUpdate::Resources(materialize(&docs, &MaterializeOptions::default())));
    assert_eq!(s.views.all_resources.len(), 1);
    assert_eq!(s.views.videos_for("g", "s").len(), 1);

    let s = s.apply(SliceUpdate::Resources(materialize(&[], &MaterializeOptions::default())));
    assert!(s.views.all_resources.is_empty());
    assert!(s.views.videos.is_empty());
  }

  #[test]
  fn serialises_views_at_top_level() {
    let out = serde_json::to_value(CatalogSnapshot::default()).unwrap();
    assert!(out.get("allResources").is_some());
    assert!(out.get("resources").is_some());
    assert!(out.get("videos").is_some());
    assert_eq!(out["loading"]["grades"], true);
  }
}
