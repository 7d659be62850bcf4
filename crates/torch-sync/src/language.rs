//! The engine-wide language selection.
//!
//! Selection is a projection over already-materialized views: changing it
//! never reopens a subscription or re-runs the materializer.

use tokio::sync::watch;
use torch_core::{
  language::{LanguageOption, LanguageSelection},
  materialize::{SharedRecord, SubjectResources},
  resource::ResourceRecord,
};

#[derive(Debug)]
pub struct LanguageFilter {
  selection: watch::Sender<LanguageSelection>,
  available: Vec<LanguageOption>,
}

impl LanguageFilter {
  /// A filter selecting every language.
  pub fn new(available: Vec<LanguageOption>) -> Self {
    Self { selection: watch::channel(LanguageSelection::All).0, available }
  }

  /// Change the selection. Takes effect immediately for every reader.
  pub fn select(&self, selection: LanguageSelection) {
    self.selection.send_replace(selection);
  }

  pub fn current(&self) -> LanguageSelection { self.selection.borrow().clone() }

  /// Whether a resource tagged `tag` is visible under the current selection.
  pub fn should_show_resource(&self, tag: &str) -> bool {
    self.selection.borrow().admits(tag)
  }

  /// Observe selection changes.
  pub fn subscribe(&self) -> watch::Receiver<LanguageSelection> {
    self.selection.subscribe()
  }

  pub fn available_languages(&self) -> &[LanguageOption] { &self.available }

  /// Whether `key` names one of the offered languages, or the "all" sentinel.
  pub fn is_offered(&self, selection: &LanguageSelection) -> bool {
    match selection {
      LanguageSelection::All => true,
      LanguageSelection::Only(key) => self.available.iter().any(|l| &l.key == key),
    }
  }
}

/// A record is visible if any of its tags is admitted. Untagged records are
/// judged by their fallback primary language.
pub fn shows_record(selection: &LanguageSelection, record: &ResourceRecord) -> bool {
  if record.languages.is_empty() {
    selection.admits(&record.language)
  } else {
    record.languages.iter().any(|tag| selection.admits(tag))
  }
}

/// The visible subset of one subject's buckets.
pub fn filter_resources(
  selection: &LanguageSelection,
  resources: &SubjectResources,
) -> SubjectResources {
  match selection {
    LanguageSelection::All => resources.clone(),
    _ => resources.filtered(|r| shows_record(selection, r)),
  }
}

/// The visible subset of a record list, order kept.
pub fn filter_records(selection: &LanguageSelection, records: &[SharedRecord]) -> Vec<SharedRecord> {
  records
    .iter()
    .filter(|r| shows_record(selection, r))
    .cloned()
    .collect()
}
