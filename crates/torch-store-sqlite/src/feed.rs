//! Per-collection change counters.
//!
//! Each collection has a `watch` channel carrying a version number. Writers
//! bump it after commit; subscription forwarders wait on it and re-query.
//! Bumps that land while a forwarder is busy coalesce into one re-query.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use tokio::sync::watch;

#[derive(Debug, Default)]
pub struct FeedRegistry {
  versions: Mutex<HashMap<String, watch::Sender<u64>>>,
}

impl FeedRegistry {
  /// A receiver for `collection`'s version counter, creating it on demand.
  pub fn watch(&self, collection: &str) -> watch::Receiver<u64> {
    let mut versions = self.versions.lock().unwrap_or_else(PoisonError::into_inner);
    versions
      .entry(collection.to_owned())
      .or_insert_with(|| watch::channel(0).0)
      .subscribe()
  }

  /// Signal that `collection` changed.
  pub fn bump(&self, collection: &str) {
    let versions = self.versions.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(tx) = versions.get(collection) {
      tx.send_modify(|v| *v += 1);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn bump_wakes_watchers_of_that_collection_only() {
    let feeds = FeedRegistry::default();
    let mut grades = feeds.watch("grades");
    let mut subjects = feeds.watch("subjects");

    feeds.bump("grades");
    assert!(grades.has_changed().unwrap());
    assert!(!subjects.has_changed().unwrap());
    grades.borrow_and_update();
    subjects.borrow_and_update();
    assert!(!grades.has_changed().unwrap());
  }

  #[test]
  fn bump_without_watchers_is_a_no_op() {
    FeedRegistry::default().bump("nobody");
  }
}
