//! The `ChangeFeedStore` trait and the subscription plumbing around it.
//!
//! The trait is implemented by storage backends (e.g. `torch-store-sqlite`).
//! The sync engine depends on this abstraction, not on any concrete backend.
//!
//! A subscription never delivers deltas: every [`FeedEvent::Snapshot`] carries
//! the full current state of the collection (or document) it watches.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::{Error, Result};

/// Well-known collection names.
pub mod collections {
  pub const GRADES: &str = "grades";
  pub const SUBJECTS: &str = "subjects";
  pub const RESOURCES: &str = "resources";
  pub const SETTINGS: &str = "settings";
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// The field map of a stored document. Unknown fields are carried untouched.
pub type Fields = serde_json::Map<String, Value>;

/// A single stored document: a store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub id:     String,
  pub fields: Fields,
}

impl Document {
  pub fn new(id: impl Into<String>, fields: Fields) -> Self {
    Self { id: id.into(), fields }
  }

  /// Build a document from an arbitrary JSON value, which must be an object.
  pub fn from_value(id: impl Into<String>, value: Value) -> Result<Self> {
    let id = id.into();
    match value {
      Value::Object(fields) => Ok(Self { id, fields }),
      _ => Err(Error::NotAnObject(id)),
    }
  }

  /// A string field, if present and actually a string.
  pub fn str_field(&self, key: &str) -> Option<&str> {
    self.fields.get(key).and_then(Value::as_str)
  }
}

/// Input to [`ChangeFeedStore::add`].
///
/// When `timestamp_field` is set the store writes its own RFC 3339 clock
/// reading under that key, replacing anything the caller supplied.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
  pub fields:          Fields,
  pub timestamp_field: Option<String>,
}

impl NewDocument {
  pub fn new(fields: Fields) -> Self {
    Self { fields, timestamp_field: None }
  }

  pub fn stamped(fields: Fields, timestamp_field: impl Into<String>) -> Self {
    Self { fields, timestamp_field: Some(timestamp_field.into()) }
  }
}

/// How [`ChangeFeedStore::create_or_merge`] combines incoming fields with an
/// existing document. Both policies create the document if it is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
  /// Incoming fields overwrite stored fields of the same name.
  PreferIncoming,
  /// Only fields missing from the stored document are filled in.
  PreferExisting,
}

impl MergePolicy {
  /// Merge `incoming` into `existing`. Returns `true` if anything changed.
  pub fn apply(self, existing: &mut Fields, incoming: Fields) -> bool {
    let mut changed = false;
    for (key, value) in incoming {
      match self {
        Self::PreferIncoming => {
          if existing.get(&key) != Some(&value) {
            existing.insert(key, value);
            changed = true;
          }
        }
        Self::PreferExisting => {
          if !existing.contains_key(&key) {
            existing.insert(key, value);
            changed = true;
          }
        }
      }
    }
    changed
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
  pub field:     String,
  pub direction: Direction,
}

/// Parameters for [`ChangeFeedStore::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
  pub collection: String,
  pub order_by:   Option<OrderBy>,
}

impl CollectionQuery {
  pub fn all(collection: impl Into<String>) -> Self {
    Self { collection: collection.into(), order_by: None }
  }

  pub fn ordered(
    collection: impl Into<String>,
    field: impl Into<String>,
    direction: Direction,
  ) -> Self {
    Self {
      collection: collection.into(),
      order_by:   Some(OrderBy { field: field.into(), direction }),
    }
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// One event delivered by a live subscription.
#[derive(Debug)]
pub enum FeedEvent<T> {
  /// The complete current state.
  Snapshot(T),
  /// The store could not produce a snapshot. The subscription stays open.
  Error(Error),
}

/// Cancels a subscription. Cloneable and idempotent; once every clone is
/// dropped the subscription is cancelled as well.
#[derive(Debug, Clone)]
pub struct Unsubscribe(Arc<watch::Sender<bool>>);

impl Unsubscribe {
  pub fn unsubscribe(&self) {
    self.0.send_replace(true);
  }

  pub fn is_unsubscribed(&self) -> bool {
    *self.0.borrow()
  }
}

/// The consumer half of a live subscription.
#[derive(Debug)]
pub struct Subscription<T> {
  pub events:      mpsc::UnboundedReceiver<FeedEvent<T>>,
  pub unsubscribe: Unsubscribe,
}

impl<T> Subscription<T> {
  /// Create a connected producer/consumer pair. Store backends keep the sink
  /// and hand the subscription to the caller.
  pub fn channel() -> (SubscriptionSink<T>, Self) {
    let (events_tx, events) = mpsc::unbounded_channel();
    let (cancel_tx, cancel) = watch::channel(false);
    let sink = SubscriptionSink { events: events_tx, cancel };
    let subscription = Self {
      events,
      unsubscribe: Unsubscribe(Arc::new(cancel_tx)),
    };
    (sink, subscription)
  }
}

/// The producer half of a live subscription.
#[derive(Debug)]
pub struct SubscriptionSink<T> {
  events: mpsc::UnboundedSender<FeedEvent<T>>,
  cancel: watch::Receiver<bool>,
}

impl<T> SubscriptionSink<T> {
  /// Deliver an event. Returns `false` once the consumer has gone away or
  /// unsubscribed, in which case the producer should stop.
  pub fn emit(&self, event: FeedEvent<T>) -> bool {
    if self.is_cancelled() {
      return false;
    }
    self.events.send(event).is_ok()
  }

  pub fn is_cancelled(&self) -> bool {
    // A dropped `Unsubscribe` reads as cancelled too.
    self.events.is_closed()
      || self.cancel.has_changed().is_err()
      || *self.cancel.borrow()
  }

  /// Resolves once the consumer unsubscribes or drops its receiver.
  pub async fn cancelled(&mut self) {
    let cancel = &mut self.cancel;
    tokio::select! {
      _ = async { cancel.wait_for(|cancelled| *cancelled).await.is_ok() } => {}
      _ = self.events.closed() => {}
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a live document store with change feeds.
///
/// Writes resolve on store acknowledgement. Their visible effect reaches
/// readers only through the next snapshot of any subscription watching the
/// written collection.
pub trait ChangeFeedStore: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Watch a whole collection. The first snapshot is delivered as soon as
  /// the store has read the collection.
  fn subscribe(&self, query: CollectionQuery) -> Subscription<Vec<Document>>;

  /// Watch a single document, which may not exist (`None`).
  fn subscribe_document(
    &self,
    collection: &str,
    doc_id: &str,
  ) -> Subscription<Option<Document>>;

  /// Create the document if missing, otherwise merge `fields` into it
  /// according to `policy`. Atomic with respect to other writers.
  fn create_or_merge(
    &self,
    collection: &str,
    doc_id: &str,
    fields: Fields,
    policy: MergePolicy,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Insert a new document under a store-assigned id and return that id.
  fn add(
    &self,
    collection: &str,
    doc: NewDocument,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send;

  /// Create or fully replace a document under a caller-chosen id.
  fn set(
    &self,
    collection: &str,
    doc_id: &str,
    fields: Fields,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Delete a document. Deleting a missing document succeeds.
  fn delete(
    &self,
    collection: &str,
    doc_id: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
