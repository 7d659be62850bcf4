//! The four change-feed subscriptions.
//!
//! Each subscription runs a pump task that turns store events into
//! [`SliceUpdate`]s and forwards them to the consolidation loop. Pumps never
//! touch the snapshot themselves.

use std::{cmp::Reverse, collections::BTreeMap, sync::Arc};

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use torch_core::{
  catalog::{Grade, Settings, Subject},
  materialize::{MaterializeOptions, materialize_records},
  store::{
    ChangeFeedStore, CollectionQuery, Direction, Document, FeedEvent, MergePolicy,
    Unsubscribe, collections,
  },
  resource::{ResourceRecord, wire},
};

use crate::{
  config::CatalogConfig,
  state::{Slice, SliceUpdate},
};

/// Messages consumed by the consolidation loop.
#[derive(Debug)]
pub(crate) enum Message {
  Update(SliceUpdate),
  Shutdown,
}

pub(crate) type Inbox = mpsc::UnboundedSender<Message>;

/// Open all four subscriptions and start their pumps. Returns the handle
/// that cancels each one.
pub(crate) fn open<S: ChangeFeedStore>(
  store: &Arc<S>,
  config: &CatalogConfig,
  inbox: &Inbox,
) -> BTreeMap<Slice, Unsubscribe> {
  let mut handles = BTreeMap::new();

  let grades = store.subscribe(CollectionQuery::all(collections::GRADES));
  handles.insert(Slice::Grades, grades.unsubscribe);
  tokio::spawn(pump(grades.events, inbox.clone(), Slice::Grades, |docs| {
    SliceUpdate::Grades(docs.iter().map(Grade::from_document).collect())
  }));

  let subjects = store.subscribe(CollectionQuery::all(collections::SUBJECTS));
  handles.insert(Slice::Subjects, subjects.unsubscribe);
  tokio::spawn(pump(subjects.events, inbox.clone(), Slice::Subjects, |docs| {
    SliceUpdate::Subjects(docs.iter().map(Subject::from_document).collect())
  }));

  let resources = store.subscribe(CollectionQuery::ordered(
    collections::RESOURCES,
    wire::UPLOAD_DATE,
    Direction::Descending,
  ));
  handles.insert(Slice::Resources, resources.unsubscribe);
  let options: MaterializeOptions = config.materialize_options();
  tokio::spawn(pump(resources.events, inbox.clone(), Slice::Resources, move |docs| {
    SliceUpdate::Resources(materialize_records(newest_first(&docs, &options)))
  }));

  let settings = store.subscribe_document(collections::SETTINGS, &config.settings_document);
  handles.insert(Slice::Settings, settings.unsubscribe);
  tokio::spawn(settings_pump(
    store.clone(),
    config.settings_document.clone(),
    settings.events,
    inbox.clone(),
  ));

  handles
}

/// Decode a resources snapshot and order it by parsed upload time, newest
/// first. The store orders by the raw field, which misplaces offset
/// timestamps and unparseable values; those count as the epoch here. Ties
/// keep feed order.
fn newest_first(docs: &[Document], options: &MaterializeOptions) -> Vec<ResourceRecord> {
  let mut records: Vec<ResourceRecord> = docs
    .iter()
    .map(|doc| ResourceRecord::from_document(doc, &options.default_language))
    .collect();
  records.sort_by_key(|r| Reverse(r.upload_timestamp()));
  records
}

/// Forward a collection feed until it closes or the engine stops listening.
async fn pump<F>(
  mut events: mpsc::UnboundedReceiver<FeedEvent<Vec<Document>>>,
  inbox: Inbox,
  slice: Slice,
  translate: F,
) where
  F: Fn(Vec<Document>) -> SliceUpdate + Send + 'static,
{
  while let Some(event) = events.recv().await {
    let update = match event {
      FeedEvent::Snapshot(docs) => translate(docs),
      FeedEvent::Error(e) => {
        warn!(%slice, error = %e, "feed error, falling back to empty");
        SliceUpdate::Failed(slice, e.to_string())
      }
    };
    if inbox.send(Message::Update(update)).is_err() {
      break;
    }
  }
  info!(%slice, "feed closed");
}

/// The settings feed. If the document is missing on the first snapshot it is
/// created with empty defaults, and the slice waits for the snapshot that
/// write produces instead of filling in defaults locally.
async fn settings_pump<S: ChangeFeedStore>(
  store: Arc<S>,
  document: String,
  mut events: mpsc::UnboundedReceiver<FeedEvent<Option<Document>>>,
  inbox: Inbox,
) {
  let mut seen = false;

  while let Some(event) = events.recv().await {
    let update = match event {
      FeedEvent::Snapshot(Some(doc)) => {
        seen = true;
        SliceUpdate::Settings(Settings::from_document(&doc))
      }
      FeedEvent::Snapshot(None) if !seen => {
        seen = true;
        info!(%document, "settings document missing, creating defaults");
        let created = store
          .create_or_merge(
            collections::SETTINGS,
            &document,
            Settings::bootstrap_fields(),
            MergePolicy::PreferExisting,
          )
          .await;
        match created {
          Ok(()) => continue,
          Err(e) => {
            error!(%document, error = %e, "failed to create settings document");
            SliceUpdate::Failed(Slice::Settings, format!("settings bootstrap failed: {e}"))
          }
        }
      }
      FeedEvent::Snapshot(None) => {
        warn!(%document, "settings document disappeared, using defaults");
        SliceUpdate::Settings(Settings::default())
      }
      FeedEvent::Error(e) => {
        warn!(slice = %Slice::Settings, error = %e, "feed error, falling back to empty");
        SliceUpdate::Failed(Slice::Settings, e.to_string())
      }
    };
    if inbox.send(Message::Update(update)).is_err() {
      break;
    }
  }
  info!(slice = %Slice::Settings, "feed closed");
}
