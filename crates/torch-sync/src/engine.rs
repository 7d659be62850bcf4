//! [`SyncEngine`] — lifecycle and the consolidation loop.

use std::{
  collections::BTreeMap,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use torch_core::store::{ChangeFeedStore, Unsubscribe};

use crate::{
  config::CatalogConfig,
  feeds::{self, Inbox, Message},
  language::LanguageFilter,
  mutations::Mutations,
  state::{CatalogSnapshot, Slice},
};

/// A live, self-updating view of the catalog.
///
/// One engine is expected per process. It is passed to consumers explicitly
/// (usually behind an `Arc`) and torn down with [`SyncEngine::dispose`],
/// which also runs on drop.
pub struct SyncEngine<S: ChangeFeedStore> {
  config:    CatalogConfig,
  state:     watch::Receiver<Arc<CatalogSnapshot>>,
  inbox:     Inbox,
  handles:   BTreeMap<Slice, Unsubscribe>,
  language:  LanguageFilter,
  mutations: Mutations<S>,
  disposed:  AtomicBool,
}

impl<S: ChangeFeedStore> SyncEngine<S> {
  /// Open the four subscriptions and start consolidating. Must be called
  /// from within a Tokio runtime.
  pub fn init(store: Arc<S>, config: CatalogConfig) -> Self {
    let (state_tx, state) = watch::channel(Arc::new(CatalogSnapshot::default()));
    let (inbox, messages) = mpsc::unbounded_channel();

    tokio::spawn(consolidate(messages, state_tx));
    let handles = feeds::open(&store, &config, &inbox);
    info!(settings_document = %config.settings_document, "sync engine started");

    Self {
      language: LanguageFilter::new(config.languages.clone()),
      mutations: Mutations::new(store, config.settings_document.clone()),
      config,
      state,
      inbox,
      handles,
      disposed: AtomicBool::new(false),
    }
  }

  pub fn config(&self) -> &CatalogConfig { &self.config }

  /// The current snapshot.
  pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
    self.state.borrow().clone()
  }

  /// A receiver that observes every published snapshot.
  pub fn watch(&self) -> watch::Receiver<Arc<CatalogSnapshot>> {
    self.state.clone()
  }

  /// Wait until every slice has finished loading. Returns early with the
  /// last snapshot if the engine stops first.
  pub async fn ready(&self) -> Arc<CatalogSnapshot> {
    let mut rx = self.state.clone();
    if let Ok(snapshot) = rx.wait_for(|s| !s.is_loading()).await {
      return snapshot.clone();
    }
    rx.borrow().clone()
  }

  pub fn language(&self) -> &LanguageFilter { &self.language }

  pub fn mutations(&self) -> &Mutations<S> { &self.mutations }

  /// Stop listening to one feed. Its slice keeps the last applied value.
  pub fn unsubscribe(&self, slice: Slice) {
    if let Some(handle) = self.handles.get(&slice) {
      handle.unsubscribe();
    }
  }

  pub fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }

  /// Cancel all four subscriptions and stop the consolidation loop.
  /// Safe to call any number of times.
  pub fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    for handle in self.handles.values() {
      handle.unsubscribe();
    }
    // The loop may already be gone; nothing left to stop then.
    let _ = self.inbox.send(Message::Shutdown);
    info!("sync engine disposed");
  }
}

impl<S: ChangeFeedStore> Drop for SyncEngine<S> {
  fn drop(&mut self) {
    self.dispose();
  }
}

/// The only writer of the snapshot. Updates are applied one at a time and
/// each result is published with a single swap.
async fn consolidate(
  mut messages: mpsc::UnboundedReceiver<Message>,
  state: watch::Sender<Arc<CatalogSnapshot>>,
) {
  while let Some(message) = messages.recv().await {
    let update = match message {
      Message::Update(update) => update,
      Message::Shutdown => break,
    };
    let slice = update.slice();
    let next = state.borrow().apply(update);
    let revision = next.revision;
    state.send_replace(Arc::new(next));
    debug!(%slice, revision, "applied snapshot");
  }
  debug!("consolidation loop stopped");
}
