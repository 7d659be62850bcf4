//! [`SqliteStore`] — the SQLite implementation of [`ChangeFeedStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use torch_core::store::{
  ChangeFeedStore, CollectionQuery, Document, FeedEvent, Fields, MergePolicy,
  NewDocument, Subscription,
};

use crate::{
  Result,
  encode::{decode_document, decode_fields, encode_direction, encode_dt, encode_fields, json_path},
  feed::FeedRegistry,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A change-feed document store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and feed registry are
/// reference-counted and shared between clones.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  feeds: Arc<FeedRegistry>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, feeds: Arc::new(FeedRegistry::default()) })
  }

  /// Read a whole collection in query order. Ties (and unordered queries)
  /// fall back to the document id so snapshots are deterministic.
  pub async fn query_collection(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    let collection = query.collection.clone();
    let order = query
      .order_by
      .as_ref()
      .map(|o| (json_path(&o.field), encode_direction(o.direction)));

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let rows = match order {
          Some((path, direction)) => {
            let sql = format!(
              "SELECT doc_id, fields_json FROM documents
               WHERE collection = ?1
               ORDER BY json_extract(fields_json, ?2) {direction}, doc_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            stmt
              .query_map(rusqlite::params![collection, path], |row| {
                Ok((row.get(0)?, row.get(1)?))
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          None => {
            let mut stmt = conn.prepare(
              "SELECT doc_id, fields_json FROM documents
               WHERE collection = ?1 ORDER BY doc_id",
            )?;
            stmt
              .query_map(rusqlite::params![collection], |row| {
                Ok((row.get(0)?, row.get(1)?))
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
        };
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, json)| decode_document(id, &json))
      .collect()
  }

  /// Read a single document; `None` if it does not exist.
  pub async fn get_document(&self, collection: &str, doc_id: &str) -> Result<Option<Document>> {
    let collection = collection.to_owned();
    let id = doc_id.to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT fields_json FROM documents WHERE collection = ?1 AND doc_id = ?2",
              rusqlite::params![collection, id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|json| decode_document(doc_id.to_owned(), &json))
      .transpose()
  }

  /// Insert or replace a row. Does not notify subscribers.
  async fn upsert(&self, collection: &str, doc_id: &str, fields: &Fields) -> Result<()> {
    let collection = collection.to_owned();
    let id = doc_id.to_owned();
    let json = encode_fields(fields)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (collection, doc_id, fields_json) VALUES (?1, ?2, ?3)
           ON CONFLICT (collection, doc_id) DO UPDATE SET fields_json = excluded.fields_json",
          rusqlite::params![collection, id, json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Feed forwarders ─────────────────────────────────────────────────────────

/// Run a forwarder task: emit a snapshot now, then again after every change
/// to `collection`, until the consumer unsubscribes.
fn spawn_forwarder<T, F, Fut>(
  store: &SqliteStore,
  collection: &str,
  read: F,
) -> Subscription<T>
where
  T: Send + 'static,
  F: Fn(SqliteStore) -> Fut + Send + 'static,
  Fut: Future<Output = Result<T>> + Send,
{
  let (mut sink, subscription) = Subscription::channel();
  let mut version = store.feeds.watch(collection);
  let store = store.clone();
  let collection = collection.to_owned();

  tokio::spawn(async move {
    loop {
      // Mark the current version seen before reading, so a write that lands
      // mid-read triggers another snapshot.
      version.borrow_and_update();

      let event = match read(store.clone()).await {
        Ok(snapshot) => FeedEvent::Snapshot(snapshot),
        Err(e) => {
          warn!(%collection, error = %e, "snapshot read failed");
          FeedEvent::Error(torch_core::Error::Feed(e.to_string()))
        }
      };
      if !sink.emit(event) {
        break;
      }

      tokio::select! {
        changed = version.changed() => {
          if changed.is_err() {
            break;
          }
        }
        _ = sink.cancelled() => break,
      }
    }
    debug!(%collection, "feed forwarder stopped");
  });

  subscription
}

// ─── ChangeFeedStore impl ────────────────────────────────────────────────────

impl ChangeFeedStore for SqliteStore {
  type Error = crate::Error;

  fn subscribe(&self, query: CollectionQuery) -> Subscription<Vec<Document>> {
    let collection = query.collection.clone();
    spawn_forwarder(self, &collection, move |store| {
      let query = query.clone();
      async move { store.query_collection(&query).await }
    })
  }

  fn subscribe_document(
    &self,
    collection: &str,
    doc_id: &str,
  ) -> Subscription<Option<Document>> {
    let owned_collection = collection.to_owned();
    let doc_id = doc_id.to_owned();
    spawn_forwarder(self, collection, move |store| {
      let collection = owned_collection.clone();
      let doc_id = doc_id.clone();
      async move { store.get_document(&collection, &doc_id).await }
    })
  }

  async fn create_or_merge(
    &self,
    collection: &str,
    doc_id: &str,
    fields: Fields,
    policy: MergePolicy,
  ) -> Result<()> {
    let owned_collection = collection.to_owned();
    let id = doc_id.to_owned();

    // Read, merge and write inside one immediate transaction so concurrent
    // callers are serialised.
    let changed: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let existing: Option<String> = tx
          .query_row(
            "SELECT fields_json FROM documents WHERE collection = ?1 AND doc_id = ?2",
            rusqlite::params![owned_collection, id],
            |row| row.get(0),
          )
          .optional()?;

        let (mut merged, mut changed) = match existing {
          Some(json) => (
            decode_fields(&id, &json).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?,
            false,
          ),
          None => (Fields::new(), true),
        };
        changed |= policy.apply(&mut merged, fields);

        if changed {
          let json = encode_fields(&merged).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
          tx.execute(
            "INSERT INTO documents (collection, doc_id, fields_json) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, doc_id) DO UPDATE SET fields_json = excluded.fields_json",
            rusqlite::params![owned_collection, id, json],
          )?;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    if changed {
      self.feeds.bump(collection);
    }
    Ok(())
  }

  async fn add(&self, collection: &str, doc: NewDocument) -> Result<String> {
    let id = Uuid::new_v4().simple().to_string();
    let mut fields = doc.fields;
    if let Some(field) = doc.timestamp_field {
      fields.insert(field, Value::String(encode_dt(Utc::now())));
    }

    self.upsert(collection, &id, &fields).await?;
    self.feeds.bump(collection);
    Ok(id)
  }

  async fn set(&self, collection: &str, doc_id: &str, fields: Fields) -> Result<()> {
    self.upsert(collection, doc_id, &fields).await?;
    self.feeds.bump(collection);
    Ok(())
  }

  async fn delete(&self, collection: &str, doc_id: &str) -> Result<()> {
    let owned_collection = collection.to_owned();
    let id = doc_id.to_owned();

    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
          rusqlite::params![owned_collection, id],
        )?)
      })
      .await?;

    if deleted > 0 {
      self.feeds.bump(collection);
    }
    Ok(())
  }
}
