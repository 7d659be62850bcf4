//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};
use torch_core::store::{
  ChangeFeedStore, CollectionQuery, Direction, Document, FeedEvent, Fields,
  MergePolicy, NewDocument,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fields(v: Value) -> Fields {
  match v {
    Value::Object(m) => m,
    other => panic!("not an object: {other}"),
  }
}

async fn next<T>(rx: &mut UnboundedReceiver<FeedEvent<T>>) -> T {
  match timeout(Duration::from_secs(5), rx.recv()).await {
    Ok(Some(FeedEvent::Snapshot(s))) => s,
    Ok(Some(FeedEvent::Error(e))) => panic!("feed error: {e}"),
    Ok(None) => panic!("feed closed"),
    Err(_) => panic!("timed out waiting for snapshot"),
  }
}

fn ids(docs: &[Document]) -> Vec<&str> {
  docs.iter().map(|d| d.id.as_str()).collect()
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_assigns_id_and_timestamp() {
  let s = store().await;
  let id = s
    .add(
      "resources",
      NewDocument::stamped(fields(json!({ "uploadDate": "caller-supplied" })), "uploadDate"),
    )
    .await
    .unwrap();

  let doc = s.get_document("resources", &id).await.unwrap().unwrap();
  let stamp = doc.str_field("uploadDate").unwrap();
  assert_ne!(stamp, "caller-supplied");
  assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
}

#[tokio::test]
async fn set_replaces_whole_document() {
  let s = store().await;
  s.set("grades", "grade6", fields(json!({ "display": "Grade 6", "old": 1 })))
    .await
    .unwrap();
  s.set("grades", "grade6", fields(json!({ "display": "Grade Six" })))
    .await
    .unwrap();

  let doc = s.get_document("grades", "grade6").await.unwrap().unwrap();
  assert_eq!(doc.fields, fields(json!({ "display": "Grade Six" })));
}

#[tokio::test]
async fn delete_missing_document_succeeds() {
  let s = store().await;
  s.delete("grades", "nope").await.unwrap();
}

#[tokio::test]
async fn merge_prefer_existing_is_idempotent_bootstrap() {
  let s = store().await;
  let defaults = fields(json!({ "email": "", "phone": "" }));

  s.create_or_merge("settings", "general", defaults.clone(), MergePolicy::PreferExisting)
    .await
    .unwrap();
  s.create_or_merge("settings", "general", fields(json!({ "email": "a@b.c" })), MergePolicy::PreferIncoming)
    .await
    .unwrap();
  s.create_or_merge("settings", "general", defaults, MergePolicy::PreferExisting)
    .await
    .unwrap();

  let doc = s.get_document("settings", "general").await.unwrap().unwrap();
  assert_eq!(doc.fields, fields(json!({ "email": "a@b.c", "phone": "" })));
}

#[tokio::test]
async fn concurrent_bootstraps_converge() {
  let s = store().await;
  let defaults = fields(json!({ "whatsapp": "", "email": "", "phone": "", "facebook": "" }));

  let (a, b) = tokio::join!(
    s.create_or_merge("settings", "general", defaults.clone(), MergePolicy::PreferExisting),
    s.create_or_merge("settings", "general", defaults.clone(), MergePolicy::PreferExisting),
  );
  a.unwrap();
  b.unwrap();

  let all = s.query_collection(&CollectionQuery::all("settings")).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].fields, defaults);
}

#[tokio::test]
async fn unknown_fields_pass_through() {
  let s = store().await;
  let id = s
    .add("resources", NewDocument::new(fields(json!({ "nested": { "a": [1, 2] } }))))
    .await
    .unwrap();
  let doc = s.get_document("resources", &id).await.unwrap().unwrap();
  assert_eq!(doc.fields["nested"], json!({ "a": [1, 2] }));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ordered_query_sorts_descending_with_missing_last() {
  let s = store().await;
  s.set("resources", "old", fields(json!({ "uploadDate": "2023-01-01T00:00:00+00:00" })))
    .await
    .unwrap();
  s.set("resources", "new", fields(json!({ "uploadDate": "2024-01-01T00:00:00+00:00" })))
    .await
    .unwrap();
  s.set("resources", "undated", fields(json!({}))).await.unwrap();

  let docs = s
    .query_collection(&CollectionQuery::ordered("resources", "uploadDate", Direction::Descending))
    .await
    .unwrap();
  assert_eq!(ids(&docs), ["new", "old", "undated"]);
}

// ─── Feeds ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn subscription_delivers_initial_then_full_snapshots() {
  let s = store().await;
  s.set("grades", "grade6", fields(json!({}))).await.unwrap();

  let mut sub = s.subscribe(CollectionQuery::all("grades"));
  assert_eq!(ids(&next(&mut sub.events).await), ["grade6"]);

  s.set("grades", "grade7", fields(json!({}))).await.unwrap();
  assert_eq!(ids(&next(&mut sub.events).await), ["grade6", "grade7"]);

  s.delete("grades", "grade6").await.unwrap();
  assert_eq!(ids(&next(&mut sub.events).await), ["grade7"]);
}

#[tokio::test]
async fn writes_to_other_collections_do_not_wake_a_feed() {
  let s = store().await;
  let mut sub = s.subscribe(CollectionQuery::all("grades"));
  assert!(next(&mut sub.events).await.is_empty());

  s.set("subjects", "math", fields(json!({}))).await.unwrap();
  let woke = timeout(Duration::from_millis(100), sub.events.recv()).await;
  assert!(woke.is_err(), "grades feed should stay quiet");
}

#[tokio::test]
async fn document_subscription_sees_creation() {
  let s = store().await;
  let mut sub = s.subscribe_document("settings", "general");
  assert!(next(&mut sub.events).await.is_none());

  s.create_or_merge("settings", "general", fields(json!({ "email": "" })), MergePolicy::PreferExisting)
    .await
    .unwrap();
  let doc = next(&mut sub.events).await.unwrap();
  assert_eq!(doc.fields["email"], "");
}

#[tokio::test]
async fn noop_merge_does_not_emit() {
  let s = store().await;
  let defaults = fields(json!({ "email": "" }));
  s.create_or_merge("settings", "general", defaults.clone(), MergePolicy::PreferExisting)
    .await
    .unwrap();

  let mut sub = s.subscribe_document("settings", "general");
  assert!(next(&mut sub.events).await.is_some());

  s.create_or_merge("settings", "general", defaults, MergePolicy::PreferExisting)
    .await
    .unwrap();
  let woke = timeout(Duration::from_millis(100), sub.events.recv()).await;
  assert!(woke.is_err(), "unchanged document should not re-publish");
}

#[tokio::test]
async fn unsubscribe_closes_the_feed() {
  let s = store().await;
  let mut sub = s.subscribe(CollectionQuery::all("grades"));
  next(&mut sub.events).await;

  sub.unsubscribe.unsubscribe();
  sub.unsubscribe.unsubscribe();
  s.set("grades", "grade6", fields(json!({}))).await.unwrap();

  let end = timeout(Duration::from_secs(5), sub.events.recv()).await.unwrap();
  assert!(end.is_none(), "forwarder should stop after unsubscribe");
}
