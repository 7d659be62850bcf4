//! Encoding and decoding helpers between documents and the text stored in
//! SQLite columns.
//!
//! Field maps are stored as compact JSON objects. Timestamps written by the
//! store are RFC 3339 strings in UTC.

use chrono::{DateTime, Utc};
use serde_json::Value;
use torch_core::store::{Direction, Document, Fields};

use crate::Result;

// ─── Fields ───────────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &Fields) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

pub fn decode_fields(doc_id: &str, json: &str) -> Result<Fields> {
  match serde_json::from_str::<Value>(json)? {
    Value::Object(fields) => Ok(fields),
    _ => Err(torch_core::Error::NotAnObject(doc_id.to_owned()).into()),
  }
}

pub fn decode_document(doc_id: String, json: &str) -> Result<Document> {
  let fields = decode_fields(&doc_id, json)?;
  Ok(Document::new(doc_id, fields))
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Ordering ─────────────────────────────────────────────────────────────────

/// JSON path selecting a top-level field, quoted so any key is addressable.
pub fn json_path(field: &str) -> String {
  format!("$.\"{}\"", field.replace('"', "\\\""))
}

pub fn encode_direction(d: Direction) -> &'static str {
  match d {
    Direction::Ascending => "ASC",
    Direction::Descending => "DESC",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn non_object_row_is_rejected() {
    assert!(decode_fields("d", "[1]").is_err());
    assert!(decode_fields("d", "{\"a\":1}").is_ok());
  }

  #[test]
  fn json_path_quotes_the_key() {
    assert_eq!(json_path("uploadDate"), "$.\"uploadDate\"");
  }
}
