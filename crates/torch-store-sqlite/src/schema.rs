//! SQL schema for the Torch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per document. Fields are an opaque JSON object so unknown fields
-- survive every read and write untouched.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    fields_json TEXT NOT NULL,   -- JSON object
    PRIMARY KEY (collection, doc_id)
);

PRAGMA user_version = 1;
";
