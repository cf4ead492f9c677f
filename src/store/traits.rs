//! `LeadStore` trait — the single async interface to the backend table API.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageError;

/// Column every row is keyed on.
pub const SESSION_KEY: &str = "session_id";

/// A row to upsert: column name → JSON value.
pub type Row = Map<String, Value>;

/// Backend-agnostic upsert interface.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert `row` into `table`, merging with any existing row that shares
    /// the value in `conflict_key`. Returns the stored row(s) as reported by
    /// the backend.
    async fn upsert(&self, table: &str, conflict_key: &str, row: Row)
    -> Result<Value, StorageError>;
}
