//! In-memory `LeadStore` — keeps merged rows per table and a log of every
//! upsert, so flows can be asserted without a backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StorageError;

use super::traits::{LeadStore, Row};

/// A recorded upsert call.
#[derive(Debug, Clone)]
pub struct UpsertCall {
    pub table: String,
    pub conflict_key: String,
    pub row: Row,
}

#[derive(Default)]
struct Inner {
    /// table → conflict value → merged row
    tables: HashMap<String, HashMap<String, Row>>,
    calls: Vec<UpsertCall>,
}

/// Upsert store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert received, in call order.
    pub async fn calls(&self) -> Vec<UpsertCall> {
        self.inner.read().await.calls.clone()
    }

    /// Upserts received for one table.
    pub async fn calls_for(&self, table: &str) -> Vec<UpsertCall> {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.table == table)
            .cloned()
            .collect()
    }

    /// The merged row stored under `key` in `table`.
    pub async fn get(&self, table: &str, key: &str) -> Option<Row> {
        self.inner
            .read()
            .await
            .tables
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned()
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        row: Row,
    ) -> Result<Value, StorageError> {
        let key = match row.get(conflict_key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(StorageError::Rejected {
                    table: table.to_string(),
                    status: 400,
                    message: format!("row has no {conflict_key}"),
                });
            }
        };

        let mut inner = self.inner.write().await;
        inner.calls.push(UpsertCall {
            table: table.to_string(),
            conflict_key: conflict_key.to_string(),
            row: row.clone(),
        });

        let stored = inner
            .tables
            .entry(table.to_string())
            .or_default()
            .entry(key)
            .or_default();
        stored.extend(row);
        Ok(Value::Array(vec![Value::Object(stored.clone())]))
    }
}
