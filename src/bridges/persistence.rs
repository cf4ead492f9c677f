//! Lead persistence bridge — shapes lead and transcript rows and upserts them
//! keyed by session id.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::conversation::TranscriptEntry;
use crate::error::StorageError;
use crate::store::{LeadStore, Row, SESSION_KEY};

/// Table names used by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTables {
    pub leads: String,
    pub conversations: String,
}

impl Default for StorageTables {
    fn default() -> Self {
        Self {
            leads: "lead_profiles".to_string(),
            conversations: "conversations".to_string(),
        }
    }
}

/// Upserts lead and conversation rows. Without a store every call reports
/// `StorageError::NotConfigured`.
pub struct LeadPersistence {
    store: Option<Arc<dyn LeadStore>>,
    tables: StorageTables,
}

impl LeadPersistence {
    pub fn new(store: Option<Arc<dyn LeadStore>>, tables: StorageTables) -> Self {
        Self { store, tables }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Upsert `{session_id, ...fields, created_at}` into the leads table.
    /// Fields are passed through unvalidated; the table schema is the only check.
    pub async fn save_lead(&self, session_id: &str, fields: Row) -> Result<Value, StorageError> {
        let store = self.store.as_ref().ok_or(StorageError::NotConfigured)?;
        let row = lead_row(session_id, fields);
        debug!(session_id, columns = row.len(), "Saving lead");
        store.upsert(&self.tables.leads, SESSION_KEY, row).await
    }

    /// Upsert `{session_id, messages, updated_at}` into the conversations table.
    pub async fn save_transcript(
        &self,
        session_id: &str,
        entries: &[TranscriptEntry],
    ) -> Result<Value, StorageError> {
        let store = self.store.as_ref().ok_or(StorageError::NotConfigured)?;
        let messages = serde_json::to_value(entries)
            .map_err(|e| StorageError::InvalidResponse(format!("unserializable transcript: {e}")))?;

        let mut row = Row::new();
        row.insert(SESSION_KEY.to_string(), Value::String(session_id.to_string()));
        row.insert("messages".to_string(), messages);
        row.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));

        debug!(session_id, turns = entries.len(), "Saving transcript");
        store.upsert(&self.tables.conversations, SESSION_KEY, row).await
    }
}

/// Session id first, then the caller's fields (which may override it), then
/// the timestamp.
fn lead_row(session_id: &str, fields: Row) -> Row {
    let mut row = Row::new();
    row.insert(SESSION_KEY.to_string(), Value::String(session_id.to_string()));
    row.extend(fields);
    row.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));
    row
}
