//! Supabase backend — upserts through the PostgREST table API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StorageError;

use super::traits::{LeadStore, Row};

/// PostgREST client scoped to one Supabase project.
pub struct SupabaseStore {
    base_url: String,
    service_key: SecretString,
    client: Client,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, service_key: SecretString) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            client: Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }
}

#[async_trait]
impl LeadStore for SupabaseStore {
    async fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        row: Row,
    ) -> Result<Value, StorageError> {
        let key = self.service_key.expose_secret();

        let response = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict_key)])
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&Value::Object(row))
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::RequestFailed(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or(body);
            warn!(table, status = %status, "Supabase upsert rejected");
            return Err(StorageError::Rejected {
                table: table.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        debug!(table, "Supabase upsert succeeded");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }
}
