//! Preference extraction — asks the model to summarise a transcript as JSON
//! and optionally persists the result against the session's lead row.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::conversation::prompts::extraction_prompt;
use crate::conversation::{SessionId, TranscriptEntry};
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::store::Row;

use super::persistence::LeadPersistence;

/// Run extraction whenever the transcript length crosses a multiple of this.
pub const EXTRACTION_CADENCE: usize = 4;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?").expect("code fence pattern is valid")
});

/// Whether growing a transcript from `before` to `after` entries passed an
/// extraction point.
pub fn extraction_due(before: usize, after: usize) -> bool {
    (before + 1..=after).any(|len| len % EXTRACTION_CADENCE == 0)
}

/// Model output after fence stripping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedPreferences {
    /// The model produced a JSON object.
    Structured(Map<String, Value>),
    /// Anything else, kept as text.
    Fallback { raw_extraction: String },
}

impl ExtractedPreferences {
    pub fn parse(text: &str) -> Self {
        let cleaned = CODE_FENCE.replace_all(text, "");
        let cleaned = cleaned.trim();
        match serde_json::from_str::<Value>(cleaned) {
            Ok(Value::Object(map)) => Self::Structured(map),
            _ => Self::Fallback {
                raw_extraction: text.to_string(),
            },
        }
    }

    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Structured(map) => Some(map),
            Self::Fallback { .. } => None,
        }
    }

    /// Columns to merge into the lead row.
    pub fn to_row(&self) -> Row {
        match self {
            Self::Structured(map) => map.clone(),
            Self::Fallback { raw_extraction } => {
                let mut row = Row::new();
                row.insert(
                    "raw_extraction".to_string(),
                    Value::String(raw_extraction.clone()),
                );
                row
            }
        }
    }
}

pub struct PreferenceExtractor {
    llm: Option<Arc<dyn LlmProvider>>,
    persistence: Arc<LeadPersistence>,
}

impl PreferenceExtractor {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, persistence: Arc<LeadPersistence>) -> Self {
        Self { llm, persistence }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Extract preferences from `entries`. When a session id is given and
    /// storage is configured the result is upserted into the leads table;
    /// storage failures are logged and do not fail the extraction.
    pub async fn extract(
        &self,
        entries: &[TranscriptEntry],
        session_id: Option<&SessionId>,
    ) -> Result<ExtractedPreferences, LlmError> {
        let llm = self.llm.as_ref().ok_or(LlmError::NotConfigured)?;

        let request = CompletionRequest::new(vec![ChatMessage::user(extraction_prompt(entries))])
            .with_temperature(0.0);
        let response = llm.complete(request).await?;
        let preferences = ExtractedPreferences::parse(&response.content);

        match &preferences {
            ExtractedPreferences::Structured(map) => {
                info!(fields = map.len(), turns = entries.len(), "Preferences extracted")
            }
            ExtractedPreferences::Fallback { .. } => {
                warn!(turns = entries.len(), "Extraction was not a JSON object, keeping raw text")
            }
        }

        if let Some(id) = session_id {
            if self.persistence.is_configured() {
                if let Err(e) = self
                    .persistence
                    .save_lead(id.as_str(), preferences.to_row())
                    .await
                {
                    warn!(session_id = %id, error = %e, "Failed to persist extracted preferences");
                }
            } else {
                debug!(session_id = %id, "Storage not configured, extraction not persisted");
            }
        }

        Ok(preferences)
    }
}
