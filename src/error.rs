//! Error types for Realtech Assist.

use std::time::Duration;

/// Failure of a collaborator call made in the background.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Language-model collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Language model not configured")]
    NotConfigured,

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage not configured")]
    NotConfigured,

    #[error("Storage request failed: {0}")]
    RequestFailed(String),

    #[error("Storage rejected upsert into {table} ({status}): {message}")]
    Rejected {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from storage: {0}")]
    InvalidResponse(String),
}

/// Session and flow errors.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Guided questions already answered")]
    FlowComplete,

    #[error("Guided questions still pending")]
    FlowInProgress,
}

impl LlmError {
    /// Whether this error means the collaborator is absent rather than failing.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

impl StorageError {
    /// Whether this error means the collaborator is absent rather than failing.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}
