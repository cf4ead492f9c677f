//! Provider-agnostic completion types and the `LlmProvider` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Who authored a message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A completion request: ordered messages plus sampling knobs.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Safety,
    Other,
}

impl FinishReason {
    /// Map a provider's finish reason string onto our enum.
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            None | Some("STOP") | Some("stop") => Self::Stop,
            Some("MAX_TOKENS") | Some("length") => Self::Length,
            Some("SAFETY") | Some("RECITATION") => Self::Safety,
            Some(_) => Self::Other,
        }
    }
}

/// Plain-text completion returned by a provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

/// A hosted language model that turns role-tagged messages into text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Run a single completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_sampling_options() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.0)
            .with_max_tokens(512);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_provider(None), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider(Some("STOP")), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(FinishReason::from_provider(Some("SAFETY")), FinishReason::Safety);
        assert_eq!(FinishReason::from_provider(Some("BLOCKLIST")), FinishReason::Other);
    }
}
