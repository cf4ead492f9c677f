//! Free-form chat bridge — forwards the transcript and a new message to the
//! language model and returns its reply.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::conversation::TranscriptEntry;
use crate::conversation::prompts::chat_messages;
use crate::error::LlmError;
use crate::llm::{CompletionRequest, FinishReason, LlmProvider};

pub struct ChatBridge {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ChatBridge {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Ask the model for a reply to `message` given the prior turns.
    /// No retries; the caller decides what a failure looks like to the user.
    pub async fn converse(
        &self,
        message: &str,
        history: &[TranscriptEntry],
    ) -> Result<String, LlmError> {
        let llm = self.llm.as_ref().ok_or(LlmError::NotConfigured)?;

        debug!(history = history.len(), "Forwarding chat message to model");
        let request = CompletionRequest::new(chat_messages(history, message));
        let response = llm.complete(request).await?;

        info!(
            model = llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Chat reply received"
        );
        if response.finish_reason != FinishReason::Stop {
            warn!(finish_reason = ?response.finish_reason, "Chat reply cut short");
        }
        Ok(response.content)
    }
}
