//! Conversation transcript — an append-only log of speaker-tagged turns.

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    /// The widget tags its own turns `model`; both spellings are accepted.
    #[serde(alias = "model", alias = "bot")]
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Speaker,
    pub content: String,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::Assistant,
            content: content.into(),
        }
    }

    /// Convert into a model message.
    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            Speaker::User => ChatMessage::user(&self.content),
            Speaker::Assistant => ChatMessage::assistant(&self.content),
        }
    }
}

/// Ordered turns. Entries can be appended but never edited, removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(TranscriptEntry::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(TranscriptEntry::assistant(content));
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Entries appended at or after position `from`.
    pub fn since(&self, from: usize) -> &[TranscriptEntry] {
        &self.entries[from.min(self.entries.len())..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render turns as `role: content` lines.
pub fn to_conversation_text(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}: {}", e.role, e.content))
        .collect::<Vec<_>>()
        .join("\n")
}
