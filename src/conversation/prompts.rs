//! Fixed assistant texts and the prompts sent to the language model.

use crate::llm::ChatMessage;

use super::transcript::{TranscriptEntry, to_conversation_text};

/// Opening lines shown when a session starts, before the first question.
pub const GREETINGS: [&str; 2] = [
    "Hi, I’m your Realtech assistant 👋 How can I help you with properties today?",
    "Let’s get started with a few quick questions.",
];

/// Quick replies offered with the first question when it has none of its own.
pub const STARTER_SUGGESTIONS: [&str; 4] = [
    "Show me properties in my budget",
    "What areas are best for families?",
    "Do you have pet-friendly apartments?",
    "What is available in my preferred location?",
];

/// Shown once the last guided question is answered.
pub const COMPLETION_MESSAGE: &str = "Thank you! I've noted your preferences and our team will reach out shortly. \
Meanwhile, feel free to ask me anything about properties.";

/// Shown in place of a model reply when the model call fails.
pub const CHAT_FALLBACK: &str = "Sorry, I'm having trouble connecting right now.";

/// Standing instruction for free-form chat.
pub const SYSTEM_PROMPT: &str = "You are a Realtech real estate assistant. Stay within real estate topics. \
Collect user preferences through conversation. Ask one question at a time. Allow free chat. \
Extract structured preferences from the conversation.";

/// The model's acknowledgement turn after the instruction.
pub const SYSTEM_ACK: &str = "Understood. I am ready to assist with real estate inquiries.";

/// Instruction prefixed to an extraction request.
pub const EXTRACTION_PROMPT: &str = "Read the following conversation and output ONLY in JSON with fields: \
location_preference, budget, property_type, special_preferences.";

/// Build the messages for a free-form reply: the instruction exchange, the
/// prior turns, then the new user message.
pub fn chat_messages(history: &[TranscriptEntry], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::user(SYSTEM_PROMPT));
    messages.push(ChatMessage::assistant(SYSTEM_ACK));
    messages.extend(history.iter().map(TranscriptEntry::to_chat_message));
    messages.push(ChatMessage::user(message));
    messages
}

/// Build the single-message extraction prompt for a transcript.
pub fn extraction_prompt(entries: &[TranscriptEntry]) -> String {
    format!(
        "{EXTRACTION_PROMPT}\n\nConversation:\n{}",
        to_conversation_text(entries)
    )
}
