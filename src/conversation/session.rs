//! Session state and the guided-flow controller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ConversationError;

use super::model::{LeadField, LeadRecord, SessionId};
use super::prompts::{COMPLETION_MESSAGE, GREETINGS, STARTER_SUGGESTIONS};
use super::state::ConversationMode;
use super::steps::StepDefinition;
use super::transcript::{Transcript, TranscriptEntry};

/// What a guided answer led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidedOutcome {
    /// The next question was asked.
    Advanced { cursor: usize },
    /// That was the last question; the lead record is complete.
    Completed,
}

/// Everything one visitor's conversation owns.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    steps: &'static [StepDefinition],
    mode: ConversationMode,
    transcript: Transcript,
    lead: LeadRecord,
    options: Vec<String>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Session {
    /// Open a session: greet, then ask the first question (if any).
    pub fn start(id: SessionId, steps: &'static [StepDefinition]) -> Self {
        let now = Utc::now();
        let mut session = Self {
            id,
            steps,
            mode: ConversationMode::start(steps.len()),
            transcript: Transcript::new(),
            lead: LeadRecord::new(),
            options: Vec::new(),
            created_at: now,
            last_active: now,
        };
        for line in GREETINGS {
            session.transcript.push_assistant(line);
        }
        if let Some(first) = steps.first() {
            session.ask(first);
            if session.options.is_empty() {
                session.options = STARTER_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
            }
        }
        session
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn cursor(&self) -> usize {
        self.mode.cursor(self.steps.len())
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn lead(&self) -> &LeadRecord {
        &self.lead
    }

    /// Quick-reply choices for the question currently on screen.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    fn ask(&mut self, step: &StepDefinition) {
        self.transcript.push_assistant(step.prompt);
        self.options = step.options();
    }

    /// Record an answer to the current question and move to the next one.
    ///
    /// The text is stored verbatim under the step's field. Exactly one
    /// assistant entry is appended: the next prompt, or the completion
    /// message after the last step.
    pub fn submit_answer(&mut self, text: &str) -> Result<GuidedOutcome, ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }
        let ConversationMode::Guided { cursor } = self.mode else {
            return Err(ConversationError::FlowComplete);
        };

        let step = self.steps[cursor];
        self.transcript.push_user(text);
        if let Some(field) = step.field {
            self.lead.set(field, text);
        }

        self.mode = self.mode.advance(self.steps.len());
        match self.mode {
            ConversationMode::Guided { cursor } => {
                let next = self.steps[cursor];
                self.ask(&next);
                Ok(GuidedOutcome::Advanced { cursor })
            }
            ConversationMode::FreeForm => {
                self.transcript.push_assistant(COMPLETION_MESSAGE);
                self.options.clear();
                Ok(GuidedOutcome::Completed)
            }
        }
    }

    /// Append the user half of a free-form exchange.
    pub fn push_user_message(&mut self, text: &str) -> Result<(), ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }
        if self.mode.is_guided() {
            return Err(ConversationError::FlowInProgress);
        }
        self.transcript.push_user(text);
        Ok(())
    }

    /// Append the assistant half of a free-form exchange.
    pub fn push_assistant_message(&mut self, text: impl Into<String>) {
        self.transcript.push_assistant(text);
    }

    /// Merge model-extracted preferences into the lead record.
    pub fn merge_extracted(
        &mut self,
        extracted: &serde_json::Map<String, serde_json::Value>,
    ) -> Vec<LeadField> {
        self.lead.merge_extracted(extracted)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            mode: self.mode.name(),
            cursor: self.cursor(),
            step_count: self.steps.len(),
            transcript: self.transcript.entries().to_vec(),
            lead: self.lead.clone(),
            options: self.options.clone(),
            created_at: self.created_at,
            last_active: self.last_active,
        }
    }
}

/// Read-only view of a session for the REST layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub mode: &'static str,
    pub cursor: usize,
    pub step_count: usize,
    pub transcript: Vec<TranscriptEntry>,
    pub lead: LeadRecord,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}
