//! Conversation mode — guided questionnaire or free-form chat.

/// Which phase a session is in.
///
/// Progresses linearly: Guided { 0 } → Guided { 1 } → … → Guided { N-1 } →
/// FreeForm. There is no way back into guided mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationMode {
    /// Asking step `cursor` of the questionnaire.
    Guided { cursor: usize },
    /// Questionnaire exhausted; input goes to the language model.
    FreeForm,
}

impl ConversationMode {
    /// Initial mode for a questionnaire of `step_count` steps.
    pub fn start(step_count: usize) -> Self {
        if step_count == 0 {
            Self::FreeForm
        } else {
            Self::Guided { cursor: 0 }
        }
    }

    /// The single transition function: move past the current step.
    /// `FreeForm` is terminal and maps to itself.
    pub fn advance(self, step_count: usize) -> Self {
        match self {
            Self::Guided { cursor } if cursor + 1 < step_count => Self::Guided { cursor: cursor + 1 },
            Self::Guided { .. } | Self::FreeForm => Self::FreeForm,
        }
    }

    /// Position in the step sequence; equals `step_count` once exhausted.
    pub fn cursor(&self, step_count: usize) -> usize {
        match self {
            Self::Guided { cursor } => *cursor,
            Self::FreeForm => step_count,
        }
    }

    pub fn is_guided(&self) -> bool {
        matches!(self, Self::Guided { .. })
    }

    /// Whether the questionnaire is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FreeForm)
    }

    /// Wire name of the mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Guided { .. } => "guided",
            Self::FreeForm => "free_form",
        }
    }
}

impl std::fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guided { cursor } => write!(f, "guided({cursor})"),
            Self::FreeForm => f.write_str(self.name()),
        }
    }
}
