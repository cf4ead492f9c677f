//! Conversation core: the guided questionnaire, free-form chat, and the
//! sessions that hold them.

pub mod manager;
pub mod model;
pub mod prompts;
pub mod session;
pub mod state;
pub mod steps;
pub mod transcript;

pub use manager::{DEFAULT_IDLE_TIMEOUT, SessionManager, TurnReply, spawn_idle_sweep};
pub use model::{LeadField, LeadRecord, SessionId};
pub use session::{GuidedOutcome, Session, SessionSnapshot};
pub use state::ConversationMode;
pub use steps::{REALTECH_STEPS, StepDefinition};
pub use transcript::{Speaker, Transcript, TranscriptEntry};
