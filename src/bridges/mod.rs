//! Bridges between a conversation and its external collaborators.

pub mod chat;
pub mod extraction;
pub mod persistence;

pub use chat::ChatBridge;
pub use extraction::{EXTRACTION_CADENCE, ExtractedPreferences, PreferenceExtractor, extraction_due};
pub use persistence::{LeadPersistence, StorageTables};
