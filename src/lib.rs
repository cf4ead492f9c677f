//! Realtech Assist — chat widget backend for real-estate lead capture.

pub mod api;
pub mod bridges;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod store;
pub mod tasks;
