//! HTTP API for the chat widget.

pub mod endpoints;
pub mod error;
pub mod sessions;

use std::sync::Arc;

use axum::Router;
use axum::routing::{MethodRouter, get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::bridges::{ChatBridge, LeadPersistence, PreferenceExtractor};
use crate::conversation::SessionManager;

pub use error::ApiError;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub chat: Arc<ChatBridge>,
    pub extractor: Arc<PreferenceExtractor>,
    pub persistence: Arc<LeadPersistence>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            chat: Arc::clone(manager.chat()),
            extractor: Arc::clone(manager.extractor()),
            persistence: Arc::clone(manager.persistence()),
            manager,
        }
    }
}

/// Permissive CORS for an embeddable widget served from any origin.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Attach the bare-OPTIONS and 405 handlers to a method router.
fn endpoint(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .options(endpoints::preflight)
        .fallback(endpoints::method_not_allowed)
}

/// Build the router with all widget and session routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(endpoints::health))
        .route("/api/chat", endpoint(post(endpoints::chat)))
        .route(
            "/api/extract-preferences",
            endpoint(post(endpoints::extract_preferences)),
        )
        .route("/api/save-lead", endpoint(post(endpoints::save_lead)))
        .route(
            "/api/save-conversation",
            endpoint(post(endpoints::save_conversation)),
        )
        .route("/api/sessions", endpoint(post(sessions::create_session)))
        .route(
            "/api/sessions/{id}",
            endpoint(get(sessions::get_session)),
        )
        .route(
            "/api/sessions/{id}/messages",
            endpoint(post(sessions::post_message)),
        )
        .layer(cors())
        .with_state(state)
}
