use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use realtech_assist::api::{AppState, router};
use realtech_assist::bridges::{ChatBridge, LeadPersistence, PreferenceExtractor, StorageTables};
use realtech_assist::config::ServiceConfig;
use realtech_assist::conversation::{REALTECH_STEPS, SessionManager, spawn_idle_sweep};
use realtech_assist::llm::create_provider;
use realtech_assist::store::{LeadStore, SupabaseStore};

/// How often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    let addr = config.bind_addr()?;

    let llm = config.llm.as_ref().map(create_provider);
    if llm.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, chat and extraction will report unavailable");
    }

    let (store, tables) = match &config.storage {
        Some(storage) => {
            let store: Arc<dyn LeadStore> =
                Arc::new(SupabaseStore::new(&storage.url, storage.service_key.clone()));
            (Some(store), storage.tables.clone())
        }
        None => {
            tracing::warn!("Supabase not configured, leads will not be persisted");
            (None, StorageTables::default())
        }
    };

    eprintln!("🏠 Realtech Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{addr}/api");
    eprintln!(
        "   Model: {}",
        config.llm.as_ref().map_or("(not configured)", |l| l.model.as_str())
    );
    eprintln!(
        "   Storage: {}",
        config.storage.as_ref().map_or("(not configured)", |s| s.url.as_str())
    );
    eprintln!("   Leads table: {}\n", tables.leads);

    let persistence = Arc::new(LeadPersistence::new(store, tables));
    let manager = Arc::new(
        SessionManager::new(
            &REALTECH_STEPS,
            Arc::new(ChatBridge::new(llm.clone())),
            Arc::new(PreferenceExtractor::new(llm, Arc::clone(&persistence))),
            persistence,
        )
        .with_idle_timeout(config.session_idle_timeout),
    );
    let _sweep = spawn_idle_sweep(Arc::clone(&manager), SWEEP_INTERVAL);

    let app = router(AppState::new(manager));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
