//! Integration tests for the widget HTTP API.
//!
//! Each test spins up an Axum server on a random port and drives it over real
//! HTTP with reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use realtech_assist::api::{AppState, router};
use realtech_assist::bridges::{ChatBridge, LeadPersistence, PreferenceExtractor, StorageTables};
use realtech_assist::conversation::{REALTECH_STEPS, SessionManager};
use realtech_assist::error::LlmError;
use realtech_assist::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use realtech_assist::store::{LeadStore, MemoryStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const ANSWERS: [&str; 10] = [
    "Gurgaon, Golf Course Road",
    "Buy",
    "Above 2Cr",
    "Villa",
    "4+ BHK",
    "Private garden",
    "Immediately",
    "DLF",
    "Next week",
    "Meera, meera@example.com",
];

/// Stub LLM provider (no real API calls).
struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let last = &request.messages.last().unwrap().content;
        let content = if last.starts_with("Read the following conversation") {
            r#"{"special_preferences": "Private garden, pool"}"#.to_string()
        } else {
            format!("stub reply to: {last}")
        };
        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
        })
    }
}

/// Start the server on a random port, return (base url, store, manager).
async fn start_server(
    llm: Option<Arc<dyn LlmProvider>>,
) -> (String, Arc<MemoryStore>, Arc<SessionManager>) {
    let store = Arc::new(MemoryStore::new());
    let lead_store: Arc<dyn LeadStore> = store.clone();
    let persistence = Arc::new(LeadPersistence::new(Some(lead_store), StorageTables::default()));
    let manager = Arc::new(SessionManager::new(
        &REALTECH_STEPS,
        Arc::new(ChatBridge::new(llm.clone())),
        Arc::new(PreferenceExtractor::new(llm, Arc::clone(&persistence))),
        persistence,
    ));
    let app = router(AppState::new(Arc::clone(&manager)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), store, manager)
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn guided_flow_then_free_chat() {
    timeout(TEST_TIMEOUT, async {
        let (base, store, manager) = start_server(Some(Arc::new(StubLlm))).await;
        let client = reqwest::Client::new();

        let resp = client.post(format!("{base}/api/sessions")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        let created: Value = resp.json().await.unwrap();
        let id = created["session_id"].as_str().unwrap().to_string();
        assert!(id.starts_with("session_"));

        let url = format!("{base}/api/sessions/{id}/messages");
        let mut last = Value::Null;
        for answer in ANSWERS {
            let (status, reply) = post(&client, url.clone(), json!({"text": answer})).await;
            assert_eq!(status, 200);
            last = reply;
        }
        assert_eq!(last["mode"], "free_form");
        assert_eq!(last["cursor"], 10);

        let (status, reply) =
            post(&client, url.clone(), json!({"text": "Any gated villas with a pool?"})).await;
        assert_eq!(status, 200);
        assert_eq!(
            reply["entries"][1]["content"],
            "stub reply to: Any gated villas with a pool?"
        );

        manager.tasks().drain().await;

        let leads = store.calls_for("lead_profiles").await;
        // One save on completion, one from extraction.
        assert_eq!(leads.len(), 2);
        assert!(
            leads
                .iter()
                .any(|call| call.row.get("visit_timeline") == Some(&json!("Next week")))
        );

        let stored = store.get("lead_profiles", &id).await.unwrap();
        assert_eq!(stored["contact_details"], "Meera, meera@example.com");
        assert_eq!(stored["special_preferences"], "Private garden, pool");

        let snapshot: Value = client
            .get(format!("{base}/api/sessions/{id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snapshot["transcript"].as_array().unwrap().len(), 25);
        assert_eq!(snapshot["lead"]["special_preferences"], "Private garden, pool");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn free_chat_without_model_apologises() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store, _manager) = start_server(None).await;
        let client = reqwest::Client::new();

        let created: Value = client
            .post(format!("{base}/api/sessions"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["session_id"].as_str().unwrap();
        let url = format!("{base}/api/sessions/{id}/messages");
        for answer in ANSWERS {
            post(&client, url.clone(), json!({"text": answer})).await;
        }

        let (status, reply) = post(
            &client,
            url,
            json!({"text": "What's the price per square foot in downtown?"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(
            reply["entries"][1]["content"],
            "Sorry, I'm having trouble connecting right now."
        );

        let (status, body) = post(
            &client,
            format!("{base}/api/chat"),
            json!({"message": "hello", "history": []}),
        )
        .await;
        assert_eq!(status, 503);
        assert!(body["error"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store, _manager) = start_server(None).await;
        let client = reqwest::Client::new();

        let resp = client
            .request(reqwest::Method::OPTIONS, format!("{base}/api/save-lead"))
            .header("Origin", "https://homes.example.com")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            resp.headers()["access-control-allow-origin"].to_str().unwrap(),
            "*"
        );

        let resp = client.get(format!("{base}/api/save-lead")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 405);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({"error": "Method Not Allowed"}));
    })
    .await
    .expect("test timed out");
}
