//! Google Gemini provider over the Generative Language REST API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::LlmError;

use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

const PROVIDER: &str = "gemini";

/// Base URL for the Gemini API.
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

// ── Provider ────────────────────────────────────────────────────────────

/// Gemini `generateContent` client.
pub struct GeminiProvider {
    api_key: SecretString,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: API_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn convert_role(role: Role) -> &'static str {
        match role {
            Role::System | Role::User => "user",
            Role::Assistant => "model",
        }
    }

    /// Split out the system instruction and fold consecutive same-role turns
    /// into one content block with several parts.
    fn convert_messages(messages: &[ChatMessage]) -> (Vec<GeminiContent>, Option<GeminiContent>) {
        let mut contents: Vec<GeminiContent> = Vec::new();
        let mut system_parts = Vec::new();

        for message in messages {
            let part = Part {
                text: Some(message.content.clone()),
            };
            if message.role == Role::System {
                system_parts.push(part);
                continue;
            }
            let role = Self::convert_role(message.role);
            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
                _ => contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![part],
                }),
            }
        }

        let system_instruction = (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        });
        (contents, system_instruction)
    }

    fn build_request(request: &CompletionRequest) -> GeminiRequest {
        let (contents, system_instruction) = Self::convert_messages(&request.messages);
        let generation_config = (request.temperature.is_some() || request.max_tokens.is_some())
            .then(|| GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            });
        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(response: &GeminiResponse) -> Result<String, LlmError> {
        let content = response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no candidates in response".to_string(),
            })?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "candidate has no text parts".to_string(),
            });
        }
        Ok(text)
    }

    fn map_api_error(status: u16, body: &str) -> LlmError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_string(), |e| e.message);

        match status {
            401 | 403 => LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            },
            429 => LlmError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after: None,
            },
            _ => LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("API error ({status}): {message}"),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::build_request(&request);

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to read response: {e}"),
        })?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status.as_u16(), &text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)?;
        if let Some(err) = parsed.error {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: err.message,
            });
        }

        let content = Self::extract_text(&parsed)?;
        let finish_reason = FinishReason::from_provider(
            parsed
                .candidates
                .as_ref()
                .and_then(|c| c.first())
                .and_then(|c| c.finish_reason.as_deref()),
        );
        let (input_tokens, output_tokens) = parsed
            .usage_metadata
            .as_ref()
            .map(|u| {
                (
                    u.prompt_token_count.unwrap_or(0),
                    u.candidates_token_count.unwrap_or(0),
                )
            })
            .unwrap_or((0, 0));

        debug!(input_tokens, output_tokens, "Received Gemini response");

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }
}
