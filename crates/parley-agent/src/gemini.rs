//! Google Gemini (Generative Language API) client with API-key authentication.
//!
//! Sends the running transcript plus the new prompt to the `generateContent`
//! endpoint and returns the concatenated text parts of the first candidate.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use parley_core::config::GeminiConfig;
use parley_core::types::GenerationRequest;

use crate::provider::{GenerationClient, ProviderError, Role};
use crate::session::ConversationSession;

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    system_instruction: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            system_instruction: config.system_instruction.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Build the request body for the generateContent endpoint.
    fn build_body(&self, session: &ConversationSession, req: &GenerationRequest) -> serde_json::Value {
        let mut contents: Vec<serde_json::Value> = session
            .turns()
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Model => "model",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": turn.text }]
                })
            })
            .collect();
        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{ "text": req.prompt() }]
        }));

        let mut body = serde_json::json!({ "contents": contents });

        if let Some(max) = req.max_output_tokens() {
            body["generationConfig"] = serde_json::json!({ "maxOutputTokens": max });
        }
        if let Some(ref si) = self.system_instruction {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": si }] });
        }

        body
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        session: &ConversationSession,
        req: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let body = self.build_body(session, req);

        debug!(model = %self.model, history = session.len(), "sending request to Gemini");

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini error");
            return Err(api_error(status, text));
        }

        let api_resp: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        extract_text(api_resp)
    }
}

/// Join the text parts of the first candidate.
fn extract_text(resp: GeminiResponse) -> Result<String, ProviderError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Blocked(reason));
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(usage) = resp.usage_metadata {
        debug!(
            tokens_in = usage.prompt_token_count,
            tokens_out = usage.candidates_token_count,
            finish_reason = candidate.finish_reason.as_deref().unwrap_or(""),
            "Gemini response received"
        );
    }

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Any non-success status, quota exhaustion (429) included. Nothing retries,
/// so the body is kept for the logs and the status for the error.
fn api_error(status: u16, body: String) -> ProviderError {
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    ProviderError::Api { status, message }
}
