//! Google Gemini provider (Generative Language API) with API key auth.
//!
//! Requests go to `{base_url}/models/{model}:generateContent` with the key in
//! the `x-goog-api-key` header. Model listing uses `{base_url}/models`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use bettrbot_core::config::GeminiConfig;

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, Role};

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Build the HTTP client. Fails only if the TLS backend cannot start.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| bettrbot_core::config::DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn from_config(config: &GeminiConfig, api_key: String) -> Result<Self, ProviderError> {
        Self::new(
            api_key,
            Some(config.base_url.clone()),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, model_path(model))
    }

    /// Build the request body for the generateContent endpoint.
    fn build_body(&self, req: &ChatRequest) -> serde_json::Value {
        let contents: Vec<_> = req
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    Role::User => "user",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        serde_json::json!({ "contents": contents })
    }

    async fn models_page(&self, page_token: Option<&str>) -> Result<ModelList, ProviderError> {
        let mut query = vec![("pageSize", MODELS_PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Largest page the models endpoint serves.
const MODELS_PAGE_SIZE: &str = "1000";

/// `gemini-2.5-flash` and `models/gemini-2.5-flash` address the same model.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint(&req.model);
        let body = self.build_body(req);

        debug!(model = %req.model, "sending request to Gemini");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp, &req.model)
    }

    /// Walks every page until the API stops returning `nextPageToken`.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.models_page(page_token.as_deref()).await?;
            names.extend(page.models.into_iter().map(|m| m.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = names.len(), "listed Gemini models");
        Ok(names)
    }
}

/// Join the text parts of the first candidate. A response without any text
/// (e.g. blocked by safety filters) is an error.
fn parse_response(api_resp: GenerateResponse, model: &str) -> Result<ChatResponse, ProviderError> {
    let candidate = api_resp.candidates.into_iter().next();
    let finish_reason = candidate
        .as_ref()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_default();

    let parts: Vec<String> = candidate
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if parts.is_empty() {
        return Err(ProviderError::EmptyResponse { finish_reason });
    }

    let usage = api_resp.usage_metadata.unwrap_or_default();
    Ok(ChatResponse {
        content: parts.concat(),
        model: model.to_string(),
        tokens_in: usage.prompt_token_count,
        tokens_out: usage.candidates_token_count,
        stop_reason: finish_reason,
    })
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Usage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}
