use std::time::Instant;

use tracing::{debug, info};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError};
use crate::sanitize::clean_text;

/// Coach persona, cleaned once when the runtime is built.
pub const SYSTEM_PROMPT: &str = "
You are BettrBot, a friendly communication coach.
Respond ONLY in clean simple bullet points.
No bold, no stars, no markdown, no special characters.
";

/// Prompt used by the provider connectivity check.
pub const PROBE_PROMPT: &str = "Say 'Hello, Gemini is working!'";

/// Holds the LLM provider, the cleaned system prompt and the model name.
/// Shared across requests via the gateway's `AppState`.
pub struct AgentRuntime {
    provider: Box<dyn LlmProvider>,
    system_prompt: String,
    model: String,
}

impl AgentRuntime {
    pub fn new(provider: Box<dyn LlmProvider>, model: String) -> Self {
        Self {
            provider,
            system_prompt: clean_text(SYSTEM_PROMPT),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        &*self.provider
    }

    /// Ask the provider for a 1–2 bullet reply to `message`.
    ///
    /// `context` (the recent turns) is logged but not sent: the prompt embeds
    /// only the latest message.
    pub async fn generate(
        &self,
        message: &str,
        context: &[Message],
    ) -> Result<ChatResponse, ProviderError> {
        let req = self.build_request(message);
        debug!(context_turns = context.len(), "context prepared");
        info!(model = %req.model, provider = %self.provider.name(), "processing chat request");

        let started = Instant::now();
        let result = self.provider.send(&req).await;
        if let Ok(resp) = &result {
            info!(
                tokens_in = resp.tokens_in,
                tokens_out = resp.tokens_out,
                stop_reason = %resp.stop_reason,
                latency_ms = started.elapsed().as_millis() as u64,
                "chat complete"
            );
        }
        result
    }

    /// Send the fixed probe prompt, bypassing the coach persona.
    pub async fn probe(&self) -> Result<ChatResponse, ProviderError> {
        let req = ChatRequest::prompt(self.model.clone(), PROBE_PROMPT);
        self.provider.send(&req).await
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        self.provider.list_models().await
    }

    fn build_request(&self, message: &str) -> ChatRequest {
        let prompt = format!(
            "{}\nUser: {}\nRespond in 1-2 bullet points:",
            self.system_prompt, message
        );
        ChatRequest::prompt(self.model.clone(), prompt)
    }
}
