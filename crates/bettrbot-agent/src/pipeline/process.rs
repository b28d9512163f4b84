//! Per-message processing.
//!
//! Flow for every accepted message:
//! record human turn (seeding new users) → classify → canned reply or
//! provider call → clean text → record ai turn → return `ChatReply`.
//!
//! Provider failures never escape: they are logged and replaced with a fixed
//! reply.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bettrbot_core::config::AgentConfig;
use bettrbot_sessions::{ConversationStore, Turn, TurnKind, TurnWindow};

use crate::intent::{classify, Intent};
use crate::provider::{Message, Role};
use crate::runtime::AgentRuntime;
use crate::sanitize::clean_text;

/// First ai turn of every new conversation.
pub const SEED_GREETING: &str = "Hello! I'm your communication coach. How can I help you today?";

/// Returned when the provider call fails for any reason.
pub const TROUBLE_REPLY: &str = "I'm having trouble responding. Could you try again?";

/// Returned when the provider's text is empty after cleanup.
pub const UNCLEAR_REPLY: &str = "I'm here to help. Could you tell me more?";

/// Outbound reply for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Reserved for human handoff; never set by the current rules.
    #[serde(default)]
    pub is_escalated: bool,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            is_escalated: false,
        }
    }
}

/// Owns the conversation store and the agent runtime.
pub struct Coach {
    runtime: AgentRuntime,
    store: ConversationStore,
    context_turns: usize,
}

impl Coach {
    pub fn new(runtime: AgentRuntime, config: &AgentConfig) -> Self {
        Self {
            runtime,
            store: ConversationStore::new(config.history_limit, SEED_GREETING),
            context_turns: config.context_turns,
        }
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    /// Handle one validated message. `text` is trimmed before it is stored.
    pub async fn handle(&self, user_id: &str, text: &str) -> ChatReply {
        let snapshot = self.store.record_human(user_id, text.trim());
        let reply = self.respond(&snapshot).await;
        self.store.record_ai(user_id, &reply.response);
        reply
    }

    /// Snapshot of a user's stored turns, oldest first.
    pub fn history(&self, user_id: &str) -> Option<Vec<Turn>> {
        self.store.history(user_id)
    }

    pub fn conversation_count(&self) -> usize {
        self.store.len()
    }

    async fn respond(&self, conversation: &TurnWindow) -> ChatReply {
        let message = match classify(conversation) {
            Intent::Canned(reply) => {
                info!("canned reply");
                return ChatReply::new(reply);
            }
            Intent::Generate(message) => message,
        };

        let context = context_messages(conversation, self.context_turns);
        match self.runtime.generate(&message, &context).await {
            Ok(resp) => {
                let cleaned = clean_text(&resp.content);
                if cleaned.is_empty() {
                    ChatReply::new(UNCLEAR_REPLY)
                } else {
                    ChatReply::new(cleaned)
                }
            }
            Err(e) => {
                warn!(
                    provider = %self.runtime.provider().name(),
                    error = %e,
                    "provider call failed, using fallback reply"
                );
                ChatReply::new(TROUBLE_REPLY)
            }
        }
    }
}

/// The last `n` turns as provider messages.
fn context_messages(conversation: &TurnWindow, n: usize) -> Vec<Message> {
    conversation
        .last(n)
        .map(|turn| Message {
            role: match turn.kind {
                TurnKind::Human => Role::User,
                TurnKind::Ai => Role::Assistant,
            },
            content: turn.text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use crate::intent::DEESCALATION_REPLY;
    use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

    /// Replies with fixed text and counts calls.
    #[derive(Clone)]
    struct Scripted {
        reply: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                content: self.reply.to_string(),
                model: req.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "STOP".to_string(),
            })
        }
    }

    struct AlwaysFail;

    #[async_trait]
    impl LlmProvider for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Unavailable("intentional failure".to_string()))
        }
    }

    fn coach(provider: impl LlmProvider + 'static) -> Coach {
        let runtime = AgentRuntime::new(Box::new(provider), "test-model".to_string());
        Coach::new(runtime, &AgentConfig::default())
    }

    #[tokio::test]
    async fn first_message_seeds_conversation() {
        let provider = Scripted::new("- unused");
        let coach = coach(provider.clone());

        let reply = coach.handle("u1", "Hello").await;

        assert_eq!(reply, ChatReply::new("Hi there! What would you like to work on?"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let history = coach.history("u1").expect("history");
        assert_eq!(
            history,
            vec![
                Turn::ai(SEED_GREETING),
                Turn::human("Hello"),
                Turn::ai("Hi there! What would you like to work on?"),
            ]
        );
    }

    #[tokio::test]
    async fn profanity_short_circuits_provider() {
        let provider = Scripted::new("- unused");
        let coach = coach(provider.clone());

        let reply = coach.handle("u1", "you are so stupid").await;

        assert_eq!(reply.response, DEESCALATION_REPLY);
        assert!(!reply.is_escalated);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_output_is_cleaned() {
        let provider = Scripted::new("* **Pause** before you reply.\n\n* Ask `why`.");
        let coach = coach(provider.clone());

        let reply = coach.handle("u1", "hi there").await;

        assert_eq!(reply.response, "Pause before you reply. Ask why.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn markdown_only_output_becomes_unclear_reply() {
        let coach = coach(Scripted::new("**\n```\n~~"));
        let reply = coach.handle("u1", "tell me something").await;
        assert_eq!(reply, ChatReply::new(UNCLEAR_REPLY));
    }

    #[tokio::test]
    async fn provider_failure_uses_fallback() {
        let coach = coach(AlwaysFail);

        let reply = coach.handle("u1", "How do I disagree with my manager?").await;

        assert_eq!(reply.response, "I'm having trouble responding. Could you try again?");
        assert!(!reply.is_escalated);
        let history = coach.history("u1").expect("history");
        assert_eq!(history.last(), Some(&Turn::ai(TROUBLE_REPLY)));
    }

    #[tokio::test]
    async fn history_capped_after_six_round_trips() {
        let coach = coach(Scripted::new("- noted"));
        for i in 0..6 {
            coach.handle("u1", &format!("question {i}")).await;
        }

        let history = coach.history("u1").expect("history");
        assert_eq!(history.len(), 10);
        assert_eq!(history[0], Turn::human("question 1"));
        assert_eq!(history[8], Turn::human("question 5"));
        assert_eq!(history[9], Turn::ai("- noted"));
    }

    #[tokio::test]
    async fn stored_text_is_trimmed() {
        let coach = coach(Scripted::new("- ok"));
        coach.handle("u1", "  spaced out  ").await;
        let history = coach.history("u1").expect("history");
        assert_eq!(history[1], Turn::human("spaced out"));
    }

    #[test]
    fn context_is_last_four_turns() {
        let mut window = TurnWindow::new(10);
        window.push(Turn::ai(SEED_GREETING));
        window.push(Turn::human("q1"));
        window.push(Turn::ai("a1"));
        window.push(Turn::human("q2"));
        window.push(Turn::ai("a2"));
        window.push(Turn::human("q3"));

        let context = context_messages(&window, 4);
        let contents: Vec<_> = context.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a1", "q2", "a2", "q3"]);
        assert_eq!(context[0].role, Role::Assistant);
        assert_eq!(context[3].role, Role::User);
    }
}
