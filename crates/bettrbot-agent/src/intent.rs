//! Rule-based pre-filter that answers without calling the provider.
//!
//! Profanity matching is substring-based (`"mad"` also matches `"made"`);
//! quick replies only fire on an exact, trimmed, lower-cased match.

use bettrbot_sessions::TurnWindow;

pub const EMPTY_CONVERSATION_REPLY: &str = "Hi! How can I assist you today?";

pub const DEESCALATION_REPLY: &str = "- I can hear that you're feeling upset. I'm here to support you.\n\
     - Let's keep our conversation respectful so I can better help you. \
     Could you share what happened in a calmer way?";

pub const BLOCKED_TERMS: &[&str] = &[
    "stupid", "idiot", "sucks", "hate", "terrible", "worst", "useless", "waste", "dumb",
    "screw you", "fuck", "shit", "asshole", "bitch", "damn", "mad", "crap",
];

pub const QUICK_REPLIES: &[(&str, &str)] = &[
    ("hi", "Hello! How can I help you today?"),
    ("hello", "Hi there! What would you like to work on?"),
    ("hey", "Hey! I'm here to help with your communication skills."),
    ("thanks", "You're welcome! Is there anything else I can help you with?"),
    ("thank you", "You're welcome! How can I assist you further?"),
];

/// Outcome of classifying the latest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Fixed reply, no provider call.
    Canned(&'static str),
    /// Ask the provider. Carries the trimmed, lower-cased message.
    Generate(String),
}

pub fn is_inappropriate(text: &str) -> bool {
    let lower = text.to_lowercase();
    BLOCKED_TERMS.iter().any(|term| lower.contains(term))
}

/// Exact-match lookup; `text` must already be normalized.
pub fn quick_reply(text: &str) -> Option<&'static str> {
    QUICK_REPLIES
        .iter()
        .find(|(key, _)| *key == text)
        .map(|(_, reply)| *reply)
}

/// Decide how to answer a conversation whose newest human turn is the
/// message being handled.
pub fn classify(conversation: &TurnWindow) -> Intent {
    if conversation.is_empty() {
        return Intent::Canned(EMPTY_CONVERSATION_REPLY);
    }

    let message = conversation
        .latest_human()
        .unwrap_or_default()
        .to_lowercase()
        .trim()
        .to_string();

    if is_inappropriate(&message) {
        return Intent::Canned(DEESCALATION_REPLY);
    }
    if let Some(reply) = quick_reply(&message) {
        return Intent::Canned(reply);
    }
    Intent::Generate(message)
}
