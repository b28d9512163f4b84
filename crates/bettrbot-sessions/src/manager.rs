use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::types::{Turn, TurnWindow};

/// In-memory store of per-user conversations.
///
/// Each append runs under the map's shard lock, so a single push is atomic.
/// Nothing is held between the human append and the ai append: two concurrent
/// requests for the same user may interleave their turns. Conversations live
/// until the process exits.
pub struct ConversationStore {
    conversations: DashMap<String, TurnWindow>,
    capacity: usize,
    greeting: String,
}

impl ConversationStore {
    /// `capacity` is the per-user turn cap; `greeting` seeds every new
    /// conversation as its first ai turn.
    pub fn new(capacity: usize, greeting: impl Into<String>) -> Self {
        Self {
            conversations: DashMap::new(),
            capacity,
            greeting: greeting.into(),
        }
    }

    /// Append a human turn, creating and seeding the conversation on first
    /// contact. Returns a snapshot that includes the new turn.
    #[instrument(skip(self, text))]
    pub fn record_human(&self, user_id: &str, text: &str) -> TurnWindow {
        let mut entry = self
            .conversations
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!("new conversation");
                let mut window = TurnWindow::new(self.capacity);
                window.push(Turn::ai(self.greeting.clone()));
                window
            });
        entry.push(Turn::human(text));
        entry.clone()
    }

    /// Append an ai turn. The window's capacity drops the oldest turns.
    #[instrument(skip(self, text))]
    pub fn record_ai(&self, user_id: &str, text: &str) {
        self.conversations
            .entry(user_id.to_string())
            .or_insert_with(|| TurnWindow::new(self.capacity))
            .push(Turn::ai(text));
    }

    /// Snapshot of a user's conversation, oldest turn first.
    pub fn history(&self, user_id: &str) -> Option<Vec<Turn>> {
        self.conversations.get(user_id).map(|w| w.to_vec())
    }

    /// Number of users with a live conversation.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
