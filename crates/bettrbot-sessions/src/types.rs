use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Human,
    Ai,
}

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub text: String,
}

impl Turn {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            kind: TurnKind::Human,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            kind: TurnKind::Ai,
            text: text.into(),
        }
    }

    pub fn is_human(&self) -> bool {
        self.kind == TurnKind::Human
    }
}

/// Fixed-capacity, chronologically ordered buffer of turns.
///
/// Pushing onto a full window drops the oldest turn, so the window always
/// holds the most recent `capacity` turns in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnWindow {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl TurnWindow {
    /// A capacity of zero is bumped to one so the latest turn is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Turn> + ExactSizeIterator {
        self.turns.iter()
    }

    /// The most recent `n` turns, oldest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = &Turn> {
        self.turns.iter().skip(self.turns.len().saturating_sub(n))
    }

    /// Text of the most recent human turn, scanning from the end.
    pub fn latest_human(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.is_human())
            .map(|t| t.text.as_str())
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}

impl Extend<Turn> for TurnWindow {
    fn extend<I: IntoIterator<Item = Turn>>(&mut self, iter: I) {
        for turn in iter {
            self.push(turn);
        }
    }
}
