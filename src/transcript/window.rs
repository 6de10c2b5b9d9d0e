//! History windowing
//!
//! Bounds how much of the running conversation is forwarded to text
//! generation. The full transcript stays local.

use super::log::{Role, Transcript};
use serde::{Deserialize, Serialize};

/// Hard upper bound on forwarded turns
pub const MAX_HISTORY_TURNS: usize = 20;

/// One forwarded turn, as the text-generation collaborator receives it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryWindow {
    max_turns: usize,
}

impl HistoryWindow {
    /// Window of `max_turns`, clamped to `1..=MAX_HISTORY_TURNS`.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns: max_turns.clamp(1, MAX_HISTORY_TURNS),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Most recent chat turns, oldest first.
    pub fn recent_turns(&self, transcript: &Transcript) -> Vec<HistoryTurn> {
        let mut turns: Vec<HistoryTurn> = transcript
            .chat_messages()
            .rev()
            .take(self.max_turns)
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.message.clone(),
            })
            .collect();

        turns.reverse();
        turns
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(MAX_HISTORY_TURNS)
    }
}
