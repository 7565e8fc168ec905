//! Per-conversation turn log

use super::entities::Turn;
use chrono::Duration;

/// Ordered log of the turns exchanged in one conversation.
///
/// Pure in-memory data structure. Callers are expected to guard it with
/// their own synchronisation; nothing here can fail.
///
/// Turns are kept strictly ordered by timestamp: a turn whose timestamp is
/// not later than the last one is re-stamped one microsecond after it.
/// Role alternation is not enforced, so consecutive user turns (e.g. a retry
/// after a failed request) are allowed.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end of the log
    pub fn append(&mut self, turn: Turn) {
        let turn = match self.turns.last() {
            Some(last) if turn.timestamp() <= last.timestamp() => {
                let next = last.timestamp() + Duration::microseconds(1);
                turn.restamped(next)
            }
            _ => turn,
        };
        self.turns.push(turn);
    }

    /// Empty the log. Always succeeds, even when it was already empty.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Read-only copy of the current turns
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Copy of at most the `n` most recent turns, oldest first
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
