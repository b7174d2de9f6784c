//! Bounded, thread-safe conversation history.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_MAX_EXCHANGES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One side of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Keeps the last `max_exchanges` user/assistant pairs.
///
/// A single mutex guards every operation. Operations are bounded deque
/// manipulations and never hold the lock across I/O.
#[derive(Debug)]
pub struct ConversationStore {
    turns: Mutex<VecDeque<Turn>>,
    max_exchanges: usize,
}

impl ConversationStore {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            turns: Mutex::new(VecDeque::with_capacity(max_exchanges * 2 + 2)),
            max_exchanges,
        }
    }

    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    /// Appends one exchange, evicting the oldest pair once more than
    /// `2 * max_exchanges` turns are held.
    pub fn append(&self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        let mut turns = self.lock();
        turns.push_back(Turn {
            role: Role::User,
            content: user_text.into(),
        });
        turns.push_back(Turn {
            role: Role::Assistant,
            content: assistant_text.into(),
        });
        while turns.len() > self.max_exchanges * 2 {
            turns.pop_front();
            turns.pop_front();
        }
    }

    /// Copy of the history, oldest turn first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored exchanges (pairs).
    pub fn len(&self) -> usize {
        self.lock().len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Turn>> {
        // The guarded deque stays structurally valid even if a holder panicked.
        self.turns.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}
