//! Bounded, ordered message history.
//!
//! Holds the most recent `capacity` accepted messages in receipt order.
//! Appending at capacity evicts the oldest entry. Not internally
//! synchronized; the relay owns it behind its own lock.

use std::collections::VecDeque;

use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::message::Message;

/// FIFO ring of the latest accepted messages.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of zero retains nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            // Cap the up-front allocation; large capacities grow on demand.
            messages: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a message, returning the entry evicted to make room (if any).
    ///
    /// With zero capacity the pushed message itself is returned.
    pub fn push(&mut self, message: Message) -> Option<Message> {
        if self.capacity == 0 {
            return Some(message);
        }
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// Copy of the current contents, oldest-first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Iterate oldest-first without copying.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Most recently appended message.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Maximum number of retained messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
