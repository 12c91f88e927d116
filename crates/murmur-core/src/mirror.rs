//! Client-side view of the conversation.
//!
//! A [`ClientMirror`] is what a chat client keeps locally: the messages it has
//! seen, newest-first for display. A `history` frame replaces the whole view;
//! a `message` frame is prepended. It shares nothing with the server's buffer.

use std::collections::VecDeque;

use crate::message::Message;
use crate::protocol::ServerEvent;

/// Local newest-first message list plus the local user's display name.
#[derive(Clone, Debug, Default)]
pub struct ClientMirror {
    own_name: String,
    messages: VecDeque<Message>,
}

impl ClientMirror {
    /// Create an empty mirror for the user called `own_name`.
    pub fn new(own_name: impl Into<String>) -> Self {
        Self {
            own_name: own_name.into(),
            messages: VecDeque::new(),
        }
    }

    /// Fold one server event into the view.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::History { messages } => {
                self.messages = messages.into_iter().rev().collect();
            }
            ServerEvent::Message { message } => self.messages.push_front(message),
        }
    }

    /// Parse a raw server frame and fold it in.
    ///
    /// On a parse error the view is left unchanged.
    pub fn apply_json(&mut self, raw: &str) -> Result<(), serde_json::Error> {
        let event = ServerEvent::from_json(raw)?;
        self.apply(event);
        Ok(())
    }

    /// Messages newest-first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// The newest message, if any.
    pub fn newest(&self) -> Option<&Message> {
        self.messages.front()
    }

    /// Number of messages in view.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The local user's display name.
    pub fn own_name(&self) -> &str {
        &self.own_name
    }

    /// Whether `message` was sent under the local user's name.
    pub fn is_own(&self, message: &Message) -> bool {
        message.sender() == self.own_name
    }
}
