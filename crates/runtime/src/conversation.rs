//! Conversation history.

use crate::model::{Message, Role};

/// Ordered, append-only message history for one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All committed messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append the messages of a completed turn.
    pub(crate) fn commit(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// The tail of the history to replay to a model.
    ///
    /// Keeps at most `limit` messages and moves the start forward to the
    /// next user message so the replay never opens on an assistant reply or
    /// an orphaned tool result. With no limit, the whole history.
    pub fn window(&self, limit: Option<usize>) -> &[Message] {
        let Some(limit) = limit else {
            return &self.messages;
        };
        if self.messages.len() <= limit {
            return &self.messages;
        }

        let start = self.messages.len() - limit;
        let start = self.messages[start..]
            .iter()
            .position(|m| m.role == Role::User)
            .map_or(self.messages.len(), |offset| start + offset);

        &self.messages[start..]
    }
}
