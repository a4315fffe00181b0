//! History replayed on the current connection.

use xbzchat_proto::ChatMessage;

/// History items in arrival order.
///
/// The server replays full history on every session start, so the buffer is
/// cleared whenever a new connection attempt begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryBuffer {
    items: Vec<ChatMessage>,
}

impl HistoryBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn push(&mut self, item: ChatMessage) {
        self.items.push(item);
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items in arrival order.
    pub fn items(&self) -> &[ChatMessage] {
        &self.items
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing has been replayed yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
