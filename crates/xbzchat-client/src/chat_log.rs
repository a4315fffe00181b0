//! Chat view model.
//!
//! [`ChatLog`] keeps what a chat screen shows: the transcript, who is online
//! and whether the connection is being re-established. The server replays
//! full history on every session start, so the transcript is rebuilt from
//! scratch on each open.

use xbzchat_core::{ChatMessage, Message};
use xbzchat_proto::image_path;

use crate::handler::SessionHandler;

/// Transcript and presence for one chat screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    entries: Vec<Message>,
    online: Vec<String>,
    connected: bool,
    reconnecting: bool,
}

impl ChatLog {
    /// Empty log, not connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript in display order.
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// Users currently online.
    pub fn online(&self) -> &[String] {
        &self.online
    }

    /// True while the connection is open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True between a close and the next open.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }
}

impl SessionHandler for ChatLog {
    fn on_open(&mut self) {
        self.entries.clear();
        self.connected = true;
        self.reconnecting = false;
    }

    fn on_close(&mut self) {
        self.connected = false;
        self.reconnecting = true;
    }

    fn on_message(&mut self, message: Message) {
        self.entries.push(message);
    }

    fn on_history_item(&mut self, item: ChatMessage) {
        self.entries.push(Message::Chat(item));
    }

    fn on_online_users(&mut self, users: Vec<String>) {
        self.online = users;
    }
}

/// One transcript line for plain-text display.
///
/// Image references render as their fetch path.
pub fn describe(message: &Message) -> String {
    match message {
        Message::Chat(chat) => {
            let body = chat
                .image_id()
                .map_or_else(|| message.content().to_string(), |id| format!("<image {}>", image_path(id)));
            format!("[{}] {}: {body}", message.timestamp(), chat.nickname)
        },
        Message::System(_) => format!("* {}", message.content()),
    }
}
