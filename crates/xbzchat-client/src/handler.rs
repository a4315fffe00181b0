//! Caller callbacks.

use xbzchat_core::{ChatMessage, Message, Notification};

/// Receives session notifications on the runtime task.
///
/// Every method defaults to a no-op, so a handler implements only what it
/// displays. Callbacks run inline on the runtime task and must not block.
pub trait SessionHandler: Send + 'static {
    /// Connection opened and the nickname was sent.
    fn on_open(&mut self) {}

    /// Connection closed. A reconnect may follow.
    fn on_close(&mut self) {}

    /// Live chat or system message.
    fn on_message(&mut self, message: Message) {
        let _ = message;
    }

    /// One replayed history item, in server order.
    fn on_history_item(&mut self, item: ChatMessage) {
        let _ = item;
    }

    /// Full current membership. Replaces any previous set.
    fn on_online_users(&mut self, users: Vec<String>) {
        let _ = users;
    }
}

/// Route one notification to its callback.
pub(crate) fn dispatch<H: SessionHandler + ?Sized>(handler: &mut H, notification: Notification) {
    match notification {
        Notification::Opened => handler.on_open(),
        Notification::Closed => handler.on_close(),
        Notification::Message(message) => handler.on_message(message),
        Notification::HistoryItem(item) => handler.on_history_item(item),
        Notification::OnlineUsers(users) => handler.on_online_users(users),
    }
}
