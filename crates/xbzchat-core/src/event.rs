//! Session events and actions.

use std::fmt;

use xbzchat_proto::{ChatMessage, Message, Outbound};

/// Identity of one transport attempt.
///
/// Every `connect` allocates a fresh, strictly increasing ID. Transport
/// events carry the ID they belong to; events for any ID other than the
/// current one come from a superseded connection and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw ID.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events the driver feeds into the session.
///
/// The driver is responsible for:
/// - Forwarding caller intents (connect, send, close)
/// - Reporting transport events tagged with their [`ConnectionId`]
/// - Forwarding visibility and resume signals from the host
/// - Ticking when [`crate::Session::next_deadline`] passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Caller wants a live session.
    Connect,

    /// Caller wants to send a chat message.
    Send {
        /// Message body.
        content: String,
    },

    /// Caller tears the session down.
    Close,

    /// Transport finished its handshake.
    TransportOpened {
        /// Connection the event belongs to.
        id: ConnectionId,
    },

    /// Text frame received.
    FrameReceived {
        /// Connection the frame arrived on.
        id: ConnectionId,
        /// Raw frame text.
        text: String,
    },

    /// Transport closed.
    TransportClosed {
        /// Connection that closed.
        id: ConnectionId,
        /// Close reason for logging.
        reason: String,
    },

    /// Transport failed.
    TransportError {
        /// Connection that failed.
        id: ConnectionId,
        /// Error description for logging.
        reason: String,
    },

    /// Host visibility changed.
    VisibilityChanged {
        /// True when the owner is visible to the user.
        visible: bool,
    },

    /// Host resumed from suspension.
    Resumed,

    /// Time passed; fire expired timers.
    Tick,
}

/// Notifications for the caller, one per callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Connection opened and identified.
    Opened,
    /// Connection closed or was replaced.
    Closed,
    /// Chat or system message, in arrival order.
    Message(Message),
    /// One replayed history item.
    HistoryItem(ChatMessage),
    /// Full current membership, replacing any previous set.
    OnlineUsers(Vec<String>),
}

/// Actions returned by the session for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a new transport to `url` and report its events under `id`.
    OpenTransport {
        /// Identity of the new connection.
        id: ConnectionId,
        /// WebSocket URL.
        url: String,
    },

    /// Send a frame on connection `id`.
    Send {
        /// Connection to send on.
        id: ConnectionId,
        /// Frame to encode and send.
        frame: Outbound,
    },

    /// Close connection `id`.
    CloseTransport {
        /// Connection to close.
        id: ConnectionId,
        /// Reason for closing.
        reason: String,
    },

    /// Tell the caller something happened.
    Notify(Notification),
}
