//! Server to client frames.
//!
//! # Invariants
//!
//! Each frame carries exactly one `type` tag. Unrecognized tags decode to
//! [`Inbound::Unknown`] instead of failing, so only genuinely malformed frames
//! (bad JSON, missing tag, wrong field types) are errors.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Prefix marking chat content that references an uploaded image.
const IMAGE_PREFIX: &str = "[img:";

/// Suffix closing an image reference.
const IMAGE_SUFFIX: &str = "]";

/// Frames sent by the chat server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Live chat message from a user
    Message(ChatMessage),
    /// Server notice (joins, leaves, announcements)
    System(SystemMessage),
    /// Past message replayed at session start, one frame per item
    History(ChatMessage),
    /// Full set of nicknames currently connected
    OnlineUsers {
        /// Nicknames in server order
        users: Vec<String>,
    },
    /// Heartbeat acknowledgment
    Pong,
    /// Any tag this client does not understand
    #[serde(other)]
    Unknown,
}

impl Inbound {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the text is not a JSON object with a
    ///   string `type` tag, or a known variant is missing required fields
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::malformed(&e))
    }

    /// Encode as a text frame (server side and test fixtures).
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

/// A message written by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author nickname
    pub nickname: String,
    /// Message body
    pub content: String,
    /// Server-assigned timestamp, passed through verbatim
    pub timestamp: String,
}

impl ChatMessage {
    /// Create a chat message.
    pub fn new(
        nickname: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self { nickname: nickname.into(), content: content.into(), timestamp: timestamp.into() }
    }

    /// Image ID if the content is an image reference (`[img:<id>]`).
    #[must_use]
    pub fn image_id(&self) -> Option<&str> {
        self.content
            .strip_prefix(IMAGE_PREFIX)
            .and_then(|rest| rest.strip_suffix(IMAGE_SUFFIX))
            .filter(|id| !id.is_empty())
    }
}

/// Server-generated notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMessage {
    /// Nickname the notice is about, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Notice text
    pub content: String,
    /// Server-assigned timestamp
    #[serde(default)]
    pub timestamp: String,
}

/// Messages delivered to the caller in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Chat message
    Chat(ChatMessage),
    /// System notice
    System(SystemMessage),
}

impl Message {
    /// Message body.
    pub fn content(&self) -> &str {
        match self {
            Self::Chat(msg) => &msg.content,
            Self::System(msg) => &msg.content,
        }
    }

    /// Server timestamp.
    pub fn timestamp(&self) -> &str {
        match self {
            Self::Chat(msg) => &msg.timestamp,
            Self::System(msg) => &msg.timestamp,
        }
    }
}

/// Server path serving an uploaded image.
pub fn image_path(image_id: &str) -> String {
    format!("/xbzchat/v1/image/{image_id}")
}
