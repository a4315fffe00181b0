//! Client to server frames.
//!
//! The server distinguishes client frames by shape rather than by tag, so
//! serialization is hand-written: each variant is a single-key object.

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Announce the nickname, once per connection right after open
    Identify {
        /// Session identity
        nickname: String,
    },
    /// User-authored chat message
    Chat {
        /// Message body
        content: String,
    },
    /// Liveness probe, answered by a pong
    Ping,
}

impl Outbound {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decode a client frame (server side and test fixtures).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the frame is not an object matching one
    ///   of the three shapes
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| ProtocolError::malformed(&e))?;

        let Value::Object(map) = value else {
            return Err(ProtocolError::Malformed { reason: "expected object".to_string() });
        };

        if map.get("type").and_then(Value::as_str) == Some("ping") {
            return Ok(Self::Ping);
        }
        if let Some(nickname) = map.get("nickname").and_then(Value::as_str) {
            return Ok(Self::Identify { nickname: nickname.to_string() });
        }
        if let Some(content) = map.get("content").and_then(Value::as_str) {
            return Ok(Self::Chat { content: content.to_string() });
        }

        Err(ProtocolError::Malformed { reason: "unrecognized client frame".to_string() })
    }
}

impl Serialize for Outbound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Identify { nickname } => map.serialize_entry("nickname", nickname)?,
            Self::Chat { content } => map.serialize_entry("content", content)?,
            Self::Ping => map.serialize_entry("type", "ping")?,
        }
        map.end()
    }
}
