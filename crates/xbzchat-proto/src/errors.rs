//! Protocol errors.

use thiserror::Error;

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not valid JSON or does not match any known shape
    #[error("malformed frame: {reason}")]
    Malformed {
        /// Decoder error description
        reason: String,
    },

    /// Frame could not be serialized
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl ProtocolError {
    pub(crate) fn malformed(err: &serde_json::Error) -> Self {
        Self::Malformed { reason: err.to_string() }
    }
}
