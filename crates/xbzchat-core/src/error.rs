//! Error types for session construction.
//!
//! A running session has no fatal errors: transport failures, malformed
//! frames and heartbeat timeouts all heal through reconnect. Errors only
//! exist where a caller hands us something unusable up front.

use std::time::Duration;

use thiserror::Error;

/// Errors raised when building a [`crate::Session`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Nickname is empty or whitespace
    #[error("nickname must not be empty")]
    EmptyNickname,

    /// Endpoint is not a usable WebSocket URL
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as given
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// A timer would be zero-length
    #[error("{name} must be non-zero")]
    ZeroDuration {
        /// Config field name
        name: &'static str,
    },

    /// A timer exceeds [`crate::config::MAX_TIMER`]
    #[error("{name} must not exceed {max:?}")]
    DurationTooLong {
        /// Config field name
        name: &'static str,
        /// Largest accepted duration
        max: Duration,
    },

    /// Pong deadline would outlive the heartbeat interval
    #[error("pong timeout {pong_timeout:?} must be shorter than heartbeat interval {heartbeat_interval:?}")]
    PongTimeoutTooLong {
        /// Configured pong timeout
        pong_timeout: Duration,
        /// Configured heartbeat interval
        heartbeat_interval: Duration,
    },
}
