//! xbzchat client runtime
//!
//! Drives a Sans-IO [`xbzchat_core::Session`] over real WebSockets. The
//! runtime is one tokio task that owns the session and serialises caller
//! commands, transport events and timer expiry through `tokio::select!`.
//!
//! # Components
//!
//! - [`Runtime`] / [`SessionHandle`]: the driver task and its caller handle
//! - [`SessionHandler`]: callbacks for open, close and incoming messages
//! - [`ChatLog`]: view model of what a chat screen shows
//! - [`transport`]: the [`Connector`] seam and its WebSocket implementation
//! - [`SystemEnv`]: tokio clock for the runtime

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chat_log;
pub mod handler;
pub mod runtime;
pub mod system_env;
pub mod transport;

pub use chat_log::{ChatLog, describe};
pub use handler::SessionHandler;
pub use runtime::{Runtime, RuntimeError, SessionHandle, connect_ws};
pub use system_env::SystemEnv;
pub use transport::{Connector, Link, LinkCommand, TransportError, TransportEvent, WsConnector};
