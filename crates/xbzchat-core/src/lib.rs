//! Session manager
//!
//! Sans-IO state machine for one reconnecting, heartbeat-monitored chat
//! channel. Methods take the current time as input and return
//! [`SessionAction`]s for a driver to execute, so the whole lifecycle
//! (connect, heartbeat, liveness probes, reconnect) is testable without
//! sockets or clocks.
//!
//! # Components
//!
//! - [`Session`]: connection state machine, heartbeat and probe timers
//! - [`SessionEvent`] / [`SessionAction`]: inputs and outputs of the machine
//! - [`Notification`]: what the caller gets told (open, close, messages)
//! - [`SessionConfig`]: timing constants and probe toggles
//! - [`HistoryBuffer`]: history items replayed on the current connection
//! - [`env::Environment`]: time abstraction used by drivers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod history;
pub mod session;

pub use config::{CHAT_PATH, SessionConfig, endpoint_for_origin};
pub use error::SessionError;
pub use event::{ConnectionId, Notification, SessionAction, SessionEvent};
pub use history::HistoryBuffer;
pub use session::{Session, SessionState};
pub use xbzchat_proto::{ChatMessage, Message, Outbound, SystemMessage};
