//! Wire protocol
//!
//! JSON frames exchanged with the chat server over a single WebSocket. Every
//! text frame carries exactly one JSON object.
//!
//! # Inbound
//!
//! Server frames are tagged by a `type` field and decode into [`Inbound`]:
//! chat messages, system notices, replayed history items, the online user set
//! and heartbeat pongs. Tags this crate does not know decode to
//! [`Inbound::Unknown`] so newer servers never break older clients.
//!
//! # Outbound
//!
//! Client frames ([`Outbound`]) are untagged objects: the identify frame is
//! `{"nickname": ..}`, a chat send is `{"content": ..}` and only the ping
//! carries a tag (`{"type":"ping"}`).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod inbound;
pub mod outbound;

pub use errors::{ProtocolError, Result};
pub use inbound::{ChatMessage, Inbound, Message, SystemMessage, image_path};
pub use outbound::Outbound;
