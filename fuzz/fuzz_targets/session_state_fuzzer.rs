//! Fuzz target for the Session state machine
//!
//! Ensure the connection guard and timer bookkeeping hold (HIGH priority)
//!
//! # Strategy
//!
//! - Caller intents: connect, send, close in any order
//! - Transport events: for the current connection and for stale IDs
//! - Frames: pongs, chat, history, garbage
//! - Time: arbitrary jumps followed by a tick
//!
//! # Invariants
//!
//! - At most one transport opened per step, with strictly increasing IDs
//! - Frames are only sent on the current connection while it is open
//! - No timer is left armed after close
//! - Every armed deadline lies in the future after a tick

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use xbzchat_core::{ConnectionId, Session, SessionAction, SessionConfig, SessionEvent, SessionState};

#[derive(Debug, Clone, Arbitrary)]
enum SessionOp {
    Connect,
    Send,
    Close,
    Opened { stale: Option<u8> },
    Frame { stale: Option<u8>, kind: FrameKind },
    Closed { stale: Option<u8> },
    Error { stale: Option<u8> },
    Visible(bool),
    Resumed,
    Advance { millis: u16 },
}

#[derive(Debug, Clone, Arbitrary)]
enum FrameKind {
    Pong,
    Chat,
    History,
    OnlineUsers,
    Garbage(String),
}

fuzz_target!(|ops: Vec<SessionOp>| {
    let config = SessionConfig::with_endpoint("ws://fuzz.test/xbzchat/ws");
    let mut session: Session = Session::new("fuzz", config).unwrap();
    let mut now = Instant::now();
    let mut last_opened: Option<ConnectionId> = None;

    for op in ops {
        let target = |stale: Option<u8>, session: &Session| match stale {
            Some(raw) => ConnectionId::new(u64::from(raw)),
            None => session.connection_id().unwrap_or(ConnectionId::new(0)),
        };

        let event = match op {
            SessionOp::Connect => SessionEvent::Connect,
            SessionOp::Send => SessionEvent::Send { content: "fuzz".to_string() },
            SessionOp::Close => SessionEvent::Close,
            SessionOp::Opened { stale } => {
                SessionEvent::TransportOpened { id: target(stale, &session) }
            },
            SessionOp::Frame { stale, kind } => SessionEvent::FrameReceived {
                id: target(stale, &session),
                text: match kind {
                    FrameKind::Pong => r#"{"type":"pong"}"#.to_string(),
                    FrameKind::Chat => {
                        r#"{"type":"message","nickname":"a","content":"b","timestamp":"c"}"#.to_string()
                    },
                    FrameKind::History => {
                        r#"{"type":"history","nickname":"a","content":"b","timestamp":"c"}"#.to_string()
                    },
                    FrameKind::OnlineUsers => r#"{"type":"online_users","users":["a"]}"#.to_string(),
                    FrameKind::Garbage(text) => text,
                },
            },
            SessionOp::Closed { stale } => SessionEvent::TransportClosed {
                id: target(stale, &session),
                reason: "fuzz".to_string(),
            },
            SessionOp::Error { stale } => SessionEvent::TransportError {
                id: target(stale, &session),
                reason: "fuzz".to_string(),
            },
            SessionOp::Visible(visible) => SessionEvent::VisibilityChanged { visible },
            SessionOp::Resumed => SessionEvent::Resumed,
            SessionOp::Advance { millis } => {
                now += Duration::from_millis(u64::from(millis));
                SessionEvent::Tick
            },
        };
        let is_tick = event == SessionEvent::Tick;

        let actions = session.handle(event, now);

        let mut opens = 0;
        for action in &actions {
            match action {
                SessionAction::OpenTransport { id, .. } => {
                    opens += 1;
                    if let Some(prev) = last_opened {
                        assert!(*id > prev, "connection IDs must increase");
                    }
                    last_opened = Some(*id);
                },
                SessionAction::Send { id, .. } => {
                    assert_eq!(session.state(), SessionState::Open);
                    assert_eq!(Some(*id), session.connection_id());
                },
                _ => {},
            }
        }
        assert!(opens <= 1, "opened {opens} transports in one step");

        if !session.wants_live() {
            assert_eq!(session.next_deadline(), None);
        }
        if is_tick {
            if let Some(deadline) = session.next_deadline() {
                assert!(deadline > now);
            }
        }
    }
});
