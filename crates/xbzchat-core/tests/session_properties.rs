//! Property-based tests for the Session state machine.
//!
//! Drives the session with arbitrary interleavings of caller intents,
//! transport events, visibility changes and clock advances, and checks the
//! channel invariants after every step.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use xbzchat_core::{ConnectionId, Session, SessionAction, SessionConfig, SessionEvent, SessionState};

/// Which connection a transport event claims to come from.
#[derive(Debug, Clone, Copy)]
enum Target {
    Current,
    Stale(u64),
}

#[derive(Debug, Clone)]
enum Op {
    Connect,
    Send,
    Close,
    Opened(Target),
    Frame(Target, &'static str),
    Closed(Target),
    Error(Target),
    Visible(bool),
    Resumed,
    Advance(u64),
}

const FRAMES: &[&str] = &[
    r#"{"type":"pong"}"#,
    r#"{"type":"message","nickname":"x","content":"yo","timestamp":"t"}"#,
    r#"{"type":"history","nickname":"x","content":"old","timestamp":"t"}"#,
    r#"{"type":"online_users","users":["x"]}"#,
    r#"{"type":"typing"}"#,
    "{garbage",
];

fn target_strategy() -> impl Strategy<Value = Target> {
    prop_oneof![
        4 => Just(Target::Current),
        1 => (1u64..8).prop_map(Target::Stale),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Connect),
        2 => Just(Op::Send),
        1 => Just(Op::Close),
        3 => target_strategy().prop_map(Op::Opened),
        4 => (target_strategy(), prop::sample::select(FRAMES)).prop_map(|(t, f)| Op::Frame(t, f)),
        1 => target_strategy().prop_map(Op::Closed),
        1 => target_strategy().prop_map(Op::Error),
        1 => any::<bool>().prop_map(Op::Visible),
        1 => Just(Op::Resumed),
        4 => (0u64..30_000).prop_map(Op::Advance),
    ]
}

/// Base instant; the properties only ever add durations to it.
#[allow(clippy::disallowed_methods)]
fn t0() -> Instant {
    Instant::now()
}

fn resolve(session: &Session, target: Target) -> ConnectionId {
    match (target, session.connection_id()) {
        (Target::Current, Some(id)) => id,
        (Target::Current, None) => ConnectionId::new(0),
        (Target::Stale(raw), _) => ConnectionId::new(raw),
    }
}

fn to_event(session: &Session, op: &Op) -> SessionEvent {
    match op {
        Op::Connect => SessionEvent::Connect,
        Op::Send => SessionEvent::Send { content: "hi".to_string() },
        Op::Close => SessionEvent::Close,
        Op::Opened(t) => SessionEvent::TransportOpened { id: resolve(session, *t) },
        Op::Frame(t, text) => {
            SessionEvent::FrameReceived { id: resolve(session, *t), text: (*text).to_string() }
        },
        Op::Closed(t) => {
            SessionEvent::TransportClosed { id: resolve(session, *t), reason: "closed".into() }
        },
        Op::Error(t) => {
            SessionEvent::TransportError { id: resolve(session, *t), reason: "error".into() }
        },
        Op::Visible(visible) => SessionEvent::VisibilityChanged { visible: *visible },
        Op::Resumed => SessionEvent::Resumed,
        Op::Advance(_) => SessionEvent::Tick,
    }
}

proptest! {
    #[test]
    fn prop_session_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let config = SessionConfig::with_endpoint("ws://chat.test/xbzchat/ws");
        let mut session: Session = Session::new("tom", config).unwrap();
        let mut now = t0();
        let mut last_opened: Option<ConnectionId> = None;

        for op in &ops {
            if let Op::Advance(ms) = op {
                now += Duration::from_millis(*ms);
            }
            let event = to_event(&session, op);
            let actions = session.handle(event, now);

            for action in &actions {
                match action {
                    SessionAction::OpenTransport { id, .. } => {
                        // handles are fresh and strictly increasing
                        if let Some(prev) = last_opened {
                            prop_assert!(*id > prev);
                        }
                        last_opened = Some(*id);
                    },
                    SessionAction::Send { id, .. } => {
                        prop_assert_eq!(session.state(), SessionState::Open);
                        prop_assert_eq!(Some(*id), session.connection_id());
                    },
                    SessionAction::CloseTransport { .. } | SessionAction::Notify(_) => {},
                }
            }

            let opens = actions
                .iter()
                .filter(|a| matches!(a, SessionAction::OpenTransport { .. }))
                .count();
            prop_assert!(opens <= 1, "more than one transport opened in one step");

            // at most one live handle, and it is the newest one
            if session.state().is_live() {
                prop_assert_eq!(session.connection_id(), last_opened);
            }
            if session.state() == SessionState::Closed || session.state() == SessionState::Idle {
                prop_assert_eq!(session.connection_id(), None);
            }

            // closing disarms everything until the next connect
            if !session.wants_live() {
                prop_assert_eq!(session.next_deadline(), None);
            }

            if let Some(deadline) = session.next_deadline() {
                prop_assert!(deadline > now);
            }
        }
    }

    #[test]
    fn prop_history_only_grows_within_a_connection(
        count in 0usize..20,
    ) {
        let config = SessionConfig::with_endpoint("ws://chat.test/xbzchat/ws");
        let mut session: Session = Session::new("tom", config).unwrap();
        let now = t0();
        session.connect(now);
        let id = session.connection_id().unwrap();
        session.handle(SessionEvent::TransportOpened { id }, now);

        for i in 0..count {
            let text = format!(
                r#"{{"type":"history","nickname":"x","content":"m{i}","timestamp":"t{i}"}}"#
            );
            session.handle(SessionEvent::FrameReceived { id, text }, now);
        }

        prop_assert_eq!(session.history().len(), count);
        for (i, item) in session.history().items().iter().enumerate() {
            prop_assert_eq!(&item.content, &format!("m{i}"));
        }
    }
}
