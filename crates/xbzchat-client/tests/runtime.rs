//! Runtime tests on tokio's paused clock.
//!
//! A mock connector hands each link's channels to the test, which plays the
//! server side. Timers run on virtual time, so heartbeat and probe deadlines
//! elapse instantly.

use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};
use xbzchat_client::{
    Connector, Link, LinkCommand, Runtime, RuntimeError, SessionHandle, SessionHandler, SystemEnv,
    TransportEvent,
};
use xbzchat_core::{
    ChatMessage, ConnectionId, Message, Notification, Session, SessionConfig, env::Environment,
};

const URL: &str = "ws://chat.test/xbzchat/ws";
const PING: &str = r#"{"type":"ping"}"#;
const PONG: &str = r#"{"type":"pong"}"#;

/// Server side of one mock link.
struct MockLink {
    id: ConnectionId,
    url: String,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockLink {
    fn open(&self) {
        self.events.send(TransportEvent::Opened(self.id)).unwrap();
    }

    fn frame(&self, text: &str) {
        self.events.send(TransportEvent::Frame(self.id, text.to_string())).unwrap();
    }

    async fn next(&mut self) -> LinkCommand {
        self.commands.recv().await.unwrap()
    }
}

struct MockConnector {
    opened: mpsc::UnboundedSender<MockLink>,
}

impl Connector for MockConnector {
    fn open(
        &mut self,
        id: ConnectionId,
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Link {
        let (tx, rx) = mpsc::unbounded_channel();
        self.opened
            .send(MockLink { id, url: url.to_string(), commands: rx, events })
            .unwrap();
        Link::new(tx)
    }
}

/// Forwards every notification to the test.
struct Recorder {
    notes: mpsc::UnboundedSender<Notification>,
}

impl SessionHandler for Recorder {
    fn on_open(&mut self) {
        let _ = self.notes.send(Notification::Opened);
    }

    fn on_close(&mut self) {
        let _ = self.notes.send(Notification::Closed);
    }

    fn on_message(&mut self, message: Message) {
        let _ = self.notes.send(Notification::Message(message));
    }

    fn on_history_item(&mut self, item: ChatMessage) {
        let _ = self.notes.send(Notification::HistoryItem(item));
    }

    fn on_online_users(&mut self, users: Vec<String>) {
        let _ = self.notes.send(Notification::OnlineUsers(users));
    }
}

struct Harness {
    handle: SessionHandle,
    task: JoinHandle<Recorder>,
    opened: mpsc::UnboundedReceiver<MockLink>,
    notes: mpsc::UnboundedReceiver<Notification>,
}

impl Harness {
    fn start(config: SessionConfig) -> Self {
        let (opened_tx, opened) = mpsc::unbounded_channel();
        let (notes_tx, notes) = mpsc::unbounded_channel();
        let session = Session::new("tom", config).unwrap();
        let (handle, task) = Runtime::spawn(
            SystemEnv::new(),
            session,
            MockConnector { opened: opened_tx },
            Recorder { notes: notes_tx },
        );
        Self { handle, task, opened, notes }
    }

    /// Connect and complete the handshake, consuming the identify frame.
    async fn connect(&mut self) -> MockLink {
        self.handle.connect().unwrap();
        let mut link = self.opened.recv().await.unwrap();
        link.open();
        assert_eq!(link.next().await, text(r#"{"nickname":"tom"}"#));
        assert_eq!(self.note().await, Notification::Opened);
        link
    }

    async fn note(&mut self) -> Notification {
        self.notes.recv().await.unwrap()
    }
}

fn quiet() -> SessionConfig {
    SessionConfig { periodic_check: false, ..SessionConfig::with_endpoint(URL) }
}

fn text(s: &str) -> LinkCommand {
    LinkCommand::Text(s.to_string())
}

#[tokio::test(start_paused = true)]
async fn open_identifies_then_sends_chat() {
    let mut h = Harness::start(quiet());
    let mut link = h.connect().await;
    assert_eq!(link.url, URL);

    h.handle.send("hi").unwrap();
    assert_eq!(link.next().await, text(r#"{"content":"hi"}"#));

    h.handle.shutdown().unwrap();
    h.task.await.unwrap();
    assert_eq!(link.next().await, LinkCommand::Close("closed by caller".to_string()));
}

#[tokio::test(start_paused = true)]
async fn send_before_open_is_dropped() {
    let mut h = Harness::start(quiet());
    h.handle.connect().unwrap();
    let mut link = h.opened.recv().await.unwrap();

    h.handle.send("early").unwrap();
    link.open();
    assert_eq!(link.next().await, text(r#"{"nickname":"tom"}"#));

    h.handle.send("late").unwrap();
    assert_eq!(link.next().await, text(r#"{"content":"late"}"#));
}

#[tokio::test(start_paused = true)]
async fn incoming_frames_reach_handler_in_order() {
    let mut h = Harness::start(quiet());
    let link = h.connect().await;

    link.frame(r#"{"type":"online_users","users":["tom","x"]}"#);
    link.frame(r#"{"type":"history","nickname":"tom","content":"hi","timestamp":"t1"}"#);
    link.frame(r#"{"type":"history","nickname":"x","content":"yo","timestamp":"t2"}"#);
    link.frame("not json");
    link.frame(r#"{"type":"message","nickname":"x","content":"sup","timestamp":"t3"}"#);

    assert_eq!(
        h.note().await,
        Notification::OnlineUsers(vec!["tom".to_string(), "x".to_string()])
    );
    assert_eq!(h.note().await, Notification::HistoryItem(ChatMessage::new("tom", "hi", "t1")));
    assert_eq!(h.note().await, Notification::HistoryItem(ChatMessage::new("x", "yo", "t2")));
    assert_eq!(
        h.note().await,
        Notification::Message(Message::Chat(ChatMessage::new("x", "sup", "t3")))
    );
}

#[tokio::test(start_paused = true)]
async fn heartbeat_answered_keeps_connection() {
    let env = SystemEnv::new();
    let mut h = Harness::start(quiet());
    let start = env.now();
    let mut link = h.connect().await;

    assert_eq!(link.next().await, text(PING));
    assert!(env.now() - start >= Duration::from_secs(20));
    link.frame(PONG);

    // next thing on the wire is the following heartbeat, not a close
    assert_eq!(link.next().await, text(PING));
    assert!(env.now() - start >= Duration::from_secs(40));
}

#[tokio::test(start_paused = true)]
async fn missed_pong_reconnects_once_after_delay() {
    let env = SystemEnv::new();
    let mut h = Harness::start(quiet());
    let start = env.now();
    let mut link = h.connect().await;

    assert_eq!(link.next().await, text(PING));
    assert_eq!(link.next().await, LinkCommand::Close("pong timeout".to_string()));
    let closed_at = env.now() - start;
    assert!(closed_at >= Duration::from_secs(25) && closed_at < Duration::from_secs(26));
    assert_eq!(h.note().await, Notification::Closed);

    let second = h.opened.recv().await.unwrap();
    assert!(env.now() - start >= Duration::from_secs(26));
    assert_ne!(second.id, link.id);

    // stale frames from the first link are ignored
    link.frame(r#"{"type":"online_users","users":["ghost"]}"#);
    second.open();
    assert_eq!(h.note().await, Notification::Opened);
    second.frame(r#"{"type":"online_users","users":["tom"]}"#);
    assert_eq!(h.note().await, Notification::OnlineUsers(vec!["tom".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn unanswered_visibility_probe_replaces_connection() {
    let env = SystemEnv::new();
    let mut h = Harness::start(quiet());
    let mut link = h.connect().await;

    h.handle.set_visible(false).unwrap();
    h.handle.set_visible(true).unwrap();
    assert_eq!(link.next().await, text(PING));
    let probed_at = env.now();

    assert_eq!(link.next().await, LinkCommand::Close("probe timeout".to_string()));
    assert!(env.now() - probed_at >= Duration::from_secs(3));
    assert_eq!(h.note().await, Notification::Closed);

    let second = h.opened.recv().await.unwrap();
    assert_ne!(second.id, link.id);
}

#[tokio::test(start_paused = true)]
async fn answered_resume_probe_keeps_connection() {
    let mut h = Harness::start(quiet());
    let mut link = h.connect().await;

    h.handle.resumed().unwrap();
    assert_eq!(link.next().await, text(PING));
    link.frame(PONG);

    // only the heartbeat follows
    assert_eq!(link.next().await, text(PING));
    assert!(h.opened.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn caller_close_waits_for_transport_then_stays_closed() {
    let mut h = Harness::start(SessionConfig::with_endpoint(URL));
    let mut link = h.connect().await;

    h.handle.close().unwrap();
    assert_eq!(link.next().await, LinkCommand::Close("closed by caller".to_string()));
    link.events.send(TransportEvent::Closed(link.id, "bye".to_string())).unwrap();
    assert_eq!(h.note().await, Notification::Closed);

    // no timers left: a minute passes without any reconnect
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(h.opened.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn handle_fails_after_shutdown() {
    let h = Harness::start(quiet());
    h.handle.shutdown().unwrap();
    h.task.await.unwrap();

    assert_eq!(h.handle.connect(), Err(RuntimeError::Stopped));
}
