//! Session state machine.
//!
//! Manages the connection lifecycle, heartbeat, liveness probes and
//! reconnects for one nickname. Uses the action pattern: methods take time as
//! input and return actions for the driver to execute. Timers are deadlines
//! owned by the session; the driver ticks when [`Session::next_deadline`]
//! passes.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ connect ┌────────────┐  opened   ┌──────┐  close   ┌─────────┐
//! │ Idle │────────>│ Connecting │──────────>│ Open │─────────>│ Closing │
//! └──────┘         └────────────┘           └──────┘          └─────────┘
//!                     ↑     │ closed/error     │ closed/error/     │ closed
//!                     │     ↓                  ↓ pong timeout      ↓
//!                     │  ┌────────┐<───────────┘              ┌────────┐
//!                     └──│ Closed │                           │ Closed │
//!          reconnect/    └────────┘                           └────────┘
//!          probe
//! ```
//!
//! # Pong matching
//!
//! Pongs carry no payload, so outstanding pings are queued in send order with
//! their owner (heartbeat or probe). The transport is ordered, so each pong
//! answers the oldest outstanding ping. A probe's pong can never satisfy the
//! heartbeat deadline or the other way around.

use std::{
    collections::VecDeque,
    ops::{Add, Sub},
    time::{Duration, Instant},
};

use xbzchat_proto::{Inbound, Message, Outbound};

use crate::{
    config::SessionConfig,
    error::SessionError,
    event::{ConnectionId, Notification, SessionAction, SessionEvent},
    history::HistoryBuffer,
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected
    Idle,
    /// Transport requested, waiting for open
    Connecting,
    /// Transport open and identified
    Open,
    /// Caller closed, waiting for the transport to confirm
    Closing,
    /// No transport
    Closed,
}

impl SessionState {
    /// True while a transport is connecting or open.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// Who sent an outstanding ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PingOwner {
    Heartbeat,
    Probe,
}

/// What asked for a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeTrigger {
    Visibility,
    Resume,
    Periodic,
}

/// Timer deadlines. `None` means disarmed.
#[derive(Debug, Clone)]
struct Timers<I> {
    /// Next heartbeat ping
    heartbeat: Option<I>,
    /// Heartbeat pong deadline
    pong_deadline: Option<I>,
    /// Probe pong deadline
    probe_deadline: Option<I>,
    /// Scheduled reconnect attempt
    reconnect: Option<I>,
    /// Next periodic liveness check
    liveness_check: Option<I>,
}

impl<I: Copy + Ord> Timers<I> {
    fn new() -> Self {
        Self {
            heartbeat: None,
            pong_deadline: None,
            probe_deadline: None,
            reconnect: None,
            liveness_check: None,
        }
    }

    /// Disarm timers bound to the current connection.
    fn clear_connection(&mut self) {
        self.heartbeat = None;
        self.pong_deadline = None;
        self.probe_deadline = None;
    }

    fn earliest(&self) -> Option<I> {
        [self.heartbeat, self.pong_deadline, self.probe_deadline, self.reconnect, self.liveness_check]
            .into_iter()
            .flatten()
            .min()
    }
}

/// Take a deadline if it has passed.
fn take_due<I: Copy + Ord>(slot: &mut Option<I>, now: I) -> bool {
    match *slot {
        Some(deadline) if deadline <= now => {
            *slot = None;
            true
        },
        _ => false,
    }
}

/// Session state machine
///
/// Owns at most one connection handle at a time and every timer bound to it.
///
/// This is a pure state machine - no I/O, no clock. Time is passed as
/// parameters to methods that need it.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Session<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Identity sent on every open
    nickname: String,
    /// Configuration
    config: SessionConfig,
    /// Current state
    state: SessionState,
    /// Current connection handle
    current: Option<ConnectionId>,
    /// Next connection ID to allocate
    next_id: u64,
    /// Caller wants a live channel (set by connect, cleared by close)
    wants_live: bool,
    /// Owner is visible to the user
    visible: bool,
    /// History replayed on the current connection
    history: HistoryBuffer,
    /// Outstanding pings in send order
    outstanding: VecDeque<PingOwner>,
    /// Timer deadlines
    timers: Timers<I>,
}

impl<I> Session<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create a session in [`SessionState::Idle`].
    ///
    /// # Errors
    ///
    /// - `SessionError::EmptyNickname` if `nickname` is blank
    /// - Any error from [`SessionConfig::validate`]
    pub fn new(nickname: impl Into<String>, config: SessionConfig) -> Result<Self, SessionError> {
        let nickname = nickname.into();
        if nickname.trim().is_empty() {
            return Err(SessionError::EmptyNickname);
        }
        config.validate()?;

        Ok(Self {
            nickname,
            config,
            state: SessionState::Idle,
            current: None,
            next_id: 1,
            wants_live: false,
            visible: true,
            history: HistoryBuffer::new(),
            outstanding: VecDeque::new(),
            timers: Timers::new(),
        })
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session nickname
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Configuration in use
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current connection handle. `None` when nothing is connecting, open or
    /// closing.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.current
    }

    /// History replayed on the current connection.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// True once `connect` was called and `close` was not.
    pub fn wants_live(&self) -> bool {
        self.wants_live
    }

    /// Last visibility reported by the host.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// True while a heartbeat ping awaits its pong.
    pub fn awaiting_pong(&self) -> bool {
        self.timers.pong_deadline.is_some()
    }

    /// True while a liveness probe awaits its pong.
    pub fn probe_in_flight(&self) -> bool {
        self.timers.probe_deadline.is_some()
    }

    /// Earliest armed timer. The driver should [`SessionEvent::Tick`] once it
    /// passes.
    pub fn next_deadline(&self) -> Option<I> {
        self.timers.earliest()
    }

    /// Process one event.
    pub fn handle(&mut self, event: SessionEvent, now: I) -> Vec<SessionAction> {
        match event {
            SessionEvent::Connect => self.connect(now),
            SessionEvent::Send { content } => self.send(content),
            SessionEvent::Close => self.close(),
            SessionEvent::TransportOpened { id } => self.handle_opened(id, now),
            SessionEvent::FrameReceived { id, text } => self.handle_frame(id, &text),
            SessionEvent::TransportClosed { id, reason }
            | SessionEvent::TransportError { id, reason } => {
                self.handle_transport_closed(id, &reason, now)
            },
            SessionEvent::VisibilityChanged { visible } => self.set_visible(visible, now),
            SessionEvent::Resumed => self.resumed(now),
            SessionEvent::Tick => self.tick(now),
        }
    }

    /// Ask for a live channel.
    ///
    /// No-op while connecting or open. Otherwise drops any stale handle,
    /// clears history and returns `OpenTransport` for a fresh connection.
    pub fn connect(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        self.start_connect(now, &mut actions);
        actions
    }

    /// Send a chat message. Dropped unless the state is exactly `Open`.
    pub fn send(&mut self, content: String) -> Vec<SessionAction> {
        match (self.state, self.current) {
            (SessionState::Open, Some(id)) => {
                vec![SessionAction::Send { id, frame: Outbound::Chat { content } }]
            },
            _ => {
                tracing::debug!(state = ?self.state, "dropping send: connection not open");
                vec![]
            },
        }
    }

    /// Caller-initiated teardown.
    ///
    /// Cancels every timer, closes the transport and suppresses reconnects
    /// until the next `connect`.
    pub fn close(&mut self) -> Vec<SessionAction> {
        self.wants_live = false;
        self.timers = Timers::new();
        self.outstanding.clear();

        match (self.state, self.current) {
            (SessionState::Connecting | SessionState::Open, Some(id)) => {
                tracing::info!(%id, "closing session");
                self.state = SessionState::Closing;
                vec![SessionAction::CloseTransport { id, reason: "closed by caller".to_string() }]
            },
            (SessionState::Closing, _) => vec![],
            _ => {
                self.current = None;
                self.state = SessionState::Closed;
                vec![]
            },
        }
    }

    /// Record host visibility. Becoming visible probes liveness.
    pub fn set_visible(&mut self, visible: bool, now: I) -> Vec<SessionAction> {
        let became_visible = visible && !self.visible;
        self.visible = visible;

        let mut actions = Vec::new();
        if became_visible && self.config.visibility_probe {
            self.probe(ProbeTrigger::Visibility, now, &mut actions);
        }
        actions
    }

    /// Host resumed from suspension. Probes liveness if visible.
    pub fn resumed(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.visible && self.config.visibility_probe {
            self.probe(ProbeTrigger::Resume, now, &mut actions);
        }
        actions
    }

    /// Fire every timer whose deadline has passed.
    pub fn tick(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if take_due(&mut self.timers.pong_deadline, now)
            && let Some(id) = self.current
        {
            tracing::warn!(%id, "pong timeout, closing connection");
            actions.push(SessionAction::CloseTransport { id, reason: "pong timeout".to_string() });
            self.fail_connection(now, &mut actions);
        }

        if take_due(&mut self.timers.probe_deadline, now)
            && let (SessionState::Open, Some(id)) = (self.state, self.current)
        {
            tracing::warn!(%id, "liveness probe unanswered, replacing connection");
            actions.push(SessionAction::CloseTransport { id, reason: "probe timeout".to_string() });
            self.drop_connection(&mut actions);
            self.open_connection(&mut actions);
        }

        if take_due(&mut self.timers.heartbeat, now)
            && let (SessionState::Open, Some(id)) = (self.state, self.current)
        {
            self.outstanding.push_back(PingOwner::Heartbeat);
            self.timers.pong_deadline = Some(now + self.config.pong_timeout);
            self.timers.heartbeat = Some(now + self.config.heartbeat_interval);
            actions.push(SessionAction::Send { id, frame: Outbound::Ping });
        }

        if take_due(&mut self.timers.reconnect, now) {
            if self.wants_live && self.visible && !self.state.is_live() {
                tracing::info!("reconnecting");
                self.open_connection(&mut actions);
            } else {
                tracing::debug!(state = ?self.state, visible = self.visible, "reconnect skipped");
            }
        }

        if take_due(&mut self.timers.liveness_check, now) {
            self.timers.liveness_check = Some(now + self.config.liveness_check_interval);
            self.probe(ProbeTrigger::Periodic, now, &mut actions);
        }

        actions
    }

    fn start_connect(&mut self, now: I, actions: &mut Vec<SessionAction>) {
        self.wants_live = true;
        if self.config.periodic_check && self.timers.liveness_check.is_none() {
            self.timers.liveness_check = Some(now + self.config.liveness_check_interval);
        }

        if self.state.is_live() {
            tracing::debug!(state = ?self.state, "connect ignored: connection already live");
            return;
        }

        self.open_connection(actions);
    }

    /// Allocate a fresh connection and ask the driver to open it.
    fn open_connection(&mut self, actions: &mut Vec<SessionAction>) {
        if let Some(stale) = self.current.take() {
            tracing::debug!(%stale, state = ?self.state, "dropping stale connection");
        }

        self.history.clear();
        self.outstanding.clear();
        self.timers.clear_connection();
        self.timers.reconnect = None;

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        self.current = Some(id);
        self.state = SessionState::Connecting;

        tracing::info!(%id, url = %self.config.endpoint, "connecting");
        actions.push(SessionAction::OpenTransport { id, url: self.config.endpoint.clone() });
    }

    /// Forget the current connection and tell the caller it closed.
    fn drop_connection(&mut self, actions: &mut Vec<SessionAction>) {
        self.current = None;
        self.state = SessionState::Closed;
        self.outstanding.clear();
        self.timers.clear_connection();
        actions.push(SessionAction::Notify(Notification::Closed));
    }

    /// Connection died on its own: drop it and schedule the single retry.
    fn fail_connection(&mut self, now: I, actions: &mut Vec<SessionAction>) {
        self.drop_connection(actions);

        if self.wants_live && self.visible {
            self.timers.reconnect = Some(now + self.config.reconnect_delay);
            tracing::info!(delay = ?self.config.reconnect_delay, "reconnect scheduled");
        } else {
            tracing::debug!(visible = self.visible, "connection lost, not reconnecting");
        }
    }

    fn is_current(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    fn handle_opened(&mut self, id: ConnectionId, now: I) -> Vec<SessionAction> {
        if !self.is_current(id) || self.state != SessionState::Connecting {
            tracing::debug!(%id, state = ?self.state, "ignoring open from stale connection");
            return vec![];
        }

        tracing::info!(%id, "connected");
        self.state = SessionState::Open;
        self.timers.heartbeat = Some(now + self.config.heartbeat_interval);

        vec![
            SessionAction::Send {
                id,
                frame: Outbound::Identify { nickname: self.nickname.clone() },
            },
            SessionAction::Notify(Notification::Opened),
        ]
    }

    fn handle_frame(&mut self, id: ConnectionId, text: &str) -> Vec<SessionAction> {
        if !self.is_current(id) || self.state != SessionState::Open {
            tracing::trace!(%id, state = ?self.state, "ignoring frame from stale connection");
            return vec![];
        }

        let inbound = match Inbound::decode(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(%id, error = %e, "dropping malformed frame");
                return vec![];
            },
        };

        match inbound {
            Inbound::Pong => {
                self.resolve_pong();
                vec![]
            },
            Inbound::OnlineUsers { users } => {
                vec![SessionAction::Notify(Notification::OnlineUsers(users))]
            },
            Inbound::History(item) => {
                self.history.push(item.clone());
                vec![SessionAction::Notify(Notification::HistoryItem(item))]
            },
            Inbound::Message(msg) => {
                vec![SessionAction::Notify(Notification::Message(Message::Chat(msg)))]
            },
            Inbound::System(msg) => {
                vec![SessionAction::Notify(Notification::Message(Message::System(msg)))]
            },
            Inbound::Unknown => {
                tracing::trace!(%id, "ignoring frame with unknown type");
                vec![]
            },
        }
    }

    /// Match a pong to the oldest outstanding ping.
    fn resolve_pong(&mut self) {
        match self.outstanding.pop_front() {
            Some(PingOwner::Heartbeat) => {
                if !self.outstanding.contains(&PingOwner::Heartbeat) {
                    self.timers.pong_deadline = None;
                }
            },
            Some(PingOwner::Probe) => {
                tracing::debug!("liveness probe answered");
                self.timers.probe_deadline = None;
            },
            None => tracing::trace!("unsolicited pong"),
        }
    }

    fn handle_transport_closed(
        &mut self,
        id: ConnectionId,
        reason: &str,
        now: I,
    ) -> Vec<SessionAction> {
        if !self.is_current(id) {
            tracing::trace!(%id, "ignoring close from stale connection");
            return vec![];
        }

        let mut actions = Vec::new();
        match self.state {
            SessionState::Closing => {
                tracing::info!(%id, "session closed");
                self.drop_connection(&mut actions);
            },
            SessionState::Connecting | SessionState::Open => {
                tracing::warn!(%id, reason, "connection lost");
                self.fail_connection(now, &mut actions);
            },
            SessionState::Idle | SessionState::Closed => {},
        }
        actions
    }

    fn probe(&mut self, trigger: ProbeTrigger, now: I, actions: &mut Vec<SessionAction>) {
        if !self.wants_live {
            return;
        }

        let (SessionState::Open, Some(id)) = (self.state, self.current) else {
            tracing::debug!(?trigger, state = ?self.state, "liveness check: not open, connecting");
            self.start_connect(now, actions);
            return;
        };

        if self.probe_in_flight() {
            tracing::debug!(?trigger, "liveness probe already in flight");
            return;
        }
        if trigger == ProbeTrigger::Periodic && self.awaiting_pong() {
            // heartbeat ping in flight already covers this round
            return;
        }

        tracing::debug!(%id, ?trigger, "probing liveness");
        self.outstanding.push_back(PingOwner::Probe);
        self.timers.probe_deadline = Some(now + self.config.probe_timeout);
        actions.push(SessionAction::Send { id, frame: Outbound::Ping });
    }
}
