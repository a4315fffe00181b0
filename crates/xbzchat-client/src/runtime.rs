//! Async runtime
//!
//! Event loop that owns the [`Session`] and executes its actions. Uses
//! `tokio::select!` to serialise three inputs:
//!
//! - caller commands from [`SessionHandle`]
//! - transport events from the current link
//! - timer expiry, by sleeping until [`Session::next_deadline`]
//!
//! Every input becomes a [`SessionEvent`]; every resulting [`SessionAction`]
//! is executed before the next input is polled. Inputs are polled in the
//! order above, so a command issued before a transport event is applied
//! first.

use std::{future, time::Duration};

use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use xbzchat_core::{ConnectionId, Session, SessionAction, SessionEvent, env::Environment};

use crate::{
    handler::{SessionHandler, dispatch},
    system_env::SystemEnv,
    transport::{Connector, Link, TransportEvent, WsConnector},
};

/// Runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The runtime task has exited.
    #[error("session runtime stopped")]
    Stopped,
}

/// Caller intents.
#[derive(Debug)]
enum Command {
    Connect,
    Send(String),
    Close,
    Visible(bool),
    Resumed,
    Shutdown,
}

/// Caller handle to a running session.
///
/// Cheap to clone. Commands are applied in the order they are issued.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    fn command(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).map_err(|_| RuntimeError::Stopped)
    }

    /// Ask for a live channel. No-op while connecting or open.
    pub fn connect(&self) -> Result<(), RuntimeError> {
        self.command(Command::Connect)
    }

    /// Send a chat message. Dropped unless the connection is open.
    pub fn send(&self, content: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(Command::Send(content.into()))
    }

    /// Close the channel and stop reconnecting until the next `connect`.
    pub fn close(&self) -> Result<(), RuntimeError> {
        self.command(Command::Close)
    }

    /// Report visibility of the owner.
    pub fn set_visible(&self, visible: bool) -> Result<(), RuntimeError> {
        self.command(Command::Visible(visible))
    }

    /// Report that the host resumed from suspension.
    pub fn resumed(&self) -> Result<(), RuntimeError> {
        self.command(Command::Resumed)
    }

    /// Close the channel and stop the runtime task.
    pub fn shutdown(&self) -> Result<(), RuntimeError> {
        self.command(Command::Shutdown)
    }
}

/// Session driver.
pub struct Runtime<E: Environment, C: Connector, H: SessionHandler> {
    env: E,
    session: Session<E::Instant>,
    connector: C,
    handler: H,
    /// Link of the current connection
    link: Option<(ConnectionId, Link)>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<E: Environment, C: Connector, H: SessionHandler> Runtime<E, C, H> {
    /// Create a runtime and the handle that drives it.
    pub fn new(
        env: E,
        session: Session<E::Instant>,
        connector: C,
        handler: H,
    ) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let runtime = Self {
            env,
            session,
            connector,
            handler,
            link: None,
            commands,
            events_tx,
            events_rx,
        };
        (runtime, SessionHandle { commands: commands_tx })
    }

    /// Spawn the runtime on the current tokio runtime.
    ///
    /// The task returns the handler once it stops.
    pub fn spawn(
        env: E,
        session: Session<E::Instant>,
        connector: C,
        handler: H,
    ) -> (SessionHandle, JoinHandle<H>)
    where
        E::Instant: Send + 'static,
    {
        let (runtime, handle) = Self::new(env, session, connector, handler);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Run until [`SessionHandle::shutdown`] or every handle is dropped.
    pub async fn run(mut self) -> H {
        loop {
            let wait = self.until_deadline();
            let env = self.env.clone();

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.step(command_event(command)),
                },
                Some(event) = self.events_rx.recv() => self.step(event.into()),
                () = sleep_for(env, wait) => self.step(SessionEvent::Tick),
            }
        }

        tracing::debug!("session runtime stopping");
        let actions = self.session.close();
        self.execute(actions);
        self.handler
    }

    fn until_deadline(&self) -> Option<Duration> {
        let deadline = self.session.next_deadline()?;
        let now = self.env.now();
        Some(if deadline > now { deadline - now } else { Duration::ZERO })
    }

    fn step(&mut self, event: SessionEvent) {
        let now = self.env.now();
        let actions = self.session.handle(event, now);
        self.execute(actions);
    }

    fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::OpenTransport { id, url } => {
                    if let Some((stale, link)) = self.link.take() {
                        tracing::debug!(%stale, "closing superseded link");
                        link.close("superseded".to_string());
                    }
                    let link = self.connector.open(id, &url, self.events_tx.clone());
                    self.link = Some((id, link));
                },
                SessionAction::Send { id, frame } => {
                    let Some((_, link)) = self.link.as_ref().filter(|(current, _)| *current == id)
                    else {
                        tracing::debug!(%id, "no link for send");
                        continue;
                    };
                    match frame.encode() {
                        Ok(text) => {
                            if let Err(e) = link.send(text) {
                                tracing::debug!(%id, error = %e, "send on finished link");
                            }
                        },
                        Err(e) => tracing::warn!(%id, error = %e, "failed to encode frame"),
                    }
                },
                SessionAction::CloseTransport { id, reason } => {
                    if self.link.as_ref().is_some_and(|(current, _)| *current == id)
                        && let Some((_, link)) = self.link.take()
                    {
                        link.close(reason);
                    }
                },
                SessionAction::Notify(notification) => dispatch(&mut self.handler, notification),
            }
        }
    }
}

/// Spawn a session over real WebSockets.
pub fn connect_ws<H: SessionHandler>(
    session: Session<tokio::time::Instant>,
    handler: H,
) -> (SessionHandle, JoinHandle<H>) {
    Runtime::spawn(SystemEnv::new(), session, WsConnector, handler)
}

fn command_event(command: Command) -> SessionEvent {
    match command {
        Command::Connect => SessionEvent::Connect,
        Command::Send(content) => SessionEvent::Send { content },
        Command::Close => SessionEvent::Close,
        Command::Visible(visible) => SessionEvent::VisibilityChanged { visible },
        Command::Resumed => SessionEvent::Resumed,
        // handled by the loop before conversion
        Command::Shutdown => SessionEvent::Close,
    }
}

async fn sleep_for<E: Environment>(env: E, wait: Option<Duration>) {
    match wait {
        Some(duration) => env.sleep(duration).await,
        None => future::pending().await,
    }
}
