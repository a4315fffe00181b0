//! WebSocket transport for the runtime.
//!
//! Provides the [`Connector`] seam and [`WsConnector`], which runs each
//! connection on its own task over tokio-tungstenite. This is a thin layer
//! that just moves text frames; protocol logic stays in the Sans-IO
//! [`xbzchat_core::Session`].
//!
//! Every event a link reports is tagged with the [`ConnectionId`] it was opened
//! under, so events from superseded links are recognised and ignored by the
//! session.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    self,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
use xbzchat_core::{ConnectionId, SessionEvent};

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Handshake or TCP connect failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Reading or writing the stream failed.
    #[error("stream error: {0}")]
    Stream(String),

    /// Link task is gone.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Classify a tungstenite error.
    ///
    /// Refused, reset and aborted sockets are connect failures; everything
    /// else is a stream failure.
    pub fn from_tungstenite(err: &tungstenite::Error) -> Self {
        let is_connect = match err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                return Self::Closed;
            },
            _ => false,
        };
        if is_connect { Self::Connect(err.to_string()) } else { Self::Stream(err.to_string()) }
    }
}

/// Events reported by a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened(ConnectionId),
    /// Text frame received.
    Frame(ConnectionId, String),
    /// Link closed.
    Closed(ConnectionId, String),
    /// Link failed.
    Error(ConnectionId, TransportError),
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Opened(id) => SessionEvent::TransportOpened { id },
            TransportEvent::Frame(id, text) => SessionEvent::FrameReceived { id, text },
            TransportEvent::Closed(id, reason) => SessionEvent::TransportClosed { id, reason },
            TransportEvent::Error(id, err) => {
                SessionEvent::TransportError { id, reason: err.to_string() }
            },
        }
    }
}

/// Instructions from the runtime to a link task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Send a text frame.
    Text(String),
    /// Send a close frame and stop.
    Close(String),
}

/// Runtime side of one connection.
///
/// Dropping the link stops its task without reporting anything further.
#[derive(Debug)]
pub struct Link {
    commands: mpsc::UnboundedSender<LinkCommand>,
}

impl Link {
    /// Wrap the command channel of a link task.
    pub fn new(commands: mpsc::UnboundedSender<LinkCommand>) -> Self {
        Self { commands }
    }

    /// Queue a text frame.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.commands.send(LinkCommand::Text(text)).map_err(|_| TransportError::Closed)
    }

    /// Ask the link to close. It reports [`TransportEvent::Closed`] once done.
    pub fn close(self, reason: String) {
        // task already finished: nothing left to close
        let _ = self.commands.send(LinkCommand::Close(reason));
    }
}

/// Opens transports for the runtime.
///
/// The production implementation is [`WsConnector`]; tests substitute a
/// connector that hands the link's channels to the test body.
pub trait Connector: Send + 'static {
    /// Start connecting to `url`. Progress is reported on `events`, tagged
    /// with `id`.
    fn open(
        &mut self,
        id: ConnectionId,
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Link;
}

/// WebSocket connector on tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(
        &mut self,
        id: ConnectionId,
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Link {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_link(id, url.to_string(), rx, events));
        Link::new(tx)
    }
}

/// Run one connection, bridging between channels and the WebSocket.
async fn run_link(
    id: ConnectionId,
    url: String,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let stream = tokio::select! {
        result = tokio_tungstenite::connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                tracing::debug!(%id, %url, error = %e, "websocket connect failed");
                let _ = events.send(TransportEvent::Error(id, TransportError::from_tungstenite(&e)));
                return;
            },
        },
        // link closed or dropped while still connecting
        _ = closed_or_dropped(&mut commands) => {
            let _ = events.send(TransportEvent::Closed(id, "closed while connecting".to_string()));
            return;
        },
    };

    if events.send(TransportEvent::Opened(id)).is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(LinkCommand::Text(text)) => {
                    if let Err(e) = sink.send(tungstenite::Message::Text(text.into())).await {
                        let _ = events.send(TransportEvent::Error(id, TransportError::from_tungstenite(&e)));
                        break;
                    }
                },
                Some(LinkCommand::Close(reason)) => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: reason.clone().into() };
                    if let Err(e) = sink.send(tungstenite::Message::Close(Some(frame))).await {
                        tracing::debug!(%id, error = %e, "close frame not sent");
                    }
                    let _ = events.send(TransportEvent::Closed(id, reason));
                    break;
                },
                None => {
                    let _ = sink.close().await;
                    break;
                },
            },
            message = source.next() => match message {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Frame(id, text.to_string()));
                },
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "closed by server".to_string(),
                        |f| format!("closed by server ({}): {}", u16::from(f.code), f.reason),
                    );
                    let _ = events.send(TransportEvent::Closed(id, reason));
                    break;
                },
                // tungstenite answers control frames itself
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(id, TransportError::from_tungstenite(&e)));
                    break;
                },
                None => {
                    let _ = events.send(TransportEvent::Closed(id, "stream ended".to_string()));
                    break;
                },
            },
        }
    }
}

/// Resolves once the runtime closes or drops the link. Text queued before the
/// handshake completes is discarded.
async fn closed_or_dropped(commands: &mut mpsc::UnboundedReceiver<LinkCommand>) {
    // the session never queues text on a connection that is not open
    while let Some(command) = commands.recv().await {
        if matches!(command, LinkCommand::Close(_)) {
            return;
        }
    }
}
