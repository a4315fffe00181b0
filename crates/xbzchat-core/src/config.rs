//! Session configuration.

use std::time::Duration;

use url::Url;

use crate::error::SessionError;

/// Path of the chat WebSocket on the serving origin.
pub const CHAT_PATH: &str = "/xbzchat/ws";

/// Origin used when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8099";

/// Delay before the single reconnect attempt after a transport failure.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Interval at which the session pings while open.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Time a heartbeat ping may go unanswered before the connection is dropped.
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(5);

/// Time a liveness probe waits for its pong.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Interval of the periodic liveness re-check.
pub const DEFAULT_LIVENESS_CHECK_INTERVAL: Duration = Duration::from_secs(20);

/// Longest accepted timer. Deadlines are `now + duration`, so this keeps them
/// representable on every platform clock.
pub const MAX_TIMER: Duration = Duration::from_secs(24 * 60 * 60);

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebSocket URL of the chat server
    pub endpoint: String,
    /// Delay before reconnecting after a failure
    pub reconnect_delay: Duration,
    /// Heartbeat ping interval (must exceed `pong_timeout`)
    pub heartbeat_interval: Duration,
    /// Heartbeat pong deadline
    pub pong_timeout: Duration,
    /// Liveness probe pong deadline
    pub probe_timeout: Duration,
    /// Periodic liveness re-check interval
    pub liveness_check_interval: Duration,
    /// Run the periodic liveness re-check
    pub periodic_check: bool,
    /// Probe liveness when the owner becomes visible or resumes
    pub visibility_probe: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("ws://localhost:8099{CHAT_PATH}"),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            liveness_check_interval: DEFAULT_LIVENESS_CHECK_INTERVAL,
            periodic_check: true,
            visibility_probe: true,
        }
    }
}

impl SessionConfig {
    /// Default configuration pointed at `endpoint`.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), ..Self::default() }
    }

    /// Check that the configuration can drive a session.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidEndpoint` if `endpoint` is not a `ws`/`wss` URL
    /// - `SessionError::ZeroDuration` if any timer is zero
    /// - `SessionError::DurationTooLong` if any timer exceeds [`MAX_TIMER`]
    /// - `SessionError::PongTimeoutTooLong` if the pong deadline would overlap
    ///   the next heartbeat
    pub fn validate(&self) -> Result<(), SessionError> {
        let url = Url::parse(&self.endpoint).map_err(|e| SessionError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SessionError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        let timers = [
            ("reconnect_delay", self.reconnect_delay),
            ("heartbeat_interval", self.heartbeat_interval),
            ("pong_timeout", self.pong_timeout),
            ("probe_timeout", self.probe_timeout),
            ("liveness_check_interval", self.liveness_check_interval),
        ];
        if let Some(&(name, _)) = timers.iter().find(|(_, d)| d.is_zero()) {
            return Err(SessionError::ZeroDuration { name });
        }
        if let Some(&(name, _)) = timers.iter().find(|(_, d)| *d > MAX_TIMER) {
            return Err(SessionError::DurationTooLong { name, max: MAX_TIMER });
        }

        if self.pong_timeout >= self.heartbeat_interval {
            return Err(SessionError::PongTimeoutTooLong {
                pong_timeout: self.pong_timeout,
                heartbeat_interval: self.heartbeat_interval,
            });
        }

        Ok(())
    }
}

/// Chat endpoint served by `origin`.
///
/// `http` maps to `ws` and `https` to `wss`; a `ws`/`wss` origin keeps its
/// scheme. Path, query and fragment of `origin` are replaced by
/// [`CHAT_PATH`].
///
/// # Errors
///
/// - `SessionError::InvalidEndpoint` if `origin` does not parse or uses some
///   other scheme
pub fn endpoint_for_origin(origin: &str) -> Result<String, SessionError> {
    let invalid = |reason: String| SessionError::InvalidEndpoint {
        endpoint: origin.to_string(),
        reason,
    };

    let mut url = Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme {other:?}"))),
    };
    url.set_scheme(scheme).map_err(|()| invalid(format!("cannot switch to {scheme}")))?;
    url.set_path(CHAT_PATH);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}
