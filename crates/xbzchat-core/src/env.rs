//! Environment abstraction for deterministic testing.
//!
//! Decouples drivers from the system clock. Production uses tokio's clock,
//! tests use the same clock paused, so timer-heavy behavior (heartbeats,
//! probes, reconnect delays) runs instantly and reproducibly.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time and sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `sleep(d)` completes no earlier than `now() + d`
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Sub<Output = Duration>
        + Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps; the session itself never blocks.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
