//! Production environment on tokio's clock.
//!
//! `SystemEnv` reads `tokio::time::Instant`, so the same runtime code runs
//! against wall-clock time in production and against the paused, auto-advancing
//! clock in `#[tokio::test(start_paused = true)]` tests.

use std::time::Duration;

use xbzchat_core::env::Environment;

/// Production environment using tokio time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_env_sleep_works() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;
        let elapsed = env.now() - start;

        assert!(elapsed >= Duration::from_millis(50), "Sleep should wait at least 50ms");
    }

    #[tokio::test(start_paused = true)]
    async fn paused_clock_advances_on_sleep() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_secs(20)).await;

        assert_eq!(env.now() - start, Duration::from_secs(20));
    }
}
