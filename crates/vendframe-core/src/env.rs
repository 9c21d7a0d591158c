//! Environment abstraction for wall-clock access.
//!
//! Frame tags and status-reply timestamps come from the wall clock, and the
//! lifter ship flow sleeps between status polls. Routing those through a
//! trait keeps the engine testable against a pinned clock while production
//! uses the system clock and tokio timers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Abstract environment providing time and async sleep.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    fn wall_clock(&self) -> SystemTime;

    /// Sleep for the given duration.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Seconds elapsed in the current hour (`minute * 60 + second`), the
    /// quantity the tagged frame families fold into their frame tag.
    fn seconds_into_hour(&self) -> u64 {
        self.wall_clock().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() % 3600
    }
}

/// Production environment: system clock, tokio timers.
#[derive(Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn wall_clock(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Environment pinned to a fixed wall-clock instant.
    ///
    /// `sleep` still uses tokio timers so tests drive it with the paused
    /// test clock.
    #[derive(Clone, Copy)]
    pub struct FixedClock(pub u64);

    impl Environment for FixedClock {
        fn wall_clock(&self) -> SystemTime {
            UNIX_EPOCH + Duration::from_secs(self.0)
        }

        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }
    }
}
