//! Context implementation for request-scoped deadlines
//!
//! Every provider operation receives a Context. The only thing it carries is
//! an optional absolute deadline; there is no cancellation signal separate
//! from running out of time. Deadlines are `tokio::time::Instant`s so tests
//! can pause and advance the clock.

use std::time::Duration;
use tokio::time::Instant;

/// Context carries the request deadline across async boundaries
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Replaces the deadline with `now + timeout`
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Applies `timeout` only when no deadline has been set yet, or when it
    /// would end earlier than the existing one
    pub fn with_default_timeout(self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        match self.deadline {
            Some(existing) if existing <= candidate => self,
            _ => Self {
                deadline: Some(candidate),
            },
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Clamps `wait` so that it never runs past the deadline
    pub fn bounded(&self, wait: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => wait.min(remaining),
            None => wait,
        }
    }
}
