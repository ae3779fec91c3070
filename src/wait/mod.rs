//! Readiness strategies.
//!
//! A started container is rarely usable straight away: the process inside
//! still has to bind its ports, run migrations, or finish a health check. A
//! [`WaitStrategy`] blocks until an externally observable condition holds,
//! polling at a fixed interval. Every wait is bounded by the strategy's
//! startup timeout and by the caller's [`ReadinessContext`], which can carry
//! a deadline and a cancellation token.
//!
//! Strategies provided here:
//!
//! - [`ListeningPort`]: a TCP connection to the mapped host port succeeds.
//! - [`LogMessage`]: the container logs contain a message often enough.
//! - [`HttpProbe`]: an HTTP `GET` on the mapped port returns the expected
//!   status.
//! - [`HealthStatus`]: the engine reports the container as healthy.

mod health;
mod http;
mod log;
mod poll;
mod tcp;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use health::HealthStatus;
pub use http::HttpProbe;
pub use log::LogMessage;
pub use tcp::ListeningPort;

pub(crate) use poll::{Poller, ProbeOutcome};

use crate::engine::ContainerHandle;
use crate::error::ReadinessError;

/// Default upper bound on how long a strategy waits.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Default delay between two probe attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Boxed future returned by [`WaitStrategy::wait_until_ready`].
pub type WaitFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ReadinessError>> + Send + 'a>>;

/// A condition a started container must satisfy before tests use it.
///
/// Implementations poll rather than spin, return promptly with a
/// timeout-class [`ReadinessError`] when the context is cancelled or its
/// deadline passes, and release whatever a probe opened before the next
/// attempt. On failure the caller keeps the handle and is expected to
/// terminate the container.
pub trait WaitStrategy: fmt::Debug + Send + Sync {
    /// Wait until the container is ready.
    fn wait_until_ready<'a>(
        &'a self,
        ctx: &'a ReadinessContext,
        handle: &'a ContainerHandle,
    ) -> WaitFuture<'a>;
}

/// Cancellation and deadline shared by every wait started under it.
#[derive(Debug, Clone, Default)]
pub struct ReadinessContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl ReadinessContext {
    /// Create a context with no deadline and a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(poll::instant_after(Instant::now(), timeout))
    }

    /// Set the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an existing cancellation token, for example a child of a
    /// suite-wide token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Return the cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Return the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every wait running under this context.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns `true` once the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Timing shared by all strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    startup_timeout: Duration,
    poll_interval: Duration,
}

impl PollSettings {
    /// Create settings from a startup timeout and a poll interval.
    ///
    /// A zero poll interval is raised to one millisecond so polling never
    /// spins.
    #[must_use]
    pub fn new(startup_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            startup_timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Return the startup timeout.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Return the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Replace the startup timeout.
    #[must_use]
    pub const fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    /// Replace the poll interval.
    #[must_use]
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self::new(self.startup_timeout, poll_interval)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(DEFAULT_STARTUP_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}
