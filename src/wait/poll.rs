//! Polling driver shared by the strategies.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::{PollSettings, ReadinessContext};
use crate::engine::ContainerHandle;
use crate::error::ReadinessError;

/// Result of one probe attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbeOutcome {
    Ready,
    NotReady(String),
}

/// Stand-in horizon for timeouts too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + timeout`, saturating to a far-future instant when the sum does
/// not fit.
pub(crate) fn instant_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Deadline bookkeeping for one wait.
///
/// The effective deadline is the earlier of the context deadline and the
/// start of the wait plus the startup timeout.
pub(crate) struct Poller<'a> {
    ctx: &'a ReadinessContext,
    container_id: &'a str,
    started: Instant,
    deadline: Instant,
    settings: PollSettings,
}

impl<'a> Poller<'a> {
    pub(crate) fn start(
        ctx: &'a ReadinessContext,
        handle: &'a ContainerHandle,
        settings: PollSettings,
    ) -> Self {
        let started = Instant::now();
        let own_deadline = instant_after(started, settings.startup_timeout());
        let deadline = ctx
            .deadline()
            .map_or(own_deadline, |ctx_deadline| ctx_deadline.min(own_deadline));

        Self {
            ctx,
            container_id: handle.id(),
            started,
            deadline,
            settings,
        }
    }

    /// Run a single step, abandoning it on cancellation or deadline.
    pub(crate) async fn guard<T, F>(&self, condition: &str, step: F) -> Result<T, ReadinessError>
    where
        F: Future<Output = Result<T, ReadinessError>>,
    {
        tokio::select! {
            biased;
            () = self.ctx.cancellation().cancelled() => Err(self.cancelled(condition)),
            () = tokio::time::sleep_until(self.deadline) => Err(self.timed_out(condition)),
            result = step => result,
        }
    }

    /// Probe until it reports ready, sleeping `poll_interval` between
    /// attempts. Sleeps never extend past the deadline.
    pub(crate) async fn poll<F, Fut>(
        &self,
        condition: &str,
        mut probe: F,
    ) -> Result<(), ReadinessError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ProbeOutcome, ReadinessError>>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match self.guard(condition, probe()).await? {
                ProbeOutcome::Ready => {
                    tracing::debug!(
                        container_id = self.container_id,
                        condition,
                        attempts,
                        elapsed_ms = self.elapsed_millis(),
                        "container ready"
                    );
                    return Ok(());
                }
                ProbeOutcome::NotReady(reason) => {
                    tracing::debug!(
                        container_id = self.container_id,
                        condition,
                        attempts,
                        %reason,
                        "container not ready yet"
                    );
                }
            }

            let now = Instant::now();
            if now >= self.deadline {
                return Err(self.timed_out(condition));
            }
            let wake_at = instant_after(now, self.settings.poll_interval()).min(self.deadline);
            tokio::select! {
                biased;
                () = self.ctx.cancellation().cancelled() => return Err(self.cancelled(condition)),
                () = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn cancelled(&self, condition: &str) -> ReadinessError {
        ReadinessError::Cancelled {
            container_id: self.container_id.to_owned(),
            condition: condition.to_owned(),
        }
    }

    fn timed_out(&self, condition: &str) -> ReadinessError {
        ReadinessError::Timeout {
            container_id: self.container_id.to_owned(),
            condition: condition.to_owned(),
            waited: self.started.elapsed(),
        }
    }
}
