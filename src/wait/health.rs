//! Wait for the engine to report the container healthy.

use std::time::Duration;

use bollard::models::{ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum};

use super::{PollSettings, Poller, ProbeOutcome, ReadinessContext, WaitFuture, WaitStrategy};
use crate::engine::ContainerHandle;
use crate::error::ReadinessError;

/// Ready once the image's own health check passes.
///
/// Every probe inspects the container afresh, bypassing the handle's cached
/// snapshot. The wait fails immediately when the container defines no health
/// check or has stopped running.
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    settings: PollSettings,
}

impl HealthStatus {
    /// Wait with the default timing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the startup timeout.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.settings = self.settings.with_startup_timeout(timeout);
        self
    }

    /// Replace the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.settings = self.settings.with_poll_interval(interval);
        self
    }

    /// Replace both timing settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl WaitStrategy for HealthStatus {
    fn wait_until_ready<'a>(
        &'a self,
        ctx: &'a ReadinessContext,
        handle: &'a ContainerHandle,
    ) -> WaitFuture<'a> {
        Box::pin(async move {
            Poller::start(ctx, handle, self.settings)
                .poll("engine health status healthy", || probe_health(handle))
                .await
        })
    }
}

async fn probe_health(handle: &ContainerHandle) -> Result<ProbeOutcome, ReadinessError> {
    let snapshot = handle.inspect_fresh().await?;
    classify(handle.id(), &snapshot)
}

fn classify(
    container_id: &str,
    snapshot: &ContainerInspectResponse,
) -> Result<ProbeOutcome, ReadinessError> {
    let state = snapshot.state.as_ref();
    let probe_failed = |message: String| ReadinessError::ProbeFailed {
        container_id: container_id.to_owned(),
        message,
    };

    if let Some(status @ (ContainerStateStatusEnum::EXITED | ContainerStateStatusEnum::DEAD)) =
        state.and_then(|container_state| container_state.status.as_ref())
    {
        let exit_code = state
            .and_then(|container_state| container_state.exit_code)
            .unwrap_or_default();
        return Err(probe_failed(format!(
            "container stopped ({status:?}) with exit code {exit_code}"
        )));
    }

    let health = state
        .and_then(|container_state| container_state.health.as_ref())
        .and_then(|health| health.status.as_ref());

    match health {
        Some(HealthStatusEnum::HEALTHY) => Ok(ProbeOutcome::Ready),
        Some(HealthStatusEnum::STARTING) => Ok(ProbeOutcome::NotReady(String::from("starting"))),
        Some(HealthStatusEnum::UNHEALTHY) => {
            Ok(ProbeOutcome::NotReady(String::from("unhealthy")))
        }
        Some(HealthStatusEnum::NONE | HealthStatusEnum::EMPTY) | None => Err(probe_failed(
            String::from("container defines no health check"),
        )),
    }
}
