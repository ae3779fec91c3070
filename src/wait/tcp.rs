//! Wait for a TCP port to accept connections.

use std::time::Duration;

use tokio::net::TcpStream;

use super::{PollSettings, Poller, ProbeOutcome, ReadinessContext, WaitFuture, WaitStrategy};
use crate::engine::ContainerHandle;
use crate::error::ReadinessError;

/// Host the mapped ports are published on unless configured otherwise.
pub(crate) const DEFAULT_PROBE_HOST: &str = "127.0.0.1";

/// Upper bound on a single connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Ready once a TCP connection to the mapped host port succeeds.
///
/// Without an explicit port, the lowest port the container declares as
/// exposed is used.
#[derive(Debug, Clone)]
pub struct ListeningPort {
    container_port: Option<u16>,
    host: String,
    settings: PollSettings,
}

impl ListeningPort {
    /// Wait for the given container port.
    #[must_use]
    pub fn new(container_port: u16) -> Self {
        Self {
            container_port: Some(container_port),
            ..Self::default()
        }
    }

    /// Wait for the lowest exposed port of the container.
    #[must_use]
    pub fn lowest_exposed() -> Self {
        Self::default()
    }

    /// Connect to `host` instead of `127.0.0.1`.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
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

    async fn resolve_container_port(
        &self,
        handle: &ContainerHandle,
    ) -> Result<u16, ReadinessError> {
        if let Some(port) = self.container_port {
            return Ok(port);
        }

        let declared = handle.liveness_check_ports().await?;
        declared
            .iter()
            .map(|exposed| exposed.port())
            .min()
            .ok_or_else(|| ReadinessError::ProbeFailed {
                container_id: handle.id().to_owned(),
                message: String::from("container exposes no ports to probe"),
            })
    }
}

impl Default for ListeningPort {
    fn default() -> Self {
        Self {
            container_port: None,
            host: String::from(DEFAULT_PROBE_HOST),
            settings: PollSettings::default(),
        }
    }
}

impl WaitStrategy for ListeningPort {
    fn wait_until_ready<'a>(
        &'a self,
        ctx: &'a ReadinessContext,
        handle: &'a ContainerHandle,
    ) -> WaitFuture<'a> {
        Box::pin(async move {
            let poller = Poller::start(ctx, handle, self.settings);
            let setup = async {
                let container_port = self.resolve_container_port(handle).await?;
                let host_port = handle.mapped_port(container_port).await?;
                Ok::<_, ReadinessError>((container_port, host_port))
            };
            let (container_port, host_port) = poller.guard("resolve mapped port", setup).await?;

            let address = format!("{}:{host_port}", self.host);
            let condition = format!("port {container_port} accepting connections on {address}");
            poller.poll(&condition, || probe_tcp(&address)).await
        })
    }
}

async fn probe_tcp(address: &str) -> Result<ProbeOutcome, ReadinessError> {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Ok(ProbeOutcome::Ready)
        }
        Ok(Err(error)) => Ok(ProbeOutcome::NotReady(error.to_string())),
        Err(_) => Ok(ProbeOutcome::NotReady(String::from("connection attempt timed out"))),
    }
}
