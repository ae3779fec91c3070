//! Wait for an HTTP endpoint to answer.

use std::time::Duration;

use super::tcp::DEFAULT_PROBE_HOST;
use super::{PollSettings, Poller, ProbeOutcome, ReadinessContext, WaitFuture, WaitStrategy};
use crate::engine::ContainerHandle;
use crate::error::ReadinessError;

/// Upper bound on a single request, connection included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Ready once `GET http://<host>:<mapped port><path>` returns the expected
/// status, or any 2xx status when none is set.
///
/// Connection failures and other statuses count as not ready.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    container_port: u16,
    path: String,
    host: String,
    expected_status: Option<u16>,
    settings: PollSettings,
}

impl HttpProbe {
    /// Probe `/` on the given container port.
    #[must_use]
    pub fn new(container_port: u16) -> Self {
        Self {
            container_port,
            path: String::from("/"),
            host: String::from(DEFAULT_PROBE_HOST),
            expected_status: None,
            settings: PollSettings::default(),
        }
    }

    /// Probe `path` instead of `/`.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Require exactly `status` instead of any 2xx status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
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

    fn accepts(&self, status: reqwest::StatusCode) -> bool {
        self.expected_status
            .map_or_else(|| status.is_success(), |expected| status.as_u16() == expected)
    }

    async fn probe(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<ProbeOutcome, ReadinessError> {
        match client.get(url).send().await {
            Ok(response) if self.accepts(response.status()) => Ok(ProbeOutcome::Ready),
            Ok(response) => Ok(ProbeOutcome::NotReady(format!(
                "unexpected status {}",
                response.status()
            ))),
            Err(error) => Ok(ProbeOutcome::NotReady(error.to_string())),
        }
    }
}

impl WaitStrategy for HttpProbe {
    fn wait_until_ready<'a>(
        &'a self,
        ctx: &'a ReadinessContext,
        handle: &'a ContainerHandle,
    ) -> WaitFuture<'a> {
        Box::pin(async move {
            let poller = Poller::start(ctx, handle, self.settings);
            let host_port = poller
                .guard("resolve mapped port", async {
                    Ok::<_, ReadinessError>(handle.mapped_port(self.container_port).await?)
                })
                .await?;

            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .pool_max_idle_per_host(0)
                .build()
                .map_err(|error| ReadinessError::ProbeFailed {
                    container_id: handle.id().to_owned(),
                    message: format!("failed to build HTTP client: {error}"),
                })?;

            let url = format!("http://{}:{host_port}{}", self.host, self.path);
            let condition = format!("HTTP GET {url}");
            poller.poll(&condition, || self.probe(&client, &url)).await
        })
    }
}
