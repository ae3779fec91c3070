//! Wait for a message in the container logs.

use std::time::Duration;

use bollard::container::LogOutput;

use super::{PollSettings, Poller, ProbeOutcome, ReadinessContext, WaitFuture, WaitStrategy};
use crate::engine::ContainerHandle;
use crate::error::{ContainerError, ReadinessError};

/// Ready once the container's stdout and stderr together contain `message`
/// at least `occurrences` times.
///
/// Each probe fetches the logs written so far without following them.
#[derive(Debug, Clone)]
pub struct LogMessage {
    message: String,
    occurrences: usize,
    settings: PollSettings,
}

impl LogMessage {
    /// Wait for one occurrence of `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            occurrences: 1,
            settings: PollSettings::default(),
        }
    }

    /// Require `occurrences` matches, for images that restart their server
    /// once during initialisation. Zero is treated as one.
    #[must_use]
    pub fn with_occurrences(mut self, occurrences: usize) -> Self {
        self.occurrences = occurrences.max(1);
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

    async fn probe(&self, handle: &ContainerHandle) -> Result<ProbeOutcome, ReadinessError> {
        let chunks = handle
            .engine()
            .container_logs(handle.id())
            .await
            .map_err(|error| ContainerError::LogsFailed {
                container_id: handle.id().to_owned(),
                message: error.to_string(),
            })?;

        let seen = count_occurrences(&chunks, &self.message);
        if seen >= self.occurrences {
            Ok(ProbeOutcome::Ready)
        } else {
            Ok(ProbeOutcome::NotReady(format!(
                "seen {seen} of {} occurrences",
                self.occurrences
            )))
        }
    }
}

impl WaitStrategy for LogMessage {
    fn wait_until_ready<'a>(
        &'a self,
        ctx: &'a ReadinessContext,
        handle: &'a ContainerHandle,
    ) -> WaitFuture<'a> {
        Box::pin(async move {
            let condition = format!("log message {:?}", self.message);
            Poller::start(ctx, handle, self.settings)
                .poll(&condition, || self.probe(handle))
                .await
        })
    }
}

/// Count matches per stream after joining its frames, since the engine may
/// split one written line across several frames.
fn count_occurrences(chunks: &[LogOutput], needle: &str) -> usize {
    if needle.is_empty() {
        return usize::MAX;
    }

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    for chunk in chunks {
        match chunk {
            LogOutput::StdErr { message } => stderr.extend_from_slice(message.as_ref()),
            LogOutput::StdOut { message }
            | LogOutput::StdIn { message }
            | LogOutput::Console { message } => stdout.extend_from_slice(message.as_ref()),
        }
    }

    [stdout, stderr]
        .iter()
        .map(|stream| String::from_utf8_lossy(stream).matches(needle).count())
        .sum()
}
