//! Semantic error types for testpod.
//!
//! Conditions a caller might inspect or branch on (a missing port binding,
//! a readiness timeout, an engine rejection) are modelled as `thiserror`
//! enums. Test code is expected to convert them into `eyre::Report` at its
//! own boundary when it only wants a readable failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::engine::ContainerHandle;

/// Errors that can occur while loading harness configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error while merging layers.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while validating a container request before any engine
/// call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A required request field is missing or blank.
    #[error("missing required request field: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A port export specification could not be parsed.
    #[error("invalid port specification '{spec}': {reason}")]
    InvalidPortSpec {
        /// The specification as supplied by the caller.
        spec: String,
        /// Why the specification was rejected.
        reason: String,
    },
}

/// Errors that can occur during container engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Failed to connect to the container engine socket.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// The image pull was rejected or its progress stream reported an error.
    #[error("failed to pull image '{image}': {message}")]
    PullFailed {
        /// The image reference being pulled.
        image: String,
        /// A description of the pull failure.
        message: String,
    },

    /// Failed to create a container.
    #[error("failed to create container from image '{image}': {message}")]
    CreateFailed {
        /// The image the container was created from.
        image: String,
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container; the created container was removed.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// The ID of the container that failed to start.
        container_id: String,
        /// A description of the start failure.
        message: String,
    },

    /// Failed to start a container, and removing it afterwards failed too.
    #[error(
        "failed to start container '{container_id}': {message} \
         (cleanup also failed: {cleanup_message})"
    )]
    StartFailedCleanupFailed {
        /// The ID of the container that failed to start and may still exist.
        container_id: String,
        /// A description of the start failure.
        message: String,
        /// A description of the removal failure.
        cleanup_message: String,
    },

    /// Failed to inspect a container.
    #[error("failed to inspect container '{container_id}': {message}")]
    InspectFailed {
        /// The ID of the inspected container.
        container_id: String,
        /// A description of the inspection failure.
        message: String,
    },

    /// Failed to remove a container.
    #[error("failed to remove container '{container_id}': {message}")]
    RemoveFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the removal failure.
        message: String,
    },

    /// Failed to read container logs.
    #[error("failed to read logs of container '{container_id}': {message}")]
    LogsFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the failure.
        message: String,
    },

    /// The inspected port bindings hold no entry for the requested port.
    #[error("container '{container_id}' has no mapped port for {port}")]
    PortNotFound {
        /// The ID of the inspected container.
        container_id: String,
        /// The container-side port that was looked up.
        port: u16,
    },

    /// The engine reported a host port that is not a valid port number.
    #[error("container '{container_id}' maps port {port} to invalid host port '{host_port}'")]
    InvalidHostPort {
        /// The ID of the inspected container.
        container_id: String,
        /// The container-side port that was looked up.
        port: u16,
        /// The raw host port reported by the engine.
        host_port: String,
    },

    /// Health check failed: the engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// A Tokio runtime for a blocking helper could not be created.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the failure.
        message: String,
    },
}

/// Errors returned by readiness strategies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    /// The readiness condition was not observed before the deadline.
    #[error("container '{container_id}' was not ready after {waited:?}: {condition}")]
    Timeout {
        /// The ID of the container being waited on.
        container_id: String,
        /// The condition the strategy was waiting for.
        condition: String,
        /// How long the strategy waited before giving up.
        waited: Duration,
    },

    /// The caller cancelled the wait before the condition was observed.
    #[error("waiting for container '{container_id}' was cancelled: {condition}")]
    Cancelled {
        /// The ID of the container being waited on.
        container_id: String,
        /// The condition the strategy was waiting for.
        condition: String,
    },

    /// A probe failed in a way that polling again cannot fix.
    #[error("readiness probe for container '{container_id}' failed: {message}")]
    ProbeFailed {
        /// The ID of the container being probed.
        container_id: String,
        /// A description of the failure.
        message: String,
    },

    /// An engine call made by the probe failed.
    #[error(transparent)]
    Engine(#[from] ContainerError),
}

impl ReadinessError {
    /// Returns `true` for the timeout class: deadline elapsed or cancelled.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled { .. })
    }
}

/// Top-level error type for testpod.
#[derive(Debug, Error)]
pub enum TestpodError {
    /// An error occurred during configuration loading.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The container request was invalid.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// An error occurred during a container engine operation.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The container did not become ready.
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
}

/// A specialised `Result` type for testpod operations.
pub type Result<T> = std::result::Result<T, TestpodError>;

/// Failure returned by `run_container`.
///
/// When the failure happened after the container was started (the readiness
/// wait failed), the error still owns the container handle so the caller can
/// terminate it.
#[derive(Debug, Error)]
#[error("failed to run container from image '{image}'")]
pub struct RunError {
    image: String,
    handle: Option<ContainerHandle>,
    #[source]
    source: TestpodError,
}

impl RunError {
    pub(crate) fn before_start(image: &str, source: impl Into<TestpodError>) -> Self {
        Self {
            image: String::from(image),
            handle: None,
            source: source.into(),
        }
    }

    pub(crate) fn not_ready(image: &str, handle: ContainerHandle, source: ReadinessError) -> Self {
        Self {
            image: String::from(image),
            handle: Some(handle),
            source: TestpodError::Readiness(source),
        }
    }

    /// Return the image the run was requested for.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the handle of the started container, if one exists.
    #[must_use]
    pub const fn handle(&self) -> Option<&ContainerHandle> {
        self.handle.as_ref()
    }

    /// Return the underlying failure.
    #[must_use]
    pub const fn error(&self) -> &TestpodError {
        &self.source
    }

    /// Split into the optional handle and the underlying failure.
    #[must_use]
    pub fn into_parts(self) -> (Option<ContainerHandle>, TestpodError) {
        (self.handle, self.source)
    }
}
