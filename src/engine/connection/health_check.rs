//! Engine health check and connect-and-verify helpers.
//!
//! `Docker::connect_*` never touches the socket, so a suite that wants to
//! fail fast when no engine is running pings it once before starting
//! containers.

use std::time::Duration;

use bollard::Docker;

use super::{EngineConnector, HEALTH_CHECK_TIMEOUT_SECS, SocketResolver, error_classification};
use crate::error::ContainerError;

impl EngineConnector {
    /// Ping the engine, bounded by the health check timeout.
    ///
    /// With `socket_uri` set, a transport failure is classified against the
    /// socket path; otherwise it is reported as `HealthCheckFailed`.
    async fn ping_with_timeout(
        docker: &Docker,
        socket_uri: Option<&str>,
    ) -> Result<(), ContainerError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        let response = tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| ContainerError::HealthCheckTimeout {
                seconds: HEALTH_CHECK_TIMEOUT_SECS,
            })?;

        response.map(drop).map_err(|error| match socket_uri {
            Some(uri) => match error_classification::classify_connection_error(&error, uri) {
                ContainerError::ConnectionFailed { message } => {
                    ContainerError::HealthCheckFailed { message }
                }
                classified => classified,
            },
            None => ContainerError::HealthCheckFailed {
                message: error.to_string(),
            },
        })
    }

    /// Verify the container engine is responsive (async version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckFailed` if the engine does not
    /// respond correctly and `ContainerError::HealthCheckTimeout` if the ping
    /// does not complete in time.
    pub async fn health_check_async(docker: &Docker) -> Result<(), ContainerError> {
        Self::ping_with_timeout(docker, None).await
    }

    /// Verify the container engine is responsive.
    ///
    /// Runs [`Self::health_check_async`] on the given runtime.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::health_check_async`].
    pub fn health_check(
        runtime: &tokio::runtime::Handle,
        docker: &Docker,
    ) -> Result<(), ContainerError> {
        runtime.block_on(Self::health_check_async(docker))
    }

    /// Create a dedicated runtime for callers outside any async context.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` if the runtime cannot
    /// be built.
    pub fn create_runtime() -> Result<tokio::runtime::Runtime, ContainerError> {
        tokio::runtime::Runtime::new().map_err(|error| ContainerError::RuntimeCreationFailed {
            message: error.to_string(),
        })
    }

    /// Connect to `socket` and verify the engine responds (async version).
    ///
    /// # Errors
    ///
    /// Returns the connection errors of [`Self::connect`],
    /// `ContainerError::SocketNotFound` or `ContainerError::PermissionDenied`
    /// when the ping cannot reach the socket, and the health check errors of
    /// [`Self::health_check_async`].
    pub async fn connect_and_verify_async(
        socket: impl AsRef<str>,
    ) -> Result<Docker, ContainerError> {
        let socket_str = socket.as_ref();
        let docker = Self::connect(socket_str)?;
        let socket_uri = if socket_str.contains("://") {
            socket_str.to_owned()
        } else {
            Self::normalize_bare_path(socket_str)
        };
        Self::ping_with_timeout(&docker, Some(&socket_uri)).await?;
        tracing::info!(socket = %socket_str, "container engine is responsive");
        Ok(docker)
    }

    /// Resolve the socket, connect, and verify the engine responds (async
    /// version).
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect_and_verify_async`].
    pub async fn connect_with_fallback_and_verify_async<
        S: AsRef<str> + ?Sized,
        E: mockable::Env,
    >(
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, ContainerError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        Self::connect_and_verify_async(socket).await
    }

    /// Resolve the socket, connect, and verify the engine responds.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect_and_verify_async`].
    pub fn connect_with_fallback_and_verify<S: AsRef<str> + ?Sized, E: mockable::Env>(
        runtime: &tokio::runtime::Handle,
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, ContainerError> {
        runtime.block_on(Self::connect_with_fallback_and_verify_async(
            config_socket,
            resolver,
        ))
    }
}
