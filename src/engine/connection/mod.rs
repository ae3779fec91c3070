//! Socket resolution and container engine connection.
//!
//! This module resolves the engine endpoint from configuration, the usual
//! engine environment variables, and platform defaults, and connects to it
//! through `Bollard`. The lifecycle operations (`pull_image`,
//! `create_container`, `run_container`) live in submodules as further
//! `impl EngineConnector` blocks.

mod client;
mod create_container;
mod error_classification;
mod health_check;
mod pull_image;
mod run_container;

use bollard::Docker;

pub use client::{
    ContainerEngine, ContainerInspector, ContainerLogReader, ContainerLogsFuture,
    ContainerRemover, ContainerStarter, ImagePuller, InspectContainerFuture, PullImageStream,
    RemoveContainerFuture, StartContainerFuture,
};
pub use create_container::{ContainerCreator, CreateContainerFuture, CreateContainerPlan};
pub use pull_image::ImageReference;

use crate::error::ContainerError;

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for Docker/Podman API connections.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine socket endpoints from environment variables.
///
/// # Example
///
/// ```ignore
/// use mockable::DefaultEnv;
/// use testpod::engine::SocketResolver;
///
/// let env = DefaultEnv::new();
/// let resolver = SocketResolver::new(&env);
///
/// if let Some(socket) = resolver.resolve_from_env() {
///     println!("Found socket: {}", socket);
/// }
/// ```
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the socket endpoint from `DOCKER_HOST`, `CONTAINER_HOST`,
    /// then `PODMAN_HOST`, skipping unset and empty values.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default socket path.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Classifies socket endpoint types for connection handling.
enum SocketType {
    /// Unix socket or Windows named pipe with explicit scheme.
    Socket,
    /// HTTP, HTTPS, or TCP endpoint (TCP is rewritten to HTTP).
    Http,
    /// Bare path without scheme prefix.
    BarePath,
}

impl SocketType {
    fn is_socket_scheme(socket: &str) -> bool {
        socket.starts_with("unix://") || socket.starts_with("npipe://")
    }

    fn is_http_scheme(socket: &str) -> bool {
        socket.starts_with("tcp://")
            || socket.starts_with("http://")
            || socket.starts_with("https://")
    }

    fn classify(socket: &str) -> Self {
        match (Self::is_socket_scheme(socket), Self::is_http_scheme(socket)) {
            (true, _) => Self::Socket,
            (_, true) => Self::Http,
            _ => Self::BarePath,
        }
    }
}

/// Entry point for connecting to the container engine and driving
/// container lifecycles through it.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at the specified socket path.
    ///
    /// Supports `unix://` sockets, `npipe://` named pipes, `tcp://` (treated
    /// as HTTP), `http://` and `https://` endpoints. Bare paths starting with
    /// `\\` or `//` are treated as named pipes and every other bare path as a
    /// Unix socket.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::SocketNotFound` or
    /// `ContainerError::PermissionDenied` when the socket path is missing or
    /// inaccessible, and `ContainerError::ConnectionFailed` otherwise.
    pub fn connect(socket: &str) -> Result<Docker, ContainerError> {
        let socket_uri = match SocketType::classify(socket) {
            SocketType::Socket => socket.to_owned(),
            SocketType::Http => socket.replacen("tcp://", "http://", 1),
            SocketType::BarePath => Self::normalize_bare_path(socket),
        };

        let connected = if socket_uri.starts_with("http") {
            Docker::connect_with_http(
                &socket_uri,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        } else {
            Docker::connect_with_socket(
                &socket_uri,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        };

        connected.map_err(|error| {
            error_classification::classify_connection_error(&error, &socket_uri)
        })
    }

    /// Normalize a bare socket path to a URI with the appropriate scheme.
    ///
    /// Detection is based on path syntax, not the current platform.
    fn normalize_bare_path(path: &str) -> String {
        if path.starts_with("\\\\") || path.starts_with("//") {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }

    /// Connect using the resolved socket from configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect`].
    pub fn connect_with_fallback<S: AsRef<str> + ?Sized, E: mockable::Env>(
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, ContainerError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        tracing::debug!(%socket, "connecting to container engine");
        Self::connect(&socket)
    }

    /// Resolves the socket endpoint without establishing a connection.
    ///
    /// Resolution order:
    /// 1. `config_socket` (config file or `TESTPOD_ENGINE_SOCKET`)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST` (via resolver)
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<S: AsRef<str> + ?Sized, E: mockable::Env>(
        config_socket: Option<&S>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .map(AsRef::as_ref)
            .filter(|socket| !socket.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| SocketResolver::<E>::default_socket().to_owned())
    }
}
