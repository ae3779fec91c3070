//! Container engine connection and lifecycle.
//!
//! This module connects to a Docker-compatible engine, runs containers from
//! a [`ContainerRequest`], and exposes the started container through a
//! [`ContainerHandle`]. The socket endpoint is resolved through a
//! priority-based fallback chain:
//!
//! 1. Config file (`engine_socket` in TOML)
//! 2. `TESTPOD_ENGINE_SOCKET` environment variable
//! 3. `DOCKER_HOST` environment variable
//! 4. `CONTAINER_HOST` environment variable
//! 5. `PODMAN_HOST` environment variable
//! 6. Platform default (`/var/run/docker.sock` on Unix)

mod connection;
mod handle;
mod ports;
mod request;

pub use connection::{
    ContainerCreator, ContainerEngine, ContainerInspector, ContainerLogReader,
    ContainerLogsFuture, ContainerRemover, ContainerStarter, CreateContainerFuture,
    CreateContainerPlan, EngineConnector, ImagePuller, ImageReference, InspectContainerFuture,
    PullImageStream, RemoveContainerFuture, SocketResolver, StartContainerFuture,
};
pub use handle::ContainerHandle;
pub use ports::{ExposedPort, HostBinding, PortSpecs, Protocol};
pub use request::{ContainerRequest, RegistryAuth};
