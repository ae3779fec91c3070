//! Engine client seam.
//!
//! Each engine call the harness makes is expressed as a small trait with a
//! boxed future so lifecycle and readiness logic can be unit-tested against
//! `mockall` doubles. [`ContainerEngine`] bundles them for injection into
//! handles, and every trait is implemented for `bollard::Docker`.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, CreateImageInfo};
use bollard::query_parameters::{
    CreateImageOptions, InspectContainerOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use futures_util::{Stream, TryStreamExt};

use super::ContainerCreator;

/// Stream of progress messages returned by [`ImagePuller::pull_image`].
pub type PullImageStream<'a> =
    Pin<Box<dyn Stream<Item = Result<CreateImageInfo, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerStarter::start_container`].
pub type StartContainerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerInspector::inspect_container`].
pub type InspectContainerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ContainerInspectResponse, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerRemover::remove_container`].
pub type RemoveContainerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`ContainerLogReader::container_logs`].
pub type ContainerLogsFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<LogOutput>, BollardError>> + Send + 'a>>;

/// Behaviour required to pull an image.
pub trait ImagePuller {
    /// Start pulling an image; the pull completes when the stream ends.
    fn pull_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> PullImageStream<'_>;
}

/// Behaviour required to start a created container.
pub trait ContainerStarter {
    /// Start the container with the given identifier.
    fn start_container(&self, container_id: &str) -> StartContainerFuture<'_>;
}

/// Behaviour required to inspect a container.
pub trait ContainerInspector {
    /// Fetch the engine's current view of the container.
    fn inspect_container(&self, container_id: &str) -> InspectContainerFuture<'_>;
}

/// Behaviour required to remove a container.
pub trait ContainerRemover {
    /// Remove the container with the given options.
    fn remove_container(
        &self,
        container_id: &str,
        options: RemoveContainerOptions,
    ) -> RemoveContainerFuture<'_>;
}

/// Behaviour required to read the logs a container has produced so far.
pub trait ContainerLogReader {
    /// Collect the container's stdout and stderr without following.
    fn container_logs(&self, container_id: &str) -> ContainerLogsFuture<'_>;
}

/// Every engine capability the harness uses, as one injectable client.
pub trait ContainerEngine:
    ImagePuller
    + ContainerCreator
    + ContainerStarter
    + ContainerInspector
    + ContainerRemover
    + ContainerLogReader
    + Send
    + Sync
{
}

impl<T> ContainerEngine for T where
    T: ImagePuller
        + ContainerCreator
        + ContainerStarter
        + ContainerInspector
        + ContainerRemover
        + ContainerLogReader
        + Send
        + Sync
{
}

impl ImagePuller for Docker {
    fn pull_image(
        &self,
        options: CreateImageOptions,
        credentials: Option<DockerCredentials>,
    ) -> PullImageStream<'_> {
        Box::pin(Self::create_image(self, Some(options), None, credentials))
    }
}

impl ContainerStarter for Docker {
    fn start_container(&self, container_id: &str) -> StartContainerFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::start_container(self, &container_id_owned, None::<StartContainerOptions>).await
        })
    }
}

impl ContainerInspector for Docker {
    fn inspect_container(&self, container_id: &str) -> InspectContainerFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::inspect_container(self, &container_id_owned, None::<InspectContainerOptions>)
                .await
        })
    }
}

impl ContainerRemover for Docker {
    fn remove_container(
        &self,
        container_id: &str,
        options: RemoveContainerOptions,
    ) -> RemoveContainerFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::remove_container(self, &container_id_owned, Some(options)).await
        })
    }
}

impl ContainerLogReader for Docker {
    fn container_logs(&self, container_id: &str) -> ContainerLogsFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            let options = LogsOptions {
                stdout: true,
                stderr: true,
                follow: false,
                ..LogsOptions::default()
            };
            Self::logs(self, &container_id_owned, Some(options))
                .try_collect::<Vec<_>>()
                .await
        })
    }
}
