//! Container creation from a [`ContainerRequest`].
//!
//! This module translates a request into a `Bollard` container-create payload
//! (environment, command override, exposed ports and host bindings) and
//! provides the async helper used by the lifecycle operations.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, HostConfig};
use bollard::query_parameters::CreateContainerOptions;

use super::EngineConnector;
use crate::engine::ports::PortSpecs;
use crate::engine::request::ContainerRequest;
use crate::error::{ContainerError, RequestError, TestpodError};

/// Boxed future type returned by [`ContainerCreator`] implementors.
pub type CreateContainerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ContainerCreateResponse, bollard::errors::Error>> + Send + 'a>,
>;

/// Behaviour required to create a container via a backing engine client.
///
/// This abstraction exists to keep container-creation logic testable without a
/// running daemon.
pub trait ContainerCreator {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_>;
}

impl ContainerCreator for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }
}

/// A request that passed validation and is ready to be sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainerPlan {
    image: String,
    ports: PortSpecs,
    env: Vec<String>,
    cmd: Option<Vec<String>>,
}

impl CreateContainerPlan {
    /// Validate `image` and `request` without touching the engine.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::MissingRequired` when `image` is blank and
    /// `RequestError::InvalidPortSpec` when a port specification is malformed.
    pub fn new(image: &str, request: &ContainerRequest) -> Result<Self, TestpodError> {
        let validated_image = validate_image(image)?;
        let ports = PortSpecs::parse(request.exposed_ports())?;

        Ok(Self {
            image: String::from(validated_image),
            ports,
            env: request.env_list(),
            cmd: request.cmd_args(),
        })
    }

    /// Return the validated image reference.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the parsed port specifications.
    #[must_use]
    pub const fn ports(&self) -> &PortSpecs {
        &self.ports
    }

    /// Return the flattened environment entries.
    #[must_use]
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Return the command override, if any.
    #[must_use]
    pub fn cmd(&self) -> Option<&[String]> {
        self.cmd.as_deref()
    }

    fn to_create_body(&self) -> ContainerCreateBody {
        let exposed_ports = (!self.ports.is_empty()).then(|| self.ports.to_exposed_ports());
        let port_bindings = (!self.ports.is_empty()).then(|| self.ports.to_port_map());

        ContainerCreateBody {
            image: Some(self.image.clone()),
            env: (!self.env.is_empty()).then(|| self.env.clone()),
            cmd: self.cmd.clone(),
            exposed_ports,
            host_config: Some(HostConfig {
                port_bindings,
                ..HostConfig::default()
            }),
            ..ContainerCreateBody::default()
        }
    }
}

impl EngineConnector {
    /// Create a container from a validated plan (async version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CreateFailed` when the engine rejects the
    /// create request.
    pub async fn create_container_async<C: ContainerCreator + ?Sized>(
        creator: &C,
        plan: &CreateContainerPlan,
    ) -> Result<String, ContainerError> {
        let response = creator
            .create_container(None, plan.to_create_body())
            .await
            .map_err(|error| ContainerError::CreateFailed {
                image: String::from(plan.image()),
                message: error.to_string(),
            })?;

        for warning in &response.warnings {
            tracing::warn!(container_id = %response.id, %warning, "engine warning on create");
        }

        Ok(response.id)
    }
}

fn validate_image(image: &str) -> Result<&str, RequestError> {
    let trimmed = image.trim();

    if trimmed.is_empty() {
        return Err(RequestError::MissingRequired {
            field: String::from("image"),
        });
    }

    Ok(trimmed)
}
