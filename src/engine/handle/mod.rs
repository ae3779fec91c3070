//! Handle to a container started by the harness.
//!
//! A [`ContainerHandle`] pairs the engine-assigned identifier with the engine
//! client it was created through and a lazily populated inspection snapshot.
//! Address and port accessors read the snapshot, which is fetched at most once
//! until [`ContainerHandle::refresh`] is called.

mod cache;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bollard::models::{ContainerInspectResponse, EndpointSettings, PortBinding};
use bollard::query_parameters::RemoveContainerOptions;
use futures_util::FutureExt;

use self::cache::InspectionCache;
use super::connection::ContainerEngine;
use super::ports::ExposedPort;
use crate::error::ContainerError;

/// Network the engine attaches containers to when none is requested.
const DEFAULT_NETWORK: &str = "bridge";

/// Reference to one container known to the engine.
///
/// Clones share the identifier, the engine client, and the inspection cache.
/// Handles created separately share nothing mutable.
#[derive(Clone)]
pub struct ContainerHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: String,
    engine: Arc<dyn ContainerEngine>,
    cache: InspectionCache,
}

impl ContainerHandle {
    /// Wrap an existing container identifier.
    #[must_use]
    pub fn new(id: impl Into<String>, engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: id.into(),
                engine,
                cache: InspectionCache::new(),
            }),
        }
    }

    /// Return the engine-assigned container identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub(crate) fn engine(&self) -> &dyn ContainerEngine {
        self.inner.engine.as_ref()
    }

    /// Return the inspection snapshot, inspecting the container on first use.
    ///
    /// Concurrent first calls share a single engine round trip and observe
    /// the same snapshot or the same error. A failed inspection is not
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` when the engine cannot be
    /// reached or no longer knows the container.
    pub async fn inspect(&self) -> Result<Arc<ContainerInspectResponse>, ContainerError> {
        let engine = Arc::clone(&self.inner.engine);
        let id = self.inner.id.clone();
        self.inner
            .cache
            .get_or_fetch(move || {
                async move { inspect_uncached(engine.as_ref(), &id).await }.boxed()
            })
            .await
    }

    /// Inspect the container without reading or populating the cache.
    pub(crate) async fn inspect_fresh(&self) -> Result<ContainerInspectResponse, ContainerError> {
        inspect_uncached(self.engine(), self.id()).await
    }

    /// Discard the cached snapshot so the next accessor inspects again.
    pub fn refresh(&self) {
        self.inner.cache.invalidate();
        tracing::debug!(container_id = %self.id(), "inspection cache invalidated");
    }

    /// Return the address assigned to the container.
    ///
    /// The default bridge endpoint is preferred; otherwise the first attached
    /// network (by name) with a non-empty address is used. `None` means the
    /// container has no address, for example when it uses host networking.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` when inspection fails.
    pub async fn ip_address(&self) -> Result<Option<String>, ContainerError> {
        let snapshot = self.inspect().await?;
        Ok(assigned_address(&snapshot))
    }

    /// Return the host port bound to `container_port`.
    ///
    /// Only the numeric port is compared; when the port is published for
    /// several protocols, TCP wins.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::PortNotFound` when the snapshot has no
    /// binding for the port, `ContainerError::InvalidHostPort` when the engine
    /// reports a host port that is not a number, and
    /// `ContainerError::InspectFailed` when inspection fails.
    pub async fn mapped_port(&self, container_port: u16) -> Result<u16, ContainerError> {
        let snapshot = self.inspect().await?;
        let host_port =
            find_host_port(&snapshot, container_port).ok_or_else(|| ContainerError::PortNotFound {
                container_id: self.id().to_owned(),
                port: container_port,
            })?;

        let parsed = host_port
            .parse::<u16>()
            .map_err(|_| ContainerError::InvalidHostPort {
                container_id: self.id().to_owned(),
                port: container_port,
                host_port: host_port.to_owned(),
            })?;

        tracing::info!(
            container_id = %self.id(),
            container_port,
            host_port = parsed,
            "resolved mapped port"
        );
        Ok(parsed)
    }

    /// Return every port the container declares as exposed.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` when inspection fails.
    pub async fn liveness_check_ports(&self) -> Result<BTreeSet<ExposedPort>, ContainerError> {
        let snapshot = self.inspect().await?;
        Ok(declared_ports(&snapshot))
    }

    /// Force-remove the container from the engine.
    ///
    /// Removal is not idempotent: terminating an already removed container
    /// reports the engine's error.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RemoveFailed` when the engine rejects the
    /// removal.
    pub async fn terminate(&self) -> Result<(), ContainerError> {
        force_remove(self.engine(), self.id()).await?;
        tracing::info!(container_id = %self.id(), "container terminated");
        Ok(())
    }

    /// Force-remove the container (blocking version).
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RemoveFailed` when the engine rejects the
    /// removal.
    pub fn terminate_blocking(
        &self,
        runtime: &tokio::runtime::Handle,
    ) -> Result<(), ContainerError> {
        runtime.block_on(self.terminate())
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

pub(crate) async fn force_remove<E: ContainerEngine + ?Sized>(
    engine: &E,
    container_id: &str,
) -> Result<(), ContainerError> {
    let options = RemoveContainerOptions {
        force: true,
        ..RemoveContainerOptions::default()
    };
    engine
        .remove_container(container_id, options)
        .await
        .map_err(|error| ContainerError::RemoveFailed {
            container_id: container_id.to_owned(),
            message: error.to_string(),
        })
}

async fn inspect_uncached<E: ContainerEngine + ?Sized>(
    engine: &E,
    container_id: &str,
) -> Result<ContainerInspectResponse, ContainerError> {
    engine
        .inspect_container(container_id)
        .await
        .map_err(|error| ContainerError::InspectFailed {
            container_id: container_id.to_owned(),
            message: error.to_string(),
        })
}

fn assigned_address(snapshot: &ContainerInspectResponse) -> Option<String> {
    let networks = snapshot.network_settings.as_ref()?.networks.as_ref()?;

    if let Some(address) = networks.get(DEFAULT_NETWORK).and_then(endpoint_address) {
        return Some(address);
    }

    let mut names: Vec<&String> = networks.keys().collect();
    names.sort();
    names
        .into_iter()
        .find_map(|name| networks.get(name).and_then(endpoint_address))
}

fn endpoint_address(endpoint: &EndpointSettings) -> Option<String> {
    endpoint
        .ip_address
        .as_deref()
        .filter(|address| !address.is_empty())
        .map(String::from)
}

fn find_host_port(snapshot: &ContainerInspectResponse, container_port: u16) -> Option<&str> {
    let ports = snapshot.network_settings.as_ref()?.ports.as_ref()?;

    let mut candidates: Vec<(ExposedPort, &Vec<PortBinding>)> = ports
        .iter()
        .filter_map(|(key, bindings)| {
            let exposed = key.parse::<ExposedPort>().ok()?;
            if exposed.port() != container_port {
                return None;
            }
            Some((exposed, bindings.as_ref()?))
        })
        .collect();
    candidates.sort_by_key(|(exposed, _)| *exposed);

    candidates.into_iter().find_map(|(_, bindings)| {
        bindings.iter().find_map(|binding| {
            binding
                .host_port
                .as_deref()
                .filter(|host_port| !host_port.is_empty())
        })
    })
}

fn declared_ports(snapshot: &ContainerInspectResponse) -> BTreeSet<ExposedPort> {
    snapshot
        .config
        .as_ref()
        .and_then(|config| config.exposed_ports.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|key| key.parse::<ExposedPort>().ok())
        .collect()
}
