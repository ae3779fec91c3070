//! The `run_container` lifecycle operation.
//!
//! A run validates the request, pulls the image, creates and starts the
//! container, then waits for the request's readiness strategy. Nothing is
//! sent to the engine until validation has passed. A container that fails to
//! start is removed again before the error is returned.

use std::sync::Arc;

use super::{ContainerEngine, CreateContainerPlan, EngineConnector};
use crate::engine::handle::{ContainerHandle, force_remove};
use crate::engine::request::ContainerRequest;
use crate::error::{ContainerError, RunError};
use crate::wait::ReadinessContext;

impl EngineConnector {
    /// Start a container from `image` as described by `request`.
    ///
    /// The readiness wait runs under `ctx`; a cancelled or expired context
    /// aborts it with a timeout-class error.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] without a handle when validation, pull,
    /// creation, or start fails. When the container started but the
    /// readiness strategy failed, the error carries the handle so the caller
    /// can terminate the container.
    pub async fn run_container_async(
        engine: Arc<dyn ContainerEngine>,
        ctx: &ReadinessContext,
        image: &str,
        request: &ContainerRequest,
    ) -> Result<ContainerHandle, RunError> {
        let plan = CreateContainerPlan::new(image, request)
            .map_err(|error| RunError::before_start(image, error))?;

        if request.skip_pull() {
            tracing::debug!(image = plan.image(), "image pull skipped");
        } else {
            Self::pull_image_async(engine.as_ref(), plan.image(), request.registry_auth())
                .await
                .map_err(|error| RunError::before_start(image, error))?;
        }

        let container_id = Self::create_container_async(engine.as_ref(), &plan)
            .await
            .map_err(|error| RunError::before_start(image, error))?;
        tracing::info!(image = plan.image(), %container_id, "container created");

        start_or_remove(engine.as_ref(), &container_id)
            .await
            .map_err(|error| RunError::before_start(image, error))?;
        tracing::info!(image = plan.image(), %container_id, "container started");

        let handle = ContainerHandle::new(container_id, engine);

        if let Some(strategy) = request.wait_strategy() {
            if let Err(error) = strategy.wait_until_ready(ctx, &handle).await {
                tracing::warn!(
                    container_id = handle.id(),
                    ?strategy,
                    %error,
                    "container did not become ready"
                );
                return Err(RunError::not_ready(image, handle, error));
            }
            tracing::info!(container_id = handle.id(), ?strategy, "container ready");
        }

        Ok(handle)
    }

    /// Start a container from `image` as described by `request` (blocking
    /// version).
    ///
    /// Runs [`Self::run_container_async`] on the given runtime. Use the async
    /// version when already inside an async context.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::run_container_async`].
    pub fn run_container_blocking(
        runtime: &tokio::runtime::Handle,
        engine: Arc<dyn ContainerEngine>,
        ctx: &ReadinessContext,
        image: &str,
        request: &ContainerRequest,
    ) -> Result<ContainerHandle, RunError> {
        runtime.block_on(Self::run_container_async(engine, ctx, image, request))
    }
}

/// Start the container, force-removing it when the start fails.
async fn start_or_remove(
    engine: &dyn ContainerEngine,
    container_id: &str,
) -> Result<(), ContainerError> {
    let Err(start_error) = engine.start_container(container_id).await else {
        return Ok(());
    };
    let message = start_error.to_string();

    match force_remove(engine, container_id).await {
        Ok(()) => {
            tracing::warn!(%container_id, %message, "container failed to start and was removed");
            Err(ContainerError::StartFailed {
                container_id: container_id.to_owned(),
                message,
            })
        }
        Err(cleanup_error) => {
            tracing::warn!(
                %container_id,
                %message,
                cleanup_error = %cleanup_error,
                "container failed to start and could not be removed"
            );
            let cleanup_message = match cleanup_error {
                ContainerError::RemoveFailed { message, .. } => message,
                other => other.to_string(),
            };
            Err(ContainerError::StartFailedCleanupFailed {
                container_id: container_id.to_owned(),
                message,
                cleanup_message,
            })
        }
    }
}
