//! Image pulling.
//!
//! The engine reports pull progress as a stream; the pull has finished only
//! once the stream ends, so the helper drains it completely. Any error item
//! aborts the pull.

use bollard::query_parameters::CreateImageOptions;
use futures_util::StreamExt;

use super::{EngineConnector, ImagePuller};
use crate::engine::request::RegistryAuth;
use crate::error::ContainerError;

const DEFAULT_TAG: &str = "latest";

/// An image reference split into repository and tag.
///
/// Digest references (`name@sha256:...`) are kept whole with no tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    repository: String,
    tag: Option<String>,
}

impl ImageReference {
    /// Split `image` into repository and tag, defaulting the tag to `latest`.
    ///
    /// A colon only separates a tag when it follows the last `/`, so
    /// registry ports such as `localhost:5000/app` are kept in the
    /// repository.
    #[must_use]
    pub fn parse(image: &str) -> Self {
        if image.contains('@') {
            return Self {
                repository: image.to_owned(),
                tag: None,
            };
        }

        let name_start = image.rfind('/').map_or(0, |slash| slash + 1);
        let (repository, tag) = match image.rfind(':') {
            Some(colon) if colon >= name_start => {
                let (repository, tag) = image.split_at(colon);
                (repository, tag.trim_start_matches(':'))
            }
            _ => (image, DEFAULT_TAG),
        };

        Self {
            repository: repository.to_owned(),
            tag: Some(tag.to_owned()),
        }
    }

    /// Return the repository, including any registry host.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Return the tag, or `None` for digest references.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn to_create_image_options(&self) -> CreateImageOptions {
        CreateImageOptions {
            from_image: Some(self.repository.clone()),
            tag: self.tag.clone(),
            ..CreateImageOptions::default()
        }
    }
}

impl EngineConnector {
    /// Pull `image`, waiting until the engine reports the pull complete.
    ///
    /// Progress messages are logged at debug level and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::PullFailed` when the engine rejects the pull
    /// or reports an error part way through.
    pub async fn pull_image_async<P: ImagePuller + ?Sized>(
        puller: &P,
        image: &str,
        credentials: Option<&RegistryAuth>,
    ) -> Result<(), ContainerError> {
        let reference = ImageReference::parse(image);
        tracing::info!(
            image,
            repository = reference.repository(),
            tag = reference.tag().unwrap_or_default(),
            authenticated = credentials.is_some(),
            "pulling image"
        );

        let mut progress = puller.pull_image(
            reference.to_create_image_options(),
            credentials.map(RegistryAuth::to_docker_credentials),
        );

        while let Some(item) = progress.next().await {
            let info = item.map_err(|error| ContainerError::PullFailed {
                image: image.to_owned(),
                message: error.to_string(),
            })?;
            tracing::debug!(
                image,
                layer = info.id.as_deref().unwrap_or_default(),
                status = info.status.as_deref().unwrap_or_default(),
                "pull progress"
            );
        }

        tracing::info!(image, "image pulled");
        Ok(())
    }
}
