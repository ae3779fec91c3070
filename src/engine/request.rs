//! Container request descriptor.

use std::collections::BTreeMap;
use std::fmt;

use bollard::auth::DockerCredentials;

use crate::wait::WaitStrategy;

/// Registry credentials passed through to the engine when pulling.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
    server_address: Option<String>,
    identity_token: Option<String>,
}

impl RegistryAuth {
    /// Credentials made of a username and password.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Credentials made of an identity token issued by the registry.
    #[must_use]
    pub fn identity_token(token: impl Into<String>) -> Self {
        Self {
            identity_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Set the registry the credentials belong to.
    #[must_use]
    pub fn with_server_address(mut self, server_address: impl Into<String>) -> Self {
        self.server_address = Some(server_address.into());
        self
    }

    /// Return the configured username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Return the configured registry address.
    #[must_use]
    pub fn server_address(&self) -> Option<&str> {
        self.server_address.as_deref()
    }

    pub(crate) fn to_docker_credentials(&self) -> DockerCredentials {
        DockerCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
            serveraddress: self.server_address.clone(),
            identitytoken: self.identity_token.clone(),
            ..DockerCredentials::default()
        }
    }
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("server_address", &self.server_address)
            .field(
                "identity_token",
                &self.identity_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Desired state of a container before creation.
///
/// Built with the `with_*` methods and handed to
/// [`EngineConnector::run_container_async`](crate::engine::EngineConnector::run_container_async)
/// by reference; the run never modifies it.
#[derive(Debug, Default)]
pub struct ContainerRequest {
    env: BTreeMap<String, String>,
    exposed_ports: Vec<String>,
    cmd: Option<String>,
    registry_auth: Option<RegistryAuth>,
    wait_strategy: Option<Box<dyn WaitStrategy>>,
    skip_pull: bool,
}

impl ContainerRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable, replacing an earlier value for `key`.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add a port export specification such as `8080:80` or `5432/tcp`.
    #[must_use]
    pub fn with_exposed_port(mut self, spec: impl Into<String>) -> Self {
        self.exposed_ports.push(spec.into());
        self
    }

    /// Override the image command; the string is split on whitespace.
    #[must_use]
    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = Some(cmd.into());
        self
    }

    /// Pull with the given registry credentials.
    #[must_use]
    pub fn with_registry_auth(mut self, auth: RegistryAuth) -> Self {
        self.registry_auth = Some(auth);
        self
    }

    /// Block `run_container` until the strategy reports the container ready.
    #[must_use]
    pub fn waiting_for(mut self, strategy: impl WaitStrategy + 'static) -> Self {
        self.wait_strategy = Some(Box::new(strategy));
        self
    }

    /// Skip the image pull, for images that only exist locally.
    #[must_use]
    pub const fn with_skip_pull(mut self, skip_pull: bool) -> Self {
        self.skip_pull = skip_pull;
        self
    }

    /// Return the environment mapping.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Return the environment flattened into `KEY=value` entries.
    #[must_use]
    pub fn env_list(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }

    /// Return the port export specifications.
    #[must_use]
    pub fn exposed_ports(&self) -> &[String] {
        &self.exposed_ports
    }

    /// Return the raw command string.
    #[must_use]
    pub fn cmd(&self) -> Option<&str> {
        self.cmd.as_deref()
    }

    /// Return the command tokens, or `None` to keep the image default.
    #[must_use]
    pub fn cmd_args(&self) -> Option<Vec<String>> {
        let tokens: Vec<String> = self
            .cmd
            .as_deref()?
            .split_whitespace()
            .map(String::from)
            .collect();
        (!tokens.is_empty()).then_some(tokens)
    }

    /// Return the registry credentials.
    #[must_use]
    pub const fn registry_auth(&self) -> Option<&RegistryAuth> {
        self.registry_auth.as_ref()
    }

    /// Return the readiness strategy.
    #[must_use]
    pub fn wait_strategy(&self) -> Option<&dyn WaitStrategy> {
        self.wait_strategy.as_deref()
    }

    /// Return whether the pull step is skipped.
    #[must_use]
    pub const fn skip_pull(&self) -> bool {
        self.skip_pull
    }
}
