//! Configuration data types for testpod.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::engine::ContainerRequest;
use crate::wait::{HttpProbe, ListeningPort, PollSettings};

/// Default timing applied to readiness strategies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// How long a strategy may wait for the container, in seconds.
    pub startup_timeout_secs: u64,

    /// Pause between readiness probes, in milliseconds. Must be non-zero.
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: 60,
            poll_interval_ms: 100,
        }
    }
}

/// Image pull behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PullConfig {
    /// Skip the pull and use the image already present on the engine.
    pub skip: bool,
}

/// Harness-wide defaults.
///
/// Loaded with layered precedence (lowest to highest): defaults,
/// configuration file, environment variables.
///
/// Configuration files are discovered in this order:
/// 1. Path given to the loader explicitly
/// 2. Path in the `TESTPOD_CONFIG_PATH` environment variable
/// 3. `.testpod.toml` in the current working directory
/// 4. `.testpod.toml` in the home directory
/// 5. `~/.config/testpod/config.toml` (XDG default)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "TESTPOD",
    discovery(
        app_name = "testpod",
        env_var = "TESTPOD_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".testpod.toml",
    )
)]
pub struct TestpodConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Host that TCP and HTTP readiness probes connect to.
    #[serde(default = "default_probe_host")]
    #[ortho_config(skip_cli)]
    pub probe_host: String,

    /// Readiness timing defaults.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub readiness: ReadinessConfig,

    /// Image pull behaviour.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub pull: PullConfig,
}

fn default_probe_host() -> String {
    String::from("127.0.0.1")
}

impl Default for TestpodConfig {
    fn default() -> Self {
        Self {
            engine_socket: None,
            probe_host: default_probe_host(),
            readiness: ReadinessConfig::default(),
            pull: PullConfig::default(),
        }
    }
}

impl TestpodConfig {
    /// Readiness timing built from the `[readiness]` section.
    #[must_use]
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_secs(self.readiness.startup_timeout_secs),
            Duration::from_millis(self.readiness.poll_interval_ms),
        )
    }

    /// An empty request carrying the configured pull behaviour.
    #[must_use]
    pub fn container_request(&self) -> ContainerRequest {
        ContainerRequest::new().with_skip_pull(self.pull.skip)
    }

    /// A TCP readiness strategy for `container_port` using the configured
    /// probe host and timing.
    #[must_use]
    pub fn listening_port(&self, container_port: u16) -> ListeningPort {
        ListeningPort::new(container_port)
            .with_host(self.probe_host.clone())
            .with_settings(self.poll_settings())
    }

    /// An HTTP readiness strategy for `container_port` using the configured
    /// probe host and timing.
    #[must_use]
    pub fn http_probe(&self, container_port: u16) -> HttpProbe {
        HttpProbe::new(container_port)
            .with_host(self.probe_host.clone())
            .with_settings(self.poll_settings())
    }
}
