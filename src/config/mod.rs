//! Harness configuration.
//!
//! Defaults a test suite wants to share across every container it starts:
//! the engine socket, the host readiness probes connect to, readiness timing,
//! and whether images are pulled. Loading and precedence merging are handled
//! by the `ortho_config` crate; environment variables override configuration
//! files, which override defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//! probe_host = "127.0.0.1"
//!
//! [readiness]
//! startup_timeout_secs = 120
//! poll_interval_ms = 250
//!
//! [pull]
//! skip = true
//! ```

mod loader;
mod types;


pub use loader::{env_var_names, load_config};
pub use types::{PullConfig, ReadinessConfig, TestpodConfig};
