//! Shared behavioural-test state for configuration scenarios.

use std::collections::HashMap;

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use testpod::config::TestpodConfig;

/// Step result type for configuration BDD tests.
pub type StepResult<T> = Result<T, String>;

/// Shared scenario state for configuration behavioural tests.
#[derive(Default, ScenarioState)]
pub struct ConfigState {
    /// TOML lines written to the configuration file.
    pub(crate) file_lines: Slot<Vec<String>>,

    /// Environment variables visible to the loader.
    pub(crate) env_vars: Slot<HashMap<String, String>>,

    /// Configuration produced by a successful load.
    pub(crate) config: Slot<TestpodConfig>,

    /// Error produced by a failed load.
    pub(crate) error: Slot<String>,
}

/// Fixture providing fresh state for each configuration scenario.
#[fixture]
pub fn config_state() -> ConfigState {
    let state = ConfigState::default();
    state.env_vars.set(HashMap::new());
    state
}
