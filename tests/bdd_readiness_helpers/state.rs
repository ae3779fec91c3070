//! Shared behavioural-test state for readiness scenarios.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;

use crate::engine_double::{EngineScript, Journal};

/// Step result type for readiness BDD tests.
pub type StepResult<T> = Result<T, String>;

/// Outcome observed after a readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The strategy reported the container ready.
    Ready,
    /// The deadline elapsed.
    TimedOut,
    /// The context was cancelled.
    Cancelled,
    /// The port to probe is not published.
    PortNotPublished,
    /// Any other failure.
    Failed(String),
}

/// Shared scenario state for readiness behavioural tests.
#[derive(Default, ScenarioState)]
pub struct ReadinessState {
    /// Behaviour of the scripted engine.
    pub(crate) script: Slot<EngineScript>,

    /// Engine calls made during the scenario.
    pub(crate) journal: Slot<Journal>,

    /// Host port the container publishes on.
    pub(crate) host_port: Slot<u16>,

    /// Delay before a TCP service starts listening on the host port.
    pub(crate) listen_after: Slot<Duration>,

    /// Status a canned HTTP service answers with on the host port.
    pub(crate) http_status: Slot<u16>,

    /// Delay before the readiness context is cancelled.
    pub(crate) cancel_after: Slot<Duration>,

    /// Outcome of the most recent wait.
    pub(crate) outcome: Slot<WaitOutcome>,

    /// How long the most recent wait took.
    pub(crate) elapsed: Slot<Duration>,
}

/// Fixture providing fresh state for each readiness scenario.
#[fixture]
pub fn readiness_state() -> ReadinessState {
    let state = ReadinessState::default();
    state.script.set(EngineScript::default());
    state.journal.set(Arc::new(Mutex::new(Vec::new())));
    state
}
