//! Then-step assertions for container run behavioural scenarios.

use rstest_bdd_macros::then;

use super::state::{FailureKind, RunContainerState, RunOutcome, StepResult};
use crate::engine_double::{CONTAINER_ID, entries};

fn outcome(run_container_state: &RunContainerState) -> StepResult<RunOutcome> {
    run_container_state
        .outcome
        .get()
        .ok_or_else(|| String::from("run outcome should be set"))
}

fn journal_entries(run_container_state: &RunContainerState) -> StepResult<Vec<String>> {
    run_container_state
        .journal
        .get()
        .map(|journal| entries(&journal))
        .ok_or_else(|| String::from("journal should be set"))
}

fn expect_failure(
    run_container_state: &RunContainerState,
    expected: FailureKind,
) -> StepResult<()> {
    match outcome(run_container_state)? {
        RunOutcome::Failed { kind, .. } if kind == expected => Ok(()),
        RunOutcome::Failed { kind, message, .. } => {
            Err(format!("expected {expected:?}, got {kind:?}: {message}"))
        }
        RunOutcome::Started(handle) => Err(format!(
            "expected {expected:?}, but container {} started",
            handle.id()
        )),
    }
}

#[then("the run succeeds")]
fn run_succeeds(run_container_state: &RunContainerState) -> StepResult<()> {
    match outcome(run_container_state)? {
        RunOutcome::Started(handle) if handle.id() == CONTAINER_ID => Ok(()),
        RunOutcome::Started(handle) => Err(format!("unexpected container id {}", handle.id())),
        RunOutcome::Failed { message, .. } => Err(format!("expected success, got: {message}")),
    }
}

#[then("the run fails with an invalid port specification")]
fn run_fails_with_invalid_port_spec(run_container_state: &RunContainerState) -> StepResult<()> {
    expect_failure(run_container_state, FailureKind::InvalidPortSpec)
}

#[then("the run fails with a pull error")]
fn run_fails_with_pull_error(run_container_state: &RunContainerState) -> StepResult<()> {
    expect_failure(run_container_state, FailureKind::PullFailed)
}

#[then("the run fails with a start error")]
fn run_fails_with_start_error(run_container_state: &RunContainerState) -> StepResult<()> {
    expect_failure(run_container_state, FailureKind::StartFailed)
}

#[then("the run fails with a start and cleanup error")]
fn run_fails_with_start_and_cleanup_error(
    run_container_state: &RunContainerState,
) -> StepResult<()> {
    expect_failure(run_container_state, FailureKind::StartFailedCleanupFailed)
}

#[then("the run fails with a readiness timeout")]
fn run_fails_with_readiness_timeout(run_container_state: &RunContainerState) -> StepResult<()> {
    expect_failure(run_container_state, FailureKind::ReadinessTimeout)
}

#[then("the failure carries the container handle")]
fn failure_carries_handle(run_container_state: &RunContainerState) -> StepResult<()> {
    match outcome(run_container_state)? {
        RunOutcome::Failed {
            handle: Some(handle),
            ..
        } if handle.id() == CONTAINER_ID => Ok(()),
        _ => Err(String::from("expected the failure to carry the started container")),
    }
}

#[then("the failure carries no container handle")]
fn failure_carries_no_handle(run_container_state: &RunContainerState) -> StepResult<()> {
    match outcome(run_container_state)? {
        RunOutcome::Failed { handle: None, .. } => Ok(()),
        _ => Err(String::from("expected a failure without a container handle")),
    }
}

#[then("the engine was not contacted")]
fn engine_not_contacted(run_container_state: &RunContainerState) -> StepResult<()> {
    let calls = journal_entries(run_container_state)?;
    if calls.is_empty() {
        Ok(())
    } else {
        Err(format!("expected no engine calls, got {calls:?}"))
    }
}

#[then("no container was created")]
fn no_container_created(run_container_state: &RunContainerState) -> StepResult<()> {
    let calls = journal_entries(run_container_state)?;
    if calls.iter().any(|call| call.starts_with("create")) {
        return Err(format!("expected no create call, got {calls:?}"));
    }
    Ok(())
}

#[then("the engine did not pull")]
fn engine_did_not_pull(run_container_state: &RunContainerState) -> StepResult<()> {
    let calls = journal_entries(run_container_state)?;
    if calls.iter().any(|call| call.starts_with("pull")) {
        return Err(format!("expected no pull call, got {calls:?}"));
    }
    Ok(())
}

#[then("the engine pulled {repository} before creating the container")]
fn engine_pulled_before_create(
    run_container_state: &RunContainerState,
    repository: String,
) -> StepResult<()> {
    let calls = journal_entries(run_container_state)?;
    let pull_call = format!("pull {repository}");
    let pull_index = calls.iter().position(|call| *call == pull_call);
    let create_index = calls.iter().position(|call| call.starts_with("create"));

    match (pull_index, create_index) {
        (Some(pull), Some(create)) if pull < create => Ok(()),
        _ => Err(format!("expected {pull_call:?} before create, got {calls:?}")),
    }
}

#[then("the container was created with environment {entry}")]
fn container_created_with_env(
    run_container_state: &RunContainerState,
    entry: String,
) -> StepResult<()> {
    let calls = journal_entries(run_container_state)?;
    let create = calls
        .iter()
        .find(|call| call.starts_with("create"))
        .ok_or_else(|| format!("expected a create call, got {calls:?}"))?;

    if create.contains(&entry) {
        Ok(())
    } else {
        Err(format!("expected {entry} in {create}"))
    }
}

#[then("container port {container_port} is mapped to host port {host_port}")]
fn container_port_is_mapped(
    run_container_state: &RunContainerState,
    container_port: u16,
    host_port: u16,
) -> StepResult<()> {
    let RunOutcome::Started(handle) = outcome(run_container_state)? else {
        return Err(String::from("expected a started container"));
    };
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|error| format!("runtime should build: {error}"))?;
    let mapped = runtime
        .block_on(handle.mapped_port(container_port))
        .map_err(|error| format!("mapped_port failed: {error}"))?;

    if mapped == host_port {
        Ok(())
    } else {
        Err(format!("expected host port {host_port}, got {mapped}"))
    }
}

#[then("the created container was force removed")]
fn created_container_force_removed(run_container_state: &RunContainerState) -> StepResult<()> {
    let calls = journal_entries(run_container_state)?;
    if calls.iter().any(|call| call == "remove force=true") {
        Ok(())
    } else {
        Err(format!("expected a forced removal, got {calls:?}"))
    }
}
