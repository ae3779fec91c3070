//! Given/when step definitions for container run behavioural scenarios.

use std::sync::Arc;
use std::time::Duration;

use rstest_bdd_macros::{given, when};
use testpod::engine::{ContainerRequest, EngineConnector};
use testpod::error::{ContainerError, ReadinessError, RequestError, TestpodError};
use testpod::wait::{LogMessage, ReadinessContext};

use super::state::{FailureKind, RunContainerState, RunOutcome, StepResult};
use crate::engine_double::{EngineScript, scripted_engine};

fn runtime() -> StepResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|error| format!("runtime should build: {error}"))
}

fn update_script(
    run_container_state: &RunContainerState,
    change: impl FnOnce(&mut EngineScript),
) {
    let mut script = run_container_state.script.get().unwrap_or_default();
    change(&mut script);
    run_container_state.script.set(script);
}

#[given("an image {image}")]
fn an_image(run_container_state: &RunContainerState, image: String) {
    run_container_state.image.set(image);
}

#[given("the environment variable {key} is {value}")]
fn environment_variable(run_container_state: &RunContainerState, key: String, value: String) {
    let mut env = run_container_state.env.get().unwrap_or_default();
    env.push((key, value));
    run_container_state.env.set(env);
}

#[given("the port specification {spec}")]
fn port_specification(run_container_state: &RunContainerState, spec: String) {
    let mut specs = run_container_state.port_specs.get().unwrap_or_default();
    specs.push(spec);
    run_container_state.port_specs.set(specs);
}

#[given("the engine publishes container port {key} on host port {host_port}")]
fn engine_publishes_port(run_container_state: &RunContainerState, key: String, host_port: String) {
    update_script(run_container_state, |script| {
        script.bindings.push((key, host_port));
    });
}

#[given("pulling is skipped")]
fn pulling_is_skipped(run_container_state: &RunContainerState) {
    run_container_state.skip_pull.set(true);
}

#[given("the engine fails the pull")]
fn engine_fails_pull(run_container_state: &RunContainerState) {
    update_script(run_container_state, |script| script.fail_pull = true);
}

#[given("the engine fails to start containers")]
fn engine_fails_start(run_container_state: &RunContainerState) {
    update_script(run_container_state, |script| script.fail_start = true);
}

#[given("the engine fails to remove containers")]
fn engine_fails_remove(run_container_state: &RunContainerState) {
    update_script(run_container_state, |script| script.fail_remove = true);
}

#[given("the run waits for the log message {message}")]
fn run_waits_for_log(run_container_state: &RunContainerState, message: String) {
    run_container_state.wait_for_log.set(message);
}

fn build_request(run_container_state: &RunContainerState) -> ContainerRequest {
    let mut request = ContainerRequest::new()
        .with_skip_pull(run_container_state.skip_pull.get().unwrap_or(false));

    for (key, value) in run_container_state.env.get().unwrap_or_default() {
        request = request.with_env(key, value);
    }
    for spec in run_container_state.port_specs.get().unwrap_or_default() {
        request = request.with_exposed_port(spec);
    }
    if let Some(message) = run_container_state.wait_for_log.get() {
        request = request.waiting_for(
            LogMessage::new(message)
                .with_poll_interval(Duration::from_millis(10))
                .with_startup_timeout(Duration::from_millis(150)),
        );
    }

    request
}

fn classify(error: &TestpodError) -> FailureKind {
    match error {
        TestpodError::Request(RequestError::InvalidPortSpec { .. }) => FailureKind::InvalidPortSpec,
        TestpodError::Container(ContainerError::PullFailed { .. }) => FailureKind::PullFailed,
        TestpodError::Container(ContainerError::StartFailed { .. }) => FailureKind::StartFailed,
        TestpodError::Container(ContainerError::StartFailedCleanupFailed { .. }) => {
            FailureKind::StartFailedCleanupFailed
        }
        TestpodError::Readiness(ReadinessError::Timeout { .. }) => FailureKind::ReadinessTimeout,
        _ => FailureKind::Other,
    }
}

#[when("the container is run")]
fn container_is_run(run_container_state: &RunContainerState) -> StepResult<()> {
    let image = run_container_state
        .image
        .get()
        .ok_or_else(|| String::from("image should be set"))?;
    let script = run_container_state.script.get().unwrap_or_default();
    let journal = run_container_state
        .journal
        .get()
        .ok_or_else(|| String::from("journal should be set"))?;
    let engine = scripted_engine(&script, &journal);
    let request = build_request(run_container_state);

    let result = runtime()?.block_on(EngineConnector::run_container_async(
        Arc::new(engine),
        &ReadinessContext::new(),
        &image,
        &request,
    ));

    let outcome = match result {
        Ok(handle) => RunOutcome::Started(handle),
        Err(error) => {
            let kind = classify(error.error());
            let message = format!("{error}: {}", error.error());
            let (handle, _) = error.into_parts();
            RunOutcome::Failed {
                kind,
                handle,
                message,
            }
        }
    };
    run_container_state.outcome.set(outcome);
    Ok(())
}

#[when("the returned container is terminated")]
fn returned_container_is_terminated(run_container_state: &RunContainerState) -> StepResult<()> {
    let outcome = run_container_state
        .outcome
        .get()
        .ok_or_else(|| String::from("run outcome should be set"))?;
    let handle = match outcome {
        RunOutcome::Started(handle)
        | RunOutcome::Failed {
            handle: Some(handle),
            ..
        } => handle,
        RunOutcome::Failed { handle: None, .. } => {
            return Err(String::from("no container handle to terminate"));
        }
    };

    runtime()?
        .block_on(handle.terminate())
        .map_err(|error| format!("terminate should succeed: {error}"))
}
