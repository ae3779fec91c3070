//! Behavioural step helpers for container run scenarios.

mod assertions;
mod steps;

pub use state::{RunContainerState, run_container_state};
