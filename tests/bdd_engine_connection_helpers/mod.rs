//! Behavioural step helpers for engine connection scenarios.


pub use state::{EngineConnectionState, engine_connection_state};
