//! Single-container lifecycle harness for integration tests.
//!
//! `testpod` starts a real container on a Docker-compatible engine, waits
//! until it is ready to serve, exposes where it can be reached on the host,
//! and removes it again when the test is done.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use testpod::engine::{ContainerRequest, EngineConnector};
//! use testpod::wait::{LogMessage, ReadinessContext};
//!
//! let docker = EngineConnector::connect_and_verify_async("unix:///var/run/docker.sock").await?;
//! let request = ContainerRequest::new()
//!     .with_env("POSTGRES_PASSWORD", "secret")
//!     .with_exposed_port("5432")
//!     .waiting_for(LogMessage::new("ready to accept connections").with_occurrences(2));
//!
//! let postgres = EngineConnector::run_container_async(
//!     Arc::new(docker),
//!     &ReadinessContext::new(),
//!     "postgres:16-alpine",
//!     &request,
//! )
//! .await?;
//! let port = postgres.mapped_port(5432).await?;
//! // ... exercise the database on 127.0.0.1:port ...
//! postgres.terminate().await?;
//! ```
//!
//! # Modules
//!
//! - [`config`]: Harness defaults with layered precedence (env > file > defaults)
//! - [`engine`]: Engine connection, container requests, and container handles
//! - [`error`]: Semantic error types for the harness
//! - [`wait`]: Readiness strategies and the polling driver behind them

pub mod config;
pub mod engine;
pub mod error;
pub mod wait;

#[cfg(test)]
mod test_support;
