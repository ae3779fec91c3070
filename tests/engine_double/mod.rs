//! Scripted container engine shared by the behavioural suites.
//!
//! The double records every engine call in a journal so scenarios can assert
//! on what reached the engine and in which order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use bollard::auth::DockerCredentials;
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerConfig, ContainerCreateBody, ContainerCreateResponse, ContainerInspectResponse,
    CreateImageInfo, NetworkSettings, PortBinding,
};
use bollard::query_parameters::{CreateContainerOptions, CreateImageOptions, RemoveContainerOptions};
use mockall::mock;
use testpod::engine::{
    ContainerCreator, ContainerInspector, ContainerLogReader, ContainerLogsFuture,
    ContainerRemover, ContainerStarter, CreateContainerFuture, ImagePuller,
    InspectContainerFuture, PullImageStream, RemoveContainerFuture, StartContainerFuture,
};

mock! {
    #[derive(Debug)]
    pub(crate) Engine {}

    impl ImagePuller for Engine {
        fn pull_image<'a>(
            &'a self,
            options: CreateImageOptions,
            credentials: Option<DockerCredentials>,
        ) -> PullImageStream<'a>;
    }

    impl ContainerCreator for Engine {
        fn create_container<'a>(
            &'a self,
            options: Option<CreateContainerOptions>,
            config: ContainerCreateBody,
        ) -> CreateContainerFuture<'a>;
    }

    impl ContainerStarter for Engine {
        fn start_container<'a>(&'a self, container_id: &str) -> StartContainerFuture<'a>;
    }

    impl ContainerInspector for Engine {
        fn inspect_container<'a>(&'a self, container_id: &str) -> InspectContainerFuture<'a>;
    }

    impl ContainerRemover for Engine {
        fn remove_container<'a>(
            &'a self,
            container_id: &str,
            options: RemoveContainerOptions,
        ) -> RemoveContainerFuture<'a>;
    }

    impl ContainerLogReader for Engine {
        fn container_logs<'a>(&'a self, container_id: &str) -> ContainerLogsFuture<'a>;
    }
}

/// Identifier the scripted engine assigns to every created container.
pub const CONTAINER_ID: &str = "bdd-container-id";

/// Ordered record of engine calls, shared with the double.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Behaviour the scripted engine should exhibit.
#[derive(Debug, Clone, Default)]
pub struct EngineScript {
    /// Fail the image pull part way through.
    pub fail_pull: bool,
    /// Reject the start request.
    pub fail_start: bool,
    /// Reject the remove request.
    pub fail_remove: bool,
    /// Port bindings reported by inspect, as `(container key, host port)`.
    pub bindings: Vec<(String, String)>,
    /// Log lines visible to the log reader.
    pub log_lines: Vec<String>,
}

/// Append `entry` to the journal.
pub fn record(journal: &Journal, entry: &str) {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(String::from(entry));
}

/// Copy the journal's entries.
#[must_use]
pub fn entries(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn server_error(message: &str) -> BollardError {
    BollardError::DockerResponseServerError {
        status_code: 500,
        message: String::from(message),
    }
}

/// Snapshot reporting the given port bindings.
#[must_use]
pub fn snapshot_with_bindings(bindings: &[(String, String)]) -> ContainerInspectResponse {
    let ports = bindings
        .iter()
        .map(|(key, host_port)| {
            (
                key.clone(),
                Some(vec![PortBinding {
                    host_ip: Some(String::from("0.0.0.0")),
                    host_port: Some(host_port.clone()),
                }]),
            )
        })
        .collect::<HashMap<_, _>>();

    ContainerInspectResponse {
        id: Some(String::from(CONTAINER_ID)),
        config: Some(ContainerConfig {
            exposed_ports: Some(bindings.iter().map(|(key, _)| key.clone()).collect()),
            ..ContainerConfig::default()
        }),
        network_settings: Some(NetworkSettings {
            ports: Some(ports),
            ..NetworkSettings::default()
        }),
        ..ContainerInspectResponse::default()
    }
}

/// Build a double that follows `script` and journals each call.
#[must_use]
pub fn scripted_engine(script: &EngineScript, journal: &Journal) -> MockEngine {
    let mut engine = MockEngine::new();

    let pull_journal = Arc::clone(journal);
    let fail_pull = script.fail_pull;
    engine.expect_pull_image().returning(move |options, _| {
        record(
            &pull_journal,
            &format!("pull {}", options.from_image.unwrap_or_default()),
        );
        let progress: Vec<Result<CreateImageInfo, BollardError>> = if fail_pull {
            vec![Err(server_error("manifest unknown"))]
        } else {
            vec![Ok(CreateImageInfo {
                status: Some(String::from("Pull complete")),
                ..CreateImageInfo::default()
            })]
        };
        Box::pin(futures_util::stream::iter(progress))
    });

    let create_journal = Arc::clone(journal);
    engine.expect_create_container().returning(move |_, body| {
        let env = body.env.unwrap_or_default().join(",");
        record(&create_journal, &format!("create env=[{env}]"));
        Box::pin(async {
            Ok(ContainerCreateResponse {
                id: String::from(CONTAINER_ID),
                warnings: vec![],
            })
        })
    });

    let start_journal = Arc::clone(journal);
    let fail_start = script.fail_start;
    engine.expect_start_container().returning(move |_| {
        record(&start_journal, "start");
        Box::pin(async move {
            if fail_start {
                Err(server_error("port is already allocated"))
            } else {
                Ok(())
            }
        })
    });

    let remove_journal = Arc::clone(journal);
    let fail_remove = script.fail_remove;
    engine.expect_remove_container().returning(move |_, options| {
        record(&remove_journal, &format!("remove force={}", options.force));
        Box::pin(async move {
            if fail_remove {
                Err(server_error("removal already in progress"))
            } else {
                Ok(())
            }
        })
    });

    let inspect_journal = Arc::clone(journal);
    let snapshot = snapshot_with_bindings(&script.bindings);
    engine.expect_inspect_container().returning(move |_| {
        record(&inspect_journal, "inspect");
        let response = snapshot.clone();
        Box::pin(async move { Ok(response) })
    });

    let log_lines = script.log_lines.clone();
    engine.expect_container_logs().returning(move |_| {
        let chunks = log_lines
            .iter()
            .map(|line| LogOutput::StdOut {
                message: Vec::from(line.as_bytes()).into(),
            })
            .collect::<Vec<_>>();
        Box::pin(async move { Ok(chunks) })
    });

    engine
}
