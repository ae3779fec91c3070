//! Engine doubles and snapshot builders shared by unit tests.

use std::collections::HashMap;

use bollard::auth::DockerCredentials;
use bollard::models::{
    ContainerConfig, ContainerCreateBody, ContainerInspectResponse, EndpointSettings,
    NetworkSettings, PortBinding,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, RemoveContainerOptions,
};
use mockall::mock;

use crate::engine::{
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

/// Engine error with the given HTTP status and message.
pub(crate) fn engine_error(status_code: u16, message: &str) -> bollard::errors::Error {
    bollard::errors::Error::DockerResponseServerError {
        status_code,
        message: String::from(message),
    }
}

/// Snapshot whose port map binds each `(key, host_port)` pair.
///
/// A `None` host port produces an empty binding list for the key, as the
/// engine reports for exposed but unpublished ports.
pub(crate) fn snapshot_with_ports(bindings: &[(&str, Option<&str>)]) -> ContainerInspectResponse {
    let ports = bindings
        .iter()
        .map(|(key, host_port)| {
            let engine_bindings = host_port.map(|port| {
                vec![PortBinding {
                    host_ip: Some(String::from("0.0.0.0")),
                    host_port: Some(String::from(port)),
                }]
            });
            (String::from(*key), engine_bindings)
        })
        .collect::<HashMap<_, _>>();

    ContainerInspectResponse {
        id: Some(String::from("container-id")),
        config: Some(ContainerConfig {
            exposed_ports: Some(bindings.iter().map(|(key, _)| String::from(*key)).collect()),
            ..ContainerConfig::default()
        }),
        network_settings: Some(NetworkSettings {
            ports: Some(ports),
            ..NetworkSettings::default()
        }),
        ..ContainerInspectResponse::default()
    }
}

/// Snapshot attached to the given `(network, address)` endpoints.
pub(crate) fn snapshot_with_networks(endpoints: &[(&str, &str)]) -> ContainerInspectResponse {
    let networks = endpoints
        .iter()
        .map(|(name, address)| {
            (
                String::from(*name),
                EndpointSettings {
                    ip_address: Some(String::from(*address)),
                    ..EndpointSettings::default()
                },
            )
        })
        .collect::<HashMap<_, _>>();

    ContainerInspectResponse {
        id: Some(String::from("container-id")),
        network_settings: Some(NetworkSettings {
            networks: Some(networks),
            ..NetworkSettings::default()
        }),
        ..ContainerInspectResponse::default()
    }
}
