//! Mapping of low-level `Bollard` connection failures to `ContainerError`.
//!
//! A missing or unreadable socket is the most common reason a test suite
//! cannot reach its engine, so those cases get their own variants carrying
//! the socket path. Everything else becomes `ConnectionFailed`.

use std::io::ErrorKind;
use std::path::Path;

use bollard::errors::Error as BollardError;

use crate::error::ContainerError;

/// Return the filesystem path of a `unix://` or `npipe://` endpoint.
pub(super) fn extract_socket_path(socket_uri: &str) -> Option<&Path> {
    socket_uri
        .strip_prefix("unix://")
        .or_else(|| socket_uri.strip_prefix("npipe://"))
        .map(Path::new)
}

/// Classify a connection or ping failure against `socket_uri`.
pub(super) fn classify_connection_error(
    error: &BollardError,
    socket_uri: &str,
) -> ContainerError {
    let message = error.to_string();
    let Some(path) = extract_socket_path(socket_uri) else {
        return ContainerError::ConnectionFailed { message };
    };

    let kind = match error {
        BollardError::SocketNotFoundError(_) => Some(ErrorKind::NotFound),
        BollardError::IOError { err } => Some(io_error_kind_in_chain(err).unwrap_or(err.kind())),
        other => io_error_kind_in_chain(other),
    };

    match kind {
        Some(ErrorKind::NotFound) => ContainerError::SocketNotFound {
            path: path.to_path_buf(),
        },
        Some(ErrorKind::PermissionDenied) => ContainerError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ContainerError::ConnectionFailed { message },
    }
}

/// Walk the source chain of `error` looking for an `io::Error`.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<ErrorKind> {
    let mut current = error.source();
    while let Some(cause) = current {
        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            return Some(io_error.kind());
        }
        current = cause.source();
    }
    None
}
