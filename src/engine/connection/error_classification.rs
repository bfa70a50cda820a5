//! Error classification helpers for daemon failures.
//!
//! Low-level `Bollard` errors are mapped to the two public error families:
//! probe and client-construction failures become `ConnectionError`, and
//! failures of individual commands become `ExecutionError`.

use std::path::Path;

use bollard::errors::Error as BollardError;

use crate::error::{ConnectionError, ExecutionError};

/// Extract the filesystem path from a socket URI.
///
/// Strips the scheme prefix (`unix://`, `npipe://`) to get the raw path.
/// Remote endpoints have no filesystem path and yield `None`.
pub(super) fn extract_socket_path(socket_uri: &str) -> Option<&Path> {
    socket_uri
        .strip_prefix("unix://")
        .or_else(|| socket_uri.strip_prefix("npipe://"))
        .map(Path::new)
}

/// Describe an I/O error kind in terms an operator can act on.
fn describe_io_error_kind(
    kind: std::io::ErrorKind,
    socket_path: Option<&Path>,
    error_msg: &str,
) -> String {
    match (kind, socket_path) {
        (std::io::ErrorKind::PermissionDenied, Some(path)) => {
            format!("permission denied accessing {}", path.display())
        }
        (std::io::ErrorKind::NotFound, Some(path)) => {
            format!("socket not found: {}", path.display())
        }
        (std::io::ErrorKind::ConnectionRefused, _) => {
            format!("connection refused: {error_msg}")
        }
        (std::io::ErrorKind::TimedOut, _) => format!("timed out: {error_msg}"),
        _ => error_msg.to_owned(),
    }
}

/// Reason text for a failed liveness probe or client construction.
fn describe_probe_failure(bollard_error: &BollardError, endpoint: &str) -> String {
    let socket_path = extract_socket_path(endpoint);
    let error_msg = bollard_error.to_string();

    match bollard_error {
        BollardError::SocketNotFoundError(_) => {
            if let Some(path) = socket_path {
                return format!("socket not found: {}", path.display());
            }
        }
        BollardError::IOError { err } => {
            let kind = io_error_kind_in_chain(err).unwrap_or_else(|| err.kind());
            return describe_io_error_kind(kind, socket_path, &error_msg);
        }
        BollardError::RequestTimeoutError => {
            return String::from("timed out waiting for the daemon");
        }
        _ => {}
    }

    io_error_kind_in_chain(bollard_error).map_or_else(
        || error_msg.clone(),
        |kind| describe_io_error_kind(kind, socket_path, &error_msg),
    )
}

/// Classify a failed liveness probe.
///
/// Every probe failure means the daemon is not usable at this endpoint, so
/// the result is always `ConnectionError::Unreachable` with a classified
/// reason.
pub(super) fn classify_probe_error(
    bollard_error: &BollardError,
    endpoint: &str,
) -> ConnectionError {
    ConnectionError::Unreachable {
        endpoint: endpoint.to_owned(),
        reason: describe_probe_failure(bollard_error, endpoint),
    }
}

/// Classify a failed transport connection attempt.
pub(super) fn classify_dial_error(error: &std::io::Error, endpoint: &str) -> ConnectionError {
    ConnectionError::Unreachable {
        endpoint: endpoint.to_owned(),
        reason: describe_io_error_kind(
            error.kind(),
            extract_socket_path(endpoint),
            &error.to_string(),
        ),
    }
}

/// Classify a failure to build the Bollard client.
///
/// A missing socket means nothing is listening, which is an unreachable
/// daemon. Anything else (unreadable certificates, malformed URLs) is a
/// configuration problem.
pub(super) fn classify_client_build_error(
    bollard_error: &BollardError,
    endpoint: &str,
) -> ConnectionError {
    match bollard_error {
        BollardError::SocketNotFoundError(_) => classify_probe_error(bollard_error, endpoint),
        _ => ConnectionError::InvalidConfiguration {
            address: endpoint.to_owned(),
            reason: format!("failed to build engine client: {bollard_error}"),
        },
    }
}

/// Message used when the daemon reports a state conflict without a body.
fn state_conflict_message(operation: &'static str) -> String {
    match operation {
        "start container" => String::from("container is already running"),
        "stop container" => String::from("container is not running"),
        _ => String::from("container is not in a state that allows this operation"),
    }
}

/// Classify a failed command call.
///
/// | Daemon answer             | Result                         |
/// |---------------------------|--------------------------------|
/// | 404                       | `ExecutionError::NotFound`     |
/// | 304, 409                  | `ExecutionError::InvalidState` |
/// | request or socket timeout | `ExecutionError::Timeout`      |
/// | anything else             | `ExecutionError::Transport`    |
pub(crate) fn classify_execution_error(
    bollard_error: BollardError,
    operation: &'static str,
    target: &str,
    timeout_ms: u64,
) -> ExecutionError {
    match bollard_error {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => ExecutionError::NotFound {
            operation,
            target: target.to_owned(),
            message,
        },
        BollardError::DockerResponseServerError {
            status_code: 304 | 409,
            message,
        } => ExecutionError::InvalidState {
            operation,
            target: target.to_owned(),
            message: if message.trim().is_empty() {
                state_conflict_message(operation)
            } else {
                message
            },
        },
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => ExecutionError::Transport {
            operation,
            message: format!("daemon returned status {status_code}: {message}"),
        },
        BollardError::RequestTimeoutError => ExecutionError::Timeout {
            operation,
            millis: timeout_ms,
        },
        other => {
            if io_error_kind_in_chain(&other) == Some(std::io::ErrorKind::TimedOut) {
                ExecutionError::Timeout {
                    operation,
                    millis: timeout_ms,
                }
            } else {
                ExecutionError::Transport {
                    operation,
                    message: other.to_string(),
                }
            }
        }
    }
}

/// Walk the error source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}
