//! Typed operations API for dockmgr.
//!
//! One async function per external operation: [`list_containers`],
//! [`list_images`], [`filter_images`], [`start_container`],
//! [`stop_container`], [`create_container`] and [`remove_container`], plus
//! [`ping`]. Optional parameters take the documented defaults when `None`,
//! the way an HTTP layer treats an absent query parameter.
//!
//! Functions accept library-owned types and return typed errors. They never
//! print to stdout/stderr or call `std::process::exit`; rendering belongs to
//! the caller.

mod containers;
mod images;

pub use containers::{
    create_container, list_containers, remove_container, start_container, stop_container,
};
pub use images::{filter_images, list_images};

use crate::config::AppConfig;
use crate::engine::{
    Command, CommandExecutor, CommandOutput, ConnectionHandle, ConnectionManager, EndpointConfig,
    EndpointResolver, EngineClient,
};
use crate::error::{ConnectionError, ExecutionError};

/// Default for `show_all` when listing containers.
pub const DEFAULT_SHOW_ALL: bool = true;

/// Default `name_pattern` when filtering images.
pub const DEFAULT_NAME_PATTERN: &str = "image-";

/// Build a connection manager from application configuration.
///
/// The endpoint falls back to `DOCKER_HOST`, `CONTAINER_HOST` and
/// `PODMAN_HOST` from `env` when `engine_host` is unset. No connection is
/// made until [`ConnectionManager::acquire`] is called.
///
/// # Errors
///
/// Returns `ConnectionError::InvalidConfiguration` when the endpoint, TLS
/// settings, api version or limits are unusable.
pub fn connection_manager<E: mockable::Env>(
    config: &AppConfig,
    env: &E,
) -> Result<ConnectionManager, ConnectionError> {
    let resolver = EndpointResolver::new(env);
    let endpoint = EndpointConfig::from_app_config(config, &resolver)?;
    Ok(ConnectionManager::new(endpoint))
}

/// Check that the daemon behind `handle` still answers.
///
/// # Errors
///
/// Returns `ExecutionError::Timeout` or `ExecutionError::Transport` when the
/// daemon does not answer.
pub async fn ping<C: EngineClient>(handle: &ConnectionHandle<C>) -> Result<(), ExecutionError> {
    handle.health_check_async().await
}

/// Run `command` and require a `Completed` result.
async fn run_to_completion<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    command: Command,
) -> Result<(), ExecutionError> {
    let operation = command.operation();
    match CommandExecutor::execute_async(handle, &command).await? {
        CommandOutput::Completed => Ok(()),
        other => Err(unexpected_output(operation, &other)),
    }
}

/// Error for an output variant that does not belong to the command.
fn unexpected_output(operation: &'static str, output: &CommandOutput) -> ExecutionError {
    let kind = match output {
        CommandOutput::Containers(_) => "container list",
        CommandOutput::Images(_) => "image list",
        CommandOutput::Completed => "completion",
    };
    ExecutionError::Transport {
        operation,
        message: format!("unexpected {kind} in response"),
    }
}
