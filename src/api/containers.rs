//! Container operations.

use super::{DEFAULT_SHOW_ALL, run_to_completion, unexpected_output};
use crate::engine::{
    Command, CommandExecutor, CommandOutput, ConnectionHandle, ContainerSummary, EngineClient,
};
use crate::error::ExecutionError;

/// List containers. `show_all` defaults to [`DEFAULT_SHOW_ALL`].
///
/// # Errors
///
/// Returns `ExecutionError::Timeout` or `ExecutionError::Transport` when the
/// daemon cannot be queried.
pub async fn list_containers<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    show_all: Option<bool>,
) -> Result<Vec<ContainerSummary>, ExecutionError> {
    let command = Command::ListContainers {
        show_all: show_all.unwrap_or(DEFAULT_SHOW_ALL),
    };
    match CommandExecutor::execute_async(handle, &command).await? {
        CommandOutput::Containers(containers) => Ok(containers),
        other => Err(unexpected_output(command.operation(), &other)),
    }
}

/// Start a created or stopped container.
///
/// # Errors
///
/// Returns `ExecutionError::InvalidState` when the container is already
/// running and `ExecutionError::NotFound` when it does not exist.
pub async fn start_container<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    id: &str,
) -> Result<(), ExecutionError> {
    run_to_completion(handle, Command::StartContainer { id: id.to_owned() }).await
}

/// Stop a running container.
///
/// # Errors
///
/// Returns `ExecutionError::InvalidState` when the container is not running
/// and `ExecutionError::NotFound` when it does not exist.
pub async fn stop_container<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    id: &str,
) -> Result<(), ExecutionError> {
    run_to_completion(handle, Command::StopContainer { id: id.to_owned() }).await
}

/// Create a container from a local image.
///
/// # Errors
///
/// Returns `ExecutionError::NotFound` when the image is not present locally.
pub async fn create_container<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    image: &str,
) -> Result<(), ExecutionError> {
    run_to_completion(
        handle,
        Command::CreateContainer {
            image: image.to_owned(),
        },
    )
    .await
}

/// Remove a created or stopped container.
///
/// # Errors
///
/// Returns `ExecutionError::InvalidState` when the container is running and
/// `ExecutionError::NotFound` when it does not exist.
pub async fn remove_container<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    id: &str,
) -> Result<(), ExecutionError> {
    run_to_completion(handle, Command::RemoveContainer { id: id.to_owned() }).await
}
