//! Image operations.

use super::{DEFAULT_NAME_PATTERN, unexpected_output};
use crate::engine::{
    Command, CommandExecutor, CommandOutput, ConnectionHandle, EngineClient, ImageSummary,
};
use crate::error::ExecutionError;

async fn images_for<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    command: Command,
) -> Result<Vec<ImageSummary>, ExecutionError> {
    match CommandExecutor::execute_async(handle, &command).await? {
        CommandOutput::Images(images) => Ok(images),
        other => Err(unexpected_output(command.operation(), &other)),
    }
}

/// List every local image.
///
/// # Errors
///
/// Returns `ExecutionError::Timeout` or `ExecutionError::Transport` when the
/// daemon cannot be queried.
pub async fn list_images<C: EngineClient>(
    handle: &ConnectionHandle<C>,
) -> Result<Vec<ImageSummary>, ExecutionError> {
    images_for(handle, Command::ListImages).await
}

/// List images with a repository tag containing `name_pattern`, which
/// defaults to [`DEFAULT_NAME_PATTERN`]. An empty pattern matches every
/// image.
///
/// # Errors
///
/// Returns the same errors as [`list_images`].
pub async fn filter_images<C: EngineClient>(
    handle: &ConnectionHandle<C>,
    name_pattern: Option<&str>,
) -> Result<Vec<ImageSummary>, ExecutionError> {
    let command = Command::FilterImages {
        name_pattern: name_pattern.unwrap_or(DEFAULT_NAME_PATTERN).to_owned(),
    };
    images_for(handle, command).await
}
