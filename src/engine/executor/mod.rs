//! Command dispatch against a verified connection handle.
//!
//! Each [`Command`] maps to exactly one daemon call. The call holds one pool
//! slot for its whole lifetime, is bounded by the handle's response timeout,
//! and reports daemon refusals as typed [`ExecutionError`] variants. Nothing
//! is retried.

use bollard::errors::Error as BollardError;
use bollard::models::ContainerCreateBody;
use bollard::query_parameters::ListContainersOptionsBuilder;
use serde::Serialize;
use tracing::debug;

use super::connection::{ConnectionHandle, EngineClient, classify_execution_error};
use crate::error::ExecutionError;

/// Repository tag reported for untagged images.
const UNTAGGED: &str = "<none>:<none>";

/// One request to the daemon. Immutable, built per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List containers; stopped ones too when `show_all` is set.
    ListContainers {
        /// Include containers that are not running.
        show_all: bool,
    },
    /// List every local image.
    ListImages,
    /// List images with a repository tag containing `name_pattern`.
    FilterImages {
        /// Case-sensitive substring matched against `repo:tag` entries.
        name_pattern: String,
    },
    /// Start a created or stopped container.
    StartContainer {
        /// Container id or name.
        id: String,
    },
    /// Stop a running container.
    StopContainer {
        /// Container id or name.
        id: String,
    },
    /// Create a container from a local image.
    CreateContainer {
        /// Image reference, e.g. `alpine:3.20`.
        image: String,
    },
    /// Remove a created or stopped container.
    RemoveContainer {
        /// Container id or name.
        id: String,
    },
}

impl Command {
    /// Human-readable operation name used in errors and logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::ListContainers { .. } => "list containers",
            Self::ListImages => "list images",
            Self::FilterImages { .. } => "filter images",
            Self::StartContainer { .. } => "start container",
            Self::StopContainer { .. } => "stop container",
            Self::CreateContainer { .. } => "create container",
            Self::RemoveContainer { .. } => "remove container",
        }
    }

    /// The resource the command acts on, for error reporting.
    fn target(&self) -> &str {
        match self {
            Self::ListContainers { .. } => "containers",
            Self::ListImages | Self::FilterImages { .. } => "images",
            Self::StartContainer { id }
            | Self::StopContainer { id }
            | Self::RemoveContainer { id } => id,
            Self::CreateContainer { image } => image,
        }
    }

    /// Reject blank identifiers before any daemon call.
    fn validate(&self) -> Result<(), ExecutionError> {
        let (field, value) = match self {
            Self::StartContainer { id }
            | Self::StopContainer { id }
            | Self::RemoveContainer { id } => ("id", id),
            Self::CreateContainer { image } => ("image", image),
            Self::ListContainers { .. } | Self::ListImages | Self::FilterImages { .. } => {
                return Ok(());
            }
        };

        if value.trim().is_empty() {
            return Err(ExecutionError::InvalidArgument {
                field,
                reason: String::from("must not be empty"),
            });
        }
        Ok(())
    }
}

/// Container listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    /// Full container id.
    pub id: String,
    /// Container names without the leading `/`.
    pub names: Vec<String>,
    /// Image the container was created from.
    pub image: String,
    /// Lifecycle state such as `created`, `running` or `exited`.
    pub state: String,
    /// Daemon status text such as `Up 2 minutes`.
    pub status: String,
}

impl From<bollard::models::ContainerSummary> for ContainerSummary {
    fn from(summary: bollard::models::ContainerSummary) -> Self {
        Self {
            id: summary.id.unwrap_or_default(),
            names: summary
                .names
                .unwrap_or_default()
                .into_iter()
                .map(|name| name.trim_start_matches('/').to_owned())
                .collect(),
            image: summary.image.unwrap_or_default(),
            state: summary
                .state
                .map(|state| state.to_string())
                .unwrap_or_default(),
            status: summary.status.unwrap_or_default(),
        }
    }
}

/// Image listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// Image id (`sha256:...`).
    pub id: String,
    /// Repository tags in `repo:tag` form.
    pub repo_tags: Vec<String>,
    /// Image size in bytes.
    pub size_bytes: i64,
    /// Creation time as seconds since the Unix epoch.
    pub created: i64,
}

impl ImageSummary {
    /// Whether any repository tag contains `pattern`.
    ///
    /// An empty pattern matches every image; untagged images never match a
    /// non-empty pattern.
    #[must_use]
    pub fn matches_name_pattern(&self, pattern: &str) -> bool {
        pattern.is_empty()
            || self
                .repo_tags
                .iter()
                .any(|tag| tag != UNTAGGED && tag.contains(pattern))
    }
}

impl From<bollard::models::ImageSummary> for ImageSummary {
    fn from(summary: bollard::models::ImageSummary) -> Self {
        Self {
            id: summary.id,
            repo_tags: summary.repo_tags,
            size_bytes: summary.size,
            created: summary.created,
        }
    }
}

/// Successful result of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum CommandOutput {
    /// Result of `ListContainers`.
    Containers(Vec<ContainerSummary>),
    /// Result of `ListImages` and `FilterImages`.
    Images(Vec<ImageSummary>),
    /// Start, stop, create or remove finished.
    Completed,
}

/// Runs commands against a connection handle.
pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute one command (async version).
    ///
    /// Waits up to the connect timeout for a call slot, then up to the
    /// response timeout for the daemon. The slot is released on every exit
    /// path, including cancellation of the returned future.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::InvalidArgument` for a blank id or image,
    /// `ExecutionError::Timeout` when either budget is exceeded,
    /// `ExecutionError::InvalidState` and `ExecutionError::NotFound` when the
    /// daemon refuses the command, and `ExecutionError::Transport` for any
    /// other fault, including a closed handle.
    pub async fn execute_async<C: EngineClient>(
        handle: &ConnectionHandle<C>,
        command: &Command,
    ) -> Result<CommandOutput, ExecutionError> {
        command.validate()?;

        let operation = command.operation();
        let limits = handle.limits();
        let _lease = handle.lease(operation).await?;
        debug!(operation, target = command.target(), "dispatching command");

        let result = tokio::time::timeout(
            limits.response_timeout(),
            dispatch(handle.client(), command, limits.response_timeout_ms()),
        )
        .await
        .map_err(|_| ExecutionError::Timeout {
            operation,
            millis: limits.response_timeout_ms(),
        })
        .and_then(|outcome| outcome);

        if let Err(ref error) = result {
            debug!(operation, target = command.target(), %error, "command failed");
        }
        result
    }

    /// Execute one command, blocking on a caller runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute_async`].
    pub fn execute<C: EngineClient>(
        runtime: &tokio::runtime::Handle,
        handle: &ConnectionHandle<C>,
        command: &Command,
    ) -> Result<CommandOutput, ExecutionError> {
        runtime.block_on(Self::execute_async(handle, command))
    }
}

/// Issue the single daemon call for `command`.
async fn dispatch<C: EngineClient>(
    client: &C,
    command: &Command,
    timeout_ms: u64,
) -> Result<CommandOutput, ExecutionError> {
    let operation = command.operation();
    let classify = |error: BollardError| {
        classify_execution_error(error, operation, command.target(), timeout_ms)
    };

    match command {
        Command::ListContainers { show_all } => {
            let options = ListContainersOptionsBuilder::new().all(*show_all).build();
            let containers = client
                .list_containers(Some(options))
                .await
                .map_err(classify)?;
            Ok(CommandOutput::Containers(
                containers.into_iter().map(ContainerSummary::from).collect(),
            ))
        }
        Command::ListImages => {
            let images = client.list_images(None).await.map_err(classify)?;
            Ok(CommandOutput::Images(
                images.into_iter().map(ImageSummary::from).collect(),
            ))
        }
        Command::FilterImages { name_pattern } => {
            let images = client.list_images(None).await.map_err(classify)?;
            Ok(CommandOutput::Images(
                images
                    .into_iter()
                    .map(ImageSummary::from)
                    .filter(|image| image.matches_name_pattern(name_pattern))
                    .collect(),
            ))
        }
        Command::StartContainer { id } => {
            client.start_container(id).await.map_err(classify)?;
            Ok(CommandOutput::Completed)
        }
        Command::StopContainer { id } => {
            client.stop_container(id).await.map_err(classify)?;
            Ok(CommandOutput::Completed)
        }
        Command::CreateContainer { image } => {
            let body = ContainerCreateBody {
                image: Some(image.clone()),
                ..ContainerCreateBody::default()
            };
            let response = client.create_container(None, body).await.map_err(classify)?;
            debug!(
                image = %image,
                container_id = %response.id,
                warnings = response.warnings.len(),
                "container created"
            );
            Ok(CommandOutput::Completed)
        }
        Command::RemoveContainer { id } => {
            client.remove_container(id).await.map_err(classify)?;
            Ok(CommandOutput::Completed)
        }
    }
}
