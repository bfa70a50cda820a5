//! Container engine connection and command execution.
//!
//! The endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-host`)
//! 2. `DOCKMGR_ENGINE_HOST` environment variable
//! 3. Config file (`engine_host` in TOML)
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)
//!
//! The resolved address is validated into an [`EndpointConfig`], which a
//! [`ConnectionManager`] turns into a probed [`ConnectionHandle`]. Commands
//! run through [`CommandExecutor`].

mod connection;
mod endpoint;
mod executor;

pub use connection::{
    BollardConnector, ConnectionHandle, ConnectionManager, Connector, ContainerActionFuture,
    CreateContainerFuture, DialFuture, EngineClient, ListContainersFuture, ListImagesFuture,
    PingFuture,
};
pub use endpoint::{ApiVersion, ConnectionLimits, EndpointConfig, EndpointResolver, TransportKind};
pub use executor::{Command, CommandExecutor, CommandOutput, ContainerSummary, ImageSummary};
