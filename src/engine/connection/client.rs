//! Trait seam over the Bollard client.
//!
//! Every daemon call the executor makes goes through [`EngineClient`], so
//! command dispatch, pool accounting and error mapping can be unit-tested
//! without a live daemon.

use std::future::Future;
use std::pin::Pin;

use bollard::models::{
    ContainerCreateBody, ContainerCreateResponse, ContainerSummary, ImageSummary,
};
use bollard::query_parameters::{
    CreateContainerOptions, ListContainersOptions, ListImagesOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::{Docker, errors::Error as BollardError};

/// Boxed future type returned by [`EngineClient::ping`].
pub type PingFuture<'a> = Pin<Box<dyn Future<Output = Result<String, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`EngineClient::list_containers`].
pub type ListContainersFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ContainerSummary>, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`EngineClient::list_images`].
pub type ListImagesFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ImageSummary>, BollardError>> + Send + 'a>>;

/// Boxed future type returned by [`EngineClient::create_container`].
pub type CreateContainerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ContainerCreateResponse, BollardError>> + Send + 'a>>;

/// Boxed future type returned by container state transitions.
pub type ContainerActionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), BollardError>> + Send + 'a>>;

/// Daemon calls required by the connection manager and command executor.
pub trait EngineClient: Send + Sync {
    /// Liveness probe; succeeds when the daemon answers.
    fn ping(&self) -> PingFuture<'_>;

    /// List containers matching the options.
    fn list_containers(&self, options: Option<ListContainersOptions>) -> ListContainersFuture<'_>;

    /// List local images.
    fn list_images(&self, options: Option<ListImagesOptions>) -> ListImagesFuture<'_>;

    /// Start a created or stopped container.
    fn start_container(&self, container_id: &str) -> ContainerActionFuture<'_>;

    /// Stop a running container.
    fn stop_container(&self, container_id: &str) -> ContainerActionFuture<'_>;

    /// Create a container from a body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        body: ContainerCreateBody,
    ) -> CreateContainerFuture<'_>;

    /// Remove a container. The daemon rejects running containers unless
    /// forced.
    fn remove_container(&self, container_id: &str) -> ContainerActionFuture<'_>;
}

impl EngineClient for Docker {
    fn ping(&self) -> PingFuture<'_> {
        Box::pin(async move { Self::ping(self).await })
    }

    fn list_containers(&self, options: Option<ListContainersOptions>) -> ListContainersFuture<'_> {
        Box::pin(async move { Self::list_containers(self, options).await })
    }

    fn list_images(&self, options: Option<ListImagesOptions>) -> ListImagesFuture<'_> {
        Box::pin(async move { Self::list_images(self, options).await })
    }

    fn start_container(&self, container_id: &str) -> ContainerActionFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::start_container(self, &container_id_owned, None::<StartContainerOptions>).await
        })
    }

    fn stop_container(&self, container_id: &str) -> ContainerActionFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::stop_container(self, &container_id_owned, None::<StopContainerOptions>).await
        })
    }

    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        body: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move { Self::create_container(self, options, body).await })
    }

    fn remove_container(&self, container_id: &str) -> ContainerActionFuture<'_> {
        let container_id_owned = String::from(container_id);
        Box::pin(async move {
            Self::remove_container(self, &container_id_owned, None::<RemoveContainerOptions>).await
        })
    }
}
