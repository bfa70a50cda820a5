//! In-memory container engine for integration and behavioural tests.
//!
//! [`FakeEngine`] implements `EngineClient` over a small container state
//! machine (created, running, exited) and an image list, answering with the
//! same HTTP status codes a Docker daemon uses: `404` for unknown containers
//! and images, `304` for start/stop no-ops, and `409` for removing a running
//! container. Every call is counted so tests can check pool discipline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, ContainerCreateResponse, ContainerSummary, ContainerSummaryStateEnum,
    ImageSummary,
};
use bollard::query_parameters::{CreateContainerOptions, ListContainersOptions, ListImagesOptions};
use dockmgr::config::TlsConfig;
use dockmgr::engine::{
    ConnectionLimits, ConnectionManager, Connector, ContainerActionFuture, CreateContainerFuture,
    DialFuture, EndpointConfig, EngineClient, ListContainersFuture, ListImagesFuture, PingFuture,
};
use dockmgr::error::ConnectionError;

/// Address reported by handles built over a [`FakeEngine`].
pub const FAKE_ENDPOINT: &str = "unix:///run/dockmgr-fake.sock";

/// Lifecycle state of a fake container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created but never started.
    Created,
    /// Currently running.
    Running,
    /// Stopped after running.
    Exited,
}

impl Lifecycle {
    const fn state(self) -> ContainerSummaryStateEnum {
        match self {
            Self::Created => ContainerSummaryStateEnum::CREATED,
            Self::Running => ContainerSummaryStateEnum::RUNNING,
            Self::Exited => ContainerSummaryStateEnum::EXITED,
        }
    }

    const fn status(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Running => "Up 1 second",
            Self::Exited => "Exited (0) 1 second ago",
        }
    }
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    name: String,
    image: String,
    lifecycle: Lifecycle,
}

impl FakeContainer {
    fn answers_to(&self, reference: &str) -> bool {
        self.id == reference || self.name == reference
    }

    fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            id: Some(self.id.clone()),
            names: Some(vec![format!("/{}", self.name)]),
            image: Some(self.image.clone()),
            state: Some(self.lifecycle.state()),
            status: Some(String::from(self.lifecycle.status())),
            ..ContainerSummary::default()
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    containers: Vec<FakeContainer>,
    images: Vec<ImageSummary>,
    next_id: u64,
}

fn status(status_code: u16, message: String) -> BollardError {
    BollardError::DockerResponseServerError {
        status_code,
        message,
    }
}

fn no_such_container(reference: &str) -> BollardError {
    status(404, format!("No such container: {reference}"))
}

impl EngineState {
    fn container_mut(&mut self, reference: &str) -> Result<&mut FakeContainer, BollardError> {
        self.containers
            .iter_mut()
            .find(|container| container.answers_to(reference))
            .ok_or_else(|| no_such_container(reference))
    }

    fn has_image(&self, reference: &str) -> bool {
        let tagged = if reference.contains(':') {
            String::from(reference)
        } else {
            format!("{reference}:latest")
        };
        self.images
            .iter()
            .any(|image| image.id == reference || image.repo_tags.contains(&tagged))
    }

    fn start(&mut self, reference: &str) -> Result<(), BollardError> {
        let container = self.container_mut(reference)?;
        if container.lifecycle == Lifecycle::Running {
            return Err(status(304, String::new()));
        }
        container.lifecycle = Lifecycle::Running;
        Ok(())
    }

    fn stop(&mut self, reference: &str) -> Result<(), BollardError> {
        let container = self.container_mut(reference)?;
        if container.lifecycle != Lifecycle::Running {
            return Err(status(304, String::new()));
        }
        container.lifecycle = Lifecycle::Exited;
        Ok(())
    }

    fn create(&mut self, image: &str) -> Result<ContainerCreateResponse, BollardError> {
        if !self.has_image(image) {
            return Err(status(404, format!("No such image: {image}")));
        }
        self.next_id += 1;
        let id = format!("{:064x}", self.next_id);
        self.containers.push(FakeContainer {
            id: id.clone(),
            name: format!("fake_{}", self.next_id),
            image: String::from(image),
            lifecycle: Lifecycle::Created,
        });
        Ok(ContainerCreateResponse {
            id,
            ..ContainerCreateResponse::default()
        })
    }

    fn remove(&mut self, reference: &str) -> Result<(), BollardError> {
        let container = self.container_mut(reference)?;
        if container.lifecycle == Lifecycle::Running {
            return Err(status(
                409,
                format!(
                    "You cannot remove a running container {}. Stop the container before \
                     attempting removal or force remove",
                    container.id
                ),
            ));
        }
        self.containers
            .retain(|candidate| !candidate.answers_to(reference));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct FakeEngineInner {
    state: Mutex<EngineState>,
    call_delay: Duration,
    ping_delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when a call ends or is cancelled.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared in-memory engine; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    inner: Arc<FakeEngineInner>,
}

impl FakeEngine {
    /// An engine with no images and no containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty engine where every call except the ping takes `delay`.
    #[must_use]
    pub fn slow(delay: Duration) -> Self {
        Self {
            inner: Arc::new(FakeEngineInner {
                call_delay: delay,
                ..FakeEngineInner::default()
            }),
        }
    }

    /// An empty engine that accepts connections at once but answers pings
    /// only after `delay`.
    #[must_use]
    pub fn answering_ping_after(delay: Duration) -> Self {
        Self {
            inner: Arc::new(FakeEngineInner {
                ping_delay: delay,
                ..FakeEngineInner::default()
            }),
        }
    }

    /// Add a local image tagged `tag`.
    #[must_use]
    pub fn with_image(self, tag: &str) -> Self {
        {
            let mut state = self.lock_state();
            let ordinal = state.images.len() + 1;
            state.images.push(ImageSummary {
                id: format!("sha256:{ordinal:064x}"),
                repo_tags: vec![String::from(tag)],
                size: 7_340_032,
                created: 1_700_000_000,
                ..ImageSummary::default()
            });
        }
        self
    }

    /// Add a container called `name` in the given state.
    #[must_use]
    pub fn with_container(self, name: &str, image: &str, lifecycle: Lifecycle) -> Self {
        {
            let mut state = self.lock_state();
            state.next_id += 1;
            let id = format!("{:064x}", state.next_id);
            state.containers.push(FakeContainer {
                id,
                name: String::from(name),
                image: String::from(image),
                lifecycle,
            });
        }
        self
    }

    /// Current state of the container with the given id or name.
    #[must_use]
    pub fn lifecycle_of(&self, reference: &str) -> Option<Lifecycle> {
        self.lock_state()
            .containers
            .iter()
            .find(|container| container.answers_to(reference))
            .map(|container| container.lifecycle)
    }

    /// Number of containers the engine knows about.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.lock_state().containers.len()
    }

    /// Number of daemon calls received, excluding pings.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self) -> InFlight<'_> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight {
            counter: &self.inner.in_flight,
        };
        if !self.inner.call_delay.is_zero() {
            tokio::time::sleep(self.inner.call_delay).await;
        }
        guard
    }
}

impl EngineClient for FakeEngine {
    fn ping(&self) -> PingFuture<'_> {
        Box::pin(async move {
            if !self.inner.ping_delay.is_zero() {
                tokio::time::sleep(self.inner.ping_delay).await;
            }
            Ok(String::from("OK"))
        })
    }

    fn list_containers(&self, options: Option<ListContainersOptions>) -> ListContainersFuture<'_> {
        let show_all = options.is_some_and(|opts| opts.all);
        Box::pin(async move {
            let _in_flight = self.enter().await;
            Ok(self
                .lock_state()
                .containers
                .iter()
                .filter(|container| show_all || container.lifecycle == Lifecycle::Running)
                .map(FakeContainer::summary)
                .collect())
        })
    }

    fn list_images(&self, _options: Option<ListImagesOptions>) -> ListImagesFuture<'_> {
        Box::pin(async move {
            let _in_flight = self.enter().await;
            Ok(self.lock_state().images.clone())
        })
    }

    fn start_container(&self, container_id: &str) -> ContainerActionFuture<'_> {
        let reference = String::from(container_id);
        Box::pin(async move {
            let _in_flight = self.enter().await;
            self.lock_state().start(&reference)
        })
    }

    fn stop_container(&self, container_id: &str) -> ContainerActionFuture<'_> {
        let reference = String::from(container_id);
        Box::pin(async move {
            let _in_flight = self.enter().await;
            self.lock_state().stop(&reference)
        })
    }

    fn create_container(
        &self,
        _options: Option<CreateContainerOptions>,
        body: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move {
            let _in_flight = self.enter().await;
            let image = body.image.unwrap_or_default();
            self.lock_state().create(&image)
        })
    }

    fn remove_container(&self, container_id: &str) -> ContainerActionFuture<'_> {
        let reference = String::from(container_id);
        Box::pin(async move {
            let _in_flight = self.enter().await;
            self.lock_state().remove(&reference)
        })
    }
}

/// Hands out clones of one [`FakeEngine`] instead of building real clients.
#[derive(Debug, Clone)]
pub struct FakeConnector {
    engine: FakeEngine,
}

impl Connector for FakeConnector {
    type Client = FakeEngine;

    fn connect(&self, _endpoint: &EndpointConfig) -> Result<FakeEngine, ConnectionError> {
        Ok(self.engine.clone())
    }

    fn dial(&self, _endpoint: &EndpointConfig) -> DialFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// A connection manager backed by `engine` with the given limits.
///
/// # Errors
///
/// Returns `ConnectionError::InvalidConfiguration` if the fake endpoint is
/// rejected, which would indicate a regression in endpoint parsing.
pub fn fake_manager(
    engine: &FakeEngine,
    limits: ConnectionLimits,
) -> Result<ConnectionManager<FakeConnector>, ConnectionError> {
    let endpoint = EndpointConfig::new(FAKE_ENDPOINT, &TlsConfig::default())?.with_limits(limits);
    Ok(ConnectionManager::with_connector(
        endpoint,
        FakeConnector {
            engine: engine.clone(),
        },
    ))
}
