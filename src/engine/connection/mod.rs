//! Connection management for Docker-compatible container engines.
//!
//! [`ConnectionManager`] turns a validated [`EndpointConfig`] into a shared
//! [`ConnectionHandle`]: it builds the Bollard client for the selected
//! transport, dials the daemon under the connect timeout, pings it under the
//! response timeout, and hands out clones of the verified handle to every
//! caller. Client construction sits behind the [`Connector`] trait so
//! the acquisition logic can be exercised without a daemon.

mod client;
mod error_classification;
mod handle;
mod health_check;


use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub use self::client::{
    ContainerActionFuture, CreateContainerFuture, EngineClient, ListContainersFuture,
    ListImagesFuture, PingFuture,
};
pub(crate) use self::error_classification::classify_execution_error;
use self::error_classification::{classify_client_build_error, classify_dial_error};
#[cfg(unix)]
use self::error_classification::extract_socket_path;
pub use self::handle::ConnectionHandle;
use super::endpoint::{ApiVersion, ConnectionLimits, EndpointConfig, TransportKind};
use crate::error::ConnectionError;

/// Boxed future type returned by [`Connector::dial`].
pub type DialFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + Send + 'a>>;

/// Builds engine clients and checks that their endpoint accepts connections.
pub trait Connector: Send + Sync {
    /// The client type produced.
    type Client: EngineClient;

    /// Build a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` when the client cannot
    /// be built from the endpoint settings, or `ConnectionError::Unreachable`
    /// when the local socket does not exist.
    fn connect(&self, endpoint: &EndpointConfig) -> Result<Self::Client, ConnectionError>;

    /// Open and drop one transport connection to `endpoint`.
    ///
    /// The manager bounds this with the connect timeout, separately from the
    /// ping that follows.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::Unreachable` when nothing accepts the
    /// connection.
    fn dial(&self, endpoint: &EndpointConfig) -> DialFuture<'_>;
}

/// Builds Bollard clients for local sockets, plain TCP and verified TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct BollardConnector;

impl BollardConnector {
    /// Bollard's own request timeout, in whole seconds.
    ///
    /// Per-call deadlines are enforced by the executor; this only bounds
    /// requests nobody is waiting on any more.
    const fn client_timeout_secs(limits: ConnectionLimits) -> u64 {
        let secs = limits.response_timeout_ms().div_ceil(1000);
        if secs == 0 { 1 } else { secs }
    }
}

impl Connector for BollardConnector {
    type Client = Docker;

    fn connect(&self, endpoint: &EndpointConfig) -> Result<Docker, ConnectionError> {
        let address = endpoint.address();
        let timeout_secs = Self::client_timeout_secs(endpoint.limits());
        let pinned = endpoint.api_version().map(ApiVersion::to_client_version);
        let version = pinned.as_ref().unwrap_or(bollard::API_DEFAULT_VERSION);

        let docker = match endpoint.transport() {
            TransportKind::LocalSocket => {
                Docker::connect_with_socket(address, timeout_secs, version)
            }
            TransportKind::RemoteTcp if endpoint.tls_verify() => {
                let cert_dir = endpoint.cert_dir().ok_or_else(|| {
                    ConnectionError::InvalidConfiguration {
                        address: address.to_owned(),
                        reason: String::from("TLS verification requires a certificate directory"),
                    }
                })?;
                let authority = endpoint.authority().unwrap_or_default();
                Docker::connect_with_ssl(
                    &format!("https://{authority}"),
                    cert_dir.join("key.pem").as_std_path(),
                    cert_dir.join("cert.pem").as_std_path(),
                    cert_dir.join("ca.pem").as_std_path(),
                    timeout_secs,
                    version,
                )
            }
            TransportKind::RemoteTcp => {
                let authority = endpoint.authority().unwrap_or_default();
                Docker::connect_with_http(&format!("http://{authority}"), timeout_secs, version)
            }
        }
        .map_err(|error| classify_client_build_error(&error, address))?;

        debug!(
            address,
            transport = ?endpoint.transport(),
            tls_verify = endpoint.tls_verify(),
            "engine client built"
        );
        Ok(docker)
    }

    fn dial(&self, endpoint: &EndpointConfig) -> DialFuture<'_> {
        let address = endpoint.address().to_owned();
        let transport = endpoint.transport();
        let authority = endpoint.authority();
        Box::pin(async move {
            let outcome = match (transport, authority) {
                (TransportKind::RemoteTcp, Some(authority)) => {
                    tokio::net::TcpStream::connect(authority).await.map(drop)
                }
                _ => dial_local(&address).await,
            };
            outcome.map_err(|error| classify_dial_error(&error, &address))
        })
    }
}

/// Connect to a local socket and close it again.
#[cfg(unix)]
async fn dial_local(address: &str) -> std::io::Result<()> {
    match extract_socket_path(address) {
        Some(path) => tokio::net::UnixStream::connect(path).await.map(drop),
        None => Ok(()),
    }
}

/// Named pipes are not dialled; the ping covers them.
#[cfg(not(unix))]
#[expect(clippy::unused_async, reason = "signature matches the unix variant")]
async fn dial_local(_address: &str) -> std::io::Result<()> {
    Ok(())
}

/// Owns the endpoint settings and the single shared handle built from them.
///
/// The handle is created lazily on the first [`ConnectionManager::acquire`];
/// concurrent first callers wait for the same probe instead of racing. A
/// failed probe is not cached, so the next `acquire` tries again.
pub struct ConnectionManager<K: Connector = BollardConnector> {
    endpoint: EndpointConfig,
    connector: K,
    handle: OnceCell<ConnectionHandle<K::Client>>,
}

impl ConnectionManager {
    /// Create a manager that builds Bollard clients.
    #[must_use]
    pub const fn new(endpoint: EndpointConfig) -> Self {
        Self::with_connector(endpoint, BollardConnector)
    }
}

impl<K: Connector> ConnectionManager<K> {
    /// Create a manager with a custom client builder.
    #[must_use]
    pub const fn with_connector(endpoint: EndpointConfig, connector: K) -> Self {
        Self {
            endpoint,
            connector,
            handle: OnceCell::const_new(),
        }
    }

    /// The endpoint this manager connects to.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Build a client and probe the daemon, returning a fresh handle.
    ///
    /// The endpoint must accept a connection within the connect timeout and
    /// then answer a ping within the response timeout, so a daemon that is
    /// slow to answer is not mistaken for a missing one. This bypasses the
    /// shared handle; most callers want [`Self::acquire`].
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` when the client cannot
    /// be built and `ConnectionError::Unreachable` when either step fails or
    /// runs out of time.
    pub async fn connect_and_verify(
        &self,
    ) -> Result<ConnectionHandle<K::Client>, ConnectionError> {
        let client = self.connector.connect(&self.endpoint)?;
        let address = self.endpoint.address();
        let limits = self.endpoint.limits();

        match tokio::time::timeout(limits.connect_timeout(), self.connector.dial(&self.endpoint))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(endpoint = address, %error, "engine endpoint refused the connection");
                return Err(error);
            }
            Err(_) => {
                let error = ConnectionError::Unreachable {
                    endpoint: address.to_owned(),
                    reason: format!("no connection within {} ms", limits.connect_timeout_ms()),
                };
                warn!(endpoint = address, %error, "engine endpoint did not accept in time");
                return Err(error);
            }
        }

        ConnectionHandle::establish(client, address, limits).await
    }

    /// Return the shared handle, connecting and probing on first use.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect_and_verify`].
    pub async fn acquire(&self) -> Result<ConnectionHandle<K::Client>, ConnectionError> {
        self.handle
            .get_or_try_init(|| self.connect_and_verify())
            .await
            .cloned()
    }

    /// Close the current handle after its in-flight calls drain, then
    /// connect again.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect_and_verify`].
    pub async fn reconnect(&mut self) -> Result<ConnectionHandle<K::Client>, ConnectionError> {
        self.shutdown().await;
        self.acquire().await
    }

    /// Close the current handle after its in-flight calls drain.
    ///
    /// Clones held by callers stay valid objects but refuse new calls.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close().await;
        }
    }
}
