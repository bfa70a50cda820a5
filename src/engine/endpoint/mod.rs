//! Endpoint parsing, transport selection and TLS policy.
//!
//! An [`EndpointConfig`] is the validated, immutable description of where the
//! daemon lives and how to reach it. Construction enforces the transport
//! invariants: local sockets never use TLS, and remote endpoints verify TLS
//! unless the host is loopback or explicitly trusted.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{AppConfig, LimitsConfig, TlsConfig};
use crate::error::ConnectionError;

/// Environment variables consulted, in order, when no endpoint is configured.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Environment variable naming the Docker client certificate directory.
const CERT_PATH_ENV_VAR: &str = "DOCKER_CERT_PATH";

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// How the daemon is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Unix socket or Windows named pipe, trusted through filesystem
    /// permissions.
    LocalSocket,
    /// TCP connection to a remote daemon.
    RemoteTcp,
}

/// A pinned engine API version such as `1.24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    major: usize,
    minor: usize,
}

impl ApiVersion {
    /// Parse a `major.minor` version string, tolerating a leading `v`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` when the text is not
    /// two dot-separated unsigned integers.
    pub fn parse(text: &str) -> Result<Self, ConnectionError> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parsed = digits.split_once('.').and_then(|(major, minor)| {
            Some(Self {
                major: major.parse().ok()?,
                minor: minor.parse().ok()?,
            })
        });

        parsed.ok_or_else(|| ConnectionError::InvalidConfiguration {
            address: String::from(text),
            reason: String::from("api_version must look like 1.43"),
        })
    }

    /// Convert to the client version type bollard expects.
    #[must_use]
    pub const fn to_client_version(self) -> bollard::ClientVersion {
        bollard::ClientVersion {
            major_version: self.major,
            minor_version: self.minor,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Pool size and timeout budgets for one connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    max_connections: u32,
    connect_timeout_ms: u64,
    response_timeout_ms: u64,
}

impl ConnectionLimits {
    /// Create limits from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` when any value is zero.
    pub fn new(
        max_connections: u32,
        connect_timeout_ms: u64,
        response_timeout_ms: u64,
    ) -> Result<Self, ConnectionError> {
        if max_connections == 0 || connect_timeout_ms == 0 || response_timeout_ms == 0 {
            return Err(ConnectionError::InvalidConfiguration {
                address: String::new(),
                reason: String::from("connection limits must all be at least 1"),
            });
        }

        Ok(Self {
            max_connections,
            connect_timeout_ms,
            response_timeout_ms,
        })
    }

    /// Build limits from the `[limits]` configuration table.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` when a value is zero or
    /// the pool size does not fit a `u32`.
    pub fn from_config(limits: &LimitsConfig) -> Result<Self, ConnectionError> {
        let max_connections = u32::try_from(limits.max_connections).map_err(|_| {
            ConnectionError::InvalidConfiguration {
                address: String::new(),
                reason: format!("max_connections {} is too large", limits.max_connections),
            }
        })?;
        Self::new(
            max_connections,
            limits.connect_timeout_ms,
            limits.response_timeout_ms,
        )
    }

    /// Maximum number of daemon calls in flight at once.
    #[must_use]
    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Budget for opening a connection and waiting for a pool slot.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Budget for a single daemon call, the liveness ping included.
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// The connect budget in whole milliseconds.
    #[must_use]
    pub const fn connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_ms
    }

    /// The response budget in whole milliseconds.
    #[must_use]
    pub const fn response_timeout_ms(&self) -> u64 {
        self.response_timeout_ms
    }
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connect_timeout_ms: 100,
            response_timeout_ms: 3000,
        }
    }
}

/// Scheme-level classification of an endpoint string.
enum EndpointScheme<'a> {
    /// `unix://` or `npipe://` URI, kept as written.
    Socket,
    /// `tcp://` authority; TLS follows configuration.
    Tcp(&'a str),
    /// `http://` authority; plaintext requested explicitly.
    Http(&'a str),
    /// `https://` authority; TLS required.
    Https(&'a str),
    /// No recognised scheme: a bare socket path.
    BarePath,
}

impl<'a> EndpointScheme<'a> {
    fn classify(address: &'a str) -> Self {
        if address.starts_with("unix://") || address.starts_with("npipe://") {
            return Self::Socket;
        }
        if let Some(rest) = address.strip_prefix("tcp://") {
            return Self::Tcp(rest);
        }
        if let Some(rest) = address.strip_prefix("http://") {
            return Self::Http(rest);
        }
        if let Some(rest) = address.strip_prefix("https://") {
            return Self::Https(rest);
        }
        Self::BarePath
    }
}

/// Host and port of a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RemoteAuthority {
    host: String,
    port: u16,
}

impl RemoteAuthority {
    /// Parse `host:port`, with IPv6 literals in brackets.
    fn parse(authority: &str) -> Option<Self> {
        let trimmed = authority.trim_end_matches('/');
        if trimmed.contains('/') {
            return None;
        }

        let (host, port_text) = trimmed.rsplit_once(':')?;
        let port = port_text.parse::<u16>().ok().filter(|port| *port != 0)?;

        let valid_host = match host.strip_prefix('[') {
            Some(bracketed) => bracketed
                .strip_suffix(']')
                .is_some_and(|inner| inner.parse::<Ipv6Addr>().is_ok()),
            None => is_hostname(host),
        };

        valid_host.then(|| Self {
            host: String::from(host),
            port,
        })
    }

    /// Host without IPv6 brackets.
    fn bare_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    fn is_loopback(&self) -> bool {
        let bare = self.bare_host();
        bare.eq_ignore_ascii_case("localhost")
            || bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
    }

    /// Trusted entries may be written with or without IPv6 brackets.
    fn is_listed_in(&self, trusted_hosts: &[String]) -> bool {
        let bare = self.bare_host();
        trusted_hosts.iter().any(|trusted| {
            trusted
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .eq_ignore_ascii_case(bare)
        })
    }
}

/// DNS name or IPv4 literal: dot-separated labels of ASCII letters, digits,
/// hyphens and underscores. Labels are never empty or hyphen-edged.
fn is_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        })
}

impl fmt::Display for RemoteAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Validated description of a daemon endpoint.
///
/// Fields are private and the value is immutable after construction, so the
/// TLS invariants checked in [`EndpointConfig::new`] hold for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    transport: TransportKind,
    address: String,
    remote: Option<RemoteAuthority>,
    tls_verify: bool,
    cert_dir: Option<Utf8PathBuf>,
    api_version: Option<ApiVersion>,
    limits: ConnectionLimits,
}

impl EndpointConfig {
    /// Parse an endpoint address and apply the TLS policy.
    ///
    /// Supported formats:
    /// - `unix:///path/to/socket` and `npipe:////./pipe/name`
    /// - bare paths: `//` or `\\` prefixes become named pipes, anything else a
    ///   Unix socket
    /// - `tcp://host:port` (TLS governed by `tls.verify`)
    /// - `https://host:port` (TLS always verified)
    /// - `http://host:port` (plaintext, subject to the trusted-host rule)
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` when the address is
    /// blank, a remote address is not `host:port`, plaintext is requested for
    /// a host that is neither loopback nor trusted, `https://` is combined
    /// with `tls.verify = false`, or verified TLS has no certificate
    /// directory.
    pub fn new(address: &str, tls: &TlsConfig) -> Result<Self, ConnectionError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(invalid(address, "address must not be empty"));
        }

        match EndpointScheme::classify(trimmed) {
            EndpointScheme::Socket => Self::local(trimmed, String::from(trimmed)),
            EndpointScheme::BarePath => Self::local(trimmed, normalize_bare_path(trimmed)),
            EndpointScheme::Tcp(authority) => Self::remote(trimmed, authority, tls.verify, tls),
            EndpointScheme::Http(authority) => Self::remote(trimmed, authority, false, tls),
            EndpointScheme::Https(authority) => {
                if !tls.verify {
                    return Err(invalid(
                        trimmed,
                        "https:// always verifies TLS; use tcp:// to opt out",
                    ));
                }
                Self::remote(trimmed, authority, true, tls)
            }
        }
    }

    fn local(original: &str, uri: String) -> Result<Self, ConnectionError> {
        let path = uri
            .strip_prefix("unix://")
            .or_else(|| uri.strip_prefix("npipe://"))
            .unwrap_or_default();
        if path.trim().is_empty() {
            return Err(invalid(original, "socket path must not be empty"));
        }

        Ok(Self {
            transport: TransportKind::LocalSocket,
            address: uri,
            remote: None,
            tls_verify: false,
            cert_dir: None,
            api_version: None,
            limits: ConnectionLimits::default(),
        })
    }

    fn remote(
        original: &str,
        authority: &str,
        verify: bool,
        tls: &TlsConfig,
    ) -> Result<Self, ConnectionError> {
        let remote = RemoteAuthority::parse(authority)
            .ok_or_else(|| invalid(original, "remote address must be host:port"))?;

        if !verify && !remote.is_loopback() && !remote.is_listed_in(&tls.trusted_hosts) {
            return Err(invalid(
                original,
                "TLS verification can only be disabled for loopback or trusted hosts",
            ));
        }

        let cert_dir = if verify {
            let dir = tls.cert_path.clone().ok_or_else(|| {
                invalid(
                    original,
                    "TLS verification requires tls.cert_path or DOCKER_CERT_PATH",
                )
            })?;
            Some(dir)
        } else {
            None
        };

        Ok(Self {
            transport: TransportKind::RemoteTcp,
            address: format!("tcp://{remote}"),
            remote: Some(remote),
            tls_verify: verify,
            cert_dir,
            api_version: None,
            limits: ConnectionLimits::default(),
        })
    }

    /// Pin the engine API version instead of using the client default.
    #[must_use]
    pub const fn with_api_version(mut self, version: Option<ApiVersion>) -> Self {
        self.api_version = version;
        self
    }

    /// Replace the default pool and timeout limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: ConnectionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build an endpoint from application configuration.
    ///
    /// The address comes from `engine_host`, then the fallback environment
    /// variables, then the platform default socket. A missing `tls.cert_path`
    /// is filled from `DOCKER_CERT_PATH`, then `$HOME/.docker`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConfiguration` for any of the reasons
    /// listed on [`EndpointConfig::new`], or for an unparseable api version or
    /// invalid limits.
    pub fn from_app_config<E: mockable::Env>(
        config: &AppConfig,
        resolver: &EndpointResolver<'_, E>,
    ) -> Result<Self, ConnectionError> {
        let address = resolver.resolve(config.engine_host.as_deref());
        let mut tls = config.tls.clone();
        if tls.cert_path.is_none() {
            tls.cert_path = resolver.resolve_cert_dir();
        }

        let api_version = config
            .api_version
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(ApiVersion::parse)
            .transpose()?;
        let limits = ConnectionLimits::from_config(&config.limits)?;

        Ok(Self::new(&address, &tls)?
            .with_api_version(api_version)
            .with_limits(limits))
    }

    /// The selected transport.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// The normalised address: a `unix://`/`npipe://` URI or `tcp://host:port`.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the daemon certificate is verified. Always `false` for local
    /// sockets.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Directory holding `ca.pem`, `cert.pem` and `key.pem` for verified TLS.
    #[must_use]
    pub fn cert_dir(&self) -> Option<&Utf8Path> {
        self.cert_dir.as_deref()
    }

    /// The pinned API version, if any.
    #[must_use]
    pub const fn api_version(&self) -> Option<ApiVersion> {
        self.api_version
    }

    /// Pool and timeout limits.
    #[must_use]
    pub const fn limits(&self) -> ConnectionLimits {
        self.limits
    }

    /// `host:port` for remote endpoints.
    #[must_use]
    pub fn authority(&self) -> Option<String> {
        self.remote.as_ref().map(ToString::to_string)
    }
}

/// Resolves the endpoint address and certificate directory from the
/// environment when configuration leaves them unset.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait.
pub struct EndpointResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> EndpointResolver<'a, E> {
    /// Creates a new resolver over the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// First non-empty value of `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST`.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.trim().is_empty())
    }

    /// The platform default socket URI.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }

    /// Resolve the endpoint address: configured value, environment fallback,
    /// then platform default.
    #[must_use]
    pub fn resolve(&self, configured: Option<&str>) -> String {
        configured
            .filter(|host| !host.trim().is_empty())
            .map(String::from)
            .or_else(|| self.resolve_from_env())
            .unwrap_or_else(|| String::from(Self::default_socket()))
    }

    /// Resolve the TLS certificate directory from `DOCKER_CERT_PATH`, then
    /// `$HOME/.docker`.
    #[must_use]
    pub fn resolve_cert_dir(&self) -> Option<Utf8PathBuf> {
        self.env
            .string(CERT_PATH_ENV_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(Utf8PathBuf::from)
            .or_else(|| {
                self.env
                    .string("HOME")
                    .filter(|home| !home.trim().is_empty())
                    .map(|home| Utf8PathBuf::from(home).join(".docker"))
            })
    }
}

/// Normalise a bare socket path to a URI.
///
/// Paths starting with `\\` or `//` are named pipes; everything else is a Unix
/// socket. Detection is syntax-based, not platform-based.
fn normalize_bare_path(path: &str) -> String {
    if path.starts_with("\\\\") || path.starts_with("//") {
        format!("npipe://{path}")
    } else {
        format!("unix://{path}")
    }
}

fn invalid(address: &str, reason: &str) -> ConnectionError {
    ConnectionError::InvalidConfiguration {
        address: String::from(address),
        reason: String::from(reason),
    }
}
