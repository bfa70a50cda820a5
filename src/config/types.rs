//! Configuration data types for dockmgr.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::error::{ConfigError, Result};

/// TLS settings for remote engine endpoints.
///
/// Local sockets never use TLS, so these settings only apply to `tcp://`,
/// `http://` and `https://` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Verify the daemon certificate for remote endpoints.
    ///
    /// Setting this to `false` is an explicit opt-out that is only honoured
    /// for loopback hosts and hosts listed in `trusted_hosts`.
    #[default = true]
    pub verify: bool,

    /// Directory holding `ca.pem`, `cert.pem` and `key.pem`.
    ///
    /// Falls back to `DOCKER_CERT_PATH`, then `~/.docker`, when unset.
    pub cert_path: Option<Utf8PathBuf>,

    /// Remote hosts for which TLS verification may be disabled.
    pub trusted_hosts: Vec<String>,
}

/// Pool and timeout limits applied to every engine connection.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of daemon calls in flight at once.
    #[default = 5]
    pub max_connections: usize,

    /// Budget for opening a connection to the daemon and for waiting for a
    /// free pool slot, in milliseconds.
    #[default = 100]
    pub connect_timeout_ms: u64,

    /// Budget for a single daemon call once a slot is held, and for the
    /// liveness ping, in milliseconds.
    #[default = 3000]
    pub response_timeout_ms: u64,
}

impl LimitsConfig {
    /// Rejects limits that would make every call fail.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first zero-valued limit.
    pub fn validate(&self) -> Result<()> {
        let zero_field = [
            ("limits.max_connections", self.max_connections == 0),
            ("limits.connect_timeout_ms", self.connect_timeout_ms == 0),
            ("limits.response_timeout_ms", self.response_timeout_ms == 0),
        ]
        .into_iter()
        .find_map(|(field, is_zero)| is_zero.then_some(field));

        match zero_field {
            Some(field) => Err(ConfigError::InvalidValue {
                field: String::from(field),
                reason: String::from("must be at least 1"),
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `DOCKMGR_CONFIG_PATH` environment variable
/// 2. `.dockmgr.toml` in the current working directory
/// 3. `.dockmgr.toml` in the home directory
/// 4. `~/.config/dockmgr/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "DOCKMGR",
    discovery(
        app_name = "dockmgr",
        env_var = "DOCKMGR_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".dockmgr.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine endpoint (`unix://`, `npipe://`, `tcp://`,
    /// `http://`, `https://` or a bare socket path).
    pub engine_host: Option<String>,

    /// Pinned engine API version such as `1.24`.
    pub api_version: Option<String>,

    /// TLS settings for remote endpoints.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub tls: TlsConfig,

    /// Connection pool and timeout limits.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub limits: LimitsConfig,
}
