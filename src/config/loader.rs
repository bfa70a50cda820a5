//! Configuration loading with layered precedence.
//!
//! This module loads configuration with the precedence order (lowest to
//! highest): application defaults, configuration file, environment variables,
//! command-line arguments.
//!
//! The `OrthoConfig` derive provides its own `load()`, but the `Cli` struct
//! owns subcommand dispatch and the `--config` flag, so the layers are composed
//! manually with `MergeComposer`. This also lets typed environment variables
//! fail fast instead of being ignored when unparseable.
//!
//! # Environment Variable Handling
//!
//! Environment variables with unparseable values (e.g.,
//! `DOCKMGR_TLS_VERIFY=maybe` instead of `true`/`false`) return an error
//! immediately. String fields (e.g., `DOCKMGR_ENGINE_HOST`) are always
//! accepted. List fields are comma-separated.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`). Invalid values return an error.
    Bool,
    /// Unsigned 64-bit integer. Invalid values return an error.
    U64,
    /// Comma-separated list of strings; blank entries are dropped.
    List,
}

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name (e.g., `DOCKMGR_ENGINE_HOST`).
    env_var: &'static str,
    /// The JSON path segments (e.g., `["tls", "verify"]`).
    path: &'static [&'static str],
    /// The expected value type.
    var_type: EnvVarType,
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "DOCKMGR_ENGINE_HOST",
        path: &["engine_host"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKMGR_API_VERSION",
        path: &["api_version"],
        var_type: EnvVarType::String,
    },
    // TLS fields
    EnvVarSpec {
        env_var: "DOCKMGR_TLS_VERIFY",
        path: &["tls", "verify"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "DOCKMGR_TLS_CERT_PATH",
        path: &["tls", "cert_path"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "DOCKMGR_TLS_TRUSTED_HOSTS",
        path: &["tls", "trusted_hosts"],
        var_type: EnvVarType::List,
    },
    // Limits
    EnvVarSpec {
        env_var: "DOCKMGR_LIMITS_MAX_CONNECTIONS",
        path: &["limits", "max_connections"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKMGR_LIMITS_CONNECT_TIMEOUT_MS",
        path: &["limits", "connect_timeout_ms"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "DOCKMGR_LIMITS_RESPONSE_TIMEOUT_MS",
        path: &["limits", "response_timeout_ms"],
        var_type: EnvVarType::U64,
    },
];

/// Returns the list of environment variable names recognised by the config
/// loader.
///
/// Tests use this to clear every `DOCKMGR_*` variable without keeping a
/// separate hard-coded list in sync.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

/// Load a configuration file and push it to the composer.
///
/// Uses `cap_std::fs_utf8`: the parent directory is opened with ambient
/// authority and the file is read relative to it.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Resolve the configuration file to load, if any.
///
/// An explicit `--config` path must exist. Without one, the first existing
/// discovery candidate is used.
fn resolve_config_path(cli: &Cli) -> Result<Option<Utf8PathBuf>> {
    if let Some(explicit) = cli.config.as_ref() {
        if !explicit.exists() {
            return Err(ConfigError::FileNotFound {
                path: explicit.as_std_path().to_path_buf(),
            }
            .into());
        }
        return Ok(Some(explicit.clone()));
    }

    let discovery = ConfigDiscovery::builder("dockmgr")
        .env_var("DOCKMGR_CONFIG_PATH")
        .config_file_name("config.toml")
        .dotfile_name(".dockmgr.toml")
        .build();
    Ok(discovery
        .candidates()
        .into_iter()
        .filter(|candidate| candidate.exists())
        .find_map(|candidate| Utf8PathBuf::try_from(candidate).ok()))
}

/// Load configuration with full layer precedence.
///
/// Layers, later overriding earlier:
/// 1. Application defaults defined in the struct
/// 2. Configuration file (`--config`, `DOCKMGR_CONFIG_PATH` or XDG discovery)
/// 3. Environment variables prefixed with `DOCKMGR_`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// # Errors
///
/// Returns `ConfigError` if configuration loading fails due to:
/// - A missing explicit configuration file
/// - Malformed configuration files
/// - Invalid typed environment variable values
/// - Zero-valued connection limits after merge
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = resolve_config_path(cli)? {
        load_config_file(&path, &mut composer)?;
    }

    let env_values = collect_env_vars()?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;
    config.limits.validate()?;

    Ok(config)
}

/// Parse one raw environment value according to its declared type.
fn parse_env_value(spec: &EnvVarSpec, raw_value: String) -> Result<Value> {
    match spec.var_type {
        EnvVarType::String => Ok(Value::String(raw_value)),
        EnvVarType::Bool => raw_value.parse::<bool>().map(Value::Bool).map_err(|_| {
            ConfigError::InvalidValue {
                field: spec.env_var.to_owned(),
                reason: format!("expected bool (true/false), got '{raw_value}'"),
            }
            .into()
        }),
        EnvVarType::U64 => raw_value
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| {
                ConfigError::InvalidValue {
                    field: spec.env_var.to_owned(),
                    reason: format!("expected unsigned integer, got '{raw_value}'"),
                }
                .into()
            }),
        EnvVarType::List => Ok(Value::Array(
            raw_value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| Value::String(entry.to_owned()))
                .collect(),
        )),
    }
}

/// Collect `DOCKMGR_` environment variables into a JSON value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a typed environment variable (bool,
/// u64) has an unparseable value.
fn collect_env_vars() -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Ok(raw_value) = std::env::var(spec.env_var) else {
            continue;
        };
        let json_value = parse_env_value(spec, raw_value)?;
        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert a value at a nested path in a JSON map.
///
/// For a path like `["tls", "verify"]`, this creates the intermediate `tls`
/// object if needed and inserts `verify` within it.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref host) = cli.engine_host {
        overrides.insert("engine_host".to_owned(), Value::String(host.clone()));
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
