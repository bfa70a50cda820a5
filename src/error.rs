//! Semantic error types for the dockmgr crate.
//!
//! This module defines the error hierarchy for dockmgr, following the principle
//! of using semantic error enums (via `thiserror`) for conditions the caller
//! might inspect, retry, or map to an HTTP status, while reserving opaque errors
//! (`eyre::Report`) for the application boundary.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while establishing a verified connection to the daemon.
///
/// Both variants are fatal at startup: no command can run without a
/// connection handle.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint address or the TLS settings around it are unusable.
    #[error("invalid engine endpoint '{address}': {reason}")]
    InvalidConfiguration {
        /// The address as configured.
        address: String,
        /// Why the address was rejected.
        reason: String,
    },

    /// The daemon did not answer the liveness probe.
    #[error("container engine at '{endpoint}' is unreachable: {reason}")]
    Unreachable {
        /// The endpoint that was probed.
        endpoint: String,
        /// The classified cause of the probe failure.
        reason: String,
    },
}

/// Errors raised while executing a single command against a verified handle.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The call did not complete within its time budget.
    #[error("{operation} timed out after {millis} ms")]
    Timeout {
        /// The command that timed out.
        operation: &'static str,
        /// The budget that was exceeded, in milliseconds.
        millis: u64,
    },

    /// The target resource is in a state that forbids the command.
    #[error("{operation} rejected for '{target}': {message}")]
    InvalidState {
        /// The command that was rejected.
        operation: &'static str,
        /// The container the command targeted.
        target: String,
        /// The daemon's explanation.
        message: String,
    },

    /// The referenced container or image does not exist.
    #[error("{operation} failed, '{target}' not found: {message}")]
    NotFound {
        /// The command that failed.
        operation: &'static str,
        /// The container id or image name that was not found.
        target: String,
        /// The daemon's explanation.
        message: String,
    },

    /// A lower-level transport or protocol fault.
    #[error("{operation} failed: {message}")]
    Transport {
        /// The command that failed.
        operation: &'static str,
        /// A description of the fault.
        message: String,
    },

    /// A command argument was rejected before reaching the daemon.
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument {
        /// The name of the rejected argument.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ExecutionError {
    /// Whether retrying the same command unchanged may succeed.
    ///
    /// Timeouts and transport faults are transient. State violations, missing
    /// resources and bad arguments need the caller to change something first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Top-level error type for the dockmgr crate.
///
/// At the application boundary (main.rs) these errors are converted to
/// `eyre::Report` for human-readable error reporting.
#[derive(Debug, Error)]
pub enum DockmgrError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while connecting to the container engine.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// An error occurred while executing a command.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// A specialised `Result` type for dockmgr operations.
pub type Result<T> = std::result::Result<T, DockmgrError>;
