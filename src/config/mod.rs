//! Configuration system for dockmgr.
//!
//! This module provides the configuration structures and CLI definitions for
//! dockmgr. Configuration loading and precedence merging is handled by the
//! `ortho_config` crate. Precedence: CLI flags override environment variables,
//! which override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/dockmgr/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_host = "tcp://build-box.internal:2376"
//! api_version = "1.43"
//!
//! [tls]
//! verify = true
//! cert_path = "/home/user/.docker"
//!
//! [limits]
//! max_connections = 5
//! connect_timeout_ms = 100
//! response_timeout_ms = 3000
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands, ContainerArgs, CreateArgs, ImagesArgs, PsArgs};
pub use loader::{env_var_names, load_config};
pub use types::{AppConfig, LimitsConfig, TlsConfig};
