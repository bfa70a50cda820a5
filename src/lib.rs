//! Control-plane client core for Docker-compatible container engines.
//!
//! `dockmgr` owns the connection to a Docker or Podman daemon and runs a small
//! set of container and image commands against it with a typed error
//! taxonomy. The connection is verified by a liveness probe before use,
//! shared between callers, bounded by a pool of call slots, and every call
//! runs under a response timeout.
//!
//! # Security
//!
//! Local sockets rely on filesystem permissions and never use TLS. Remote
//! endpoints verify the daemon certificate by default; plaintext is an
//! explicit opt-out honoured only for loopback or trusted hosts.
//!
//! # Modules
//!
//! - [`api`]: Typed per-operation functions with documented defaults
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Endpoint parsing, connection management and command execution
//! - [`error`]: Semantic error types for the library

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
