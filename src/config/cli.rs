//! Command-line argument definitions for dockmgr.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for dockmgr.
#[derive(Debug, Parser)]
#[command(name = "dockmgr")]
#[command(
    author,
    version,
    about = "Manage containers and images on a Docker-compatible engine"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine endpoint (socket path or URL).
    #[arg(long, global = true)]
    pub engine_host: Option<String>,

    /// Emit debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List containers.
    Ps(PsArgs),

    /// List images, optionally filtered by name.
    Images(ImagesArgs),

    /// Start a container.
    Start(ContainerArgs),

    /// Stop a running container.
    Stop(ContainerArgs),

    /// Create a container from a local image.
    Create(CreateArgs),

    /// Remove a stopped container.
    Rm(ContainerArgs),

    /// Check that the engine answers.
    Ping,
}

/// Arguments for the `ps` subcommand.
#[derive(Debug, Parser)]
pub struct PsArgs {
    /// Only show running containers.
    #[arg(long)]
    pub running_only: bool,
}

/// Arguments for the `images` subcommand.
#[derive(Debug, Parser)]
pub struct ImagesArgs {
    /// Only show images with a tag containing this text.
    #[arg(long)]
    pub filter: Option<String>,
}

/// Arguments for subcommands that target one container.
#[derive(Debug, Parser)]
pub struct ContainerArgs {
    /// Container ID or name.
    #[arg(required = true)]
    pub container: String,
}

/// Arguments for the `create` subcommand.
#[derive(Debug, Parser)]
pub struct CreateArgs {
    /// Image to create the container from.
    #[arg(required = true)]
    pub image: String,
}
