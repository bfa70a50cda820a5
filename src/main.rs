//! `dockmgr` application entry point.
//!
//! This binary manages containers and images on a Docker-compatible engine.
//! It uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/dockmgr/config.toml` or path from `DOCKMGR_CONFIG_PATH`)
//! 3. Environment variables (`DOCKMGR_*`)
//! 4. Command-line arguments

use clap::Parser;
use dockmgr::api;
use dockmgr::config::{AppConfig, Cli, Commands, load_config};
use dockmgr::engine::{ConnectionHandle, ContainerSummary, ImageSummary};
use dockmgr::error::Result as DockmgrResult;
use eyre::{Report, Result as EyreResult};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Installs logging, loads configuration, connects to the engine and
/// dispatches the subcommand.
#[tokio::main]
async fn main() -> EyreResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli).map_err(Report::from)?;

    run(&cli, &config).await.map_err(Report::from)
}

/// Install the `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and the
/// default is `warn`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "dockmgr=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Connect and execute the CLI command, returning domain-specific errors.
///
/// Keeps semantic errors inside the run loop so the CLI boundary owns
/// conversion to `eyre::Report`.
async fn run(cli: &Cli, config: &AppConfig) -> DockmgrResult<()> {
    let env = mockable::DefaultEnv::new();
    let mut manager = api::connection_manager(config, &env)?;
    let handle = manager.acquire().await?;

    let outcome = dispatch(&cli.command, &handle).await;
    manager.shutdown().await;
    outcome
}

async fn dispatch(command: &Commands, handle: &ConnectionHandle) -> DockmgrResult<()> {
    match command {
        Commands::Ps(args) => {
            let containers = api::list_containers(handle, Some(!args.running_only)).await?;
            print_containers(&containers);
        }
        Commands::Images(args) => {
            let images = match args.filter.as_deref() {
                Some(pattern) => api::filter_images(handle, Some(pattern)).await?,
                None => api::list_images(handle).await?,
            };
            print_images(&images);
        }
        Commands::Start(args) => {
            api::start_container(handle, &args.container).await?;
            print_done("started", &args.container);
        }
        Commands::Stop(args) => {
            api::stop_container(handle, &args.container).await?;
            print_done("stopped", &args.container);
        }
        Commands::Create(args) => {
            api::create_container(handle, &args.image).await?;
            print_done("created container from", &args.image);
        }
        Commands::Rm(args) => {
            api::remove_container(handle, &args.container).await?;
            print_done("removed", &args.container);
        }
        Commands::Ping => {
            api::ping(handle).await?;
            print_done("engine answered at", handle.endpoint());
        }
    }
    Ok(())
}

/// Print a container table.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_containers(containers: &[ContainerSummary]) {
    println!("{:<14} {:<24} {:<28} {:<10} STATUS", "CONTAINER ID", "NAMES", "IMAGE", "STATE");
    for container in containers {
        let short_id: String = container.id.chars().take(12).collect();
        println!(
            "{:<14} {:<24} {:<28} {:<10} {}",
            short_id,
            container.names.join(","),
            container.image,
            container.state,
            container.status
        );
    }
}

/// Print an image table.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_images(images: &[ImageSummary]) {
    println!("{:<20} {:<48} SIZE", "IMAGE ID", "TAGS");
    for image in images {
        let short_id: String = image
            .id
            .trim_start_matches("sha256:")
            .chars()
            .take(12)
            .collect();
        println!(
            "{:<20} {:<48} {}",
            short_id,
            image.repo_tags.join(","),
            image.size_bytes
        );
    }
}

/// Print a one-line confirmation.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_done(action: &str, subject: &str) {
    println!("{action} {subject}");
}
