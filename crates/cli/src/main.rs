//! oscfg CLI — the main entry point.
//!
//! Commands:
//! - `render` — Build the cloud-config document for a node descriptor
//! - `check`  — Validate a descriptor and dry-build it
//! - `init`   — Write the default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

mod commands;

#[derive(Parser)]
#[command(
    name = "oscfg",
    about = "oscfg — CoreOS cloud-config synthesis",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the cloud-config document for a descriptor
    Render {
        /// Descriptor file (.json, .yaml, .yml or .toml)
        descriptor: PathBuf,

        /// Namespace secret references are resolved in
        #[arg(short, long)]
        namespace: Option<String>,

        /// Directory holding `<namespace>/<secret>/<key>` files
        #[arg(long, env = "OSCFG_SECRETS_DIR")]
        secrets_dir: Option<PathBuf>,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Validate a descriptor and dry-build it
    Check {
        /// Descriptor file (.json, .yaml, .yml or .toml)
        descriptor: PathBuf,
    },

    /// Write the default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling content resolution");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Render {
            descriptor,
            namespace,
            secrets_dir,
            out,
        } => {
            let args = commands::render::RenderArgs {
                descriptor,
                namespace,
                secrets_dir,
                out,
            };
            commands::render::run(args, cancel).await?
        }
        Commands::Check { descriptor } => commands::check::run(&descriptor, cancel).await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}
