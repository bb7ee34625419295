//! `oscfg render` — Build the cloud-config document for a descriptor.

use oscfg_cloudconfig::{CloudConfigBuilder, ReconcileOutput};
use oscfg_config::AppConfig;
use oscfg_core::OsConfigDescriptor;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{context_for, resolver_for};

pub struct RenderArgs {
    pub descriptor: PathBuf,
    pub namespace: Option<String>,
    pub secrets_dir: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

pub async fn run(
    args: RenderArgs,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let output = render(&config, &args, cancel).await?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, &output.document)?;
            eprintln!("Wrote {}", path.display());
        }
        None => std::io::stdout().write_all(&output.document)?,
    }

    if let Some(command) = &output.reload_command {
        eprintln!("Reload command: {command}");
    }
    Ok(())
}

/// Load the descriptor and build its document under `config`, with CLI flags
/// taking precedence over config values.
pub async fn render(
    config: &AppConfig,
    args: &RenderArgs,
    cancel: CancellationToken,
) -> Result<ReconcileOutput, Box<dyn std::error::Error>> {
    let descriptor = OsConfigDescriptor::load(&args.descriptor)?;
    let namespace = args
        .namespace
        .clone()
        .unwrap_or_else(|| config.namespace.clone());
    let secrets_dir = args
        .secrets_dir
        .clone()
        .or_else(|| config.resolver.secrets_dir.clone());

    let builder = CloudConfigBuilder::from_config(config)?;
    let resolver = resolver_for(secrets_dir);
    let ctx = context_for(config, namespace, cancel);

    let output = builder
        .reconcile(&descriptor, resolver.as_ref(), &ctx)
        .await?;

    tracing::info!(
        descriptor = %args.descriptor.display(),
        namespace = %ctx.namespace,
        resolver = resolver.name(),
        units = output.unit_names.len(),
        files = output.file_paths.len(),
        "Rendered cloud-config"
    );
    Ok(output)
}
