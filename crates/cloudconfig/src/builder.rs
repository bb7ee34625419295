//! Document assembly.
//!
//! The builder moves one [`CloudConfig`] value through a fixed sequence of
//! steps:
//!
//! 1. base units (`update-engine`, `locksmithd`) and reboot strategy
//! 2. sctp blacklist, when reconciling
//! 3. descriptor units, in order
//! 4. descriptor files, in order, with resolved and encoded content
//! 5. runtime patch, when provisioning a containerd node
//! 6. cgroups v2 patch
//!
//! File content is the only part that needs I/O. Resolutions run
//! concurrently up to a configured limit; results are slotted back by index
//! so the document keeps input order whatever order they complete in.

use futures::{StreamExt, TryStreamExt, stream};
use oscfg_config::AppConfig;
use oscfg_core::descriptor::{FileSpec, OsConfigDescriptor, UnitSpec};
use oscfg_core::error::ResolveError;
use oscfg_core::resolver::{ContentResolver, ResolveContext};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::document::{CloudConfig, CoreOs, File, Unit, UnitDropIn, Update};
use crate::encoding::encode;
use crate::features;
use crate::payloads::Payloads;
use crate::reload::reload_command;
use crate::BuildError;

/// Units present in every document, masked and stopped so the node never
/// updates or reboots itself.
const BASE_UNITS: &[&str] = &["update-engine.service", "locksmithd.service"];

const REBOOT_STRATEGY: &str = "off";

const DEFAULT_MAX_CONCURRENT: usize = 8;

/// The rendered document plus what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub document: Vec<u8>,
    /// Every unit in the document, in document order.
    pub unit_names: Vec<String>,
    /// Every file in the document, in document order.
    pub file_paths: Vec<String>,
}

/// [`BuildOutput`] with the reload command for the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutput {
    pub document: Vec<u8>,
    pub reload_command: Option<String>,
    pub unit_names: Vec<String>,
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CloudConfigBuilder {
    payloads: Payloads,
    max_concurrent: usize,
}

impl Default for CloudConfigBuilder {
    fn default() -> Self {
        Self::new(Payloads::default())
    }
}

impl CloudConfigBuilder {
    pub fn new(payloads: Payloads) -> Self {
        Self {
            payloads,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Builder with payload overrides and concurrency taken from config.
    pub fn from_config(config: &AppConfig) -> Result<Self, BuildError> {
        let payloads = Payloads::from_config(&config.payloads)?;
        Ok(Self::new(payloads).with_max_concurrent(config.resolver.max_concurrent))
    }

    /// Limit how many file contents are resolved at once. `0` is treated as `1`.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn payloads(&self) -> &Payloads {
        &self.payloads
    }

    /// Build and render the document for `descriptor`.
    ///
    /// Fails without producing any output if the descriptor is invalid, a
    /// unit name collides, any file content cannot be resolved, or the
    /// build is cancelled through `ctx`.
    pub async fn build(
        &self,
        descriptor: &OsConfigDescriptor,
        resolver: &dyn ContentResolver,
        ctx: &ResolveContext,
    ) -> Result<BuildOutput, BuildError> {
        descriptor.validate()?;
        if ctx.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        let doc = base_document();
        let doc = features::when(
            doc,
            features::needs_sctp_blacklist(descriptor),
            features::with_sctp_blacklist,
        );
        let doc = with_units(doc, &descriptor.units);

        let contents = self.resolve_all(&descriptor.files, resolver, ctx).await?;
        let doc = with_files(doc, &descriptor.files, contents)?;
        let doc = features::inject(doc, descriptor, &self.payloads);

        ensure_unique_units(&doc)?;
        let rendered = doc.render()?;

        let output = BuildOutput {
            document: rendered.into_bytes(),
            unit_names: doc.unit_names(),
            file_paths: doc.file_paths(),
        };
        info!(
            purpose = ?descriptor.purpose,
            resolver = resolver.name(),
            units = output.unit_names.len(),
            files = output.file_paths.len(),
            bytes = output.document.len(),
            "Cloud-config built"
        );
        Ok(output)
    }

    /// [`build`](Self::build), plus the reload command for the descriptor.
    pub async fn reconcile(
        &self,
        descriptor: &OsConfigDescriptor,
        resolver: &dyn ContentResolver,
        ctx: &ResolveContext,
    ) -> Result<ReconcileOutput, BuildError> {
        let output = self.build(descriptor, resolver, ctx).await?;
        Ok(ReconcileOutput {
            document: output.document,
            reload_command: reload_command(descriptor.reload_config_file_path.as_deref()),
            unit_names: output.unit_names,
            file_paths: output.file_paths,
        })
    }

    /// Resolve every file's content; results are in `files` order.
    ///
    /// The first failure ends the stream, which drops every resolution
    /// still in flight.
    async fn resolve_all(
        &self,
        files: &[FileSpec],
        resolver: &dyn ContentResolver,
        ctx: &ResolveContext,
    ) -> Result<Vec<Vec<u8>>, BuildError> {
        let resolved: Vec<(usize, Vec<u8>)> = stream::iter(files.iter().enumerate())
            .map(|(index, file)| async move {
                resolve_file(resolver, ctx, file).await.map(|bytes| (index, bytes))
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        let mut slots: Vec<Option<Vec<u8>>> = vec![None; files.len()];
        for (index, bytes) in resolved {
            slots[index] = Some(bytes);
        }
        Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
    }
}

async fn resolve_file(
    resolver: &dyn ContentResolver,
    ctx: &ResolveContext,
    file: &FileSpec,
) -> Result<Vec<u8>, BuildError> {
    let resolution = resolver.resolve(&ctx.namespace, &file.content.source);
    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(ResolveError::Cancelled),
        result = with_timeout(ctx.timeout, resolution) => result,
    };

    match outcome {
        Ok(bytes) => {
            debug!(path = %file.path, kind = file.content.source.kind(), bytes = bytes.len(), "Content resolved");
            Ok(bytes)
        }
        Err(source) => {
            warn!(path = %file.path, error = %source, "Content resolution failed");
            Err(BuildError::ContentResolution {
                path: file.path.clone(),
                source,
            })
        }
    }
}

async fn with_timeout<F>(timeout: Option<Duration>, resolution: F) -> Result<Vec<u8>, ResolveError>
where
    F: Future<Output = Result<Vec<u8>, ResolveError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, resolution)
            .await
            .unwrap_or_else(|_| {
                Err(ResolveError::Timeout {
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }),
        None => resolution.await,
    }
}

fn base_document() -> CloudConfig {
    CloudConfig {
        coreos: CoreOs {
            update: Update {
                reboot_strategy: REBOOT_STRATEGY.to_string(),
            },
            units: BASE_UNITS
                .iter()
                .map(|name| Unit {
                    name: name.to_string(),
                    mask: true,
                    command: "stop".to_string(),
                    ..Unit::default()
                })
                .collect(),
        },
        write_files: Vec::new(),
    }
}

fn with_units(mut doc: CloudConfig, units: &[UnitSpec]) -> CloudConfig {
    doc.coreos.units.extend(units.iter().map(|spec| Unit {
        name: spec.name.clone(),
        mask: false,
        enable: spec.enable.unwrap_or(false),
        content: spec.content.clone().unwrap_or_default(),
        command: spec
            .command
            .map(|c| c.as_str().to_string())
            .unwrap_or_default(),
        drop_ins: spec
            .drop_ins
            .iter()
            .map(|d| UnitDropIn {
                name: d.name.clone(),
                content: d.content.clone(),
            })
            .collect(),
    }));
    doc
}

fn with_files(
    mut doc: CloudConfig,
    files: &[FileSpec],
    contents: Vec<Vec<u8>>,
) -> Result<CloudConfig, BuildError> {
    for (spec, raw) in files.iter().zip(contents) {
        let encoded = encode(raw, spec.content.is_transmitted_unencoded()).map_err(|source| {
            BuildError::InvalidContent {
                path: spec.path.clone(),
                source,
            }
        })?;
        doc.write_files.push(File {
            encoding: encoded.encoding.to_string(),
            content: encoded.content,
            owner: String::new(),
            path: spec.path.clone(),
            raw_file_permissions: format!("{:04o}", spec.permissions_or_default()),
        });
    }
    Ok(doc)
}

fn ensure_unique_units(doc: &CloudConfig) -> Result<(), BuildError> {
    let mut seen = BTreeSet::new();
    for unit in &doc.coreos.units {
        if !seen.insert(unit.name.as_str()) {
            return Err(BuildError::DuplicateUnit(unit.name.clone()));
        }
    }
    Ok(())
}
