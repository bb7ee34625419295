//! Feature bundles appended to every document under fixed conditions.
//!
//! Each bundle is a pure step that takes the document by value and returns
//! the extended document. Whether a step runs is decided by a predicate over
//! the descriptor, never inside the step itself, so a bundle is either
//! appended whole or not at all.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oscfg_core::descriptor::{OsConfigDescriptor, Purpose};
use tracing::debug;

use crate::document::{CloudConfig, File, Unit};
use crate::encoding::ENCODING_B64;
use crate::payloads::Payloads;

pub const SCTP_BLACKLIST_PATH: &str = "/etc/modprobe.d/sctp.conf";
const SCTP_BLACKLIST_CONTENT: &str = "install sctp /bin/true";

pub const RUN_COMMAND_UNIT: &str = "run-command.service";
const CONTAINERD_DROP_IN_PATH: &str = "/etc/systemd/system/containerd.service.d/11-exec_config.conf";
const RUN_COMMAND_SCRIPT_PATH: &str = "/opt/bin/run-command.sh";

pub const CGROUPSV2_UNIT: &str = "enable-cgroupsv2.service";
const CGROUPSV2_SCRIPT_PATH: &str = "/opt/bin/configure-cgroupsv2.sh";

const MODE_CONFIG: &str = "0644";
const MODE_EXECUTABLE: &str = "0755";

/// Apply `step` only when `enabled` holds.
pub(crate) fn when(
    doc: CloudConfig,
    enabled: bool,
    step: impl FnOnce(CloudConfig) -> CloudConfig,
) -> CloudConfig {
    if enabled { step(doc) } else { doc }
}

/// The sctp module is blacklisted on running nodes only.
pub(crate) fn needs_sctp_blacklist(descriptor: &OsConfigDescriptor) -> bool {
    descriptor.purpose == Purpose::Reconcile
}

pub(crate) fn with_sctp_blacklist(mut doc: CloudConfig) -> CloudConfig {
    doc.write_files.push(File {
        encoding: ENCODING_B64.to_string(),
        content: STANDARD.encode(SCTP_BLACKLIST_CONTENT),
        owner: "root".to_string(),
        path: SCTP_BLACKLIST_PATH.to_string(),
        raw_file_permissions: MODE_CONFIG.to_string(),
    });
    debug!(path = SCTP_BLACKLIST_PATH, "Injected sctp blacklist");
    doc
}

/// The containerd patch is part of first-boot user data only.
pub(crate) fn needs_runtime_patch(descriptor: &OsConfigDescriptor) -> bool {
    descriptor.uses_containerd() && descriptor.purpose == Purpose::Provision
}

pub(crate) fn with_runtime_patch(mut doc: CloudConfig, payloads: &Payloads) -> CloudConfig {
    doc.coreos.units.push(oneshot_unit(RUN_COMMAND_UNIT, &payloads.run_command_unit));
    doc.write_files.push(plain_file(
        CONTAINERD_DROP_IN_PATH,
        MODE_CONFIG,
        &payloads.containerd_drop_in,
    ));
    doc.write_files.push(plain_file(
        RUN_COMMAND_SCRIPT_PATH,
        MODE_EXECUTABLE,
        &payloads.run_command_script,
    ));
    debug!(unit = RUN_COMMAND_UNIT, "Injected containerd runtime patch");
    doc
}

pub(crate) fn with_cgroupsv2(mut doc: CloudConfig, payloads: &Payloads) -> CloudConfig {
    doc.coreos.units.push(oneshot_unit(CGROUPSV2_UNIT, &payloads.cgroupsv2_unit));
    doc.write_files.push(plain_file(
        CGROUPSV2_SCRIPT_PATH,
        MODE_EXECUTABLE,
        &payloads.cgroupsv2_script,
    ));
    debug!(unit = CGROUPSV2_UNIT, "Injected cgroups v2 patch");
    doc
}

/// Append the trailing bundles: runtime patch (if it applies), then cgroups v2.
pub(crate) fn inject(
    doc: CloudConfig,
    descriptor: &OsConfigDescriptor,
    payloads: &Payloads,
) -> CloudConfig {
    let doc = when(doc, needs_runtime_patch(descriptor), |doc| {
        with_runtime_patch(doc, payloads)
    });
    with_cgroupsv2(doc, payloads)
}

fn oneshot_unit(name: &str, content: &str) -> Unit {
    Unit {
        name: name.to_string(),
        enable: true,
        command: "start".to_string(),
        content: content.to_string(),
        ..Unit::default()
    }
}

fn plain_file(path: &str, mode: &str, content: &str) -> File {
    File {
        path: path.to_string(),
        raw_file_permissions: mode.to_string(),
        content: content.to_string(),
        ..File::default()
    }
}
