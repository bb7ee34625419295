//! Fixed unit and script payloads injected by the feature steps.
//!
//! The built-in payloads are compiled in from `assets/`. Any of them can be
//! replaced from a file through the `[payloads]` config section.

use oscfg_config::PayloadConfig;
use std::path::Path;

use crate::BuildError;

const RUN_COMMAND_UNIT: &str = include_str!("../assets/run-command.service");
const CONTAINERD_DROP_IN: &str = include_str!("../assets/11-exec_config.conf");
const RUN_COMMAND_SCRIPT: &str = include_str!("../assets/run-command.sh");
const CGROUPSV2_UNIT: &str = include_str!("../assets/enable-cgroupsv2.service");
const CGROUPSV2_SCRIPT: &str = include_str!("../assets/configure-cgroupsv2.sh");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payloads {
    /// Oneshot unit that runs `run-command.sh` before containerd and kubelet.
    pub run_command_unit: String,
    /// Drop-in overriding containerd's `ExecStart`.
    pub containerd_drop_in: String,
    pub run_command_script: String,
    /// Oneshot unit that runs `configure-cgroupsv2.sh`.
    pub cgroupsv2_unit: String,
    pub cgroupsv2_script: String,
}

impl Default for Payloads {
    fn default() -> Self {
        Self {
            run_command_unit: RUN_COMMAND_UNIT.to_string(),
            containerd_drop_in: CONTAINERD_DROP_IN.to_string(),
            run_command_script: RUN_COMMAND_SCRIPT.to_string(),
            cgroupsv2_unit: CGROUPSV2_UNIT.to_string(),
            cgroupsv2_script: CGROUPSV2_SCRIPT.to_string(),
        }
    }
}

impl Payloads {
    /// Built-in payloads with any configured file overrides applied.
    pub fn from_config(config: &PayloadConfig) -> Result<Self, BuildError> {
        let mut payloads = Self::default();
        let overrides = [
            (&config.run_command_unit, &mut payloads.run_command_unit),
            (&config.containerd_drop_in, &mut payloads.containerd_drop_in),
            (&config.run_command_script, &mut payloads.run_command_script),
            (&config.cgroupsv2_unit, &mut payloads.cgroupsv2_unit),
            (&config.cgroupsv2_script, &mut payloads.cgroupsv2_script),
        ];
        for (path, slot) in overrides {
            if let Some(path) = path {
                *slot = read_payload(path)?;
                tracing::debug!(path = %path.display(), "Payload override loaded");
            }
        }
        Ok(payloads)
    }
}

fn read_payload(path: &Path) -> Result<String, BuildError> {
    std::fs::read_to_string(path).map_err(|e| BuildError::Payload {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
