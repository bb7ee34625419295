//! The cloud-config document and its canonical rendering.
//!
//! Field names and order follow what `coreos-cloudinit` reads. Empty strings,
//! `false` flags and empty lists are left out of the rendered YAML, so a
//! masked unit renders as `name`, `mask` and `command` only.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::BuildError;
use crate::encoding::ENCODING_B64;

/// First line of every rendered document; `coreos-cloudinit` sniffs for it.
pub const CLOUD_CONFIG_HEADER: &str = "#cloud-config";

const REBOOT_STRATEGIES: &[&str] = &["best-effort", "etcd-lock", "reboot", "off"];

const UNIT_COMMANDS: &[&str] = &[
    "",
    "start",
    "stop",
    "restart",
    "reload",
    "try-restart",
    "reload-or-restart",
    "reload-or-try-restart",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub coreos: CoreOs,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_files: Vec<File>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreOs {
    #[serde(default)]
    pub update: Update,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    #[serde(
        rename = "reboot-strategy",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub reboot_strategy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub mask: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub enable: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_ins: Vec<UnitDropIn>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDropIn {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encoding: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,

    pub path: String,

    /// Octal mode string, e.g. `"0644"`.
    #[serde(rename = "permissions", default, skip_serializing_if = "String::is_empty")]
    pub raw_file_permissions: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// `0?[0-7]{3,4}`
fn is_octal_mode(s: &str) -> bool {
    let all_octal = s.bytes().all(|b| (b'0'..=b'7').contains(&b));
    all_octal && (matches!(s.len(), 3 | 4) || (s.len() == 5 && s.starts_with('0')))
}

impl CloudConfig {
    /// Names of all units, in document order.
    pub fn unit_names(&self) -> Vec<String> {
        self.coreos.units.iter().map(|u| u.name.clone()).collect()
    }

    /// Paths of all files, in document order.
    pub fn file_paths(&self) -> Vec<String> {
        self.write_files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.coreos.units.iter().find(|u| u.name == name)
    }

    pub fn file(&self, path: &str) -> Option<&File> {
        self.write_files.iter().find(|f| f.path == path)
    }

    /// Check the values `coreos-cloudinit` would refuse.
    ///
    /// The builder never produces these; a failure here is a defect.
    pub fn validate(&self) -> Result<(), BuildError> {
        let strategy = self.coreos.update.reboot_strategy.as_str();
        if !strategy.is_empty() && !REBOOT_STRATEGIES.contains(&strategy) {
            return Err(BuildError::Serialization(format!(
                "invalid reboot strategy '{strategy}'"
            )));
        }

        for unit in &self.coreos.units {
            if unit.name.is_empty() {
                return Err(BuildError::Serialization("unit with empty name".into()));
            }
            if !UNIT_COMMANDS.contains(&unit.command.as_str()) {
                return Err(BuildError::Serialization(format!(
                    "unit '{}' has invalid command '{}'",
                    unit.name, unit.command
                )));
            }
        }

        for file in &self.write_files {
            if file.path.is_empty() {
                return Err(BuildError::Serialization("file with empty path".into()));
            }
            if !is_octal_mode(&file.raw_file_permissions) {
                return Err(BuildError::Serialization(format!(
                    "file {} has invalid permissions '{}'",
                    file.path, file.raw_file_permissions
                )));
            }
            match file.encoding.as_str() {
                "" => {}
                ENCODING_B64 => {
                    if STANDARD.decode(&file.content).is_err() {
                        return Err(BuildError::Serialization(format!(
                            "file {} is tagged b64 but its content is not base64",
                            file.path
                        )));
                    }
                }
                other => {
                    return Err(BuildError::Serialization(format!(
                        "file {} has unsupported encoding '{other}'",
                        file.path
                    )));
                }
            }
        }

        Ok(())
    }

    /// Render the canonical `#cloud-config` text.
    pub fn render(&self) -> Result<String, BuildError> {
        self.validate()?;
        let body =
            serde_yaml::to_string(self).map_err(|e| BuildError::Serialization(e.to_string()))?;
        Ok(format!("{CLOUD_CONFIG_HEADER}\n\n{body}"))
    }

    /// Read a rendered document back.
    pub fn parse(input: &str) -> Result<Self, BuildError> {
        if !input.starts_with(CLOUD_CONFIG_HEADER) {
            return Err(BuildError::Serialization(format!(
                "document does not start with '{CLOUD_CONFIG_HEADER}'"
            )));
        }
        serde_yaml::from_str(input).map_err(|e| BuildError::Serialization(e.to_string()))
    }
}
