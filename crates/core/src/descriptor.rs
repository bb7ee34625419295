//! The operating-system configuration descriptor.
//!
//! A descriptor is the provider-agnostic input to the engine: which systemd
//! units to manage, which files to write, which container runtime the node
//! uses, and whether this is a first-boot provisioning pass or a steady-state
//! reconcile. Field names are camelCase so descriptors produced by cluster
//! tooling can be loaded as-is from JSON, YAML, or TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::DescriptorError;

/// File mode applied when a [`FileSpec`] leaves `permissions` unset.
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;

/// Highest mode a file entry can carry: setuid, setgid, sticky and `rwx` x3.
pub const MAX_FILE_PERMISSIONS: u32 = 0o7777;

/// Root descriptor handed to the engine for a single build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsConfigDescriptor {
    /// Lifecycle phase this document is generated for. Required.
    pub purpose: Purpose,

    /// Container runtime configuration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cri: Option<CriConfig>,

    /// Units in the order they should appear in the document.
    #[serde(default)]
    pub units: Vec<UnitSpec>,

    /// Files in the order they should appear in the document.
    #[serde(default)]
    pub files: Vec<FileSpec>,

    /// Path the rendered document is written to on the node. When set, a
    /// reload command pointing at it is produced alongside the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_config_file_path: Option<String>,
}

/// Lifecycle phase of a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// First-boot user data that bootstraps the node.
    Provision,
    /// Configuration applied continuously on a running node.
    #[default]
    Reconcile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriConfig {
    pub name: CriName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriName {
    Containerd,
    Docker,
}

/// A systemd unit to manage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<UnitCommand>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    /// Full unit file text. Unset means the unit already exists on the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_ins: Vec<DropIn>,
}

impl UnitSpec {
    /// A bare unit with only a name; convenient for building descriptors in code.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCommand {
    Start,
    Restart,
    Stop,
}

impl UnitCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCommand::Start => "start",
            UnitCommand::Restart => "restart",
            UnitCommand::Stop => "stop",
        }
    }
}

/// A partial override fragment for a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIn {
    pub name: String,
    pub content: String,
}

/// A file to write on the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    pub path: String,

    /// Octal file mode, e.g. `0o600`. Defaults to [`DEFAULT_FILE_PERMISSIONS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<u32>,

    pub content: FileContent,
}

impl FileSpec {
    pub fn permissions_or_default(&self) -> u32 {
        self.permissions.unwrap_or(DEFAULT_FILE_PERMISSIONS)
    }
}

/// Where a file's bytes come from and how they travel in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(flatten)]
    pub source: ContentRef,

    /// Put the content into the document as literal text instead of base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmit_unencoded: Option<bool>,
}

impl FileContent {
    pub fn inline(data: impl Into<String>) -> Self {
        Self {
            source: ContentRef::Inline(InlineContent {
                encoding: String::new(),
                data: data.into(),
            }),
            transmit_unencoded: None,
        }
    }

    pub fn secret(name: impl Into<String>, data_key: impl Into<String>) -> Self {
        Self {
            source: ContentRef::SecretRef(SecretRef {
                name: name.into(),
                data_key: data_key.into(),
            }),
            transmit_unencoded: None,
        }
    }

    pub fn unencoded(mut self) -> Self {
        self.transmit_unencoded = Some(true);
        self
    }

    pub fn is_transmitted_unencoded(&self) -> bool {
        self.transmit_unencoded.unwrap_or(false)
    }
}

/// Opaque handle resolved into raw bytes by a [`crate::ContentResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentRef {
    Inline(InlineContent),
    SecretRef(SecretRef),
}

impl ContentRef {
    /// Short label for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentRef::Inline(_) => "inline",
            ContentRef::SecretRef(_) => "secretRef",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineContent {
    /// Encoding of `data`: empty for plain text, `b64`/`base64` for base64.
    #[serde(default)]
    pub encoding: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,
    pub data_key: String,
}

impl OsConfigDescriptor {
    /// Parse a descriptor from JSON.
    pub fn from_json(input: &str) -> Result<Self, DescriptorError> {
        serde_json::from_str(input).map_err(|e| DescriptorError::Parse {
            format: "json",
            reason: e.to_string(),
        })
    }

    /// Parse a descriptor from YAML.
    pub fn from_yaml(input: &str) -> Result<Self, DescriptorError> {
        serde_yaml::from_str(input).map_err(|e| DescriptorError::Parse {
            format: "yaml",
            reason: e.to_string(),
        })
    }

    /// Parse a descriptor from TOML.
    pub fn from_toml(input: &str) -> Result<Self, DescriptorError> {
        toml::from_str(input).map_err(|e| DescriptorError::Parse {
            format: "toml",
            reason: e.to_string(),
        })
    }

    /// Load a descriptor file, choosing the format from its extension.
    /// Anything that is not `.toml`, `.yaml` or `.yml` is read as JSON.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path)?;
        let descriptor = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };
        tracing::debug!(
            path = %path.display(),
            units = descriptor.units.len(),
            files = descriptor.files.len(),
            "Descriptor loaded"
        );
        Ok(descriptor)
    }

    /// Check the structural rules a descriptor must satisfy on its own.
    ///
    /// Collisions with units the engine adds itself are detected at build time.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let mut seen = BTreeSet::new();
        for (index, unit) in self.units.iter().enumerate() {
            if unit.name.is_empty() {
                return Err(DescriptorError::EmptyUnitName { index });
            }
            if !seen.insert(unit.name.as_str()) {
                return Err(DescriptorError::DuplicateUnit(unit.name.clone()));
            }
        }
        for (index, file) in self.files.iter().enumerate() {
            if file.path.is_empty() {
                return Err(DescriptorError::EmptyFilePath { index });
            }
            if let Some(mode) = file.permissions.filter(|m| *m > MAX_FILE_PERMISSIONS) {
                return Err(DescriptorError::InvalidPermissions { index, mode });
            }
        }
        Ok(())
    }

    /// Whether the configured container runtime is containerd.
    pub fn uses_containerd(&self) -> bool {
        matches!(
            self.cri,
            Some(CriConfig {
                name: CriName::Containerd
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON_DESCRIPTOR: &str = r#"{
        "purpose": "provision",
        "cri": { "name": "containerd" },
        "units": [
            {
                "name": "kubelet.service",
                "command": "start",
                "enable": true,
                "dropIns": [{ "name": "10-env.conf", "content": "[Service]\n" }]
            }
        ],
        "files": [
            {
                "path": "/etc/foo",
                "permissions": 384,
                "content": { "inline": { "data": "hello" } }
            },
            {
                "path": "/var/lib/kubelet/ca.crt",
                "content": {
                    "secretRef": { "name": "cloud-config", "dataKey": "ca" },
                    "transmitUnencoded": true
                }
            }
        ],
        "reloadConfigFilePath": "/var/lib/cloud-config"
    }"#;

    #[test]
    fn parses_json_descriptor() {
        let d = OsConfigDescriptor::from_json(JSON_DESCRIPTOR).unwrap();
        assert_eq!(d.purpose, Purpose::Provision);
        assert!(d.uses_containerd());
        assert_eq!(d.units[0].command, Some(UnitCommand::Start));
        assert_eq!(d.units[0].drop_ins[0].name, "10-env.conf");
        assert_eq!(d.files[0].permissions, Some(0o600));
        assert_eq!(d.files[0].content, FileContent::inline("hello"));
        assert_eq!(d.files[1].content, FileContent::secret("cloud-config", "ca").unencoded());
        assert_eq!(d.reload_config_file_path.as_deref(), Some("/var/lib/cloud-config"));
    }

    #[test]
    fn parses_yaml_descriptor() {
        let yaml = r#"
purpose: reconcile
units:
  - name: docker.service
    command: restart
files:
  - path: /etc/motd
    content:
      inline:
        encoding: b64
        data: aGk=
"#;
        let d = OsConfigDescriptor::from_yaml(yaml).unwrap();
        assert_eq!(d.purpose, Purpose::Reconcile);
        assert!(!d.uses_containerd());
        assert_eq!(d.units[0].command, Some(UnitCommand::Restart));
        match &d.files[0].content.source {
            ContentRef::Inline(inline) => assert_eq!(inline.encoding, "b64"),
            other => panic!("expected inline content, got {other:?}"),
        }
    }

    #[test]
    fn purpose_is_required() {
        let err = OsConfigDescriptor::from_json("{}").unwrap_err();
        assert!(err.to_string().contains("purpose"), "{err}");

        let d = OsConfigDescriptor::from_json(r#"{"purpose":"reconcile"}"#).unwrap();
        assert_eq!(d.purpose, Purpose::Reconcile);
        assert!(d.units.is_empty());
        assert!(d.files.is_empty());
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osc.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
purpose = "provision"

[cri]
name = "docker"

[[units]]
name = "kubelet.service"
enable = true
"#
        )
        .unwrap();

        let d = OsConfigDescriptor::load(&path).unwrap();
        assert_eq!(d.purpose, Purpose::Provision);
        assert_eq!(d.cri, Some(CriConfig { name: CriName::Docker }));
        assert_eq!(d.units[0].enable, Some(true));
    }

    #[test]
    fn parse_error_names_the_format() {
        let err = OsConfigDescriptor::from_json("not json").unwrap_err();
        assert!(err.to_string().contains("json"));
    }

    #[test]
    fn validate_rejects_duplicate_units() {
        let d = OsConfigDescriptor {
            units: vec![UnitSpec::named("a.service"), UnitSpec::named("a.service")],
            ..Default::default()
        };
        assert!(matches!(
            d.validate(),
            Err(DescriptorError::DuplicateUnit(name)) if name == "a.service"
        ));
    }

    #[test]
    fn validate_rejects_empty_names_and_paths() {
        let d = OsConfigDescriptor {
            units: vec![UnitSpec::named("ok.service"), UnitSpec::named("")],
            ..Default::default()
        };
        assert!(matches!(d.validate(), Err(DescriptorError::EmptyUnitName { index: 1 })));

        let d = OsConfigDescriptor {
            files: vec![FileSpec {
                path: String::new(),
                permissions: None,
                content: FileContent::inline("x"),
            }],
            ..Default::default()
        };
        assert!(matches!(d.validate(), Err(DescriptorError::EmptyFilePath { index: 0 })));
    }

    #[test]
    fn validate_rejects_modes_wider_than_twelve_bits() {
        let file = |path: &str, mode: u32| FileSpec {
            path: path.into(),
            permissions: Some(mode),
            content: FileContent::inline(""),
        };
        let d = OsConfigDescriptor {
            files: vec![file("/ok", 0o7777), file("/too-wide", 0o10644)],
            ..Default::default()
        };
        let err = d.validate().unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::InvalidPermissions { index: 1, mode: 0o10644 }
        ));
        assert!(err.to_string().contains("0o10644"));

        let d = OsConfigDescriptor {
            files: vec![file("/setuid", 0o4755)],
            ..Default::default()
        };
        assert!(d.validate().is_ok());
    }

    #[test]
    fn default_permissions_apply_when_unset() {
        let file = FileSpec {
            path: "/etc/foo".into(),
            permissions: None,
            content: FileContent::inline(""),
        };
        assert_eq!(file.permissions_or_default(), 0o644);
    }
}
