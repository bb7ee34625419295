//! CoreOS cloud-config synthesis.
//!
//! Turns an [`OsConfigDescriptor`](oscfg_core::OsConfigDescriptor) into the
//! `#cloud-config` document consumed by `coreos-cloudinit` at boot.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────┐    ┌─────────────┐
//! │  Descriptor  │───▶│ CloudConfigBuilder │───▶│  Rendered   │
//! └──────────────┘    └───────────────────┘    │  document   │
//!                       │       │       │       └─────────────┘
//!               ┌───────┘       │       └────────┐
//!         ┌─────┴─────┐  ┌──────┴─────┐  ┌───────┴──────┐
//!         │ Resolver  │  │  Encoding  │  │   Features   │
//!         │ (content) │  │ (b64/raw)  │  │ sctp, cri,   │
//!         └───────────┘  └────────────┘  │ cgroups v2   │
//!                                        └──────────────┘
//! ```
//!
//! Every document carries two masked auto-update units and the cgroups-v2
//! patch. A reconcile document also blacklists the sctp kernel module, and a
//! provisioning document for a containerd node carries the runtime patch.
//! Output is deterministic: the same descriptor and the same resolved
//! content always render the same bytes.

mod builder;
mod document;
mod encoding;
mod features;
mod payloads;
mod reload;

pub use builder::{BuildOutput, CloudConfigBuilder, ReconcileOutput};
pub use document::{CloudConfig, CoreOs, File, Unit, UnitDropIn, Update, CLOUD_CONFIG_HEADER};
pub use encoding::{decode, encode, EncodedContent, EncodingError, ENCODING_B64};
pub use features::{CGROUPSV2_UNIT, RUN_COMMAND_UNIT, SCTP_BLACKLIST_PATH};
pub use payloads::Payloads;
pub use reload::{reload_command, CLOUD_INIT_COMMAND};

use oscfg_core::error::{DescriptorError, ResolveError};

/// Result alias for build operations.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Errors from building a cloud-config document.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("could not resolve content for file {path}: {source}")]
    ContentResolution {
        path: String,
        #[source]
        source: ResolveError,
    },

    #[error("unit '{0}' appears more than once in the document")]
    DuplicateUnit(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),

    #[error("invalid content for file {path}: {source}")]
    InvalidContent {
        path: String,
        #[source]
        source: EncodingError,
    },

    #[error("build cancelled before it started")]
    Cancelled,

    #[error("failed to load payload {path}: {reason}")]
    Payload { path: String, reason: String },

    #[error("could not serialize cloud-config: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_wraps_cause_and_path() {
        let err = BuildError::ContentResolution {
            path: "/etc/foo".into(),
            source: ResolveError::Cancelled,
        };
        assert!(err.to_string().contains("/etc/foo"));
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), "content resolution cancelled");
    }

    #[test]
    fn descriptor_errors_convert() {
        let err: BuildError = DescriptorError::DuplicateUnit("a.service".into()).into();
        assert!(matches!(err, BuildError::InvalidDescriptor(_)));
    }
}
