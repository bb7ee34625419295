//! Error types for the oscfg domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// Failures raised while resolving a file's content reference into bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("secret {namespace}/{name} has no data key '{key}'")]
    MissingKey {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("invalid inline content: {0}")]
    InvalidInline(String),

    #[error("resolver '{resolver}' does not support {kind} content")]
    Unsupported { resolver: String, kind: String },

    #[error("resolver backend error: {0}")]
    Backend(String),

    #[error("content resolution cancelled")]
    Cancelled,

    #[error("content resolution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Failures raised while loading or validating a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("unit at index {index} has an empty name")]
    EmptyUnitName { index: usize },

    #[error("file at index {index} has an empty path")]
    EmptyFilePath { index: usize },

    #[error("unit '{0}' is declared more than once")]
    DuplicateUnit(String),

    #[error("file at index {index} has permissions {mode:#o}, above 0o7777")]
    InvalidPermissions { index: usize, mode: u32 },

    #[error("failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse descriptor as {format}: {reason}")]
    Parse { format: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_displays_all_coordinates() {
        let err = ResolveError::MissingKey {
            namespace: "shoot--dev".into(),
            name: "cloud-config".into(),
            key: "kubelet".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("shoot--dev/cloud-config"));
        assert!(msg.contains("'kubelet'"));
    }

    #[test]
    fn timeout_displays_duration() {
        let err = ResolveError::Timeout { timeout_ms: 1500 };
        assert_eq!(err.to_string(), "content resolution timed out after 1500ms");
    }

    #[test]
    fn duplicate_unit_names_the_unit() {
        let err = DescriptorError::DuplicateUnit("kubelet.service".into());
        assert!(err.to_string().contains("kubelet.service"));
    }
}
