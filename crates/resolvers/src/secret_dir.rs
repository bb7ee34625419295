//! Directory-backed secrets — one file per secret data key.
//!
//! Layout: `<root>/<namespace>/<secret name>/<data key>`. This matches how
//! secret volumes are projected into a pod, so the CLI can render documents
//! from a mounted secret tree without talking to a cluster.

use async_trait::async_trait;
use oscfg_core::descriptor::ContentRef;
use oscfg_core::error::ResolveError;
use oscfg_core::resolver::ContentResolver;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::inline::decode_inline;

pub struct SecretDirResolver {
    root: PathBuf,
}

impl SecretDirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A path segment must be a single normal component; no `..`, no separators.
fn check_segment(what: &str, segment: &str) -> Result<(), ResolveError> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ResolveError::Backend(format!(
            "invalid {what} '{segment}' for a secret path"
        ))),
    }
}

#[async_trait]
impl ContentResolver for SecretDirResolver {
    fn name(&self) -> &str {
        "secret_dir"
    }

    async fn resolve(&self, namespace: &str, content: &ContentRef) -> Result<Vec<u8>, ResolveError> {
        let secret_ref = match content {
            ContentRef::Inline(inline) => return decode_inline(inline),
            ContentRef::SecretRef(secret_ref) => secret_ref,
        };

        check_segment("namespace", namespace)?;
        check_segment("secret name", &secret_ref.name)?;
        check_segment("data key", &secret_ref.data_key)?;

        let secret_dir = self.root.join(namespace).join(&secret_ref.name);
        let key_path = secret_dir.join(&secret_ref.data_key);
        debug!(path = %key_path.display(), "Reading secret data key");

        match tokio::fs::read(&key_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if tokio::fs::metadata(&secret_dir).await.is_ok() {
                    Err(ResolveError::MissingKey {
                        namespace: namespace.to_string(),
                        name: secret_ref.name.clone(),
                        key: secret_ref.data_key.clone(),
                    })
                } else {
                    Err(ResolveError::NotFound {
                        namespace: namespace.to_string(),
                        name: secret_ref.name.clone(),
                    })
                }
            }
            Err(e) => Err(ResolveError::Backend(format!(
                "failed to read {}: {e}",
                key_path.display()
            ))),
        }
    }
}
