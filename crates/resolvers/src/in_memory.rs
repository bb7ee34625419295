//! In-memory secrets — useful for testing and for embedding the engine
//! where secret data is already at hand.

use async_trait::async_trait;
use oscfg_core::descriptor::ContentRef;
use oscfg_core::error::ResolveError;
use oscfg_core::resolver::ContentResolver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::inline::decode_inline;

type SecretData = BTreeMap<String, Vec<u8>>;

/// Resolves inline content and secret references held in memory.
///
/// Secrets are keyed by `(namespace, name)`; each holds a map of data keys
/// to raw bytes.
#[derive(Clone, Default)]
pub struct InMemorySecrets {
    secrets: Arc<RwLock<BTreeMap<(String, String), SecretData>>>,
}

impl InMemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one data key of a secret, creating the secret if needed.
    pub async fn insert(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) {
        self.secrets
            .write()
            .await
            .entry((namespace.into(), name.into()))
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Remove a whole secret. Returns `true` if it existed.
    pub async fn remove(&self, namespace: &str, name: &str) -> bool {
        self.secrets
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some()
    }
}

#[async_trait]
impl ContentResolver for InMemorySecrets {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn resolve(&self, namespace: &str, content: &ContentRef) -> Result<Vec<u8>, ResolveError> {
        let secret_ref = match content {
            ContentRef::Inline(inline) => return decode_inline(inline),
            ContentRef::SecretRef(secret_ref) => secret_ref,
        };

        let secrets = self.secrets.read().await;
        let data = secrets
            .get(&(namespace.to_string(), secret_ref.name.clone()))
            .ok_or_else(|| ResolveError::NotFound {
                namespace: namespace.to_string(),
                name: secret_ref.name.clone(),
            })?;

        data.get(&secret_ref.data_key)
            .cloned()
            .ok_or_else(|| ResolveError::MissingKey {
                namespace: namespace.to_string(),
                name: secret_ref.name.clone(),
                key: secret_ref.data_key.clone(),
            })
    }
}
