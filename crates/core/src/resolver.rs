//! ContentResolver trait — the seam between the engine and content storage.
//!
//! A file's content is referenced, not embedded: it may be inline text or a
//! key in a secret. The engine never knows which; it hands the reference to
//! a resolver and gets raw bytes back.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::descriptor::ContentRef;
use crate::error::ResolveError;

/// Resolves content references into raw bytes.
///
/// Implementations may perform I/O. The engine may call `resolve` for
/// several files concurrently and drops in-flight futures on cancellation,
/// so implementations must not rely on running to completion.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Name of this resolver (e.g., "inline", "secret_dir").
    fn name(&self) -> &str;

    /// Resolve `content` within `namespace` into raw bytes.
    async fn resolve(&self, namespace: &str, content: &ContentRef) -> Result<Vec<u8>, ResolveError>;
}

/// Per-call resolution settings supplied by the caller.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Namespace that secret references are looked up in.
    pub namespace: String,
    /// Cancelling this token aborts the build.
    pub cancel: CancellationToken,
    /// Upper bound for a single resolution. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ResolveContext {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_defaults_to_no_timeout() {
        let ctx = ResolveContext::new("default");
        assert_eq!(ctx.namespace, "default");
        assert!(ctx.timeout.is_none());
        assert!(!ctx.cancel.is_cancelled());
    }

    #[test]
    fn context_shares_external_cancellation() {
        let token = CancellationToken::new();
        let ctx = ResolveContext::new("default")
            .with_timeout(Duration::from_secs(5))
            .with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.cancel.is_cancelled());
        assert_eq!(ctx.timeout, Some(Duration::from_secs(5)));
    }
}
