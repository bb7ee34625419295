pub mod check;
pub mod init;
pub mod render;

use oscfg_config::AppConfig;
use oscfg_core::resolver::{ContentResolver, ResolveContext};
use oscfg_resolvers::{InlineResolver, SecretDirResolver};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Secret-directory resolver when a root is known, inline-only otherwise.
pub fn resolver_for(secrets_dir: Option<PathBuf>) -> Box<dyn ContentResolver> {
    match secrets_dir {
        Some(root) => {
            tracing::debug!(root = %root.display(), "Resolving secrets from directory");
            Box::new(SecretDirResolver::new(root))
        }
        None => Box::new(InlineResolver::new()),
    }
}

/// Resolution context for `namespace` with the configured timeout.
pub fn context_for(
    config: &AppConfig,
    namespace: String,
    cancel: CancellationToken,
) -> ResolveContext {
    let ctx = ResolveContext::new(namespace).with_cancellation(cancel);
    match config.resolver.timeout() {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_resolver_without_secrets_dir() {
        assert_eq!(resolver_for(None).name(), "inline");
        assert_eq!(resolver_for(Some("/run/secrets".into())).name(), "secret_dir");
    }

    #[test]
    fn context_carries_configured_timeout_and_caller_token() {
        let config = AppConfig::default();
        let cancel = CancellationToken::new();
        let ctx = context_for(&config, "kube-system".into(), cancel.clone());
        assert_eq!(ctx.namespace, "kube-system");
        assert_eq!(ctx.timeout, config.resolver.timeout());
        assert!(!ctx.cancel.is_cancelled());

        cancel.cancel();
        assert!(ctx.cancel.is_cancelled());
    }
}
