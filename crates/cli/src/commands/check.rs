//! `oscfg check` — Validate a descriptor and dry-build it.

use async_trait::async_trait;
use oscfg_cloudconfig::CloudConfigBuilder;
use oscfg_config::AppConfig;
use oscfg_core::{
    ContentRef, ContentResolver, OsConfigDescriptor, ResolveContext, ResolveError,
};
use oscfg_resolvers::decode_inline;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Decodes inline content and stands in empty bytes for every secret, so the
/// document shape can be checked without access to secret data.
struct PlaceholderResolver;

#[async_trait]
impl ContentResolver for PlaceholderResolver {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn resolve(&self, _namespace: &str, content: &ContentRef) -> Result<Vec<u8>, ResolveError> {
        match content {
            ContentRef::Inline(inline) => decode_inline(inline),
            ContentRef::SecretRef(_) => Ok(Vec::new()),
        }
    }
}

pub async fn run(
    descriptor: &Path,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking {}", descriptor.display());

    let config = AppConfig::load()?;
    match check(&config, descriptor, cancel).await {
        Ok(summary) => {
            println!("  ✅ Descriptor valid");
            println!("  ✅ Dry build succeeded");
            println!("     units: {}", summary.units.join(", "));
            println!("     files: {}", summary.files.join(", "));
            Ok(())
        }
        Err(e) => {
            println!("  ❌ {e}");
            Err(e)
        }
    }
}

#[derive(Debug)]
pub struct CheckSummary {
    pub units: Vec<String>,
    pub files: Vec<String>,
}

pub async fn check(
    config: &AppConfig,
    path: &Path,
    cancel: CancellationToken,
) -> Result<CheckSummary, Box<dyn std::error::Error>> {
    let descriptor = OsConfigDescriptor::load(path)?;

    let builder = CloudConfigBuilder::from_config(config)?;
    let ctx = ResolveContext::new(config.namespace.clone()).with_cancellation(cancel);
    let output = builder.build(&descriptor, &PlaceholderResolver, &ctx).await?;

    Ok(CheckSummary {
        units: output.unit_names,
        files: output.file_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn secret_references_do_not_need_secret_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(
            &path,
            concat!(
                "purpose = \"provision\"\n",
                "[cri]\nname = \"containerd\"\n",
                "[[files]]\npath = \"/etc/kubelet/token\"\n",
                "[files.content.secretRef]\nname = \"kubelet\"\ndataKey = \"token\"\n",
            ),
        )
        .unwrap();

        let summary = check(&AppConfig::default(), &path, CancellationToken::new()).await.unwrap();
        assert!(summary.units.iter().any(|u| u == "run-command.service"));
        assert_eq!(summary.files[0], "/etc/kubelet/token");
    }

    #[tokio::test]
    async fn duplicate_units_fail_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(
            &path,
            r#"{"purpose":"reconcile","units":[{"name":"a.service"},{"name":"a.service"}]}"#,
        )
        .unwrap();

        assert!(check(&AppConfig::default(), &path, CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_mode_fails_as_invalid_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(
            &path,
            r#"{"purpose":"provision","files":[{"path":"/x","permissions":4516,
                "content":{"inline":{"data":"x"}}}]}"#,
        )
        .unwrap();

        let err = check(&AppConfig::default(), &path, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid descriptor"), "{err}");
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_dry_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(&path, r#"{"purpose":"reconcile"}"#).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(check(&AppConfig::default(), &path, cancel).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_descriptor_fails_the_check() {
        let missing = Path::new("/nonexistent/node.yaml");
        assert!(check(&AppConfig::default(), missing, CancellationToken::new()).await.is_err());
    }
}
