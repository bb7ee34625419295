//! Inline content — data carried directly in the descriptor.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oscfg_core::descriptor::{ContentRef, InlineContent};
use oscfg_core::error::ResolveError;
use oscfg_core::resolver::ContentResolver;

/// Decode inline descriptor content into raw bytes.
///
/// `encoding` is empty for plain text, or `b64`/`base64` for standard base64.
pub fn decode_inline(inline: &InlineContent) -> Result<Vec<u8>, ResolveError> {
    match inline.encoding.as_str() {
        "" => Ok(inline.data.clone().into_bytes()),
        "b64" | "base64" => STANDARD
            .decode(inline.data.trim())
            .map_err(|e| ResolveError::InvalidInline(format!("bad base64 data: {e}"))),
        other => Err(ResolveError::InvalidInline(format!(
            "unsupported encoding '{other}'"
        ))),
    }
}

/// Resolves inline content only. Secret references are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineResolver;

impl InlineResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentResolver for InlineResolver {
    fn name(&self) -> &str {
        "inline"
    }

    async fn resolve(&self, _namespace: &str, content: &ContentRef) -> Result<Vec<u8>, ResolveError> {
        match content {
            ContentRef::Inline(inline) => decode_inline(inline),
            other => Err(ResolveError::Unsupported {
                resolver: self.name().to_string(),
                kind: other.kind().to_string(),
            }),
        }
    }
}
