//! File content encoding.
//!
//! Content travels either as literal text (encoding tag `""`) or as standard
//! base64 without line wrapping (tag `"b64"`). Base64 is the default because
//! it survives any byte sequence; literal text is opt-in per file.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::document::File;

pub const ENCODING_B64: &str = "b64";

/// Content ready to be placed into a [`File`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedContent {
    pub content: String,
    pub encoding: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("content is not valid UTF-8 and cannot be transmitted unencoded")]
    NotUtf8,

    #[error("content tagged b64 is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("unsupported encoding '{0}'")]
    Unsupported(String),
}

/// Encode raw bytes for the document.
pub fn encode(raw: Vec<u8>, transmit_unencoded: bool) -> Result<EncodedContent, EncodingError> {
    if transmit_unencoded {
        let content = String::from_utf8(raw).map_err(|_| EncodingError::NotUtf8)?;
        return Ok(EncodedContent {
            content,
            encoding: "",
        });
    }

    Ok(EncodedContent {
        content: STANDARD.encode(raw),
        encoding: ENCODING_B64,
    })
}

/// Recover the raw bytes of a file entry.
pub fn decode(file: &File) -> Result<Vec<u8>, EncodingError> {
    match file.encoding.as_str() {
        "" => Ok(file.content.clone().into_bytes()),
        ENCODING_B64 => STANDARD
            .decode(&file.content)
            .map_err(|e| EncodingError::InvalidBase64(e.to_string())),
        other => Err(EncodingError::Unsupported(other.to_string())),
    }
}
