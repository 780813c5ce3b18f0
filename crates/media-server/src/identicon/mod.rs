//! Deterministic avatar images derived from public keys.
//!
//! The same key always produces byte-identical output, which is why the
//! identicon endpoint lets clients cache responses indefinitely.

pub mod render;

pub use render::PngIdenticon;

use thiserror::Error;

/// Errors produced while generating an identicon.
#[derive(Debug, Error)]
pub enum IdenticonError {
    /// PNG encoding stopped part way; `partial` holds the bytes written so far.
    #[error("failed to encode identicon PNG: {source}")]
    Encoding {
        partial: Vec<u8>,
        #[source]
        source: png::EncodingError,
    },

    /// The generator could not produce any output.
    #[error("identicon generation failed: {0}")]
    Generation(String),
}

impl IdenticonError {
    /// Bytes produced before the failure, if there are any.
    pub fn partial_output(&self) -> Option<&[u8]> {
        match self {
            IdenticonError::Encoding { partial, .. } if !partial.is_empty() => Some(partial),
            _ => None,
        }
    }
}

/// Renders an identicon for a public key.
#[cfg_attr(test, mockall::automock)]
pub trait IdenticonGenerator: Send + Sync {
    /// Encoded image for `public_key`.
    fn generate(&self, public_key: &str) -> Result<Vec<u8>, IdenticonError>;
}
