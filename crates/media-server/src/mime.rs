//! Image MIME type detection from magic numbers.

use thiserror::Error;

/// Errors produced while sniffing a payload.
#[derive(Debug, Error)]
pub enum MimeError {
    /// The payload matched none of the supported signatures.
    #[error("unsupported image format")]
    Unsupported,
}

/// Identifies the MIME type of a binary payload.
#[cfg_attr(test, mockall::automock)]
pub trait MimeSniffer: Send + Sync {
    /// MIME type of `bytes`.
    fn detect(&self, bytes: &[u8]) -> Result<&'static str, MimeError>;
}

/// Recognises the image formats chat clients send: JPEG, PNG, GIF and WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSniffer;

/// `(offset, signature, mime)`; every entry must match for a hit.
const SIGNATURES: &[(&[(usize, &[u8])], &str)] = &[
    (&[(0, &[0xFF, 0xD8, 0xFF])], "image/jpeg"),
    (
        &[(0, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])],
        "image/png",
    ),
    (&[(0, b"GIF87a")], "image/gif"),
    (&[(0, b"GIF89a")], "image/gif"),
    (&[(0, b"RIFF"), (8, b"WEBP")], "image/webp"),
];

impl MimeSniffer for ImageSniffer {
    fn detect(&self, bytes: &[u8]) -> Result<&'static str, MimeError> {
        SIGNATURES
            .iter()
            .find(|(parts, _)| {
                parts
                    .iter()
                    .all(|(offset, magic)| bytes.get(*offset..).is_some_and(|b| b.starts_with(magic)))
            })
            .map(|(_, mime)| *mime)
            .ok_or(MimeError::Unsupported)
    }
}
