//! Wire-level constants for the loopback media endpoints.
//!
//! The server registers its handlers under these paths and the embedding
//! application builds the URLs it hands to the webview with the helpers below,
//! so both sides always agree on paths and parameter names.

use url::Url;

/// Host name the server binds and the certificate is issued for.
pub const LOOPBACK_HOST: &str = "localhost";

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// `GET`: image attached to a chat message.
pub const IMAGES_PATH: &str = "/messages/images";

/// `GET`: audio attached to a chat message.
pub const AUDIO_PATH: &str = "/messages/audio";

/// `GET`: identicon derived from a public key.
pub const IDENTICONS_PATH: &str = "/messages/identicons";

/// Query parameter carrying the message id for images and audio.
pub const MESSAGE_ID_PARAM: &str = "messageId";

/// Query parameter carrying the public key for identicons.
pub const PUBLIC_KEY_PARAM: &str = "publicKey";

// ---------------------------------------------------------------------------
// Header values
// ---------------------------------------------------------------------------

/// Audio payloads are always AAC.
pub const AUDIO_CONTENT_TYPE: &str = "audio/aac";

/// Identicons are always rendered as PNG.
pub const IDENTICON_CONTENT_TYPE: &str = "image/png";

/// Sent when an image payload could not be identified.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Message payloads can be edited or deleted and must never be cached.
pub const NO_STORE: &str = "no-store";

/// Identicons never change for a given key.
pub const IMMUTABLE_CACHE: &str = "public, max-age=290304000, immutable";

/// How far in the future the identicon `Expires` header is dated.
pub const IDENTICON_EXPIRY_YEARS: u64 = 60;

// ---------------------------------------------------------------------------
// URL builders
// ---------------------------------------------------------------------------

/// Base URL of a server listening on `port`.
pub fn base_url(port: u16) -> Result<Url, url::ParseError> {
    Url::parse(&format!("https://{LOOPBACK_HOST}:{port}"))
}

/// URL of the image attached to `message_id`.
pub fn image_url(port: u16, message_id: &str) -> Result<Url, url::ParseError> {
    endpoint_url(port, IMAGES_PATH, MESSAGE_ID_PARAM, message_id)
}

/// URL of the audio attached to `message_id`.
pub fn audio_url(port: u16, message_id: &str) -> Result<Url, url::ParseError> {
    endpoint_url(port, AUDIO_PATH, MESSAGE_ID_PARAM, message_id)
}

/// URL of the identicon for `public_key`.
pub fn identicon_url(port: u16, public_key: &str) -> Result<Url, url::ParseError> {
    endpoint_url(port, IDENTICONS_PATH, PUBLIC_KEY_PARAM, public_key)
}

fn endpoint_url(port: u16, path: &str, param: &str, value: &str) -> Result<Url, url::ParseError> {
    let mut url = base_url(port)?.join(path)?;
    url.query_pairs_mut().append_pair(param, value);
    Ok(url)
}
