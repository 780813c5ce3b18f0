//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::identicon::{IdenticonGenerator, PngIdenticon};
use crate::mime::{ImageSniffer, MimeSniffer};
use crate::store::{MemoryMessageStore, MessageStore};

/// Collaborators shared across all request handlers.
///
/// Every field is an `Arc`, so Axum can clone the state per request without
/// copying anything. All three are read-only from the server's point of view.
#[derive(Clone)]
pub struct AppState {
    /// Image and audio payloads keyed by message id.
    pub messages: Arc<dyn MessageStore>,
    /// Avatar renderer for the identicon endpoint.
    pub identicons: Arc<dyn IdenticonGenerator>,
    /// Content type detection for image payloads.
    pub sniffer: Arc<dyn MimeSniffer>,
}

impl AppState {
    /// Create a new [`AppState`] from the provided collaborators.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        identicons: Arc<dyn IdenticonGenerator>,
        sniffer: Arc<dyn MimeSniffer>,
    ) -> Self {
        Self {
            messages,
            identicons,
            sniffer,
        }
    }

    /// State backed by `messages` and the built-in identicon and MIME collaborators.
    pub fn with_messages(messages: Arc<dyn MessageStore>) -> Self {
        Self::new(messages, Arc::new(PngIdenticon), Arc::new(ImageSniffer))
    }
}

impl Default for AppState {
    /// Creates an [`AppState`] over an empty in-memory store.
    fn default() -> Self {
        Self::with_messages(Arc::new(MemoryMessageStore::new()))
    }
}
