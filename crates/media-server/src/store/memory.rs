//! [`MemoryMessageStore`]: in-process message payloads.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{MessageStore, StoreError};

/// Payloads attached to a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePayloads {
    /// Image attachment, if any.
    pub image: Option<Vec<u8>>,
    /// Audio attachment, if any.
    pub audio: Option<Vec<u8>>,
}

/// Thread-safe map of message id to payloads.
///
/// Clones share the same map, so a handle kept by the application sees the
/// same rows as the one handed to the server.
#[derive(Clone, Debug, Default)]
pub struct MemoryMessageStore {
    inner: Arc<RwLock<HashMap<String, MessagePayloads>>>,
}

impl MemoryMessageStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the image of `message_id`.
    pub fn insert_image(&self, message_id: impl Into<String>, image: Vec<u8>) {
        let mut rows = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        rows.entry(message_id.into()).or_default().image = Some(image);
    }

    /// Attach (or replace) the audio of `message_id`.
    pub fn insert_audio(&self, message_id: impl Into<String>, audio: Vec<u8>) {
        let mut rows = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        rows.entry(message_id.into()).or_default().audio = Some(audio);
    }

    /// Delete `message_id` and everything attached to it.
    pub fn remove(&self, message_id: &str) -> Option<MessagePayloads> {
        let mut rows = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        rows.remove(message_id)
    }

    /// Number of messages currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no messages are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn column(
        &self,
        message_id: &str,
        pick: impl FnOnce(&MessagePayloads) -> Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let rows = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("message store lock poisoned".into()))?;
        // A row without the requested attachment reads as an empty payload.
        Ok(rows.get(message_id).map(|row| pick(row).unwrap_or_default()))
    }
}

impl MessageStore for MemoryMessageStore {
    fn image_payload(&self, message_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.column(message_id, |row| row.image.clone())
    }

    fn audio_payload(&self, message_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.column(message_id, |row| row.audio.clone())
    }
}
