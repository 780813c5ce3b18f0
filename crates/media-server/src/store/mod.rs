//! Message payload lookup.
//!
//! The rows themselves belong to the embedding application; the server only
//! asks for the image or audio blob attached to a message id. Lookups are
//! blocking and are run off the async executor by the handlers.

pub mod memory;

pub use common::StoreError;
pub use memory::MemoryMessageStore;

/// Read access to the binary payloads attached to chat messages.
#[cfg_attr(test, mockall::automock)]
pub trait MessageStore: Send + Sync {
    /// Image payload of `message_id`, or `None` when the row does not exist.
    fn image_payload(&self, message_id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Audio payload of `message_id`, or `None` when the row does not exist.
    fn audio_payload(&self, message_id: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
