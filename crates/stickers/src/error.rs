use common::StoreError;
use thiserror::Error;

/// Errors produced by pending sticker pack operations.
#[derive(Debug, Error)]
pub enum StickerError {
    #[error("sticker pack {0} is already pending")]
    AlreadyPending(u64),

    #[error("settings store error: {0}")]
    Settings(#[from] StoreError),

    #[error("invalid pending packs JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The chain collaborator could not provide pack data.
    #[error("failed to fetch sticker pack {pack_id}: {reason}")]
    Fetch { pack_id: u64, reason: String },

    #[error("invalid content hash {hash:?}: {reason}")]
    ContentHash { hash: String, reason: &'static str },
}
