//! Pending pack bookkeeping over a [`SettingsStore`].

use async_trait::async_trait;
use tracing::{debug, info};

use crate::contenthash::decode_content_hash;
use crate::error::StickerError;
use crate::pack::{PackStatus, StickerPack, StickerPackCollection};
use crate::settings::SettingsStore;

/// Settings key holding the pending packs as JSON.
pub const PENDING_PACKS_KEY: &str = "stickers/packs-pending";

/// Reads pack metadata from the sticker contracts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackFetcher: Send + Sync {
    async fn fetch_pack(&self, chain_id: u64, pack_id: u64) -> Result<StickerPack, StickerError>;
}

/// Pending sticker packs persisted in `S`, with pack data from `F`.
pub struct PendingPacks<S, F> {
    settings: S,
    fetcher: F,
}

impl<S: SettingsStore, F: PackFetcher> PendingPacks<S, F> {
    pub fn new(settings: S, fetcher: F) -> Self {
        Self { settings, fetcher }
    }

    /// Fetch `pack_id` from `chain_id` and record it as pending.
    ///
    /// # Errors
    ///
    /// [`StickerError::AlreadyPending`] if the pack is already recorded;
    /// otherwise any fetch or settings error.
    pub async fn add_pending(&self, chain_id: u64, pack_id: u64) -> Result<(), StickerError> {
        let mut packs = self.load()?;
        if packs.contains_key(&pack_id) {
            return Err(StickerError::AlreadyPending(pack_id));
        }

        let pack = self.fetcher.fetch_pack(chain_id, pack_id).await?;
        packs.insert(pack_id, pack);
        self.save(&packs)?;
        info!(chain_id, pack_id, "sticker pack marked pending");
        Ok(())
    }

    /// All pending packs, with status set to pending and content hashes
    /// replaced by gateway URLs.
    ///
    /// # Errors
    ///
    /// Fails on settings or JSON errors, or if any content hash is invalid.
    pub fn pending(&self) -> Result<StickerPackCollection, StickerError> {
        let mut packs = self.load()?;
        for pack in packs.values_mut() {
            pack.status = PackStatus::Pending;
            pack.preview = decode_content_hash(&pack.preview)?;
            pack.thumbnail = decode_content_hash(&pack.thumbnail)?;
            for sticker in &mut pack.stickers {
                sticker.url = decode_content_hash(&sticker.hash)?;
            }
        }
        Ok(packs)
    }

    /// Forget `pack_id`. No-op if it is not pending.
    ///
    /// # Errors
    ///
    /// Fails on settings or JSON errors.
    pub fn remove_pending(&self, pack_id: u64) -> Result<(), StickerError> {
        let mut packs = self.load()?;
        if packs.remove(&pack_id).is_none() {
            debug!(pack_id, "sticker pack not pending");
            return Ok(());
        }
        self.save(&packs)?;
        info!(pack_id, "sticker pack no longer pending");
        Ok(())
    }

    fn load(&self) -> Result<StickerPackCollection, StickerError> {
        match self.settings.get(PENDING_PACKS_KEY)? {
            Some(json) => Ok(serde_json::from_slice(&json)?),
            None => Ok(StickerPackCollection::new()),
        }
    }

    fn save(&self, packs: &StickerPackCollection) -> Result<(), StickerError> {
        let json = serde_json::to_vec(packs)?;
        self.settings.set(PENDING_PACKS_KEY, json)?;
        Ok(())
    }
}
