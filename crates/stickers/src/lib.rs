//! Pending sticker packs: packs the user bought whose purchase transaction has
//! not been confirmed yet.
//!
//! The pending set is a JSON map persisted under one settings key. Pack data
//! comes from an external [`PackFetcher`]; content hashes are turned into
//! gateway URLs when the set is read back.

pub mod contenthash;
pub mod error;
pub mod pack;
pub mod pending;
pub mod settings;

pub use contenthash::decode_content_hash;
pub use error::StickerError;
pub use pack::{PackStatus, Sticker, StickerPack, StickerPackCollection};
pub use pending::{PackFetcher, PendingPacks, PENDING_PACKS_KEY};
pub use settings::{MemorySettings, SettingsStore};
