use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a pack stands for the current account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackStatus {
    #[default]
    Available,
    Installed,
    Pending,
    Purchased,
}

/// A single sticker. `hash` is the stored content hash; `url` is filled in
/// from it when pending packs are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    #[serde(rename = "packID")]
    pub pack_id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

/// Sticker pack metadata as published on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerPack {
    pub id: u64,
    pub name: String,
    pub author: String,
    pub owner: String,
    /// Price in the token's smallest unit, as a decimal string.
    pub price: String,
    /// Content hash of the preview image; a gateway URL once decoded.
    pub preview: String,
    /// Content hash of the thumbnail; a gateway URL once decoded.
    pub thumbnail: String,
    pub stickers: Vec<Sticker>,
    #[serde(default)]
    pub status: PackStatus,
}

/// Packs keyed by pack id.
pub type StickerPackCollection = BTreeMap<u64, StickerPack>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_keys_serialize_as_strings() {
        let mut packs = StickerPackCollection::new();
        packs.insert(
            7,
            StickerPack {
                id: 7,
                name: "cats".into(),
                author: "me".into(),
                owner: "0x01".into(),
                price: "1000".into(),
                preview: "ab".into(),
                thumbnail: "cd".into(),
                stickers: vec![Sticker {
                    pack_id: 7,
                    url: String::new(),
                    hash: "ef".into(),
                }],
                status: PackStatus::Pending,
            },
        );

        let json = serde_json::to_value(&packs).unwrap();
        assert_eq!(json["7"]["status"], "pending");
        assert_eq!(json["7"]["stickers"][0]["packID"], 7);
        assert!(json["7"]["stickers"][0].get("url").is_none());

        let back: StickerPackCollection = serde_json::from_value(json).unwrap();
        assert_eq!(back, packs);
    }

    #[test]
    fn missing_status_defaults_to_available() {
        let json = r#"{"id":1,"name":"n","author":"a","owner":"o","price":"0",
            "preview":"","thumbnail":"","stickers":[]}"#;
        let pack: StickerPack = serde_json::from_str(json).unwrap();
        assert_eq!(pack.status, PackStatus::Available);
    }
}
