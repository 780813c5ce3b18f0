//! EIP-1577 content hashes pointing at IPFS.
//!
//! Layout: `e3 01` (ipfs-ns) `01` (CIDv1) `70` (dag-pb) `12 20` (sha2-256,
//! 32 bytes) followed by the digest. The multihash is re-encoded as a base58
//! CIDv0 and appended to the gateway URL.

use crate::error::StickerError;

/// Gateway prefix for decoded hashes.
pub const IPFS_GATEWAY: &str = "https://ipfs.status.im/ipfs/";

const IPFS_NAMESPACE: [u8; 2] = [0xe3, 0x01];
const CID_V1_DAG_PB: [u8; 2] = [0x01, 0x70];
const SHA2_256: [u8; 2] = [0x12, 0x20];
const MULTIHASH_LEN: usize = 2 + 32;

/// Gateway URL for a hex-encoded content hash (with or without `0x`).
///
/// # Errors
///
/// Returns [`StickerError::ContentHash`] if the input is not hex or not an
/// IPFS sha2-256 content hash.
pub fn decode_content_hash(hash: &str) -> Result<String, StickerError> {
    let invalid = |reason: &'static str| StickerError::ContentHash {
        hash: hash.to_owned(),
        reason,
    };

    let raw = hex::decode(hash.trim_start_matches("0x")).map_err(|_| invalid("not hex"))?;
    let cid = raw
        .strip_prefix(&IPFS_NAMESPACE[..])
        .ok_or_else(|| invalid("not an IPFS content hash"))?;
    let multihash = cid
        .strip_prefix(&CID_V1_DAG_PB[..])
        .ok_or_else(|| invalid("not a CIDv1 dag-pb"))?;
    if multihash.len() != MULTIHASH_LEN || !multihash.starts_with(&SHA2_256) {
        return Err(invalid("not a sha2-256 multihash"));
    }

    Ok(format!("{IPFS_GATEWAY}{}", bs58::encode(multihash).into_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_hash(digest: [u8; 32]) -> String {
        let mut raw = vec![0xe3, 0x01, 0x01, 0x70, 0x12, 0x20];
        raw.extend_from_slice(&digest);
        hex::encode(raw)
    }

    #[test]
    fn decodes_to_cid_v0_gateway_url() {
        let digest = [0xAB; 32];
        let url = decode_content_hash(&content_hash(digest)).unwrap();

        let cid = url.strip_prefix(IPFS_GATEWAY).unwrap();
        assert!(cid.starts_with("Qm"), "{cid}");
        let multihash = bs58::decode(cid).into_vec().unwrap();
        assert_eq!(&multihash[..2], &[0x12, 0x20]);
        assert_eq!(&multihash[2..], &digest);
    }

    #[test]
    fn accepts_0x_prefix() {
        let hash = content_hash([1; 32]);
        assert_eq!(
            decode_content_hash(&format!("0x{hash}")).unwrap(),
            decode_content_hash(&hash).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_hashes() {
        for bad in [
            "",
            "zz",
            // swarm namespace
            "e40101fa011b20d1de9994b4d039f6548d191eb26786769f580809256b4685ef316805265ea162",
            // truncated digest
            "e3010170122000",
        ] {
            let err = decode_content_hash(bad).unwrap_err();
            assert!(matches!(err, StickerError::ContentHash { .. }), "{bad}");
        }
    }
}
