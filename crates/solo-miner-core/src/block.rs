//! Block header assembly and serialization.

use serde::{Deserialize, Serialize};

use crate::codec::{decode_display, encode_le32, to_display_hex};
use crate::coinbase::CoinbaseTransaction;
use crate::difficulty::{parse_bits, Target};
use crate::error::{MinerError, Result};
use crate::hash::double_sha256;

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Size of the header without its trailing nonce.
pub const HEADER_PREFIX_SIZE: usize = 76;

/// Chain state for one mining attempt, as reported by a node's
/// `getblocktemplate` call.
///
/// Hash-like fields are kept in display order exactly as the node prints
/// them. Integers are wide so out-of-range values are caught at encoding
/// time instead of being truncated during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTemplate {
    pub version: u64,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,
    #[serde(rename = "curtime")]
    pub time: u64,
    pub bits: String,
    /// Full 256-bit target. Derived from `bits` when the node omits it.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(rename = "coinbasevalue")]
    pub coinbase_value: i64,
    #[serde(default)]
    pub height: Option<u64>,
}

impl ChainTemplate {
    /// Parse a `getblocktemplate` JSON result. Unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MinerError::template("template", e.to_string()))
    }

    /// The proof-of-work threshold for this template.
    pub fn target(&self) -> Result<Target> {
        match &self.target {
            Some(hex_str) => {
                Target::from_hex(hex_str).map_err(|e| MinerError::template("target", e.to_string()))
            }
            None => Ok(Target::from_bits(parse_bits(&self.bits)?)),
        }
    }
}

/// The 76 bytes of a header that stay fixed while the nonce varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPrefix([u8; HEADER_PREFIX_SIZE]);

impl HeaderPrefix {
    pub fn new(bytes: [u8; HEADER_PREFIX_SIZE]) -> Self {
        HeaderPrefix(bytes)
    }

    /// Build a prefix from a byte slice that must be exactly 76 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let fixed: [u8; HEADER_PREFIX_SIZE] = bytes.try_into().map_err(|_| {
            MinerError::template("header", format!("expected {} bytes, got {}", HEADER_PREFIX_SIZE, bytes.len()))
        })?;
        Ok(HeaderPrefix(fixed))
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_PREFIX_SIZE] {
        &self.0
    }

    /// The full 80-byte candidate header for `nonce`.
    #[inline]
    pub fn with_nonce(&self, nonce: u32) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[..HEADER_PREFIX_SIZE].copy_from_slice(&self.0);
        header[HEADER_PREFIX_SIZE..].copy_from_slice(&nonce.to_le_bytes());
        header
    }
}

/// A Bitcoin block header (80 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: u32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions (internal byte order).
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact form, as the 4 bytes that go on the wire.
    pub bits: [u8; 4],
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Build a header from a chain template and a display-order merkle root.
    ///
    /// Every display-order field is reversed back to internal order before
    /// decoding. Any field of the wrong width is a `MalformedTemplate`.
    pub fn from_template(template: &ChainTemplate, merkle_root_display: &str) -> Result<Self> {
        let version = u32::from_le_bytes(encode_le32(template.version)?);
        let timestamp = u32::from_le_bytes(encode_le32(template.time)?);

        let prev_block_hash = decode_display::<32>(&template.previous_block_hash)
            .map_err(|e| MinerError::template("previousblockhash", e.to_string()))?;
        let merkle_root = decode_display::<32>(merkle_root_display)
            .map_err(|e| MinerError::template("merkleroot", e.to_string()))?;
        let bits = decode_display::<4>(&template.bits)
            .map_err(|e| MinerError::template("bits", e.to_string()))?;

        Ok(BlockHeader {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce: 0,
        })
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        self.prefix().with_nonce(self.nonce)
    }

    /// Serialize the header without the nonce (76 bytes).
    pub fn prefix(&self) -> HeaderPrefix {
        let mut header = [0u8; HEADER_PREFIX_SIZE];

        header[0..4].copy_from_slice(&self.version.to_le_bytes());
        header[4..36].copy_from_slice(&self.prev_block_hash);
        header[36..68].copy_from_slice(&self.merkle_root);
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits);

        HeaderPrefix(header)
    }

    /// Compute the block hash (double SHA256, internal order).
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Block hash as displayed by explorers.
    pub fn display_hash(&self) -> String {
        to_display_hex(&self.hash())
    }
}

/// Assemble the 76-byte pre-nonce header prefix.
pub fn assemble_prefix(template: &ChainTemplate, merkle_root_display: &str) -> Result<HeaderPrefix> {
    Ok(BlockHeader::from_template(template, merkle_root_display)?.prefix())
}

/// A header paired with the coinbase that produced its merkle root.
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    pub header: BlockHeader,
    pub coinbase: CoinbaseTransaction,
}

impl CandidateBlock {
    /// Assemble a coinbase-only block from a template.
    pub fn new(template: &ChainTemplate, coinbase: CoinbaseTransaction) -> Result<Self> {
        let header = BlockHeader::from_template(template, &coinbase.merkle_root_display())?;
        Ok(CandidateBlock { header, coinbase })
    }

    /// Serialize the complete block for submission.
    pub fn serialize_block(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + 1 + self.coinbase.raw_tx.len());

        block.extend_from_slice(&self.header.serialize());

        // Transaction count: just the coinbase
        block.push(0x01);

        block.extend_from_slice(&self.coinbase.raw_tx);

        block
    }

    /// Block hex in `header ∥ 01 ∥ coinbase` form.
    pub fn serialize_block_hex(&self) -> String {
        hex::encode(self.serialize_block())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_MERKLE_ROOT: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    fn genesis_template() -> ChainTemplate {
        ChainTemplate {
            version: 1,
            previous_block_hash: "00".repeat(32),
            time: 1231006505,
            bits: "1d00ffff".to_string(),
            target: None,
            coinbase_value: 5_000_000_000,
            height: Some(0),
        }
    }

    #[test]
    fn test_genesis_prefix() {
        let prefix = assemble_prefix(&genesis_template(), GENESIS_MERKLE_ROOT).unwrap();

        assert_eq!(
            hex::encode(prefix.as_bytes()),
            "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d"
        );
    }

    #[test]
    fn test_genesis_hash() {
        let mut header = BlockHeader::from_template(&genesis_template(), GENESIS_MERKLE_ROOT).unwrap();
        header.nonce = 2083236893;

        assert_eq!(
            header.display_hash(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_prefix_is_fixed_width() {
        let mut template = genesis_template();
        template.version = u32::MAX as u64;
        template.time = 0;
        template.previous_block_hash = "ff".repeat(32);
        template.bits = "207fffff".to_string();

        let prefix = assemble_prefix(&template, &"ab".repeat(32)).unwrap();
        assert_eq!(prefix.as_bytes().len(), HEADER_PREFIX_SIZE);
        assert_eq!(prefix.with_nonce(7).len(), BLOCK_HEADER_SIZE);
        assert_eq!(&prefix.as_bytes()[72..76], &[0xff, 0xff, 0x7f, 0x20]);
    }

    #[test]
    fn test_header_serialization_layout() {
        let header = BlockHeader {
            version: 0x20000000,
            prev_block_hash: [0x12; 32],
            merkle_root: [0x34; 32],
            timestamp: 1700000000,
            bits: [0x19, 0x42, 0x03, 0x17],
            nonce: 0xDEADBEEF,
        };
        let serialized = header.serialize();

        assert_eq!(&serialized[0..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&serialized[4..36], &[0x12; 32]);
        assert_eq!(&serialized[36..68], &[0x34; 32]);
        assert_eq!(&serialized[68..72], &1700000000u32.to_le_bytes());
        assert_eq!(&serialized[76..80], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_malformed_template_fields() {
        let mut template = genesis_template();
        template.previous_block_hash = "00".repeat(31);
        let err = assemble_prefix(&template, GENESIS_MERKLE_ROOT).unwrap_err();
        assert!(matches!(err, MinerError::MalformedTemplate { field: "previousblockhash", .. }));

        let template = genesis_template();
        let err = assemble_prefix(&template, "abc").unwrap_err();
        assert!(matches!(err, MinerError::MalformedTemplate { field: "merkleroot", .. }));

        let mut template = genesis_template();
        template.bits = "1d00ffff00".to_string();
        let err = assemble_prefix(&template, GENESIS_MERKLE_ROOT).unwrap_err();
        assert!(matches!(err, MinerError::MalformedTemplate { field: "bits", .. }));
    }

    #[test]
    fn test_version_out_of_range() {
        let mut template = genesis_template();
        template.version = 1 << 32;
        let err = assemble_prefix(&template, GENESIS_MERKLE_ROOT).unwrap_err();
        assert!(matches!(err, MinerError::ValueOutOfRange { width: 4, .. }));
    }

    #[test]
    fn test_prefix_from_slice() {
        assert!(HeaderPrefix::from_slice(&[0u8; 76]).is_ok());
        assert!(matches!(
            HeaderPrefix::from_slice(&[0u8; 75]),
            Err(MinerError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_template_from_json() {
        let json = r#"{
            "version": 536870912,
            "previousblockhash": "000000000000000000026d1e0b5dd5ea8a3e8e31e3b5f4c6d1d5c1a1b2c3d4e5",
            "curtime": 1700000000,
            "bits": "17034219",
            "target": "0000000000000000000342190000000000000000000000000000000000000000",
            "coinbasevalue": 312500000,
            "height": 875000,
            "transactions": []
        }"#;
        let template = ChainTemplate::from_json(json).unwrap();

        assert_eq!(template.version, 0x20000000);
        assert_eq!(template.coinbase_value, 312_500_000);
        assert_eq!(template.height, Some(875000));
        assert_eq!(template.target().unwrap(), Target::from_bits(0x17034219));
    }

    #[test]
    fn test_template_target_falls_back_to_bits() {
        assert_eq!(genesis_template().target().unwrap(), Target::from_bits(0x1d00ffff));
        assert!(ChainTemplate::from_json("{}").is_err());
    }

    #[test]
    fn test_candidate_block_hex() {
        use crate::coinbase::{CoinbaseBuilder, Script};

        let coinbase = CoinbaseBuilder::new(Script::from_hex("00").unwrap(), Script::from_hex("51").unwrap())
            .build(5_000_000_000);
        let mut block = CandidateBlock::new(&genesis_template(), coinbase.clone()).unwrap();
        block.header.nonce = 42;

        let block_hex = block.serialize_block_hex();
        assert_eq!(block_hex.len(), 160 + 2 + coinbase.raw_tx.len() * 2);
        assert_eq!(&block_hex[..160], hex::encode(block.header.serialize()));
        assert_eq!(&block_hex[160..162], "01");
        assert_eq!(&block_hex[162..], coinbase.to_hex());
        assert_eq!(block.header.merkle_root, coinbase.txid);
    }
}
