//! Coinbase transaction construction.
//!
//! The coinbase is the first transaction in a block. It has no real input
//! and pays the block reward to the miner. A block that carries only the
//! coinbase has a trivial merkle root: the coinbase's own txid.

use core::fmt;

use crate::codec::{encode_le64, encode_varint, to_display_hex};
use crate::error::Result;
use crate::hash::double_sha256;

/// An opaque script, transmitted as hex.
///
/// Script contents are never interpreted here; only their byte length
/// matters for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    /// Wrap raw script bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    /// Decode a script from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Length in bytes (not hex characters).
    pub fn byte_len(&self) -> usize {
        self.0.len()
    }

    /// Raw script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding of the script.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Append bytes to the end of the script.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Builder for a single-input, single-output coinbase transaction.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    /// Input script, usually a height marker plus arbitrary data.
    script_sig: Script,
    /// Output script that receives the reward.
    script_pubkey: Script,
    /// Extra nonce appended to the scriptSig to vary the merkle root.
    extra_nonce: Option<[u8; 8]>,
}

impl CoinbaseBuilder {
    /// Create a builder paying to `script_pubkey` with the given input script.
    pub fn new(script_sig: Script, script_pubkey: Script) -> Self {
        CoinbaseBuilder {
            script_sig,
            script_pubkey,
            extra_nonce: None,
        }
    }

    /// Append an 8-byte extra nonce to the scriptSig.
    ///
    /// Changing it changes the txid and therefore the merkle root, which
    /// opens a fresh nonce space after exhaustion.
    pub fn with_extra_nonce(mut self, extra_nonce: [u8; 8]) -> Self {
        self.extra_nonce = Some(extra_nonce);
        self
    }

    /// The scriptSig that will be serialized, extra nonce included.
    pub fn script_sig(&self) -> Script {
        let mut script = self.script_sig.clone();
        if let Some(extra) = &self.extra_nonce {
            script.extend_from_slice(extra);
        }
        script
    }

    /// Build the coinbase transaction paying `reward` satoshis.
    pub fn build(&self, reward: i64) -> CoinbaseTransaction {
        let script_sig = self.script_sig();
        let raw_tx = serialize_coinbase(reward, &script_sig, &self.script_pubkey);
        let txid = double_sha256(&raw_tx);

        CoinbaseTransaction { raw_tx, txid }
    }
}

/// Serialize a version 1 coinbase with one input and one output.
///
/// Script length prefixes are compact-size encodings of the decoded byte
/// length of each script.
pub fn serialize_coinbase(reward: i64, script_sig: &Script, script_pubkey: &Script) -> Vec<u8> {
    let mut raw_tx = Vec::with_capacity(
        4 + 1 + 32 + 4 + 9 + script_sig.byte_len() + 4 + 1 + 8 + 9 + script_pubkey.byte_len() + 4,
    );

    // Version
    raw_tx.extend_from_slice(&1u32.to_le_bytes());

    // Input count
    raw_tx.push(0x01);

    // Null outpoint
    raw_tx.extend_from_slice(&[0u8; 32]);
    raw_tx.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());

    encode_varint(script_sig.byte_len() as u64, &mut raw_tx);
    raw_tx.extend_from_slice(script_sig.as_bytes());

    // Sequence
    raw_tx.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());

    // Output count
    raw_tx.push(0x01);

    raw_tx.extend_from_slice(&encode_le64(reward));
    encode_varint(script_pubkey.byte_len() as u64, &mut raw_tx);
    raw_tx.extend_from_slice(script_pubkey.as_bytes());

    // Locktime
    raw_tx.extend_from_slice(&0u32.to_le_bytes());

    raw_tx
}

/// A constructed coinbase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseTransaction {
    /// Serialized transaction.
    pub raw_tx: Vec<u8>,
    /// Transaction ID (double SHA256 of `raw_tx`, internal byte order).
    pub txid: [u8; 32],
}

impl CoinbaseTransaction {
    /// Hex of the serialized transaction, as submitted with the block.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.raw_tx)
    }

    /// Transaction ID as displayed by nodes and explorers.
    pub fn txid_display(&self) -> String {
        to_display_hex(&self.txid)
    }

    /// Merkle root of a block containing only this transaction (internal order).
    pub fn merkle_root(&self) -> [u8; 32] {
        self.txid
    }

    /// Merkle root in display order, as fed to the header assembler.
    pub fn merkle_root_display(&self) -> String {
        self.txid_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_SCRIPT_SIG: &str = "04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73";
    const GENESIS_SCRIPT_PUBKEY: &str = "4104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac";

    #[test]
    fn test_minimal_coinbase_layout() {
        let builder = CoinbaseBuilder::new(
            Script::from_hex("00").unwrap(),
            Script::from_hex("51").unwrap(),
        );
        let coinbase = builder.build(5_000_000_000);
        let raw = &coinbase.raw_tx;

        assert_eq!(raw.len(), 62);
        assert_eq!(&raw[0..4], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(raw[4], 0x01);
        assert_eq!(&raw[5..37], &[0u8; 32]);
        assert_eq!(&raw[37..41], &[0xff; 4]);
        // scriptSig length is one byte, not two hex characters
        assert_eq!(raw[41], 0x01);
        assert_eq!(raw[42], 0x00);
        assert_eq!(&raw[43..47], &[0xff; 4]);
        assert_eq!(raw[47], 0x01);
        assert_eq!(&raw[48..56], &5_000_000_000i64.to_le_bytes());
        assert_eq!(raw[56], 0x01);
        assert_eq!(raw[57], 0x51);
        assert_eq!(&raw[58..62], &[0u8; 4]);

        assert_eq!(
            coinbase.to_hex(),
            "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff0100ffffffff0100f2052a01000000015100000000"
        );
    }

    #[test]
    fn test_genesis_coinbase_txid() {
        let builder = CoinbaseBuilder::new(
            Script::from_hex(GENESIS_SCRIPT_SIG).unwrap(),
            Script::from_hex(GENESIS_SCRIPT_PUBKEY).unwrap(),
        );
        let coinbase = builder.build(5_000_000_000);

        assert_eq!(
            coinbase.txid_display(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
        assert_eq!(coinbase.merkle_root_display(), coinbase.txid_display());
        assert_eq!(coinbase.merkle_root(), coinbase.txid);
    }

    #[test]
    fn test_script_length_uses_bytes() {
        let script_sig = Script::from_hex(GENESIS_SCRIPT_SIG).unwrap();
        assert_eq!(script_sig.byte_len(), GENESIS_SCRIPT_SIG.len() / 2);

        let raw = serialize_coinbase(0, &script_sig, &Script::default());
        assert_eq!(raw[41] as usize, 77);
    }

    #[test]
    fn test_long_script_uses_varint_prefix() {
        let script_sig = Script::new(vec![0xab; 300]);
        let raw = serialize_coinbase(1, &script_sig, &Script::from_hex("51").unwrap());
        assert_eq!(&raw[41..44], &[0xfd, 0x2c, 0x01]);
        assert_eq!(raw.len(), 62 - 1 + 300 + 2);
    }

    #[test]
    fn test_extra_nonce_changes_txid() {
        let builder = CoinbaseBuilder::new(
            Script::from_hex("00").unwrap(),
            Script::from_hex("51").unwrap(),
        );
        let plain = builder.clone().build(1);
        let varied = builder.with_extra_nonce([1, 0, 0, 0, 0, 0, 0, 0]).build(1);

        assert_ne!(plain.txid, varied.txid);
        assert_eq!(varied.raw_tx.len(), plain.raw_tx.len() + 8);
    }

    #[test]
    fn test_malformed_script_hex() {
        assert!(Script::from_hex("abc").is_err());
    }
}
