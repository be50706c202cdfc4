//! Serializable views of miner state for JavaScript.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Mining statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiningStats {
    /// Total hashes computed across all attempts.
    pub total_hashes: u64,
    /// Current hash rate (hashes per second).
    pub hash_rate: f64,
    /// Whether a valid block was found.
    pub block_found: bool,
    /// Next nonce to try in the current attempt.
    pub current_nonce: u64,
    /// Extra nonce of the current attempt.
    pub extra_nonce: u64,
    /// Number of nonce spaces exhausted so far.
    pub attempts_exhausted: u32,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: f64,
}

impl MiningStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        if self.elapsed_ms > 0.0 {
            self.hash_rate = (self.total_hashes as f64) / (self.elapsed_ms / 1000.0);
        }
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        if self.hash_rate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", self.hash_rate / 1_000_000_000.0)
        } else if self.hash_rate >= 1_000_000.0 {
            format!("{:.2} MH/s", self.hash_rate / 1_000_000.0)
        } else if self.hash_rate >= 1_000.0 {
            format!("{:.2} KH/s", self.hash_rate / 1_000.0)
        } else {
            format!("{:.2} H/s", self.hash_rate)
        }
    }

    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// The assembled attempt, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub height: Option<u64>,
    /// Previous block hash (display format).
    pub prev_hash: String,
    pub bits: String,
    pub difficulty: f64,
    /// Full target as 64 hex digits.
    pub target: String,
    /// Coinbase value in satoshis.
    pub reward: i64,
    /// Coinbase txid, which is also the merkle root (display format).
    pub merkle_root: String,
    pub extra_nonce: u64,
}

impl TemplateInfo {
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Result of one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningResultInfo {
    /// Whether a valid block was found.
    pub block_found: bool,
    /// The winning nonce (if found).
    pub nonce: Option<u32>,
    /// The block hash (if found, display format).
    pub hash: Option<String>,
    /// Whether the whole nonce space of this attempt has been searched.
    pub exhausted: bool,
    /// Hashes computed in this batch.
    pub hashes_computed: u64,
}

impl MiningResultInfo {
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
}
