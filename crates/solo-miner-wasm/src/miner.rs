//! Mining controller for the WASM miner.
//!
//! JavaScript hands over a block template and the two coinbase scripts, then
//! calls `mine_batch` repeatedly so the page stays responsive. When a nonce
//! space runs dry, `next_attempt` bumps the extra nonce and rebuilds.

use solo_miner_core::{
    difficulty::{bits_to_difficulty, parse_bits},
    hash::hash_to_display_hex,
    search::NONCE_SPACE,
    search_range, CancelToken, CandidateBlock, ChainTemplate, CoinbaseBuilder, HeaderPrefix,
    MinerError, NonceRange, Script, SearchOutcome, Target,
};
use log::info;
use wasm_bindgen::prelude::*;

use crate::state::{MiningResultInfo, MiningStats, TemplateInfo};

/// The main mining controller.
#[wasm_bindgen]
pub struct Miner {
    /// Chain state of the current attempt.
    template: ChainTemplate,
    script_sig: Script,
    script_pubkey: Script,
    /// Block assembled for the current extra nonce.
    block: CandidateBlock,
    prefix: HeaderPrefix,
    target: Target,
    stats: MiningStats,
    /// Start time of mining.
    start_time: f64,
    is_mining: bool,
    cancel: CancelToken,
}

#[wasm_bindgen]
impl Miner {
    /// Create a new miner.
    ///
    /// # Arguments
    /// * `template` - A `getblocktemplate` result object
    /// * `script_sig` - Coinbase input script (hex)
    /// * `script_pubkey` - Payout output script (hex)
    #[wasm_bindgen(constructor)]
    pub fn new(template: JsValue, script_sig: &str, script_pubkey: &str) -> Result<Miner, JsValue> {
        let template: ChainTemplate = serde_wasm_bindgen::from_value(template)
            .map_err(|e| JsValue::from_str(&format!("Invalid template: {:?}", e)))?;
        let script_sig = Script::from_hex(script_sig).map_err(to_js_error)?;
        let script_pubkey = Script::from_hex(script_pubkey).map_err(to_js_error)?;
        let target = template.target().map_err(to_js_error)?;

        let (block, prefix) = assemble(&template, &script_sig, &script_pubkey, None).map_err(to_js_error)?;

        Ok(Miner {
            template,
            script_sig,
            script_pubkey,
            block,
            prefix,
            target,
            stats: MiningStats::new(),
            start_time: 0.0,
            is_mining: false,
            cancel: CancelToken::new(),
        })
    }

    /// Describe the current attempt.
    #[wasm_bindgen]
    pub fn template_info(&self) -> Result<JsValue, JsValue> {
        let difficulty = parse_bits(&self.template.bits)
            .map(bits_to_difficulty)
            .map_err(to_js_error)?;

        TemplateInfo {
            height: self.template.height,
            prev_hash: self.template.previous_block_hash.clone(),
            bits: self.template.bits.clone(),
            difficulty,
            target: self.target.to_string(),
            reward: self.template.coinbase_value,
            merkle_root: self.block.coinbase.merkle_root_display(),
            extra_nonce: self.stats.extra_nonce,
        }
        .to_js()
    }

    /// Mine a batch of nonces.
    ///
    /// # Arguments
    /// * `batch_size` - Number of nonces to try in this batch
    #[wasm_bindgen]
    pub fn mine_batch(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        if self.stats.block_found {
            return Err(JsValue::from_str("Block already found"));
        }
        if self.stats.current_nonce >= NONCE_SPACE {
            return Err(to_js_error(MinerError::NonceSpaceExhausted {
                hashes: self.stats.current_nonce,
            }));
        }

        let start = self.stats.current_nonce as u32;
        let range = NonceRange::new(start, self.stats.current_nonce + batch_size as u64);
        let outcome = search_range(&self.prefix, &self.target, range, &self.cancel);

        self.stats.total_hashes += outcome.hashes();
        self.stats.current_nonce = range.end();

        if self.start_time > 0.0 {
            self.stats.elapsed_ms = js_sys::Date::now() - self.start_time;
            self.stats.update_hash_rate();
        }

        let mut info = MiningResultInfo {
            block_found: false,
            nonce: None,
            hash: None,
            exhausted: false,
            hashes_computed: outcome.hashes(),
        };

        match outcome {
            SearchOutcome::Found(solution) => {
                self.block.header.nonce = solution.nonce;
                self.stats.block_found = true;
                self.stats.current_nonce = solution.nonce as u64;
                info.block_found = true;
                info.nonce = Some(solution.nonce);
                info.hash = Some(hash_to_display_hex(&solution.hash));
                info!("block found with nonce {}", solution.nonce);
            }
            SearchOutcome::Exhausted { .. } if range.end() >= NONCE_SPACE => {
                self.stats.attempts_exhausted += 1;
                info.exhausted = true;
                info!("nonce space exhausted for extra nonce {}", self.stats.extra_nonce);
            }
            SearchOutcome::Exhausted { .. } => {}
            SearchOutcome::Cancelled { .. } => {
                self.stats.current_nonce = start as u64 + outcome.hashes();
            }
        }
        self.stats.current_nonce = self.stats.current_nonce.min(NONCE_SPACE);

        info.to_js()
    }

    /// Rebuild the coinbase with the next extra nonce and restart at nonce 0.
    #[wasm_bindgen]
    pub fn next_attempt(&mut self) -> Result<JsValue, JsValue> {
        let extra_nonce = self.stats.extra_nonce + 1;
        let (block, prefix) = assemble(&self.template, &self.script_sig, &self.script_pubkey, Some(extra_nonce))
            .map_err(to_js_error)?;

        self.block = block;
        self.prefix = prefix;
        self.stats.extra_nonce = extra_nonce;
        self.stats.current_nonce = 0;
        self.stats.block_found = false;

        self.template_info()
    }

    /// Start mining.
    #[wasm_bindgen]
    pub fn start_mining(&mut self) {
        self.is_mining = true;
        self.cancel = CancelToken::new();
        self.start_time = js_sys::Date::now();
    }

    /// Stop mining.
    #[wasm_bindgen]
    pub fn stop_mining(&mut self) {
        self.is_mining = false;
        self.cancel.cancel();
    }

    /// Check if mining is active.
    #[wasm_bindgen(getter)]
    pub fn is_mining(&self) -> bool {
        self.is_mining
    }

    /// Get current mining statistics.
    #[wasm_bindgen]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        self.stats.to_js()
    }

    /// Get the formatted hash rate.
    #[wasm_bindgen]
    pub fn get_hash_rate_display(&self) -> String {
        self.stats.format_hash_rate()
    }

    /// Get the serialized block for submission (if a valid block was found).
    #[wasm_bindgen]
    pub fn get_block_hex(&self) -> Option<String> {
        if self.stats.block_found {
            Some(self.block.serialize_block_hex())
        } else {
            None
        }
    }
}

/// The first attempt uses the scriptSig as given; later ones append the
/// extra nonce.
fn assemble(
    template: &ChainTemplate,
    script_sig: &Script,
    script_pubkey: &Script,
    extra_nonce: Option<u64>,
) -> Result<(CandidateBlock, HeaderPrefix), MinerError> {
    let mut builder = CoinbaseBuilder::new(script_sig.clone(), script_pubkey.clone());
    if let Some(extra) = extra_nonce {
        builder = builder.with_extra_nonce(extra.to_le_bytes());
    }
    let coinbase = builder.build(template.coinbase_value);
    let block = CandidateBlock::new(template, coinbase)?;
    let prefix = block.header.prefix();
    Ok((block, prefix))
}

fn to_js_error(err: MinerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Log to the browser console.
#[wasm_bindgen]
pub fn console_log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}
