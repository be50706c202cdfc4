//! WebAssembly bindings for the solo block-header miner.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Building a coinbase-only block from a node's block template
//! - Mining the nonce space in caller-sized batches
//! - Rolling the extra nonce after a nonce space is exhausted
//! - Exporting the finished block for submission

use wasm_bindgen::prelude::*;

pub mod logger;
pub mod miner;
pub mod state;

// Re-export main types for JS access
pub use miner::Miner;

/// Initialize the WASM module: panic messages and `log` output go to the
/// browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logger::init();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
