//! Core logic for a solo Bitcoin block-header miner.
//!
//! This crate provides pure Rust implementations of:
//! - Little-endian field encoding and display/internal byte-order conversion
//! - Coinbase transaction building for coinbase-only blocks
//! - SHA256 double-hashing
//! - Block header assembly from a node's block template
//! - Sequential and parallel proof-of-work nonce search
//! - The traits a node integration implements to feed and receive blocks

pub mod block;
pub mod codec;
pub mod coinbase;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod network;
pub mod node;
pub mod search;

pub use block::{assemble_prefix, BlockHeader, CandidateBlock, ChainTemplate, HeaderPrefix};
pub use codec::{encode_le32, encode_le64, reverse_byte_order};
pub use coinbase::{CoinbaseBuilder, CoinbaseTransaction, Script};
pub use config::{MinerConfig, NodeConfig};
pub use difficulty::{bits_to_target, Target};
pub use error::{MinerError, Result};
pub use hash::double_sha256;
pub use network::Network;
pub use node::{AttemptReport, BlockSubmitter, ChainSource, SoloMiner, SubmitOutcome};
pub use search::{search, search_range, CancelToken, NonceRange, SearchOutcome, Solution};
#[cfg(feature = "parallel")]
pub use search::{par_search, par_search_range};
