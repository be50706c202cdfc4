//! The boundary with a full node, and one end-to-end mining attempt.
//!
//! Fetching chain state and submitting blocks are left to implementors of
//! [`ChainSource`] and [`BlockSubmitter`]. I/O happens strictly before and
//! after the search.

use log::{debug, info, warn};

use crate::block::{CandidateBlock, ChainTemplate, HeaderPrefix};
use crate::coinbase::{CoinbaseBuilder, Script};
use crate::config::{MinerConfig, NodeConfig};
use crate::difficulty::{bits_to_difficulty, parse_bits, Target};
use crate::error::Result;
use crate::search::{search_range, CancelToken, NonceRange, SearchOutcome, Solution};

/// Supplies chain state for a mining attempt.
pub trait ChainSource {
    /// The current block template.
    fn block_template(&mut self) -> Result<ChainTemplate>;

    /// Output script for a fresh payout address.
    fn payout_script(&mut self) -> Result<Script>;
}

/// What the node said about a submitted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
}

/// Hands a finished block to the network.
pub trait BlockSubmitter {
    fn submit_block(&mut self, block_hex: &str) -> Result<SubmitOutcome>;
}

/// Result of a successful attempt.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    /// The block with its winning nonce set.
    pub block: CandidateBlock,
    pub solution: Solution,
    pub outcome: SubmitOutcome,
}

/// Drives single attempts against a chain source and a submitter.
pub struct SoloMiner<S, B> {
    source: S,
    submitter: B,
    config: MinerConfig,
    range: NonceRange,
    cancel: CancelToken,
}

impl<S: ChainSource, B: BlockSubmitter> SoloMiner<S, B> {
    pub fn new(source: S, submitter: B, config: MinerConfig) -> Self {
        SoloMiner {
            source,
            submitter,
            config,
            range: NonceRange::full(),
            cancel: CancelToken::new(),
        }
    }

    /// Build the collaborators from the node settings, then the miner.
    ///
    /// The configuration is validated first, so `connect` never sees an
    /// empty host or a malformed scriptSig.
    pub fn connect<F>(config: MinerConfig, connect: F) -> Result<Self>
    where
        F: FnOnce(&NodeConfig) -> Result<(S, B)>,
    {
        config.validate()?;
        info!("connecting to {} node at {}", config.node.network, config.node.rpc_url());
        let (source, submitter) = connect(&config.node)?;
        Ok(Self::new(source, submitter, config))
    }

    /// Restrict the searched nonces (the full space by default).
    pub fn with_range(mut self, range: NonceRange) -> Self {
        self.range = range;
        self
    }

    /// Token that stops a running attempt from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn submitter(&self) -> &B {
        &self.submitter
    }

    /// Build, mine and submit one block.
    ///
    /// `extra_nonce` is appended to the configured scriptSig; bump it after
    /// a `NonceSpaceExhausted` error to mine a fresh merkle root. No retry
    /// happens here.
    pub fn attempt(&mut self, extra_nonce: Option<u64>) -> Result<AttemptReport> {
        let script_pubkey = self.source.payout_script()?;
        let template = self.source.block_template()?;
        let target = template.target()?;

        if let Ok(bits) = parse_bits(&template.bits) {
            debug!(
                "template at height {:?}, bits {} (difficulty {:.2})",
                template.height,
                template.bits,
                bits_to_difficulty(bits)
            );
        }

        let mut builder = CoinbaseBuilder::new(self.config.script_sig()?, script_pubkey);
        if let Some(extra) = extra_nonce {
            builder = builder.with_extra_nonce(extra.to_le_bytes());
        }
        let coinbase = builder.build(template.coinbase_value);
        debug!("coinbase txid {}", coinbase.txid_display());

        let mut block = CandidateBlock::new(&template, coinbase)?;
        let prefix = block.header.prefix();

        let solution = self.search_batches(&prefix, &target).into_result()?;
        block.header.nonce = solution.nonce;

        let block_hex = block.serialize_block_hex();
        let outcome = self.submitter.submit_block(&block_hex)?;
        match &outcome {
            SubmitOutcome::Accepted => info!("block {} accepted", block.header.display_hash()),
            SubmitOutcome::Rejected(reason) => {
                warn!("block {} rejected: {}", block.header.display_hash(), reason)
            }
        }

        Ok(AttemptReport {
            block,
            solution,
            outcome,
        })
    }

    /// Walk the range in ascending batches of `config.batch_size` nonces so
    /// progress is logged between batches. The first batch with a hit wins,
    /// which keeps the result the smallest qualifying nonce.
    fn search_batches(&self, prefix: &HeaderPrefix, target: &Target) -> SearchOutcome {
        let batch_size = u64::from(self.config.batch_size.max(1));
        let mut hashes = 0u64;
        let mut start = self.range.start();

        while start < self.range.end() {
            let end = (start + batch_size).min(self.range.end());
            let batch = NonceRange::new(start as u32, end);
            match self.search(prefix, target, batch) {
                SearchOutcome::Found(mut solution) => {
                    solution.hashes += hashes;
                    return SearchOutcome::Found(solution);
                }
                SearchOutcome::Cancelled { hashes: done } => {
                    return SearchOutcome::Cancelled { hashes: hashes + done };
                }
                SearchOutcome::Exhausted { hashes: done } => hashes += done,
            }
            debug!("searched nonces {}..{} without a hit", self.range.start(), end);
            start = end;
        }

        SearchOutcome::Exhausted { hashes }
    }

    #[cfg(feature = "parallel")]
    fn search(&self, prefix: &HeaderPrefix, target: &Target, range: NonceRange) -> SearchOutcome {
        if self.config.workers == 1 {
            search_range(prefix, target, range, &self.cancel)
        } else {
            crate::search::par_search_range(prefix, target, range, self.config.workers, &self.cancel)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn search(&self, prefix: &HeaderPrefix, target: &Target, range: NonceRange) -> SearchOutcome {
        search_range(prefix, target, range, &self.cancel)
    }
}
