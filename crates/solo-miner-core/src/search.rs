//! Proof-of-work nonce search.
//!
//! A candidate header is the fixed 76-byte prefix followed by a
//! little-endian nonce. Its double SHA256, read as a 256-bit number in
//! display order, must be strictly below the target. Nonces are tried in
//! ascending order and the first hit wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::block::{HeaderPrefix, HEADER_PREFIX_SIZE};
use crate::difficulty::Target;
use crate::error::{MinerError, Result};
use crate::hash::double_sha256;

/// Number of distinct nonce values, `2^32`.
pub const NONCE_SPACE: u64 = 1 << 32;

/// A half-open range of nonces `[start, end)`.
///
/// The end is a `u64` so the full space `[0, 2^32)` is representable and
/// iteration never wraps the 32-bit counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    start: u64,
    end: u64,
}

impl NonceRange {
    /// Every possible nonce.
    pub const fn full() -> Self {
        NonceRange { start: 0, end: NONCE_SPACE }
    }

    /// Range from `start` up to (not including) `end`, clamped to `2^32`.
    pub fn new(start: u32, end: u64) -> Self {
        let start = start as u64;
        let end = end.min(NONCE_SPACE).max(start);
        NonceRange { start, end }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Nonces in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        (self.start..self.end).map(|n| n as u32)
    }

    /// Split into at most `parts` contiguous, non-overlapping sub-ranges in
    /// ascending order. Their union is exactly `self`.
    pub fn split(&self, parts: usize) -> Vec<NonceRange> {
        let parts = (parts.max(1) as u64).min(self.len().max(1));
        let chunk = (self.len() + parts - 1) / parts;

        let mut ranges = Vec::with_capacity(parts as usize);
        let mut start = self.start;
        while start < self.end {
            let end = (start + chunk).min(self.end);
            ranges.push(NonceRange { start, end });
            start = end;
        }
        if ranges.is_empty() {
            ranges.push(*self);
        }
        ranges
    }
}

impl Default for NonceRange {
    fn default() -> Self {
        NonceRange::full()
    }
}

/// Cooperative cancellation shared between a caller and running searches.
///
/// Cancellation is advisory: a hash already being computed finishes, but
/// its result is ignored.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A nonce that satisfies the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u32,
    /// Header hash in internal byte order.
    pub hash: [u8; 32],
    /// Hashes computed to find it.
    pub hashes: u64,
}

/// How a bounded search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Solution),
    Exhausted { hashes: u64 },
    Cancelled { hashes: u64 },
}

impl SearchOutcome {
    pub fn hashes(&self) -> u64 {
        match self {
            SearchOutcome::Found(solution) => solution.hashes,
            SearchOutcome::Exhausted { hashes } | SearchOutcome::Cancelled { hashes } => *hashes,
        }
    }

    /// Map exhaustion and cancellation to their error variants.
    pub fn into_result(self) -> Result<Solution> {
        match self {
            SearchOutcome::Found(solution) => Ok(solution),
            SearchOutcome::Exhausted { hashes } => Err(MinerError::NonceSpaceExhausted { hashes }),
            SearchOutcome::Cancelled { hashes } => Err(MinerError::Cancelled { hashes }),
        }
    }
}

/// Hash the candidate for `nonce` and return the digest if it beats `target`.
#[inline]
pub fn check_nonce(prefix: &HeaderPrefix, target: &Target, nonce: u32) -> Option<[u8; 32]> {
    let hash = double_sha256(&prefix.with_nonce(nonce));
    Target::from_digest(&hash).is_below(target).then_some(hash)
}

/// Search `range` in ascending order, stopping at the first hit.
pub fn search_range(
    prefix: &HeaderPrefix,
    target: &Target,
    range: NonceRange,
    cancel: &CancelToken,
) -> SearchOutcome {
    debug!("searching nonces {}..{} below {}", range.start, range.end, target);

    let mut header = prefix.with_nonce(0);
    let mut hashes = 0u64;

    for nonce in range.iter() {
        if cancel.is_cancelled() {
            debug!("search cancelled at nonce {} after {} hashes", nonce, hashes);
            return SearchOutcome::Cancelled { hashes };
        }

        header[HEADER_PREFIX_SIZE..].copy_from_slice(&nonce.to_le_bytes());
        let hash = double_sha256(&header);
        hashes += 1;

        if Target::from_digest(&hash).is_below(target) {
            info!("nonce found: {} after {} hashes", nonce, hashes);
            return SearchOutcome::Found(Solution { nonce, hash, hashes });
        }
    }

    warn!("no nonce in {}..{} meets the target", range.start, range.end);
    SearchOutcome::Exhausted { hashes }
}

/// Search the whole nonce space on the calling thread.
pub fn search(prefix: &HeaderPrefix, target: &Target) -> Result<Solution> {
    search_range(prefix, target, NonceRange::full(), &CancelToken::new()).into_result()
}

/// Number of workers used when the caller asks for zero.
#[cfg(feature = "parallel")]
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// State shared by the workers of one parallel search.
///
/// `best` is the smallest hit so far and `stopped_at` the smallest nonce a
/// worker abandoned because of cancellation. A hit is only reported when
/// every nonce below it has been checked, i.e. `best < stopped_at`.
#[cfg(feature = "parallel")]
struct SharedSearch {
    best: std::sync::atomic::AtomicU64,
    stopped_at: std::sync::atomic::AtomicU64,
    hashes: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "parallel")]
impl SharedSearch {
    fn new() -> Self {
        use std::sync::atomic::AtomicU64;

        SharedSearch {
            best: AtomicU64::new(u64::MAX),
            stopped_at: AtomicU64::new(u64::MAX),
            hashes: AtomicU64::new(0),
        }
    }

    /// Scan one slice until a hit, a better hit elsewhere, or cancellation.
    fn scan(&self, prefix: &HeaderPrefix, target: &Target, part: NonceRange, cancel: &CancelToken) {
        let mut header = prefix.with_nonce(0);
        let mut hashes = 0u64;

        for nonce in part.start..part.end {
            if nonce >= self.best.load(Ordering::Acquire) {
                break;
            }
            if cancel.is_cancelled() {
                self.stopped_at.fetch_min(nonce, Ordering::AcqRel);
                break;
            }

            header[HEADER_PREFIX_SIZE..].copy_from_slice(&(nonce as u32).to_le_bytes());
            let hash = double_sha256(&header);
            hashes += 1;

            if Target::from_digest(&hash).is_below(target) {
                self.best.fetch_min(nonce, Ordering::AcqRel);
                break;
            }
        }

        self.hashes.fetch_add(hashes, Ordering::Relaxed);
    }

    fn outcome(&self, prefix: &HeaderPrefix, range: NonceRange) -> SearchOutcome {
        let hashes = self.hashes.load(Ordering::Relaxed);
        let best = self.best.load(Ordering::Acquire);
        let stopped_at = self.stopped_at.load(Ordering::Acquire);

        if best < stopped_at {
            let nonce = best as u32;
            info!("nonce found: {} after {} hashes", nonce, hashes);
            return SearchOutcome::Found(Solution {
                nonce,
                hash: double_sha256(&prefix.with_nonce(nonce)),
                hashes,
            });
        }

        if stopped_at != u64::MAX {
            debug!("parallel search cancelled at nonce {} after {} hashes", stopped_at, hashes);
            return SearchOutcome::Cancelled { hashes };
        }

        warn!("no nonce in {}..{} meets the target", range.start, range.end);
        SearchOutcome::Exhausted { hashes }
    }
}

/// Search `range` on `workers` threads, each owning a contiguous slice.
///
/// Returns the same nonce as [`search_range`]: a worker stops as soon as
/// every nonce left in its slice is larger than the best hit so far, so
/// lower slices keep running until they have been fully ruled out. If
/// cancellation interrupts a slice below the best hit, the search reports
/// `Cancelled` rather than a nonce that may not be the smallest.
#[cfg(feature = "parallel")]
pub fn par_search_range(
    prefix: &HeaderPrefix,
    target: &Target,
    range: NonceRange,
    workers: usize,
    cancel: &CancelToken,
) -> SearchOutcome {
    let workers = if workers == 0 { default_workers() } else { workers };
    let parts = range.split(workers);
    debug!(
        "searching nonces {}..{} below {} on {} workers",
        range.start,
        range.end,
        target,
        parts.len()
    );

    let shared = SharedSearch::new();

    std::thread::scope(|scope| {
        for part in &parts {
            let shared = &shared;
            scope.spawn(move || shared.scan(prefix, target, *part, cancel));
        }
    });

    shared.outcome(prefix, range)
}

/// Search the whole nonce space on `workers` threads (0 = one per CPU).
#[cfg(feature = "parallel")]
pub fn par_search(prefix: &HeaderPrefix, target: &Target, workers: usize) -> Result<Solution> {
    par_search_range(prefix, target, NonceRange::full(), workers, &CancelToken::new()).into_result()
}
