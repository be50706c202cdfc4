//! Error type shared by every stage of header assembly and search.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, MinerError>;

/// Everything that can go wrong while building or mining a block.
///
/// Only [`MinerError::NonceSpaceExhausted`] is part of normal operation: the
/// caller is expected to vary the coinbase or timestamp and try again. The
/// other variants are contract violations and should abort the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinerError {
    /// Hex input with an odd number of characters or a non-hex digit.
    #[error("malformed hex: {0}")]
    MalformedHex(String),

    /// Integer does not fit in the field it is being encoded into.
    #[error("value {value} does not fit in a {width}-byte field")]
    ValueOutOfRange { value: u64, width: usize },

    /// Chain template field of the wrong length or encoding.
    #[error("malformed template field `{field}`: {reason}")]
    MalformedTemplate { field: &'static str, reason: String },

    /// No nonce in the searched range satisfied the target.
    #[error("nonce space exhausted after {hashes} hashes")]
    NonceSpaceExhausted { hashes: u64 },

    /// The search was stopped through its cancel token.
    #[error("search cancelled after {hashes} hashes")]
    Cancelled { hashes: u64 },

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The chain source or block submitter failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl MinerError {
    pub(crate) fn template(field: &'static str, reason: impl Into<String>) -> Self {
        MinerError::MalformedTemplate {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the caller can retry with a freshly assembled header.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MinerError::NonceSpaceExhausted { .. })
    }
}

impl From<hex::FromHexError> for MinerError {
    fn from(err: hex::FromHexError) -> Self {
        MinerError::MalformedHex(err.to_string())
    }
}
