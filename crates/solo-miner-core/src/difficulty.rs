//! Difficulty targets and compact "bits" conversion.

use core::fmt;

use crate::codec::reverse_byte_order;
use crate::error::{MinerError, Result};
use crate::hash::reverse_bytes;

/// A 256-bit unsigned proof-of-work threshold.
///
/// Stored as 32 big-endian bytes, so the derived lexicographic ordering is
/// exactly numeric ordering and no arithmetic can overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Target([u8; 32]);

impl Target {
    /// The zero target. No hash is strictly below it.
    pub const ZERO: Target = Target([0u8; 32]);

    /// The largest representable value, `2^256 - 1`.
    pub const MAX: Target = Target([0xffu8; 32]);

    /// Build a target from 32 big-endian bytes.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// Big-endian bytes of this target.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Parse a base-16 number of at most 64 digits.
    ///
    /// Shorter strings are treated as having leading zeros, matching how a
    /// node prints the `target` field of a block template.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() > 64 {
            return Err(MinerError::MalformedHex(format!(
                "{} digits exceed 256 bits",
                hex_str.len()
            )));
        }
        let mut padded = String::with_capacity(64);
        for _ in hex_str.len()..64 {
            padded.push('0');
        }
        padded.push_str(hex_str);

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)?;
        Ok(Target(bytes))
    }

    /// Interpret a double-SHA256 digest (internal byte order) as a number.
    ///
    /// Equivalent to hex-encoding the digest, reversing its byte order and
    /// parsing the result as base 16.
    #[inline]
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Target(reverse_bytes(digest))
    }

    /// Same as [`Target::from_digest`], but through the display hex string.
    pub fn from_digest_hex(digest_hex: &str) -> Result<Self> {
        Target::from_hex(&reverse_byte_order(digest_hex)?)
    }

    /// Expand compact bits into a target.
    pub fn from_bits(bits: u32) -> Self {
        Target(bits_to_target(bits))
    }

    /// Whether `self` is strictly below `other`.
    #[inline]
    pub fn is_below(&self, other: &Target) -> bool {
        self < other
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = ((bits >> 24) & 0xFF) as usize;
    let mantissa = bits & 0x007FFFFF;

    let mut target = [0u8; 32];

    // Negative flag set, or an exponent that would push the mantissa past 256 bits.
    if bits & 0x00800000 != 0 || exponent == 0 || exponent > 32 {
        return target;
    }

    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        target[29] = ((value >> 16) & 0xFF) as u8;
        target[30] = ((value >> 8) & 0xFF) as u8;
        target[31] = (value & 0xFF) as u8;
    } else {
        let pos = 32 - exponent;
        target[pos] = ((mantissa >> 16) & 0xFF) as u8;
        if pos + 1 < 32 { target[pos + 1] = ((mantissa >> 8) & 0xFF) as u8; }
        if pos + 2 < 32 { target[pos + 2] = (mantissa & 0xFF) as u8; }
    }

    target
}

/// Convert a 256-bit target back to compact "bits" representation.
///
/// This is the inverse of `bits_to_target` for normalized inputs.
pub fn target_to_bits(target: &[u8; 32]) -> u32 {
    let first_nonzero = match target.iter().position(|b| *b != 0) {
        Some(pos) => pos,
        None => return 0,
    };

    let exponent = (32 - first_nonzero) as u32;

    let mut mantissa: u32 = (target[first_nonzero] as u32) << 16;
    if first_nonzero + 1 < 32 {
        mantissa |= (target[first_nonzero + 1] as u32) << 8;
    }
    if first_nonzero + 2 < 32 {
        mantissa |= target[first_nonzero + 2] as u32;
    }

    // Shift right to keep the sign bit clear.
    let (exp_adj, mant_adj) = if mantissa & 0x00800000 != 0 {
        (exponent + 1, mantissa >> 8)
    } else {
        (exponent, mantissa)
    };

    (exp_adj << 24) | (mant_adj & 0x007FFFFF)
}

/// Parse the template's display-order `bits` string (e.g. `"1d00ffff"`).
pub fn parse_bits(bits_hex: &str) -> Result<u32> {
    let mut bytes = [0u8; 4];
    hex::decode_to_slice(bits_hex, &mut bytes)
        .map_err(|e| MinerError::template("bits", e.to_string()))?;
    Ok(u32::from_be_bytes(bytes))
}

/// Calculate approximate difficulty from bits.
///
/// Difficulty = max_target / current_target, where max_target is the
/// genesis block target (bits = 0x1d00ffff).
pub fn bits_to_difficulty(bits: u32) -> f64 {
    const GENESIS_BITS: u32 = 0x1d00ffff;

    let current = target_to_f64(&bits_to_target(bits));
    let genesis = target_to_f64(&bits_to_target(GENESIS_BITS));

    if current == 0.0 {
        return f64::INFINITY;
    }

    genesis / current
}

fn target_to_f64(target: &[u8; 32]) -> f64 {
    target.iter().fold(0.0, |acc, b| acc * 256.0 + *b as f64)
}
