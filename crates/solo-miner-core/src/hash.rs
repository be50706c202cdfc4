//! SHA256 hashing primitives.

use sha2::{Digest, Sha256};

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// Used for block header hashing and transaction IDs. The output is in the
/// hash function's native byte order (the "internal" order).
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Reverse the byte order of a 32-byte array.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256() {
        let hash = double_sha256(b"hello");
        let expected = hex::decode(
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        ).unwrap();

        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_double_sha256_differs_from_single() {
        for data in [&b""[..], &b"hello"[..], &[0u8; 80][..], &[0xffu8; 76][..]] {
            assert_ne!(double_sha256(data), sha256(data));
            assert_eq!(double_sha256(data), sha256(&sha256(data)));
        }
    }

    #[test]
    fn test_double_sha256_is_deterministic() {
        let header = [0x42u8; 80];
        assert_eq!(double_sha256(&header), double_sha256(&header));
    }

    #[test]
    fn test_hash_to_display_hex() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        let display = hash_to_display_hex(&hash);
        assert!(display.ends_with("ab"));
        assert!(display.starts_with("00"));
    }
}
