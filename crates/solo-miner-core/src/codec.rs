//! Fixed-width integer encoding and byte-order conversion.
//!
//! Bitcoin stores hashes in "internal" byte order but RPC interfaces and
//! explorers display them reversed. Every conversion between the two goes
//! through this module so the direction is always explicit.

use crate::error::{MinerError, Result};

/// Encode an unsigned value as 4 little-endian bytes.
///
/// Values are accepted as `u64` so that wide fields coming from JSON can be
/// range-checked here rather than truncated by a cast.
pub fn encode_le32(value: u64) -> Result<[u8; 4]> {
    let narrow = u32::try_from(value).map_err(|_| MinerError::ValueOutOfRange { value, width: 4 })?;
    Ok(narrow.to_le_bytes())
}

/// Encode a signed value as 8 little-endian bytes.
#[inline]
pub fn encode_le64(value: i64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Encode a variable-length integer (Bitcoin compact size).
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Reverse the byte order of a hex string.
///
/// Each byte is two hex characters and is moved as a unit, so
/// `"0a0b0c"` becomes `"0c0b0a"`. Applying it twice yields the input.
pub fn reverse_byte_order(hex_str: &str) -> Result<String> {
    check_hex(hex_str)?;
    let bytes = hex_str.as_bytes();
    let mut reversed = String::with_capacity(bytes.len());
    for pair in bytes.chunks_exact(2).rev() {
        reversed.push(pair[0] as char);
        reversed.push(pair[1] as char);
    }
    Ok(reversed)
}

/// Decode a display-order hex string into `N` bytes of internal order.
pub fn decode_display<const N: usize>(hex_str: &str) -> Result<[u8; N]> {
    let internal = reverse_byte_order(hex_str)?;
    let mut out = [0u8; N];
    if internal.len() != N * 2 {
        return Err(MinerError::MalformedHex(format!(
            "expected {} bytes, got {}",
            N,
            internal.len() / 2
        )));
    }
    hex::decode_to_slice(&internal, &mut out)?;
    Ok(out)
}

/// Encode internal-order bytes as display-order hex.
pub fn to_display_hex(bytes: &[u8]) -> String {
    let mut reversed = bytes.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}

fn check_hex(hex_str: &str) -> Result<()> {
    if hex_str.len() % 2 != 0 {
        return Err(MinerError::MalformedHex(format!(
            "odd length {}",
            hex_str.len()
        )));
    }
    if let Some(bad) = hex_str.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(MinerError::MalformedHex(format!("invalid character {:?}", bad)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_le32() {
        assert_eq!(encode_le32(1).unwrap(), [0x01, 0x00, 0x00, 0x00]);
        assert_eq!(encode_le32(0xDEADBEEF).unwrap(), [0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(encode_le32(u32::MAX as u64).unwrap(), [0xFF; 4]);
    }

    #[test]
    fn test_encode_le32_out_of_range() {
        let err = encode_le32(1 << 32).unwrap_err();
        assert_eq!(err, MinerError::ValueOutOfRange { value: 1 << 32, width: 4 });
    }

    #[test]
    fn test_encode_le64() {
        // 50 BTC
        assert_eq!(
            encode_le64(5_000_000_000),
            [0x00, 0xf2, 0x05, 0x2a, 0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(encode_le64(-1), [0xFF; 8]);
    }

    #[test]
    fn test_encode_varint() {
        let mut output = Vec::new();

        encode_varint(1, &mut output);
        assert_eq!(output, vec![0x01]);

        output.clear();
        encode_varint(0xfc, &mut output);
        assert_eq!(output, vec![0xfc]);

        output.clear();
        encode_varint(0x1234, &mut output);
        assert_eq!(output, vec![0xfd, 0x34, 0x12]);

        output.clear();
        encode_varint(0x12345678, &mut output);
        assert_eq!(output, vec![0xfe, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_reverse_byte_order() {
        assert_eq!(reverse_byte_order("0a0b0c").unwrap(), "0c0b0a");
        assert_eq!(reverse_byte_order("1d00ffff").unwrap(), "ffff001d");
        assert_eq!(reverse_byte_order("").unwrap(), "");
        // Nibbles within a byte keep their order.
        assert_eq!(reverse_byte_order("12ab").unwrap(), "ab12");
    }

    #[test]
    fn test_reverse_byte_order_is_involution() {
        let inputs = [
            "",
            "00",
            "abcdef",
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            "DeadBeef",
        ];
        for input in inputs {
            let twice = reverse_byte_order(&reverse_byte_order(input).unwrap()).unwrap();
            assert_eq!(twice, input);
        }
    }

    #[test]
    fn test_reverse_byte_order_rejects_malformed() {
        assert!(matches!(reverse_byte_order("abc"), Err(MinerError::MalformedHex(_))));
        assert!(matches!(reverse_byte_order("zz"), Err(MinerError::MalformedHex(_))));
    }

    #[test]
    fn test_decode_display() {
        let bits: [u8; 4] = decode_display("1d00ffff").unwrap();
        assert_eq!(bits, [0xff, 0xff, 0x00, 0x1d]);
        assert!(decode_display::<4>("1d00ff").is_err());
    }

    #[test]
    fn test_to_display_hex() {
        assert_eq!(to_display_hex(&[0x01, 0x02, 0x03]), "030201");
    }
}
