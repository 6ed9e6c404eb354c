//! Compact-u16: the variable-length integer used for counts in the wire
//! format. Each byte carries 7 value bits; the high bit marks continuation.
//!
//! - Values 0..=0x7f     -> 1 byte
//! - Values 0x80..=0x3fff -> 2 bytes
//! - Values 0x4000..      -> 3 bytes (u16 caps at 0xffff)

use crate::error::TxError;

/// Encode a `u16` in compact-u16 format.
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 from the front of `data`.
///
/// Returns `(value, bytes_consumed)`. Fails with `MalformedEncoding` if the
/// continuation bit is still set on the last available byte, if the encoding
/// runs past three bytes, or if the decoded value overflows `u16`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), TxError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;

    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7f) as u32) << shift;

        if byte & 0x80 == 0 {
            if value > u16::MAX as u32 {
                return Err(TxError::MalformedEncoding(
                    "compact-u16 value overflow".into(),
                ));
            }
            return Ok((value as u16, i + 1));
        }

        shift += 7;
        if shift > 14 {
            return Err(TxError::MalformedEncoding(
                "compact-u16 continuation past third byte".into(),
            ));
        }
    }

    Err(TxError::MalformedEncoding(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_zero() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
    }

    #[test]
    fn encode_one_byte_max() {
        // 127 = 0x7f, fits in one byte.
        assert_eq!(encode_compact_u16(127), vec![0x7f]);
    }

    #[test]
    fn encode_boundary_128() {
        // 128 = 0x80 -> two bytes: (0x00 | 0x80), 0x01
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
    }

    #[test]
    fn encode_two_byte_max() {
        // 16383 = 0x3fff -> two bytes: (0x7f | 0x80), 0x7f
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
    }

    #[test]
    fn encode_boundary_16384() {
        // 16384 = 0x4000 -> three bytes: 0x80, 0x80, 0x01
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn encode_max_value() {
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn decode_zero() {
        assert_eq!(decode_compact_u16(&[0x00]).unwrap(), (0, 1));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let (val, len) = decode_compact_u16(&[0x7f, 0xde, 0xad]).unwrap();
        assert_eq!(val, 127);
        assert_eq!(len, 1);
    }

    #[test]
    fn roundtrip_boundaries() {
        for value in [0u16, 1, 127, 128, 255, 256, 16383, 16384, 65535] {
            let encoded = encode_compact_u16(value);
            let (decoded, len) = decode_compact_u16(&encoded).unwrap();
            assert_eq!(decoded, value, "roundtrip failed for {value}");
            assert_eq!(len, encoded.len());
        }
    }

    #[test]
    fn decode_empty_input_fails() {
        assert!(decode_compact_u16(&[]).is_err());
    }

    #[test]
    fn decode_truncated_fails() {
        // Continuation bit set on the final available byte.
        assert!(decode_compact_u16(&[0x80]).is_err());
        assert!(decode_compact_u16(&[0x80, 0x80]).is_err());
    }

    #[test]
    fn decode_overlong_fails() {
        // Continuation bit set on the third byte.
        assert!(decode_compact_u16(&[0x80, 0x80, 0x80, 0x01]).is_err());
    }

    #[test]
    fn decode_overflow_fails() {
        // 0x04 in the third byte pushes the value past u16::MAX.
        assert!(decode_compact_u16(&[0xff, 0xff, 0x04]).is_err());
    }
}
