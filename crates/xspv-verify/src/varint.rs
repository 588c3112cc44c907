//! Bitcoin `CompactSize` variable-length integers.
//!
//! One prefix byte selects the width: values below `0xfd` are stored inline,
//! `0xfd`, `0xfe` and `0xff` announce a 2, 4 or 8 byte little-endian payload.

use crate::error::SpvError;

/// Result of decoding one variable-length integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt {
    /// Decoded value
    pub value: u64,
    /// Offset of the first byte after the encoding
    pub next_offset: usize,
}

impl VarInt {
    /// Decoded value as a `usize`, for use as a length.
    pub fn as_len(&self) -> Result<usize, SpvError> {
        usize::try_from(self.value).map_err(|_| SpvError::LengthOutOfRange(self.value))
    }
}

/// Borrow `len` bytes of `bytes` starting at `offset`.
pub(crate) fn take(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], SpvError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(SpvError::UnexpectedEof {
            offset,
            needed: len,
        })
}

fn read_le(bytes: &[u8], offset: usize, len: usize) -> Result<u64, SpvError> {
    let mut buf = [0u8; 8];
    buf[..len].copy_from_slice(take(bytes, offset, len)?);
    Ok(u64::from_le_bytes(buf))
}

/// Decode the variable-length integer starting at `offset`.
pub fn decode_varint(bytes: &[u8], offset: usize) -> Result<VarInt, SpvError> {
    let prefix = take(bytes, offset, 1)?[0];
    let (value, width) = match prefix {
        0xfd => (read_le(bytes, offset + 1, 2)?, 2),
        0xfe => (read_le(bytes, offset + 1, 4)?, 4),
        0xff => (read_le(bytes, offset + 1, 8)?, 8),
        small => (small as u64, 0),
    };
    Ok(VarInt {
        value,
        next_offset: offset + 1 + width,
    })
}

/// Encode `value` using the shortest prefix form.
pub fn encode_varint(value: u64) -> Vec<u8> {
    match value {
        0..=0xfc => vec![value as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(value as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&value.to_le_bytes());
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_round_trip_at_width_boundaries() {
        let values = [
            0u64,
            1,
            0xfc,
            0xfd,
            0xfe,
            0xff,
            0xffff,
            0x1_0000,
            0xffff_ffff,
            0x1_0000_0000,
            u64::MAX,
        ];
        for value in values {
            let mut bytes = vec![0xaa, 0xbb];
            let encoded = encode_varint(value);
            bytes.extend_from_slice(&encoded);
            bytes.push(0xcc);

            let decoded = decode_varint(&bytes, 2).unwrap();
            assert_eq!(decoded.value, value);
            assert_eq!(decoded.next_offset, 2 + encoded.len());
        }
    }

    #[test]
    fn test_single_byte_consumes_one_byte() {
        let decoded = decode_varint(&[0x00, 0x6a], 0).unwrap();
        assert_eq!(decoded, VarInt { value: 0, next_offset: 1 });

        let decoded = decode_varint(&[0x6a, 0xfc], 1).unwrap();
        assert_eq!(decoded, VarInt { value: 0xfc, next_offset: 2 });
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(encode_varint(0x0102_0304), vec![0xfe, 0x04, 0x03, 0x02, 0x01]);
        let decoded = decode_varint(&[0xfd, 0x34, 0x12], 0).unwrap();
        assert_eq!(decoded.value, 0x1234);
        assert_eq!(decoded.next_offset, 3);
    }

    #[test]
    fn test_truncated_payload() {
        assert_eq!(
            decode_varint(&[0xfe, 0x01, 0x02], 0),
            Err(SpvError::UnexpectedEof { offset: 1, needed: 4 })
        );
        assert_eq!(
            decode_varint(&[], 0),
            Err(SpvError::UnexpectedEof { offset: 0, needed: 1 })
        );
    }
}
