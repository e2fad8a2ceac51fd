//! BER definite-length codec.
//!
//! Lengths below 128 use the single-byte short form. Longer values use the
//! long form: a first byte of `0x80 | n` followed by `n` big-endian length
//! bytes, with `n` at most four. Indefinite length (`0x80` alone) is rejected.

use bytes::BufMut;

use crate::{Error, Result};

/// Maximum number of bytes in a long-form length.
pub const MAX_LENGTH_BYTES: usize = 4;

/// Appends the encoded form of `length` to `buf`.
pub fn encode_length(length: usize, buf: &mut impl BufMut) {
    if length < 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u8(length as u8);
        return;
    }

    let bytes = (length as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = &bytes[skip..];
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u8(0x80 | significant.len() as u8);
    buf.put_slice(significant);
}

/// Returns how many bytes [`encode_length`] writes for `length`.
#[must_use]
pub const fn encoded_size(length: usize) -> usize {
    if length < 0x80 {
        return 1;
    }
    let mut n = 0;
    let mut remaining = length;
    while remaining > 0 {
        n += 1;
        remaining >>= 8;
    }
    1 + n
}

/// Inspects the first length byte and returns how many additional length
/// bytes follow it.
///
/// # Errors
///
/// Returns [`Error::IndefiniteLength`] for `0x80` and
/// [`Error::LengthTooLarge`] when more than four bytes are declared.
pub const fn additional_bytes(first: u8) -> Result<usize> {
    if first & 0x80 == 0 {
        return Ok(0);
    }
    let count = (first & 0x7F) as usize;
    if count == 0 {
        return Err(Error::IndefiniteLength);
    }
    if count > MAX_LENGTH_BYTES {
        return Err(Error::LengthTooLarge(count));
    }
    Ok(count)
}

/// Combines the first length byte with its big-endian continuation bytes.
#[must_use]
pub fn assemble(first: u8, continuation: &[u8]) -> usize {
    if first & 0x80 == 0 {
        return usize::from(first);
    }
    continuation
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b))
}

/// Decodes a length from the start of `bytes`.
///
/// Returns the decoded length and the number of bytes it occupied.
///
/// # Errors
///
/// Returns an error if the buffer is too short or the length form is not
/// permitted.
pub fn decode_length(bytes: &[u8]) -> Result<(usize, usize)> {
    let Some(&first) = bytes.first() else {
        return Err(Error::Truncated {
            needed: 1,
            available: 0,
        });
    };
    let extra = additional_bytes(first)?;
    let Some(continuation) = bytes.get(1..=extra) else {
        return Err(Error::Truncated {
            needed: extra + 1,
            available: bytes.len(),
        });
    };
    Ok((assemble(first, continuation), extra + 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    fn encode(length: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_length(length, &mut buf);
        buf
    }

    #[test]
    fn test_short_form() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(5), vec![0x05]);
        assert_eq!(encode(127), vec![0x7F]);
    }

    #[test]
    fn test_long_form() {
        assert_eq!(encode(128), vec![0x81, 0x80]);
        assert_eq!(encode(255), vec![0x81, 0xFF]);
        assert_eq!(encode(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(encode(0x010000), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_encoded_size_matches() {
        for length in [0, 1, 127, 128, 255, 256, 65535, 65536, 0xFFFFFF, 0x1000000] {
            assert_eq!(encoded_size(length), encode(length).len(), "length {length}");
        }
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_length(&[0x05]).unwrap(), (5, 1));
        assert_eq!(decode_length(&[0x81, 0x80]).unwrap(), (128, 2));
        assert_eq!(decode_length(&[0x82, 0x01, 0x00, 0xFF]).unwrap(), (256, 3));
    }

    #[test]
    fn test_decode_rejects_indefinite() {
        assert!(matches!(
            decode_length(&[0x80]),
            Err(Error::IndefiniteLength)
        ));
    }

    #[test]
    fn test_decode_rejects_five_length_bytes() {
        let err = decode_length(&[0x85, 1, 2, 3, 4, 5]).unwrap_err();
        assert!(matches!(err, Error::LengthTooLarge(5)));
        assert_eq!(err.to_string(), "length encoding too large: 5 bytes (max 4)");
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_length(&[0x82, 0x01]),
            Err(Error::Truncated {
                needed: 3,
                available: 2
            })
        ));
        assert!(matches!(decode_length(&[]), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_non_minimal_long_form_accepted() {
        // BER allows a long form for small lengths.
        assert_eq!(decode_length(&[0x81, 0x05]).unwrap(), (5, 2));
    }
}
