//! Frame header encoding/decoding
//!
//! The frame format uses a fixed-width textual header:
//! - header: 64 ASCII bytes, the body length as a left-aligned decimal
//!   integer padded with spaces
//! - body: exactly the declared number of bytes
//!
//! Both peers must agree on the header width out of band; it is a
//! protocol constant and is never negotiated at runtime.

use crate::error::ProtocolError;

/// Width of the frame header in bytes
pub const HEADER_LEN: usize = 64;

/// Default read-side limit on the declared body length (16 MiB)
///
/// The header has room for absurdly large lengths, so readers cap what
/// they are willing to buffer before allocating.
pub const DEFAULT_MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// Encode a body length into a fixed-width header
///
/// Returns an error if the decimal representation of `len` does not fit
/// within [`HEADER_LEN`] digits.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_LEN], ProtocolError> {
    let digits = len.to_string();
    if digits.len() > HEADER_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut header = [b' '; HEADER_LEN];
    header[..digits.len()].copy_from_slice(digits.as_bytes());
    Ok(header)
}

/// Parse a fixed-width header into a body length
///
/// The space padding is trimmed before parsing; anything other than a
/// non-negative decimal integer is rejected.
pub fn parse_header(header: &[u8]) -> Result<usize, ProtocolError> {
    let text = std::str::from_utf8(header)
        .map_err(|_| ProtocolError::InvalidHeader("non-ASCII header".to_string()))?;

    let trimmed = text.trim_matches(' ');
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidHeader(format!(
            "not a decimal length: {trimmed:?}"
        )));
    }

    trimmed
        .parse::<usize>()
        .map_err(|e| ProtocolError::InvalidHeader(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        for len in [0usize, 1, 42, 12345, DEFAULT_MAX_BODY_LEN] {
            let header = encode_header(len).unwrap();
            assert_eq!(header.len(), HEADER_LEN);
            assert_eq!(parse_header(&header).unwrap(), len);
        }
    }

    #[test]
    fn test_header_is_left_aligned_and_padded() {
        let header = encode_header(42).unwrap();
        assert_eq!(&header[..2], b"42");
        assert!(header[2..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let mut header = [b' '; HEADER_LEN];
        header[..5].copy_from_slice(b"abcde");
        assert!(matches!(
            parse_header(&header),
            Err(ProtocolError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_parse_rejects_blank_header() {
        let header = [b' '; HEADER_LEN];
        assert!(matches!(
            parse_header(&header),
            Err(ProtocolError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_parse_rejects_negative() {
        let mut header = [b' '; HEADER_LEN];
        header[..2].copy_from_slice(b"-1");
        assert!(matches!(
            parse_header(&header),
            Err(ProtocolError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_parse_rejects_embedded_space() {
        let mut header = [b' '; HEADER_LEN];
        header[..4].copy_from_slice(b"1 2 ");
        assert!(matches!(
            parse_header(&header),
            Err(ProtocolError::InvalidHeader(_))
        ));
    }
}
