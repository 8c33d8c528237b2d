// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Frame encoding.
//!
//! Wire format:
//! ```text
//! ┌──────────────────┬──────────────┬──────────────┬──────────────┬──────────┐
//! │ Identifier (8B)  │ Size (4B LE) │ Reserved (4B)│ Payload      │ <EOF>\n  │
//! │ ASCII, '_' fill  │ payload len  │ all zero     │ (Size bytes) │ (6B)     │
//! └──────────────────┴──────────────┴──────────────┴──────────────┴──────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use crate::protocol::{EOF_MARKER, HEADER_SIZE, ID_FILL, ID_LEN};

// ============================================================================
// Error Types
// ============================================================================

/// Content that cannot be represented on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("identifier {0:?} is longer than 8 bytes")]
    IdentifierTooLong(String),

    #[error("identifier {0:?} is not ASCII")]
    NonAsciiIdentifier(String),

    #[error("non-ASCII byte 0x{byte:02X} at offset {offset}")]
    NonAsciiPayload { offset: usize, byte: u8 },

    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("command token is empty")]
    EmptyToken,
}

/// A byte sequence that is not a single well-formed frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame truncated ({have} bytes, need {need})")]
    Truncated { have: usize, need: usize },

    #[error("identifier field is not ASCII")]
    NonAsciiIdentifier,

    #[error("reserved header bytes are not zero")]
    ReservedNotZero,

    #[error("missing <EOF> terminator")]
    MissingTerminator,

    #[error("{0} unexpected bytes after terminator")]
    TrailingBytes(usize),
}

// ============================================================================
// Identifier
// ============================================================================

/// An identifier right-padded with `_` to exactly eight ASCII bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId([u8; ID_LEN]);

impl FrameId {
    pub fn new(id: &str) -> Result<Self, EncodingError> {
        if !id.is_ascii() {
            return Err(EncodingError::NonAsciiIdentifier(id.to_string()));
        }
        if id.len() > ID_LEN {
            return Err(EncodingError::IdentifierTooLong(id.to_string()));
        }

        let mut bytes = [ID_FILL; ID_LEN];
        bytes[..id.len()].copy_from_slice(id.as_bytes());
        Ok(FrameId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Always ASCII, see `new` and `decode`
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FrameId::new(s)
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// The three wire segments of one frame, in send order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame<'a> {
    pub id: FrameId,
    pub header: [u8; HEADER_SIZE],
    pub payload: &'a [u8],
}

impl EncodedFrame<'_> {
    pub fn terminator(&self) -> &'static [u8] {
        EOF_MARKER
    }

    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + EOF_MARKER.len()
    }

    /// The full frame as one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(self.payload);
        out.extend_from_slice(EOF_MARKER);
        out
    }
}

pub fn encode_header(id: &FrameId, size: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..ID_LEN].copy_from_slice(id.as_bytes());
    header[ID_LEN..ID_LEN + 4].copy_from_slice(&size.to_le_bytes());
    header
}

/// Reject payloads that contain anything outside 7-bit ASCII.
pub fn check_ascii(payload: &[u8]) -> Result<(), EncodingError> {
    match payload.iter().position(|b| !b.is_ascii()) {
        Some(offset) => Err(EncodingError::NonAsciiPayload {
            offset,
            byte: payload[offset],
        }),
        None => Ok(()),
    }
}

/// Encode `payload` under an already validated identifier.
pub fn encode_with_id(id: FrameId, payload: &[u8]) -> Result<EncodedFrame<'_>, EncodingError> {
    check_ascii(payload)?;
    let size = u32::try_from(payload.len()).map_err(|_| EncodingError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;

    Ok(EncodedFrame {
        id,
        header: encode_header(&id, size),
        payload,
    })
}

pub fn encode<'a>(id: &str, payload: &'a [u8]) -> Result<EncodedFrame<'a>, EncodingError> {
    encode_with_id(FrameId::new(id)?, payload)
}

// ============================================================================
// Decoding
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    pub id: FrameId,
    pub payload: &'a [u8],
}

/// Wire length of the frame whose header starts `wire`.
fn frame_len(wire: &[u8]) -> Result<usize, DecodeError> {
    if wire.len() < HEADER_SIZE {
        return Err(DecodeError::Truncated {
            have: wire.len(),
            need: HEADER_SIZE,
        });
    }

    let mut size = [0u8; 4];
    size.copy_from_slice(&wire[ID_LEN..ID_LEN + 4]);
    let size = u32::from_le_bytes(size) as usize;

    HEADER_SIZE
        .checked_add(size)
        .and_then(|len| len.checked_add(EOF_MARKER.len()))
        .ok_or(DecodeError::Truncated {
            have: wire.len(),
            need: usize::MAX,
        })
}

/// Parse exactly one complete frame.
pub fn decode(wire: &[u8]) -> Result<DecodedFrame<'_>, DecodeError> {
    let need = frame_len(wire)?;

    let mut id = [0u8; ID_LEN];
    id.copy_from_slice(&wire[..ID_LEN]);
    if !id.is_ascii() {
        return Err(DecodeError::NonAsciiIdentifier);
    }
    if wire[ID_LEN + 4..HEADER_SIZE].iter().any(|&b| b != 0) {
        return Err(DecodeError::ReservedNotZero);
    }

    if wire.len() < need {
        return Err(DecodeError::Truncated {
            have: wire.len(),
            need,
        });
    }
    let payload_end = need - EOF_MARKER.len();
    if &wire[payload_end..need] != EOF_MARKER {
        return Err(DecodeError::MissingTerminator);
    }
    if wire.len() > need {
        return Err(DecodeError::TrailingBytes(wire.len() - need));
    }

    Ok(DecodedFrame {
        id: FrameId(id),
        payload: &wire[HEADER_SIZE..payload_end],
    })
}

/// Parse a capture of back-to-back frames, such as a chunked transfer.
pub fn decode_all(mut wire: &[u8]) -> Result<Vec<DecodedFrame<'_>>, DecodeError> {
    let mut frames = Vec::new();
    while !wire.is_empty() {
        // A short tail is reported by decode with the full length it needs
        let len = frame_len(wire)?.min(wire.len());
        let (frame, rest) = wire.split_at(len);
        frames.push(decode(frame)?);
        wire = rest;
    }
    Ok(frames)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::*;

    #[test]
    fn test_identifier_padding() {
        assert_eq!(FrameId::new("WIN").unwrap().as_bytes(), b"WIN_____");
        assert_eq!(FrameId::new("DATAOUT").unwrap().as_bytes(), b"DATAOUT_");
        assert_eq!(FrameId::new("").unwrap().as_bytes(), b"________");
        assert_eq!(FrameId::new("CMD_ESN_").unwrap().as_bytes(), b"CMD_ESN_");

        for len in 0..=ID_LEN {
            let id = "A".repeat(len);
            let padded = FrameId::new(&id).unwrap();
            assert_eq!(&padded.as_bytes()[..len], id.as_bytes());
            assert!(padded.as_bytes()[len..].iter().all(|&b| b == ID_FILL));
        }
    }

    #[test]
    fn test_well_known_identifiers_are_full_width() {
        for id in [ID_WIN, ID_WX, ID_WOUT, ID_DATAIN, ID_DATAOUT, ID_CMD_ESN, ID_CMD_RST, ID_CMD_RDI] {
            assert_eq!(FrameId::new(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn test_identifier_rejected() {
        assert_eq!(
            FrameId::new("DATAIN___"),
            Err(EncodingError::IdentifierTooLong("DATAIN___".to_string()))
        );
        assert!(matches!(
            FrameId::new("WÏN"),
            Err(EncodingError::NonAsciiIdentifier(_))
        ));
        assert!("TOOLONGID".parse::<FrameId>().is_err());
    }

    #[test]
    fn test_encode_reference_frame() {
        let frame = encode("WIN", b"1.0\n2.0\n").unwrap();

        let mut expected_header = b"WIN_____".to_vec();
        expected_header.extend_from_slice(&[8, 0, 0, 0]);
        expected_header.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(frame.header.as_slice(), expected_header.as_slice());

        let mut expected = expected_header.clone();
        expected.extend_from_slice(b"1.0\n2.0\n");
        expected.extend_from_slice(b"<EOF>\n");
        assert_eq!(frame.to_bytes(), expected);
        assert_eq!(frame.wire_len(), 30);
        assert_eq!(frame.terminator(), b"<EOF>\n");
    }

    #[test]
    fn test_size_field_is_little_endian() {
        let id = FrameId::new("DATAIN").unwrap();
        let header = encode_header(&id, 0x0102_0304);
        assert_eq!(&header[8..12], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&header[12..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_payload() {
        let frame = encode(ID_CMD_ESN, b"").unwrap();
        assert_eq!(frame.wire_len(), HEADER_SIZE + EOF_MARKER.len());
        assert_eq!(&frame.header[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_non_ascii_payload_rejected() {
        let err = encode("WX", b"0.5\n\xB0C\n").unwrap_err();
        assert_eq!(err, EncodingError::NonAsciiPayload { offset: 4, byte: 0xB0 });
    }

    #[test]
    fn test_decode_inverts_encode() {
        let payloads: [&[u8]; 4] = [b"", b"1.0\n", b"-0.25\n3.5e-2\n", &[b'7'; 1000]];
        for payload in payloads {
            let wire = encode("WOUT", payload).unwrap().to_bytes();
            let decoded = decode(&wire).unwrap();
            assert_eq!(decoded.id.as_str(), ID_WOUT);
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let wire = encode("WIN", b"1.0\n").unwrap().to_bytes();

        assert_eq!(
            decode(&wire[..10]),
            Err(DecodeError::Truncated { have: 10, need: HEADER_SIZE })
        );
        assert_eq!(
            decode(&wire[..wire.len() - 1]),
            Err(DecodeError::Truncated { have: wire.len() - 1, need: wire.len() })
        );

        let mut bad_reserved = wire.clone();
        bad_reserved[13] = 1;
        assert_eq!(decode(&bad_reserved), Err(DecodeError::ReservedNotZero));

        let mut bad_marker = wire.clone();
        let last = bad_marker.len() - 2;
        bad_marker[last] = b'X';
        assert_eq!(decode(&bad_marker), Err(DecodeError::MissingTerminator));

        let mut trailing = wire.clone();
        trailing.extend_from_slice(b"xx");
        assert_eq!(decode(&trailing), Err(DecodeError::TrailingBytes(2)));
    }

    #[test]
    fn test_decode_size_near_u32_max_is_truncated() {
        let id = FrameId::new("DATAIN").unwrap();
        let mut wire = encode_header(&id, u32::MAX).to_vec();
        wire.extend_from_slice(b"1.0\n<EOF>\n");

        assert!(matches!(
            decode(&wire),
            Err(DecodeError::Truncated { have, .. }) if have == wire.len()
        ));
        assert!(decode_all(&wire).is_err());
    }

    #[test]
    fn test_decode_all_splits_back_to_back_frames() {
        let mut wire = encode("DATAIN", b"1\n2\n").unwrap().to_bytes();
        wire.extend(encode("DATAIN", b"3\n").unwrap().to_bytes());
        wire.extend(encode("ESN", b"").unwrap().to_bytes());

        let frames = decode_all(&wire).unwrap();
        let seen: Vec<(&str, &[u8])> = frames.iter().map(|f| (f.id.as_str(), f.payload)).collect();
        assert_eq!(
            seen,
            vec![("DATAIN__", &b"1\n2\n"[..]), ("DATAIN__", &b"3\n"[..]), ("ESN_____", &b""[..])]
        );

        let cut = wire.len() - 3;
        assert_eq!(
            decode_all(&wire[..cut]),
            Err(DecodeError::Truncated { have: HEADER_SIZE + EOF_MARKER.len() - 3, need: HEADER_SIZE + EOF_MARKER.len() })
        );
        assert_eq!(decode_all(&[]), Ok(Vec::new()));
    }
}
