//! Link code bit packing (RFC 3626 Section 6.1.1): bits 0-1 link type,
//! bits 2-3 neighbor type, bits 4-7 reserved (zero).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("link type {0} out of range 0-3")]
    InvalidLinkType(u8),
    #[error("neighbor type {0} out of range 0-3")]
    InvalidNeighborType(u8),
}

/// Pack a link type and neighbor type into a single link-code byte.
pub fn make_link_code(link_type: u8, neighbor_type: u8) -> Result<u8, CodecError> {
    if link_type > 3 {
        return Err(CodecError::InvalidLinkType(link_type));
    }
    if neighbor_type > 3 {
        return Err(CodecError::InvalidNeighborType(neighbor_type));
    }
    Ok((neighbor_type << 2) | link_type)
}

/// Split a link-code byte back into `(link_type, neighbor_type)`, each 0-3.
/// Always succeeds: masking guarantees both fields land in range.
pub fn decode_link_code(code: u8) -> (u8, u8) {
    (code & 0x03, (code >> 2) & 0x03)
}
