//! Datagram signature check and kind extraction

use super::{KIND_LEN, PacketKind, SIGNATURE};
use crate::error::{Error, Result};

/// Read the raw kind tag of a datagram
///
/// Explains why a datagram is rejected; [`classify`] is the lossy
/// front door used by the receive loop.
pub fn read_kind(datagram: &[u8]) -> Result<i32> {
    if !datagram.starts_with(SIGNATURE) {
        return Err(Error::SignatureMismatch);
    }
    let header_len = SIGNATURE.len() + KIND_LEN;
    if datagram.len() < header_len {
        return Err(Error::Truncated {
            needed: header_len,
            available: datagram.len(),
        });
    }
    let mut kind = [0u8; KIND_LEN];
    kind.copy_from_slice(&datagram[SIGNATURE.len()..header_len]);
    Ok(i32::from_le_bytes(kind))
}

/// Classify a datagram and split off its payload
///
/// Returns `None` for anything that is not a pose or names packet.
pub fn classify(datagram: &[u8]) -> Option<(PacketKind, &[u8])> {
    let tag = read_kind(datagram).ok()?;
    let kind = PacketKind::from_tag(tag)?;
    Some((kind, &datagram[SIGNATURE.len() + KIND_LEN..]))
}
