//! Capture stream wire protocol
//!
//! # Datagram Layout
//!
//! ```text
//! ┌────────────────────┬─────────────────┬──────────────────────┐
//! │ Signature (8)      │ Kind (4)        │ Payload (variable)   │
//! │ ASCII "iPiMocap"   │ i32 LE          │ kind-specific        │
//! └────────────────────┴─────────────────┴──────────────────────┘
//! ```
//!
//! | Kind | Payload |
//! |------|---------|
//! | 0 (Pose) | `f32 x, y, z` root position, `i32` count, count x `f32 x, y, z, w` |
//! | 1 (Names) | `i32` count, count x 7-bit length prefixed UTF-8 string |
//!
//! All numbers are little-endian. Rotations in a pose packet are indexed by
//! the most recent names packet; the first name is the root joint.
//!
//! # Coordinate Conversion
//!
//! The sender is right-handed, the host left-handed. Decoding negates the x
//! component of positions and the y and z components of rotations.
//! [`writer`] applies the same flips when encoding, so a host-space pose
//! written and read back is unchanged.
//!
//! # Error Handling
//!
//! UDP guarantees nothing, so every decode either yields a complete value or
//! an error; the receive loop drops errored datagrams.

pub mod classify;
pub mod names;
pub mod pose;
pub mod reader;
pub mod writer;

pub use classify::{classify, read_kind};
pub use names::{NameTable, decode_names};
pub use pose::decode_pose;
pub use reader::PayloadReader;

/// Fixed signature at the start of every datagram
pub const SIGNATURE: &[u8; 8] = b"iPiMocap";

/// Size of the kind tag following the signature
pub const KIND_LEN: usize = 4;

/// Message kind carried after the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Root position plus one rotation per name table entry
    Pose = 0,
    /// Replacement name table
    Names = 1,
}

impl PacketKind {
    /// Map a wire tag to a kind
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Pose),
            1 => Some(Self::Names),
            _ => None,
        }
    }

    /// Wire tag for this kind
    pub fn tag(self) -> i32 {
        self as i32
    }
}
