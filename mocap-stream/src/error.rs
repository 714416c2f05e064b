//! Error types for mocap-stream

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mocap-stream error types
///
/// Decode errors never leave the receive thread: a datagram that fails to
/// decode is dropped. They are public so hosts decoding captured datagrams
/// offline can see why a packet was rejected.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (socket bind, config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Config parsed but holds an unusable value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Datagram does not start with the capture signature
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// Kind tag is neither pose nor names
    #[error("Unknown packet kind: {0}")]
    UnknownPacketKind(i32),

    /// A read ran past the end of the datagram
    #[error("Truncated packet: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the payload
        available: usize,
    },

    /// A count field was negative
    #[error("Negative count: {0}")]
    NegativeCount(i32),

    /// Length-prefixed string was malformed
    #[error("Invalid string: {0}")]
    InvalidString(&'static str),

    /// Name table holds two names that only differ by case
    #[error("Duplicate joint name: {0}")]
    DuplicateJointName(String),

    /// Pose carries a different number of rotations than the name table
    #[error("Rotation count mismatch: name table has {expected}, packet has {actual}")]
    RotationCountMismatch {
        /// Current name table length
        expected: usize,
        /// Count declared by the packet
        actual: i32,
    },

    /// Receive thread could not be started
    #[error("Failed to spawn receive thread: {0}")]
    ThreadSpawn(String),
}
