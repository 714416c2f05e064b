//! mocap-stream - Real-time skeletal pose streaming over UDP
//!
//! Receives poses from a motion-capture application and applies them to a
//! joint hierarchy supplied by the host.
//!
//! ## Usage
//!
//! ```no_run
//! use glam::{Quat, Vec3};
//! use mocap_stream::{MocapListener, Retargeter, Skeleton};
//!
//! let listener = MocapListener::bind(31455)?;
//!
//! let mut skeleton = Skeleton::new();
//! let character = skeleton.add_root("Character", Vec3::ZERO, Quat::IDENTITY);
//! skeleton.add_joint(character, "Hips", Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
//!
//! let mut retargeter = Retargeter::new();
//! // Once per frame:
//! retargeter.tick(&listener, &mut skeleton, character);
//!
//! listener.stop();
//! # Ok::<(), mocap_stream::Error>(())
//! ```
//!
//! ## Modules
//!
//! - `protocol`: datagram classification, decoding and encoding
//! - `listener`: background UDP receive thread
//! - `cache`: latest-wins pose hand-off
//! - `retarget`: applying poses to a joint tree

pub mod cache;
pub mod config;
pub mod error;
pub mod listener;
pub mod pose;
pub mod protocol;
pub mod retarget;

// Re-export commonly used types
pub use cache::PoseCache;
pub use config::ListenerConfig;
pub use error::{Error, Result};
pub use listener::{ListenerState, MocapListener, StatsSnapshot};
pub use pose::Pose;
pub use protocol::{NameTable, PacketKind};
pub use retarget::{JointHierarchy, JointId, Retargeter, Skeleton};
