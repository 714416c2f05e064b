//! Decoded capture sample

use glam::{Quat, Vec3};

/// One capture sample in host coordinate space
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Joint treated as the motion root; `None` skips root transfer
    pub root_name: Option<String>,
    /// Root joint position
    pub root_position: Vec3,
    /// Joint rotations in name table order
    pub rotations: Vec<(String, Quat)>,
}

impl Pose {
    /// Pose without a root or rotations
    pub fn empty() -> Self {
        Self {
            root_name: None,
            root_position: Vec3::ZERO,
            rotations: Vec::new(),
        }
    }

    /// Rotation for a joint, matched ignoring case
    pub fn rotation(&self, joint: &str) -> Option<Quat> {
        let key = fold_name(joint);
        self.rotations
            .iter()
            .find(|(name, _)| fold_name(name) == key)
            .map(|(_, q)| *q)
    }

    /// Number of joints carried by this sample
    pub fn joint_count(&self) -> usize {
        self.rotations.len()
    }
}

/// Case-fold a joint name for comparison
///
/// Full Unicode lowercase mapping, so `"HÜFTE"` and `"hüfte"` compare equal.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Compare two joint names ignoring case
pub fn names_match(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    fold_name(a) == fold_name(b)
}
