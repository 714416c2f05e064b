//! Applying decoded poses to a host skeleton
//!
//! The host exposes its joint tree through [`JointHierarchy`] and calls
//! [`Retargeter::apply_pose`] once per frame with the node that represents
//! the whole character. Per call:
//!
//! 1. Resolve the root joint named by the pose (depth-first, ignoring case,
//!    never the character node itself). A new root clears the joint cache.
//! 2. Shift the character's local position by the difference between the
//!    pose's root position and the root joint's current position, both in
//!    the character's parent space. The shift is relative, so positioning
//!    the host applies on its own is kept.
//! 3. Copy each named rotation onto the matching joint's local rotation.
//!
//! Missing roots, unknown joints and absent poses are normal and skipped
//! silently.

pub mod skeleton;

pub use skeleton::{JointId, Skeleton};

use crate::listener::MocapListener;
use crate::pose::{Pose, fold_name, names_match};
use glam::{Affine3A, Quat, Vec3};
use std::collections::HashMap;
use std::hash::Hash;

/// Access to a host's joint tree
///
/// `Node` is whatever handle the host uses for a joint: an arena index, an
/// entity id, a pointer wrapper.
pub trait JointHierarchy {
    /// Joint handle
    type Node: Copy + Eq + Hash;

    /// Joint name
    fn name(&self, node: Self::Node) -> &str;

    /// Direct children, in traversal order
    fn children(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> + '_;

    /// Rotation relative to the parent
    fn local_rotation(&self, node: Self::Node) -> Quat;

    /// Replace the rotation relative to the parent
    fn set_local_rotation(&mut self, node: Self::Node, rotation: Quat);

    /// Position relative to the parent
    fn local_position(&self, node: Self::Node) -> Vec3;

    /// Replace the position relative to the parent
    fn set_local_position(&mut self, node: Self::Node, position: Vec3);

    /// Local-to-world transform
    fn world_transform(&self, node: Self::Node) -> Affine3A;

    /// World-to-local transform of the node's parent (identity for a root)
    fn parent_world_to_local(&self, node: Self::Node) -> Affine3A;
}

/// Depth-first search for a joint by name, ignoring case
///
/// `include_start` decides whether `start` itself may match.
pub fn find_joint<H: JointHierarchy>(
    hierarchy: &H,
    start: H::Node,
    name: &str,
    include_start: bool,
) -> Option<H::Node> {
    if include_start && names_match(hierarchy.name(start), name) {
        return Some(start);
    }
    hierarchy
        .children(start)
        .find_map(|child| find_joint(hierarchy, child, name, true))
}

/// Per-character pose applicator
///
/// Keeps the resolved root joint and a memo of name lookups under it.
#[derive(Debug)]
pub struct Retargeter<N> {
    root: Option<N>,
    /// Folded joint name -> resolved joint (misses cached as `None`)
    joints: HashMap<String, Option<N>>,
}

impl<N> Default for Retargeter<N> {
    fn default() -> Self {
        Self {
            root: None,
            joints: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> Retargeter<N> {
    /// Applicator with nothing resolved yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently resolved root joint
    pub fn root(&self) -> Option<N> {
        self.root
    }

    /// Number of memoized joint lookups, misses included
    pub fn cached_joints(&self) -> usize {
        self.joints.len()
    }

    /// Forget the root and every cached lookup
    ///
    /// Call after the host rebuilds or reparents the rig.
    pub fn reset(&mut self) {
        self.root = None;
        self.joints.clear();
    }

    /// Fetch the newest pose from `listener` and apply it
    ///
    /// Returns false when no new pose arrived this frame.
    pub fn tick<H>(&mut self, listener: &MocapListener, hierarchy: &mut H, host: N) -> bool
    where
        H: JointHierarchy<Node = N>,
    {
        match listener.fetch_latest_pose() {
            Some(pose) => {
                self.apply_pose(&pose, hierarchy, host);
                true
            }
            None => false,
        }
    }

    /// Apply one pose to the character rooted at `host`
    pub fn apply_pose<H>(&mut self, pose: &Pose, hierarchy: &mut H, host: N)
    where
        H: JointHierarchy<Node = N>,
    {
        self.update_root(pose.root_name.as_deref(), hierarchy, host);
        let Some(root) = self.root else {
            return;
        };

        // The pose positions the root joint, not the character: move the
        // character by however far the root is from its target.
        let to_parent = hierarchy.parent_world_to_local(host);
        let root_world = Vec3::from(hierarchy.world_transform(root).translation);
        let current = to_parent.transform_point3(root_world);
        let delta = pose.root_position - current;
        let position = hierarchy.local_position(host) + delta;
        hierarchy.set_local_position(host, position);

        for (name, rotation) in &pose.rotations {
            let joint = *self
                .joints
                .entry(fold_name(name))
                .or_insert_with(|| find_joint(&*hierarchy, root, name, true));
            if let Some(joint) = joint {
                hierarchy.set_local_rotation(joint, *rotation);
            }
        }
    }

    fn update_root<H>(&mut self, root_name: Option<&str>, hierarchy: &H, host: N)
    where
        H: JointHierarchy<Node = N>,
    {
        let resolved = match root_name.filter(|name| !name.is_empty()) {
            None => None,
            Some(name) => {
                if let Some(current) = self.root
                    && names_match(hierarchy.name(current), name)
                {
                    return;
                }
                let found = find_joint(hierarchy, host, name, false);
                if found.is_none() {
                    log::trace!("Root joint {} not found", name);
                }
                found
            }
        };

        if resolved != self.root {
            log::debug!(
                "Root joint changed to {:?}",
                resolved.map(|node| hierarchy.name(node).to_owned())
            );
            self.root = resolved;
            // Reachable joints depend on the root subtree
            self.joints.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    /// World -> Character -> {Hips -> Spine -> Head, Pelvis -> Tail}
    fn rig() -> (Skeleton, JointId) {
        let mut s = Skeleton::new();
        let world = s.add_root("World", Vec3::new(0.0, 0.0, 10.0), Quat::IDENTITY);
        let character = s.add_joint(world, "Character", Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY);
        let hips = s.add_joint(character, "Hips", Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
        let spine = s.add_joint(hips, "Spine", Vec3::new(0.0, 0.3, 0.0), Quat::IDENTITY);
        s.add_joint(spine, "Head", Vec3::new(0.0, 0.5, 0.0), Quat::IDENTITY);
        let pelvis = s.add_joint(character, "Pelvis", Vec3::new(0.0, 0.8, -0.2), Quat::IDENTITY);
        s.add_joint(pelvis, "Tail", Vec3::new(0.0, 0.0, -0.5), Quat::IDENTITY);
        (s, character)
    }

    fn pose(root: Option<&str>, position: Vec3, joints: &[(&str, Quat)]) -> Pose {
        Pose {
            root_name: root.map(str::to_owned),
            root_position: position,
            rotations: joints.iter().map(|(n, q)| (n.to_string(), *q)).collect(),
        }
    }

    fn root_in_parent_space(s: &Skeleton, host: JointId, root: JointId) -> Vec3 {
        s.parent_world_to_local(host)
            .transform_point3(Vec3::from(s.world_transform(root).translation))
    }

    #[test]
    fn test_root_resolved_ignoring_case() {
        let (mut s, character) = rig();
        let mut r = Retargeter::new();
        r.apply_pose(&pose(Some("hips"), Vec3::ZERO, &[]), &mut s, character);
        assert_eq!(r.root(), s.find_by_name("Hips"));
    }

    #[test]
    fn test_root_delta_is_additive() {
        let (mut s, character) = rig();
        let hips = s.find_by_name("Hips").unwrap();
        let mut r = Retargeter::new();

        // Root currently at (5, 1, 0) in World space
        let target = Vec3::new(2.0, 1.0, 3.0);
        let before = root_in_parent_space(&s, character, hips);
        assert_relative_eq!(before.x, 5.0, epsilon = 1e-5);

        r.apply_pose(&pose(Some("hips"), target, &[]), &mut s, character);
        let moved = s.local_position(character);
        let expected = Vec3::new(5.0, 0.0, 0.0) + (target - before);
        assert_relative_eq!(moved.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(moved.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(moved.z, expected.z, epsilon = 1e-5);

        let after = root_in_parent_space(&s, character, hips);
        assert_relative_eq!(after.x, target.x, epsilon = 1e-5);
        assert_relative_eq!(after.y, target.y, epsilon = 1e-5);
        assert_relative_eq!(after.z, target.z, epsilon = 1e-5);

        // Root already on target: nothing moves
        r.apply_pose(&pose(Some("Hips"), target, &[]), &mut s, character);
        let again = s.local_position(character);
        assert_relative_eq!(again.x, moved.x, epsilon = 1e-5);
        assert_relative_eq!(again.z, moved.z, epsilon = 1e-5);

        // Only the root's displacement is added on top of the current offset
        let next = target + Vec3::new(0.5, 0.0, 0.0);
        r.apply_pose(&pose(Some("Hips"), next, &[]), &mut s, character);
        let shifted = s.local_position(character);
        assert_relative_eq!(shifted.x, moved.x + 0.5, epsilon = 1e-4);
        assert_relative_eq!(shifted.y, moved.y, epsilon = 1e-4);
        assert_relative_eq!(shifted.z, moved.z, epsilon = 1e-4);
    }

    #[test]
    fn test_root_delta_in_rotated_parent_space() {
        let mut s = Skeleton::new();
        let world = s.add_root(
            "World",
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_y(FRAC_PI_2),
        );
        let character = s.add_joint(world, "Character", Vec3::ZERO, Quat::from_rotation_y(0.4));
        let hips = s.add_joint(character, "Hips", Vec3::new(0.2, 1.0, 0.3), Quat::IDENTITY);

        let target = Vec3::new(-3.0, 0.9, 4.0);
        let mut r = Retargeter::new();
        r.apply_pose(&pose(Some("Hips"), target, &[]), &mut s, character);

        let after = root_in_parent_space(&s, character, hips);
        assert_relative_eq!(after.x, target.x, epsilon = 1e-4);
        assert_relative_eq!(after.y, target.y, epsilon = 1e-4);
        assert_relative_eq!(after.z, target.z, epsilon = 1e-4);
    }

    #[test]
    fn test_rotations_applied_by_name() {
        let (mut s, character) = rig();
        let mut r = Retargeter::new();
        let spine_rot = Quat::from_rotation_x(0.3);
        let head_rot = Quat::from_rotation_z(-0.2);
        r.apply_pose(
            &pose(
                Some("Hips"),
                Vec3::ZERO,
                &[
                    ("Hips", Quat::IDENTITY),
                    ("SPINE", spine_rot),
                    ("head", head_rot),
                    ("LeftToeBase", Quat::from_rotation_y(1.0)),
                ],
            ),
            &mut s,
            character,
        );

        assert_eq!(s.local_rotation(s.find_by_name("Spine").unwrap()), spine_rot);
        assert_eq!(s.local_rotation(s.find_by_name("Head").unwrap()), head_rot);
        // Unknown joint memoized as a miss
        assert_eq!(r.cached_joints(), 4);
    }

    #[test]
    fn test_root_change_invalidates_cache() {
        let (mut s, character) = rig();
        let spine = s.find_by_name("Spine").unwrap();
        let tail = s.find_by_name("Tail").unwrap();
        let mut r = Retargeter::new();

        let a = Quat::from_rotation_x(0.1);
        r.apply_pose(
            &pose(Some("Hips"), Vec3::ZERO, &[("Spine", a), ("Tail", a)]),
            &mut s,
            character,
        );
        // Tail is outside the Hips subtree
        assert_eq!(s.local_rotation(spine), a);
        assert_eq!(s.local_rotation(tail), Quat::IDENTITY);

        let b = Quat::from_rotation_x(0.7);
        r.apply_pose(
            &pose(Some("Pelvis"), Vec3::ZERO, &[("Spine", b), ("Tail", b)]),
            &mut s,
            character,
        );
        assert_eq!(r.root(), s.find_by_name("Pelvis"));
        // Tail re-evaluated under the new root, Spine no longer reachable
        assert_eq!(s.local_rotation(tail), b);
        assert_eq!(s.local_rotation(spine), a);
    }

    #[test]
    fn test_absent_root_skips_frame() {
        let (mut s, character) = rig();
        let mut r = Retargeter::new();
        r.apply_pose(&pose(Some("Hips"), Vec3::ZERO, &[]), &mut s, character);
        assert!(r.root().is_some());

        let start = s.local_position(character);
        let spine = s.find_by_name("Spine").unwrap();
        let rot = Quat::from_rotation_y(0.5);
        r.apply_pose(&pose(None, Vec3::splat(9.0), &[("Spine", rot)]), &mut s, character);
        assert_eq!(r.root(), None);
        assert_eq!(r.cached_joints(), 0);
        assert_eq!(s.local_position(character), start);
        assert_eq!(s.local_rotation(spine), Quat::IDENTITY);

        r.apply_pose(&pose(Some(""), Vec3::splat(9.0), &[("Spine", rot)]), &mut s, character);
        assert_eq!(r.root(), None);
    }

    #[test]
    fn test_unknown_root_skips_frame() {
        let (mut s, character) = rig();
        let mut r = Retargeter::new();
        let start = s.local_position(character);
        r.apply_pose(&pose(Some("Root"), Vec3::splat(3.0), &[]), &mut s, character);
        assert_eq!(r.root(), None);
        assert_eq!(s.local_position(character), start);
    }

    #[test]
    fn test_host_node_never_matches_as_root() {
        let mut s = Skeleton::new();
        let host = s.add_root("Hips", Vec3::ZERO, Quat::IDENTITY);
        let inner = s.add_joint(host, "HIPS", Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
        let mut r = Retargeter::new();
        r.apply_pose(&pose(Some("hips"), Vec3::new(0.0, 1.0, 0.0), &[]), &mut s, host);
        assert_eq!(r.root(), Some(inner));
    }

    #[test]
    fn test_reset_forgets_root() {
        let (mut s, character) = rig();
        let mut r = Retargeter::new();
        r.apply_pose(
            &pose(Some("Hips"), Vec3::ZERO, &[("Spine", Quat::IDENTITY)]),
            &mut s,
            character,
        );
        assert_eq!(r.cached_joints(), 1);
        r.reset();
        assert_eq!(r.root(), None);
        assert_eq!(r.cached_joints(), 0);
    }

    #[test]
    fn test_find_joint_depth_first() {
        let mut s = Skeleton::new();
        let top = s.add_root("Top", Vec3::ZERO, Quat::IDENTITY);
        let a = s.add_joint(top, "A", Vec3::ZERO, Quat::IDENTITY);
        let deep = s.add_joint(a, "Target", Vec3::ZERO, Quat::IDENTITY);
        s.add_joint(top, "target", Vec3::ZERO, Quat::IDENTITY);

        assert_eq!(find_joint(&s, top, "TARGET", true), Some(deep));
        assert_eq!(find_joint(&s, top, "top", true), Some(top));
        assert_eq!(find_joint(&s, top, "top", false), None);
    }
}
