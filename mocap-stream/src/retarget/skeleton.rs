//! Arena-backed joint tree
//!
//! For hosts without a scene graph of their own: joints live in one `Vec`
//! and refer to each other by index.

use super::JointHierarchy;
use crate::pose::names_match;
use glam::{Affine3A, Quat, Vec3};

/// Index of a joint in a [`Skeleton`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(usize);

impl JointId {
    /// Arena index
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Joint {
    name: String,
    parent: Option<JointId>,
    children: Vec<JointId>,
    local_position: Vec3,
    local_rotation: Quat,
}

impl Joint {
    fn local_transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.local_rotation, self.local_position)
    }
}

/// Joint tree with unit scale
///
/// Joints are never removed, so a `JointId` stays valid for the lifetime
/// of the skeleton that issued it.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
}

impl Skeleton {
    /// Empty skeleton
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, joint: Joint) -> JointId {
        let id = JointId(self.joints.len());
        if let Some(parent) = joint.parent {
            self.joints[parent.0].children.push(id);
        }
        self.joints.push(joint);
        id
    }

    /// Add a joint without a parent
    pub fn add_root(&mut self, name: impl Into<String>, position: Vec3, rotation: Quat) -> JointId {
        self.push(Joint {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local_position: position,
            local_rotation: rotation,
        })
    }

    /// Add a joint as the last child of `parent`
    pub fn add_joint(
        &mut self,
        parent: JointId,
        name: impl Into<String>,
        position: Vec3,
        rotation: Quat,
    ) -> JointId {
        self.push(Joint {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            local_position: position,
            local_rotation: rotation,
        })
    }

    /// First joint in insertion order whose name matches, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<JointId> {
        self.joints
            .iter()
            .position(|j| names_match(&j.name, name))
            .map(JointId)
    }

    /// Parent of a joint
    pub fn parent(&self, id: JointId) -> Option<JointId> {
        self.joints[id.0].parent
    }

    /// Number of joints
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// True if the skeleton has no joints
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

impl JointHierarchy for Skeleton {
    type Node = JointId;

    fn name(&self, node: JointId) -> &str {
        &self.joints[node.0].name
    }

    fn children(&self, node: JointId) -> impl Iterator<Item = JointId> + '_ {
        self.joints[node.0].children.iter().copied()
    }

    fn local_rotation(&self, node: JointId) -> Quat {
        self.joints[node.0].local_rotation
    }

    fn set_local_rotation(&mut self, node: JointId, rotation: Quat) {
        self.joints[node.0].local_rotation = rotation;
    }

    fn local_position(&self, node: JointId) -> Vec3 {
        self.joints[node.0].local_position
    }

    fn set_local_position(&mut self, node: JointId, position: Vec3) {
        self.joints[node.0].local_position = position;
    }

    fn world_transform(&self, node: JointId) -> Affine3A {
        let mut joint = &self.joints[node.0];
        let mut transform = joint.local_transform();
        while let Some(parent) = joint.parent {
            joint = &self.joints[parent.0];
            transform = joint.local_transform() * transform;
        }
        transform
    }

    fn parent_world_to_local(&self, node: JointId) -> Affine3A {
        match self.joints[node.0].parent {
            Some(parent) => self.world_transform(parent).inverse(),
            None => Affine3A::IDENTITY,
        }
    }
}
