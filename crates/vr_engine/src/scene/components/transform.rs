//! Local transform component

use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
use crate::scene::NodeId;

/// Position, rotation and scale of a node relative to its parent.
///
/// Edit it through [`SceneGraph::update_transform`](crate::scene::SceneGraph::update_transform)
/// once attached, so the cached world matrices of the subtree are invalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTransform {
    local: Transform,
    owner: Option<NodeId>,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::new(Transform::identity())
    }
}

impl NodeTransform {
    /// Wrap a local transform
    pub fn new(local: Transform) -> Self {
        Self { local, owner: None }
    }

    /// Translation-only transform
    pub fn from_position(position: Vec3) -> Self {
        Self::new(Transform::from_position(position))
    }

    /// The local transform
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// The local matrix (translation * rotation * scale)
    pub fn matrix(&self) -> Mat4 {
        self.local.to_matrix()
    }

    /// Node this component is attached to
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    /// Set the position relative to the parent
    pub fn set_position(&mut self, position: Vec3) {
        self.local.position = position;
    }

    /// Set the rotation relative to the parent
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.local.rotation = rotation;
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.local.scale = scale;
    }

    /// Move by `delta` in parent space
    pub fn translate(&mut self, delta: Vec3) {
        self.local.position += delta;
    }

    /// Apply `rotation` after the current rotation
    pub fn rotate(&mut self, rotation: Quat) {
        self.local.rotation = rotation * self.local.rotation;
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }
}
