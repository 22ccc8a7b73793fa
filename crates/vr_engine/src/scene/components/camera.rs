//! Camera component

use crate::foundation::math::{Mat4, Mat4Ext, Vec4};
use crate::scene::NodeId;
use super::{PostEffectData, RenderMask};

/// A projection plus the per-camera pass settings.
///
/// The view matrix is not stored here; it is the inverse of the owning node's
/// world matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Mat4,
    /// Clear color of the target this camera renders into
    pub background_color: Vec4,
    /// Eye bits; render data whose mask does not intersect it are skipped
    pub render_mask: RenderMask,
    post_effects: Vec<PostEffectData>,
    owner: Option<NodeId>,
}

impl Camera {
    /// Camera with an explicit projection matrix
    pub fn new(projection: Mat4, render_mask: RenderMask) -> Self {
        Self {
            projection,
            background_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            render_mask,
            post_effects: Vec::new(),
            owner: None,
        }
    }

    /// Perspective camera, `fov_y` in radians
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32, render_mask: RenderMask) -> Self {
        Self::new(Mat4::perspective(fov_y, aspect, near, far), render_mask)
    }

    /// Builder: background color
    pub fn with_background(mut self, color: Vec4) -> Self {
        self.background_color = color;
        self
    }

    /// Builder: append a post effect
    pub fn with_post_effect(mut self, effect: PostEffectData) -> Self {
        self.post_effects.push(effect);
        self
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Replace the projection
    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Post-effect stages, applied in order
    pub fn post_effects(&self) -> &[PostEffectData] {
        &self.post_effects
    }

    /// Append a post-effect stage
    pub fn add_post_effect(&mut self, effect: PostEffectData) {
        self.post_effects.push(effect);
    }

    /// Remove and return the stage at `index`
    pub fn remove_post_effect(&mut self, index: usize) -> Option<PostEffectData> {
        (index < self.post_effects.len()).then(|| self.post_effects.remove(index))
    }

    /// Remove every post-effect stage
    pub fn clear_post_effects(&mut self) {
        self.post_effects.clear();
    }

    /// Node this component is attached to
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }
}
