//! Render data: what a node draws and with which per-draw state

use std::sync::Arc;

use bitflags::bitflags;

use super::{Material, Mesh};
use crate::scene::NodeId;

bitflags! {
    /// Which eye (or pass) a render data or camera participates in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderMask: u32 {
        /// Left eye
        const LEFT = 0x1;
        /// Right eye
        const RIGHT = 0x2;
        /// Both eyes
        const BOTH = Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

impl Default for RenderMask {
    fn default() -> Self {
        RenderMask::BOTH
    }
}

/// Standard rendering-order queues. Lower values draw first.
#[derive(Debug, Clone, Copy)]
pub struct RenderQueue;

impl RenderQueue {
    /// Stencil writers, before everything else
    pub const STENCIL: i32 = -1000;
    /// Skyboxes and backdrops
    pub const BACKGROUND: i32 = 1000;
    /// Opaque geometry
    pub const GEOMETRY: i32 = 2000;
    /// Blended geometry, sorted back to front
    pub const TRANSPARENT: i32 = 3000;
    /// HUD and other always-on-top content
    pub const OVERLAY: i32 = 4000;

    /// True if `order` falls in the back-to-front sorted range
    pub fn is_transparent(order: i32) -> bool {
        (Self::TRANSPARENT..Self::OVERLAY).contains(&order)
    }
}

/// Face culling mode for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CullFace {
    /// Cull back faces
    #[default]
    Back,
    /// Cull front faces
    Front,
    /// No face culling
    None,
}

/// Polygon offset applied while this render data draws
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonOffset {
    /// Scale factor for the variable depth offset
    pub factor: f32,
    /// Constant depth offset
    pub units: f32,
}

/// Mesh, material and pass toggles of one drawable node
#[derive(Debug, Clone)]
pub struct RenderData {
    mesh: Option<Arc<Mesh>>,
    material: Option<Arc<Material>>,
    /// Eyes this node is drawn for
    pub render_mask: RenderMask,
    /// Queue position, see [`RenderQueue`]
    pub rendering_order: i32,
    /// Face culling for this draw
    pub cull_face: CullFace,
    /// Depth testing for this draw
    pub depth_test: bool,
    /// Alpha blending for this draw
    pub alpha_blend: bool,
    /// Polygon offset fill, off when `None`
    pub polygon_offset: Option<PolygonOffset>,
    camera_distance: f32,
    owner: Option<NodeId>,
}

impl Default for RenderData {
    fn default() -> Self {
        Self {
            mesh: None,
            material: None,
            render_mask: RenderMask::BOTH,
            rendering_order: RenderQueue::GEOMETRY,
            cull_face: CullFace::Back,
            depth_test: true,
            alpha_blend: true,
            polygon_offset: None,
            camera_distance: 0.0,
            owner: None,
        }
    }
}

impl RenderData {
    /// Empty render data; draws nothing until a mesh and material are set
    pub fn new() -> Self {
        Self::default()
    }

    /// Render data for a mesh with a material
    pub fn with_mesh_and_material(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        let mut data = Self {
            mesh: Some(mesh),
            ..Self::default()
        };
        data.set_material(material);
        data
    }

    /// Builder: render mask
    pub fn with_render_mask(mut self, mask: RenderMask) -> Self {
        self.render_mask = mask;
        self
    }

    /// Builder: rendering order
    pub fn with_rendering_order(mut self, order: i32) -> Self {
        self.rendering_order = order;
        self
    }

    /// The mesh, if any
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// The material, if any
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    /// Replace the mesh.
    ///
    /// Once attached, go through
    /// [`SceneGraph::set_mesh`](crate::scene::SceneGraph::set_mesh) so the
    /// node's bounding volume is invalidated.
    pub fn set_mesh(&mut self, mesh: Option<Arc<Mesh>>) {
        self.mesh = mesh;
    }

    /// Replace the material and move between the opaque and transparent queues
    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = Some(material);
        self.adjust_rendering_order_for_transparency();
    }

    /// Move to `TRANSPARENT` when the material blends, back to `GEOMETRY` when it stops.
    ///
    /// Background, stencil and overlay queues are left alone.
    pub fn adjust_rendering_order_for_transparency(&mut self) {
        let Some(material) = &self.material else {
            return;
        };
        if material.is_transparent() {
            if (RenderQueue::GEOMETRY..RenderQueue::TRANSPARENT).contains(&self.rendering_order) {
                self.rendering_order = RenderQueue::TRANSPARENT;
            }
        } else if RenderQueue::is_transparent(self.rendering_order) {
            self.rendering_order = RenderQueue::GEOMETRY;
        }
    }

    /// True when both a mesh and a material are present
    pub fn is_drawable(&self) -> bool {
        self.mesh.is_some() && self.material.is_some()
    }

    /// Squared camera distance written by the last cull
    pub fn camera_distance(&self) -> f32 {
        self.camera_distance
    }

    /// Node this component is attached to
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub(crate) fn set_camera_distance(&mut self, distance: f32) {
        self.camera_distance = distance;
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }
}
