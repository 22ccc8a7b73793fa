//! Draw list and render-order sorting
//!
//! Culling produces one [`DrawItem`] per visible render data. The list is
//! stably sorted before submission: queue order first, then the shader tag so
//! programs batch, then distance (back to front inside the transparent queue),
//! then material and face culling for fewer state changes.

use std::cmp::Ordering;

use crate::scene::NodeId;
use crate::scene::components::{CullFace, MaterialId, RenderData, RenderQueue};
use super::shader::ShaderType;

/// Sort key of one visible render data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    /// Node owning the render data
    pub node: NodeId,
    /// Queue position
    pub rendering_order: i32,
    /// Shader-type tag of the material
    pub shader_type: ShaderType,
    /// Material identity, for batching
    pub material: MaterialId,
    /// Face culling mode
    pub cull_face: CullFace,
    /// Squared distance to the camera, refreshed every pass
    pub camera_distance: f32,
}

impl DrawItem {
    /// Key for `render_data` on `node`; `None` if it has no material
    pub fn from_render_data(node: NodeId, render_data: &RenderData) -> Option<Self> {
        let material = render_data.material()?;
        Some(Self {
            node,
            rendering_order: render_data.rendering_order,
            shader_type: material.shader_type(),
            material: material.id(),
            cull_face: render_data.cull_face,
            camera_distance: render_data.camera_distance(),
        })
    }
}

/// Comparator used to order the draw list
pub type RenderOrderFn = dyn Fn(&DrawItem, &DrawItem) -> Ordering + Send + Sync;

/// Default ordering: queue, shader, transparent distance, material, cull face, distance
pub fn compare_by_order_shader_distance(a: &DrawItem, b: &DrawItem) -> Ordering {
    a.rendering_order
        .cmp(&b.rendering_order)
        .then_with(|| a.shader_type.cmp(&b.shader_type))
        .then_with(|| {
            if RenderQueue::is_transparent(a.rendering_order) {
                b.camera_distance.total_cmp(&a.camera_distance)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.material.cmp(&b.material))
        .then_with(|| a.cull_face.cmp(&b.cull_face))
        .then_with(|| a.camera_distance.total_cmp(&b.camera_distance))
}

/// Visible items of one camera pass, in submission order once sorted
#[derive(Debug, Default, Clone)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    /// Create an empty draw list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item
    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    /// Stable sort with `compare`
    pub fn sort(&mut self, compare: &RenderOrderFn) {
        self.items.sort_by(|a, b| compare(a, b));
    }

    /// Items in current order
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is visible
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Nodes in current order
    pub fn nodes(&self) -> Vec<NodeId> {
        self.items.iter().map(|i| i.node).collect()
    }

    /// Forget all items
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn item(node: NodeId, order: i32, distance: f32) -> DrawItem {
        DrawItem {
            node,
            rendering_order: order,
            shader_type: ShaderType::UNLIT,
            material: MaterialId(1),
            cull_face: CullFace::Back,
            camera_distance: distance,
        }
    }

    fn sorted(items: Vec<DrawItem>) -> Vec<NodeId> {
        let mut list = DrawList::new();
        for i in items {
            list.push(i);
        }
        list.sort(&compare_by_order_shader_distance);
        list.nodes()
    }

    #[test]
    fn test_queue_order_first() {
        let n = ids(3);
        let order = sorted(vec![
            item(n[0], RenderQueue::OVERLAY, 1.0),
            item(n[1], RenderQueue::BACKGROUND, 1.0),
            item(n[2], RenderQueue::GEOMETRY, 1.0),
        ]);
        assert_eq!(order, vec![n[1], n[2], n[0]]);
    }

    #[test]
    fn test_transparent_back_to_front_opaque_front_to_back() {
        let n = ids(4);
        let order = sorted(vec![
            item(n[0], RenderQueue::TRANSPARENT, 1.0),
            item(n[1], RenderQueue::TRANSPARENT, 9.0),
            item(n[2], RenderQueue::GEOMETRY, 9.0),
            item(n[3], RenderQueue::GEOMETRY, 1.0),
        ]);
        assert_eq!(order, vec![n[3], n[2], n[1], n[0]]);
    }

    #[test]
    fn test_shader_batches_before_distance() {
        let n = ids(3);
        let mut cube = item(n[0], RenderQueue::GEOMETRY, 1.0);
        cube.shader_type = ShaderType::CUBEMAP;
        let order = sorted(vec![
            cube,
            item(n[1], RenderQueue::GEOMETRY, 5.0),
            item(n[2], RenderQueue::GEOMETRY, 3.0),
        ]);
        assert_eq!(order, vec![n[2], n[1], n[0]]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let n = ids(3);
        let order = sorted(vec![
            item(n[0], RenderQueue::GEOMETRY, 2.0),
            item(n[1], RenderQueue::GEOMETRY, 2.0),
            item(n[2], RenderQueue::GEOMETRY, 2.0),
        ]);
        assert_eq!(order, n);
    }
}
