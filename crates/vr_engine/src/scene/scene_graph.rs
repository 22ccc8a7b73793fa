//! Scene graph arena
//!
//! Owns every [`SceneNode`] and enforces the hierarchy invariants: the
//! parent/child relation stays acyclic, every node has at most one parent, and
//! any change that can alter a subtree's extent marks the bounding-volume cache
//! dirty from the changed node up to the root.

use std::sync::{Arc, PoisonError};

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Vec3, transform_position};
use crate::render::frustum::{build_frustum, is_box_in_frustum};
use super::bounding_volume::{AABB, BoundingVolume};
use super::components::{
    Camera, CameraRig, Eye, Mesh, NodeTransform, PickableVolume, RenderData,
};
use super::node::{NodeId, QueryId, ReleaseList, SceneNode};
use super::{SceneError, SceneResult};

/// One ray-pick intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Node whose volume was hit
    pub node: NodeId,
    /// Distance from the ray origin, world units
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
}

/// Result of testing one node against a camera's frustum
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrustumTest {
    pub in_frustum: bool,
    pub in_lod_range: bool,
    pub mvp: Mat4,
}

/// Arena of scene nodes
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    released_queries: ReleaseList,
    bounding_volume_recomputations: u64,
}

impl SceneGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ---- node lifecycle ----

    /// Create a standalone node: no parent, no children, no components
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let node = SceneNode::new(name.into(), Arc::clone(&self.released_queries));
        self.nodes.insert(node)
    }

    /// Destroy a detached node together with its whole subtree.
    ///
    /// The nodes' occlusion queries are queued for deletion on the GPU.
    pub fn destroy_node(&mut self, id: NodeId) -> SceneResult<()> {
        if self.node(id)?.parent.is_some() {
            return Err(SceneError::StillAttached(id));
        }
        let subtree = self.subtree(id);
        log::trace!("Destroying {} node(s) rooted at {:?}", subtree.len(), id);
        for node in subtree {
            self.nodes.remove(node);
        }
        Ok(())
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> SceneResult<&SceneNode> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// True if `id` names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    // ---- hierarchy ----

    /// Append `child` to `parent`'s children, detaching it from any previous parent.
    ///
    /// Fails with [`SceneError::CycleDetected`] without touching either subtree
    /// when `child` is `parent` or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node(parent)?;
        let previous_parent = self.node(child)?.parent;

        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::CycleDetected { parent, child });
        }

        if let Some(previous) = previous_parent {
            if previous == parent {
                self.dirty_bounding_volume(parent);
                return Ok(());
            }
            self.unlink(previous, child);
            self.dirty_bounding_volume(previous);
        }

        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.invalidate_world_matrices(child);
        self.dirty_bounding_volume(parent);
        Ok(())
    }

    /// Unlink `child` if it is a child of `parent`.
    ///
    /// Returns whether anything was removed. `parent` is marked dirty either way.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<bool> {
        self.node(parent)?;
        let is_child = self.nodes.get(child).and_then(|c| c.parent) == Some(parent);
        if is_child {
            self.unlink(parent, child);
            self.nodes[child].parent = None;
            self.invalidate_world_matrices(child);
        }
        self.dirty_bounding_volume(parent);
        Ok(is_child)
    }

    /// Detach every child of `parent`, returning them in their former order
    pub fn remove_all_children(&mut self, parent: NodeId) -> SceneResult<Vec<NodeId>> {
        let children = std::mem::take(&mut self.node_mut(parent)?.children);
        for &child in &children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
            self.invalidate_world_matrices(child);
        }
        self.dirty_bounding_volume(parent);
        Ok(children)
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Children of `id`, in insertion order
    pub fn children(&self, id: NodeId) -> SceneResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Number of children of `id`
    pub fn child_count(&self, id: NodeId) -> SceneResult<usize> {
        Ok(self.node(id)?.children.len())
    }

    /// Child of `id` at `index`
    pub fn child_at(&self, id: NodeId, index: usize) -> SceneResult<NodeId> {
        let children = &self.node(id)?.children;
        children.get(index).copied().ok_or(SceneError::IndexOutOfRange {
            index,
            len: children.len(),
        })
    }

    /// Every node below `id`, pre-order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> SceneResult<Vec<NodeId>> {
        self.node(id)?;
        let mut nodes = self.subtree(id);
        nodes.remove(0);
        Ok(nodes)
    }

    /// True if `ancestor` is `node` or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// `id` followed by its descendants in pre-order
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(node.children.iter().rev());
        }
        order
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
    }

    // ---- components ----

    /// Attach a transform, returning the detached previous one
    pub fn attach_transform(
        &mut self,
        id: NodeId,
        mut transform: NodeTransform,
    ) -> SceneResult<Option<NodeTransform>> {
        let node = self.node_mut(id)?;
        transform.set_owner(Some(id));
        let previous = node.transform.replace(transform).map(|mut t| {
            t.set_owner(None);
            t
        });
        self.invalidate_world_matrices(id);
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Detach the transform
    pub fn detach_transform(&mut self, id: NodeId) -> SceneResult<Option<NodeTransform>> {
        let previous = self.node_mut(id)?.transform.take().map(|mut t| {
            t.set_owner(None);
            t
        });
        self.invalidate_world_matrices(id);
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Edit the transform, creating an identity one if the node has none
    pub fn update_transform(
        &mut self,
        id: NodeId,
        update: impl FnOnce(&mut NodeTransform),
    ) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        let transform = node.transform.get_or_insert_with(|| {
            let mut transform = NodeTransform::default();
            transform.set_owner(Some(id));
            transform
        });
        update(transform);
        self.invalidate_world_matrices(id);
        self.dirty_bounding_volume(id);
        Ok(())
    }

    /// Attach render data, returning the detached previous one
    pub fn attach_render_data(
        &mut self,
        id: NodeId,
        mut render_data: RenderData,
    ) -> SceneResult<Option<RenderData>> {
        let node = self.node_mut(id)?;
        render_data.set_owner(Some(id));
        let previous = node.render_data.replace(render_data).map(|mut r| {
            r.set_owner(None);
            r
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Detach the render data
    pub fn detach_render_data(&mut self, id: NodeId) -> SceneResult<Option<RenderData>> {
        let previous = self.node_mut(id)?.render_data.take().map(|mut r| {
            r.set_owner(None);
            r
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Mutable render data. The node is marked dirty since the mesh may change.
    pub fn render_data_mut(&mut self, id: NodeId) -> SceneResult<&mut RenderData> {
        self.node(id)?;
        self.dirty_bounding_volume(id);
        self.node_mut(id)?
            .render_data
            .as_mut()
            .ok_or(SceneError::MissingComponent { node: id, component: "render data" })
    }

    /// Replace the mesh of the node's render data
    pub fn set_mesh(&mut self, id: NodeId, mesh: Option<Arc<Mesh>>) -> SceneResult<()> {
        self.render_data_mut(id)?.set_mesh(mesh);
        Ok(())
    }

    /// Attach a camera, returning the detached previous one
    pub fn attach_camera(&mut self, id: NodeId, mut camera: Camera) -> SceneResult<Option<Camera>> {
        let node = self.node_mut(id)?;
        camera.set_owner(Some(id));
        let previous = node.camera.replace(camera).map(|mut c| {
            c.set_owner(None);
            c
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Detach the camera
    pub fn detach_camera(&mut self, id: NodeId) -> SceneResult<Option<Camera>> {
        let previous = self.node_mut(id)?.camera.take().map(|mut c| {
            c.set_owner(None);
            c
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Mutable camera
    pub fn camera_mut(&mut self, id: NodeId) -> SceneResult<&mut Camera> {
        self.node_mut(id)?
            .camera
            .as_mut()
            .ok_or(SceneError::MissingComponent { node: id, component: "camera" })
    }

    /// Attach a camera rig and place its eye nodes half the separation apart
    pub fn attach_camera_rig(
        &mut self,
        id: NodeId,
        mut rig: CameraRig,
    ) -> SceneResult<Option<CameraRig>> {
        self.node(id)?;
        let half = rig.camera_separation() * 0.5;
        for (eye, x) in [(Eye::Left, -half), (Eye::Right, half)] {
            let eye_node = rig.camera_for(eye);
            if self.contains(eye_node) {
                self.update_transform(eye_node, |t| t.set_position(Vec3::new(x, 0.0, 0.0)))?;
            }
        }

        rig.set_owner(Some(id));
        let previous = self.node_mut(id)?.camera_rig.replace(rig).map(|mut r| {
            r.set_owner(None);
            r
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Detach the camera rig
    pub fn detach_camera_rig(&mut self, id: NodeId) -> SceneResult<Option<CameraRig>> {
        let previous = self.node_mut(id)?.camera_rig.take().map(|mut r| {
            r.set_owner(None);
            r
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Attach a pickable volume, returning the detached previous one
    pub fn attach_pickable(
        &mut self,
        id: NodeId,
        mut pickable: PickableVolume,
    ) -> SceneResult<Option<PickableVolume>> {
        let node = self.node_mut(id)?;
        pickable.set_owner(Some(id));
        let previous = node.pickable.replace(pickable).map(|mut p| {
            p.set_owner(None);
            p
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Detach the pickable volume
    pub fn detach_pickable(&mut self, id: NodeId) -> SceneResult<Option<PickableVolume>> {
        let previous = self.node_mut(id)?.pickable.take().map(|mut p| {
            p.set_owner(None);
            p
        });
        self.dirty_bounding_volume(id);
        Ok(previous)
    }

    /// Mutable pickable volume
    pub fn pickable_mut(&mut self, id: NodeId) -> SceneResult<&mut PickableVolume> {
        self.node_mut(id)?
            .pickable
            .as_mut()
            .ok_or(SceneError::MissingComponent { node: id, component: "pickable volume" })
    }

    // ---- transforms ----

    fn local_matrix(&self, id: NodeId) -> Mat4 {
        self.nodes
            .get(id)
            .and_then(|n| n.transform.as_ref())
            .map_or_else(Mat4::identity, NodeTransform::matrix)
    }

    /// Model matrix: the product of local matrices from the root down to `id`.
    ///
    /// Walks up to the nearest cached ancestor, then fills the cache on the
    /// way back down.
    pub fn world_matrix(&mut self, id: NodeId) -> SceneResult<Mat4> {
        let mut uncached = Vec::new();
        let mut world = Mat4::identity();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            if let Some(cached) = node.world_matrix {
                world = cached;
                break;
            }
            uncached.push(node_id);
            current = node.parent;
        }

        for &node_id in uncached.iter().rev() {
            world = world * self.local_matrix(node_id);
            self.nodes[node_id].world_matrix = Some(world);
        }
        Ok(world)
    }

    /// World-space position of the node's origin
    pub fn world_position(&mut self, id: NodeId) -> SceneResult<Vec3> {
        let world = self.world_matrix(id)?;
        Ok(Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]))
    }

    /// Inverse of the world matrix, `None` if it is singular
    pub fn view_matrix(&mut self, id: NodeId) -> SceneResult<Option<Mat4>> {
        Ok(self.world_matrix(id)?.try_inverse())
    }

    /// Drop cached world matrices below `id`.
    ///
    /// A node is only cached after its parent, so an uncached node has no
    /// cached descendants and the walk stops there.
    fn invalidate_world_matrices(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            if node.world_matrix.take().is_some() {
                stack.extend(node.children.iter().copied());
            }
        }
    }

    // ---- bounding volumes ----

    /// Mark `id` and its ancestors as needing a bounding-volume recompute.
    ///
    /// Stops at the first node that is already dirty: its ancestors are too.
    pub fn dirty_bounding_volume(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get_mut(node_id) else {
                break;
            };
            if node.bounding_volume_dirty {
                break;
            }
            node.bounding_volume_dirty = true;
            current = node.parent;
        }
    }

    /// The node's bounding volume in its own model space.
    ///
    /// Covers the node's mesh and, recursively, every child's volume carried
    /// through that child's local transform. Cached until the node is dirtied.
    pub fn bounding_volume(&mut self, id: NodeId) -> SceneResult<BoundingVolume> {
        // dirty nodes in pre-order; a clean node has a clean subtree
        let mut dirty = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            if node.bounding_volume_dirty {
                dirty.push(current);
                stack.extend(node.children.iter().copied());
            }
        }

        // reversed, every child is rebuilt before its parent
        for &node_id in dirty.iter().rev() {
            let node = &self.nodes[node_id];
            let mut volume = node
                .render_data
                .as_ref()
                .and_then(RenderData::mesh)
                .map(|mesh| *mesh.bounding_volume())
                .unwrap_or_default();
            for &child in &node.children {
                let local = self.local_matrix(child);
                volume.expand(&self.nodes[child].bounding_volume.transformed(&local));
            }

            let node = &mut self.nodes[node_id];
            node.bounding_volume = volume;
            node.bounding_volume_dirty = false;
            self.bounding_volume_recomputations += 1;
        }
        Ok(self.nodes[id].bounding_volume)
    }

    /// The node's bounding volume in world space
    pub fn world_bounding_volume(&mut self, id: NodeId) -> SceneResult<BoundingVolume> {
        let local = self.bounding_volume(id)?;
        let world = self.world_matrix(id)?;
        Ok(local.transformed(&world))
    }

    /// How many times any node's bounding volume has been rebuilt
    pub fn bounding_volume_recomputations(&self) -> u64 {
        self.bounding_volume_recomputations
    }

    // ---- visibility ----

    /// Feed one visibility report into the node's hysteresis filter
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> SceneResult<()> {
        self.node_mut(id)?.set_visible(visible);
        Ok(())
    }

    /// Only draw the node while the camera is between `min` and `max` away.
    ///
    /// Negative bounds are clamped to zero.
    pub fn set_lod_range(&mut self, id: NodeId, min: f32, max: f32) -> SceneResult<()> {
        let (min, max) = (min.max(0.0), max.max(0.0));
        let node = self.node_mut(id)?;
        node.lod_min_range = min * min;
        node.lod_max_range = max * max;
        node.using_lod = true;
        Ok(())
    }

    /// Draw the node at any distance
    pub fn clear_lod_range(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        node.lod_min_range = 0.0;
        node.lod_max_range = f32::MAX;
        node.using_lod = false;
        Ok(())
    }

    /// Decide whether `id` should be skipped when drawing through `camera`.
    ///
    /// Returns `true` (cull) for hidden nodes, nodes without a mesh, nodes
    /// whose mesh box lies outside the frustum of `view_projection * model`,
    /// and nodes outside their LOD range.
    pub fn cull(&mut self, id: NodeId, camera: NodeId, view_projection: &Mat4) -> SceneResult<bool> {
        if !self.node(id)?.is_visible() {
            return Ok(true);
        }
        let camera_position = self.world_position(camera)?;
        let test = self.frustum_test(id, &camera_position, view_projection)?;
        Ok(!test.is_some_and(|t| t.is_kept()))
    }

    /// Frustum and LOD test without the visibility check.
    ///
    /// `None` when the node has no mesh to test. Records `in_frustum` on the
    /// node and, when inside, the squared camera distance on its render data.
    pub(crate) fn frustum_test(
        &mut self,
        id: NodeId,
        camera_position: &Vec3,
        view_projection: &Mat4,
    ) -> SceneResult<Option<FrustumTest>> {
        let mesh = self
            .node(id)?
            .render_data
            .as_ref()
            .and_then(RenderData::mesh)
            .cloned();
        let Some(mesh) = mesh else {
            return Ok(None);
        };

        let mvp = view_projection * self.world_matrix(id)?;
        let frustum = build_frustum(&mvp);
        let aabb = mesh.aabb();
        let in_frustum = is_box_in_frustum(&frustum, &aabb.min, &aabb.max);

        let mut in_lod_range = true;
        if in_frustum {
            let distance = self.update_camera_distance(id, camera_position)?;
            let node = &self.nodes[id];
            if node.using_lod {
                in_lod_range = node.lod_min_range <= distance && distance <= node.lod_max_range;
            }
        }
        self.nodes[id].in_frustum = in_frustum;

        Ok(Some(FrustumTest {
            in_frustum,
            in_lod_range,
            mvp,
        }))
    }

    /// Record on the node's render data the squared distance from
    /// `camera_position` to its world bounding-sphere centre
    pub(crate) fn update_camera_distance(&mut self, id: NodeId, camera_position: &Vec3) -> SceneResult<f32> {
        let center = self.world_bounding_volume(id)?.center();
        let distance = (center - camera_position).norm_squared();
        if let Some(render_data) = self.node_mut(id)?.render_data.as_mut() {
            render_data.set_camera_distance(distance);
        }
        Ok(distance)
    }

    // ---- picking and collision ----

    /// Nodes with an enabled pickable volume hit by a world-space ray, nearest first
    pub fn pick(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        visible_only: bool,
    ) -> SceneResult<Vec<PickHit>> {
        let candidates: Vec<(NodeId, AABB)> = self
            .nodes
            .iter()
            .filter(|(_, n)| !visible_only || n.is_visible())
            .filter_map(|(id, n)| {
                let pickable = n.pickable.as_ref().filter(|p| p.enabled)?;
                match pickable.volume() {
                    Some(volume) if !volume.is_empty() => Some((id, volume.aabb())),
                    Some(_) => None,
                    None => n.render_data.as_ref().and_then(RenderData::mesh).map(|m| (id, m.aabb())),
                }
            })
            .collect();

        let mut hits = Vec::new();
        for (id, aabb) in candidates {
            let world = self.world_matrix(id)?;
            let Some(inverse) = world.try_inverse() else {
                continue;
            };
            let local_origin = transform_position(&inverse, &origin);
            let local_direction = inverse.fixed_view::<3, 3>(0, 0) * direction;
            if let Some(t) = aabb.intersect_ray(local_origin, local_direction) {
                let point = transform_position(&world, &(local_origin + local_direction * t));
                hits.push(PickHit {
                    node: id,
                    distance: (point - origin).norm(),
                    point,
                });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(hits)
    }

    /// True when the world-space mesh boxes of `a` and `b` overlap
    pub fn is_colliding(&mut self, a: NodeId, b: NodeId) -> SceneResult<bool> {
        let box_a = self.world_mesh_box(a)?;
        let box_b = self.world_mesh_box(b)?;
        Ok(box_a.intersects(&box_b))
    }

    fn world_mesh_box(&mut self, id: NodeId) -> SceneResult<AABB> {
        let mesh = self
            .node(id)?
            .render_data
            .as_ref()
            .and_then(RenderData::mesh)
            .cloned()
            .ok_or(SceneError::MissingComponent { node: id, component: "mesh" })?;
        let world = self.world_matrix(id)?;
        Ok(mesh.transformed_bounding_box(&world))
    }

    // ---- occlusion query bookkeeping ----

    /// Take the ids of queries whose nodes were destroyed since the last call
    pub fn drain_released_queries(&self) -> Vec<QueryId> {
        std::mem::take(
            &mut *self
                .released_queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl FrustumTest {
    /// Inside the frustum and the LOD range
    pub(crate) fn is_kept(&self) -> bool {
        self.in_frustum && self.in_lod_range
    }
}
