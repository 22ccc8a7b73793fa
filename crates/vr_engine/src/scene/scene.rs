//! Scene: a graph with a root, feature toggles and a redraw flag

use crate::core::config::SceneSettings;
use crate::foundation::math::{Vec3, Vec4};
use super::components::Eye;
use super::{NodeId, PickHit, SceneError, SceneGraph, SceneResult};

/// What the renderer draws.
///
/// Mutable access to the graph marks the scene dirty; the render pass skips a
/// clean scene entirely. Call [`Scene::end_frame`] once every camera of the
/// frame has rendered.
#[derive(Debug)]
pub struct Scene {
    graph: SceneGraph,
    root: NodeId,
    settings: SceneSettings,
    dirty: bool,
    main_camera_rig: Option<NodeId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with default settings
    pub fn new() -> Self {
        Self::with_settings(SceneSettings::default())
    }

    /// Empty scene with the given settings
    pub fn with_settings(settings: SceneSettings) -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.create_node("root");
        Self {
            graph,
            root,
            settings,
            dirty: true,
            main_camera_rig: None,
        }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read-only graph access
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable graph access; marks the scene dirty
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        self.dirty = true;
        &mut self.graph
    }

    /// Graph access for the render pass, which must not force a redraw
    pub(crate) fn graph_for_render(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Put an existing node directly under the root
    pub fn add_node(&mut self, id: NodeId) -> SceneResult<()> {
        let root = self.root;
        self.graph_mut().add_child(root, id)
    }

    /// Take a node out from under the root
    pub fn remove_node(&mut self, id: NodeId) -> SceneResult<bool> {
        let root = self.root;
        self.graph_mut().remove_child(root, id)
    }

    /// Detach everything from the root
    pub fn clear(&mut self) -> SceneResult<Vec<NodeId>> {
        let root = self.root;
        self.main_camera_rig = None;
        self.graph_mut().remove_all_children(root)
    }

    /// Every node reachable from the root, pre-order, root first
    pub fn whole_scene_nodes(&self) -> Vec<NodeId> {
        self.graph.subtree(self.root)
    }

    /// Current feature toggles
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// Replace the feature toggles
    pub fn apply_settings(&mut self, settings: SceneSettings) {
        if settings != self.settings {
            log::debug!("Scene settings changed: {:?}", settings);
            self.settings = settings;
            self.dirty = true;
        }
    }

    /// Toggle frustum culling
    pub fn set_frustum_culling(&mut self, enabled: bool) {
        self.apply_settings(self.settings.with_frustum_culling(enabled));
    }

    /// Toggle occlusion culling
    pub fn set_occlusion_culling(&mut self, enabled: bool) {
        self.apply_settings(self.settings.with_occlusion_culling(enabled));
    }

    /// Toggle frame statistics
    pub fn set_stats_enabled(&mut self, enabled: bool) {
        self.apply_settings(self.settings.with_stats(enabled));
    }

    /// True if something changed since the last [`Scene::end_frame`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a redraw on the next frame
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Close the frame; until the next mutation the render pass is skipped
    pub fn end_frame(&mut self) {
        self.dirty = false;
    }

    /// Choose the node whose camera rig drives stereo rendering and picking
    pub fn set_main_camera_rig(&mut self, id: NodeId) -> SceneResult<()> {
        if self.graph.node(id)?.camera_rig().is_none() {
            return Err(SceneError::MissingComponent {
                node: id,
                component: "camera rig",
            });
        }
        self.main_camera_rig = Some(id);
        self.dirty = true;
        Ok(())
    }

    /// Node carrying the main camera rig
    pub fn main_camera_rig(&self) -> Option<NodeId> {
        self.main_camera_rig
    }

    /// Camera node of the main rig for `eye`
    pub fn main_camera(&self, eye: Eye) -> Option<NodeId> {
        let rig = self.main_camera_rig?;
        self.graph.node(rig).ok()?.camera_rig().map(|r| r.camera_for(eye))
    }

    /// Ray pick honouring the `pick_visible` setting
    pub fn pick(&mut self, origin: Vec3, direction: Vec3) -> SceneResult<Vec<PickHit>> {
        let visible_only = self.settings.pick_visible;
        self.graph.pick(origin, direction, visible_only)
    }

    /// Pick along the forward (-Z) axis of a camera node
    pub fn pick_from_camera(&mut self, camera: NodeId) -> SceneResult<Vec<PickHit>> {
        let world = self.graph.world_matrix(camera)?;
        let origin = Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]);
        let forward = world * Vec4::new(0.0, 0.0, -1.0, 0.0);
        let direction = Vec3::new(forward.x, forward.y, forward.z);
        self.pick(origin, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::components::{CameraRig, Material, Mesh, NodeTransform, PickableVolume, RenderData};
    use std::sync::Arc;

    #[test]
    fn test_graph_mut_marks_dirty_and_end_frame_clears() {
        let mut scene = Scene::new();
        assert!(scene.is_dirty());
        scene.end_frame();
        assert!(!scene.is_dirty());

        let _ = scene.graph();
        assert!(!scene.is_dirty());

        scene.graph_mut().create_node("n");
        assert!(scene.is_dirty());
    }

    #[test]
    fn test_settings_change_marks_dirty_only_when_different() {
        let mut scene = Scene::new();
        scene.end_frame();
        scene.set_frustum_culling(true);
        assert!(!scene.is_dirty());
        scene.set_occlusion_culling(true);
        assert!(scene.is_dirty());
        assert!(scene.settings().occlusion_culling);
    }

    #[test]
    fn test_whole_scene_nodes_lists_subtree_of_root() {
        let mut scene = Scene::new();
        let a = scene.graph_mut().create_node("a");
        let b = scene.graph_mut().create_node("b");
        let stray = scene.graph_mut().create_node("stray");
        scene.add_node(a).unwrap();
        scene.graph_mut().add_child(a, b).unwrap();

        let nodes = scene.whole_scene_nodes();
        assert_eq!(nodes, vec![scene.root(), a, b]);
        assert!(!nodes.contains(&stray));
    }

    #[test]
    fn test_main_camera_rig_requires_rig() {
        let mut scene = Scene::new();
        let head = scene.graph_mut().create_node("head");
        assert!(matches!(
            scene.set_main_camera_rig(head),
            Err(SceneError::MissingComponent { .. })
        ));

        let left = scene.graph_mut().create_node("left");
        let right = scene.graph_mut().create_node("right");
        scene.graph_mut().attach_camera_rig(head, CameraRig::new(left, right, head)).unwrap();
        scene.set_main_camera_rig(head).unwrap();
        assert_eq!(scene.main_camera(Eye::Left), Some(left));
        assert_eq!(scene.main_camera(Eye::Center), Some(head));
    }

    #[test]
    fn test_pick_from_camera_hits_node_in_front() {
        let mut scene = Scene::new();
        let camera = scene.graph_mut().create_node("camera");
        let target = scene.graph_mut().create_node("target");
        let graph = scene.graph_mut();
        graph.attach_render_data(
            target,
            RenderData::with_mesh_and_material(
                Arc::new(Mesh::cube(1.0)),
                Arc::new(Material::unlit(Vec4::new(1.0, 1.0, 1.0, 1.0))),
            ),
        ).unwrap();
        graph.attach_transform(target, NodeTransform::from_position(Vec3::new(0.0, 0.0, -10.0))).unwrap();
        graph.attach_pickable(target, PickableVolume::new()).unwrap();

        let hits = scene.pick_from_camera(camera).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, target);
    }
}
