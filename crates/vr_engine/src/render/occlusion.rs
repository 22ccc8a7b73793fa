//! Asynchronous occlusion culling
//!
//! Each frame a node inside the frustum without an outstanding query gets one:
//! its bounding-box proxy is drawn with color writes off inside an
//! any-samples-passed query. Results are harvested at the start of a later
//! pass, whenever the surface reports them available, and fed through the
//! node's visibility hysteresis. Nothing here ever waits on the GPU.

use crate::foundation::math::Mat4;
use crate::scene::{NodeId, SceneGraph, SceneResult};
use crate::scene::components::RenderData;
use super::shader::ShaderRegistry;
use super::surface::{Capability, DepthFunc, GpuSurface, QueryKind};

/// Issues and harvests per-node occlusion queries
#[derive(Debug, Default, Clone)]
pub struct OcclusionCuller {
    issued: usize,
    harvested: usize,
}

impl OcclusionCuller {
    /// Create a culler with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries issued since the last [`OcclusionCuller::reset_counters`]
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Results read back since the last [`OcclusionCuller::reset_counters`]
    pub fn harvested(&self) -> usize {
        self.harvested
    }

    /// Zero the per-pass counters
    pub fn reset_counters(&mut self) {
        self.issued = 0;
        self.harvested = 0;
    }

    /// Read back every available result among `nodes`.
    ///
    /// Only nodes with render data, a material and a pending query are
    /// polled. An available result updates the node's visibility and clears
    /// the pending flag; an unavailable one leaves the node untouched.
    pub fn harvest(
        &mut self,
        graph: &mut SceneGraph,
        nodes: &[NodeId],
        surface: &mut dyn GpuSurface,
    ) -> SceneResult<()> {
        for &id in nodes {
            let node = graph.node_mut(id)?;
            let has_material = node.render_data.as_ref().and_then(RenderData::material).is_some();
            if !has_material || !node.occlusion_query.is_pending() {
                continue;
            }

            let query = node.occlusion_query.id();
            if !surface.is_query_available(query) {
                continue;
            }
            let samples = surface.query_result(query);
            log::trace!("occlusion query {:?} for {:?}: {} samples", query, id, samples);
            node.set_visible(samples != 0);
            node.occlusion_query.set_pending(false);
            self.harvested += 1;
        }
        Ok(())
    }

    /// Issue a query for `id` unless one is already outstanding.
    ///
    /// Returns whether a query was issued. Color writes are disabled for the
    /// proxy draw and re-enabled afterwards. A failed proxy draw still ends
    /// the query but leaves the node without a pending result, so the next
    /// pass tries again.
    pub fn issue(
        &mut self,
        graph: &mut SceneGraph,
        id: NodeId,
        mvp: &Mat4,
        surface: &mut dyn GpuSurface,
        shaders: &ShaderRegistry,
    ) -> SceneResult<bool> {
        let node = graph.node(id)?;
        if node.occlusion_query.is_pending() {
            return Ok(false);
        }
        let Some(mesh) = node.render_data.as_ref().and_then(RenderData::mesh) else {
            return Ok(false);
        };
        let proxy = mesh.bounding_box_mesh();
        let query = node.occlusion_query.id();

        surface.set_depth_func(DepthFunc::LessEqual);
        surface.set_capability(Capability::DepthTest, true);
        surface.set_color_mask(false);

        surface.begin_query(QueryKind::AnySamplesPassed, query);
        let drawn = shaders.bounding_box_shader().render_proxy(surface, mvp, &proxy);
        surface.end_query(QueryKind::AnySamplesPassed);

        surface.set_color_mask(true);

        match drawn {
            Ok(()) => {
                graph.node_mut(id)?.occlusion_query.set_pending(true);
                self.issued += 1;
                Ok(true)
            }
            Err(err) => {
                log::warn!("Occlusion proxy for {:?} failed to draw: {}", id, err);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{RecordingSurface, SurfaceCommand};
    use crate::render::shader::ShaderType;
    use crate::scene::components::{Material, Mesh};
    use crate::scene::VISIBILITY_CHECK_FRAMES;
    use std::sync::Arc;

    fn mesh_node(graph: &mut SceneGraph) -> NodeId {
        let id = graph.create_node("occluded");
        let render_data =
            RenderData::with_mesh_and_material(Arc::new(Mesh::cube(1.0)), Arc::new(Material::new(ShaderType::UNLIT)));
        graph.attach_render_data(id, render_data).unwrap();
        id
    }

    #[test]
    fn test_issue_wraps_proxy_draw_in_query() {
        let mut graph = SceneGraph::new();
        let id = mesh_node(&mut graph);
        let mut surface = RecordingSurface::new(16, 16);
        let mut culler = OcclusionCuller::new();

        let issued = culler
            .issue(&mut graph, id, &Mat4::identity(), &mut surface, &ShaderRegistry::with_builtins())
            .unwrap();
        assert!(issued);
        assert!(graph.node(id).unwrap().occlusion_query().is_pending());

        let query = graph.node(id).unwrap().occlusion_query().id();
        let commands = surface.commands();
        let begin = commands
            .iter()
            .position(|c| *c == SurfaceCommand::BeginQuery(QueryKind::AnySamplesPassed, query))
            .unwrap();
        assert!(matches!(
            &commands[begin + 1],
            SurfaceCommand::Draw { program, color_write: false, triangles: 12, .. } if program == "bounding_box"
        ));
        assert_eq!(commands[begin + 2], SurfaceCommand::EndQuery(QueryKind::AnySamplesPassed));
        assert_eq!(commands.last(), Some(&SurfaceCommand::ColorMask(true)));
    }

    #[test]
    fn test_at_most_one_outstanding_query() {
        let mut graph = SceneGraph::new();
        let id = mesh_node(&mut graph);
        let mut surface = RecordingSurface::new(16, 16).with_query_latency(5);
        let shaders = ShaderRegistry::with_builtins();
        let mut culler = OcclusionCuller::new();

        assert!(culler.issue(&mut graph, id, &Mat4::identity(), &mut surface, &shaders).unwrap());
        assert!(!culler.issue(&mut graph, id, &Mat4::identity(), &mut surface, &shaders).unwrap());
        assert_eq!(culler.issued(), 1);
    }

    #[test]
    fn test_harvest_skips_unavailable_results() {
        let mut graph = SceneGraph::new();
        let id = mesh_node(&mut graph);
        let mut surface = RecordingSurface::new(16, 16).with_query_latency(1);
        let shaders = ShaderRegistry::with_builtins();
        let mut culler = OcclusionCuller::new();

        culler.issue(&mut graph, id, &Mat4::identity(), &mut surface, &shaders).unwrap();
        culler.harvest(&mut graph, &[id], &mut surface).unwrap();
        assert_eq!(culler.harvested(), 0);
        assert!(graph.node(id).unwrap().occlusion_query().is_pending());

        culler.harvest(&mut graph, &[id], &mut surface).unwrap();
        assert_eq!(culler.harvested(), 1);
        assert!(!graph.node(id).unwrap().occlusion_query().is_pending());
    }

    #[test]
    fn test_zero_samples_hide_node_after_hysteresis() {
        let mut graph = SceneGraph::new();
        let id = mesh_node(&mut graph);
        let mut surface = RecordingSurface::new(16, 16);
        surface.set_default_samples(0);
        let shaders = ShaderRegistry::with_builtins();
        let mut culler = OcclusionCuller::new();

        for _ in 0..VISIBILITY_CHECK_FRAMES {
            culler.issue(&mut graph, id, &Mat4::identity(), &mut surface, &shaders).unwrap();
            culler.harvest(&mut graph, &[id], &mut surface).unwrap();
            assert!(graph.node(id).unwrap().is_visible());
        }

        culler.issue(&mut graph, id, &Mat4::identity(), &mut surface, &shaders).unwrap();
        culler.harvest(&mut graph, &[id], &mut surface).unwrap();
        assert!(!graph.node(id).unwrap().is_visible());
    }

    #[test]
    fn test_failed_proxy_leaves_query_idle() {
        let mut graph = SceneGraph::new();
        let id = mesh_node(&mut graph);
        let mut surface = RecordingSurface::new(16, 16);
        surface.fail_program("bounding_box");
        let mut culler = OcclusionCuller::new();

        let issued = culler
            .issue(&mut graph, id, &Mat4::identity(), &mut surface, &ShaderRegistry::with_builtins())
            .unwrap();
        assert!(!issued);
        assert!(!graph.node(id).unwrap().occlusion_query().is_pending());
        assert_eq!(surface.commands().last(), Some(&SurfaceCommand::ColorMask(true)));
    }
}
