//! # Scene Renderer
//!
//! One [`SceneRenderer::render_camera`] call renders a scene through one
//! camera:
//!
//! ```text
//! delete released queries ─► reset counters ─► start GPU timer
//!        │
//!        ├─ scene clean ─────────────────────────────────► stop timer
//!        │
//!        └─ bind scene target ─► harvest occlusion ─► frustum cull (+ issue queries)
//!               ─► sort ─► shared GPU state ─► clear ─► draw list
//!               ─► post-effect composites (if any) ─► stop timer
//! ```
//!
//! With post effects the scene goes to ping-pong texture A; each composite
//! stage but the last writes into the opposite texture, the last one into the
//! real target.

use crate::core::config::{RendererConfig, SceneSettings};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::{NodeId, Scene, SceneGraph};
use crate::scene::components::{CullFace, Eye, PostEffectData, RenderData, RenderMask};
use super::occlusion::OcclusionCuller;
use super::post_effect::{PingPong, PostEffectRegistry, PostEffectTargets};
use super::render_queue::{compare_by_order_shader_distance, DrawItem, DrawList, RenderOrderFn};
use super::shader::{ShaderRegistry, ShaderTransforms};
use super::stats::{FrameReport, FrameStats};
use super::surface::{
    BlendFactor, Capability, DepthFunc, Face, FrontFace, GpuSurface, RenderTarget,
};
use super::{RenderError, RenderResult};

/// Camera values copied out before the graph is borrowed mutably
struct CameraView {
    projection: Mat4,
    background: Vec4,
    render_mask: RenderMask,
    post_effects: Vec<PostEffectData>,
}

/// Per-camera render pass with its own statistics and program registries
pub struct SceneRenderer {
    config: RendererConfig,
    shaders: ShaderRegistry,
    post_effects: PostEffectRegistry,
    post_effect_targets: Option<PostEffectTargets>,
    stats: FrameStats,
    occlusion: OcclusionCuller,
    render_order: Box<RenderOrderFn>,
    draw_list: DrawList,
}

impl std::fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("config", &self.config)
            .field("shaders", &self.shaders)
            .field("post_effects", &self.post_effects)
            .field("post_effect_targets", &self.post_effect_targets)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl SceneRenderer {
    /// Renderer with the built-in shaders and post effects
    pub fn new(config: RendererConfig) -> Self {
        log::debug!("Creating scene renderer: {:?}", config);
        Self {
            config,
            shaders: ShaderRegistry::with_builtins(),
            post_effects: PostEffectRegistry::with_builtins(),
            post_effect_targets: None,
            stats: FrameStats::new(config.monoscopic),
            occlusion: OcclusionCuller::new(),
            render_order: Box::new(compare_by_order_shader_distance),
            draw_list: DrawList::new(),
        }
    }

    /// Renderer configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Shader registry
    pub fn shaders(&self) -> &ShaderRegistry {
        &self.shaders
    }

    /// Shader registry, for registering custom programs
    pub fn shaders_mut(&mut self) -> &mut ShaderRegistry {
        &mut self.shaders
    }

    /// Post-effect registry, for registering custom effects
    pub fn post_effects_mut(&mut self) -> &mut PostEffectRegistry {
        &mut self.post_effects
    }

    /// Replace the draw-list comparator
    pub fn set_render_order(
        &mut self,
        compare: impl Fn(&DrawItem, &DrawItem) -> std::cmp::Ordering + Send + Sync + 'static,
    ) {
        self.render_order = Box::new(compare);
    }

    /// Use existing ping-pong targets for post effects
    pub fn set_post_effect_targets(&mut self, targets: Option<PostEffectTargets>) {
        self.post_effect_targets = targets;
    }

    /// Allocate ping-pong targets of the given size on `surface`
    pub fn create_post_effect_targets(
        &mut self,
        surface: &mut dyn GpuSurface,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        self.post_effect_targets = Some(PostEffectTargets::create(surface, width, height)?);
        Ok(())
    }

    /// Ping-pong targets, if allocated
    pub fn post_effect_targets(&self) -> Option<&PostEffectTargets> {
        self.post_effect_targets.as_ref()
    }

    /// Frame statistics
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Occlusion counters of the last pass
    pub fn occlusion(&self) -> &OcclusionCuller {
        &self.occlusion
    }

    /// Draw list of the last pass, in submission order
    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    /// Delete the renderer's GPU timer queries
    pub fn release(&self, surface: &mut dyn GpuSurface) {
        self.stats.release_queries(surface);
    }

    /// Render `scene` through `camera` into `target`.
    ///
    /// A clean scene is skipped without touching the target. Errors come
    /// only from the camera (missing, singular world matrix), missing
    /// post-effect targets, or a stale node id; a node that fails to draw is
    /// drawn with the error shader and the pass continues.
    pub fn render_camera(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        target: &RenderTarget,
        surface: &mut dyn GpuSurface,
    ) -> RenderResult<FrameReport> {
        for query in scene.graph().drain_released_queries() {
            surface.delete_query(query);
        }

        self.stats.reset_counters();
        self.occlusion.reset_counters();
        self.draw_list.clear();

        let view = camera_view(scene.graph(), camera)?;
        let settings = *scene.settings();
        let eye_index = FrameStats::eye_index(view.render_mask);

        if settings.stats_enabled {
            self.stats.start_gpu_timer(surface, eye_index);
        }

        let result = if scene.is_dirty() {
            self.render_pass(scene, camera, &view, settings, target, surface)
        } else {
            log::trace!("Scene clean, skipping pass for camera {:?}", camera);
            Ok(FrameReport { skipped: true, ..FrameReport::default() })
        };

        if settings.stats_enabled {
            self.stats.stop_gpu_timer(surface, eye_index);
        }
        result
    }

    fn render_pass(
        &mut self,
        scene: &mut Scene,
        camera: NodeId,
        view: &CameraView,
        settings: SceneSettings,
        target: &RenderTarget,
        surface: &mut dyn GpuSurface,
    ) -> RenderResult<FrameReport> {
        let scene_target = if view.post_effects.is_empty() {
            *target
        } else {
            self.post_effect_targets
                .as_ref()
                .ok_or(RenderError::PostEffectTargetsMissing)?
                .get(PingPong::A)
                .target()
        };

        let nodes = scene.whole_scene_nodes();
        let graph = scene.graph_for_render();
        let view_matrix = graph.view_matrix(camera)?.ok_or(RenderError::SingularView(camera))?;
        let view_projection = view.projection * view_matrix;
        let camera_position = graph.world_position(camera)?;

        surface.bind_target(&scene_target);

        if settings.occlusion_culling {
            self.occlusion.harvest(graph, &nodes, surface)?;
        }
        let culled = self.frustum_cull(graph, &nodes, &camera_position, &view_projection, settings, surface)?;
        self.draw_list.sort(self.render_order.as_ref());

        set_shared_state(surface);
        surface.clear(Some(view.background), true);

        let eye = Eye::from_mask(view.render_mask);
        for item in self.draw_list.items() {
            let model = graph.world_matrix(item.node)?;
            let Some(render_data) = graph.node(item.node)?.render_data() else {
                continue;
            };
            let transforms = ShaderTransforms::new(model, view_matrix, view.projection, eye);
            draw_render_data(
                &self.shaders,
                &mut self.stats,
                surface,
                item.node,
                render_data,
                &transforms,
                view.render_mask,
            );
        }

        if !view.post_effects.is_empty() {
            self.composite(&view.post_effects, view.background, target, surface)?;
        }

        log::debug!(
            "Camera {:?}: {} visible, {} culled, {} draws, {} triangles",
            camera,
            self.draw_list.len(),
            culled,
            self.stats.draw_calls(),
            self.stats.triangles()
        );

        Ok(FrameReport {
            skipped: false,
            draw_calls: self.stats.draw_calls(),
            triangles: self.stats.triangles(),
            visible: self.draw_list.len(),
            culled,
        })
    }

    /// Fill the draw list; returns how many drawable entries were rejected
    fn frustum_cull(
        &mut self,
        graph: &mut SceneGraph,
        nodes: &[NodeId],
        camera_position: &Vec3,
        view_projection: &Mat4,
        settings: SceneSettings,
        surface: &mut dyn GpuSurface,
    ) -> RenderResult<usize> {
        let mut culled = 0;

        for &id in nodes {
            if !graph.node(id)?.render_data().is_some_and(RenderData::is_drawable) {
                continue;
            }

            if !settings.frustum_culling {
                graph.update_camera_distance(id, camera_position)?;
                push_item(&mut self.draw_list, graph, id)?;
                continue;
            }

            let Some(test) = graph.frustum_test(id, camera_position, view_projection)? else {
                continue;
            };
            if !test.is_kept() {
                culled += 1;
                continue;
            }

            if graph.node(id)?.is_visible() {
                push_item(&mut self.draw_list, graph, id)?;
            } else {
                culled += 1;
            }

            if settings.occlusion_culling {
                self.occlusion.issue(graph, id, &test.mvp, surface, &self.shaders)?;
            }
        }

        Ok(culled)
    }

    fn composite(
        &self,
        effects: &[PostEffectData],
        background: Vec4,
        target: &RenderTarget,
        surface: &mut dyn GpuSurface,
    ) -> RenderResult<()> {
        let targets = self
            .post_effect_targets
            .as_ref()
            .ok_or(RenderError::PostEffectTargetsMissing)?;

        surface.set_capability(Capability::DepthTest, false);
        surface.set_capability(Capability::CullFace, false);

        let last = effects.len() - 1;
        for (stage, effect) in effects.iter().enumerate() {
            let source = PostEffectTargets::source_for_stage(stage);
            let destination = if stage == last {
                *target
            } else {
                targets.get(source.other()).target()
            };

            surface.bind_target(&destination);
            if self.config.clear_on_composite {
                surface.clear(Some(background), true);
            }
            if let Err(err) = self.post_effects.render(surface, targets.get(source).texture, effect) {
                log::error!("Post effect stage {} failed: {}", stage, err);
            }
        }
        Ok(())
    }
}

fn camera_view(graph: &SceneGraph, camera: NodeId) -> RenderResult<CameraView> {
    let component = graph.node(camera)?.camera().ok_or(RenderError::CameraMissing(camera))?;
    Ok(CameraView {
        projection: *component.projection_matrix(),
        background: component.background_color,
        render_mask: component.render_mask,
        post_effects: component.post_effects().to_vec(),
    })
}

fn push_item(list: &mut DrawList, graph: &SceneGraph, id: NodeId) -> RenderResult<()> {
    if let Some(item) = graph
        .node(id)?
        .render_data()
        .and_then(|rd| DrawItem::from_render_data(id, rd))
    {
        list.push(item);
    }
    Ok(())
}

fn set_shared_state(surface: &mut dyn GpuSurface) {
    surface.set_capability(Capability::DepthTest, true);
    surface.set_depth_func(DepthFunc::LessEqual);
    surface.set_capability(Capability::CullFace, true);
    surface.set_front_face(FrontFace::Ccw);
    surface.set_cull_face(Face::Back);
    surface.set_capability(Capability::Blend, true);
    surface.set_blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
    surface.set_capability(Capability::PolygonOffsetFill, false);
}

/// Draw one render data with its own state overrides, restoring the shared
/// state afterwards. Falls back to the error shader if its program fails.
fn draw_render_data(
    shaders: &ShaderRegistry,
    stats: &mut FrameStats,
    surface: &mut dyn GpuSurface,
    node: NodeId,
    render_data: &RenderData,
    transforms: &ShaderTransforms,
    camera_mask: RenderMask,
) {
    if !render_data.render_mask.intersects(camera_mask) {
        return;
    }
    let Some(mesh) = render_data.mesh() else {
        return;
    };

    match render_data.cull_face {
        CullFace::Back => {}
        CullFace::Front => surface.set_cull_face(Face::Front),
        CullFace::None => surface.set_capability(Capability::CullFace, false),
    }
    if !render_data.depth_test {
        surface.set_capability(Capability::DepthTest, false);
    }
    if !render_data.alpha_blend {
        surface.set_capability(Capability::Blend, false);
    }
    if let Some(offset) = render_data.polygon_offset {
        surface.set_capability(Capability::PolygonOffsetFill, true);
        surface.set_polygon_offset(offset.factor, offset.units);
    }

    let drawn = match shaders.render(surface, transforms, render_data) {
        Ok(()) => true,
        Err(err) => {
            log::error!("Draw of {:?} failed ({}), using error shader", node, err);
            match shaders.error_shader().render(surface, transforms, render_data) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("Error shader failed for {:?}: {}", node, err);
                    false
                }
            }
        }
    };
    if drawn {
        log::trace!("Drew {:?} ({} triangles)", node, mesh.triangle_count());
        stats.record_draw(mesh.triangle_count());
    }

    match render_data.cull_face {
        CullFace::Back => {}
        CullFace::Front => surface.set_cull_face(Face::Back),
        CullFace::None => surface.set_capability(Capability::CullFace, true),
    }
    if !render_data.depth_test {
        surface.set_capability(Capability::DepthTest, true);
    }
    if !render_data.alpha_blend {
        surface.set_capability(Capability::Blend, true);
    }
    if render_data.polygon_offset.is_some() {
        surface.set_capability(Capability::PolygonOffsetFill, false);
    }
}
