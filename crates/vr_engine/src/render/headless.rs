//! In-memory GPU surface
//!
//! [`RecordingSurface`] implements [`GpuSurface`] without a GPU: it tracks the
//! bound target and pipeline state, records every command, and answers queries
//! from configurable values. The demo renders through it and the render-pass
//! tests assert on its command log.

use std::collections::{HashMap, HashSet};

use crate::foundation::math::Vec4;
use crate::scene::QueryId;
use super::surface::{
    BlendFactor, Capability, DepthFunc, DrawCommand, Face, FramebufferId, FrontFace, GpuSurface,
    QueryKind, RenderTarget, RenderTexture, SurfaceError, TextureId, Viewport,
};

/// One recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    /// Render target bound
    BindTarget(RenderTarget),
    /// Target cleared
    Clear {
        /// Clear color, if the color buffer was cleared
        color: Option<Vec4>,
        /// Whether depth was cleared
        depth: bool,
    },
    /// Capability toggled
    SetCapability(Capability, bool),
    /// Depth function set
    DepthFunc(DepthFunc),
    /// Cull face set
    CullFace(Face),
    /// Front face set
    FrontFace(FrontFace),
    /// Blend factors set
    BlendFunc(BlendFactor, BlendFactor),
    /// Polygon offset set
    PolygonOffset {
        /// Slope factor
        factor: f32,
        /// Constant units
        units: f32,
    },
    /// Color writes toggled
    ColorMask(bool),
    /// Draw submitted
    Draw {
        /// Program name
        program: String,
        /// Framebuffer bound at the time
        framebuffer: FramebufferId,
        /// Texture sampled, if any
        texture: Option<TextureId>,
        /// Triangles in the mesh
        triangles: usize,
        /// Whether color writes were on
        color_write: bool,
    },
    /// Query started
    BeginQuery(QueryKind, QueryId),
    /// Query ended
    EndQuery(QueryKind),
    /// Query deleted
    DeleteQuery(QueryId),
}

#[derive(Debug, Clone, Copy)]
struct RecordedQuery {
    kind: QueryKind,
    ended: bool,
    polls_remaining: u32,
}

/// Headless [`GpuSurface`] that records what the renderer asks of it
#[derive(Debug)]
pub struct RecordingSurface {
    commands: Vec<SurfaceCommand>,
    bound: RenderTarget,
    capabilities: HashMap<Capability, bool>,
    color_mask: bool,
    next_handle: u32,
    queries: HashMap<QueryId, RecordedQuery>,
    active: HashMap<QueryKind, QueryId>,
    query_latency: u32,
    samples_passed: HashMap<QueryId, u64>,
    default_samples: u64,
    timer_elapsed_ns: Option<u64>,
    disjoint: bool,
    failing_programs: HashSet<String>,
}

impl RecordingSurface {
    /// Surface with a default framebuffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            commands: Vec::new(),
            bound: RenderTarget::screen(width, height),
            capabilities: HashMap::new(),
            color_mask: true,
            next_handle: 1,
            queries: HashMap::new(),
            active: HashMap::new(),
            query_latency: 0,
            samples_passed: HashMap::new(),
            default_samples: 1,
            timer_elapsed_ns: None,
            disjoint: false,
            failing_programs: HashSet::new(),
        }
    }

    /// Builder: results become available only after this many polls
    pub fn with_query_latency(mut self, polls: u32) -> Self {
        self.query_latency = polls;
        self
    }

    /// Builder: support timer queries, each reporting `elapsed_ns`
    pub fn with_timer_queries(mut self, elapsed_ns: u64) -> Self {
        self.timer_elapsed_ns = Some(elapsed_ns);
        self
    }

    /// Samples reported by occlusion queries without an explicit value
    pub fn set_default_samples(&mut self, samples: u64) {
        self.default_samples = samples;
    }

    /// Samples reported by one occlusion query
    pub fn set_samples_passed(&mut self, id: QueryId, samples: u64) {
        self.samples_passed.insert(id, samples);
    }

    /// Raise a disjoint event, invalidating the current timer results
    pub fn signal_disjoint(&mut self) {
        self.disjoint = true;
    }

    /// Make every draw with this program fail
    pub fn fail_program(&mut self, program: impl Into<String>) {
        self.failing_programs.insert(program.into());
    }

    /// Everything recorded so far
    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    /// Return and forget the recorded commands
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draws as `(program, framebuffer, texture)`
    pub fn draws(&self) -> Vec<(&str, FramebufferId, Option<TextureId>)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                SurfaceCommand::Draw { program, framebuffer, texture, .. } => {
                    Some((program.as_str(), *framebuffer, *texture))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of recorded draws
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, SurfaceCommand::Draw { .. }))
            .count()
    }

    /// Number of recorded clears
    pub fn clear_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, SurfaceCommand::Clear { .. }))
            .count()
    }

    /// Current state of a capability (off until first set)
    pub fn capability(&self, capability: Capability) -> bool {
        self.capabilities.get(&capability).copied().unwrap_or(false)
    }

    /// Currently bound target
    pub fn bound_target(&self) -> RenderTarget {
        self.bound
    }

    /// Query objects that exist on the surface
    pub fn live_queries(&self) -> usize {
        self.queries.len()
    }

    fn record(&mut self, command: SurfaceCommand) {
        log::trace!("surface: {:?}", command);
        self.commands.push(command);
    }
}

impl GpuSurface for RecordingSurface {
    fn bind_target(&mut self, target: &RenderTarget) {
        self.bound = *target;
        self.record(SurfaceCommand::BindTarget(*target));
    }

    fn clear(&mut self, color: Option<Vec4>, depth: bool) {
        self.record(SurfaceCommand::Clear { color, depth });
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.capabilities.insert(capability, enabled);
        self.record(SurfaceCommand::SetCapability(capability, enabled));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.record(SurfaceCommand::DepthFunc(func));
    }

    fn set_cull_face(&mut self, face: Face) {
        self.record(SurfaceCommand::CullFace(face));
    }

    fn set_front_face(&mut self, winding: FrontFace) {
        self.record(SurfaceCommand::FrontFace(winding));
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(SurfaceCommand::BlendFunc(src, dst));
    }

    fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(SurfaceCommand::PolygonOffset { factor, units });
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.color_mask = enabled;
        self.record(SurfaceCommand::ColorMask(enabled));
    }

    fn create_render_texture(&mut self, width: u32, height: u32) -> Result<RenderTexture, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::RenderTextureAllocation { width, height });
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        Ok(RenderTexture {
            framebuffer: FramebufferId(handle),
            texture: TextureId(handle),
            width,
            height,
        })
    }

    fn draw(&mut self, command: &DrawCommand<'_>) -> Result<(), SurfaceError> {
        if self.failing_programs.contains(command.program) {
            return Err(SurfaceError::Backend(format!(
                "program '{}' failed to draw",
                command.program
            )));
        }
        self.record(SurfaceCommand::Draw {
            program: command.program.to_string(),
            framebuffer: self.bound.framebuffer,
            texture: command.uniforms.texture,
            triangles: command.mesh.triangle_count(),
            color_write: self.color_mask,
        });
        Ok(())
    }

    fn begin_query(&mut self, kind: QueryKind, id: QueryId) {
        let latency = self.query_latency;
        self.queries.insert(
            id,
            RecordedQuery {
                kind,
                ended: false,
                polls_remaining: latency,
            },
        );
        self.active.insert(kind, id);
        self.record(SurfaceCommand::BeginQuery(kind, id));
    }

    fn end_query(&mut self, kind: QueryKind) {
        if let Some(id) = self.active.remove(&kind) {
            if let Some(query) = self.queries.get_mut(&id) {
                query.ended = true;
            }
        }
        self.record(SurfaceCommand::EndQuery(kind));
    }

    fn is_query_available(&mut self, id: QueryId) -> bool {
        match self.queries.get_mut(&id) {
            Some(query) if query.ended => {
                if query.polls_remaining == 0 {
                    true
                } else {
                    query.polls_remaining -= 1;
                    false
                }
            }
            _ => false,
        }
    }

    fn query_result(&mut self, id: QueryId) -> u64 {
        match self.queries.get(&id).map(|q| q.kind) {
            Some(QueryKind::AnySamplesPassed) => self
                .samples_passed
                .get(&id)
                .copied()
                .unwrap_or(self.default_samples),
            Some(QueryKind::TimeElapsed) => self.timer_elapsed_ns.unwrap_or(0),
            None => 0,
        }
    }

    fn delete_query(&mut self, id: QueryId) {
        self.queries.remove(&id);
        self.record(SurfaceCommand::DeleteQuery(id));
    }

    fn supports_timer_queries(&self) -> bool {
        self.timer_elapsed_ns.is_some()
    }

    fn take_disjoint(&mut self) -> bool {
        std::mem::take(&mut self.disjoint)
    }
}
