//! GPU surface capability
//!
//! The render pass talks to the graphics API only through [`GpuSurface`]:
//! render-target binding, fixed-function state, draw submission and query
//! objects. Backends (GLES, Vulkan, the in-memory recorder) implement it.

use thiserror::Error;

use crate::foundation::math::{Mat4, Vec4};
use crate::scene::QueryId;
use crate::scene::components::Mesh;

/// Framebuffer handle; [`FramebufferId::DEFAULT`] is the window / eye buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    /// The surface's own framebuffer
    pub const DEFAULT: FramebufferId = FramebufferId(0);
}

/// Texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Pixel rectangle of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Viewport at the origin
    pub fn new(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Where a pass draws: a framebuffer plus its viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Framebuffer to bind
    pub framebuffer: FramebufferId,
    /// Viewport inside it
    pub viewport: Viewport,
}

impl RenderTarget {
    /// The default framebuffer at the given size
    pub fn screen(width: u32, height: u32) -> Self {
        Self {
            framebuffer: FramebufferId::DEFAULT,
            viewport: Viewport::new(width, height),
        }
    }
}

/// Offscreen color target that can be sampled afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTexture {
    /// Framebuffer the texture is attached to
    pub framebuffer: FramebufferId,
    /// Color attachment
    pub texture: TextureId,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl RenderTexture {
    /// The texture as a render target covering all of it
    pub fn target(&self) -> RenderTarget {
        RenderTarget {
            framebuffer: self.framebuffer,
            viewport: Viewport::new(self.width, self.height),
        }
    }
}

/// Toggleable pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Face culling
    CullFace,
    /// Color blending
    Blend,
    /// Polygon offset for filled primitives
    PolygonOffsetFill,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    /// Pass if closer
    Less,
    /// Pass if closer or equal
    LessEqual,
    /// Always pass
    Always,
}

/// Which faces get culled when face culling is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    /// Back faces
    Back,
    /// Front faces
    Front,
}

/// Winding order of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    /// Counter-clockwise
    Ccw,
    /// Clockwise
    Cw,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
}

/// Kind of asynchronous query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Non-zero if any sample passed the depth test
    AnySamplesPassed,
    /// GPU time between begin and end, in nanoseconds
    TimeElapsed,
}

/// Uniform values for one draw
#[derive(Debug, Clone, PartialEq)]
pub struct Uniforms {
    /// Model-view-projection matrix
    pub mvp: Mat4,
    /// Model-view matrix
    pub model_view: Mat4,
    /// Model matrix
    pub model: Mat4,
    /// Base color
    pub color: Vec4,
    /// Sampled texture
    pub texture: Option<TextureId>,
    /// Named float uniforms
    pub floats: Vec<(String, f32)>,
}

impl Uniforms {
    /// Uniforms with identity matrices and a white color
    pub fn identity() -> Self {
        Self {
            mvp: Mat4::identity(),
            model_view: Mat4::identity(),
            model: Mat4::identity(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            texture: None,
            floats: Vec::new(),
        }
    }

    /// Add a float uniform
    pub fn with_float(mut self, name: impl Into<String>, value: f32) -> Self {
        self.floats.push((name.into(), value));
        self
    }
}

/// A single draw submission
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    /// Name of the GPU program to use
    pub program: &'a str,
    /// Geometry
    pub mesh: &'a Mesh,
    /// Uniform values
    pub uniforms: &'a Uniforms,
}

/// Backend failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The backend rejected the operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// No program of that name has been built
    #[error("Unknown GPU program: {0}")]
    UnknownProgram(String),

    /// Render-texture allocation failed
    #[error("Render texture allocation failed: {width}x{height}")]
    RenderTextureAllocation {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

/// The graphics API as seen by the render pass.
///
/// Query objects are identified by [`QueryId`]; a backend creates the GPU
/// object the first time an id is passed to [`GpuSurface::begin_query`] and
/// destroys it in [`GpuSurface::delete_query`]. Polling must never block.
pub trait GpuSurface {
    /// Bind a framebuffer and set its viewport
    fn bind_target(&mut self, target: &RenderTarget);

    /// Clear the bound target's color (if given) and depth (if requested)
    fn clear(&mut self, color: Option<Vec4>, depth: bool);

    /// Enable or disable a capability
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Depth comparison
    fn set_depth_func(&mut self, func: DepthFunc);

    /// Faces removed while face culling is enabled
    fn set_cull_face(&mut self, face: Face);

    /// Front-face winding
    fn set_front_face(&mut self, winding: FrontFace);

    /// Blend equation factors
    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Polygon offset parameters
    fn set_polygon_offset(&mut self, factor: f32, units: f32);

    /// Enable or disable writes to every color channel
    fn set_color_mask(&mut self, enabled: bool);

    /// Allocate an offscreen color target
    fn create_render_texture(&mut self, width: u32, height: u32) -> Result<RenderTexture, SurfaceError>;

    /// Submit a draw
    fn draw(&mut self, command: &DrawCommand<'_>) -> Result<(), SurfaceError>;

    /// Start a query
    fn begin_query(&mut self, kind: QueryKind, id: QueryId);

    /// End the active query of `kind`
    fn end_query(&mut self, kind: QueryKind);

    /// Whether the result of `id` can be read without stalling
    fn is_query_available(&mut self, id: QueryId) -> bool;

    /// Read a query result; only meaningful once available
    fn query_result(&mut self, id: QueryId) -> u64;

    /// Release the GPU object behind `id`
    fn delete_query(&mut self, id: QueryId);

    /// Whether [`QueryKind::TimeElapsed`] queries work on this surface
    fn supports_timer_queries(&self) -> bool {
        false
    }

    /// Whether a disjoint event (clock change, context loss) invalidated timer results.
    ///
    /// Reading the flag clears it.
    fn take_disjoint(&mut self) -> bool {
        false
    }
}
