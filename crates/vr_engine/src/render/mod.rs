//! # Rendering System
//!
//! The per-camera render pass and everything it talks to.
//!
//! ## Architecture
//!
//! - **SceneRenderer**: cull, sort, state setup, draw, post-effect composite
//! - **Frustum / Occlusion**: plane extraction, box tests, asynchronous GPU queries
//! - **Shaders**: open registry from shader-type tag to [`shader::ShaderProgram`]
//! - **Post effects**: full-screen programs chained through ping-pong textures
//! - **GpuSurface**: the only contact with the graphics API
//!
//! A pass never fails because one node failed to draw: shader errors are
//! logged and the node is drawn with the error shader instead. Only problems
//! with the camera itself or with the scene graph abort a pass.

use thiserror::Error;

use crate::scene::{NodeId, SceneError};

pub mod frustum;
pub mod surface;
pub mod headless;
pub mod shader;
pub mod post_effect;
pub mod render_queue;
pub mod stats;
pub mod occlusion;
mod scene_renderer;

#[cfg(test)]
mod tests;

pub use frustum::{build_frustum, is_box_in_frustum, Containment, Frustum, Plane};
pub use surface::{GpuSurface, RenderTarget, RenderTexture, SurfaceError};
pub use headless::RecordingSurface;
pub use shader::{ShaderProgram, ShaderRegistry, ShaderTransforms, ShaderType};
pub use post_effect::{PostEffectProgram, PostEffectRegistry, PostEffectTargets, PostEffectType};
pub use render_queue::{compare_by_order_shader_distance, DrawItem, DrawList, RenderOrderFn};
pub use stats::{FrameReport, FrameStats};
pub use occlusion::OcclusionCuller;
pub use scene_renderer::SceneRenderer;

/// Failures of a single shader or post-effect draw
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// No program registered for the material's tag
    #[error("No shader registered for type {0}")]
    NotRegistered(ShaderType),

    /// No program registered for a post-effect stage
    #[error("No post effect registered for type {0:?}")]
    PostEffectNotRegistered(PostEffectType),

    /// The render data has no mesh
    #[error("Render data has no mesh")]
    MissingMesh,

    /// The render data has no material
    #[error("Render data has no material")]
    MissingMaterial,

    /// The surface rejected the draw
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}

/// Failures that abort a render pass
#[derive(Error, Debug)]
pub enum RenderError {
    /// Scene-graph lookup failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// The node has no camera component
    #[error("Node {0:?} has no camera")]
    CameraMissing(NodeId),

    /// The camera's world matrix cannot be inverted
    #[error("Camera {0:?} has a singular world matrix")]
    SingularView(NodeId),

    /// The camera has post effects but no ping-pong targets were set up
    #[error("Post effects requested but no post-effect targets are allocated")]
    PostEffectTargetsMissing,

    /// Surface failure outside a single draw
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}

/// Result type for render passes
pub type RenderResult<T> = Result<T, RenderError>;
