//! # VR Engine
//!
//! Scene graph and per-camera render pass for a stereo VR renderer.
//!
//! ## Features
//!
//! - **Scene Graph**: arena of nodes with typed components and cached bounding volumes
//! - **Culling**: frustum tests, LOD ranges and asynchronous GPU occlusion queries
//! - **Render Pass**: sorting, shared GPU state, per-draw overrides, error-shader fallback
//! - **Post Effects**: full-screen stages chained through ping-pong render textures
//! - **Statistics**: draw calls, triangles and double-buffered GPU timers
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use vr_engine::prelude::*;
//!
//! let mut scene = Scene::new();
//! let graph = scene.graph_mut();
//!
//! let cube = graph.create_node("cube");
//! graph.attach_render_data(
//!     cube,
//!     RenderData::with_mesh_and_material(
//!         Arc::new(Mesh::cube(0.5)),
//!         Arc::new(Material::unlit(Vec4::new(1.0, 0.5, 0.0, 1.0))),
//!     ),
//! )?;
//!
//! let eye = graph.create_node("eye");
//! graph.attach_transform(eye, NodeTransform::from_position(Vec3::new(0.0, 0.0, 5.0)))?;
//! graph.attach_camera(eye, Camera::perspective(1.2, 1.0, 0.1, 100.0, RenderMask::BOTH))?;
//!
//! scene.add_node(cube)?;
//! scene.add_node(eye)?;
//!
//! let mut surface = RecordingSurface::new(640, 480);
//! let mut renderer = SceneRenderer::new(RendererConfig::default());
//! let report = renderer.render_camera(&mut scene, eye, &RenderTarget::screen(640, 480), &mut surface)?;
//! assert_eq!(report.draw_calls, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{EngineConfig, RendererConfig, SceneSettings},
        config::{Config, ConfigError, ConfigFormat},
        foundation::math::{Mat4, Mat4Ext, Quat, Transform, Vec3, Vec4},
        render::{
            FrameReport, GpuSurface, RecordingSurface, RenderError, RenderTarget, SceneRenderer,
            ShaderError, ShaderType,
        },
        scene::{
            components::{
                Camera, CameraRig, Eye, Material, Mesh, NodeTransform, PickableVolume,
                PostEffectData, RenderData, RenderMask, RenderQueue,
            },
            BoundingVolume, NodeId, Scene, SceneError, SceneGraph,
        },
    };
}
