//! Post-effect compositing
//!
//! A camera's post-effect chain is a list of full-screen passes. The scene is
//! rendered into one of two ping-pong render textures and every stage but the
//! last composites from one texture into the other; the last stage writes to
//! the real target.

use std::collections::HashMap;
use std::fmt;

use crate::foundation::math::Vec4;
use crate::scene::components::{Mesh, PostEffectData};
use super::ShaderError;
use super::surface::{DrawCommand, GpuSurface, RenderTexture, SurfaceError, TextureId, Uniforms};

/// Tag selecting a post-effect program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostEffectType(pub u32);

impl PostEffectType {
    /// Blend towards a color
    pub const COLOR_BLEND: PostEffectType = PostEffectType(1);
    /// Mirror left to right
    pub const HORIZONTAL_FLIP: PostEffectType = PostEffectType(2);

    /// Tag for an application-defined effect
    pub const fn custom(id: u32) -> PostEffectType {
        PostEffectType(1000 + id)
    }
}

/// A full-screen compositing program
pub trait PostEffectProgram: Send + Sync {
    /// Program name handed to the surface
    fn name(&self) -> &str;

    /// Composite `source` onto the bound target through `quad`
    fn render(
        &self,
        surface: &mut dyn GpuSurface,
        source: TextureId,
        effect: &PostEffectData,
        quad: &Mesh,
    ) -> Result<(), ShaderError>;
}

fn composite(
    surface: &mut dyn GpuSurface,
    program: &str,
    quad: &Mesh,
    uniforms: &Uniforms,
) -> Result<(), ShaderError> {
    surface.draw(&DrawCommand { program, mesh: quad, uniforms })?;
    Ok(())
}

/// Mixes the image with `effect.color` by `effect.factor`
#[derive(Debug, Clone, Default)]
pub struct ColorBlendEffect;

impl PostEffectProgram for ColorBlendEffect {
    fn name(&self) -> &str {
        "color_blend"
    }

    fn render(
        &self,
        surface: &mut dyn GpuSurface,
        source: TextureId,
        effect: &PostEffectData,
        quad: &Mesh,
    ) -> Result<(), ShaderError> {
        let color = effect.color;
        let uniforms = Uniforms {
            color: Vec4::new(color.x, color.y, color.z, 1.0),
            texture: Some(source),
            ..Uniforms::identity()
        }
        .with_float("u_factor", effect.factor.clamp(0.0, 1.0));
        composite(surface, self.name(), quad, &uniforms)
    }
}

/// Mirrors the image horizontally
#[derive(Debug, Clone, Default)]
pub struct HorizontalFlipEffect;

impl PostEffectProgram for HorizontalFlipEffect {
    fn name(&self) -> &str {
        "horizontal_flip"
    }

    fn render(
        &self,
        surface: &mut dyn GpuSurface,
        source: TextureId,
        _effect: &PostEffectData,
        quad: &Mesh,
    ) -> Result<(), ShaderError> {
        let uniforms = Uniforms {
            texture: Some(source),
            ..Uniforms::identity()
        };
        composite(surface, self.name(), quad, &uniforms)
    }
}

/// Post-effect tag to program, plus the full-screen quad they draw
pub struct PostEffectRegistry {
    programs: HashMap<PostEffectType, Box<dyn PostEffectProgram>>,
    quad: Mesh,
}

impl fmt::Debug for PostEffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.programs.keys().copied().collect();
        tags.sort();
        f.debug_struct("PostEffectRegistry").field("programs", &tags).finish()
    }
}

impl Default for PostEffectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PostEffectRegistry {
    /// Registry with color blend and horizontal flip
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            programs: HashMap::new(),
            quad: Mesh::quad(2.0, 2.0),
        };
        registry.register(PostEffectType::COLOR_BLEND, ColorBlendEffect);
        registry.register(PostEffectType::HORIZONTAL_FLIP, HorizontalFlipEffect);
        registry
    }

    /// Register a program, returning the one it replaces
    pub fn register(
        &mut self,
        tag: PostEffectType,
        program: impl PostEffectProgram + 'static,
    ) -> Option<Box<dyn PostEffectProgram>> {
        self.programs.insert(tag, Box::new(program))
    }

    /// Composite `source` onto the bound target with the stage's program
    pub fn render(
        &self,
        surface: &mut dyn GpuSurface,
        source: TextureId,
        effect: &PostEffectData,
    ) -> Result<(), ShaderError> {
        let program = self
            .programs
            .get(&effect.effect_type())
            .ok_or(ShaderError::PostEffectNotRegistered(effect.effect_type()))?;
        program.render(surface, source, effect, &self.quad)
    }
}

/// One of the two ping-pong textures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingPong {
    /// Texture A, which receives the scene
    A,
    /// Texture B
    B,
}

impl PingPong {
    /// The other texture
    pub fn other(self) -> PingPong {
        match self {
            PingPong::A => PingPong::B,
            PingPong::B => PingPong::A,
        }
    }
}

/// The two offscreen color targets of the post-effect chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostEffectTargets {
    a: RenderTexture,
    b: RenderTexture,
}

impl PostEffectTargets {
    /// Allocate both textures at the given size
    pub fn create(surface: &mut dyn GpuSurface, width: u32, height: u32) -> Result<Self, SurfaceError> {
        Ok(Self {
            a: surface.create_render_texture(width, height)?,
            b: surface.create_render_texture(width, height)?,
        })
    }

    /// Texture by role
    pub fn get(&self, which: PingPong) -> &RenderTexture {
        match which {
            PingPong::A => &self.a,
            PingPong::B => &self.b,
        }
    }

    /// Source texture of composite stage `stage`: A for even stages, B for odd
    pub fn source_for_stage(stage: usize) -> PingPong {
        if stage % 2 == 0 { PingPong::A } else { PingPong::B }
    }
}
