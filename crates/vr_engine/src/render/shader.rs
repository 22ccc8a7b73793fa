//! Shader dispatch
//!
//! A material names its program with a [`ShaderType`] tag; the
//! [`ShaderRegistry`] maps tags to [`ShaderProgram`] implementations. New
//! programs are registered at runtime under custom tags, so the set of shader
//! types stays open.

use std::collections::HashMap;
use std::fmt;

use crate::foundation::math::{Mat4, Vec4};
use crate::scene::components::{Eye, Mesh, RenderData};
use super::ShaderError;
use super::surface::{DrawCommand, GpuSurface, Uniforms};

/// Tag selecting a shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderType(pub u32);

impl ShaderType {
    /// Flat color or texture
    pub const UNLIT: ShaderType = ShaderType(1);
    /// Side-by-side stereo texture
    pub const UNLIT_HORIZONTAL_STEREO: ShaderType = ShaderType(2);
    /// Over-under stereo texture
    pub const UNLIT_VERTICAL_STEREO: ShaderType = ShaderType(3);
    /// External (video / camera) texture
    pub const EXTERNAL_TEXTURE: ShaderType = ShaderType(4);
    /// Side-by-side stereo external texture
    pub const EXTERNAL_TEXTURE_HORIZONTAL_STEREO: ShaderType = ShaderType(5);
    /// Over-under stereo external texture
    pub const EXTERNAL_TEXTURE_VERTICAL_STEREO: ShaderType = ShaderType(6);
    /// Cubemap skybox
    pub const CUBEMAP: ShaderType = ShaderType(7);
    /// Cubemap environment reflection
    pub const CUBEMAP_REFLECTION: ShaderType = ShaderType(8);

    const CUSTOM_BASE: u32 = 1000;

    /// Tag for an application-defined program
    pub const fn custom(id: u32) -> ShaderType {
        ShaderType(Self::CUSTOM_BASE + id)
    }

    /// True for tags made with [`ShaderType::custom`]
    pub fn is_custom(self) -> bool {
        self.0 >= Self::CUSTOM_BASE
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_custom() {
            write!(f, "custom({})", self.0 - Self::CUSTOM_BASE)
        } else {
            write!(f, "builtin({})", self.0)
        }
    }
}

/// Matrices for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderTransforms {
    /// Model matrix
    pub model: Mat4,
    /// View matrix
    pub view: Mat4,
    /// Projection matrix
    pub projection: Mat4,
    /// `view * model`
    pub model_view: Mat4,
    /// `projection * model_view`
    pub mvp: Mat4,
    /// Eye being rendered
    pub eye: Eye,
}

impl ShaderTransforms {
    /// Derive the products from model, view and projection
    pub fn new(model: Mat4, view: Mat4, projection: Mat4, eye: Eye) -> Self {
        let model_view = view * model;
        Self {
            model,
            view,
            projection,
            model_view,
            mvp: projection * model_view,
            eye,
        }
    }

    fn uniforms(&self, color: Vec4) -> Uniforms {
        Uniforms {
            mvp: self.mvp,
            model_view: self.model_view,
            model: self.model,
            color,
            texture: None,
            floats: Vec::new(),
        }
    }
}

/// A GPU program that can draw a render data
pub trait ShaderProgram: Send + Sync {
    /// Program name handed to the surface
    fn name(&self) -> &str;

    /// Draw `render_data` with these transforms
    fn render(
        &self,
        surface: &mut dyn GpuSurface,
        transforms: &ShaderTransforms,
        render_data: &RenderData,
    ) -> Result<(), ShaderError>;
}

/// How a stereo texture is split between the eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StereoLayout {
    Horizontal,
    Vertical,
}

/// Programs shipped with the engine: the unlit, external-texture and cubemap families
#[derive(Debug, Clone)]
pub struct BuiltinShader {
    name: &'static str,
    stereo: Option<StereoLayout>,
    reflection: bool,
}

impl BuiltinShader {
    fn new(name: &'static str) -> Self {
        Self { name, stereo: None, reflection: false }
    }

    fn stereo(name: &'static str, layout: StereoLayout) -> Self {
        Self { name, stereo: Some(layout), reflection: false }
    }

    /// Flat color / texture
    pub fn unlit() -> Self {
        Self::new("unlit")
    }

    /// External-texture sampler
    pub fn external_texture() -> Self {
        Self::new("external_texture")
    }

    /// Cubemap skybox
    pub fn cubemap() -> Self {
        Self::new("cubemap")
    }

    /// Cubemap reflection, needs the model-view matrix for normals
    pub fn cubemap_reflection() -> Self {
        Self { reflection: true, ..Self::new("cubemap_reflection") }
    }
}

impl ShaderProgram for BuiltinShader {
    fn name(&self) -> &str {
        self.name
    }

    fn render(
        &self,
        surface: &mut dyn GpuSurface,
        transforms: &ShaderTransforms,
        render_data: &RenderData,
    ) -> Result<(), ShaderError> {
        let mesh = render_data.mesh().ok_or(ShaderError::MissingMesh)?;
        let material = render_data.material().ok_or(ShaderError::MissingMaterial)?;

        let mut uniforms = transforms.uniforms(material.color);
        uniforms.color.w *= material.opacity;
        uniforms.floats.extend(material.floats.iter().map(|(k, v)| (k.clone(), *v)));

        if let Some(layout) = self.stereo {
            let right = if transforms.eye == Eye::Right { 1.0 } else { 0.0 };
            uniforms.floats.push(("u_right".to_string(), right));
            let (scale_x, scale_y) = match layout {
                StereoLayout::Horizontal => (0.5, 1.0),
                StereoLayout::Vertical => (1.0, 0.5),
            };
            uniforms.floats.push(("u_uv_scale_x".to_string(), scale_x));
            uniforms.floats.push(("u_uv_scale_y".to_string(), scale_y));
        }
        if self.reflection {
            uniforms.floats.push(("u_reflection".to_string(), 1.0));
        }

        surface.draw(&DrawCommand {
            program: self.name,
            mesh,
            uniforms: &uniforms,
        })?;
        Ok(())
    }
}

/// Draws anything in solid magenta when its own program failed
#[derive(Debug, Clone, Default)]
pub struct ErrorShader;

impl ShaderProgram for ErrorShader {
    fn name(&self) -> &str {
        "error"
    }

    fn render(
        &self,
        surface: &mut dyn GpuSurface,
        transforms: &ShaderTransforms,
        render_data: &RenderData,
    ) -> Result<(), ShaderError> {
        let mesh = render_data.mesh().ok_or(ShaderError::MissingMesh)?;
        let uniforms = transforms.uniforms(Vec4::new(1.0, 0.0, 1.0, 1.0));
        surface.draw(&DrawCommand {
            program: self.name(),
            mesh,
            uniforms: &uniforms,
        })?;
        Ok(())
    }
}

/// Draws occlusion proxies; only depth matters
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxShader;

impl BoundingBoxShader {
    /// Draw `proxy` with a precomputed MVP
    pub fn render_proxy(
        &self,
        surface: &mut dyn GpuSurface,
        mvp: &Mat4,
        proxy: &Mesh,
    ) -> Result<(), ShaderError> {
        let uniforms = Uniforms {
            mvp: *mvp,
            ..Uniforms::identity()
        };
        surface.draw(&DrawCommand {
            program: "bounding_box",
            mesh: proxy,
            uniforms: &uniforms,
        })?;
        Ok(())
    }
}

/// Shader-type tag to program
pub struct ShaderRegistry {
    programs: HashMap<ShaderType, Box<dyn ShaderProgram>>,
    error_shader: Box<dyn ShaderProgram>,
    bounding_box_shader: BoundingBoxShader,
}

impl fmt::Debug for ShaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.programs.keys().copied().collect();
        tags.sort();
        f.debug_struct("ShaderRegistry").field("programs", &tags).finish()
    }
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ShaderRegistry {
    /// Registry with only the error and bounding-box programs
    pub fn empty() -> Self {
        Self {
            programs: HashMap::new(),
            error_shader: Box::new(ErrorShader),
            bounding_box_shader: BoundingBoxShader,
        }
    }

    /// Registry with every built-in program
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ShaderType::UNLIT, BuiltinShader::unlit());
        registry.register(
            ShaderType::UNLIT_HORIZONTAL_STEREO,
            BuiltinShader::stereo("unlit_horizontal_stereo", StereoLayout::Horizontal),
        );
        registry.register(
            ShaderType::UNLIT_VERTICAL_STEREO,
            BuiltinShader::stereo("unlit_vertical_stereo", StereoLayout::Vertical),
        );
        registry.register(ShaderType::EXTERNAL_TEXTURE, BuiltinShader::external_texture());
        registry.register(
            ShaderType::EXTERNAL_TEXTURE_HORIZONTAL_STEREO,
            BuiltinShader::stereo("external_texture_horizontal_stereo", StereoLayout::Horizontal),
        );
        registry.register(
            ShaderType::EXTERNAL_TEXTURE_VERTICAL_STEREO,
            BuiltinShader::stereo("external_texture_vertical_stereo", StereoLayout::Vertical),
        );
        registry.register(ShaderType::CUBEMAP, BuiltinShader::cubemap());
        registry.register(ShaderType::CUBEMAP_REFLECTION, BuiltinShader::cubemap_reflection());
        registry
    }

    /// Register a program, returning the one it replaces
    pub fn register(
        &mut self,
        tag: ShaderType,
        program: impl ShaderProgram + 'static,
    ) -> Option<Box<dyn ShaderProgram>> {
        log::debug!("Registering shader '{}' as {}", program.name(), tag);
        self.programs.insert(tag, Box::new(program))
    }

    /// Replace the fallback program
    pub fn set_error_shader(&mut self, program: impl ShaderProgram + 'static) {
        self.error_shader = Box::new(program);
    }

    /// Program registered for `tag`
    pub fn get(&self, tag: ShaderType) -> Option<&dyn ShaderProgram> {
        self.programs.get(&tag).map(Box::as_ref)
    }

    /// Whether `tag` has a program
    pub fn contains(&self, tag: ShaderType) -> bool {
        self.programs.contains_key(&tag)
    }

    /// The fallback program
    pub fn error_shader(&self) -> &dyn ShaderProgram {
        self.error_shader.as_ref()
    }

    /// The occlusion-proxy program
    pub fn bounding_box_shader(&self) -> &BoundingBoxShader {
        &self.bounding_box_shader
    }

    /// Draw with the program selected by the material's tag
    pub fn render(
        &self,
        surface: &mut dyn GpuSurface,
        transforms: &ShaderTransforms,
        render_data: &RenderData,
    ) -> Result<(), ShaderError> {
        let material = render_data.material().ok_or(ShaderError::MissingMaterial)?;
        let tag = material.shader_type();
        let program = self.get(tag).ok_or(ShaderError::NotRegistered(tag))?;
        program.render(surface, transforms, render_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{RecordingSurface, SurfaceCommand};
    use crate::scene::components::Material;
    use std::sync::Arc;

    fn render_data(tag: ShaderType) -> RenderData {
        RenderData::with_mesh_and_material(Arc::new(Mesh::cube(1.0)), Arc::new(Material::new(tag)))
    }

    fn transforms(eye: Eye) -> ShaderTransforms {
        ShaderTransforms::new(Mat4::identity(), Mat4::identity(), Mat4::identity(), eye)
    }

    #[test]
    fn test_custom_tags_do_not_collide_with_builtins() {
        assert!(ShaderType::custom(0).is_custom());
        assert!(!ShaderType::CUBEMAP_REFLECTION.is_custom());
        assert_ne!(ShaderType::custom(1), ShaderType::custom(2));
    }

    #[test]
    fn test_builtins_dispatch_by_tag() {
        let registry = ShaderRegistry::with_builtins();
        let mut surface = RecordingSurface::new(16, 16);

        registry
            .render(&mut surface, &transforms(Eye::Left), &render_data(ShaderType::CUBEMAP))
            .unwrap();
        registry
            .render(&mut surface, &transforms(Eye::Left), &render_data(ShaderType::UNLIT))
            .unwrap();

        let programs: Vec<_> = surface.draws().iter().map(|d| d.0.to_string()).collect();
        assert_eq!(programs, vec!["cubemap", "unlit"]);
    }

    #[test]
    fn test_unregistered_tag_is_an_error() {
        let registry = ShaderRegistry::with_builtins();
        let mut surface = RecordingSurface::new(16, 16);
        let tag = ShaderType::custom(7);
        let result = registry.render(&mut surface, &transforms(Eye::Left), &render_data(tag));
        assert!(matches!(result, Err(ShaderError::NotRegistered(t)) if t == tag));
    }

    #[test]
    fn test_custom_program_registration() {
        struct Wireframe;
        impl ShaderProgram for Wireframe {
            fn name(&self) -> &str {
                "wireframe"
            }
            fn render(
                &self,
                surface: &mut dyn GpuSurface,
                transforms: &ShaderTransforms,
                render_data: &RenderData,
            ) -> Result<(), ShaderError> {
                let mesh = render_data.mesh().ok_or(ShaderError::MissingMesh)?;
                let uniforms = transforms.uniforms(Vec4::zeros());
                surface.draw(&DrawCommand { program: "wireframe", mesh, uniforms: &uniforms })?;
                Ok(())
            }
        }

        let mut registry = ShaderRegistry::with_builtins();
        let tag = ShaderType::custom(3);
        assert!(registry.register(tag, Wireframe).is_none());

        let mut surface = RecordingSurface::new(16, 16);
        registry.render(&mut surface, &transforms(Eye::Left), &render_data(tag)).unwrap();
        assert_eq!(surface.draws()[0].0, "wireframe");
    }

    #[test]
    fn test_missing_mesh_is_reported() {
        let registry = ShaderRegistry::with_builtins();
        let mut surface = RecordingSurface::new(16, 16);
        let mut data = RenderData::new();
        data.set_material(Arc::new(Material::new(ShaderType::UNLIT)));
        let result = registry.render(&mut surface, &transforms(Eye::Left), &data);
        assert_eq!(result, Err(ShaderError::MissingMesh));
        assert!(surface.commands().iter().all(|c| !matches!(c, SurfaceCommand::Draw { .. })));
    }
}
