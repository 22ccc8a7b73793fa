//! Materials: the shader tag plus the few parameters the core reads

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::foundation::math::Vec4;
use crate::render::shader::ShaderType;

/// Unique identifier for materials, used as a batching key when sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        MaterialId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Material resource: selects the shader program and carries its uniforms
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    id: MaterialId,
    shader_type: ShaderType,
    /// Base color handed to the shader
    pub color: Vec4,
    /// Overall opacity; anything below 1.0 counts as transparent
    pub opacity: f32,
    /// Whether the bound texture carries an alpha channel
    pub texture_has_alpha: bool,
    /// Extra float uniforms by name
    pub floats: HashMap<String, f32>,
    /// Optional name for debugging
    pub name: Option<String>,
}

impl Material {
    /// New opaque white material for `shader_type`
    pub fn new(shader_type: ShaderType) -> Self {
        Self {
            id: MaterialId::next(),
            shader_type,
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            opacity: 1.0,
            texture_has_alpha: false,
            floats: HashMap::new(),
            name: None,
        }
    }

    /// Unlit material with a flat color
    pub fn unlit(color: Vec4) -> Self {
        Self::new(ShaderType::UNLIT).with_color(color)
    }

    /// Set the material name for debugging
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the base color
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Set the opacity
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set a float uniform
    pub fn with_float(mut self, key: impl Into<String>, value: f32) -> Self {
        self.floats.insert(key.into(), value);
        self
    }

    /// Identifier assigned at construction
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// Shader-type tag used to pick the shader program
    pub fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    /// True when the material needs blending and back-to-front ordering
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0 || self.color.w < 1.0 || self.texture_has_alpha
    }

    /// Look up a float uniform
    pub fn float(&self, key: &str) -> Option<f32> {
        self.floats.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = Material::new(ShaderType::UNLIT);
        let b = Material::new(ShaderType::UNLIT);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_transparency_sources() {
        assert!(!Material::unlit(Vec4::new(1.0, 0.0, 0.0, 1.0)).is_transparent());
        assert!(Material::unlit(Vec4::new(1.0, 0.0, 0.0, 0.5)).is_transparent());
        assert!(Material::new(ShaderType::UNLIT).with_opacity(0.2).is_transparent());

        let mut textured = Material::new(ShaderType::UNLIT);
        textured.texture_has_alpha = true;
        assert!(textured.is_transparent());
    }
}
