//! Post-effect stage description

use std::collections::HashMap;

use crate::foundation::math::Vec3;
use crate::render::post_effect::PostEffectType;

/// One full-screen compositing stage of a camera's post-effect chain
#[derive(Debug, Clone, PartialEq)]
pub struct PostEffectData {
    effect_type: PostEffectType,
    /// Blend color for color-style effects
    pub color: Vec3,
    /// Blend factor in `[0, 1]`
    pub factor: f32,
    /// Extra float uniforms by name
    pub floats: HashMap<String, f32>,
}

impl PostEffectData {
    /// Stage using the program registered for `effect_type`
    pub fn new(effect_type: PostEffectType) -> Self {
        Self {
            effect_type,
            color: Vec3::new(1.0, 1.0, 1.0),
            factor: 1.0,
            floats: HashMap::new(),
        }
    }

    /// Color blend towards `color` by `factor`
    pub fn color_blend(color: Vec3, factor: f32) -> Self {
        Self {
            color,
            factor,
            ..Self::new(PostEffectType::COLOR_BLEND)
        }
    }

    /// Mirror the image horizontally
    pub fn horizontal_flip() -> Self {
        Self::new(PostEffectType::HORIZONTAL_FLIP)
    }

    /// Program tag
    pub fn effect_type(&self) -> PostEffectType {
        self.effect_type
    }
}
