//! # Unified Configuration System
//!
//! Settings for the scene (per-feature culling toggles), the renderer and the
//! engine as a whole. Every struct is serializable and loadable from TOML or
//! RON through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Scene Settings**: frustum / occlusion culling, statistics, picking
//! - **Renderer Config**: stereo vs monoscopic timing, composite clearing
//! - **Engine Config**: log filter plus the two above

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// # Scene Settings
///
/// Per-scene feature toggles consulted by the render pass every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Test every renderable node against the camera frustum
    pub frustum_culling: bool,
    /// Refine visibility with asynchronous GPU occlusion queries
    pub occlusion_culling: bool,
    /// Collect draw-call counters and GPU timer statistics
    pub stats_enabled: bool,
    /// Only visible nodes take part in picking
    pub pick_visible: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            frustum_culling: true,
            occlusion_culling: false,
            stats_enabled: false,
            pick_visible: true,
        }
    }
}

impl SceneSettings {
    /// Enable or disable frustum culling
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culling = enabled;
        self
    }

    /// Enable or disable occlusion culling
    pub fn with_occlusion_culling(mut self, enabled: bool) -> Self {
        self.occlusion_culling = enabled;
        self
    }

    /// Enable or disable frame statistics
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }
}

impl Config for SceneSettings {}

/// # Renderer Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// A single camera per frame instead of a left/right eye pair.
    ///
    /// Controls when GPU timer results are folded into the draw-time average.
    pub monoscopic: bool,
    /// Clear color and depth before every post-effect composite pass
    pub clear_on_composite: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            monoscopic: false,
            clear_on_composite: true,
        }
    }
}

impl RendererConfig {
    /// Switch between stereo and monoscopic timing
    pub fn with_monoscopic(mut self, monoscopic: bool) -> Self {
        self.monoscopic = monoscopic;
        self
    }
}

impl Config for RendererConfig {}

/// # Engine Configuration
///
/// Top-level configuration: logging plus renderer and default scene settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter handed to env_logger (e.g. `"info"`)
    pub log_level: String,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Default settings applied to new scenes
    pub scene: SceneSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            renderer: RendererConfig::default(),
            scene: SceneSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
        let base = self.log_level.split(',').next().unwrap_or_default().trim();
        if base.contains('=') || LEVELS.contains(&base.to_ascii_lowercase().as_str()) {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
        }
    }
}

impl Config for EngineConfig {}
