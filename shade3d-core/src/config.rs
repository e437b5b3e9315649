/// Renderer configuration, loadable from TOML
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::camera::CameraState;
use crate::error::ConfigError;
use crate::projection::{ProjectionMode, ProjectionPresets};
use crate::shading::ShadingMode;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, 1.0 for a collapsed viewport
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Startup state of a renderer
///
/// ```toml
/// projection = "oblique"
/// shading_mode = "bump"
/// shading = true
///
/// [viewport]
/// width = 1280
/// height = 720
///
/// [camera]
/// distance = 8.0
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub viewport: Viewport,
    pub projection: ProjectionMode,
    pub presets: ProjectionPresets,
    pub camera: CameraState,
    pub shading_mode: ShadingMode,
    pub shading: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            projection: ProjectionMode::Perspective,
            presets: ProjectionPresets::default(),
            camera: CameraState::default(),
            shading_mode: ShadingMode::Unlit,
            shading: false,
        }
    }
}

impl RendererConfig {
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RendererConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Every preset must produce a matrix, not just the startup one
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport {}x{} has zero area",
                self.viewport.width, self.viewport.height
            )));
        }
        let aspect = self.viewport.aspect();
        for mode in [
            ProjectionMode::Perspective,
            ProjectionMode::Orthographic,
            ProjectionMode::Oblique,
        ] {
            self.presets.build(mode, aspect)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RendererConfig::default();
        config.validate().unwrap();
        assert_eq!(config.camera.distance, 5.0);
        assert!(!config.shading);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RendererConfig::from_toml_str(
            r#"
projection = "oblique"
shading_mode = "environment"
shading = true

[camera]
distance = 8.0
"#,
        )
        .unwrap();
        assert_eq!(config.projection, ProjectionMode::Oblique);
        assert_eq!(config.shading_mode, ShadingMode::Environment);
        assert!(config.shading);
        assert_eq!(config.camera.distance, 8.0);
        assert_eq!(config.camera.x_radian, 0.0);
        assert_eq!(config.presets, ProjectionPresets::default());
    }

    #[test]
    fn test_preset_override() {
        let config = RendererConfig::from_toml_str(
            r#"
[presets.perspective]
fov_degrees = 60.0
near = 0.5
far = 50.0
"#,
        )
        .unwrap();
        assert_eq!(config.presets.perspective.fov_degrees, 60.0);
        assert_eq!(config.presets.orthographic.left, -4.0);
    }

    #[test]
    fn test_degenerate_preset_is_rejected() {
        let err = RendererConfig::from_toml_str(
            r#"
[presets.orthographic]
left = 1.0
right = -1.0
bottom = -1.0
top = 1.0
near = 0.1
far = 10.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Projection(_)));
    }

    #[test]
    fn test_zero_viewport_is_rejected() {
        let err = RendererConfig::from_toml_str("[viewport]\nwidth = 0\nheight = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_aspect() {
        assert!((Viewport::new(1280, 720).aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(Viewport::new(10, 0).aspect(), 1.0);
    }
}
