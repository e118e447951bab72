//! Functions for loading render settings.

use crate::math::prelude::{Color, Vector2};
use crate::video::assets::material::{BlendMode, DepthFunction};

/// A structure containing configuration data for the render core. Every field has a
/// sensible default, so a settings document only needs to name what it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// The blend function re-established on every full state refresh.
    pub src_blend: BlendMode,
    pub dst_blend: BlendMode,
    /// The depth function re-established on every full state refresh.
    pub depth_function: DepthFunction,
    /// The clear colour used until a camera provides one.
    pub clear_colour: Color<f32>,
    /// Whether the platform may revoke the GL context behind our back (mobile
    /// backgrounding). When false, suspend and resume are no-ops.
    pub context_loss: bool,
    /// The size of the default framebuffer in pixels.
    pub dimensions: Vector2<u32>,
    /// Runs the error-check pass at the end of every frame.
    pub check_errors: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            src_blend: BlendMode::SourceAlpha,
            dst_blend: BlendMode::OneMinusSourceAlpha,
            depth_function: DepthFunction::LessEqual,
            clear_colour: Color::black(),
            context_loss: cfg!(any(target_os = "android", target_os = "ios")),
            dimensions: Vector2::new(640, 480),
            check_errors: cfg!(debug_assertions),
        }
    }
}

impl RenderSettings {
    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        let settings = serde_json::from_str(json)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_document() {
        let settings = RenderSettings::from_json(
            r#"{ "context_loss": true, "depth_function": "Less", "dimensions": { "x": 800, "y": 600 } }"#,
        )
        .unwrap();

        assert!(settings.context_loss);
        assert_eq!(settings.depth_function, DepthFunction::Less);
        assert_eq!(settings.dimensions, Vector2::new(800, 600));
        assert_eq!(settings.src_blend, BlendMode::SourceAlpha);
    }

    #[test]
    fn malformed_document() {
        assert!(RenderSettings::from_json("{ \"context_loss\": 3 }").is_err());
    }
}
