//! The active light of a draw call.

use crate::math::prelude::{Color, Matrix4, Vector3};
use crate::video::assets::texture::TextureHandle;

/// A shadow map rendered from a directional light.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadowMap {
    pub texture: TextureHandle,
    /// Depth bias applied when comparing against the shadow map.
    pub tolerance: f32,
    /// The view-projection matrix of the light.
    pub light_matrix: Matrix4<f32>,
}

/// Attenuation of a point light: `1 / (constant + linear * d + quadratic * d * d)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

/// Light parameters, tagged by the kind of light.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient {
        colour: Color<f32>,
    },
    Directional {
        direction: Vector3<f32>,
        colour: Color<f32>,
        shadow: Option<ShadowMap>,
    },
    Point {
        position: Vector3<f32>,
        colour: Color<f32>,
        attenuation: Attenuation,
    },
}

impl Light {
    #[inline]
    pub fn colour(&self) -> Color<f32> {
        match *self {
            Light::Ambient { colour } => colour,
            Light::Directional { colour, .. } => colour,
            Light::Point { colour, .. } => colour,
        }
    }
}
