//! Immutable 2D textures and cubemaps. A texture is a container of one or more images. It
//! can be the source of a texture access from a shader.

use crate::math::prelude::Vector2;
use crate::video::errors::{Error, Result};

impl_handle!(TextureHandle);

/// The kind of texture, which decides the binding point it is bound to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

impl TextureTarget {
    /// The number of images a texture of this target holds.
    pub fn faces(self) -> usize {
        match self {
            TextureTarget::Texture2D => 1,
            TextureTarget::CubeMap => 6,
        }
    }
}

/// Uncompressed pixel formats. Decoding image files into one of these is the resource
/// pool's business.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TextureFormat {
    Alpha8,
    RGB8,
    RGBA8,
}

impl TextureFormat {
    /// Bytes per pixel.
    pub fn size(self) -> usize {
        match self {
            TextureFormat::Alpha8 => 1,
            TextureFormat::RGB8 => 3,
            TextureFormat::RGBA8 => 4,
        }
    }
}

/// Specify how the texture is used whenever the pixel being sampled.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TextureFilter {
    /// Returns the value of the texture element that is nearest (in Manhattan distance)
    /// to the center of the pixel being textured.
    Nearest,
    /// Returns the weighted average of the four texture elements that are closest to the
    /// center of the pixel being textured.
    Linear,
}

/// Sets the wrap parameter for texture.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TextureWrap {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
}

/// The parameters of a texture object.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureParams {
    pub target: TextureTarget,
    pub format: TextureFormat,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub dimensions: Vector2<u32>,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            target: TextureTarget::Texture2D,
            format: TextureFormat::RGBA8,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Clamp,
            dimensions: Vector2::new(0, 0),
        }
    }
}

impl TextureParams {
    /// The length in bytes of a single face.
    #[inline]
    pub fn face_len(&self) -> usize {
        self.format.size() * self.dimensions.x as usize * self.dimensions.y as usize
    }

    pub fn validate(&self, data: Option<&TextureData>) -> Result<()> {
        if let Some(data) = data {
            if data.faces.len() != self.target.faces() {
                return Err(Error::OutOfBounds);
            }

            if data.faces.iter().any(|v| v.len() != self.face_len()) {
                return Err(Error::OutOfBounds);
            }
        }

        Ok(())
    }
}

/// The pixels of every face of a texture, in `TextureParams::format`. It is also the
/// CPU-side shadow copy captured before a context loss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureData {
    pub faces: Vec<Vec<u8>>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validate() {
        let mut params = TextureParams::default();
        params.dimensions = Vector2::new(2, 2);

        let data = TextureData {
            faces: vec![vec![0; 16]],
        };

        assert!(params.validate(Some(&data)).is_ok());
        assert!(params.validate(None).is_ok());

        params.target = TextureTarget::CubeMap;
        assert!(params.validate(Some(&data)).is_err());

        params.target = TextureTarget::Texture2D;
        params.format = TextureFormat::RGB8;
        assert!(params.validate(Some(&data)).is_err());
    }
}
