//! Offscreen render targets.

use crate::video::assets::texture::TextureHandle;

impl_handle!(SurfaceHandle);

/// A render target drawing into `colour`, with an optional depth attachment. Its
/// dimensions are those of the colour texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceParams {
    pub colour: TextureHandle,
    pub depth: bool,
}
