//! The last committed value of every fixed-function toggle of the pipeline.
//!
//! Every setter compares the requested value against the cache and only talks to the
//! driver when they differ. After a context loss or a display change the driver state
//! is unknown, so `force_refresh_all` raises a global invalidation flag which makes every
//! setter re-send its value until the next successful draw call.
//!
//! Alpha blending, depth writing and the blend function can be locked by special render
//! passes (e.g. UI masking) that need a fixed state regardless of the materials drawn.

use smallvec::SmallVec;

use crate::math::prelude::{Color, Vector2};

use super::assets::prelude::{BlendMode, CullFace, DepthFunction, TextureTarget};
use super::backends::{Capability, Visitor};
use super::settings::RenderSettings;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct Locks {
    alpha_blend: bool,
    depth_write: bool,
    blend_function: bool,
}

/// Decides what, if anything, has to be sent to the driver for a boolean toggle.
fn toggle(cached: &mut bool, locked: bool, invalidate: bool, enable: bool) -> Option<bool> {
    if locked {
        // Locked flags keep their value, invalidation only re-asserts it.
        return if invalidate { Some(*cached) } else { None };
    }

    if invalidate || *cached != enable {
        *cached = enable;
        Some(enable)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct RenderStateCache {
    alpha_blend: bool,
    depth_test: bool,
    depth_write: bool,
    colour_write: bool,
    culling: bool,
    scissor_test: bool,

    cull_face: CullFace,
    depth_function: DepthFunction,
    blend_function: (BlendMode, BlendMode),
    scissor: (Vector2<i32>, Vector2<u32>),
    viewport: (Vector2<i32>, Vector2<u32>),
    clear_colour: Color<f32>,

    active_texture_unit: Option<u32>,
    textures: SmallVec<[Option<(TextureTarget, u32)>; 8]>,

    invalidate_all: bool,
    locks: Locks,

    default_blend_function: (BlendMode, BlendMode),
    default_depth_function: DepthFunction,
    changes: u32,
}

impl RenderStateCache {
    /// Creates a cache which distrusts everything until the first draw call.
    pub fn new(settings: &RenderSettings) -> Self {
        RenderStateCache {
            alpha_blend: false,
            depth_test: false,
            depth_write: true,
            colour_write: true,
            culling: false,
            scissor_test: false,

            cull_face: CullFace::Back,
            depth_function: settings.depth_function,
            blend_function: (settings.src_blend, settings.dst_blend),
            scissor: (Vector2::new(0, 0), Vector2::new(0, 0)),
            viewport: (Vector2::new(0, 0), settings.dimensions),
            clear_colour: settings.clear_colour,

            active_texture_unit: None,
            textures: SmallVec::new(),

            invalidate_all: true,
            locks: Locks::default(),

            default_blend_function: (settings.src_blend, settings.dst_blend),
            default_depth_function: settings.depth_function,
            changes: 0,
        }
    }

    pub fn enable_alpha_blending(&mut self, visitor: &mut dyn Visitor, enable: bool) {
        let (locked, invalidate) = (self.locks.alpha_blend, self.invalidate_all);
        if let Some(v) = toggle(&mut self.alpha_blend, locked, invalidate, enable) {
            visitor.set_capability(Capability::Blend, v);
            self.changes += 1;
        }
    }

    pub fn enable_depth_testing(&mut self, visitor: &mut dyn Visitor, enable: bool) {
        let invalidate = self.invalidate_all;
        if let Some(v) = toggle(&mut self.depth_test, false, invalidate, enable) {
            visitor.set_capability(Capability::DepthTest, v);
            self.changes += 1;
        }
    }

    pub fn enable_colour_writing(&mut self, visitor: &mut dyn Visitor, enable: bool) {
        let invalidate = self.invalidate_all;
        if let Some(v) = toggle(&mut self.colour_write, false, invalidate, enable) {
            visitor.set_colour_mask(v);
            self.changes += 1;
        }
    }

    pub fn enable_depth_writing(&mut self, visitor: &mut dyn Visitor, enable: bool) {
        let (locked, invalidate) = (self.locks.depth_write, self.invalidate_all);
        if let Some(v) = toggle(&mut self.depth_write, locked, invalidate, enable) {
            visitor.set_depth_mask(v);
            self.changes += 1;
        }
    }

    pub fn enable_face_culling(&mut self, visitor: &mut dyn Visitor, enable: bool) {
        let invalidate = self.invalidate_all;
        if let Some(v) = toggle(&mut self.culling, false, invalidate, enable) {
            visitor.set_capability(Capability::CullFace, v);
            self.changes += 1;
        }
    }

    pub fn enable_scissor_testing(&mut self, visitor: &mut dyn Visitor, enable: bool) {
        let invalidate = self.invalidate_all;
        if let Some(v) = toggle(&mut self.scissor_test, false, invalidate, enable) {
            visitor.set_capability(Capability::ScissorTest, v);
            self.changes += 1;
        }
    }

    pub fn set_cull_face(&mut self, visitor: &mut dyn Visitor, face: CullFace) {
        if self.invalidate_all || self.cull_face != face {
            self.cull_face = face;
            visitor.set_cull_face(face);
            self.changes += 1;
        }
    }

    pub fn set_depth_function(&mut self, visitor: &mut dyn Visitor, func: DepthFunction) {
        if self.invalidate_all || self.depth_function != func {
            self.depth_function = func;
            visitor.set_depth_function(func);
            self.changes += 1;
        }
    }

    /// Sets the blend function. While the blend function is locked the call is dropped
    /// entirely, even under invalidation; the owner of the lock re-asserts its own.
    pub fn set_blend_function(&mut self, visitor: &mut dyn Visitor, src: BlendMode, dst: BlendMode) {
        if self.locks.blend_function {
            return;
        }

        if self.invalidate_all || self.blend_function != (src, dst) {
            self.blend_function = (src, dst);
            visitor.set_blend_function(src, dst);
            self.changes += 1;
        }
    }

    pub fn set_scissor_region(
        &mut self,
        visitor: &mut dyn Visitor,
        position: Vector2<i32>,
        size: Vector2<u32>,
    ) {
        if self.invalidate_all || self.scissor != (position, size) {
            self.scissor = (position, size);
            visitor.set_scissor(position, size);
            self.changes += 1;
        }
    }

    pub fn set_viewport(&mut self, visitor: &mut dyn Visitor, position: Vector2<i32>, size: Vector2<u32>) {
        if self.invalidate_all || self.viewport != (position, size) {
            self.viewport = (position, size);
            visitor.set_viewport(position, size);
            self.changes += 1;
        }
    }

    pub fn set_clear_colour(&mut self, visitor: &mut dyn Visitor, colour: Color<f32>) {
        if self.invalidate_all || self.clear_colour != colour {
            self.clear_colour = colour;
            visitor.set_clear_colour(colour);
            self.changes += 1;
        }
    }

    /// Binds texture `id` to texture unit `unit`. Re-binding the texture a unit already
    /// holds is a no-op.
    pub fn bind_texture(&mut self, visitor: &mut dyn Visitor, unit: u32, target: TextureTarget, id: u32) {
        let index = unit as usize;
        if self.textures.len() <= index {
            self.textures.resize(index + 1, None);
        }

        if self.textures[index] == Some((target, id)) {
            return;
        }

        if self.active_texture_unit != Some(unit) {
            self.active_texture_unit = Some(unit);
            visitor.active_texture(unit);
        }

        self.textures[index] = Some((target, id));
        visitor.bind_texture(target, id);
        self.changes += 1;
    }

    /// Re-sends the texture the cache believes the active unit holds. Creating a texture
    /// goes through the active unit and leaves it bound to something else.
    pub fn rebind_active_texture(&mut self, visitor: &mut dyn Visitor) {
        let unit = match self.active_texture_unit {
            Some(v) => v as usize,
            None => return,
        };

        if let Some(&Some((target, id))) = self.textures.get(unit) {
            visitor.bind_texture(target, id);
        }
    }

    /// Clears the colour and depth buffers with `colour`.
    ///
    /// Clears respect the write masks and the scissor box, so the scissor test is disabled
    /// and both masks are opened first. A locked depth mask is put back afterwards.
    pub fn clear(&mut self, visitor: &mut dyn Visitor, colour: Color<f32>) {
        self.enable_scissor_testing(visitor, false);
        self.enable_colour_writing(visitor, true);

        let locked = self.locks.depth_write;
        let depth_write = self.depth_write;
        self.locks.depth_write = false;
        self.enable_depth_writing(visitor, true);

        self.set_clear_colour(visitor, colour);
        visitor.clear(true, true);

        if locked {
            self.enable_depth_writing(visitor, depth_write);
            self.locks.depth_write = true;
        }
    }

    /// Forgets every unit bound to texture `id`, whose name the driver may now recycle.
    pub fn forget_texture(&mut self, id: u32) {
        for v in &mut self.textures {
            if v.map(|(_, bound)| bound == id).unwrap_or(false) {
                *v = None;
            }
        }
    }

    pub fn lock_alpha_blending(&mut self) {
        self.locks.alpha_blend = true;
    }

    pub fn unlock_alpha_blending(&mut self) {
        self.locks.alpha_blend = false;
    }

    pub fn lock_depth_writing(&mut self) {
        self.locks.depth_write = true;
    }

    pub fn unlock_depth_writing(&mut self) {
        self.locks.depth_write = false;
    }

    #[inline]
    pub fn is_depth_writing_locked(&self) -> bool {
        self.locks.depth_write
    }

    pub fn lock_blend_function(&mut self) {
        self.locks.blend_function = true;
    }

    pub fn unlock_blend_function(&mut self) {
        self.locks.blend_function = false;
    }

    /// Distrusts every cached value and re-establishes the default blend and depth
    /// functions.
    pub fn force_refresh_all(&mut self, visitor: &mut dyn Visitor) {
        self.invalidate_all = true;
        self.active_texture_unit = None;
        self.textures.clear();

        let (src, dst) = self.default_blend_function;
        self.set_blend_function(visitor, src, dst);

        let func = self.default_depth_function;
        self.set_depth_function(visitor, func);
    }

    /// Returns true if every setter re-sends its value regardless of the cache.
    #[inline]
    pub fn is_invalidated(&self) -> bool {
        self.invalidate_all
    }

    /// Marks the cached values as known-good. Called after the first successful draw
    /// call following an invalidation.
    #[inline]
    pub fn validate(&mut self) {
        self.invalidate_all = false;
    }

    #[inline]
    pub fn is_alpha_blending_enabled(&self) -> bool {
        self.alpha_blend
    }

    #[inline]
    pub fn is_depth_testing_enabled(&self) -> bool {
        self.depth_test
    }

    #[inline]
    pub fn is_depth_writing_enabled(&self) -> bool {
        self.depth_write
    }

    #[inline]
    pub fn is_colour_writing_enabled(&self) -> bool {
        self.colour_write
    }

    #[inline]
    pub fn is_face_culling_enabled(&self) -> bool {
        self.culling
    }

    #[inline]
    pub fn is_scissor_testing_enabled(&self) -> bool {
        self.scissor_test
    }

    #[inline]
    pub fn cull_face(&self) -> CullFace {
        self.cull_face
    }

    #[inline]
    pub fn depth_function(&self) -> DepthFunction {
        self.depth_function
    }

    #[inline]
    pub fn blend_function(&self) -> (BlendMode, BlendMode) {
        self.blend_function
    }

    #[inline]
    pub fn scissor_region(&self) -> (Vector2<i32>, Vector2<u32>) {
        self.scissor
    }

    #[inline]
    pub fn viewport(&self) -> (Vector2<i32>, Vector2<u32>) {
        self.viewport
    }

    /// The number of driver calls issued since the last `reset_changes`.
    #[inline]
    pub fn changes(&self) -> u32 {
        self.changes
    }

    #[inline]
    pub fn reset_changes(&mut self) {
        self.changes = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn toggles() {
        let mut v = false;
        assert_eq!(toggle(&mut v, false, false, true), Some(true));
        assert_eq!(toggle(&mut v, false, false, true), None);
        assert_eq!(toggle(&mut v, false, true, true), Some(true));

        assert_eq!(toggle(&mut v, true, false, false), None);
        assert!(v);
        assert_eq!(toggle(&mut v, true, true, false), Some(true));
        assert!(v);
    }
}
