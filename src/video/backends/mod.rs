//! The backend of renderer, which should be responsible for only one thing:
//! talking to the driver.
//!
//! The `Visitor` is deliberately low level: one method per driver call that the
//! caches in this crate diff against. The caches decide *whether* a call is needed,
//! the visitor only knows *how* to issue it.

pub mod headless;

use crate::errors::*;
use crate::math::prelude::{Color, Vector2};

use super::assets::prelude::*;

/// Server-side toggles that are switched with enable/disable calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
    CullFace,
    ScissorTest,
}

pub const NO_ERROR: u32 = 0;
pub const INVALID_ENUM: u32 = 0x0500;
pub const INVALID_VALUE: u32 = 0x0501;
pub const INVALID_OPERATION: u32 = 0x0502;
pub const OUT_OF_MEMORY: u32 = 0x0505;
pub const INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;

/// Returns a human-readable description of a driver error code.
pub fn describe_error(code: u32) -> &'static str {
    match code {
        NO_ERROR => "No error has been recorded.",
        INVALID_ENUM => "[GL] An unacceptable value is specified for an enumerated argument.",
        INVALID_VALUE => "[GL] A numeric argument is out of range.",
        INVALID_OPERATION => "[GL] The specified operation is not allowed in the current state.",
        INVALID_FRAMEBUFFER_OPERATION => {
            "[GL] The command is trying to render to or read from the framebuffer while the \
             currently bound framebuffer is not framebuffer complete."
        }
        OUT_OF_MEMORY => "[GL] There is not enough memory left to execute the command.",
        _ => "[GL] Oops, Unknown OpenGL error.",
    }
}

pub trait Visitor {
    /// Queries the number of vertex attribute slots of the device.
    fn max_vertex_attributes(&mut self) -> u32;

    /// Queries the number of texture units a single draw call could sample from.
    fn max_texture_units(&mut self) -> u32;

    fn set_capability(&mut self, capability: Capability, enable: bool);

    fn set_colour_mask(&mut self, enable: bool);

    fn set_depth_mask(&mut self, enable: bool);

    fn set_blend_function(&mut self, src: BlendMode, dst: BlendMode);

    fn set_depth_function(&mut self, func: DepthFunction);

    fn set_cull_face(&mut self, face: CullFace);

    fn set_scissor(&mut self, position: Vector2<i32>, size: Vector2<u32>);

    fn set_viewport(&mut self, position: Vector2<i32>, size: Vector2<u32>);

    fn set_clear_colour(&mut self, colour: Color<f32>);

    fn clear(&mut self, colour: bool, depth: bool);

    fn use_program(&mut self, program: u32);

    fn bind_uniform(&mut self, location: UniformLocation, variable: &UniformVariable);

    fn bind_uniform_matrix4_array(&mut self, location: UniformLocation, matrices: &[[[f32; 4]; 4]]);

    fn active_texture(&mut self, unit: u32);

    fn bind_texture(&mut self, target: TextureTarget, id: u32);

    fn bind_vertex_buffer(&mut self, id: u32);

    fn bind_index_buffer(&mut self, id: u32);

    fn bind_framebuffer(&mut self, id: u32);

    fn vertex_attrib_pointer(&mut self, slot: u32, binding: &VertexAttribute, stride: u8);

    fn set_vertex_attrib_array(&mut self, slot: u32, enable: bool);

    fn draw_arrays(&mut self, primitive: MeshPrimitive, first: u32, count: u32);

    /// Draws `count` 16-bit indices, starting at index `first`.
    fn draw_elements(&mut self, primitive: MeshPrimitive, first: u32, count: u32);

    /// Creates the vertex and index buffers of a mesh, returns `(vbo, ibo)`.
    fn create_buffers(&mut self, params: &MeshParams, data: Option<&MeshData>) -> Result<(u32, u32)>;

    fn update_vertex_buffer(&mut self, vbo: u32, offset: usize, bytes: &[u8]) -> Result<()>;

    /// Reads back the contents of a mesh's buffers.
    fn read_buffers(&mut self, vbo: u32, ibo: u32, params: &MeshParams) -> Result<MeshData>;

    fn delete_buffers(&mut self, vbo: u32, ibo: u32);

    fn create_texture(&mut self, params: &TextureParams, data: Option<&TextureData>) -> Result<u32>;

    /// Reads back the pixels of every face of a texture.
    fn read_texture(&mut self, id: u32, params: &TextureParams) -> Result<TextureData>;

    fn delete_texture(&mut self, id: u32);

    /// Creates a framebuffer drawing into texture `colour`, returns `(fbo, depth)`.
    fn create_framebuffer(
        &mut self,
        colour: u32,
        dimensions: Vector2<u32>,
        depth: bool,
    ) -> Result<(u32, Option<u32>)>;

    fn delete_framebuffer(&mut self, fbo: u32, depth: Option<u32>);

    /// Re-creates the private objects of the backend after the platform handed us a new
    /// context. Objects of the lost context are abandoned, not deleted.
    fn reset_context(&mut self) -> Result<()>;

    /// Pops the oldest recorded driver error code, `None` if there is nothing left.
    fn error(&mut self) -> Option<u32>;

    /// Blocks until all execution is complete.
    fn flush(&mut self) -> Result<()>;
}

#[cfg(not(target_arch = "wasm32"))]
pub mod gl;

/// Creates a visitor that submits to the OpenGL context current on this thread.
///
/// # Safety
///
/// The GL function pointers must have been loaded, and the context must be current.
#[cfg(not(target_arch = "wasm32"))]
pub unsafe fn new() -> Result<Box<dyn Visitor>> {
    let visitor = self::gl::visitor::GLVisitor::new()?;
    Ok(Box::new(visitor))
}

pub fn new_headless() -> Box<dyn Visitor> {
    Box::new(self::headless::HeadlessVisitor::new())
}
