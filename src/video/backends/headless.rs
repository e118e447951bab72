//! A visitor that talks to no driver at all. It records every call it receives so the
//! caches can be verified call by call, and keeps buffer and texture bytes in memory so
//! read-back and context-loss round trips behave like the real thing.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::super::assets::prelude::*;
use super::{Capability, Visitor};

use crate::errors::*;
use crate::math::prelude::{Color, Vector2};
use crate::utils::prelude::FastHashMap;

/// A recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    QueryMaxVertexAttributes,
    QueryMaxTextureUnits,
    Capability(Capability, bool),
    ColourMask(bool),
    DepthMask(bool),
    BlendFunction(BlendMode, BlendMode),
    DepthFunction(DepthFunction),
    CullFace(CullFace),
    Scissor(Vector2<i32>, Vector2<u32>),
    Viewport(Vector2<i32>, Vector2<u32>),
    ClearColour(Color<f32>),
    Clear(bool, bool),
    UseProgram(u32),
    Uniform(UniformLocation, UniformVariable),
    UniformMatrix4Array(UniformLocation, usize),
    ActiveTexture(u32),
    BindTexture(TextureTarget, u32),
    BindVertexBuffer(u32),
    BindIndexBuffer(u32),
    BindFramebuffer(u32),
    VertexAttribPointer {
        slot: u32,
        size: u8,
        format: VertexFormat,
        normalized: bool,
        stride: u8,
        offset: u8,
    },
    VertexAttribArray(u32, bool),
    DrawArrays(MeshPrimitive, u32, u32),
    DrawElements(MeshPrimitive, u32, u32),
    CreateBuffers(u32, u32),
    UpdateVertexBuffer(u32, usize),
    DeleteBuffers(u32, u32),
    CreateTexture(u32),
    DeleteTexture(u32),
    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    ResetContext,
    Flush,
}

#[derive(Debug)]
struct HeadlessState {
    max_vertex_attributes: u32,
    max_texture_units: u32,
    calls: Vec<Call>,
    errors: VecDeque<u32>,
    buffers: FastHashMap<u32, Vec<u8>>,
    textures: FastHashMap<u32, TextureData>,
    framebuffers: FastHashMap<u32, u32>,
    next_id: u32,
}

impl HeadlessState {
    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// A handle to the shared state of a `HeadlessVisitor`, which stays usable after the
/// visitor has been moved into a `RenderSystem`.
#[derive(Debug, Clone)]
pub struct HeadlessLog(Rc<RefCell<HeadlessState>>);

impl HeadlessLog {
    /// Returns a copy of every call recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    /// Counts the recorded calls matching `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        self.0.borrow().calls.iter().filter(|v| predicate(v)).count()
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }

    /// Queues a driver error code, which will be reported by `Visitor::error`.
    pub fn push_error(&self, code: u32) {
        self.0.borrow_mut().errors.push_back(code);
    }

    /// Drops every GPU object, the way the OS does when it revokes the context.
    pub fn lose_context(&self) {
        let mut state = self.0.borrow_mut();
        state.buffers.clear();
        state.textures.clear();
        state.framebuffers.clear();
    }

    /// The number of live buffer objects (a mesh owns two).
    pub fn buffers(&self) -> usize {
        self.0.borrow().buffers.len()
    }

    /// The number of live texture objects.
    pub fn textures(&self) -> usize {
        self.0.borrow().textures.len()
    }

    /// The number of live framebuffer objects.
    pub fn framebuffers(&self) -> usize {
        self.0.borrow().framebuffers.len()
    }

    pub fn buffer_bytes(&self, id: u32) -> Option<Vec<u8>> {
        self.0.borrow().buffers.get(&id).cloned()
    }

    pub fn texture_data(&self, id: u32) -> Option<TextureData> {
        self.0.borrow().textures.get(&id).cloned()
    }
}

pub struct HeadlessVisitor {
    state: Rc<RefCell<HeadlessState>>,
}

impl Default for HeadlessVisitor {
    fn default() -> Self {
        HeadlessVisitor::new()
    }
}

impl HeadlessVisitor {
    pub fn new() -> Self {
        HeadlessVisitor::with_limits(16, 8)
    }

    /// Creates a visitor reporting the given device limits.
    pub fn with_limits(max_vertex_attributes: u32, max_texture_units: u32) -> Self {
        let state = HeadlessState {
            max_vertex_attributes,
            max_texture_units,
            calls: Vec::new(),
            errors: VecDeque::new(),
            buffers: FastHashMap::default(),
            textures: FastHashMap::default(),
            framebuffers: FastHashMap::default(),
            next_id: 0,
        };

        HeadlessVisitor {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn log(&self) -> HeadlessLog {
        HeadlessLog(self.state.clone())
    }

    #[inline]
    fn record(&mut self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Visitor for HeadlessVisitor {
    fn max_vertex_attributes(&mut self) -> u32 {
        self.record(Call::QueryMaxVertexAttributes);
        self.state.borrow().max_vertex_attributes
    }

    fn max_texture_units(&mut self) -> u32 {
        self.record(Call::QueryMaxTextureUnits);
        self.state.borrow().max_texture_units
    }

    fn set_capability(&mut self, capability: Capability, enable: bool) {
        self.record(Call::Capability(capability, enable));
    }

    fn set_colour_mask(&mut self, enable: bool) {
        self.record(Call::ColourMask(enable));
    }

    fn set_depth_mask(&mut self, enable: bool) {
        self.record(Call::DepthMask(enable));
    }

    fn set_blend_function(&mut self, src: BlendMode, dst: BlendMode) {
        self.record(Call::BlendFunction(src, dst));
    }

    fn set_depth_function(&mut self, func: DepthFunction) {
        self.record(Call::DepthFunction(func));
    }

    fn set_cull_face(&mut self, face: CullFace) {
        self.record(Call::CullFace(face));
    }

    fn set_scissor(&mut self, position: Vector2<i32>, size: Vector2<u32>) {
        self.record(Call::Scissor(position, size));
    }

    fn set_viewport(&mut self, position: Vector2<i32>, size: Vector2<u32>) {
        self.record(Call::Viewport(position, size));
    }

    fn set_clear_colour(&mut self, colour: Color<f32>) {
        self.record(Call::ClearColour(colour));
    }

    fn clear(&mut self, colour: bool, depth: bool) {
        self.record(Call::Clear(colour, depth));
    }

    fn use_program(&mut self, program: u32) {
        self.record(Call::UseProgram(program));
    }

    fn bind_uniform(&mut self, location: UniformLocation, variable: &UniformVariable) {
        self.record(Call::Uniform(location, *variable));
    }

    fn bind_uniform_matrix4_array(&mut self, location: UniformLocation, matrices: &[[[f32; 4]; 4]]) {
        self.record(Call::UniformMatrix4Array(location, matrices.len()));
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: TextureTarget, id: u32) {
        self.record(Call::BindTexture(target, id));
    }

    fn bind_vertex_buffer(&mut self, id: u32) {
        self.record(Call::BindVertexBuffer(id));
    }

    fn bind_index_buffer(&mut self, id: u32) {
        self.record(Call::BindIndexBuffer(id));
    }

    fn bind_framebuffer(&mut self, id: u32) {
        self.record(Call::BindFramebuffer(id));
    }

    fn vertex_attrib_pointer(&mut self, slot: u32, binding: &VertexAttribute, stride: u8) {
        self.record(Call::VertexAttribPointer {
            slot,
            size: binding.size,
            format: binding.format,
            normalized: binding.normalized,
            stride,
            offset: binding.offset,
        });
    }

    fn set_vertex_attrib_array(&mut self, slot: u32, enable: bool) {
        self.record(Call::VertexAttribArray(slot, enable));
    }

    fn draw_arrays(&mut self, primitive: MeshPrimitive, first: u32, count: u32) {
        self.record(Call::DrawArrays(primitive, first, count));
    }

    fn draw_elements(&mut self, primitive: MeshPrimitive, first: u32, count: u32) {
        self.record(Call::DrawElements(primitive, first, count));
    }

    fn create_buffers(&mut self, params: &MeshParams, data: Option<&MeshData>) -> Result<(u32, u32)> {
        let mut state = self.state.borrow_mut();
        let vbo = state.alloc();
        let ibo = state.alloc();

        let mut vptr = vec![0; params.vertex_buffer_len()];
        let mut iptr = vec![0; params.index_buffer_len()];
        if let Some(data) = data {
            vptr[..data.vptr.len()].copy_from_slice(&data.vptr);
            iptr[..data.iptr.len()].copy_from_slice(&data.iptr);
        }

        state.buffers.insert(vbo, vptr);
        state.buffers.insert(ibo, iptr);
        state.calls.push(Call::CreateBuffers(vbo, ibo));
        Ok((vbo, ibo))
    }

    fn update_vertex_buffer(&mut self, vbo: u32, offset: usize, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        {
            let buf = state
                .buffers
                .get_mut(&vbo)
                .ok_or_else(|| format_err!("Buffer {} does not exist.", vbo))?;

            if offset + bytes.len() > buf.len() {
                bail!("Buffer {} updated out of bounds.", vbo);
            }

            buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        }

        state.calls.push(Call::UpdateVertexBuffer(vbo, offset));
        Ok(())
    }

    fn read_buffers(&mut self, vbo: u32, ibo: u32, _: &MeshParams) -> Result<MeshData> {
        let state = self.state.borrow();
        let vptr = state
            .buffers
            .get(&vbo)
            .cloned()
            .ok_or_else(|| format_err!("Buffer {} does not exist.", vbo))?;

        let iptr = state
            .buffers
            .get(&ibo)
            .cloned()
            .ok_or_else(|| format_err!("Buffer {} does not exist.", ibo))?;

        Ok(MeshData { vptr, iptr })
    }

    fn delete_buffers(&mut self, vbo: u32, ibo: u32) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&vbo);
        state.buffers.remove(&ibo);
        state.calls.push(Call::DeleteBuffers(vbo, ibo));
    }

    fn create_texture(&mut self, params: &TextureParams, data: Option<&TextureData>) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc();

        let data = match data {
            Some(v) => v.clone(),
            None => TextureData {
                faces: vec![vec![0; params.face_len()]; params.target.faces()],
            },
        };

        state.textures.insert(id, data);
        state.calls.push(Call::CreateTexture(id));
        Ok(id)
    }

    fn read_texture(&mut self, id: u32, _: &TextureParams) -> Result<TextureData> {
        self.state
            .borrow()
            .textures
            .get(&id)
            .cloned()
            .ok_or_else(|| format_err!("Texture {} does not exist.", id))
    }

    fn delete_texture(&mut self, id: u32) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&id);
        state.calls.push(Call::DeleteTexture(id));
    }

    fn create_framebuffer(
        &mut self,
        colour: u32,
        _: Vector2<u32>,
        depth: bool,
    ) -> Result<(u32, Option<u32>)> {
        let mut state = self.state.borrow_mut();
        if !state.textures.contains_key(&colour) {
            bail!("[GL] Surface is incomplete. Texture {} does not exist.", colour);
        }

        let fbo = state.alloc();
        let rbo = if depth { Some(state.alloc()) } else { None };
        state.framebuffers.insert(fbo, colour);
        state.calls.push(Call::CreateFramebuffer(fbo));
        Ok((fbo, rbo))
    }

    fn delete_framebuffer(&mut self, fbo: u32, _: Option<u32>) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(&fbo);
        state.calls.push(Call::DeleteFramebuffer(fbo));
    }

    fn reset_context(&mut self) -> Result<()> {
        self.record(Call::ResetContext);
        Ok(())
    }

    fn error(&mut self) -> Option<u32> {
        self.state.borrow_mut().errors.pop_front()
    }

    fn flush(&mut self) -> Result<()> {
        self.record(Call::Flush);
        Ok(())
    }
}
