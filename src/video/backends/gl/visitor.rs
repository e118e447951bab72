use std::os::raw::c_void;
use std::ptr;

use gl::types::*;

use crate::errors::*;
use crate::math::prelude::{Color, Vector2};

use super::super::super::assets::prelude::*;
use super::super::super::errors::Error;
use super::super::{describe_error, Capability, Visitor};
use super::capabilities::Capabilities;
use super::types;

pub struct GLVisitor {
    capabilities: Capabilities,
    vao: Option<GLuint>,
}

impl GLVisitor {
    /// Creates a visitor of the context that is current on this thread.
    ///
    /// # Safety
    ///
    /// The GL function pointers must have been loaded already.
    pub unsafe fn new() -> Result<Self> {
        let capabilities = Capabilities::parse()?;
        info!("GLVisitor {:#?}", capabilities);
        check_capabilities(&capabilities)?;

        // Attribute pointers are per vertex array object on core profiles, so we keep a
        // single one bound for the whole lifetime of the context.
        let vao = if capabilities.has_vertex_array_object() {
            let mut vao = 0;
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);
            Some(vao)
        } else {
            None
        };

        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
        check()?;

        Ok(GLVisitor { capabilities, vao })
    }

    /// Loads the GL function pointers with `loader` and creates a visitor.
    ///
    /// # Safety
    ///
    /// The context `loader` resolves symbols from must be current on this thread.
    pub unsafe fn with_loader<F>(loader: F) -> Result<Self>
    where
        F: FnMut(&str) -> *const c_void,
    {
        gl::load_with(loader);
        Self::new()
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl Drop for GLVisitor {
    fn drop(&mut self) {
        if let Some(vao) = self.vao.take() {
            unsafe {
                gl::DeleteVertexArrays(1, &vao);
            }
        }
    }
}

impl Visitor for GLVisitor {
    fn max_vertex_attributes(&mut self) -> u32 {
        self.capabilities.max_vertex_attributes
    }

    fn max_texture_units(&mut self) -> u32 {
        self.capabilities.max_texture_units
    }

    fn set_capability(&mut self, capability: Capability, enable: bool) {
        unsafe {
            if enable {
                gl::Enable(capability.into());
            } else {
                gl::Disable(capability.into());
            }
        }
    }

    fn set_colour_mask(&mut self, enable: bool) {
        let v = enable as GLboolean;
        unsafe { gl::ColorMask(v, v, v, v) }
    }

    fn set_depth_mask(&mut self, enable: bool) {
        unsafe { gl::DepthMask(enable as GLboolean) }
    }

    fn set_blend_function(&mut self, src: BlendMode, dst: BlendMode) {
        unsafe { gl::BlendFunc(src.into(), dst.into()) }
    }

    fn set_depth_function(&mut self, func: DepthFunction) {
        unsafe { gl::DepthFunc(func.into()) }
    }

    fn set_cull_face(&mut self, face: CullFace) {
        unsafe { gl::CullFace(face.into()) }
    }

    fn set_scissor(&mut self, position: Vector2<i32>, size: Vector2<u32>) {
        unsafe {
            gl::Scissor(
                position.x,
                position.y,
                size.x as GLsizei,
                size.y as GLsizei,
            )
        }
    }

    fn set_viewport(&mut self, position: Vector2<i32>, size: Vector2<u32>) {
        unsafe {
            gl::Viewport(
                position.x,
                position.y,
                size.x as GLsizei,
                size.y as GLsizei,
            )
        }
    }

    fn set_clear_colour(&mut self, colour: Color<f32>) {
        unsafe { gl::ClearColor(colour.r, colour.g, colour.b, colour.a) }
    }

    fn clear(&mut self, colour: bool, depth: bool) {
        let mut bits = 0;
        if colour {
            bits |= gl::COLOR_BUFFER_BIT;
        }

        if depth {
            bits |= gl::DEPTH_BUFFER_BIT;
        }

        if bits != 0 {
            unsafe { gl::Clear(bits) }
        }
    }

    fn use_program(&mut self, program: u32) {
        unsafe { gl::UseProgram(program) }
    }

    fn bind_uniform(&mut self, location: UniformLocation, variable: &UniformVariable) {
        unsafe {
            match *variable {
                UniformVariable::I32(v) => gl::Uniform1i(location, v),
                UniformVariable::F32(v) => gl::Uniform1f(location, v),
                UniformVariable::Vector2f(v) => gl::Uniform2f(location, v[0], v[1]),
                UniformVariable::Vector3f(v) => gl::Uniform3f(location, v[0], v[1], v[2]),
                UniformVariable::Vector4f(v) => gl::Uniform4f(location, v[0], v[1], v[2], v[3]),
                UniformVariable::Matrix3f(v) => {
                    gl::UniformMatrix3fv(location, 1, gl::FALSE, v[0].as_ptr())
                }
                UniformVariable::Matrix4f(v) => {
                    gl::UniformMatrix4fv(location, 1, gl::FALSE, v[0].as_ptr())
                }
            }
        }
    }

    fn bind_uniform_matrix4_array(&mut self, location: UniformLocation, matrices: &[[[f32; 4]; 4]]) {
        if matrices.is_empty() {
            return;
        }

        unsafe {
            gl::UniformMatrix4fv(
                location,
                matrices.len() as GLsizei,
                gl::FALSE,
                matrices[0][0].as_ptr(),
            )
        }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) }
    }

    fn bind_texture(&mut self, target: TextureTarget, id: u32) {
        unsafe { gl::BindTexture(target.into(), id) }
    }

    fn bind_vertex_buffer(&mut self, id: u32) {
        unsafe { gl::BindBuffer(gl::ARRAY_BUFFER, id) }
    }

    fn bind_index_buffer(&mut self, id: u32) {
        unsafe { gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, id) }
    }

    fn bind_framebuffer(&mut self, id: u32) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, id) }
    }

    fn vertex_attrib_pointer(&mut self, slot: u32, binding: &VertexAttribute, stride: u8) {
        unsafe {
            gl::VertexAttribPointer(
                slot,
                GLint::from(binding.size),
                binding.format.into(),
                binding.normalized as GLboolean,
                GLsizei::from(stride),
                binding.offset as usize as *const c_void,
            )
        }
    }

    fn set_vertex_attrib_array(&mut self, slot: u32, enable: bool) {
        unsafe {
            if enable {
                gl::EnableVertexAttribArray(slot);
            } else {
                gl::DisableVertexAttribArray(slot);
            }
        }
    }

    fn draw_arrays(&mut self, primitive: MeshPrimitive, first: u32, count: u32) {
        unsafe { gl::DrawArrays(primitive.into(), first as GLint, count as GLsizei) }
    }

    fn draw_elements(&mut self, primitive: MeshPrimitive, first: u32, count: u32) {
        unsafe {
            gl::DrawElements(
                primitive.into(),
                count as GLsizei,
                gl::UNSIGNED_SHORT,
                (first as usize * 2) as *const c_void,
            )
        }
    }

    fn create_buffers(&mut self, params: &MeshParams, data: Option<&MeshData>) -> Result<(u32, u32)> {
        unsafe {
            let vbo = create_buffer(
                gl::ARRAY_BUFFER,
                params.hint,
                params.vertex_buffer_len(),
                data.map(|v| v.vptr.as_ref()),
            )?;

            let ibo = create_buffer(
                gl::ELEMENT_ARRAY_BUFFER,
                params.hint,
                params.index_buffer_len(),
                data.map(|v| v.iptr.as_ref()),
            )?;

            Ok((vbo, ibo))
        }
    }

    fn update_vertex_buffer(&mut self, vbo: u32, offset: usize, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        unsafe {
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferSubData(
                gl::ARRAY_BUFFER,
                offset as isize,
                bytes.len() as isize,
                bytes.as_ptr() as *const c_void,
            );
            check()
        }
    }

    fn read_buffers(&mut self, vbo: u32, ibo: u32, params: &MeshParams) -> Result<MeshData> {
        if !self.capabilities.has_map_buffer_range() {
            bail!("[GL] Buffer read-back is not supported by this context.");
        }

        unsafe {
            let vptr = read_buffer(gl::ARRAY_BUFFER, vbo, params.vertex_buffer_len())?;
            let iptr = read_buffer(gl::ELEMENT_ARRAY_BUFFER, ibo, params.index_buffer_len())?;
            Ok(MeshData { vptr, iptr })
        }
    }

    fn delete_buffers(&mut self, vbo: u32, ibo: u32) {
        let ids = [vbo, ibo];
        unsafe { gl::DeleteBuffers(2, ids.as_ptr()) }
    }

    fn create_texture(&mut self, params: &TextureParams, data: Option<&TextureData>) -> Result<u32> {
        unsafe {
            let mut id = 0;
            gl::GenTextures(1, &mut id);
            if id == 0 {
                bail!("[GL] Failed to generate texture object.");
            }

            let target: GLenum = params.target.into();
            gl::BindTexture(target, id);

            let wrap: GLenum = params.wrap.into();
            let filter: GLenum = params.filter.into();
            gl::TexParameteri(target, gl::TEXTURE_WRAP_S, wrap as GLint);
            gl::TexParameteri(target, gl::TEXTURE_WRAP_T, wrap as GLint);
            gl::TexParameteri(target, gl::TEXTURE_MIN_FILTER, filter as GLint);
            gl::TexParameteri(target, gl::TEXTURE_MAG_FILTER, filter as GLint);

            let (internal_format, format, pixel_type) =
                types::texture_format(params.format, &self.capabilities);

            for (i, face) in types::texture_faces(params.target).iter().enumerate() {
                let pixels = match data.and_then(|v| v.faces.get(i)) {
                    Some(v) if !v.is_empty() => v.as_ptr() as *const c_void,
                    _ => ptr::null(),
                };

                gl::TexImage2D(
                    *face,
                    0,
                    internal_format as GLint,
                    params.dimensions.x as GLsizei,
                    params.dimensions.y as GLsizei,
                    0,
                    format,
                    pixel_type,
                    pixels,
                );
            }

            gl::BindTexture(target, 0);
            check()?;
            Ok(id)
        }
    }

    fn read_texture(&mut self, id: u32, params: &TextureParams) -> Result<TextureData> {
        let (w, h) = (params.dimensions.x as usize, params.dimensions.y as usize);
        let mut faces = Vec::with_capacity(params.target.faces());

        unsafe {
            // ES only reads back RGBA from colour attachments, so every face is attached to a
            // scratch framebuffer and repacked afterwards.
            let mut fbo = 0;
            gl::GenFramebuffers(1, &mut fbo);
            gl::BindFramebuffer(gl::FRAMEBUFFER, fbo);

            for face in types::texture_faces(params.target) {
                gl::FramebufferTexture2D(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, *face, id, 0);
                if gl::CheckFramebufferStatus(gl::FRAMEBUFFER) != gl::FRAMEBUFFER_COMPLETE {
                    gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
                    gl::DeleteFramebuffers(1, &fbo);
                    bail!("[GL] Texture {} could not be attached for read-back.", id);
                }

                let mut rgba = vec![0u8; w * h * 4];
                gl::ReadPixels(
                    0,
                    0,
                    w as GLsizei,
                    h as GLsizei,
                    gl::RGBA,
                    gl::UNSIGNED_BYTE,
                    rgba.as_mut_ptr() as *mut c_void,
                );

                faces.push(repack(&rgba, params.format));
            }

            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            gl::DeleteFramebuffers(1, &fbo);
            check()?;
        }

        Ok(TextureData { faces })
    }

    fn delete_texture(&mut self, id: u32) {
        unsafe { gl::DeleteTextures(1, &id) }
    }

    fn create_framebuffer(
        &mut self,
        colour: u32,
        dimensions: Vector2<u32>,
        depth: bool,
    ) -> Result<(u32, Option<u32>)> {
        unsafe {
            let mut fbo = 0;
            gl::GenFramebuffers(1, &mut fbo);
            if fbo == 0 {
                bail!("[GL] Failed to generate framebuffer object.");
            }

            gl::BindFramebuffer(gl::FRAMEBUFFER, fbo);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                colour,
                0,
            );

            let rbo = if depth {
                let mut rbo = 0;
                gl::GenRenderbuffers(1, &mut rbo);
                gl::BindRenderbuffer(gl::RENDERBUFFER, rbo);
                gl::RenderbufferStorage(
                    gl::RENDERBUFFER,
                    gl::DEPTH_COMPONENT16,
                    dimensions.x as GLsizei,
                    dimensions.y as GLsizei,
                );
                gl::FramebufferRenderbuffer(
                    gl::FRAMEBUFFER,
                    gl::DEPTH_ATTACHMENT,
                    gl::RENDERBUFFER,
                    rbo,
                );
                gl::BindRenderbuffer(gl::RENDERBUFFER, 0);
                Some(rbo)
            } else {
                None
            };

            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);

            if status != gl::FRAMEBUFFER_COMPLETE {
                self.delete_framebuffer(fbo, rbo);
                match status {
                    gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
                        bail!("[GL] Surface is incomplete. Not all framebuffer attachment points are framebuffer attachment complete.")
                    }
                    gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
                        bail!("[GL] Surface is incomplete. No images are attached to the framebuffer.")
                    }
                    gl::FRAMEBUFFER_UNSUPPORTED => {
                        bail!("[GL] Surface is incomplete. The combination of internal formats of the attached images violates an implementation-dependent set of restrictions.")
                    }
                    _ => bail!("[GL] Surface is incomplete."),
                }
            }

            check()?;
            Ok((fbo, rbo))
        }
    }

    fn delete_framebuffer(&mut self, fbo: u32, depth: Option<u32>) {
        unsafe {
            gl::DeleteFramebuffers(1, &fbo);
            if let Some(rbo) = depth {
                gl::DeleteRenderbuffers(1, &rbo);
            }
        }
    }

    fn reset_context(&mut self) -> Result<()> {
        unsafe {
            if self.vao.is_some() {
                let mut vao = 0;
                gl::GenVertexArrays(1, &mut vao);
                gl::BindVertexArray(vao);
                self.vao = Some(vao);
            }

            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
            check()
        }
    }

    fn error(&mut self) -> Option<u32> {
        match unsafe { gl::GetError() } {
            gl::NO_ERROR => None,
            v => Some(v),
        }
    }

    fn flush(&mut self) -> Result<()> {
        unsafe {
            gl::Finish();
            check()
        }
    }
}

unsafe fn create_buffer(tp: GLenum, hint: MeshHint, size: usize, data: Option<&[u8]>) -> Result<GLuint> {
    let mut id = 0;
    gl::GenBuffers(1, &mut id);
    if id == 0 {
        bail!("[GL] Failed to generate buffer object.");
    }

    gl::BindBuffer(tp, id);

    // Allocates the full size first, the initial data may be shorter than that.
    gl::BufferData(tp, size as isize, ptr::null(), hint.into());
    if let Some(v) = data {
        if !v.is_empty() {
            gl::BufferSubData(tp, 0, v.len() as isize, v.as_ptr() as *const c_void);
        }
    }

    check()?;
    Ok(id)
}

unsafe fn read_buffer(tp: GLenum, id: GLuint, len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    if len == 0 {
        return Ok(bytes);
    }

    gl::BindBuffer(tp, id);
    let src = gl::MapBufferRange(tp, 0, len as isize, gl::MAP_READ_BIT);
    if src.is_null() {
        check()?;
        bail!("[GL] Failed to map buffer {}.", id);
    }

    ptr::copy_nonoverlapping(src as *const u8, bytes.as_mut_ptr(), len);
    gl::UnmapBuffer(tp);
    check()?;
    Ok(bytes)
}

fn repack(rgba: &[u8], format: TextureFormat) -> Vec<u8> {
    match format {
        TextureFormat::RGBA8 => rgba.to_vec(),
        TextureFormat::RGB8 => rgba.chunks(4).flat_map(|v| v[..3].iter().cloned()).collect(),
        TextureFormat::Alpha8 => rgba.chunks(4).map(|v| v[3]).collect(),
    }
}

fn check_capabilities(caps: &Capabilities) -> Result<()> {
    if caps.max_vertex_attributes < 1 {
        return Err(Error::Requirement("vertex attributes".to_owned()).into());
    }

    if caps.max_texture_units < 1 {
        return Err(Error::Requirement("texture units".to_owned()).into());
    }

    Ok(())
}

unsafe fn check() -> Result<()> {
    match gl::GetError() {
        gl::NO_ERROR => Ok(()),
        code => bail!("{}", describe_error(code)),
    }
}
