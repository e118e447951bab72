//! The orchestrator of the render core.
//!
//! A frame looks like this:
//!
//! ```text
//! begin_frame -> (apply_camera | apply_light | apply_material | apply_joints | render_*)* -> end_frame
//! ```
//!
//! Everything runs on the render thread. The only thing other threads may touch is the
//! `LifecycleSignal`, whose requests are served at `begin_frame` and `end_frame`.

use crate::math::prelude::*;
use crate::utils::prelude::DataVec;

use super::applicator::MaterialSession;
use super::assets::prelude::*;
use super::attributes::VertexAttributeCache;
use super::backends::{describe_error, Visitor};
use super::errors::{Error, Result};
use super::lifecycle::{ContextLifecycle, LifecycleRequest, LifecycleSignal, ResourceBackup};
use super::settings::RenderSettings;
use super::state::RenderStateCache;

/// The statistics of a frame.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub drawcalls: u32,
    pub triangles: u32,
    /// Fixed-function state changes that actually reached the driver.
    pub state_changes: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct GLMesh {
    pub vbo: u32,
    pub ibo: u32,
    pub params: MeshParams,
    /// False until the attribute cache has forgotten the bindings of a previous life of
    /// this mesh (first use, or restoration after a context loss).
    pub cache_valid: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct GLTexture {
    pub id: u32,
    pub params: TextureParams,
}

#[derive(Debug, Clone)]
pub(crate) struct GLSurface {
    pub fbo: u32,
    pub depth: Option<u32>,
    pub params: SurfaceParams,
    pub dimensions: Vector2<u32>,
}

/// Maps the stable handles of the resource pool to the GPU objects currently standing
/// behind them. Restoring a resource under a new GPU name is invisible to everything
/// referencing it by handle.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub meshes: DataVec<GLMesh>,
    pub textures: DataVec<GLTexture>,
    pub surfaces: DataVec<GLSurface>,
}

struct Restorer<'a> {
    visitor: &'a mut dyn Visitor,
    registry: &'a mut Registry,
}

impl<'a> ResourceBackup for Restorer<'a> {
    fn backup_mesh(&mut self, handle: MeshHandle) -> Result<MeshData> {
        let mesh = self
            .registry
            .meshes
            .get(handle)
            .ok_or_else(|| Error::MeshHandleInvalid(handle))?;

        Ok(self.visitor.read_buffers(mesh.vbo, mesh.ibo, &mesh.params)?)
    }

    fn backup_texture(&mut self, handle: TextureHandle) -> Result<TextureData> {
        let texture = self
            .registry
            .textures
            .get(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;

        Ok(self.visitor.read_texture(texture.id, &texture.params)?)
    }

    fn restore_mesh(&mut self, handle: MeshHandle, data: Option<&MeshData>) -> Result<()> {
        let mesh = self
            .registry
            .meshes
            .get_mut(handle)
            .ok_or_else(|| Error::MeshHandleInvalid(handle))?;

        let (vbo, ibo) = self.visitor.create_buffers(&mesh.params, data)?;
        mesh.vbo = vbo;
        mesh.ibo = ibo;
        mesh.cache_valid = false;
        Ok(())
    }

    fn restore_texture(&mut self, handle: TextureHandle, data: Option<&TextureData>) -> Result<()> {
        let texture = self
            .registry
            .textures
            .get_mut(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;

        texture.id = self.visitor.create_texture(&texture.params, data)?;
        Ok(())
    }

    fn restore_surface(&mut self, handle: SurfaceHandle) -> Result<()> {
        let colour = {
            let surface = self
                .registry
                .surfaces
                .get(handle)
                .ok_or_else(|| Error::SurfaceHandleInvalid(handle))?;

            self.registry
                .textures
                .get(surface.params.colour)
                .map(|v| v.id)
                .ok_or_else(|| Error::TextureHandleInvalid(surface.params.colour))?
        };

        let surface = self
            .registry
            .surfaces
            .get_mut(handle)
            .ok_or_else(|| Error::SurfaceHandleInvalid(handle))?;

        let (fbo, depth) =
            self.visitor
                .create_framebuffer(colour, surface.dimensions, surface.params.depth)?;

        surface.fbo = fbo;
        surface.depth = depth;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Camera {
    pub position: Vector3<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub view_projection: Matrix4<f32>,
    pub clear_colour: Color<f32>,
}

/// The render-state caching and draw-submission core.
pub struct RenderSystem {
    pub(crate) visitor: Box<dyn Visitor>,
    pub(crate) settings: RenderSettings,
    pub(crate) state: RenderStateCache,
    pub(crate) attributes: VertexAttributeCache,
    pub(crate) session: MaterialSession,
    pub(crate) lifecycle: ContextLifecycle,
    pub(crate) registry: Registry,
    pub(crate) camera: Camera,
    pub(crate) light: Option<Light>,
    pub(crate) max_texture_units: u32,
    signal: LifecycleSignal,
    dimensions: Vector2<u32>,
    target: Option<SurfaceHandle>,
    bound_mesh: Option<MeshHandle>,
    info: FrameInfo,
}

impl RenderSystem {
    /// Creates a render system submitting through `visitor`, with the driver state
    /// distrusted until the first draw call.
    pub fn new(mut visitor: Box<dyn Visitor>, settings: RenderSettings) -> Result<Self> {
        let max_texture_units = visitor.max_texture_units();
        if max_texture_units < 1 {
            let err = Error::Requirement("texture units".to_owned());
            error!("{}", err);
            return Err(err);
        }

        let mut state = RenderStateCache::new(&settings);
        state.force_refresh_all(visitor.as_mut());
        state.set_viewport(visitor.as_mut(), Vector2::new(0, 0), settings.dimensions);

        let camera = Camera {
            position: Vector3::new(0.0, 0.0, 0.0),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            view_projection: Matrix4::identity(),
            clear_colour: settings.clear_colour,
        };

        Ok(RenderSystem {
            visitor,
            state,
            attributes: VertexAttributeCache::new(),
            session: MaterialSession::new(),
            lifecycle: ContextLifecycle::new(settings.context_loss),
            registry: Registry::default(),
            camera,
            light: None,
            max_texture_units,
            signal: LifecycleSignal::new(),
            dimensions: settings.dimensions,
            target: None,
            bound_mesh: None,
            info: FrameInfo::default(),
            settings,
        })
    }

    /// Returns a mailbox the platform layer could post suspend and resume requests to
    /// from any thread.
    #[inline]
    pub fn signal(&self) -> LifecycleSignal {
        self.signal.clone()
    }

    /// Returns false between a suspend and the matching resume. Nothing is drawn
    /// meanwhile.
    #[inline]
    pub fn has_context(&self) -> bool {
        self.lifecycle.has_context()
    }

    #[inline]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    #[inline]
    pub fn state(&self) -> &RenderStateCache {
        &self.state
    }

    /// Gets the state cache. Special render passes use this to lock flags across
    /// material applications.
    #[inline]
    pub fn state_mut(&mut self) -> &mut RenderStateCache {
        &mut self.state
    }

    #[inline]
    pub fn attributes(&self) -> &VertexAttributeCache {
        &self.attributes
    }

    #[inline]
    pub fn session(&self) -> &MaterialSession {
        &self.session
    }

    #[inline]
    pub fn lifecycle(&self) -> &ContextLifecycle {
        &self.lifecycle
    }

    #[inline]
    pub fn dimensions(&self) -> Vector2<u32> {
        self.dimensions
    }

    #[inline]
    pub fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    /// The view matrix set by the last `apply_camera`.
    #[inline]
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.camera.view
    }

    #[inline]
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.camera.projection
    }

    #[inline]
    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }
}

impl RenderSystem {
    /// Creates the GPU buffers of mesh `handle`.
    pub fn create_mesh(
        &mut self,
        handle: MeshHandle,
        params: MeshParams,
        data: Option<MeshData>,
    ) -> Result<()> {
        if !self.has_context() {
            return Err(Error::ContextLost);
        }

        params.validate(data.as_ref())?;
        self.delete_mesh(handle).ok();

        let result = self.visitor.create_buffers(&params, data.as_ref());
        self.restore_bindings();

        let (vbo, ibo) = result?;
        let mesh = GLMesh {
            vbo,
            ibo,
            params,
            cache_valid: false,
        };

        self.registry.meshes.create(handle, mesh);
        self.lifecycle.track_mesh(handle);
        Ok(())
    }

    #[inline]
    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshParams> {
        self.registry.meshes.get(handle).map(|v| &v.params)
    }

    /// Updates a subset of the vertex buffer of a dynamic mesh.
    pub fn update_mesh(&mut self, handle: MeshHandle, offset: usize, bytes: &[u8]) -> Result<()> {
        if !self.has_context() {
            return Err(Error::ContextLost);
        }

        let mesh = self
            .registry
            .meshes
            .get(handle)
            .ok_or_else(|| Error::MeshHandleInvalid(handle))?;

        if mesh.params.hint == MeshHint::Immutable {
            return Err(Error::Backend(format!("Trying to update immutable {}.", handle)));
        }

        if offset + bytes.len() > mesh.params.vertex_buffer_len() {
            return Err(Error::OutOfBounds);
        }

        let result = self.visitor.update_vertex_buffer(mesh.vbo, offset, bytes);
        self.restore_bindings();
        Ok(result?)
    }

    pub fn delete_mesh(&mut self, handle: MeshHandle) -> Result<()> {
        let mesh = self
            .registry
            .meshes
            .free(handle)
            .ok_or_else(|| Error::MeshHandleInvalid(handle))?;

        if self.has_context() {
            self.visitor.delete_buffers(mesh.vbo, mesh.ibo);
        }

        self.attributes.mark_buffer_stale(handle);
        self.lifecycle.untrack_mesh(handle);

        if self.bound_mesh == Some(handle) {
            self.bound_mesh = None;
        }

        Ok(())
    }

    /// Creates the GPU object of texture `handle`.
    pub fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<TextureData>,
    ) -> Result<()> {
        if !self.has_context() {
            return Err(Error::ContextLost);
        }

        params.validate(data.as_ref())?;
        self.delete_texture(handle).ok();

        let result = self.visitor.create_texture(&params, data.as_ref());
        self.restore_bindings();

        let id = result?;
        self.registry.textures.create(handle, GLTexture { id, params });
        self.lifecycle.track_texture(handle);
        Ok(())
    }

    #[inline]
    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureParams> {
        self.registry.textures.get(handle).map(|v| &v.params)
    }

    pub fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let texture = self
            .registry
            .textures
            .free(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;

        if self.has_context() {
            self.visitor.delete_texture(texture.id);
        }

        self.state.forget_texture(texture.id);
        self.lifecycle.untrack_texture(handle);
        Ok(())
    }

    /// Creates a render target drawing into the texture named by `params`.
    pub fn create_surface(&mut self, handle: SurfaceHandle, params: SurfaceParams) -> Result<()> {
        if !self.has_context() {
            return Err(Error::ContextLost);
        }

        let (colour, dimensions) = self
            .registry
            .textures
            .get(params.colour)
            .map(|v| (v.id, v.params.dimensions))
            .ok_or_else(|| Error::TextureHandleInvalid(params.colour))?;

        self.delete_surface(handle).ok();

        let result = self
            .visitor
            .create_framebuffer(colour, dimensions, params.depth);
        self.restore_bindings();

        let (fbo, depth) = result?;

        let surface = GLSurface {
            fbo,
            depth,
            params,
            dimensions,
        };

        self.registry.surfaces.create(handle, surface);
        self.lifecycle.track_surface(handle);
        Ok(())
    }

    pub fn delete_surface(&mut self, handle: SurfaceHandle) -> Result<()> {
        let surface = self
            .registry
            .surfaces
            .free(handle)
            .ok_or_else(|| Error::SurfaceHandleInvalid(handle))?;

        if self.has_context() {
            self.visitor.delete_framebuffer(surface.fbo, surface.depth);
        }

        self.lifecycle.untrack_surface(handle);
        Ok(())
    }
}

impl RenderSystem {
    /// Starts a frame drawing into `target`, or into the default framebuffer if `None`.
    /// Returns false if there is no context to draw into, in which case the frame should
    /// be skipped.
    pub fn begin_frame(&mut self, target: Option<SurfaceHandle>) -> Result<bool> {
        self.serve_requests()?;

        if !self.has_context() {
            return Ok(false);
        }

        let (fbo, dimensions) = match target {
            Some(handle) => self
                .registry
                .surfaces
                .get(handle)
                .map(|v| (v.fbo, v.dimensions))
                .ok_or_else(|| Error::SurfaceHandleInvalid(handle))?,
            None => (0, self.dimensions),
        };

        self.target = target;
        self.info = FrameInfo::default();
        self.state.reset_changes();

        let visitor = self.visitor.as_mut();
        visitor.bind_framebuffer(fbo);
        self.state.set_viewport(visitor, Vector2::new(0, 0), dimensions);
        self.state.clear(visitor, self.camera.clear_colour);

        Ok(true)
    }

    /// Finishes the frame started by `begin_frame` and returns its statistics.
    pub fn end_frame(&mut self, target: Option<SurfaceHandle>) -> Result<FrameInfo> {
        if self.has_context() {
            if target.is_some() {
                self.visitor.bind_framebuffer(0);
            }

            if self.settings.check_errors {
                self.check_errors();
            }
        }

        self.target = None;
        self.info.state_changes = self.state.changes();

        trace!(
            "Frame finished with {} drawcalls, {} triangles and {} state changes.",
            self.info.drawcalls,
            self.info.triangles,
            self.info.state_changes
        );

        let info = self.info;
        self.serve_requests()?;
        Ok(info)
    }

    /// Sets the camera of the following draw calls. The clear colour takes effect at the
    /// next `begin_frame`.
    pub fn apply_camera(
        &mut self,
        position: Vector3<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        clear_colour: Color<f32>,
    ) {
        self.camera = Camera {
            position,
            view,
            projection,
            view_projection: projection * view,
            clear_colour,
        };
    }

    /// Sets the active light. A different light forces the next material application to
    /// re-upload the lighting uniforms.
    pub fn apply_light(&mut self, light: Option<Light>) {
        if self.light != light {
            self.light = light;
            self.session.invalidate_lighting();
        }
    }

    /// Uploads the skinning matrices of the next draw calls. Skipped entirely if the
    /// shader has no joint uniform.
    pub fn apply_joints(&mut self, joints: &[Matrix4<f32>]) -> Result<()> {
        if !self.has_context() {
            return Ok(());
        }

        if self.session.shader().is_none() {
            return Err(Error::MaterialAbsent);
        }

        if let Some(location) = self.session.locations.joints {
            let matrices: Vec<[[f32; 4]; 4]> = joints.iter().map(|v| (*v).into()).collect();
            self.visitor.bind_uniform_matrix4_array(location, &matrices);
        }

        Ok(())
    }

    /// Draws the whole mesh with the material applied last.
    pub fn render_vertex_buffer(&mut self, mesh: MeshHandle, world: Matrix4<f32>) -> Result<()> {
        let count = {
            let params = &self
                .registry
                .meshes
                .get(mesh)
                .ok_or_else(|| Error::MeshHandleInvalid(mesh))?
                .params;

            if params.num_idxes > 0 {
                params.num_idxes
            } else {
                params.num_verts
            }
        };

        self.render_buffer(mesh, 0, count, world)
    }

    /// Draws `count` elements of the mesh starting at `offset`, with the material applied
    /// last. Elements are indices if the mesh has any, vertices otherwise.
    pub fn render_buffer(
        &mut self,
        handle: MeshHandle,
        offset: usize,
        count: usize,
        world: Matrix4<f32>,
    ) -> Result<()> {
        if !self.has_context() {
            return Ok(());
        }

        if self.session.shader().is_none() {
            error!("{}", Error::MaterialAbsent);
            return Err(Error::MaterialAbsent);
        }

        let mesh = self
            .registry
            .meshes
            .get_mut(handle)
            .ok_or_else(|| Error::MeshHandleInvalid(handle))?;

        let len = if mesh.params.num_idxes > 0 {
            mesh.params.num_idxes
        } else {
            mesh.params.num_verts
        };

        if offset + count > len {
            return Err(Error::OutOfBounds);
        }

        let visitor = self.visitor.as_mut();
        let locations = &self.session.locations;

        if let Some(location) = locations.wvp {
            let wvp = self.camera.view_projection * world;
            visitor.bind_uniform(location, &wvp.into());
        }

        if let Some(location) = locations.world {
            visitor.bind_uniform(location, &world.into());
        }

        if let Some(location) = locations.normal {
            visitor.bind_uniform(location, &normal_matrix(&world).into());
        }

        if let Some(location) = locations.camera_position {
            visitor.bind_uniform(location, &self.camera.position.into());
        }

        self.attributes
            .ensure_capacity(visitor, mesh.params.layout.len())?;

        if !mesh.cache_valid {
            self.attributes.mark_buffer_stale(handle);
            mesh.cache_valid = true;
        }

        let invalidate = self.state.is_invalidated();
        if invalidate || self.bound_mesh != Some(handle) {
            visitor.bind_vertex_buffer(mesh.vbo);
            visitor.bind_index_buffer(mesh.ibo);
            self.bound_mesh = Some(handle);
        }

        let stride = mesh.params.layout.stride();
        self.attributes.begin();
        for attribute in mesh.params.layout.iter() {
            // Attributes the shader does not consume are neither bound nor enabled.
            if let Some(slot) = locations.attribute(attribute.name) {
                self.attributes
                    .bind(visitor, handle, slot, attribute, stride)?;
            }
        }

        self.attributes.commit(visitor, invalidate);

        let primitive = mesh.params.primitive;
        if mesh.params.num_idxes > 0 {
            visitor.draw_elements(primitive, offset as u32, count as u32);
        } else {
            visitor.draw_arrays(primitive, offset as u32, count as u32);
        }

        // The driver state is known-good from now on.
        self.state.validate();

        self.info.drawcalls += 1;
        self.info.triangles += primitive.assemble(count as u32);
        Ok(())
    }

    /// Restricts the following draw calls to a rectangle of the framebuffer.
    pub fn set_scissor_region(&mut self, position: Vector2<i32>, size: Vector2<u32>) {
        let visitor = self.visitor.as_mut();
        self.state.enable_scissor_testing(visitor, true);
        self.state.set_scissor_region(visitor, position, size);
    }

    pub fn disable_scissor(&mut self) {
        self.state.enable_scissor_testing(self.visitor.as_mut(), false);
    }

    /// Updates the size of the default framebuffer. The driver state is distrusted
    /// afterwards, since some platforms recreate the context on display changes.
    pub fn on_screen_resolution_changed(&mut self, dimensions: Vector2<u32>) {
        self.dimensions = dimensions;

        if !self.has_context() {
            return;
        }

        let visitor = self.visitor.as_mut();
        self.state.force_refresh_all(visitor);
        if self.target.is_none() {
            self.state.set_viewport(visitor, Vector2::new(0, 0), dimensions);
        }
    }

    /// Drains the error codes recorded by the driver and logs a description of each.
    /// Returns the number of errors found.
    pub fn check_errors(&mut self) -> usize {
        // Some drivers keep reporting the same lost-context error forever.
        const MAX_ERRORS: usize = 32;

        let mut n = 0;
        while n < MAX_ERRORS {
            match self.visitor.error() {
                Some(code) => {
                    warn!("{} (0x{:04X})", describe_error(code), code);
                    n += 1;
                }
                None => break,
            }
        }

        n
    }

    /// Captures every GPU resource and stops drawing until `resume`. A no-op unless
    /// `RenderSettings::context_loss` is set.
    pub fn suspend(&mut self) {
        let mut restorer = Restorer {
            visitor: self.visitor.as_mut(),
            registry: &mut self.registry,
        };

        self.lifecycle.suspend(&mut restorer);
    }

    /// Recreates every GPU resource captured by `suspend`, and distrusts the whole
    /// driver state until the next draw call.
    pub fn resume(&mut self) -> Result<()> {
        if !self.lifecycle.is_enabled() || self.lifecycle.has_context() {
            return Ok(());
        }

        self.visitor.reset_context()?;
        self.state.force_refresh_all(self.visitor.as_mut());

        let result = {
            let mut restorer = Restorer {
                visitor: self.visitor.as_mut(),
                registry: &mut self.registry,
            };

            self.lifecycle.resume(&mut restorer)
        };

        // Everything bound before refers to GPU names of the lost context.
        self.session.clear();
        self.attributes.reset();
        self.restore_bindings();

        let visitor = self.visitor.as_mut();
        if self.target.is_none() {
            self.state.set_viewport(visitor, Vector2::new(0, 0), self.dimensions);
        }

        result.map(|_| ())
    }

    /// Creating and updating GPU objects goes through the binding points of the driver.
    /// Puts back what the caches believe is bound: the mesh is re-bound lazily by the next
    /// draw, the active texture unit and the render target right away.
    fn restore_bindings(&mut self) {
        self.bound_mesh = None;

        let fbo = match self.target {
            Some(handle) => self.registry.surfaces.get(handle).map(|v| v.fbo),
            None => None,
        };

        let visitor = self.visitor.as_mut();
        self.state.rebind_active_texture(visitor);
        if let Some(fbo) = fbo {
            visitor.bind_framebuffer(fbo);
        }
    }

    fn serve_requests(&mut self) -> Result<()> {
        for request in self.signal.take() {
            match request {
                LifecycleRequest::Suspend => self.suspend(),
                LifecycleRequest::Resume => self.resume()?,
            }
        }

        Ok(())
    }
}

/// The inverse-transpose of the upper 3x3 of `world`, which transforms normals.
fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let m = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    m.invert()
        .map(|v| v.transpose())
        .unwrap_or_else(Matrix3::identity)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normal_of_scale() {
        let world = Matrix4::from_nonuniform_scale(2.0, 4.0, 1.0);
        let n = normal_matrix(&world);
        assert_eq!(n.x.x, 0.5);
        assert_eq!(n.y.y, 0.25);
        assert_eq!(n.z.z, 1.0);
    }

    #[test]
    fn normal_of_singular() {
        let world = Matrix4::from_scale(0.0);
        assert_eq!(normal_matrix(&world), Matrix3::identity());
    }
}
