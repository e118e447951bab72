//! Survives the platform revoking the GL context behind our back (mobile backgrounding).
//!
//! Every GPU resource is tracked from creation until it is deleted. On suspend, CPU-side
//! shadow copies of all of them are captured. On resume they are recreated from those
//! copies in creation order, meshes first, then textures, then the surfaces drawing into
//! those textures.
//!
//! The platform layer usually learns about backgrounding on another thread, so requests
//! are posted through a `LifecycleSignal` and served by the render thread at frame
//! boundaries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::assets::prelude::{MeshData, MeshHandle, SurfaceHandle, TextureData, TextureHandle};
use super::errors::Result;
use crate::utils::prelude::FastHashMap;

/// Captures and recreates the GPU objects behind resource handles.
pub trait ResourceBackup {
    fn backup_mesh(&mut self, handle: MeshHandle) -> Result<MeshData>;

    fn backup_texture(&mut self, handle: TextureHandle) -> Result<TextureData>;

    /// Recreates the buffers of `handle`, with `data` as contents if the capture succeeded.
    fn restore_mesh(&mut self, handle: MeshHandle, data: Option<&MeshData>) -> Result<()>;

    fn restore_texture(&mut self, handle: TextureHandle, data: Option<&TextureData>) -> Result<()>;

    fn restore_surface(&mut self, handle: SurfaceHandle) -> Result<()>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextState {
    /// The context is valid and rendering proceeds normally.
    Active,
    /// Shadow copies have been captured and the context is, or is about to be, gone.
    BackedUp,
}

#[derive(Debug)]
pub struct ContextLifecycle {
    enabled: bool,
    state: ContextState,
    meshes: Vec<MeshHandle>,
    textures: Vec<TextureHandle>,
    surfaces: Vec<SurfaceHandle>,
    mesh_shadows: FastHashMap<MeshHandle, MeshData>,
    texture_shadows: FastHashMap<TextureHandle, TextureData>,
}

impl ContextLifecycle {
    /// Creates a lifecycle manager. When `enabled` is false the context is assumed to live
    /// forever, and suspend and resume are no-ops.
    pub fn new(enabled: bool) -> Self {
        ContextLifecycle {
            enabled,
            state: ContextState::Active,
            meshes: Vec::new(),
            textures: Vec::new(),
            surfaces: Vec::new(),
            mesh_shadows: FastHashMap::default(),
            texture_shadows: FastHashMap::default(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    #[inline]
    pub fn has_context(&self) -> bool {
        self.state == ContextState::Active
    }

    pub fn track_mesh(&mut self, handle: MeshHandle) {
        if !self.meshes.contains(&handle) {
            self.meshes.push(handle);
        }
    }

    pub fn untrack_mesh(&mut self, handle: MeshHandle) {
        self.meshes.retain(|v| *v != handle);
        self.mesh_shadows.remove(&handle);
    }

    pub fn track_texture(&mut self, handle: TextureHandle) {
        if !self.textures.contains(&handle) {
            self.textures.push(handle);
        }
    }

    pub fn untrack_texture(&mut self, handle: TextureHandle) {
        self.textures.retain(|v| *v != handle);
        self.texture_shadows.remove(&handle);
    }

    pub fn track_surface(&mut self, handle: SurfaceHandle) {
        if !self.surfaces.contains(&handle) {
            self.surfaces.push(handle);
        }
    }

    pub fn untrack_surface(&mut self, handle: SurfaceHandle) {
        self.surfaces.retain(|v| *v != handle);
    }

    /// The tracked meshes, in creation order.
    #[inline]
    pub fn meshes(&self) -> &[MeshHandle] {
        &self.meshes
    }

    /// The tracked textures, in creation order.
    #[inline]
    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    #[inline]
    pub fn surfaces(&self) -> &[SurfaceHandle] {
        &self.surfaces
    }

    /// Captures shadow copies of every tracked resource and gives up the context. Returns
    /// false if nothing was done, because the manager is disabled or everything has been
    /// captured already.
    pub fn suspend<B: ResourceBackup + ?Sized>(&mut self, backup: &mut B) -> bool {
        if !self.enabled || self.state == ContextState::BackedUp {
            return false;
        }

        for &handle in &self.meshes {
            match backup.backup_mesh(handle) {
                Ok(data) => {
                    self.mesh_shadows.insert(handle, data);
                }
                Err(err) => warn!("Failed to back up {}, its contents will be lost. {}", handle, err),
            }
        }

        for &handle in &self.textures {
            match backup.backup_texture(handle) {
                Ok(data) => {
                    self.texture_shadows.insert(handle, data);
                }
                Err(err) => warn!("Failed to back up {}, its contents will be lost. {}", handle, err),
            }
        }

        info!(
            "Context suspended with {} meshes, {} textures and {} surfaces backed up.",
            self.meshes.len(),
            self.textures.len(),
            self.surfaces.len()
        );

        self.state = ContextState::BackedUp;
        true
    }

    /// Recreates every tracked resource from its shadow copy. Every resource is attempted
    /// even if some fail, the first failure is returned.
    pub fn resume<B: ResourceBackup + ?Sized>(&mut self, backup: &mut B) -> Result<bool> {
        if !self.enabled || self.state == ContextState::Active {
            return Ok(false);
        }

        let mut first = None;

        for &handle in &self.meshes {
            if let Err(err) = backup.restore_mesh(handle, self.mesh_shadows.get(&handle)) {
                error!("Failed to restore {}. {}", handle, err);
                first = first.or(Some(err));
            }
        }

        for &handle in &self.textures {
            if let Err(err) = backup.restore_texture(handle, self.texture_shadows.get(&handle)) {
                error!("Failed to restore {}. {}", handle, err);
                first = first.or(Some(err));
            }
        }

        for &handle in &self.surfaces {
            if let Err(err) = backup.restore_surface(handle) {
                error!("Failed to restore {}. {}", handle, err);
                first = first.or(Some(err));
            }
        }

        self.mesh_shadows.clear();
        self.texture_shadows.clear();
        self.state = ContextState::Active;

        info!("Context resumed.");

        match first {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }
}

/// A lifecycle transition requested by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleRequest {
    Suspend,
    Resume,
}

/// A cloneable, thread-safe mailbox of lifecycle requests. The render thread drains it
/// at `begin_frame` and `end_frame`.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSignal(Arc<Mutex<VecDeque<LifecycleRequest>>>);

impl LifecycleSignal {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn request_suspend(&self) {
        self.push(LifecycleRequest::Suspend);
    }

    pub fn request_resume(&self) {
        self.push(LifecycleRequest::Resume);
    }

    /// Takes every pending request, in the order they were posted.
    pub fn take(&self) -> Vec<LifecycleRequest> {
        match self.0.lock() {
            Ok(mut v) => v.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    fn push(&self, request: LifecycleRequest) {
        match self.0.lock() {
            Ok(mut v) => v.push_back(request),
            Err(poisoned) => poisoned.into_inner().push_back(request),
        }
    }
}
