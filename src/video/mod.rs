//! The render-state caching and draw-submission core.
//!
//! `RenderSystem` is the entry point. It owns a `RenderStateCache`, a
//! `VertexAttributeCache`, the material application session and the
//! `ContextLifecycle`, and submits everything through a `Visitor`.

pub mod applicator;
pub mod assets;
pub mod attributes;
pub mod backends;
pub mod errors;
pub mod lifecycle;
pub mod settings;
pub mod state;
pub mod system;

/// The maximum number of elements of a single vertex layout.
pub const MAX_VERTEX_ATTRIBUTES: usize = 12;
/// Indices are 16-bit, so a single mesh can not address more vertices than this.
pub const MAX_VERTICES: usize = 65_535;

pub mod prelude {
    pub use super::applicator::MaterialSession;
    pub use super::assets::prelude::*;
    pub use super::attributes::{AttributeBinding, VertexAttributeCache};
    pub use super::backends::headless::{Call, HeadlessLog, HeadlessVisitor};
    pub use super::backends::{Capability, Visitor};
    pub use super::errors::{Error, Result};
    pub use super::lifecycle::{
        ContextLifecycle, ContextState, LifecycleRequest, LifecycleSignal, ResourceBackup,
    };
    pub use super::settings::RenderSettings;
    pub use super::state::RenderStateCache;
    pub use super::system::{FrameInfo, RenderSystem};
}
