//! # What is This?
//!
//! The render-state core of crayon. It sits between the frame orchestration loop and the
//! OpenGL driver, and is responsible for one thing: committing GPU pipeline state and draw
//! calls with as few redundant driver calls as possible.
//!
//! The core is made of a few small pieces:
//!
//! 1. `RenderStateCache` remembers the last value committed for every fixed-function toggle
//! (blending, depth, culling, scissor) and only talks to the driver when something changes.
//! 2. `VertexAttributeCache` remembers the attribute pointers bound to every vertex attribute
//! slot.
//! 3. `apply_material` translates a `Material` into the minimal set of state changes and
//! uniform uploads.
//! 4. `ContextLifecycle` captures and restores GPU resources when the platform revokes the
//! GL context behind our back (mobile backgrounding).
//!
//! `RenderSystem` owns all of them and drives the per-frame `begin_frame`/`apply_*`/`render_*`/
//! `end_frame` sequence. Everything is submitted through the `Visitor` trait, which has an
//! OpenGL implementation and a headless, recording one.
//!
//! ```rust
//! use crayon_renderstate::prelude::*;
//!
//! let visitor = HeadlessVisitor::new();
//! let mut video = RenderSystem::new(Box::new(visitor), RenderSettings::default()).unwrap();
//!
//! video.begin_frame(None).unwrap();
//! video.end_frame(None).unwrap();
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub extern crate cgmath;
#[cfg(not(target_arch = "wasm32"))]
pub extern crate gl;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod math;
pub mod video;

pub mod prelude;
