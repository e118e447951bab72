//! The attribute pointers bound to every vertex attribute slot.
//!
//! The number of slots is a device limit which is unknown until a context exists, so the
//! cache is allocated the first time a buffer is drawn and keeps its size afterwards.

use super::assets::prelude::{MeshHandle, VertexAttribute, VertexFormat};
use super::backends::Visitor;
use super::errors::{Error, Result};

/// The parameters last bound to an attribute slot. `buffer` is only compared, the cache
/// never owns the mesh it names.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    pub buffer: MeshHandle,
    pub size: u8,
    pub format: VertexFormat,
    pub normalized: bool,
    pub stride: u8,
    pub offset: u8,
}

#[derive(Debug, Default)]
pub struct VertexAttributeCache {
    capacity: Option<usize>,
    bindings: Vec<Option<AttributeBinding>>,
    enabled: Vec<bool>,
    last_enabled: Vec<bool>,
}

impl VertexAttributeCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Queries the number of attribute slots of the device the first time it is called,
    /// and fails if a vertex layout requires more attributes than that.
    pub fn ensure_capacity(&mut self, visitor: &mut dyn Visitor, required: usize) -> Result<usize> {
        let capacity = match self.capacity {
            Some(v) => v,
            None => {
                let v = visitor.max_vertex_attributes() as usize;
                self.bindings = vec![None; v];
                self.enabled = vec![false; v];
                self.last_enabled = vec![false; v];
                self.capacity = Some(v);
                v
            }
        };

        if required > capacity {
            let err = Error::TooManyVertexAttributes {
                required,
                supported: capacity,
            };

            error!("{}", err);
            return Err(err);
        }

        Ok(capacity)
    }

    /// The number of attribute slots, `None` until the first draw call.
    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Forgets every slot bound to `buffer`, so the next draw of it re-issues the full
    /// pointer setup.
    pub fn mark_buffer_stale(&mut self, buffer: MeshHandle) {
        for v in &mut self.bindings {
            if v.map(|b| b.buffer == buffer).unwrap_or(false) {
                *v = None;
            }
        }
    }

    /// Forgets every binding.
    pub fn reset(&mut self) {
        for v in &mut self.bindings {
            *v = None;
        }
    }

    /// Starts the attribute setup of a draw call. Slots not bound before `commit` will be
    /// disabled.
    pub fn begin(&mut self) {
        for v in &mut self.enabled {
            *v = false;
        }
    }

    /// Points `slot` at `attribute` of `buffer`, which must be bound as the current vertex
    /// buffer. Binding the same parameters a slot already holds is a no-op.
    pub fn bind(
        &mut self,
        visitor: &mut dyn Visitor,
        buffer: MeshHandle,
        slot: u32,
        attribute: &VertexAttribute,
        stride: u8,
    ) -> Result<()> {
        let index = slot as usize;
        if index >= self.bindings.len() {
            return Err(Error::OutOfBounds);
        }

        let binding = AttributeBinding {
            buffer,
            size: attribute.size,
            format: attribute.format,
            normalized: attribute.normalized,
            stride,
            offset: attribute.offset,
        };

        if self.bindings[index] != Some(binding) {
            visitor.vertex_attrib_pointer(slot, attribute, stride);
            self.bindings[index] = Some(binding);
        }

        self.enabled[index] = true;
        Ok(())
    }

    /// Issues the enable and disable calls required by the slots bound since `begin`.
    pub fn commit(&mut self, visitor: &mut dyn Visitor, invalidate: bool) {
        for (i, (&enabled, last)) in self
            .enabled
            .iter()
            .zip(self.last_enabled.iter_mut())
            .enumerate()
        {
            if invalidate || enabled != *last {
                visitor.set_vertex_attrib_array(i as u32, enabled);
                *last = enabled;
            }
        }
    }

    #[inline]
    pub fn binding(&self, slot: u32) -> Option<AttributeBinding> {
        self.bindings.get(slot as usize).cloned().and_then(|v| v)
    }

    #[inline]
    pub fn is_enabled(&self, slot: u32) -> bool {
        self.last_enabled.get(slot as usize).cloned().unwrap_or(false)
    }
}
