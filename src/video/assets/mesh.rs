//! Immutable or dynamic vertex and index data.

use crate::video::assets::shader::Attribute;
use crate::video::errors::{Error, Result};
use crate::video::{MAX_VERTEX_ATTRIBUTES, MAX_VERTICES};

impl_handle!(MeshHandle);

/// Hint abouts the intended update strategy of the data.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MeshHint {
    /// The resource is initialized with data and cannot be changed later, this
    /// is the most common and most efficient usage.
    Immutable,
    /// The resource is initialized without data, but will be be updated by the
    /// CPU in each frame.
    Stream,
    /// The resource is initialized without data and will be written by the CPU
    /// before use, updates will be infrequent.
    Dynamic,
}

/// Defines how the input vertex data is used to assemble primitives.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MeshPrimitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl MeshPrimitive {
    /// Returns the number of primitives assembled from `indices` vertices.
    pub fn assemble(self, indices: u32) -> u32 {
        match self {
            MeshPrimitive::Points => indices,
            MeshPrimitive::Lines => indices / 2,
            MeshPrimitive::LineStrip => indices.saturating_sub(1),
            MeshPrimitive::Triangles => indices / 3,
            MeshPrimitive::TriangleStrip => indices.saturating_sub(2),
        }
    }
}

/// The data type in the vertex component.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VertexFormat {
    Byte,
    UByte,
    Short,
    UShort,
    Float,
}

impl VertexFormat {
    pub fn size(self) -> u8 {
        match self {
            VertexFormat::Byte | VertexFormat::UByte => 1,
            VertexFormat::Short | VertexFormat::UShort => 2,
            VertexFormat::Float => 4,
        }
    }
}

/// The details of a vertex attribute.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VertexAttribute {
    /// The name of this description.
    pub name: Attribute,
    /// The data type of each component of this element.
    pub format: VertexFormat,
    /// The number of components per generic vertex element.
    pub size: u8,
    /// Whether fixed-point data values should be normalized.
    pub normalized: bool,
    /// Byte offset from the start of the vertex.
    pub offset: u8,
}

/// `VertexLayout` defines how a single vertex structure looks like. Elements are
/// interleaved in declaration order.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct VertexLayout {
    stride: u8,
    elements: Vec<VertexAttribute>,
}

impl VertexLayout {
    #[inline]
    pub fn build() -> VertexLayoutBuilder {
        VertexLayoutBuilder::new()
    }

    /// Stride of single vertex structure.
    #[inline]
    pub fn stride(&self) -> u8 {
        self.stride
    }

    /// Returns the number of elements in the layout.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> ::std::slice::Iter<VertexAttribute> {
        self.elements.iter()
    }

    /// Returns named `Attribute` from the layout.
    pub fn element(&self, name: Attribute) -> Option<VertexAttribute> {
        self.elements.iter().find(|v| v.name == name).cloned()
    }
}

/// Helper structure to build a vertex layout.
#[derive(Default)]
pub struct VertexLayoutBuilder(VertexLayout);

impl VertexLayoutBuilder {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with(mut self, name: Attribute, format: VertexFormat, size: u8, normalized: bool) -> Self {
        assert!(size > 0 && size <= 4);

        let desc = VertexAttribute {
            name,
            format,
            size,
            normalized,
            offset: 0,
        };

        if let Some(v) = self.0.elements.iter_mut().find(|v| v.name == name) {
            *v = desc;
            return self;
        }

        assert!(self.0.elements.len() < MAX_VERTEX_ATTRIBUTES);
        self.0.elements.push(desc);
        self
    }

    pub fn finish(mut self) -> VertexLayout {
        let mut stride = 0;
        for v in &mut self.0.elements {
            v.offset = stride;
            stride += v.size * v.format.size();
        }

        self.0.stride = stride;
        self.0
    }
}

/// The parameters of a mesh object. Indices are always 16-bit.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshParams {
    pub hint: MeshHint,
    pub layout: VertexLayout,
    pub primitive: MeshPrimitive,
    pub num_verts: usize,
    pub num_idxes: usize,
}

impl Default for MeshParams {
    fn default() -> Self {
        MeshParams {
            hint: MeshHint::Immutable,
            layout: VertexLayout::default(),
            primitive: MeshPrimitive::Triangles,
            num_verts: 0,
            num_idxes: 0,
        }
    }
}

impl MeshParams {
    #[inline]
    pub fn vertex_buffer_len(&self) -> usize {
        self.num_verts * self.layout.stride() as usize
    }

    #[inline]
    pub fn index_buffer_len(&self) -> usize {
        self.num_idxes * 2
    }

    pub fn validate(&self, data: Option<&MeshData>) -> Result<()> {
        if self.num_verts > MAX_VERTICES {
            return Err(Error::TooManyVertices(self.num_verts));
        }

        if let Some(data) = data {
            if data.vptr.len() > self.vertex_buffer_len() {
                return Err(Error::OutOfBounds);
            }

            if data.iptr.len() > self.index_buffer_len() {
                return Err(Error::OutOfBounds);
            }
        }

        Ok(())
    }
}

/// The raw bytes of a mesh. It is also the CPU-side shadow copy captured before a
/// context loss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vptr: Vec<u8>,
    pub iptr: Vec<u8>,
}

impl MeshData {
    /// Packs 16-bit indices into bytes, in native endianness.
    pub fn indices(values: &[u16]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(values.len() * 2);
        for v in values {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }

        bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout() {
        let layout = VertexLayout::build()
            .with(Attribute::Position, VertexFormat::Float, 3, false)
            .with(Attribute::Color, VertexFormat::UByte, 4, true)
            .with(Attribute::Texcoord0, VertexFormat::Float, 2, false)
            .finish();

        assert_eq!(layout.len(), 3);
        assert_eq!(layout.stride(), 12 + 4 + 8);
        assert_eq!(layout.element(Attribute::Color).unwrap().offset, 12);
        assert_eq!(layout.element(Attribute::Texcoord0).unwrap().offset, 16);
        assert!(layout.element(Attribute::Normal).is_none());
    }

    #[test]
    fn sixteen_bit_limit() {
        let mut params = MeshParams::default();
        params.num_verts = MAX_VERTICES;
        assert!(params.validate(None).is_ok());

        params.num_verts = MAX_VERTICES + 1;
        assert!(params.validate(None).is_err());
    }

    #[test]
    fn assemble() {
        assert_eq!(MeshPrimitive::Triangles.assemble(6), 2);
        assert_eq!(MeshPrimitive::TriangleStrip.assemble(1), 0);
    }
}
