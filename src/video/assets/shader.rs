//! Linked shader programs as seen by the render core: a GPU program id plus the
//! locations its attributes and uniforms were assigned by the driver.
//!
//! Compiling and linking shaders is the job of the resource pool. The render core only
//! needs to know which program to bind and where to upload values.

use crate::math::prelude::{Color, Matrix3, Matrix4, Vector2, Vector3, Vector4};
use crate::utils::prelude::{FastHashMap, HashValue};

impl_handle!(ShaderHandle);

/// The location of a uniform variable inside a linked program.
pub type UniformLocation = i32;

/// The possible pre-defined and named attributes in the vertex component, describing
/// what the vertex component is used for.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Attribute {
    Position = 0,
    Normal = 1,
    Tangent = 2,
    Color = 3,
    Texcoord0 = 4,
    Texcoord1 = 5,
    JointIndices = 6,
    JointWeights = 7,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Position,
        Attribute::Normal,
        Attribute::Tangent,
        Attribute::Color,
        Attribute::Texcoord0,
        Attribute::Texcoord1,
        Attribute::JointIndices,
        Attribute::JointWeights,
    ];

    /// The name this attribute is declared with in shader sources.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Position => "a_position",
            Attribute::Normal => "a_normal",
            Attribute::Tangent => "a_tangent",
            Attribute::Color => "a_colour",
            Attribute::Texcoord0 => "a_texCoord",
            Attribute::Texcoord1 => "a_texCoord1",
            Attribute::JointIndices => "a_jointIndices",
            Attribute::JointWeights => "a_jointWeights",
        }
    }
}

/// A linked GPU program.
#[derive(Debug, Clone)]
pub struct Shader {
    handle: ShaderHandle,
    program: u32,
    attributes: FastHashMap<HashValue<str>, u32>,
    uniforms: FastHashMap<HashValue<str>, UniformLocation>,
}

impl Shader {
    pub fn new(handle: ShaderHandle, program: u32) -> Self {
        Shader {
            handle,
            program,
            attributes: FastHashMap::default(),
            uniforms: FastHashMap::default(),
        }
    }

    /// Declares that the program consumes `attribute` at `location`.
    pub fn with_attribute(mut self, attribute: Attribute, location: u32) -> Self {
        self.attributes.insert(attribute.name().into(), location);
        self
    }

    /// Declares an active uniform named `name` at `location`.
    pub fn with_uniform<T: AsRef<str>>(mut self, name: T, location: UniformLocation) -> Self {
        self.uniforms.insert(name.into(), location);
        self
    }

    #[inline]
    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    #[inline]
    pub fn program_id(&self) -> u32 {
        self.program
    }

    /// Gets the location of uniform `name`, or `None` if the program does not declare it.
    pub fn uniform_location<T>(&self, name: T) -> Option<UniformLocation>
    where
        T: Into<HashValue<str>>,
    {
        self.uniforms.get(&name.into()).cloned()
    }

    /// Gets the slot of attribute `attribute`, or `None` if the program does not consume it.
    pub fn attribute_location(&self, attribute: Attribute) -> Option<u32> {
        self.attributes
            .get(&HashValue::from(attribute.name()))
            .cloned()
    }
}

/// Uniform variable for program object. Each matrix based `UniformVariable`
/// is assumed to be supplied in column major order, the way `cgmath` stores them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformVariable {
    I32(i32),
    F32(f32),
    Vector2f([f32; 2]),
    Vector3f([f32; 3]),
    Vector4f([f32; 4]),
    Matrix3f([[f32; 3]; 3]),
    Matrix4f([[f32; 4]; 4]),
}

impl Into<UniformVariable> for i32 {
    fn into(self) -> UniformVariable {
        UniformVariable::I32(self)
    }
}

impl Into<UniformVariable> for f32 {
    fn into(self) -> UniformVariable {
        UniformVariable::F32(self)
    }
}

impl Into<UniformVariable> for Vector2<f32> {
    fn into(self) -> UniformVariable {
        UniformVariable::Vector2f(self.into())
    }
}

impl Into<UniformVariable> for Vector3<f32> {
    fn into(self) -> UniformVariable {
        UniformVariable::Vector3f(self.into())
    }
}

impl Into<UniformVariable> for Vector4<f32> {
    fn into(self) -> UniformVariable {
        UniformVariable::Vector4f(self.into())
    }
}

impl Into<UniformVariable> for Matrix3<f32> {
    fn into(self) -> UniformVariable {
        UniformVariable::Matrix3f(self.into())
    }
}

impl Into<UniformVariable> for Matrix4<f32> {
    fn into(self) -> UniformVariable {
        UniformVariable::Matrix4f(self.into())
    }
}

impl Into<UniformVariable> for Color<f32> {
    fn into(self) -> UniformVariable {
        UniformVariable::Vector4f(self.rgba())
    }
}
