use failure::Fail;

use crate::video::assets::material::MaterialHandle;
use crate::video::assets::mesh::MeshHandle;
use crate::video::assets::surface::SurfaceHandle;
use crate::video::assets::texture::TextureHandle;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "OpenGL implementation doesn't support {}.", _0)]
    Requirement(String),
    #[fail(
        display = "Vertex layout requires {} attributes, but the device supports only {}.",
        required, supported
    )]
    TooManyVertexAttributes { required: usize, supported: usize },
    #[fail(display = "{} does not have a shader.", _0)]
    ShaderAbsent(MaterialHandle),
    #[fail(display = "Nothing could be drawn before a material has been applied.")]
    MaterialAbsent,
    #[fail(display = "{} is invalid.", _0)]
    MeshHandleInvalid(MeshHandle),
    #[fail(display = "{} is invalid.", _0)]
    TextureHandleInvalid(TextureHandle),
    #[fail(display = "{} is invalid.", _0)]
    SurfaceHandleInvalid(SurfaceHandle),
    #[fail(display = "Mesh has {} vertices, which exceeds the 16-bit index limit.", _0)]
    TooManyVertices(usize),
    #[fail(display = "Out of bounds.")]
    OutOfBounds,
    #[fail(display = "The GPU context is lost.")]
    ContextLost,
    #[fail(display = "Backend: {}", _0)]
    Backend(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::failure::Error> for Error {
    fn from(err: ::failure::Error) -> Error {
        Error::Backend(format!("{}", err))
    }
}
