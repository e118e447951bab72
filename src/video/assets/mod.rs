pub mod light;
pub mod material;
pub mod mesh;
pub mod shader;
pub mod surface;
pub mod texture;

pub mod prelude {
    pub use super::light::{Attenuation, Light, ShadowMap};

    pub use super::material::{
        BlendMode, CullFace, DepthFunction, Lighting, Material, MaterialHandle, MaterialVariable,
        RenderFlags,
    };

    pub use super::mesh::{
        MeshData, MeshHandle, MeshHint, MeshParams, MeshPrimitive, VertexAttribute, VertexFormat,
        VertexLayout, VertexLayoutBuilder,
    };

    pub use super::shader::{Attribute, Shader, ShaderHandle, UniformLocation, UniformVariable};

    pub use super::surface::{SurfaceHandle, SurfaceParams};

    pub use super::texture::{
        TextureData, TextureFilter, TextureFormat, TextureHandle, TextureParams, TextureTarget,
        TextureWrap,
    };
}
