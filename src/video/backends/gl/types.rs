use gl;
use gl::types::*;

use super::super::super::assets::prelude::*;
use super::super::Capability;
use super::capabilities::{Capabilities, Version};

/// Unsized pixel format of alpha textures on ES 2.0.
const ALPHA: GLenum = 0x1906;

impl From<Capability> for GLenum {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::Blend => gl::BLEND,
            Capability::DepthTest => gl::DEPTH_TEST,
            Capability::CullFace => gl::CULL_FACE,
            Capability::ScissorTest => gl::SCISSOR_TEST,
        }
    }
}

impl From<MeshHint> for GLenum {
    fn from(hint: MeshHint) -> Self {
        match hint {
            MeshHint::Immutable => gl::STATIC_DRAW,
            MeshHint::Stream => gl::STREAM_DRAW,
            MeshHint::Dynamic => gl::DYNAMIC_DRAW,
        }
    }
}

impl From<DepthFunction> for GLenum {
    fn from(func: DepthFunction) -> Self {
        match func {
            DepthFunction::Less => gl::LESS,
            DepthFunction::Equal => gl::EQUAL,
            DepthFunction::LessEqual => gl::LEQUAL,
        }
    }
}

impl From<CullFace> for GLenum {
    fn from(face: CullFace) -> Self {
        match face {
            CullFace::Front => gl::FRONT,
            CullFace::Back => gl::BACK,
        }
    }
}

impl From<BlendMode> for GLenum {
    fn from(mode: BlendMode) -> Self {
        match mode {
            BlendMode::Zero => gl::ZERO,
            BlendMode::One => gl::ONE,
            BlendMode::SourceColor => gl::SRC_COLOR,
            BlendMode::OneMinusSourceColor => gl::ONE_MINUS_SRC_COLOR,
            BlendMode::SourceAlpha => gl::SRC_ALPHA,
            BlendMode::OneMinusSourceAlpha => gl::ONE_MINUS_SRC_ALPHA,
            BlendMode::DestinationColor => gl::DST_COLOR,
            BlendMode::OneMinusDestinationColor => gl::ONE_MINUS_DST_COLOR,
            BlendMode::DestinationAlpha => gl::DST_ALPHA,
            BlendMode::OneMinusDestinationAlpha => gl::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl From<VertexFormat> for GLenum {
    fn from(format: VertexFormat) -> Self {
        match format {
            VertexFormat::Byte => gl::BYTE,
            VertexFormat::UByte => gl::UNSIGNED_BYTE,
            VertexFormat::Short => gl::SHORT,
            VertexFormat::UShort => gl::UNSIGNED_SHORT,
            VertexFormat::Float => gl::FLOAT,
        }
    }
}

impl From<MeshPrimitive> for GLenum {
    fn from(primitive: MeshPrimitive) -> Self {
        match primitive {
            MeshPrimitive::Points => gl::POINTS,
            MeshPrimitive::Lines => gl::LINES,
            MeshPrimitive::LineStrip => gl::LINE_STRIP,
            MeshPrimitive::Triangles => gl::TRIANGLES,
            MeshPrimitive::TriangleStrip => gl::TRIANGLE_STRIP,
        }
    }
}

impl From<TextureTarget> for GLenum {
    fn from(target: TextureTarget) -> Self {
        match target {
            TextureTarget::Texture2D => gl::TEXTURE_2D,
            TextureTarget::CubeMap => gl::TEXTURE_CUBE_MAP,
        }
    }
}

impl From<TextureWrap> for GLenum {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Repeat => gl::REPEAT,
            TextureWrap::Clamp => gl::CLAMP_TO_EDGE,
        }
    }
}

impl From<TextureFilter> for GLenum {
    fn from(filter: TextureFilter) -> Self {
        match filter {
            TextureFilter::Nearest => gl::NEAREST,
            TextureFilter::Linear => gl::LINEAR,
        }
    }
}

/// The image targets of every face of a texture, in upload order.
pub fn texture_faces(target: TextureTarget) -> &'static [GLenum] {
    const TEXTURE_2D: [GLenum; 1] = [gl::TEXTURE_2D];
    const CUBE_MAP: [GLenum; 6] = [
        gl::TEXTURE_CUBE_MAP_POSITIVE_X,
        gl::TEXTURE_CUBE_MAP_NEGATIVE_X,
        gl::TEXTURE_CUBE_MAP_POSITIVE_Y,
        gl::TEXTURE_CUBE_MAP_NEGATIVE_Y,
        gl::TEXTURE_CUBE_MAP_POSITIVE_Z,
        gl::TEXTURE_CUBE_MAP_NEGATIVE_Z,
    ];

    match target {
        TextureTarget::Texture2D => &TEXTURE_2D,
        TextureTarget::CubeMap => &CUBE_MAP,
    }
}

/// Returns `(internal_format, format, pixel_type)` of a texture format.
pub fn texture_format(format: TextureFormat, caps: &Capabilities) -> (GLenum, GLenum, GLenum) {
    let sized = match caps.version {
        Version::GL(_, _) => true,
        Version::ES(major, _) => major >= 3,
    };

    if sized {
        match format {
            TextureFormat::Alpha8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
            TextureFormat::RGB8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
            TextureFormat::RGBA8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        }
    } else {
        match format {
            TextureFormat::Alpha8 => (ALPHA, ALPHA, gl::UNSIGNED_BYTE),
            TextureFormat::RGB8 => (gl::RGB, gl::RGB, gl::UNSIGNED_BYTE),
            TextureFormat::RGBA8 => (gl::RGBA, gl::RGBA, gl::UNSIGNED_BYTE),
        }
    }
}
