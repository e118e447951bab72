//! Materials: a shader, its textures, the fixed-function render state and the named
//! shader variables, applied as a unit before issuing draw calls.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::math::prelude::{Color, Matrix4, Vector2, Vector3, Vector4};
use crate::utils::prelude::HashValue;
use crate::video::assets::shader::Shader;
use crate::video::assets::texture::TextureHandle;

impl_handle!(MaterialHandle);

/// Blend factors.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum BlendMode {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    OneMinusDestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
}

/// Specify whether front- or back-facing polygons are culled.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CullFace {
    Front,
    Back,
}

/// A pixel-wise depth comparison function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum DepthFunction {
    Less,
    Equal,
    LessEqual,
}

/// A named value uploaded to the shader of a material.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialVariable {
    F32(f32),
    Vector2f(Vector2<f32>),
    Vector3f(Vector3<f32>),
    Vector4f(Vector4<f32>),
    Matrix4f(Matrix4<f32>),
    Matrix4fArray(Vec<Matrix4<f32>>),
    Color(Color<f32>),
}

/// The four lighting terms of a material.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lighting {
    pub emissive: Color<f32>,
    pub ambient: Color<f32>,
    pub diffuse: Color<f32>,
    pub specular: Color<f32>,
}

impl Default for Lighting {
    fn default() -> Self {
        Lighting {
            emissive: Color::transparent(),
            ambient: Color::white(),
            diffuse: Color::white(),
            specular: Color::transparent(),
        }
    }
}

/// The fixed-function render state of a material.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderFlags {
    /// Transparent materials are drawn with alpha blending enabled.
    pub transparent: bool,
    pub src_blend: BlendMode,
    pub dst_blend: BlendMode,
    pub culling: bool,
    pub cull_face: CullFace,
    pub colour_write: bool,
    pub depth_write: bool,
    pub depth_test: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        RenderFlags {
            transparent: false,
            src_blend: BlendMode::SourceAlpha,
            dst_blend: BlendMode::OneMinusSourceAlpha,
            culling: true,
            cull_face: CullFace::Back,
            colour_write: true,
            depth_write: true,
            depth_test: true,
        }
    }
}

/// A material. Every mutation clears the internal cache-validity flags, so the next
/// time it is applied the render system knows it has to re-commit it.
#[derive(Debug, Clone)]
pub struct Material {
    handle: MaterialHandle,
    shader: Option<Rc<Shader>>,
    textures: SmallVec<[TextureHandle; 4]>,
    cubemap: Option<TextureHandle>,
    flags: RenderFlags,
    lighting: Lighting,
    variables: Vec<(HashValue<str>, String, MaterialVariable)>,
    cache_valid: bool,
    variable_cache_valid: bool,
}

impl Material {
    pub fn new(handle: MaterialHandle) -> Self {
        Material {
            handle,
            shader: None,
            textures: SmallVec::new(),
            cubemap: None,
            flags: RenderFlags::default(),
            lighting: Lighting::default(),
            variables: Vec::new(),
            cache_valid: false,
            variable_cache_valid: false,
        }
    }

    #[inline]
    pub fn handle(&self) -> MaterialHandle {
        self.handle
    }

    #[inline]
    pub fn shader(&self) -> Option<&Rc<Shader>> {
        self.shader.as_ref()
    }

    pub fn set_shader(&mut self, shader: Rc<Shader>) {
        self.shader = Some(shader);
        self.invalidate();
    }

    #[inline]
    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    pub fn add_texture(&mut self, texture: TextureHandle) {
        self.textures.push(texture);
        self.cache_valid = false;
    }

    pub fn set_texture(&mut self, index: usize, texture: TextureHandle) {
        if index < self.textures.len() {
            self.textures[index] = texture;
        } else {
            self.textures.push(texture);
        }

        self.cache_valid = false;
    }

    pub fn remove_textures(&mut self) {
        self.textures.clear();
        self.cache_valid = false;
    }

    #[inline]
    pub fn cubemap(&self) -> Option<TextureHandle> {
        self.cubemap
    }

    pub fn set_cubemap(&mut self, cubemap: Option<TextureHandle>) {
        self.cubemap = cubemap;
        self.cache_valid = false;
    }

    #[inline]
    pub fn flags(&self) -> &RenderFlags {
        &self.flags
    }

    pub fn set_flags(&mut self, flags: RenderFlags) {
        if self.flags != flags {
            self.flags = flags;
            self.cache_valid = false;
        }
    }

    #[inline]
    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        if self.lighting != lighting {
            self.lighting = lighting;
            self.cache_valid = false;
        }
    }

    /// Sets the value of shader variable `name`, replacing any previous value.
    pub fn set_variable<T: Into<String>>(&mut self, name: T, variable: MaterialVariable) {
        let name = name.into();
        let hash = HashValue::from(&name);

        if let Some(v) = self.variables.iter_mut().find(|v| v.0 == hash) {
            v.2 = variable;
        } else {
            self.variables.push((hash, name, variable));
        }

        self.variable_cache_valid = false;
        self.cache_valid = false;
    }

    pub fn variable<T: AsRef<str>>(&self, name: T) -> Option<&MaterialVariable> {
        let hash = HashValue::from(name.as_ref());
        self.variables.iter().find(|v| v.0 == hash).map(|v| &v.2)
    }

    #[inline]
    pub fn variables(&self) -> impl Iterator<Item = (&str, &MaterialVariable)> + '_ {
        self.variables.iter().map(|v| (v.1.as_str(), &v.2))
    }

    /// Forces the material to be fully re-applied the next time it is used.
    pub fn invalidate(&mut self) {
        self.cache_valid = false;
        self.variable_cache_valid = false;
    }

    #[inline]
    pub fn is_cache_valid(&self) -> bool {
        self.cache_valid
    }

    #[inline]
    pub fn is_variable_cache_valid(&self) -> bool {
        self.variable_cache_valid
    }

    #[inline]
    pub(crate) fn set_cache_valid(&mut self) {
        self.cache_valid = true;
    }

    #[inline]
    pub(crate) fn set_variable_cache_valid(&mut self) {
        self.variable_cache_valid = true;
    }
}
