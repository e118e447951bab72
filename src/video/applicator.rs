//! Translates a `Material` into the minimal set of state changes and uniform uploads.
//!
//! The session remembers the material and program bound last. Applying the same,
//! unmodified material again uploads nothing, which is what makes consecutive draws
//! sharing a material cheap. Switching to another material re-uploads its variables even
//! when the program stays, since uniform values live in the program.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::math::prelude::Color;

use super::assets::prelude::*;
use super::errors::{Error, Result};
use super::system::RenderSystem;

pub const U_WVP_MATRIX: &str = "u_wvpMat";
pub const U_WORLD_MATRIX: &str = "u_worldMat";
pub const U_NORMAL_MATRIX: &str = "u_normalMat";
pub const U_CAMERA_POSITION: &str = "u_cameraPos";
pub const U_EMISSIVE: &str = "u_emissive";
pub const U_AMBIENT: &str = "u_ambient";
pub const U_DIFFUSE: &str = "u_diffuse";
pub const U_SPECULAR: &str = "u_specular";
pub const U_LIGHT_DIRECTION: &str = "u_lightDir";
pub const U_LIGHT_POSITION: &str = "u_lightPos";
pub const U_LIGHT_COLOUR: &str = "u_lightCol";
pub const U_ATTENUATION_CONSTANT: &str = "u_attenConst";
pub const U_ATTENUATION_LINEAR: &str = "u_attenLinear";
pub const U_ATTENUATION_QUADRATIC: &str = "u_attenQuad";
pub const U_SHADOW_MAP: &str = "u_shadowMap";
pub const U_SHADOW_TOLERANCE: &str = "u_shadowTolerance";
pub const U_LIGHT_MATRIX: &str = "u_lightWVPMat";
pub const U_CUBEMAP: &str = "u_cubemap";
pub const U_JOINTS: &str = "u_joints";

/// Samplers of plain textures are named `u_texture0`, `u_texture1` and so on.
pub const U_TEXTURE_PREFIX: &str = "u_texture";

/// The locations of the built-in uniforms and attributes in the bound program.
#[derive(Debug, Default, Clone)]
pub(crate) struct ProgramLocations {
    pub wvp: Option<UniformLocation>,
    pub world: Option<UniformLocation>,
    pub normal: Option<UniformLocation>,
    pub camera_position: Option<UniformLocation>,
    pub lighting: [Option<UniformLocation>; 4],
    pub light_direction: Option<UniformLocation>,
    pub light_position: Option<UniformLocation>,
    pub light_colour: Option<UniformLocation>,
    pub attenuation: [Option<UniformLocation>; 3],
    pub shadow_map: Option<UniformLocation>,
    pub shadow_tolerance: Option<UniformLocation>,
    pub light_matrix: Option<UniformLocation>,
    pub cubemap: Option<UniformLocation>,
    pub joints: Option<UniformLocation>,
    pub textures: SmallVec<[Option<UniformLocation>; 8]>,
    pub attributes: [Option<u32>; 8],
}

impl ProgramLocations {
    /// Resolves every built-in name against `shader`. Different programs assign different
    /// locations to the same name, so this runs each time the program changes.
    pub fn resolve(shader: &Shader, texture_units: u32) -> Self {
        let mut attributes = [None; 8];
        for &v in Attribute::ALL.iter() {
            attributes[v as usize] = shader.attribute_location(v);
        }

        ProgramLocations {
            wvp: shader.uniform_location(U_WVP_MATRIX),
            world: shader.uniform_location(U_WORLD_MATRIX),
            normal: shader.uniform_location(U_NORMAL_MATRIX),
            camera_position: shader.uniform_location(U_CAMERA_POSITION),
            lighting: [
                shader.uniform_location(U_EMISSIVE),
                shader.uniform_location(U_AMBIENT),
                shader.uniform_location(U_DIFFUSE),
                shader.uniform_location(U_SPECULAR),
            ],
            light_direction: shader.uniform_location(U_LIGHT_DIRECTION),
            light_position: shader.uniform_location(U_LIGHT_POSITION),
            light_colour: shader.uniform_location(U_LIGHT_COLOUR),
            attenuation: [
                shader.uniform_location(U_ATTENUATION_CONSTANT),
                shader.uniform_location(U_ATTENUATION_LINEAR),
                shader.uniform_location(U_ATTENUATION_QUADRATIC),
            ],
            shadow_map: shader.uniform_location(U_SHADOW_MAP),
            shadow_tolerance: shader.uniform_location(U_SHADOW_TOLERANCE),
            light_matrix: shader.uniform_location(U_LIGHT_MATRIX),
            cubemap: shader.uniform_location(U_CUBEMAP),
            joints: shader.uniform_location(U_JOINTS),
            textures: (0..texture_units)
                .map(|i| shader.uniform_location(format!("{}{}", U_TEXTURE_PREFIX, i)))
                .collect(),
            attributes,
        }
    }

    #[inline]
    pub fn attribute(&self, name: Attribute) -> Option<u32> {
        self.attributes[name as usize]
    }
}

/// What has been committed for the material bound last.
#[derive(Debug, Default)]
pub struct MaterialSession {
    material: Option<MaterialHandle>,
    shader: Option<Rc<Shader>>,
    program: Option<u32>,
    pub(crate) locations: ProgramLocations,
    lighting: [Option<Color<f32>>; 4],
    lighting_invalid: bool,
    texture_units: u32,
}

impl MaterialSession {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }

    #[inline]
    pub fn shader(&self) -> Option<&Rc<Shader>> {
        self.shader.as_ref()
    }

    #[inline]
    pub fn program(&self) -> Option<u32> {
        self.program
    }

    /// The texture units consumed by the material bound last.
    #[inline]
    pub fn texture_units(&self) -> u32 {
        self.texture_units
    }

    /// Returns true if the light uniforms still have to be uploaded.
    #[inline]
    pub fn is_lighting_invalid(&self) -> bool {
        self.lighting_invalid
    }

    /// Forgets everything, the bound material and program refer to GPU names of a lost
    /// context.
    pub fn clear(&mut self) {
        *self = MaterialSession::default();
    }

    /// Forces the next material application to go through the full path, and the light
    /// uniforms to be uploaded.
    pub fn invalidate_lighting(&mut self) {
        self.material = None;
        self.lighting_invalid = true;
    }
}

impl RenderSystem {
    /// Applies `material` to the following draw calls.
    ///
    /// Nothing is uploaded if `material` is the one applied last, has not been modified
    /// since, and the driver state is trusted. The camera position is uploaded per draw
    /// call.
    pub fn apply_material(&mut self, material: &mut Material) -> Result<()> {
        if !self.has_context() {
            return Ok(());
        }

        let shader = match material.shader() {
            Some(v) => v.clone(),
            None => {
                let err = Error::ShaderAbsent(material.handle());
                error!("{}", err);
                return Err(err);
            }
        };

        let invalidate = self.state.is_invalidated();
        let rebound = self.session.material != Some(material.handle());
        let changed = invalidate
            || rebound
            || !material.is_cache_valid()
            || self.session.shader.as_ref().map(|v| v.handle()) != Some(shader.handle());

        if changed {
            self.session.texture_units = 0;
            self.apply_render_flags(material.flags());

            let program_changed = invalidate || self.session.program != Some(shader.program_id());
            if program_changed {
                self.visitor.use_program(shader.program_id());
                self.session.program = Some(shader.program_id());
                self.session.locations = ProgramLocations::resolve(&shader, self.max_texture_units);
                self.session.lighting = [None; 4];
                self.session.lighting_invalid = true;
            }

            self.session.shader = Some(shader.clone());

            // Uniforms belong to the program, another material sharing it may have
            // overwritten ours.
            if program_changed || rebound || !material.is_variable_cache_valid() {
                self.upload_variables(&shader, material);
                material.set_variable_cache_valid();
            }

            self.bind_textures(material);
            self.upload_lighting(material.lighting(), invalidate);
            self.upload_light();

            material.set_cache_valid();
            self.session.material = Some(material.handle());
        }

        Ok(())
    }

    fn apply_render_flags(&mut self, flags: &RenderFlags) {
        let visitor = self.visitor.as_mut();
        let state = &mut self.state;

        state.enable_alpha_blending(visitor, flags.transparent);
        state.set_blend_function(visitor, flags.src_blend, flags.dst_blend);
        state.enable_face_culling(visitor, flags.culling);
        state.set_cull_face(visitor, flags.cull_face);
        state.enable_colour_writing(visitor, flags.colour_write);
        state.enable_depth_writing(visitor, flags.depth_write);
        state.enable_depth_testing(visitor, flags.depth_test);
    }

    fn upload_variables(&mut self, shader: &Shader, material: &Material) {
        let visitor = self.visitor.as_mut();

        for (name, variable) in material.variables() {
            let location = match shader.uniform_location(name) {
                Some(v) => v,
                None => continue,
            };

            match *variable {
                MaterialVariable::F32(v) => visitor.bind_uniform(location, &v.into()),
                MaterialVariable::Vector2f(v) => visitor.bind_uniform(location, &v.into()),
                MaterialVariable::Vector3f(v) => visitor.bind_uniform(location, &v.into()),
                MaterialVariable::Vector4f(v) => visitor.bind_uniform(location, &v.into()),
                MaterialVariable::Matrix4f(v) => visitor.bind_uniform(location, &v.into()),
                MaterialVariable::Color(v) => visitor.bind_uniform(location, &v.into()),
                MaterialVariable::Matrix4fArray(ref v) => {
                    let matrices: Vec<[[f32; 4]; 4]> = v.iter().map(|m| (*m).into()).collect();
                    visitor.bind_uniform_matrix4_array(location, &matrices);
                }
            }
        }
    }

    /// Binds the cubemap, the plain textures and the shadow map of the active light, in
    /// that order, to consecutive texture units. Whatever does not fit is dropped.
    fn bind_textures(&mut self, material: &Material) {
        let visitor = self.visitor.as_mut();
        let state = &mut self.state;
        let session = &mut self.session;
        let registry = &self.registry;
        let units = self.max_texture_units;

        let shadow = match self.light {
            Some(Light::Directional {
                shadow: Some(shadow),
                ..
            }) if session.locations.shadow_map.is_some() => Some(shadow),
            _ => None,
        };

        let reserved = if shadow.is_some() { 1 } else { 0 };

        if let Some(handle) = material.cubemap() {
            if session.texture_units + reserved < units {
                match registry.textures.get(handle) {
                    Some(texture) => {
                        let unit = session.texture_units;
                        state.bind_texture(visitor, unit, texture.params.target, texture.id);
                        if let Some(location) = session.locations.cubemap {
                            visitor.bind_uniform(location, &UniformVariable::I32(unit as i32));
                        }

                        session.texture_units += 1;
                    }
                    None => warn!("Cubemap {} of {} is invalid.", handle, material.handle()),
                }
            } else {
                warn!(
                    "Cubemap of {} dropped, no texture unit left.",
                    material.handle()
                );
            }
        }

        let available = units.saturating_sub(session.texture_units + reserved) as usize;
        let textures = material.textures();
        if textures.len() > available {
            warn!(
                "{} requests {} textures, but only {} texture units are left. The rest are dropped.",
                material.handle(),
                textures.len(),
                available
            );
        }

        for (i, &handle) in textures.iter().take(available).enumerate() {
            match registry.textures.get(handle) {
                Some(texture) => {
                    let unit = session.texture_units;
                    state.bind_texture(visitor, unit, texture.params.target, texture.id);
                    if let Some(&Some(location)) = session.locations.textures.get(i) {
                        visitor.bind_uniform(location, &UniformVariable::I32(unit as i32));
                    }

                    session.texture_units += 1;
                }
                None => warn!("Texture {} of {} is invalid.", handle, material.handle()),
            }
        }

        if let Some(shadow) = shadow {
            match registry.textures.get(shadow.texture) {
                Some(texture) if session.texture_units < units => {
                    let unit = session.texture_units;
                    state.bind_texture(visitor, unit, texture.params.target, texture.id);
                    if let Some(location) = session.locations.shadow_map {
                        visitor.bind_uniform(location, &UniformVariable::I32(unit as i32));
                    }

                    session.texture_units += 1;
                }
                Some(_) => warn!("Shadow map dropped, no texture unit left."),
                None => warn!("Shadow map {} is invalid.", shadow.texture),
            }
        }
    }

    /// Uploads the lighting terms that differ from the values uploaded last.
    fn upload_lighting(&mut self, lighting: &Lighting, invalidate: bool) {
        let visitor = self.visitor.as_mut();
        let session = &mut self.session;

        let values = [
            lighting.emissive,
            lighting.ambient,
            lighting.diffuse,
            lighting.specular,
        ];

        for (i, &value) in values.iter().enumerate() {
            if invalidate || session.lighting[i] != Some(value) {
                if let Some(location) = session.locations.lighting[i] {
                    visitor.bind_uniform(location, &value.into());
                }

                session.lighting[i] = Some(value);
            }
        }
    }

    /// Uploads the parameters of the active light, if they have not been since the
    /// light or the program changed.
    fn upload_light(&mut self) {
        if !self.session.lighting_invalid {
            return;
        }

        let visitor = self.visitor.as_mut();
        let locations = &self.session.locations;

        match self.light {
            Some(Light::Ambient { colour }) => {
                if let Some(location) = locations.light_colour {
                    visitor.bind_uniform(location, &colour.into());
                }
            }
            Some(Light::Directional {
                direction,
                colour,
                shadow,
            }) => {
                if let Some(location) = locations.light_direction {
                    visitor.bind_uniform(location, &direction.into());
                }

                if let Some(location) = locations.light_colour {
                    visitor.bind_uniform(location, &colour.into());
                }

                if let Some(shadow) = shadow {
                    if let Some(location) = locations.shadow_tolerance {
                        visitor.bind_uniform(location, &shadow.tolerance.into());
                    }

                    if let Some(location) = locations.light_matrix {
                        visitor.bind_uniform(location, &shadow.light_matrix.into());
                    }
                }
            }
            Some(Light::Point {
                position,
                colour,
                attenuation,
            }) => {
                if let Some(location) = locations.light_position {
                    visitor.bind_uniform(location, &position.into());
                }

                if let Some(location) = locations.light_colour {
                    visitor.bind_uniform(location, &colour.into());
                }

                let values = [
                    attenuation.constant,
                    attenuation.linear,
                    attenuation.quadratic,
                ];

                for (location, &value) in locations.attenuation.iter().zip(values.iter()) {
                    if let Some(location) = *location {
                        visitor.bind_uniform(location, &value.into());
                    }
                }
            }
            None => {}
        }

        self.session.lighting_invalid = false;
    }
}
