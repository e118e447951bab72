use gl;
use gl::types::*;
use std::cmp;
use std::ffi;

use crate::errors::*;

/// Describes a version.
///
/// A version can only be compared to another version if they belong to the same API.
/// For example, both `Version::GL(3, 0) >= Version::ES(3, 0)` and `Version::ES(3, 0) >=
/// Version::GL(3, 0)` return `false`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    /// Regular OpenGL.
    GL(u8, u8),
    /// OpenGL embedded system.
    ES(u8, u8),
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<cmp::Ordering> {
        let (es1, major1, minor1) = match *self {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        let (es2, major2, minor2) = match *other {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        if es1 != es2 {
            None
        } else {
            match major1.cmp(&major2) {
                cmp::Ordering::Equal => Some(minor1.cmp(&minor2)),
                v => Some(v),
            }
        }
    }
}

impl Version {
    /// Parses a `GL_VERSION` string, e.g. `"4.1 Metal - 76.3"` or `"OpenGL ES 3.0 build 1.2"`.
    pub fn parse_str(desc: &str) -> Result<Version> {
        let (es, desc) = if desc.starts_with("OpenGL ES ") {
            (true, &desc[10..])
        } else if desc.starts_with("OpenGL ES-") {
            (true, &desc[13..])
        } else {
            (false, desc)
        };

        let desc = desc
            .split(' ')
            .next()
            .ok_or_else(|| format_err!("[GL] Version string is malformed."))?;

        let mut iter = desc.split('.');
        let major = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| format_err!("[GL] Failed to parse major version from {}.", desc))?;

        let minor = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| format_err!("[GL] Failed to parse minor version from {}.", desc))?;

        if es {
            Ok(Version::ES(major, minor))
        } else {
            Ok(Version::GL(major, minor))
        }
    }

    /// Obtains the OpenGL version of the current context using the loaded functions.
    ///
    /// # Unsafe
    ///
    /// You must ensure that the functions belong to the current context, otherwise you will get
    /// an undefined behavior.
    pub unsafe fn parse() -> Result<Version> {
        Version::parse_str(&parse_string(gl::VERSION)?)
    }
}

unsafe fn parse_string(id: GLenum) -> Result<String> {
    let s = gl::GetString(id);
    if s.is_null() {
        bail!("[GL] String of {} is null.", id);
    }

    String::from_utf8(ffi::CStr::from_ptr(s as *const _).to_bytes().to_vec())
        .map_err(|_| format_err!("[GL] String of {} is malformed.", id))
}

macro_rules! extensions {
    ($($string:expr => $field:ident,)+) => {
        /// Contains data about the list of extensions.
        #[derive(Debug, Clone, Copy, Default)]
        pub struct Extensions {
            $(
                pub $field: bool,
            )+
        }

        impl Extensions {
            /// Returns the list of extensions supported by the current context.
            ///
            /// *Safety*: the OpenGL context must be current in the thread.
            pub unsafe fn parse(version: Version) -> Result<Extensions> {
                let strings: Vec<String> = if version >= Version::GL(3, 0) || version >= Version::ES(3, 0) {
                    let mut num_extensions = 0;
                    gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut num_extensions);

                    let mut strings = Vec::with_capacity(num_extensions as usize);
                    for i in 0..num_extensions {
                        let ext = gl::GetStringi(gl::EXTENSIONS, i as GLuint);
                        if ext.is_null() {
                            continue;
                        }

                        let ext = ffi::CStr::from_ptr(ext as *const _).to_string_lossy();
                        strings.push(ext.into_owned());
                    }

                    strings
                } else {
                    parse_string(gl::EXTENSIONS)?.split(' ').map(|e| e.to_owned()).collect()
                };

                let mut extensions = Extensions::default();
                for extension in strings {
                    match &extension[..] {
                        $(
                            $string => extensions.$field = true,
                        )+
                        _ => ()
                    }
                }

                Ok(extensions)
            }
        }
    }
}

extensions! {
    "GL_ARB_vertex_array_object" => gl_arb_vertex_array_object,
    "GL_OES_vertex_array_object" => gl_oes_vertex_array_object,
    "GL_ARB_map_buffer_range" => gl_arb_map_buffer_range,
    "GL_ARB_framebuffer_object" => gl_arb_framebuffer_object,
    "GL_OES_packed_depth_stencil" => gl_oes_packed_depth_stencil,
}

/// Represents the capabilities of the context.
///
/// Contrary to the state, these values never change.
#[derive(Debug)]
pub struct Capabilities {
    /// Returns a version or release number. Vendor-specific information may follow the version
    /// number.
    pub version: Version,

    /// The company responsible for this GL implementation.
    pub vendor: String,

    /// The name of the renderer. This name is typically specific to a particular
    /// configuration of a hardware platform.
    pub renderer: String,

    /// The list of OpenGL extensions support by this implementation.
    pub extensions: Extensions,

    /// Maximum number of generic vertex attribute slots.
    pub max_vertex_attributes: u32,

    /// Maximum number of textures that can be bound to a program.
    ///
    /// `glActiveTexture` must be between `GL_TEXTURE0` and `GL_TEXTURE0` + this value - 1.
    pub max_texture_units: u32,

    /// Maximum width and height of `glViewport`.
    pub max_viewport_dims: (u32, u32),
}

impl Capabilities {
    pub unsafe fn parse() -> Result<Capabilities> {
        let version = Version::parse()?;
        let extensions = Extensions::parse(version)?;

        let mut max_vertex_attributes = 0;
        gl::GetIntegerv(gl::MAX_VERTEX_ATTRIBS, &mut max_vertex_attributes);

        let mut max_texture_units = 0;
        gl::GetIntegerv(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, &mut max_texture_units);

        let mut dims: [GLint; 2] = [0, 0];
        gl::GetIntegerv(gl::MAX_VIEWPORT_DIMS, dims.as_mut_ptr());

        Ok(Capabilities {
            version,
            vendor: parse_string(gl::VENDOR)?,
            renderer: parse_string(gl::RENDERER)?,
            extensions,
            max_vertex_attributes: max_vertex_attributes.max(0) as u32,
            max_texture_units: max_texture_units.max(0) as u32,
            max_viewport_dims: (dims[0] as u32, dims[1] as u32),
        })
    }

    /// Vertex array objects are mandatory on core profiles, so a default one is bound
    /// whenever the context supports them.
    pub fn has_vertex_array_object(&self) -> bool {
        self.version >= Version::GL(3, 0)
            || self.version >= Version::ES(3, 0)
            || self.extensions.gl_arb_vertex_array_object
            || self.extensions.gl_oes_vertex_array_object
    }

    /// Buffer read-back maps the buffer, which is not available on ES 2.0.
    pub fn has_map_buffer_range(&self) -> bool {
        self.version >= Version::GL(3, 0)
            || self.version >= Version::ES(3, 0)
            || self.extensions.gl_arb_map_buffer_range
    }
}
