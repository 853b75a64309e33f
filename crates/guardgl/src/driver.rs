//! The native call surface. A [`Driver`] is picked once, when the context is
//! constructed, and everything version-specific lives either in its
//! implementation or in the static [`Profile`] tables below; operations never
//! branch on the GL flavour themselves beyond asking those tables.

use crate::format::FormatTriple;
use gl::types::*;
use prelude_plus::*;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Profile {
  Gles2,
  Gl33,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProfileFeatures {
  pub integer_attributes: bool,
  pub attribute_divisors: bool,
  pub multiple_draw_buffers: bool,
  pub separate_read_framebuffer: bool,
  pub geometry_shaders: bool,
  pub depth_textures: bool,
  pub float_textures: bool,
  /// The core profile has no usable array object 0, so the context has to
  /// create its own default one.
  pub generated_default_array_object: bool,
}

/// The least an implementation has to report for a context to be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ComplianceMinimums {
  pub vertex_attributes: u32,
  pub texture_units: u32,
  pub texture_size: u32,
  pub color_attachments: u32,
  pub draw_buffers: u32,
}

static GLES2_FEATURES: ProfileFeatures = ProfileFeatures {
  integer_attributes: false,
  attribute_divisors: false,
  multiple_draw_buffers: false,
  separate_read_framebuffer: false,
  geometry_shaders: false,
  depth_textures: false,
  float_textures: false,
  generated_default_array_object: false,
};

static GL33_FEATURES: ProfileFeatures = ProfileFeatures {
  integer_attributes: true,
  attribute_divisors: true,
  multiple_draw_buffers: true,
  separate_read_framebuffer: true,
  geometry_shaders: true,
  depth_textures: true,
  float_textures: true,
  generated_default_array_object: true,
};

static GLES2_MINIMUMS: ComplianceMinimums = ComplianceMinimums {
  vertex_attributes: 8,
  texture_units: 8,
  texture_size: 64,
  color_attachments: 1,
  draw_buffers: 1,
};

static GL33_MINIMUMS: ComplianceMinimums = ComplianceMinimums {
  vertex_attributes: 16,
  texture_units: 16,
  texture_size: 1024,
  color_attachments: 8,
  draw_buffers: 8,
};

impl Profile {
  #[inline(always)]
  pub fn features(self) -> &'static ProfileFeatures {
    match self {
      Self::Gles2 => &GLES2_FEATURES,
      Self::Gl33 => &GL33_FEATURES,
    }
  }

  #[inline(always)]
  pub fn minimums(self) -> &'static ComplianceMinimums {
    match self {
      Self::Gles2 => &GLES2_MINIMUMS,
      Self::Gl33 => &GL33_MINIMUMS,
    }
  }

  /// Extensions without which a context of this profile is refused.
  pub fn required_extensions(self) -> &'static [&'static str] {
    match self {
      Self::Gles2 => &["GL_OES_vertex_array_object"],
      Self::Gl33 => &[],
    }
  }
}

impl fmt::Display for Profile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Gles2 => "GLES 2.0",
      Self::Gl33 => "GL 3.3 core",
    })
  }
}

/// An attribute or a uniform as reported by the program introspection calls.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ActiveVariable {
  pub name: String,
  pub location: i32,
  pub type_: GLenum,
  pub size: i32,
}

/// Thin, unvalidated entry points of one GL flavour. Callers are expected to
/// have made the native context current and to have validated the objects
/// whose names they pass in.
pub trait Driver {
  fn profile(&self) -> Profile;

  fn get_integer(&self, pname: GLenum) -> i32;
  fn get_string(&self, pname: GLenum) -> Option<String>;
  fn get_error(&self) -> GLenum;
  fn extensions(&self) -> Vec<String>;

  /// Returns `false` if the debug output entry points aren't loaded.
  fn install_debug_callback(&self) -> bool;
  fn object_label(&self, identifier: GLenum, name: u32, label: &str) -> bool;

  fn gen_buffer(&self) -> u32;
  fn delete_buffer(&self, name: u32);
  fn bind_buffer(&self, target: GLenum, name: u32);
  fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum);
  fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]);

  fn gen_vertex_array(&self) -> u32;
  fn delete_vertex_array(&self, name: u32);
  fn bind_vertex_array(&self, name: u32);
  fn enable_vertex_attrib_array(&self, index: u32);
  fn disable_vertex_attrib_array(&self, index: u32);
  #[allow(clippy::too_many_arguments)]
  fn vertex_attrib_pointer(
    &self,
    index: u32,
    size: i32,
    type_: GLenum,
    normalized: bool,
    stride: i32,
    offset: usize,
  );
  fn vertex_attrib_i_pointer(
    &self,
    index: u32,
    size: i32,
    type_: GLenum,
    stride: i32,
    offset: usize,
  );
  fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

  fn gen_texture(&self) -> u32;
  fn delete_texture(&self, name: u32);
  fn active_texture(&self, unit: u32);
  fn bind_texture(&self, target: GLenum, name: u32);
  fn tex_parameter(&self, target: GLenum, pname: GLenum, value: i32);
  #[allow(clippy::too_many_arguments)]
  fn tex_image_2d(
    &self,
    target: GLenum,
    level: i32,
    format: &FormatTriple,
    width: u32,
    height: u32,
    data: Option<&[u8]>,
  );
  #[allow(clippy::too_many_arguments)]
  fn tex_sub_image_2d(
    &self,
    target: GLenum,
    level: i32,
    format: &FormatTriple,
    offset: (u32, u32),
    size: (u32, u32),
    data: &[u8],
  );
  fn generate_mipmap(&self, target: GLenum);

  fn gen_renderbuffer(&self) -> u32;
  fn delete_renderbuffer(&self, name: u32);
  fn bind_renderbuffer(&self, name: u32);
  fn renderbuffer_storage(&self, internal_format: GLenum, width: u32, height: u32);

  fn gen_framebuffer(&self) -> u32;
  fn delete_framebuffer(&self, name: u32);
  fn bind_framebuffer(&self, target: GLenum, name: u32);
  fn framebuffer_texture_2d(
    &self,
    target: GLenum,
    attachment: GLenum,
    texture_target: GLenum,
    texture: u32,
    level: i32,
  );
  fn framebuffer_renderbuffer(&self, target: GLenum, attachment: GLenum, renderbuffer: u32);
  fn check_framebuffer_status(&self, target: GLenum) -> GLenum;
  fn draw_buffers(&self, buffers: &[GLenum]);

  fn create_shader(&self, type_: GLenum) -> u32;
  fn shader_source(&self, name: u32, source: &str);
  /// Compiles and returns the compile status.
  fn compile_shader(&self, name: u32) -> bool;
  fn shader_info_log(&self, name: u32) -> String;
  fn delete_shader(&self, name: u32);

  fn create_program(&self) -> u32;
  fn attach_shader(&self, program: u32, shader: u32);
  fn detach_shader(&self, program: u32, shader: u32);
  /// Links and returns the link status.
  fn link_program(&self, name: u32) -> bool;
  fn program_info_log(&self, name: u32) -> String;
  fn delete_program(&self, name: u32);
  fn use_program(&self, name: u32);
  fn active_attributes(&self, program: u32) -> Vec<ActiveVariable>;
  fn active_uniforms(&self, program: u32) -> Vec<ActiveVariable>;
  fn uniform_f32(&self, location: i32, components: u32, values: &[f32]);
  fn uniform_i32(&self, location: i32, components: u32, values: &[i32]);
  fn uniform_matrix_f32(&self, location: i32, dimension: u32, values: &[f32]);

  fn gen_query(&self) -> u32;
  fn delete_query(&self, name: u32);
  fn begin_time_elapsed(&self, name: u32);
  fn end_time_elapsed(&self);
  fn query_result_available(&self, name: u32) -> bool;
  fn query_result(&self, name: u32) -> u64;

  fn clear_color(&self, rgba: [f32; 4]);
  fn clear_depth(&self, depth: f32);
  fn clear_stencil(&self, stencil: i32);
  fn clear(&self, mask: GLbitfield);
  fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
  fn set_capability(&self, capability: GLenum, enabled: bool);
  fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum);
  fn blend_equation_separate(&self, rgb: GLenum, alpha: GLenum);
  fn blend_color(&self, rgba: [f32; 4]);

  /// Stencil bits of the window-system framebuffer.
  fn default_framebuffer_stencil_bits(&self) -> u32;
  fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: i32, mask: u32);
  fn stencil_mask_separate(&self, face: GLenum, mask: u32);
  fn stencil_op_separate(&self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum);

  fn draw_arrays(&self, mode: GLenum, first: i32, count: i32);
  fn draw_elements(&self, mode: GLenum, count: i32, type_: GLenum, offset: usize);
}
