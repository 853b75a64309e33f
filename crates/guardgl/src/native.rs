//! Drivers backed by the generated bindings of `crates/gl`.

use crate::debug::internal_debug_message_callback;
use crate::driver::{ActiveVariable, Driver, Profile};
use crate::format::FormatTriple;
use gl::gles2::Gles2;
use gl::types::*;
use gl::Gl;
use prelude_plus::*;

pub struct Gles2Driver {
  gl: Gles2,
}

impl Gles2Driver {
  pub fn load_with<F: FnMut(&'static str) -> *const c_void>(loader: F) -> Self {
    Self { gl: Gles2::load_with(loader) }
  }

  #[inline(always)]
  pub fn raw_gl(&self) -> &Gles2 { &self.gl }
}

pub struct Gl33Driver {
  gl: Gl,
}

impl Gl33Driver {
  pub fn load_with<F: FnMut(&'static str) -> *const c_void>(loader: F) -> Self {
    Self { gl: Gl::load_with(loader) }
  }

  #[inline(always)]
  pub fn raw_gl(&self) -> &Gl { &self.gl }
}

fn gl_bool(value: bool) -> GLboolean { if value { gl::TRUE } else { gl::FALSE } }

fn to_c_string(text: &str) -> Option<CString> { CString::new(text).ok() }

fn read_info_log(len: i32, read: impl FnOnce(i32, &mut i32, *mut GLchar)) -> String {
  if len <= 0 {
    return String::new();
  }
  let mut buf: Vec<u8> = vec![0; len as usize];
  let mut written = 0;
  read(len, &mut written, buf.as_mut_ptr() as *mut GLchar);
  buf.truncate(written.max(0) as usize);
  String::from_utf8_lossy(&buf).into_owned()
}

// Entry points which have the same name and semantics in both flavours.
macro_rules! impl_common_driver_methods {
  () => {
    fn get_integer(&self, pname: GLenum) -> i32 {
      let mut value = 0;
      unsafe { self.gl.GetIntegerv(pname, &mut value) };
      value
    }

    fn get_string(&self, pname: GLenum) -> Option<String> {
      let raw: *const u8 = unsafe { self.gl.GetString(pname) };
      if raw.is_null() {
        return None;
      }
      let c_str = unsafe { CStr::from_ptr(raw as *const c_char) };
      Some(c_str.to_string_lossy().into_owned())
    }

    fn get_error(&self) -> GLenum { unsafe { self.gl.GetError() } }

    fn gen_buffer(&self) -> u32 {
      let mut name = 0;
      unsafe { self.gl.GenBuffers(1, &mut name) };
      name
    }

    fn delete_buffer(&self, name: u32) { unsafe { self.gl.DeleteBuffers(1, &name) }; }

    fn bind_buffer(&self, target: GLenum, name: u32) { unsafe { self.gl.BindBuffer(target, name) }; }

    fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) {
      let data_ptr = data.map_or(ptr::null(), |data| data.as_ptr() as *const c_void);
      unsafe { self.gl.BufferData(target, size as GLsizeiptr, data_ptr, usage) };
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
      unsafe {
        self.gl.BufferSubData(
          target,
          offset as GLintptr,
          data.len() as GLsizeiptr,
          data.as_ptr() as *const c_void,
        )
      };
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
      unsafe { self.gl.EnableVertexAttribArray(index) };
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
      unsafe { self.gl.DisableVertexAttribArray(index) };
    }

    fn vertex_attrib_pointer(
      &self,
      index: u32,
      size: i32,
      type_: GLenum,
      normalized: bool,
      stride: i32,
      offset: usize,
    ) {
      unsafe {
        self.gl.VertexAttribPointer(
          index,
          size,
          type_,
          gl_bool(normalized),
          stride,
          offset as *const c_void,
        )
      };
    }

    fn gen_texture(&self) -> u32 {
      let mut name = 0;
      unsafe { self.gl.GenTextures(1, &mut name) };
      name
    }

    fn delete_texture(&self, name: u32) { unsafe { self.gl.DeleteTextures(1, &name) }; }

    fn active_texture(&self, unit: u32) { unsafe { self.gl.ActiveTexture(unit) }; }

    fn bind_texture(&self, target: GLenum, name: u32) { unsafe { self.gl.BindTexture(target, name) }; }

    fn tex_parameter(&self, target: GLenum, pname: GLenum, value: i32) {
      unsafe { self.gl.TexParameteri(target, pname, value) };
    }

    fn tex_image_2d(
      &self,
      target: GLenum,
      level: i32,
      format: &FormatTriple,
      width: u32,
      height: u32,
      data: Option<&[u8]>,
    ) {
      let data_ptr = data.map_or(ptr::null(), |data| data.as_ptr() as *const c_void);
      unsafe {
        self.gl.TexImage2D(
          target,
          level,
          format.internal_format as i32,
          width as i32,
          height as i32,
          0, // border, must be zero
          format.format,
          format.type_,
          data_ptr,
        )
      };
    }

    fn tex_sub_image_2d(
      &self,
      target: GLenum,
      level: i32,
      format: &FormatTriple,
      offset: (u32, u32),
      size: (u32, u32),
      data: &[u8],
    ) {
      unsafe {
        self.gl.TexSubImage2D(
          target,
          level,
          offset.0 as i32,
          offset.1 as i32,
          size.0 as i32,
          size.1 as i32,
          format.format,
          format.type_,
          data.as_ptr() as *const c_void,
        )
      };
    }

    fn generate_mipmap(&self, target: GLenum) { unsafe { self.gl.GenerateMipmap(target) }; }

    fn gen_renderbuffer(&self) -> u32 {
      let mut name = 0;
      unsafe { self.gl.GenRenderbuffers(1, &mut name) };
      name
    }

    fn delete_renderbuffer(&self, name: u32) { unsafe { self.gl.DeleteRenderbuffers(1, &name) }; }

    fn bind_renderbuffer(&self, name: u32) {
      unsafe { self.gl.BindRenderbuffer(gl::RENDERBUFFER, name) };
    }

    fn renderbuffer_storage(&self, internal_format: GLenum, width: u32, height: u32) {
      unsafe {
        self.gl.RenderbufferStorage(gl::RENDERBUFFER, internal_format, width as i32, height as i32)
      };
    }

    fn gen_framebuffer(&self) -> u32 {
      let mut name = 0;
      unsafe { self.gl.GenFramebuffers(1, &mut name) };
      name
    }

    fn delete_framebuffer(&self, name: u32) { unsafe { self.gl.DeleteFramebuffers(1, &name) }; }

    fn bind_framebuffer(&self, target: GLenum, name: u32) {
      unsafe { self.gl.BindFramebuffer(target, name) };
    }

    fn framebuffer_texture_2d(
      &self,
      target: GLenum,
      attachment: GLenum,
      texture_target: GLenum,
      texture: u32,
      level: i32,
    ) {
      unsafe { self.gl.FramebufferTexture2D(target, attachment, texture_target, texture, level) };
    }

    fn framebuffer_renderbuffer(&self, target: GLenum, attachment: GLenum, renderbuffer: u32) {
      unsafe {
        self.gl.FramebufferRenderbuffer(target, attachment, gl::RENDERBUFFER, renderbuffer)
      };
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
      unsafe { self.gl.CheckFramebufferStatus(target) }
    }

    fn create_shader(&self, type_: GLenum) -> u32 { unsafe { self.gl.CreateShader(type_) } }

    fn shader_source(&self, name: u32, source: &str) {
      let ptr = source.as_ptr() as *const GLchar;
      let len = source.len() as GLint;
      unsafe { self.gl.ShaderSource(name, 1, &ptr, &len) };
    }

    fn compile_shader(&self, name: u32) -> bool {
      let mut status = 0;
      unsafe {
        self.gl.CompileShader(name);
        self.gl.GetShaderiv(name, gl::COMPILE_STATUS, &mut status);
      }
      status == gl::TRUE as GLint
    }

    fn shader_info_log(&self, name: u32) -> String {
      let mut len = 0;
      unsafe { self.gl.GetShaderiv(name, gl::INFO_LOG_LENGTH, &mut len) };
      read_info_log(len, |size, written, buf| unsafe {
        self.gl.GetShaderInfoLog(name, size, written, buf)
      })
    }

    fn delete_shader(&self, name: u32) { unsafe { self.gl.DeleteShader(name) }; }

    fn create_program(&self) -> u32 { unsafe { self.gl.CreateProgram() } }

    fn attach_shader(&self, program: u32, shader: u32) {
      unsafe { self.gl.AttachShader(program, shader) };
    }

    fn detach_shader(&self, program: u32, shader: u32) {
      unsafe { self.gl.DetachShader(program, shader) };
    }

    fn link_program(&self, name: u32) -> bool {
      let mut status = 0;
      unsafe {
        self.gl.LinkProgram(name);
        self.gl.GetProgramiv(name, gl::LINK_STATUS, &mut status);
      }
      status == gl::TRUE as GLint
    }

    fn program_info_log(&self, name: u32) -> String {
      let mut len = 0;
      unsafe { self.gl.GetProgramiv(name, gl::INFO_LOG_LENGTH, &mut len) };
      read_info_log(len, |size, written, buf| unsafe {
        self.gl.GetProgramInfoLog(name, size, written, buf)
      })
    }

    fn delete_program(&self, name: u32) { unsafe { self.gl.DeleteProgram(name) }; }

    fn use_program(&self, name: u32) { unsafe { self.gl.UseProgram(name) }; }

    fn active_attributes(&self, program: u32) -> Vec<ActiveVariable> {
      let (mut count, mut max_len) = (0, 0);
      unsafe {
        self.gl.GetProgramiv(program, gl::ACTIVE_ATTRIBUTES, &mut count);
        self.gl.GetProgramiv(program, gl::ACTIVE_ATTRIBUTE_MAX_LENGTH, &mut max_len);
      }
      let mut result = Vec::with_capacity(count.max(0) as usize);
      for index in 0..count.max(0) as u32 {
        let (mut size, mut type_) = (0, 0);
        let name = read_info_log(max_len, |buf_size, written, buf| unsafe {
          self.gl.GetActiveAttrib(program, index, buf_size, written, &mut size, &mut type_, buf)
        });
        let location = match to_c_string(&name) {
          Some(c_name) => unsafe { self.gl.GetAttribLocation(program, c_name.as_ptr()) },
          None => -1,
        };
        result.push(ActiveVariable { name, location, type_, size });
      }
      result
    }

    fn active_uniforms(&self, program: u32) -> Vec<ActiveVariable> {
      let (mut count, mut max_len) = (0, 0);
      unsafe {
        self.gl.GetProgramiv(program, gl::ACTIVE_UNIFORMS, &mut count);
        self.gl.GetProgramiv(program, gl::ACTIVE_UNIFORM_MAX_LENGTH, &mut max_len);
      }
      let mut result = Vec::with_capacity(count.max(0) as usize);
      for index in 0..count.max(0) as u32 {
        let (mut size, mut type_) = (0, 0);
        let name = read_info_log(max_len, |buf_size, written, buf| unsafe {
          self.gl.GetActiveUniform(program, index, buf_size, written, &mut size, &mut type_, buf)
        });
        let location = match to_c_string(&name) {
          Some(c_name) => unsafe { self.gl.GetUniformLocation(program, c_name.as_ptr()) },
          None => -1,
        };
        result.push(ActiveVariable { name, location, type_, size });
      }
      result
    }

    fn uniform_f32(&self, location: i32, components: u32, values: &[f32]) {
      let count = (values.len() / components as usize) as GLsizei;
      let values = values.as_ptr();
      unsafe {
        match components {
          1 => self.gl.Uniform1fv(location, count, values),
          2 => self.gl.Uniform2fv(location, count, values),
          3 => self.gl.Uniform3fv(location, count, values),
          4 => self.gl.Uniform4fv(location, count, values),
          _ => unreachable!("{} float components", components),
        }
      }
    }

    fn uniform_i32(&self, location: i32, components: u32, values: &[i32]) {
      let count = (values.len() / components as usize) as GLsizei;
      let values = values.as_ptr();
      unsafe {
        match components {
          1 => self.gl.Uniform1iv(location, count, values),
          2 => self.gl.Uniform2iv(location, count, values),
          3 => self.gl.Uniform3iv(location, count, values),
          4 => self.gl.Uniform4iv(location, count, values),
          _ => unreachable!("{} integer components", components),
        }
      }
    }

    fn uniform_matrix_f32(&self, location: i32, dimension: u32, values: &[f32]) {
      let count = (values.len() / (dimension * dimension) as usize) as GLsizei;
      let values = values.as_ptr();
      unsafe {
        match dimension {
          2 => self.gl.UniformMatrix2fv(location, count, gl::FALSE, values),
          3 => self.gl.UniformMatrix3fv(location, count, gl::FALSE, values),
          4 => self.gl.UniformMatrix4fv(location, count, gl::FALSE, values),
          _ => unreachable!("{}x{} matrix", dimension, dimension),
        }
      }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
      unsafe { self.gl.ClearColor(rgba[0], rgba[1], rgba[2], rgba[3]) };
    }

    fn clear(&self, mask: GLbitfield) { unsafe { self.gl.Clear(mask) }; }

    fn clear_stencil(&self, stencil: i32) { unsafe { self.gl.ClearStencil(stencil) }; }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
      unsafe { self.gl.Viewport(x, y, width, height) };
    }

    fn set_capability(&self, capability: GLenum, enabled: bool) {
      unsafe {
        if enabled {
          self.gl.Enable(capability);
        } else {
          self.gl.Disable(capability);
        }
      }
    }

    fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum) {
      unsafe { self.gl.BlendFuncSeparate(src_rgb, dst_rgb, src_a, dst_a) };
    }

    fn blend_equation_separate(&self, rgb: GLenum, alpha: GLenum) {
      unsafe { self.gl.BlendEquationSeparate(rgb, alpha) };
    }

    fn blend_color(&self, rgba: [f32; 4]) {
      unsafe { self.gl.BlendColor(rgba[0], rgba[1], rgba[2], rgba[3]) };
    }

    fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: i32, mask: u32) {
      unsafe { self.gl.StencilFuncSeparate(face, func, reference, mask) };
    }

    fn stencil_mask_separate(&self, face: GLenum, mask: u32) {
      unsafe { self.gl.StencilMaskSeparate(face, mask) };
    }

    fn stencil_op_separate(&self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
      unsafe { self.gl.StencilOpSeparate(face, sfail, dpfail, dppass) };
    }

    fn draw_arrays(&self, mode: GLenum, first: i32, count: i32) {
      unsafe { self.gl.DrawArrays(mode, first, count) };
    }

    fn draw_elements(&self, mode: GLenum, count: i32, type_: GLenum, offset: usize) {
      unsafe { self.gl.DrawElements(mode, count, type_, offset as *const c_void) };
    }
  };
}

impl Driver for Gles2Driver {
  impl_common_driver_methods!();

  fn profile(&self) -> Profile { Profile::Gles2 }

  fn extensions(&self) -> Vec<String> {
    self.get_string(gl::EXTENSIONS).map_or_else(Vec::new, |list| {
      list.split_ascii_whitespace().map(|name| name.to_owned()).collect()
    })
  }

  fn install_debug_callback(&self) -> bool {
    // In ES contexts every KHR_debug entry point carries the suffix.
    if !self.gl.DebugMessageCallbackKHR.is_loaded() {
      return false;
    }
    unsafe {
      self.gl.Enable(gl::gles2::DEBUG_OUTPUT_KHR);
      self.gl.DebugMessageCallbackKHR(Some(internal_debug_message_callback), ptr::null());
    }
    true
  }

  fn object_label(&self, identifier: GLenum, name: u32, label: &str) -> bool {
    if !self.gl.ObjectLabelKHR.is_loaded() {
      return false;
    }
    let len = label.len() as GLsizei;
    unsafe { self.gl.ObjectLabelKHR(identifier, name, len, label.as_ptr() as *const GLchar) };
    true
  }

  fn gen_vertex_array(&self) -> u32 {
    let mut name = 0;
    unsafe { self.gl.GenVertexArraysOES(1, &mut name) };
    name
  }

  fn delete_vertex_array(&self, name: u32) { unsafe { self.gl.DeleteVertexArraysOES(1, &name) }; }

  fn bind_vertex_array(&self, name: u32) { unsafe { self.gl.BindVertexArrayOES(name) }; }

  fn vertex_attrib_i_pointer(&self, _: u32, _: i32, _: GLenum, _: i32, _: usize) {
    unreachable!("integer attributes are gated by ProfileFeatures")
  }

  fn vertex_attrib_divisor(&self, _: u32, _: u32) {
    unreachable!("attribute divisors are gated by ProfileFeatures")
  }

  fn draw_buffers(&self, buffers: &[GLenum]) {
    // Without EXT_draw_buffers the only color output is COLOR_ATTACHMENT0.
    debug_assert!(buffers.len() <= 1, "multiple draw buffers are gated by ProfileFeatures");
  }

  fn gen_query(&self) -> u32 {
    let mut name = 0;
    unsafe { self.gl.GenQueriesEXT(1, &mut name) };
    name
  }

  fn delete_query(&self, name: u32) { unsafe { self.gl.DeleteQueriesEXT(1, &name) }; }

  fn begin_time_elapsed(&self, name: u32) {
    unsafe { self.gl.BeginQueryEXT(gl::gles2::TIME_ELAPSED_EXT, name) };
  }

  fn end_time_elapsed(&self) { unsafe { self.gl.EndQueryEXT(gl::gles2::TIME_ELAPSED_EXT) }; }

  fn query_result_available(&self, name: u32) -> bool {
    let mut available = 0;
    unsafe {
      self.gl.GetQueryObjectuivEXT(name, gl::gles2::QUERY_RESULT_AVAILABLE_EXT, &mut available)
    };
    available != 0
  }

  fn query_result(&self, name: u32) -> u64 {
    let mut result = 0;
    unsafe { self.gl.GetQueryObjectui64vEXT(name, gl::gles2::QUERY_RESULT_EXT, &mut result) };
    result
  }

  fn clear_depth(&self, depth: f32) { unsafe { self.gl.ClearDepthf(depth) }; }

  fn default_framebuffer_stencil_bits(&self) -> u32 {
    self.get_integer(gl::gles2::STENCIL_BITS).max(0) as u32
  }
}

impl Driver for Gl33Driver {
  impl_common_driver_methods!();

  fn profile(&self) -> Profile { Profile::Gl33 }

  fn extensions(&self) -> Vec<String> {
    let count = self.get_integer(gl::NUM_EXTENSIONS).max(0) as u32;
    let mut result = Vec::with_capacity(count as usize);
    for index in 0..count {
      let raw: *const u8 = unsafe { self.gl.GetStringi(gl::EXTENSIONS, index) };
      if !raw.is_null() {
        let c_str = unsafe { CStr::from_ptr(raw as *const c_char) };
        result.push(c_str.to_string_lossy().into_owned());
      }
    }
    result
  }

  fn install_debug_callback(&self) -> bool {
    if !self.gl.DebugMessageCallback.is_loaded() {
      return false;
    }
    unsafe {
      self.gl.Enable(gl::DEBUG_OUTPUT);
      self.gl.DebugMessageCallback(Some(internal_debug_message_callback), ptr::null());
    }
    true
  }

  fn object_label(&self, identifier: GLenum, name: u32, label: &str) -> bool {
    if !self.gl.ObjectLabel.is_loaded() {
      return false;
    }
    let len = label.len() as GLsizei;
    unsafe { self.gl.ObjectLabel(identifier, name, len, label.as_ptr() as *const GLchar) };
    true
  }

  fn gen_vertex_array(&self) -> u32 {
    let mut name = 0;
    unsafe { self.gl.GenVertexArrays(1, &mut name) };
    name
  }

  fn delete_vertex_array(&self, name: u32) { unsafe { self.gl.DeleteVertexArrays(1, &name) }; }

  fn bind_vertex_array(&self, name: u32) { unsafe { self.gl.BindVertexArray(name) }; }

  fn vertex_attrib_i_pointer(
    &self,
    index: u32,
    size: i32,
    type_: GLenum,
    stride: i32,
    offset: usize,
  ) {
    unsafe { self.gl.VertexAttribIPointer(index, size, type_, stride, offset as *const c_void) };
  }

  fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
    unsafe { self.gl.VertexAttribDivisor(index, divisor) };
  }

  fn draw_buffers(&self, buffers: &[GLenum]) {
    unsafe { self.gl.DrawBuffers(buffers.len() as GLsizei, buffers.as_ptr()) };
  }

  fn gen_query(&self) -> u32 {
    let mut name = 0;
    unsafe { self.gl.GenQueries(1, &mut name) };
    name
  }

  fn delete_query(&self, name: u32) { unsafe { self.gl.DeleteQueries(1, &name) }; }

  fn begin_time_elapsed(&self, name: u32) { unsafe { self.gl.BeginQuery(gl::TIME_ELAPSED, name) }; }

  fn end_time_elapsed(&self) { unsafe { self.gl.EndQuery(gl::TIME_ELAPSED) }; }

  fn query_result_available(&self, name: u32) -> bool {
    let mut available = 0;
    unsafe { self.gl.GetQueryObjectuiv(name, gl::QUERY_RESULT_AVAILABLE, &mut available) };
    available != 0
  }

  fn query_result(&self, name: u32) -> u64 {
    let mut result = 0;
    unsafe { self.gl.GetQueryObjectui64v(name, gl::QUERY_RESULT, &mut result) };
    result
  }

  fn clear_depth(&self, depth: f32) { unsafe { self.gl.ClearDepth(depth as f64) }; }

  fn default_framebuffer_stencil_bits(&self) -> u32 {
    // STENCIL_BITS is gone from the core profile
    let mut bits = 0;
    unsafe {
      self.gl.GetFramebufferAttachmentParameteriv(
        gl::DRAW_FRAMEBUFFER,
        gl::STENCIL,
        gl::FRAMEBUFFER_ATTACHMENT_STENCIL_SIZE,
        &mut bits,
      )
    };
    bits.max(0) as u32
  }
}
