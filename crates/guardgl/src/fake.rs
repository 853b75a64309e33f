//! An in-process driver which keeps just enough native state to behave like a
//! real implementation towards the wrapper: fresh names, limits, an error
//! queue, compile and link results and program introspection.
//!
//! Every entry point is appended to a call log so that tests can assert on
//! the exact native traffic an operation caused.

use crate::driver::{ActiveVariable, Driver, Profile};
use crate::format::FormatTriple;
use gl::types::*;
use prelude_plus::*;

#[derive(Debug)]
struct FakeShader {
  type_: GLenum,
  source: String,
}

#[derive(Debug, Default)]
struct FakeProgram {
  shaders: Vec<u32>,
  linked: bool,
  info_log: String,
  attributes: Vec<ActiveVariable>,
  uniforms: Vec<ActiveVariable>,
}

#[derive(Debug)]
struct FakeState {
  profile: Profile,
  integers: HashMap<GLenum, i32>,
  extensions: Vec<String>,
  errors: VecDeque<GLenum>,
  calls: Vec<String>,
  next_name: u32,
  live_names: BTreeSet<u32>,

  buffer_sizes: HashMap<u32, usize>,
  bound_buffers: HashMap<GLenum, u32>,
  bound_vertex_array: u32,
  // element buffer bindings are array object state
  element_buffers: HashMap<u32, u32>,
  bound_framebuffers: HashMap<GLenum, u32>,
  framebuffer_attachments: HashMap<u32, BTreeMap<GLenum, u32>>,
  forced_framebuffer_status: Option<GLenum>,
  default_stencil_bits: u32,
  active_texture_unit: u32,

  shaders: HashMap<u32, FakeShader>,
  programs: HashMap<u32, FakeProgram>,
  compile_logs: HashMap<u32, String>,
  current_program: u32,

  running_query: Option<u32>,
  finished_queries: HashMap<u32, u64>,
  elapsed_nanos: u64,
}

/// Cloning produces another handle to the same fake implementation, which is
/// how tests keep access to it after handing it to a context.
#[derive(Debug, Clone)]
pub struct FakeDriver {
  state: Rc<RefCell<FakeState>>,
}

impl FakeDriver {
  pub fn new(profile: Profile) -> Self {
    let mut integers = HashMap::new();
    let mut extensions = Vec::new();
    match profile {
      Profile::Gles2 => {
        integers.insert(gl::MAX_VERTEX_ATTRIBS, 8);
        integers.insert(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, 8);
        integers.insert(gl::MAX_TEXTURE_SIZE, 2048);
        integers.insert(gl::MAX_CUBE_MAP_TEXTURE_SIZE, 2048);
        integers.insert(gl::MAX_RENDERBUFFER_SIZE, 2048);
        extensions.push("GL_OES_vertex_array_object".to_owned());
      }
      Profile::Gl33 => {
        integers.insert(gl::MAX_VERTEX_ATTRIBS, 16);
        integers.insert(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, 32);
        integers.insert(gl::MAX_TEXTURE_SIZE, 8192);
        integers.insert(gl::MAX_CUBE_MAP_TEXTURE_SIZE, 8192);
        integers.insert(gl::MAX_RENDERBUFFER_SIZE, 8192);
        integers.insert(gl::MAX_COLOR_ATTACHMENTS, 8);
        integers.insert(gl::MAX_DRAW_BUFFERS, 8);
      }
    }
    integers.insert(gl::MAX_LABEL_LENGTH, 256);

    Self {
      state: Rc::new(RefCell::new(FakeState {
        profile,
        integers,
        extensions,
        errors: VecDeque::new(),
        calls: Vec::new(),
        next_name: 1,
        live_names: BTreeSet::new(),

        buffer_sizes: HashMap::new(),
        bound_buffers: HashMap::new(),
        bound_vertex_array: 0,
        element_buffers: HashMap::new(),
        bound_framebuffers: HashMap::new(),
        framebuffer_attachments: HashMap::new(),
        forced_framebuffer_status: None,
        default_stencil_bits: 8,
        active_texture_unit: 0,

        shaders: HashMap::new(),
        programs: HashMap::new(),
        compile_logs: HashMap::new(),
        current_program: 0,

        running_query: None,
        finished_queries: HashMap::new(),
        elapsed_nanos: 1_000_000,
      })),
    }
  }

  /// Overrides the value reported for an integer query.
  pub fn with_integer(self, pname: GLenum, value: i32) -> Self {
    self.state.borrow_mut().integers.insert(pname, value);
    self
  }

  pub fn with_extension(self, name: &str) -> Self {
    {
      let mut state = self.state.borrow_mut();
      if !state.extensions.iter().any(|loaded| loaded == name) {
        state.extensions.push(name.to_owned());
      }
    }
    self
  }

  pub fn without_extension(self, name: &str) -> Self {
    self.state.borrow_mut().extensions.retain(|loaded| loaded != name);
    self
  }

  /// Makes every framebuffer report `status`, whatever is attached to it.
  pub fn with_framebuffer_status(self, status: GLenum) -> Self {
    self.state.borrow_mut().forced_framebuffer_status = Some(status);
    self
  }

  /// Stencil bits of the default framebuffer, 8 unless overridden.
  pub fn with_default_stencil_bits(self, bits: u32) -> Self {
    self.state.borrow_mut().default_stencil_bits = bits;
    self
  }

  pub fn with_elapsed_nanos(self, nanos: u64) -> Self {
    self.state.borrow_mut().elapsed_nanos = nanos;
    self
  }

  /// Queues an error code, as if the last call had failed natively.
  pub fn push_error(&self, code: GLenum) { self.state.borrow_mut().errors.push_back(code); }

  pub fn calls(&self) -> Vec<String> { self.state.borrow().calls.clone() }

  pub fn clear_calls(&self) { self.state.borrow_mut().calls.clear(); }

  pub fn is_live(&self, name: u32) -> bool { self.state.borrow().live_names.contains(&name) }

  pub fn bound_buffer(&self, target: GLenum) -> u32 {
    let state = self.state.borrow();
    if target == gl::ELEMENT_ARRAY_BUFFER {
      return state.element_buffers.get(&state.bound_vertex_array).copied().unwrap_or(0);
    }
    state.bound_buffers.get(&target).copied().unwrap_or(0)
  }

  pub fn bound_vertex_array(&self) -> u32 { self.state.borrow().bound_vertex_array }

  pub fn current_program(&self) -> u32 { self.state.borrow().current_program }

  /// Index of the active texture unit, counted from `TEXTURE0`.
  pub fn active_texture_unit(&self) -> u32 { self.state.borrow().active_texture_unit }

  fn log(&self, call: String) { self.state.borrow_mut().calls.push(call); }

  fn fresh_name(&self) -> u32 {
    let mut state = self.state.borrow_mut();
    let name = state.next_name;
    state.next_name += 1;
    state.live_names.insert(name);
    name
  }

  fn release_name(&self, name: u32) {
    if name != 0 {
      self.state.borrow_mut().live_names.remove(&name);
    }
  }

  fn raise(&self, code: GLenum) { self.push_error(code); }

  fn has_extension(&self, name: &str) -> bool {
    self.state.borrow().extensions.iter().any(|loaded| loaded == name)
  }

  fn draw_framebuffer(state: &FakeState) -> u32 {
    state
      .bound_framebuffers
      .get(&gl::DRAW_FRAMEBUFFER)
      .or_else(|| state.bound_framebuffers.get(&gl::FRAMEBUFFER))
      .copied()
      .unwrap_or(0)
  }
}

/// Scans GLSL source for `<qualifier> [precision] <type> <name>[<len>];`
/// declarations. Far from a parser, but enough for introspection of the
/// shaders tests feed in.
fn scan_declarations(source: &str, qualifiers: &[&str]) -> Vec<(GLenum, String, i32)> {
  let mut result = Vec::new();
  for line in source.lines() {
    let line = match line.find("//") {
      Some(comment_start) => &line[..comment_start],
      None => line,
    };
    for statement in line.split(';') {
      let mut tokens = statement.split_whitespace().peekable();
      match tokens.next() {
        Some(first) if qualifiers.contains(&first) => {}
        _ => continue,
      }
      while let Some(&token) = tokens.peek() {
        if matches!(token, "lowp" | "mediump" | "highp" | "flat" | "smooth") {
          tokens.next();
        } else {
          break;
        }
      }
      let (type_name, declarator) = match (tokens.next(), tokens.next()) {
        (Some(type_name), Some(declarator)) => (type_name, declarator),
        _ => continue,
      };
      let type_ = match glsl_type(type_name) {
        Some(type_) => type_,
        None => continue,
      };
      let (name, size) = match declarator.find('[') {
        Some(bracket) => {
          let len = declarator[bracket + 1..].trim_end_matches(']').parse::<i32>().unwrap_or(1);
          (format!("{}[0]", &declarator[..bracket]), len)
        }
        None => (declarator.to_owned(), 1),
      };
      result.push((type_, name, size));
    }
  }
  result
}

fn glsl_type(name: &str) -> Option<GLenum> {
  Some(match name {
    "float" => gl::FLOAT,
    "vec2" => gl::FLOAT_VEC2,
    "vec3" => gl::FLOAT_VEC3,
    "vec4" => gl::FLOAT_VEC4,
    "int" => gl::INT,
    "ivec2" => gl::INT_VEC2,
    "ivec3" => gl::INT_VEC3,
    "ivec4" => gl::INT_VEC4,
    "uint" => gl::UNSIGNED_INT,
    "bool" => gl::BOOL,
    "mat2" => gl::FLOAT_MAT2,
    "mat3" => gl::FLOAT_MAT3,
    "mat4" => gl::FLOAT_MAT4,
    "sampler2D" => gl::SAMPLER_2D,
    "samplerCube" => gl::SAMPLER_CUBE,
    _ => return None,
  })
}

fn compile_error(source: &str) -> Option<String> {
  source.lines().enumerate().find_map(|(index, line)| {
    let line = line.trim();
    line
      .strip_prefix("#error")
      .map(|message| format!("0:{}: '#error' : {}", index + 1, message.trim()))
  })
}

impl Driver for FakeDriver {
  fn profile(&self) -> Profile { self.state.borrow().profile }

  fn get_integer(&self, pname: GLenum) -> i32 {
    self.state.borrow().integers.get(&pname).copied().unwrap_or(0)
  }

  fn get_string(&self, pname: GLenum) -> Option<String> {
    let profile = self.profile();
    Some(match pname {
      gl::RENDERER => "guardgl fake renderer".to_owned(),
      gl::VENDOR => "guardgl".to_owned(),
      gl::VERSION => match profile {
        Profile::Gles2 => "OpenGL ES 2.0 (fake)".to_owned(),
        Profile::Gl33 => "3.3.0 Core Profile (fake)".to_owned(),
      },
      gl::SHADING_LANGUAGE_VERSION => match profile {
        Profile::Gles2 => "OpenGL ES GLSL ES 1.00 (fake)".to_owned(),
        Profile::Gl33 => "3.30 (fake)".to_owned(),
      },
      gl::EXTENSIONS => self.state.borrow().extensions.join(" "),
      _ => return None,
    })
  }

  fn get_error(&self) -> GLenum {
    self.state.borrow_mut().errors.pop_front().unwrap_or(gl::NO_ERROR)
  }

  fn extensions(&self) -> Vec<String> { self.state.borrow().extensions.clone() }

  fn install_debug_callback(&self) -> bool {
    self.log("install_debug_callback()".to_owned());
    self.has_extension("GL_KHR_debug")
  }

  fn object_label(&self, identifier: GLenum, name: u32, label: &str) -> bool {
    if !self.has_extension("GL_KHR_debug") {
      return false;
    }
    self.log(format!("object_label({:#06x}, {}, {:?})", identifier, name, label));
    true
  }

  fn gen_buffer(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("gen_buffer() -> {}", name));
    name
  }

  fn delete_buffer(&self, name: u32) {
    self.log(format!("delete_buffer({})", name));
    self.release_name(name);
    let mut state = self.state.borrow_mut();
    state.buffer_sizes.remove(&name);
    state.bound_buffers.retain(|_, bound| *bound != name);
    state.element_buffers.retain(|_, bound| *bound != name);
  }

  fn bind_buffer(&self, target: GLenum, name: u32) {
    self.log(format!("bind_buffer({:#06x}, {})", target, name));
    let mut state = self.state.borrow_mut();
    if target == gl::ELEMENT_ARRAY_BUFFER {
      let vao = state.bound_vertex_array;
      state.element_buffers.insert(vao, name);
    } else {
      state.bound_buffers.insert(target, name);
    }
  }

  fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) {
    self.log(format!(
      "buffer_data({:#06x}, {}, {}, {:#06x})",
      target,
      size,
      if data.is_some() { "data" } else { "null" },
      usage,
    ));
    let bound = self.bound_buffer(target);
    if bound == 0 {
      self.raise(gl::INVALID_OPERATION);
      return;
    }
    self.state.borrow_mut().buffer_sizes.insert(bound, size);
  }

  fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
    self.log(format!("buffer_sub_data({:#06x}, {}, {})", target, offset, data.len()));
    let bound = self.bound_buffer(target);
    let size = self.state.borrow().buffer_sizes.get(&bound).copied();
    match size {
      None => self.raise(gl::INVALID_OPERATION),
      Some(size) if offset + data.len() > size => self.raise(gl::INVALID_VALUE),
      Some(_) => {}
    }
  }

  fn gen_vertex_array(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("gen_vertex_array() -> {}", name));
    name
  }

  fn delete_vertex_array(&self, name: u32) {
    self.log(format!("delete_vertex_array({})", name));
    self.release_name(name);
    let mut state = self.state.borrow_mut();
    state.element_buffers.remove(&name);
    if state.bound_vertex_array == name {
      state.bound_vertex_array = 0;
    }
  }

  fn bind_vertex_array(&self, name: u32) {
    self.log(format!("bind_vertex_array({})", name));
    self.state.borrow_mut().bound_vertex_array = name;
  }

  fn enable_vertex_attrib_array(&self, index: u32) {
    self.log(format!("enable_vertex_attrib_array({})", index));
  }

  fn disable_vertex_attrib_array(&self, index: u32) {
    self.log(format!("disable_vertex_attrib_array({})", index));
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
    self.log(format!(
      "vertex_attrib_pointer({}, {}, {:#06x}, {}, {}, {})",
      index, size, type_, normalized, stride, offset,
    ));
  }

  fn vertex_attrib_i_pointer(
    &self,
    index: u32,
    size: i32,
    type_: GLenum,
    stride: i32,
    offset: usize,
  ) {
    self.log(format!(
      "vertex_attrib_i_pointer({}, {}, {:#06x}, {}, {})",
      index, size, type_, stride, offset,
    ));
  }

  fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
    self.log(format!("vertex_attrib_divisor({}, {})", index, divisor));
  }

  fn gen_texture(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("gen_texture() -> {}", name));
    name
  }

  fn delete_texture(&self, name: u32) {
    self.log(format!("delete_texture({})", name));
    self.release_name(name);
  }

  fn active_texture(&self, unit: u32) {
    self.log(format!("active_texture({})", unit - gl::TEXTURE0));
    self.state.borrow_mut().active_texture_unit = unit - gl::TEXTURE0;
  }

  fn bind_texture(&self, target: GLenum, name: u32) {
    self.log(format!("bind_texture({:#06x}, {})", target, name));
  }

  fn tex_parameter(&self, target: GLenum, pname: GLenum, value: i32) {
    self.log(format!("tex_parameter({:#06x}, {:#06x}, {:#06x})", target, pname, value));
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
    self.log(format!(
      "tex_image_2d({:#06x}, {}, {:#06x}, {}x{}, {})",
      target,
      level,
      format.internal_format,
      width,
      height,
      if data.is_some() { "data" } else { "null" },
    ));
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
    self.log(format!(
      "tex_sub_image_2d({:#06x}, {}, {:#06x}, {:?}, {:?}, {})",
      target,
      level,
      format.format,
      offset,
      size,
      data.len(),
    ));
  }

  fn generate_mipmap(&self, target: GLenum) {
    self.log(format!("generate_mipmap({:#06x})", target));
  }

  fn gen_renderbuffer(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("gen_renderbuffer() -> {}", name));
    name
  }

  fn delete_renderbuffer(&self, name: u32) {
    self.log(format!("delete_renderbuffer({})", name));
    self.release_name(name);
  }

  fn bind_renderbuffer(&self, name: u32) { self.log(format!("bind_renderbuffer({})", name)); }

  fn renderbuffer_storage(&self, internal_format: GLenum, width: u32, height: u32) {
    self.log(format!("renderbuffer_storage({:#06x}, {}x{})", internal_format, width, height));
  }

  fn gen_framebuffer(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("gen_framebuffer() -> {}", name));
    self.state.borrow_mut().framebuffer_attachments.insert(name, BTreeMap::new());
    name
  }

  fn delete_framebuffer(&self, name: u32) {
    self.log(format!("delete_framebuffer({})", name));
    self.release_name(name);
    let mut state = self.state.borrow_mut();
    state.framebuffer_attachments.remove(&name);
    state.bound_framebuffers.retain(|_, bound| *bound != name);
  }

  fn bind_framebuffer(&self, target: GLenum, name: u32) {
    self.log(format!("bind_framebuffer({:#06x}, {})", target, name));
    let mut state = self.state.borrow_mut();
    if target == gl::FRAMEBUFFER {
      state.bound_framebuffers.insert(gl::DRAW_FRAMEBUFFER, name);
      state.bound_framebuffers.insert(gl::READ_FRAMEBUFFER, name);
    } else {
      state.bound_framebuffers.insert(target, name);
    }
  }

  fn framebuffer_texture_2d(
    &self,
    target: GLenum,
    attachment: GLenum,
    texture_target: GLenum,
    texture: u32,
    level: i32,
  ) {
    self.log(format!(
      "framebuffer_texture_2d({:#06x}, {:#06x}, {:#06x}, {}, {})",
      target, attachment, texture_target, texture, level,
    ));
    let mut state = self.state.borrow_mut();
    let framebuffer = Self::draw_framebuffer(&state);
    if let Some(attachments) = state.framebuffer_attachments.get_mut(&framebuffer) {
      if texture == 0 {
        attachments.remove(&attachment);
      } else {
        attachments.insert(attachment, texture);
      }
    }
  }

  fn framebuffer_renderbuffer(&self, target: GLenum, attachment: GLenum, renderbuffer: u32) {
    self.log(format!(
      "framebuffer_renderbuffer({:#06x}, {:#06x}, {})",
      target, attachment, renderbuffer,
    ));
    let mut state = self.state.borrow_mut();
    let framebuffer = Self::draw_framebuffer(&state);
    if let Some(attachments) = state.framebuffer_attachments.get_mut(&framebuffer) {
      if renderbuffer == 0 {
        attachments.remove(&attachment);
      } else {
        attachments.insert(attachment, renderbuffer);
      }
    }
  }

  fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
    self.log(format!("check_framebuffer_status({:#06x})", target));
    let state = self.state.borrow();
    if let Some(status) = state.forced_framebuffer_status {
      return status;
    }
    let framebuffer = if target == gl::READ_FRAMEBUFFER {
      state.bound_framebuffers.get(&gl::READ_FRAMEBUFFER).copied().unwrap_or(0)
    } else {
      Self::draw_framebuffer(&state)
    };
    match state.framebuffer_attachments.get(&framebuffer) {
      Some(attachments) if attachments.is_empty() => gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
      _ => gl::FRAMEBUFFER_COMPLETE,
    }
  }

  fn draw_buffers(&self, buffers: &[GLenum]) {
    let buffers: Vec<String> = buffers.iter().map(|buffer| format!("{:#06x}", buffer)).collect();
    self.log(format!("draw_buffers([{}])", buffers.join(", ")));
  }

  fn create_shader(&self, type_: GLenum) -> u32 {
    let name = self.fresh_name();
    self.log(format!("create_shader({:#06x}) -> {}", type_, name));
    self.state.borrow_mut().shaders.insert(name, FakeShader { type_, source: String::new() });
    name
  }

  fn shader_source(&self, name: u32, source: &str) {
    self.log(format!("shader_source({}, {} bytes)", name, source.len()));
    if let Some(shader) = self.state.borrow_mut().shaders.get_mut(&name) {
      shader.source = source.to_owned();
    }
  }

  fn compile_shader(&self, name: u32) -> bool {
    self.log(format!("compile_shader({})", name));
    let mut state = self.state.borrow_mut();
    let error = match state.shaders.get(&name) {
      Some(shader) => compile_error(&shader.source),
      None => Some("no such shader".to_owned()),
    };
    let ok = error.is_none();
    state.compile_logs.insert(name, error.unwrap_or_default());
    ok
  }

  fn shader_info_log(&self, name: u32) -> String {
    self.state.borrow().compile_logs.get(&name).cloned().unwrap_or_default()
  }

  fn delete_shader(&self, name: u32) {
    self.log(format!("delete_shader({})", name));
    self.release_name(name);
    let mut state = self.state.borrow_mut();
    state.shaders.remove(&name);
    state.compile_logs.remove(&name);
  }

  fn create_program(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("create_program() -> {}", name));
    self.state.borrow_mut().programs.insert(name, FakeProgram::default());
    name
  }

  fn attach_shader(&self, program: u32, shader: u32) {
    self.log(format!("attach_shader({}, {})", program, shader));
    if let Some(program) = self.state.borrow_mut().programs.get_mut(&program) {
      program.shaders.push(shader);
    }
  }

  fn detach_shader(&self, program: u32, shader: u32) {
    self.log(format!("detach_shader({}, {})", program, shader));
    if let Some(program) = self.state.borrow_mut().programs.get_mut(&program) {
      program.shaders.retain(|&attached| attached != shader);
    }
  }

  fn link_program(&self, name: u32) -> bool {
    self.log(format!("link_program({})", name));
    let mut state = self.state.borrow_mut();
    let state = &mut *state;
    let program = match state.programs.get_mut(&name) {
      Some(program) => program,
      None => return false,
    };

    let mut has_vertex = false;
    let mut has_fragment = false;
    let mut attributes = Vec::new();
    let mut uniforms: Vec<ActiveVariable> = Vec::new();
    for shader_name in &program.shaders {
      let shader = match state.shaders.get(shader_name) {
        Some(shader) => shader,
        None => continue,
      };
      let attribute_qualifiers: &[&str] = match shader.type_ {
        gl::VERTEX_SHADER => {
          has_vertex = true;
          &["attribute", "in"]
        }
        gl::FRAGMENT_SHADER => {
          has_fragment = true;
          &[]
        }
        _ => &[],
      };
      for (type_, attribute_name, size) in scan_declarations(&shader.source, attribute_qualifiers) {
        let location = attributes.len() as i32;
        attributes.push(ActiveVariable { name: attribute_name, location, type_, size });
      }
      for (type_, uniform_name, size) in scan_declarations(&shader.source, &["uniform"]) {
        if uniforms.iter().all(|uniform| uniform.name != uniform_name) {
          let location = uniforms.len() as i32;
          uniforms.push(ActiveVariable { name: uniform_name, location, type_, size });
        }
      }
    }

    program.linked = has_vertex && has_fragment;
    if program.linked {
      program.info_log.clear();
      program.attributes = attributes;
      program.uniforms = uniforms;
    } else {
      program.info_log = "error: a vertex and a fragment shader are required".to_owned();
    }
    program.linked
  }

  fn program_info_log(&self, name: u32) -> String {
    let state = self.state.borrow();
    state.programs.get(&name).map(|program| program.info_log.clone()).unwrap_or_default()
  }

  fn delete_program(&self, name: u32) {
    self.log(format!("delete_program({})", name));
    self.release_name(name);
    let mut state = self.state.borrow_mut();
    state.programs.remove(&name);
    if state.current_program == name {
      state.current_program = 0;
    }
  }

  fn use_program(&self, name: u32) {
    self.log(format!("use_program({})", name));
    let linked = name == 0 || self.state.borrow().programs.get(&name).map_or(false, |p| p.linked);
    if linked {
      self.state.borrow_mut().current_program = name;
    } else {
      self.raise(gl::INVALID_OPERATION);
    }
  }

  fn active_attributes(&self, program: u32) -> Vec<ActiveVariable> {
    self.state.borrow().programs.get(&program).map(|p| p.attributes.clone()).unwrap_or_default()
  }

  fn active_uniforms(&self, program: u32) -> Vec<ActiveVariable> {
    self.state.borrow().programs.get(&program).map(|p| p.uniforms.clone()).unwrap_or_default()
  }

  fn uniform_f32(&self, location: i32, components: u32, values: &[f32]) {
    self.log(format!("uniform_f32({}, {}, {:?})", location, components, values));
  }

  fn uniform_i32(&self, location: i32, components: u32, values: &[i32]) {
    self.log(format!("uniform_i32({}, {}, {:?})", location, components, values));
  }

  fn uniform_matrix_f32(&self, location: i32, dimension: u32, values: &[f32]) {
    self.log(format!("uniform_matrix_f32({}, {}, {:?})", location, dimension, values));
  }

  fn gen_query(&self) -> u32 {
    let name = self.fresh_name();
    self.log(format!("gen_query() -> {}", name));
    name
  }

  fn delete_query(&self, name: u32) {
    self.log(format!("delete_query({})", name));
    self.release_name(name);
    self.state.borrow_mut().finished_queries.remove(&name);
  }

  fn begin_time_elapsed(&self, name: u32) {
    self.log(format!("begin_time_elapsed({})", name));
    let mut state = self.state.borrow_mut();
    if state.running_query.is_some() {
      state.errors.push_back(gl::INVALID_OPERATION);
      return;
    }
    state.running_query = Some(name);
    state.finished_queries.remove(&name);
  }

  fn end_time_elapsed(&self) {
    self.log("end_time_elapsed()".to_owned());
    let mut state = self.state.borrow_mut();
    match state.running_query.take() {
      Some(name) => {
        let elapsed = state.elapsed_nanos;
        state.finished_queries.insert(name, elapsed);
      }
      None => state.errors.push_back(gl::INVALID_OPERATION),
    }
  }

  fn query_result_available(&self, name: u32) -> bool {
    self.state.borrow().finished_queries.contains_key(&name)
  }

  fn query_result(&self, name: u32) -> u64 {
    self.state.borrow().finished_queries.get(&name).copied().unwrap_or(0)
  }

  fn clear_color(&self, rgba: [f32; 4]) { self.log(format!("clear_color({:?})", rgba)); }

  fn clear_depth(&self, depth: f32) { self.log(format!("clear_depth({})", depth)); }

  fn clear_stencil(&self, stencil: i32) { self.log(format!("clear_stencil({})", stencil)); }

  fn clear(&self, mask: GLbitfield) { self.log(format!("clear({:#06x})", mask)); }

  fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
    self.log(format!("viewport({}, {}, {}, {})", x, y, width, height));
  }

  fn set_capability(&self, capability: GLenum, enabled: bool) {
    self.log(format!("set_capability({:#06x}, {})", capability, enabled));
  }

  fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum) {
    self.log(format!(
      "blend_func_separate({:#06x}, {:#06x}, {:#06x}, {:#06x})",
      src_rgb, dst_rgb, src_a, dst_a,
    ));
  }

  fn blend_equation_separate(&self, rgb: GLenum, alpha: GLenum) {
    self.log(format!("blend_equation_separate({:#06x}, {:#06x})", rgb, alpha));
  }

  fn blend_color(&self, rgba: [f32; 4]) { self.log(format!("blend_color({:?})", rgba)); }

  fn default_framebuffer_stencil_bits(&self) -> u32 { self.state.borrow().default_stencil_bits }

  fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: i32, mask: u32) {
    self.log(format!(
      "stencil_func_separate({:#06x}, {:#06x}, {}, {:#x})",
      face, func, reference, mask,
    ));
  }

  fn stencil_mask_separate(&self, face: GLenum, mask: u32) {
    self.log(format!("stencil_mask_separate({:#06x}, {:#x})", face, mask));
  }

  fn stencil_op_separate(&self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
    self.log(format!(
      "stencil_op_separate({:#06x}, {:#06x}, {:#06x}, {:#06x})",
      face, sfail, dpfail, dppass,
    ));
  }

  fn draw_arrays(&self, mode: GLenum, first: i32, count: i32) {
    self.log(format!("draw_arrays({:#06x}, {}, {})", mode, first, count));
  }

  fn draw_elements(&self, mode: GLenum, count: i32, type_: GLenum, offset: usize) {
    self.log(format!("draw_elements({:#06x}, {}, {:#06x}, {})", mode, count, type_, offset));
  }
}
