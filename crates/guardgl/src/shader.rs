use crate::driver::ActiveVariable;
use crate::impl_prelude::*;
use crate::texture::TextureUnit;
use prelude_plus::*;

gl_enum!({
  pub enum ShaderValueType {
    Float = FLOAT,
    Vec2f = FLOAT_VEC2,
    Vec3f = FLOAT_VEC3,
    Vec4f = FLOAT_VEC4,
    Int = INT,
    Vec2i = INT_VEC2,
    Vec3i = INT_VEC3,
    Vec4i = INT_VEC4,
    Uint = UNSIGNED_INT,
    Bool = BOOL,
    Matrix2f = FLOAT_MAT2,
    Matrix3f = FLOAT_MAT3,
    Matrix4f = FLOAT_MAT4,
    Sampler2D = SAMPLER_2D,
    SamplerCube = SAMPLER_CUBE,
  }
});

macro_rules! shader_object {
  ($type:ident) => {
    #[derive(Debug)]
    pub struct $type {
      header: ObjectHeader,
      label: String,
    }

    impl_object!($type, header);

    impl $type {
      /// The name the shader was compiled under.
      #[inline(always)]
      pub fn label(&self) -> &str { &self.label }
    }
  };
}

shader_object!(VertexShader);
shader_object!(FragmentShader);
shader_object!(GeometryShader);

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProgramAttribute {
  program: ObjectKey,
  name: String,
  location: i32,
  type_: ShaderValueType,
  size: i32,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProgramUniform {
  program: ObjectKey,
  name: String,
  location: i32,
  type_: ShaderValueType,
  size: i32,
}

macro_rules! impl_program_variable_accessors {
  ($type:ty) => {
    impl $type {
      #[inline(always)]
      pub fn program(&self) -> ObjectKey { self.program }
      #[inline(always)]
      pub fn name(&self) -> &str { &self.name }
      #[inline(always)]
      pub fn location(&self) -> i32 { self.location }
      #[inline(always)]
      pub fn type_(&self) -> ShaderValueType { self.type_ }
      /// Element count, 1 unless this is an array.
      #[inline(always)]
      pub fn size(&self) -> i32 { self.size }
    }
  };
}

impl_program_variable_accessors!(ProgramAttribute);
impl_program_variable_accessors!(ProgramUniform);

#[derive(Debug)]
pub struct Program {
  header: ObjectHeader,
  label: String,
  attributes: BTreeMap<String, ProgramAttribute>,
  uniforms: BTreeMap<String, ProgramUniform>,
}

impl_object!(Program, header);

/// Arrays are reported as `name[0]` but looked up by either spelling.
fn lookup<'a, T>(map: &'a BTreeMap<String, T>, name: &str) -> Option<&'a T> {
  map.get(name).or_else(|| map.get(&format!("{}[0]", name)))
}

impl Program {
  #[inline(always)]
  pub fn label(&self) -> &str { &self.label }
  #[inline(always)]
  pub fn attributes(&self) -> &BTreeMap<String, ProgramAttribute> { &self.attributes }
  #[inline(always)]
  pub fn uniforms(&self) -> &BTreeMap<String, ProgramUniform> { &self.uniforms }

  pub fn attribute(&self, name: &str) -> Option<&ProgramAttribute> {
    lookup(&self.attributes, name)
  }

  pub fn uniform(&self, name: &str) -> Option<&ProgramUniform> { lookup(&self.uniforms, name) }
}

impl Context {
  fn shader_compile(&self, label: &str, type_: GLenum, source: &str) -> GlResult<u32> {
    debug!("compile {:?} ({} bytes)", label, source.len());
    let driver = self.driver();
    let name = driver.create_shader(type_);
    driver.shader_source(name, source);
    if !driver.compile_shader(name) {
      let log = driver.shader_info_log(name);
      driver.delete_shader(name);
      return Err(GlError::ShaderCompile { name: label.to_owned(), log });
    }
    if let Err(error) = self.checkpoint() {
      driver.delete_shader(name);
      return Err(error);
    }
    Ok(name)
  }

  pub fn shader_compile_vertex(&self, label: &str, source: &str) -> GlResult<Rc<VertexShader>> {
    let name = self.shader_compile(label, gl::VERTEX_SHADER, source)?;
    let shader = Rc::new(VertexShader {
      header: ObjectHeader::new(self.id(), ObjectKind::VertexShader, name),
      label: label.to_owned(),
    });
    debug!("allocated {}", shader.key());
    Ok(shader)
  }

  pub fn shader_compile_fragment(&self, label: &str, source: &str) -> GlResult<Rc<FragmentShader>> {
    let name = self.shader_compile(label, gl::FRAGMENT_SHADER, source)?;
    let shader = Rc::new(FragmentShader {
      header: ObjectHeader::new(self.id(), ObjectKind::FragmentShader, name),
      label: label.to_owned(),
    });
    debug!("allocated {}", shader.key());
    Ok(shader)
  }

  pub fn shader_compile_geometry(&self, label: &str, source: &str) -> GlResult<Rc<GeometryShader>> {
    if !self.profile().features().geometry_shaders {
      return Err(self.unsupported("Geometry shaders"));
    }
    let name = self.shader_compile(label, gl::GEOMETRY_SHADER, source)?;
    let shader = Rc::new(GeometryShader {
      header: ObjectHeader::new(self.id(), ObjectKind::GeometryShader, name),
      label: label.to_owned(),
    });
    debug!("allocated {}", shader.key());
    Ok(shader)
  }

  fn shader_delete_impl<T: Object>(&self, shader: &T, header: &ObjectHeader) -> GlResult<()> {
    self.check_object(shader)?;
    debug!("delete {}", shader.key());
    self.driver().delete_shader(shader.name());
    header.mark_deleted();
    self.checkpoint()
  }

  pub fn shader_delete_vertex(&self, shader: &VertexShader) -> GlResult<()> {
    self.shader_delete_impl(shader, &shader.header)
  }

  pub fn shader_delete_fragment(&self, shader: &FragmentShader) -> GlResult<()> {
    self.shader_delete_impl(shader, &shader.header)
  }

  pub fn shader_delete_geometry(&self, shader: &GeometryShader) -> GlResult<()> {
    self.shader_delete_impl(shader, &shader.header)
  }

  fn program_reflect<F, T>(
    &self,
    variables: Vec<ActiveVariable>,
    what: &str,
    mut make: F,
  ) -> BTreeMap<String, T>
  where
    F: FnMut(ActiveVariable, ShaderValueType) -> T,
  {
    let mut result = BTreeMap::new();
    for variable in variables {
      match ShaderValueType::from_raw(variable.type_) {
        Some(type_) => {
          trace!(
            "{} {:?}: {:?} x{} at {}",
            what, variable.name, type_, variable.size, variable.location,
          );
          result.insert(variable.name.clone(), make(variable, type_));
        }
        None => warn!(
          "{} {:?} has an unknown type 0x{:04x}, ignoring it",
          what, variable.name, variable.type_,
        ),
      }
    }
    result
  }

  /// Links the shaders into a program and records its active attributes and
  /// uniforms.
  pub fn program_link(
    &self,
    label: &str,
    vertex: &VertexShader,
    geometry: Option<&GeometryShader>,
    fragment: &FragmentShader,
  ) -> GlResult<Rc<Program>> {
    self.check_object(vertex)?;
    self.check_object(fragment)?;
    if let Some(geometry) = geometry {
      self.check_object(geometry)?;
    }
    debug!("link {:?}", label);

    let driver = self.driver();
    let name = driver.create_program();
    driver.attach_shader(name, vertex.name());
    if let Some(geometry) = geometry {
      driver.attach_shader(name, geometry.name());
    }
    driver.attach_shader(name, fragment.name());

    if !driver.link_program(name) {
      let log = driver.program_info_log(name);
      driver.delete_program(name);
      return Err(GlError::ProgramLink { name: label.to_owned(), log });
    }

    let key = ObjectKey { context: self.id(), kind: ObjectKind::Program, name };
    let attributes =
      self.program_reflect(driver.active_attributes(name), "attribute", |variable, type_| {
        ProgramAttribute {
          program: key,
          name: variable.name,
          location: variable.location,
          type_,
          size: variable.size,
        }
      });
    let uniforms = self.program_reflect(driver.active_uniforms(name), "uniform", |variable, type_| {
      ProgramUniform {
        program: key,
        name: variable.name,
        location: variable.location,
        type_,
        size: variable.size,
      }
    });

    let program = Rc::new(Program {
      header: ObjectHeader::new(self.id(), ObjectKind::Program, name),
      label: label.to_owned(),
      attributes,
      uniforms,
    });
    debug!("allocated {}", program.key());
    self.checkpoint_allocation(program, Self::program_delete)
  }

  pub fn program_activate(&self, program: &Rc<Program>) -> GlResult<()> {
    self.check_object(&**program)?;
    self.bound_program.bind_if_needed(self.driver(), program);
    self.checkpoint()
  }

  pub fn program_deactivate(&self) -> GlResult<()> {
    if self.bound_program.is_anything_bound() {
      self.bound_program.unbind_unconditionally(self.driver());
    }
    self.checkpoint()
  }

  #[inline(always)]
  pub fn program_get_active(&self) -> Option<Rc<Program>> { self.bound_program.bound() }

  pub fn program_is_active(&self, program: &Program) -> GlResult<bool> {
    self.check_object(program)?;
    Ok(self.bound_program.is_bound(program))
  }

  /// Deletes the program, deactivating it first if it is active.
  pub fn program_delete(&self, program: &Program) -> GlResult<()> {
    self.check_object(program)?;
    debug!("delete {}", program.key());
    if self.bound_program.is_bound(program) {
      self.bound_program.unbind_unconditionally(self.driver());
    }
    self.driver().delete_program(program.name());
    program.header.mark_deleted();
    self.checkpoint()
  }

  fn check_uniform(&self, uniform: &ProgramUniform, accepted: &[ShaderValueType]) -> GlResult<()> {
    let active = self.bound_program.bound();
    if active.as_ref().map_or(true, |active| active.key() != uniform.program) {
      return Err(GlError::ProgramNotActive(format!(
        "Uniform {:?} belongs to {}, the active program is {}",
        uniform.name,
        uniform.program,
        active.map_or_else(|| "none".to_owned(), |active| active.key().to_string()),
      )));
    }
    if !accepted.contains(&uniform.type_) {
      return Err(GlError::UniformType(format!(
        "Uniform {:?} is of type {:?}, the value given is for {:?}",
        uniform.name, uniform.type_, accepted,
      )));
    }
    Ok(())
  }

  pub fn uniform_put_f32(&self, uniform: &ProgramUniform, value: f32) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Float])?;
    self.driver().uniform_f32(uniform.location, 1, &[value]);
    self.checkpoint()
  }

  pub fn uniform_put_vec2f(&self, uniform: &ProgramUniform, value: [f32; 2]) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Vec2f])?;
    self.driver().uniform_f32(uniform.location, 2, &value);
    self.checkpoint()
  }

  pub fn uniform_put_vec3f(&self, uniform: &ProgramUniform, value: [f32; 3]) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Vec3f])?;
    self.driver().uniform_f32(uniform.location, 3, &value);
    self.checkpoint()
  }

  pub fn uniform_put_vec4f(&self, uniform: &ProgramUniform, value: [f32; 4]) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Vec4f])?;
    self.driver().uniform_f32(uniform.location, 4, &value);
    self.checkpoint()
  }

  /// Booleans are uploaded as integers.
  pub fn uniform_put_i32(&self, uniform: &ProgramUniform, value: i32) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Int, ShaderValueType::Bool])?;
    self.driver().uniform_i32(uniform.location, 1, &[value]);
    self.checkpoint()
  }

  pub fn uniform_put_matrix3x3f(&self, uniform: &ProgramUniform, value: &[f32; 9]) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Matrix3f])?;
    self.driver().uniform_matrix_f32(uniform.location, 3, value);
    self.checkpoint()
  }

  /// `value` is in column-major order.
  pub fn uniform_put_matrix4x4f(
    &self,
    uniform: &ProgramUniform,
    value: &[f32; 16],
  ) -> GlResult<()> {
    self.check_uniform(uniform, &[ShaderValueType::Matrix4f])?;
    self.driver().uniform_matrix_f32(uniform.location, 4, value);
    self.checkpoint()
  }

  /// Points a sampler at a texture unit.
  pub fn uniform_put_texture_unit(
    &self,
    uniform: &ProgramUniform,
    unit: &TextureUnit,
  ) -> GlResult<()> {
    check_usable(self, unit)?;
    self.check_uniform(uniform, &[ShaderValueType::Sampler2D, ShaderValueType::SamplerCube])?;
    self.driver().uniform_i32(uniform.location, 1, &[unit.index() as i32]);
    self.checkpoint()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ContextConfig, FakeDriver, SharedContext};

  const VERTEX: &str = "
    attribute vec2 position;
    attribute vec2 uv;
    uniform mat4 projection;
    varying vec2 v_uv;
    void main() {}
  ";
  const FRAGMENT: &str = "
    precision mediump float;
    uniform sampler2D image;
    uniform vec4 tint;
    uniform float weights[3];
    uniform bool enabled;
    void main() {}
  ";

  fn context(profile: Profile) -> (SharedContext, FakeDriver) {
    let driver = FakeDriver::new(profile);
    let config = ContextConfig { check_errors: true, ..Default::default() };
    (Context::new(Box::new(driver.clone()), config).unwrap(), driver)
  }

  fn program(ctx: &Context) -> Rc<Program> {
    let vertex = ctx.shader_compile_vertex("quad.vert", VERTEX).unwrap();
    let fragment = ctx.shader_compile_fragment("quad.frag", FRAGMENT).unwrap();
    ctx.program_link("quad", &vertex, None, &fragment).unwrap()
  }

  #[test]
  fn compile_errors_carry_the_log() {
    let (ctx, driver) = context(Profile::Gles2);
    match ctx.shader_compile_fragment("broken.frag", "void main() {}\n#error nope") {
      Err(GlError::ShaderCompile { name, log }) => {
        assert_eq!(name, "broken.frag");
        assert_eq!(log, "0:2: '#error' : nope");
      }
      other => panic!("unexpected {:?}", other),
    }
    assert!(driver.calls().iter().any(|call| call.starts_with("delete_shader")));
  }

  #[test]
  fn geometry_shaders_need_desktop_gl() {
    let (ctx, _driver) = context(Profile::Gles2);
    assert!(matches!(
      ctx.shader_compile_geometry("g", "void main() {}"),
      Err(GlError::Unsupported(_)),
    ));
    let (ctx, _driver) = context(Profile::Gl33);
    ctx.shader_compile_geometry("g", "void main() {}").unwrap();
  }

  #[test]
  fn linking_reflects_attributes_and_uniforms() {
    let (ctx, _driver) = context(Profile::Gles2);
    let program = program(&ctx);
    assert_eq!(program.attributes().len(), 2);
    assert_eq!(program.attribute("uv").map(ProgramAttribute::type_), Some(ShaderValueType::Vec2f));
    assert_eq!(
      program.uniform("projection").map(ProgramUniform::type_),
      Some(ShaderValueType::Matrix4f),
    );
    let weights = program.uniform("weights").unwrap();
    assert_eq!((weights.name(), weights.size()), ("weights[0]", 3));
    assert!(program.uniform("missing").is_none());
  }

  #[test]
  fn deleted_shaders_cannot_be_linked() {
    let (ctx, _driver) = context(Profile::Gl33);
    let vertex = ctx.shader_compile_vertex("v", VERTEX).unwrap();
    let fragment = ctx.shader_compile_fragment("f", FRAGMENT).unwrap();
    ctx.shader_delete_fragment(&fragment).unwrap();
    assert!(matches!(ctx.program_link("p", &vertex, None, &fragment), Err(GlError::Deleted(_))));
    assert!(matches!(ctx.shader_delete_fragment(&fragment), Err(GlError::Deleted(_))));
  }

  #[test]
  fn uniforms_need_their_program_active() {
    let (ctx, driver) = context(Profile::Gl33);
    let program = program(&ctx);
    let tint = program.uniform("tint").unwrap();
    assert!(matches!(ctx.uniform_put_vec4f(tint, [1.0; 4]), Err(GlError::ProgramNotActive(_))));

    ctx.program_activate(&program).unwrap();
    assert!(ctx.program_is_active(&program).unwrap());
    assert_eq!(driver.current_program(), program.name());
    ctx.uniform_put_vec4f(tint, [1.0, 0.5, 0.25, 1.0]).unwrap();
    let expected = format!("uniform_f32({}, 4, [1.0, 0.5, 0.25, 1.0])", tint.location());
    assert!(driver.calls().contains(&expected));

    ctx.program_deactivate().unwrap();
    assert!(ctx.program_get_active().is_none());
    assert!(matches!(ctx.uniform_put_vec4f(tint, [1.0; 4]), Err(GlError::ProgramNotActive(_))));
  }

  #[test]
  fn uniforms_are_type_checked() {
    let (ctx, driver) = context(Profile::Gl33);
    let program = program(&ctx);
    ctx.program_activate(&program).unwrap();

    let tint = program.uniform("tint").unwrap();
    assert!(matches!(ctx.uniform_put_f32(tint, 1.0), Err(GlError::UniformType(_))));
    let enabled = program.uniform("enabled").unwrap();
    ctx.uniform_put_i32(enabled, 1).unwrap();

    let image = program.uniform("image").unwrap();
    let unit = ctx.texture_units()[4];
    ctx.uniform_put_texture_unit(image, &unit).unwrap();
    assert!(driver.calls().contains(&format!("uniform_i32({}, 1, [4])", image.location())));
    assert!(matches!(ctx.uniform_put_i32(tint, 4), Err(GlError::UniformType(_))));
  }

  #[test]
  fn deleting_the_active_program_deactivates_it() {
    let (ctx, driver) = context(Profile::Gl33);
    let program = program(&ctx);
    ctx.program_activate(&program).unwrap();
    ctx.program_delete(&program).unwrap();
    assert!(ctx.program_get_active().is_none());
    assert_eq!(driver.current_program(), 0);
    assert!(matches!(ctx.program_activate(&program), Err(GlError::Deleted(_))));
  }
}
