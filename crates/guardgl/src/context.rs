use crate::array_object::ArrayObject;
use crate::buffer::ArrayBuffer;
use crate::framebuffer::{ColorAttachmentPoint, DrawBuffer, Framebuffer};
use crate::impl_prelude::*;
use crate::query::TimerQuery;
use crate::renderbuffer::Renderbuffer;
use crate::shader::Program;
use crate::state::StencilFaceState;
use crate::texture::{BoundTexture, TextureUnit};
use prelude_plus::*;

pub type SharedContext = Rc<Context>;

/// At most this many codes are taken off the native error queue at once.
pub const MAX_DRAINED_ERRORS: usize = 32;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ContextConfig {
  /// Used in diagnostics only.
  pub name: String,
  /// Whether state-changing operations drain the native error queue before
  /// returning.
  pub check_errors: bool,
  /// Install the KHR_debug message callback, if the driver has it.
  pub debug_output: bool,
  pub max_texture_units: u32,
  pub max_draw_buffers: u32,
  pub max_color_attachments: u32,
  pub max_vertex_attributes: u32,
}

impl Default for ContextConfig {
  fn default() -> Self {
    Self {
      name: "main".to_owned(),
      check_errors: cfg!(debug_assertions) || cfg!(feature = "debug_all_commands"),
      debug_output: true,
      // reported values which are unreasonably large get clamped to these
      max_texture_units: 1024,
      max_draw_buffers: 1024,
      max_color_attachments: 1024,
      max_vertex_attributes: 1024,
    }
  }
}

pub struct Context {
  id: ContextId,
  driver: Box<dyn Driver>,
  config: ContextConfig,
  capabilities: ContextCapabilities,

  is_sharing: Cell<bool>,
  created_shares: RefCell<BTreeSet<ContextId>>,

  texture_units: Vec<TextureUnit>,
  color_attachment_points: Vec<ColorAttachmentPoint>,
  draw_buffers: Vec<DrawBuffer>,
  vertex_attribute_count: u32,

  default_array_object: Rc<ArrayObject>,

  pub(crate) bound_array_buffer: BindingTarget<ArrayBuffer>,
  pub(crate) bound_array_object: BindingTarget<ArrayObject>,
  pub(crate) bound_program: BindingTarget<Program>,
  pub(crate) bound_draw_framebuffer: BindingTarget<Framebuffer>,
  pub(crate) bound_read_framebuffer: BindingTarget<Framebuffer>,
  pub(crate) bound_renderbuffer: BindingTarget<Renderbuffer>,
  pub(crate) running_timer_query: BindingTarget<TimerQuery>,

  pub(crate) texture_unit_bindings: Vec<RefCell<Option<BoundTexture>>>,
  active_texture_unit: Cell<u32>,
  pub(crate) blending_enabled: Cell<bool>,
  pub(crate) stencil_enabled: Cell<bool>,
  pub(crate) stencil_front: Cell<StencilFaceState>,
  pub(crate) stencil_back: Cell<StencilFaceState>,
}

impl Context {
  #[inline(always)]
  pub fn id(&self) -> ContextId { self.id }
  #[inline(always)]
  pub fn name(&self) -> &str { &self.config.name }
  #[inline(always)]
  pub fn config(&self) -> &ContextConfig { &self.config }
  #[inline(always)]
  pub fn capabilities(&self) -> &ContextCapabilities { &self.capabilities }
  #[inline(always)]
  pub fn profile(&self) -> Profile { self.driver.profile() }
  #[inline(always)]
  pub fn driver(&self) -> &dyn Driver { &*self.driver }
  #[inline(always)]
  pub fn texture_units(&self) -> &[TextureUnit] { &self.texture_units }
  #[inline(always)]
  pub fn framebuffer_color_attachment_points(&self) -> &[ColorAttachmentPoint] {
    &self.color_attachment_points
  }
  #[inline(always)]
  pub fn framebuffer_draw_buffers(&self) -> &[DrawBuffer] { &self.draw_buffers }
  #[inline(always)]
  pub fn vertex_attribute_count(&self) -> u32 { self.vertex_attribute_count }
  #[inline(always)]
  pub fn array_object_get_default(&self) -> Rc<ArrayObject> {
    Rc::clone(&self.default_array_object)
  }

  /// Wraps a native context the driver has been loaded for. The context must
  /// be current on the calling thread for every subsequent operation.
  pub fn new(driver: Box<dyn Driver>, config: ContextConfig) -> GlResult<SharedContext> {
    let profile = driver.profile();
    let id = ContextId::fresh();

    // This has to be done first, so that messages about the queries below get
    // reported too.
    if config.debug_output {
      crate::debug::init(&*driver);
    }

    let capabilities = ContextCapabilities::load(&*driver);
    capabilities.check_compliance(profile)?;

    let unit_count = capabilities.max_texture_units.min(config.max_texture_units);
    let attachment_count = capabilities.max_color_attachments.min(config.max_color_attachments);
    let draw_buffer_count = capabilities.max_draw_buffers.min(config.max_draw_buffers);
    let vertex_attribute_count =
      capabilities.max_vertex_attributes.min(config.max_vertex_attributes);

    let default_name =
      if profile.features().generated_default_array_object { driver.gen_vertex_array() } else { 0 };
    let default_array_object =
      Rc::new(ArrayObject::new_default(id, default_name, vertex_attribute_count));

    let framebuffer_draw_target = if profile.features().separate_read_framebuffer {
      gl::DRAW_FRAMEBUFFER
    } else {
      gl::FRAMEBUFFER
    };

    let ctx = Self {
      id,
      driver,
      config,
      capabilities,

      is_sharing: Cell::new(false),
      created_shares: RefCell::new(BTreeSet::new()),

      texture_units: (0..unit_count).map(|index| TextureUnit::new(id, index)).collect(),
      color_attachment_points: (0..attachment_count)
        .map(|index| ColorAttachmentPoint::new(id, index))
        .collect(),
      draw_buffers: (0..draw_buffer_count).map(|index| DrawBuffer::new(id, index)).collect(),
      vertex_attribute_count,

      default_array_object: Rc::clone(&default_array_object),

      bound_array_buffer: BindingTarget::new(gl::ARRAY_BUFFER),
      bound_array_object: BindingTarget::new(gl::NONE),
      // programs are a special case, there is no such thing as binding a
      // program to a target
      bound_program: BindingTarget::new(gl::NONE),
      bound_draw_framebuffer: BindingTarget::new(framebuffer_draw_target),
      bound_read_framebuffer: BindingTarget::new(gl::READ_FRAMEBUFFER),
      bound_renderbuffer: BindingTarget::new(gl::RENDERBUFFER),
      running_timer_query: BindingTarget::new(gl::TIME_ELAPSED),

      texture_unit_bindings: (0..unit_count).map(|_| RefCell::new(None)).collect(),
      active_texture_unit: Cell::new(0),
      blending_enabled: Cell::new(false),
      // the initial native stencil state
      stencil_enabled: Cell::new(false),
      stencil_front: Cell::new(StencilFaceState::default()),
      stencil_back: Cell::new(StencilFaceState::default()),
    };

    ctx.bound_array_object.bind_unconditionally(&*ctx.driver, Some(&default_array_object));
    ctx.checkpoint()?;

    info!("created {} ({}) on {}", ctx.id, ctx.name(), profile);
    Ok(Rc::new(ctx))
  }

  /// Records that `self` and `other` were created sharing objects with each
  /// other. The relation is recorded on both sides but is never extended
  /// transitively.
  pub fn share_with(&self, other: &Context) {
    if self.id == other.id {
      return;
    }
    self.is_sharing.set(true);
    other.is_sharing.set(true);
    self.created_shares.borrow_mut().insert(other.id);
    other.created_shares.borrow_mut().insert(self.id);
    debug!("{} ({}) shares objects with {} ({})", self.id, self.name(), other.id, other.name());
  }

  #[inline(always)]
  pub fn is_sharing(&self) -> bool { self.is_sharing.get() }

  pub fn is_shared_with(&self, other: ContextId) -> bool {
    self.is_sharing.get() && self.created_shares.borrow().contains(&other)
  }

  pub fn created_shares(&self) -> Vec<ContextId> {
    self.created_shares.borrow().iter().copied().collect()
  }

  pub fn supports_timer_queries(&self) -> bool {
    self.profile() == Profile::Gl33 || self.capabilities.extensions.gl_ext_disjoint_timer_query
  }

  /// Takes every pending code off the native error queue, regardless of
  /// [`ContextConfig::check_errors`].
  pub fn drain_errors(&self) -> GlResult<()> {
    let mut codes = Vec::new();
    while codes.len() < MAX_DRAINED_ERRORS {
      let code = self.driver.get_error();
      if code == gl::NO_ERROR {
        break;
      }
      codes.push(code);
    }
    if codes.is_empty() {
      Ok(())
    } else {
      Err(GlError::Runtime { codes })
    }
  }

  #[inline]
  pub(crate) fn checkpoint(&self) -> GlResult<()> {
    if self.config.check_errors {
      self.drain_errors()
    } else {
      Ok(())
    }
  }

  /// The checkpoint closing an allocation. When it fails, `delete` takes the
  /// new object out of every binding point and container before the error is
  /// returned.
  pub(crate) fn checkpoint_allocation<T: Object>(
    &self,
    object: Rc<T>,
    delete: impl FnOnce(&Self, &T) -> GlResult<()>,
  ) -> GlResult<Rc<T>> {
    if let Err(error) = self.checkpoint() {
      warn!("allocation of {} failed, deleting it", object.key());
      if let Err(delete_error) = delete(self, &object) {
        warn!("deleting {} failed too: {}", object.key(), delete_error);
      }
      return Err(error);
    }
    Ok(object)
  }

  #[inline(always)]
  pub fn active_texture_unit(&self) -> u32 { self.active_texture_unit.get() }

  pub(crate) fn set_active_texture_unit(&self, unit: u32) {
    if self.active_texture_unit.get() != unit {
      self.driver.active_texture(gl::TEXTURE0 + unit);
      self.active_texture_unit.set(unit);
    }
  }

  pub(crate) fn unsupported(&self, what: &str) -> GlError {
    GlError::Unsupported(format!("{} is not available on {}", what, self.profile()))
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Context({}, {:?}, {})", self.id, self.config.name, self.profile())
  }
}

/// Local knowledge of what is bound to one native binding point.
#[derive(Debug)]
pub(crate) struct BindingTarget<T> {
  target: GLenum,
  bound: RefCell<Option<Rc<T>>>,
}

#[allow(dead_code)]
impl<T: Object> BindingTarget<T> {
  #[inline(always)]
  pub(crate) fn target(&self) -> GLenum { self.target }
  #[inline(always)]
  pub(crate) fn bound(&self) -> Option<Rc<T>> { self.bound.borrow().clone() }
  #[inline(always)]
  pub(crate) fn bound_name(&self) -> u32 { self.bound.borrow().as_ref().map_or(0, |o| o.name()) }
  #[inline(always)]
  pub(crate) fn is_anything_bound(&self) -> bool { self.bound.borrow().is_some() }

  pub(crate) fn new(target: GLenum) -> Self { Self { target, bound: RefCell::new(None) } }

  pub(crate) fn is_bound(&self, object: &T) -> bool {
    self.bound.borrow().as_ref().map_or(false, |bound| bound.key() == object.key())
  }

  /// Updates the local view without talking to the driver.
  pub(crate) fn set(&self, object: Option<Rc<T>>) -> Option<Rc<T>> {
    mem::replace(&mut *self.bound.borrow_mut(), object)
  }

  /// Forgets the bound object if it is `key`. Returns whether it was.
  pub(crate) fn forget_if(&self, key: ObjectKey) -> bool {
    let mut bound = self.bound.borrow_mut();
    if bound.as_ref().map_or(false, |o| o.key() == key) {
      *bound = None;
      true
    } else {
      false
    }
  }
}

macro_rules! impl_binding_target_state {
  ($object:ty, $driver_bind_fn:ident ($($target:ident)?)) => {
    #[allow(dead_code)]
    impl BindingTarget<$object> {
      pub(crate) fn bind_unconditionally(&self, driver: &dyn Driver, object: Option<&Rc<$object>>) {
        let name = object.map_or(0, |o| o.name());
        driver.$driver_bind_fn($(self.$target, )? name);
        match object {
          Some(object) => trace!("bind {}", object.key()),
          None => trace!("unbind {}", stringify!($object)),
        }
        self.set(object.cloned());
      }

      #[inline(always)]
      pub(crate) fn unbind_unconditionally(&self, driver: &dyn Driver) {
        self.bind_unconditionally(driver, None)
      }

      #[inline]
      pub(crate) fn bind_if_needed(&self, driver: &dyn Driver, object: &Rc<$object>) {
        if !self.is_bound(object) {
          self.bind_unconditionally(driver, Some(object));
        }
      }
    }
  };
}

impl_binding_target_state!(ArrayBuffer, bind_buffer(target));
impl_binding_target_state!(ArrayObject, bind_vertex_array());
impl_binding_target_state!(Program, use_program());
impl_binding_target_state!(Framebuffer, bind_framebuffer(target));
impl_binding_target_state!(Renderbuffer, bind_renderbuffer());

#[derive(Debug, Eq, PartialEq, Clone, Hash, Default)]
pub struct ContextCapabilities {
  pub renderer: String,
  pub vendor: String,
  pub gl_version: String,
  pub glsl_version: String,
  pub extensions: ContextExtensions,

  pub max_vertex_attributes: u32,
  pub max_texture_units: u32,
  pub max_texture_size: u32,
  pub max_cube_map_texture_size: u32,
  pub max_renderbuffer_size: u32,
  pub max_color_attachments: u32,
  pub max_draw_buffers: u32,

  pub max_debug_object_label_len: u32,
}

impl ContextCapabilities {
  pub fn load(driver: &dyn Driver) -> Self {
    let get_u32 = |name: GLenum| -> u32 { driver.get_integer(name).max(0) as u32 };
    let get_string = |name: GLenum| -> String { driver.get_string(name).unwrap_or_default() };
    let features = driver.profile().features();

    let renderer = get_string(gl::RENDERER);
    info!("GL renderer:    {}", renderer);
    let vendor = get_string(gl::VENDOR);
    info!("GL vendor:      {}", vendor);
    let gl_version = get_string(gl::VERSION);
    info!("GL version:     {}", gl_version);
    let glsl_version = get_string(gl::SHADING_LANGUAGE_VERSION);
    info!("GLSL version:   {}", glsl_version);

    let extension_names = driver.extensions();
    let extensions = ContextExtensions::new(extension_names.iter().map(String::as_str));
    info!("GL extensions:  {:?}", extensions);

    let capabilities = Self {
      renderer,
      vendor,
      gl_version,
      glsl_version,

      max_vertex_attributes: get_u32(gl::MAX_VERTEX_ATTRIBS),
      max_texture_units: get_u32(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
      max_texture_size: get_u32(gl::MAX_TEXTURE_SIZE),
      max_cube_map_texture_size: get_u32(gl::MAX_CUBE_MAP_TEXTURE_SIZE),
      max_renderbuffer_size: get_u32(gl::MAX_RENDERBUFFER_SIZE),
      // without the draw buffers extensions GLES2 only has COLOR_ATTACHMENT0
      max_color_attachments: if features.multiple_draw_buffers {
        get_u32(gl::MAX_COLOR_ATTACHMENTS)
      } else {
        1
      },
      max_draw_buffers: if features.multiple_draw_buffers {
        get_u32(gl::MAX_DRAW_BUFFERS)
      } else {
        1
      },

      max_debug_object_label_len: if extensions.gl_khr_debug {
        get_u32(gl::MAX_LABEL_LENGTH)
      } else {
        0
      },

      extensions,
    };
    info!(
      "GL limits:      {} vertex attributes, {} texture units, {}px textures, {} color attachments, {} draw buffers",
      capabilities.max_vertex_attributes,
      capabilities.max_texture_units,
      capabilities.max_texture_size,
      capabilities.max_color_attachments,
      capabilities.max_draw_buffers,
    );
    capabilities
  }

  /// Refuses implementations reporting less than the profile guarantees.
  pub fn check_compliance(&self, profile: Profile) -> GlResult<()> {
    fn non_compliant(message: String) -> GlError {
      error!("{}", message);
      GlError::NonCompliant(message)
    }

    let minimums = profile.minimums();
    let checks = [
      ("vertex attributes", self.max_vertex_attributes, minimums.vertex_attributes),
      ("texture units", self.max_texture_units, minimums.texture_units),
      ("texture size", self.max_texture_size, minimums.texture_size),
      ("color attachments", self.max_color_attachments, minimums.color_attachments),
      ("draw buffers", self.max_draw_buffers, minimums.draw_buffers),
    ];
    for &(what, reported, required) in &checks {
      if reported < required {
        return Err(non_compliant(format!(
          "Reported number of {} ({}) is less than the required minimum {} for {}",
          what, reported, required, profile,
        )));
      }
    }

    for &extension in profile.required_extensions() {
      if !self.extensions.is_loaded(extension) {
        return Err(non_compliant(format!(
          "Required extension {} is not supported by the implementation of {}",
          extension, profile,
        )));
      }
    }

    Ok(())
  }
}

macro_rules! generate_context_extensions_struct {
  ($(($name:literal, $field:ident)),* $(,)?) => {
    #[derive(Debug, Eq, PartialEq, Clone, Hash, Default)]
    pub struct ContextExtensions {
      $(pub $field: bool),*
    }

    impl ContextExtensions {
      fn new<'a, T: IntoIterator<Item = &'a str>>(loaded_extension_names_iter: T) -> Self {
        let mut extensions = ContextExtensions {
          $($field: false),*
        };

        for name in loaded_extension_names_iter {
          match name {
            $($name => extensions.$field = true,)*
            _ => {}
          }
        }

        extensions
      }

      /// Only knows the extensions listed in this struct.
      pub fn is_loaded(&self, name: &str) -> bool {
        match name {
          $($name => self.$field,)*
          _ => false,
        }
      }
    }
  };
}

generate_context_extensions_struct![
  ("GL_KHR_debug", gl_khr_debug),
  ("GL_OES_vertex_array_object", gl_oes_vertex_array_object),
  ("GL_EXT_disjoint_timer_query", gl_ext_disjoint_timer_query),
  ("GL_OES_element_index_uint", gl_oes_element_index_uint),
  ("GL_OES_texture_npot", gl_oes_texture_npot),
];

#[cfg(test)]
mod tests {
  use super::*;
  use crate::FakeDriver;

  fn config(name: &str) -> ContextConfig {
    ContextConfig { name: name.to_owned(), check_errors: true, ..Default::default() }
  }

  #[test]
  fn compliant_drivers_produce_a_context() {
    for &profile in &[Profile::Gles2, Profile::Gl33] {
      let ctx = Context::new(Box::new(FakeDriver::new(profile)), config("main")).unwrap();
      assert_eq!(ctx.profile(), profile);
      assert_eq!(ctx.texture_units().len() as u32, ctx.capabilities().max_texture_units);
      assert!(!ctx.is_sharing());
    }
  }

  #[test]
  fn too_few_vertex_attributes_are_non_compliant() {
    let driver = FakeDriver::new(Profile::Gl33).with_integer(gl::MAX_VERTEX_ATTRIBS, 8);
    match Context::new(Box::new(driver), config("main")) {
      Err(GlError::NonCompliant(message)) => {
        assert!(message.contains("vertex attributes"));
        assert!(message.contains("(8)"));
        assert!(message.contains("16"));
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn gles2_needs_array_objects() {
    let driver = FakeDriver::new(Profile::Gles2).without_extension("GL_OES_vertex_array_object");
    assert!(matches!(
      Context::new(Box::new(driver), config("main")),
      Err(GlError::NonCompliant(_)),
    ));
  }

  #[test]
  fn reported_limits_are_clamped() {
    let driver =
      FakeDriver::new(Profile::Gl33).with_integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, 96);
    let ctx = Context::new(Box::new(driver), ContextConfig {
      max_texture_units: 20,
      max_draw_buffers: 8,
      ..config("main")
    })
    .unwrap();
    assert_eq!(ctx.capabilities().max_texture_units, 96);
    assert_eq!(ctx.texture_units().len(), 20);
    assert_eq!(ctx.framebuffer_draw_buffers().len(), 8);
  }

  #[test]
  fn sharing_is_recorded_on_both_sides() {
    let a = Context::new(Box::new(FakeDriver::new(Profile::Gl33)), config("a")).unwrap();
    let b = Context::new(Box::new(FakeDriver::new(Profile::Gl33)), config("b")).unwrap();
    a.share_with(&b);
    assert!(a.is_sharing() && b.is_sharing());
    assert!(a.is_shared_with(b.id()));
    assert!(b.is_shared_with(a.id()));
    assert_eq!(a.created_shares(), vec![b.id()]);

    // sharing with oneself is meaningless
    let c = Context::new(Box::new(FakeDriver::new(Profile::Gl33)), config("c")).unwrap();
    c.share_with(&c);
    assert!(!c.is_sharing());
  }

  #[test]
  fn draining_collects_every_queued_code() {
    let driver = FakeDriver::new(Profile::Gl33);
    let ctx = Context::new(Box::new(driver.clone()), config("main")).unwrap();
    assert_eq!(ctx.drain_errors(), Ok(()));

    driver.push_error(gl::INVALID_ENUM);
    driver.push_error(gl::INVALID_VALUE);
    assert_eq!(
      ctx.drain_errors(),
      Err(GlError::Runtime { codes: vec![gl::INVALID_ENUM, gl::INVALID_VALUE] }),
    );
    assert_eq!(ctx.drain_errors(), Ok(()));

    for _ in 0..40 {
      driver.push_error(gl::OUT_OF_MEMORY);
    }
    match ctx.drain_errors() {
      Err(GlError::Runtime { codes }) => assert_eq!(codes.len(), MAX_DRAINED_ERRORS),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn default_array_object_depends_on_the_profile() {
    let desktop = Context::new(Box::new(FakeDriver::new(Profile::Gl33)), config("a")).unwrap();
    assert_ne!(desktop.array_object_get_default().name(), 0);
    let es = Context::new(Box::new(FakeDriver::new(Profile::Gles2)), config("b")).unwrap();
    assert_eq!(es.array_object_get_default().name(), 0);
    assert!(es.bound_array_object.is_bound(&es.array_object_get_default()));
  }
}
