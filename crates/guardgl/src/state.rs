use crate::impl_prelude::*;
use prelude_plus::*;

bitflags! {
  pub struct ClearFlags: GLbitfield {
    const COLOR = gl::COLOR_BUFFER_BIT;
    const DEPTH = gl::DEPTH_BUFFER_BIT;
    const STENCIL = gl::STENCIL_BUFFER_BIT;
  }
}

/// Which buffers of the bound draw framebuffer to clear, and to what.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ClearSpec {
  pub color: Option<[f32; 4]>,
  pub depth: Option<f32>,
  pub stencil: Option<i32>,
}

impl ClearSpec {
  pub fn flags(&self) -> ClearFlags {
    let mut flags = ClearFlags::empty();
    flags.set(ClearFlags::COLOR, self.color.is_some());
    flags.set(ClearFlags::DEPTH, self.depth.is_some());
    flags.set(ClearFlags::STENCIL, self.stencil.is_some());
    flags
  }
}

gl_enum!({
  pub enum BlendingFactor {
    Zero = ZERO,
    One = ONE,
    SrcColor = SRC_COLOR,
    OneMinusSrcColor = ONE_MINUS_SRC_COLOR,
    DstColor = DST_COLOR,
    OneMinusDstColor = ONE_MINUS_DST_COLOR,
    SrcAlpha = SRC_ALPHA,
    OneMinusSrcAlpha = ONE_MINUS_SRC_ALPHA,
    DstAlpha = DST_ALPHA,
    OneMinusDstAlpha = ONE_MINUS_DST_ALPHA,
    ConstantColor = CONSTANT_COLOR,
    OneMinusConstantColor = ONE_MINUS_CONSTANT_COLOR,
    ConstantAlpha = CONSTANT_ALPHA,
    OneMinusConstantAlpha = ONE_MINUS_CONSTANT_ALPHA,
    SrcAlphaSaturate = SRC_ALPHA_SATURATE,
  }
});

gl_enum!({
  pub enum BlendingEquation {
    Add = FUNC_ADD,
    Subtract = FUNC_SUBTRACT,
    ReverseSubtract = FUNC_REVERSE_SUBTRACT,
    Min = MIN,
    Max = MAX,
  }
});

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlendState {
  pub source_rgb: BlendingFactor,
  pub source_alpha: BlendingFactor,
  pub destination_rgb: BlendingFactor,
  pub destination_alpha: BlendingFactor,
  pub equation_rgb: BlendingEquation,
  pub equation_alpha: BlendingEquation,
  pub constant_color: [f32; 4],
}

impl Default for BlendState {
  fn default() -> Self { Self::with_factors(BlendingFactor::One, BlendingFactor::Zero) }
}

impl BlendState {
  pub fn with_factors(source: BlendingFactor, destination: BlendingFactor) -> Self {
    Self {
      source_rgb: source,
      source_alpha: source,
      destination_rgb: destination,
      destination_alpha: destination,
      equation_rgb: BlendingEquation::Add,
      equation_alpha: BlendingEquation::Add,
      constant_color: [0.0; 4],
    }
  }

  /// Non-premultiplied alpha blending.
  pub fn alpha() -> Self {
    Self::with_factors(BlendingFactor::SrcAlpha, BlendingFactor::OneMinusSrcAlpha)
  }
}

gl_enum!({
  pub enum DrawPrimitive {
    Points = POINTS,
    Lines = LINES,
    LineLoop = LINE_LOOP,
    LineStrip = LINE_STRIP,
    Triangles = TRIANGLES,
    TriangleStrip = TRIANGLE_STRIP,
    TriangleFan = TRIANGLE_FAN,
  }
});

gl_enum!({
  pub enum FaceSelection {
    Front = FRONT,
    Back = BACK,
    FrontAndBack = FRONT_AND_BACK,
  }
});

impl FaceSelection {
  #[inline(always)]
  pub fn includes_front(self) -> bool { matches!(self, Self::Front | Self::FrontAndBack) }
  #[inline(always)]
  pub fn includes_back(self) -> bool { matches!(self, Self::Back | Self::FrontAndBack) }
}

gl_enum!({
  pub enum StencilFunction {
    Never = NEVER,
    Less = LESS,
    LessOrEqual = LEQUAL,
    Greater = GREATER,
    GreaterOrEqual = GEQUAL,
    Equal = EQUAL,
    NotEqual = NOTEQUAL,
    Always = ALWAYS,
  }
});

gl_enum!({
  pub enum StencilOperation {
    Keep = KEEP,
    Zero = ZERO,
    Replace = REPLACE,
    Increment = INCR,
    IncrementWrap = INCR_WRAP,
    Decrement = DECR,
    DecrementWrap = DECR_WRAP,
    Invert = INVERT,
  }
});

/// The stencil configuration of one polygon face.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StencilFaceState {
  pub function: StencilFunction,
  pub reference: i32,
  pub function_mask: u32,
  pub write_mask: u32,
  pub stencil_fail: StencilOperation,
  pub depth_fail: StencilOperation,
  pub pass: StencilOperation,
}

impl Default for StencilFaceState {
  fn default() -> Self {
    Self {
      function: StencilFunction::Always,
      reference: 0,
      function_mask: !0,
      write_mask: !0,
      stencil_fail: StencilOperation::Keep,
      depth_fail: StencilOperation::Keep,
      pass: StencilOperation::Keep,
    }
  }
}

impl Context {
  /// The default framebuffer is assumed to have a depth buffer, the window
  /// system decides that.
  fn check_clear_targets(&self, spec: &ClearSpec) -> GlResult<()> {
    if spec.stencil.is_some() {
      self.check_stencil_buffer("Clearing stencil")?;
    }
    let framebuffer = match self.bound_draw_framebuffer.bound() {
      Some(framebuffer) => framebuffer,
      None => return Ok(()),
    };
    if spec.depth.is_some() && !framebuffer.has_depth_attachment() {
      return Err(GlError::NoDepthBuffer(format!(
        "Clearing depth, but the bound draw framebuffer {} has no depth attachment",
        framebuffer.key(),
      )));
    }
    Ok(())
  }

  /// Stencil bits of the bound draw framebuffer, or of the default one if
  /// none is bound.
  pub fn stencil_buffer_get_bits(&self) -> u32 {
    match self.bound_draw_framebuffer.bound() {
      Some(framebuffer) => framebuffer.stencil_bits(),
      None => self.driver().default_framebuffer_stencil_bits(),
    }
  }

  fn check_stencil_buffer(&self, what: &str) -> GlResult<()> {
    if self.stencil_buffer_get_bits() > 0 {
      return Ok(());
    }
    let target = match self.bound_draw_framebuffer.bound() {
      Some(framebuffer) => format!("the bound draw framebuffer {}", framebuffer.key()),
      None => "the default framebuffer".to_owned(),
    };
    Err(GlError::NoStencilBuffer(format!("{}, but {} has no stencil buffer", what, target)))
  }

  pub fn stencil_buffer_enable(&self) -> GlResult<()> {
    self.check_stencil_buffer("Enabling the stencil test")?;
    if self.stencil_enabled.get() {
      trace!("redundant stencil test enable ignored");
      return Ok(());
    }
    self.driver().set_capability(gl::STENCIL_TEST, true);
    self.stencil_enabled.set(true);
    self.checkpoint()
  }

  pub fn stencil_buffer_disable(&self) -> GlResult<()> {
    self.check_stencil_buffer("Disabling the stencil test")?;
    if !self.stencil_enabled.get() {
      trace!("redundant stencil test disable ignored");
      return Ok(());
    }
    self.driver().set_capability(gl::STENCIL_TEST, false);
    self.stencil_enabled.set(false);
    self.checkpoint()
  }

  pub fn stencil_buffer_is_enabled(&self) -> GlResult<bool> {
    self.check_stencil_buffer("Querying the stencil test")?;
    Ok(self.stencil_enabled.get())
  }

  #[inline(always)]
  pub fn stencil_buffer_front(&self) -> StencilFaceState { self.stencil_front.get() }
  #[inline(always)]
  pub fn stencil_buffer_back(&self) -> StencilFaceState { self.stencil_back.get() }

  /// Applies `update` to the selected faces. Returns whether any of them
  /// changed.
  fn stencil_faces_update(
    &self,
    faces: FaceSelection,
    update: impl Fn(&mut StencilFaceState),
  ) -> bool {
    let selected =
      [(faces.includes_front(), &self.stencil_front), (faces.includes_back(), &self.stencil_back)];
    let mut changed = false;
    for &(included, cell) in &selected {
      if !included {
        continue;
      }
      let mut state = cell.get();
      update(&mut state);
      if state != cell.get() {
        cell.set(state);
        changed = true;
      }
    }
    changed
  }

  pub fn stencil_buffer_function(
    &self,
    faces: FaceSelection,
    function: StencilFunction,
    reference: i32,
    mask: u32,
  ) -> GlResult<()> {
    self.check_stencil_buffer("Setting the stencil function")?;
    let changed = self.stencil_faces_update(faces, |state| {
      state.function = function;
      state.reference = reference;
      state.function_mask = mask;
    });
    if !changed {
      trace!("redundant stencil function change ignored ({:?}, {:?})", faces, function);
      return Ok(());
    }
    self.driver().stencil_func_separate(faces.as_raw(), function.as_raw(), reference, mask);
    self.checkpoint()
  }

  /// Sets which bits of the stencil buffer drawing may write.
  pub fn stencil_buffer_mask(&self, faces: FaceSelection, mask: u32) -> GlResult<()> {
    self.check_stencil_buffer("Setting the stencil mask")?;
    if !self.stencil_faces_update(faces, |state| state.write_mask = mask) {
      trace!("redundant stencil mask change ignored ({:?}, {:#x})", faces, mask);
      return Ok(());
    }
    self.driver().stencil_mask_separate(faces.as_raw(), mask);
    self.checkpoint()
  }

  pub fn stencil_buffer_operation(
    &self,
    faces: FaceSelection,
    stencil_fail: StencilOperation,
    depth_fail: StencilOperation,
    pass: StencilOperation,
  ) -> GlResult<()> {
    self.check_stencil_buffer("Setting the stencil operation")?;
    let changed = self.stencil_faces_update(faces, |state| {
      state.stencil_fail = stencil_fail;
      state.depth_fail = depth_fail;
      state.pass = pass;
    });
    if !changed {
      trace!("redundant stencil operation change ignored ({:?})", faces);
      return Ok(());
    }
    self.driver().stencil_op_separate(
      faces.as_raw(),
      stencil_fail.as_raw(),
      depth_fail.as_raw(),
      pass.as_raw(),
    );
    self.checkpoint()
  }

  pub fn clear(&self, spec: &ClearSpec) -> GlResult<()> {
    let flags = spec.flags();
    if flags.is_empty() {
      return Ok(());
    }
    self.check_clear_targets(spec)?;

    let driver = self.driver();
    if let Some(color) = spec.color {
      driver.clear_color(color);
    }
    if let Some(depth) = spec.depth {
      driver.clear_depth(depth);
    }
    if let Some(stencil) = spec.stencil {
      driver.clear_stencil(stencil);
    }
    driver.clear(flags.bits());
    self.checkpoint()
  }

  pub fn viewport_set(&self, x: i32, y: i32, width: u32, height: u32) -> GlResult<()> {
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
      return Err(GlError::Range(format!("Viewport size {}x{} is too large", width, height)));
    }
    self.driver().viewport(x, y, width as i32, height as i32);
    self.checkpoint()
  }

  fn check_blend_state(&self, state: &BlendState) -> GlResult<()> {
    if self.profile() != Profile::Gles2 {
      return Ok(());
    }
    for &equation in &[state.equation_rgb, state.equation_alpha] {
      if matches!(equation, BlendingEquation::Min | BlendingEquation::Max) {
        return Err(self.unsupported(&format!("Blending equation {:?}", equation)));
      }
    }
    for &factor in &[state.destination_rgb, state.destination_alpha] {
      if factor == BlendingFactor::SrcAlphaSaturate {
        return Err(self.unsupported("SrcAlphaSaturate as a destination factor"));
      }
    }
    Ok(())
  }

  pub fn blending_enable(&self, state: &BlendState) -> GlResult<()> {
    self.check_blend_state(state)?;
    let driver = self.driver();
    driver.set_capability(gl::BLEND, true);
    driver.blend_func_separate(
      state.source_rgb.as_raw(),
      state.destination_rgb.as_raw(),
      state.source_alpha.as_raw(),
      state.destination_alpha.as_raw(),
    );
    driver.blend_equation_separate(state.equation_rgb.as_raw(), state.equation_alpha.as_raw());
    driver.blend_color(state.constant_color);
    self.blending_enabled.set(true);
    self.checkpoint()
  }

  pub fn blending_disable(&self) -> GlResult<()> {
    self.driver().set_capability(gl::BLEND, false);
    self.blending_enabled.set(false);
    self.checkpoint()
  }

  #[inline(always)]
  pub fn blending_is_enabled(&self) -> bool { self.blending_enabled.get() }

  fn check_draw_program(&self) -> GlResult<()> {
    if !self.bound_program.is_anything_bound() {
      return Err(GlError::ProgramNotActive("Drawing requires an active program".to_owned()));
    }
    Ok(())
  }

  /// Draws `count` vertices of the current array object starting at `first`.
  pub fn draw_arrays(&self, primitive: DrawPrimitive, first: u32, count: u32) -> GlResult<()> {
    self.check_draw_program()?;
    if first > i32::MAX as u32 || count > i32::MAX as u32 {
      return Err(GlError::Range(format!("Vertex range {}+{} is too large", first, count)));
    }
    self.driver().draw_arrays(primitive.as_raw(), first as i32, count as i32);
    self.checkpoint()
  }

  /// Draws every index of the current array object's index buffer.
  pub fn draw_elements(&self, primitive: DrawPrimitive) -> GlResult<()> {
    self.check_draw_program()?;
    let ao = self.array_object_get_currently_bound();
    let index_buffer = ao.index_buffer().ok_or_else(|| {
      GlError::NotBound(format!("Drawing elements, but {} has no index buffer", ao.key()))
    })?;
    if index_buffer.indices() > i32::MAX as usize {
      return Err(GlError::Range(format!("{} has too many indices", index_buffer.key())));
    }
    self.driver().draw_elements(
      primitive.as_raw(),
      index_buffer.indices() as i32,
      index_buffer.index_type().as_raw(),
      0,
    );
    self.checkpoint()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    ContextConfig, FakeDriver, IndexType, RenderbufferFormat, SharedContext, UsageHint,
  };

  fn context(profile: Profile) -> (SharedContext, FakeDriver) {
    let driver = FakeDriver::new(profile);
    let config = ContextConfig { check_errors: true, ..Default::default() };
    (Context::new(Box::new(driver.clone()), config).unwrap(), driver)
  }

  #[test]
  fn clearing_sets_only_the_requested_values() {
    let (ctx, driver) = context(Profile::Gl33);
    driver.clear_calls();
    let spec = ClearSpec { color: Some([0.0, 0.0, 0.0, 1.0]), depth: Some(1.0), stencil: None };
    ctx.clear(&spec).unwrap();
    let mask = gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT;
    assert_eq!(driver.calls(), vec![
      "clear_color([0.0, 0.0, 0.0, 1.0])".to_owned(),
      "clear_depth(1)".to_owned(),
      format!("clear({:#06x})", mask),
    ]);

    driver.clear_calls();
    ctx.clear(&ClearSpec::default()).unwrap();
    assert!(driver.calls().is_empty());
  }

  #[test]
  fn clearing_needs_the_attachments() {
    let (ctx, _driver) = context(Profile::Gl33);
    let color = ctx.renderbuffer_allocate(RenderbufferFormat::Rgba8, 8, 8).unwrap();
    let depth = ctx.renderbuffer_allocate(RenderbufferFormat::Depth16, 8, 8).unwrap();
    let mut builder = ctx.framebuffer_new_builder();
    let point = ctx.framebuffer_color_attachment_points()[0];
    builder.attach_color_renderbuffer_at(&point, &color).unwrap();
    builder.attach_depth_renderbuffer(&depth).unwrap();
    ctx.framebuffer_allocate(&builder).unwrap();

    ctx.clear(&ClearSpec { depth: Some(1.0), ..Default::default() }).unwrap();
    assert!(matches!(
      ctx.clear(&ClearSpec { stencil: Some(0), ..Default::default() }),
      Err(GlError::NoStencilBuffer(_)),
    ));
    ctx.renderbuffer_delete(&depth).unwrap();
    assert!(matches!(
      ctx.clear(&ClearSpec { depth: Some(1.0), ..Default::default() }),
      Err(GlError::NoDepthBuffer(_)),
    ));
  }

  #[test]
  fn blending_is_tracked() {
    let (ctx, driver) = context(Profile::Gles2);
    assert!(!ctx.blending_is_enabled());
    ctx.blending_enable(&BlendState::alpha()).unwrap();
    assert!(ctx.blending_is_enabled());
    assert!(driver.calls().contains(&format!(
      "blend_func_separate({:#06x}, {:#06x}, {:#06x}, {:#06x})",
      gl::SRC_ALPHA,
      gl::ONE_MINUS_SRC_ALPHA,
      gl::SRC_ALPHA,
      gl::ONE_MINUS_SRC_ALPHA,
    )));
    ctx.blending_disable().unwrap();
    assert!(!ctx.blending_is_enabled());
  }

  #[test]
  fn gles2_blending_has_fewer_options() {
    let (ctx, _driver) = context(Profile::Gles2);
    let state = BlendState { equation_rgb: BlendingEquation::Max, ..Default::default() };
    assert!(matches!(ctx.blending_enable(&state), Err(GlError::Unsupported(_))));
    let state = BlendState::with_factors(BlendingFactor::One, BlendingFactor::SrcAlphaSaturate);
    assert!(matches!(ctx.blending_enable(&state), Err(GlError::Unsupported(_))));
    assert!(!ctx.blending_is_enabled());

    let (ctx, _driver) = context(Profile::Gl33);
    ctx.blending_enable(&state).unwrap();
  }

  #[test]
  fn viewports_are_range_checked() {
    let (ctx, driver) = context(Profile::Gl33);
    ctx.viewport_set(0, 0, 640, 480).unwrap();
    assert!(driver.calls().contains(&"viewport(0, 0, 640, 480)".to_owned()));
    assert!(matches!(ctx.viewport_set(0, 0, u32::MAX, 1), Err(GlError::Range(_))));
  }

  #[test]
  fn drawing_needs_a_program_and_indices() {
    let (ctx, driver) = context(Profile::Gl33);
    assert!(matches!(
      ctx.draw_arrays(DrawPrimitive::Triangles, 0, 3),
      Err(GlError::ProgramNotActive(_)),
    ));

    let vertex = ctx.shader_compile_vertex("v", "in vec2 position;\nvoid main() {}").unwrap();
    let fragment = ctx.shader_compile_fragment("f", "void main() {}").unwrap();
    let program = ctx.program_link("p", &vertex, None, &fragment).unwrap();
    ctx.program_activate(&program).unwrap();

    ctx.draw_arrays(DrawPrimitive::Triangles, 0, 3).unwrap();
    assert!(driver.calls().contains(&format!("draw_arrays({:#06x}, 0, 3)", gl::TRIANGLES)));
    assert!(matches!(ctx.draw_elements(DrawPrimitive::Triangles), Err(GlError::NotBound(_))));

    ctx.index_buffer_allocate(6, IndexType::U16, UsageHint::StaticDraw).unwrap();
    ctx.draw_elements(DrawPrimitive::Triangles).unwrap();
    let expected =
      format!("draw_elements({:#06x}, 6, {:#06x}, 0)", gl::TRIANGLES, gl::UNSIGNED_SHORT);
    assert!(driver.calls().contains(&expected));
  }

  #[test]
  fn stencil_state_is_tracked_per_face() {
    let (ctx, driver) = context(Profile::Gl33);
    assert_eq!(ctx.stencil_buffer_get_bits(), 8);
    assert!(!ctx.stencil_buffer_is_enabled().unwrap());
    driver.clear_calls();

    ctx.stencil_buffer_enable().unwrap();
    ctx.stencil_buffer_enable().unwrap();
    assert!(ctx.stencil_buffer_is_enabled().unwrap());
    assert_eq!(driver.calls(), vec![format!("set_capability({:#06x}, true)", gl::STENCIL_TEST)]);

    driver.clear_calls();
    let equal = StencilFunction::Equal;
    ctx.stencil_buffer_function(FaceSelection::FrontAndBack, equal, 1, 0xff).unwrap();
    // already what the front face has
    ctx.stencil_buffer_function(FaceSelection::Front, equal, 1, 0xff).unwrap();
    ctx.stencil_buffer_function(FaceSelection::Back, StencilFunction::Less, 2, 0xff).unwrap();
    assert_eq!(driver.calls(), vec![
      format!("stencil_func_separate({:#06x}, {:#06x}, 1, 0xff)", gl::FRONT_AND_BACK, gl::EQUAL),
      format!("stencil_func_separate({:#06x}, {:#06x}, 2, 0xff)", gl::BACK, gl::LESS),
    ]);
    assert_eq!(ctx.stencil_buffer_front().function, StencilFunction::Equal);
    assert_eq!(ctx.stencil_buffer_back().reference, 2);

    driver.clear_calls();
    ctx.stencil_buffer_mask(FaceSelection::Front, 0x0f).unwrap();
    ctx.stencil_buffer_mask(FaceSelection::Front, 0x0f).unwrap();
    let replace = StencilOperation::Replace;
    ctx
      .stencil_buffer_operation(FaceSelection::Back, StencilOperation::Keep, replace, replace)
      .unwrap();
    assert_eq!(driver.calls().len(), 2);
    assert_eq!(ctx.stencil_buffer_front().write_mask, 0x0f);
    assert_eq!(ctx.stencil_buffer_back().write_mask, !0);
    assert_eq!(ctx.stencil_buffer_back().pass, StencilOperation::Replace);
    assert_eq!(ctx.stencil_buffer_front().pass, StencilOperation::Keep);

    ctx.stencil_buffer_disable().unwrap();
    assert!(!ctx.stencil_buffer_is_enabled().unwrap());
  }

  #[test]
  fn stencil_operations_need_stencil_bits() {
    let driver = FakeDriver::new(Profile::Gl33).with_default_stencil_bits(0);
    let config = ContextConfig { check_errors: true, ..Default::default() };
    let ctx = Context::new(Box::new(driver), config).unwrap();
    assert_eq!(ctx.stencil_buffer_get_bits(), 0);
    assert!(matches!(ctx.stencil_buffer_enable(), Err(GlError::NoStencilBuffer(_))));
    assert!(matches!(ctx.stencil_buffer_is_enabled(), Err(GlError::NoStencilBuffer(_))));
    assert!(matches!(
      ctx.stencil_buffer_mask(FaceSelection::Front, 1),
      Err(GlError::NoStencilBuffer(_)),
    ));
    assert!(matches!(
      ctx.clear(&ClearSpec { stencil: Some(0), ..Default::default() }),
      Err(GlError::NoStencilBuffer(_)),
    ));

    let point = ctx.framebuffer_color_attachment_points()[0];
    let color = ctx.renderbuffer_allocate(RenderbufferFormat::Rgba8, 8, 8).unwrap();
    let depth_stencil =
      ctx.renderbuffer_allocate(RenderbufferFormat::Depth24Stencil8, 8, 8).unwrap();
    let mut builder = ctx.framebuffer_new_builder();
    builder.attach_color_renderbuffer_at(&point, &color).unwrap();
    builder.attach_depth_stencil_renderbuffer(&depth_stencil).unwrap();
    ctx.framebuffer_allocate(&builder).unwrap();

    assert_eq!(ctx.stencil_buffer_get_bits(), 8);
    ctx.stencil_buffer_enable().unwrap();
    ctx.clear(&ClearSpec { stencil: Some(0), ..Default::default() }).unwrap();
  }
}
