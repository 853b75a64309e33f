use crate::format::FormatKind;
use crate::impl_prelude::*;
use crate::reference::{reference_add, reference_remove_all};
use crate::renderbuffer::Renderbuffer;
use crate::texture::{CubeFace, Texture2D, TextureCube};
use prelude_plus::*;

/// One of the color attachment points of framebuffers on a context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ColorAttachmentPoint {
  context: ContextId,
  index: u32,
}

impl_pseudo_unshared!(ColorAttachmentPoint, context);

impl ColorAttachmentPoint {
  pub(crate) fn new(context: ContextId, index: u32) -> Self { Self { context, index } }

  #[inline(always)]
  pub fn index(&self) -> u32 { self.index }

  #[inline(always)]
  fn as_raw(&self) -> GLenum { gl::COLOR_ATTACHMENT0 + self.index }
}

/// One of the fragment shader outputs of a context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DrawBuffer {
  context: ContextId,
  index: u32,
}

impl_pseudo_unshared!(DrawBuffer, context);

impl DrawBuffer {
  pub(crate) fn new(context: ContextId, index: u32) -> Self { Self { context, index } }

  #[inline(always)]
  pub fn index(&self) -> u32 { self.index }
}

#[derive(Debug, Clone)]
pub enum ColorAttachment {
  Texture2D(Rc<Texture2D>),
  TextureCube(Rc<TextureCube>, CubeFace),
  Renderbuffer(Rc<Renderbuffer>),
}

impl ColorAttachment {
  pub fn key(&self) -> ObjectKey {
    match self {
      Self::Texture2D(texture) => texture.key(),
      Self::TextureCube(texture, _) => texture.key(),
      Self::Renderbuffer(renderbuffer) => renderbuffer.key(),
    }
  }
}

/// The depth, stencil or combined attachment. Which of those it is follows
/// from the format of the attached object.
#[derive(Debug, Clone)]
pub enum DepthStencilAttachment {
  Texture2D(Rc<Texture2D>),
  Renderbuffer(Rc<Renderbuffer>),
}

impl DepthStencilAttachment {
  pub fn key(&self) -> ObjectKey {
    match self {
      Self::Texture2D(texture) => texture.key(),
      Self::Renderbuffer(renderbuffer) => renderbuffer.key(),
    }
  }

  pub fn kind(&self) -> FormatKind {
    match self {
      Self::Texture2D(texture) => texture.format().kind(),
      Self::Renderbuffer(renderbuffer) => renderbuffer.kind(),
    }
  }

  fn attachment_point(&self) -> GLenum {
    match self.kind() {
      FormatKind::Depth => gl::DEPTH_ATTACHMENT,
      FormatKind::Stencil => gl::STENCIL_ATTACHMENT,
      FormatKind::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
      FormatKind::Color => unreachable!("color formats are rejected by the builder"),
    }
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FramebufferStatus {
  Complete,
  Undefined,
  IncompleteAttachment,
  IncompleteMissingAttachment,
  IncompleteDrawBuffer,
  IncompleteReadBuffer,
  IncompleteMultisample,
  Unsupported,
  Unknown(GLenum),
}

impl FramebufferStatus {
  pub fn from_raw(raw: GLenum) -> Self {
    match raw {
      gl::FRAMEBUFFER_COMPLETE => Self::Complete,
      gl::FRAMEBUFFER_UNDEFINED => Self::Undefined,
      gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => Self::IncompleteAttachment,
      gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => Self::IncompleteMissingAttachment,
      gl::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => Self::IncompleteDrawBuffer,
      gl::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => Self::IncompleteReadBuffer,
      gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => Self::IncompleteMultisample,
      gl::FRAMEBUFFER_UNSUPPORTED => Self::Unsupported,
      other => Self::Unknown(other),
    }
  }

  #[inline(always)]
  pub fn is_complete(self) -> bool { self == Self::Complete }
}

#[derive(Debug, Clone)]
pub struct FramebufferBuilder {
  context: ContextId,
  colors: Vec<Option<ColorAttachment>>,
  depth_stencil: Option<DepthStencilAttachment>,
  draw_buffers: Vec<Option<ColorAttachmentPoint>>,
}

impl_pseudo_unshared!(FramebufferBuilder, context);

impl FramebufferBuilder {
  fn check_point(&self, point: &ColorAttachmentPoint) -> GlResult<usize> {
    if point.context != self.context {
      return Err(GlError::WrongContext(format!(
        "Color attachment point {} belongs to {}, the builder to {}",
        point.index, point.context, self.context,
      )));
    }
    Ok(point.index as usize)
  }

  fn check_kind(key: ObjectKey, actual: FormatKind, expected: FormatKind) -> GlResult<()> {
    if actual != expected {
      return Err(GlError::Format(format!(
        "{} has a {:?} format, a {:?} format is required here",
        key, actual, expected,
      )));
    }
    Ok(())
  }

  pub fn attach_color_texture_2d_at(
    &mut self,
    point: &ColorAttachmentPoint,
    texture: &Rc<Texture2D>,
  ) -> GlResult<()> {
    let index = self.check_point(point)?;
    Self::check_kind(texture.key(), texture.format().kind(), FormatKind::Color)?;
    self.colors[index] = Some(ColorAttachment::Texture2D(Rc::clone(texture)));
    Ok(())
  }

  pub fn attach_color_texture_cube_at(
    &mut self,
    point: &ColorAttachmentPoint,
    texture: &Rc<TextureCube>,
    face: CubeFace,
  ) -> GlResult<()> {
    let index = self.check_point(point)?;
    Self::check_kind(texture.key(), texture.format().kind(), FormatKind::Color)?;
    self.colors[index] = Some(ColorAttachment::TextureCube(Rc::clone(texture), face));
    Ok(())
  }

  pub fn attach_color_renderbuffer_at(
    &mut self,
    point: &ColorAttachmentPoint,
    renderbuffer: &Rc<Renderbuffer>,
  ) -> GlResult<()> {
    let index = self.check_point(point)?;
    Self::check_kind(renderbuffer.key(), renderbuffer.kind(), FormatKind::Color)?;
    self.colors[index] = Some(ColorAttachment::Renderbuffer(Rc::clone(renderbuffer)));
    Ok(())
  }

  pub fn attach_depth_texture_2d(&mut self, texture: &Rc<Texture2D>) -> GlResult<()> {
    Self::check_kind(texture.key(), texture.format().kind(), FormatKind::Depth)?;
    self.depth_stencil = Some(DepthStencilAttachment::Texture2D(Rc::clone(texture)));
    Ok(())
  }

  pub fn attach_depth_stencil_texture_2d(&mut self, texture: &Rc<Texture2D>) -> GlResult<()> {
    Self::check_kind(texture.key(), texture.format().kind(), FormatKind::DepthStencil)?;
    self.depth_stencil = Some(DepthStencilAttachment::Texture2D(Rc::clone(texture)));
    Ok(())
  }

  pub fn attach_depth_renderbuffer(&mut self, renderbuffer: &Rc<Renderbuffer>) -> GlResult<()> {
    Self::check_kind(renderbuffer.key(), renderbuffer.kind(), FormatKind::Depth)?;
    self.depth_stencil = Some(DepthStencilAttachment::Renderbuffer(Rc::clone(renderbuffer)));
    Ok(())
  }

  pub fn attach_depth_stencil_renderbuffer(
    &mut self,
    renderbuffer: &Rc<Renderbuffer>,
  ) -> GlResult<()> {
    Self::check_kind(renderbuffer.key(), renderbuffer.kind(), FormatKind::DepthStencil)?;
    self.depth_stencil = Some(DepthStencilAttachment::Renderbuffer(Rc::clone(renderbuffer)));
    Ok(())
  }

  pub fn attach_stencil_renderbuffer(&mut self, renderbuffer: &Rc<Renderbuffer>) -> GlResult<()> {
    Self::check_kind(renderbuffer.key(), renderbuffer.kind(), FormatKind::Stencil)?;
    self.depth_stencil = Some(DepthStencilAttachment::Renderbuffer(Rc::clone(renderbuffer)));
    Ok(())
  }

  pub fn detach_color_at(&mut self, point: &ColorAttachmentPoint) -> GlResult<()> {
    let index = self.check_point(point)?;
    self.colors[index] = None;
    Ok(())
  }

  pub fn detach_depth_stencil(&mut self) { self.depth_stencil = None; }

  /// Routes the shader output `draw_buffer` to `point`, or discards it.
  /// Initially draw buffer `i` goes to color attachment point `i`.
  pub fn set_draw_buffer(
    &mut self,
    draw_buffer: &DrawBuffer,
    point: Option<&ColorAttachmentPoint>,
  ) -> GlResult<()> {
    if draw_buffer.context != self.context {
      return Err(GlError::WrongContext(format!(
        "Draw buffer {} belongs to {}, the builder to {}",
        draw_buffer.index, draw_buffer.context, self.context,
      )));
    }
    if let Some(point) = point {
      self.check_point(point)?;
    }
    self.draw_buffers[draw_buffer.index as usize] = point.copied();
    Ok(())
  }

  pub fn color_attachment_at(&self, point: &ColorAttachmentPoint) -> Option<&ColorAttachment> {
    self.colors.get(point.index as usize).and_then(Option::as_ref)
  }

  #[inline(always)]
  pub fn depth_stencil_attachment(&self) -> Option<&DepthStencilAttachment> {
    self.depth_stencil.as_ref()
  }
}

#[derive(Debug)]
pub struct Framebuffer {
  header: ObjectHeader,
  references: ReferenceContainer,
  colors: RefCell<Vec<Option<ColorAttachment>>>,
  depth_stencil: RefCell<Option<DepthStencilAttachment>>,
}

impl_object!(Framebuffer, header);

impl Composite for Framebuffer {
  #[inline(always)]
  fn reference_container(&self) -> &ReferenceContainer { &self.references }

  fn on_reference_deleted(&self, key: ObjectKey) {
    for color in self.colors.borrow_mut().iter_mut() {
      if color.as_ref().map_or(false, |color| color.key() == key) {
        *color = None;
      }
    }
    let mut depth_stencil = self.depth_stencil.borrow_mut();
    if depth_stencil.as_ref().map_or(false, |attachment| attachment.key() == key) {
      *depth_stencil = None;
    }
  }
}

impl Framebuffer {
  pub fn color_attachment_at(&self, point: &ColorAttachmentPoint) -> Option<ColorAttachment> {
    self.colors.borrow().get(point.index as usize).cloned().flatten()
  }

  pub fn depth_stencil_attachment(&self) -> Option<DepthStencilAttachment> {
    self.depth_stencil.borrow().clone()
  }

  pub fn has_depth_attachment(&self) -> bool {
    self.depth_stencil.borrow().as_ref().map_or(false, |attachment| attachment.kind().has_depth())
  }

  pub fn has_stencil_attachment(&self) -> bool {
    self.depth_stencil.borrow().as_ref().map_or(false, |attachment| attachment.kind().has_stencil())
  }

  /// Every format with a stencil part stores 8 bits of it.
  pub fn stencil_bits(&self) -> u32 { if self.has_stencil_attachment() { 8 } else { 0 } }
}

impl Context {
  pub fn framebuffer_new_builder(&self) -> FramebufferBuilder {
    let points = self.framebuffer_color_attachment_points();
    FramebufferBuilder {
      context: self.id(),
      colors: vec![None; points.len()],
      depth_stencil: None,
      draw_buffers: (0..self.framebuffer_draw_buffers().len())
        .map(|i| points.get(i).copied())
        .collect(),
    }
  }

  fn check_framebuffer_builder(&self, builder: &FramebufferBuilder) -> GlResult<()> {
    check_usable(self, builder)?;
    let profile = self.profile();
    for color in builder.colors.iter().flatten() {
      let format = match color {
        ColorAttachment::Texture2D(texture) => Some(self.check_object(&**texture)?.format()),
        ColorAttachment::TextureCube(texture, _) => Some(self.check_object(&**texture)?.format()),
        ColorAttachment::Renderbuffer(renderbuffer) => {
          self.check_object(&**renderbuffer)?;
          None
        }
      };
      if let Some(format) = format {
        if !format.is_color_renderable(profile) {
          return Err(GlError::Format(format!(
            "{:?} textures ({}) are not color-renderable on {}",
            format,
            color.key(),
            profile,
          )));
        }
      }
    }
    match &builder.depth_stencil {
      Some(DepthStencilAttachment::Texture2D(texture)) => {
        self.check_object(&**texture)?;
        if !texture.format().is_depth_renderable(profile) {
          return Err(GlError::Format(format!(
            "{:?} textures ({}) are not depth-renderable on {}",
            texture.format(),
            texture.key(),
            profile,
          )));
        }
      }
      Some(DepthStencilAttachment::Renderbuffer(renderbuffer)) => {
        self.check_object(&**renderbuffer)?;
      }
      None => {}
    }
    Ok(())
  }

  /// A framebuffer bound for drawing must not have attachments a texture
  /// unit is sampling from.
  fn check_framebuffer_feedback(&self, keys: &[ObjectKey], framebuffer: &str) -> GlResult<()> {
    for &key in keys {
      if matches!(key.kind, ObjectKind::Texture2D | ObjectKind::TextureCube)
        && self.texture_is_bound_to_any_unit(key)
      {
        return Err(GlError::FeedbackLoop(format!(
          "Attempted to bind {} for drawing, but its attachment {} is bound to a texture unit",
          framebuffer, key,
        )));
      }
    }
    Ok(())
  }

  /// Creates a framebuffer with the attachments of `builder`. It is left
  /// bound for drawing.
  pub fn framebuffer_allocate(&self, builder: &FramebufferBuilder) -> GlResult<Rc<Framebuffer>> {
    self.check_framebuffer_builder(builder)?;
    let mut keys: Vec<ObjectKey> =
      builder.colors.iter().flatten().map(ColorAttachment::key).collect();
    keys.extend(builder.depth_stencil.as_ref().map(DepthStencilAttachment::key));
    self.check_framebuffer_feedback(&keys, "a new framebuffer")?;
    debug!("allocate ({} attachments)", keys.len());

    let driver = self.driver();
    let name = driver.gen_framebuffer();
    let framebuffer = Rc::new(Framebuffer {
      header: ObjectHeader::new(self.id(), ObjectKind::Framebuffer, name),
      references: ReferenceContainer::default(),
      colors: RefCell::new(builder.colors.clone()),
      depth_stencil: RefCell::new(builder.depth_stencil.clone()),
    });
    debug!("allocated {}", framebuffer.key());

    self.bound_draw_framebuffer.bind_unconditionally(driver, Some(&framebuffer));
    let target = self.bound_draw_framebuffer.target();

    for (point, color) in self.framebuffer_color_attachment_points().iter().zip(&builder.colors) {
      match color {
        Some(ColorAttachment::Texture2D(texture)) => {
          driver.framebuffer_texture_2d(target, point.as_raw(), gl::TEXTURE_2D, texture.name(), 0);
          reference_add(&framebuffer, texture);
        }
        Some(ColorAttachment::TextureCube(texture, face)) => {
          driver.framebuffer_texture_2d(target, point.as_raw(), face.as_raw(), texture.name(), 0);
          reference_add(&framebuffer, texture);
        }
        Some(ColorAttachment::Renderbuffer(renderbuffer)) => {
          driver.framebuffer_renderbuffer(target, point.as_raw(), renderbuffer.name());
          reference_add(&framebuffer, renderbuffer);
        }
        None => {}
      }
    }

    if let Some(attachment) = &builder.depth_stencil {
      let point = attachment.attachment_point();
      match attachment {
        DepthStencilAttachment::Texture2D(texture) => {
          driver.framebuffer_texture_2d(target, point, gl::TEXTURE_2D, texture.name(), 0);
          reference_add(&framebuffer, texture);
        }
        DepthStencilAttachment::Renderbuffer(renderbuffer) => {
          driver.framebuffer_renderbuffer(target, point, renderbuffer.name());
          reference_add(&framebuffer, renderbuffer);
        }
      }
    }

    if self.profile().features().multiple_draw_buffers {
      let buffers: Vec<GLenum> = builder
        .draw_buffers
        .iter()
        .map(|point| match point {
          Some(point) if builder.colors[point.index as usize].is_some() => point.as_raw(),
          _ => gl::NONE,
        })
        .collect();
      driver.draw_buffers(&buffers);
    }

    self.checkpoint_allocation(framebuffer, Self::framebuffer_delete)
  }

  pub fn framebuffer_draw_bind(&self, framebuffer: &Rc<Framebuffer>) -> GlResult<()> {
    self.check_object(&**framebuffer)?;
    let keys = framebuffer.reference_container().reference_keys();
    self.check_framebuffer_feedback(&keys, &framebuffer.key().to_string())?;
    self.bound_draw_framebuffer.bind_if_needed(self.driver(), framebuffer);
    self.checkpoint()
  }

  /// Binds the default framebuffer for drawing.
  pub fn framebuffer_draw_unbind(&self) -> GlResult<()> {
    if self.bound_draw_framebuffer.is_anything_bound() {
      self.bound_draw_framebuffer.unbind_unconditionally(self.driver());
    }
    self.checkpoint()
  }

  #[inline(always)]
  pub fn framebuffer_draw_get_bound(&self) -> Option<Rc<Framebuffer>> {
    self.bound_draw_framebuffer.bound()
  }

  #[inline(always)]
  pub fn framebuffer_draw_any_is_bound(&self) -> bool {
    self.bound_draw_framebuffer.is_anything_bound()
  }

  pub fn framebuffer_draw_is_bound(&self, framebuffer: &Framebuffer) -> GlResult<bool> {
    self.check_object(framebuffer)?;
    Ok(self.bound_draw_framebuffer.is_bound(framebuffer))
  }

  fn check_separate_read_framebuffer(&self) -> GlResult<()> {
    if !self.profile().features().separate_read_framebuffer {
      return Err(self.unsupported("A separate read framebuffer"));
    }
    Ok(())
  }

  pub fn framebuffer_read_bind(&self, framebuffer: &Rc<Framebuffer>) -> GlResult<()> {
    self.check_separate_read_framebuffer()?;
    self.check_object(&**framebuffer)?;
    self.bound_read_framebuffer.bind_if_needed(self.driver(), framebuffer);
    self.checkpoint()
  }

  pub fn framebuffer_read_unbind(&self) -> GlResult<()> {
    self.check_separate_read_framebuffer()?;
    if self.bound_read_framebuffer.is_anything_bound() {
      self.bound_read_framebuffer.unbind_unconditionally(self.driver());
    }
    self.checkpoint()
  }

  pub fn framebuffer_read_get_bound(&self) -> GlResult<Option<Rc<Framebuffer>>> {
    self.check_separate_read_framebuffer()?;
    Ok(self.bound_read_framebuffer.bound())
  }

  /// Asks the driver whether the bound draw framebuffer can be rendered to.
  pub fn framebuffer_draw_validate(&self) -> GlResult<FramebufferStatus> {
    let framebuffer = self.bound_draw_framebuffer.bound().ok_or_else(|| {
      GlError::NotBound("No framebuffer is bound for drawing, nothing to validate".to_owned())
    })?;
    let raw = self.driver().check_framebuffer_status(self.bound_draw_framebuffer.target());
    let status = FramebufferStatus::from_raw(raw);
    trace!("{} is {:?}", framebuffer.key(), status);
    self.checkpoint()?;
    Ok(status)
  }

  /// Deletes the framebuffer, leaving the attached objects alone.
  pub fn framebuffer_delete(&self, framebuffer: &Framebuffer) -> GlResult<()> {
    self.check_object(framebuffer)?;
    debug!("delete {}", framebuffer.key());

    self.driver().delete_framebuffer(framebuffer.name());
    framebuffer.header.mark_deleted();
    if self.bound_draw_framebuffer.forget_if(framebuffer.key()) {
      trace!("unbind {} from drawing (deleted)", framebuffer.key());
    }
    if self.bound_read_framebuffer.forget_if(framebuffer.key()) {
      trace!("unbind {} from reading (deleted)", framebuffer.key());
    }
    reference_remove_all(framebuffer);
    framebuffer.colors.borrow_mut().iter_mut().for_each(|color| *color = None);
    *framebuffer.depth_stencil.borrow_mut() = None;
    self.checkpoint()
  }
}
