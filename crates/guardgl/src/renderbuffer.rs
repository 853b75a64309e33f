use crate::format::{FormatKind, RenderbufferFormat};
use crate::impl_prelude::*;
use crate::reference::reference_cascade_delete;
use prelude_plus::*;

#[derive(Debug)]
pub struct Renderbuffer {
  header: ObjectHeader,
  referring: ReferringContainers,
  format: RenderbufferFormat,
  width: u32,
  height: u32,
}

impl_object!(Renderbuffer, header);

impl Referable for Renderbuffer {
  #[inline(always)]
  fn referring_containers(&self) -> &ReferringContainers { &self.referring }
}

impl Renderbuffer {
  #[inline(always)]
  pub fn format(&self) -> RenderbufferFormat { self.format }
  #[inline(always)]
  pub fn kind(&self) -> FormatKind { self.format.kind() }
  #[inline(always)]
  pub fn width(&self) -> u32 { self.width }
  #[inline(always)]
  pub fn height(&self) -> u32 { self.height }
}

impl Context {
  /// Allocates renderbuffer storage. The renderbuffer is left bound.
  pub fn renderbuffer_allocate(
    &self,
    format: RenderbufferFormat,
    width: u32,
    height: u32,
  ) -> GlResult<Rc<Renderbuffer>> {
    let max = self.capabilities().max_renderbuffer_size;
    if width == 0 || height == 0 || width > max || height > max {
      return Err(GlError::Range(format!(
        "Renderbuffer size {}x{} is outside of the supported range 1..={}",
        width, height, max,
      )));
    }
    let internal_format = format
      .internal_format(self.profile())
      .ok_or_else(|| self.unsupported(&format!("Renderbuffer format {:?}", format)))?;
    debug!("allocate {}x{} {:?}", width, height, format);

    let name = self.driver().gen_renderbuffer();
    let renderbuffer = Rc::new(Renderbuffer {
      header: ObjectHeader::new(self.id(), ObjectKind::Renderbuffer, name),
      referring: ReferringContainers::default(),
      format,
      width,
      height,
    });
    debug!("allocated {}", renderbuffer.key());

    self.bound_renderbuffer.bind_if_needed(self.driver(), &renderbuffer);
    self.driver().renderbuffer_storage(internal_format, width, height);
    self.checkpoint_allocation(renderbuffer, Self::renderbuffer_delete)
  }

  /// Deletes the renderbuffer and detaches it from every framebuffer.
  pub fn renderbuffer_delete(&self, renderbuffer: &Renderbuffer) -> GlResult<()> {
    self.check_object(renderbuffer)?;
    debug!("delete {}", renderbuffer.key());

    self.driver().delete_renderbuffer(renderbuffer.name());
    renderbuffer.header.mark_deleted();
    if self.bound_renderbuffer.forget_if(renderbuffer.key()) {
      trace!("unbind {} (deleted)", renderbuffer.key());
    }
    reference_cascade_delete(renderbuffer);
    self.checkpoint()
  }
}
