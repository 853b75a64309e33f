use crate::impl_prelude::*;
use prelude_plus::*;

/// Anything that may be handed to an operation of a context: it names the
/// context it belongs to and the rules under which it may be used elsewhere.
pub trait Usable {
  fn owning_context(&self) -> ContextId;
  fn sharing_class(&self) -> SharingClass;
}

pub trait Object: Usable + fmt::Debug {
  fn header(&self) -> &ObjectHeader;

  #[inline(always)]
  fn name(&self) -> u32 { self.header().name() }
  #[inline(always)]
  fn key(&self) -> ObjectKey { self.header().key() }
  #[inline(always)]
  fn is_deleted(&self) -> bool { self.header().is_deleted() }
}

/// An object which composites (framebuffers, array objects) may refer to.
pub trait Referable: Object {
  fn referring_containers(&self) -> &ReferringContainers;
}
