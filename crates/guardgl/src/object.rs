use prelude_plus::*;

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Opaque identity of a native context. Objects remember the identity of the
/// context they were created on instead of holding on to the context itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContextId(u32);

impl ContextId {
  pub(crate) fn fresh() -> Self { Self(NEXT_CONTEXT_ID.fetch_add(1, AtomicOrdering::Relaxed)) }

  #[inline(always)]
  pub fn as_raw(&self) -> u32 { self.0 }
}

impl fmt::Display for ContextId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "context#{}", self.0) }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SharingClass {
  /// Usable on the owning context and on every context it shares with.
  Shared,
  /// Usable on the owning context only; the driver never shares these.
  Unshared,
  /// Library-level value tagged with a context purely for validation, checked
  /// like [`SharingClass::Unshared`].
  PseudoUnshared,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ObjectKind {
  ArrayBuffer,
  IndexBuffer,
  ArrayObject,
  Texture2D,
  TextureCube,
  Renderbuffer,
  Framebuffer,
  VertexShader,
  FragmentShader,
  GeometryShader,
  Program,
  TimerQuery,
}

impl ObjectKind {
  pub const fn sharing_class(self) -> SharingClass {
    match self {
      Self::ArrayObject | Self::Framebuffer | Self::TimerQuery => SharingClass::Unshared,
      _ => SharingClass::Shared,
    }
  }

  /// Identifier of the object namespace for `glObjectLabel`.
  pub const fn debug_type_id(self) -> u32 {
    match self {
      Self::ArrayBuffer | Self::IndexBuffer => gl::BUFFER,
      Self::ArrayObject => gl::VERTEX_ARRAY,
      Self::Texture2D | Self::TextureCube => gl::TEXTURE,
      Self::Renderbuffer => gl::RENDERBUFFER,
      Self::Framebuffer => gl::FRAMEBUFFER,
      Self::VertexShader | Self::FragmentShader | Self::GeometryShader => gl::SHADER,
      Self::Program => gl::PROGRAM,
      Self::TimerQuery => gl::QUERY,
    }
  }
}

/// Native names are only unique per context and per object namespace, so an
/// object is identified by all three.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectKey {
  pub context: ContextId,
  pub kind: ObjectKind,
  pub name: u32,
}

impl fmt::Display for ObjectKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}#{}@{}", self.kind, self.name, self.context)
  }
}

#[derive(Debug)]
pub struct ObjectHeader {
  key: ObjectKey,
  deleted: Cell<bool>,
}

impl ObjectHeader {
  pub(crate) fn new(context: ContextId, kind: ObjectKind, name: u32) -> Self {
    Self { key: ObjectKey { context, kind, name }, deleted: Cell::new(false) }
  }

  #[inline(always)]
  pub fn key(&self) -> ObjectKey { self.key }
  #[inline(always)]
  pub fn name(&self) -> u32 { self.key.name }
  #[inline(always)]
  pub fn context(&self) -> ContextId { self.key.context }
  #[inline(always)]
  pub fn kind(&self) -> ObjectKind { self.key.kind }
  #[inline(always)]
  pub fn sharing_class(&self) -> SharingClass { self.key.kind.sharing_class() }
  #[inline(always)]
  pub fn is_deleted(&self) -> bool { self.deleted.get() }

  pub(crate) fn mark_deleted(&self) {
    debug_assert!(!self.deleted.get(), "{} was already deleted", self.key);
    self.deleted.set(true);
  }
}
