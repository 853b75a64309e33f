use crate::array_object::ArrayObject;
use crate::impl_prelude::*;
use crate::reference::{reference_add, reference_cascade_delete, reference_remove};
use prelude_plus::*;

gl_enum!({
  pub enum UsageHint {
    StreamDraw = STREAM_DRAW,
    StaticDraw = STATIC_DRAW,
    DynamicDraw = DYNAMIC_DRAW,
  }
});

gl_enum!({
  pub enum IndexType {
    U8 = UNSIGNED_BYTE,
    U16 = UNSIGNED_SHORT,
    U32 = UNSIGNED_INT,
  }
});

impl IndexType {
  pub fn size(self) -> usize {
    use mem::size_of;
    match self {
      Self::U8 => size_of::<u8>(),
      Self::U16 => size_of::<u16>(),
      Self::U32 => size_of::<u32>(),
    }
  }
}

#[derive(Debug)]
pub struct ArrayBuffer {
  header: ObjectHeader,
  referring: ReferringContainers,
  size: usize,
  usage: UsageHint,
}

impl_object!(ArrayBuffer, header);

impl Referable for ArrayBuffer {
  #[inline(always)]
  fn referring_containers(&self) -> &ReferringContainers { &self.referring }
}

impl ArrayBuffer {
  #[inline(always)]
  pub fn size(&self) -> usize { self.size }
  #[inline(always)]
  pub fn usage(&self) -> UsageHint { self.usage }
}

#[derive(Debug)]
pub struct IndexBuffer {
  header: ObjectHeader,
  referring: ReferringContainers,
  index_type: IndexType,
  indices: usize,
  usage: UsageHint,
}

impl_object!(IndexBuffer, header);

impl Referable for IndexBuffer {
  #[inline(always)]
  fn referring_containers(&self) -> &ReferringContainers { &self.referring }
}

impl IndexBuffer {
  #[inline(always)]
  pub fn index_type(&self) -> IndexType { self.index_type }
  #[inline(always)]
  pub fn indices(&self) -> usize { self.indices }
  #[inline(always)]
  pub fn size(&self) -> usize { self.indices * self.index_type.size() }
  #[inline(always)]
  pub fn usage(&self) -> UsageHint { self.usage }
}

fn check_update_range(key: ObjectKey, size: usize, offset: usize, len: usize) -> GlResult<()> {
  match offset.checked_add(len) {
    Some(end) if end <= size => Ok(()),
    _ => Err(GlError::Range(format!(
      "Update of {} bytes at offset {} does not fit into {} ({} bytes)",
      len, offset, key, size,
    ))),
  }
}

impl Context {
  fn buffer_not_bound<T: Object>(&self, required: &T, actual: Option<ObjectKey>) -> GlError {
    GlError::NotBound(format!(
      "Buffer is not bound. Required: {}, actual: {}",
      required.key(),
      actual.map_or_else(|| "none".to_owned(), |key| key.to_string()),
    ))
  }

  /// Allocates `size` bytes of uninitialized storage. The new buffer is left
  /// bound.
  pub fn array_buffer_allocate(&self, size: usize, usage: UsageHint) -> GlResult<Rc<ArrayBuffer>> {
    self.array_buffer_allocate_impl(size, None, usage)
  }

  /// Allocates a buffer holding a copy of `data`. The new buffer is left bound.
  pub fn array_buffer_allocate_with_data(
    &self,
    data: &[u8],
    usage: UsageHint,
  ) -> GlResult<Rc<ArrayBuffer>> {
    self.array_buffer_allocate_impl(data.len(), Some(data), usage)
  }

  fn array_buffer_allocate_impl(
    &self,
    size: usize,
    data: Option<&[u8]>,
    usage: UsageHint,
  ) -> GlResult<Rc<ArrayBuffer>> {
    if size > isize::MAX as usize {
      return Err(GlError::Range(format!("Buffer size {} is too large", size)));
    }
    debug!("allocate ({} bytes, {:?})", size, usage);

    let name = self.driver().gen_buffer();
    let buffer = Rc::new(ArrayBuffer {
      header: ObjectHeader::new(self.id(), ObjectKind::ArrayBuffer, name),
      referring: ReferringContainers::default(),
      size,
      usage,
    });
    debug!("allocated {}", buffer.key());

    self.bound_array_buffer.bind_if_needed(self.driver(), &buffer);
    self.driver().buffer_data(gl::ARRAY_BUFFER, size, data, usage.as_raw());
    self.checkpoint_allocation(buffer, Self::array_buffer_delete)
  }

  pub fn array_buffer_bind(&self, buffer: &Rc<ArrayBuffer>) -> GlResult<()> {
    self.check_object(&**buffer)?;
    self.bound_array_buffer.bind_if_needed(self.driver(), buffer);
    self.checkpoint()
  }

  pub fn array_buffer_unbind(&self) -> GlResult<()> {
    if self.bound_array_buffer.is_anything_bound() {
      self.bound_array_buffer.unbind_unconditionally(self.driver());
    }
    self.checkpoint()
  }

  #[inline(always)]
  pub fn array_buffer_get_currently_bound(&self) -> Option<Rc<ArrayBuffer>> {
    self.bound_array_buffer.bound()
  }

  #[inline(always)]
  pub fn array_buffer_any_is_bound(&self) -> bool { self.bound_array_buffer.is_anything_bound() }

  pub fn array_buffer_is_bound(&self, buffer: &ArrayBuffer) -> GlResult<bool> {
    self.check_object(buffer)?;
    Ok(self.bound_array_buffer.is_bound(buffer))
  }

  /// Overwrites `data.len()` bytes starting at `offset`. The buffer has to be
  /// bound.
  pub fn array_buffer_update(
    &self,
    buffer: &ArrayBuffer,
    offset: usize,
    data: &[u8],
  ) -> GlResult<()> {
    self.check_object(buffer)?;
    if !self.bound_array_buffer.is_bound(buffer) {
      return Err(self.buffer_not_bound(buffer, self.bound_array_buffer.bound().map(|b| b.key())));
    }
    check_update_range(buffer.key(), buffer.size, offset, data.len())?;
    self.driver().buffer_sub_data(gl::ARRAY_BUFFER, offset, data);
    self.checkpoint()
  }

  /// Orphans the current storage of a bound buffer, replacing it with fresh
  /// storage of the same size and usage.
  pub fn array_buffer_reallocate(&self, buffer: &ArrayBuffer) -> GlResult<()> {
    self.check_object(buffer)?;
    if !self.bound_array_buffer.is_bound(buffer) {
      return Err(self.buffer_not_bound(buffer, self.bound_array_buffer.bound().map(|b| b.key())));
    }
    trace!("reallocate {} ({} bytes, {:?})", buffer.key(), buffer.size, buffer.usage);
    self.driver().buffer_data(gl::ARRAY_BUFFER, buffer.size, None, buffer.usage.as_raw());
    self.checkpoint()
  }

  /// Deletes the buffer. Array objects using it lose every attribute sourced
  /// from it.
  pub fn array_buffer_delete(&self, buffer: &ArrayBuffer) -> GlResult<()> {
    self.check_object(buffer)?;
    debug!("delete {}", buffer.key());

    self.driver().delete_buffer(buffer.name());
    buffer.header.mark_deleted();
    if self.bound_array_buffer.forget_if(buffer.key()) {
      trace!("unbind {} (deleted)", buffer.key());
    }
    reference_cascade_delete(buffer);
    self.checkpoint()
  }

  /// Allocates storage for `indices` indices and binds the buffer into the
  /// current array object.
  pub fn index_buffer_allocate(
    &self,
    indices: usize,
    index_type: IndexType,
    usage: UsageHint,
  ) -> GlResult<Rc<IndexBuffer>> {
    self.index_buffer_allocate_impl(indices, index_type, None, usage)
  }

  pub fn index_buffer_allocate_with_data(
    &self,
    index_type: IndexType,
    data: &[u8],
    usage: UsageHint,
  ) -> GlResult<Rc<IndexBuffer>> {
    if data.len() % index_type.size() != 0 {
      return Err(GlError::Range(format!(
        "{} bytes of index data is not a whole number of {:?} indices",
        data.len(),
        index_type,
      )));
    }
    self.index_buffer_allocate_impl(data.len() / index_type.size(), index_type, Some(data), usage)
  }

  fn index_buffer_allocate_impl(
    &self,
    indices: usize,
    index_type: IndexType,
    data: Option<&[u8]>,
    usage: UsageHint,
  ) -> GlResult<Rc<IndexBuffer>> {
    if index_type == IndexType::U32
      && self.profile() == Profile::Gles2
      && !self.capabilities().extensions.gl_oes_element_index_uint
    {
      return Err(self.unsupported("32-bit indices without GL_OES_element_index_uint"));
    }
    let size = match indices.checked_mul(index_type.size()) {
      Some(size) if size <= isize::MAX as usize => size,
      _ => return Err(GlError::Range(format!("Index count {} is too large", indices))),
    };

    let ao = self.array_object_get_currently_bound();
    self.check_index_buffer_changeable(&ao, None)?;
    debug!("allocate {} {:?} ({} bytes, {:?})", indices, index_type, size, usage);

    let name = self.driver().gen_buffer();
    let buffer = Rc::new(IndexBuffer {
      header: ObjectHeader::new(self.id(), ObjectKind::IndexBuffer, name),
      referring: ReferringContainers::default(),
      index_type,
      indices,
      usage,
    });
    debug!("allocated {}", buffer.key());

    self.index_buffer_introduce(&ao, Some(&buffer));
    self.driver().buffer_data(gl::ELEMENT_ARRAY_BUFFER, size, data, usage.as_raw());
    self.checkpoint_allocation(buffer, Self::index_buffer_delete)
  }

  /// The index buffer of a non-default array object is fixed when it is
  /// allocated. `target` is the buffer the caller wants to end up with.
  fn check_index_buffer_changeable(
    &self,
    ao: &ArrayObject,
    target: Option<&IndexBuffer>,
  ) -> GlResult<()> {
    if ao.is_default() {
      return Ok(());
    }
    let existing = ao.index_buffer();
    let unchanged = match (&existing, target) {
      (Some(existing), Some(target)) => existing.key() == target.key(),
      _ => false,
    };
    if unchanged {
      return Ok(());
    }
    Err(GlError::IndexBufferAlreadyConfigured(format!(
      "Cannot change the index buffer of {}. Existing index buffer: {}, new index buffer: {}",
      ao.key(),
      existing.map_or_else(|| "none".to_owned(), |b| b.key().to_string()),
      target.map_or_else(|| "none".to_owned(), |b| b.key().to_string()),
    )))
  }

  /// Makes `buffer` the element buffer of `ao`, which must be the bound
  /// array object.
  pub(crate) fn index_buffer_introduce(
    &self,
    ao: &Rc<ArrayObject>,
    buffer: Option<&Rc<IndexBuffer>>,
  ) {
    if let Some(previous) = ao.index_buffer() {
      if buffer.map_or(true, |buffer| buffer.key() != previous.key()) {
        reference_remove(&**ao, previous.key());
      }
    }
    self.driver().bind_buffer(gl::ELEMENT_ARRAY_BUFFER, buffer.map_or(0, |buffer| buffer.name()));
    ao.set_index_buffer(buffer.cloned());
    if let Some(buffer) = buffer {
      reference_add(ao, buffer);
    }
    trace!(
      "index buffer of {} -> {}",
      ao.key(),
      buffer.map_or_else(|| "none".to_owned(), |buffer| buffer.key().to_string()),
    );
  }

  pub fn index_buffer_bind(&self, buffer: &Rc<IndexBuffer>) -> GlResult<()> {
    self.check_object(&**buffer)?;
    let ao = self.array_object_get_currently_bound();
    self.check_index_buffer_changeable(&ao, Some(buffer))?;
    self.index_buffer_introduce(&ao, Some(buffer));
    self.checkpoint()
  }

  pub fn index_buffer_unbind(&self) -> GlResult<()> {
    let ao = self.array_object_get_currently_bound();
    if ao.index_buffer().is_none() {
      return Ok(());
    }
    self.check_index_buffer_changeable(&ao, None)?;
    self.index_buffer_introduce(&ao, None);
    self.checkpoint()
  }

  pub fn index_buffer_get_currently_bound(&self) -> Option<Rc<IndexBuffer>> {
    self.array_object_get_currently_bound().index_buffer()
  }

  pub fn index_buffer_is_bound(&self) -> bool {
    self.array_object_get_currently_bound().index_buffer().is_some()
  }

  fn check_index_buffer_bound(&self, buffer: &IndexBuffer) -> GlResult<()> {
    let current = self.index_buffer_get_currently_bound();
    match &current {
      Some(current) if current.key() == buffer.key() => Ok(()),
      _ => Err(self.buffer_not_bound(buffer, current.map(|b| b.key()))),
    }
  }

  /// Overwrites `data.len()` bytes starting at `offset`. The buffer has to be
  /// the index buffer of the current array object.
  pub fn index_buffer_update(
    &self,
    buffer: &IndexBuffer,
    offset: usize,
    data: &[u8],
  ) -> GlResult<()> {
    self.check_object(buffer)?;
    self.check_index_buffer_bound(buffer)?;
    check_update_range(buffer.key(), buffer.size(), offset, data.len())?;
    self.driver().buffer_sub_data(gl::ELEMENT_ARRAY_BUFFER, offset, data);
    self.checkpoint()
  }

  pub fn index_buffer_reallocate(&self, buffer: &IndexBuffer) -> GlResult<()> {
    self.check_object(buffer)?;
    self.check_index_buffer_bound(buffer)?;
    trace!("reallocate {} ({} bytes, {:?})", buffer.key(), buffer.size(), buffer.usage);
    self.driver().buffer_data(gl::ELEMENT_ARRAY_BUFFER, buffer.size(), None, buffer.usage.as_raw());
    self.checkpoint()
  }

  /// Deletes the buffer and detaches it from every array object using it.
  pub fn index_buffer_delete(&self, buffer: &IndexBuffer) -> GlResult<()> {
    self.check_object(buffer)?;
    debug!("delete {}", buffer.key());

    self.driver().delete_buffer(buffer.name());
    buffer.header.mark_deleted();
    reference_cascade_delete(buffer);
    self.checkpoint()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ContextConfig, FakeDriver, SharedContext};

  fn context(profile: Profile) -> (SharedContext, FakeDriver) {
    let driver = FakeDriver::new(profile);
    let config = ContextConfig { check_errors: true, ..Default::default() };
    (Context::new(Box::new(driver.clone()), config).unwrap(), driver)
  }

  #[test]
  fn allocation_leaves_the_buffer_bound() {
    let (ctx, driver) = context(Profile::Gl33);
    let buffer = ctx.array_buffer_allocate(64, UsageHint::DynamicDraw).unwrap();
    assert_eq!(buffer.size(), 64);
    assert!(ctx.array_buffer_is_bound(&buffer).unwrap());
    assert_eq!(driver.bound_buffer(gl::ARRAY_BUFFER), buffer.name());

    ctx.array_buffer_unbind().unwrap();
    assert!(!ctx.array_buffer_any_is_bound());
    assert!(ctx.array_buffer_get_currently_bound().is_none());
    assert_eq!(driver.bound_buffer(gl::ARRAY_BUFFER), 0);
  }

  #[test]
  fn updates_need_the_buffer_bound_and_in_range() {
    let (ctx, _driver) = context(Profile::Gl33);
    let a = ctx.array_buffer_allocate(8, UsageHint::StaticDraw).unwrap();
    let b = ctx.array_buffer_allocate(8, UsageHint::StaticDraw).unwrap();

    assert!(matches!(ctx.array_buffer_update(&a, 0, &[1, 2]), Err(GlError::NotBound(_))));
    assert!(matches!(ctx.array_buffer_reallocate(&a), Err(GlError::NotBound(_))));
    ctx.array_buffer_update(&b, 6, &[1, 2]).unwrap();
    assert!(matches!(ctx.array_buffer_update(&b, 7, &[1, 2]), Err(GlError::Range(_))));
    assert!(matches!(ctx.array_buffer_update(&b, usize::MAX, &[1]), Err(GlError::Range(_))));

    ctx.array_buffer_bind(&a).unwrap();
    ctx.array_buffer_update(&a, 0, &[1, 2]).unwrap();
    ctx.array_buffer_reallocate(&a).unwrap();
  }

  #[test]
  fn deleting_a_bound_buffer_unbinds_it() {
    let (ctx, driver) = context(Profile::Gles2);
    let buffer = ctx.array_buffer_allocate(8, UsageHint::StreamDraw).unwrap();
    ctx.array_buffer_delete(&buffer).unwrap();
    assert!(buffer.is_deleted());
    assert!(!driver.is_live(buffer.name()));
    assert!(!ctx.array_buffer_any_is_bound());
    assert!(matches!(ctx.array_buffer_bind(&buffer), Err(GlError::Deleted(_))));
    assert!(matches!(ctx.array_buffer_delete(&buffer), Err(GlError::Deleted(_))));
  }

  #[test]
  fn index_buffers_go_into_the_default_array_object() {
    let (ctx, driver) = context(Profile::Gl33);
    let a = ctx.index_buffer_allocate(6, IndexType::U16, UsageHint::StaticDraw).unwrap();
    assert_eq!(a.size(), 12);
    assert_eq!(ctx.index_buffer_get_currently_bound().map(|b| b.key()), Some(a.key()));
    assert_eq!(driver.bound_buffer(gl::ELEMENT_ARRAY_BUFFER), a.name());

    let default = ctx.array_object_get_default();
    assert!(default.reference_container().contains(a.key()));

    // the default array object takes any index buffer
    let b = ctx.index_buffer_allocate(3, IndexType::U8, UsageHint::StaticDraw).unwrap();
    assert!(!default.reference_container().contains(a.key()));
    assert!(default.reference_container().contains(b.key()));
    assert!(a.referring_containers().is_empty());

    ctx.index_buffer_update(&b, 0, &[0, 1, 2]).unwrap();
    assert!(matches!(ctx.index_buffer_update(&a, 0, &[0]), Err(GlError::NotBound(_))));

    ctx.index_buffer_unbind().unwrap();
    assert!(!ctx.index_buffer_is_bound());
    assert!(default.reference_container().is_empty());
  }

  #[test]
  fn index_data_must_be_whole_indices() {
    let (ctx, _driver) = context(Profile::Gl33);
    assert!(matches!(
      ctx.index_buffer_allocate_with_data(IndexType::U16, &[0, 1, 2], UsageHint::StaticDraw),
      Err(GlError::Range(_)),
    ));
    let buffer = ctx
      .index_buffer_allocate_with_data(IndexType::U16, &[0, 0, 1, 0], UsageHint::StaticDraw)
      .unwrap();
    assert_eq!(buffer.indices(), 2);
  }

  #[test]
  fn wide_indices_need_an_extension_on_gles2() {
    let (ctx, _driver) = context(Profile::Gles2);
    assert!(matches!(
      ctx.index_buffer_allocate(3, IndexType::U32, UsageHint::StaticDraw),
      Err(GlError::Unsupported(_)),
    ));

    let driver = FakeDriver::new(Profile::Gles2).with_extension("GL_OES_element_index_uint");
    let ctx = Context::new(Box::new(driver), ContextConfig::default()).unwrap();
    ctx.index_buffer_allocate(3, IndexType::U32, UsageHint::StaticDraw).unwrap();
  }

  #[test]
  fn failed_allocations_are_undone() {
    let (ctx, driver) = context(Profile::Gl33);
    driver.push_error(gl::OUT_OF_MEMORY);
    assert!(matches!(
      ctx.index_buffer_allocate(6, IndexType::U16, UsageHint::StaticDraw),
      Err(GlError::Runtime { .. }),
    ));
    assert!(ctx.array_object_get_default().reference_container().is_empty());
    assert!(ctx.index_buffer_get_currently_bound().is_none());
    assert_eq!(driver.bound_buffer(gl::ELEMENT_ARRAY_BUFFER), 0);

    driver.push_error(gl::OUT_OF_MEMORY);
    assert!(ctx.array_buffer_allocate(64, UsageHint::StaticDraw).is_err());
    assert!(!ctx.array_buffer_any_is_bound());
    assert_eq!(driver.bound_buffer(gl::ARRAY_BUFFER), 0);

    // the context keeps working afterwards
    let buffer = ctx.index_buffer_allocate(6, IndexType::U16, UsageHint::StaticDraw).unwrap();
    assert!(ctx.array_object_get_default().reference_container().contains(buffer.key()));
  }
}
