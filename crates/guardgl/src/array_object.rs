use crate::buffer::{ArrayBuffer, IndexBuffer};
use crate::impl_prelude::*;
use crate::reference::{reference_add, reference_remove_all};
use prelude_plus::*;

gl_enum!({
  pub enum FloatingPointType {
    I8 = BYTE,
    U8 = UNSIGNED_BYTE,
    I16 = SHORT,
    U16 = UNSIGNED_SHORT,
    I32 = INT,
    U32 = UNSIGNED_INT,
    F32 = FLOAT,
  }
});

gl_enum!({
  pub enum IntegralType {
    I8 = BYTE,
    U8 = UNSIGNED_BYTE,
    I16 = SHORT,
    U16 = UNSIGNED_SHORT,
    I32 = INT,
    U32 = UNSIGNED_INT,
  }
});

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeFormat {
  /// Converted to floats in the shader. Normalized integers map to `[0, 1]`
  /// or `[-1, 1]`.
  FloatingPoint { type_: FloatingPointType, normalized: bool },
  /// Read as integers by the shader, needs integer attribute support.
  Integral { type_: IntegralType },
}

/// Where and how the values of one vertex attribute are sourced.
#[derive(Debug, Clone)]
pub struct VertexAttribute {
  context: ContextId,
  buffer: Rc<ArrayBuffer>,
  elements: u32,
  format: AttributeFormat,
  stride: u32,
  offset: usize,
  divisor: u32,
}

impl_pseudo_unshared!(VertexAttribute, context);

impl VertexAttribute {
  #[inline(always)]
  pub fn buffer(&self) -> &Rc<ArrayBuffer> { &self.buffer }
  #[inline(always)]
  pub fn elements(&self) -> u32 { self.elements }
  #[inline(always)]
  pub fn format(&self) -> AttributeFormat { self.format }
  #[inline(always)]
  pub fn stride(&self) -> u32 { self.stride }
  #[inline(always)]
  pub fn offset(&self) -> usize { self.offset }
  #[inline(always)]
  pub fn divisor(&self) -> u32 { self.divisor }
}

/// Collects the configuration of an array object before it is allocated.
#[derive(Debug, Clone)]
pub struct ArrayObjectBuilder {
  context: ContextId,
  attributes: Vec<Option<VertexAttribute>>,
  index_buffer: Option<Rc<IndexBuffer>>,
}

impl_pseudo_unshared!(ArrayObjectBuilder, context);

impl ArrayObjectBuilder {
  fn new(context: ContextId, max_attributes: u32) -> Self {
    Self { context, attributes: vec![None; max_attributes as usize], index_buffer: None }
  }

  #[inline(always)]
  pub fn max_attributes(&self) -> u32 { self.attributes.len() as u32 }

  pub fn attribute_at(&self, index: u32) -> Option<&VertexAttribute> {
    self.attributes.get(index as usize).and_then(Option::as_ref)
  }

  #[inline(always)]
  pub fn index_buffer(&self) -> Option<&Rc<IndexBuffer>> { self.index_buffer.as_ref() }

  fn check_index(&self, index: u32) -> GlResult<()> {
    if index >= self.max_attributes() {
      return Err(GlError::Range(format!(
        "Attribute index {} is out of range, the context has {} vertex attributes",
        index,
        self.max_attributes(),
      )));
    }
    Ok(())
  }

  #[allow(clippy::too_many_arguments)]
  fn set_attribute(
    &mut self,
    index: u32,
    buffer: &Rc<ArrayBuffer>,
    elements: u32,
    format: AttributeFormat,
    stride: u32,
    offset: usize,
  ) -> GlResult<()> {
    self.check_index(index)?;
    if !(1..=4).contains(&elements) {
      return Err(GlError::Range(format!(
        "Attribute {} has {} elements, only 1 to 4 are allowed",
        index, elements,
      )));
    }
    if stride > i32::MAX as u32 {
      return Err(GlError::Range(format!("Stride {} of attribute {} is too large", stride, index)));
    }
    self.attributes[index as usize] = Some(VertexAttribute {
      context: self.context,
      buffer: Rc::clone(buffer),
      elements,
      format,
      stride,
      offset,
      divisor: 0,
    });
    Ok(())
  }

  /// Sources attribute `index` from `buffer`, `elements` values per vertex,
  /// starting `offset` bytes in and `stride` bytes apart (0 meaning tightly
  /// packed).
  #[allow(clippy::too_many_arguments)]
  pub fn set_attribute_floating_point(
    &mut self,
    index: u32,
    buffer: &Rc<ArrayBuffer>,
    elements: u32,
    type_: FloatingPointType,
    normalized: bool,
    stride: u32,
    offset: usize,
  ) -> GlResult<()> {
    let format = AttributeFormat::FloatingPoint { type_, normalized };
    self.set_attribute(index, buffer, elements, format, stride, offset)
  }

  pub fn set_attribute_integral(
    &mut self,
    index: u32,
    buffer: &Rc<ArrayBuffer>,
    elements: u32,
    type_: IntegralType,
    stride: u32,
    offset: usize,
  ) -> GlResult<()> {
    self.set_attribute(index, buffer, elements, AttributeFormat::Integral { type_ }, stride, offset)
  }

  /// Makes attribute `index` advance once per `divisor` instances instead of
  /// once per vertex.
  pub fn set_attribute_divisor(&mut self, index: u32, divisor: u32) -> GlResult<()> {
    self.check_index(index)?;
    match &mut self.attributes[index as usize] {
      Some(attribute) => {
        attribute.divisor = divisor;
        Ok(())
      }
      None => Err(GlError::Range(format!("Attribute {} is not configured", index))),
    }
  }

  pub fn disable_attribute(&mut self, index: u32) -> GlResult<()> {
    self.check_index(index)?;
    self.attributes[index as usize] = None;
    Ok(())
  }

  pub fn set_index_buffer(&mut self, buffer: Option<&Rc<IndexBuffer>>) {
    self.index_buffer = buffer.cloned();
  }

  pub fn reset(&mut self) {
    for attribute in &mut self.attributes {
      *attribute = None;
    }
    self.index_buffer = None;
  }
}

#[derive(Debug)]
pub struct ArrayObject {
  header: ObjectHeader,
  references: ReferenceContainer,
  attributes: RefCell<Vec<Option<VertexAttribute>>>,
  index_buffer: RefCell<Option<Rc<IndexBuffer>>>,
  is_default: bool,
}

impl_object!(ArrayObject, header);

impl Composite for ArrayObject {
  #[inline(always)]
  fn reference_container(&self) -> &ReferenceContainer { &self.references }

  fn on_reference_deleted(&self, key: ObjectKey) {
    for attribute in self.attributes.borrow_mut().iter_mut() {
      if attribute.as_ref().map_or(false, |attribute| attribute.buffer.key() == key) {
        *attribute = None;
      }
    }
    let mut index_buffer = self.index_buffer.borrow_mut();
    if index_buffer.as_ref().map_or(false, |buffer| buffer.key() == key) {
      *index_buffer = None;
    }
  }
}

impl ArrayObject {
  pub(crate) fn new_default(context: ContextId, name: u32, max_attributes: u32) -> Self {
    Self {
      header: ObjectHeader::new(context, ObjectKind::ArrayObject, name),
      references: ReferenceContainer::default(),
      attributes: RefCell::new(vec![None; max_attributes as usize]),
      index_buffer: RefCell::new(None),
      is_default: true,
    }
  }

  /// The default array object can't be deleted and is the only one whose
  /// index buffer may change after allocation.
  #[inline(always)]
  pub fn is_default(&self) -> bool { self.is_default }

  pub fn attribute_at(&self, index: u32) -> Option<VertexAttribute> {
    self.attributes.borrow().get(index as usize).cloned().flatten()
  }

  pub fn enabled_attributes(&self) -> Vec<u32> {
    let attributes = self.attributes.borrow();
    (0..attributes.len() as u32).filter(|&i| attributes[i as usize].is_some()).collect()
  }

  #[inline(always)]
  pub fn index_buffer(&self) -> Option<Rc<IndexBuffer>> { self.index_buffer.borrow().clone() }

  pub(crate) fn set_index_buffer(&self, buffer: Option<Rc<IndexBuffer>>) {
    *self.index_buffer.borrow_mut() = buffer;
  }
}

impl Context {
  pub fn array_object_new_builder(&self) -> ArrayObjectBuilder {
    ArrayObjectBuilder::new(self.id(), self.vertex_attribute_count())
  }

  /// A builder holding the configuration `ao` was allocated with.
  pub fn array_object_new_builder_from_object(
    &self,
    ao: &ArrayObject,
  ) -> GlResult<ArrayObjectBuilder> {
    self.check_object(ao)?;
    Ok(ArrayObjectBuilder {
      context: self.id(),
      attributes: ao.attributes.borrow().clone(),
      index_buffer: ao.index_buffer(),
    })
  }

  fn check_array_object_builder(&self, builder: &ArrayObjectBuilder) -> GlResult<()> {
    check_usable(self, builder)?;
    let features = self.profile().features();
    for (index, attribute) in builder.attributes.iter().enumerate() {
      let attribute = match attribute {
        Some(attribute) => attribute,
        None => continue,
      };
      check_usable(self, attribute)?;
      self.check_object(&*attribute.buffer)?;
      if let AttributeFormat::Integral { .. } = attribute.format {
        if !features.integer_attributes {
          return Err(self.unsupported(&format!("Integral vertex attribute {}", index)));
        }
      }
      if attribute.divisor != 0 && !features.attribute_divisors {
        return Err(self.unsupported(&format!("Divisor of vertex attribute {}", index)));
      }
    }
    if let Some(index_buffer) = &builder.index_buffer {
      self.check_object(&**index_buffer)?;
    }
    Ok(())
  }

  /// Creates an array object configured as described by `builder`. It is left
  /// bound.
  pub fn array_object_allocate(&self, builder: &ArrayObjectBuilder) -> GlResult<Rc<ArrayObject>> {
    self.check_array_object_builder(builder)?;
    debug!(
      "allocate ({} attributes, index buffer: {})",
      builder.attributes.iter().filter(|a| a.is_some()).count(),
      builder.index_buffer.as_ref().map_or_else(|| "none".to_owned(), |b| b.key().to_string()),
    );

    let driver = self.driver();
    let name = driver.gen_vertex_array();
    let ao = Rc::new(ArrayObject {
      header: ObjectHeader::new(self.id(), ObjectKind::ArrayObject, name),
      references: ReferenceContainer::default(),
      attributes: RefCell::new(builder.attributes.clone()),
      index_buffer: RefCell::new(builder.index_buffer.clone()),
      is_default: false,
    });
    debug!("allocated {}", ao.key());

    self.bound_array_object.bind_unconditionally(driver, Some(&ao));
    if let Some(index_buffer) = &builder.index_buffer {
      driver.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, index_buffer.name());
      reference_add(&ao, index_buffer);
    }

    let attribute_divisors = self.profile().features().attribute_divisors;
    for (index, attribute) in builder.attributes.iter().enumerate() {
      let index = index as u32;
      let attribute = match attribute {
        Some(attribute) => attribute,
        None => {
          driver.disable_vertex_attrib_array(index);
          continue;
        }
      };

      self.bound_array_buffer.bind_if_needed(driver, &attribute.buffer);
      driver.enable_vertex_attrib_array(index);
      let (elements, stride) = (attribute.elements as i32, attribute.stride as i32);
      match attribute.format {
        AttributeFormat::FloatingPoint { type_, normalized } => driver.vertex_attrib_pointer(
          index,
          elements,
          type_.as_raw(),
          normalized,
          stride,
          attribute.offset,
        ),
        AttributeFormat::Integral { type_ } => {
          driver.vertex_attrib_i_pointer(index, elements, type_.as_raw(), stride, attribute.offset)
        }
      }
      if attribute_divisors {
        driver.vertex_attrib_divisor(index, attribute.divisor);
      }
      reference_add(&ao, &attribute.buffer);
    }

    // attribute pointers have captured their buffers, the binding itself
    // isn't needed anymore
    if self.bound_array_buffer.is_anything_bound() {
      self.bound_array_buffer.unbind_unconditionally(driver);
    }
    self.checkpoint_allocation(ao, Self::array_object_delete)
  }

  pub fn array_object_bind(&self, ao: &Rc<ArrayObject>) -> GlResult<()> {
    self.check_object(&**ao)?;
    self.bound_array_object.bind_if_needed(self.driver(), ao);
    self.checkpoint()
  }

  /// Binds the default array object.
  pub fn array_object_unbind(&self) -> GlResult<()> {
    let default = self.array_object_get_default();
    self.bound_array_object.bind_if_needed(self.driver(), &default);
    self.checkpoint()
  }

  pub fn array_object_get_currently_bound(&self) -> Rc<ArrayObject> {
    self.bound_array_object.bound().unwrap_or_else(|| self.array_object_get_default())
  }

  pub fn array_object_is_bound(&self, ao: &ArrayObject) -> GlResult<bool> {
    self.check_object(ao)?;
    Ok(self.bound_array_object.is_bound(ao))
  }

  /// Deletes the array object. The buffers it used are left alone. If it was
  /// bound, the default array object is bound in its place.
  pub fn array_object_delete(&self, ao: &ArrayObject) -> GlResult<()> {
    self.check_object(ao)?;
    if ao.is_default() {
      return Err(GlError::ObjectNotDeletable(format!(
        "{} is the default array object of {} ({})",
        ao.key(),
        self.id(),
        self.name(),
      )));
    }
    debug!("delete {}", ao.key());

    let was_bound = self.bound_array_object.is_bound(ao);
    self.driver().delete_vertex_array(ao.name());
    ao.header.mark_deleted();
    reference_remove_all(ao);
    ao.attributes.borrow_mut().iter_mut().for_each(|attribute| *attribute = None);
    ao.set_index_buffer(None);

    if was_bound {
      let default = self.array_object_get_default();
      self.bound_array_object.bind_unconditionally(self.driver(), Some(&default));
    }
    self.checkpoint()
  }
}
