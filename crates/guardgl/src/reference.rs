//! Tracking of which composite objects refer to which other objects.
//!
//! A composite owns a [`ReferenceContainer`] holding strong handles to the
//! objects it currently depends on. Each referable object owns the inverse
//! index, [`ReferringContainers`], holding weak handles to those composites.
//! Deleting a referable walks the inverse index, so a composite never keeps a
//! deleted object attached.

use crate::impl_prelude::*;
use prelude_plus::*;

/// A resource which references other resources, i.e. a framebuffer or an
/// array object.
pub trait Composite: Object {
  fn reference_container(&self) -> &ReferenceContainer;

  /// Called when an object this composite refers to is being deleted. The
  /// composite must clear every attachment slot naming `key`. The reference
  /// itself is removed by the caller.
  fn on_reference_deleted(&self, key: ObjectKey);
}

#[derive(Default)]
pub struct ReferenceContainer {
  references: RefCell<BTreeMap<ObjectKey, Rc<dyn Referable>>>,
}

impl fmt::Debug for ReferenceContainer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.references.borrow().keys()).finish()
  }
}

impl ReferenceContainer {
  pub fn references(&self) -> Vec<Rc<dyn Referable>> {
    self.references.borrow().values().cloned().collect()
  }

  pub fn reference_keys(&self) -> Vec<ObjectKey> {
    self.references.borrow().keys().copied().collect()
  }

  pub fn contains(&self, key: ObjectKey) -> bool { self.references.borrow().contains_key(&key) }

  pub fn len(&self) -> usize { self.references.borrow().len() }

  pub fn is_empty(&self) -> bool { self.references.borrow().is_empty() }
}

#[derive(Default)]
pub struct ReferringContainers {
  containers: RefCell<BTreeMap<ObjectKey, RcWeak<dyn Composite>>>,
}

impl fmt::Debug for ReferringContainers {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.containers.borrow().keys()).finish()
  }
}

impl ReferringContainers {
  pub fn keys(&self) -> Vec<ObjectKey> { self.containers.borrow().keys().copied().collect() }

  pub fn contains(&self, key: ObjectKey) -> bool { self.containers.borrow().contains_key(&key) }

  pub fn is_empty(&self) -> bool { self.containers.borrow().is_empty() }
}

/// Records that `container` depends on `referenced`. Adding the same
/// reference twice has no additional effect.
pub fn reference_add<C, R>(container: &Rc<C>, referenced: &Rc<R>)
where
  C: Composite + 'static,
  R: Referable + 'static,
{
  let container_key = container.key();
  let referenced_key = referenced.key();

  let referenced_dyn: Rc<dyn Referable> = Rc::clone(referenced) as Rc<dyn Referable>;
  let inserted = container
    .reference_container()
    .references
    .borrow_mut()
    .insert(referenced_key, referenced_dyn)
    .is_none();

  if inserted {
    let container_weak: RcWeak<dyn Composite> = Rc::downgrade(container) as RcWeak<dyn Composite>;
    referenced.referring_containers().containers.borrow_mut().insert(container_key, container_weak);
    trace!("reference {} -> {}", container_key, referenced_key);
  }
}

/// Removes the dependency of `container` on the object named by `key`, if
/// there is one.
pub fn reference_remove(container: &dyn Composite, key: ObjectKey) {
  let removed = container.reference_container().references.borrow_mut().remove(&key);
  if let Some(referenced) = removed {
    referenced.referring_containers().containers.borrow_mut().remove(&container.key());
    trace!("unreference {} -> {}", container.key(), key);
  }
}

/// Drops every outbound reference of a composite that is being deleted.
pub(crate) fn reference_remove_all(container: &dyn Composite) {
  let removed = mem::take(&mut *container.reference_container().references.borrow_mut());
  let container_key = container.key();
  for (key, referenced) in removed {
    referenced.referring_containers().containers.borrow_mut().remove(&container_key);
    trace!("unreference {} -> {}", container_key, key);
  }
}

/// Detaches an object that is being deleted from every composite still
/// referring to it.
pub(crate) fn reference_cascade_delete(referenced: &dyn Referable) {
  let key = referenced.key();
  let containers = mem::take(&mut *referenced.referring_containers().containers.borrow_mut());
  for (container_key, container) in containers {
    if let Some(container) = container.upgrade() {
      container.on_reference_deleted(key);
      let removed = container.reference_container().references.borrow_mut().remove(&key);
      // dropped outside of the borrow, it may be the last handle
      drop(removed);
      trace!("unreference {} -> {} (deleted)", container_key, key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug)]
  struct Target {
    header: ObjectHeader,
    referring: ReferringContainers,
  }
  impl_object!(Target, header);
  impl Referable for Target {
    fn referring_containers(&self) -> &ReferringContainers { &self.referring }
  }

  #[derive(Debug)]
  struct Holder {
    header: ObjectHeader,
    references: ReferenceContainer,
    cleared: RefCell<Vec<ObjectKey>>,
  }
  impl_object!(Holder, header);
  impl Composite for Holder {
    fn reference_container(&self) -> &ReferenceContainer { &self.references }
    fn on_reference_deleted(&self, key: ObjectKey) { self.cleared.borrow_mut().push(key); }
  }

  fn target(ctx: ContextId, name: u32) -> Rc<Target> {
    Rc::new(Target {
      header: ObjectHeader::new(ctx, ObjectKind::Texture2D, name),
      referring: ReferringContainers::default(),
    })
  }

  fn holder(ctx: ContextId, name: u32) -> Rc<Holder> {
    Rc::new(Holder {
      header: ObjectHeader::new(ctx, ObjectKind::Framebuffer, name),
      references: ReferenceContainer::default(),
      cleared: RefCell::new(vec![]),
    })
  }

  #[test]
  fn add_is_idempotent_and_maintains_the_inverse_index() {
    let ctx = ContextId::fresh();
    let t = target(ctx, 1);
    let h = holder(ctx, 1);

    reference_add(&h, &t);
    reference_add(&h, &t);
    assert_eq!(h.reference_container().len(), 1);
    assert_eq!(t.referring_containers().keys(), vec![h.key()]);
  }

  #[test]
  fn add_then_remove_leaves_nothing_behind() {
    let ctx = ContextId::fresh();
    let t = target(ctx, 1);
    let h = holder(ctx, 1);

    reference_add(&h, &t);
    reference_remove(&*h, t.key());
    assert!(!h.reference_container().contains(t.key()));
    assert!(t.referring_containers().is_empty());

    // removing something that isn't there is fine
    reference_remove(&*h, t.key());
  }

  #[test]
  fn deleting_a_referenced_object_clears_every_container() {
    let ctx = ContextId::fresh();
    let t = target(ctx, 1);
    let other = target(ctx, 2);
    let h1 = holder(ctx, 1);
    let h2 = holder(ctx, 2);

    reference_add(&h1, &t);
    reference_add(&h2, &t);
    reference_add(&h2, &other);

    reference_cascade_delete(&*t);

    assert!(!h1.reference_container().contains(t.key()));
    assert!(!h2.reference_container().contains(t.key()));
    assert!(h2.reference_container().contains(other.key()));
    assert_eq!(*h1.cleared.borrow(), vec![t.key()]);
    assert_eq!(*h2.cleared.borrow(), vec![t.key()]);
    assert!(t.referring_containers().is_empty());
  }

  #[test]
  fn deleting_a_container_releases_its_references() {
    let ctx = ContextId::fresh();
    let t = target(ctx, 1);
    let h = holder(ctx, 1);

    reference_add(&h, &t);
    assert_eq!(Rc::strong_count(&t), 2);
    reference_remove_all(&*h);
    assert!(h.reference_container().is_empty());
    assert!(t.referring_containers().is_empty());
    assert_eq!(Rc::strong_count(&t), 1);
  }

  #[test]
  fn dropped_containers_are_skipped() {
    let ctx = ContextId::fresh();
    let t = target(ctx, 1);
    {
      let h = holder(ctx, 1);
      reference_add(&h, &t);
      // the container holds the target strongly, the target holds the
      // container weakly, so dropping the last handle frees the container
    }
    assert_eq!(t.referring_containers().keys().len(), 1);
    reference_cascade_delete(&*t);
    assert!(t.referring_containers().is_empty());
  }
}
