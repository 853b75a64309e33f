//! Checks deciding whether an object may be passed to an operation invoked on
//! a given context.
//!
//! For a *shared* object `o` created on context `C` and a current context `D`,
//! `o` is usable iff `C` equals `D`, or `D` takes part in sharing and `C` is
//! among the contexts `D` was created sharing with. For *unshared* and
//! *pseudo-unshared* objects `C` must equal `D`.
//!
//! Sharing is only ever tested pairwise. Chains of sharing contexts are not
//! followed.

use crate::impl_prelude::*;

pub fn check_usable<'a, T>(current: &Context, object: &'a T) -> GlResult<&'a T>
where
  T: Usable + ?Sized,
{
  let target = object.owning_context();
  let current_id = current.id();
  if target == current_id {
    return Ok(object);
  }

  match object.sharing_class() {
    SharingClass::Shared => {
      if current.is_shared_with(target) {
        return Ok(object);
      }
      Err(GlError::WrongContext(format!(
        "Object cannot be used: Current context {} ({}) is not shared with object's context {}",
        current_id,
        current.name(),
        target,
      )))
    }
    SharingClass::Unshared | SharingClass::PseudoUnshared => {
      Err(GlError::WrongContext(format!(
        "Object cannot be used: Current context {} ({}) is not equal to object's context {}",
        current_id,
        current.name(),
        target,
      )))
    }
  }
}

pub fn check_not_deleted<T: Object + ?Sized>(object: &T) -> GlResult<&T> {
  if object.is_deleted() {
    return Err(GlError::Deleted(format!("Object {} has been deleted", object.key())));
  }
  Ok(object)
}

impl Context {
  /// Both checks every operation performs on the objects it receives, in
  /// the order they are performed.
  #[inline]
  pub fn check_object<'a, T: Object + ?Sized>(&self, object: &'a T) -> GlResult<&'a T> {
    check_not_deleted(check_usable(self, object)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ContextConfig, FakeDriver, SharedContext, TextureUnit};
  use prelude_plus::*;

  fn context(name: &str) -> SharedContext {
    Context::new(
      Box::new(FakeDriver::new(Profile::Gl33)),
      ContextConfig { name: name.to_owned(), ..Default::default() },
    )
    .unwrap()
  }

  #[derive(Debug)]
  struct Probe(ContextId, SharingClass);

  impl Usable for Probe {
    fn owning_context(&self) -> ContextId { self.0 }
    fn sharing_class(&self) -> SharingClass { self.1 }
  }

  #[test]
  fn shared_objects_need_a_sharing_relation() {
    let a = context("a");
    let b = context("b");
    let probe = Probe(a.id(), SharingClass::Shared);

    assert!(check_usable(&a, &probe).is_ok());
    match check_usable(&b, &probe) {
      Err(GlError::WrongContext(message)) => {
        assert!(message.contains(&a.id().to_string()));
        assert!(message.contains(&b.id().to_string()));
      }
      other => panic!("unexpected {:?}", other),
    }

    b.share_with(&a);
    assert!(check_usable(&b, &probe).is_ok());
    assert!(check_usable(&a, &probe).is_ok());
  }

  #[test]
  fn unshared_objects_never_cross_contexts() {
    let a = context("a");
    let b = context("b");
    a.share_with(&b);

    for class in &[SharingClass::Unshared, SharingClass::PseudoUnshared] {
      let probe = Probe(a.id(), *class);
      assert!(check_usable(&a, &probe).is_ok());
      assert!(matches!(check_usable(&b, &probe), Err(GlError::WrongContext(_))));
    }
  }

  #[test]
  fn sharing_is_not_transitive() {
    let a = context("a");
    let b = context("b");
    let c = context("c");
    a.share_with(&b);
    b.share_with(&c);

    let probe = Probe(a.id(), SharingClass::Shared);
    assert!(check_usable(&b, &probe).is_ok());
    assert!(matches!(check_usable(&c, &probe), Err(GlError::WrongContext(_))));
  }

  #[test]
  fn texture_units_are_pseudo_unshared() {
    let a = context("a");
    let b = context("b");
    a.share_with(&b);
    let unit: TextureUnit = a.texture_units()[0];
    assert!(check_usable(&a, &unit).is_ok());
    assert!(check_usable(&b, &unit).is_err());
  }

  #[test]
  fn deleted_objects_are_rejected() {
    let a = context("a");
    let buffer = a.array_buffer_allocate(16, crate::UsageHint::StaticDraw).unwrap();
    assert!(a.check_object(&*buffer).is_ok());
    a.array_buffer_delete(&buffer).unwrap();
    assert!(matches!(a.check_object(&*buffer), Err(GlError::Deleted(_))));
  }
}
