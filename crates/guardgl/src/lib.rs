//! An object-oriented OpenGL wrapper which validates every object it is handed
//! against the context the call is made on, and keeps track of which objects
//! refer to which so that deleting one never leaves dangling attachments
//! behind.

macro_rules! gl_enum {
  // a wrapper for autoformatting purposes
  ({$($tt:tt)+}) => { gl_enum! { $($tt)+ } };

  (
    $(#[$enum_meta:meta])* $visibility:vis enum $enum_name:ident {
      $($(#[$variant_meta:meta])* $rust_variant:ident = $gl_variant:ident),+ $(,)?
    }
  ) => {
    #[repr(u32)]
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    $(#[$enum_meta])*
    $visibility enum $enum_name {
      $($(#[$variant_meta])* $rust_variant = ::gl::$gl_variant,)+
    }

    #[allow(dead_code)]
    impl $enum_name {
      $visibility const VARIANTS: &'static [Self] = &[$(Self::$rust_variant),+];

      $visibility const fn from_raw(raw: ::gl::types::GLenum) -> Option<Self> {
        Some(match raw {
          $(::gl::$gl_variant => Self::$rust_variant,)+
            _ => return None,
        })
      }

      #[inline(always)]
      $visibility const fn as_raw(&self) -> ::gl::types::GLenum {
        *self as ::gl::types::GLenum
      }
    }
  };
}

/// Implements [`Usable`](crate::Usable) and [`Object`](crate::Object) for a
/// type carrying an [`ObjectHeader`] in the given field.
macro_rules! impl_object {
  ($type:ty, $field:ident) => {
    impl $crate::traits::Usable for $type {
      #[inline(always)]
      fn owning_context(&self) -> $crate::object::ContextId { self.$field.context() }
      #[inline(always)]
      fn sharing_class(&self) -> $crate::object::SharingClass { self.$field.sharing_class() }
    }

    impl $crate::traits::Object for $type {
      #[inline(always)]
      fn header(&self) -> &$crate::object::ObjectHeader { &self.$field }
    }
  };
}

/// Implements [`Usable`](crate::Usable) for a library-level value tagged with
/// a context in the given field.
macro_rules! impl_pseudo_unshared {
  ($type:ty, $field:ident) => {
    impl $crate::traits::Usable for $type {
      #[inline(always)]
      fn owning_context(&self) -> $crate::object::ContextId { self.$field }
      #[inline(always)]
      fn sharing_class(&self) -> $crate::object::SharingClass {
        $crate::object::SharingClass::PseudoUnshared
      }
    }
  };
}

pub mod array_object;
pub mod buffer;
pub mod check;
pub mod context;
pub mod debug;
pub mod driver;
pub mod error;
pub mod fake;
pub mod format;
pub mod framebuffer;
pub mod native;
pub mod object;
pub mod query;
pub mod reference;
pub mod renderbuffer;
pub mod shader;
pub mod state;
pub mod texture;
pub mod traits;

mod impl_prelude;

pub use array_object::*;
pub use buffer::*;
pub use check::{check_not_deleted, check_usable};
pub use context::*;
pub use driver::*;
pub use error::*;
pub use fake::FakeDriver;
pub use format::*;
pub use framebuffer::*;
pub use native::{Gl33Driver, Gles2Driver};
pub use object::*;
pub use query::*;
pub use reference::*;
pub use renderbuffer::*;
pub use shader::*;
pub use state::*;
pub use texture::*;
pub use traits::*;

pub use gl;
pub use gl::types::*;
