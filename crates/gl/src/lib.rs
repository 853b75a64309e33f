pub mod gles2 {
  #![allow(clippy::all)]
  include!(concat!(env!("OUT_DIR"), "/gles2_bindings.rs"));
}

pub mod gl33 {
  #![allow(clippy::all)]
  include!(concat!(env!("OUT_DIR"), "/gl33_bindings.rs"));
}

// Enum values which exist in both APIs are identical, so the desktop
// namespace doubles as the shared one.
pub use self::gl33::*;

pub mod prelude {
  pub use super::gl33 as gl;
  pub use super::gl33::types::*;
  pub use super::gl33::Gl;
  pub use super::gles2::Gles2;
}
