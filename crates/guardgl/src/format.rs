//! Format tables. Every format maps to an `(internal format, format, type)`
//! triple per profile; a missing triple means the profile can't allocate it.

use crate::driver::Profile;
use gl::types::*;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FormatTriple {
  pub internal_format: GLenum,
  pub format: GLenum,
  pub type_: GLenum,
}

const fn triple(internal_format: GLenum, format: GLenum, type_: GLenum) -> FormatTriple {
  FormatTriple { internal_format, format, type_ }
}

/// What a format can be attached as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FormatKind {
  Color,
  Depth,
  Stencil,
  DepthStencil,
}

impl FormatKind {
  #[inline(always)]
  pub fn has_depth(self) -> bool { matches!(self, Self::Depth | Self::DepthStencil) }
  #[inline(always)]
  pub fn has_stencil(self) -> bool { matches!(self, Self::Stencil | Self::DepthStencil) }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
  R8,
  Rg8,
  Rgb8,
  Rgba8,
  Rgb565,
  Rgba4444,
  Rgba16f,
  Rgba32f,
  Depth16,
  Depth24,
  Depth32f,
  Depth24Stencil8,
}

#[derive(Debug, Copy, Clone)]
struct TextureFormatEntry {
  bytes_per_pixel: u32,
  kind: FormatKind,
  gles2: Option<FormatTriple>,
  gles2_color_renderable: bool,
  gl33: Option<FormatTriple>,
}

macro_rules! texture_format_table {
  ($($variant:ident => ($bpp:literal, $kind:ident, $gles2:expr, $gles2_renderable:literal, $gl33:expr)),+ $(,)?) => {
    impl TextureFormat {
      pub const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

      fn entry(self) -> TextureFormatEntry {
        match self {
          $(Self::$variant => TextureFormatEntry {
            bytes_per_pixel: $bpp,
            kind: FormatKind::$kind,
            gles2: $gles2,
            gles2_color_renderable: $gles2_renderable,
            gl33: $gl33,
          },)+
        }
      }
    }
  };
}

use gl::gles2::{LUMINANCE, LUMINANCE_ALPHA};

#[rustfmt::skip]
texture_format_table! {
  R8 => (1, Color,
    Some(triple(LUMINANCE, LUMINANCE, gl::UNSIGNED_BYTE)), false,
    Some(triple(gl::R8, gl::RED, gl::UNSIGNED_BYTE))),
  Rg8 => (2, Color,
    Some(triple(LUMINANCE_ALPHA, LUMINANCE_ALPHA, gl::UNSIGNED_BYTE)), false,
    Some(triple(gl::RG8, gl::RG, gl::UNSIGNED_BYTE))),
  Rgb8 => (3, Color,
    Some(triple(gl::RGB, gl::RGB, gl::UNSIGNED_BYTE)), true,
    Some(triple(gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE))),
  Rgba8 => (4, Color,
    Some(triple(gl::RGBA, gl::RGBA, gl::UNSIGNED_BYTE)), true,
    Some(triple(gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE))),
  Rgb565 => (2, Color,
    Some(triple(gl::RGB, gl::RGB, gl::UNSIGNED_SHORT_5_6_5)), true,
    Some(triple(gl::RGB8, gl::RGB, gl::UNSIGNED_SHORT_5_6_5))),
  Rgba4444 => (2, Color,
    Some(triple(gl::RGBA, gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4)), true,
    Some(triple(gl::RGBA4, gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4))),
  Rgba16f => (8, Color, None, false,
    Some(triple(gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT))),
  Rgba32f => (16, Color, None, false,
    Some(triple(gl::RGBA32F, gl::RGBA, gl::FLOAT))),
  Depth16 => (2, Depth, None, false,
    Some(triple(gl::DEPTH_COMPONENT16, gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT))),
  Depth24 => (4, Depth, None, false,
    Some(triple(gl::DEPTH_COMPONENT24, gl::DEPTH_COMPONENT, gl::UNSIGNED_INT))),
  Depth32f => (4, Depth, None, false,
    Some(triple(gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT))),
  Depth24Stencil8 => (4, DepthStencil, None, false,
    Some(triple(gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8))),
}

impl TextureFormat {
  #[inline(always)]
  pub fn bytes_per_pixel(self) -> u32 { self.entry().bytes_per_pixel }
  #[inline(always)]
  pub fn kind(self) -> FormatKind { self.entry().kind }

  pub fn triple(self, profile: Profile) -> Option<FormatTriple> {
    let entry = self.entry();
    match profile {
      Profile::Gles2 => entry.gles2,
      Profile::Gl33 => entry.gl33,
    }
  }

  pub fn is_color_renderable(self, profile: Profile) -> bool {
    let entry = self.entry();
    entry.kind == FormatKind::Color
      && match profile {
        Profile::Gles2 => entry.gles2_color_renderable,
        Profile::Gl33 => entry.gl33.is_some(),
      }
  }

  pub fn is_depth_renderable(self, profile: Profile) -> bool {
    self.kind().has_depth() && self.triple(profile).is_some()
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderbufferFormat {
  Rgba4,
  Rgb565,
  Rgb5A1,
  Rgb8,
  Rgba8,
  Depth16,
  Depth24,
  Depth24Stencil8,
  Stencil8,
}

impl RenderbufferFormat {
  pub const VARIANTS: &'static [Self] = &[
    Self::Rgba4,
    Self::Rgb565,
    Self::Rgb5A1,
    Self::Rgb8,
    Self::Rgba8,
    Self::Depth16,
    Self::Depth24,
    Self::Depth24Stencil8,
    Self::Stencil8,
  ];

  pub fn kind(self) -> FormatKind {
    match self {
      Self::Rgba4 | Self::Rgb565 | Self::Rgb5A1 | Self::Rgb8 | Self::Rgba8 => FormatKind::Color,
      Self::Depth16 | Self::Depth24 => FormatKind::Depth,
      Self::Depth24Stencil8 => FormatKind::DepthStencil,
      Self::Stencil8 => FormatKind::Stencil,
    }
  }

  pub fn internal_format(self, profile: Profile) -> Option<GLenum> {
    match (self, profile) {
      (Self::Rgba4, _) => Some(gl::RGBA4),
      (Self::Rgb565, Profile::Gles2) => Some(gl::gles2::RGB565),
      (Self::Rgb565, Profile::Gl33) => None,
      (Self::Rgb5A1, _) => Some(gl::RGB5_A1),
      (Self::Rgb8, Profile::Gl33) => Some(gl::RGB8),
      (Self::Rgba8, Profile::Gl33) => Some(gl::RGBA8),
      (Self::Rgb8, Profile::Gles2) | (Self::Rgba8, Profile::Gles2) => None,
      (Self::Depth16, _) => Some(gl::DEPTH_COMPONENT16),
      (Self::Depth24, Profile::Gl33) => Some(gl::DEPTH_COMPONENT24),
      (Self::Depth24Stencil8, Profile::Gl33) => Some(gl::DEPTH24_STENCIL8),
      (Self::Depth24, Profile::Gles2) | (Self::Depth24Stencil8, Profile::Gles2) => None,
      (Self::Stencil8, _) => Some(gl::STENCIL_INDEX8),
    }
  }
}
