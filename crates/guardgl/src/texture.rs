use crate::format::TextureFormat;
use crate::impl_prelude::*;
use crate::reference::reference_cascade_delete;
use prelude_plus::*;

gl_enum!({
  pub enum TextureFilterMin {
    Nearest = NEAREST,
    Linear = LINEAR,
    NearestMipmapNearest = NEAREST_MIPMAP_NEAREST,
    LinearMipmapNearest = LINEAR_MIPMAP_NEAREST,
    NearestMipmapLinear = NEAREST_MIPMAP_LINEAR,
    LinearMipmapLinear = LINEAR_MIPMAP_LINEAR,
  }
});

impl TextureFilterMin {
  pub fn uses_mipmaps(self) -> bool { !matches!(self, Self::Nearest | Self::Linear) }
}

gl_enum!({
  pub enum TextureFilterMag {
    Nearest = NEAREST,
    Linear = LINEAR,
  }
});

gl_enum!({
  pub enum TextureWrap {
    ClampToEdge = CLAMP_TO_EDGE,
    Repeat = REPEAT,
    MirroredRepeat = MIRRORED_REPEAT,
  }
});

gl_enum!({
  pub enum CubeFace {
    PositiveX = TEXTURE_CUBE_MAP_POSITIVE_X,
    NegativeX = TEXTURE_CUBE_MAP_NEGATIVE_X,
    PositiveY = TEXTURE_CUBE_MAP_POSITIVE_Y,
    NegativeY = TEXTURE_CUBE_MAP_NEGATIVE_Y,
    PositiveZ = TEXTURE_CUBE_MAP_POSITIVE_Z,
    NegativeZ = TEXTURE_CUBE_MAP_NEGATIVE_Z,
  }
});

/// One of the texture image units of a context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureUnit {
  context: ContextId,
  index: u32,
}

impl_pseudo_unshared!(TextureUnit, context);

impl TextureUnit {
  pub(crate) fn new(context: ContextId, index: u32) -> Self { Self { context, index } }

  #[inline(always)]
  pub fn index(&self) -> u32 { self.index }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureSampling {
  pub wrap_s: TextureWrap,
  pub wrap_t: TextureWrap,
  /// Only used by cube textures.
  pub wrap_r: TextureWrap,
  pub min_filter: TextureFilterMin,
  pub mag_filter: TextureFilterMag,
}

impl Default for TextureSampling {
  fn default() -> Self {
    Self {
      wrap_s: TextureWrap::ClampToEdge,
      wrap_t: TextureWrap::ClampToEdge,
      wrap_r: TextureWrap::ClampToEdge,
      min_filter: TextureFilterMin::Linear,
      mag_filter: TextureFilterMag::Linear,
    }
  }
}

/// A rectangle of new texel data. `data` holds `width * height` texels of
/// the texture's format, row by row.
#[derive(Debug, Copy, Clone)]
pub struct TextureUpdate<'a> {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
  pub data: &'a [u8],
}

impl<'a> TextureUpdate<'a> {
  pub fn whole(width: u32, height: u32, data: &'a [u8]) -> Self {
    Self { x: 0, y: 0, width, height, data }
  }
}

#[derive(Debug)]
pub struct Texture2D {
  header: ObjectHeader,
  referring: ReferringContainers,
  width: u32,
  height: u32,
  format: TextureFormat,
  sampling: TextureSampling,
}

impl_object!(Texture2D, header);

impl Referable for Texture2D {
  #[inline(always)]
  fn referring_containers(&self) -> &ReferringContainers { &self.referring }
}

impl Texture2D {
  #[inline(always)]
  pub fn width(&self) -> u32 { self.width }
  #[inline(always)]
  pub fn height(&self) -> u32 { self.height }
  #[inline(always)]
  pub fn format(&self) -> TextureFormat { self.format }
  #[inline(always)]
  pub fn sampling(&self) -> &TextureSampling { &self.sampling }
}

#[derive(Debug)]
pub struct TextureCube {
  header: ObjectHeader,
  referring: ReferringContainers,
  size: u32,
  format: TextureFormat,
  sampling: TextureSampling,
}

impl_object!(TextureCube, header);

impl Referable for TextureCube {
  #[inline(always)]
  fn referring_containers(&self) -> &ReferringContainers { &self.referring }
}

impl TextureCube {
  #[inline(always)]
  pub fn size(&self) -> u32 { self.size }
  #[inline(always)]
  pub fn format(&self) -> TextureFormat { self.format }
  #[inline(always)]
  pub fn sampling(&self) -> &TextureSampling { &self.sampling }
}

/// What a texture unit holds. A unit is given at most one texture at a time,
/// whatever its target.
#[derive(Debug, Clone)]
pub enum BoundTexture {
  Texture2D(Rc<Texture2D>),
  Cube(Rc<TextureCube>),
}

impl BoundTexture {
  pub fn key(&self) -> ObjectKey {
    match self {
      Self::Texture2D(texture) => texture.key(),
      Self::Cube(texture) => texture.key(),
    }
  }

  pub fn target(&self) -> GLenum {
    match self {
      Self::Texture2D(_) => gl::TEXTURE_2D,
      Self::Cube(_) => gl::TEXTURE_CUBE_MAP,
    }
  }

  fn name(&self) -> u32 {
    match self {
      Self::Texture2D(texture) => texture.name(),
      Self::Cube(texture) => texture.name(),
    }
  }
}

fn is_power_of_two(n: u32) -> bool { n != 0 && n & (n - 1) == 0 }

impl Context {
  fn check_texture_unit(&self, unit: &TextureUnit) -> GlResult<()> {
    check_usable(self, unit)?;
    if unit.index as usize >= self.texture_unit_bindings.len() {
      return Err(GlError::Range(format!(
        "Texture unit {} is out of range, {} has {} units",
        unit.index,
        self.id(),
        self.texture_unit_bindings.len(),
      )));
    }
    Ok(())
  }

  fn check_texture_dimensions(&self, width: u32, height: u32, max: u32) -> GlResult<()> {
    if width == 0 || height == 0 || width > max || height > max {
      return Err(GlError::Range(format!(
        "Texture size {}x{} is outside of the supported range 1..={}",
        width, height, max,
      )));
    }
    Ok(())
  }

  /// GLES2 restricts non-power-of-two textures to clamped edges and no
  /// mipmapping unless `GL_OES_texture_npot` is present.
  fn check_texture_npot(
    &self,
    width: u32,
    height: u32,
    sampling: &TextureSampling,
  ) -> GlResult<()> {
    if self.profile() != Profile::Gles2
      || self.capabilities().extensions.gl_oes_texture_npot
      || (is_power_of_two(width) && is_power_of_two(height))
    {
      return Ok(());
    }
    let wraps = [sampling.wrap_s, sampling.wrap_t, sampling.wrap_r];
    let repeats = wraps.iter().any(|&wrap| wrap != TextureWrap::ClampToEdge);
    if repeats || sampling.min_filter.uses_mipmaps() {
      return Err(self.unsupported(&format!(
        "Repeating or mipmapped {}x{} (non-power-of-two) texture without GL_OES_texture_npot",
        width, height,
      )));
    }
    Ok(())
  }

  fn texture_format_triple(&self, format: TextureFormat) -> GlResult<crate::FormatTriple> {
    format
      .triple(self.profile())
      .ok_or_else(|| self.unsupported(&format!("Texture format {:?}", format)))
  }

  fn texture_configure_sampling(&self, target: GLenum, sampling: &TextureSampling) {
    let driver = self.driver();
    driver.tex_parameter(target, gl::TEXTURE_WRAP_S, sampling.wrap_s.as_raw() as i32);
    driver.tex_parameter(target, gl::TEXTURE_WRAP_T, sampling.wrap_t.as_raw() as i32);
    if target == gl::TEXTURE_CUBE_MAP && self.profile() == Profile::Gl33 {
      // GLES2 has no third texture coordinate on cube maps
      driver.tex_parameter(target, gl::TEXTURE_WRAP_R, sampling.wrap_r.as_raw() as i32);
    }
    driver.tex_parameter(target, gl::TEXTURE_MIN_FILTER, sampling.min_filter.as_raw() as i32);
    driver.tex_parameter(target, gl::TEXTURE_MAG_FILTER, sampling.mag_filter.as_raw() as i32);
  }

  fn check_not_in_feedback_loop(&self, key: ObjectKey, unit: &TextureUnit) -> GlResult<()> {
    if let Some(framebuffer) = self.bound_draw_framebuffer.bound() {
      if framebuffer.reference_container().contains(key) {
        return Err(GlError::FeedbackLoop(format!(
          "Attempted to bind {} to texture unit {}, but it is attached to the bound draw framebuffer {}",
          key,
          unit.index,
          framebuffer.key(),
        )));
      }
    }
    Ok(())
  }

  /// Puts `texture` on `unit`, replacing whatever the unit held.
  fn texture_unit_put(&self, unit: &TextureUnit, texture: BoundTexture) {
    let slot = &self.texture_unit_bindings[unit.index as usize];
    // updates and mipmap generation act on the active unit, so it has to
    // follow even when the texture is already there
    self.set_active_texture_unit(unit.index);
    if slot.borrow().as_ref().map_or(false, |bound| bound.key() == texture.key()) {
      return;
    }
    let previous = slot.replace(None);
    if let Some(previous) = previous {
      if previous.target() != texture.target() {
        self.driver().bind_texture(previous.target(), 0);
      }
    }
    self.driver().bind_texture(texture.target(), texture.name());
    trace!("bind {} to texture unit {}", texture.key(), unit.index);
    *slot.borrow_mut() = Some(texture);
  }

  /// Forgets `key` on every unit holding it. The driver unbinds deleted
  /// textures by itself.
  fn texture_units_forget(&self, key: ObjectKey) {
    for (index, slot) in self.texture_unit_bindings.iter().enumerate() {
      let mut slot = slot.borrow_mut();
      if slot.as_ref().map_or(false, |bound| bound.key() == key) {
        *slot = None;
        trace!("unbind {} from texture unit {} (deleted)", key, index);
      }
    }
  }

  pub(crate) fn texture_is_bound_to_any_unit(&self, key: ObjectKey) -> bool {
    self
      .texture_unit_bindings
      .iter()
      .any(|slot| slot.borrow().as_ref().map_or(false, |bound| bound.key() == key))
  }

  /// Allocates a 2D texture with uninitialized contents. The texture is left
  /// bound to `unit`.
  pub fn texture_2d_allocate(
    &self,
    unit: &TextureUnit,
    width: u32,
    height: u32,
    format: TextureFormat,
    sampling: TextureSampling,
  ) -> GlResult<Rc<Texture2D>> {
    self.check_texture_unit(unit)?;
    self.check_texture_dimensions(width, height, self.capabilities().max_texture_size)?;
    self.check_texture_npot(width, height, &sampling)?;
    let triple = self.texture_format_triple(format)?;
    debug!("allocate {}x{} {:?} on unit {}", width, height, format, unit.index);

    let name = self.driver().gen_texture();
    let texture = Rc::new(Texture2D {
      header: ObjectHeader::new(self.id(), ObjectKind::Texture2D, name),
      referring: ReferringContainers::default(),
      width,
      height,
      format,
      sampling,
    });
    debug!("allocated {}", texture.key());

    self.texture_unit_put(unit, BoundTexture::Texture2D(Rc::clone(&texture)));
    self.texture_configure_sampling(gl::TEXTURE_2D, &sampling);
    self.driver().tex_image_2d(gl::TEXTURE_2D, 0, &triple, width, height, None);
    self.checkpoint_allocation(texture, Self::texture_2d_delete)
  }

  /// Allocates a cube texture with `size`x`size` faces. The texture is left
  /// bound to `unit`.
  pub fn texture_cube_allocate(
    &self,
    unit: &TextureUnit,
    size: u32,
    format: TextureFormat,
    sampling: TextureSampling,
  ) -> GlResult<Rc<TextureCube>> {
    self.check_texture_unit(unit)?;
    self.check_texture_dimensions(size, size, self.capabilities().max_cube_map_texture_size)?;
    self.check_texture_npot(size, size, &sampling)?;
    let triple = self.texture_format_triple(format)?;
    debug!("allocate cube {}x{} {:?} on unit {}", size, size, format, unit.index);

    let name = self.driver().gen_texture();
    let texture = Rc::new(TextureCube {
      header: ObjectHeader::new(self.id(), ObjectKind::TextureCube, name),
      referring: ReferringContainers::default(),
      size,
      format,
      sampling,
    });
    debug!("allocated {}", texture.key());

    self.texture_unit_put(unit, BoundTexture::Cube(Rc::clone(&texture)));
    self.texture_configure_sampling(gl::TEXTURE_CUBE_MAP, &sampling);
    for face in CubeFace::VARIANTS {
      self.driver().tex_image_2d(face.as_raw(), 0, &triple, size, size, None);
    }
    self.checkpoint_allocation(texture, Self::texture_cube_delete)
  }

  fn check_texture_update(
    &self,
    key: ObjectKey,
    format: TextureFormat,
    (width, height): (u32, u32),
    update: &TextureUpdate<'_>,
  ) -> GlResult<()> {
    let fits =
      |offset: u32, len: u32, max: u32| offset.checked_add(len).map_or(false, |end| end <= max);
    if !fits(update.x, update.width, width) || !fits(update.y, update.height, height) {
      return Err(GlError::Range(format!(
        "Update area {}x{} at ({}, {}) does not fit into {} ({}x{})",
        update.width, update.height, update.x, update.y, key, width, height,
      )));
    }
    let expected =
      update.width as usize * update.height as usize * format.bytes_per_pixel() as usize;
    if update.data.len() != expected {
      return Err(GlError::Range(format!(
        "Update of {}x{} {:?} texels needs {} bytes, got {}",
        update.width,
        update.height,
        format,
        expected,
        update.data.len(),
      )));
    }
    Ok(())
  }

  /// Lower levels are stale after an update of level 0. Allocation has
  /// already refused mipmap filters where mipmaps can't be generated.
  fn texture_refresh_mipmaps(&self, target: GLenum, key: ObjectKey, sampling: &TextureSampling) {
    if sampling.min_filter.uses_mipmaps() {
      trace!("regenerate mipmaps of {}", key);
      self.driver().generate_mipmap(target);
    }
  }

  /// Replaces a rectangle of texels. The texture is bound to `unit` first.
  /// Textures sampled with a mipmap filter get their mipmaps regenerated.
  pub fn texture_2d_update(
    &self,
    unit: &TextureUnit,
    texture: &Rc<Texture2D>,
    update: &TextureUpdate<'_>,
  ) -> GlResult<()> {
    self.check_texture_unit(unit)?;
    self.check_object(&**texture)?;
    let size = (texture.width, texture.height);
    self.check_texture_update(texture.key(), texture.format, size, update)?;
    let triple = self.texture_format_triple(texture.format)?;
    self.texture_2d_bind(unit, texture)?;
    self.driver().tex_sub_image_2d(
      gl::TEXTURE_2D,
      0,
      &triple,
      (update.x, update.y),
      (update.width, update.height),
      update.data,
    );
    self.texture_refresh_mipmaps(gl::TEXTURE_2D, texture.key(), &texture.sampling);
    self.checkpoint()
  }

  pub fn texture_cube_update(
    &self,
    unit: &TextureUnit,
    texture: &Rc<TextureCube>,
    face: CubeFace,
    update: &TextureUpdate<'_>,
  ) -> GlResult<()> {
    self.check_texture_unit(unit)?;
    self.check_object(&**texture)?;
    self.check_texture_update(texture.key(), texture.format, (texture.size, texture.size), update)?;
    let triple = self.texture_format_triple(texture.format)?;
    self.texture_cube_bind(unit, texture)?;
    self.driver().tex_sub_image_2d(
      face.as_raw(),
      0,
      &triple,
      (update.x, update.y),
      (update.width, update.height),
      update.data,
    );
    self.texture_refresh_mipmaps(gl::TEXTURE_CUBE_MAP, texture.key(), &texture.sampling);
    self.checkpoint()
  }

  pub fn texture_2d_bind(&self, unit: &TextureUnit, texture: &Rc<Texture2D>) -> GlResult<()> {
    self.check_texture_unit(unit)?;
    self.check_object(&**texture)?;
    self.check_not_in_feedback_loop(texture.key(), unit)?;
    self.texture_unit_put(unit, BoundTexture::Texture2D(Rc::clone(texture)));
    self.checkpoint()
  }

  pub fn texture_cube_bind(&self, unit: &TextureUnit, texture: &Rc<TextureCube>) -> GlResult<()> {
    self.check_texture_unit(unit)?;
    self.check_object(&**texture)?;
    self.check_not_in_feedback_loop(texture.key(), unit)?;
    self.texture_unit_put(unit, BoundTexture::Cube(Rc::clone(texture)));
    self.checkpoint()
  }

  pub fn texture_unit_unbind(&self, unit: &TextureUnit) -> GlResult<()> {
    self.check_texture_unit(unit)?;
    let previous = self.texture_unit_bindings[unit.index as usize].replace(None);
    if let Some(previous) = previous {
      self.set_active_texture_unit(unit.index);
      self.driver().bind_texture(previous.target(), 0);
      trace!("unbind {} from texture unit {}", previous.key(), unit.index);
    }
    self.checkpoint()
  }

  pub fn texture_unit_bound(&self, unit: &TextureUnit) -> GlResult<Option<BoundTexture>> {
    self.check_texture_unit(unit)?;
    Ok(self.texture_unit_bindings[unit.index as usize].borrow().clone())
  }

  pub fn texture_unit_is_bound(&self, unit: &TextureUnit) -> GlResult<bool> {
    Ok(self.texture_unit_bound(unit)?.is_some())
  }

  pub fn texture_2d_is_bound_anywhere(&self, texture: &Texture2D) -> GlResult<bool> {
    self.check_object(texture)?;
    Ok(self.texture_is_bound_to_any_unit(texture.key()))
  }

  pub fn texture_cube_is_bound_anywhere(&self, texture: &TextureCube) -> GlResult<bool> {
    self.check_object(texture)?;
    Ok(self.texture_is_bound_to_any_unit(texture.key()))
  }

  pub fn texture_2d_regenerate_mipmaps(
    &self,
    unit: &TextureUnit,
    texture: &Rc<Texture2D>,
  ) -> GlResult<()> {
    self.texture_2d_bind(unit, texture)?;
    if self.profile() == Profile::Gles2
      && !self.capabilities().extensions.gl_oes_texture_npot
      && !(is_power_of_two(texture.width) && is_power_of_two(texture.height))
    {
      return Err(self.unsupported("Mipmaps of a non-power-of-two texture"));
    }
    trace!("regenerate mipmaps of {}", texture.key());
    self.driver().generate_mipmap(gl::TEXTURE_2D);
    self.checkpoint()
  }

  /// Deletes the texture, unbinding it from every unit and detaching it from
  /// every framebuffer.
  pub fn texture_2d_delete(&self, texture: &Texture2D) -> GlResult<()> {
    self.check_object(texture)?;
    debug!("delete {}", texture.key());
    self.driver().delete_texture(texture.name());
    texture.header.mark_deleted();
    self.texture_units_forget(texture.key());
    reference_cascade_delete(texture);
    self.checkpoint()
  }

  pub fn texture_cube_delete(&self, texture: &TextureCube) -> GlResult<()> {
    self.check_object(texture)?;
    debug!("delete {}", texture.key());
    self.driver().delete_texture(texture.name());
    texture.header.mark_deleted();
    self.texture_units_forget(texture.key());
    reference_cascade_delete(texture);
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
  fn allocation_binds_and_configures() {
    let (ctx, driver) = context(Profile::Gl33);
    let unit = ctx.texture_units()[3];
    driver.clear_calls();
    let texture = ctx
      .texture_2d_allocate(&unit, 64, 32, TextureFormat::Rgba8, TextureSampling::default())
      .unwrap();

    assert_eq!((texture.width(), texture.height()), (64, 32));
    assert_eq!(ctx.active_texture_unit(), 3);
    assert!(ctx.texture_2d_is_bound_anywhere(&texture).unwrap());
    match ctx.texture_unit_bound(&unit).unwrap() {
      Some(BoundTexture::Texture2D(bound)) => assert_eq!(bound.key(), texture.key()),
      other => panic!("unexpected {:?}", other),
    }

    let calls = driver.calls();
    assert!(calls.contains(&"active_texture(3)".to_owned()));
    assert!(calls.contains(&format!("bind_texture({:#06x}, {})", gl::TEXTURE_2D, texture.name())));
    assert!(calls.iter().any(|call| call.starts_with("tex_image_2d") && call.contains("64x32")));
  }

  #[test]
  fn sizes_and_formats_are_checked() {
    let (ctx, _driver) = context(Profile::Gles2);
    let unit = ctx.texture_units()[0];
    let sampling = TextureSampling::default();
    assert!(matches!(
      ctx.texture_2d_allocate(&unit, 0, 16, TextureFormat::Rgba8, sampling),
      Err(GlError::Range(_)),
    ));
    assert!(matches!(
      ctx.texture_2d_allocate(&unit, 4096, 16, TextureFormat::Rgba8, sampling),
      Err(GlError::Range(_)),
    ));
    assert!(matches!(
      ctx.texture_2d_allocate(&unit, 16, 16, TextureFormat::Rgba32f, sampling),
      Err(GlError::Unsupported(_)),
    ));
  }

  #[test]
  fn npot_textures_are_restricted_on_gles2() {
    let (ctx, _driver) = context(Profile::Gles2);
    let unit = ctx.texture_units()[0];
    let repeating = TextureSampling { wrap_s: TextureWrap::Repeat, ..Default::default() };
    assert!(matches!(
      ctx.texture_2d_allocate(&unit, 30, 30, TextureFormat::Rgba8, repeating),
      Err(GlError::Unsupported(_)),
    ));
    ctx.texture_2d_allocate(&unit, 32, 32, TextureFormat::Rgba8, repeating).unwrap();
    let clamped =
      ctx.texture_2d_allocate(&unit, 30, 30, TextureFormat::Rgba8, Default::default()).unwrap();
    assert!(matches!(
      ctx.texture_2d_regenerate_mipmaps(&unit, &clamped),
      Err(GlError::Unsupported(_)),
    ));
  }

  #[test]
  fn updates_are_range_checked() {
    let (ctx, driver) = context(Profile::Gl33);
    let unit = ctx.texture_units()[0];
    let texture =
      ctx.texture_2d_allocate(&unit, 4, 4, TextureFormat::Rg8, Default::default()).unwrap();

    let data = [0_u8; 2 * 2 * 2];
    let inside = TextureUpdate { x: 2, y: 2, width: 2, height: 2, data: &data };
    ctx.texture_2d_update(&unit, &texture, &inside).unwrap();
    assert!(driver.calls().iter().any(|call| call.starts_with("tex_sub_image_2d")));

    assert!(matches!(
      ctx.texture_2d_update(
        &unit,
        &texture,
        &TextureUpdate { x: 3, y: 0, width: 2, height: 2, data: &data },
      ),
      Err(GlError::Range(_)),
    ));
    assert!(matches!(
      ctx.texture_2d_update(&unit, &texture, &TextureUpdate::whole(4, 4, &data)),
      Err(GlError::Range(_)),
    ));
  }

  #[test]
  fn cube_textures_allocate_every_face() {
    let (ctx, driver) = context(Profile::Gl33);
    let unit = ctx.texture_units()[1];
    driver.clear_calls();
    let cube =
      ctx.texture_cube_allocate(&unit, 16, TextureFormat::Rgb8, Default::default()).unwrap();
    let faces = driver.calls().iter().filter(|call| call.starts_with("tex_image_2d")).count();
    assert_eq!(faces, 6);

    let data = [0_u8; 16 * 16 * 3];
    let whole = TextureUpdate::whole(16, 16, &data);
    ctx.texture_cube_update(&unit, &cube, CubeFace::NegativeZ, &whole).unwrap();
    assert!(ctx.texture_cube_is_bound_anywhere(&cube).unwrap());
  }

  #[test]
  fn a_unit_holds_one_texture_at_a_time() {
    let (ctx, driver) = context(Profile::Gl33);
    let unit = ctx.texture_units()[0];
    let flat =
      ctx.texture_2d_allocate(&unit, 8, 8, TextureFormat::Rgba8, Default::default()).unwrap();
    let cube =
      ctx.texture_cube_allocate(&unit, 8, TextureFormat::Rgba8, Default::default()).unwrap();

    assert!(!ctx.texture_2d_is_bound_anywhere(&flat).unwrap());
    assert!(driver.calls().contains(&format!("bind_texture({:#06x}, 0)", gl::TEXTURE_2D)));

    ctx.texture_unit_unbind(&unit).unwrap();
    assert!(!ctx.texture_unit_is_bound(&unit).unwrap());
    assert!(!ctx.texture_cube_is_bound_anywhere(&cube).unwrap());
  }

  #[test]
  fn deleting_unbinds_from_every_unit() {
    let (ctx, _driver) = context(Profile::Gl33);
    let units = ctx.texture_units();
    let texture =
      ctx.texture_2d_allocate(&units[0], 8, 8, TextureFormat::Rgba8, Default::default()).unwrap();
    ctx.texture_2d_bind(&units[5], &texture).unwrap();

    ctx.texture_2d_delete(&texture).unwrap();
    assert!(texture.is_deleted());
    assert!(!ctx.texture_unit_is_bound(&units[0]).unwrap());
    assert!(!ctx.texture_unit_is_bound(&units[5]).unwrap());
    assert!(matches!(ctx.texture_2d_bind(&units[0], &texture), Err(GlError::Deleted(_))));
  }

  #[test]
  fn units_of_other_contexts_are_rejected() {
    let (a, _) = context(Profile::Gl33);
    let (b, _) = context(Profile::Gl33);
    a.share_with(&b);
    let a_unit = a.texture_units()[0];
    let texture =
      a.texture_2d_allocate(&a_unit, 8, 8, TextureFormat::Rgba8, Default::default()).unwrap();

    // the texture is shared, the unit isn't
    b.texture_2d_bind(&b.texture_units()[0], &texture).unwrap();
    assert!(matches!(b.texture_2d_bind(&a_unit, &texture), Err(GlError::WrongContext(_))));
  }

  #[test]
  fn updates_act_on_the_unit_holding_the_texture() {
    let (ctx, driver) = context(Profile::Gl33);
    let units = ctx.texture_units();
    let first =
      ctx.texture_2d_allocate(&units[0], 4, 4, TextureFormat::Rgba8, Default::default()).unwrap();
    let second =
      ctx.texture_2d_allocate(&units[1], 4, 4, TextureFormat::Rgba8, Default::default()).unwrap();
    assert_eq!(driver.active_texture_unit(), 1);

    let data = [0_u8; 4 * 4 * 4];
    ctx.texture_2d_update(&units[0], &first, &TextureUpdate::whole(4, 4, &data)).unwrap();
    assert_eq!(driver.active_texture_unit(), 0);
    assert_eq!(ctx.active_texture_unit(), 0);

    ctx.texture_2d_regenerate_mipmaps(&units[1], &second).unwrap();
    assert_eq!(driver.active_texture_unit(), 1);
    ctx.texture_2d_regenerate_mipmaps(&units[0], &first).unwrap();
    assert_eq!(driver.active_texture_unit(), 0);
  }

  #[test]
  fn updates_regenerate_mipmaps_the_texture_samples() {
    let (ctx, driver) = context(Profile::Gl33);
    let unit = ctx.texture_units()[0];
    let data = [0_u8; 8 * 8 * 4];
    let whole = TextureUpdate::whole(8, 8, &data);
    let generated = |target: GLenum| format!("generate_mipmap({:#06x})", target);

    let plain =
      ctx.texture_2d_allocate(&unit, 8, 8, TextureFormat::Rgba8, Default::default()).unwrap();
    driver.clear_calls();
    ctx.texture_2d_update(&unit, &plain, &whole).unwrap();
    assert!(!driver.calls().contains(&generated(gl::TEXTURE_2D)));

    let mipmapped =
      TextureSampling { min_filter: TextureFilterMin::LinearMipmapLinear, ..Default::default() };
    let flat = ctx.texture_2d_allocate(&unit, 8, 8, TextureFormat::Rgba8, mipmapped).unwrap();
    driver.clear_calls();
    ctx.texture_2d_update(&unit, &flat, &whole).unwrap();
    assert_eq!(driver.calls().last(), Some(&generated(gl::TEXTURE_2D)));

    let cube = ctx.texture_cube_allocate(&unit, 8, TextureFormat::Rgba8, mipmapped).unwrap();
    driver.clear_calls();
    ctx.texture_cube_update(&unit, &cube, CubeFace::PositiveY, &whole).unwrap();
    assert_eq!(driver.calls().last(), Some(&generated(gl::TEXTURE_CUBE_MAP)));
  }

  #[test]
  fn failed_allocations_leave_the_unit_empty() {
    let (ctx, driver) = context(Profile::Gl33);
    let unit = ctx.texture_units()[2];
    driver.push_error(gl::OUT_OF_MEMORY);
    assert!(matches!(
      ctx.texture_2d_allocate(&unit, 8, 8, TextureFormat::Rgba8, Default::default()),
      Err(GlError::Runtime { .. }),
    ));
    assert!(!ctx.texture_unit_is_bound(&unit).unwrap());
    assert!(driver.calls().iter().any(|call| call.starts_with("delete_texture")));
  }
}
