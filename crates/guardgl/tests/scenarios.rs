use guardgl::*;

fn init_logging() { let _ = env_logger::builder().is_test(true).try_init(); }

fn context(name: &str, profile: Profile) -> (SharedContext, FakeDriver) {
  init_logging();
  let driver = FakeDriver::new(profile);
  let config = ContextConfig { name: name.to_owned(), check_errors: true, ..Default::default() };
  (Context::new(Box::new(driver.clone()), config).unwrap(), driver)
}

#[test]
fn buffers_cross_contexts_only_after_sharing() {
  let (a, _) = context("a", Profile::Gl33);
  let (b, _) = context("b", Profile::Gl33);

  let buffer = a.array_buffer_allocate(64, UsageHint::StaticDraw).unwrap();
  assert!(matches!(b.array_buffer_bind(&buffer), Err(GlError::WrongContext(_))));

  a.share_with(&b);
  b.array_buffer_bind(&buffer).unwrap();
  assert!(b.array_buffer_is_bound(&buffer).unwrap());
}

#[test]
fn array_objects_never_cross_contexts() {
  let (a, _) = context("a", Profile::Gl33);
  let (b, _) = context("b", Profile::Gl33);
  a.share_with(&b);

  let ao = a.array_object_allocate(&a.array_object_new_builder()).unwrap();
  assert!(matches!(b.array_object_bind(&ao), Err(GlError::WrongContext(_))));
  assert!(matches!(b.array_object_delete(&ao), Err(GlError::WrongContext(_))));
  a.array_object_delete(&ao).unwrap();
}

#[test]
fn sharing_does_not_chain() {
  let (a, _) = context("a", Profile::Gles2);
  let (b, _) = context("b", Profile::Gles2);
  let (c, _) = context("c", Profile::Gles2);
  a.share_with(&b);
  b.share_with(&c);

  let buffer = a.array_buffer_allocate(16, UsageHint::DynamicDraw).unwrap();
  assert!(check_usable(&b, &*buffer).is_ok());
  assert!(matches!(check_usable(&c, &*buffer), Err(GlError::WrongContext(_))));
}

#[test]
fn deleting_an_index_buffer_detaches_it_from_array_objects() {
  let (ctx, _) = context("main", Profile::Gl33);
  let indices = ctx.index_buffer_allocate(6, IndexType::U16, UsageHint::StaticDraw).unwrap();

  let mut builder = ctx.array_object_new_builder();
  builder.set_index_buffer(Some(&indices));
  let ao = ctx.array_object_allocate(&builder).unwrap();
  assert_eq!(ao.index_buffer().map(|ib| ib.key()), Some(indices.key()));
  assert!(ao.reference_container().contains(indices.key()));

  ctx.index_buffer_delete(&indices).unwrap();
  assert!(indices.is_deleted());
  assert!(ao.index_buffer().is_none());
  assert!(ao.reference_container().is_empty());
  assert!(ctx.array_object_get_default().index_buffer().is_none());
}

#[test]
fn deleting_a_buffer_clears_every_array_object_using_it() {
  let (ctx, _) = context("main", Profile::Gl33);
  let vertices = ctx.array_buffer_allocate(96, UsageHint::StaticDraw).unwrap();

  let mut builder = ctx.array_object_new_builder();
  builder
    .set_attribute_floating_point(0, &vertices, 3, FloatingPointType::F32, false, 0, 0)
    .unwrap();
  let first = ctx.array_object_allocate(&builder).unwrap();
  builder
    .set_attribute_floating_point(2, &vertices, 2, FloatingPointType::F32, false, 0, 48)
    .unwrap();
  let second = ctx.array_object_allocate(&builder).unwrap();
  assert_eq!(vertices.referring_containers().keys(), vec![first.key(), second.key()]);

  ctx.array_buffer_delete(&vertices).unwrap();
  for ao in &[&first, &second] {
    assert!(ao.enabled_attributes().is_empty());
    assert!(ao.reference_container().is_empty());
  }
  assert!(vertices.referring_containers().is_empty());
}

#[test]
fn deleting_a_renderbuffer_clears_every_framebuffer_using_it() {
  let (ctx, _) = context("main", Profile::Gles2);
  let point = ctx.framebuffer_color_attachment_points()[0];
  let color = ctx.renderbuffer_allocate(RenderbufferFormat::Rgba4, 32, 32).unwrap();
  let depth = ctx.renderbuffer_allocate(RenderbufferFormat::Depth16, 32, 32).unwrap();

  let mut builder = ctx.framebuffer_new_builder();
  builder.attach_color_renderbuffer_at(&point, &color).unwrap();
  let color_only = ctx.framebuffer_allocate(&builder).unwrap();
  builder.attach_depth_renderbuffer(&depth).unwrap();
  let with_depth = ctx.framebuffer_allocate(&builder).unwrap();

  ctx.renderbuffer_delete(&color).unwrap();
  assert!(color_only.color_attachment_at(&point).is_none());
  assert!(with_depth.color_attachment_at(&point).is_none());
  assert!(color_only.reference_container().is_empty());
  assert_eq!(with_depth.reference_container().reference_keys(), vec![depth.key()]);
  assert!(with_depth.has_depth_attachment());
}

#[test]
fn the_default_array_object_cannot_be_deleted() {
  let (ctx, _) = context("main", Profile::Gles2);
  let default = ctx.array_object_get_default();
  assert!(default.is_default());
  assert!(matches!(ctx.array_object_delete(&default), Err(GlError::ObjectNotDeletable(_))));
  assert!(!default.is_deleted());
}

#[test]
fn objects_are_deleted_once() {
  let (ctx, driver) = context("main", Profile::Gl33);
  let buffer = ctx.array_buffer_allocate(4, UsageHint::StreamDraw).unwrap();
  ctx.array_buffer_delete(&buffer).unwrap();
  assert!(!driver.is_live(buffer.name()));

  assert!(matches!(ctx.array_buffer_delete(&buffer), Err(GlError::Deleted(_))));
  assert!(matches!(ctx.array_buffer_bind(&buffer), Err(GlError::Deleted(_))));
}

#[test]
fn undersized_implementations_are_refused() {
  init_logging();
  let driver = FakeDriver::new(Profile::Gl33).with_integer(gl::MAX_VERTEX_ATTRIBS, 8);
  assert!(matches!(
    Context::new(Box::new(driver), ContextConfig::default()),
    Err(GlError::NonCompliant(_)),
  ));

  // eight is plenty for GLES2
  let driver = FakeDriver::new(Profile::Gles2).with_integer(gl::MAX_VERTEX_ATTRIBS, 8);
  assert!(Context::new(Box::new(driver), ContextConfig::default()).is_ok());
}

#[test]
fn driver_errors_surface_as_runtime_errors() {
  let (ctx, driver) = context("main", Profile::Gl33);
  driver.push_error(gl::INVALID_OPERATION);
  match ctx.array_buffer_allocate(4, UsageHint::StaticDraw) {
    Err(GlError::Runtime { codes }) => assert_eq!(codes, vec![gl::INVALID_OPERATION]),
    other => panic!("unexpected {:?}", other.map(|buffer| buffer.key())),
  }
}

#[test]
fn an_indexed_triangle_can_be_drawn() {
  let (ctx, driver) = context("main", Profile::Gles2);
  let vs = ctx
    .shader_compile_vertex(
      "v",
      "attribute vec2 a_pos;\nvoid main(void) { gl_Position = vec4(a_pos, 0.0, 1.0); }",
    )
    .unwrap();
  let fs = ctx
    .shader_compile_fragment("f", "void main(void) { gl_FragColor = vec4(1.0); }")
    .unwrap();
  let program = ctx.program_link("p", &vs, None, &fs).unwrap();
  let location = program.attribute("a_pos").unwrap().location() as u32;

  let vertices = ctx.array_buffer_allocate_with_data(&[0; 24], UsageHint::StaticDraw).unwrap();
  let indices =
    ctx.index_buffer_allocate_with_data(IndexType::U8, &[0, 1, 2], UsageHint::StaticDraw).unwrap();
  let mut builder = ctx.array_object_new_builder();
  builder
    .set_attribute_floating_point(location, &vertices, 2, FloatingPointType::F32, false, 0, 0)
    .unwrap();
  builder.set_index_buffer(Some(&indices));
  let ao = ctx.array_object_allocate(&builder).unwrap();
  ctx.array_object_bind(&ao).unwrap();

  assert!(matches!(
    ctx.draw_elements(DrawPrimitive::Triangles),
    Err(GlError::ProgramNotActive(_)),
  ));
  ctx.program_activate(&program).unwrap();
  driver.clear_calls();
  ctx.draw_elements(DrawPrimitive::Triangles).unwrap();
  assert_eq!(
    driver.calls(),
    vec![format!("draw_elements({:#06x}, 3, {:#06x}, 0)", gl::TRIANGLES, gl::UNSIGNED_BYTE)],
  );
}
