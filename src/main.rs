use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::video::{GLProfile, Window};

use guardgl::*;
use prelude_plus::*;

const FLOATS_PER_VERTEX: usize = 2 + 3;

#[rustfmt::skip]
const VERTEX_DATA: [f32; FLOATS_PER_VERTEX * 3] = [
  // x     y      r    g    b
   0.0,  0.5,   1.0, 0.0, 0.0,
   0.5, -0.5,   0.0, 1.0, 0.0,
  -0.5, -0.5,   0.0, 0.0, 1.0,
];
const ELEMENT_DATA: [u16; 3] = [0, 1, 2];

const GLES2_VS_SRC: &str = include_str!("shaders/triangle.gles2.vert");
const GLES2_FS_SRC: &str = include_str!("shaders/triangle.gles2.frag");
const GL33_VS_SRC: &str = include_str!("shaders/triangle.gl33.vert");
const GL33_FS_SRC: &str = include_str!("shaders/triangle.gl33.frag");

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  if let Err(e) = try_main() {
    error!("{:?}", e);
    std::process::exit(1);
  }
}

fn profile_from_env() -> AnyResult<Profile> {
  match env::var("GUARDGL_PROFILE") {
    Ok(value) => match value.as_str() {
      "gles2" => Ok(Profile::Gles2),
      "gl33" => Ok(Profile::Gl33),
      _ => bail!("Unknown GUARDGL_PROFILE '{}', expected 'gles2' or 'gl33'", value),
    },
    Err(env::VarError::NotPresent) => Ok(Profile::Gles2),
    Err(e) => Err(e).context("Failed to read GUARDGL_PROFILE"),
  }
}

fn try_main() -> AnyResult<()> {
  let profile = profile_from_env()?;

  let sdl_context = sdl2::init().map_err(|e| format_err!("Failed to initialize SDL: {}", e))?;
  let video_subsystem =
    sdl_context.video().map_err(|e| format_err!("Failed to initialize SDL video: {}", e))?;

  let gl_attr = video_subsystem.gl_attr();
  match profile {
    Profile::Gles2 => {
      gl_attr.set_context_profile(GLProfile::GLES);
      gl_attr.set_context_version(2, 0);
    }
    Profile::Gl33 => {
      gl_attr.set_context_profile(GLProfile::Core);
      gl_attr.set_context_version(3, 3);
    }
  }
  gl_attr.set_context_flags().debug().set();

  let window_title = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));
  let window = video_subsystem
    .window(window_title, 800, 600)
    .resizable()
    .opengl()
    .allow_highdpi()
    .build()
    .context("Failed to create the window")?;

  let _sdl_gl_ctx = window
    .gl_create_context()
    .map_err(|e| format_err!("Failed to create an OpenGL context: {}", e))?;

  let load = |name: &'static str| video_subsystem.gl_get_proc_address(name) as *const c_void;
  let driver: Box<dyn Driver> = match profile {
    Profile::Gles2 => Box::new(Gles2Driver::load_with(load)),
    Profile::Gl33 => Box::new(Gl33Driver::load_with(load)),
  };
  let gl = Context::new(driver, ContextConfig { name: "window".to_owned(), ..Default::default() })
    .context("Failed to set up the OpenGL context")?;

  let mut event_pump =
    sdl_context.event_pump().map_err(|e| format_err!("Failed to get the event pump: {}", e))?;

  let (vs_src, fs_src) = match profile {
    Profile::Gles2 => (GLES2_VS_SRC, GLES2_FS_SRC),
    Profile::Gl33 => (GL33_VS_SRC, GL33_FS_SRC),
  };
  let vs = gl.shader_compile_vertex("triangle.vert", vs_src)?;
  let fs = gl.shader_compile_fragment("triangle.frag", fs_src)?;
  let program = gl.program_link("triangle", &vs, None, &fs)?;
  // the shaders are no longer needed once the program is linked
  gl.shader_delete_vertex(&vs)?;
  gl.shader_delete_fragment(&fs)?;

  let attribute_location = |name: &str| -> AnyResult<u32> {
    let attribute =
      program.attribute(name).ok_or_else(|| format_err!("Attribute '{}' is not active", name))?;
    u32::try_from(attribute.location())
      .with_context(|| format!("Attribute '{}' has no location", name))
  };
  let uniform_time = program.uniform("u_time").cloned();

  let vertex_bytes: Vec<u8> = VERTEX_DATA.iter().flat_map(|x| x.to_ne_bytes()).collect();
  let element_bytes: Vec<u8> = ELEMENT_DATA.iter().flat_map(|x| x.to_ne_bytes()).collect();

  let vbo = gl.array_buffer_allocate_with_data(&vertex_bytes, UsageHint::StaticDraw)?;
  let ibo =
    gl.index_buffer_allocate_with_data(IndexType::U16, &element_bytes, UsageHint::StaticDraw)?;

  let float_size = mem::size_of::<f32>();
  let stride = (FLOATS_PER_VERTEX * float_size) as u32;
  let mut builder = gl.array_object_new_builder();
  builder.set_attribute_floating_point(
    attribute_location("a_pos")?,
    &vbo,
    2,
    FloatingPointType::F32,
    false,
    stride,
    0,
  )?;
  builder.set_attribute_floating_point(
    attribute_location("a_color")?,
    &vbo,
    3,
    FloatingPointType::F32,
    false,
    stride,
    2 * float_size,
  )?;
  builder.set_index_buffer(Some(&ibo));
  let vao = gl.array_object_allocate(&builder)?;
  gl.array_object_bind(&vao)?;

  let frame_query =
    if gl.supports_timer_queries() { Some(gl.timer_query_allocate()?) } else { None };
  let mut frame_query_running = false;

  let clear = ClearSpec { color: Some([0.0, 0.0, 0.0, 1.0]), ..Default::default() };
  reset_viewport(&gl, &window)?;

  let start_time = Instant::now();
  'running: loop {
    for event in event_pump.poll_iter() {
      match event {
        Event::Quit { .. } | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => {
          break 'running;
        }

        Event::Window { win_event: WindowEvent::SizeChanged(..), .. } => {
          reset_viewport(&gl, &window)?;
        }

        _ => {}
      }
    }

    if let Some(query) = &frame_query {
      if frame_query_running && gl.timer_query_result_is_available(query)? {
        let nanos = gl.timer_query_result_nanos(query)?;
        trace!("frame took {:.3} ms on the GPU", nanos as f64 / 1e6);
      }
      gl.timer_query_begin(query)?;
      frame_query_running = true;
    }

    gl.clear(&clear)?;
    gl.program_activate(&program)?;
    if let Some(uniform_time) = &uniform_time {
      gl.uniform_put_f32(uniform_time, start_time.elapsed().as_secs_f32())?;
    }
    gl.draw_elements(DrawPrimitive::Triangles)?;

    if let Some(query) = &frame_query {
      gl.timer_query_finish(query)?;
    }

    window.gl_swap_window();
  }

  if let Some(query) = &frame_query {
    gl.timer_query_delete(query)?;
  }
  gl.array_object_delete(&vao)?;
  gl.index_buffer_delete(&ibo)?;
  gl.array_buffer_delete(&vbo)?;
  gl.program_delete(&program)?;

  Ok(())
}

fn reset_viewport(gl: &Context, window: &Window) -> AnyResult<()> {
  let (w, h) = window.drawable_size();
  gl.viewport_set(0, 0, w, h)?;
  Ok(())
}
