use gl_generator::{Api, DebugStructGenerator, Fallbacks, Profile, Registry, StructGenerator};
use std::env;
use std::fs::File;
use std::path::Path;

fn write_bindings(registry: Registry, dest: &Path, file_name: &str) {
  let mut file = File::create(&dest.join(file_name)).unwrap();

  // cfg!(feature) doesn't see the features of the crate being built from
  // inside of a build script
  if env::var_os("CARGO_FEATURE_DEBUG_ALL_COMMANDS").is_some() {
    registry.write_bindings(DebugStructGenerator, &mut file)
  } else {
    registry.write_bindings(StructGenerator, &mut file)
  }
  .unwrap();
}

fn main() {
  let dest = env::var("OUT_DIR").unwrap();
  let dest = Path::new(&dest);

  write_bindings(
    Registry::new(
      Api::Gles2,
      (2, 0),
      Profile::Core,
      Fallbacks::All,
      ["GL_KHR_debug", "GL_OES_vertex_array_object", "GL_EXT_disjoint_timer_query"],
    ),
    dest,
    "gles2_bindings.rs",
  );

  write_bindings(
    Registry::new(Api::Gl, (3, 3), Profile::Core, Fallbacks::All, ["GL_KHR_debug"]),
    dest,
    "gl33_bindings.rs",
  );

  println!("cargo:rerun-if-changed=build.rs");
}
