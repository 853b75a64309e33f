use gl::types::GLenum;
use thiserror::Error;

pub type GlResult<T> = Result<T, GlError>;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum GlError {
  #[error("wrong context: {0}")]
  WrongContext(String),
  #[error("deleted: {0}")]
  Deleted(String),
  #[error("object not deletable: {0}")]
  ObjectNotDeletable(String),
  #[error("non-compliant OpenGL implementation: {0}")]
  NonCompliant(String),
  #[error("native driver reported errors: {}", describe_error_codes(.codes))]
  Runtime { codes: Vec<GLenum> },
  #[error("not bound: {0}")]
  NotBound(String),
  #[error("no depth buffer: {0}")]
  NoDepthBuffer(String),
  #[error("no stencil buffer: {0}")]
  NoStencilBuffer(String),
  #[error("index buffer already configured: {0}")]
  IndexBufferAlreadyConfigured(String),
  #[error("range check failed: {0}")]
  Range(String),
  #[error("format error: {0}")]
  Format(String),
  #[error("unsupported: {0}")]
  Unsupported(String),
  #[error("feedback loop: {0}")]
  FeedbackLoop(String),
  #[error("failed to compile shader '{name}':\n{log}")]
  ShaderCompile { name: String, log: String },
  #[error("failed to link program '{name}':\n{log}")]
  ProgramLink { name: String, log: String },
  #[error("program not active: {0}")]
  ProgramNotActive(String),
  #[error("uniform type error: {0}")]
  UniformType(String),
  #[error("query error: {0}")]
  Query(String),
}

gl_enum!({
  pub enum DriverErrorCode {
    InvalidEnum = INVALID_ENUM,
    InvalidValue = INVALID_VALUE,
    InvalidOperation = INVALID_OPERATION,
    InvalidFramebufferOperation = INVALID_FRAMEBUFFER_OPERATION,
    OutOfMemory = OUT_OF_MEMORY,
    StackUnderflow = STACK_UNDERFLOW,
    StackOverflow = STACK_OVERFLOW,
  }
});

fn describe_error_codes(codes: &[GLenum]) -> String {
  let mut result = String::new();
  for (i, &code) in codes.iter().enumerate() {
    if i > 0 {
      result.push_str(", ");
    }
    match DriverErrorCode::from_raw(code) {
      Some(known) => result.push_str(&format!("{:?} (0x{:04x})", known, code)),
      None => result.push_str(&format!("0x{:04x}", code)),
    }
  }
  result
}
