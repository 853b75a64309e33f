use crate::impl_prelude::*;
use prelude_plus::*;

pub(crate) fn init(driver: &dyn Driver) {
  if driver.install_debug_callback() {
    trace!("debug output enabled");
  } else {
    debug!("debug output is not available on this driver");
  }
}

gl_enum!({
  pub enum DebugMessageSeverity {
    High = DEBUG_SEVERITY_HIGH,
    Medium = DEBUG_SEVERITY_MEDIUM,
    Low = DEBUG_SEVERITY_LOW,
    Notification = DEBUG_SEVERITY_NOTIFICATION,
  }
});

gl_enum!({
  pub enum DebugMessageSource {
    API = DEBUG_SOURCE_API,
    WindowSystem = DEBUG_SOURCE_WINDOW_SYSTEM,
    ShaderCompiler = DEBUG_SOURCE_SHADER_COMPILER,
    ThirdParty = DEBUG_SOURCE_THIRD_PARTY,
    Application = DEBUG_SOURCE_APPLICATION,
    Other = DEBUG_SOURCE_OTHER,
  }
});

gl_enum!({
  pub enum DebugMessageType {
    Error = DEBUG_TYPE_ERROR,
    DeprecatedBehavior = DEBUG_TYPE_DEPRECATED_BEHAVIOR,
    UndefinedBehavior = DEBUG_TYPE_UNDEFINED_BEHAVIOR,
    Portability = DEBUG_TYPE_PORTABILITY,
    Performance = DEBUG_TYPE_PERFORMANCE,
    Marker = DEBUG_TYPE_MARKER,
    PushGroup = DEBUG_TYPE_PUSH_GROUP,
    PopGroup = DEBUG_TYPE_POP_GROUP,
    Other = DEBUG_TYPE_OTHER,
  }
});

/// Renders one driver message the way it ends up in the log.
pub fn format_debug_message(
  source: u32,
  type_: u32,
  id: u32,
  severity: u32,
  message: &str,
) -> String {
  fn enum_to_string<T: fmt::Debug>(opt: Option<T>) -> String {
    match opt {
      Some(value) => format!("{:?}", value),
      None => "Unknown".to_owned(),
    }
  }

  format!(
    "0x{:08x} [source: {}, type: {}, severity: {}] {}",
    id,
    enum_to_string(DebugMessageSource::from_raw(source)),
    enum_to_string(DebugMessageType::from_raw(type_)),
    enum_to_string(DebugMessageSeverity::from_raw(severity)),
    message,
  )
}

pub(crate) extern "system" fn internal_debug_message_callback(
  source: u32,
  type_: u32,
  id: u32,
  severity: u32,
  length: i32,
  message: *const c_char,
  _user_param: *mut c_void,
) {
  if message.is_null() || length < 0 {
    return;
  }
  let message_slice = unsafe { slice::from_raw_parts(message as *const u8, length as usize) };
  let message_str = String::from_utf8_lossy(message_slice);
  debug!("{}", format_debug_message(source, type_, id, severity, &message_str));
}

impl Context {
  /// Attaches a human readable label to an object for driver diagnostics.
  /// Does nothing when the driver has no debug output.
  pub fn object_set_label<T: Object + ?Sized>(&self, object: &T, label: &str) -> GlResult<()> {
    self.check_object(object)?;

    let max_len = self.capabilities().max_debug_object_label_len as usize;
    if max_len == 0 {
      return Ok(());
    }
    if label.len() >= max_len {
      return Err(GlError::Range(format!(
        "Label of {} is {} bytes long, the implementation accepts less than {}",
        object.key(),
        label.len(),
        max_len,
      )));
    }
    if label.contains('\0') {
      return Err(GlError::Range(format!("Label of {} contains a NUL character", object.key())));
    }

    let kind = object.header().kind();
    if self.driver().object_label(kind.debug_type_id(), object.name(), label) {
      trace!("label {} as {:?}", object.key(), label);
    }
    self.checkpoint()
  }
}
