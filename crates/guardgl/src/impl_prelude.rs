pub use crate::check::check_usable;
pub use crate::context::Context;
pub use crate::driver::{Driver, Profile};
pub use crate::error::{GlError, GlResult};
pub use crate::object::{ContextId, ObjectHeader, ObjectKey, ObjectKind, SharingClass};
pub use crate::reference::{Composite, ReferenceContainer, ReferringContainers};
pub use crate::traits::{Object, Referable, Usable};
pub use ::gl::types::*;
