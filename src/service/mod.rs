//! Service descriptors and the values flowing through them

mod arguments;
mod dependency;
mod descriptor;
mod instance;
mod tag;

pub use arguments::{Argument, Arguments};
pub use dependency::{DeclaredType, Dependency, DependencyKind};
pub use descriptor::Service;
pub use instance::Instance;
pub use tag::{Marker, ServiceTag, TagOption};
