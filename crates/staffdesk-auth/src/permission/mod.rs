//! Staff permission resolution with request coalescing and caching.

mod record;
pub mod resolver;

pub use record::RecordState;
pub use resolver::{PermissionResolver, ResolveMode};
