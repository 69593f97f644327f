//! Session lifecycle: state store, bootstrap, event handling and the
//! service tying them together.

pub mod bootstrap;
pub mod reactor;
pub mod service;
pub mod store;

pub use bootstrap::{BootstrapLatch, BootstrapSequencer};
pub use reactor::{EventReactor, PendingSignIns, Subscription};
pub use service::{Credentials, SessionService};
pub use store::{AuthSnapshot, SessionStore};
