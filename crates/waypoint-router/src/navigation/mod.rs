//! Navigation lifecycle: events, guards, listeners and the engine driving them.

pub mod engine;
pub mod event;
pub mod guard;
pub mod listeners;

pub use engine::{Router, RouterBuilder, RouterState, WeakRouter};
pub use event::{NavigationEvent, NavigationStatus};
pub use guard::{Guard, GuardOutcome, IntoGuardOutcome};
pub use listeners::ListenerHandle;
