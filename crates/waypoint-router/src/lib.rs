//! Route matching and navigation engine for client-side routing.
//!
//! ## Overview
//!
//! - [`pattern`]: path templates (`/users/:id`, `/:{number}:page:?`, `/*`)
//!   compiled into prefix and strict matchers
//! - [`registry`]: routes keyed by path and name, sorted for resolution
//! - [`resolver`]: intents turned into concrete destinations
//! - [`navigation`]: the [`Router`] with its guard pipeline, cancellation and
//!   redirects
//! - [`history`]: the history stack the router persists into, plus an
//!   in-memory implementation and a resync task
//!
//! ## Example
//!
//! ```
//! use waypoint_router::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let router = Router::builder()
//! 	.route(RouteDefinition::component("/", "Home").named("home"))
//! 	.route(RouteDefinition::component("/admin", "Admin"))
//! 	.route(RouteDefinition::redirect("/start", NavigationIntent::name("home")))
//! 	.build()
//! 	.unwrap();
//!
//! router.before_each(Guard::sync(|event| {
//! 	event.to().path.as_deref() == Some("/admin")
//! }));
//!
//! let location = router.push("/start").await.unwrap();
//! assert_eq!(location.name.as_deref(), Some("home"));
//!
//! let denied = router.push("/admin").await;
//! assert!(denied.is_err_and(|e| e.is_aborted()));
//! # });
//! ```

pub mod error;
pub mod history;
pub mod intent;
pub mod location;
pub mod navigation;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod route;
pub mod settings;

pub use error::{ErrorKind, RouterError, RouterResult};
pub use history::{HistoryEvent, HistoryStack, HistorySync, MemoryHistory};
pub use intent::{NavigationIntent, NavigationOptions};
pub use location::RouterLocation;
pub use navigation::{
	Guard, GuardOutcome, ListenerHandle, NavigationEvent, NavigationStatus, Router, RouterBuilder,
};
pub use pattern::PathMatcher;
pub use registry::{RouteRegistry, RouteSelector};
pub use resolver::ResolvedRoute;
pub use route::{ComponentKey, ParsedRoute, RouteDefinition, RouteTarget};
pub use settings::{ListenMode, RouterSettings};

/// Common imports.
pub mod prelude {
	pub use crate::error::{RouterError, RouterResult};
	pub use crate::history::{HistoryStack, HistorySync, MemoryHistory};
	pub use crate::intent::NavigationIntent;
	pub use crate::navigation::{Guard, NavigationEvent, NavigationStatus, Router};
	pub use crate::route::RouteDefinition;
	pub use crate::settings::{ListenMode, RouterSettings};
}
