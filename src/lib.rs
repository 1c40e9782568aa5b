//! # Waypoint
//!
//! Client-side route resolution and navigation.
//!
//! Waypoint matches requested destinations against a registry of path
//! templates, computes concrete URLs, and runs navigations through an
//! asynchronous guard pipeline that keeps the current route consistent when
//! navigations overlap.
//!
//! ## Quick Example
//!
//! ```
//! use waypoint::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let router = Router::builder()
//! 	.route(RouteDefinition::component("/users/:id", "UserDetail").named("user"))
//! 	.build()
//! 	.unwrap();
//!
//! let location = router
//! 	.push(NavigationIntent::name("user").with_param("id", 42))
//! 	.await
//! 	.unwrap();
//! assert_eq!(location.href, "/users/42");
//! # });
//! ```
//!
//! ## Crates
//!
//! - `waypoint-router`: matcher, registry, resolver, navigation engine and
//!   history adapters, re-exported at the root and under [`router`]

pub use waypoint_router as router;

pub use waypoint_router::{
	ComponentKey, ErrorKind, Guard, GuardOutcome, HistoryEvent, HistoryStack, HistorySync,
	ListenMode, ListenerHandle, MemoryHistory, NavigationEvent, NavigationIntent,
	NavigationOptions, NavigationStatus, ParsedRoute, PathMatcher, ResolvedRoute, RouteDefinition,
	RouteRegistry, RouteSelector, RouteTarget, Router, RouterBuilder, RouterError, RouterLocation,
	RouterResult, RouterSettings,
};

/// Common imports for applications using the router.
pub mod prelude {
	pub use crate::{
		Guard, GuardOutcome, HistoryStack, HistorySync, ListenMode, MemoryHistory, NavigationEvent,
		NavigationIntent, NavigationStatus, RouteDefinition, Router, RouterError, RouterLocation,
		RouterResult, RouterSettings,
	};

	// External
	pub use async_trait::async_trait;
}
