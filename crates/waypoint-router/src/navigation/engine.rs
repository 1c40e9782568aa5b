//! The navigation engine.
//!
//! [`Router`] owns the registry, the current route/location pair and the
//! history stack. Every navigation runs the same pipeline:
//!
//! 1. clear the last error and take a fresh navigation token
//! 2. notify `on_start`
//! 3. run `before_leave`, `before_enter`, then race the `before_each` guards
//! 4. drop the result if a newer navigation took the token
//! 5. follow a guard redirect or a route redirect with a nested `replace`
//! 6. otherwise commit route and location together
//! 7. report failures to `on_error`, then `on_end` if the token is still ours
//!
//! Navigations are not queued. Starting one invalidates the token of any
//! in-flight navigation, whose guards keep running but whose outcome is
//! discarded as cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{RouterError, RouterResult};
use crate::history::{HistoryStack, MemoryHistory, RouterEntry, compose_state, path_from_url};
use crate::intent::{NavigationIntent, NavigationOptions};
use crate::location::RouterLocation;
use crate::navigation::event::NavigationEvent;
use crate::navigation::guard::{Guard, GuardOutcome, run_guards};
use crate::navigation::listeners::{
	EndListener, ErrorListener, ListenerHandle, ListenerSet, StartListener,
};
use crate::registry::{Priority, RouteRegistry, RouteSelector};
use crate::resolver::{ResolveContext, ResolvedRoute, resolve};
use crate::route::{ParsedRoute, RouteDefinition};
use crate::settings::{EffectiveOptions, RouterSettings};

/// Current route and location, always read and written together.
#[derive(Debug, Clone, Default)]
pub struct RouterState {
	/// Matched route, `None` before the first navigation or on a miss.
	pub route: Option<Arc<ParsedRoute>>,
	/// Current location.
	pub location: RouterLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
	Push,
	Replace,
}

/// A failed navigation. `reported` is set once listeners have seen it, so
/// outer redirecting navigations do not report it again.
struct Failure {
	error: RouterError,
	reported: bool,
}

impl Failure {
	fn unreported(error: RouterError) -> Self {
		Self {
			error,
			reported: false,
		}
	}

	fn reported(error: RouterError) -> Self {
		Self {
			error,
			reported: true,
		}
	}
}

type Outcome = Result<RouterLocation, Failure>;

struct RouterInner {
	settings: RouterSettings,
	registry: RwLock<RouteRegistry>,
	state: RwLock<RouterState>,
	history: Arc<dyn HistoryStack>,
	generation: AtomicU64,
	in_flight: Mutex<Option<u64>>,
	last_error: Mutex<Option<RouterError>>,
	before_each: ListenerSet<Guard>,
	on_start: ListenerSet<StartListener>,
	on_end: ListenerSet<EndListener>,
	on_error: ListenerSet<ErrorListener>,
}

impl RouterInner {
	fn begin(&self) -> u64 {
		let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		*self.in_flight.lock() = Some(token);
		token
	}

	fn is_current(&self, token: u64) -> bool {
		*self.in_flight.lock() == Some(token)
	}

	/// Clears the in-flight marker if it still holds `token`.
	fn release(&self, token: u64) -> bool {
		let mut in_flight = self.in_flight.lock();
		if *in_flight == Some(token) {
			*in_flight = None;
			true
		} else {
			false
		}
	}

	/// Commits `state` only if `token` is still current.
	fn commit(&self, token: u64, state: RouterState) -> bool {
		let in_flight = self.in_flight.lock();
		if *in_flight != Some(token) {
			return false;
		}
		*self.state.write() = state;
		true
	}
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
	settings: RouterSettings,
	routes: Vec<RouteDefinition>,
	priority: Option<Priority>,
	history: Option<Arc<dyn HistoryStack>>,
}

impl RouterBuilder {
	/// Uses these settings.
	pub fn settings(mut self, settings: RouterSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Registers a route tree.
	pub fn route(mut self, route: RouteDefinition) -> Self {
		self.routes.push(route);
		self
	}

	/// Registers several route trees.
	pub fn routes(mut self, routes: impl IntoIterator<Item = RouteDefinition>) -> Self {
		self.routes.extend(routes);
		self
	}

	/// Overrides the registry sort comparator.
	pub fn priority(mut self, priority: Priority) -> Self {
		self.priority = Some(priority);
		self
	}

	/// Uses this history stack instead of a fresh [`MemoryHistory`].
	pub fn history(mut self, history: Arc<dyn HistoryStack>) -> Self {
		self.history = Some(history);
		self
	}

	/// Builds the router.
	///
	/// # Errors
	///
	/// Fails if the routes conflict or a template does not compile.
	pub fn build(self) -> RouterResult<Router> {
		let mut registry = RouteRegistry::new().with_case_sensitive(self.settings.case_sensitive);
		if let Some(priority) = self.priority {
			registry = registry.with_priority(priority);
		}
		registry.add_many(self.routes)?;

		let location = RouterLocation {
			origin: self.settings.origin.clone(),
			base: self.settings.base.clone(),
			..RouterLocation::default()
		};
		let history = self
			.history
			.unwrap_or_else(|| Arc::new(MemoryHistory::default()));

		Ok(Router {
			inner: Arc::new(RouterInner {
				settings: self.settings,
				registry: RwLock::new(registry),
				state: RwLock::new(RouterState {
					route: None,
					location,
				}),
				history,
				generation: AtomicU64::new(0),
				in_flight: Mutex::new(None),
				last_error: Mutex::new(None),
				before_each: ListenerSet::new(),
				on_start: ListenerSet::new(),
				on_end: ListenerSet::new(),
				on_error: ListenerSet::new(),
			}),
		})
	}
}

/// Client-side router.
///
/// Cheap to clone; clones share all state.
///
/// # Example
///
/// ```
/// use waypoint_router::navigation::engine::Router;
/// use waypoint_router::route::RouteDefinition;
///
/// # futures::executor::block_on(async {
/// let router = Router::builder()
/// 	.route(RouteDefinition::component("/", "Home").named("home"))
/// 	.route(RouteDefinition::component("/users/:id", "User").named("user"))
/// 	.build()
/// 	.unwrap();
///
/// let location = router.push("/users/7").await.unwrap();
/// assert_eq!(location.name.as_deref(), Some("user"));
/// assert_eq!(location.params["id"], "7");
/// # });
/// ```
#[derive(Clone)]
pub struct Router {
	inner: Arc<RouterInner>,
}

impl Router {
	/// Starts building a router.
	pub fn builder() -> RouterBuilder {
		RouterBuilder::default()
	}

	/// Router-wide settings.
	pub fn settings(&self) -> &RouterSettings {
		&self.inner.settings
	}

	/// The history stack navigations are persisted into.
	pub fn history(&self) -> Arc<dyn HistoryStack> {
		Arc::clone(&self.inner.history)
	}

	/// Non-owning reference, used by background listeners.
	pub fn downgrade(&self) -> WeakRouter {
		WeakRouter {
			inner: Arc::downgrade(&self.inner),
		}
	}

	/// Current location.
	pub fn location(&self) -> RouterLocation {
		self.inner.state.read().location.clone()
	}

	/// Current route.
	pub fn route(&self) -> Option<Arc<ParsedRoute>> {
		self.inner.state.read().route.clone()
	}

	/// Current route and location, read together.
	pub fn snapshot(&self) -> RouterState {
		self.inner.state.read().clone()
	}

	/// Whether a navigation is in flight.
	pub fn is_navigating(&self) -> bool {
		self.inner.in_flight.lock().is_some()
	}

	/// Last navigation failure, cleared when a navigation starts.
	/// Cancellations are never recorded.
	pub fn error(&self) -> Option<RouterError> {
		self.inner.last_error.lock().clone()
	}

	/// Registers a route tree.
	pub fn add_route(&self, route: RouteDefinition) -> RouterResult<()> {
		self.inner.registry.write().add(route)
	}

	/// Registers several route trees, all or nothing.
	pub fn add_routes(&self, routes: impl IntoIterator<Item = RouteDefinition>) -> RouterResult<()> {
		self.inner.registry.write().add_many(routes)
	}

	/// Removes a route. See [`RouteRegistry::remove`].
	pub fn remove_route(&self, selector: &RouteSelector) -> RouterResult<bool> {
		self.inner.registry.write().remove(selector)
	}

	/// Whether a route is registered under this name or path.
	pub fn has_route(&self, name_or_path: &str) -> bool {
		self.inner.registry.read().has(name_or_path)
	}

	/// Registered routes in resolution order.
	pub fn routes(&self) -> Vec<Arc<ParsedRoute>> {
		self.inner.registry.read().list().to_vec()
	}

	/// Adds a global guard run on every navigation.
	pub fn before_each(&self, guard: Guard) -> ListenerHandle {
		self.inner.before_each.add(Arc::new(guard))
	}

	/// Adds a listener called when a navigation starts.
	pub fn on_start<F>(&self, listener: F) -> ListenerHandle
	where
		F: Fn(&NavigationEvent) + Send + Sync + 'static,
	{
		self.inner.on_start.add(Arc::new(listener))
	}

	/// Adds a listener called when the current navigation settles.
	pub fn on_end<F>(&self, listener: F) -> ListenerHandle
	where
		F: Fn(&NavigationEvent, &RouterLocation) + Send + Sync + 'static,
	{
		self.inner.on_end.add(Arc::new(listener))
	}

	/// Adds a listener called when a navigation fails.
	pub fn on_error<F>(&self, listener: F) -> ListenerHandle
	where
		F: Fn(&RouterError, &NavigationEvent) + Send + Sync + 'static,
	{
		self.inner.on_error.add(Arc::new(listener))
	}

	/// Resolves an intent against the current location without navigating.
	pub fn resolve(&self, intent: impl Into<NavigationIntent>) -> RouterResult<ResolvedRoute> {
		let intent = intent.into();
		let options = self.inner.settings.effective(&intent.options);
		self.resolve_with(&intent, &options)
	}

	/// Navigates, adding a history entry.
	///
	/// Returns the committed location, which is the redirect target's when
	/// the navigation was redirected.
	///
	/// # Errors
	///
	/// Resolution errors, [`RouterError::History`] if the entry could not be
	/// written, [`RouterError::Aborted`] if a guard stopped it and
	/// [`RouterError::Cancelled`] if a newer navigation superseded it.
	pub async fn push(&self, intent: impl Into<NavigationIntent>) -> RouterResult<RouterLocation> {
		self.navigate(intent.into(), WriteMode::Push, 0)
			.await
			.map_err(|failure| failure.error)
	}

	/// Navigates, overwriting the current history entry.
	pub async fn replace(&self, intent: impl Into<NavigationIntent>) -> RouterResult<RouterLocation> {
		self.navigate(intent.into(), WriteMode::Replace, 0)
			.await
			.map_err(|failure| failure.error)
	}

	/// Re-runs the pipeline for the history stack's current URL without
	/// writing a new entry.
	pub async fn sync(&self) -> RouterResult<RouterLocation> {
		let settings = &self.inner.settings;
		let url = self.inner.history.current_url();
		let path = path_from_url(&url, &settings.origin, settings.hash)?;
		let restored = self
			.inner
			.history
			.current_state()
			.and_then(|state| crate::history::router_entry(&state, &settings.router_state_key));
		debug!(url = url.as_str(), path = path.as_str(), restored = restored.is_some(), "syncing with history");

		let options = settings.effective(&NavigationOptions::default());
		let intent = NavigationIntent::path(path);
		let resolved = {
			let registry = self.inner.registry.read();
			resolve(&registry, &intent, &options, &ResolveContext::default())?
		};
		self.run(resolved, options, 0)
			.await
			.map_err(|failure| failure.error)
	}

	/// Moves one entry back in history.
	pub fn back(&self) {
		self.inner.history.back();
	}

	/// Moves one entry forward in history.
	pub fn forward(&self) {
		self.inner.history.forward();
	}

	/// Moves `delta` entries in history.
	pub fn go(&self, delta: isize) {
		self.inner.history.go(delta);
	}

	fn resolve_with(&self, intent: &NavigationIntent, options: &EffectiveOptions) -> RouterResult<ResolvedRoute> {
		let context = ResolveContext {
			from: Some(self.inner.state.read().location.path.clone()).filter(|p| !p.is_empty()),
		};
		let registry = self.inner.registry.read();
		resolve(&registry, intent, options, &context)
	}

	fn navigate(&self, intent: NavigationIntent, mode: WriteMode, depth: usize) -> BoxFuture<'_, Outcome> {
		async move {
			let options = self.inner.settings.effective(&intent.options);
			let resolved = self
				.resolve_with(&intent, &options)
				.map_err(Failure::unreported)?;
			let Some(href) = resolved.href.clone() else {
				return Err(Failure::unreported(RouterError::NotFound(format!(
					"no path could be resolved for {}",
					intent.describe()
				))));
			};

			let title = resolved.title(options.name_as_title);
			let state = self
				.history_state(&resolved, &intent, &options)
				.map_err(Failure::unreported)?;
			let history = &self.inner.history;
			let written = match mode {
				WriteMode::Push => history.push_entry(state, title.as_deref(), &href).await,
				WriteMode::Replace => history.replace_entry(state, title.as_deref(), &href).await,
			};
			written.map_err(Failure::unreported)?;
			debug!(href = href.as_str(), ?mode, "history entry written");
			if let Some(title) = &title {
				self.inner.history.set_title(title);
			}

			self.run(resolved, options, depth).await
		}
		.boxed()
	}

	fn history_state(
		&self,
		resolved: &ResolvedRoute,
		intent: &NavigationIntent,
		options: &EffectiveOptions,
	) -> RouterResult<serde_json::Value> {
		let settings = &self.inner.settings;
		let entry = RouterEntry {
			name: resolved.name.clone(),
			path: resolved.path.clone(),
			href: resolved.href.clone(),
			query: resolved.query.clone(),
			params: resolved.params.clone(),
			meta: resolved
				.route
				.as_ref()
				.filter(|_| options.meta_as_state)
				.map(|route| route.meta().clone()),
		};
		compose_state(
			&entry,
			intent.state.as_ref(),
			self.inner.history.scroll_position(),
			&settings.router_state_key,
			&settings.scroll_state_key,
		)
	}

	/// Runs the pipeline for an already resolved destination.
	async fn run(&self, to: ResolvedRoute, options: EffectiveOptions, depth: usize) -> Outcome {
		*self.inner.last_error.lock() = None;
		let from = self.snapshot();
		let event = NavigationEvent::new(to, from.location.clone());
		let token = self.inner.begin();
		info!(
			id = event.id(),
			token,
			path = event.to().path.as_deref(),
			from = from.location.path.as_str(),
			"navigation started"
		);
		for listener in self.inner.on_start.snapshot() {
			listener(&event);
		}

		let outcome = match self.drive(&event, &from, &options, token, depth).await {
			Err(failure) if !failure.reported => {
				self.report(&failure.error, &event);
				Err(Failure::reported(failure.error))
			}
			other => other,
		};

		if self.inner.release(token) {
			let location = self.location();
			for listener in self.inner.on_end.snapshot() {
				listener(&event, &location);
			}
		}
		outcome
	}

	async fn drive(
		&self,
		event: &NavigationEvent,
		from: &RouterState,
		options: &EffectiveOptions,
		token: u64,
		depth: usize,
	) -> Outcome {
		let leave = from.route.as_ref().and_then(|route| route.before_leave().cloned());
		let enter = event
			.to()
			.route
			.as_ref()
			.and_then(|route| route.before_enter().cloned());
		let outcome = run_guards(event, leave, enter, self.inner.before_each.snapshot()).await;

		if !self.inner.is_current(token) {
			return Err(self.cancel(event, token));
		}

		match outcome {
			GuardOutcome::Allow => {}
			GuardOutcome::Abort(cause) => {
				let error = RouterError::Aborted {
					id: event.id().to_string(),
					cause,
				};
				warn!(id = event.id(), "navigation aborted by guard");
				event.fail(error.clone());
				return Err(Failure::unreported(error));
			}
			GuardOutcome::Redirect(target) if options.follow_guard_redirects => {
				return self
					.redirect(event, target.follow_guard_redirects(false), depth)
					.await;
			}
			GuardOutcome::Redirect(target) => {
				debug!(id = event.id(), to = target.describe(), "guard redirect ignored");
			}
		}

		if let Some(target) = event.to().route.as_ref().and_then(|route| route.redirect()) {
			return self.redirect(event, target.clone(), depth).await;
		}

		let to = event.to();
		let location = to.to_location(&self.inner.settings.origin, options.base.as_deref());
		let state = RouterState {
			route: to.route.clone(),
			location: location.clone(),
		};
		if !self.inner.commit(token, state) {
			return Err(self.cancel(event, token));
		}
		event.complete();
		info!(id = event.id(), token, path = location.path.as_str(), name = location.name.as_deref(), "navigation committed");
		Ok(location)
	}

	async fn redirect(&self, event: &NavigationEvent, target: NavigationIntent, depth: usize) -> Outcome {
		let limit = self.inner.settings.max_redirects;
		if depth >= limit {
			let error = RouterError::TooManyRedirects {
				limit,
				target: target.describe(),
			};
			event.fail(error.clone());
			return Err(Failure::unreported(error));
		}

		info!(id = event.id(), to = target.describe(), depth = depth + 1, "navigation redirected");
		match self.navigate(target.clone(), WriteMode::Replace, depth + 1).await {
			Ok(location) => {
				event.redirect(target);
				Ok(location)
			}
			Err(failure) if failure.reported => {
				event.redirect(target);
				Err(failure)
			}
			Err(failure) => {
				event.fail(failure.error.clone());
				Err(failure)
			}
		}
	}

	fn cancel(&self, event: &NavigationEvent, token: u64) -> Failure {
		info!(id = event.id(), token, "navigation cancelled");
		event.cancel(Some("superseded by a newer navigation".to_string()));
		let error = event.error().unwrap_or_else(|| RouterError::Cancelled {
			id: event.id().to_string(),
			reason: None,
		});
		Failure::reported(error)
	}

	fn report(&self, error: &RouterError, event: &NavigationEvent) {
		if error.is_cancelled() {
			return;
		}
		*self.inner.last_error.lock() = Some(error.clone());
		for listener in self.inner.on_error.snapshot() {
			listener(error, event);
		}
	}
}

impl std::fmt::Debug for Router {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.inner.registry.read().len())
			.field("location", &self.inner.state.read().location.path)
			.field("navigating", &self.is_navigating())
			.finish()
	}
}

/// Non-owning handle to a [`Router`].
#[derive(Clone)]
pub struct WeakRouter {
	inner: Weak<RouterInner>,
}

impl WeakRouter {
	/// Returns the router if it is still alive.
	pub fn upgrade(&self) -> Option<Router> {
		self.inner.upgrade().map(|inner| Router { inner })
	}
}

impl std::fmt::Debug for WeakRouter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WeakRouter")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::navigation::event::NavigationStatus;
	use rstest::{fixture, rstest};
	use std::sync::atomic::AtomicUsize;

	#[fixture]
	fn history() -> Arc<MemoryHistory> {
		Arc::new(MemoryHistory::default())
	}

	fn router_with(history: &Arc<MemoryHistory>, settings: RouterSettings) -> Router {
		Router::builder()
			.settings(settings)
			.history(Arc::clone(history) as Arc<dyn HistoryStack>)
			.routes([
				RouteDefinition::component("/", "Home").named("home"),
				RouteDefinition::component("/users/:id", "User")
					.named("user")
					.title("User :id")
					.meta("auth", true),
				RouteDefinition::component("/login", "Login").named("login"),
				RouteDefinition::redirect("/old", NavigationIntent::name("home")),
			])
			.build()
			.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_push_commits_route_and_location(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());

		// Act
		let location = router.push(NavigationIntent::name("user").with_param("id", 3)).await.unwrap();

		// Assert
		assert_eq!(location.path, "/users/3");
		assert_eq!(location.url, "http://localhost/users/3");
		let snapshot = router.snapshot();
		assert_eq!(snapshot.route.unwrap().name(), Some("user"));
		assert_eq!(snapshot.location, location);
		assert_eq!(history.len(), 2);
		assert_eq!(history.current_url(), "/users/3");
		assert_eq!(history.title().as_deref(), Some("User 3"));
		assert!(!router.is_navigating());
	}

	#[rstest]
	#[tokio::test]
	async fn test_history_state_payload(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default().with_meta_as_state(true));
		history.set_scroll_position(crate::history::ScrollPosition { x: 0.0, y: 40.0 });

		// Act
		router
			.push(NavigationIntent::path("/users/9").with_state(serde_json::json!({"from": "list"})))
			.await
			.unwrap();

		// Assert
		let state = history.current_state().unwrap();
		assert_eq!(state["from"], "list");
		assert_eq!(state["__router__"]["name"], "user");
		assert_eq!(state["__router__"]["params"]["id"], "9");
		assert_eq!(state["__router__"]["meta"]["auth"], true);
		assert_eq!(state["__scroll__"]["y"], 40.0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_replace_does_not_grow_history(history: Arc<MemoryHistory>) {
		let router = router_with(&history, RouterSettings::default());
		router.replace("/login").await.unwrap();
		assert_eq!(history.len(), 1);
		assert_eq!(router.location().name.as_deref(), Some("login"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_route_redirect(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());
		let statuses = Arc::new(Mutex::new(Vec::new()));
		let seen = Arc::clone(&statuses);
		router.on_end(move |event, _| seen.lock().push((event.to().path.clone(), event.status())));

		// Act
		let location = router.push("/old").await.unwrap();

		// Assert
		assert_eq!(location.name.as_deref(), Some("home"));
		assert_eq!(history.len(), 2);
		assert_eq!(history.current_url(), "/");
		assert_eq!(
			*statuses.lock(),
			vec![(Some("/".to_string()), NavigationStatus::Completed)]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_redirect_followed_once(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());
		router.before_each(Guard::sync(|event| {
			(event.to().name.as_deref() == Some("user")).then(|| NavigationIntent::name("login"))
		}));

		// Act
		let location = router.push("/users/1").await.unwrap();

		// Assert
		assert_eq!(location.name.as_deref(), Some("login"));
		assert_eq!(history.current_url(), "/login");
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_redirect_ignored_when_disabled(history: Arc<MemoryHistory>) {
		let router = router_with(
			&history,
			RouterSettings::default().with_follow_guard_redirects(false),
		);
		router.before_each(Guard::sync(|_| NavigationIntent::name("login")));

		let location = router.push("/users/1").await.unwrap();

		assert_eq!(location.name.as_deref(), Some("user"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_loop_stops_after_one_redirect(history: Arc<MemoryHistory>) {
		// A guard redirecting every navigation is followed once only.
		let router = router_with(&history, RouterSettings::default());
		router.before_each(Guard::sync(|event| {
			(event.to().name.as_deref() != Some("home")).then(|| NavigationIntent::path("/login"))
		}));

		let location = router.push("/users/1").await.unwrap();

		assert_eq!(location.path, "/login");
	}

	#[rstest]
	#[tokio::test]
	async fn test_redirect_limit(history: Arc<MemoryHistory>) {
		// Arrange
		let router = Router::builder()
			.settings(RouterSettings::default().with_max_redirects(2))
			.history(Arc::clone(&history) as Arc<dyn HistoryStack>)
			.routes([
				RouteDefinition::redirect("/a", "/b"),
				RouteDefinition::redirect("/b", "/c"),
				RouteDefinition::redirect("/c", "/a"),
			])
			.build()
			.unwrap();
		let errors = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&errors);
		router.on_error(move |_, _| {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		// Act
		let result = router.push("/a").await;

		// Assert
		assert!(matches!(result, Err(RouterError::TooManyRedirects { limit: 2, .. })));
		assert_eq!(errors.load(Ordering::SeqCst), 1);
		assert!(router.route().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_abort_keeps_state_and_reports(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());
		router.push("/").await.unwrap();
		let reported = Arc::new(Mutex::new(None));
		let slot = Arc::clone(&reported);
		router.on_error(move |error, event| {
			*slot.lock() = Some((error.is_aborted(), event.status()));
		});
		router.before_each(Guard::sync(|_| true));

		// Act
		let result = router.push("/login").await;

		// Assert
		assert!(result.is_err_and(|e| e.is_aborted()));
		assert_eq!(router.location().path, "/");
		assert_eq!(*reported.lock(), Some((true, NavigationStatus::Failed)));
		assert!(router.error().is_some_and(|e| e.is_aborted()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_error_cleared_on_next_navigation(history: Arc<MemoryHistory>) {
		let router = router_with(&history, RouterSettings::default());
		let handle = router.before_each(Guard::sync(|_| true));
		let _ = router.push("/login").await;
		assert!(router.error().is_some());

		assert!(handle.unsubscribe());
		router.push("/login").await.unwrap();
		assert!(router.error().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_route_guards_leave_then_enter(history: Arc<MemoryHistory>) {
		// Arrange
		let order = Arc::new(Mutex::new(Vec::new()));
		let (leave_log, enter_log) = (Arc::clone(&order), Arc::clone(&order));
		let router = Router::builder()
			.history(Arc::clone(&history) as Arc<dyn HistoryStack>)
			.routes([
				RouteDefinition::component("/a", "A").before_leave(Guard::sync(move |_| {
					leave_log.lock().push("leave a");
				})),
				RouteDefinition::component("/b", "B").before_enter(Guard::sync(move |_| {
					enter_log.lock().push("enter b");
				})),
			])
			.build()
			.unwrap();
		router.push("/a").await.unwrap();

		// Act
		router.push("/b").await.unwrap();

		// Assert
		assert_eq!(*order.lock(), vec!["leave a", "enter b"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_listener_order(history: Arc<MemoryHistory>) {
		let router = router_with(&history, RouterSettings::default());
		let log = Arc::new(Mutex::new(Vec::new()));
		let (start, end) = (Arc::clone(&log), Arc::clone(&log));
		router.on_start(move |event| start.lock().push(format!("start {}", event.status())));
		router.on_end(move |event, location| end.lock().push(format!("end {} {}", event.status(), location.path)));

		router.push("/login").await.unwrap();

		assert_eq!(*log.lock(), vec!["start active", "end completed /login"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_name_cannot_be_pushed(history: Arc<MemoryHistory>) {
		let router = router_with(&history, RouterSettings::default());

		let resolved = router.resolve(NavigationIntent::name("missing")).unwrap();
		let pushed = router.push(NavigationIntent::name("missing")).await;

		assert!(resolved.route.is_none());
		assert!(pushed.is_err_and(|e| e.is_not_found()));
		assert_eq!(history.len(), 1);
	}

	#[rstest]
	#[case(NavigationIntent::name("archive"), "/archive", None)]
	#[case(NavigationIntent::name("archive").with_param("year", 2024), "/archive/2024", Some("2024"))]
	#[tokio::test]
	async fn test_push_by_name_to_optional_param_route(
		history: Arc<MemoryHistory>,
		#[case] intent: NavigationIntent,
		#[case] expected_path: &str,
		#[case] expected_year: Option<&str>,
	) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());
		router
			.add_route(RouteDefinition::component("/archive/:year:?", "Archive").named("archive"))
			.unwrap();

		// Act
		let location = router.push(intent).await.unwrap();

		// Assert
		assert_eq!(location.path, expected_path);
		assert_eq!(location.name.as_deref(), Some("archive"));
		assert_eq!(location.params.get("year").map(String::as_str), expected_year);
		assert_eq!(history.current_url(), expected_path);
	}

	#[rstest]
	#[tokio::test]
	async fn test_push_by_name_to_wildcard_route(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());
		router
			.add_route(RouteDefinition::component("/docs/*", "Docs").named("docs"))
			.unwrap();

		// Act
		let location = router
			.push(NavigationIntent::name("docs").with_wildcard(0, "guide/intro"))
			.await
			.unwrap();

		// Assert
		assert_eq!(location.path, "/docs/guide/intro");
		assert_eq!(location.wildcards.get(&0).map(String::as_str), Some("guide/intro"));
	}

	#[rstest]
	#[case(true, Some("login"))]
	#[case(false, None)]
	#[tokio::test]
	async fn test_route_name_as_title_fallback(
		history: Arc<MemoryHistory>,
		#[case] name_as_title: bool,
		#[case] expected: Option<&str>,
	) {
		// Arrange
		let router = router_with(&history, RouterSettings::default().with_name_as_title(name_as_title));

		// Act
		router.push(NavigationIntent::name("login")).await.unwrap();

		// Assert
		assert_eq!(history.title().as_deref(), expected);
		let entry = history.entries().pop().unwrap();
		assert_eq!(entry.title.as_deref(), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_relative_push(history: Arc<MemoryHistory>) {
		let router = router_with(&history, RouterSettings::default());
		router.push("/users/1").await.unwrap();

		let location = router.push("../login").await.unwrap();

		assert_eq!(location.path, "/users/login");
	}

	#[rstest]
	#[tokio::test]
	async fn test_sync_reads_history_without_writing(history: Arc<MemoryHistory>) {
		// Arrange
		let router = router_with(&history, RouterSettings::default());
		router.push("/users/5").await.unwrap();
		router.push("/login").await.unwrap();
		router.back();

		// Act
		let location = router.sync().await.unwrap();

		// Assert
		assert_eq!(location.path, "/users/5");
		assert_eq!(router.location().params.get("id").map(String::as_str), Some("5"));
		assert_eq!(history.len(), 3);
	}

	#[rstest]
	#[tokio::test]
	async fn test_registry_changes_through_router(history: Arc<MemoryHistory>) {
		let router = router_with(&history, RouterSettings::default());

		router
			.add_route(RouteDefinition::component("/about", "About").named("about"))
			.unwrap();
		assert!(router.has_route("about"));
		assert!(matches!(
			router.add_route(RouteDefinition::component("/about", "Dup")),
			Err(RouterError::PathConflict(_))
		));
		assert!(router.remove_route(&RouteSelector::name("about")).unwrap());
		assert!(!router.has_route("/about"));
		assert_eq!(router.routes().len(), 4);
	}

	#[rstest]
	fn test_weak_router() {
		let router = Router::builder().build().unwrap();
		let weak = router.downgrade();
		assert!(weak.upgrade().is_some());
		drop(router);
		assert!(weak.upgrade().is_none());
	}
}
