//! Route definitions and their registered, compiled form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RouterResult;
use crate::intent::{NavigationIntent, Query};
use crate::navigation::guard::Guard;
use crate::pattern::{Params, PathMatcher};

/// Opaque key/value bag attached to a route.
pub type Meta = Map<String, Value>;

/// Reference to a view component, interpreted by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
	/// Creates a component key.
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ComponentKey {
	fn from(key: &str) -> Self {
		Self::new(key)
	}
}

/// What a route renders, or where it sends the user instead.
#[derive(Debug, Clone)]
pub enum RouteTarget {
	/// A single component.
	Component(ComponentKey),
	/// Named components, one per outlet.
	Components(BTreeMap<String, ComponentKey>),
	/// Navigating here redirects to another destination.
	Redirect(NavigationIntent),
}

/// A user-authored route.
///
/// The target is chosen by constructor, so a route can never carry both a
/// component and a redirect.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
	path: String,
	name: Option<String>,
	title: Option<String>,
	meta: Meta,
	query: Query,
	params: Params,
	children: Vec<RouteDefinition>,
	before_enter: Option<Guard>,
	before_leave: Option<Guard>,
	target: RouteTarget,
}

impl RouteDefinition {
	fn with_target(path: impl Into<String>, target: RouteTarget) -> Self {
		Self {
			path: path.into(),
			name: None,
			title: None,
			meta: Meta::new(),
			query: Query::new(),
			params: Params::new(),
			children: Vec::new(),
			before_enter: None,
			before_leave: None,
			target,
		}
	}

	/// Route rendering a single component.
	pub fn component(path: impl Into<String>, component: impl Into<ComponentKey>) -> Self {
		Self::with_target(path, RouteTarget::Component(component.into()))
	}

	/// Route rendering named components.
	pub fn components<I, K, C>(path: impl Into<String>, components: I) -> Self
	where
		I: IntoIterator<Item = (K, C)>,
		K: Into<String>,
		C: Into<ComponentKey>,
	{
		let components = components
			.into_iter()
			.map(|(name, component)| (name.into(), component.into()))
			.collect();
		Self::with_target(path, RouteTarget::Components(components))
	}

	/// Route redirecting to another destination.
	pub fn redirect(path: impl Into<String>, to: impl Into<NavigationIntent>) -> Self {
		Self::with_target(path, RouteTarget::Redirect(to.into()))
	}

	/// Sets the route name.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Sets the title template (`:param` tokens are substituted).
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	/// Adds a meta entry.
	pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Adds a default query value.
	pub fn default_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key.into(), value.into());
		self
	}

	/// Adds a default param value.
	pub fn default_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.params.insert(key.into(), value.to_string());
		self
	}

	/// Appends child routes; their paths are joined to this route's path.
	pub fn children(mut self, children: impl IntoIterator<Item = RouteDefinition>) -> Self {
		self.children.extend(children);
		self
	}

	/// Guard run when navigating into this route.
	pub fn before_enter(mut self, guard: Guard) -> Self {
		self.before_enter = Some(guard);
		self
	}

	/// Guard run when navigating away from this route.
	pub fn before_leave(mut self, guard: Guard) -> Self {
		self.before_leave = Some(guard);
		self
	}

	/// Returns the path template as written.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Flattens this definition and its descendants, parents first.
	pub(crate) fn flatten(self) -> RouterResult<Vec<ParsedRoute>> {
		let mut flattened = Vec::new();
		let mut pending = vec![(self, None::<String>)];

		while let Some((mut definition, parent)) = pending.pop() {
			let path = match &parent {
				Some(parent) => join_paths(parent, &definition.path),
				None => definition.path.clone(),
			};
			let children = std::mem::take(&mut definition.children);
			let route = ParsedRoute::new(definition, &path, parent)?;
			let own_path = route.path().to_string();

			// Reverse keeps sibling order once popped.
			for child in children.into_iter().rev() {
				pending.push((child, Some(own_path.clone())));
			}
			flattened.push(route);
		}
		Ok(flattened)
	}
}

fn join_paths(parent: &str, child: &str) -> String {
	format!(
		"{}/{}",
		parent.trim_end_matches('/'),
		child.trim_start_matches('/')
	)
}

/// A registered route: a definition plus its compiled matcher and the path
/// of its parent, if it was registered as a child.
#[derive(Debug, Clone)]
pub struct ParsedRoute {
	name: Option<String>,
	title: Option<String>,
	meta: Meta,
	query: Query,
	params: Params,
	before_enter: Option<Guard>,
	before_leave: Option<Guard>,
	target: RouteTarget,
	matcher: PathMatcher,
	parent: Option<String>,
}

impl ParsedRoute {
	fn new(definition: RouteDefinition, path: &str, parent: Option<String>) -> RouterResult<Self> {
		Ok(Self {
			matcher: PathMatcher::compile(path)?,
			name: definition.name,
			title: definition.title,
			meta: definition.meta,
			query: definition.query,
			params: definition.params,
			before_enter: definition.before_enter,
			before_leave: definition.before_leave,
			target: definition.target,
			parent,
		})
	}

	/// Returns the normalized full path template.
	pub fn path(&self) -> &str {
		self.matcher.template()
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the title template.
	pub fn title(&self) -> Option<&str> {
		self.title.as_deref()
	}

	/// Returns the meta bag.
	pub fn meta(&self) -> &Meta {
		&self.meta
	}

	/// Returns the default query values.
	pub fn default_query(&self) -> &Query {
		&self.query
	}

	/// Returns the default param values.
	pub fn default_params(&self) -> &Params {
		&self.params
	}

	/// Returns the route target.
	pub fn target(&self) -> &RouteTarget {
		&self.target
	}

	/// Returns the redirect destination, if this route redirects.
	pub fn redirect(&self) -> Option<&NavigationIntent> {
		match &self.target {
			RouteTarget::Redirect(to) => Some(to),
			_ => None,
		}
	}

	/// Returns the compiled matcher.
	pub fn matcher(&self) -> &PathMatcher {
		&self.matcher
	}

	/// Returns the parent route path.
	pub fn parent(&self) -> Option<&str> {
		self.parent.as_deref()
	}

	pub(crate) fn before_enter(&self) -> Option<&Guard> {
		self.before_enter.as_ref()
	}

	pub(crate) fn before_leave(&self) -> Option<&Guard> {
		self.before_leave.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_component_route() {
		let route = RouteDefinition::component("/", "Home").named("home");
		assert_eq!(route.name(), Some("home"));
		assert_eq!(route.path(), "/");
	}

	#[rstest]
	fn test_flatten_joins_child_paths() {
		// Arrange
		let tree = RouteDefinition::component("/parent", "Parent")
			.named("parent")
			.children([
				RouteDefinition::component("/a", "A").named("a"),
				RouteDefinition::component("b/", "B")
					.children([RouteDefinition::component("/:id", "Leaf").named("leaf")]),
			]);

		// Act
		let flattened = tree.flatten().unwrap();
		let paths: Vec<&str> = flattened.iter().map(ParsedRoute::path).collect();

		// Assert
		assert_eq!(paths, vec!["/parent", "/parent/a", "/parent/b", "/parent/b/:id"]);
		assert_eq!(flattened[0].parent(), None);
		assert_eq!(flattened[1].parent(), Some("/parent"));
		assert_eq!(flattened[3].parent(), Some("/parent/b"));
	}

	#[rstest]
	fn test_flatten_fails_on_invalid_child() {
		let tree = RouteDefinition::component("/parent", "Parent")
			.children([RouteDefinition::component("/:{float}:x", "Bad")]);
		assert!(tree.flatten().is_err());
	}

	#[rstest]
	fn test_redirect_target() {
		let route = RouteDefinition::redirect("/old", "/new")
			.flatten()
			.unwrap()
			.remove(0);
		assert_eq!(
			route.redirect().and_then(|to| to.path.as_deref()),
			Some("/new")
		);
	}

	#[rstest]
	fn test_named_components() {
		let route = RouteDefinition::components("/dash", [("main", "Dash"), ("side", "Nav")]);
		match route.flatten().unwrap()[0].target() {
			RouteTarget::Components(map) => {
				assert_eq!(map.get("side").map(ComponentKey::as_str), Some("Nav"));
			}
			other => panic!("unexpected target {other:?}"),
		}
	}
}
