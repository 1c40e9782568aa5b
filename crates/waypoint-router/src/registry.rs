//! Route storage keyed by path and name.
//!
//! Routes are kept in a flat path-keyed arena. Child routes hold the path of
//! their parent, so ancestor lookups walk parent keys instead of a cyclic
//! object graph.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RouterError, RouterResult};
use crate::pattern::normalize_template;
use crate::route::{ParsedRoute, RouteDefinition};

/// Sort comparator used by [`RouteRegistry::list`].
pub type Priority = Arc<dyn Fn(&ParsedRoute, &ParsedRoute) -> Ordering + Send + Sync>;

/// Default ordering: longer templates first, static templates before
/// templates with params of the same length, then descending lexical order.
pub fn default_priority(a: &ParsedRoute, b: &ParsedRoute) -> Ordering {
	b.path()
		.len()
		.cmp(&a.path().len())
		.then_with(|| b.matcher().is_static().cmp(&a.matcher().is_static()))
		.then_with(|| b.path().cmp(a.path()))
}

/// Selects a registered route by name, path, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSelector {
	/// Route name.
	pub name: Option<String>,
	/// Route path template.
	pub path: Option<String>,
}

impl RouteSelector {
	/// Selects by name.
	pub fn name(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			path: None,
		}
	}

	/// Selects by path.
	pub fn path(path: impl Into<String>) -> Self {
		Self {
			name: None,
			path: Some(path.into()),
		}
	}

	/// Selects by name and path, which must designate the same route.
	pub fn both(name: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			path: Some(path.into()),
		}
	}
}

/// Registered routes.
pub struct RouteRegistry {
	by_path: HashMap<String, Arc<ParsedRoute>>,
	by_name: HashMap<String, String>,
	case_sensitive: bool,
	priority: Priority,
	sorted: Vec<Arc<ParsedRoute>>,
}

impl RouteRegistry {
	/// Creates an empty registry with case-insensitive names.
	pub fn new() -> Self {
		Self {
			by_path: HashMap::new(),
			by_name: HashMap::new(),
			case_sensitive: false,
			priority: Arc::new(default_priority),
			sorted: Vec::new(),
		}
	}

	/// Makes name lookups case-sensitive (or not). Existing names are re-keyed.
	pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
		self.case_sensitive = case_sensitive;
		self.rebuild_name_index();
		self
	}

	/// Replaces the sort comparator.
	pub fn with_priority(mut self, priority: Priority) -> Self {
		self.priority = priority;
		self.resort();
		self
	}

	/// Whether name lookups are case-sensitive.
	pub fn is_case_sensitive(&self) -> bool {
		self.case_sensitive
	}

	/// Registers a route and its children.
	///
	/// # Errors
	///
	/// Fails with [`RouterError::NameConflict`] or [`RouterError::PathConflict`]
	/// if any route of the tree collides with a registered route or with
	/// another route of the same tree. Nothing is inserted on failure.
	pub fn add(&mut self, route: RouteDefinition) -> RouterResult<()> {
		self.add_many([route])
	}

	/// Registers several route trees at once, all or nothing.
	pub fn add_many(&mut self, routes: impl IntoIterator<Item = RouteDefinition>) -> RouterResult<()> {
		let mut pending = Vec::new();
		for route in routes {
			pending.extend(route.flatten()?);
		}

		let mut paths = HashSet::new();
		let mut names = HashSet::new();
		for route in &pending {
			if self.by_path.contains_key(route.path()) || !paths.insert(route.path()) {
				return Err(RouterError::PathConflict(route.path().to_string()));
			}
			if let Some(name) = route.name() {
				let key = self.name_key(name);
				if self.by_name.contains_key(&key) || !names.insert(key) {
					return Err(RouterError::NameConflict(name.to_string()));
				}
			}
		}

		for route in pending {
			debug!(path = route.path(), name = route.name(), parent = route.parent(), "route registered");
			if let Some(name) = route.name() {
				let key = self.name_key(name);
				self.by_name.insert(key, route.path().to_string());
			}
			self.by_path
				.insert(route.path().to_string(), Arc::new(route));
		}
		self.resort();
		Ok(())
	}

	/// Removes a route. Returns whether anything was removed.
	///
	/// Children of a removed route stay registered; their ancestor walk stops
	/// at the missing parent.
	///
	/// # Errors
	///
	/// Fails with [`RouterError::NamePathMismatch`] when both a name and a
	/// path are given and they do not designate the same route.
	pub fn remove(&mut self, selector: &RouteSelector) -> RouterResult<bool> {
		let by_name = selector
			.name
			.as_deref()
			.and_then(|name| self.by_name.get(&self.name_key(name)).cloned());
		let by_path = selector
			.path
			.as_deref()
			.and_then(path_key)
			.filter(|path| self.by_path.contains_key(path));

		let target = match (&selector.name, &selector.path) {
			(Some(name), Some(path)) => {
				if by_name.is_none() || by_name != by_path {
					return Err(RouterError::NamePathMismatch {
						name: name.clone(),
						path: path.clone(),
					});
				}
				by_name
			}
			(Some(_), None) => by_name,
			(None, Some(_)) => by_path,
			(None, None) => None,
		};

		let Some(path) = target else {
			return Ok(false);
		};
		let Some(route) = self.by_path.remove(&path) else {
			return Ok(false);
		};
		if let Some(name) = route.name() {
			let key = self.name_key(name);
			self.by_name.remove(&key);
		}
		debug!(path = route.path(), name = route.name(), "route removed");
		self.resort();
		Ok(true)
	}

	/// Removes several routes. Returns how many were removed.
	///
	/// Stops at the first mismatch; removals before it are kept.
	pub fn remove_many<'a>(
		&mut self,
		selectors: impl IntoIterator<Item = &'a RouteSelector>,
	) -> RouterResult<usize> {
		let mut removed = 0;
		for selector in selectors {
			if self.remove(selector)? {
				removed += 1;
			}
		}
		Ok(removed)
	}

	/// Whether a route is registered under this name or path.
	pub fn has(&self, name_or_path: &str) -> bool {
		self.has_path(name_or_path) || self.has_name(name_or_path)
	}

	/// Whether a route is registered under this name.
	pub fn has_name(&self, name: &str) -> bool {
		self.by_name.contains_key(&self.name_key(name))
	}

	/// Whether a route is registered under this path template.
	pub fn has_path(&self, path: &str) -> bool {
		path_key(path).is_some_and(|key| self.by_path.contains_key(&key))
	}

	/// Looks up a route by name.
	pub fn get_by_name(&self, name: &str) -> Option<Arc<ParsedRoute>> {
		self.by_name
			.get(&self.name_key(name))
			.and_then(|path| self.by_path.get(path))
			.cloned()
	}

	/// Looks up a route by path template.
	pub fn get_by_path(&self, path: &str) -> Option<Arc<ParsedRoute>> {
		path_key(path).and_then(|key| self.by_path.get(&key).cloned())
	}

	/// All routes, sorted by the priority comparator.
	pub fn list(&self) -> &[Arc<ParsedRoute>] {
		&self.sorted
	}

	/// Number of registered routes.
	pub fn len(&self) -> usize {
		self.by_path.len()
	}

	/// Whether no route is registered.
	pub fn is_empty(&self) -> bool {
		self.by_path.is_empty()
	}

	/// Parents of the route at `path`, nearest first.
	pub fn ancestors(&self, path: &str) -> Vec<Arc<ParsedRoute>> {
		let mut ancestors = Vec::new();
		let mut current = self.get_by_path(path);
		while let Some(route) = current {
			// Bounded by the registry size in case of a corrupt parent chain.
			if ancestors.len() >= self.by_path.len() {
				break;
			}
			current = route
				.parent()
				.and_then(|parent| self.by_path.get(parent).cloned());
			if let Some(parent) = &current {
				ancestors.push(Arc::clone(parent));
			}
		}
		ancestors
	}

	/// Whether the route at `path` has an ancestor with this name.
	pub fn has_ancestor_named(&self, path: &str, name: &str) -> bool {
		let key = self.name_key(name);
		self.ancestors(path)
			.iter()
			.filter_map(|route| route.name())
			.any(|ancestor| self.name_key(ancestor) == key)
	}

	fn name_key(&self, name: &str) -> String {
		if self.case_sensitive {
			name.to_string()
		} else {
			name.to_lowercase()
		}
	}

	fn rebuild_name_index(&mut self) {
		let entries: Vec<(String, String)> = self
			.by_path
			.values()
			.filter_map(|route| {
				route
					.name()
					.map(|name| (self.name_key(name), route.path().to_string()))
			})
			.collect();
		self.by_name = entries.into_iter().collect();
	}

	fn resort(&mut self) {
		let mut sorted: Vec<Arc<ParsedRoute>> = self.by_path.values().cloned().collect();
		sorted.sort_by(|a, b| (self.priority)(a, b));
		self.sorted = sorted;
	}
}

impl Default for RouteRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for RouteRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRegistry")
			.field("routes", &self.sorted.iter().map(|r| r.path()).collect::<Vec<_>>())
			.field("case_sensitive", &self.case_sensitive)
			.finish()
	}
}

fn path_key(path: &str) -> Option<String> {
	normalize_template(path).ok()
}
