//! Navigation intents: what a caller asks the router to go to.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::pattern::{Params, Wildcards};

/// Query string parameters.
pub type Query = BTreeMap<String, String>;

/// Per-navigation overrides of [`RouterSettings`](crate::settings::RouterSettings).
///
/// `None` keeps the router-wide value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationOptions {
	/// Path prefix stripped during resolution and prepended to URLs.
	pub base: Option<String>,
	/// Route through the URL fragment instead of the pathname.
	pub hash: Option<bool>,
	/// Require an exact template match.
	pub strict: Option<bool>,
	/// Fail instead of returning an unmatched route.
	pub fail_on_not_found: Option<bool>,
	/// Persist route meta in the history state.
	pub meta_as_state: Option<bool>,
	/// Use the route name as document title when it has no title.
	pub name_as_title: Option<bool>,
	/// Follow redirects returned by guards.
	pub follow_guard_redirects: Option<bool>,
}

/// A requested destination, by name or by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationIntent {
	/// Registered route name.
	pub name: Option<String>,
	/// Absolute, relative (`./`, `../`) or template path. Takes precedence over `name`.
	pub path: Option<String>,
	/// Query values, overriding route defaults.
	pub query: Query,
	/// Param values, overriding route defaults.
	pub params: Params,
	/// Wildcard values keyed by capture index.
	pub wildcards: Wildcards,
	/// Extra state stored alongside the router entry in history.
	pub state: Option<Value>,
	/// Drop the query string from the computed URL.
	pub strip_query: bool,
	/// Drop any `#fragment` from the computed URL.
	pub strip_hash: bool,
	/// Drop a dangling `#` at the end of the computed URL.
	pub strip_trailing_hash: bool,
	/// Option overrides for this navigation only.
	pub options: NavigationOptions,
}

impl NavigationIntent {
	/// Targets a path.
	pub fn path(path: impl Into<String>) -> Self {
		Self {
			path: Some(path.into()),
			..Self::default()
		}
	}

	/// Targets a named route.
	pub fn name(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Self::default()
		}
	}

	/// Adds a query value.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key.into(), value.into());
		self
	}

	/// Adds a param value.
	pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.params.insert(key.into(), value.to_string());
		self
	}

	/// Adds a wildcard value at the given capture index.
	pub fn with_wildcard(mut self, index: usize, value: impl Into<String>) -> Self {
		self.wildcards.insert(index, value.into());
		self
	}

	/// Attaches extra history state.
	pub fn with_state(mut self, state: Value) -> Self {
		self.state = Some(state);
		self
	}

	/// Replaces the option overrides.
	pub fn with_options(mut self, options: NavigationOptions) -> Self {
		self.options = options;
		self
	}

	/// Overrides strict matching for this navigation.
	pub fn strict(mut self, strict: bool) -> Self {
		self.options.strict = Some(strict);
		self
	}

	/// Overrides guard redirect following for this navigation.
	pub fn follow_guard_redirects(mut self, follow: bool) -> Self {
		self.options.follow_guard_redirects = Some(follow);
		self
	}

	/// Sets the URL strip flags.
	pub fn strip(mut self, query: bool, hash: bool, trailing_hash: bool) -> Self {
		self.strip_query = query;
		self.strip_hash = hash;
		self.strip_trailing_hash = trailing_hash;
		self
	}

	/// Human readable destination, used in logs and errors.
	pub fn describe(&self) -> String {
		match (&self.path, &self.name) {
			(Some(path), _) => path.clone(),
			(None, Some(name)) => format!("name:{name}"),
			(None, None) => "<empty>".to_string(),
		}
	}
}

impl From<&str> for NavigationIntent {
	fn from(path: &str) -> Self {
		Self::path(path)
	}
}

impl From<String> for NavigationIntent {
	fn from(path: String) -> Self {
		Self::path(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_path_intent_builder() {
		let intent = NavigationIntent::path("/users/:id")
			.with_param("id", 42)
			.with_query("tab", "posts")
			.strict(true);

		assert_eq!(intent.path.as_deref(), Some("/users/:id"));
		assert_eq!(intent.params.get("id").map(String::as_str), Some("42"));
		assert_eq!(intent.query.get("tab").map(String::as_str), Some("posts"));
		assert_eq!(intent.options.strict, Some(true));
	}

	#[rstest]
	#[case(NavigationIntent::path("/a"), "/a")]
	#[case(NavigationIntent::name("home"), "name:home")]
	#[case(NavigationIntent::default(), "<empty>")]
	fn test_describe(#[case] intent: NavigationIntent, #[case] expected: &str) {
		assert_eq!(intent.describe(), expected);
	}

	#[rstest]
	fn test_from_str() {
		let intent: NavigationIntent = "/home".into();
		assert_eq!(intent, NavigationIntent::path("/home"));
	}
}
