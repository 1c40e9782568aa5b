//! Turns a [`NavigationIntent`] into a [`ResolvedRoute`].
//!
//! Resolution is read-only: it looks at the registry and computes the
//! destination, the router state is never touched.

use std::sync::Arc;

use tracing::debug;

use crate::error::{RouterError, RouterResult};
use crate::intent::{NavigationIntent, Query};
use crate::location::RouterLocation;
use crate::pattern::{Params, Wildcards, is_template, query_start, substitute_path, substitute_title};
use crate::registry::RouteRegistry;
use crate::route::ParsedRoute;
use crate::settings::EffectiveOptions;

/// Where a resolution starts from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {
	/// Current path, used for relative intents.
	pub from: Option<String>,
}

impl ResolveContext {
	/// Context resolving relative paths against `path`.
	pub fn from_path(path: impl Into<String>) -> Self {
		Self {
			from: Some(path.into()),
		}
	}
}

/// Outcome of matching an intent against the registry.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRoute {
	/// Matched route, `None` when nothing matched.
	pub route: Option<Arc<ParsedRoute>>,
	/// Name of the matched route.
	pub name: Option<String>,
	/// Concrete path with params substituted.
	pub path: Option<String>,
	/// Destination href (base, path, query and fragment).
	pub href: Option<String>,
	/// Merged query.
	pub query: Query,
	/// Merged params.
	pub params: Params,
	/// Wildcard values by capture index.
	pub wildcards: Wildcards,
}

impl ResolvedRoute {
	/// Whether a registered route matched.
	pub fn is_match(&self) -> bool {
		self.route.is_some()
	}

	/// Document title: the route title with params substituted, else the
	/// route name when `name_as_title` is set.
	pub fn title(&self, name_as_title: bool) -> Option<String> {
		let from_template = self
			.route
			.as_ref()
			.and_then(|route| route.title())
			.map(|template| substitute_title(template, &self.params));
		match from_template {
			Some(title) => Some(title),
			None if name_as_title => self.name.clone(),
			None => None,
		}
	}

	/// Location the router moves to once this resolution commits.
	pub fn to_location(&self, origin: &str, base: Option<&str>) -> RouterLocation {
		let href = self.href.clone().unwrap_or_default();
		RouterLocation {
			origin: origin.to_string(),
			base: base.map(str::to_string),
			name: self.name.clone(),
			path: self.path.clone().unwrap_or_default(),
			url: format!("{}{}", origin.trim_end_matches('/'), href),
			href,
			query: self.query.clone(),
			params: self.params.clone(),
			wildcards: self.wildcards.clone(),
		}
	}
}

/// Resolves an intent.
///
/// # Errors
///
/// - [`RouterError::NotFound`] for an empty intent, a relative path without
///   `from`, or any miss when `fail_on_not_found` is set
/// - [`RouterError::RelativePath`] when `..` walks above the root
/// - [`RouterError::MissingRequiredParam`] / [`RouterError::InvalidPath`]
///   when the path cannot be substituted
pub fn resolve(
	registry: &RouteRegistry,
	intent: &NavigationIntent,
	options: &EffectiveOptions,
	context: &ResolveContext,
) -> RouterResult<ResolvedRoute> {
	let raw = match (&intent.path, &intent.name) {
		(Some(path), _) => path.clone(),
		(None, Some(name)) => match registry.get_by_name(name) {
			Some(route) => route.path().to_string(),
			None if options.fail_on_not_found => {
				return Err(RouterError::NotFound(format!(
					"no path could be resolved for name '{name}'"
				)));
			}
			None => {
				debug!(name = name.as_str(), "unknown route name");
				return Ok(ResolvedRoute::default());
			}
		},
		(None, None) => {
			return Err(RouterError::NotFound("no path could be resolved".to_string()));
		}
	};

	let raw = if options.hash {
		raw.strip_prefix('#').unwrap_or(&raw)
	} else {
		raw.as_str()
	};
	let (raw, fragment) = match raw.split_once('#') {
		Some((path, fragment)) => (path, Some(fragment)),
		None => (raw, None),
	};
	let (raw, embedded_query) = split_query(raw)?;

	let mut path = if raw.starts_with('.') {
		absolute_path(raw, context.from.as_deref())?
	} else {
		raw.to_string()
	};
	if !path.starts_with('/') {
		path.insert(0, '/');
	}
	if let Some(base) = options.base.as_deref() {
		path = strip_base(&path, base);
	}

	let exact = registry.get_by_path(&path);
	let mut substitution_params = exact
		.as_ref()
		.map(|route| route.default_params().clone())
		.unwrap_or_default();
	substitution_params.extend(intent.params.clone());
	let path = if is_template(&path) {
		substitute_path(&path, &substitution_params, &intent.wildcards)?
	} else {
		literal_path(path)
	};

	let matched = exact
		.or_else(|| find_match(registry, &path, true))
		.or_else(|| (!options.strict).then(|| find_match(registry, &path, false)).flatten());

	if matched.is_none() && options.fail_on_not_found {
		return Err(RouterError::NotFound(path));
	}

	let mut params = Params::new();
	let mut wildcards = Wildcards::new();
	let mut query = Query::new();
	if let Some(route) = &matched {
		let extracted = route.matcher().extract(&path);
		params.extend(route.default_params().clone());
		params.extend(extracted.params);
		wildcards.extend(extracted.wildcards);
		query.extend(route.default_query().clone());
	}
	params.extend(intent.params.clone());
	wildcards.extend(intent.wildcards.clone());
	query.extend(embedded_query);
	query.extend(intent.query.clone());

	let href = build_href(&path, &query, fragment, intent, options)?;
	let name = matched
		.as_ref()
		.and_then(|route| route.name().map(str::to_string));
	debug!(
		path = path.as_str(),
		name = name.as_deref(),
		matched = matched.is_some(),
		"intent resolved"
	);

	Ok(ResolvedRoute {
		route: matched,
		name,
		path: Some(path),
		href: Some(href),
		query,
		params,
		wildcards,
	})
}

fn find_match(registry: &RouteRegistry, path: &str, strict: bool) -> Option<Arc<ParsedRoute>> {
	registry
		.list()
		.iter()
		.find(|route| route.matcher().is_match(path, strict))
		.cloned()
}

fn split_query(raw: &str) -> RouterResult<(&str, Query)> {
	let Some(index) = query_start(raw) else {
		return Ok((raw, Query::new()));
	};
	let (path, query) = (&raw[..index], &raw[index + 1..]);
	let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
		.map_err(|e| RouterError::invalid_path(raw, format!("malformed query string: {e}")))?;
	Ok((path, pairs.into_iter().collect()))
}

/// Resolves `./` and `../` segments against the directory `from`.
fn absolute_path(relative: &str, from: Option<&str>) -> RouterResult<String> {
	let Some(from) = from else {
		return Err(RouterError::NotFound(format!(
			"relative path '{relative}' needs a current location"
		)));
	};

	let mut segments: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
	for part in relative.split('/').filter(|s| !s.is_empty()) {
		match part {
			"." => {}
			".." => {
				if segments.pop().is_none() {
					return Err(RouterError::RelativePath {
						path: relative.to_string(),
						from: from.to_string(),
					});
				}
			}
			segment => segments.push(segment),
		}
	}
	Ok(format!("/{}", segments.join("/")))
}

/// Concrete paths only lose trailing slashes; template limits do not apply.
fn literal_path(mut path: String) -> String {
	while path.len() > 1 && path.ends_with('/') {
		path.pop();
	}
	path
}

fn strip_base(path: &str, base: &str) -> String {
	match path.strip_prefix(base) {
		Some("") => "/".to_string(),
		Some(rest) if rest.starts_with('/') => rest.to_string(),
		_ => path.to_string(),
	}
}

fn build_href(
	path: &str,
	query: &Query,
	fragment: Option<&str>,
	intent: &NavigationIntent,
	options: &EffectiveOptions,
) -> RouterResult<String> {
	let base = options.base.as_deref().unwrap_or("");
	let mut href = if options.hash {
		format!("{base}/#{path}")
	} else {
		format!("{base}{path}")
	};

	if !intent.strip_query && !query.is_empty() {
		let encoded = serde_urlencoded::to_string(query)
			.map_err(|e| RouterError::invalid_path(path, format!("unencodable query: {e}")))?;
		href.push('?');
		href.push_str(&encoded);
	}
	if let Some(fragment) = fragment.filter(|_| !intent.strip_hash) {
		href.push('#');
		href.push_str(fragment);
	}
	if intent.strip_trailing_hash {
		while href.ends_with('#') {
			href.pop();
		}
	}
	Ok(href)
}
