//! Router-wide settings and their per-navigation overrides.

use serde::{Deserialize, Serialize};

use crate::error::{RouterError, RouterResult};
use crate::intent::NavigationOptions;

/// External event source that triggers a resync with the history stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenMode {
	/// Never resync automatically.
	Off,
	/// Resync on back/forward traversals.
	#[default]
	History,
	/// Resync on traversals and on URL edits.
	Navigation,
}

/// Router configuration.
///
/// ```
/// use waypoint_router::settings::RouterSettings;
///
/// let settings = RouterSettings::from_toml_str(
/// 	r#"
/// base = "/app"
/// hash = true
/// "#,
/// )
/// .unwrap();
/// assert_eq!(settings.base.as_deref(), Some("/app"));
/// assert!(settings.follow_guard_redirects);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Origin used to build absolute location URLs.
	pub origin: String,
	/// Path prefix stripped during resolution and prepended to URLs.
	pub base: Option<String>,
	/// Route through the URL fragment instead of the pathname.
	pub hash: bool,
	/// Require an exact template match.
	pub strict: bool,
	/// Case-sensitive route names.
	pub case_sensitive: bool,
	/// Fail instead of returning an unmatched route.
	pub fail_on_not_found: bool,
	/// Persist route meta in the history state.
	pub meta_as_state: bool,
	/// Use the route name as document title when it has no title.
	pub name_as_title: bool,
	/// Follow redirects returned by guards.
	pub follow_guard_redirects: bool,
	/// Event source that triggers resyncs.
	pub listen: ListenMode,
	/// Key of the router entry in the history state.
	pub router_state_key: String,
	/// Key of the scroll position in the history state.
	pub scroll_state_key: String,
	/// Maximum nesting of redirects within a single navigation.
	pub max_redirects: usize,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			origin: "http://localhost".to_string(),
			base: None,
			hash: false,
			strict: false,
			case_sensitive: false,
			fail_on_not_found: false,
			meta_as_state: false,
			name_as_title: false,
			follow_guard_redirects: true,
			listen: ListenMode::History,
			router_state_key: "__router__".to_string(),
			scroll_state_key: "__scroll__".to_string(),
			max_redirects: 10,
		}
	}
}

impl RouterSettings {
	/// Parses settings from TOML. Missing keys take their default.
	///
	/// # Errors
	///
	/// Returns [`RouterError::Settings`] if the document does not parse.
	pub fn from_toml_str(source: &str) -> RouterResult<Self> {
		toml::from_str(source).map_err(|e| RouterError::Settings(e.to_string()))
	}

	/// Sets the origin.
	pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
		self.origin = origin.into();
		self
	}

	/// Sets the base path.
	pub fn with_base(mut self, base: impl Into<String>) -> Self {
		self.base = Some(base.into());
		self
	}

	/// Enables hash routing.
	pub fn with_hash(mut self, hash: bool) -> Self {
		self.hash = hash;
		self
	}

	/// Enables strict matching.
	pub fn with_strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	/// Makes route names case-sensitive.
	pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
		self.case_sensitive = case_sensitive;
		self
	}

	/// Fails resolution of unknown destinations.
	pub fn with_fail_on_not_found(mut self, fail: bool) -> Self {
		self.fail_on_not_found = fail;
		self
	}

	/// Stores route meta in history state.
	pub fn with_meta_as_state(mut self, enabled: bool) -> Self {
		self.meta_as_state = enabled;
		self
	}

	/// Uses route names as fallback titles.
	pub fn with_name_as_title(mut self, enabled: bool) -> Self {
		self.name_as_title = enabled;
		self
	}

	/// Follows guard redirects.
	pub fn with_follow_guard_redirects(mut self, follow: bool) -> Self {
		self.follow_guard_redirects = follow;
		self
	}

	/// Sets the resync event source.
	pub fn with_listen(mut self, listen: ListenMode) -> Self {
		self.listen = listen;
		self
	}

	/// Sets the redirect nesting limit.
	pub fn with_max_redirects(mut self, max: usize) -> Self {
		self.max_redirects = max;
		self
	}

	/// Merges per-navigation overrides over these settings.
	pub fn effective(&self, overrides: &NavigationOptions) -> EffectiveOptions {
		EffectiveOptions {
			base: overrides
				.base
				.clone()
				.or_else(|| self.base.clone())
				.and_then(|base| normalize_base(&base)),
			hash: overrides.hash.unwrap_or(self.hash),
			strict: overrides.strict.unwrap_or(self.strict),
			fail_on_not_found: overrides.fail_on_not_found.unwrap_or(self.fail_on_not_found),
			meta_as_state: overrides.meta_as_state.unwrap_or(self.meta_as_state),
			name_as_title: overrides.name_as_title.unwrap_or(self.name_as_title),
			follow_guard_redirects: overrides
				.follow_guard_redirects
				.unwrap_or(self.follow_guard_redirects),
		}
	}
}

/// Options in force for one navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveOptions {
	/// Normalized base (`/app`), `None` when empty or `/`.
	pub base: Option<String>,
	/// Hash routing.
	pub hash: bool,
	/// Strict matching.
	pub strict: bool,
	/// Fail on unknown destinations.
	pub fail_on_not_found: bool,
	/// Store meta in history state.
	pub meta_as_state: bool,
	/// Route name as fallback title.
	pub name_as_title: bool,
	/// Follow guard redirects.
	pub follow_guard_redirects: bool,
}

fn normalize_base(base: &str) -> Option<String> {
	let trimmed = base.trim().trim_matches('/');
	if trimmed.is_empty() {
		None
	} else {
		Some(format!("/{trimmed}"))
	}
}
