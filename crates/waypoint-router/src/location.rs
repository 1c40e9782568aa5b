//! Externally visible router position.

use serde::{Deserialize, Serialize};

use crate::intent::Query;
use crate::pattern::{Params, Wildcards};

/// Where the router currently is.
///
/// Updated only when a navigation commits, always together with the current
/// route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterLocation {
	/// Origin the URL is built against.
	pub origin: String,
	/// Base path, if any.
	pub base: Option<String>,
	/// Name of the matched route.
	pub name: Option<String>,
	/// Concrete path, without base.
	pub path: String,
	/// Href relative to the origin, with base, query and fragment.
	pub href: String,
	/// Absolute URL.
	pub url: String,
	/// Query values.
	pub query: Query,
	/// Param values.
	pub params: Params,
	/// Wildcard values by capture index.
	pub wildcards: Wildcards,
}
