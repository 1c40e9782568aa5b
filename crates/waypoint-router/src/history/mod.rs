//! History stack abstraction.
//!
//! The router writes one entry per committed `push` / `replace` and reads the
//! current URL back when it resyncs after a traversal. Browser hosts implement
//! [`HistoryStack`] over `window.history`; [`MemoryHistory`] serves every other
//! host and the test suite.

mod memory;
mod sync;

pub use memory::MemoryHistory;
pub use sync::HistorySync;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use url::Url;

use crate::error::{RouterError, RouterResult};
use crate::intent::Query;
use crate::pattern::Params;
use crate::route::Meta;

/// Scroll offset saved alongside a history entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
	/// Horizontal offset.
	pub x: f64,
	/// Vertical offset.
	pub y: f64,
}

/// Router entry persisted in the history state, under
/// [`RouterSettings::router_state_key`](crate::settings::RouterSettings::router_state_key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterEntry {
	/// Route name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Concrete path.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	/// Destination href.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub href: Option<String>,
	/// Query values.
	#[serde(default, skip_serializing_if = "Query::is_empty")]
	pub query: Query,
	/// Param values.
	#[serde(default, skip_serializing_if = "Params::is_empty")]
	pub params: Params,
	/// Route meta, when meta is stored as state.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub meta: Option<Meta>,
}

/// One entry of a history stack.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
	/// Href of the entry.
	pub url: String,
	/// Title given when the entry was written.
	pub title: Option<String>,
	/// Persisted state.
	pub state: Value,
}

/// Change of the current entry not caused by a router write.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
	/// Back, forward or `go`.
	Traverse {
		/// Href of the entry now current.
		url: String,
		/// Its persisted state.
		state: Value,
	},
	/// The URL was edited in place (hash change, address bar).
	UrlChange {
		/// New href.
		url: String,
	},
}

/// The external navigation stack the router persists into.
#[async_trait]
pub trait HistoryStack: Send + Sync {
	/// Appends an entry and makes it current, dropping forward entries.
	async fn push_entry(&self, state: Value, title: Option<&str>, url: &str) -> RouterResult<()>;

	/// Overwrites the current entry.
	async fn replace_entry(&self, state: Value, title: Option<&str>, url: &str) -> RouterResult<()>;

	/// Moves one entry back.
	fn back(&self);

	/// Moves one entry forward.
	fn forward(&self);

	/// Moves `delta` entries. Out of range moves are ignored.
	fn go(&self, delta: isize);

	/// Href of the current entry.
	fn current_url(&self) -> String;

	/// State of the current entry.
	fn current_state(&self) -> Option<Value>;

	/// Sets the document title.
	fn set_title(&self, _title: &str) {}

	/// Current scroll offset, saved with each written entry.
	fn scroll_position(&self) -> Option<ScrollPosition> {
		None
	}

	/// Stream of external changes, `None` if the stack cannot report them.
	fn subscribe(&self) -> Option<broadcast::Receiver<HistoryEvent>> {
		None
	}
}

/// Reads the router entry out of a persisted history state.
pub fn router_entry(state: &Value, router_state_key: &str) -> Option<RouterEntry> {
	state
		.get(router_state_key)
		.and_then(|entry| serde_json::from_value(entry.clone()).ok())
}

/// Builds the persisted state object.
///
/// Object-shaped extra state is merged at the top level, any other value is
/// stored under `"state"`. Router and scroll keys always win.
pub(crate) fn compose_state(
	entry: &RouterEntry,
	extra: Option<&Value>,
	scroll: Option<ScrollPosition>,
	router_state_key: &str,
	scroll_state_key: &str,
) -> RouterResult<Value> {
	let mut state = Map::new();
	match extra {
		Some(Value::Object(extra)) => state.extend(extra.clone()),
		Some(Value::Null) | None => {}
		Some(other) => {
			state.insert("state".to_string(), other.clone());
		}
	}

	let entry = serde_json::to_value(entry).map_err(|e| RouterError::History(e.to_string()))?;
	state.insert(router_state_key.to_string(), entry);
	if let Some(scroll) = scroll {
		let scroll = serde_json::to_value(scroll).map_err(|e| RouterError::History(e.to_string()))?;
		state.insert(scroll_state_key.to_string(), scroll);
	}
	Ok(Value::Object(state))
}

/// Extracts the routable path from a stack href.
///
/// In hash mode the fragment is the path; otherwise the pathname plus query
/// and fragment. Relative hrefs are resolved against `origin`.
pub fn path_from_url(url: &str, origin: &str, hash: bool) -> RouterResult<String> {
	let origin = Url::parse(origin)
		.map_err(|e| RouterError::History(format!("invalid origin '{origin}': {e}")))?;
	let parsed = origin
		.join(url)
		.map_err(|e| RouterError::History(format!("invalid url '{url}': {e}")))?;

	if hash {
		return Ok(match parsed.fragment() {
			Some(fragment) if !fragment.is_empty() => fragment.to_string(),
			_ => "/".to_string(),
		});
	}

	let mut path = parsed.path().to_string();
	if let Some(query) = parsed.query() {
		path.push('?');
		path.push_str(query);
	}
	if let Some(fragment) = parsed.fragment() {
		path.push('#');
		path.push_str(fragment);
	}
	Ok(path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("/users/1?tab=a", false, "/users/1?tab=a")]
	#[case("http://localhost/app/x#top", false, "/app/x#top")]
	#[case("/app/#/users/1?tab=a", true, "/users/1?tab=a")]
	#[case("/app/", true, "/")]
	fn test_path_from_url(#[case] url: &str, #[case] hash: bool, #[case] expected: &str) {
		assert_eq!(path_from_url(url, "http://localhost", hash).unwrap(), expected);
	}

	#[rstest]
	fn test_path_from_url_rejects_bad_origin() {
		let result = path_from_url("/x", "not an origin", false);
		assert!(matches!(result, Err(RouterError::History(_))));
	}

	#[rstest]
	fn test_compose_state() {
		// Arrange
		let entry = RouterEntry {
			name: Some("user".into()),
			path: Some("/users/1".into()),
			..RouterEntry::default()
		};

		// Act
		let state = compose_state(
			&entry,
			Some(&json!({"draft": true, "__router__": "overwritten"})),
			Some(ScrollPosition { x: 0.0, y: 120.0 }),
			"__router__",
			"__scroll__",
		)
		.unwrap();

		// Assert
		assert_eq!(state["draft"], json!(true));
		assert_eq!(state["__router__"]["name"], json!("user"));
		assert_eq!(state["__scroll__"]["y"], json!(120.0));
		assert!(state["__router__"].get("query").is_none());
		assert_eq!(router_entry(&state, "__router__"), Some(entry));
	}

	#[rstest]
	fn test_compose_state_wraps_scalar_extra() {
		let state = compose_state(&RouterEntry::default(), Some(&json!(7)), None, "r", "s").unwrap();
		assert_eq!(state["state"], json!(7));
		assert!(state.get("s").is_none());
	}
}
