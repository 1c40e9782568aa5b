//! Error types for route matching and navigation.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by fallible guards.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Shared cause attached to an aborted navigation.
pub type GuardCause = Arc<dyn StdError + Send + Sync>;

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Coarse classification of a [`RouterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Registry misuse: conflicts and mismatches. Never retried.
	Configuration,
	/// Template compilation or substitution failures.
	Matching,
	/// Failures of a navigation attempt (not found, aborted, cancelled, history).
	Navigation,
}

/// Error type for router operations.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RouterError {
	/// Template is empty, relative or does not compile.
	#[error("invalid path template '{template}': {reason}")]
	InvalidPath {
		/// Offending template.
		template: String,
		/// What is wrong with it.
		reason: String,
	},

	/// A required param had no value during substitution.
	#[error("missing required param '{param}' for path '{template}'")]
	MissingRequiredParam {
		/// Param name.
		param: String,
		/// Template being substituted.
		template: String,
	},

	/// A route with this name is already registered.
	#[error("a route named '{0}' is already registered")]
	NameConflict(String),

	/// A route with this path is already registered.
	#[error("a route with path '{0}' is already registered")]
	PathConflict(String),

	/// Name and path passed to `remove` point to different routes.
	#[error("route name '{name}' and path '{path}' do not designate the same route")]
	NamePathMismatch {
		/// Requested name.
		name: String,
		/// Requested path.
		path: String,
	},

	/// No route or no path could be resolved.
	#[error("route not found: {0}")]
	NotFound(String),

	/// A relative path walked above the root.
	#[error("relative path '{path}' cannot be resolved from '{from}'")]
	RelativePath {
		/// Relative path requested.
		path: String,
		/// Path it was resolved against.
		from: String,
	},

	/// A guard aborted the navigation.
	#[error("navigation {id} aborted by guard")]
	Aborted {
		/// Navigation event id.
		id: String,
		/// Error raised by the guard, if any.
		#[source]
		cause: Option<GuardCause>,
	},

	/// A newer navigation superseded this one.
	#[error("navigation {id} cancelled{}", reason_suffix(.reason))]
	Cancelled {
		/// Navigation event id.
		id: String,
		/// Why it was cancelled.
		reason: Option<String>,
	},

	/// Redirects nested deeper than the configured limit.
	#[error("redirect limit of {limit} exceeded while navigating to '{target}'")]
	TooManyRedirects {
		/// Configured limit.
		limit: usize,
		/// Destination of the redirect that overflowed.
		target: String,
	},

	/// The history stack rejected a write.
	#[error("history write failed: {0}")]
	History(String),

	/// Settings could not be loaded.
	#[error("invalid router settings: {0}")]
	Settings(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
	reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

impl RouterError {
	pub(crate) fn invalid_path(template: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidPath {
			template: template.into(),
			reason: reason.into(),
		}
	}

	/// Returns the taxonomy bucket of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::NameConflict(_) | Self::PathConflict(_) | Self::NamePathMismatch { .. } => {
				ErrorKind::Configuration
			}
			Self::InvalidPath { .. } | Self::MissingRequiredParam { .. } | Self::Settings(_) => {
				ErrorKind::Matching
			}
			Self::NotFound(_)
			| Self::RelativePath { .. }
			| Self::Aborted { .. }
			| Self::Cancelled { .. }
			| Self::TooManyRedirects { .. }
			| Self::History(_) => ErrorKind::Navigation,
		}
	}

	/// Whether a newer navigation superseded the one that produced this error.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled { .. })
	}

	/// Whether a guard aborted the navigation.
	pub fn is_aborted(&self) -> bool {
		matches!(self, Self::Aborted { .. })
	}

	/// Whether no route or path could be resolved.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}
}
