//! Navigation events and their lifecycle.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RouterError;
use crate::intent::NavigationIntent;
use crate::location::RouterLocation;
use crate::resolver::ResolvedRoute;

/// Status of a navigation attempt.
///
/// `Active` is the only non-terminal state; a terminal status never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationStatus {
	/// Guards are running.
	Active,
	/// Committed.
	Completed,
	/// Superseded by a newer navigation.
	Cancelled,
	/// Aborted by a guard or failed.
	Failed,
	/// Replaced by a navigation to another destination.
	Redirected,
}

impl NavigationStatus {
	/// Whether this status is final.
	pub fn is_terminal(self) -> bool {
		!matches!(self, Self::Active)
	}
}

impl fmt::Display for NavigationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Self::Active => "active",
			Self::Completed => "completed",
			Self::Cancelled => "cancelled",
			Self::Failed => "failed",
			Self::Redirected => "redirected",
		};
		f.write_str(label)
	}
}

struct EventInner {
	id: String,
	to: ResolvedRoute,
	from: RouterLocation,
	status: watch::Sender<NavigationStatus>,
	error: Mutex<Option<RouterError>>,
	redirect: Mutex<Option<NavigationIntent>>,
}

/// One navigation attempt, shared with guards and listeners.
///
/// Cloning is cheap; all clones observe the same status.
#[derive(Clone)]
pub struct NavigationEvent {
	inner: Arc<EventInner>,
}

impl NavigationEvent {
	/// Starts a new, active event.
	pub fn new(to: ResolvedRoute, from: RouterLocation) -> Self {
		let (status, _) = watch::channel(NavigationStatus::Active);
		Self {
			inner: Arc::new(EventInner {
				id: Uuid::new_v4().to_string(),
				to,
				from,
				status,
				error: Mutex::new(None),
				redirect: Mutex::new(None),
			}),
		}
	}

	/// Unique id of this attempt.
	pub fn id(&self) -> &str {
		&self.inner.id
	}

	/// Destination.
	pub fn to(&self) -> &ResolvedRoute {
		&self.inner.to
	}

	/// Location at the time the navigation started.
	pub fn from(&self) -> &RouterLocation {
		&self.inner.from
	}

	/// Current status.
	pub fn status(&self) -> NavigationStatus {
		*self.inner.status.borrow()
	}

	/// Whether no terminal status was reached yet.
	pub fn is_active(&self) -> bool {
		!self.status().is_terminal()
	}

	/// Failure recorded by [`cancel`](Self::cancel) or [`fail`](Self::fail).
	pub fn error(&self) -> Option<RouterError> {
		self.inner.error.lock().clone()
	}

	/// Destination this navigation was redirected to.
	pub fn redirected_to(&self) -> Option<NavigationIntent> {
		self.inner.redirect.lock().clone()
	}

	/// Marks the event completed.
	pub fn complete(&self) -> bool {
		self.transition(NavigationStatus::Completed, || {})
	}

	/// Marks the event cancelled and records the cancellation error.
	pub fn cancel(&self, reason: Option<String>) -> bool {
		let error = RouterError::Cancelled {
			id: self.id().to_string(),
			reason,
		};
		self.transition(NavigationStatus::Cancelled, || {
			*self.inner.error.lock() = Some(error);
		})
	}

	/// Marks the event failed with `error`.
	pub fn fail(&self, error: RouterError) -> bool {
		self.transition(NavigationStatus::Failed, || {
			*self.inner.error.lock() = Some(error);
		})
	}

	/// Marks the event redirected to `to`.
	pub fn redirect(&self, to: NavigationIntent) -> bool {
		self.transition(NavigationStatus::Redirected, || {
			*self.inner.redirect.lock() = Some(to);
		})
	}

	/// Waits for a terminal status.
	pub async fn settled(&self) -> NavigationStatus {
		let mut receiver = self.inner.status.subscribe();
		match receiver.wait_for(|status| status.is_terminal()).await {
			Ok(status) => *status,
			// The sender lives as long as `self`, this only guards a closed channel.
			Err(_) => self.status(),
		}
	}

	/// Applies `next` if still active. `record` runs under the status lock so
	/// waiters never see the status before the data it carries.
	fn transition(&self, next: NavigationStatus, record: impl FnOnce()) -> bool {
		let mut previous = NavigationStatus::Active;
		let mut record = Some(record);
		let applied = self.inner.status.send_if_modified(|status| {
			previous = *status;
			if status.is_terminal() {
				return false;
			}
			if let Some(record) = record.take() {
				record();
			}
			*status = next;
			true
		});

		if applied {
			debug!(id = self.id(), status = %next, "navigation settled");
		} else {
			warn!(
				id = self.id(),
				current = %previous,
				requested = %next,
				"ignoring transition of a settled navigation"
			);
		}
		applied
	}
}

impl fmt::Debug for NavigationEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavigationEvent")
			.field("id", &self.inner.id)
			.field("to", &self.inner.to.path)
			.field("from", &self.inner.from.path)
			.field("status", &self.status())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use std::time::Duration;

	#[fixture]
	fn event() -> NavigationEvent {
		NavigationEvent::new(ResolvedRoute::default(), RouterLocation::default())
	}

	#[rstest]
	fn test_new_event_is_active(event: NavigationEvent) {
		assert_eq!(event.status(), NavigationStatus::Active);
		assert!(event.is_active());
		assert!(Uuid::parse_str(event.id()).is_ok());
	}

	#[rstest]
	fn test_terminal_status_never_changes(event: NavigationEvent) {
		// Act
		let first = event.complete();
		let second = event.cancel(Some("late".to_string()));
		let third = event.redirect(NavigationIntent::path("/x"));

		// Assert
		assert!(first);
		assert!(!second);
		assert!(!third);
		assert_eq!(event.status(), NavigationStatus::Completed);
		assert!(event.error().is_none());
		assert!(event.redirected_to().is_none());
	}

	#[rstest]
	fn test_cancel_records_error(event: NavigationEvent) {
		assert!(event.cancel(None));
		assert!(event.error().is_some_and(|e| e.is_cancelled()));
	}

	#[rstest]
	fn test_clones_share_status(event: NavigationEvent) {
		let clone = event.clone();
		clone.fail(RouterError::History("quota".into()));
		assert_eq!(event.status(), NavigationStatus::Failed);
	}

	#[rstest]
	#[tokio::test]
	async fn test_settled_waits_for_terminal_status(event: NavigationEvent) {
		// Arrange
		let waiter = event.clone();
		let handle = tokio::spawn(async move { waiter.settled().await });

		// Act
		tokio::time::sleep(Duration::from_millis(10)).await;
		event.redirect(NavigationIntent::path("/elsewhere"));

		// Assert
		assert_eq!(handle.await.unwrap(), NavigationStatus::Redirected);
		assert_eq!(
			event.redirected_to().and_then(|to| to.path),
			Some("/elsewhere".to_string())
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_settled_returns_immediately_when_terminal(event: NavigationEvent) {
		event.complete();
		assert_eq!(event.settled().await, NavigationStatus::Completed);
	}
}
