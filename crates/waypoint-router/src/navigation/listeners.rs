//! Listener registries with detachable handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::RouterError;
use crate::location::RouterLocation;
use crate::navigation::event::NavigationEvent;

/// Called when a navigation starts.
pub type StartListener = dyn Fn(&NavigationEvent) + Send + Sync;

/// Called when the current navigation settles, with the location it left.
pub type EndListener = dyn Fn(&NavigationEvent, &RouterLocation) + Send + Sync;

/// Called when a navigation fails. Never called for cancellations.
pub type ErrorListener = dyn Fn(&RouterError, &NavigationEvent) + Send + Sync;

trait Detach: Send + Sync {
	fn detach(&self, id: u64) -> bool;
}

struct Entries<T: ?Sized> {
	next_id: AtomicU64,
	items: RwLock<Vec<(u64, Arc<T>)>>,
}

impl<T: ?Sized + Send + Sync> Detach for Entries<T> {
	fn detach(&self, id: u64) -> bool {
		let mut items = self.items.write();
		let before = items.len();
		items.retain(|(entry, _)| *entry != id);
		items.len() != before
	}
}

/// Ordered set of listeners of one kind.
pub(crate) struct ListenerSet<T: ?Sized> {
	entries: Arc<Entries<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ListenerSet<T> {
	pub(crate) fn new() -> Self {
		Self {
			entries: Arc::new(Entries {
				next_id: AtomicU64::new(1),
				items: RwLock::new(Vec::new()),
			}),
		}
	}

	pub(crate) fn add(&self, listener: Arc<T>) -> ListenerHandle {
		let id = self.entries.next_id.fetch_add(1, Ordering::Relaxed);
		self.entries.items.write().push((id, listener));

		let entries: Arc<dyn Detach> = self.entries.clone();
		ListenerHandle {
			id,
			entries: Arc::downgrade(&entries),
		}
	}

	/// Copies the listeners out so none is called under the lock.
	pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
		self.entries
			.items
			.read()
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect()
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.entries.items.read().len()
	}
}

/// Registration returned by every `on_*` and `before_each` call.
///
/// Dropping the handle keeps the listener registered.
#[derive(Clone)]
pub struct ListenerHandle {
	id: u64,
	entries: Weak<dyn Detach>,
}

impl ListenerHandle {
	/// Removes the listener. Returns `false` if it was already removed or the
	/// router is gone.
	pub fn unsubscribe(&self) -> bool {
		self.entries
			.upgrade()
			.is_some_and(|entries| entries.detach(self.id))
	}
}

impl std::fmt::Debug for ListenerHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ListenerHandle").field("id", &self.id).finish()
	}
}
