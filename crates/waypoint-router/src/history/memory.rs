use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::{HistoryEntry, HistoryEvent, HistoryStack, ScrollPosition};
use crate::error::RouterResult;

const EVENT_CAPACITY: usize = 64;

struct Stack {
	entries: Vec<HistoryEntry>,
	index: usize,
}

/// In-memory history stack.
///
/// Behaves like a browser session history: pushing drops forward entries,
/// traversals out of range are ignored, and traversals or [`visit`](Self::visit)
/// are broadcast to subscribers.
pub struct MemoryHistory {
	stack: Mutex<Stack>,
	title: Mutex<Option<String>>,
	scroll: Mutex<Option<ScrollPosition>>,
	events: broadcast::Sender<HistoryEvent>,
}

impl MemoryHistory {
	/// Creates a stack whose single entry points at `url`.
	pub fn new(url: impl Into<String>) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			stack: Mutex::new(Stack {
				entries: vec![HistoryEntry {
					url: url.into(),
					title: None,
					state: Value::Null,
				}],
				index: 0,
			}),
			title: Mutex::new(None),
			scroll: Mutex::new(None),
			events,
		}
	}

	/// Simulates the user editing the URL: a new entry without router state.
	pub fn visit(&self, url: impl Into<String>) {
		let url = url.into();
		self.push(HistoryEntry {
			url: url.clone(),
			title: None,
			state: Value::Null,
		});
		debug!(url = url.as_str(), "history url changed");
		let _ = self.events.send(HistoryEvent::UrlChange { url });
	}

	/// All entries, oldest first.
	pub fn entries(&self) -> Vec<HistoryEntry> {
		self.stack.lock().entries.clone()
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.stack.lock().entries.len()
	}

	/// Whether the stack is empty. Never true: there is always a current entry.
	pub fn is_empty(&self) -> bool {
		self.stack.lock().entries.is_empty()
	}

	/// Position of the current entry.
	pub fn index(&self) -> usize {
		self.stack.lock().index
	}

	/// Last title set.
	pub fn title(&self) -> Option<String> {
		self.title.lock().clone()
	}

	/// Sets the scroll offset saved with the next written entries.
	pub fn set_scroll_position(&self, position: ScrollPosition) {
		*self.scroll.lock() = Some(position);
	}

	fn push(&self, entry: HistoryEntry) {
		let mut stack = self.stack.lock();
		let keep = stack.index + 1;
		stack.entries.truncate(keep);
		stack.entries.push(entry);
		stack.index = keep;
	}

	fn traverse(&self, delta: isize) {
		let entry = {
			let mut stack = self.stack.lock();
			let Some(target) = stack.index.checked_add_signed(delta) else {
				return;
			};
			let Some(entry) = stack.entries.get(target).cloned() else {
				return;
			};
			stack.index = target;
			entry
		};

		debug!(delta, url = entry.url.as_str(), "history traversed");
		let _ = self.events.send(HistoryEvent::Traverse {
			url: entry.url,
			state: entry.state,
		});
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl std::fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let stack = self.stack.lock();
		f.debug_struct("MemoryHistory")
			.field("len", &stack.entries.len())
			.field("index", &stack.index)
			.finish()
	}
}

#[async_trait]
impl HistoryStack for MemoryHistory {
	async fn push_entry(&self, state: Value, title: Option<&str>, url: &str) -> RouterResult<()> {
		self.push(HistoryEntry {
			url: url.to_string(),
			title: title.map(str::to_string),
			state,
		});
		Ok(())
	}

	async fn replace_entry(&self, state: Value, title: Option<&str>, url: &str) -> RouterResult<()> {
		let mut stack = self.stack.lock();
		let index = stack.index;
		if let Some(current) = stack.entries.get_mut(index) {
			*current = HistoryEntry {
				url: url.to_string(),
				title: title.map(str::to_string),
				state,
			};
		}
		Ok(())
	}

	fn back(&self) {
		self.traverse(-1);
	}

	fn forward(&self) {
		self.traverse(1);
	}

	fn go(&self, delta: isize) {
		self.traverse(delta);
	}

	fn current_url(&self) -> String {
		let stack = self.stack.lock();
		stack
			.entries
			.get(stack.index)
			.map(|entry| entry.url.clone())
			.unwrap_or_default()
	}

	fn current_state(&self) -> Option<Value> {
		let stack = self.stack.lock();
		stack
			.entries
			.get(stack.index)
			.map(|entry| entry.state.clone())
			.filter(|state| !state.is_null())
	}

	fn set_title(&self, title: &str) {
		*self.title.lock() = Some(title.to_string());
	}

	fn scroll_position(&self) -> Option<ScrollPosition> {
		*self.scroll.lock()
	}

	fn subscribe(&self) -> Option<broadcast::Receiver<HistoryEvent>> {
		Some(self.events.subscribe())
	}
}
