use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::HistoryEvent;
use crate::navigation::engine::{Router, WeakRouter};
use crate::settings::ListenMode;

/// Background task keeping a [`Router`] in step with external history changes.
///
/// [`ListenMode::History`] resyncs on traversals, [`ListenMode::Navigation`]
/// also on URL edits. The task holds the router weakly and stops once the
/// router or the event stream is gone.
#[derive(Debug)]
pub struct HistorySync;

impl HistorySync {
	/// Spawns the listener on the current tokio runtime.
	///
	/// Returns `None` when listening is off or the history stack cannot
	/// report changes.
	pub fn spawn(router: &Router) -> Option<JoinHandle<()>> {
		let mode = router.settings().listen;
		if mode == ListenMode::Off {
			return None;
		}
		let events = router.history().subscribe()?;
		Some(tokio::spawn(Self::run(router.downgrade(), events, mode)))
	}

	/// Processes history events until the router or the stream goes away.
	pub async fn run(router: WeakRouter, mut events: broadcast::Receiver<HistoryEvent>, mode: ListenMode) {
		loop {
			match events.recv().await {
				Ok(event) if Self::accepts(mode, &event) => {}
				Ok(_) => continue,
				Err(RecvError::Lagged(skipped)) => warn!(skipped, "history listener lagged, resyncing"),
				Err(RecvError::Closed) => break,
			}
			let Some(router) = router.upgrade() else {
				break;
			};

			match router.sync().await {
				Ok(location) => debug!(path = location.path.as_str(), "router synced with history"),
				Err(error) if error.is_cancelled() => debug!(%error, "history sync superseded"),
				Err(error) => warn!(%error, "history sync failed"),
			}
		}
		debug!("history listener stopped");
	}

	fn accepts(mode: ListenMode, event: &HistoryEvent) -> bool {
		match (mode, event) {
			(ListenMode::Off, _) => false,
			(ListenMode::History, HistoryEvent::Traverse { .. }) => true,
			(ListenMode::History, HistoryEvent::UrlChange { .. }) => false,
			(ListenMode::Navigation, _) => true,
		}
	}
}
