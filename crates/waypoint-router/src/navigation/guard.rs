//! Navigation guards.
//!
//! A guard is an async function of the [`NavigationEvent`] deciding whether a
//! navigation may proceed. Whatever it returns is normalized once into a
//! [`GuardOutcome`] through [`IntoGuardOutcome`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::error::{BoxError, GuardCause};
use crate::intent::NavigationIntent;
use crate::navigation::event::NavigationEvent;

/// Normalized guard result.
#[derive(Debug, Clone)]
pub enum GuardOutcome {
	/// Let the navigation proceed.
	Allow,
	/// Stop the navigation, optionally with the error that caused it.
	Abort(Option<GuardCause>),
	/// Navigate somewhere else instead.
	Redirect(NavigationIntent),
}

impl GuardOutcome {
	/// Whether the guard let the navigation through.
	pub fn is_allow(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// Conversion of guard return values into a [`GuardOutcome`].
///
/// | Returned value              | Outcome    |
/// |-----------------------------|------------|
/// | `()`, `false`, `None`       | `Allow`    |
/// | `true`, `Err(e)`            | `Abort`    |
/// | `NavigationIntent`, `Some`  | `Redirect` |
pub trait IntoGuardOutcome {
	/// Performs the conversion.
	fn into_guard_outcome(self) -> GuardOutcome;
}

impl IntoGuardOutcome for GuardOutcome {
	fn into_guard_outcome(self) -> GuardOutcome {
		self
	}
}

impl IntoGuardOutcome for () {
	fn into_guard_outcome(self) -> GuardOutcome {
		GuardOutcome::Allow
	}
}

impl IntoGuardOutcome for bool {
	fn into_guard_outcome(self) -> GuardOutcome {
		if self {
			GuardOutcome::Abort(None)
		} else {
			GuardOutcome::Allow
		}
	}
}

impl IntoGuardOutcome for NavigationIntent {
	fn into_guard_outcome(self) -> GuardOutcome {
		GuardOutcome::Redirect(self)
	}
}

impl IntoGuardOutcome for Option<NavigationIntent> {
	fn into_guard_outcome(self) -> GuardOutcome {
		self.map_or(GuardOutcome::Allow, GuardOutcome::Redirect)
	}
}

impl<T, E> IntoGuardOutcome for Result<T, E>
where
	T: IntoGuardOutcome,
	E: Into<BoxError>,
{
	fn into_guard_outcome(self) -> GuardOutcome {
		match self {
			Ok(value) => value.into_guard_outcome(),
			Err(error) => {
				let cause: BoxError = error.into();
				GuardOutcome::Abort(Some(Arc::from(cause)))
			}
		}
	}
}

type GuardFn = dyn Fn(NavigationEvent) -> BoxFuture<'static, GuardOutcome> + Send + Sync;

/// A shareable guard function.
///
/// # Example
///
/// ```
/// use waypoint_router::navigation::guard::Guard;
/// use waypoint_router::intent::NavigationIntent;
///
/// let signed_in = false;
/// let guard = Guard::sync(move |_event| {
/// 	(!signed_in).then(|| NavigationIntent::name("login"))
/// });
/// # let _ = guard;
/// ```
#[derive(Clone)]
pub struct Guard(Arc<GuardFn>);

impl Guard {
	/// Wraps an async guard.
	pub fn new<F, Fut, O>(guard: F) -> Self
	where
		F: Fn(NavigationEvent) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = O> + Send + 'static,
		O: IntoGuardOutcome,
	{
		Self(Arc::new(move |event: NavigationEvent| {
			let pending = guard(event);
			async move { pending.await.into_guard_outcome() }.boxed()
		}))
	}

	/// Wraps a synchronous guard.
	pub fn sync<F, O>(guard: F) -> Self
	where
		F: Fn(&NavigationEvent) -> O + Send + Sync + 'static,
		O: IntoGuardOutcome,
	{
		Self(Arc::new(move |event: NavigationEvent| {
			future::ready(guard(&event).into_guard_outcome()).boxed()
		}))
	}

	/// Runs the guard.
	pub fn check(&self, event: NavigationEvent) -> BoxFuture<'static, GuardOutcome> {
		(self.0)(event)
	}
}

impl fmt::Debug for Guard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Guard(..)")
	}
}

/// Runs `leave`, then `enter`, then races `each`.
///
/// The first outcome that is not `Allow` wins. Once a `before_each` guard
/// wins, the remaining ones are dropped without being awaited.
pub(crate) async fn run_guards(
	event: &NavigationEvent,
	leave: Option<Guard>,
	enter: Option<Guard>,
	each: Vec<Arc<Guard>>,
) -> GuardOutcome {
	for (stage, guard) in [("before_leave", leave), ("before_enter", enter)] {
		let Some(guard) = guard else { continue };
		let outcome = guard.check(event.clone()).await;
		if !outcome.is_allow() {
			debug!(id = event.id(), stage, "guard stopped navigation");
			return outcome;
		}
	}

	let mut racing: FuturesUnordered<_> = each
		.iter()
		.map(|guard| guard.check(event.clone()))
		.collect();
	while let Some(outcome) = racing.next().await {
		if !outcome.is_allow() {
			debug!(
				id = event.id(),
				stage = "before_each",
				dropped = racing.len(),
				"guard stopped navigation"
			);
			return outcome;
		}
	}
	GuardOutcome::Allow
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::location::RouterLocation;
	use crate::resolver::ResolvedRoute;
	use rstest::{fixture, rstest};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	#[derive(Debug, thiserror::Error)]
	#[error("forbidden")]
	struct Forbidden;

	#[fixture]
	fn event() -> NavigationEvent {
		NavigationEvent::new(ResolvedRoute::default(), RouterLocation::default())
	}

	#[rstest]
	#[case(().into_guard_outcome(), "allow")]
	#[case(false.into_guard_outcome(), "allow")]
	#[case(true.into_guard_outcome(), "abort")]
	#[case(None::<NavigationIntent>.into_guard_outcome(), "allow")]
	#[case(NavigationIntent::path("/login").into_guard_outcome(), "redirect")]
	#[case(Ok::<_, Forbidden>(()).into_guard_outcome(), "allow")]
	#[case(Err::<(), _>(Forbidden).into_guard_outcome(), "abort")]
	fn test_outcome_normalization(#[case] outcome: GuardOutcome, #[case] expected: &str) {
		let actual = match outcome {
			GuardOutcome::Allow => "allow",
			GuardOutcome::Abort(_) => "abort",
			GuardOutcome::Redirect(_) => "redirect",
		};
		assert_eq!(actual, expected);
	}

	#[rstest]
	fn test_error_becomes_abort_cause() {
		let outcome = Err::<(), _>(Forbidden).into_guard_outcome();
		match outcome {
			GuardOutcome::Abort(Some(cause)) => assert_eq!(cause.to_string(), "forbidden"),
			other => panic!("unexpected outcome {other:?}"),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_leave_short_circuits_enter(event: NavigationEvent) {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let enter = Guard::sync(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		// Act
		let outcome = run_guards(&event, Some(Guard::sync(|_| true)), Some(enter), Vec::new()).await;

		// Assert
		assert!(matches!(outcome, GuardOutcome::Abort(None)));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_first_reporting_each_guard_wins(event: NavigationEvent) {
		// Arrange
		let slow = Guard::new(|_| async {
			tokio::time::sleep(Duration::from_millis(200)).await;
			true
		});
		let fast = Guard::new(|_| async {
			tokio::time::sleep(Duration::from_millis(5)).await;
			NavigationIntent::path("/login")
		});
		let allow = Guard::sync(|_| ());

		// Act
		let outcome = run_guards(
			&event,
			None,
			None,
			vec![Arc::new(slow), Arc::new(allow), Arc::new(fast)],
		)
		.await;

		// Assert
		match outcome {
			GuardOutcome::Redirect(to) => assert_eq!(to.path.as_deref(), Some("/login")),
			other => panic!("unexpected outcome {other:?}"),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_all_allow(event: NavigationEvent) {
		let outcome = run_guards(
			&event,
			Some(Guard::sync(|_| false)),
			Some(Guard::new(|_| async { Ok::<_, Forbidden>(None::<NavigationIntent>) })),
			vec![Arc::new(Guard::sync(|_| ()))],
		)
		.await;
		assert!(outcome.is_allow());
	}
}
