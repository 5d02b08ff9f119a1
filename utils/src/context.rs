use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};

/// Why a [`Context`] finished.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CancelReason {
	Cancel,
}

impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Cancel => write!(f, "Cancel"),
		}
	}
}

struct RawContext {
	// Dropped together with the last context clone, which wakes `Handler::done`.
	_sender: oneshot::Sender<()>,
	cancel_receiver: broadcast::Receiver<()>,
}

/// Owned by whoever is allowed to shut the process down.
pub struct Handler {
	recv: oneshot::Receiver<()>,
	cancel_sender: broadcast::Sender<()>,
}

impl Handler {
	/// Resolves once every [`Context`] clone has been dropped.
	pub async fn done(&mut self) {
		let _ = (&mut self.recv).await;
	}

	/// Signals every [`Context`] clone and waits for all of them to be dropped.
	pub async fn cancel(self) {
		drop(self.cancel_sender);

		let _ = self.recv.await;
	}
}

/// A cheap, cloneable cancellation token handed to long running tasks.
#[derive(Clone)]
pub struct Context(Arc<RawContext>);

impl Context {
	#[must_use]
	pub fn new() -> (Self, Handler) {
		let (sender, recv) = oneshot::channel();
		let (cancel_sender, cancel_receiver) = broadcast::channel(1);

		(
			Self(Arc::new(RawContext {
				_sender: sender,
				cancel_receiver,
			})),
			Handler { recv, cancel_sender },
		)
	}

	pub async fn done(&self) -> CancelReason {
		let mut recv = self.0.cancel_receiver.resubscribe();
		let _ = recv.recv().await;
		CancelReason::Cancel
	}
}
