use std::sync::Arc;

use tokio::sync::watch;

/// A run-scoped cancellation signal. Clones observe the same signal; once canceled it stays
/// canceled.
#[derive(Clone, Debug)]
pub struct CancelToken {
	tx: Arc<watch::Sender<bool>>,
	rx: watch::Receiver<bool>,
}
impl CancelToken {
	pub fn new() -> Self {
		let (tx, rx) = watch::channel(false);

		Self { tx: Arc::new(tx), rx }
	}

	pub fn cancel(&self) {
		self.tx.send_replace(true);
	}

	pub fn is_canceled(&self) -> bool {
		*self.rx.borrow()
	}

	/// Resolves once `cancel` has been called on any clone.
	pub async fn cancelled(&self) {
		let mut rx = self.rx.clone();

		// The sender lives as long as `self`, so the wait only ends on cancellation.
		let _ = rx.wait_for(|canceled| *canceled).await;
	}
}
impl Default for CancelToken {
	fn default() -> Self {
		Self::new()
	}
}
