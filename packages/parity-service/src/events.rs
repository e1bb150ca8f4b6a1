use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use parity_domain::ComparisonRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
	pub current: usize,
	pub total: usize,
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ComparisonEvent {
	Progress(ProgressEvent),
	Difference(ComparisonRecord),
	Completed(ComparisonRecord),
}

/// Receives engine events from worker tasks. Calls happen inline on the worker, so
/// implementations must return quickly.
pub trait ComparisonObserver
where
	Self: Send + Sync,
{
	fn on_progress(&self, _event: &ProgressEvent) {}

	fn on_difference(&self, _record: &ComparisonRecord) {}

	fn on_completed(&self, _record: &ComparisonRecord) {}
}

pub struct NoopObserver;
impl ComparisonObserver for NoopObserver {}

/// Forwards every event into an unbounded channel.
pub struct ChannelObserver {
	tx: UnboundedSender<ComparisonEvent>,
}
impl ChannelObserver {
	pub fn new() -> (Self, UnboundedReceiver<ComparisonEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();

		(Self { tx }, rx)
	}

	fn send(&self, event: ComparisonEvent) {
		if self.tx.send(event).is_err() {
			tracing::debug!("Comparison event receiver dropped.");
		}
	}
}
impl ComparisonObserver for ChannelObserver {
	fn on_progress(&self, event: &ProgressEvent) {
		self.send(ComparisonEvent::Progress(event.clone()));
	}

	fn on_difference(&self, record: &ComparisonRecord) {
		self.send(ComparisonEvent::Difference(record.clone()));
	}

	fn on_completed(&self, record: &ComparisonRecord) {
		self.send(ComparisonEvent::Completed(record.clone()));
	}
}
