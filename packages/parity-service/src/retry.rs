use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use ahash::AHashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::{
	CancelToken, Error, Result,
	engine::{self, Inner},
};
use parity_domain::{ComparisonRecord, RetryObservation, SearchRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrySummary {
	/// Mismatched records picked up for a retry.
	pub attempted: usize,
	/// Retries whose sets matched.
	pub transient: usize,
	pub confirmed: usize,
	pub failed: usize,
	/// Records without a retryable request or executor.
	pub skipped: usize,
}

enum RetryResult {
	Transient,
	Confirmed,
	Failed,
	Skipped,
}

/// Retries every currently mismatched record with the request that produced it. Returns the
/// summary and whether cancellation cut the pass short.
pub(crate) async fn retry_mismatches(
	inner: &Arc<Inner>,
	originals: AHashMap<Uuid, SearchRequest>,
	cancel: &CancelToken,
) -> (RetrySummary, bool) {
	let mismatched = inner.store.mismatched();
	let attempted = mismatched.len();
	let mut summary = RetrySummary { attempted, ..RetrySummary::default() };

	if mismatched.is_empty() {
		return (summary, false);
	}

	tracing::info!(count = attempted, "Retrying mismatched comparisons.");

	let mut work = Vec::with_capacity(attempted);

	for record in mismatched {
		match originals.get(&record.origin_call_id) {
			Some(request) => work.push(request.clone()),
			None => {
				tracing::warn!(
					site_code = record.key.site_code,
					searcher_user_id = record.key.searcher_user_id,
					kind = %record.key.kind,
					"Mismatched record has no request in this batch. Skipping retry."
				);

				summary.skipped += 1;
			},
		}
	}

	let counter = Arc::new(AtomicUsize::new(0));
	let total = work.len();
	let shared = inner.clone();
	let bounded =
		engine::for_each_bounded(inner.settings.max_parallelism, work, cancel, move |request| {
			let inner = shared.clone();
			let counter = counter.clone();

			async move {
				let result = retry_one(&inner, &request).await;
				let current = counter.fetch_add(1, Ordering::SeqCst) + 1;

				inner.progress(current, total, format!("Retried: {}", request.label()));

				result
			}
		})
		.await;

	for result in bounded.outputs {
		match result {
			RetryResult::Transient => summary.transient += 1,
			RetryResult::Confirmed => summary.confirmed += 1,
			RetryResult::Failed => summary.failed += 1,
			RetryResult::Skipped => summary.skipped += 1,
		}
	}

	tracing::info!(
		attempted = summary.attempted,
		transient = summary.transient,
		confirmed = summary.confirmed,
		failed = summary.failed,
		skipped = summary.skipped,
		"Retry pass finished."
	);

	(summary, bounded.canceled)
}

async fn retry_one(inner: &Inner, request: &SearchRequest) -> RetryResult {
	match inner.retry_record(request).await {
		Ok(record) =>
			if record.retry.retry_matched() == Some(true) {
				RetryResult::Transient
			} else {
				RetryResult::Confirmed
			},
		Err(Error::UnknownKind { kind }) => {
			tracing::warn!(
				site_code = request.site_code,
				searcher_user_id = request.searcher_user_id,
				kind = kind.as_str(),
				"No executor for retry. Skipping."
			);

			RetryResult::Skipped
		},
		Err(err @ Error::NotRetryable { .. }) => {
			tracing::warn!(
				site_code = request.site_code,
				searcher_user_id = request.searcher_user_id,
				kind = %request.kind,
				error = %err,
				"Skipping retry."
			);

			RetryResult::Skipped
		},
		Err(err) => {
			tracing::error!(
				site_code = request.site_code,
				searcher_user_id = request.searcher_user_id,
				kind = %request.kind,
				call_id = %request.call_id,
				error = %err,
				"Retry failed."
			);

			RetryResult::Failed
		},
	}
}

impl Inner {
	/// Re-runs `request` on both deployments with diagnostics on and folds the observation into
	/// the stored record. The record's `matched` flag is left as the first pass set it. Records
	/// that matched or were already retried are refused with [`Error::NotRetryable`].
	pub(crate) async fn retry_record(&self, request: &SearchRequest) -> Result<ComparisonRecord> {
		let executor = self.registry.get(request.kind)?;
		let key = request.record_key();

		match self.store.get(&key) {
			Some(record) if record.awaits_retry() => {},
			Some(_) =>
				return Err(Error::NotRetryable {
					message: format!("{} is matched or already retried.", request.label()),
				}),
			None =>
				return Err(Error::NotRetryable {
					message: format!("No comparison record exists for {}.", request.label()),
				}),
		}

		let options = self.options(true);
		let (control, test) = tokio::try_join!(
			executor.execute(request, &self.control, options),
			executor.execute(request, &self.test, options),
		)?;
		let control_ids = executor.extract_user_ids(&control);
		let test_ids = executor.extract_user_ids(&test);
		let observation = RetryObservation::observe(&control, &control_ids, &test, &test_ids);
		let mut applied = false;
		let record = self
			.store
			.update(&key, |record| {
				if record.awaits_retry() {
					record.apply_retry(observation);

					applied = true;
				}
			})
			.ok_or_else(|| Error::NotRetryable {
				message: format!("Comparison record for {} disappeared.", request.label()),
			})?;

		// Another retry of the same key may have landed while the calls ran.
		if !applied {
			return Err(Error::NotRetryable {
				message: format!("{} changed while the retry ran.", request.label()),
			});
		}

		if observation.matched {
			tracing::info!(
				site_code = request.site_code,
				searcher_user_id = request.searcher_user_id,
				kind = %request.kind,
				"Mismatch did not reproduce on retry."
			);
		} else {
			tracing::info!(
				site_code = request.site_code,
				searcher_user_id = request.searcher_user_id,
				kind = %request.kind,
				control_call_id = %record.control_call_id,
				test_call_id = %record.test_call_id,
				"Mismatch confirmed on retry."
			);
		}

		self.observer.on_completed(&record);

		Ok(record)
	}
}
