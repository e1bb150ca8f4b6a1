use std::{
	collections::BTreeSet,
	future::Future,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};

use ahash::AHashMap;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::{sync::Semaphore, task::JoinSet};
use uuid::Uuid;

use crate::{
	CancelToken, ComparisonObserver, Error, ExecuteOptions, ExecutorRegistry, ProgressEvent,
	RecordStore, Result, retry::RetrySummary,
};
use parity_domain::{
	ComparisonRecord, CompareInput, Deployment, RecencyPolicy, SearchKind, SearchRequest,
};

/// Immutable run settings, built once at startup.
#[derive(Debug, Clone)]
pub struct CompareSettings {
	pub max_parallelism: usize,
	pub enabled_kinds: BTreeSet<SearchKind>,
	pub auto_retry_mismatches: bool,
	pub recency: RecencyPolicy,
	/// Forwarded to every execution as the executor's extra configuration.
	pub extra_config: Option<String>,
}
impl CompareSettings {
	pub fn from_config(cfg: &parity_config::Config) -> Self {
		Self {
			max_parallelism: cfg.compare.max_parallelism,
			enabled_kinds: cfg.enabled_kinds(),
			auto_retry_mismatches: cfg.compare.auto_retry_mismatches,
			recency: cfg.recency_policy(),
			extra_config: None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
	/// Requests dispatched after kind filtering.
	pub total: usize,
	pub skipped: usize,
	pub succeeded: usize,
	/// Requests that produced no record.
	pub failed: usize,
	pub retry: Option<RetrySummary>,
}

/// Replays request batches against the control and test deployments and keeps one
/// comparison record per (site, searcher, kind).
pub struct Comparator {
	inner: Arc<Inner>,
}
impl Comparator {
	pub fn new(
		settings: CompareSettings,
		control: Deployment,
		test: Deployment,
		registry: ExecutorRegistry,
		observer: Arc<dyn ComparisonObserver>,
	) -> Result<Self> {
		if settings.max_parallelism == 0 {
			return Err(Error::InvalidConfig {
				message: "max_parallelism must be greater than zero.".to_string(),
			});
		}

		for kind in &settings.enabled_kinds {
			if !registry.contains(*kind) {
				tracing::warn!(
					kind = %kind,
					"Search kind is enabled but has no executor. Its requests will fail."
				);
			}
		}

		Ok(Self {
			inner: Arc::new(Inner {
				settings,
				control,
				test,
				registry,
				observer,
				store: RecordStore::new(),
			}),
		})
	}

	/// Runs one batch. Per-request failures are logged and leave no record. Cancellation stops
	/// dispatch, aborts in-flight requests, and surfaces as [`Error::Canceled`]; records written
	/// before that point are kept.
	pub async fn run(&self, requests: Vec<SearchRequest>, cancel: &CancelToken) -> Result<RunOutcome> {
		let received = requests.len();
		let (selected, disabled): (Vec<_>, Vec<_>) = requests
			.into_iter()
			.partition(|request| self.inner.settings.enabled_kinds.contains(&request.kind));
		let skipped = disabled.len();

		if skipped > 0 {
			tracing::info!(skipped, received, "Skipped requests whose search kind is disabled.");
		}

		let total = selected.len();
		let originals: AHashMap<Uuid, SearchRequest> = if self.inner.settings.auto_retry_mismatches {
			selected.iter().map(|request| (request.call_id, request.clone())).collect()
		} else {
			AHashMap::new()
		};

		self.inner.progress(0, total, format!("Comparing {total} requests."));

		let initial = self.compare_all(selected, total, cancel).await;
		let succeeded = initial.outputs.iter().filter(|ok| **ok).count();

		if initial.canceled {
			tracing::warn!(completed = succeeded, total, "Comparison canceled.");

			return Err(Error::Canceled { completed: succeeded, total });
		}

		let failed = total - succeeded;

		if failed > 0 {
			tracing::warn!(failed, total, "Requests failed and are absent from the results.");
		}

		let mut outcome = RunOutcome { total, skipped, succeeded, failed, retry: None };

		if self.inner.settings.auto_retry_mismatches {
			let (summary, canceled) =
				crate::retry::retry_mismatches(&self.inner, originals, cancel).await;

			if canceled {
				tracing::warn!(completed = succeeded, total, "Comparison canceled during retries.");

				return Err(Error::Canceled { completed: succeeded, total });
			}

			outcome.retry = Some(summary);
		}

		self.inner.progress(total, total, "Comparison complete.".to_string());

		tracing::info!(
			total,
			skipped,
			succeeded,
			failed,
			mismatched = self.inner.store.mismatched().len(),
			"Comparison complete."
		);

		Ok(outcome)
	}

	/// Re-executes one mismatched record's request with diagnostics enabled and folds the
	/// result into the stored record. Each record takes at most one retry.
	pub async fn retry(&self, request: &SearchRequest) -> Result<ComparisonRecord> {
		self.inner.retry_record(request).await
	}

	/// Snapshot of every record, ordered by key.
	pub fn records(&self) -> Vec<ComparisonRecord> {
		self.inner.store.snapshot()
	}

	pub fn clear(&self) {
		self.inner.store.clear();
	}

	/// Enabled kind identifiers, sorted.
	pub fn enabled_kinds(&self) -> Vec<String> {
		let mut kinds = self
			.inner
			.settings
			.enabled_kinds
			.iter()
			.map(|kind| kind.class_name().to_string())
			.collect::<Vec<_>>();

		kinds.sort();

		kinds
	}

	pub fn registered_kinds(&self) -> Vec<SearchKind> {
		self.inner.registry.kinds()
	}

	async fn compare_all(
		&self,
		requests: Vec<SearchRequest>,
		total: usize,
		cancel: &CancelToken,
	) -> Bounded<bool> {
		let inner = self.inner.clone();
		let counter = Arc::new(AtomicUsize::new(0));

		for_each_bounded(self.inner.settings.max_parallelism, requests, cancel, move |request| {
			let inner = inner.clone();
			let counter = counter.clone();

			async move {
				let result = inner.compare_one(&request).await;
				let current = counter.fetch_add(1, Ordering::SeqCst) + 1;

				match result {
					Ok(record) => {
						inner.progress(current, total, record.description);

						true
					},
					Err(err) => {
						tracing::error!(
							site_code = request.site_code,
							searcher_user_id = request.searcher_user_id,
							kind = %request.kind,
							call_id = %request.call_id,
							error = %err,
							"Comparison failed."
						);

						inner.progress(current, total, format!("Failed: {}", request.label()));

						false
					},
				}
			}
		})
		.await
	}
}

pub(crate) struct Inner {
	pub(crate) settings: CompareSettings,
	pub(crate) control: Deployment,
	pub(crate) test: Deployment,
	pub(crate) registry: ExecutorRegistry,
	pub(crate) observer: Arc<dyn ComparisonObserver>,
	pub(crate) store: RecordStore,
}
impl Inner {
	pub(crate) fn progress(&self, current: usize, total: usize, message: String) {
		self.observer.on_progress(&ProgressEvent { current, total, message });
	}

	pub(crate) fn options(&self, diagnostics: bool) -> ExecuteOptions<'_> {
		ExecuteOptions { extra_config: self.settings.extra_config.as_deref(), diagnostics }
	}

	async fn compare_one(&self, request: &SearchRequest) -> Result<ComparisonRecord> {
		let executor = self.registry.get(request.kind)?;
		let options = self.options(false);
		let (control, test) = tokio::try_join!(
			executor.execute(request, &self.control, options),
			executor.execute(request, &self.test, options),
		)?;
		let control_ids = executor.extract_user_ids(&control);
		let test_ids = executor.extract_user_ids(&test);
		let control_slots = executor.extract_user_ids_by_slot(&control);
		let test_slots = executor.extract_user_ids_by_slot(&test);
		let record = ComparisonRecord::compare(CompareInput {
			request,
			control: &control,
			test: &test,
			control_ids: &control_ids,
			test_ids: &test_ids,
			control_slots: &control_slots,
			test_slots: &test_slots,
			policy: &self.settings.recency,
			now: OffsetDateTime::now_utc(),
		});

		if !record.matched {
			tracing::info!(
				site_code = request.site_code,
				searcher_user_id = request.searcher_user_id,
				kind = %request.kind,
				only_in_control = record.only_in_control.len(),
				only_in_test = record.only_in_test.len(),
				"Result sets differ."
			);
		}

		self.store.upsert(record.clone());

		if !record.matched {
			self.observer.on_difference(&record);
		}

		self.observer.on_completed(&record);

		Ok(record)
	}
}

pub(crate) struct Bounded<O> {
	pub(crate) outputs: Vec<O>,
	pub(crate) canceled: bool,
}

/// Runs `work` over `items` with at most `max_parallelism` in flight. Cancellation is checked
/// before each item starts and raced against every in-flight item.
pub(crate) async fn for_each_bounded<T, O, F, Fut>(
	max_parallelism: usize,
	items: Vec<T>,
	cancel: &CancelToken,
	work: F,
) -> Bounded<O>
where
	T: Send + 'static,
	O: Send + 'static,
	F: Fn(T) -> Fut,
	Fut: Future<Output = O> + Send + 'static,
{
	let semaphore = Arc::new(Semaphore::new(max_parallelism));
	let mut tasks = JoinSet::new();
	let mut canceled = false;

	for item in items {
		let permit = tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				canceled = true;

				break;
			},
			permit = semaphore.clone().acquire_owned() => match permit {
				Ok(permit) => permit,
				Err(_) => break,
			},
		};
		let cancel = cancel.clone();
		let fut = work(item);

		tasks.spawn(async move {
			let _permit = permit;

			tokio::select! {
				biased;
				_ = cancel.cancelled() => None,
				output = fut => Some(output),
			}
		});
	}

	let mut outputs = Vec::new();

	while let Some(joined) = tasks.join_next().await {
		match joined {
			Ok(Some(output)) => outputs.push(output),
			Ok(None) => canceled = true,
			Err(err) => {
				tracing::error!(error = %Error::from(err), "Comparison task aborted.");
			},
		}
	}

	Bounded { outputs, canceled }
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn bounded_respects_the_limit() {
		let in_flight = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));
		let cancel = CancelToken::new();
		let result = for_each_bounded(3, (0..12).collect::<Vec<usize>>(), &cancel, {
			let in_flight = in_flight.clone();
			let peak = peak.clone();

			move |item| {
				let in_flight = in_flight.clone();
				let peak = peak.clone();

				async move {
					let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;

					peak.fetch_max(now, Ordering::SeqCst);
					tokio::time::sleep(Duration::from_millis(5)).await;
					in_flight.fetch_sub(1, Ordering::SeqCst);

					item
				}
			}
		})
		.await;

		assert!(!result.canceled);
		assert_eq!(result.outputs.len(), 12);
		assert!(peak.load(Ordering::SeqCst) <= 3);
	}

	#[tokio::test]
	async fn bounded_stops_when_canceled_up_front() {
		let cancel = CancelToken::new();

		cancel.cancel();

		let result = for_each_bounded(2, vec![1, 2, 3], &cancel, |item| async move { item }).await;

		assert!(result.canceled);
		assert!(result.outputs.is_empty());
	}
}
