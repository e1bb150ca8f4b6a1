use std::sync::Arc;

use ahash::AHashMap;
use reqwest::Client;
use uuid::Uuid;

use crate::{BoxFuture, Error, Result};
use parity_domain::{Deployment, ResultSet, SearchKind, SearchRequest, SlotBuckets, UserId};
use parity_providers::search::{self, SearchCall};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions<'a> {
	pub extra_config: Option<&'a str>,
	pub diagnostics: bool,
}

/// Runs one request against one deployment for the kinds it is registered under.
pub trait SearchExecutor
where
	Self: Send + Sync,
{
	/// The returned set must carry the call id actually sent for this execution.
	fn execute<'a>(
		&'a self,
		request: &'a SearchRequest,
		deployment: &'a Deployment,
		options: ExecuteOptions<'a>,
	) -> BoxFuture<'a, Result<ResultSet>>;

	fn extract_user_ids(&self, results: &ResultSet) -> Vec<UserId> {
		results.user_ids()
	}

	/// Kinds without slot semantics return an empty mapping.
	fn extract_user_ids_by_slot(&self, results: &ResultSet) -> SlotBuckets {
		results.slot_buckets()
	}
}

/// Closed mapping from search kind to executor.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
	executors: AHashMap<SearchKind, Arc<dyn SearchExecutor>>,
}
impl ExecutorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers the HTTP executor for every known kind.
	pub fn http(cfg: &parity_config::Config, session_id: Uuid) -> Result<Self> {
		let client = parity_providers::client(&cfg.executor)?;
		let shared = Arc::new(HttpShared {
			client,
			executor: cfg.executor.clone(),
			session_id,
			extension_params: cfg.compare.extension_params.clone(),
		});
		let mut registry = Self::new();

		for kind in SearchKind::ALL {
			registry.register(kind, Arc::new(HttpExecutor { kind, shared: shared.clone() }));
		}

		Ok(registry)
	}

	pub fn register(&mut self, kind: SearchKind, executor: Arc<dyn SearchExecutor>) {
		self.executors.insert(kind, executor);
	}

	pub fn get(&self, kind: SearchKind) -> Result<Arc<dyn SearchExecutor>> {
		self.executors
			.get(&kind)
			.cloned()
			.ok_or_else(|| Error::UnknownKind { kind: kind.class_name().to_string() })
	}

	pub fn contains(&self, kind: SearchKind) -> bool {
		self.executors.contains_key(&kind)
	}

	pub fn kinds(&self) -> Vec<SearchKind> {
		let mut kinds = self.executors.keys().copied().collect::<Vec<_>>();

		kinds.sort();

		kinds
	}
}

struct HttpShared {
	client: Client,
	executor: parity_config::Executor,
	session_id: Uuid,
	extension_params: Vec<String>,
}

pub struct HttpExecutor {
	kind: SearchKind,
	shared: Arc<HttpShared>,
}
impl SearchExecutor for HttpExecutor {
	fn execute<'a>(
		&'a self,
		request: &'a SearchRequest,
		deployment: &'a Deployment,
		options: ExecuteOptions<'a>,
	) -> BoxFuture<'a, Result<ResultSet>> {
		Box::pin(async move {
			let call = SearchCall {
				request,
				deployment,
				session_id: self.shared.session_id,
				extension_params: &self.shared.extension_params,
				extra_config: options.extra_config,
				diagnostics: options.diagnostics,
			};

			Ok(search::execute(&self.shared.client, &self.shared.executor, call).await?)
		})
	}

	fn extract_user_ids_by_slot(&self, results: &ResultSet) -> SlotBuckets {
		if self.kind.has_slots() { results.slot_buckets() } else { SlotBuckets::default() }
	}
}
