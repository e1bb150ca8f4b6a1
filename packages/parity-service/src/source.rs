use std::{fs, path::Path};

use time::OffsetDateTime;

use crate::{BoxFuture, Error, Result};
use parity_domain::SearchRequest;
use parity_storage::{db::Db, search_log};

/// Supplies the batch of requests to replay for a shard.
pub trait RequestSource
where
	Self: Send + Sync,
{
	fn requests<'a>(&'a self, shard_id: i32) -> BoxFuture<'a, Result<Vec<SearchRequest>>>;
}

/// Reads recent calls from the historical search log.
pub struct SearchLogSource {
	db: Db,
	cfg: parity_config::Source,
}
impl SearchLogSource {
	pub fn new(db: Db, cfg: parity_config::Source) -> Self {
		Self { db, cfg }
	}
}
impl RequestSource for SearchLogSource {
	fn requests<'a>(&'a self, shard_id: i32) -> BoxFuture<'a, Result<Vec<SearchRequest>>> {
		Box::pin(async move {
			Ok(search_log::load_requests(&self.db, &self.cfg, shard_id, OffsetDateTime::now_utc())
				.await?)
		})
	}
}

/// A fixed batch, typically loaded from a JSON file. The shard argument is ignored; requests
/// keep the shard they were recorded with.
pub struct StaticSource {
	requests: Vec<SearchRequest>,
}
impl StaticSource {
	pub fn new(requests: Vec<SearchRequest>) -> Self {
		Self { requests }
	}

	pub fn from_json_file(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).map_err(|err| Error::Source {
			message: format!("Failed to read requests file at {path:?}: {err}"),
		})?;
		let requests: Vec<SearchRequest> = serde_json::from_str(&raw).map_err(|err| Error::Source {
			message: format!("Failed to parse requests file at {path:?}: {err}"),
		})?;

		Ok(Self::new(requests.into_iter().map(with_description).collect()))
	}
}
impl RequestSource for StaticSource {
	fn requests<'a>(&'a self, _shard_id: i32) -> BoxFuture<'a, Result<Vec<SearchRequest>>> {
		Box::pin(async move { Ok(self.requests.clone()) })
	}
}

fn with_description(mut request: SearchRequest) -> SearchRequest {
	if request.description.trim().is_empty() {
		request.description = request.label();
	}

	request
}
