use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
	pub user_id: UserId,
	#[serde(default)]
	pub slot_type: String,
	#[serde(default, with = "crate::time_serde::option")]
	pub last_activity: Option<OffsetDateTime>,
}

/// Rows returned for one (request, deployment) execution, tagged with the call id that
/// execution actually used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
	pub call_id: Uuid,
	pub rows: Vec<ResultRow>,
}
impl ResultSet {
	pub fn new(call_id: Uuid, rows: Vec<ResultRow>) -> Self {
		Self { call_id, rows }
	}

	pub fn user_ids(&self) -> Vec<UserId> {
		self.rows.iter().map(|row| row.user_id).collect()
	}

	/// Buckets ids by slot label in first-seen label order.
	pub fn slot_buckets(&self) -> SlotBuckets {
		let mut buckets = SlotBuckets::default();

		for row in &self.rows {
			buckets.push(&row.slot_type, row.user_id);
		}

		buckets
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBucket {
	pub label: String,
	pub ids: Vec<UserId>,
}

/// Ordered slot mapping. Label order is significant: lookups resolve an id to the first
/// bucket that contains it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotBuckets(Vec<SlotBucket>);
impl SlotBuckets {
	pub fn new(buckets: Vec<SlotBucket>) -> Self {
		Self(buckets)
	}

	pub fn push(&mut self, label: &str, id: UserId) {
		match self.0.iter_mut().find(|bucket| bucket.label == label) {
			Some(bucket) => bucket.ids.push(id),
			None => self.0.push(SlotBucket { label: label.to_string(), ids: vec![id] }),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn buckets(&self) -> &[SlotBucket] {
		&self.0
	}

	pub fn first_label_index(&self) -> HashMap<UserId, &str> {
		let mut index = HashMap::new();

		for bucket in &self.0 {
			for id in &bucket.ids {
				index.entry(*id).or_insert(bucket.label.as_str());
			}
		}

		index
	}
}
