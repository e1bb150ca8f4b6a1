use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	RecencyPolicy, ResultSet, SearchKind, SearchRequest, SlotBreakdown, SlotBuckets, UserId, diff,
	recency,
};

/// Identity of a comparison. Retries replace the record stored under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
	pub site_code: i32,
	pub searcher_user_id: UserId,
	pub kind: SearchKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetryOutcome {
	#[default]
	NotRetried,
	ConfirmedMismatch {
		control_count: usize,
		test_count: usize,
	},
	/// The retry produced identical sets; the first mismatch was transient.
	NowMatches {
		control_count: usize,
		test_count: usize,
	},
}
impl RetryOutcome {
	pub fn was_retried(&self) -> bool {
		!matches!(self, Self::NotRetried)
	}

	pub fn retry_matched(&self) -> Option<bool> {
		match self {
			Self::NotRetried => None,
			Self::ConfirmedMismatch { .. } => Some(false),
			Self::NowMatches { .. } => Some(true),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
	pub key: RecordKey,
	pub description: String,
	/// Call id of the historical call this comparison replays.
	pub origin_call_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub call_time: OffsetDateTime,
	pub matched: bool,
	pub control_count: usize,
	pub test_count: usize,
	pub only_in_control: Vec<UserId>,
	pub only_in_test: Vec<UserId>,
	pub in_both: Vec<UserId>,
	pub only_in_control_by_slot: SlotBreakdown,
	pub only_in_test_by_slot: SlotBreakdown,
	pub in_both_by_slot: SlotBreakdown,
	pub control_call_id: Uuid,
	pub test_call_id: Uuid,
	pub ignored_from_control: Vec<UserId>,
	pub ignored_from_test: Vec<UserId>,
	pub retry: RetryOutcome,
}
impl ComparisonRecord {
	/// Diffs both sides, narrows the difference with `policy`, and builds the record.
	pub fn compare(input: CompareInput<'_>) -> Self {
		let CompareInput {
			request,
			control,
			test,
			control_ids,
			test_ids,
			control_slots,
			test_slots,
			policy,
			now,
		} = input;
		let mut id_diff = diff::diff(control_ids, test_ids);
		let ignored = recency::apply(policy, &mut id_diff, &control.rows, &test.rows, now);

		Self {
			key: request.record_key(),
			description: request.label(),
			origin_call_id: request.call_id,
			call_time: request.call_time,
			matched: id_diff.is_match(),
			control_count: control_ids.len(),
			test_count: test_ids.len(),
			only_in_control_by_slot: diff::breakdown_by_slot(&id_diff.only_in_a, control_slots),
			only_in_test_by_slot: diff::breakdown_by_slot(&id_diff.only_in_b, test_slots),
			in_both_by_slot: diff::breakdown_by_slot(&id_diff.in_both, control_slots),
			only_in_control: id_diff.only_in_a,
			only_in_test: id_diff.only_in_b,
			in_both: id_diff.in_both,
			control_call_id: control.call_id,
			test_call_id: test.call_id,
			ignored_from_control: ignored.ignored_from_a,
			ignored_from_test: ignored.ignored_from_b,
			retry: RetryOutcome::NotRetried,
		}
	}

	/// Folds a retry observation in. `matched` is never touched; call ids move to the retry's
	/// only while the mismatch persists.
	pub fn apply_retry(&mut self, retry: RetryObservation) {
		let RetryObservation { control_call_id, test_call_id, control_count, test_count, matched } =
			retry;

		if matched {
			self.retry = RetryOutcome::NowMatches { control_count, test_count };
		} else {
			self.retry = RetryOutcome::ConfirmedMismatch { control_count, test_count };
			self.control_call_id = control_call_id;
			self.test_call_id = test_call_id;
		}
	}

	/// Only a mismatched record that has not been retried yet may take a retry.
	pub fn awaits_retry(&self) -> bool {
		!self.matched && !self.retry.was_retried()
	}

	pub fn ignored_total(&self) -> usize {
		self.ignored_from_control.len() + self.ignored_from_test.len()
	}
}

pub struct CompareInput<'a> {
	pub request: &'a SearchRequest,
	pub control: &'a ResultSet,
	pub test: &'a ResultSet,
	pub control_ids: &'a [UserId],
	pub test_ids: &'a [UserId],
	pub control_slots: &'a SlotBuckets,
	pub test_slots: &'a SlotBuckets,
	pub policy: &'a RecencyPolicy,
	pub now: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryObservation {
	pub control_call_id: Uuid,
	pub test_call_id: Uuid,
	pub control_count: usize,
	pub test_count: usize,
	pub matched: bool,
}
impl RetryObservation {
	/// Judges the retry by the same exact-set rule as the first pass.
	pub fn observe(
		control: &ResultSet,
		control_ids: &[UserId],
		test: &ResultSet,
		test_ids: &[UserId],
	) -> Self {
		Self {
			control_call_id: control.call_id,
			test_call_id: test.call_id,
			control_count: control_ids.len(),
			test_count: test_ids.len(),
			matched: diff::diff(control_ids, test_ids).is_match(),
		}
	}
}
