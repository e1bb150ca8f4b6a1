//! Suppression of one-sided differences caused by eventually consistent data movement.
//!
//! A user who was active inside the staleness window may legitimately show up on only one
//! deployment while the backends converge. Such ids are moved out of the reported only-set and
//! kept on the record as "ignored" for auditability.

use std::collections::{HashMap, HashSet};

use time::{Duration, OffsetDateTime};

use crate::{IdDiff, ResultRow, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyPolicy {
	pub enabled: bool,
	pub window: Duration,
}
impl RecencyPolicy {
	pub fn disabled() -> Self {
		Self { enabled: false, window: Duration::ZERO }
	}

	pub fn threshold(&self, now: OffsetDateTime) -> OffsetDateTime {
		now - self.window
	}
}
impl Default for RecencyPolicy {
	fn default() -> Self {
		Self { enabled: true, window: Duration::hours(1) }
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecencyOutcome {
	pub ignored_from_a: Vec<UserId>,
	pub ignored_from_b: Vec<UserId>,
}

/// Returns the ids of `only_in` whose latest activity in `rows` is at or after `threshold`, in
/// `only_in` order. Ids without an activity timestamp are never ignored.
pub fn filter_recent(
	only_in: &[UserId],
	rows: &[ResultRow],
	threshold: OffsetDateTime,
) -> Vec<UserId> {
	if only_in.is_empty() {
		return Vec::new();
	}

	let mut latest: HashMap<UserId, OffsetDateTime> = HashMap::new();

	for row in rows {
		let Some(seen_at) = row.last_activity else {
			continue;
		};

		latest
			.entry(row.user_id)
			.and_modify(|current| {
				if seen_at > *current {
					*current = seen_at;
				}
			})
			.or_insert(seen_at);
	}

	let mut emitted = HashSet::new();

	only_in
		.iter()
		.copied()
		.filter(|id| latest.get(id).is_some_and(|seen_at| *seen_at >= threshold))
		.filter(|id| emitted.insert(*id))
		.collect()
}

/// Narrows `diff` in place and reports what was removed from each side.
pub fn apply(
	policy: &RecencyPolicy,
	diff: &mut IdDiff,
	rows_a: &[ResultRow],
	rows_b: &[ResultRow],
	now: OffsetDateTime,
) -> RecencyOutcome {
	if !policy.enabled || diff.is_match() {
		return RecencyOutcome::default();
	}

	let threshold = policy.threshold(now);
	let ignored_from_a = filter_recent(&diff.only_in_a, rows_a, threshold);
	let ignored_from_b = filter_recent(&diff.only_in_b, rows_b, threshold);

	remove_all(&mut diff.only_in_a, &ignored_from_a);
	remove_all(&mut diff.only_in_b, &ignored_from_b);

	RecencyOutcome { ignored_from_a, ignored_from_b }
}

fn remove_all(ids: &mut Vec<UserId>, removed: &[UserId]) {
	if removed.is_empty() {
		return;
	}

	let removed = removed.iter().copied().collect::<HashSet<_>>();

	ids.retain(|id| !removed.contains(id));
}
