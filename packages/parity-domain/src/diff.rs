use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{SlotBuckets, UserId};

pub type SlotBreakdown = BTreeMap<String, Vec<UserId>>;

/// Set comparison of two id lists. Duplicates collapse and each list keeps the first-seen
/// order of the side it came from (`in_both` follows side A).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdDiff {
	pub only_in_a: Vec<UserId>,
	pub only_in_b: Vec<UserId>,
	pub in_both: Vec<UserId>,
}
impl IdDiff {
	/// Exact set equality: both one-sided differences are empty.
	pub fn is_match(&self) -> bool {
		self.only_in_a.is_empty() && self.only_in_b.is_empty()
	}
}

pub fn diff(a: &[UserId], b: &[UserId]) -> IdDiff {
	let set_a = a.iter().copied().collect::<HashSet<_>>();
	let set_b = b.iter().copied().collect::<HashSet<_>>();
	let mut out = IdDiff::default();
	let mut seen = HashSet::with_capacity(set_a.len());

	for id in a {
		if !seen.insert(*id) {
			continue;
		}

		if set_b.contains(id) {
			out.in_both.push(*id);
		} else {
			out.only_in_a.push(*id);
		}
	}

	seen.clear();

	for id in b {
		if seen.insert(*id) && !set_a.contains(id) {
			out.only_in_b.push(*id);
		}
	}

	out
}

/// Groups `ids` by the first slot label whose bucket contains them. Ids found in no bucket are
/// left out of the breakdown.
pub fn breakdown_by_slot(ids: &[UserId], slots: &SlotBuckets) -> SlotBreakdown {
	let mut out = SlotBreakdown::new();

	if ids.is_empty() || slots.is_empty() {
		return out;
	}

	let index = slots.first_label_index();

	for id in ids {
		if let Some(label) = index.get(id) {
			out.entry((*label).to_string()).or_default().push(*id);
		}
	}

	out
}
