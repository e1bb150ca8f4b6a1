use std::collections::BTreeMap;

use serde::Serialize;

use crate::{ComparisonRecord, RetryOutcome, UserId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
	pub total: usize,
	pub matched: usize,
	pub mismatched: usize,
	/// Percentage of matched records; zero when nothing was compared.
	pub success_rate: f64,
	pub retried: usize,
	pub confirmed_mismatches: usize,
	pub transient_mismatches: usize,
	pub ignored_as_recent: usize,
	pub sites: Vec<SiteSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummary {
	pub site_code: i32,
	pub total: usize,
	pub matched: usize,
	pub mismatched: usize,
	pub mismatched_user_ids: Vec<UserId>,
}

pub fn summarize(records: &[ComparisonRecord]) -> RunSummary {
	let mut sites: BTreeMap<i32, SiteSummary> = BTreeMap::new();
	let mut summary = RunSummary {
		total: records.len(),
		matched: 0,
		mismatched: 0,
		success_rate: 0.0,
		retried: 0,
		confirmed_mismatches: 0,
		transient_mismatches: 0,
		ignored_as_recent: 0,
		sites: Vec::new(),
	};

	for record in records {
		let site = sites.entry(record.key.site_code).or_insert_with(|| SiteSummary {
			site_code: record.key.site_code,
			total: 0,
			matched: 0,
			mismatched: 0,
			mismatched_user_ids: Vec::new(),
		});

		site.total += 1;
		summary.ignored_as_recent += record.ignored_total();

		if record.matched {
			site.matched += 1;
			summary.matched += 1;
		} else {
			site.mismatched += 1;
			site.mismatched_user_ids.push(record.key.searcher_user_id);
			summary.mismatched += 1;
		}

		match record.retry {
			RetryOutcome::NotRetried => {},
			RetryOutcome::ConfirmedMismatch { .. } => {
				summary.retried += 1;
				summary.confirmed_mismatches += 1;
			},
			RetryOutcome::NowMatches { .. } => {
				summary.retried += 1;
				summary.transient_mismatches += 1;
			},
		}
	}

	if summary.total > 0 {
		summary.success_rate = summary.matched as f64 * 100.0 / summary.total as f64;
	}

	summary.sites = sites
		.into_values()
		.map(|mut site| {
			site.mismatched_user_ids.sort_unstable();

			site
		})
		.collect();

	summary
}
