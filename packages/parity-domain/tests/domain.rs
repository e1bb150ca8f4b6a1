use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use parity_domain::{
	ComparisonRecord, CompareInput, RecencyPolicy, ResultRow, ResultSet, RetryObservation,
	RetryOutcome, SearchCriteria, SearchKind, SearchRequest, SlotBuckets, recency, summarize,
};

const NOW: OffsetDateTime = datetime!(2026-03-02 12:00 UTC);

fn request(site_code: i32, searcher_user_id: i64) -> SearchRequest {
	SearchRequest {
		site_code,
		searcher_user_id,
		shard_id: 3,
		request_count: 50,
		kind: SearchKind::OneWay,
		criteria: SearchCriteria::default(),
		call_id: Uuid::new_v4(),
		call_time: NOW - Duration::days(1),
		description: String::new(),
	}
}

fn row(user_id: i64, slot_type: &str, last_activity: OffsetDateTime) -> ResultRow {
	ResultRow { user_id, slot_type: slot_type.to_string(), last_activity: Some(last_activity) }
}

fn stale_set(ids: &[i64]) -> ResultSet {
	ResultSet::new(
		Uuid::new_v4(),
		ids.iter().map(|id| row(*id, "Organic", NOW - Duration::days(3))).collect(),
	)
}

fn compare(
	request: &SearchRequest,
	control: &ResultSet,
	test: &ResultSet,
	policy: RecencyPolicy,
) -> ComparisonRecord {
	let control_ids = control.user_ids();
	let test_ids = test.user_ids();
	let control_slots = control.slot_buckets();
	let test_slots = test.slot_buckets();

	ComparisonRecord::compare(CompareInput {
		request,
		control,
		test,
		control_ids: &control_ids,
		test_ids: &test_ids,
		control_slots: &control_slots,
		test_slots: &test_slots,
		policy: &policy,
		now: NOW,
	})
}

#[test]
fn identical_sets_match() {
	let request = request(1, 1_001);
	let control = stale_set(&[1, 2, 3]);
	let test = stale_set(&[1, 2, 3]);
	let record = compare(&request, &control, &test, RecencyPolicy::default());

	assert!(record.matched);
	assert!(record.only_in_control.is_empty());
	assert!(record.only_in_test.is_empty());
	assert_eq!(record.in_both, vec![1, 2, 3]);
	assert_eq!(record.in_both_by_slot.get("Organic"), Some(&vec![1, 2, 3]));
	assert_eq!(record.retry, RetryOutcome::NotRetried);
}

#[test]
fn one_sided_ids_are_reported_per_side() {
	let request = request(1, 1_001);
	let control = stale_set(&[1, 2, 3]);
	let test = stale_set(&[2, 3, 4]);
	let record = compare(&request, &control, &test, RecencyPolicy::default());

	assert!(!record.matched);
	assert_eq!(record.only_in_control, vec![1]);
	assert_eq!(record.only_in_test, vec![4]);
	assert_eq!(record.in_both, vec![2, 3]);
	assert_eq!(record.control_count, 3);
	assert_eq!(record.test_count, 3);
	assert_eq!(record.control_call_id, control.call_id);
	assert_eq!(record.test_call_id, test.call_id);
	assert_eq!(record.key, request.record_key());
	assert_eq!(record.origin_call_id, request.call_id);
	assert!(record.description.starts_with("Site:1 User:1001 CallId:"));
}

#[test]
fn recent_activity_is_ignored_but_other_side_still_mismatches() {
	let request = request(1, 1_001);
	let control = stale_set(&[1, 2, 3]);
	let mut test = stale_set(&[2, 3]);

	test.rows.push(row(4, "Boost", NOW - Duration::minutes(5)));

	let record = compare(&request, &control, &test, RecencyPolicy::default());

	assert!(!record.matched);
	assert_eq!(record.only_in_control, vec![1]);
	assert!(record.only_in_test.is_empty());
	assert_eq!(record.ignored_from_test, vec![4]);
	assert!(record.ignored_from_control.is_empty());
	assert!(record.only_in_test_by_slot.is_empty());
}

#[test]
fn ignoring_every_one_sided_id_yields_a_match() {
	let request = request(1, 1_001);
	let control = stale_set(&[2, 3]);
	let mut test = stale_set(&[2, 3]);

	test.rows.push(row(4, "Boost", NOW - Duration::minutes(59)));

	let record = compare(&request, &control, &test, RecencyPolicy::default());

	assert!(record.matched);
	assert_eq!(record.ignored_from_test, vec![4]);
	assert_eq!(record.ignored_total(), 1);
}

#[test]
fn recency_filter_is_noop_when_disabled() {
	let request = request(1, 1_001);
	let control = stale_set(&[2, 3]);
	let mut test = stale_set(&[2, 3]);

	test.rows.push(row(4, "Boost", NOW));

	let record = compare(&request, &control, &test, RecencyPolicy::disabled());

	assert!(!record.matched);
	assert_eq!(record.only_in_test, vec![4]);
	assert!(record.ignored_from_test.is_empty());
}

#[test]
fn threshold_is_inclusive() {
	let rows = vec![
		row(1, "Organic", NOW - Duration::hours(1)),
		row(2, "Organic", NOW - Duration::hours(1) - Duration::seconds(1)),
	];
	let ignored = recency::filter_recent(&[1, 2], &rows, NOW - Duration::hours(1));

	assert_eq!(ignored, vec![1]);
}

#[test]
fn rows_without_activity_are_never_ignored() {
	let rows = vec![ResultRow { user_id: 9, slot_type: String::new(), last_activity: None }];
	let ignored = recency::filter_recent(&[9], &rows, NOW - Duration::hours(1));

	assert!(ignored.is_empty());
}

#[test]
fn retry_that_matches_keeps_original_call_ids() {
	let request = request(1, 1_001);
	let control = stale_set(&[1, 2, 3]);
	let test = stale_set(&[2, 3, 4]);
	let mut record = compare(&request, &control, &test, RecencyPolicy::disabled());
	let retry_control = stale_set(&[1, 2, 3]);
	let retry_test = stale_set(&[3, 2, 1]);

	record.apply_retry(RetryObservation::observe(
		&retry_control,
		&retry_control.user_ids(),
		&retry_test,
		&retry_test.user_ids(),
	));

	assert!(!record.matched);
	assert_eq!(record.retry, RetryOutcome::NowMatches { control_count: 3, test_count: 3 });
	assert_eq!(record.retry.retry_matched(), Some(true));
	assert_eq!(record.control_call_id, control.call_id);
	assert_eq!(record.test_call_id, test.call_id);
}

#[test]
fn retry_that_still_mismatches_points_at_retry_calls() {
	let request = request(1, 1_001);
	let control = stale_set(&[1, 2, 3]);
	let test = stale_set(&[2, 3, 4]);
	let mut record = compare(&request, &control, &test, RecencyPolicy::disabled());
	let retry_control = stale_set(&[1, 2]);
	let retry_test = stale_set(&[2, 4, 5]);

	record.apply_retry(RetryObservation::observe(
		&retry_control,
		&retry_control.user_ids(),
		&retry_test,
		&retry_test.user_ids(),
	));

	assert!(!record.matched);
	assert_eq!(record.retry, RetryOutcome::ConfirmedMismatch { control_count: 2, test_count: 3 });
	assert_eq!(record.control_call_id, retry_control.call_id);
	assert_eq!(record.test_call_id, retry_test.call_id);
	assert_eq!(record.only_in_control, vec![1]);
}

#[test]
fn slot_buckets_keep_first_seen_label_order() {
	let set = ResultSet::new(Uuid::new_v4(), vec![
		row(1, "Boost", NOW),
		row(2, "Organic", NOW),
		row(3, "Boost", NOW),
	]);
	let buckets = set.slot_buckets();
	let labels = buckets.buckets().iter().map(|bucket| bucket.label.as_str()).collect::<Vec<_>>();

	assert_eq!(labels, vec!["Boost", "Organic"]);
	assert_eq!(buckets.buckets()[0].ids, vec![1, 3]);
	assert!(SlotBuckets::default().is_empty());
}

#[test]
fn summary_groups_by_site() {
	let matched =
		compare(&request(2, 5_000), &stale_set(&[1]), &stale_set(&[1]), RecencyPolicy::disabled());
	let mut transient =
		compare(&request(1, 7_000), &stale_set(&[1]), &stale_set(&[2]), RecencyPolicy::disabled());
	let confirmed =
		compare(&request(1, 6_000), &stale_set(&[1]), &stale_set(&[3]), RecencyPolicy::disabled());
	let retry_set = stale_set(&[1]);

	transient.apply_retry(RetryObservation::observe(&retry_set, &[1], &retry_set, &[1]));

	let summary = summarize(&[matched, transient, confirmed]);

	assert_eq!(summary.total, 3);
	assert_eq!(summary.matched, 1);
	assert_eq!(summary.mismatched, 2);
	assert_eq!(summary.retried, 1);
	assert_eq!(summary.transient_mismatches, 1);
	assert_eq!(summary.confirmed_mismatches, 0);
	assert!((summary.success_rate - 100.0 / 3.0).abs() < 1e-9);
	assert_eq!(summary.sites.len(), 2);
	assert_eq!(summary.sites[0].site_code, 1);
	assert_eq!(summary.sites[0].mismatched_user_ids, vec![6_000, 7_000]);
	assert_eq!(summary.sites[1].matched, 1);
}

#[test]
fn empty_summary_has_zero_success_rate() {
	let summary = summarize(&[]);

	assert_eq!(summary.total, 0);
	assert_eq!(summary.success_rate, 0.0);
	assert!(summary.sites.is_empty());
}

#[test]
fn requests_round_trip_through_json() {
	let payload = serde_json::json!({
		"site_code": 1,
		"searcher_user_id": 1001,
		"shard_id": 3,
		"request_count": 20,
		"kind": "searchv4.recommended.matchpicks",
		"call_id": "7a8c1f5e-3b7d-4d53-9f3f-6c2f3c2b1a00",
		"call_time": "2026-03-01T11:30:00Z",
		"criteria": { "lower_age": 25, "upper_age": 35, "photos_only": true }
	});
	let parsed: SearchRequest = serde_json::from_value(payload).expect("Failed to parse request.");

	assert_eq!(parsed.kind, SearchKind::MatchPicks);
	assert_eq!(parsed.criteria.lower_age, Some(25));
	assert!(parsed.criteria.photos_only);
	assert!(parsed.description.is_empty());

	let rendered = serde_json::to_value(&parsed).expect("Failed to render request.");

	assert_eq!(rendered["kind"], "SearchV4.Recommended.MatchPicks");
	assert_eq!(rendered["call_time"], "2026-03-01T11:30:00Z");
}
