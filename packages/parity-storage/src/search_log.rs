use time::{Duration, OffsetDateTime};

use crate::{Result, db::Db, models::SearchLogRow};
use parity_domain::SearchRequest;

/// `[now - offset - window, now - offset]`, inclusive on both ends.
pub fn call_window(
	cfg: &parity_config::Source,
	now: OffsetDateTime,
) -> (OffsetDateTime, OffsetDateTime) {
	let end = now - Duration::hours(i64::from(cfg.offset_hours));
	let start = end - Duration::hours(i64::from(cfg.window_hours));

	(start, end)
}

/// Loads the most recent calls per site for `shard_id`, newest first within a site.
pub async fn load_requests(
	db: &Db,
	cfg: &parity_config::Source,
	shard_id: i32,
	now: OffsetDateTime,
) -> Result<Vec<SearchRequest>> {
	let (start, end) = call_window(cfg, now);

	tracing::info!(shard_id, %start, %end, "Loading search requests from the search log.");

	let rows: Vec<SearchLogRow> = sqlx::query_as(
		"\
WITH last_few AS (
	SELECT
		sl.site_code,
		ss.shard_id,
		sl.searcher_user_id,
		sl.request_count,
		sl.class_name,
		sl.call_id,
		sl.call_time,
		sl.what_if_search_id,
		sl.other_user_id,
		sl.gender_gender_seek,
		sl.l_age,
		sl.u_age,
		sl.l_height,
		sl.u_height,
		sl.photos_only,
		sl.self_string,
		sl.seek_string,
		sl.weight_string,
		sl.search_geo_type_id,
		sl.country_code,
		sl.state_code,
		sl.city_code,
		sl.postal_code,
		sl.latitude,
		sl.longitude,
		sl.distance,
		ROW_NUMBER() OVER (PARTITION BY ss.site_code ORDER BY sl.call_time DESC) AS row_num
	FROM search_log sl
	JOIN site_code_shards ss ON ss.site_code = sl.site_code
	WHERE sl.call_time BETWEEN $1 AND $2
		AND ss.shard_id = $3
		AND sl.searcher_user_id > $4
		AND sl.returned_count > 0
)
SELECT
	site_code,
	shard_id,
	searcher_user_id,
	request_count,
	class_name,
	call_id,
	call_time,
	what_if_search_id,
	other_user_id,
	gender_gender_seek,
	l_age,
	u_age,
	l_height,
	u_height,
	photos_only,
	self_string,
	seek_string,
	weight_string,
	search_geo_type_id,
	country_code,
	state_code,
	city_code,
	postal_code,
	latitude,
	longitude,
	distance
FROM last_few
WHERE row_num <= $5
ORDER BY site_code ASC, call_time DESC",
	)
	.bind(start)
	.bind(end)
	.bind(shard_id)
	.bind(cfg.min_searcher_user_id)
	.bind(i64::from(cfg.per_site_limit))
	.fetch_all(&db.pool)
	.await?;
	let requests = into_requests(rows);

	tracing::info!(shard_id, count = requests.len(), "Loaded search requests.");

	Ok(requests)
}

fn into_requests(rows: Vec<SearchLogRow>) -> Vec<SearchRequest> {
	let mut requests = Vec::with_capacity(rows.len());

	for row in rows {
		let call_id = row.call_id;
		let site_code = row.site_code;

		match row.into_request() {
			Ok(request) => requests.push(request),
			Err(err) => {
				tracing::warn!(site_code, %call_id, error = %err, "Skipping search log row.");
			},
		}
	}

	requests
}
