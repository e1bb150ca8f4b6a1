use std::env;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use parity_storage::{db::Db, search_log};

const SCHEMA: &str = "\
CREATE TABLE site_code_shards (
	site_code INTEGER PRIMARY KEY,
	shard_id INTEGER NOT NULL
);
CREATE TABLE search_log (
	call_id UUID PRIMARY KEY,
	call_time TIMESTAMPTZ NOT NULL,
	site_code INTEGER NOT NULL,
	searcher_user_id BIGINT NOT NULL,
	request_count INTEGER NOT NULL,
	returned_count INTEGER NOT NULL,
	class_name TEXT NOT NULL,
	what_if_search_id INTEGER,
	other_user_id BIGINT,
	gender_gender_seek SMALLINT,
	l_age SMALLINT,
	u_age SMALLINT,
	l_height SMALLINT,
	u_height SMALLINT,
	photos_only BOOLEAN,
	self_string TEXT,
	seek_string TEXT,
	weight_string TEXT,
	search_geo_type_id INTEGER,
	country_code SMALLINT,
	state_code SMALLINT,
	city_code INTEGER,
	postal_code TEXT,
	latitude DOUBLE PRECISION,
	longitude DOUBLE PRECISION,
	distance DOUBLE PRECISION
)";

async fn insert_call(
	db: &Db,
	site_code: i32,
	searcher_user_id: i64,
	returned_count: i32,
	class_name: &str,
	call_time: OffsetDateTime,
) {
	sqlx::query(
		"\
INSERT INTO search_log (
	call_id,
	call_time,
	site_code,
	searcher_user_id,
	request_count,
	returned_count,
	class_name
)
VALUES ($1, $2, $3, $4, 20, $5, $6)",
	)
	.bind(Uuid::new_v4())
	.bind(call_time)
	.bind(site_code)
	.bind(searcher_user_id)
	.bind(returned_count)
	.bind(class_name)
	.execute(&db.pool)
	.await
	.expect("Failed to insert search log row.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PARITY_PG_DSN to run."]
async fn loads_latest_calls_per_site() {
	let Ok(dsn) = env::var("PARITY_PG_DSN") else {
		return;
	};
	let db = Db::connect(&parity_config::Postgres { dsn, pool_max_conns: 1 })
		.await
		.expect("Failed to connect to Postgres.");
	let schema = format!("parity_test_{}", Uuid::new_v4().simple());

	sqlx::query(&format!("CREATE SCHEMA {schema}"))
		.execute(&db.pool)
		.await
		.expect("Failed to create schema.");
	sqlx::query(&format!("SET search_path TO {schema}"))
		.execute(&db.pool)
		.await
		.expect("Failed to set search path.");

	for statement in SCHEMA.split(';') {
		sqlx::query(statement).execute(&db.pool).await.expect("Failed to create table.");
	}

	sqlx::query("INSERT INTO site_code_shards (site_code, shard_id) VALUES (1, 7), (2, 7), (3, 8)")
		.execute(&db.pool)
		.await
		.expect("Failed to insert shards.");

	let now = OffsetDateTime::now_utc();
	let in_window = now - Duration::hours(24) - Duration::minutes(30);
	let source = parity_config::Source {
		window_hours: 1,
		offset_hours: 24,
		per_site_limit: 2,
		min_searcher_user_id: 999,
	};

	for minute in 0..3 {
		insert_call(&db, 1, 2_000 + minute, 5, "SearchV4.OneWay", in_window + Duration::minutes(minute))
			.await;
	}

	insert_call(&db, 2, 3_000, 5, "Unknown.Kind", in_window).await;
	insert_call(&db, 2, 3_001, 0, "SearchV4.OneWay", in_window).await;
	insert_call(&db, 2, 500, 5, "SearchV4.OneWay", in_window).await;
	insert_call(&db, 2, 3_002, 5, "SearchV4.TwoWay", now).await;
	insert_call(&db, 3, 4_000, 5, "SearchV4.OneWay", in_window).await;

	let requests =
		search_log::load_requests(&db, &source, 7, now).await.expect("Failed to load requests.");

	sqlx::query(&format!("DROP SCHEMA {schema} CASCADE"))
		.execute(&db.pool)
		.await
		.expect("Failed to drop schema.");

	let searchers = requests.iter().map(|request| request.searcher_user_id).collect::<Vec<_>>();

	assert_eq!(searchers, vec![2_002, 2_001]);
	assert!(requests.iter().all(|request| request.shard_id == 7));
	assert!(requests[0].description.starts_with("Site:1 User:2002 CallId:"));
}
