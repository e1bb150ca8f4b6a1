use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use parity_domain::Deployment;

/// Probes the engine status endpoint until it answers with a status bag, then reads the shard
/// id from it. Transport failures count as attempts.
pub async fn shard_id(
	client: &Client,
	cfg: &parity_config::Executor,
	deployment: &Deployment,
) -> Result<Option<i32>> {
	let url = format!("{}{}", deployment.base_url, cfg.status_path);

	for attempt in 1..=cfg.status_attempts {
		match fetch_status(client, &url).await {
			Ok(json) =>
				if json.get("StatusBag").is_some_and(Value::is_object) {
					return Ok(parse_shard_id(&json));
				},
			Err(err) => {
				tracing::warn!(
					deployment = deployment.name.as_str(),
					attempt,
					error = %err,
					"Engine status request failed."
				);
			},
		}
	}

	tracing::warn!(
		deployment = deployment.name.as_str(),
		attempts = cfg.status_attempts,
		"Engine status never returned a status bag."
	);

	Ok(None)
}

/// Resolves the shard to replay. The control deployment decides; a disagreeing test
/// deployment is only reported.
pub async fn resolve_shard(
	client: &Client,
	cfg: &parity_config::Executor,
	control: &Deployment,
	test: &Deployment,
) -> Result<i32> {
	let (control_shard, test_shard) =
		tokio::try_join!(shard_id(client, cfg, control), shard_id(client, cfg, test))?;

	if control_shard != test_shard {
		tracing::info!(
			control_shard = ?control_shard,
			test_shard = ?test_shard,
			"Control and test are not on the same shard."
		);
	}

	control_shard.ok_or_else(|| Error::MissingShard { deployment: control.name.clone() })
}

async fn fetch_status(client: &Client, url: &str) -> Result<Value> {
	let res = client.get(url).send().await?;

	Ok(res.error_for_status()?.json().await?)
}

fn parse_shard_id(json: &Value) -> Option<i32> {
	let shard = json.get("StatusBag")?.get("ShardId")?;

	match shard {
		Value::Number(number) => number.as_i64().and_then(|value| i32::try_from(value).ok()),
		Value::String(raw) => raw.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_numeric_and_string_shard_ids() {
		assert_eq!(parse_shard_id(&serde_json::json!({ "StatusBag": { "ShardId": 7 } })), Some(7));
		assert_eq!(
			parse_shard_id(&serde_json::json!({ "StatusBag": { "ShardId": " 12 " } })),
			Some(12)
		);
	}

	#[test]
	fn unusable_shard_ids_are_none() {
		assert_eq!(parse_shard_id(&serde_json::json!({ "StatusBag": {} })), None);
		assert_eq!(parse_shard_id(&serde_json::json!({ "StatusBag": { "ShardId": "x" } })), None);
		assert_eq!(parse_shard_id(&serde_json::json!({ "StatusBag": { "ShardId": true } })), None);
		assert_eq!(parse_shard_id(&serde_json::json!({})), None);
	}
}
