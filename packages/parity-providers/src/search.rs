use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};
use parity_domain::{Deployment, ResultRow, ResultSet, SearchCriteria, SearchRequest, UserId};

/// Everything needed to replay one request against one deployment.
pub struct SearchCall<'a> {
	pub request: &'a SearchRequest,
	pub deployment: &'a Deployment,
	pub session_id: Uuid,
	pub extension_params: &'a [String],
	/// Sent as the `stackOverride` dynamic argument when present.
	pub extra_config: Option<&'a str>,
	/// Adds the `explain` extension parameter so the backend traces the call.
	pub diagnostics: bool,
}

#[derive(Deserialize)]
struct WireRow {
	user_id: UserId,
	#[serde(default)]
	slot_type: Option<String>,
	#[serde(default, with = "parity_domain::time_serde::option")]
	last_login_date: Option<OffsetDateTime>,
}

/// Executes one search call and tags the result set with the call id that was sent.
pub async fn execute(
	client: &Client,
	cfg: &parity_config::Executor,
	call: SearchCall<'_>,
) -> Result<ResultSet> {
	let call_id = Uuid::new_v4();
	let url = format!("{}{}", call.deployment.base_url, cfg.search_path);
	let body = build_body(&call, call_id)?;

	tracing::debug!(
		deployment = call.deployment.name.as_str(),
		kind = %call.request.kind,
		site_code = call.request.site_code,
		searcher_user_id = call.request.searcher_user_id,
		%call_id,
		diagnostics = call.diagnostics,
		"Executing search."
	);

	let res = client.post(url).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;
	let rows = parse_search_response(json)?;

	tracing::debug!(
		deployment = call.deployment.name.as_str(),
		%call_id,
		result_count = rows.len(),
		"Search completed."
	);

	Ok(ResultSet::new(call_id, rows))
}

fn build_body(call: &SearchCall<'_>, call_id: Uuid) -> Result<Value> {
	let request = call.request;
	let mut extension_params = call.extension_params.to_vec();

	for param in request.kind.fixed_extension_params() {
		if !extension_params.iter().any(|existing| existing == param) {
			extension_params.push((*param).to_string());
		}
	}

	if call.diagnostics {
		extension_params.push("explain".to_string());
	}

	let mut dynamic_args = Map::new();

	dynamic_args.insert("OCallId".to_string(), Value::String(call_id.to_string()));

	if let Some(extra) = call.extra_config.filter(|extra| !extra.trim().is_empty()) {
		dynamic_args.insert("stackOverride".to_string(), Value::String(extra.to_string()));
	}

	Ok(serde_json::json!({
		"kind": request.kind.class_name(),
		"site_code": request.site_code,
		"shard_id": request.shard_id,
		"searcher_user_id": request.searcher_user_id,
		"max_records": request.request_count,
		"session_id": call.session_id,
		"pinned_to": call.deployment.name,
		"criteria": criteria_body(&request.criteria)?,
		"extension_params": extension_params,
		"dynamic_args": dynamic_args,
	}))
}

fn criteria_body(criteria: &SearchCriteria) -> Result<Value> {
	let mut body = serde_json::to_value(criteria)?;
	let Some(fields) = body.as_object_mut() else {
		return Err(Error::InvalidResponse {
			message: "Search criteria must serialize to an object.".to_string(),
		});
	};

	fields.insert("self_answer_ids".to_string(), serde_json::to_value(criteria.self_answer_ids())?);
	fields.insert(
		"seeking_answer_ids".to_string(),
		serde_json::to_value(criteria.seeking_answer_ids())?,
	);
	fields.insert(
		"attribute_weights".to_string(),
		serde_json::to_value(criteria.attribute_weights()?)?,
	);

	Ok(body)
}

fn parse_search_response(json: Value) -> Result<Vec<ResultRow>> {
	let Some(results) = json.get("results") else {
		return Ok(Vec::new());
	};

	if results.is_null() {
		return Ok(Vec::new());
	}
	if !results.is_array() {
		return Err(Error::InvalidResponse {
			message: "Search response results must be an array.".to_string(),
		});
	}

	let rows: Vec<WireRow> = serde_json::from_value(results.clone())?;

	Ok(rows
		.into_iter()
		.map(|row| ResultRow {
			user_id: row.user_id,
			slot_type: row.slot_type.unwrap_or_default(),
			last_activity: row.last_login_date,
		})
		.collect())
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use parity_domain::{DeploymentRole, SearchKind};

	fn request(kind: SearchKind) -> SearchRequest {
		SearchRequest {
			site_code: 1,
			searcher_user_id: 1_001,
			shard_id: 4,
			request_count: 20,
			kind,
			criteria: SearchCriteria {
				self_string: Some("1,2,x".to_string()),
				weight_string: Some("7,3".to_string()),
				..SearchCriteria::default()
			},
			call_id: Uuid::nil(),
			call_time: datetime!(2026-03-01 10:00 UTC),
			description: String::new(),
		}
	}

	fn deployment() -> Deployment {
		Deployment {
			role: DeploymentRole::Test,
			name: "candidate".to_string(),
			base_url: "http://localhost".to_string(),
		}
	}

	#[test]
	fn missing_results_yield_empty_rows() {
		let rows = parse_search_response(serde_json::json!({})).expect("parse failed");

		assert!(rows.is_empty());

		let rows =
			parse_search_response(serde_json::json!({ "results": null })).expect("parse failed");

		assert!(rows.is_empty());
	}

	#[test]
	fn parses_rows_with_optional_fields() {
		let json = serde_json::json!({
			"results": [
				{ "user_id": 5, "slot_type": "Boost", "last_login_date": "2026-03-01T09:00:00Z" },
				{ "user_id": 6 },
				{ "user_id": 7, "last_login_date": "" }
			]
		});
		let rows = parse_search_response(json).expect("parse failed");

		assert_eq!(rows.len(), 3);
		assert_eq!(rows[0].slot_type, "Boost");
		assert_eq!(rows[0].last_activity, Some(datetime!(2026-03-01 09:00 UTC)));
		assert_eq!(rows[1].slot_type, "");
		assert_eq!(rows[2].last_activity, None);
	}

	#[test]
	fn rejects_non_array_results() {
		let err = parse_search_response(serde_json::json!({ "results": 3 }))
			.expect_err("Expected invalid response.");

		assert!(err.to_string().contains("must be an array"));
	}

	#[test]
	fn body_carries_kind_extras_and_diagnostics() {
		let request = request(SearchKind::Stack);
		let deployment = deployment();
		let configured = vec!["doNotRandom".to_string(), "fastPath".to_string()];
		let call_id = Uuid::new_v4();
		let call = SearchCall {
			request: &request,
			deployment: &deployment,
			session_id: Uuid::nil(),
			extension_params: &configured,
			extra_config: Some("<stack/>"),
			diagnostics: true,
		};
		let body = build_body(&call, call_id).expect("build failed");

		assert_eq!(body["kind"], "Stack");
		assert_eq!(body["max_records"], 20);
		assert_eq!(
			body["extension_params"],
			serde_json::json!(["doNotRandom", "fastPath", "SingleThread", "explain"])
		);
		assert_eq!(body["dynamic_args"]["OCallId"], call_id.to_string());
		assert_eq!(body["dynamic_args"]["stackOverride"], "<stack/>");
		assert_eq!(body["criteria"]["self_answer_ids"], serde_json::json!([1, 2]));
		assert_eq!(
			body["criteria"]["attribute_weights"],
			serde_json::json!([{ "attribute_id": 7, "weight": 3 }])
		);
	}

	#[test]
	fn body_omits_override_when_blank() {
		let request = request(SearchKind::OneWay);
		let deployment = deployment();
		let call = SearchCall {
			request: &request,
			deployment: &deployment,
			session_id: Uuid::nil(),
			extension_params: &[],
			extra_config: Some("  "),
			diagnostics: false,
		};
		let body = build_body(&call, Uuid::new_v4()).expect("build failed");

		assert!(body["dynamic_args"].get("stackOverride").is_none());
		assert_eq!(body["extension_params"], serde_json::json!([]));
	}
}
