use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, SearchKind, UserId};

/// One historical search call to replay. Built once per batch item and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
	pub site_code: i32,
	pub searcher_user_id: UserId,
	pub shard_id: i32,
	pub request_count: u32,
	pub kind: SearchKind,
	#[serde(default)]
	pub criteria: SearchCriteria,
	pub call_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub call_time: OffsetDateTime,
	#[serde(default)]
	pub description: String,
}
impl SearchRequest {
	pub fn describe(site_code: i32, searcher_user_id: UserId, call_id: Uuid) -> String {
		format!("Site:{site_code} User:{searcher_user_id} CallId:{call_id}")
	}

	pub fn record_key(&self) -> crate::RecordKey {
		crate::RecordKey {
			site_code: self.site_code,
			searcher_user_id: self.searcher_user_id,
			kind: self.kind,
		}
	}

	/// The stored description, or the canonical one when the source left it blank.
	pub fn label(&self) -> String {
		if self.description.trim().is_empty() {
			Self::describe(self.site_code, self.searcher_user_id, self.call_id)
		} else {
			self.description.clone()
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
	pub what_if_search_id: Option<i32>,
	pub other_user_id: Option<UserId>,
	pub gender_gender_seek: Option<u8>,
	pub lower_age: Option<u8>,
	pub upper_age: Option<u8>,
	pub lower_height: Option<i16>,
	pub upper_height: Option<i16>,
	pub photos_only: bool,
	pub self_string: Option<String>,
	pub seek_string: Option<String>,
	pub weight_string: Option<String>,
	pub geo: Option<GeoCriteria>,
}
impl SearchCriteria {
	pub fn self_answer_ids(&self) -> Option<Vec<i32>> {
		parse_answer_ids(self.self_string.as_deref())
	}

	pub fn seeking_answer_ids(&self) -> Option<Vec<i32>> {
		parse_answer_ids(self.seek_string.as_deref())
	}

	/// Decodes `attribute,weight,attribute,weight,...`.
	pub fn attribute_weights(&self) -> Result<Option<Vec<AttributeWeight>>> {
		let Some(raw) = self.weight_string.as_deref().filter(|raw| !raw.trim().is_empty()) else {
			return Ok(None);
		};
		let parts = raw.split(',').map(str::trim).collect::<Vec<_>>();

		if parts.len() % 2 != 0 {
			return Err(Error::InvalidCriteria {
				message: format!("weight string {raw:?} must hold attribute,weight pairs."),
			});
		}

		let mut weights = Vec::with_capacity(parts.len() / 2);

		for pair in parts.chunks(2) {
			let attribute_id = pair[0].parse::<i32>().map_err(|_| Error::InvalidCriteria {
				message: format!("weight string attribute {:?} is not an integer.", pair[0]),
			})?;
			let weight = pair[1].parse::<i32>().map_err(|_| Error::InvalidCriteria {
				message: format!("weight string weight {:?} is not an integer.", pair[1]),
			})?;

			weights.push(AttributeWeight { attribute_id, weight });
		}

		Ok(Some(weights))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoCriteria {
	pub geo_type_id: i32,
	pub country_code: Option<i16>,
	pub state_code: Option<i16>,
	pub city_code: Option<i32>,
	pub postal_code: Option<String>,
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeWeight {
	pub attribute_id: i32,
	pub weight: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentRole {
	Control,
	Test,
}
impl DeploymentRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Control => "control",
			Self::Test => "test",
		}
	}
}

/// A backend environment a request is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
	pub role: DeploymentRole,
	pub name: String,
	pub base_url: String,
}

fn parse_answer_ids(raw: Option<&str>) -> Option<Vec<i32>> {
	let raw = raw.filter(|raw| !raw.is_empty())?;

	Some(raw.split(',').filter_map(|part| part.trim().parse::<i32>().ok()).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn answer_ids_skip_unparseable_parts() {
		let criteria =
			SearchCriteria { seek_string: Some("1,x,3,,4".to_string()), ..Default::default() };

		assert_eq!(criteria.seeking_answer_ids(), Some(vec![1, 3, 4]));
		assert_eq!(criteria.self_answer_ids(), None);
	}

	#[test]
	fn weights_decode_pairs() {
		let criteria =
			SearchCriteria { weight_string: Some("10,2,11,5".to_string()), ..Default::default() };
		let weights = criteria.attribute_weights().unwrap().unwrap();

		assert_eq!(weights, vec![
			AttributeWeight { attribute_id: 10, weight: 2 },
			AttributeWeight { attribute_id: 11, weight: 5 },
		]);
	}

	#[test]
	fn weights_reject_odd_length() {
		let criteria =
			SearchCriteria { weight_string: Some("10,2,11".to_string()), ..Default::default() };

		assert!(criteria.attribute_weights().is_err());
	}
}
