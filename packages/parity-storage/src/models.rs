use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};
use parity_domain::{GeoCriteria, SearchCriteria, SearchKind, SearchRequest};

/// One historical call as stored in `search_log`, joined with the site's shard.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchLogRow {
	pub site_code: i32,
	pub shard_id: i32,
	pub searcher_user_id: i64,
	pub request_count: i32,
	pub class_name: String,
	pub call_id: Uuid,
	pub call_time: OffsetDateTime,
	pub what_if_search_id: Option<i32>,
	pub other_user_id: Option<i64>,
	pub gender_gender_seek: Option<i16>,
	pub l_age: Option<i16>,
	pub u_age: Option<i16>,
	pub l_height: Option<i16>,
	pub u_height: Option<i16>,
	pub photos_only: Option<bool>,
	pub self_string: Option<String>,
	pub seek_string: Option<String>,
	pub weight_string: Option<String>,
	pub search_geo_type_id: Option<i32>,
	pub country_code: Option<i16>,
	pub state_code: Option<i16>,
	pub city_code: Option<i32>,
	pub postal_code: Option<String>,
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub distance: Option<f64>,
}
impl SearchLogRow {
	pub fn into_request(self) -> Result<SearchRequest> {
		let kind = SearchKind::parse(&self.class_name)?;
		let request_count = u32::try_from(self.request_count).map_err(|_| {
			Error::InvalidArgument(format!("request_count {} is negative.", self.request_count))
		})?;
		let geo = self.search_geo_type_id.map(|geo_type_id| GeoCriteria {
			geo_type_id,
			country_code: self.country_code,
			state_code: self.state_code,
			city_code: self.city_code,
			postal_code: self.postal_code.clone(),
			latitude: self.latitude,
			longitude: self.longitude,
			distance: self.distance,
		});
		let criteria = SearchCriteria {
			what_if_search_id: self.what_if_search_id,
			other_user_id: self.other_user_id,
			gender_gender_seek: narrow(self.gender_gender_seek, "gender_gender_seek")?,
			lower_age: narrow(self.l_age, "l_age")?,
			upper_age: narrow(self.u_age, "u_age")?,
			lower_height: self.l_height,
			upper_height: self.u_height,
			photos_only: self.photos_only.unwrap_or(false),
			self_string: self.self_string,
			seek_string: self.seek_string,
			weight_string: self.weight_string,
			geo,
		};

		Ok(SearchRequest {
			site_code: self.site_code,
			searcher_user_id: self.searcher_user_id,
			shard_id: self.shard_id,
			request_count,
			kind,
			criteria,
			call_id: self.call_id,
			call_time: self.call_time,
			description: SearchRequest::describe(self.site_code, self.searcher_user_id, self.call_id),
		})
	}
}

fn narrow(value: Option<i16>, column: &str) -> Result<Option<u8>> {
	value
		.map(|raw| {
			u8::try_from(raw)
				.map_err(|_| Error::InvalidArgument(format!("{column} {raw} is out of range.")))
		})
		.transpose()
}
