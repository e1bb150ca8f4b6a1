use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Search variants the backend exposes. Each one is served by exactly one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchKind {
	Stack,
	OnePush,
	LitBatch,
	LitSearch,
	MoreLikeThis,
	OneWay,
	ExpertPicks,
	JustForYou,
	MatchPicks,
	Reverse,
	SearchWow,
	TwoWay,
}
impl SearchKind {
	pub const ALL: [Self; 12] = [
		Self::Stack,
		Self::OnePush,
		Self::LitBatch,
		Self::LitSearch,
		Self::MoreLikeThis,
		Self::OneWay,
		Self::ExpertPicks,
		Self::JustForYou,
		Self::MatchPicks,
		Self::Reverse,
		Self::SearchWow,
		Self::TwoWay,
	];

	/// Class name recorded in the historical search log.
	pub fn class_name(self) -> &'static str {
		match self {
			Self::Stack => "Stack",
			Self::OnePush => "SearchV4.OnePush",
			Self::LitBatch => "SearchHighlight.LitBatch",
			Self::LitSearch => "SearchHighlight.LitSearch",
			Self::MoreLikeThis => "SearchV4.MoreLikeThis",
			Self::OneWay => "SearchV4.OneWay",
			Self::ExpertPicks => "SearchV4.Recommended.ExpertPicks",
			Self::JustForYou => "SearchV4.Recommended.JustForYou",
			Self::MatchPicks => "SearchV4.Recommended.MatchPicks",
			Self::Reverse => "SearchV4.Reverse",
			Self::SearchWow => "SearchV4.SearchWow",
			Self::TwoWay => "SearchV4.TwoWay",
		}
	}

	/// Whether result rows of this kind carry a meaningful slot label.
	pub fn has_slots(self) -> bool {
		!matches!(self, Self::LitBatch | Self::LitSearch | Self::Reverse)
	}

	/// Extension parameters the kind always sends on top of the configured ones.
	pub fn fixed_extension_params(self) -> &'static [&'static str] {
		match self {
			Self::Stack => &["doNotRandom", "SingleThread"],
			_ => &[],
		}
	}

	pub fn parse(raw: &str) -> Result<Self> {
		let trimmed = raw.trim();

		Self::ALL
			.into_iter()
			.find(|kind| kind.class_name().eq_ignore_ascii_case(trimmed))
			.ok_or_else(|| Error::UnknownKind { name: trimmed.to_string() })
	}
}
impl fmt::Display for SearchKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.class_name())
	}
}
impl FromStr for SearchKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}
impl Serialize for SearchKind {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.class_name())
	}
}
impl<'de> Deserialize<'de> for SearchKind {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_class_names_case_insensitively() {
		assert_eq!(SearchKind::parse("searchv4.oneway").unwrap(), SearchKind::OneWay);
		assert_eq!(SearchKind::parse(" STACK ").unwrap(), SearchKind::Stack);
		assert!(SearchKind::parse("SearchV4.Nope").is_err());
	}

	#[test]
	fn class_names_round_trip_for_every_kind() {
		for kind in SearchKind::ALL {
			assert_eq!(SearchKind::parse(kind.class_name()).unwrap(), kind);
		}
	}
}
