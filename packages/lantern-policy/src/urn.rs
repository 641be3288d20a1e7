use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::Error;

pub const URN_PREFIX: &str = "urn:li:";
pub const CORP_USER_ENTITY_NAME: &str = "corpuser";
pub const CORP_GROUP_ENTITY_NAME: &str = "corpGroup";

/// Entity identifier of the form `urn:li:<entityType>:<id>`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn {
	raw: String,
	type_end: usize,
}
impl Urn {
	pub fn parse(value: &str) -> Result<Self, Error> {
		let invalid = || Error::InvalidUrn { value: value.to_string() };
		let rest = value.strip_prefix(URN_PREFIX).ok_or_else(invalid)?;
		let (entity_type, id) = rest.split_once(':').ok_or_else(invalid)?;

		if entity_type.is_empty() || id.is_empty() || entity_type.chars().any(char::is_whitespace) {
			return Err(invalid());
		}

		Ok(Self { raw: value.to_string(), type_end: URN_PREFIX.len() + entity_type.len() })
	}

	pub fn entity_type(&self) -> &str {
		&self.raw[URN_PREFIX.len()..self.type_end]
	}

	pub fn id(&self) -> &str {
		&self.raw[self.type_end + 1..]
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}

	pub fn is_user(&self) -> bool {
		self.entity_type() == CORP_USER_ENTITY_NAME
	}

	pub fn is_group(&self) -> bool {
		self.entity_type() == CORP_GROUP_ENTITY_NAME
	}
}
impl FromStr for Urn {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::parse(value)
	}
}
impl TryFrom<String> for Urn {
	type Error = Error;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}
impl From<Urn> for String {
	fn from(urn: Urn) -> Self {
		urn.raw
	}
}
impl Display for Urn {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.raw)
	}
}
