//! Seam to the entity store that holds ownership and membership aspects.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{LookupError, urn::Urn};

pub const OWNERSHIP_ASPECT_NAME: &str = "ownership";
pub const GROUP_MEMBERSHIP_ASPECT_NAME: &str = "groupMembership";
pub const NATIVE_GROUP_MEMBERSHIP_ASPECT_NAME: &str = "nativeGroupMembership";
pub const ROLE_MEMBERSHIP_ASPECT_NAME: &str = "roleMembership";
pub const DOMAINS_ASPECT_NAME: &str = "domains";

/// Aspect name to aspect payload.
pub type AspectMap = Map<String, Value>;

pub trait EntityLookup
where
	Self: Send + Sync,
{
	/// Fetches the named aspects of one entity.
	///
	/// Returns `Ok(None)` when the entity does not exist. Aspects the entity lacks are absent
	/// from the returned map.
	fn get_aspects(
		&self,
		entity_type: &str,
		urn: &Urn,
		aspect_names: &[&str],
	) -> Result<Option<AspectMap>, LookupError>;
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Ownership {
	#[serde(default)]
	pub owners: Vec<Owner>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
	pub owner: Urn,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub type_urn: Option<Urn>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GroupMembership {
	#[serde(default)]
	pub groups: Vec<Urn>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeGroupMembership {
	#[serde(default)]
	pub native_groups: Vec<Urn>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RoleMembership {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub roles: Option<Vec<Urn>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Domains {
	#[serde(default)]
	pub domains: Vec<Urn>,
}

/// Decodes `name` from `aspects`, if present.
pub fn decode_aspect<T>(aspects: &AspectMap, name: &str) -> Result<Option<T>, LookupError>
where
	T: DeserializeOwned,
{
	let Some(raw) = aspects.get(name) else {
		return Ok(None);
	};

	serde_json::from_value(raw.clone())
		.map(Some)
		.map_err(|err| LookupError::new(format!("Failed to decode aspect {name}: {err}.")))
}
