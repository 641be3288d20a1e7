//! Access policy documents.

use serde::{Deserialize, Serialize};

use crate::{resource::ResourceFieldType, urn::Urn};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyState {
	#[default]
	Active,
	Inactive,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
	/// Grants privileges on specific resources.
	#[default]
	Metadata,
	/// Grants privileges with no associated resource.
	Platform,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInfo {
	pub display_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(rename = "type", default)]
	pub policy_type: PolicyType,
	#[serde(default)]
	pub state: PolicyState,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resources: Option<ResourceFilter>,
	#[serde(default)]
	pub privileges: Vec<String>,
	#[serde(default)]
	pub actors: ActorFilter,
	#[serde(default)]
	pub editable: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorFilter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub users: Option<Vec<Urn>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub groups: Option<Vec<Urn>>,
	#[serde(default)]
	pub resource_owners: bool,
	/// Ownership types that qualify an owner; absent means any type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource_owners_types: Option<Vec<Urn>>,
	#[serde(default)]
	pub all_users: bool,
	#[serde(default)]
	pub all_groups: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub roles: Option<Vec<Urn>>,
}
impl ActorFilter {
	pub fn has_groups(&self) -> bool {
		self.groups.is_some()
	}

	pub fn has_roles(&self) -> bool {
		self.roles.is_some()
	}
}

/// Resource scope of a policy in either its legacy or its criteria form.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilter {
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub resource_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resources: Option<Vec<String>>,
	#[serde(default)]
	pub all_resources: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filter: Option<PolicyMatchFilter>,
}
impl ResourceFilter {
	/// Criteria form of this filter; `filter` wins over the legacy fields.
	pub fn normalize(&self) -> PolicyMatchFilter {
		if let Some(filter) = self.filter.as_ref() {
			return filter.clone();
		}

		let mut criteria = Vec::new();

		if let Some(resource_type) = self.resource_type.as_ref() {
			criteria.push(PolicyMatchCriterion::equals(
				ResourceFieldType::ResourceType,
				vec![resource_type.clone()],
			));

			if let Some(resources) = self.resources.as_ref()
				&& !self.all_resources
			{
				criteria
					.push(PolicyMatchCriterion::equals(ResourceFieldType::ResourceUrn, resources.clone()));
			}
		}

		PolicyMatchFilter { criteria }
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PolicyMatchFilter {
	#[serde(default)]
	pub criteria: Vec<PolicyMatchCriterion>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PolicyMatchCriterion {
	/// Resource field name, matched case-insensitively against [`ResourceFieldType`].
	pub field: String,
	#[serde(default)]
	pub values: Vec<String>,
	#[serde(default)]
	pub condition: PolicyMatchCondition,
}
impl PolicyMatchCriterion {
	pub fn equals(field: ResourceFieldType, values: Vec<String>) -> Self {
		Self { field: field.as_str().to_string(), values, condition: PolicyMatchCondition::Equals }
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyMatchCondition {
	#[default]
	Equals,
	#[serde(other)]
	Unsupported,
}
