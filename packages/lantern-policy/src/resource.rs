use std::{
	collections::{BTreeMap, BTreeSet},
	fmt::{Debug, Formatter},
	sync::{Arc, OnceLock},
};

use serde::{Deserialize, Serialize};

use crate::{
	lookup::{self, DOMAINS_ASPECT_NAME, Domains, EntityLookup, OWNERSHIP_ASPECT_NAME, Ownership},
	urn::Urn,
};

static NO_VALUES: BTreeSet<String> = BTreeSet::new();

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceFieldType {
	ResourceUrn,
	ResourceType,
	Owner,
	Domain,
}
impl ResourceFieldType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ResourceUrn => "RESOURCE_URN",
			Self::ResourceType => "RESOURCE_TYPE",
			Self::Owner => "OWNER",
			Self::Domain => "DOMAIN",
		}
	}

	/// Case-insensitive parse of a criterion field name.
	pub fn parse(name: &str) -> Option<Self> {
		[Self::ResourceUrn, Self::ResourceType, Self::Owner, Self::Domain]
			.into_iter()
			.find(|field| field.as_str().eq_ignore_ascii_case(name))
	}
}

/// The resource a privilege is requested on.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
	#[serde(rename = "type")]
	pub resource_type: String,
	pub resource: String,
}
impl ResourceSpec {
	pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
		Self { resource_type: resource_type.into(), resource: resource.into() }
	}
}

/// A resource spec with the field values policies match against.
///
/// Urn and type are known up front. Owners and domains come from the entity store on first use
/// and are memoized for the lifetime of the spec.
pub struct ResolvedResourceSpec {
	spec: ResourceSpec,
	fields: BTreeMap<ResourceFieldType, BTreeSet<String>>,
	lookup: Option<Arc<dyn EntityLookup>>,
	owners: OnceLock<BTreeSet<String>>,
	domains: OnceLock<BTreeSet<String>>,
}
impl ResolvedResourceSpec {
	pub fn resolve(spec: ResourceSpec, lookup: Arc<dyn EntityLookup>) -> Self {
		let mut resolved = Self::with_fields(spec, BTreeMap::new());

		resolved.lookup = Some(lookup);

		resolved
	}

	/// A spec whose field values are all supplied by the caller.
	pub fn with_fields(
		spec: ResourceSpec,
		mut fields: BTreeMap<ResourceFieldType, BTreeSet<String>>,
	) -> Self {
		fields.entry(ResourceFieldType::ResourceUrn).or_insert_with(|| BTreeSet::from([spec.resource.clone()]));
		fields
			.entry(ResourceFieldType::ResourceType)
			.or_insert_with(|| BTreeSet::from([spec.resource_type.clone()]));

		Self { spec, fields, lookup: None, owners: OnceLock::new(), domains: OnceLock::new() }
	}

	pub fn spec(&self) -> &ResourceSpec {
		&self.spec
	}

	pub fn field_values(&self, field: ResourceFieldType) -> &BTreeSet<String> {
		if let Some(values) = self.fields.get(&field) {
			return values;
		}

		match field {
			ResourceFieldType::Owner => self.owners.get_or_init(|| self.fetch_owners()),
			ResourceFieldType::Domain => self.domains.get_or_init(|| self.fetch_domains()),
			ResourceFieldType::ResourceUrn | ResourceFieldType::ResourceType => &NO_VALUES,
		}
	}

	/// Urns of every owner regardless of ownership type.
	pub fn owners(&self) -> &BTreeSet<String> {
		self.field_values(ResourceFieldType::Owner)
	}

	fn fetch_owners(&self) -> BTreeSet<String> {
		self.fetch_aspect::<Ownership>(OWNERSHIP_ASPECT_NAME)
			.map(|ownership| ownership.owners.into_iter().map(|owner| owner.owner.to_string()).collect())
			.unwrap_or_default()
	}

	fn fetch_domains(&self) -> BTreeSet<String> {
		self.fetch_aspect::<Domains>(DOMAINS_ASPECT_NAME)
			.map(|domains| domains.domains.into_iter().map(|domain| domain.to_string()).collect())
			.unwrap_or_default()
	}

	fn fetch_aspect<T>(&self, aspect_name: &str) -> Option<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let lookup = self.lookup.as_ref()?;
		let urn = match Urn::parse(&self.spec.resource) {
			Ok(urn) => urn,
			Err(err) => {
				tracing::error!(resource = %self.spec.resource, error = %err, "Resource is not an urn.");

				return None;
			},
		};
		let fetched = lookup
			.get_aspects(urn.entity_type(), &urn, &[aspect_name])
			.and_then(|aspects| match aspects {
				Some(aspects) => lookup::decode_aspect::<T>(&aspects, aspect_name),
				None => Ok(None),
			});

		match fetched {
			Ok(aspect) => aspect,
			Err(err) => {
				tracing::error!(
					urn = %urn,
					aspect = aspect_name,
					error = %err,
					"Failed to resolve resource aspect."
				);

				None
			},
		}
	}
}
impl Debug for ResolvedResourceSpec {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolvedResourceSpec")
			.field("spec", &self.spec)
			.field("fields", &self.fields)
			.field("owners", &self.owners.get())
			.field("domains", &self.domains.get())
			.finish()
	}
}
