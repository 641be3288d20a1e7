//! In-memory collaborators for exercising the policy engine without an entity store.

mod error;

pub use error::{Error, Result};

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Mutex,
};

use serde_json::Value;

use lantern_policy::{AspectMap, EntityLookup, LookupError, Urn};

/// One recorded call to [`InMemoryEntityLookup::get_aspects`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupCall {
	pub entity_type: String,
	pub urn: String,
	pub aspect_names: Vec<String>,
}

/// Entity store backed by a map of urn to aspects.
///
/// Requests touching a failing aspect return a [`LookupError`]; every request is recorded.
#[derive(Debug, Default)]
pub struct InMemoryEntityLookup {
	entities: BTreeMap<String, AspectMap>,
	failing_aspects: BTreeSet<String>,
	calls: Mutex<Vec<LookupCall>>,
}
impl InMemoryEntityLookup {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a JSON object of urn to aspect map.
	pub fn from_json(raw: &str) -> Result<Self> {
		let Value::Object(root) = serde_json::from_str::<Value>(raw)? else {
			return Err(Error::Message("Entity fixture must be a JSON object.".to_string()));
		};
		let mut lookup = Self::new();

		for (urn, aspects) in root {
			let Value::Object(aspects) = aspects else {
				return Err(Error::Message(format!("Aspects of {urn} must be a JSON object.")));
			};

			Urn::parse(&urn).map_err(|err| Error::Message(err.to_string()))?;

			lookup.entities.insert(urn, aspects);
		}

		Ok(lookup)
	}

	pub fn with_aspect(mut self, urn: &str, aspect_name: &str, aspect: Value) -> Self {
		self.entities.entry(urn.to_string()).or_default().insert(aspect_name.to_string(), aspect);

		self
	}

	/// Makes every request that names `aspect_name` fail.
	pub fn fail_aspect(mut self, aspect_name: &str) -> Self {
		self.failing_aspects.insert(aspect_name.to_string());

		self
	}

	pub fn calls(&self) -> Vec<LookupCall> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Number of requests that named `aspect_name`.
	pub fn call_count(&self, aspect_name: &str) -> usize {
		self.calls
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.filter(|call| call.aspect_names.iter().any(|name| name == aspect_name))
			.count()
	}
}
impl EntityLookup for InMemoryEntityLookup {
	fn get_aspects(
		&self,
		entity_type: &str,
		urn: &Urn,
		aspect_names: &[&str],
	) -> std::result::Result<Option<AspectMap>, LookupError> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(LookupCall {
			entity_type: entity_type.to_string(),
			urn: urn.to_string(),
			aspect_names: aspect_names.iter().map(|name| name.to_string()).collect(),
		});

		if let Some(name) = aspect_names.iter().find(|name| self.failing_aspects.contains(**name)) {
			return Err(LookupError::new(format!("Injected failure for aspect {name} of {urn}.")));
		}
		if urn.entity_type() != entity_type {
			return Ok(None);
		}

		let Some(aspects) = self.entities.get(urn.as_str()) else {
			return Ok(None);
		};

		Ok(Some(
			aspects
				.iter()
				.filter(|(name, _)| aspect_names.contains(&name.as_str()))
				.map(|(name, aspect)| (name.clone(), aspect.clone()))
				.collect(),
		))
	}
}

#[cfg(test)]
mod tests {
	use lantern_policy::{EntityLookup, Urn};

	use crate::InMemoryEntityLookup;

	#[test]
	fn returns_only_requested_aspects() {
		let lookup = InMemoryEntityLookup::from_json(
			r#"{ "urn:li:corpuser:jdoe": { "groupMembership": { "groups": [] }, "roleMembership": {} } }"#,
		)
		.expect("Fixture must parse.");
		let urn = Urn::parse("urn:li:corpuser:jdoe").expect("Urn must parse.");
		let aspects = lookup
			.get_aspects("corpuser", &urn, &["roleMembership"])
			.expect("Lookup must succeed.")
			.expect("Entity must exist.");

		assert_eq!(aspects.len(), 1);
		assert!(aspects.contains_key("roleMembership"));
		assert_eq!(lookup.call_count("roleMembership"), 1);
	}

	#[test]
	fn unknown_entities_are_absent() {
		let lookup = InMemoryEntityLookup::new();
		let urn = Urn::parse("urn:li:corpuser:ghost").expect("Urn must parse.");

		assert!(lookup.get_aspects("corpuser", &urn, &["ownership"]).expect("Must succeed.").is_none());
	}

	#[test]
	fn injected_failures_are_reported_and_recorded() {
		let lookup = InMemoryEntityLookup::new().fail_aspect("groupMembership");
		let urn = Urn::parse("urn:li:corpuser:jdoe").expect("Urn must parse.");

		assert!(lookup.get_aspects("corpuser", &urn, &["groupMembership", "nativeGroupMembership"]).is_err());
		assert_eq!(lookup.calls().len(), 1);
	}

	#[test]
	fn rejects_non_urn_keys() {
		assert!(InMemoryEntityLookup::from_json(r#"{ "jdoe": {} }"#).is_err());
	}
}
