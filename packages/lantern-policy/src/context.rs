use std::collections::BTreeSet;

use crate::urn::Urn;

/// Identity facts resolved for one actor during one top-level evaluation.
///
/// Create one per call and do not share it between actors or concurrent evaluations.
#[derive(Debug, Default)]
pub struct PolicyEvaluationContext {
	groups: Option<BTreeSet<Urn>>,
	roles: Option<BTreeSet<Urn>>,
}
impl PolicyEvaluationContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn groups(&self) -> Option<&BTreeSet<Urn>> {
		self.groups.as_ref()
	}

	pub fn roles(&self) -> Option<&BTreeSet<Urn>> {
		self.roles.as_ref()
	}

	pub(crate) fn set_groups(&mut self, groups: BTreeSet<Urn>) -> &BTreeSet<Urn> {
		self.groups.insert(groups)
	}

	pub(crate) fn set_roles(&mut self, roles: BTreeSet<Urn>) -> &BTreeSet<Urn> {
		self.roles.insert(roles)
	}
}
