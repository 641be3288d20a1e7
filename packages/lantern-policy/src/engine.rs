use std::{
	collections::BTreeSet,
	fmt::{Display, Formatter},
	sync::Arc,
};

use serde::Serialize;

use crate::{
	Error, LookupError, Result,
	context::PolicyEvaluationContext,
	lookup::{
		self, EntityLookup, GROUP_MEMBERSHIP_ASPECT_NAME, GroupMembership,
		NATIVE_GROUP_MEMBERSHIP_ASPECT_NAME, NativeGroupMembership, OWNERSHIP_ASPECT_NAME, Ownership,
		ROLE_MEMBERSHIP_ASPECT_NAME, RoleMembership,
	},
	model::{ActorFilter, PolicyInfo, PolicyMatchCondition, PolicyMatchCriterion, PolicyState, PolicyType},
	resource::{ResolvedResourceSpec, ResourceFieldType},
	urn::{CORP_USER_ENTITY_NAME, Urn},
};

static NO_URNS: BTreeSet<Urn> = BTreeSet::new();

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyEvaluationResult {
	Granted,
	Denied,
}
impl PolicyEvaluationResult {
	pub fn is_granted(self) -> bool {
		self == Self::Granted
	}
}
impl Display for PolicyEvaluationResult {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Granted => f.write_str("GRANTED"),
			Self::Denied => f.write_str("DENIED"),
		}
	}
}

/// Every actor a policy grants to, without naming a concrete requester.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyActors {
	pub users: Vec<Urn>,
	pub groups: Vec<Urn>,
	pub all_users: bool,
	pub all_groups: bool,
}

/// Decides whether policies grant privileges to actors on resources.
#[derive(Clone)]
pub struct PolicyEngine {
	lookup: Arc<dyn EntityLookup>,
}
impl PolicyEngine {
	pub fn new(lookup: Arc<dyn EntityLookup>) -> Self {
		Self { lookup }
	}

	/// Like [`Self::evaluate_policy`] for an actor given as text; an unparsable actor is denied.
	pub fn evaluate_policy_str(
		&self,
		policy: &PolicyInfo,
		actor: &str,
		privilege: &str,
		resource: Option<&ResolvedResourceSpec>,
	) -> Result<PolicyEvaluationResult> {
		match Urn::parse(actor) {
			Ok(actor) => self.evaluate_policy(policy, &actor, privilege, resource),
			Err(err) => {
				tracing::error!(
					actor,
					error = %err,
					"Failed to bind actor to an urn. Denying the authorization request."
				);

				Ok(PolicyEvaluationResult::Denied)
			},
		}
	}

	/// Fails only when the actor's group memberships cannot be fetched.
	pub fn evaluate_policy(
		&self,
		policy: &PolicyInfo,
		actor: &Urn,
		privilege: &str,
		resource: Option<&ResolvedResourceSpec>,
	) -> Result<PolicyEvaluationResult> {
		let mut context = PolicyEvaluationContext::new();

		tracing::debug!(policy = %policy.display_name, %actor, privilege, "Evaluating policy.");

		if !policy.privileges.iter().any(|granted| granted == privilege) {
			tracing::debug!(policy = %policy.display_name, privilege, "Policy does not cover the privilege.");

			return Ok(PolicyEvaluationResult::Denied);
		}
		if !self.is_policy_applicable(policy, actor, resource, &mut context)? {
			tracing::debug!(
				policy = %policy.display_name,
				%actor,
				"Policy is not applicable to the actor and resource."
			);

			return Ok(PolicyEvaluationResult::Denied);
		}

		Ok(PolicyEvaluationResult::Granted)
	}

	pub fn get_matching_actors(
		&self,
		policy: &PolicyInfo,
		resource: Option<&ResolvedResourceSpec>,
	) -> PolicyActors {
		let mut actors = PolicyActors::default();

		if !self.policy_matches_resource(policy, resource) {
			return actors;
		}

		let filter = &policy.actors;

		actors.all_users = filter.all_users;
		actors.all_groups = filter.all_groups;

		actors.users.extend(filter.users.iter().flatten().cloned());
		actors.groups.extend(filter.groups.iter().flatten().cloned());

		if filter.resource_owners
			&& let Some(resource) = resource
		{
			for owner in resource.owners() {
				match Urn::parse(owner) {
					Ok(owner) if owner.is_user() => actors.users.push(owner),
					Ok(owner) if owner.is_group() => actors.groups.push(owner),
					Ok(_) => {},
					Err(err) => tracing::warn!(%owner, error = %err, "Skipping owner that is not an urn."),
				}
			}
		}

		actors
	}

	/// Distinct privileges of every policy that applies to the actor, in policy order.
	pub fn get_granted_privileges(
		&self,
		policies: &[PolicyInfo],
		actor: &Urn,
		resource: Option<&ResolvedResourceSpec>,
	) -> Result<Vec<String>> {
		let mut context = PolicyEvaluationContext::new();
		let mut privileges: Vec<String> = Vec::new();

		for policy in policies {
			if !self.is_policy_applicable(policy, actor, resource, &mut context)? {
				continue;
			}

			for privilege in &policy.privileges {
				if !privileges.contains(privilege) {
					privileges.push(privilege.clone());
				}
			}
		}

		Ok(privileges)
	}

	/// Whether the policy's resource scope admits `resource`.
	pub fn policy_matches_resource(
		&self,
		policy: &PolicyInfo,
		resource: Option<&ResolvedResourceSpec>,
	) -> bool {
		if policy.policy_type == PolicyType::Platform {
			return true;
		}

		let Some(filter) = policy.resources.as_ref() else {
			return true;
		};
		let Some(resource) = resource else {
			tracing::debug!("Resource filter present in policy, but no resource spec provided.");

			return false;
		};

		filter.normalize().criteria.iter().all(|criterion| criterion_matches(criterion, resource))
	}

	/// State, resource and actor checks of one policy, sharing `context` across calls.
	pub fn is_policy_applicable(
		&self,
		policy: &PolicyInfo,
		actor: &Urn,
		resource: Option<&ResolvedResourceSpec>,
		context: &mut PolicyEvaluationContext,
	) -> Result<bool> {
		if policy.state == PolicyState::Inactive {
			return Ok(false);
		}
		if !self.policy_matches_resource(policy, resource) {
			return Ok(false);
		}

		self.is_actor_match(actor, &policy.actors, resource, context)
	}

	fn is_actor_match(
		&self,
		actor: &Urn,
		filter: &ActorFilter,
		resource: Option<&ResolvedResourceSpec>,
		context: &mut PolicyEvaluationContext,
	) -> Result<bool> {
		if is_user_match(actor, filter) {
			return Ok(true);
		}
		if self.is_group_match(actor, filter, context)? {
			return Ok(true);
		}
		if self.is_owner_match(actor, filter, resource, context)? {
			return Ok(true);
		}

		Ok(self.is_role_match(actor, filter, context))
	}

	fn is_group_match(
		&self,
		actor: &Urn,
		filter: &ActorFilter,
		context: &mut PolicyEvaluationContext,
	) -> Result<bool> {
		if !filter.all_groups && !filter.has_groups() {
			return Ok(false);
		}

		let groups = self.resolve_groups(actor, context)?;

		Ok(filter.all_groups || filter.groups.iter().flatten().any(|group| groups.contains(group)))
	}

	fn is_owner_match(
		&self,
		actor: &Urn,
		filter: &ActorFilter,
		resource: Option<&ResolvedResourceSpec>,
		context: &mut PolicyEvaluationContext,
	) -> Result<bool> {
		let Some(resource) = resource else {
			return Ok(false);
		};

		if !filter.resource_owners {
			return Ok(false);
		}

		let owners = self.owners_for_types(resource, filter.resource_owners_types.as_deref());

		if owners.contains(actor.as_str()) {
			return Ok(true);
		}

		let groups = self.resolve_groups(actor, context)?;

		Ok(groups.iter().any(|group| owners.contains(group.as_str())))
	}

	fn is_role_match(
		&self,
		actor: &Urn,
		filter: &ActorFilter,
		context: &mut PolicyEvaluationContext,
	) -> bool {
		let Some(policy_roles) = filter.roles.as_ref() else {
			return false;
		};
		let roles = self.resolve_roles(actor, context);

		policy_roles.iter().any(|role| roles.contains(role))
	}

	/// Owner urns of the resource, restricted to `ownership_types` when given.
	///
	/// Lookup failures yield no owners.
	fn owners_for_types(
		&self,
		resource: &ResolvedResourceSpec,
		ownership_types: Option<&[Urn]>,
	) -> BTreeSet<String> {
		let entity_urn = match Urn::parse(&resource.spec().resource) {
			Ok(urn) => urn,
			Err(err) => {
				tracing::error!(resource = %resource.spec().resource, error = %err, "Resource is not an urn.");

				return BTreeSet::new();
			},
		};
		let ownership = self
			.lookup
			.get_aspects(entity_urn.entity_type(), &entity_urn, &[OWNERSHIP_ASPECT_NAME])
			.and_then(|aspects| match aspects {
				Some(aspects) => lookup::decode_aspect::<Ownership>(&aspects, OWNERSHIP_ASPECT_NAME),
				None => Ok(None),
			});
		let ownership = match ownership {
			Ok(Some(ownership)) => ownership,
			Ok(None) => return BTreeSet::new(),
			Err(err) => {
				tracing::error!(
					urn = %entity_urn,
					error = %err,
					"Error while retrieving ownership aspect."
				);

				return BTreeSet::new();
			},
		};

		ownership
			.owners
			.into_iter()
			.filter(|owner| match ownership_types {
				Some(types) => owner.type_urn.as_ref().is_some_and(|type_urn| types.contains(type_urn)),
				None => true,
			})
			.map(|owner| owner.owner.to_string())
			.collect()
	}

	fn resolve_groups<'c>(
		&self,
		actor: &Urn,
		context: &'c mut PolicyEvaluationContext,
	) -> Result<&'c BTreeSet<Urn>> {
		if context.groups().is_none() {
			let groups = self.fetch_groups(actor).map_err(|source| Error::GroupResolution {
				actor: actor.to_string(),
				source,
			})?;

			return Ok(context.set_groups(groups));
		}

		Ok(context.groups().unwrap_or(&NO_URNS))
	}

	fn fetch_groups(&self, actor: &Urn) -> Result<BTreeSet<Urn>, LookupError> {
		let Some(aspects) = self.lookup.get_aspects(
			CORP_USER_ENTITY_NAME,
			actor,
			&[GROUP_MEMBERSHIP_ASPECT_NAME, NATIVE_GROUP_MEMBERSHIP_ASPECT_NAME],
		)?
		else {
			return Ok(BTreeSet::new());
		};
		let mut groups = BTreeSet::new();

		if let Some(membership) =
			lookup::decode_aspect::<GroupMembership>(&aspects, GROUP_MEMBERSHIP_ASPECT_NAME)?
		{
			groups.extend(membership.groups);
		}
		if let Some(membership) = lookup::decode_aspect::<NativeGroupMembership>(
			&aspects,
			NATIVE_GROUP_MEMBERSHIP_ASPECT_NAME,
		)? {
			groups.extend(membership.native_groups);
		}

		Ok(groups)
	}

	/// Roles of the actor; a failed lookup yields none and is retried by the next caller.
	fn resolve_roles<'c>(
		&self,
		actor: &Urn,
		context: &'c mut PolicyEvaluationContext,
	) -> &'c BTreeSet<Urn> {
		if context.roles().is_none() {
			return match self.fetch_roles(actor) {
				Ok(roles) => context.set_roles(roles),
				Err(err) => {
					tracing::error!(
						%actor,
						aspect = ROLE_MEMBERSHIP_ASPECT_NAME,
						error = %err,
						"Failed to fetch role membership."
					);

					&NO_URNS
				},
			};
		}

		context.roles().unwrap_or(&NO_URNS)
	}

	fn fetch_roles(&self, actor: &Urn) -> Result<BTreeSet<Urn>, LookupError> {
		let Some(aspects) =
			self.lookup.get_aspects(CORP_USER_ENTITY_NAME, actor, &[ROLE_MEMBERSHIP_ASPECT_NAME])?
		else {
			return Ok(BTreeSet::new());
		};
		let membership =
			lookup::decode_aspect::<RoleMembership>(&aspects, ROLE_MEMBERSHIP_ASPECT_NAME)?;

		Ok(membership.and_then(|membership| membership.roles).unwrap_or_default().into_iter().collect())
	}
}

fn is_user_match(actor: &Urn, filter: &ActorFilter) -> bool {
	filter.all_users || filter.users.iter().flatten().any(|user| user == actor)
}

/// True when any criterion value equals any value the resource exposes for the field.
fn criterion_matches(criterion: &PolicyMatchCriterion, resource: &ResolvedResourceSpec) -> bool {
	let Some(field) = ResourceFieldType::parse(&criterion.field) else {
		tracing::error!(field = %criterion.field, "Unsupported resource field type.");

		return false;
	};

	if criterion.condition != PolicyMatchCondition::Equals {
		tracing::error!(field = %criterion.field, condition = ?criterion.condition, "Unsupported condition.");

		return false;
	}

	let field_values = resource.field_values(field);

	criterion.values.iter().any(|value| field_values.contains(value))
}
