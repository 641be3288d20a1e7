pub mod context;
pub mod engine;
pub mod lookup;
pub mod model;
pub mod resource;
pub mod urn;

mod error;

pub use context::PolicyEvaluationContext;
pub use engine::{PolicyActors, PolicyEngine, PolicyEvaluationResult};
pub use error::{Error, LookupError, Result};
pub use lookup::{AspectMap, EntityLookup};
pub use model::{
	ActorFilter, PolicyInfo, PolicyMatchCondition, PolicyMatchCriterion, PolicyMatchFilter,
	PolicyState, PolicyType, ResourceFilter,
};
pub use resource::{ResolvedResourceSpec, ResourceFieldType, ResourceSpec};
pub use urn::Urn;
