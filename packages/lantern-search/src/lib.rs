pub mod builder;
pub mod custom;
pub mod field;
pub mod filter;
pub mod query;

mod error;

pub use builder::{STRUCTURED_QUERY_PREFIX, ScoringStrategy, SearchQueryBuilder};
pub use custom::CustomizedQueryHandler;
pub use error::{Error, Result};
pub use field::{EntitySpec, FieldType, SearchFieldConfig, SearchScoreAnnotation, SearchableAnnotation};
pub use filter::{
	Condition, ConjunctiveCriterion, Criterion, Filter, SortCriterion, SortOrder, build_filter_query,
	build_sort_order,
};
pub use query::{BoolQuery, Query};
