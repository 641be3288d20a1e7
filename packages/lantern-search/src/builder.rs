use std::collections::BTreeMap;

use serde_json::{Map, Value};

use lantern_config::{CustomSearchConfiguration, ExactMatch, Partial, QueryConfiguration, Search};

use crate::{
	Result,
	custom::{self, CustomizedQueryHandler},
	field::{EntitySpec, FieldType, SearchFieldConfig},
	filter,
	query::{BoolQuery, FunctionScoreQuery, FunctionScoring, Query, ScoreFunction},
};

/// Marker that switches a raw query into `field:value` syntax mode.
pub const STRUCTURED_QUERY_PREFIX: &str = "\\\\/q ";

/// How the composed query is scored, resolved once per build.
#[derive(Debug)]
pub enum ScoringStrategy<'a> {
	Custom(&'a Map<String, Value>),
	AnnotationDriven(Vec<ScoreFunction>),
}
impl<'a> ScoringStrategy<'a> {
	pub fn resolve(custom: Option<&'a QueryConfiguration>, entity_specs: &[EntitySpec]) -> Self {
		match custom.and_then(|query_cfg| query_cfg.function_score.as_ref()) {
			Some(template) => Self::Custom(template),
			None => Self::AnnotationDriven(annotation_score_functions(entity_specs)),
		}
	}

	pub fn apply(self, query: Query) -> Query {
		let scoring = match self {
			Self::Custom(template) => {
				if !template.is_empty() {
					tracing::debug!(functions = ?template, "Using custom scoring functions.");
				}

				FunctionScoring::Custom(template.clone())
			},
			Self::AnnotationDriven(functions) => FunctionScoring::Annotated(functions),
		};

		Query::FunctionScore(FunctionScoreQuery { query: Box::new(query), scoring })
	}
}

#[derive(Debug)]
pub struct SearchQueryBuilder {
	exact_match: ExactMatch,
	partial: Partial,
	urn_boost: f32,
	handler: CustomizedQueryHandler,
}
impl SearchQueryBuilder {
	pub fn new(search: &Search, custom: Option<&CustomSearchConfiguration>) -> Result<Self> {
		Ok(Self {
			exact_match: search.exact_match.clone(),
			partial: search.partial.clone(),
			urn_boost: search.urn_boost,
			handler: CustomizedQueryHandler::new(custom)?,
		})
	}

	pub fn build_query(&self, entity_specs: &[EntitySpec], query: &str, fulltext: bool) -> Result<Query> {
		let custom_cfg = self.handler.lookup_query_config(query);
		let composed = self.build_internal_query(custom_cfg, entity_specs, query, fulltext)?;

		Ok(ScoringStrategy::resolve(custom_cfg, entity_specs).apply(composed))
	}

	/// Query-by-default fields of all entities plus the urn fields, deduplicated in order.
	pub fn standard_fields(&self, entity_specs: &[EntitySpec]) -> Vec<SearchFieldConfig> {
		let mut fields: Vec<SearchFieldConfig> = Vec::new();

		for entity_spec in entity_specs {
			for field in self.entity_standard_fields(entity_spec) {
				if !fields.iter().any(|existing| existing.same_identity(&field)) {
					fields.push(field);
				}
			}
		}

		fields
	}

	fn entity_standard_fields(&self, entity_spec: &EntitySpec) -> Vec<SearchFieldConfig> {
		let urn = SearchFieldConfig::detect("urn", self.urn_boost, FieldType::Urn, true);
		let urn_delimited = urn.delimited_subfield(self.urn_boost * self.partial.urn_factor);
		let mut fields = Vec::with_capacity(entity_spec.searchable_fields.len() * 2 + 2);

		fields.push(urn);
		fields.extend(urn_delimited);

		for annotation in &entity_spec.searchable_fields {
			if !annotation.query_by_default {
				continue;
			}

			let field = SearchFieldConfig::from_annotation(annotation);
			let delimited = field.delimited_subfield(field.boost() * self.partial.factor);

			fields.push(field);
			fields.extend(delimited);
		}

		fields
	}

	fn build_internal_query(
		&self,
		custom_cfg: Option<&QueryConfiguration>,
		entity_specs: &[EntitySpec],
		query: &str,
		fulltext: bool,
	) -> Result<Query> {
		let sanitized = query.trim_start_matches(':');
		let mut final_query = match custom_cfg {
			Some(query_cfg) => custom::render_bool_query(query_cfg, sanitized)?.unwrap_or_default(),
			None => BoolQuery::default(),
		};
		let fields = self.standard_fields(entity_specs);

		if fulltext && !query.starts_with(STRUCTURED_QUERY_PREFIX) {
			if let Some(simple) = self.simple_query(custom_cfg, &fields, sanitized) {
				final_query.should.push(simple);
			}
			if let Some(prefix_exact) = self.prefix_and_exact_query(custom_cfg, &fields, sanitized) {
				final_query.should.push(prefix_exact);
			}
		} else {
			let without_prefix = query.strip_prefix(STRUCTURED_QUERY_PREFIX).unwrap_or(query);

			final_query.should.push(Query::QueryString {
				query: without_prefix.to_string(),
				fields: fields
					.iter()
					.map(|field| (field.field_name().to_string(), field.boost()))
					.collect(),
			});

			if self.exact_match.enable_structured
				&& let Some(prefix_exact) = self.prefix_and_exact_query(None, &fields, without_prefix)
			{
				final_query.should.push(prefix_exact);
			}
		}

		Ok(Query::Bool(final_query))
	}

	fn simple_query(
		&self,
		custom_cfg: Option<&QueryConfiguration>,
		fields: &[SearchFieldConfig],
		sanitized: &str,
	) -> Option<Query> {
		let execute = match custom_cfg {
			Some(query_cfg) => query_cfg.simple_query,
			None => !is_quoted(sanitized) || !self.exact_match.exclusive,
		};

		if !execute {
			return None;
		}

		// simple_query_string ignores per-field analyzers, so fields are grouped by analyzer.
		let mut analyzer_groups: BTreeMap<&str, Vec<(String, f32)>> = BTreeMap::new();

		for field in fields.iter().filter(|field| field.is_query_by_default()) {
			analyzer_groups
				.entry(field.analyzer())
				.or_default()
				.push((field.field_name().to_string(), field.boost()));
		}

		let mut simple_per_field = BoolQuery::default();

		for (analyzer, group) in analyzer_groups {
			simple_per_field.should.push(Query::SimpleQueryString {
				query: sanitized.to_string(),
				analyzer: analyzer.to_string(),
				fields: group,
			});
		}

		Some(Query::Bool(simple_per_field))
	}

	fn prefix_and_exact_query(
		&self,
		custom_cfg: Option<&QueryConfiguration>,
		fields: &[SearchFieldConfig],
		query: &str,
	) -> Option<Query> {
		let is_prefix =
			custom_cfg.map(|query_cfg| query_cfg.prefix_match_query).unwrap_or(self.exact_match.with_prefix);
		let is_exact = custom_cfg.map(|query_cfg| query_cfg.exact_match_query).unwrap_or(true);
		let unquoted = unquote(query);
		let exact = &self.exact_match;
		let mut final_query = BoolQuery::default();

		for field in fields.iter().filter(|field| field.is_query_by_default()) {
			if field.is_delimited_subfield() && is_prefix {
				final_query.should.push(Query::MatchPhrasePrefix {
					field: field.field_name().to_string(),
					query: query.to_string(),
					boost: field.boost() * exact.prefix_factor * exact.case_sensitivity_factor,
					name: field.short_name().to_string(),
				});
			}
			if field.is_keyword() && is_exact {
				// The keyword subfield keeps case; the base field may be normalized.
				let keyword_field = filter::to_keyword_field(field.field_name(), false);

				final_query.should.push(Query::Term {
					field: keyword_field.clone(),
					value: Value::String(unquoted.clone()),
					case_insensitive: Some(false),
					boost: Some(field.boost() * exact.exact_factor),
					name: Some(field.short_name().to_string()),
				});
				final_query.should.push(Query::Term {
					field: keyword_field,
					value: Value::String(unquoted.clone()),
					case_insensitive: Some(true),
					boost: Some(field.boost() * exact.exact_factor * exact.case_sensitivity_factor),
					name: Some(format!("{}_ci", field.short_name())),
				});
			}
		}

		if final_query.should.is_empty() { None } else { Some(Query::Bool(final_query)) }
	}
}

pub fn is_quoted(query: &str) -> bool {
	query.contains('"') || query.contains('\'')
}

pub fn unquote(query: &str) -> String {
	query.chars().filter(|ch| *ch != '"' && *ch != '\'').collect()
}

fn annotation_score_functions(entity_specs: &[EntitySpec]) -> Vec<ScoreFunction> {
	// The unconditional weight keeps the averaged factor at or above 1.
	let mut functions = vec![ScoreFunction::Weight { filter: None, weight: 1.0 }];

	for entity_spec in entity_specs {
		for annotation in &entity_spec.searchable_fields {
			for (value, weight) in &annotation.weights_per_field_value {
				functions.push(ScoreFunction::Weight {
					filter: Some(Box::new(Query::Term {
						field: annotation.field_name.clone(),
						value: Value::String(value.clone()),
						case_insensitive: None,
						boost: None,
						name: None,
					})),
					weight: *weight,
				});
			}
		}
	}
	for entity_spec in entity_specs {
		for score_field in &entity_spec.score_fields {
			functions.push(ScoreFunction::FieldValueFactor {
				field: score_field.field_name.clone(),
				factor: score_field.weight,
				missing: score_field.default_value,
				modifier: score_field.modifier,
			});
		}
	}

	functions
}
