//! Compiles the generic `OR`-of-`AND`s filter model into boolean query fragments.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	Error, Result,
	field::{KEYWORD_ANALYZER, KEYWORD_FIELDS, KEYWORD_SUFFIX, PATH_HIERARCHY_FIELDS},
	query::{BoolQuery, Query, RangeOp},
};

/// Fields whose values must also be matched on their editable and field-level siblings.
pub const FIELDS_TO_EXPANDED_FIELDS: [(&str, &[&str]); 6] = [
	("tags", &["tags", "fieldTags", "editedFieldTags"]),
	("glossaryTerms", &["glossaryTerms", "fieldGlossaryTerms", "editedFieldGlossaryTerms"]),
	("fieldTags", &["fieldTags", "editedFieldTags"]),
	("fieldGlossaryTerms", &["fieldGlossaryTerms", "editedFieldGlossaryTerms"]),
	("fieldDescriptions", &["fieldDescriptions", "editedFieldDescriptions"]),
	("description", &["description", "editedDescription"]),
];

pub const BOOLEAN_FIELDS: [&str; 1] = ["removed"];

/// Characters with special meaning in Elasticsearch regular expressions.
const RESERVED_CHARACTERS: &str = "?+*|{}[]()#@&<>~";
const URN_PREFIX: &str = "urn:li:";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
	#[default]
	Equal,
	GreaterThan,
	GreaterThanOrEqualTo,
	LessThan,
	LessThanOrEqualTo,
	Contain,
	StartWith,
	EndWith,
	Exists,
	IsNull,
	/// Any condition name this compiler does not know.
	#[serde(other)]
	Unsupported,
}
impl Condition {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Equal => "EQUAL",
			Self::GreaterThan => "GREATER_THAN",
			Self::GreaterThanOrEqualTo => "GREATER_THAN_OR_EQUAL_TO",
			Self::LessThan => "LESS_THAN",
			Self::LessThanOrEqualTo => "LESS_THAN_OR_EQUAL_TO",
			Self::Contain => "CONTAIN",
			Self::StartWith => "START_WITH",
			Self::EndWith => "END_WITH",
			Self::Exists => "EXISTS",
			Self::IsNull => "IS_NULL",
			Self::Unsupported => "UNSUPPORTED",
		}
	}

	fn is_existence(self) -> bool {
		matches!(self, Self::Exists | Self::IsNull)
	}
}
impl Display for Condition {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
	pub field: String,
	/// Deprecated single value; comma-separated for multiple values.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub values: Vec<String>,
	#[serde(default)]
	pub condition: Condition,
	#[serde(default)]
	pub negated: bool,
}
impl Criterion {
	pub fn new(field: impl Into<String>, condition: Condition) -> Self {
		Self { field: field.into(), condition, ..Self::default() }
	}

	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());

		self
	}

	pub fn with_values<I, S>(mut self, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.values = values.into_iter().map(Into::into).collect();

		self
	}

	pub fn negate(mut self) -> Self {
		self.negated = true;

		self
	}

	/// Normalized view of `value`/`values`; `values` wins when both are set.
	pub fn criterion_value(&self) -> CriterionValue<'_> {
		if !self.values.is_empty() {
			CriterionValue::Values(&self.values)
		} else if let Some(value) = self.value.as_deref() {
			CriterionValue::Legacy(value)
		} else {
			CriterionValue::Empty
		}
	}

	fn has_value(&self) -> bool {
		match self.criterion_value() {
			CriterionValue::Values(_) => true,
			CriterionValue::Legacy(value) => !value.trim().is_empty(),
			CriterionValue::Empty => false,
		}
	}

	fn with_field(&self, field: String) -> Self {
		Self { field, ..self.clone() }
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CriterionValue<'a> {
	Values(&'a [String]),
	Legacy(&'a str),
	Empty,
}
impl<'a> CriterionValue<'a> {
	/// Single operand for range and wildcard conditions.
	fn scalar(self) -> Option<&'a str> {
		match self {
			Self::Values(values) => values.first().map(String::as_str),
			Self::Legacy(value) => Some(value),
			Self::Empty => None,
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ConjunctiveCriterion {
	#[serde(default)]
	pub and: Vec<Criterion>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Filter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub or: Option<Vec<ConjunctiveCriterion>>,
	/// Deprecated single AND-group; ignored when `or` is set.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub criteria: Option<Vec<Criterion>>,
}
impl Filter {
	pub fn any_of(groups: Vec<Vec<Criterion>>) -> Self {
		Self {
			or: Some(groups.into_iter().map(|and| ConjunctiveCriterion { and }).collect()),
			criteria: None,
		}
	}

	/// The filter as a list of AND-groups.
	pub fn conjunctions(&self) -> Vec<&[Criterion]> {
		if let Some(or) = self.or.as_ref() {
			return or.iter().map(|conjunction| conjunction.and.as_slice()).collect();
		}
		if let Some(criteria) = self.criteria.as_ref() {
			return vec![criteria.as_slice()];
		}

		Vec::new()
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
	Ascending,
	#[default]
	Descending,
}
impl SortOrder {
	fn as_str(self) -> &'static str {
		match self {
			Self::Ascending => "asc",
			Self::Descending => "desc",
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SortCriterion {
	pub field: String,
	#[serde(default)]
	pub order: SortOrder,
}

/// Compiles `filter` into a boolean query with one `should` clause per AND-group.
pub fn build_filter_query(filter: Option<&Filter>, is_timeseries: bool) -> Result<BoolQuery> {
	let mut final_query = BoolQuery::default();
	let Some(filter) = filter else {
		return Ok(final_query);
	};

	if filter.or.is_none() && filter.criteria.is_some() {
		tracing::warn!("Received query filter with deprecated field 'criteria'. Use 'or' instead.");
	}

	for conjunction in filter.conjunctions() {
		final_query
			.should
			.push(Query::Bool(build_conjunctive_filter_query(conjunction, is_timeseries)?));
	}

	Ok(final_query)
}

pub fn build_conjunctive_filter_query(criteria: &[Criterion], is_timeseries: bool) -> Result<BoolQuery> {
	let mut and_query = BoolQuery::default();

	for criterion in criteria {
		if !criterion.condition.is_existence() && !criterion.has_value() {
			continue;
		}

		let compiled = query_from_criterion(criterion, is_timeseries)?;

		// `filter` skips scoring and lets the backend cache the clause.
		if criterion.negated {
			and_query.must_not.push(compiled);
		} else {
			and_query.filter.push(compiled);
		}
	}

	Ok(and_query)
}

/// Compiles one criterion, ORing it across sibling fields when the field expands.
pub fn query_from_criterion(criterion: &Criterion, is_timeseries: bool) -> Result<Query> {
	let facet_field = to_facet_field(&criterion.field);

	let Some(targets) = expanded_fields(facet_field) else {
		return query_from_single_field(criterion, is_timeseries);
	};
	let mut or_query = BoolQuery::default();

	for target in targets {
		let expanded = criterion.with_field(to_keyword_field(target, is_timeseries));

		or_query.should.push(query_from_single_field(&expanded, is_timeseries)?);
	}

	Ok(Query::Bool(or_query))
}

pub fn expanded_fields(field: &str) -> Option<&'static [&'static str]> {
	FIELDS_TO_EXPANDED_FIELDS
		.iter()
		.find(|(name, _)| *name == field)
		.map(|(_, targets)| *targets)
}

/// Backslash-escapes every reserved regular-expression character.
pub fn escape_reserved_characters(input: &str) -> String {
	let mut escaped = String::with_capacity(input.len());

	for ch in input.chars() {
		if RESERVED_CHARACTERS.contains(ch) {
			escaped.push('\\');
		}

		escaped.push(ch);
	}

	escaped
}

pub fn to_facet_field(field: &str) -> &str {
	field.strip_suffix(KEYWORD_SUFFIX).unwrap_or(field)
}

pub fn to_keyword_field(field: &str, skip_keyword_suffix: bool) -> String {
	if skip_keyword_suffix
		|| KEYWORD_FIELDS.contains(&field)
		|| PATH_HIERARCHY_FIELDS.contains(&field)
		|| field.contains('.')
	{
		field.to_string()
	} else {
		format!("{field}{KEYWORD_SUFFIX}")
	}
}

pub fn is_urn(value: &str) -> bool {
	value.starts_with(URN_PREFIX)
}

/// Sort clauses for `sort`, always tie-broken by ascending urn.
pub fn build_sort_order(sort: Option<&SortCriterion>) -> Vec<Value> {
	let mut clauses = Vec::with_capacity(2);

	match sort {
		Some(sort) => {
			clauses.push(serde_json::json!({ sort.field.as_str(): { "order": sort.order.as_str() } }))
		},
		None => clauses.push(serde_json::json!({ "_score": { "order": "desc" } })),
	}

	if sort.map(|sort| sort.field != "urn").unwrap_or(true) {
		clauses.push(serde_json::json!({ "urn": { "order": "asc" } }));
	}

	clauses
}

fn query_from_single_field(criterion: &Criterion, is_timeseries: bool) -> Result<Query> {
	let facet_field = to_facet_field(&criterion.field).to_string();
	let field = criterion.field.as_str();

	match criterion.condition {
		Condition::IsNull => {
			let mut is_null = BoolQuery::named(facet_field);

			is_null.must_not.push(Query::Exists { field: field.to_string() });

			return Ok(Query::Bool(is_null));
		},
		Condition::Exists => {
			let mut exists = BoolQuery::named(facet_field);

			exists.must.push(Query::Exists { field: field.to_string() });

			return Ok(Query::Bool(exists));
		},
		Condition::Equal => return Ok(build_equals_query(facet_field, criterion, is_timeseries)),
		_ => {},
	}

	let Some(value) = criterion.criterion_value().scalar().map(str::trim) else {
		return Err(unsupported(criterion));
	};
	let range = |op| Query::Range {
		field: field.to_string(),
		op,
		value: value.to_string(),
		name: facet_field.clone(),
	};
	let wildcard = |pattern: String| Query::Wildcard {
		field: to_keyword_field(field, is_timeseries),
		value: pattern,
		name: facet_field.clone(),
	};
	let escaped = escape_reserved_characters(value);

	match criterion.condition {
		Condition::GreaterThan => Ok(range(RangeOp::Gt)),
		Condition::GreaterThanOrEqualTo => Ok(range(RangeOp::Gte)),
		Condition::LessThan => Ok(range(RangeOp::Lt)),
		Condition::LessThanOrEqualTo => Ok(range(RangeOp::Lte)),
		Condition::Contain => Ok(wildcard(format!("*{escaped}*"))),
		Condition::StartWith => Ok(wildcard(format!("{escaped}*"))),
		Condition::EndWith => Ok(wildcard(format!("*{escaped}"))),
		_ => Err(unsupported(criterion)),
	}
}

fn build_equals_query(facet_field: String, criterion: &Criterion, is_timeseries: bool) -> Query {
	match criterion.criterion_value() {
		CriterionValue::Values(values) => {
			if BOOLEAN_FIELDS.contains(&facet_field.as_str()) && values.len() == 1 {
				return Query::Term {
					field: facet_field.clone(),
					value: Value::Bool(values[0].eq_ignore_ascii_case("true")),
					case_insensitive: None,
					boost: None,
					name: Some(facet_field),
				};
			}

			Query::Terms {
				field: to_keyword_field(&criterion.field, is_timeseries),
				values: values.to_vec(),
				name: facet_field,
			}
		},
		CriterionValue::Legacy(value) => build_legacy_equals_query(facet_field, criterion, value, is_timeseries),
		CriterionValue::Empty => Query::Bool(BoolQuery::named(facet_field)),
	}
}

fn build_legacy_equals_query(
	facet_field: String,
	criterion: &Criterion,
	value: &str,
	is_timeseries: bool,
) -> Query {
	let value = value.trim();

	// Urns may contain commas, so they are never split.
	if is_urn(value) {
		return Query::Match {
			field: to_keyword_field(&criterion.field, is_timeseries),
			query: value.to_string(),
			analyzer: KEYWORD_ANALYZER.to_string(),
			name: facet_field,
		};
	}

	// The subfield layout and type are unknown here, so the keyword analyzer is forced.
	let fields = if criterion.field.contains('.') {
		vec![criterion.field.clone()]
	} else {
		vec![criterion.field.clone(), format!("{}.*", criterion.field)]
	};
	let mut any_of = BoolQuery::default();

	for token in value.split(',').map(str::trim).filter(|token| !token.is_empty()) {
		any_of.should.push(Query::MultiMatch {
			query: token.to_string(),
			fields: fields.clone(),
			analyzer: KEYWORD_ANALYZER.to_string(),
			name: facet_field.clone(),
		});
	}

	Query::Bool(any_of)
}

fn unsupported(criterion: &Criterion) -> Error {
	Error::UnsupportedCondition {
		condition: criterion.condition.to_string(),
		field: criterion.field.clone(),
	}
}

#[cfg(test)]
mod tests {
	use crate::filter::{escape_reserved_characters, expanded_fields, to_facet_field, to_keyword_field};

	#[test]
	fn escapes_each_reserved_character_once() {
		assert_eq!(escape_reserved_characters("a*b"), "a\\*b");
		assert_eq!(escape_reserved_characters("(x)|[y]"), "\\(x\\)\\|\\[y\\]");
		assert_eq!(escape_reserved_characters("plain.text-1"), "plain.text-1");
	}

	#[test]
	fn keyword_suffix_rules() {
		assert_eq!(to_keyword_field("platform", false), "platform.keyword");
		assert_eq!(to_keyword_field("platform", true), "platform");
		assert_eq!(to_keyword_field("urn", false), "urn");
		assert_eq!(to_keyword_field("browsePaths", false), "browsePaths");
		assert_eq!(to_keyword_field("name.delimited", false), "name.delimited");
		assert_eq!(to_facet_field("platform.keyword"), "platform");
	}

	#[test]
	fn expansion_table_lookup() {
		assert_eq!(expanded_fields("tags"), Some(&["tags", "fieldTags", "editedFieldTags"][..]));
		assert_eq!(expanded_fields("description"), Some(&["description", "editedDescription"][..]));
		assert!(expanded_fields("platform").is_none());
	}
}
