//! Backend-neutral query tree rendered to Elasticsearch query DSL at the boundary.

use serde_json::{Map, Value};

use crate::field::ScoreModifier;

pub const QUERY_STRING_PLACEHOLDER: &str = "{{query_string}}";

const BOOL_CLAUSES: [&str; 4] = ["must", "should", "filter", "must_not"];
const BOOL_PARAMS: [&str; 3] = ["minimum_should_match", "boost", "adjust_pure_negative"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeOp {
	Gt,
	Gte,
	Lt,
	Lte,
}
impl RangeOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Gt => "gt",
			Self::Gte => "gte",
			Self::Lt => "lt",
			Self::Lte => "lte",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Query {
	Bool(BoolQuery),
	/// Tokenized free text over several fields sharing one analyzer; terms are ANDed.
	SimpleQueryString { query: String, analyzer: String, fields: Vec<(String, f32)> },
	/// User-authored `field:value` syntax; terms are ANDed.
	QueryString { query: String, fields: Vec<(String, f32)> },
	MatchPhrasePrefix { field: String, query: String, boost: f32, name: String },
	Term {
		field: String,
		value: Value,
		case_insensitive: Option<bool>,
		boost: Option<f32>,
		name: Option<String>,
	},
	Terms { field: String, values: Vec<String>, name: String },
	Match { field: String, query: String, analyzer: String, name: String },
	MultiMatch { query: String, fields: Vec<String>, analyzer: String, name: String },
	Range { field: String, op: RangeOp, value: String, name: String },
	Wildcard { field: String, value: String, name: String },
	Exists { field: String },
	FunctionScore(FunctionScoreQuery),
	/// Opaque fragment taken verbatim from a custom template.
	Raw(Value),
}
impl Query {
	pub fn to_value(&self) -> Value {
		match self {
			Self::Bool(bool_query) => bool_query.to_value(),
			Self::SimpleQueryString { query, analyzer, fields } => serde_json::json!({
				"simple_query_string": {
					"query": query,
					"fields": boosted_fields(fields),
					"analyzer": analyzer,
					"default_operator": "and",
				}
			}),
			Self::QueryString { query, fields } => serde_json::json!({
				"query_string": {
					"query": query,
					"fields": boosted_fields(fields),
					"default_operator": "and",
				}
			}),
			Self::MatchPhrasePrefix { field, query, boost, name } => serde_json::json!({
				"match_phrase_prefix": { field.as_str(): { "query": query, "boost": boost, "_name": name } }
			}),
			Self::Term { field, value, case_insensitive, boost, name } => {
				let mut body = Map::new();

				body.insert("value".to_string(), value.clone());

				if let Some(case_insensitive) = case_insensitive {
					body.insert("case_insensitive".to_string(), Value::Bool(*case_insensitive));
				}
				if let Some(boost) = boost {
					body.insert("boost".to_string(), serde_json::json!(boost));
				}
				if let Some(name) = name {
					body.insert("_name".to_string(), Value::String(name.clone()));
				}

				serde_json::json!({ "term": { field.as_str(): body } })
			},
			Self::Terms { field, values, name } => serde_json::json!({
				"terms": { field.as_str(): values, "_name": name }
			}),
			Self::Match { field, query, analyzer, name } => serde_json::json!({
				"match": { field.as_str(): { "query": query, "analyzer": analyzer, "_name": name } }
			}),
			Self::MultiMatch { query, fields, analyzer, name } => serde_json::json!({
				"multi_match": { "query": query, "fields": fields, "analyzer": analyzer, "_name": name }
			}),
			Self::Range { field, op, value, name } => serde_json::json!({
				"range": { field.as_str(): { op.as_str(): value, "_name": name } }
			}),
			Self::Wildcard { field, value, name } => serde_json::json!({
				"wildcard": { field.as_str(): { "value": value, "_name": name } }
			}),
			Self::Exists { field } => serde_json::json!({ "exists": { "field": field } }),
			Self::FunctionScore(function_score) => function_score.to_value(),
			Self::Raw(value) => value.clone(),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolQuery {
	pub must: Vec<Query>,
	pub should: Vec<Query>,
	pub filter: Vec<Query>,
	pub must_not: Vec<Query>,
	pub name: Option<String>,
	/// Pass-through parameters such as `minimum_should_match`.
	pub params: Map<String, Value>,
}
impl BoolQuery {
	pub fn named(name: impl Into<String>) -> Self {
		Self { name: Some(name.into()), ..Self::default() }
	}

	pub fn is_empty(&self) -> bool {
		self.must.is_empty()
			&& self.should.is_empty()
			&& self.filter.is_empty()
			&& self.must_not.is_empty()
	}

	/// Parses a custom `bool` body, keeping its clauses as opaque fragments.
	pub fn from_template(body: &Map<String, Value>) -> Result<Self, String> {
		let mut bool_query = Self::default();

		for (key, value) in body {
			if BOOL_CLAUSES.contains(&key.as_str()) {
				let clauses = template_clauses(key, value)?;

				match key.as_str() {
					"must" => bool_query.must = clauses,
					"should" => bool_query.should = clauses,
					"filter" => bool_query.filter = clauses,
					_ => bool_query.must_not = clauses,
				}
			} else if key == "_name" {
				let name = value.as_str().ok_or_else(|| "bool._name must be a string.".to_string())?;

				bool_query.name = Some(name.to_string());
			} else if BOOL_PARAMS.contains(&key.as_str()) {
				bool_query.params.insert(key.clone(), value.clone());
			} else {
				return Err(format!("unsupported bool query key '{key}'."));
			}
		}

		Ok(bool_query)
	}

	pub fn to_value(&self) -> Value {
		let mut body = Map::new();

		for (key, clauses) in [
			("must", &self.must),
			("should", &self.should),
			("filter", &self.filter),
			("must_not", &self.must_not),
		] {
			if !clauses.is_empty() {
				body.insert(key.to_string(), Value::Array(clauses.iter().map(Query::to_value).collect()));
			}
		}

		for (key, value) in &self.params {
			body.insert(key.clone(), value.clone());
		}

		if let Some(name) = &self.name {
			body.insert("_name".to_string(), Value::String(name.clone()));
		}

		serde_json::json!({ "bool": body })
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScoreFunction {
	/// Constant multiplier, optionally restricted to documents matching `filter`.
	Weight { filter: Option<Box<Query>>, weight: f32 },
	FieldValueFactor { field: String, factor: f32, missing: f64, modifier: Option<ScoreModifier> },
}
impl ScoreFunction {
	pub fn to_value(&self) -> Value {
		match self {
			Self::Weight { filter, weight } => {
				let mut body = Map::new();

				if let Some(filter) = filter {
					body.insert("filter".to_string(), filter.to_value());
				}

				body.insert("weight".to_string(), serde_json::json!(weight));

				Value::Object(body)
			},
			Self::FieldValueFactor { field, factor, missing, modifier } => {
				let mut factor_body = serde_json::json!({
					"field": field,
					"factor": factor,
					"missing": missing,
				});

				if let (Some(modifier), Some(obj)) = (modifier, factor_body.as_object_mut()) {
					obj.insert("modifier".to_string(), Value::String(modifier.as_str().to_string()));
				}

				serde_json::json!({ "field_value_factor": factor_body })
			},
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum FunctionScoring {
	/// Functions averaged together, then multiplied into the query score.
	Annotated(Vec<ScoreFunction>),
	/// A custom `function_score` body; the composed query is grafted in as `query`.
	Custom(Map<String, Value>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionScoreQuery {
	pub query: Box<Query>,
	pub scoring: FunctionScoring,
}
impl FunctionScoreQuery {
	pub fn to_value(&self) -> Value {
		let body = match &self.scoring {
			FunctionScoring::Annotated(functions) => {
				let mut body = Map::new();

				body.insert("query".to_string(), self.query.to_value());
				body.insert(
					"functions".to_string(),
					Value::Array(functions.iter().map(ScoreFunction::to_value).collect()),
				);
				body.insert("score_mode".to_string(), Value::String("avg".to_string()));
				body.insert("boost_mode".to_string(), Value::String("multiply".to_string()));

				body
			},
			FunctionScoring::Custom(template) => {
				let mut body = template.clone();

				body.insert("query".to_string(), self.query.to_value());

				body
			},
		};

		serde_json::json!({ "function_score": body })
	}
}

/// Replaces every string value equal to the placeholder with `query`.
pub fn substitute_query_string(template: &Value, query: &str) -> Value {
	match template {
		Value::String(text) if text == QUERY_STRING_PLACEHOLDER => Value::String(query.to_string()),
		Value::Array(items) =>
			Value::Array(items.iter().map(|item| substitute_query_string(item, query)).collect()),
		Value::Object(obj) => Value::Object(
			obj.iter()
				.map(|(key, value)| (key.clone(), substitute_query_string(value, query)))
				.collect(),
		),
		other => other.clone(),
	}
}

pub fn validate_function_score_template(body: &Map<String, Value>) -> Result<(), String> {
	if let Some(functions) = body.get("functions")
		&& !functions.is_array()
	{
		return Err("function_score.functions must be an array.".to_string());
	}

	for key in ["score_mode", "boost_mode"] {
		if let Some(mode) = body.get(key)
			&& !mode.is_string()
		{
			return Err(format!("function_score.{key} must be a string."));
		}
	}

	if body.contains_key("query") {
		return Err("function_score.query is generated and must not be set.".to_string());
	}

	Ok(())
}

fn template_clauses(key: &str, value: &Value) -> Result<Vec<Query>, String> {
	match value {
		Value::Object(_) => Ok(vec![Query::Raw(value.clone())]),
		Value::Array(items) => items
			.iter()
			.map(|item| {
				if item.is_object() {
					Ok(Query::Raw(item.clone()))
				} else {
					Err(format!("bool.{key} entries must be objects."))
				}
			})
			.collect(),
		_ => Err(format!("bool.{key} must be an object or an array of objects.")),
	}
}

fn boosted_fields(fields: &[(String, f32)]) -> Vec<String> {
	fields.iter().map(|(field, boost)| format!("{field}^{boost}")).collect()
}
