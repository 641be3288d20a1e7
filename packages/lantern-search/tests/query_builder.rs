use serde_json::Value;

use lantern_config::{CustomSearchConfiguration, Search};
use lantern_search::{EntitySpec, Query, STRUCTURED_QUERY_PREFIX, SearchQueryBuilder};

const ENTITY_SPECS_JSON: &str = include_str!("fixtures/entity_specs.json");
const CUSTOM_SEARCH_JSON: &str = include_str!("fixtures/custom_search.json");

fn entity_specs() -> Vec<EntitySpec> {
	serde_json::from_str(ENTITY_SPECS_JSON).expect("Failed to parse entity specs fixture.")
}

fn custom_search() -> CustomSearchConfiguration {
	serde_json::from_str(CUSTOM_SEARCH_JSON).expect("Failed to parse custom search fixture.")
}

fn builder(search: &Search, custom: Option<&CustomSearchConfiguration>) -> SearchQueryBuilder {
	SearchQueryBuilder::new(search, custom).expect("Query builder must build.")
}

fn build(builder: &SearchQueryBuilder, query: &str, fulltext: bool) -> Value {
	builder.build_query(&entity_specs(), query, fulltext).expect("Query must build.").to_value()
}

fn inner_bool(rendered: &Value) -> &serde_json::Map<String, Value> {
	rendered["function_score"]["query"]["bool"]
		.as_object()
		.expect("Composed query must be a bool query inside function_score.")
}

fn composed(rendered: &Value) -> &Value {
	&rendered["function_score"]["query"]
}

fn should(body: &serde_json::Map<String, Value>) -> &Vec<Value> {
	body.get("should").and_then(Value::as_array).expect("Bool query must have should clauses.")
}

fn collect_keys<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
	match value {
		Value::Object(obj) => {
			for (name, child) in obj {
				if name == key {
					out.push(child);
				}

				collect_keys(child, key, out);
			}
		},
		Value::Array(items) =>
			for item in items {
				collect_keys(item, key, out);
			},
		_ => {},
	}
}

fn clauses<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
	let mut out = Vec::new();

	collect_keys(value, key, &mut out);

	out
}

#[test]
fn standard_fields_are_ordered_and_deduplicated() {
	let builder = builder(&Search::default(), None);
	let names: Vec<String> = builder
		.standard_fields(&entity_specs())
		.iter()
		.map(|field| field.field_name().to_string())
		.collect();

	assert_eq!(
		names,
		vec![
			"urn",
			"urn.delimited",
			"name",
			"name.delimited",
			"description",
			"description.delimited",
			"origin",
		]
	);
}

#[test]
fn standard_fields_apply_partial_factors() {
	let builder = builder(&Search::default(), None);
	let fields = builder.standard_fields(&entity_specs());

	assert_eq!(fields[0].boost(), 10.0);
	assert_eq!(fields[1].boost(), 10.0 * 0.5);
	assert_eq!(fields[3].boost(), 10.0 * 0.4_f32);
}

#[test]
fn fulltext_query_groups_simple_clauses_by_analyzer() {
	let rendered = build(&builder(&Search::default(), None), "orders", true);
	let top = should(inner_bool(&rendered));

	assert_eq!(top.len(), 2);

	let simple = should(top[0]["bool"].as_object().expect("Simple clause must be a bool query."));

	assert_eq!(simple.len(), 2);
	assert_eq!(
		simple[0],
		serde_json::json!({
			"simple_query_string": {
				"query": "orders",
				"fields": ["urn^10", "origin^1"],
				"analyzer": "keyword",
				"default_operator": "and",
			}
		})
	);
	assert_eq!(simple[1]["simple_query_string"]["analyzer"], "word_delimited");
	assert_eq!(
		simple[1]["simple_query_string"]["fields"],
		serde_json::json!([
			"urn.delimited^5",
			"name^10",
			"name.delimited^4",
			"description^1",
			"description.delimited^0.4",
		])
	);
}

#[test]
fn prefix_and_exact_clauses_cover_keyword_and_delimited_fields() {
	let rendered = build(&builder(&Search::default(), None), "orders", true);
	let top = should(inner_bool(&rendered));
	let prefix_exact = &top[1];
	let prefixes = clauses(prefix_exact, "match_phrase_prefix");
	let terms = clauses(prefix_exact, "term");

	assert_eq!(prefixes.len(), 3);
	assert_eq!(terms.len(), 8);
	assert!(prefixes[0].get("urn.delimited").is_some());
	assert_eq!(prefixes[1]["name.delimited"]["_name"], "name");

	let name_terms: Vec<&&Value> =
		terms.iter().filter(|term| term.get("name.keyword").is_some()).collect();

	assert_eq!(name_terms.len(), 2);
	assert_eq!(name_terms[0]["name.keyword"]["_name"], "name");
	assert_eq!(name_terms[0]["name.keyword"]["case_insensitive"], false);
	assert_eq!(name_terms[0]["name.keyword"]["boost"], serde_json::json!(10.0_f32 * 2.0));
	assert_eq!(name_terms[1]["name.keyword"]["_name"], "name_ci");
	assert_eq!(name_terms[1]["name.keyword"]["case_insensitive"], true);
	assert_eq!(name_terms[1]["name.keyword"]["boost"], serde_json::json!(10.0_f32 * 2.0 * 0.7));
	assert!(terms.iter().any(|term| term.get("urn").is_some()));
	assert!(terms.iter().any(|term| term.get("origin.keyword").is_some()));
	assert!(terms.iter().all(|term| term.get("origin").is_none()));
}

#[test]
fn prefix_clause_follows_with_prefix_setting() {
	let mut search = Search::default();

	search.exact_match.with_prefix = false;

	let rendered = build(&builder(&search, None), "orders", true);

	assert!(clauses(composed(&rendered), "match_phrase_prefix").is_empty());
	assert_eq!(clauses(composed(&rendered), "term").len(), 8);
}

#[test]
fn quoted_query_with_exclusive_exact_match_skips_simple_clause() {
	let mut search = Search::default();

	search.exact_match.exclusive = true;

	let rendered = build(&builder(&search, None), "\"orders\"", true);

	assert!(clauses(composed(&rendered), "simple_query_string").is_empty());

	let terms = clauses(composed(&rendered), "term");

	assert!(!terms.is_empty());
	assert!(terms.iter().all(|term| {
		term.as_object()
			.and_then(|body| body.values().next())
			.map(|body| body["value"] == "orders")
			.unwrap_or(false)
	}));
}

#[test]
fn quoted_query_without_exclusive_keeps_simple_clause() {
	let rendered = build(&builder(&Search::default(), None), "'orders'", true);

	assert_eq!(clauses(composed(&rendered), "simple_query_string").len(), 2);
}

#[test]
fn leading_colons_are_stripped_from_fulltext_queries() {
	let rendered = build(&builder(&Search::default(), None), "::orders", true);

	for simple in clauses(composed(&rendered), "simple_query_string") {
		assert_eq!(simple["query"], "orders");
	}
}

#[test]
fn structured_prefix_switches_to_query_string() {
	let rendered =
		build(&builder(&Search::default(), None), &format!("{STRUCTURED_QUERY_PREFIX}name:orders"), true);
	let top = should(inner_bool(&rendered));

	assert_eq!(top.len(), 2);
	assert_eq!(top[0]["query_string"]["query"], "name:orders");
	assert_eq!(top[0]["query_string"]["default_operator"], "and");
	assert_eq!(
		top[0]["query_string"]["fields"].as_array().map(Vec::len),
		Some(7),
		"Structured queries search every standard field."
	);
	assert!(clauses(composed(&rendered), "simple_query_string").is_empty());
}

#[test]
fn structured_query_without_exact_match_has_single_clause() {
	let mut search = Search::default();

	search.exact_match.enable_structured = false;

	let rendered = build(&builder(&search, None), "name:orders", false);
	let top = should(inner_bool(&rendered));

	assert_eq!(top.len(), 1);
	assert_eq!(top[0]["query_string"]["query"], "name:orders");
}

#[test]
fn urn_queries_use_custom_configuration_without_simple_clause() {
	let custom = custom_search();
	let rendered = build(
		&builder(&Search::default(), Some(&custom)),
		"urn:li:dataset:(urn:li:dataPlatform:hive,db.orders,PROD)",
		true,
	);

	assert!(clauses(composed(&rendered), "simple_query_string").is_empty());
	assert!(clauses(composed(&rendered), "match_phrase_prefix").is_empty());
	assert_eq!(clauses(composed(&rendered), "term").len(), 8);

	let function_score = &rendered["function_score"];

	assert_eq!(function_score["score_mode"], "sum");
	assert_eq!(function_score["boost_mode"], "replace");
	assert_eq!(function_score["functions"], serde_json::json!([{ "weight": 3 }]));
	assert!(function_score["query"]["bool"].is_object());
}

#[test]
fn custom_bool_template_is_rendered_and_extended() {
	let custom = custom_search();
	let rendered = build(&builder(&Search::default(), Some(&custom)), "orders", true);
	let body = inner_bool(&rendered);
	let top = should(body);

	assert_eq!(body["must_not"], serde_json::json!([{ "term": { "removed": true } }]));
	assert_eq!(top.len(), 3);
	assert_eq!(top[0], serde_json::json!({ "match": { "description": "orders" } }));
	assert_eq!(rendered["function_score"]["score_mode"], "avg");
}

#[test]
fn custom_template_substitution_keeps_quotes_inside_one_string() {
	let custom = custom_search();
	let rendered = build(&builder(&Search::default(), Some(&custom)), "a\"b", true);
	let top = should(inner_bool(&rendered));

	assert_eq!(top[0]["match"]["description"], "a\"b");
}

#[test]
fn annotation_scoring_averages_weights_and_score_fields() {
	let rendered = build(&builder(&Search::default(), None), "orders", true);
	let function_score = &rendered["function_score"];

	assert_eq!(function_score["score_mode"], "avg");
	assert_eq!(function_score["boost_mode"], "multiply");
	assert_eq!(
		function_score["functions"],
		serde_json::json!([
			{ "weight": 1.0 },
			{ "filter": { "term": { "origin": { "value": "PROD" } } }, "weight": 1.5 },
			{
				"field_value_factor": {
					"field": "usageCount",
					"factor": 2.0,
					"missing": 0.0,
					"modifier": "log1p",
				}
			},
		])
	);
}

#[test]
fn entities_without_fields_still_search_urn() {
	let builder = builder(&Search::default(), None);
	let spec: EntitySpec =
		serde_json::from_value(serde_json::json!({ "name": "tag" })).expect("Spec must parse.");
	let query = builder.build_query(&[spec], "pii", true).expect("Query must build.");
	let Query::FunctionScore(function_score) = query else {
		panic!("Composed query must be wrapped in function_score.");
	};
	let Query::Bool(body) = function_score.query.as_ref() else {
		panic!("Composed query must be a bool query.");
	};

	assert_eq!(body.should.len(), 2);
	assert!(body.must.is_empty());
}

#[test]
fn empty_bool_template_behaves_like_no_template() {
	let custom: CustomSearchConfiguration = serde_json::from_value(serde_json::json!({
		"queryConfigurations": [{ "queryRegex": ".*", "boolQuery": {} }]
	}))
	.expect("Custom configuration must parse.");
	let with_template = build(&builder(&Search::default(), Some(&custom)), "orders", true);
	let without = build(&builder(&Search::default(), None), "orders", true);

	assert_eq!(with_template, without);
}

#[test]
fn invalid_function_score_template_fails_construction() {
	let custom: CustomSearchConfiguration = serde_json::from_value(serde_json::json!({
		"queryConfigurations": [{ "queryRegex": ".*", "functionScore": { "functions": {} } }]
	}))
	.expect("Custom configuration must parse.");

	assert!(SearchQueryBuilder::new(&Search::default(), Some(&custom)).is_err());
}

#[test]
fn exact_matches_target_keyword_subfield_of_urn_and_keyword_fields() {
	let spec: EntitySpec = serde_json::from_value(serde_json::json!({
		"name": "dataset",
		"searchableFields": [
			{ "fieldName": "platform", "fieldType": "URN", "queryByDefault": true },
			{ "fieldName": "origin", "fieldType": "KEYWORD", "queryByDefault": true }
		]
	}))
	.expect("Spec must parse.");
	let rendered = builder(&Search::default(), None)
		.build_query(&[spec], "PROD", true)
		.expect("Query must build.")
		.to_value();
	let terms = clauses(composed(&rendered), "term");
	let targets = |field: &str| terms.iter().filter(|term| term.get(field).is_some()).count();

	assert_eq!(targets("platform.keyword"), 2);
	assert_eq!(targets("origin.keyword"), 2);
	assert_eq!(targets("urn"), 2);
	assert_eq!(targets("platform"), 0);
	assert_eq!(targets("origin"), 0);
}

#[test]
fn query_without_enabled_clauses_is_an_empty_bool() {
	let custom: CustomSearchConfiguration = serde_json::from_value(serde_json::json!({
		"queryConfigurations": [{
			"queryRegex": ".*",
			"simpleQuery": false,
			"exactMatchQuery": false,
			"prefixMatchQuery": false
		}]
	}))
	.expect("Custom configuration must parse.");
	let rendered = build(&builder(&Search::default(), Some(&custom)), "orders", true);

	assert_eq!(composed(&rendered), &serde_json::json!({ "bool": {} }));
	assert_eq!(rendered["function_score"]["score_mode"], "avg");
}

#[test]
fn identical_inputs_build_identical_queries() {
	let builder = builder(&Search::default(), None);

	assert_eq!(build(&builder, "orders daily", true), build(&builder, "orders daily", true));
}
