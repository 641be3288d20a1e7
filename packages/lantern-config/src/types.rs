use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	/// Boost applied to the always-present `urn` field.
	#[serde(default = "default_urn_boost")]
	pub urn_boost: f32,
	#[serde(default)]
	pub exact_match: ExactMatch,
	#[serde(default)]
	pub partial: Partial,
	#[serde(default)]
	pub custom: SearchCustom,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			urn_boost: default_urn_boost(),
			exact_match: ExactMatch::default(),
			partial: Partial::default(),
			custom: SearchCustom::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExactMatch {
	/// When true, a quoted query runs only the exact/prefix clauses.
	#[serde(default)]
	pub exclusive: bool,
	#[serde(default = "default_true")]
	pub with_prefix: bool,
	#[serde(default = "default_exact_factor")]
	pub exact_factor: f32,
	#[serde(default = "default_prefix_factor")]
	pub prefix_factor: f32,
	#[serde(default = "default_case_sensitivity_factor")]
	pub case_sensitivity_factor: f32,
	/// Adds the exact/prefix clauses to structured (`\\/q `) queries too.
	#[serde(default = "default_true")]
	pub enable_structured: bool,
}
impl Default for ExactMatch {
	fn default() -> Self {
		Self {
			exclusive: false,
			with_prefix: true,
			exact_factor: default_exact_factor(),
			prefix_factor: default_prefix_factor(),
			case_sensitivity_factor: default_case_sensitivity_factor(),
			enable_structured: true,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Partial {
	#[serde(default = "default_urn_factor")]
	pub urn_factor: f32,
	#[serde(default = "default_partial_factor")]
	pub factor: f32,
}
impl Default for Partial {
	fn default() -> Self {
		Self { urn_factor: default_urn_factor(), factor: default_partial_factor() }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchCustom {
	#[serde(default)]
	pub enabled: bool,
	/// Optional. Relative paths resolve against the directory of the TOML file.
	pub file: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSearchConfiguration {
	#[serde(default)]
	pub query_configurations: Vec<QueryConfiguration>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfiguration {
	pub query_regex: String,
	#[serde(default = "default_true")]
	pub simple_query: bool,
	#[serde(default = "default_true")]
	pub exact_match_query: bool,
	#[serde(default = "default_true")]
	pub prefix_match_query: bool,
	/// Optional. Raw `bool` query body; the string value `{{query_string}}` is substituted.
	pub bool_query: Option<Map<String, Value>>,
	/// Optional. Raw `function_score` body without its `query`.
	pub function_score: Option<Map<String, Value>>,
}
impl QueryConfiguration {
	pub fn new(query_regex: impl Into<String>) -> Self {
		Self {
			query_regex: query_regex.into(),
			simple_query: true,
			exact_match_query: true,
			prefix_match_query: true,
			bool_query: None,
			function_score: None,
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_true() -> bool {
	true
}

fn default_urn_boost() -> f32 {
	10.0
}

fn default_exact_factor() -> f32 {
	2.0
}

fn default_prefix_factor() -> f32 {
	1.6
}

fn default_case_sensitivity_factor() -> f32 {
	0.7
}

fn default_urn_factor() -> f32 {
	0.5
}

fn default_partial_factor() -> f32 {
	0.4
}
