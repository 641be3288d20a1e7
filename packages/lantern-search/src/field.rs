//! Searchable field metadata and the per-field query configuration derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const KEYWORD_ANALYZER: &str = "keyword";
pub const TEXT_SEARCH_ANALYZER: &str = "word_delimited";
pub const PARTIAL_ANALYZER: &str = "partial";
pub const WORD_GRAM_ANALYZER: &str = "word_gram";
pub const BROWSE_PATH_HIERARCHY_ANALYZER: &str = "browse_path_hierarchy";

pub const KEYWORD_SUFFIX: &str = ".keyword";
pub const DELIMITED_SUFFIX: &str = ".delimited";

/// Fields indexed as keywords without a `.keyword` subfield.
pub const KEYWORD_FIELDS: [&str; 3] = ["urn", "runId", "_index"];
pub const PATH_HIERARCHY_FIELDS: [&str; 1] = ["browsePaths"];

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
	Keyword,
	Text,
	TextPartial,
	WordGram,
	BrowsePath,
	Urn,
	UrnPartial,
	Boolean,
	Count,
	Datetime,
	Object,
}
impl FieldType {
	pub fn is_urn(self) -> bool {
		matches!(self, Self::Urn | Self::UrnPartial)
	}

	pub fn is_free_text(self) -> bool {
		matches!(self, Self::Text | Self::TextPartial | Self::WordGram)
	}

	fn default_analyzer(self) -> &'static str {
		match self {
			Self::Text => TEXT_SEARCH_ANALYZER,
			Self::TextPartial => PARTIAL_ANALYZER,
			Self::WordGram => WORD_GRAM_ANALYZER,
			Self::BrowsePath => BROWSE_PATH_HIERARCHY_ANALYZER,
			Self::Keyword
			| Self::Urn
			| Self::UrnPartial
			| Self::Boolean
			| Self::Count
			| Self::Datetime
			| Self::Object => KEYWORD_ANALYZER,
		}
	}
}

/// Searchable annotation of one entity field.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableAnnotation {
	pub field_name: String,
	pub field_type: FieldType,
	#[serde(default = "default_boost")]
	pub boost_score: f32,
	/// Optional. Overrides the analyzer implied by `field_type` for the base field.
	#[serde(default)]
	pub analyzer: Option<String>,
	#[serde(default)]
	pub query_by_default: bool,
	/// Suppresses the `.delimited` subfield on free-text fields.
	#[serde(default)]
	pub exclude_partial_match: bool,
	/// Exact field value to score multiplier.
	#[serde(default)]
	pub weights_per_field_value: BTreeMap<String, f32>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreModifier {
	Log,
	Ln,
	Sqrt,
	Square,
	Reciprocal,
}
impl ScoreModifier {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Log => "log1p",
			Self::Ln => "ln1p",
			Self::Sqrt => "sqrt",
			Self::Square => "square",
			Self::Reciprocal => "reciprocal",
		}
	}
}

/// Numeric field whose value feeds the relevance score.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchScoreAnnotation {
	pub field_name: String,
	#[serde(default = "default_boost")]
	pub weight: f32,
	/// Value used when a document lacks the field.
	#[serde(default)]
	pub default_value: f64,
	#[serde(default)]
	pub modifier: Option<ScoreModifier>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
	pub name: String,
	#[serde(default)]
	pub searchable_fields: Vec<SearchableAnnotation>,
	#[serde(default)]
	pub score_fields: Vec<SearchScoreAnnotation>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchFieldConfig {
	field_name: String,
	short_name: String,
	boost: f32,
	analyzer: String,
	field_type: FieldType,
	has_keyword_subfield: bool,
	has_delimited_subfield: bool,
	is_query_by_default: bool,
	is_delimited_subfield: bool,
	is_keyword_subfield: bool,
}
impl SearchFieldConfig {
	pub fn from_annotation(annotation: &SearchableAnnotation) -> Self {
		Self::build(
			&annotation.field_name,
			annotation.boost_score,
			annotation.field_type,
			annotation.query_by_default,
			!annotation.exclude_partial_match,
			annotation.analyzer.as_deref(),
		)
	}

	pub fn detect(field_name: &str, boost: f32, field_type: FieldType, query_by_default: bool) -> Self {
		Self::build(field_name, boost, field_type, query_by_default, true, None)
	}

	fn build(
		field_name: &str,
		boost: f32,
		field_type: FieldType,
		query_by_default: bool,
		partial_match: bool,
		analyzer_override: Option<&str>,
	) -> Self {
		let is_subfield = field_name.contains('.');
		let has_keyword_subfield = !is_subfield && field_type.is_free_text();
		let has_delimited_subfield = !is_subfield
			&& (field_type.is_urn() || (field_type.is_free_text() && partial_match));

		Self {
			field_name: field_name.to_string(),
			short_name: short_name(field_name).to_string(),
			boost,
			analyzer: analyzer_for(field_name, field_type, analyzer_override).to_string(),
			field_type,
			has_keyword_subfield,
			has_delimited_subfield,
			is_query_by_default: query_by_default,
			is_delimited_subfield: field_name.ends_with(DELIMITED_SUFFIX),
			is_keyword_subfield: field_name.ends_with(KEYWORD_SUFFIX),
		}
	}

	pub fn field_name(&self) -> &str {
		&self.field_name
	}

	/// Base field name without subfield qualifiers, used as the clause result name.
	pub fn short_name(&self) -> &str {
		&self.short_name
	}

	pub fn boost(&self) -> f32 {
		self.boost
	}

	pub fn analyzer(&self) -> &str {
		&self.analyzer
	}

	pub fn field_type(&self) -> FieldType {
		self.field_type
	}

	pub fn has_keyword_subfield(&self) -> bool {
		self.has_keyword_subfield
	}

	pub fn has_delimited_subfield(&self) -> bool {
		self.has_delimited_subfield
	}

	pub fn is_query_by_default(&self) -> bool {
		self.is_query_by_default
	}

	pub fn is_delimited_subfield(&self) -> bool {
		self.is_delimited_subfield
	}

	pub fn is_keyword_subfield(&self) -> bool {
		self.is_keyword_subfield
	}

	/// True when an exact term match is meaningful for this field.
	pub fn is_keyword(&self) -> bool {
		self.analyzer == KEYWORD_ANALYZER || self.has_keyword_subfield || self.is_keyword_subfield
	}

	/// The `.delimited` sibling of this field, if it has one.
	pub fn delimited_subfield(&self, boost: f32) -> Option<Self> {
		if !self.has_delimited_subfield {
			return None;
		}

		Some(Self::build(
			&format!("{}{DELIMITED_SUFFIX}", self.field_name),
			boost,
			self.field_type,
			self.is_query_by_default,
			true,
			None,
		))
	}

	/// Identity used to collapse the same field contributed by several entities.
	pub fn same_identity(&self, other: &Self) -> bool {
		self.field_name == other.field_name
			&& self.boost.to_bits() == other.boost.to_bits()
			&& self.analyzer == other.analyzer
	}
}

pub fn short_name(field_name: &str) -> &str {
	field_name.split('.').next().unwrap_or(field_name)
}

pub fn is_keyword_field_name(field_name: &str) -> bool {
	field_name.ends_with(KEYWORD_SUFFIX) || KEYWORD_FIELDS.contains(&field_name)
}

fn analyzer_for<'a>(
	field_name: &str,
	field_type: FieldType,
	analyzer_override: Option<&'a str>,
) -> &'a str {
	// Order matters: subfield suffixes win over the declared type.
	if field_type == FieldType::BrowsePath {
		BROWSE_PATH_HIERARCHY_ANALYZER
	} else if is_keyword_field_name(field_name) {
		KEYWORD_ANALYZER
	} else if field_name.ends_with(DELIMITED_SUFFIX) {
		TEXT_SEARCH_ANALYZER
	} else if let Some(analyzer) = analyzer_override {
		analyzer
	} else {
		field_type.default_analyzer()
	}
}

fn default_boost() -> f32 {
	1.0
}
