use regex::{Regex, RegexBuilder};
use serde_json::Value;

use lantern_config::{CustomSearchConfiguration, QueryConfiguration};

use crate::{
	Error, Result,
	query::{self, BoolQuery},
};

/// Ordered table of regex-keyed query overrides.
///
/// Patterns are compiled once; the table is immutable afterwards and safe to share across
/// threads.
#[derive(Debug, Default)]
pub struct CustomizedQueryHandler {
	query_configurations: Vec<(Regex, QueryConfiguration)>,
}
impl CustomizedQueryHandler {
	pub fn new(custom: Option<&CustomSearchConfiguration>) -> Result<Self> {
		let Some(custom) = custom else {
			return Ok(Self::default());
		};
		let mut query_configurations = Vec::with_capacity(custom.query_configurations.len());

		for query_cfg in &custom.query_configurations {
			let regex = RegexBuilder::new(&query_cfg.query_regex)
				.case_insensitive(true)
				.build()
				.map_err(|err| Error::InvalidQueryRegex {
					regex: query_cfg.query_regex.clone(),
					source: err,
				})?;

			validate_templates(query_cfg)?;

			query_configurations.push((regex, query_cfg.clone()));
		}

		Ok(Self { query_configurations })
	}

	/// First configuration, in declaration order, whose pattern occurs anywhere in `query`.
	pub fn lookup_query_config(&self, query: &str) -> Option<&QueryConfiguration> {
		self.query_configurations
			.iter()
			.find(|(regex, _)| regex.is_match(query))
			.map(|(_, query_cfg)| query_cfg)
	}

	pub fn len(&self) -> usize {
		self.query_configurations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.query_configurations.is_empty()
	}
}

/// Renders the configuration's bool template for `query`, if it has one.
pub fn render_bool_query(query_cfg: &QueryConfiguration, query: &str) -> Result<Option<BoolQuery>> {
	let Some(template) = query_cfg.bool_query.as_ref() else {
		return Ok(None);
	};

	tracing::debug!(query_regex = %query_cfg.query_regex, "Using custom query configuration.");

	let rendered = query::substitute_query_string(&Value::Object(template.clone()), query);
	let Value::Object(body) = rendered else {
		return Err(Error::InvalidTemplate {
			regex: query_cfg.query_regex.clone(),
			message: "bool query template must be an object.".to_string(),
		});
	};

	BoolQuery::from_template(&body)
		.map(Some)
		.map_err(|message| Error::InvalidTemplate { regex: query_cfg.query_regex.clone(), message })
}

fn validate_templates(query_cfg: &QueryConfiguration) -> Result<()> {
	if let Some(template) = query_cfg.bool_query.as_ref() {
		BoolQuery::from_template(template).map_err(|message| Error::InvalidTemplate {
			regex: query_cfg.query_regex.clone(),
			message,
		})?;
	}
	if let Some(template) = query_cfg.function_score.as_ref() {
		query::validate_function_score_template(template).map_err(|message| {
			Error::InvalidTemplate { regex: query_cfg.query_regex.clone(), message }
		})?;
	}

	Ok(())
}
