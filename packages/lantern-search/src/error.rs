pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid custom query regex '{regex}'.")]
	InvalidQueryRegex { regex: String, source: regex::Error },
	#[error("Invalid custom query template for '{regex}': {message}")]
	InvalidTemplate { regex: String, message: String },
	#[error("Unsupported condition {condition} on field '{field}'.")]
	UnsupportedCondition { condition: String, field: String },
}
