pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid urn '{value}'.")]
	InvalidUrn { value: String },
	#[error("Failed to resolve groups for {actor}: {source}")]
	GroupResolution { actor: String, source: LookupError },
}

/// Failure reported by an [`crate::EntityLookup`] backend.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct LookupError {
	pub message: String,
}
impl LookupError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}
