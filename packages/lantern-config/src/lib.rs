mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, CustomSearchConfiguration, ExactMatch, Partial, QueryConfiguration, Search,
	SearchCustom, Service,
};

use std::{
	fs,
	path::{Path, PathBuf},
};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg, path.parent());

	validate(&cfg)?;

	Ok(cfg)
}

/// Materializes the custom query configuration referenced by `search.custom`.
///
/// Returns `None` when the custom configuration is disabled. A missing or malformed file is
/// fatal so a broken override never silently falls back to default scoring.
pub fn load_custom(custom: &SearchCustom) -> Result<Option<CustomSearchConfiguration>> {
	if !custom.enabled {
		tracing::info!("Custom search configuration disabled.");

		return Ok(None);
	}

	let Some(path) = custom.file.as_ref() else {
		return Err(Error::Validation {
			message: "search.custom.file must be set when search.custom.enabled is true."
				.to_string(),
		});
	};

	tracing::info!(path = %path.display(), "Custom search configuration enabled.");

	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadCustomConfig { path: path.clone(), source: err })?;
	let custom_cfg: CustomSearchConfiguration = serde_yaml::from_str(&raw)
		.map_err(|err| Error::ParseCustomConfig { path: path.clone(), source: err })?;

	validate_custom(&custom_cfg)?;

	Ok(Some(custom_cfg))
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("search.urn_boost", cfg.search.urn_boost),
		("search.exact_match.exact_factor", cfg.search.exact_match.exact_factor),
		("search.exact_match.prefix_factor", cfg.search.exact_match.prefix_factor),
		(
			"search.exact_match.case_sensitivity_factor",
			cfg.search.exact_match.case_sensitivity_factor,
		),
		("search.partial.urn_factor", cfg.search.partial.urn_factor),
		("search.partial.factor", cfg.search.partial.factor),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if cfg.search.custom.enabled && cfg.search.custom.file.is_none() {
		return Err(Error::Validation {
			message: "search.custom.file must be set when search.custom.enabled is true."
				.to_string(),
		});
	}

	Ok(())
}

pub fn validate_custom(custom_cfg: &CustomSearchConfiguration) -> Result<()> {
	for (idx, query_cfg) in custom_cfg.query_configurations.iter().enumerate() {
		if query_cfg.query_regex.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("queryConfigurations[{idx}].queryRegex must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config, base_dir: Option<&Path>) {
	if cfg.search.custom.file.as_deref().map(|file| file.as_os_str().is_empty()).unwrap_or(false) {
		cfg.search.custom.file = None;
	}
	if let Some(file) = cfg.search.custom.file.as_ref()
		&& file.is_relative()
		&& let Some(base_dir) = base_dir
	{
		let resolved: PathBuf = base_dir.join(file);

		cfg.search.custom.file = Some(resolved);
	}
}
