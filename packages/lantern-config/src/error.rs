pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: std::path::PathBuf, source: toml::de::Error },
	#[error("Failed to read custom search configuration at {path:?}.")]
	ReadCustomConfig { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse custom search configuration at {path:?}: {source}")]
	ParseCustomConfig { path: std::path::PathBuf, source: serde_yaml::Error },
	#[error("{message}")]
	Validation { message: String },
}
