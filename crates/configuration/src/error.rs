use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid study configuration: {0}")]
    ValidationError(String),
}
