//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE: &str = "strata.toml";

/// Loads and validates `strata.toml` from a project directory.
///
/// A missing file yields the default configuration; any other I/O error is
/// reported.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    match std::fs::read_to_string(&config_path) {
        Ok(content) => load_config_from_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProjectConfig::default()),
        Err(e) => Err(e.into()),
    }
}

/// Parses and validates a `strata.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are consistent with each other.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.compiler.unsafe_string && config.compiler.force_safe_string {
        return Err(ConfigError::ValidationError(
            "compiler.unsafe_string cannot be combined with compiler.force_safe_string"
                .to_string(),
        ));
    }
    if config.paths.include.iter().any(|dir| dir.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "paths.include contains an empty directory".to_string(),
        ));
    }
    Ok(())
}
