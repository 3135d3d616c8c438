use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use dokkan_archive::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Budget: {}", config.crawler.max_new_items);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded with each run so a changed configuration is visible in the
/// run history.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Folds command-line overrides into a configuration file hash
///
/// Each override is a `key=value` pair. With no overrides the file hash is
/// returned unchanged, so runs that use the file as-is keep comparable hashes.
///
/// # Arguments
///
/// * `file_hash` - Hash of the configuration file content
/// * `overrides` - Overrides applied on top of the file, in a fixed order
pub fn hash_with_overrides(file_hash: &str, overrides: &[String]) -> String {
    if overrides.is_empty() {
        return file_hash.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(file_hash.as_bytes());
    for entry in overrides {
        hasher.update(b"\n");
        hasher.update(entry.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
