//! CLI configuration utilities

use anyhow::{Context, Result};
use portal_access_core::ConsoleConfig;
use std::path::{Path, PathBuf};

/// Default configuration file location (`<config dir>/portal-access/config.json`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("portal-access")
        .join("config.json")
}

/// Load the console configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present, otherwise defaults plus environment variables.
pub fn load_config(path: Option<&Path>) -> Result<ConsoleConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(default_config_path()).filter(|p| p.exists()),
    };

    match &path {
        Some(path) => tracing::debug!(path = %path.display(), "Loading configuration file"),
        None => tracing::debug!("No configuration file, using defaults and environment"),
    }

    ConsoleConfig::load(path.as_deref()).context("Failed to load configuration")
}

/// Save configuration to a JSON file
pub fn save_config<P: AsRef<Path>>(config: &ConsoleConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_config(&ConsoleConfig::default(), path)
}

/// Configuration as JSON with the API key masked
pub fn redacted_json(config: &ConsoleConfig) -> Result<String> {
    let mut config = config.clone();
    if config.directory.api_key.is_some() {
        config.directory.api_key = Some("********".to_string());
    }
    Ok(serde_json::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        generate_default_config(&path).unwrap();
        let loaded = load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded, ConsoleConfig::default());
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("missing.json").as_path())).is_err());
    }

    #[test]
    fn test_redacted_json_masks_api_key() {
        let mut config = ConsoleConfig::default();
        config.directory.api_key = Some("super-secret".to_string());

        let json = redacted_json(&config).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains("********"));
    }
}
