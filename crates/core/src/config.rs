//! Configuration for the access console

use crate::access::FormOptions;
use crate::catalog::KnownRoles;
use crate::codec::{DEFAULT_SEPARATOR, GroupNameCodec};
use crate::error::Result;
use crate::validation::{ValidateConfig, validators};
use config::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "PORTAL_ACCESS";

const MAX_TIMEOUT_SECS: u64 = 600;

/// Main console configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Directory service connection
    pub directory: DirectoryConfig,

    /// Role and grant vocabulary
    pub access: AccessConfig,
}

/// Directory service connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the portal API
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Vocabulary used to classify and validate access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Catalog groups that are roles
    pub role_names: Vec<String>,

    /// Datasets a grant may name
    pub dataset_options: Vec<String>,

    /// Countries a grant may name. Empty accepts any country.
    #[serde(default)]
    pub country_options: Vec<String>,

    /// Separator between country and dataset in grant group names
    pub separator: char,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            role_names: ["Admin", "Developer", "Regular", "Super"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            dataset_options: ["School Coverage", "School Geolocation", "School QoS"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            country_options: Vec::new(),
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl DirectoryConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AccessConfig {
    #[must_use]
    pub const fn codec(&self) -> GroupNameCodec {
        GroupNameCodec::new(self.separator)
    }

    #[must_use]
    pub fn role_classifier(&self) -> KnownRoles {
        KnownRoles::new(self.role_names.iter().cloned())
    }

    /// Option lists for form validation. Roles are limited to those the
    /// catalog actually holds.
    #[must_use]
    pub fn form_options(&self, catalog_roles: &BTreeSet<String>) -> FormOptions {
        FormOptions {
            roles: catalog_roles.clone(),
            countries: self.country_options.iter().cloned().collect(),
            datasets: self.dataset_options.iter().cloned().collect(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;

        Self::finish(settings.try_deserialize()?)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self> {
        let settings = Self::defaults()?.add_source(Self::environment()).build()?;

        Self::finish(settings.try_deserialize()?)
    }

    /// Load from `path` when given, otherwise from the environment alone
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("directory.base_url", defaults.directory.base_url)?
            .set_default("directory.timeout_secs", defaults.directory.timeout_secs)?
            .set_default("access.role_names", defaults.access.role_names)?
            .set_default("access.dataset_options", defaults.access.dataset_options)?
            .set_default("access.country_options", defaults.access.country_options)?
            .set_default("access.separator", defaults.access.separator.to_string())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("access.role_names")
            .with_list_parse_key("access.dataset_options")
            .with_list_parse_key("access.country_options")
    }

    fn finish(config: Self) -> Result<Self> {
        config.validate()?;
        Ok(config)
    }
}

impl ValidateConfig for ConsoleConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        validators::validate_url(&self.directory.base_url, "directory.base_url")?;
        validators::validate_range(
            self.directory.timeout_secs,
            1,
            MAX_TIMEOUT_SECS,
            "directory.timeout_secs",
        )?;

        if self.access.role_names.is_empty() {
            return Err(ConfigError::Message(
                "access.role_names: at least one role is required".to_string(),
            ));
        }
        for role in &self.access.role_names {
            validators::validate_not_empty(role, "access.role_names")?;
        }

        let separator = self.access.separator;
        if separator.is_whitespace() {
            return Err(ConfigError::Message(
                "access.separator: cannot be whitespace".to_string(),
            ));
        }
        validators::validate_no_separator(
            &self.access.dataset_options,
            separator,
            "access.dataset_options",
        )?;
        validators::validate_no_separator(
            &self.access.country_options,
            separator,
            "access.country_options",
        )?;
        Ok(())
    }
}
