//! Container configuration
//!
//! Loaded from a TOML document with a `[container]` and a `[logging]` table,
//! then optionally overridden from the environment.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ContainerError, ContainerResult};
use crate::logging::LoggingConfig;

pub const ENV_EAGER_INIT: &str = "BEANSTALK_EAGER_INIT";
pub const ENV_LOG_BEAN_NAMES: &str = "BEANSTALK_LOG_BEAN_NAMES";

/// The `[container]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerSettings {
    /// Build every non-lazy singleton at build time instead of on first use
    pub eager_init: bool,

    /// Log every bean name at `info` on build
    pub log_bean_names: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            eager_init: false,
            log_bean_names: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    pub container: ContainerSettings,
    pub logging: LoggingConfig,
}

impl ContainerConfig {
    pub fn from_toml_str(content: &str) -> ContainerResult<Self> {
        toml::from_str(content)
            .map_err(|e| ContainerError::Config(format!("failed to parse configuration: {}", e)))
    }

    /// Reads and parses a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ContainerError::Config(format!("failed to read config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Self::from_toml_str(&content)
    }

    /// Loads `path` if it exists, otherwise starts from the defaults
    pub fn from_optional_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies environment overrides:
    /// `BEANSTALK_EAGER_INIT`, `BEANSTALK_LOG_BEAN_NAMES`, plus the logging
    /// variables handled by [`LoggingConfig::with_env_overrides`].
    pub fn with_env_overrides(self) -> ContainerResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ContainerResult<Self> {
        if let Some(value) = lookup(ENV_EAGER_INIT) {
            self.container.eager_init = parse_bool(ENV_EAGER_INIT, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG_BEAN_NAMES) {
            self.container.log_bean_names = parse_bool(ENV_LOG_BEAN_NAMES, &value)?;
        }
        self.logging = self.logging.with_overrides(&lookup)?;
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> ContainerResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ContainerError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}
