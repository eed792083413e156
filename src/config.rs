use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{
    AuthType, OverrideRule, RegistryCatalog, RegistryConfig, RegistrySource, builtin_registries,
};
use crate::error::ConfigError;
use crate::lifecycle::DEFAULT_CONCURRENCY;
use crate::version::registries::docker::{DEFAULT_MAX_PAGES, DEFAULT_REQUEST_TIMEOUT};

/// Configuration file contents
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub image_registries: Vec<RegistryConfig>,
    pub override_images: Vec<OverrideImages>,
    pub override_registries: Vec<OverrideRegistries>,
    /// Repository renames applied before listing tags
    pub override_image_names: HashMap<String, String>,
    /// Image references to check
    pub images: Vec<String>,
    /// Maximum number of images checked at once
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub max_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_registries: Vec::new(),
            override_images: Vec::new(),
            override_registries: Vec::new(),
            override_image_names: HashMap::new(),
            images: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Sends images whose repository path matches one of `images` to another registry
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverrideImages {
    pub images: Vec<String>,
    #[serde(default)]
    pub registry_name: Option<String>,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
    #[serde(default)]
    pub allow_all_releases: bool,
}

/// Sends images hosted on one of `urls` to another registry
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRegistries {
    pub urls: Vec<String>,
    #[serde(default)]
    pub registry_name: Option<String>,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
    #[serde(default)]
    pub allow_all_releases: bool,
}

impl Config {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Configured registries followed by the built-in ones they do not replace
    pub fn registries(&self) -> Vec<RegistryConfig> {
        let mut registries = self.image_registries.clone();
        for builtin in builtin_registries() {
            if !registries.iter().any(|r| r.name == builtin.name) {
                registries.push(builtin);
            }
        }
        registries
    }

    /// Override rules in declaration order, image rules first
    pub fn override_rules(&self) -> Result<Vec<OverrideRule>, ConfigError> {
        let mut rules = Vec::new();

        for entry in &self.override_images {
            if entry.images.is_empty() {
                return Err(ConfigError::InvalidOverride(
                    "overrideImages entry without images".to_string(),
                ));
            }
            let source = registry_source(&entry.registry_name, &entry.registry)?;
            for pattern in &entry.images {
                let mut rule = OverrideRule::image(pattern, source.clone());
                rule.allow_all_releases = entry.allow_all_releases;
                rules.push(rule);
            }
        }

        for entry in &self.override_registries {
            if entry.urls.is_empty() {
                return Err(ConfigError::InvalidOverride(
                    "overrideRegistries entry without urls".to_string(),
                ));
            }
            let source = registry_source(&entry.registry_name, &entry.registry)?;
            for url in &entry.urls {
                let mut rule = OverrideRule::url(url, source.clone());
                rule.allow_all_releases = entry.allow_all_releases;
                rules.push(rule);
            }
        }

        Ok(rules)
    }

    /// Check settings that the catalog does not validate itself
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "requestTimeoutSecs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "maxPages",
                reason: "must be at least 1".to_string(),
            });
        }

        let inline = self
            .override_images
            .iter()
            .filter_map(|o| o.registry.as_ref())
            .chain(self.override_registries.iter().filter_map(|o| o.registry.as_ref()));
        for registry in self.image_registries.iter().chain(inline) {
            validate_auth(registry)?;
        }

        Ok(())
    }

    /// Validate the configuration and build the registry catalog from it
    pub fn catalog(&self) -> Result<RegistryCatalog, ConfigError> {
        self.validate()?;
        RegistryCatalog::new(
            self.registries(),
            self.override_rules()?,
            self.override_image_names.clone(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn registry_source(
    name: &Option<String>,
    registry: &Option<RegistryConfig>,
) -> Result<RegistrySource, ConfigError> {
    match (name, registry) {
        (Some(name), None) => Ok(RegistrySource::Named(name.clone())),
        (None, Some(registry)) => Ok(RegistrySource::Inline(registry.clone())),
        (Some(name), Some(_)) => Err(ConfigError::InvalidOverride(format!(
            "both registryName {} and an inline registry given",
            name
        ))),
        (None, None) => Err(ConfigError::InvalidOverride(
            "neither registryName nor registry given".to_string(),
        )),
    }
}

fn validate_auth(registry: &RegistryConfig) -> Result<(), ConfigError> {
    let has_username = registry.username.as_deref().is_some_and(|u| !u.is_empty());
    if registry.auth_type == AuthType::Basic && !has_username {
        return Err(ConfigError::InvalidAuth {
            registry: registry.name.clone(),
            reason: "basic auth requires a username".to_string(),
        });
    }
    Ok(())
}

/// Returns the default configuration file path.
/// Uses $XDG_CONFIG_HOME/image-lcm/config.yaml if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/image-lcm/config.yaml,
/// or ./config.yaml if neither is available.
pub fn default_config_path() -> PathBuf {
    config_path_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

fn config_path_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .map(|dir| dir.join("image-lcm").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}
