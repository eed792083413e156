//! Registry catalog: which registry, credentials and release policy govern an image
//!
//! Resolution is a pure lookup with a fixed precedence, first match wins:
//!
//! 1. image-name override rules, in declaration order (unanchored regex on the repository path)
//! 2. registry-URL override rules, in declaration order (exact URL; Docker Hub aliases and the
//!    empty URL count as one)
//! 3. the registry flagged `default`
//! 4. a configured registry whose URL equals the image's registry URL
//! 5. the public registry, when the image has no registry URL
//! 6. an anonymous registry synthesized from the image's registry URL

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::image::is_docker_hub_domain;
use crate::version::registries::auth::BasicCredentials;

/// Name of the public registry used for bare image names
pub const DOCKER_HUB: &str = "DockerHub";

/// How a registry authenticates tag listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    None,
    Basic,
    #[serde(alias = "bearer", alias = "bearer-token")]
    Token,
    Ecr,
}

/// Identity and access policy for one registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// AWS region for `ecr` registries
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "default")]
    pub is_default: bool,
    /// Let pre-release and build-suffixed tags compete for "latest"
    #[serde(default)]
    pub allow_all_releases: bool,
}

impl RegistryConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            auth_type: AuthType::None,
            username: None,
            password: None,
            region: None,
            is_default: false,
            allow_all_releases: false,
        }
    }

    pub fn with_auth(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_all_releases(mut self) -> Self {
        self.allow_all_releases = true;
        self
    }

    /// Basic credentials when a username or password is configured
    pub fn credentials(&self) -> Option<BasicCredentials> {
        let username = self.username.as_deref().unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            return None;
        }
        Some(BasicCredentials::new(username, password))
    }

    /// Docker Hub, reached through its token service
    pub fn docker_hub() -> Self {
        Self::new(DOCKER_HUB, "registry.hub.docker.com").with_auth(AuthType::Token)
    }

    /// Anonymous registry for a URL nothing in the configuration knows about
    pub fn anonymous(url: &str) -> Self {
        Self::new(url, url)
    }
}

/// Well-known registries available without configuration
pub fn builtin_registries() -> Vec<RegistryConfig> {
    vec![
        RegistryConfig::docker_hub(),
        RegistryConfig::new("Quay", "quay.io"),
        RegistryConfig::new("Gcr", "gcr.io"),
        RegistryConfig::new("GcrK8s", "k8s.gcr.io"),
        RegistryConfig::new("Zalando", "registry.opensource.zalan.do"),
        RegistryConfig::new("Gitlab", "registry.gitlab.com"),
    ]
}

/// Where an override sends matching images
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrySource {
    /// A registry from the catalog, by name
    Named(String),
    /// A registry defined inside the rule
    Inline(RegistryConfig),
}

/// What an override matches on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideMatch {
    /// Unanchored regular expression tested against the repository path
    ImageName(String),
    /// Registry URL, matched exactly apart from Docker Hub aliases
    RegistryUrl(String),
}

/// Redirects matching images to another registry and release policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRule {
    pub matcher: OverrideMatch,
    pub registry: RegistrySource,
    pub allow_all_releases: bool,
}

impl OverrideRule {
    pub fn image(pattern: &str, registry: RegistrySource) -> Self {
        Self {
            matcher: OverrideMatch::ImageName(pattern.to_string()),
            registry,
            allow_all_releases: false,
        }
    }

    pub fn url(url: &str, registry: RegistrySource) -> Self {
        Self {
            matcher: OverrideMatch::RegistryUrl(url.to_string()),
            registry,
            allow_all_releases: false,
        }
    }

    pub fn with_all_releases(mut self) -> Self {
        self.allow_all_releases = true;
        self
    }
}

/// Which precedence step produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    ImageOverride,
    UrlOverride,
    Default,
    UrlMatch,
    PublicRegistry,
    Synthesized,
}

/// The registry and release policy that govern one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub registry: Arc<RegistryConfig>,
    pub allow_all_releases: bool,
    pub resolved_by: ResolvedBy,
}

#[derive(Debug)]
struct ImageRule {
    pattern: Regex,
    registry: Arc<RegistryConfig>,
    allow_all_releases: bool,
}

#[derive(Debug)]
struct UrlRule {
    url: String,
    registry: Arc<RegistryConfig>,
    allow_all_releases: bool,
}

/// All configured registries plus override rules; read-only once built
#[derive(Debug)]
pub struct RegistryCatalog {
    registries: Vec<Arc<RegistryConfig>>,
    image_rules: Vec<ImageRule>,
    url_rules: Vec<UrlRule>,
    default_registry: Option<Arc<RegistryConfig>>,
    public_registry: Arc<RegistryConfig>,
    repository_renames: HashMap<String, String>,
}

impl RegistryCatalog {
    /// Build and validate a catalog.
    ///
    /// Fails on duplicate registry names, more than one default registry, invalid image
    /// patterns, and rules that name a registry the catalog does not contain. A registry
    /// named [`DOCKER_HUB`] replaces the built-in public registry.
    pub fn new(
        registries: Vec<RegistryConfig>,
        rules: Vec<OverrideRule>,
        repository_renames: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        for registry in &registries {
            if !names.insert(registry.name.as_str()) {
                return Err(ConfigError::DuplicateRegistry(registry.name.clone()));
            }
        }

        let registries: Vec<Arc<RegistryConfig>> = registries.into_iter().map(Arc::new).collect();

        let defaults: Vec<&Arc<RegistryConfig>> =
            registries.iter().filter(|r| r.is_default).collect();
        if defaults.len() > 1 {
            return Err(ConfigError::AmbiguousDefault(
                defaults.iter().map(|r| r.name.clone()).collect(),
            ));
        }
        let default_registry = defaults.first().map(|r| Arc::clone(r));

        let public_registry = registries
            .iter()
            .find(|r| r.name == DOCKER_HUB)
            .cloned()
            .unwrap_or_else(|| Arc::new(RegistryConfig::docker_hub()));

        let lookup = |source: RegistrySource| -> Result<Arc<RegistryConfig>, ConfigError> {
            match source {
                RegistrySource::Named(name) => registries
                    .iter()
                    .chain(std::iter::once(&public_registry))
                    .find(|r| r.name == name)
                    .cloned()
                    .ok_or(ConfigError::UnknownRegistry(name)),
                RegistrySource::Inline(registry) => Ok(Arc::new(registry)),
            }
        };

        let mut image_rules = Vec::new();
        let mut url_rules = Vec::new();
        for rule in rules {
            let registry = lookup(rule.registry)?;
            match rule.matcher {
                OverrideMatch::ImageName(pattern) => {
                    let compiled = Regex::new(&pattern)
                        .map_err(|source| ConfigError::InvalidPattern { pattern, source })?;
                    image_rules.push(ImageRule {
                        pattern: compiled,
                        registry,
                        allow_all_releases: rule.allow_all_releases,
                    });
                }
                OverrideMatch::RegistryUrl(url) => url_rules.push(UrlRule {
                    url,
                    registry,
                    allow_all_releases: rule.allow_all_releases,
                }),
            }
        }

        Ok(Self {
            registries,
            image_rules,
            url_rules,
            default_registry,
            public_registry,
            repository_renames,
        })
    }

    /// The registry used for images without a registry URL
    pub fn public_registry(&self) -> &Arc<RegistryConfig> {
        &self.public_registry
    }

    /// Find a registry by name
    pub fn registry(&self, name: &str) -> Option<&Arc<RegistryConfig>> {
        self.registries
            .iter()
            .chain(std::iter::once(&self.public_registry))
            .find(|r| r.name == name)
    }

    /// Resolve the registry and release policy for an image; never fails
    pub fn resolve(&self, image_name: &str, registry_url: &str) -> Resolution {
        let resolution = self
            .resolve_override(image_name, registry_url)
            .unwrap_or_else(|| {
                let public_hint = is_docker_hub_domain(registry_url);
                self.resolve_configured(if public_hint { "" } else { registry_url })
            });

        debug!(
            "Resolved {} (registry url {:?}) to registry {} via {:?}",
            image_name, registry_url, resolution.registry.name, resolution.resolved_by
        );
        resolution
    }

    fn resolve_override(&self, image_name: &str, registry_url: &str) -> Option<Resolution> {
        if let Some(rule) = self
            .image_rules
            .iter()
            .find(|rule| rule.pattern.is_match(image_name))
        {
            return Some(Resolution {
                registry: Arc::clone(&rule.registry),
                allow_all_releases: rule.allow_all_releases,
                resolved_by: ResolvedBy::ImageOverride,
            });
        }

        self.url_rules
            .iter()
            .find(|rule| same_registry_url(&rule.url, registry_url))
            .map(|rule| Resolution {
                registry: Arc::clone(&rule.registry),
                allow_all_releases: rule.allow_all_releases,
                resolved_by: ResolvedBy::UrlOverride,
            })
    }

    fn resolve_configured(&self, registry_url: &str) -> Resolution {
        let (registry, resolved_by) = if let Some(default) = &self.default_registry {
            (Arc::clone(default), ResolvedBy::Default)
        } else if let Some(matched) = self
            .registries
            .iter()
            .chain(std::iter::once(&self.public_registry))
            .find(|r| !registry_url.is_empty() && r.url == registry_url)
        {
            (Arc::clone(matched), ResolvedBy::UrlMatch)
        } else if registry_url.is_empty() {
            (Arc::clone(&self.public_registry), ResolvedBy::PublicRegistry)
        } else {
            (
                Arc::new(RegistryConfig::anonymous(registry_url)),
                ResolvedBy::Synthesized,
            )
        };

        Resolution {
            allow_all_releases: registry.allow_all_releases,
            registry,
            resolved_by,
        }
    }

    /// Repository path to query for an image under a resolution.
    ///
    /// Applies the configured rename map, then prefixes single-component names with
    /// `library/` on the public registry.
    pub fn repository_for(&self, resolution: &Resolution, repository_path: &str) -> String {
        let repository = self
            .repository_renames
            .get(repository_path)
            .map(String::as_str)
            .unwrap_or(repository_path);

        if resolution.registry.name == self.public_registry.name && !repository.contains('/') {
            format!("library/{}", repository)
        } else {
            repository.to_string()
        }
    }
}

/// Exact URL equality, except that every Docker Hub alias and the empty URL are one registry
fn same_registry_url(rule_url: &str, registry_url: &str) -> bool {
    rule_url == registry_url || (is_docker_hub_domain(rule_url) && is_docker_hub_domain(registry_url))
}
