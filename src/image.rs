//! Container image references

use serde::Serialize;
use thiserror::Error;

/// Domains that all denote the public Docker Hub registry
pub const DOCKER_HUB_DOMAINS: &[&str] = &["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Tag that never identifies a comparable version
pub const LATEST_TAG: &str = "latest";

/// Returns true when a registry domain refers to the public registry
pub fn is_docker_hub_domain(domain: &str) -> bool {
    domain.is_empty() || DOCKER_HUB_DOMAINS.contains(&domain)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageParseError {
    #[error("Empty image reference")]
    Empty,

    #[error("Empty path component in image reference {0}")]
    EmptyComponent(String),

    #[error("Repository path must be lowercase in image reference {0}")]
    Uppercase(String),

    #[error("Empty tag in image reference {0}")]
    EmptyTag(String),
}

/// A deployed container image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    /// The reference as originally written
    pub full_path: String,
    /// Registry domain, empty for the public registry
    pub registry_url: String,
    pub repository_path: String,
    /// `None` when the tag was `latest` or absent
    pub current_version: Option<String>,
}

impl ImageReference {
    /// Build a reference from already separated parts
    pub fn new(
        registry_url: &str,
        repository_path: &str,
        current_version: Option<&str>,
    ) -> Self {
        let current_version = current_version.filter(|v| *v != LATEST_TAG);
        let mut full_path = if registry_url.is_empty() {
            repository_path.to_string()
        } else {
            format!("{}/{}", registry_url, repository_path)
        };
        if let Some(version) = current_version {
            full_path.push(':');
            full_path.push_str(version);
        }

        Self {
            full_path,
            registry_url: registry_url.to_string(),
            repository_path: repository_path.to_string(),
            current_version: current_version.map(str::to_string),
        }
    }

    /// Parse `[domain[:port]/]path[:tag][@digest]`
    pub fn parse(reference: &str) -> Result<Self, ImageParseError> {
        let full_path = reference.trim();
        if full_path.is_empty() {
            return Err(ImageParseError::Empty);
        }

        let without_digest = full_path
            .split_once('@')
            .map_or(full_path, |(name, _)| name);

        let (domain, remainder) = match without_digest.split_once('/') {
            Some((first, rest)) if is_domain(first) => (first, rest),
            _ => ("", without_digest),
        };

        let last_segment_start = remainder.rfind('/').map_or(0, |i| i + 1);
        let (path, tag) = match remainder[last_segment_start..].rfind(':') {
            Some(i) => {
                let colon = last_segment_start + i;
                (&remainder[..colon], Some(&remainder[colon + 1..]))
            }
            None => (remainder, None),
        };

        if path.split('/').any(str::is_empty) {
            return Err(ImageParseError::EmptyComponent(full_path.to_string()));
        }
        if path.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ImageParseError::Uppercase(full_path.to_string()));
        }
        if tag == Some("") {
            return Err(ImageParseError::EmptyTag(full_path.to_string()));
        }

        let domain = domain.strip_suffix(":443").unwrap_or(domain);
        let registry_url = if is_docker_hub_domain(domain) {
            ""
        } else {
            domain
        };

        let repository_path = if registry_url.is_empty() && !path.contains('/') {
            format!("library/{}", path)
        } else {
            path.to_string()
        };

        Ok(Self {
            full_path: full_path.to_string(),
            registry_url: registry_url.to_string(),
            repository_path,
            current_version: tag.filter(|t| *t != LATEST_TAG).map(str::to_string),
        })
    }

    /// The deployed version for display; `latest` for the sentinel
    pub fn version_label(&self) -> &str {
        self.current_version.as_deref().unwrap_or(LATEST_TAG)
    }
}

fn is_domain(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}
