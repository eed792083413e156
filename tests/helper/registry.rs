//! Registry test utilities

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use image_lcm::catalog::{RegistryCatalog, RegistryConfig};
use image_lcm::image::ImageReference;
use image_lcm::version::error::RegistryError;
use image_lcm::version::registry::TagLister;

/// Mock tag lister with optional random latency
#[derive(Default)]
pub struct MockTagLister {
    tags: HashMap<String, Vec<String>>,
    failures: HashSet<String>,
    max_delay_ms: u64,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTagLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, tags: Vec<&str>) -> Self {
        self.tags.insert(
            repository.to_string(),
            tags.into_iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Make listings of `repository` fail
    pub fn with_failure(mut self, repository: &str) -> Self {
        self.failures.insert(repository.to_string());
        self
    }

    /// Delay every listing by a random duration up to `max_delay_ms`
    pub fn with_random_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// (registry name, repository) of every listing, in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TagLister for MockTagLister {
    async fn list_tags(
        &self,
        registry: &RegistryConfig,
        repository: &str,
    ) -> Result<Vec<String>, RegistryError> {
        self.calls
            .lock()
            .unwrap()
            .push((registry.name.clone(), repository.to_string()));

        if self.max_delay_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..=self.max_delay_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failures.contains(repository) {
            return Err(RegistryError::UnexpectedStatus {
                status: 503,
                url: format!("https://{}/v2/{}/tags/list", registry.url, repository),
            });
        }

        Ok(self.tags.get(repository).cloned().unwrap_or_default())
    }
}

/// Catalog with only the built-in registries
pub fn create_test_catalog() -> Arc<RegistryCatalog> {
    Arc::new(RegistryCatalog::new(vec![], vec![], HashMap::new()).unwrap())
}

/// Parse image references, panicking on invalid ones
pub fn images(references: &[&str]) -> Vec<ImageReference> {
    references
        .iter()
        .map(|r| ImageReference::parse(r).unwrap())
        .collect()
}
