//! Registry trait for listing image tags

#[cfg(test)]
use mockall::automock;

use crate::catalog::RegistryConfig;
use crate::version::error::RegistryError;

/// Trait for listing the tags of a repository in a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TagLister: Send + Sync {
    /// Fetches every tag of a repository, following pagination
    ///
    /// # Arguments
    /// * `registry` - The resolved registry configuration (URL, credentials, auth type)
    /// * `repository` - The repository path inside the registry (e.g., "library/nginx")
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - All tags, unfiltered, in registry order
    /// * `Err(RegistryError)` - If any request of the listing fails
    async fn list_tags(
        &self,
        registry: &RegistryConfig,
        repository: &str,
    ) -> Result<Vec<String>, RegistryError>;
}
