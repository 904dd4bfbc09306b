//! Package index test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use requirements_lsp::config::CacheConfig;
use requirements_lsp::version::catalog::Catalog;
use requirements_lsp::version::error::RegistryError;
use requirements_lsp::version::registry::PackageIndex;

/// In-memory package index
#[derive(Default)]
pub struct MockIndex {
    releases: HashMap<String, Vec<String>>,
    hidden: HashMap<String, Vec<String>>,
    release_calls: AtomicUsize,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package with visible releases, in any order
    pub fn with_releases(mut self, package: &str, versions: Vec<&str>) -> Self {
        self.releases.insert(
            package.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Add releases only returned when hidden releases are requested
    #[allow(dead_code)]
    pub fn with_hidden(mut self, package: &str, versions: Vec<&str>) -> Self {
        self.hidden.insert(
            package.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Number of release lookups served so far
    #[allow(dead_code)]
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageIndex for MockIndex {
    async fn list_packages(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.releases.keys().cloned().collect())
    }

    async fn package_releases(
        &self,
        package_name: &str,
        show_hidden: bool,
    ) -> Result<Vec<String>, RegistryError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);

        let mut versions = self
            .releases
            .get(package_name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))?;
        if show_hidden && let Some(hidden) = self.hidden.get(package_name) {
            versions.extend(hidden.iter().cloned());
        }
        Ok(versions)
    }
}

/// Create a catalog over `index` with the package list already fetched
pub async fn create_test_catalog(index: Arc<MockIndex>) -> Arc<Catalog> {
    let catalog = Arc::new(Catalog::new(index, CacheConfig::default()));
    catalog.refresh_packages().await;
    catalog
}
