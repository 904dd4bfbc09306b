//! Package index trait for listing packages and their releases

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;

/// Trait for querying a Python package index
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageIndex: Send + Sync {
    /// Lists the names of every package the index knows about
    ///
    /// Names keep the capitalisation the index reports.
    async fn list_packages(&self) -> Result<Vec<String>, RegistryError>;

    /// Lists the release versions published for a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "requests")
    /// * `show_hidden` - Include releases whose files have all been yanked
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Release versions in no particular order
    /// * `Err(RegistryError)` - If the fetch fails
    async fn package_releases(
        &self,
        package_name: &str,
        show_hidden: bool,
    ) -> Result<Vec<String>, RegistryError>;
}
