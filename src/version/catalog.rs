//! Cached package index lookups
//!
//! The package list is large and slow to fetch, so a miss never blocks the
//! caller: an empty placeholder is cached with a short TTL and the real list
//! is fetched in the background. Release lists are small and fetched inline.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info};

use crate::config::CacheConfig;
use crate::version::cache::TtlCache;
use crate::version::ordering::sort_releases;
use crate::version::registry::PackageIndex;

/// Lowercase package name to the name as the index spells it
pub type PackageNames = HashMap<String, String>;

const PACKAGES_KEY: &str = "--packages--";

fn releases_key(package_name: &str, show_hidden: bool) -> String {
    format!("{package_name}-{show_hidden}")
}

pub struct Catalog {
    index: RwLock<Arc<dyn PackageIndex>>,
    ttls: RwLock<CacheConfig>,
    packages: TtlCache<Arc<PackageNames>>,
    releases: TtlCache<Arc<Vec<String>>>,
    /// Bumped on every invalidation; results of fetches started earlier are not cached
    generation: RwLock<u64>,
}

impl Catalog {
    pub fn new(index: Arc<dyn PackageIndex>, ttls: CacheConfig) -> Self {
        Self {
            index: RwLock::new(index),
            ttls: RwLock::new(ttls),
            packages: TtlCache::new(),
            releases: TtlCache::new(),
            generation: RwLock::new(0),
        }
    }

    fn index(&self) -> Arc<dyn PackageIndex> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ttls(&self) -> CacheConfig {
        self.ttls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn generation(&self) -> u64 {
        *self.generation.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `store` unless the caches were invalidated since `generation` was read
    fn store_if_current(&self, generation: u64, store: impl FnOnce()) -> bool {
        let current = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        if *current != generation {
            debug!("Discarding result fetched before the cache was cleared");
            return false;
        }
        store();
        true
    }

    /// Swap the index client and drop everything fetched from the old one
    pub fn set_index(&self, index: Arc<dyn PackageIndex>) {
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
        self.clear();
    }

    pub fn set_ttls(&self, ttls: CacheConfig) {
        *self.ttls.write().unwrap_or_else(PoisonError::into_inner) = ttls;
    }

    /// Forget every cached package list and release list
    ///
    /// Fetches still in flight finish, but their results are not cached.
    pub fn clear(&self) {
        let mut generation = self.generation.write().unwrap_or_else(PoisonError::into_inner);
        *generation = generation.wrapping_add(1);
        self.packages.clear();
        self.releases.clear();
    }

    /// Known packages, or an empty map while the list is being fetched
    ///
    /// A miss caches an empty placeholder so that concurrent callers do not
    /// start further fetches until it expires.
    pub fn list_packages(self: &Arc<Self>) -> Arc<PackageNames> {
        if let Some(cached) = self.packages.get(PACKAGES_KEY) {
            return cached;
        }

        let placeholder_ttl = self.ttls().placeholder_ttl();
        self.packages
            .set(PACKAGES_KEY, Arc::new(PackageNames::new()), placeholder_ttl);

        let catalog = Arc::clone(self);
        tokio::spawn(async move {
            catalog.refresh_packages().await;
        });

        Arc::new(PackageNames::new())
    }

    /// Fetch the package list and cache it
    ///
    /// Returns the number of packages fetched, or `None` if the fetch failed
    /// or the cache was cleared while it ran.
    pub async fn refresh_packages(&self) -> Option<usize> {
        info!("requirements.txt: listing packages...");

        let generation = self.generation();
        let names = self
            .index()
            .list_packages()
            .await
            .inspect_err(|e| error!("Failed to list packages: {}", e))
            .ok()?;

        let packages: PackageNames = names
            .into_iter()
            .map(|name| (name.to_lowercase(), name))
            .collect();
        let count = packages.len();
        info!("requirements.txt: got {}", count);

        let ttl = self.ttls().packages_ttl();
        self.store_if_current(generation, || {
            self.packages.set(PACKAGES_KEY, Arc::new(packages), ttl);
        })
        .then_some(count)
    }

    /// Releases of `package_name`, sorted oldest to newest
    ///
    /// Fetch failures are logged and yield an empty list.
    pub async fn releases(&self, package_name: &str, show_hidden: bool) -> Arc<Vec<String>> {
        let key = releases_key(package_name, show_hidden);
        if let Some(cached) = self.releases.get(&key).filter(|r| !r.is_empty()) {
            return cached;
        }

        let generation = self.generation();
        let Ok(mut releases) = self
            .index()
            .package_releases(package_name, show_hidden)
            .await
            .inspect_err(|e| error!("Failed to fetch releases for {}: {}", package_name, e))
        else {
            return Arc::new(Vec::new());
        };

        sort_releases(&mut releases);
        let releases = Arc::new(releases);

        let ttl = self.ttls().releases_ttl();
        self.store_if_current(generation, || {
            self.releases.set(key, Arc::clone(&releases), ttl);
        });
        releases
    }

    /// Latest non-hidden release of `package_name`
    pub async fn latest_release(&self, package_name: &str) -> Option<String> {
        self.releases(package_name, false).await.last().cloned()
    }
}
