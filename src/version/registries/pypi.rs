//! PyPI Simple API client for listing Python packages and their releases

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{DEFAULT_INDEX_URL, FETCH_TIMEOUT_MS};
use crate::version::error::RegistryError;
use crate::version::registry::PackageIndex;

/// PEP 691 JSON flavour of the Simple API
const SIMPLE_JSON_ACCEPT: &str = "application/vnd.pypi.simple.v1+json";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"));

/// Normalise a project name the way PEP 503 index URLs expect
pub fn normalize_project_name(name: &str) -> String {
    NAME_SEPARATORS.replace_all(name, "-").to_lowercase()
}

/// PyPI-compatible package index client
pub struct PypiIndex {
    client: Client,
    index_url: String,
}

impl Default for PypiIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL.to_string())
    }
}

impl PypiIndex {
    pub fn new(index_url: String) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            index_url: index_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        package_name: &str,
    ) -> Result<T, RegistryError> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, SIMPLE_JSON_ACCEPT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(RegistryError::NotFound(package_name.to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                return Err(RegistryError::RateLimited { retry_after_secs });
            }
            status if !status.is_success() => {
                return Err(RegistryError::InvalidResponse(format!(
                    "Package index returned status {status}"
                )));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
    }
}

/// Root Simple API page
#[derive(Debug, Deserialize)]
struct ProjectList {
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    name: String,
}

/// Project Simple API page
#[derive(Debug, Deserialize)]
struct ProjectDetail {
    /// All versions of the project (PEP 700); older indexes omit it
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    files: Vec<ProjectFile>,
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    filename: String,
    #[serde(default)]
    yanked: Yanked,
}

/// `yanked` is either a flag or the reason the file was yanked
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Yanked {
    Flag(bool),
    Reason(String),
}

impl Default for Yanked {
    fn default() -> Self {
        Yanked::Flag(false)
    }
}

impl Yanked {
    fn is_yanked(&self) -> bool {
        match self {
            Yanked::Flag(flag) => *flag,
            Yanked::Reason(_) => true,
        }
    }
}

const SDIST_EXTENSIONS: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".tgz", ".tar", ".zip"];

/// Version a distribution file belongs to, recovered from its file name
fn file_version(filename: &str) -> Option<&str> {
    if let Some(stem) = filename
        .strip_suffix(".whl")
        .or_else(|| filename.strip_suffix(".egg"))
    {
        // {name}-{version}(-{build})?-{python}-{abi}-{platform}.whl
        return stem.split('-').nth(1);
    }

    let stem = SDIST_EXTENSIONS
        .iter()
        .find_map(|ext| filename.strip_suffix(ext))?;
    stem.rsplit_once('-').map(|(_, version)| version)
}

impl ProjectDetail {
    /// Versions whose files have all been yanked
    fn hidden_versions(&self) -> HashSet<&str> {
        let mut all_yanked: HashMap<&str, bool> = HashMap::new();
        for file in &self.files {
            let Some(version) = file_version(&file.filename) else {
                continue;
            };
            let entry = all_yanked.entry(version).or_insert(true);
            *entry &= file.yanked.is_yanked();
        }

        all_yanked
            .into_iter()
            .filter_map(|(version, yanked)| yanked.then_some(version))
            .collect()
    }

    fn releases(&self, show_hidden: bool) -> Vec<String> {
        let mut seen = HashSet::new();
        let versions: Vec<&str> = if self.versions.is_empty() {
            self.files
                .iter()
                .filter_map(|f| file_version(&f.filename))
                .filter(|v| seen.insert(*v))
                .collect()
        } else {
            self.versions.iter().map(String::as_str).collect()
        };

        if show_hidden {
            return versions.into_iter().map(String::from).collect();
        }

        let hidden = self.hidden_versions();
        versions
            .into_iter()
            .filter(|v| !hidden.contains(v))
            .map(String::from)
            .collect()
    }
}

#[async_trait]
impl PackageIndex for PypiIndex {
    async fn list_packages(&self) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/", self.index_url);
        let list: ProjectList = self.get_json(&url, "").await?;

        debug!("Index lists {} packages", list.projects.len());

        Ok(list.projects.into_iter().map(|p| p.name).collect())
    }

    async fn package_releases(
        &self,
        package_name: &str,
        show_hidden: bool,
    ) -> Result<Vec<String>, RegistryError> {
        let url = format!(
            "{}/{}/",
            self.index_url,
            normalize_project_name(package_name)
        );
        let detail: ProjectDetail = self.get_json(&url, package_name).await?;
        let releases = detail.releases(show_hidden);

        debug!(
            "Found {} releases for package {}",
            releases.len(),
            package_name
        );

        Ok(releases)
    }
}
