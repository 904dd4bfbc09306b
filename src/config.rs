use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// =============================================================================
// Time-related constants
// =============================================================================

/// How long a fetched package list stays valid (5 minutes)
pub const DEFAULT_PACKAGES_TTL_MS: u64 = 5 * 60 * 1000;

/// How long the empty placeholder guards an in-flight package list fetch (30 seconds)
pub const DEFAULT_PLACEHOLDER_TTL_MS: u64 = 30_000;

/// How long a fetched release list stays valid (2 minutes)
pub const DEFAULT_RELEASES_TTL_MS: u64 = 2 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Index-related constants
// =============================================================================

/// Index used when nothing else is configured
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/simple";

/// Environment variable pip reads its index URL from
pub const INDEX_URL_ENV: &str = "PIP_INDEX_URL";

/// Maximum number of package names returned for one completion request
pub const DEFAULT_COMPLETION_LIMIT: usize = 100;

const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// File name of the server log inside the data directory
pub const LOG_FILE_NAME: &str = "requirements-lsp.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// LSP configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LspConfig {
    /// Explicit index URL, overriding the environment and pip configuration
    pub pip_index: Option<String>,
    pub cache: CacheConfig,
    pub completion: CompletionConfig,
}

impl LspConfig {
    /// Read configuration from client settings
    ///
    /// Accepts either `{ "requirements-lsp": { .. } }` or the section itself.
    pub fn from_settings(settings: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if settings.is_null() {
            return Ok(Self::default());
        }
        let section = settings.get(PACKAGE_NAME).unwrap_or(settings);
        serde_json::from_value(section.clone())
    }
}

/// Cache-related configuration, all values in milliseconds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub packages_ttl: u64,
    pub placeholder_ttl: u64,
    pub releases_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            packages_ttl: DEFAULT_PACKAGES_TTL_MS,
            placeholder_ttl: DEFAULT_PLACEHOLDER_TTL_MS,
            releases_ttl: DEFAULT_RELEASES_TTL_MS,
        }
    }
}

impl CacheConfig {
    pub fn packages_ttl(&self) -> Duration {
        Duration::from_millis(self.packages_ttl)
    }

    pub fn placeholder_ttl(&self) -> Duration {
        Duration::from_millis(self.placeholder_ttl)
    }

    pub fn releases_ttl(&self) -> Duration {
        Duration::from_millis(self.releases_ttl)
    }
}

/// Completion-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub limit: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_COMPLETION_LIMIT,
        }
    }
}

/// Resolve the package index URL
///
/// Later sources win: built-in default, `PIP_INDEX_URL`, the first pip
/// configuration file that names an index, then the explicit setting.
pub fn resolve_index_url(setting: Option<&str>) -> String {
    let from_pip_conf = pip_conf_paths().iter().find_map(|path| {
        read_pip_conf_index(path)
            .inspect_err(|e| debug!("Ignoring pip configuration: {}", e))
            .ok()
            .flatten()
    });

    resolve_index_url_with(setting, std::env::var(INDEX_URL_ENV).ok(), from_pip_conf)
}

fn resolve_index_url_with(
    setting: Option<&str>,
    env: Option<String>,
    pip_conf: Option<String>,
) -> String {
    setting
        .map(str::to_string)
        .into_iter()
        .chain(pip_conf)
        .chain(env)
        .map(|url| url.trim().to_string())
        .find(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string())
}

/// Candidate pip configuration files, in lookup order
pub fn pip_conf_paths() -> Vec<PathBuf> {
    pip_conf_paths_with(dirs::home_dir(), dirs::config_dir())
}

fn pip_conf_paths_with(home_dir: Option<PathBuf>, config_dir: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = home_dir {
        paths.push(home.join(".pip").join("pip.conf"));
    }
    if let Some(config) = config_dir {
        paths.push(config.join("pip").join("pip.conf"));
    }
    paths
}

/// Read the index URL from a pip configuration file
///
/// A missing file is not an error and yields `None`.
pub fn read_pip_conf_index(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(parse_pip_conf_index(&contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => {
            warn!("Failed to read pip configuration {:?}: {}", path, source);
            Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Extract `index-url` (or legacy `index`) from the `[global]` section
fn parse_pip_conf_index(contents: &str) -> Option<String> {
    let mut in_global = false;
    let mut legacy = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_global = section.trim() == "global";
            continue;
        }

        if !in_global {
            continue;
        }

        let Some((key, value)) = line.split_once(['=', ':']) else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "index-url" | "index_url" => return Some(value.to_string()),
            "index" => legacy = Some(value.to_string()),
            _ => {}
        }
    }

    legacy
}

/// Returns the path to the data directory for requirements-lsp.
/// Uses $XDG_DATA_HOME/requirements-lsp if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/requirements-lsp,
/// or ./requirements-lsp if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join(LOG_FILE_NAME)
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(PACKAGE_NAME)
}
