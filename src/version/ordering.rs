//! Release ordering for package index version strings
//!
//! Versions are compared with a token key rather than parsed: numeric runs
//! are zero-padded so that byte-wise comparison agrees with numeric value,
//! textual markers are rewritten so pre-releases sort before the final
//! release, and every key ends in a synthetic `*final` token.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

/// Digits, lowercase letter runs, dots and hyphens each form a component
static COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+|[a-z]+|\.|-").expect("component pattern is valid"));

/// Width numeric components are padded to
const NUMERIC_WIDTH: usize = 8;

/// Token appended to every key
const FINAL_MARKER: &str = "*final";

fn replace_marker(part: &str) -> &str {
    match part {
        "pre" | "preview" | "rc" => "c",
        "-" => "final-",
        "dev" => "@",
        other => other,
    }
}

/// Split `version` into its raw components, keeping any text between matches
fn raw_components(version: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut last = 0;

    for m in COMPONENT_RE.find_iter(version) {
        parts.push(&version[last..m.start()]);
        parts.push(m.as_str());
        last = m.end();
    }
    parts.push(&version[last..]);

    parts
}

/// Build the ordering key for a version string
pub fn version_key(version: &str) -> Vec<String> {
    let mut key: Vec<String> = raw_components(version)
        .into_iter()
        .map(replace_marker)
        .filter(|part| !part.is_empty() && *part != ".")
        .map(|part| {
            if part.starts_with(|c: char| c.is_ascii_digit()) {
                format!("{:0>width$}", part, width = NUMERIC_WIDTH)
            } else {
                format!("*{part}")
            }
        })
        .collect();

    key.push(FINAL_MARKER.to_string());
    key
}

/// Compare two version strings by their ordering keys
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    version_key(a).cmp(&version_key(b))
}

/// Sort releases from oldest to newest
pub fn sort_releases(releases: &mut [String]) {
    releases.sort_by_cached_key(|v| version_key(v));
}
