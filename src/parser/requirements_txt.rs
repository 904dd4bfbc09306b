//! requirements.txt line parsing
//!
//! Lines are not parsed as full PEP 508 requirements. The package name is
//! whatever precedes the first version-operator character, which is enough
//! to look the package up and rewrite the line.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::types::Requirement;

static EXTRAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*)\]").expect("extras pattern is valid"));

/// Characters that start a version constraint
const OPERATOR_CHARS: [char; 3] = ['<', '=', '>'];

/// Package name of a requirement line, possibly with extras
///
/// `requests[socks]>=2.0` yields `requests[socks]`. A line without a
/// version operator is returned trimmed.
pub fn package_name(line: &str) -> &str {
    match line.find(OPERATOR_CHARS) {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Lowercase package name with extras removed, plus the extras text
///
/// Extras keep their original spelling.
pub fn normalized_name(package: &str) -> (String, Option<String>) {
    let extras = EXTRAS_RE
        .captures(package)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let lower = package.to_lowercase();
    let name = EXTRAS_RE.replace_all(&lower, "").into_owned();

    (name, extras)
}

/// Package name as written back into a requirement line
pub fn full_name(real_name: &str, extras: Option<&str>) -> String {
    match extras {
        Some(extras) => format!("{real_name}[{extras}]"),
        None => real_name.to_string(),
    }
}

/// Parse the package part of a requirement line
pub fn parse_requirement(line: &str) -> Requirement {
    let (name, extras) = normalized_name(package_name(line));
    Requirement { name, extras }
}
