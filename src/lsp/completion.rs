//! Completion of package names and release versions

use std::sync::Arc;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, CompletionList, CompletionResponse};
use tracing::debug;

use crate::lsp::document::byte_offset;
use crate::parser::requirements_txt::parse_requirement;
use crate::version::catalog::{Catalog, PackageNames};

/// Characters that can begin a version specifier, including `~=` and `!=`
const SPECIFIER_CHARS: [char; 5] = ['<', '=', '>', '~', '!'];

/// What the cursor is positioned on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Typing a package name, e.g. `reque|`
    PackageName { prefix: String },

    /// Typing a version after an operator, e.g. `requests>=2.|`
    Version {
        /// Lowercase package name without extras
        package: String,
        /// Partial version typed after the last operator character
        prefix: String,
    },

    /// Nothing to complete (comments, options, markers, extras)
    None,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Work out what to complete from the line text and the UTF-16 cursor column
pub fn detect_completion_context(line: &str, character: u32) -> CompletionContext {
    let before = &line[..byte_offset(line, character)];
    let trimmed = before.trim_start();

    if trimmed.starts_with(['#', '-']) || before.contains([';', '#', '@']) {
        return CompletionContext::None;
    }

    if let Some(op_idx) = before.find(SPECIFIER_CHARS) {
        let Some(last_op) = before.rfind(SPECIFIER_CHARS) else {
            return CompletionContext::None;
        };
        let prefix = before[last_op + 1..].trim().to_string();
        let package = parse_requirement(&before[..op_idx]).name;
        return CompletionContext::Version { package, prefix };
    }

    if trimmed.is_empty() || !trimmed.chars().all(is_name_char) {
        return CompletionContext::None;
    }

    CompletionContext::PackageName {
        prefix: trimmed.to_string(),
    }
}

/// Package names starting with `prefix`, case-insensitively
///
/// The list is incomplete while the package list is still loading or when
/// more than `limit` names match.
pub fn package_completions(packages: &PackageNames, prefix: &str, limit: usize) -> CompletionList {
    let lower_prefix = prefix.to_lowercase();

    let mut matches: Vec<(&String, &String)> = packages
        .iter()
        .filter(|(lower_name, _)| lower_name.starts_with(&lower_prefix))
        .collect();
    matches.sort_unstable_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(b.0)));

    let is_incomplete = packages.is_empty() || matches.len() > limit;
    let items = matches
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (_, name))| CompletionItem {
            label: name.clone(),
            kind: Some(CompletionItemKind::MODULE),
            sort_text: Some(format!("{i:05}")),
            ..Default::default()
        })
        .collect();

    CompletionList {
        is_incomplete,
        items,
    }
}

/// Releases starting with `prefix`, newest first
///
/// `releases` must be sorted oldest to newest.
pub fn version_completions(releases: &[String], prefix: &str) -> Vec<CompletionItem> {
    releases
        .iter()
        .rev()
        .filter(|version| version.starts_with(prefix))
        .enumerate()
        .map(|(i, version)| CompletionItem {
            label: version.clone(),
            kind: Some(CompletionItemKind::VALUE),
            sort_text: Some(format!("{i:05}")),
            ..Default::default()
        })
        .collect()
}

/// Build the completion response for `context`
pub async fn complete(
    catalog: &Arc<Catalog>,
    context: CompletionContext,
    limit: usize,
) -> Option<CompletionResponse> {
    match context {
        CompletionContext::PackageName { prefix } => {
            let packages = catalog.list_packages();
            let list = package_completions(&packages, &prefix, limit);
            debug!(
                "{} package completions for prefix {:?}",
                list.items.len(),
                prefix
            );
            Some(CompletionResponse::List(list))
        }
        CompletionContext::Version { package, prefix } => {
            let packages = catalog.list_packages();
            let real_name = packages.get(&package)?;
            let releases = catalog.releases(real_name, true).await;
            let items = version_completions(&releases, &prefix);
            debug!("{} version completions for {}", items.len(), real_name);
            Some(CompletionResponse::Array(items))
        }
        CompletionContext::None => None,
    }
}
