//! Common types for parsers

use tower_lsp::lsp_types::Url;

/// Language ids editors assign to pip requirement files
const REQUIREMENTS_LANGUAGE_IDS: &[&str] = &["pip-requirements", "requirements"];

/// Package part of a requirement line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Lowercase package name without extras (e.g., "celery")
    pub name: String,
    /// Extras annotation as written (e.g., "redis,sqs")
    pub extras: Option<String>,
}

/// Check whether a document should be treated as a requirements file
pub fn is_requirements_document(uri: &Url, language_id: Option<&str>) -> bool {
    language_id.is_some_and(|id| REQUIREMENTS_LANGUAGE_IDS.contains(&id))
        || is_requirements_file(uri.path())
}

/// `requirements.txt`, or any `.txt` file inside a `requirements` directory
pub fn is_requirements_file(path: &str) -> bool {
    let mut segments = path.rsplit(['/', '\\']);
    let Some(basename) = segments.next() else {
        return false;
    };
    if basename == "requirements.txt" {
        return true;
    }

    let dirname = segments.next().unwrap_or_default();
    dirname == "requirements" && basename.ends_with(".txt")
}
