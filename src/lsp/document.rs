//! Open document tracking for full-text sync

use std::sync::LazyLock;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use regex::Regex;
use tower_lsp::lsp_types::Url;

use crate::parser::types::is_requirements_document;

/// Line terminators as LSP counts them
static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("line break pattern is valid"));

/// Text of an open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub language_id: Option<String>,
}

impl Document {
    pub fn new(text: impl Into<String>, language_id: Option<String>) -> Self {
        Self {
            text: text.into(),
            language_id,
        }
    }

    /// Lines split on `\r\n`, `\n` and `\r`
    ///
    /// Text ending in a line break has a final empty line, as in the editor.
    fn lines(&self) -> impl Iterator<Item = &str> {
        LINE_BREAK_RE.split(&self.text)
    }

    /// Text of the 0-indexed `line`, without its line ending
    pub fn line(&self, line: u32) -> Option<&str> {
        self.lines().nth(line as usize)
    }

    /// Lines `start..=end` paired with their line numbers, skipping lines past the end
    pub fn lines_between(&self, start: u32, end: u32) -> Vec<(u32, &str)> {
        self.lines()
            .enumerate()
            .skip(start as usize)
            .take(end.saturating_sub(start) as usize + 1)
            .map(|(i, text)| (i as u32, text))
            .collect()
    }

    pub fn is_requirements(&self, uri: &Url) -> bool {
        is_requirements_document(uri, self.language_id.as_deref())
    }
}

#[derive(Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: Url, document: Document) {
        self.documents.insert(uri, document);
    }

    /// Replace the text of a document, keeping its language id
    pub fn update(&self, uri: Url, text: String) {
        match self.documents.entry(uri) {
            Entry::Occupied(mut entry) => entry.get_mut().text = text,
            Entry::Vacant(entry) => {
                entry.insert(Document::new(text, None));
            }
        }
    }

    pub fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn get(&self, uri: &Url) -> Option<Document> {
        self.documents.get(uri).map(|document| document.clone())
    }
}

/// Length of `text` in UTF-16 code units, the unit LSP positions count in
pub fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// Byte offset of the UTF-16 `character` position in `text`, clamped to its length
pub fn byte_offset(text: &str, character: u32) -> usize {
    let mut units = 0;
    for (idx, c) in text.char_indices() {
        if units >= character as usize {
            return idx;
        }
        units += c.len_utf16();
    }
    text.len()
}
