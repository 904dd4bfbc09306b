//! Code action generation for inserting version constraints

use std::collections::HashMap;
use std::sync::Arc;

use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, Command, Position, Range, TextEdit, Url,
    WorkspaceEdit,
};

use crate::lsp::commands::{PROMPT_VERSION_COMMAND, PromptVersionArgs};
use crate::lsp::document::{Document, utf16_len};
use crate::parser::requirements_txt::{full_name, parse_requirement};
use crate::version::catalog::Catalog;
use crate::version::formatter::{non_strict_version, strict_version};

/// Constraint text for `version`, pinned or bounded to the major release line
pub fn format_constraint(version: &str, strict: bool) -> String {
    if strict {
        strict_version(version)
    } else {
        non_strict_version(version)
    }
}

/// Edit replacing the whole of `line` (whose current text is `text`) with `new_text`
pub fn replace_line_edit(line: u32, text: &str, new_text: String) -> TextEdit {
    TextEdit {
        range: Range {
            start: Position { line, character: 0 },
            end: Position {
                line,
                character: utf16_len(text),
            },
        },
        new_text,
    }
}

/// Lines a selection covers, leaving out a final line the selection only touches at column 0
pub fn selected_line_span(range: Range) -> (u32, u32) {
    let end = if range.end.line > range.start.line && range.end.character == 0 {
        range.end.line - 1
    } else {
        range.end.line
    };
    (range.start.line, end)
}

/// Rewrite each known requirement to its latest release
///
/// Lines whose package is not in the index, or has no visible release, are
/// left alone, as are lines that already read as the rewritten text.
pub async fn auto_version_edits(
    catalog: &Arc<Catalog>,
    lines: &[(u32, &str)],
    strict: bool,
) -> Vec<TextEdit> {
    let packages = catalog.list_packages();
    let mut edits = Vec::new();

    for &(line, text) in lines {
        let requirement = parse_requirement(text);
        let Some(real_name) = packages.get(&requirement.name) else {
            continue;
        };
        let Some(version) = catalog.latest_release(real_name).await else {
            continue;
        };

        let new_text = full_name(real_name, requirement.extras.as_deref())
            + &format_constraint(&version, strict);
        if new_text != text {
            edits.push(replace_line_edit(line, text, new_text));
        }
    }

    edits
}

/// Requirement lines for every release of the package on `line`, newest first
///
/// Hidden releases are included. Returns `None` when the package is unknown.
pub async fn version_choices(
    catalog: &Arc<Catalog>,
    line: &str,
    strict: bool,
) -> Option<Vec<String>> {
    let requirement = parse_requirement(line);
    let packages = catalog.list_packages();
    let real_name = packages.get(&requirement.name)?;
    let name = full_name(real_name, requirement.extras.as_deref());

    let releases = catalog.releases(real_name, true).await;
    Some(
        releases
            .iter()
            .rev()
            .map(|version| format!("{name}{}", format_constraint(version, strict)))
            .collect(),
    )
}

fn workspace_edit(uri: &Url, edits: Vec<TextEdit>) -> WorkspaceEdit {
    WorkspaceEdit {
        changes: Some(HashMap::from([(uri.clone(), edits)])),
        ..Default::default()
    }
}

fn auto_version_title(edits: &[TextEdit], strict: bool) -> String {
    match (edits, strict) {
        ([edit], true) => format!("Pin to {}", edit.new_text),
        ([edit], false) => format!("Constrain to {}", edit.new_text),
        (_, true) => format!("Pin {} requirements to their latest releases", edits.len()),
        (_, false) => format!(
            "Constrain {} requirements to their latest major releases",
            edits.len()
        ),
    }
}

fn create_auto_version_action(uri: &Url, edits: Vec<TextEdit>, strict: bool) -> CodeAction {
    CodeAction {
        title: auto_version_title(&edits, strict),
        kind: Some(CodeActionKind::REFACTOR_REWRITE),
        edit: Some(workspace_edit(uri, edits)),
        ..Default::default()
    }
}

fn create_prompt_action(uri: &Url, line: u32, package: &str, strict: bool) -> CodeAction {
    let style = if strict { "pinned" } else { "range" };
    let title = format!("Choose {package} version ({style})...");
    let args = PromptVersionArgs {
        uri: uri.clone(),
        line,
        strict,
    };

    CodeAction {
        title: title.clone(),
        kind: Some(CodeActionKind::REFACTOR),
        command: Some(Command {
            title,
            command: PROMPT_VERSION_COMMAND.to_string(),
            arguments: serde_json::to_value(args).ok().map(|v| vec![v]),
        }),
        ..Default::default()
    }
}

/// Generate version code actions for the lines `range` covers
pub async fn generate_code_actions(
    catalog: &Arc<Catalog>,
    uri: &Url,
    document: &Document,
    range: Range,
) -> Vec<CodeActionOrCommand> {
    let (start, end) = selected_line_span(range);
    let lines = document.lines_between(start, end);
    let mut actions = Vec::new();

    for strict in [true, false] {
        let edits = auto_version_edits(catalog, &lines, strict).await;
        if !edits.is_empty() {
            actions.push(CodeActionOrCommand::CodeAction(
                create_auto_version_action(uri, edits, strict),
            ));
        }
    }

    let first_line = lines.iter().find(|(_, text)| !text.trim().is_empty());
    if let Some(&(line, text)) = first_line {
        let requirement = parse_requirement(text);
        let packages = catalog.list_packages();
        if let Some(real_name) = packages.get(&requirement.name) {
            for strict in [true, false] {
                actions.push(CodeActionOrCommand::CodeAction(create_prompt_action(
                    uri, line, real_name, strict,
                )));
            }
        }
    }

    actions
}
