//! `workspace/executeCommand` commands and their arguments

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::{ExecuteCommandParams, Range, Url};

pub const AUTO_VERSION_COMMAND: &str = "requirements.autoVersion";
pub const PROMPT_VERSION_COMMAND: &str = "requirements.promptVersion";
pub const CLEAR_CACHE_COMMAND: &str = "requirements.clearCache";

/// Every command the server advertises
pub const COMMANDS: [&str; 3] = [
    AUTO_VERSION_COMMAND,
    PROMPT_VERSION_COMMAND,
    CLEAR_CACHE_COMMAND,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoVersionArgs {
    pub uri: Url,
    pub range: Range,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptVersionArgs {
    pub uri: Url,
    pub line: u32,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AutoVersion(AutoVersionArgs),
    PromptVersion(PromptVersionArgs),
    ClearCache,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing arguments for {0}")]
    MissingArguments(&'static str),

    #[error("Invalid arguments for {command}: {source}")]
    InvalidArguments {
        command: &'static str,
        source: serde_json::Error,
    },
}

impl From<CommandError> for jsonrpc::Error {
    fn from(e: CommandError) -> Self {
        jsonrpc::Error::invalid_params(e.to_string())
    }
}

fn first_argument<T: for<'de> Deserialize<'de>>(
    command: &'static str,
    arguments: Vec<serde_json::Value>,
) -> Result<T, CommandError> {
    let value = arguments
        .into_iter()
        .next()
        .ok_or(CommandError::MissingArguments(command))?;
    serde_json::from_value(value).map_err(|source| CommandError::InvalidArguments { command, source })
}

impl Command {
    pub fn parse(params: ExecuteCommandParams) -> Result<Self, CommandError> {
        match params.command.as_str() {
            AUTO_VERSION_COMMAND => Ok(Self::AutoVersion(first_argument(
                AUTO_VERSION_COMMAND,
                params.arguments,
            )?)),
            PROMPT_VERSION_COMMAND => Ok(Self::PromptVersion(first_argument(
                PROMPT_VERSION_COMMAND,
                params.arguments,
            )?)),
            CLEAR_CACHE_COMMAND => Ok(Self::ClearCache),
            _ => Err(CommandError::Unknown(params.command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tower_lsp::lsp_types::Position;

    fn params(command: &str, arguments: Vec<serde_json::Value>) -> ExecuteCommandParams {
        ExecuteCommandParams {
            command: command.to_string(),
            arguments,
            work_done_progress_params: Default::default(),
        }
    }

    #[test]
    fn parse_auto_version_reads_camel_case_arguments() {
        let command = Command::parse(params(
            AUTO_VERSION_COMMAND,
            vec![json!({
                "uri": "file:///project/requirements.txt",
                "range": {
                    "start": { "line": 1, "character": 0 },
                    "end": { "line": 3, "character": 0 }
                },
                "strict": true
            })],
        ))
        .unwrap();

        assert_eq!(
            command,
            Command::AutoVersion(AutoVersionArgs {
                uri: "file:///project/requirements.txt".parse().unwrap(),
                range: Range {
                    start: Position { line: 1, character: 0 },
                    end: Position { line: 3, character: 0 },
                },
                strict: true,
            })
        );
    }

    #[test]
    fn parse_prompt_version_defaults_to_range_constraint() {
        let command = Command::parse(params(
            PROMPT_VERSION_COMMAND,
            vec![json!({ "uri": "file:///requirements.txt", "line": 4 })],
        ))
        .unwrap();

        assert_eq!(
            command,
            Command::PromptVersion(PromptVersionArgs {
                uri: "file:///requirements.txt".parse().unwrap(),
                line: 4,
                strict: false,
            })
        );
    }

    #[test]
    fn parse_clear_cache_ignores_arguments() {
        assert_eq!(
            Command::parse(params(CLEAR_CACHE_COMMAND, vec![json!(1)])).unwrap(),
            Command::ClearCache
        );
    }

    #[test]
    fn parse_rejects_unknown_and_malformed_commands() {
        assert!(matches!(
            Command::parse(params("requirements.nope", vec![])),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            Command::parse(params(PROMPT_VERSION_COMMAND, vec![])),
            Err(CommandError::MissingArguments(PROMPT_VERSION_COMMAND))
        ));
        assert!(matches!(
            Command::parse(params(PROMPT_VERSION_COMMAND, vec![json!({ "line": "x" })])),
            Err(CommandError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn prompt_version_args_serialize_as_command_arguments() {
        let args = PromptVersionArgs {
            uri: "file:///requirements.txt".parse().unwrap(),
            line: 2,
            strict: true,
        };

        assert_eq!(
            serde_json::to_value(args).unwrap(),
            json!({ "uri": "file:///requirements.txt", "line": 2, "strict": true })
        );
    }
}
