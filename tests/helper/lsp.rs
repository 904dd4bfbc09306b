//! LSP request/notification test utilities

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tower_lsp::ClientSocket;
use tower_lsp::jsonrpc::{Request, Response};
use tower_lsp::lsp_types::*;

/// Create an LSP initialize request
pub fn create_initialize_request(id: i64) -> Request {
    Request::build("initialize")
        .id(id)
        .params(serde_json::to_value(InitializeParams::default()).unwrap())
        .finish()
}

/// Create an LSP initialized notification
pub fn create_initialized_notification() -> Request {
    Request::build("initialized")
        .params(serde_json::to_value(InitializedParams {}).unwrap())
        .finish()
}

/// Create an LSP didOpen notification
pub fn create_did_open_notification(uri: &str, language_id: &str, content: &str) -> Request {
    Request::build("textDocument/didOpen")
        .params(
            serde_json::to_value(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.parse().unwrap(),
                    language_id: language_id.to_string(),
                    version: 1,
                    text: content.to_string(),
                },
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP didChange notification
pub fn create_did_change_notification(uri: &str, content: &str, version: i32) -> Request {
    Request::build("textDocument/didChange")
        .params(
            serde_json::to_value(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: uri.parse().unwrap(),
                    version,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: content.to_string(),
                }],
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP completion request
pub fn create_completion_request(id: i64, uri: &str, line: u32, character: u32) -> Request {
    Request::build("textDocument/completion")
        .id(id)
        .params(
            serde_json::to_value(CompletionParams {
                text_document_position: TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier {
                        uri: uri.parse().unwrap(),
                    },
                    position: Position { line, character },
                },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
                context: None,
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP codeAction request covering `range`
pub fn create_code_action_request(id: i64, uri: &str, range: Range) -> Request {
    Request::build("textDocument/codeAction")
        .id(id)
        .params(
            serde_json::to_value(CodeActionParams {
                text_document: TextDocumentIdentifier {
                    uri: uri.parse().unwrap(),
                },
                range,
                context: CodeActionContext {
                    diagnostics: vec![],
                    only: None,
                    trigger_kind: None,
                },
                work_done_progress_params: Default::default(),
                partial_result_params: Default::default(),
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP executeCommand request
pub fn create_execute_command_request(id: i64, command: &str, arguments: Vec<Value>) -> Request {
    Request::build("workspace/executeCommand")
        .id(id)
        .params(
            serde_json::to_value(ExecuteCommandParams {
                command: command.to_string(),
                arguments,
                work_done_progress_params: Default::default(),
            })
            .unwrap(),
        )
        .finish()
}

/// Range from `(line, character)` to `(line, character)`
pub fn range(start: (u32, u32), end: (u32, u32)) -> Range {
    Range {
        start: Position {
            line: start.0,
            character: start.1,
        },
        end: Position {
            line: end.0,
            character: end.1,
        },
    }
}

/// Collect notifications in background and return a receiver
pub fn spawn_notification_collector(mut socket: ClientSocket) -> mpsc::Receiver<Request> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        while let Some(notification) = socket.next().await {
            if tx.send(notification).await.is_err() {
                break;
            }
        }
    });

    rx
}

/// Act as the editor: answer server requests and forward every message to a receiver
///
/// `window/showMessageRequest` is answered with the action at `choice`, or
/// dismissed when `choice` is `None`. `workspace/applyEdit` is always applied.
pub fn spawn_client_responder(socket: ClientSocket, choice: Option<usize>) -> mpsc::Receiver<Request> {
    let (tx, rx) = mpsc::channel(100);
    let (mut stream, mut sink) = socket.split();

    tokio::spawn(async move {
        while let Some(request) = stream.next().await {
            if let Some(id) = request.id().cloned() {
                let result = match request.method() {
                    "window/showMessageRequest" => choice
                        .and_then(|i| request.params()?.get("actions")?.get(i).cloned())
                        .unwrap_or(Value::Null),
                    "workspace/applyEdit" => json!({ "applied": true }),
                    _ => Value::Null,
                };
                if sink.send(Response::from_ok(id, result)).await.is_err() {
                    break;
                }
            }
            if tx.send(request).await.is_err() {
                break;
            }
        }
    });

    rx
}

/// Wait for a notification with the specified method name from the receiver
pub async fn wait_for_notification(
    rx: &mut mpsc::Receiver<Request>,
    method: &str,
) -> Option<Request> {
    let timeout_duration = Duration::from_secs(5);

    loop {
        match timeout(timeout_duration, rx.recv()).await {
            Ok(Some(notification)) => {
                if notification.method() == method {
                    return Some(notification);
                }
                // Skip other notifications (like log_message)
            }
            _ => return None,
        }
    }
}

/// Methods of every message received until one named `method` arrives, inclusive
pub async fn methods_until(rx: &mut mpsc::Receiver<Request>, method: &str) -> Vec<String> {
    let mut methods = Vec::new();
    while let Ok(Some(message)) = timeout(Duration::from_secs(5), rx.recv()).await {
        methods.push(message.method().to_string());
        if message.method() == method {
            break;
        }
    }
    methods
}

/// Result payload of a response, panicking on errors
pub fn response_result(response: Option<Response>) -> Value {
    let (_, result) = response.expect("request should have a response").into_parts();
    result.expect("request should succeed")
}
