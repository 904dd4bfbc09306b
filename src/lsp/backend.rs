use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

use crate::config::{LspConfig, resolve_index_url};
use crate::lsp::code_action::{
    auto_version_edits, generate_code_actions, replace_line_edit, selected_line_span,
    version_choices,
};
use crate::lsp::commands::{AutoVersionArgs, COMMANDS, Command, PromptVersionArgs};
use crate::lsp::completion::{complete, detect_completion_context};
use crate::lsp::document::{Document, DocumentStore};
use crate::version::catalog::Catalog;
use crate::version::registries::PypiIndex;
use crate::version::registry::PackageIndex;

/// Completion trigger characters, the characters version specifiers are built from
const TRIGGER_CHARACTERS: [&str; 5] = ["=", "<", ">", "~", "!"];

/// Creates the index client for a resolved index URL
pub type IndexFactory = Box<dyn Fn(&str) -> Arc<dyn PackageIndex> + Send + Sync>;

/// Index URL currently in use and how to build a client for a new one
struct IndexSource {
    url: Mutex<String>,
    factory: IndexFactory,
}

pub struct Backend {
    client: Client,
    catalog: Arc<Catalog>,
    documents: DocumentStore,
    config: RwLock<LspConfig>,
    /// `None` when the catalog was supplied by the caller
    index_source: Option<IndexSource>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_index_factory(
            client,
            Box::new(|index_url: &str| -> Arc<dyn PackageIndex> {
                let index = PypiIndex::new(index_url.to_string());
                info!("Using package index {}", index.index_url());
                Arc::new(index)
            }),
        )
    }

    /// Build a Backend that creates index clients with `factory`
    ///
    /// The index is rebuilt whenever a configuration change alters the
    /// resolved index URL.
    pub fn with_index_factory(client: Client, factory: IndexFactory) -> Self {
        let config = LspConfig::default();
        let index_url = resolve_index_url(config.pip_index.as_deref());
        let catalog = Arc::new(Catalog::new(factory(index_url.as_str()), config.cache.clone()));

        Self {
            client,
            catalog,
            documents: DocumentStore::new(),
            config: RwLock::new(config),
            index_source: Some(IndexSource {
                url: Mutex::new(index_url),
                factory,
            }),
        }
    }

    /// Build a Backend around an existing catalog
    ///
    /// The index is never swapped on configuration changes.
    pub fn build(client: Client, catalog: Arc<Catalog>) -> Self {
        Self {
            client,
            catalog,
            documents: DocumentStore::new(),
            config: RwLock::new(LspConfig::default()),
            index_source: None,
        }
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    ..Default::default()
                },
            )),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(
                    TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                ),
                resolve_provider: Some(false),
                ..Default::default()
            }),
            code_action_provider: Some(CodeActionProviderCapability::Options(
                CodeActionOptions {
                    code_action_kinds: Some(vec![
                        CodeActionKind::REFACTOR,
                        CodeActionKind::REFACTOR_REWRITE,
                    ]),
                    ..Default::default()
                },
            )),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn apply_config(&self, config: LspConfig) {
        debug!("Applying configuration: {:?}", config);
        self.catalog.set_ttls(config.cache.clone());

        if let Some(source) = &self.index_source {
            let index_url = resolve_index_url(config.pip_index.as_deref());
            let mut current = source.url.lock().await;
            if *current != index_url {
                info!("Switching package index from {} to {}", current, index_url);
                self.catalog.set_index((source.factory)(index_url.as_str()));
                *current = index_url;
            }
        }

        *self.config.write().await = config;
    }

    /// Open requirements document for `uri`
    fn requirements_document(&self, uri: &Url) -> Option<Document> {
        self.documents
            .get(uri)
            .filter(|document| document.is_requirements(uri))
    }

    /// Edit replacing `line` with `new_text`, measured against the line as it reads now
    fn replace_current_line(&self, uri: &Url, line: u32, new_text: String) -> Option<TextEdit> {
        let document = self.documents.get(uri)?;
        let text = document.line(line)?;
        Some(replace_line_edit(line, text, new_text))
    }

    async fn apply_edits(&self, uri: Url, edits: Vec<TextEdit>) {
        let edit = WorkspaceEdit {
            changes: Some(HashMap::from([(uri, edits)])),
            ..Default::default()
        };

        match self.client.apply_edit(edit).await {
            Ok(response) if !response.applied => {
                warn!("Edit was not applied: {:?}", response.failure_reason);
            }
            Ok(_) => {}
            Err(e) => error!("Failed to apply edit: {:?}", e),
        }
    }

    async fn auto_version(&self, args: AutoVersionArgs) {
        let Some(document) = self.requirements_document(&args.uri) else {
            return;
        };

        let (start, end) = selected_line_span(args.range);
        let lines = document.lines_between(start, end);
        let edits = auto_version_edits(&self.catalog, &lines, args.strict).await;
        if edits.is_empty() {
            debug!("No requirements to version in {}", args.uri);
            return;
        }

        self.apply_edits(args.uri, edits).await;
    }

    async fn prompt_version(&self, args: PromptVersionArgs) {
        let Some(document) = self.requirements_document(&args.uri) else {
            return;
        };
        let Some(text) = document.line(args.line) else {
            return;
        };
        let Some(choices) = version_choices(&self.catalog, text, args.strict).await else {
            return;
        };

        if choices.is_empty() {
            self.client
                .show_message(MessageType::INFO, "requirements.txt: no releases found")
                .await;
            return;
        }

        let actions = choices
            .into_iter()
            .map(|title| MessageActionItem {
                title,
                properties: HashMap::new(),
            })
            .collect();

        let picked = match self
            .client
            .show_message_request(MessageType::INFO, "Choose a version", Some(actions))
            .await
        {
            Ok(picked) => picked,
            Err(e) => {
                error!("Failed to show version choices: {:?}", e);
                return;
            }
        };

        // Dismissed
        let Some(picked) = picked else {
            return;
        };

        // The line may have been edited while the choices were shown
        let Some(edit) = self.replace_current_line(&args.uri, args.line, picked.title) else {
            return;
        };
        self.apply_edits(args.uri, vec![edit]).await;
    }

    async fn clear_cache(&self) {
        self.catalog.clear();
        info!("Cache cleared");
        self.client
            .show_message(MessageType::INFO, "requirements.txt: cache cleared")
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.client
            .log_message(MessageType::INFO, "LSP server initializing")
            .await;

        if let Some(options) = params.initialization_options {
            match LspConfig::from_settings(&options) {
                Ok(config) => self.apply_config(config).await,
                Err(e) => warn!("Ignoring invalid initialization options: {}", e),
            }
        }

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "LSP server initialized")
            .await;
        // Warm the package list so the first completion has names to offer
        self.catalog.list_packages();
    }

    async fn shutdown(&self) -> Result<()> {
        self.client
            .log_message(MessageType::INFO, "LSP server shutting down")
            .await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.client
            .log_message(
                MessageType::LOG,
                format!("Document opened: {}", params.text_document.uri),
            )
            .await;

        let document = Document::new(
            params.text_document.text,
            Some(params.text_document.language_id),
        );
        self.documents.open(params.text_document.uri, document);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // With FULL sync mode, the last content change contains the full document text
        let Some(content) = params.content_changes.into_iter().last().map(|c| c.text) else {
            return;
        };

        self.documents.update(params.text_document.uri, content);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.close(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        match LspConfig::from_settings(&params.settings) {
            Ok(config) => self.apply_config(config).await,
            Err(e) => warn!("Ignoring invalid configuration: {}", e),
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(document) = self.requirements_document(&uri) else {
            return Ok(None);
        };
        let Some(line) = document.line(position.line) else {
            return Ok(None);
        };

        let context = detect_completion_context(line, position.character);
        let limit = self.config.read().await.completion.limit;
        Ok(complete(&self.catalog, context, limit).await)
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let Some(document) = self.requirements_document(&uri) else {
            return Ok(None);
        };

        let actions = generate_code_actions(&self.catalog, &uri, &document, params.range).await;
        if actions.is_empty() {
            return Ok(None);
        }
        Ok(Some(actions))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        info!("execute_command: {}", params.command);

        match Command::parse(params)? {
            Command::AutoVersion(args) => self.auto_version(args).await,
            Command::PromptVersion(args) => self.prompt_version(args).await,
            Command::ClearCache => self.clear_cache().await,
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::registry::MockPackageIndex;
    use serde_json::json;
    use serial_test::serial;
    use tower_lsp::{ClientSocket, LspService};

    const MIRROR: &str = "https://mirror.example/simple";

    type Urls = Arc<std::sync::Mutex<Vec<String>>>;

    /// Factory recording each URL it builds an index for
    ///
    /// Each index lists a single package named after its URL.
    fn recording_factory(urls: Urls) -> IndexFactory {
        Box::new(move |index_url: &str| -> Arc<dyn PackageIndex> {
            urls.lock().unwrap().push(index_url.to_string());
            let name = index_url.to_string();
            let mut index = MockPackageIndex::new();
            index
                .expect_list_packages()
                .returning(move || Ok(vec![name.clone()]));
            Arc::new(index)
        })
    }

    fn service_with_factory(urls: &Urls) -> (LspService<Backend>, ClientSocket) {
        let urls = Arc::clone(urls);
        LspService::new(move |client| {
            Backend::with_index_factory(client, recording_factory(urls))
        })
    }

    fn settings(value: serde_json::Value) -> DidChangeConfigurationParams {
        DidChangeConfigurationParams { settings: value }
    }

    #[tokio::test]
    #[serial]
    async fn configuration_change_swaps_index_when_url_changes() {
        let urls = Urls::default();
        let (service, _socket) = service_with_factory(&urls);
        let backend = service.inner();

        let mirror = json!({
            "requirements-lsp": {
                "pipIndex": MIRROR,
                "cache": { "releasesTtl": 5 }
            }
        });
        backend.did_change_configuration(settings(mirror.clone())).await;
        backend.did_change_configuration(settings(mirror)).await;

        let built = urls.lock().unwrap().clone();
        assert_eq!(built.len(), 2);
        assert_eq!(built[1], MIRROR);
        assert_eq!(backend.catalog.ttls().releases_ttl, 5);
        assert_eq!(
            backend.config.read().await.pip_index.as_deref(),
            Some(MIRROR)
        );

        assert_eq!(backend.catalog.refresh_packages().await, Some(1));
        assert!(backend.catalog.list_packages().contains_key(MIRROR));
    }

    #[tokio::test]
    #[serial]
    async fn configuration_change_keeps_index_when_url_is_unchanged() {
        let urls = Urls::default();
        let (service, _socket) = service_with_factory(&urls);
        let backend = service.inner();

        backend
            .did_change_configuration(settings(json!({ "cache": { "packagesTtl": 7 } })))
            .await;

        assert_eq!(urls.lock().unwrap().len(), 1);
        assert_eq!(backend.catalog.ttls().packages_ttl, 7);
    }

    #[tokio::test]
    #[serial]
    async fn invalid_configuration_is_ignored() {
        let urls = Urls::default();
        let (service, _socket) = service_with_factory(&urls);
        let backend = service.inner();

        backend
            .did_change_configuration(settings(json!({ "completion": { "limit": "many" } })))
            .await;

        assert_eq!(*backend.config.read().await, LspConfig::default());
        assert_eq!(urls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_current_line_measures_the_edited_line() {
        let catalog = Arc::new(Catalog::new(
            Arc::new(MockPackageIndex::new()),
            Default::default(),
        ));
        let (service, _socket) =
            LspService::new(move |client| Backend::build(client, catalog));
        let backend = service.inner();
        let uri: Url = "file:///project/requirements.txt".parse().unwrap();

        backend
            .documents
            .open(uri.clone(), Document::new("flask\nrequests\n", None));
        backend
            .documents
            .update(uri.clone(), "flask\nrequests[socks]>=2\n".to_string());

        let edit = backend
            .replace_current_line(&uri, 1, "requests==2.32.3".to_string())
            .unwrap();
        assert_eq!(
            edit,
            replace_line_edit(1, "requests[socks]>=2", "requests==2.32.3".to_string())
        );
        assert_eq!(edit.range.end.character, 18);

        backend.documents.close(&uri);
        assert!(
            backend
                .replace_current_line(&uri, 1, "requests==2.32.3".to_string())
                .is_none()
        );
    }

    #[test]
    fn server_capabilities_advertise_completion_triggers() {
        let caps = Backend::server_capabilities();

        let completion = caps.completion_provider.unwrap();
        assert_eq!(
            completion.trigger_characters.unwrap(),
            vec!["=", "<", ">", "~", "!"]
        );
    }

    #[test]
    fn server_capabilities_advertise_every_command() {
        let caps = Backend::server_capabilities();

        let commands = caps.execute_command_provider.unwrap().commands;
        assert_eq!(
            commands,
            vec![
                "requirements.autoVersion",
                "requirements.promptVersion",
                "requirements.clearCache"
            ]
        );
    }

    #[test]
    fn server_capabilities_use_full_sync() {
        let caps = Backend::server_capabilities();

        assert_eq!(
            caps.text_document_sync,
            Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                ..Default::default()
            }))
        );
    }
}
