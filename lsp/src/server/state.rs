use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::lsp_types::Url;
use tower_lsp::Client;

use crate::analyzer::{DocumentSnapshot, DocumentSource, JsonnetAnalyzer};

use super::config::ServerConfig;

/// In-memory representation of an open Jsonnet document.
#[derive(Debug, Default)]
pub(crate) struct Document {
    pub(crate) content: Rope,
    pub(crate) version: i32,
}

/// Open buffers, shared with the analyzer so imports see unsaved edits.
#[derive(Debug, Default)]
pub(crate) struct DocumentManager {
    pub(crate) documents: DashMap<Url, Document>,
}

impl DocumentManager {
    pub(crate) fn open(&self, uri: Url, text: &str, version: i32) {
        self.documents.insert(
            uri,
            Document {
                content: Rope::from_str(text),
                version,
            },
        );
    }

    pub(crate) fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub(crate) fn text(&self, uri: &Url) -> Option<(String, i32)> {
        self.documents.get(uri).map(|doc| (doc.content.to_string(), doc.version))
    }
}

impl DocumentSource for DocumentManager {
    fn get(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.text(uri).map(|(text, version)| DocumentSnapshot { text, version })
    }
}

/// Primary LSP server state shared across handlers.
pub(crate) struct JsonnetLanguageServer {
    pub(crate) client: Client,
    pub(crate) documents: Arc<DocumentManager>,
    pub(crate) analyzer: Arc<JsonnetAnalyzer>,
    pub(crate) config: Mutex<ServerConfig>,
}

impl JsonnetLanguageServer {
    pub(crate) fn new(client: Client) -> Self {
        let documents = Arc::new(DocumentManager::default());
        let config = ServerConfig::default();
        let analyzer = JsonnetAnalyzer::new(documents.clone());
        analyzer.set_jpath(config.jpath.clone());
        Self {
            client,
            documents,
            analyzer: Arc::new(analyzer),
            config: Mutex::new(config),
        }
    }

    pub(crate) fn hover_comments(&self) -> bool {
        self.config.lock().map(|cfg| cfg.hover_comments).unwrap_or(true)
    }
}
