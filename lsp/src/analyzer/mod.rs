use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use jsonnet_core::token::Position;
use serde::Serialize;
use url::Url;
use tracing::warn;

mod compiler;
mod completions;
mod hover;
mod imports;
mod utils;

pub use compiler::{CompileResult, CompilerService};
use imports::ImportLoader;

/// Latest text of an open document.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub text: String,
    pub version: i32,
}

/// Where the analyzer reads open buffers from.
pub trait DocumentSource: Send + Sync {
    fn get(&self, uri: &Url) -> Option<DocumentSnapshot>;
}

/// In-memory document store, used by the command line and tests.
#[derive(Default)]
pub struct MemoryDocuments(DashMap<Url, DocumentSnapshot>);

impl MemoryDocuments {
    pub fn insert(&self, uri: Url, text: impl Into<String>, version: i32) {
        self.0.insert(
            uri,
            DocumentSnapshot {
                text: text.into(),
                version,
            },
        );
    }
}

impl DocumentSource for MemoryDocuments {
    fn get(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.0.get(uri).map(|doc| doc.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuggestionKind {
    Field,
    Method,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub label: String,
    pub kind: SuggestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverInfo {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Jsonnet analyzer: owns the parse cache and answers hover and completion
/// queries against it.
pub struct JsonnetAnalyzer {
    compiler: Arc<CompilerService>,
    documents: Arc<dyn DocumentSource>,
    imports: ImportLoader,
}

impl JsonnetAnalyzer {
    pub fn new(documents: Arc<dyn DocumentSource>) -> Self {
        let compiler = Arc::new(CompilerService::new());
        let imports = ImportLoader::new(Arc::clone(&compiler), Arc::clone(&documents));
        Self {
            compiler,
            documents,
            imports,
        }
    }

    /// Library search directories for imports not found next to the importer.
    pub fn set_jpath(&self, jpath: Vec<PathBuf>) {
        self.imports.set_jpath(jpath);
    }

    pub fn document_opened(&self, uri: &Url, text: &str, version: i32) -> CompileResult {
        self.compiler.cache(uri, text, version)
    }

    pub fn document_changed(&self, uri: &Url, text: &str, version: i32) -> CompileResult {
        self.compiler.cache(uri, text, version)
    }

    pub fn document_saved(&self, uri: &Url, text: &str, version: i32) -> CompileResult {
        self.compiler.cache(uri, text, version)
    }

    pub fn document_closed(&self, uri: &Url) {
        self.compiler.delete(uri);
    }

    /// Current parse of an open document, refreshed from its buffer.
    pub fn compile(&self, uri: &Url) -> Option<CompileResult> {
        let snapshot = self.documents.get(uri)?;
        Some(self.compiler.cache(uri, &snapshot.text, snapshot.version))
    }

    pub fn hover(&self, uri: &Url, pos: Position) -> Option<HoverInfo> {
        let current = self.compile(uri)?;
        match hover::hover(&current, pos, &self.imports) {
            Ok(info) => info,
            Err(err) => {
                warn!("hover {} at {}: {}", uri, pos, err);
                None
            }
        }
    }

    pub fn complete(&self, uri: &Url, pos: Position) -> Vec<Suggestion> {
        let Some(snapshot) = self.documents.get(uri) else {
            return Vec::new();
        };
        let current = self.compiler.cache(uri, &snapshot.text, snapshot.version);
        let last_success = self.compiler.last_success(uri);
        match completions::complete(&current, last_success.as_deref(), &snapshot.text, pos, &self.imports) {
            Ok(items) => items,
            Err(err) => {
                warn!("completion {} at {}: {}", uri, pos, err);
                Vec::new()
            }
        }
    }
}
