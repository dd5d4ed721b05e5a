use std::sync::Arc;

use dashmap::DashMap;
use jsonnet_core::ast::{parse_source, Ast, StaticError};
use url::Url;
use tracing::debug;

use super::utils::compute_content_hash;

/// A document version that parsed.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub uri: Url,
    pub version: i32,
    pub tree: Arc<Ast>,
}

/// A document version that did not parse.
#[derive(Debug, Clone)]
pub struct FailedParsedDocument {
    pub uri: Url,
    pub version: i32,
    pub error: StaticError,
}

#[derive(Debug, Clone)]
pub enum CompileResult {
    Parsed(Arc<ParsedDocument>),
    Failed(Arc<FailedParsedDocument>),
}

impl CompileResult {
    pub fn version(&self) -> i32 {
        match self {
            CompileResult::Parsed(doc) => doc.version,
            CompileResult::Failed(doc) => doc.version,
        }
    }

    pub fn error(&self) -> Option<&StaticError> {
        match self {
            CompileResult::Parsed(_) => None,
            CompileResult::Failed(doc) => Some(&doc.error),
        }
    }

    /// Same result under a new version number.
    fn retagged(&self, version: i32) -> CompileResult {
        match self {
            CompileResult::Parsed(doc) => CompileResult::Parsed(Arc::new(ParsedDocument {
                version,
                ..(**doc).clone()
            })),
            CompileResult::Failed(doc) => CompileResult::Failed(Arc::new(FailedParsedDocument {
                version,
                ..(**doc).clone()
            })),
        }
    }
}

struct CacheEntry {
    current: CompileResult,
    last_success: Option<Arc<ParsedDocument>>,
    content_hash: u64,
}

/// Parse cache keyed by document. Each entry holds the latest parse and the
/// latest parse that succeeded.
#[derive(Default)]
pub struct CompilerService {
    entries: DashMap<Url, CacheEntry>,
}

impl CompilerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` as `version` of `uri`, reusing the cached result when the
    /// version or the content is unchanged.
    pub fn cache(&self, uri: &Url, text: &str, version: i32) -> CompileResult {
        let hash = compute_content_hash(text);
        if let Some(mut entry) = self.entries.get_mut(uri) {
            if entry.current.version() == version {
                return entry.current.clone();
            }
            if entry.content_hash == hash {
                entry.current = entry.current.retagged(version);
                return entry.current.clone();
            }
        }

        let file = uri.to_file_path().ok();
        let result = match parse_source(text, file) {
            Ok(tree) => {
                debug!("parsed {} v{}", uri, version);
                CompileResult::Parsed(Arc::new(ParsedDocument {
                    uri: uri.clone(),
                    version,
                    tree: Arc::new(tree),
                }))
            }
            Err(error) => {
                debug!("{} v{} does not parse: {}", uri, version, error);
                CompileResult::Failed(Arc::new(FailedParsedDocument {
                    uri: uri.clone(),
                    version,
                    error,
                }))
            }
        };

        let last_success = match &result {
            CompileResult::Parsed(doc) => Some(Arc::clone(doc)),
            CompileResult::Failed(_) => self.last_success(uri),
        };
        self.entries.insert(
            uri.clone(),
            CacheEntry {
                current: result.clone(),
                last_success,
                content_hash: hash,
            },
        );
        result
    }

    pub fn current(&self, uri: &Url) -> Option<CompileResult> {
        self.entries.get(uri).map(|entry| entry.current.clone())
    }

    /// Most recent successful parse, whatever the current state.
    pub fn last_success(&self, uri: &Url) -> Option<Arc<ParsedDocument>> {
        self.entries.get(uri).and_then(|entry| entry.last_success.clone())
    }

    pub fn delete(&self, uri: &Url) {
        self.entries.remove(uri);
    }
}
