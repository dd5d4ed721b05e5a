use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use jsonnet_core::ast::{parse_source, Ast};
use jsonnet_core::resolve::ImportResolver;
use url::Url;
use tracing::debug;

use super::compiler::{CompileResult, CompilerService};
use super::utils::compute_content_hash;
use super::DocumentSource;

struct DiskEntry {
    hash: u64,
    tree: Arc<Ast>,
}

/// Finds imported files next to the importer, then in each library
/// directory. Open buffers take precedence over the file on disk.
pub(crate) struct ImportLoader {
    compiler: Arc<CompilerService>,
    documents: Arc<dyn DocumentSource>,
    jpath: RwLock<Vec<PathBuf>>,
    disk: DashMap<PathBuf, DiskEntry>,
}

impl ImportLoader {
    pub(crate) fn new(compiler: Arc<CompilerService>, documents: Arc<dyn DocumentSource>) -> Self {
        Self {
            compiler,
            documents,
            jpath: RwLock::new(Vec::new()),
            disk: DashMap::new(),
        }
    }

    pub(crate) fn set_jpath(&self, jpath: Vec<PathBuf>) {
        if let Ok(mut guard) = self.jpath.write() {
            *guard = jpath;
        }
    }

    fn candidates(&self, importer: Option<&Path>, path: &str) -> Vec<PathBuf> {
        let requested = Path::new(path);
        if requested.is_absolute() {
            return vec![requested.to_path_buf()];
        }
        let mut out = Vec::new();
        if let Some(dir) = importer.and_then(Path::parent) {
            out.push(dir.join(requested));
        }
        if let Ok(jpath) = self.jpath.read() {
            out.extend(jpath.iter().map(|dir| dir.join(requested)));
        }
        out
    }

    fn load_open(&self, path: &Path) -> Option<Arc<Ast>> {
        let uri = Url::from_file_path(path).ok()?;
        let snapshot = self.documents.get(&uri)?;
        match self.compiler.cache(&uri, &snapshot.text, snapshot.version) {
            CompileResult::Parsed(doc) => Some(Arc::clone(&doc.tree)),
            CompileResult::Failed(_) => self.compiler.last_success(&uri).map(|doc| Arc::clone(&doc.tree)),
        }
    }

    fn load_disk(&self, path: &Path) -> Option<Arc<Ast>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                debug!("cannot read {}: {}", path.display(), err);
                return None;
            }
        };
        let hash = compute_content_hash(&text);
        if let Some(entry) = self.disk.get(path) {
            if entry.hash == hash {
                return Some(Arc::clone(&entry.tree));
            }
        }
        match parse_source(&text, Some(path.to_path_buf())) {
            Ok(tree) => {
                let tree = Arc::new(tree);
                self.disk.insert(
                    path.to_path_buf(),
                    DiskEntry {
                        hash,
                        tree: Arc::clone(&tree),
                    },
                );
                Some(tree)
            }
            Err(err) => {
                debug!("import {} does not parse: {}", path.display(), err);
                None
            }
        }
    }
}

impl ImportResolver for ImportLoader {
    fn import(&self, importer: Option<&Path>, path: &str) -> Option<Arc<Ast>> {
        for candidate in self.candidates(importer, path) {
            if let Some(tree) = self.load_open(&candidate) {
                return Some(tree);
            }
            if candidate.is_file() {
                return self.load_disk(&candidate);
            }
        }
        debug!("import {:?} not found", path);
        None
    }
}
