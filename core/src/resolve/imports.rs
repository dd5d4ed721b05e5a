use std::path::Path;
use std::sync::Arc;

use crate::ast::Ast;

/// Loads the tree an `import` expression points at.
pub trait ImportResolver: Send + Sync {
    /// `importer` is the file holding the import expression, when known.
    /// Returns `None` when the file cannot be found or does not parse.
    fn import(&self, importer: Option<&Path>, path: &str) -> Option<Arc<Ast>>;
}

/// Resolver for contexts without a file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn import(&self, _importer: Option<&Path>, _path: &str) -> Option<Arc<Ast>> {
        None
    }
}

impl<F> ImportResolver for F
where
    F: Fn(Option<&Path>, &str) -> Option<Arc<Ast>> + Send + Sync,
{
    fn import(&self, importer: Option<&Path>, path: &str) -> Option<Arc<Ast>> {
        self(importer, path)
    }
}
