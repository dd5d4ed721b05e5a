use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{Ast, NodeId};

/// Where a name was bound.
///
/// `tree` is set when the site lives in a different tree than the node whose
/// environment holds it, e.g. when a partial parse borrows the scope of the
/// last successful parse.
#[derive(Clone)]
pub struct BindingSite {
    pub node: NodeId,
    pub tree: Option<Arc<Ast>>,
}

impl BindingSite {
    pub fn local(node: NodeId) -> Self {
        Self { node, tree: None }
    }

    pub fn is_foreign(&self) -> bool {
        self.tree.is_some()
    }
}

impl PartialEq for BindingSite {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
            && match (&self.tree, &other.tree) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for BindingSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_foreign() {
            write!(f, "foreign {}", self.node)
        } else {
            write!(f, "{}", self.node)
        }
    }
}

/// Persistent name -> binding site map. Extending shares the outer frames.
#[derive(Clone, Default, PartialEq)]
pub struct Env {
    frame: Option<Arc<Frame>>,
}

#[derive(PartialEq)]
struct Frame {
    names: BTreeMap<String, BindingSite>,
    outer: Env,
}

impl Env {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// New environment where `binds` shadow everything in `self`.
    pub fn extend<I>(&self, binds: I) -> Env
    where
        I: IntoIterator<Item = (String, NodeId)>,
    {
        self.extend_sites(binds.into_iter().map(|(name, node)| (name, BindingSite::local(node))))
    }

    pub fn extend_sites<I>(&self, binds: I) -> Env
    where
        I: IntoIterator<Item = (String, BindingSite)>,
    {
        let names: BTreeMap<String, BindingSite> = binds.into_iter().collect();
        if names.is_empty() {
            return self.clone();
        }
        Env {
            frame: Some(Arc::new(Frame {
                names,
                outer: self.clone(),
            })),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&BindingSite> {
        let mut env = self;
        while let Some(frame) = &env.frame {
            if let Some(site) = frame.names.get(name) {
                return Some(site);
            }
            env = &frame.outer;
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every visible name, innermost binding wins.
    pub fn bindings(&self) -> BTreeMap<String, BindingSite> {
        let mut out = BTreeMap::new();
        let mut env = self;
        while let Some(frame) = &env.frame {
            for (name, site) in &frame.names {
                out.entry(name.clone()).or_insert_with(|| site.clone());
            }
            env = &frame.outer;
        }
        out
    }

    /// Flatten into one frame whose local sites point into `tree`.
    pub fn foreign(&self, tree: &Arc<Ast>) -> Env {
        Env::empty().extend_sites(self.bindings().into_iter().map(|(name, mut site)| {
            if site.tree.is_none() {
                site.tree = Some(Arc::clone(tree));
            }
            (name, site)
        }))
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.bindings()).finish()
    }
}
