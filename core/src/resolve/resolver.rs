//! Static symbol resolution.
//!
//! Follows variable references through their binding sites, and member
//! accesses through the (possibly merged) field sets of object literals.
//! Nothing is evaluated: a name bound to a function parameter stays free,
//! and any expression that is not a reference is its own value.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{Ast, BinaryOp, BindingSite, Env, NodeId, NodeKind};
use crate::resolve::{FieldSet, ImportResolver, InternalError};
use crate::token::Span;

/// Chains longer than this are treated as cycles.
const MAX_DEPTH: usize = 64;

/// A node together with the tree that owns it.
#[derive(Clone)]
pub struct NodeRef {
    pub tree: Arc<Ast>,
    pub id: NodeId,
}

impl NodeRef {
    pub fn new(tree: Arc<Ast>, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn root(tree: Arc<Ast>) -> Self {
        let id = tree.root();
        Self { tree, id }
    }

    /// Another node of the same tree.
    pub fn with(&self, id: NodeId) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            id,
        }
    }

    /// The node a binding site names, in whichever tree it lives.
    pub fn site(&self, site: &BindingSite) -> Self {
        match &site.tree {
            Some(tree) => Self::new(Arc::clone(tree), site.node),
            None => self.with(site.node),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        self.tree.kind(self.id)
    }

    pub fn span(&self) -> Span {
        self.tree.span(self.id)
    }

    pub fn text(&self) -> String {
        self.tree.text(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.tree.parent(self.id).map(|p| self.with(p))
    }

    pub fn env(&self) -> Option<&Env> {
        self.tree.env(self.id)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.tree, &other.tree)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} at {}", self.kind().name(), self.id, self.span())
    }
}

/// Outcome of resolving one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The expression the node stands for.
    Node(NodeRef),
    /// Bound to a function parameter or loop variable. Holds the binding
    /// site; there is no static value.
    Free(NodeRef),
    /// The name is not in scope.
    Unbound,
    /// The member target has fields, but not this one.
    MissingField,
    /// The member target does not resolve to anything with fields.
    Unresolvable,
    /// Not something the resolver looks through.
    Unsupported,
}

impl Resolution {
    pub fn node(&self) -> Option<&NodeRef> {
        match self {
            Resolution::Node(node) => Some(node),
            _ => None,
        }
    }
}

pub struct Resolver<'a> {
    imports: &'a dyn ImportResolver,
}

impl<'a> Resolver<'a> {
    pub fn new(imports: &'a dyn ImportResolver) -> Self {
        Self { imports }
    }

    /// The node `node` refers to, or `None` when it is free or unresolved.
    pub fn resolve(&self, node: &NodeRef) -> Result<Option<NodeRef>, InternalError> {
        Ok(self.resolution(node)?.node().cloned())
    }

    pub fn resolution(&self, node: &NodeRef) -> Result<Resolution, InternalError> {
        self.resolve_at(node, 0)
    }

    /// Fields of the object `node` evaluates to, if it statically is one.
    pub fn field_set(&self, node: &NodeRef) -> Result<Option<FieldSet>, InternalError> {
        self.fields_at(node, 0)
    }

    fn resolve_at(&self, node: &NodeRef, depth: usize) -> Result<Resolution, InternalError> {
        if depth > MAX_DEPTH {
            debug!("resolution of {:?} gave up after {} steps", node, MAX_DEPTH);
            return Ok(Resolution::Unresolvable);
        }
        match node.kind() {
            NodeKind::Identifier { name } => {
                let Some(parent) = node.parent() else {
                    return Ok(Resolution::Unsupported);
                };
                match parent.kind() {
                    NodeKind::Var { .. } => self.resolve_var(node, name, depth),
                    NodeKind::Index {
                        target, id: Some(id), ..
                    } if *id == node.id => self.resolve_member(&parent.with(*target), name, depth),
                    _ => Ok(Resolution::Unsupported),
                }
            }
            NodeKind::Var { id } => self.resolve_at(&node.with(*id), depth + 1),
            NodeKind::Index { id: Some(id), .. } => self.resolve_at(&node.with(*id), depth + 1),
            NodeKind::Index {
                target,
                index: Some(index),
                id: None,
            } => match node.tree.kind(*index) {
                NodeKind::LiteralString { value, .. } => self.resolve_member(&node.with(*target), value, depth),
                _ => Ok(Resolution::Unsupported),
            },
            NodeKind::LocalBind { .. } => Ok(Resolution::Node(node.clone())),
            _ => Ok(Resolution::Unsupported),
        }
    }

    fn resolve_var(&self, node: &NodeRef, name: &str, depth: usize) -> Result<Resolution, InternalError> {
        let Some(site) = node.env().and_then(|env| env.lookup(name)) else {
            return Ok(Resolution::Unbound);
        };
        let bind = node.site(site);
        self.follow_binding(&bind, depth + 1)
    }

    fn follow_binding(&self, bind: &NodeRef, depth: usize) -> Result<Resolution, InternalError> {
        match bind.kind() {
            // sugared function binds stand for the function they define
            NodeKind::LocalBind { params: Some(_), .. } => Ok(Resolution::Node(bind.clone())),
            NodeKind::LocalBind { body, .. } => self.value_of(&bind.with(*body), depth + 1),
            NodeKind::ObjectField(field) if field.params.is_some() => Ok(Resolution::Node(bind.clone())),
            NodeKind::ObjectField(field) => self.value_of(&bind.with(field.body), depth + 1),
            NodeKind::FunctionParam { .. } | NodeKind::ForSpec { .. } => Ok(Resolution::Free(bind.clone())),
            other => Err(InternalError::new(
                format!("{} is not a binding site", other.name()),
                bind.span(),
            )),
        }
    }

    /// What a bind body stands for.
    fn value_of(&self, expr: &NodeRef, depth: usize) -> Result<Resolution, InternalError> {
        if depth > MAX_DEPTH {
            return Ok(Resolution::Unresolvable);
        }
        match expr.kind() {
            NodeKind::Import { file } => Ok(match self.load(expr, *file) {
                Some(tree) => Resolution::Node(NodeRef::root(tree)),
                None => Resolution::Unresolvable,
            }),
            NodeKind::Var { .. } | NodeKind::Index { .. } => self.resolve_at(expr, depth + 1),
            NodeKind::Parens { inner } => self.value_of(&expr.with(*inner), depth + 1),
            NodeKind::Binary { op: BinaryOp::Plus, .. } => Ok(Resolution::Node(expr.clone())),
            NodeKind::Binary { op, .. } => Err(InternalError::new(
                format!("cannot follow a binding to binary operator {}", op.as_str()),
                expr.span(),
            )),
            _ => Ok(Resolution::Node(expr.clone())),
        }
    }

    fn resolve_member(&self, target: &NodeRef, name: &str, depth: usize) -> Result<Resolution, InternalError> {
        let Some(fields) = self.fields_at(target, depth + 1)? else {
            return Ok(Resolution::Unresolvable);
        };
        match fields.get(name) {
            Some(field) => Ok(Resolution::Node(field.value())),
            None if fields.is_merged() => Err(InternalError::new(
                format!("field {} not found exactly once in merged object", name),
                target.span(),
            )),
            None => Ok(Resolution::MissingField),
        }
    }

    fn fields_at(&self, node: &NodeRef, depth: usize) -> Result<Option<FieldSet>, InternalError> {
        if depth > MAX_DEPTH {
            debug!("field lookup on {:?} gave up after {} steps", node, MAX_DEPTH);
            return Ok(None);
        }
        match node.kind() {
            NodeKind::Object { .. } => Ok(Some(FieldSet::from_object(node))),
            NodeKind::Binary {
                left,
                op: BinaryOp::Plus,
                right,
            }
            | NodeKind::ApplyBrace { left, right } => {
                let left = self.fields_at(&node.with(*left), depth + 1)?;
                let right = self.fields_at(&node.with(*right), depth + 1)?;
                Ok(match (left, right) {
                    (Some(left), Some(right)) => Some(left.merge(right)),
                    _ => None,
                })
            }
            NodeKind::Local { body, .. } | NodeKind::Parens { inner: body } => {
                self.fields_at(&node.with(*body), depth + 1)
            }
            NodeKind::Var { .. } | NodeKind::Index { .. } => match self.resolve_at(node, depth + 1)? {
                Resolution::Node(value) => self.fields_at(&value, depth + 1),
                _ => Ok(None),
            },
            NodeKind::Dollar => self.fields_at(&NodeRef::root(Arc::clone(&node.tree)), depth + 1),
            NodeKind::SelfRef => {
                let mut current = node.parent();
                while let Some(ancestor) = current {
                    match ancestor.kind() {
                        NodeKind::Object { .. } => return self.fields_at(&ancestor, depth + 1),
                        NodeKind::ObjectComp { .. } => return Ok(None),
                        _ => current = ancestor.parent(),
                    }
                }
                Ok(None)
            }
            NodeKind::Import { file } => match self.load(node, *file) {
                Some(tree) => self.fields_at(&NodeRef::root(tree), depth + 1),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn load(&self, import: &NodeRef, file: NodeId) -> Option<Arc<Ast>> {
        let NodeKind::LiteralString { value, .. } = import.tree.kind(file) else {
            return None;
        };
        let loaded = self.imports.import(import.tree.file(), value);
        if loaded.is_none() {
            debug!("could not load import {:?}", value);
        }
        loaded
    }
}

/// The construct that defines `node`: a bind, field or function whose body
/// `node` is, walking outwards while that holds. Anything else is its own
/// definition.
pub fn defining_construct(node: &NodeRef) -> NodeRef {
    let mut current = node.clone();
    while let Some(parent) = current.parent() {
        let body = match parent.kind() {
            NodeKind::LocalBind { body, .. } | NodeKind::Function { body, .. } => *body,
            NodeKind::ObjectField(field) => field.body,
            _ => break,
        };
        if body != current.id {
            break;
        }
        current = parent;
    }
    current
}
