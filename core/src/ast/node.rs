use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ast::Env;
use crate::token::{Span, TokenKind, span_text};

/// Index of a node inside its [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mult,
    Div,
    Percent,
    Plus,
    Minus,
    ShiftL,
    ShiftR,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    In,
    ManifestEqual,
    ManifestUnequal,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        let op = match op {
            "*" => BinaryOp::Mult,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Percent,
            "+" => BinaryOp::Plus,
            "-" => BinaryOp::Minus,
            "<<" => BinaryOp::ShiftL,
            ">>" => BinaryOp::ShiftR,
            ">" => BinaryOp::Greater,
            ">=" => BinaryOp::GreaterEq,
            "<" => BinaryOp::Less,
            "<=" => BinaryOp::LessEq,
            "==" => BinaryOp::ManifestEqual,
            "!=" => BinaryOp::ManifestUnequal,
            "&" => BinaryOp::BitwiseAnd,
            "^" => BinaryOp::BitwiseXor,
            "|" => BinaryOp::BitwiseOr,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Mult => "*",
            BinaryOp::Div => "/",
            BinaryOp::Percent => "%",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::ShiftL => "<<",
            BinaryOp::ShiftR => ">>",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::In => "in",
            BinaryOp::ManifestEqual => "==",
            BinaryOp::ManifestUnequal => "!=",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    BitwiseNot,
    Plus,
    Minus,
}

impl UnaryOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::BitwiseNot),
            "+" => Some(UnaryOp::Plus),
            "-" => Some(UnaryOp::Minus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Double,
    Single,
    Block,
    VerbatimDouble,
    VerbatimSingle,
}

impl StringKind {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::StringDouble => Some(StringKind::Double),
            TokenKind::StringSingle => Some(StringKind::Single),
            TokenKind::StringBlock => Some(StringKind::Block),
            TokenKind::VerbatimStringDouble => Some(StringKind::VerbatimDouble),
            TokenKind::VerbatimStringSingle => Some(StringKind::VerbatimSingle),
            _ => None,
        }
    }
}

/// Field visibility: `:` inherits, `::` hides, `:::` forces visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Inherit,
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `name: e`
    Id,
    /// `"name": e`
    Str,
    /// `[e]: e`
    Computed,
    /// `local name = e`
    Local,
    /// `assert e [: msg]`
    Assert,
}

/// One member of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub kind: FieldKind,
    pub hide: Visibility,
    /// `+:` sugar
    pub plus_super: bool,
    /// Literal name for `Id`, `Str` and `Local` fields.
    pub name: Option<String>,
    /// `Identifier` for `Id`/`Local`, `LiteralString` for `Str`, the key
    /// expression for `Computed`, absent for `Assert`.
    pub key: Option<NodeId>,
    /// Method sugar: `f(x): ...`
    pub params: Option<Vec<NodeId>>,
    /// Field value, local body, or assert condition.
    pub body: NodeId,
    /// Assert message.
    pub message: Option<NodeId>,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `f(a, b=1) [tailstrict]`
    Apply {
        target: NodeId,
        args: Vec<NodeId>,
        trailing_comma: bool,
        tailstrict: bool,
    },
    /// `e { ... }`
    ApplyBrace { left: NodeId, right: NodeId },
    Array { elements: Vec<NodeId>, trailing_comma: bool },
    ArrayComp { body: NodeId, specs: Vec<NodeId> },
    Assert {
        cond: NodeId,
        message: Option<NodeId>,
        rest: NodeId,
    },
    Binary { left: NodeId, op: BinaryOp, right: NodeId },
    Conditional {
        cond: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    Dollar,
    Error { expr: NodeId },
    ForSpec { var: String, expr: NodeId },
    Function { params: Vec<NodeId>, body: NodeId },
    FunctionParam { name: String, default: Option<NodeId> },
    Identifier { name: String },
    IfSpec { expr: NodeId },
    Import { file: NodeId },
    ImportBin { file: NodeId },
    ImportStr { file: NodeId },
    /// `e in super`
    InSuper { index: NodeId },
    /// `target.id` or `target[index]`
    Index {
        target: NodeId,
        index: Option<NodeId>,
        id: Option<NodeId>,
    },
    LiteralBoolean(bool),
    LiteralNull,
    LiteralNumber { value: f64, text: String },
    LiteralString { value: String, kind: StringKind },
    Local { binds: Vec<NodeId>, body: NodeId },
    LocalBind {
        name: String,
        params: Option<Vec<NodeId>>,
        body: NodeId,
        comments: Vec<String>,
    },
    NamedArg { name: String, arg: NodeId },
    Object { fields: Vec<NodeId>, trailing_comma: bool },
    ObjectComp { fields: Vec<NodeId>, specs: Vec<NodeId> },
    ObjectField(ObjectField),
    Parens { inner: NodeId },
    SelfRef,
    Slice {
        target: NodeId,
        begin: Option<NodeId>,
        end: Option<NodeId>,
        step: Option<NodeId>,
    },
    /// `super.id` or `super[index]`
    SuperIndex { index: Option<NodeId>, id: Option<NodeId> },
    Unary { op: UnaryOp, expr: NodeId },
    /// `var` reference; wraps the `Identifier` naming it.
    Var { id: NodeId },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            NodeKind::Apply { target, args, .. } => {
                out.push(*target);
                out.extend(args.iter().copied());
            }
            NodeKind::ApplyBrace { left, right } => out.extend([*left, *right]),
            NodeKind::Array { elements, .. } => out.extend(elements.iter().copied()),
            NodeKind::ArrayComp { body, specs } => {
                out.push(*body);
                out.extend(specs.iter().copied());
            }
            NodeKind::Assert { cond, message, rest } => {
                out.push(*cond);
                out.extend(*message);
                out.push(*rest);
            }
            NodeKind::Binary { left, right, .. } => out.extend([*left, *right]),
            NodeKind::Conditional { cond, then, otherwise } => {
                out.extend([*cond, *then]);
                out.extend(*otherwise);
            }
            NodeKind::Error { expr } | NodeKind::IfSpec { expr } | NodeKind::ForSpec { expr, .. } => out.push(*expr),
            NodeKind::Function { params, body } => {
                out.extend(params.iter().copied());
                out.push(*body);
            }
            NodeKind::FunctionParam { default, .. } => out.extend(*default),
            NodeKind::Import { file } | NodeKind::ImportBin { file } | NodeKind::ImportStr { file } => out.push(*file),
            NodeKind::InSuper { index } => out.push(*index),
            NodeKind::Index { target, index, id } => {
                out.push(*target);
                out.extend(*index);
                out.extend(*id);
            }
            NodeKind::Local { binds, body } => {
                out.extend(binds.iter().copied());
                out.push(*body);
            }
            NodeKind::LocalBind { params, body, .. } => {
                if let Some(params) = params {
                    out.extend(params.iter().copied());
                }
                out.push(*body);
            }
            NodeKind::NamedArg { arg, .. } => out.push(*arg),
            NodeKind::Object { fields, .. } => out.extend(fields.iter().copied()),
            NodeKind::ObjectComp { fields, specs } => {
                out.extend(fields.iter().copied());
                out.extend(specs.iter().copied());
            }
            NodeKind::ObjectField(field) => {
                out.extend(field.key);
                if let Some(params) = &field.params {
                    out.extend(params.iter().copied());
                }
                out.push(field.body);
                out.extend(field.message);
            }
            NodeKind::Parens { inner } => out.push(*inner),
            NodeKind::Slice {
                target,
                begin,
                end,
                step,
            } => {
                out.push(*target);
                out.extend(*begin);
                out.extend(*end);
                out.extend(*step);
            }
            NodeKind::SuperIndex { index, id } => {
                out.extend(*index);
                out.extend(*id);
            }
            NodeKind::Unary { expr, .. } => out.push(*expr),
            NodeKind::Var { id } => out.push(*id),
            NodeKind::Dollar
            | NodeKind::Identifier { .. }
            | NodeKind::LiteralBoolean(_)
            | NodeKind::LiteralNull
            | NodeKind::LiteralNumber { .. }
            | NodeKind::LiteralString { .. }
            | NodeKind::SelfRef => {}
        }
        out
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Apply { .. } => "Apply",
            NodeKind::ApplyBrace { .. } => "ApplyBrace",
            NodeKind::Array { .. } => "Array",
            NodeKind::ArrayComp { .. } => "ArrayComp",
            NodeKind::Assert { .. } => "Assert",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::Dollar => "Dollar",
            NodeKind::Error { .. } => "Error",
            NodeKind::ForSpec { .. } => "ForSpec",
            NodeKind::Function { .. } => "Function",
            NodeKind::FunctionParam { .. } => "FunctionParam",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::IfSpec { .. } => "IfSpec",
            NodeKind::Import { .. } => "Import",
            NodeKind::ImportBin { .. } => "ImportBin",
            NodeKind::ImportStr { .. } => "ImportStr",
            NodeKind::InSuper { .. } => "InSuper",
            NodeKind::Index { .. } => "Index",
            NodeKind::LiteralBoolean(_) => "LiteralBoolean",
            NodeKind::LiteralNull => "LiteralNull",
            NodeKind::LiteralNumber { .. } => "LiteralNumber",
            NodeKind::LiteralString { .. } => "LiteralString",
            NodeKind::Local { .. } => "Local",
            NodeKind::LocalBind { .. } => "LocalBind",
            NodeKind::NamedArg { .. } => "NamedArg",
            NodeKind::Object { .. } => "Object",
            NodeKind::ObjectComp { .. } => "ObjectComp",
            NodeKind::ObjectField(_) => "ObjectField",
            NodeKind::Parens { .. } => "Parens",
            NodeKind::SelfRef => "Self",
            NodeKind::Slice { .. } => "Slice",
            NodeKind::SuperIndex { .. } => "SuperIndex",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Var { .. } => "Var",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Names referenced but not bound inside this subtree.
    pub free_vars: BTreeSet<String>,
}

/// Arena holding one parse of one document.
///
/// Structural fields never change after a node is allocated. `parent` and
/// `env` live in side tables filled by [`annotate`](crate::ast::annotate).
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
    source: Arc<str>,
    file: Option<PathBuf>,
    parents: Vec<Option<NodeId>>,
    envs: Vec<Option<Env>>,
}

impl Ast {
    pub fn new(source: Arc<str>, file: Option<PathBuf>) -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
            source,
            file,
            parents: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let free_vars = self.free_vars_of(&kind);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span, free_vars });
        self.parents.push(None);
        self.envs.push(None);
        id
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub(crate) fn set_annotation(&mut self, id: NodeId, parent: Option<NodeId>, env: Env) {
        self.parents[id.index()] = parent;
        self.envs[id.index()] = Some(env);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn free_vars(&self, id: NodeId) -> &BTreeSet<String> {
        &self.nodes[id.index()].free_vars
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Exact source text of a node.
    pub fn text(&self, id: NodeId) -> String {
        span_text(&self.source, &self.span(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.index()]
    }

    pub fn env(&self, id: NodeId) -> Option<&Env> {
        self.envs[id.index()].as_ref()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Pre-order walk of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Name a binding site introduces: local binds, object locals, function
    /// parameters and `for` variables.
    pub fn bind_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::LocalBind { name, .. } | NodeKind::FunctionParam { name, .. } => Some(name),
            NodeKind::ForSpec { var, .. } => Some(var),
            NodeKind::ObjectField(field) if field.kind == FieldKind::Local => field.name.as_deref(),
            _ => None,
        }
    }

    /// Heading comments attached to a bind or field.
    pub fn comments(&self, id: NodeId) -> &[String] {
        match self.kind(id) {
            NodeKind::LocalBind { comments, .. } => comments,
            NodeKind::ObjectField(field) => &field.comments,
            _ => &[],
        }
    }

    pub fn identifier_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    fn union_free(&self, ids: impl IntoIterator<Item = NodeId>) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for id in ids {
            out.extend(self.free_vars(id).iter().cloned());
        }
        out
    }

    fn param_names(&self, params: &[NodeId]) -> Vec<String> {
        params
            .iter()
            .filter_map(|p| self.bind_name(*p).map(str::to_string))
            .collect()
    }

    /// Free variables of a comprehension: each spec sees the `for` variables
    /// introduced before it, the body sees all of them.
    fn comprehension_free(&self, specs: &[NodeId], inner: BTreeSet<String>) -> BTreeSet<String> {
        let mut bound = BTreeSet::new();
        let mut free = BTreeSet::new();
        for spec in specs {
            let (expr, var) = match self.kind(*spec) {
                NodeKind::ForSpec { var, expr } => (*expr, Some(var)),
                NodeKind::IfSpec { expr } => (*expr, None),
                _ => continue,
            };
            free.extend(self.free_vars(expr).difference(&bound).cloned());
            if let Some(var) = var {
                bound.insert(var.clone());
            }
        }
        free.extend(inner.difference(&bound).cloned());
        free
    }

    fn free_vars_of(&self, kind: &NodeKind) -> BTreeSet<String> {
        match kind {
            NodeKind::Var { id } => self.identifier_name(*id).map(str::to_string).into_iter().collect(),
            NodeKind::Local { binds, body } => {
                let mut free = self.union_free(binds.iter().copied().chain([*body]));
                for bind in binds {
                    if let Some(name) = self.bind_name(*bind) {
                        free.remove(name);
                    }
                }
                free
            }
            NodeKind::LocalBind {
                params: Some(params),
                body,
                ..
            }
            | NodeKind::Function { params, body } => {
                let mut free = self.union_free(params.iter().copied().chain([*body]));
                for name in self.param_names(params) {
                    free.remove(&name);
                }
                free
            }
            NodeKind::ObjectField(field) => {
                let mut value = self.union_free(field.params.iter().flatten().copied().chain([field.body]));
                if let Some(params) = &field.params {
                    for name in self.param_names(params) {
                        value.remove(&name);
                    }
                }
                value.extend(self.union_free(field.key.into_iter().chain(field.message)));
                value
            }
            NodeKind::Object { fields, .. } => {
                let mut free = self.union_free(fields.iter().copied());
                for field in fields {
                    if let Some(name) = self.bind_name(*field) {
                        free.remove(name);
                    }
                }
                free
            }
            NodeKind::ObjectComp { fields, specs } => {
                let mut inner = self.union_free(fields.iter().copied());
                for field in fields {
                    if let Some(name) = self.bind_name(*field) {
                        inner.remove(name);
                    }
                }
                self.comprehension_free(specs, inner)
            }
            NodeKind::ArrayComp { body, specs } => self.comprehension_free(specs, self.free_vars(*body).clone()),
            other => self.union_free(other.children()),
        }
    }
}
