use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ast::{
    Ast, BinaryOp, Env, FieldKind, NodeId, NodeKind, ObjectField, StaticError, StringKind, UnaryOp, Visibility, annotate,
};
use crate::token::{Position, Span, Token, TokenKind, Tokenizer};
use tracing::debug;

/// Failure inside one parser run. `rest` points into the parser's arena.
struct Failure {
    message: String,
    span: Span,
    rest: Option<NodeId>,
}

type PResult<T> = std::result::Result<T, Failure>;

/// Annotated tree rooted at the partial expression of a failed run.
fn partial_tree(mut ast: Ast, root: Option<NodeId>) -> Option<Arc<Ast>> {
    let root = root?;
    ast.set_root(root);
    annotate(&mut ast, root, None, Env::empty());
    Some(Arc::new(ast))
}

/// Lex, parse and annotate a document.
pub fn parse(text: &str) -> Result<Ast, StaticError> {
    parse_source(text, None)
}

/// Like [`parse`], remembering the file the text came from so imports can be
/// resolved relative to it.
pub fn parse_source(text: &str, file: Option<PathBuf>) -> Result<Ast, StaticError> {
    let tokens = Tokenizer::tokenize(text);
    Parser::new(tokens, Ast::new(Arc::from(text), file)).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    /// Comments immediately preceding `tokens[i]`.
    comments: Vec<Vec<String>>,
    pos: usize,
    len: usize,
    last_end: Position,
    ast: Ast,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, ast: Ast) -> Self {
        let mut kept = Vec::with_capacity(tokens.len());
        let mut comments = Vec::with_capacity(tokens.len());
        let mut pending = Vec::new();
        for token in tokens {
            if token.kind.is_comment() {
                pending.push(token.text);
                continue;
            }
            kept.push(token);
            comments.push(std::mem::take(&mut pending));
        }
        if kept.last().map(|t| t.kind) != Some(TokenKind::EndOfFile) {
            let end = kept.last().map(|t| t.span.end).unwrap_or_else(Position::start);
            kept.push(Token::new(TokenKind::EndOfFile, "", Span::single(end)));
            comments.push(pending);
        }
        let len = kept.len();
        Self {
            tokens: kept,
            comments,
            pos: 0,
            len,
            last_end: Position::start(),
            ast,
        }
    }

    pub fn parse(mut self) -> Result<Ast, StaticError> {
        if let Some(index) = self.tokens.iter().position(|t| t.kind == TokenKind::Invalid) {
            return Err(self.parse_before_invalid(index));
        }

        match self.parse_document() {
            Ok(root) => {
                let mut ast = self.ast;
                ast.set_root(root);
                annotate(&mut ast, root, None, Env::empty());
                Ok(ast)
            }
            Err(failure) => {
                debug!("parse failed at {}: {}", failure.span, failure.message);
                Err(StaticError::Parse {
                    message: failure.message,
                    span: failure.span,
                    rest: partial_tree(self.ast, failure.rest),
                })
            }
        }
    }

    /// The malformed token is the error. The tokens before it are still
    /// parsed as if the document ended there, so a dangling `.` right in
    /// front of it keeps its partial tree.
    fn parse_before_invalid(mut self, index: usize) -> StaticError {
        let bad = self.tokens[index].clone();
        self.tokens.truncate(index);
        self.tokens.push(Token::new(TokenKind::EndOfFile, "", Span::single(bad.span.start)));
        self.comments.truncate(index + 1);
        self.len = self.tokens.len();

        let rest = match self.parse_document() {
            Ok(_) => None,
            Err(failure) => {
                debug!("partial parse before {} stopped at {}: {}", bad.span, failure.span, failure.message);
                partial_tree(self.ast, failure.rest)
            }
        };
        StaticError::Lex {
            message: bad.text,
            span: bad.span,
            rest,
        }
    }

    fn parse_document(&mut self) -> PResult<NodeId> {
        let expr = self.parse_expr()?;
        if self.peek().kind != TokenKind::EndOfFile {
            return Err(self.err(format!("Did not expect: {}", self.peek())));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> PResult<NodeId> {
        self.parse_or()
    }

    /// - `expr || expr`
    fn parse_or(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["||"], Self::parse_and)
    }

    /// - `expr && expr`
    fn parse_and(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["&&"], Self::parse_bit_or)
    }

    /// - `expr | expr`
    fn parse_bit_or(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["|"], Self::parse_bit_xor)
    }

    /// - `expr ^ expr`
    fn parse_bit_xor(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["^"], Self::parse_bit_and)
    }

    /// - `expr & expr`
    fn parse_bit_and(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["&"], Self::parse_equality)
    }

    /// - `expr == expr`
    /// - `expr != expr`
    fn parse_equality(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["==", "!="], Self::parse_relational)
    }

    /// - `expr < expr`, `<=`, `>`, `>=`
    /// - `expr in expr`
    /// - `expr in super`
    fn parse_relational(&mut self) -> PResult<NodeId> {
        let start = self.peek().span.start;
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Operator if matches!(self.peek().text.as_str(), "<" | "<=" | ">" | ">=") => {
                    BinaryOp::from_operator(&self.peek().text)
                }
                TokenKind::In => Some(BinaryOp::In),
                _ => None,
            };
            let Some(op) = op else { break };
            self.pop();
            if op == BinaryOp::In && self.peek().kind == TokenKind::Super {
                self.pop();
                left = self.alloc(NodeKind::InSuper { index: left }, start);
                continue;
            }
            let right = self.parse_shift()?;
            left = self.alloc(NodeKind::Binary { left, op, right }, start);
        }
        Ok(left)
    }

    /// - `expr << expr`
    /// - `expr >> expr`
    fn parse_shift(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["<<", ">>"], Self::parse_add_sub)
    }

    /// - `expr + expr`
    /// - `expr - expr`
    fn parse_add_sub(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["+", "-"], Self::parse_mul_div)
    }

    /// - `expr * expr`
    /// - `expr / expr`
    /// - `expr % expr`
    fn parse_mul_div(&mut self) -> PResult<NodeId> {
        self.parse_binary_level(&["*", "/", "%"], Self::parse_unary)
    }

    /// Left-associative run of `ops` over operands parsed by `next`.
    fn parse_binary_level(&mut self, ops: &[&str], next: fn(&mut Self) -> PResult<NodeId>) -> PResult<NodeId> {
        let start = self.peek().span.start;
        let mut left = next(self)?;
        loop {
            let token = self.peek();
            if token.kind != TokenKind::Operator || !ops.contains(&token.text.as_str()) {
                break;
            }
            let Some(op) = BinaryOp::from_operator(&token.text) else {
                break;
            };
            self.pop();
            let right = next(self)?;
            left = self.alloc(NodeKind::Binary { left, op, right }, start);
        }
        Ok(left)
    }

    /// - `-expr`, `+expr`, `!expr`, `~expr`
    fn parse_unary(&mut self) -> PResult<NodeId> {
        let token = self.peek();
        if token.kind == TokenKind::Operator
            && let Some(op) = UnaryOp::from_operator(&token.text)
        {
            let start = token.span.start;
            self.pop();
            let expr = self.parse_unary()?;
            return Ok(self.alloc(NodeKind::Unary { op, expr }, start));
        }
        self.parse_postfix()
    }

    /// - `expr.id`
    /// - `expr[index]`, `expr[a:b:c]`
    /// - `expr(args) [tailstrict]`
    /// - `expr { ... }`
    ///
    /// A dot with no identifier after it fails, carrying the expression
    /// before the dot as the partial tree. Only the next token is checked:
    /// in `{ a: o.\n  b: 2 }` the dot takes `b` as its member, so the failure
    /// surfaces at the `:` with no partial tree and completion there is empty.
    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let start = self.peek().span.start;
        let mut expr = self.parse_terminal()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.pop();
                    if self.peek().kind != TokenKind::Identifier {
                        let mut failure = self.err(format!("Expected token IDENTIFIER but got {}", self.peek()));
                        failure.rest = Some(expr);
                        return Err(failure);
                    }
                    let id = self.parse_identifier()?;
                    expr = self.alloc(
                        NodeKind::Index {
                            target: expr,
                            index: None,
                            id: Some(id),
                        },
                        start,
                    );
                }
                TokenKind::BracketL => expr = self.parse_index(expr, start)?,
                TokenKind::ParenL => expr = self.parse_call(expr, start)?,
                TokenKind::BraceL => {
                    let right = self.parse_object()?;
                    expr = self.alloc(NodeKind::ApplyBrace { left: expr, right }, start);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// - `target[index]`
    /// - `target[begin:end:step]` with every part optional
    fn parse_index(&mut self, target: NodeId, start: Position) -> PResult<NodeId> {
        self.pop(); // [
        let mut begin = None;
        if !self.is_operator(":") && !self.is_operator("::") {
            begin = Some(self.parse_expr()?);
        }
        if begin.is_some() && self.peek().kind == TokenKind::BracketR {
            self.pop();
            return Ok(self.alloc(
                NodeKind::Index {
                    target,
                    index: begin,
                    id: None,
                },
                start,
            ));
        }

        let (mut end, mut step) = (None, None);
        if self.is_operator("::") {
            self.pop();
            if self.peek().kind != TokenKind::BracketR {
                step = Some(self.parse_expr()?);
            }
        } else if self.is_operator(":") {
            self.pop();
            if self.peek().kind != TokenKind::BracketR && !self.is_operator(":") {
                end = Some(self.parse_expr()?);
            }
            if self.is_operator(":") {
                self.pop();
                if self.peek().kind != TokenKind::BracketR {
                    step = Some(self.parse_expr()?);
                }
            }
        } else {
            return Err(self.err(format!("Expected ] or : in index but got {}", self.peek())));
        }
        self.expect(TokenKind::BracketR)?;
        Ok(self.alloc(
            NodeKind::Slice {
                target,
                begin,
                end,
                step,
            },
            start,
        ))
    }

    /// - `target(a, b, name=c) [tailstrict]`
    fn parse_call(&mut self, target: NodeId, start: Position) -> PResult<NodeId> {
        self.pop(); // (
        let mut args = Vec::new();
        let mut named = false;
        let mut trailing_comma = false;
        loop {
            if self.peek().kind == TokenKind::ParenR {
                self.pop();
                break;
            }
            trailing_comma = false;
            let arg = if self.peek().kind == TokenKind::Identifier && self.peek_operator_at(1, "=") {
                let arg_start = self.peek().span.start;
                let name = self.pop().text;
                self.pop(); // =
                let arg = self.parse_expr()?;
                named = true;
                self.alloc(NodeKind::NamedArg { name, arg }, arg_start)
            } else {
                if named {
                    return Err(self.err("Positional argument after a named argument is not allowed".to_string()));
                }
                self.parse_expr()?
            };
            args.push(arg);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.pop();
                    trailing_comma = true;
                }
                TokenKind::ParenR => {
                    self.pop();
                    break;
                }
                _ => {
                    return Err(self.err(format!(
                        "Expected a comma before next function argument, got {}",
                        self.peek()
                    )));
                }
            }
        }
        let tailstrict = self.peek().kind == TokenKind::TailStrict;
        if tailstrict {
            self.pop();
        }
        Ok(self.alloc(
            NodeKind::Apply {
                target,
                args,
                trailing_comma,
                tailstrict,
            },
            start,
        ))
    }

    /// - literals, `self`, `$`, `super.x`, variables
    /// - `(expr)`, `[...]`, `{...}`
    /// - `local`, `if`, `function`, `assert`, `error`, `import*`
    fn parse_terminal(&mut self) -> PResult<NodeId> {
        let token = self.peek().clone();
        let start = token.span.start;
        match token.kind {
            TokenKind::BraceL => self.parse_object(),
            TokenKind::BracketL => self.parse_array(),
            TokenKind::ParenL => {
                self.pop();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::ParenR)?;
                Ok(self.alloc(NodeKind::Parens { inner }, start))
            }
            TokenKind::Number => {
                self.pop();
                let value = token.text.parse::<f64>().map_err(|_| Failure {
                    message: format!("Could not parse number: {}", token.text),
                    span: token.span,
                    rest: None,
                })?;
                Ok(self.alloc(
                    NodeKind::LiteralNumber {
                        value,
                        text: token.text,
                    },
                    start,
                ))
            }
            k if k.is_string() => self.parse_string(),
            TokenKind::True => self.parse_leaf(NodeKind::LiteralBoolean(true)),
            TokenKind::False => self.parse_leaf(NodeKind::LiteralBoolean(false)),
            TokenKind::Null => self.parse_leaf(NodeKind::LiteralNull),
            TokenKind::SelfRef => self.parse_leaf(NodeKind::SelfRef),
            TokenKind::Dollar => self.parse_leaf(NodeKind::Dollar),
            TokenKind::Super => self.parse_super(),
            TokenKind::Identifier => {
                let id = self.parse_identifier()?;
                Ok(self.alloc(NodeKind::Var { id }, start))
            }
            TokenKind::Local => self.parse_local(),
            TokenKind::If => self.parse_conditional(),
            TokenKind::Function => {
                self.pop();
                let params = self.parse_params()?;
                let body = self.parse_expr()?;
                Ok(self.alloc(NodeKind::Function { params, body }, start))
            }
            TokenKind::Assert => {
                self.pop();
                let cond = self.parse_expr()?;
                let message = if self.is_operator(":") {
                    self.pop();
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon)?;
                let rest = self.parse_expr()?;
                Ok(self.alloc(NodeKind::Assert { cond, message, rest }, start))
            }
            TokenKind::Error => {
                self.pop();
                let expr = self.parse_expr()?;
                Ok(self.alloc(NodeKind::Error { expr }, start))
            }
            TokenKind::Import | TokenKind::ImportStr | TokenKind::ImportBin => self.parse_import(),
            _ => Err(self.err(format!("Unexpected: {}", token))),
        }
    }

    fn parse_leaf(&mut self, kind: NodeKind) -> PResult<NodeId> {
        let start = self.pop().span.start;
        Ok(self.alloc(kind, start))
    }

    fn parse_identifier(&mut self) -> PResult<NodeId> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(self.ast.alloc(NodeKind::Identifier { name: token.text }, token.span))
    }

    fn parse_string(&mut self) -> PResult<NodeId> {
        let token = self.pop();
        let Some(kind) = StringKind::from_token(token.kind) else {
            return Err(Failure {
                message: format!("Expected a string but got {}", token),
                span: token.span,
                rest: None,
            });
        };
        Ok(self.ast.alloc(NodeKind::LiteralString { value: token.text, kind }, token.span))
    }

    /// - `super.id`
    /// - `super[index]`
    fn parse_super(&mut self) -> PResult<NodeId> {
        let start = self.pop().span.start;
        match self.peek().kind {
            TokenKind::Dot => {
                self.pop();
                let id = self.parse_identifier()?;
                Ok(self.alloc(NodeKind::SuperIndex { index: None, id: Some(id) }, start))
            }
            TokenKind::BracketL => {
                self.pop();
                let index = self.parse_expr()?;
                self.expect(TokenKind::BracketR)?;
                Ok(self.alloc(NodeKind::SuperIndex { index: Some(index), id: None }, start))
            }
            _ => Err(self.err(format!("Expected . or [ after super, got {}", self.peek()))),
        }
    }

    /// - `import "file"`, `importstr "file"`, `importbin "file"`
    fn parse_import(&mut self) -> PResult<NodeId> {
        let keyword = self.pop();
        let start = keyword.span.start;
        let file = self.parse_expr()?;
        match self.ast.kind(file) {
            NodeKind::LiteralString { kind, .. } if *kind != StringKind::Block => {}
            NodeKind::LiteralString { .. } => {
                return Err(Failure {
                    message: "Block string literals not allowed in imports".to_string(),
                    span: self.ast.span(file),
                    rest: None,
                });
            }
            _ => {
                return Err(Failure {
                    message: "Computed imports are not allowed".to_string(),
                    span: self.ast.span(file),
                    rest: None,
                });
            }
        }
        let kind = match keyword.kind {
            TokenKind::ImportStr => NodeKind::ImportStr { file },
            TokenKind::ImportBin => NodeKind::ImportBin { file },
            _ => NodeKind::Import { file },
        };
        Ok(self.alloc(kind, start))
    }

    /// - `if cond then a [else b]`
    fn parse_conditional(&mut self) -> PResult<NodeId> {
        let start = self.pop().span.start;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        let then = self.parse_expr()?;
        let otherwise = if self.peek().kind == TokenKind::Else {
            self.pop();
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(self.alloc(NodeKind::Conditional { cond, then, otherwise }, start))
    }

    /// - `local a = 1, f(x) = x; body`
    ///
    /// When the body fails with a partial tree, the partial tree is wrapped
    /// in the binds so it keeps its scope.
    fn parse_local(&mut self) -> PResult<NodeId> {
        let mut leading = self.comments_here();
        let start = self.pop().span.start;
        let mut binds = Vec::new();
        let mut names = HashSet::new();
        loop {
            let bind = self.parse_bind(&mut names, std::mem::take(&mut leading))?;
            binds.push(bind);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.pop();
                }
                TokenKind::Semicolon => {
                    self.pop();
                    break;
                }
                _ => {
                    let mut failure = self.err(format!("Expected , or ; but got {}", self.peek()));
                    if let NodeKind::LocalBind { body, .. } = self.ast.kind(bind) {
                        failure.rest = Some(*body);
                    }
                    return Err(failure);
                }
            }
        }

        match self.parse_expr() {
            Ok(body) => Ok(self.alloc(NodeKind::Local { binds, body }, start)),
            Err(mut failure) => {
                if let Some(rest) = failure.rest {
                    let span = Span::new(start, self.ast.span(rest).end);
                    failure.rest = Some(self.ast.alloc(NodeKind::Local { binds, body: rest }, span));
                }
                Err(failure)
            }
        }
    }

    /// - `name = expr`
    /// - `name(params) = expr`
    fn parse_bind(&mut self, names: &mut HashSet<String>, mut comments: Vec<String>) -> PResult<NodeId> {
        comments.extend(self.comments_here());
        let token = self.expect(TokenKind::Identifier)?;
        if !names.insert(token.text.clone()) {
            return Err(Failure {
                message: format!("Duplicate local var: {}", token.text),
                span: token.span,
                rest: None,
            });
        }
        let params = if self.peek().kind == TokenKind::ParenL {
            Some(self.parse_params()?)
        } else {
            None
        };
        self.expect_operator("=")?;
        let body = self.parse_expr()?;
        Ok(self.alloc(
            NodeKind::LocalBind {
                name: token.text,
                params,
                body,
                comments,
            },
            token.span.start,
        ))
    }

    /// - `(a, b = default,)`
    fn parse_params(&mut self) -> PResult<Vec<NodeId>> {
        self.expect(TokenKind::ParenL)?;
        let mut params = Vec::new();
        let mut names = HashSet::new();
        loop {
            if self.peek().kind == TokenKind::ParenR {
                self.pop();
                break;
            }
            let token = self.expect(TokenKind::Identifier)?;
            if !names.insert(token.text.clone()) {
                return Err(Failure {
                    message: format!("Duplicate parameter: {}", token.text),
                    span: token.span,
                    rest: None,
                });
            }
            let default = if self.is_operator("=") {
                self.pop();
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(self.alloc(
                NodeKind::FunctionParam {
                    name: token.text,
                    default,
                },
                token.span.start,
            ));
            match self.peek().kind {
                TokenKind::Comma => {
                    self.pop();
                }
                TokenKind::ParenR => {
                    self.pop();
                    break;
                }
                _ => {
                    return Err(self.err(format!("Expected , or ) after parameter but got {}", self.peek())));
                }
            }
        }
        Ok(params)
    }

    /// - `[a, b, c,]`
    /// - `[expr for x in xs if cond]`
    fn parse_array(&mut self) -> PResult<NodeId> {
        let start = self.pop().span.start;
        if self.peek().kind == TokenKind::BracketR {
            self.pop();
            return Ok(self.alloc(
                NodeKind::Array {
                    elements: Vec::new(),
                    trailing_comma: false,
                },
                start,
            ));
        }

        let first = self.parse_expr()?;
        if self.peek().kind == TokenKind::For {
            let specs = self.parse_comp_specs(TokenKind::BracketR)?;
            self.expect(TokenKind::BracketR)?;
            return Ok(self.alloc(NodeKind::ArrayComp { body: first, specs }, start));
        }

        let mut elements = vec![first];
        let mut trailing_comma = false;
        loop {
            match self.peek().kind {
                TokenKind::BracketR => {
                    self.pop();
                    break;
                }
                TokenKind::Comma => {
                    self.pop();
                    if self.peek().kind == TokenKind::BracketR {
                        self.pop();
                        trailing_comma = true;
                        break;
                    }
                    elements.push(self.parse_expr()?);
                }
                _ => {
                    return Err(self.err(format!(
                        "Expected a comma before next array element, got {}",
                        self.peek()
                    )));
                }
            }
        }
        Ok(self.alloc(NodeKind::Array { elements, trailing_comma }, start))
    }

    /// `for x in xs` followed by any mix of `for` and `if`, up to `end`.
    fn parse_comp_specs(&mut self, end: TokenKind) -> PResult<Vec<NodeId>> {
        let mut specs = Vec::new();
        loop {
            let start = self.peek().span.start;
            match self.peek().kind {
                TokenKind::For => {
                    self.pop();
                    let var = self.expect(TokenKind::Identifier)?.text;
                    self.expect(TokenKind::In)?;
                    let expr = self.parse_expr()?;
                    specs.push(self.alloc(NodeKind::ForSpec { var, expr }, start));
                }
                TokenKind::If if !specs.is_empty() => {
                    self.pop();
                    let expr = self.parse_expr()?;
                    specs.push(self.alloc(NodeKind::IfSpec { expr }, start));
                }
                k if k == end && !specs.is_empty() => break,
                _ => {
                    return Err(self.err(format!("Expected for, if or {} after for clause, got: {}", end, self.peek())));
                }
            }
        }
        Ok(specs)
    }

    /// - `{ a: 1, "b":: 2, [c]+: 3, local d = 4, assert e, f(x): x }`
    /// - `{ [k]: v for k in ks }`
    fn parse_object(&mut self) -> PResult<NodeId> {
        let start = self.expect(TokenKind::BraceL)?.span.start;
        let mut fields = Vec::new();
        let mut literal_names = HashSet::new();
        let mut local_names = HashSet::new();
        let mut trailing_comma = false;
        loop {
            match self.peek().kind {
                TokenKind::BraceR => {
                    self.pop();
                    break;
                }
                TokenKind::For if !fields.is_empty() => return self.parse_object_comp(fields, start),
                _ => {}
            }
            let field = self.parse_field(&mut literal_names, &mut local_names)?;
            fields.push(field);
            trailing_comma = false;
            match self.peek().kind {
                TokenKind::Comma => {
                    self.pop();
                    trailing_comma = true;
                }
                TokenKind::BraceR => {
                    self.pop();
                    break;
                }
                TokenKind::For => return self.parse_object_comp(fields, start),
                _ => {
                    return Err(self.err(format!("Expected a comma before next field, got {}", self.peek())));
                }
            }
        }
        Ok(self.alloc(NodeKind::Object { fields, trailing_comma }, start))
    }

    fn parse_object_comp(&mut self, fields: Vec<NodeId>, start: Position) -> PResult<NodeId> {
        let mut computed = 0;
        for field in &fields {
            if let NodeKind::ObjectField(f) = self.ast.kind(*field) {
                match f.kind {
                    FieldKind::Local => {}
                    FieldKind::Computed => computed += 1,
                    _ => {
                        return Err(Failure {
                            message: "Object comprehensions can only have [e] fields".to_string(),
                            span: self.ast.span(*field),
                            rest: None,
                        });
                    }
                }
            }
        }
        if computed != 1 {
            return Err(self.err("Object comprehension must have exactly one field".to_string()));
        }
        let specs = self.parse_comp_specs(TokenKind::BraceR)?;
        self.expect(TokenKind::BraceR)?;
        Ok(self.alloc(NodeKind::ObjectComp { fields, specs }, start))
    }

    fn parse_field(
        &mut self,
        literal_names: &mut HashSet<String>,
        local_names: &mut HashSet<String>,
    ) -> PResult<NodeId> {
        let comments = self.comments_here();
        let start = self.peek().span.start;

        match self.peek().kind {
            TokenKind::Local => {
                self.pop();
                let token = self.expect(TokenKind::Identifier)?;
                if !local_names.insert(token.text.clone()) {
                    return Err(Failure {
                        message: format!("Duplicate local var: {}", token.text),
                        span: token.span,
                        rest: None,
                    });
                }
                let key = self.ast.alloc(NodeKind::Identifier { name: token.text.clone() }, token.span);
                let params = if self.peek().kind == TokenKind::ParenL {
                    Some(self.parse_params()?)
                } else {
                    None
                };
                self.expect_operator("=")?;
                let body = self.parse_expr()?;
                let field = ObjectField {
                    kind: FieldKind::Local,
                    hide: Visibility::Hidden,
                    plus_super: false,
                    name: Some(token.text),
                    key: Some(key),
                    params,
                    body,
                    message: None,
                    comments,
                };
                return Ok(self.alloc(NodeKind::ObjectField(field), start));
            }
            TokenKind::Assert => {
                self.pop();
                let body = self.parse_expr()?;
                let message = if self.is_operator(":") {
                    self.pop();
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                let field = ObjectField {
                    kind: FieldKind::Assert,
                    hide: Visibility::Hidden,
                    plus_super: false,
                    name: None,
                    key: None,
                    params: None,
                    body,
                    message,
                    comments,
                };
                return Ok(self.alloc(NodeKind::ObjectField(field), start));
            }
            _ => {}
        }

        let (kind, name, key) = match self.peek().kind {
            TokenKind::Identifier => {
                let key = self.parse_identifier()?;
                let name = self.ast.identifier_name(key).map(str::to_string);
                (FieldKind::Id, name, key)
            }
            k if k.is_string() => {
                let key = self.parse_string()?;
                let name = match self.ast.kind(key) {
                    NodeKind::LiteralString { value, .. } => Some(value.clone()),
                    _ => None,
                };
                (FieldKind::Str, name, key)
            }
            TokenKind::BracketL => {
                self.pop();
                let key = self.parse_expr()?;
                self.expect(TokenKind::BracketR)?;
                (FieldKind::Computed, None, key)
            }
            _ => {
                return Err(self.err(format!(
                    "Unexpected token while parsing field definition: {}",
                    self.peek()
                )));
            }
        };
        if let Some(name) = &name
            && !literal_names.insert(name.clone())
        {
            return Err(Failure {
                message: format!("Duplicate field: {}", name),
                span: self.ast.span(key),
                rest: None,
            });
        }

        let params = if self.peek().kind == TokenKind::ParenL {
            Some(self.parse_params()?)
        } else {
            None
        };

        let (plus_super, hide) = match (self.peek().kind, self.peek().text.as_str()) {
            (TokenKind::Operator, ":") => (false, Visibility::Inherit),
            (TokenKind::Operator, "::") => (false, Visibility::Hidden),
            (TokenKind::Operator, ":::") => (false, Visibility::Visible),
            (TokenKind::Operator, "+:") => (true, Visibility::Inherit),
            (TokenKind::Operator, "+::") => (true, Visibility::Hidden),
            (TokenKind::Operator, "+:::") => (true, Visibility::Visible),
            _ => {
                return Err(self.err(format!("Expected one of :, ::, :::, +:, +::, +:::, got: {}", self.peek())));
            }
        };
        if plus_super && params.is_some() {
            return Err(self.err(format!(
                "Cannot use +: syntax sugar in a method: {}",
                name.as_deref().unwrap_or("[computed]")
            )));
        }
        self.pop();

        let body = self.parse_expr()?;
        let field = ObjectField {
            kind,
            hide,
            plus_super,
            name,
            key: Some(key),
            params,
            body,
            message: None,
            comments,
        };
        Ok(self.alloc(NodeKind::ObjectField(field), start))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_operator_at(&self, ahead: usize, op: &str) -> bool {
        let idx = (self.pos + ahead).min(self.len - 1);
        let token = &self.tokens[idx];
        token.kind == TokenKind::Operator && token.text == op
    }

    /// Consume the current token. Stays on end of file.
    fn pop(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.len {
            self.pos += 1;
        }
        self.last_end = token.span.end;
        token
    }

    fn is_operator(&self, op: &str) -> bool {
        self.peek_operator_at(0, op)
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.peek().kind == kind {
            Ok(self.pop())
        } else {
            Err(self.err(format!("Expected token {} but got {}", kind, self.peek())))
        }
    }

    fn expect_operator(&mut self, op: &str) -> PResult<Token> {
        if self.is_operator(op) {
            Ok(self.pop())
        } else {
            Err(self.err(format!("Expected operator {} but got {}", op, self.peek())))
        }
    }

    fn comments_here(&self) -> Vec<String> {
        self.comments[self.pos].clone()
    }

    /// Allocate a node spanning from `start` to the end of the last
    /// consumed token.
    fn alloc(&mut self, kind: NodeKind, start: Position) -> NodeId {
        let span = Span::new(start, self.last_end);
        self.ast.alloc(kind, span)
    }

    fn err(&self, message: String) -> Failure {
        Failure {
            message,
            span: self.peek().span,
            rest: None,
        }
    }
}
