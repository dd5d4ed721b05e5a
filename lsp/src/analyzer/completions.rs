use std::sync::Arc;

use jsonnet_core::ast::{annotate, locate, Ast, Env, NodeKind};
use jsonnet_core::resolve::{FieldSet, ImportResolver, InternalError, NodeRef, Resolution, Resolver};
use jsonnet_core::token::Position;
use tracing::debug;

use super::compiler::{CompileResult, ParsedDocument};
use super::{Suggestion, SuggestionKind};

/// Suggestions at `pos`. A document that does not parse is completed from
/// the partial tree its error carries, in the scope of the last good parse.
pub(crate) fn complete(
    current: &CompileResult,
    last_success: Option<&ParsedDocument>,
    text: &str,
    pos: Position,
    imports: &dyn ImportResolver,
) -> Result<Vec<Suggestion>, InternalError> {
    let resolver = Resolver::new(imports);
    let dotted = char_before(text, pos) == Some('.');

    match current {
        CompileResult::Parsed(doc) => complete_in(&resolver, &doc.tree, pos, dotted),
        CompileResult::Failed(failed) => {
            let Some(last) = last_success else {
                debug!("no successful parse of {} to recover from", failed.uri);
                return Ok(Vec::new());
            };
            let Some(rest) = failed.error.rest() else {
                return Ok(Vec::new());
            };
            if !covers(rest, pos) {
                return Ok(Vec::new());
            }
            let mut partial = (**rest).clone();
            let root = partial.root();
            annotate(&mut partial, root, None, seed_env(&last.tree, pos));
            complete_in(&resolver, &Arc::new(partial), pos, dotted)
        }
    }
}

/// The cursor is inside the partial tree, or one column past its end where
/// a `.` was just typed.
fn covers(rest: &Ast, pos: Position) -> bool {
    let span = rest.span(rest.root());
    span.contains(pos) || (pos.line == span.end.line && pos.column == span.end.column + 1)
}

/// Scope at `pos` in the last good tree, pointing into that tree.
fn seed_env(last: &Arc<Ast>, pos: Position) -> Env {
    let id = match locate(last, pos) {
        Ok(id) => Some(id),
        Err(failure) => failure.best_effort(),
    };
    id.and_then(|id| last.env(id))
        .map(|env| env.foreign(last))
        .unwrap_or_default()
}

fn char_before(text: &str, pos: Position) -> Option<char> {
    if pos.column < 2 {
        return None;
    }
    let line = text.lines().nth(pos.line.checked_sub(1)? as usize)?;
    line.chars().nth(pos.column as usize - 2)
}

fn complete_in(
    resolver: &Resolver<'_>,
    tree: &Arc<Ast>,
    pos: Position,
    dotted: bool,
) -> Result<Vec<Suggestion>, InternalError> {
    let id = match locate(tree, pos) {
        Ok(id) => id,
        Err(failure) => match failure.best_effort() {
            Some(id) => id,
            None => return Ok(Vec::new()),
        },
    };
    let node = NodeRef::new(Arc::clone(tree), id);

    if dotted {
        let Some(target) = dot_target(&node, pos) else {
            return Ok(Vec::new());
        };
        return Ok(match resolver.field_set(&target)? {
            Some(fields) => field_suggestions(&fields),
            None => Vec::new(),
        });
    }

    if is_definition_site(&node) {
        return Ok(Vec::new());
    }
    match resolver.resolution(&node)? {
        Resolution::Node(_) | Resolution::Free(_) | Resolution::Unresolvable => Ok(Vec::new()),
        Resolution::Unbound | Resolution::MissingField | Resolution::Unsupported => Ok(env_suggestions(&node)),
    }
}

/// The expression left of the `.` just before `pos`.
fn dot_target(node: &NodeRef, pos: Position) -> Option<NodeRef> {
    // cursor sits on the member name: `a.|b`
    if node.span().start >= pos {
        let parent = node.parent()?;
        return match parent.kind() {
            NodeKind::Index {
                target, id: Some(id), ..
            } if *id == node.id => Some(parent.with(*target)),
            _ => None,
        };
    }
    // cursor is past the node: widen to the whole reference chain ending there
    let mut current = node.clone();
    while let Some(parent) = current.parent() {
        let chain = matches!(parent.kind(), NodeKind::Var { .. } | NodeKind::Index { .. });
        if !chain || parent.span().end != current.span().end {
            break;
        }
        current = parent;
    }
    Some(current)
}

fn is_definition_site(node: &NodeRef) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        NodeKind::ObjectField(field) => field.key == Some(node.id),
        _ => false,
    }
}

fn documentation(comments: &[String]) -> Option<String> {
    if comments.is_empty() {
        None
    } else {
        Some(comments.join("\n"))
    }
}

fn field_suggestions(fields: &FieldSet) -> Vec<Suggestion> {
    fields
        .iter()
        .map(|field| Suggestion {
            label: field.name.clone(),
            kind: if field.is_method() {
                SuggestionKind::Method
            } else {
                SuggestionKind::Field
            },
            documentation: documentation(field.comments()),
        })
        .collect()
}

fn env_suggestions(node: &NodeRef) -> Vec<Suggestion> {
    let Some(env) = node.env() else {
        return Vec::new();
    };
    env.bindings()
        .into_iter()
        .map(|(name, site)| {
            let site = node.site(&site);
            Suggestion {
                label: name,
                kind: SuggestionKind::Variable,
                documentation: documentation(site.tree.comments(site.id)),
            }
        })
        .collect()
}
