use crate::ast::{Ast, NodeId, NodeKind};
use crate::token::Position;

/// Why [`locate`] found no acceptable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindFailure {
    /// The position is before the document or in a gap nothing can explain,
    /// such as between `import` and its path.
    Unanalyzable,
    /// The position is inside `enclosing` but on none of its children.
    /// `terminal` is the closest leaf on the same line that ends at or before
    /// the position, if any.
    Analyzable {
        enclosing: NodeId,
        terminal: Option<NodeId>,
    },
}

impl FindFailure {
    /// The terminal if there is one, otherwise the enclosing node.
    pub fn best_effort(&self) -> Option<NodeId> {
        match self {
            FindFailure::Unanalyzable => None,
            FindFailure::Analyzable { enclosing, terminal } => Some(terminal.unwrap_or(*enclosing)),
        }
    }
}

/// Leaves plus the binding sites whose name is not a child node.
fn is_terminal(ast: &Ast, id: NodeId) -> bool {
    matches!(
        ast.kind(id),
        NodeKind::LocalBind { .. } | NodeKind::FunctionParam { .. } | NodeKind::ForSpec { .. } | NodeKind::IfSpec { .. }
    ) || ast.children(id).is_empty()
}

/// Innermost node whose span contains `pos`.
///
/// Both span ends count as inside, so a cursor right after a token still
/// lands on it. Positions past the end of the document are treated as the
/// end of the document.
pub fn locate(ast: &Ast, pos: Position) -> Result<NodeId, FindFailure> {
    let root = ast.root();
    let root_span = ast.span(root);
    if pos < root_span.start {
        return Err(FindFailure::Unanalyzable);
    }
    let pos = if pos > root_span.end { root_span.end } else { pos };

    let mut current = root;
    while let Some(child) = ast
        .children(current)
        .into_iter()
        .find(|child| ast.span(*child).contains(pos))
    {
        current = child;
    }

    if is_terminal(ast, current) {
        return Ok(current);
    }
    if matches!(
        ast.kind(current),
        NodeKind::Import { .. } | NodeKind::ImportStr { .. } | NodeKind::ImportBin { .. }
    ) {
        return Err(FindFailure::Unanalyzable);
    }
    Err(FindFailure::Analyzable {
        enclosing: current,
        terminal: nearest_terminal(ast, current, pos),
    })
}

fn nearest_terminal(ast: &Ast, enclosing: NodeId, pos: Position) -> Option<NodeId> {
    ast.descendants(enclosing)
        .into_iter()
        .filter(|id| ast.children(*id).is_empty())
        .filter(|id| {
            let end = ast.span(*id).end;
            end.line == pos.line && end <= pos
        })
        .max_by_key(|id| ast.span(*id).end)
}
