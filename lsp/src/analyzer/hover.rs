use std::sync::Arc;

use jsonnet_core::ast::locate;
use jsonnet_core::resolve::{defining_construct, ImportResolver, InternalError, NodeRef, Resolution, Resolver};
use jsonnet_core::token::Position;

use super::compiler::CompileResult;
use super::HoverInfo;

/// Source of the construct defining the symbol at `pos`, with its heading
/// comments. Only clean parses are hovered.
pub(crate) fn hover(
    current: &CompileResult,
    pos: Position,
    imports: &dyn ImportResolver,
) -> Result<Option<HoverInfo>, InternalError> {
    let CompileResult::Parsed(doc) = current else {
        return Ok(None);
    };
    let Ok(id) = locate(&doc.tree, pos) else {
        return Ok(None);
    };
    let node = NodeRef::new(Arc::clone(&doc.tree), id);

    let target = match Resolver::new(imports).resolution(&node)? {
        Resolution::Node(resolved) => defining_construct(&resolved),
        Resolution::Free(site) => site,
        _ => return Ok(None),
    };
    let comments = target.tree.comments(target.id);
    Ok(Some(HoverInfo {
        value: target.text(),
        comment: if comments.is_empty() {
            None
        } else {
            Some(comments.join("\n"))
        },
    }))
}
