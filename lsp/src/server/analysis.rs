use std::sync::Arc;

use tokio::task;
use tower_lsp::lsp_types::*;
use tracing::warn;

use crate::analyzer::{HoverInfo, Suggestion, SuggestionKind};

use super::state::JsonnetLanguageServer;
use super::text::lsp_to_core;

impl JsonnetLanguageServer {
    /// Parse the current buffer so later requests hit the cache.
    pub(crate) async fn refresh(&self, uri: &Url) {
        let analyzer = Arc::clone(&self.analyzer);
        let uri = uri.clone();
        if let Err(err) = task::spawn_blocking(move || analyzer.compile(&uri)).await {
            warn!("parse task failed: {}", err);
        }
    }

    pub(crate) async fn get_hover_info(&self, uri: &Url, position: Position) -> Option<Hover> {
        let pos = {
            let doc = self.documents.documents.get(uri)?;
            lsp_to_core(&doc.content, position)
        };
        let analyzer = Arc::clone(&self.analyzer);
        let target = uri.clone();
        let info = match task::spawn_blocking(move || analyzer.hover(&target, pos)).await {
            Ok(info) => info?,
            Err(err) => {
                warn!("hover task failed: {}", err);
                return None;
            }
        };
        Some(render_hover(info, self.hover_comments()))
    }

    pub(crate) async fn get_completions(&self, uri: &Url, position: Position) -> Vec<CompletionItem> {
        let Some(pos) = self
            .documents
            .documents
            .get(uri)
            .map(|doc| lsp_to_core(&doc.content, position))
        else {
            return Vec::new();
        };
        let analyzer = Arc::clone(&self.analyzer);
        let target = uri.clone();
        match task::spawn_blocking(move || analyzer.complete(&target, pos)).await {
            Ok(items) => items.into_iter().map(completion_item).collect(),
            Err(err) => {
                warn!("completion task failed: {}", err);
                Vec::new()
            }
        }
    }
}

pub(crate) fn render_hover(info: HoverInfo, with_comments: bool) -> Hover {
    let mut contents = vec![MarkedString::LanguageString(LanguageString {
        language: "jsonnet".to_string(),
        value: info.value,
    })];
    if with_comments {
        if let Some(comment) = info.comment {
            contents.push(MarkedString::String(comment));
        }
    }
    Hover {
        contents: HoverContents::Array(contents),
        range: None,
    }
}

pub(crate) fn completion_item(suggestion: Suggestion) -> CompletionItem {
    let kind = match suggestion.kind {
        SuggestionKind::Field => CompletionItemKind::FIELD,
        SuggestionKind::Method => CompletionItemKind::METHOD,
        SuggestionKind::Variable => CompletionItemKind::VARIABLE,
    };
    CompletionItem {
        label: suggestion.label,
        kind: Some(kind),
        documentation: suggestion.documentation.map(Documentation::String),
        ..Default::default()
    }
}
