use std::path::PathBuf;

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tower_lsp::lsp_types::ConfigurationItem;
use tracing::{debug, warn};

use super::state::JsonnetLanguageServer;

const SECTION: &str = "jsonnet.lsp";

/// Library directories from `JSONNET_PATH`, read once.
static ENV_JPATH: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    std::env::var_os("JSONNET_PATH")
        .map(|raw| std::env::split_paths(&raw).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default()
});

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServerConfig {
    pub(crate) jpath: Vec<PathBuf>,
    pub(crate) hover_comments: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            jpath: ENV_JPATH.clone(),
            hover_comments: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsonnetLspConfigSection {
    #[serde(default)]
    jpath: Option<Vec<PathBuf>>,
    #[serde(default)]
    hover: HoverConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct HoverConfig {
    #[serde(default)]
    comments: Option<bool>,
}

impl ServerConfig {
    /// Client settings layered over the defaults. Settings the client leaves
    /// out keep their default.
    pub(crate) fn from_value(value: serde_json::Value) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if value.is_null() {
            return Ok(config);
        }
        let section: JsonnetLspConfigSection =
            serde_json::from_value(value).with_context(|| format!("invalid `{SECTION}` settings"))?;
        if let Some(jpath) = section.jpath {
            config.jpath = jpath;
        }
        if let Some(comments) = section.hover.comments {
            config.hover_comments = comments;
        }
        Ok(config)
    }
}

impl JsonnetLanguageServer {
    pub(crate) async fn load_config(&self) {
        let items = vec![ConfigurationItem {
            scope_uri: None,
            section: Some(SECTION.to_string()),
        }];

        let value = match self.client.configuration(items).await {
            Ok(values) => values.into_iter().next().unwrap_or_default(),
            Err(err) => {
                debug!("client did not return configuration: {}", err);
                return;
            }
        };
        match ServerConfig::from_value(value) {
            Ok(config) => {
                self.analyzer.set_jpath(config.jpath.clone());
                if let Ok(mut guard) = self.config.lock() {
                    *guard = config;
                }
            }
            Err(err) => warn!("{:#}", err),
        }
    }
}
