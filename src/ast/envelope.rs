use serde::{Deserialize, Serialize};

use crate::context::{DocumentMetadata, TocEntry};

/// JSON document printed by `wiki2html --json`.
///
/// Wraps the render output with enough metadata to make it self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEnvelope {
    /// Schema version for this JSON payload.
    pub schema_version: u32,

    pub renderer: RendererInfo,

    pub site: String,

    pub page: String,

    /// Processing depth the page was rendered at (`template`, `preprocess`, ...).
    pub mode: String,

    pub metadata: DocumentMetadata,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toc: Vec<TocEntry>,
}

/// Identifies the program that produced the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererInfo {
    pub name: String,
    pub version: String,
}

impl Default for RendererInfo {
    fn default() -> Self {
        Self {
            name: super::RENDERER_NAME.to_string(),
            version: super::RENDERER_VERSION.to_string(),
        }
    }
}
