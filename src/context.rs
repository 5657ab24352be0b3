//! Per-render state shared by every recursive sub-render.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_LOCALE, RenderConfig};
use crate::error::{RenderError, Result};
use crate::render::reference::WikiReference;
use crate::store::{ContentStore, MediaInspector, NoMedia};

pub use crate::render::toc::{TableOfContents, TocEntry, TocStatus};

static DEFAULT_CONFIG: LazyLock<RenderConfig> = LazyLock::new(RenderConfig::default);
static NO_MEDIA: NoMedia = NoMedia;

/// Processing depth of a render pass, shallowest first.
///
/// A handler whose minimum depth is deeper than the requested one returns its
/// input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Only record the section name of the first heading.
    Slice,
    /// Collect links and templates; output equals input.
    Preprocess,
    /// Block layout, reference lists and the table of contents.
    Layout,
    /// Inline markup to HTML.
    Process,
    /// Everything, including template expansion.
    Template,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Slice => "slice",
            Mode::Preprocess => "preprocess",
            Mode::Layout => "layout",
            Mode::Process => "process",
            Mode::Template => "template",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slice" => Ok(Mode::Slice),
            "preprocess" => Ok(Mode::Preprocess),
            "layout" => Ok(Mode::Layout),
            "process" => Ok(Mode::Process),
            "template" => Ok(Mode::Template),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Output of one parse call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Rendered HTML (or the untouched source for shallow modes).
    pub content: String,

    /// Page names linked to, in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// Template pages invoked, in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<String>,

    /// Encoded name of the first heading, set by [`Mode::Slice`] renders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

impl DocumentMetadata {
    pub fn add_link(&mut self, name: &str) {
        if !name.is_empty() && !self.links.iter().any(|l| l == name) {
            self.links.push(name.to_string());
        }
    }

    pub fn add_template(&mut self, name: &str) {
        if !name.is_empty() && !self.templates.iter().any(|t| t == name) {
            self.templates.push(name.to_string());
        }
    }

    /// Fold the link and template sets of a fragment into this record.
    pub(crate) fn merge_from(&mut self, fragment: &DocumentMetadata) {
        for l in &fragment.links {
            self.add_link(l);
        }
        for t in &fragment.templates {
            self.add_template(t);
        }
    }
}

/// Locale-specific UI strings.
pub trait Messages {
    fn message(&self, locale: &str, key: &str) -> String;
}

impl Messages for RenderConfig {
    fn message(&self, locale: &str, key: &str) -> String {
        [locale, DEFAULT_LOCALE]
            .iter()
            .find_map(|l| self.messages.get(*l).and_then(|m| m.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Cross-handler state for one top-level render.
#[derive(Debug, Default)]
pub struct Scratch {
    /// References waiting for the next `<references/>`.
    pub references: Vec<WikiReference>,
    /// Highest citation number handed out so far.
    pub last_citation: usize,
    /// Set while an included page (`{{:Page}}`) is being rendered.
    pub inside_inclusion: bool,
}

pub struct RenderContext<'a> {
    pub site: String,
    pub page_name: String,
    pub locale: String,
    /// Base URL path every generated link starts with, e.g. `/wiki`.
    pub context_path: String,
    /// Fixed `target` for generated anchors, e.g. `_blank`.
    pub link_target: Option<String>,
    pub allow_section_edit: bool,
    store: &'a dyn ContentStore,
    media: &'a dyn MediaInspector,
    messages: Option<&'a dyn Messages>,
    config: &'a RenderConfig,
    pub(crate) toc: TableOfContents,
    pub(crate) scratch: Scratch,
    depth: usize,
    media_ids: usize,
}

impl<'a> RenderContext<'a> {
    pub fn new(store: &'a dyn ContentStore, site: &str, page_name: &str) -> Self {
        Self {
            site: site.to_string(),
            page_name: page_name.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            context_path: String::new(),
            link_target: None,
            allow_section_edit: true,
            store,
            media: &NO_MEDIA,
            messages: None,
            config: &DEFAULT_CONFIG,
            toc: TableOfContents::default(),
            scratch: Scratch::default(),
            depth: 0,
            media_ids: 0,
        }
    }

    pub fn with_config(mut self, config: &'a RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_media(mut self, media: &'a dyn MediaInspector) -> Self {
        self.media = media;
        self
    }

    /// Override the message source; defaults to the config's catalog.
    pub fn with_messages(mut self, messages: &'a dyn Messages) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_context_path(mut self, path: &str) -> Self {
        self.context_path = path.trim_end_matches('/').to_string();
        self
    }

    pub fn with_link_target(mut self, target: &str) -> Self {
        self.link_target = Some(target.to_string()).filter(|t| !t.is_empty());
        self
    }

    pub fn with_section_edit(mut self, allow: bool) -> Self {
        self.allow_section_edit = allow;
        self
    }

    pub fn store(&self) -> &'a dyn ContentStore {
        self.store
    }

    pub fn media(&self) -> &'a dyn MediaInspector {
        self.media
    }

    pub fn config(&self) -> &'a RenderConfig {
        self.config
    }

    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    pub fn message(&self, key: &str) -> String {
        match self.messages {
            Some(m) => m.message(&self.locale, key),
            None => self.config.message(&self.locale, key),
        }
    }

    /// Next id for a generated media element, unique within this context.
    pub fn next_media_id(&mut self) -> usize {
        self.media_ids += 1;
        self.media_ids
    }

    /// Enter one level of recursive rendering.
    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(RenderError::RecursionLimit {
                limit: self.config.max_depth,
                page: self.page_name.clone(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// ` target="..."` for generated anchors, or empty.
    pub(crate) fn target_attr(&self) -> String {
        match &self.link_target {
            Some(t) => format!(" target=\"{}\"", crate::render::escape::escape_html(t)),
            None => String::new(),
        }
    }
}
