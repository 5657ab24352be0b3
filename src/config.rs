//! Render configuration.
//!
//! Loaded from YAML; every field has a default so an empty file (or no file)
//! is a valid configuration.
//!
//! ```yaml
//! allow_javascript: false
//! max_depth: 40
//! site_name: Example Wiki
//! interwiki:
//!   wikipedia: https://en.wikipedia.org/wiki/$1
//! messages:
//!   de:
//!     common.sectionedit: bearbeiten
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_DEPTH: usize = 40;
pub const DEFAULT_TOC_MIN_ENTRIES: usize = 4;
pub const DEFAULT_LOCALE: &str = "en";

/// A main namespace paired with its discussion namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespacePair {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub comments: String,
}

impl NamespacePair {
    fn new(main: &str, comments: &str) -> Self {
        Self {
            main: main.to_string(),
            comments: comments.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Keep `on*=` and `javascript:` attributes on inline HTML tags.
    pub allow_javascript: bool,
    /// Maximum nesting of fragment renders (template bodies, captions, ...).
    pub max_depth: usize,
    /// Headings needed before a table of contents is shown unforced.
    pub toc_min_entries: usize,
    pub site_name: String,
    pub server: String,
    pub version: String,
    pub namespaces: Vec<NamespacePair>,
    /// Interwiki prefix (lowercase) to URL pattern; `$1` is the article.
    pub interwiki: BTreeMap<String, String>,
    /// Locale to message key to text.
    pub messages: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let mut interwiki = BTreeMap::new();
        interwiki.insert(
            "wikipedia".to_string(),
            "https://en.wikipedia.org/wiki/$1".to_string(),
        );

        let mut en = BTreeMap::new();
        for (k, v) in [
            ("common.sectionedit", "edit"),
            ("toc.title", "Contents"),
        ] {
            en.insert(k.to_string(), v.to_string());
        }
        let mut messages = BTreeMap::new();
        messages.insert(DEFAULT_LOCALE.to_string(), en);

        Self {
            allow_javascript: false,
            max_depth: DEFAULT_MAX_DEPTH,
            toc_min_entries: DEFAULT_TOC_MIN_ENTRIES,
            site_name: "wiki2html".to_string(),
            server: "http://localhost".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            namespaces: vec![
                NamespacePair::new("", "Comments"),
                NamespacePair::new("Special", ""),
                NamespacePair::new("Media", ""),
                NamespacePair::new("Image", "Image comments"),
                NamespacePair::new("Template", "Template comments"),
                NamespacePair::new("User", "User comments"),
                NamespacePair::new("Category", "Category comments"),
                NamespacePair::new("Help", "Help comments"),
            ],
            interwiki,
            messages,
        }
    }
}

impl RenderConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&s)
    }

    /// Look up the namespace pair where `name` is either the main or the
    /// comments side.
    pub fn namespace(&self, name: &str) -> Option<&NamespacePair> {
        self.namespaces
            .iter()
            .find(|ns| ns.main == name || (!ns.comments.is_empty() && ns.comments == name))
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        !name.is_empty() && self.namespace(name).is_some()
    }

    /// URL pattern for an interwiki prefix, matched case-insensitively.
    pub fn interwiki_pattern(&self, prefix: &str) -> Option<&str> {
        self.interwiki
            .get(&prefix.trim().to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(RenderConfig::from_yaml_str("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let cfg = RenderConfig::from_yaml_str("max_depth: 3\nallow_javascript: true\n").unwrap();
        assert_eq!(cfg.max_depth, 3);
        assert!(cfg.allow_javascript);
        assert_eq!(cfg.toc_min_entries, DEFAULT_TOC_MIN_ENTRIES);
        assert!(cfg.interwiki_pattern("Wikipedia").is_some());
    }

    #[test]
    fn namespace_lookup_matches_both_sides() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.namespace("Template comments").unwrap().main, "Template");
        assert_eq!(cfg.namespace("").unwrap().comments, "Comments");
        assert!(!cfg.is_namespace("Nope"));
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(RenderConfig::from_yaml_str("max_depth: [").is_err());
    }
}
