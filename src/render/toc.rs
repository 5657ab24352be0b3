//! Table of contents accumulated while headings render.

use serde::{Deserialize, Serialize};

use super::escape::escape_html;

/// Placeholder emitted by the first heading; replaced during layout.
///
/// DEL is escaped in text and stripped from every source rendered at
/// [`Mode::Layout`](crate::Mode::Layout) or deeper, so no input can forge it.
pub const TOC_MARKER: &str = "\u{7f}toc\u{7f}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Anchor id of the heading.
    pub name: String,
    /// Display text (markup stripped).
    pub text: String,
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TocStatus {
    #[default]
    Uninitialized,
    Initialized,
    Disabled,
}

#[derive(Debug, Clone, Default)]
pub struct TableOfContents {
    entries: Vec<TocEntry>,
    status: TocStatus,
    forced: bool,
}

impl TableOfContents {
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self) -> TocStatus {
        self.status
    }

    pub fn add_entry(&mut self, name: &str, text: &str, level: u8) {
        if self.status == TocStatus::Uninitialized {
            self.status = TocStatus::Initialized;
        }
        self.entries.push(TocEntry {
            name: name.to_string(),
            text: text.to_string(),
            level,
        });
    }

    /// `__NOTOC__`.
    pub fn disable(&mut self) {
        self.status = TocStatus::Disabled;
    }

    /// `__FORCETOC__` and explicit `__TOC__`.
    pub fn force(&mut self) {
        self.forced = true;
    }

    /// Claim the single marker slot. True only the first time, and never
    /// once the table is disabled.
    pub(crate) fn claim_marker(&mut self) -> bool {
        if self.status == TocStatus::Uninitialized {
            self.status = TocStatus::Initialized;
            return true;
        }
        false
    }

    pub fn is_visible(&self, min_entries: usize) -> bool {
        self.status != TocStatus::Disabled
            && !self.entries.is_empty()
            && (self.forced || self.entries.len() >= min_entries)
    }

    /// Nested `<ul>` lists, one per level change.
    pub fn to_html(&self, title: &str) -> String {
        let mut html = String::new();
        html.push_str("<table id=\"toc\"><tr><td><div id=\"toctitle\"><h2>");
        html.push_str(&escape_html(title));
        html.push_str("</h2></div>");

        let mut open: Vec<u8> = Vec::new();
        for entry in &self.entries {
            while open.last().is_some_and(|&l| l > entry.level) {
                open.pop();
                html.push_str("</li></ul>");
            }
            match open.last() {
                Some(&l) if l == entry.level => html.push_str("</li>"),
                _ => {
                    open.push(entry.level);
                    html.push_str("<ul>");
                }
            }
            html.push_str(&format!(
                "<li class=\"toclevel-{}\"><a href=\"#{}\">{}</a>",
                open.len(),
                entry.name,
                escape_html(&entry.text)
            ));
        }
        for _ in open {
            html.push_str("</li></ul>");
        }
        html.push_str("</td></tr></table>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_heading_claims_marker_once() {
        let mut toc = TableOfContents::default();
        assert!(toc.claim_marker());
        assert!(!toc.claim_marker());
        assert_eq!(toc.status(), TocStatus::Initialized);
    }

    #[test]
    fn disabled_toc_never_claims_or_shows() {
        let mut toc = TableOfContents::default();
        toc.disable();
        assert!(!toc.claim_marker());
        toc.add_entry("A", "A", 1);
        toc.force();
        assert!(!toc.is_visible(1));
        assert_eq!(toc.status(), TocStatus::Disabled);
    }

    #[test]
    fn visibility_threshold_and_force() {
        let mut toc = TableOfContents::default();
        toc.add_entry("A", "A", 2);
        assert!(!toc.is_visible(4));
        toc.force();
        assert!(toc.is_visible(4));
    }

    #[test]
    fn nested_levels_render_nested_lists() {
        let mut toc = TableOfContents::default();
        toc.add_entry("One", "One", 2);
        toc.add_entry("One_a", "One a", 3);
        toc.add_entry("Two", "Two", 2);
        let html = toc.to_html("Contents");
        assert_eq!(
            html,
            "<table id=\"toc\"><tr><td><div id=\"toctitle\"><h2>Contents</h2></div>\
             <ul><li class=\"toclevel-1\"><a href=\"#One\">One</a>\
             <ul><li class=\"toclevel-2\"><a href=\"#One_a\">One a</a></li></ul>\
             </li><li class=\"toclevel-1\"><a href=\"#Two\">Two</a></li></ul>\
             </td></tr></table>"
        );
    }
}
