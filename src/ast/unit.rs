use serde::{Deserialize, Serialize};

use super::Span;

/// One syntactic unit produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub span: Span,
    pub kind: UnitKind,
}

impl Unit {
    pub fn new(kind: UnitKind, start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            kind,
        }
    }
}

/// The closed set of unit kinds. Every kind has exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitKind {
    /// Plain text, escaped on output.
    Text,
    Newline,
    /// A whole `== Title ==` line, without its newline.
    Heading,
    /// `[[...]]`, brackets included.
    WikiLink,
    /// `[scheme://... caption]`, brackets included.
    ExternalLink,
    /// A URL in running text.
    BareUrl,
    /// `{{...}}`.
    Template,
    /// `{{{...}}}`.
    Param,
    /// `<ref ...>...</ref>` or `<ref .../>`.
    Ref,
    /// `<references/>`.
    References,
    /// `<math>...</math>`.
    Math,
    /// `<nowiki>...</nowiki>`.
    NoWiki,
    /// `<pre>...</pre>`.
    Pre,
    /// `<!-- ... -->`.
    Comment,
    /// A single whitelisted HTML tag (opening, closing or self-closing).
    HtmlTag,
    /// A run of 2, 3 or 5 apostrophes.
    Emphasis { quotes: u8 },
    /// `__TOC__`, `__NOTOC__` or `__FORCETOC__`.
    Switch,
}
