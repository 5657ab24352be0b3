//! Unit stream -> HTML renderer.
//!
//! A render pass lexes its source and hands every unit to the handler for
//! its kind. Handlers that need nested markup rendered (link captions,
//! heading text, template bodies) call [`fragment`], which runs a fresh
//! pass under the recursion guard and folds the fragment's link and
//! template sets back into the caller's record.
//!
//! The [`Mode`] of a pass bounds what runs: a handler whose minimum depth
//! is deeper than the requested mode returns its unit text unchanged.

pub mod escape;
mod external;
mod heading;
mod layout;
pub mod link;
mod magic;
pub mod reference;
pub mod sanitize;
mod table;
mod template;
pub mod toc;

use crate::ast::UnitKind;
use crate::context::{DocumentMetadata, Mode, RenderContext};
use crate::error::Result;
use crate::parse::{lex, util::tag_content};

use escape::escape_html;
use toc::TOC_MARKER;

pub use external::build_html_link;
pub use link::{WikiLink, build_edit_link_url, build_internal_link_url, parse_wiki_link};
pub use magic::is_magic_word;
pub use template::parse_template_name;

/// Render a whole document.
///
/// At [`Mode::Layout`] and deeper the output is laid out into blocks and the
/// table of contents placeholder is resolved.
pub fn render(ctx: &mut RenderContext<'_>, source: &str, mode: Mode) -> Result<DocumentMetadata> {
    let mut doc = DocumentMetadata::default();
    let body = guarded_pass(ctx, source, mode, &mut doc)?;
    doc.content = if mode >= Mode::Layout {
        layout::layout_document(ctx, &body)
    } else {
        body
    };
    Ok(doc)
}

/// Collect links and templates without producing HTML.
pub fn render_metadata_only(ctx: &mut RenderContext<'_>, source: &str) -> Result<DocumentMetadata> {
    render(ctx, source, Mode::Preprocess)
}

/// Render a fragment of inline markup: no block layout, fresh metadata.
pub fn render_fragment(
    ctx: &mut RenderContext<'_>,
    source: &str,
    mode: Mode,
) -> Result<DocumentMetadata> {
    let mut doc = DocumentMetadata::default();
    doc.content = guarded_pass(ctx, source, mode, &mut doc)?;
    Ok(doc)
}

/// Render nested markup for a handler and merge its metadata into `parent`.
pub(crate) fn fragment(
    ctx: &mut RenderContext<'_>,
    source: &str,
    mode: Mode,
    parent: &mut DocumentMetadata,
) -> Result<String> {
    if source.trim().is_empty() {
        return Ok(source.to_string());
    }
    let nested = render_fragment(ctx, source, mode)?;
    parent.merge_from(&nested);
    Ok(nested.content)
}

fn guarded_pass(
    ctx: &mut RenderContext<'_>,
    source: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    let stripped;
    let source = if mode >= Mode::Layout && source.contains('\u{7f}') {
        stripped = source.replace('\u{7f}', "");
        stripped.as_str()
    } else {
        source
    };
    ctx.enter()?;
    let out = Pass::new(ctx, doc, mode).run(source);
    ctx.leave();
    out
}

/// One walk over a unit stream.
struct Pass<'p, 'a> {
    ctx: &'p mut RenderContext<'a>,
    doc: &'p mut DocumentMetadata,
    mode: Mode,
    // open emphasis runs, innermost last: 2 for italic, 3 for bold.
    emphasis: Vec<u8>,
}

impl<'p, 'a> Pass<'p, 'a> {
    fn new(ctx: &'p mut RenderContext<'a>, doc: &'p mut DocumentMetadata, mode: Mode) -> Self {
        Self {
            ctx,
            doc,
            mode,
            emphasis: Vec::new(),
        }
    }

    fn run(mut self, source: &str) -> Result<String> {
        let mut out = String::with_capacity(source.len() + source.len() / 4);
        for unit in lex(source) {
            let raw = unit.span.slice(source);
            self.dispatch(unit.kind, raw, &mut out)?;
        }
        self.close_emphasis(&mut out);
        Ok(out)
    }

    fn dispatch(&mut self, kind: UnitKind, raw: &str, out: &mut String) -> Result<()> {
        let mode = self.mode;
        let processing = mode >= Mode::Process;
        match kind {
            UnitKind::Text if processing => out.push_str(&escape_html(raw)),
            UnitKind::Text => out.push_str(raw),
            UnitKind::Newline => {
                if processing {
                    self.close_emphasis(out);
                }
                out.push('\n');
            }
            UnitKind::Heading => {
                self.close_emphasis(out);
                out.push_str(&heading::render_heading(self.ctx, raw, mode, self.doc)?);
            }
            UnitKind::WikiLink => {
                out.push_str(&link::render_wiki_link(self.ctx, raw, mode, self.doc)?)
            }
            UnitKind::ExternalLink => out.push_str(&external::render_external_link(raw, mode)?),
            UnitKind::BareUrl => out.push_str(&external::render_bare_url(raw, mode)?),
            UnitKind::Template => {
                out.push_str(&template::render_template(self.ctx, raw, mode, self.doc)?)
            }
            UnitKind::Param => {
                out.push_str(&template::render_param(self.ctx, raw, mode, self.doc)?)
            }
            UnitKind::Ref => out.push_str(&reference::render_ref(self.ctx, raw, mode)),
            UnitKind::References => {
                out.push_str(&reference::render_references(self.ctx, raw, mode, self.doc)?)
            }
            UnitKind::Comment if processing => {}
            UnitKind::NoWiki if processing => out.push_str(&escape_html(tag_content(raw))),
            UnitKind::Pre if processing => {
                out.push_str("<pre>");
                out.push_str(&escape_html(tag_content(raw)));
                out.push_str("</pre>");
            }
            UnitKind::Math if processing => {
                out.push_str("<div class=\"math\">");
                out.push_str(&escape_html(tag_content(raw).trim()));
                out.push_str("</div>");
            }
            UnitKind::HtmlTag if processing => out.push_str(&sanitize::sanitize_tag(
                raw,
                self.ctx.config().allow_javascript,
            )),
            UnitKind::Emphasis { quotes } if processing => self.emphasis(quotes, out),
            UnitKind::Switch if processing => self.switch(raw, out),
            UnitKind::Comment
            | UnitKind::NoWiki
            | UnitKind::Pre
            | UnitKind::Math
            | UnitKind::HtmlTag
            | UnitKind::Emphasis { .. }
            | UnitKind::Switch => out.push_str(raw),
        }
        Ok(())
    }

    fn emphasis(&mut self, quotes: u8, out: &mut String) {
        let order: Vec<u8> = match quotes {
            // close the innermost first when both are open.
            5 if self.emphasis.len() == 2 => self.emphasis.iter().rev().copied().collect(),
            5 => vec![3, 2],
            q => vec![q],
        };
        for q in order {
            self.toggle(q, out);
        }
    }

    fn toggle(&mut self, q: u8, out: &mut String) {
        let Some(pos) = self.emphasis.iter().position(|&o| o == q) else {
            self.emphasis.push(q);
            out.push_str(open_tag(q));
            return;
        };
        let reopen: Vec<u8> = self.emphasis.drain(pos + 1..).collect();
        for &o in reopen.iter().rev() {
            out.push_str(close_tag(o));
        }
        self.emphasis.pop();
        out.push_str(close_tag(q));
        for o in reopen {
            out.push_str(open_tag(o));
            self.emphasis.push(o);
        }
    }

    fn close_emphasis(&mut self, out: &mut String) {
        while let Some(q) = self.emphasis.pop() {
            out.push_str(close_tag(q));
        }
    }

    fn switch(&mut self, raw: &str, out: &mut String) {
        let contents = &mut self.ctx.toc;
        match raw {
            "__NOTOC__" => contents.disable(),
            "__FORCETOC__" => contents.force(),
            _ => {
                contents.force();
                contents.claim_marker();
                if contents.status() != toc::TocStatus::Disabled {
                    out.push_str(TOC_MARKER);
                }
            }
        }
    }
}

fn open_tag(q: u8) -> &'static str {
    if q == 3 { "<b>" } else { "<i>" }
}

fn close_tag(q: u8) -> &'static str {
    if q == 3 { "</b>" } else { "</i>" }
}
