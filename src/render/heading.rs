//! `== Heading ==` lines.

use super::escape::{encode_for_url, escape_html, strip_markup};
use super::link::build_edit_link_url;
use super::toc::TOC_MARKER;
use crate::context::{DocumentMetadata, Mode, RenderContext};
use crate::error::Result;

const MAX_LEVEL: usize = 5;

/// Level and inner text of a heading line, checking the deepest level first.
pub(crate) fn parse_heading(raw: &str) -> Option<(u8, &str)> {
    let line = raw.trim();
    for level in (1..=MAX_LEVEL).rev() {
        let marks = &"====="[..level];
        if line.len() > 2 * level && line.starts_with(marks) && line.ends_with(marks) {
            let inner = line[level..line.len() - level].trim();
            if inner.is_empty() {
                return None;
            }
            return Some((level as u8, inner));
        }
    }
    None
}

pub(crate) fn render_heading(
    ctx: &mut RenderContext<'_>,
    raw: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    let Some((level, inner)) = parse_heading(raw) else {
        return Ok(raw.to_string());
    };
    let label = heading_label(ctx, inner, mode, doc)?;
    let anchor = encode_for_url(&label);

    if mode == Mode::Slice {
        if doc.section_name.is_none() {
            doc.section_name = Some(anchor);
        }
        return Ok(raw.to_string());
    }
    if mode < Mode::Process {
        return Ok(raw.to_string());
    }

    let mut html = String::new();
    if ctx.toc.claim_marker() {
        html.push_str(TOC_MARKER);
    }
    ctx.toc.add_entry(&anchor, &label, level);

    if ctx.allow_section_edit && !ctx.scratch.inside_inclusion {
        let section = ctx.toc.len();
        let page = ctx.page_name.clone();
        let url = build_edit_link_url(ctx, &page, section)?;
        html.push_str(&format!(
            "<div style=\"font-size:90%;float:right;margin-left:5px;\">[<a href=\"{}\">{}</a>]</div>",
            url,
            escape_html(&ctx.message("common.sectionedit"))
        ));
    }

    let body = super::fragment(ctx, inner, mode, doc)?;
    html.push_str(&format!("<h{level} id=\"{anchor}\">{body}</h{level}>"));
    Ok(html)
}

/// Plain text of a heading, for its anchor and table of contents entry.
///
/// Template calls in the text are expanded first so `== {{PAGENAME}} ==`
/// anchors on the page name rather than the markup.
fn heading_label(
    ctx: &mut RenderContext<'_>,
    inner: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    let stripped = strip_markup(inner);
    if mode < Mode::Template || !stripped.contains("{{") {
        return Ok(stripped.trim().to_string());
    }
    let expanded = super::fragment(ctx, &stripped, Mode::Template, doc)?;
    Ok(super::link::plain_text(&expanded).trim().to_string())
}
