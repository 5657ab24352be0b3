//! Footnote references: `<ref>` collects, `<references/>` drains.

use serde::{Deserialize, Serialize};

use crate::context::{DocumentMetadata, Mode, RenderContext};
use crate::error::Result;
use crate::parse::util::{tag_attribute, tag_content};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiReference {
    pub name: Option<String>,
    pub content: String,
    /// Footnote number, shared by references with the same name.
    pub citation: usize,
    /// Occurrence index within the citation.
    pub count: usize,
}

impl WikiReference {
    /// Anchor of the `<sup>` in running text.
    pub fn reference_id(&self) -> String {
        if self.count == 0 {
            format!("_ref-{}", self.citation)
        } else {
            format!("_ref-{}_{}", self.citation, self.count)
        }
    }

    /// Anchor of the list item under `<references/>`.
    pub fn notation_id(&self) -> String {
        format!("_note-{}", self.citation)
    }
}

/// Register a reference and return its superscript marker.
pub(crate) fn render_ref(ctx: &mut RenderContext<'_>, raw: &str, mode: Mode) -> String {
    if mode < Mode::Process {
        return raw.to_string();
    }
    let open = raw.split('>').next().unwrap_or_default();
    let name = tag_attribute(open, "name").filter(|n| !n.is_empty());
    let content = if open.ends_with('/') {
        String::new()
    } else {
        tag_content(raw).trim().to_string()
    };
    let reference = build_reference(ctx, name, content);
    let html = format!(
        "<sup id=\"{}\" class=\"reference\"><a href=\"#{}\" title=\"\">[{}]</a></sup>",
        reference.reference_id(),
        reference.notation_id(),
        reference.citation
    );
    ctx.scratch.references.push(reference);
    html
}

fn build_reference(ctx: &mut RenderContext<'_>, name: Option<String>, content: String) -> WikiReference {
    if let Some(n) = &name
        && let Some(prev) = ctx
            .scratch
            .references
            .iter()
            .filter(|r| r.name.as_ref() == Some(n))
            .max_by_key(|r| r.count)
    {
        return WikiReference {
            citation: prev.citation,
            count: prev.count + 1,
            name,
            content,
        };
    }
    ctx.scratch.last_citation += 1;
    WikiReference {
        name,
        content,
        citation: ctx.scratch.last_citation,
        count: 0,
    }
}

/// Drain collected references into an ordered list.
pub(crate) fn render_references(
    ctx: &mut RenderContext<'_>,
    raw: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    if mode < Mode::Layout {
        return Ok(raw.to_string());
    }
    let mut pending = std::mem::take(&mut ctx.scratch.references);
    if pending.is_empty() {
        return Ok(String::new());
    }

    let mut html = String::from("<ol class=\"references\">");
    while !pending.is_empty() {
        let first = pending.remove(0);
        let mut group = vec![first];
        if let Some(name) = group[0].name.clone() {
            let mut i = 0;
            while i < pending.len() {
                if pending[i].name.as_deref() == Some(name.as_str()) {
                    group.push(pending.remove(i));
                } else {
                    i += 1;
                }
            }
        }

        let head = &group[0];
        html.push_str(&format!("<li id=\"{}\"><sup>", head.notation_id()));
        if group.len() > 1 {
            let links: Vec<String> = group
                .iter()
                .map(|r| {
                    format!(
                        "<a href=\"#{}\" title=\"\">{}.{}</a>",
                        r.reference_id(),
                        r.citation,
                        r.count
                    )
                })
                .collect();
            html.push_str(&links.join("&#160;"));
        } else {
            html.push_str(&format!(
                "<a href=\"#{}\" title=\"\">{}</a>",
                head.reference_id(),
                head.citation
            ));
        }
        html.push_str("</sup> ");

        // a bare `<ref name="x"/>` may come before the one with content.
        let content = group
            .iter()
            .map(|r| r.content.as_str())
            .find(|c| !c.is_empty())
            .unwrap_or_default()
            .to_string();
        html.push_str(&super::fragment(ctx, &content, mode.max(Mode::Process), doc)?);
        html.push_str("</li>");
    }
    html.push_str("</ol>");
    Ok(html)
}
