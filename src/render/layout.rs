//! Block layout of a rendered document: paragraphs, lists, rules,
//! preformatted blocks, tables and the table of contents.

use super::table::render_table;
use super::toc::TOC_MARKER;
use crate::context::RenderContext;
use crate::parse::util::strip_cr;

/// Deeper list markers are dropped.
const MAX_LIST_DEPTH: usize = 32;

/// Lines starting with one of these tags are never wrapped in `<p>`.
const BLOCK_TAGS: &[&str] = &[
    "blockquote", "caption", "center", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4", "h5",
    "h6", "hr", "li", "ol", "p", "pre", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
    "ul",
];

/// Lay out a whole document and resolve its table of contents marker.
pub(crate) fn layout_document(ctx: &RenderContext<'_>, body: &str) -> String {
    let isolated = if body.contains(TOC_MARKER) {
        isolate_markers(body)
    } else {
        body.to_string()
    };
    let html = layout_blocks(&isolated, ctx.config().allow_javascript);
    resolve_toc(ctx, &html)
}

/// Put every marker on a line of its own.
fn isolate_markers(body: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in body.split('\n') {
        if !line.contains(TOC_MARKER) {
            lines.push(line);
            continue;
        }
        for (n, piece) in line.split(TOC_MARKER).enumerate() {
            if n > 0 {
                lines.push(TOC_MARKER);
            }
            let piece = piece.trim();
            if !piece.is_empty() {
                lines.push(piece);
            }
        }
    }
    lines.join("\n")
}

/// The first marker becomes the table of contents when it is visible; the
/// rest are dropped.
fn resolve_toc(ctx: &RenderContext<'_>, html: &str) -> String {
    if !html.contains(TOC_MARKER) {
        return html.to_string();
    }
    let toc = ctx.toc();
    let mut placed = false;
    let mut out: Vec<String> = Vec::new();
    for line in html.split('\n') {
        if line != TOC_MARKER {
            out.push(line.to_string());
            continue;
        }
        if !placed && toc.is_visible(ctx.config().toc_min_entries) {
            out.push(toc.to_html(&ctx.message("toc.title")));
        }
        placed = true;
    }
    out.join("\n")
}

/// Block structure for rendered text. Used for documents and for multiline
/// table cells.
pub(crate) fn layout_blocks(text: &str, allow_js: bool) -> String {
    let lines: Vec<&str> = text.split('\n').map(strip_cr).collect();
    let mut blocks = Blocks::default();
    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        if blocks.verbatim {
            blocks.verbatim_line(line);
            i += 1;
            continue;
        }
        if line.trim_start().starts_with("{|") {
            blocks.close_all();
            let (html, next) = render_table(&lines, i, allow_js);
            blocks.out.push(html);
            i = next;
            continue;
        }
        blocks.line(line);
        i += 1;
    }
    blocks.close_all();
    blocks.out.join("\n")
}

#[derive(Debug, Default)]
struct Blocks {
    out: Vec<String>,
    paragraph: Vec<String>,
    /// Open list levels by marker, outermost first.
    lists: Vec<u8>,
    pre: Vec<String>,
    /// Inside a `<pre>` element spanning lines.
    verbatim: bool,
}

impl Blocks {
    fn line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.close_all();
            return;
        }
        if trimmed == TOC_MARKER {
            self.close_all();
            self.out.push(TOC_MARKER.to_string());
            return;
        }
        if let Some(rest) = line.strip_prefix("----") {
            self.close_all();
            self.out.push("<hr />".to_string());
            let rest = rest.trim_start_matches('-').trim();
            if !rest.is_empty() {
                self.paragraph.push(rest.to_string());
            }
            return;
        }
        if line.starts_with(['*', '#', ':', ';']) {
            self.close_paragraph();
            self.close_pre();
            self.list_item(line);
            return;
        }
        if is_block_line(trimmed) {
            self.close_all();
            self.out.push(line.to_string());
            self.verbatim = opens_pre(line);
            return;
        }
        if let Some(pre_line) = line.strip_prefix(' ') {
            self.close_paragraph();
            self.close_lists();
            self.pre.push(pre_line.to_string());
            return;
        }
        self.close_lists();
        self.close_pre();
        self.paragraph.push(line.to_string());
        self.verbatim = opens_pre(line);
    }

    /// Lines inside a multiline `<pre>` join whatever block opened it.
    fn verbatim_line(&mut self, line: &str) {
        let target = if self.paragraph.is_empty() {
            &mut self.out
        } else {
            &mut self.paragraph
        };
        target.push(line.to_string());
        if line.contains("</pre>") {
            self.verbatim = false;
        }
    }

    fn list_item(&mut self, line: &str) {
        let markers = line.bytes().take_while(|b| b"*#:;".contains(b)).count();
        let prefix = &line.as_bytes()[..markers.min(MAX_LIST_DEPTH)];
        let content = line[markers..].trim();

        let common = self
            .lists
            .iter()
            .zip(prefix)
            .take_while(|&(a, b)| same_list(*a, *b))
            .count();

        let mut html = String::new();
        while self.lists.len() > common {
            if let Some(open) = self.lists.pop() {
                html.push_str(&format!("</{}></{}>", item_tag(open), list_tag(open)));
            }
        }
        if prefix.len() == common
            && let Some(open) = self.lists.pop()
        {
            let marker = prefix[common - 1];
            html.push_str(&format!("</{}><{}>", item_tag(open), item_tag(marker)));
            self.lists.push(marker);
        }
        for &marker in &prefix[common..] {
            html.push_str(&format!("<{}><{}>", list_tag(marker), item_tag(marker)));
            self.lists.push(marker);
        }

        match (self.lists.last(), find_outside_tags(content, ':')) {
            (Some(b';'), Some(pos)) => {
                html.push_str(content[..pos].trim_end());
                html.push_str("</dt><dd>");
                html.push_str(content[pos + 1..].trim_start());
                if let Some(last) = self.lists.last_mut() {
                    *last = b':';
                }
            }
            _ => html.push_str(content),
        }
        self.out.push(html);
    }

    fn close_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join("\n");
        self.paragraph.clear();
        self.out.push(format!("<p>{text}</p>"));
    }

    fn close_lists(&mut self) {
        if self.lists.is_empty() {
            return;
        }
        let mut html = String::new();
        while let Some(open) = self.lists.pop() {
            html.push_str(&format!("</{}></{}>", item_tag(open), list_tag(open)));
        }
        self.out.push(html);
    }

    fn close_pre(&mut self) {
        if self.pre.is_empty() {
            return;
        }
        let text = self.pre.join("\n");
        self.pre.clear();
        self.out.push(format!("<pre>{text}</pre>"));
    }

    fn close_all(&mut self) {
        self.close_paragraph();
        self.close_lists();
        self.close_pre();
    }
}

/// `;` and `:` items share one definition list.
fn same_list(a: u8, b: u8) -> bool {
    a == b || (matches!(a, b';' | b':') && matches!(b, b';' | b':'))
}

fn list_tag(marker: u8) -> &'static str {
    match marker {
        b'*' => "ul",
        b'#' => "ol",
        _ => "dl",
    }
}

fn item_tag(marker: u8) -> &'static str {
    match marker {
        b';' => "dt",
        b':' => "dd",
        _ => "li",
    }
}

fn is_block_line(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix('<') else {
        return false;
    };
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    BLOCK_TAGS.contains(&rest[..end].to_ascii_lowercase().as_str())
}

/// True when the last `<pre>` on the line is left open.
fn opens_pre(line: &str) -> bool {
    match (line.rfind("<pre>"), line.rfind("</pre>")) {
        (Some(open), Some(close)) => close < open,
        (Some(_), None) => true,
        _ => false,
    }
}

fn find_outside_tags(s: &str, needle: char) -> Option<usize> {
    let mut in_tag = false;
    for (i, c) in s.char_indices() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if c == needle && !in_tag => return Some(i),
            _ => {}
        }
    }
    None
}
