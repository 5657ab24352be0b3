//! Wiki tables: `{|` ... `|}` blocks laid out as `<table>` markup.
//!
//! Runs on rendered lines, so attribute quotes arrive entity-escaped and
//! any `<` is the start of a real tag.

use super::layout::layout_blocks;
use super::sanitize::sanitize_attrs;

#[derive(Debug)]
struct CellBuilder {
    header: bool,
    attrs: String,
    content: String,
}

#[derive(Debug, Default)]
struct RowBuilder {
    attrs: String,
    cells: Vec<String>,
}

struct TableBuilder {
    allow_js: bool,
    attrs: String,
    caption: Option<String>,
    rows: Vec<String>,
    row: Option<RowBuilder>,
    cell: Option<CellBuilder>,
}

impl TableBuilder {
    fn new(attrs: &str, allow_js: bool) -> Self {
        Self {
            allow_js,
            attrs: sanitize_attrs(attrs, allow_js),
            caption: None,
            rows: Vec::new(),
            row: None,
            cell: None,
        }
    }

    fn finish_cell(&mut self) {
        let Some(cell) = self.cell.take() else {
            return;
        };
        let html = cell_html(&cell, self.allow_js);
        self.row.get_or_insert_with(RowBuilder::default).cells.push(html);
    }

    fn finish_row(&mut self) {
        self.finish_cell();
        let Some(row) = self.row.take() else {
            return;
        };
        if row.cells.is_empty() {
            return;
        }
        self.rows.push(format!(
            "<tr{}>{}</tr>",
            attr_prefix(&row.attrs),
            row.cells.concat()
        ));
    }

    fn append_to_cell(&mut self, line: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.content.push('\n');
            cell.content.push_str(line);
        }
    }

    fn into_html(mut self) -> String {
        self.finish_row();
        let mut html = format!("<table{}>", attr_prefix(&self.attrs));
        if let Some(caption) = self.caption {
            html.push_str(&caption);
        }
        html.push_str(&self.rows.concat());
        html.push_str("</table>");
        html
    }
}

fn attr_prefix(attrs: &str) -> String {
    if attrs.is_empty() {
        String::new()
    } else {
        format!(" {attrs}")
    }
}

fn cell_html(cell: &CellBuilder, allow_js: bool) -> String {
    let tag = if cell.header { "th" } else { "td" };
    let content = if cell.content.contains('\n') {
        layout_blocks(cell.content.trim_matches('\n'), allow_js)
    } else {
        cell.content.trim().to_string()
    };
    format!("<{tag}{}>{content}</{tag}>", attr_prefix(&cell.attrs))
}

/// Lay out the table starting at `lines[start]` (a `{|` line). Returns the
/// HTML and the index of the first line after the closing `|}`; an
/// unterminated table runs to the end of input.
pub(crate) fn render_table(lines: &[&str], start: usize, allow_js: bool) -> (String, usize) {
    let opening = lines[start].trim_start();
    let mut table = TableBuilder::new(opening.strip_prefix("{|").unwrap_or(""), allow_js);

    let mut i = start + 1;
    // nesting of tables inside the current cell.
    let mut depth = 1usize;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();
        i += 1;

        if trimmed.starts_with("{|") {
            depth += 1;
            table.append_to_cell(line);
            continue;
        }
        if trimmed.starts_with("|}") {
            if depth == 1 {
                return (table.into_html(), i);
            }
            depth -= 1;
            table.append_to_cell(line);
            continue;
        }
        if depth > 1 {
            table.append_to_cell(line);
            continue;
        }

        if let Some(after) = trimmed.strip_prefix("|+") {
            table.finish_row();
            let (attrs, content) = split_attrs_content(after);
            table.caption = Some(format!(
                "<caption{}>{}</caption>",
                attr_prefix(&sanitize_attrs(attrs, allow_js)),
                content.trim()
            ));
            continue;
        }

        if let Some(after) = trimmed.strip_prefix("|-") {
            table.finish_row();
            table.row = Some(RowBuilder {
                attrs: sanitize_attrs(after.trim_start_matches('-'), allow_js),
                cells: Vec::new(),
            });
            continue;
        }

        if let Some(marker) = trimmed.chars().next().filter(|c| *c == '!' || *c == '|') {
            table.finish_cell();
            let header = marker == '!';
            let rest = &trimmed[1..];
            let segments = if header {
                split_cells(rest, &["!!", "||"])
            } else {
                split_cells(rest, &["||"])
            };
            let last = segments.len() - 1;
            for (n, segment) in segments.into_iter().enumerate() {
                let (attrs, content) = split_attrs_content(segment);
                // the space after `|` is not a preformatted-line indent.
                table.cell = Some(CellBuilder {
                    header,
                    attrs: sanitize_attrs(attrs, allow_js),
                    content: content.trim_start_matches([' ', '\t']).to_string(),
                });
                // only the last cell on a line continues onto following lines.
                if n != last {
                    table.finish_cell();
                }
            }
            continue;
        }

        if table.cell.is_some() {
            table.append_to_cell(line);
        } else if !trimmed.is_empty() {
            tracing::debug!(line = %trimmed, "Unexpected line inside table");
        }
    }
    (table.into_html(), i)
}

/// Split a cell line on top-level separators, skipping tags, links and
/// template calls.
fn split_cells<'l>(rest: &'l str, separators: &[&str]) -> Vec<&'l str> {
    let mut out = Vec::new();
    let mut last = 0usize;
    let mut scan = Scanner::default();
    let mut i = 0usize;
    while i < rest.len() {
        let rem = &rest[i..];
        if let Some(skip) = scan.step(rem) {
            i += skip;
            continue;
        }
        if scan.at_top()
            && let Some(sep) = separators.iter().find(|s| rem.starts_with(**s))
        {
            out.push(&rest[last..i]);
            i += sep.len();
            last = i;
            continue;
        }
        i += rem.chars().next().map_or(1, char::len_utf8);
    }
    out.push(&rest[last..]);
    out
}

/// `attrs | content` within one cell segment; no separator means the whole
/// segment is content.
fn split_attrs_content(segment: &str) -> (&str, &str) {
    let mut scan = Scanner::default();
    let mut i = 0usize;
    while i < segment.len() {
        let rem = &segment[i..];
        if let Some(skip) = scan.step(rem) {
            i += skip;
            continue;
        }
        if scan.at_top() && rem.starts_with('|') {
            return (&segment[..i], &segment[i + 1..]);
        }
        i += rem.chars().next().map_or(1, char::len_utf8);
    }
    ("", segment)
}

/// Depth tracking for `<...>`, `[[...]]` and `{{...}}` while scanning a
/// cell line.
#[derive(Debug, Default)]
struct Scanner {
    in_tag: bool,
    links: usize,
    templates: usize,
}

impl Scanner {
    fn at_top(&self) -> bool {
        !self.in_tag && self.links == 0 && self.templates == 0
    }

    /// Bytes consumed by a delimiter at the start of `rem`, if any.
    fn step(&mut self, rem: &str) -> Option<usize> {
        if self.in_tag {
            if rem.starts_with('>') {
                self.in_tag = false;
            }
            return Some(rem.chars().next().map_or(1, char::len_utf8));
        }
        if rem.starts_with('<') {
            self.in_tag = true;
            return Some(1);
        }
        for (open, close, depth) in [
            ("[[", "]]", &mut self.links),
            ("{{", "}}", &mut self.templates),
        ] {
            if rem.starts_with(open) {
                *depth += 1;
                return Some(2);
            }
            if rem.starts_with(close) && *depth > 0 {
                *depth -= 1;
                return Some(2);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> String {
        let lines: Vec<&str> = src.split('\n').collect();
        let (html, next) = render_table(&lines, 0, false);
        assert_eq!(next, lines.len());
        html
    }

    #[test]
    fn caption_headers_and_cells() {
        let src = "{| class=&quot;wikitable&quot;\n|+ Cap\n|-\n! A !! B\n|-\n\
                   | 1 || style=&quot;color:red&quot; | 2\n|}";
        assert_eq!(
            table(src),
            "<table class=\"wikitable\"><caption>Cap</caption>\
             <tr><th>A</th><th>B</th></tr>\
             <tr><td>1</td><td style=\"color:red\">2</td></tr></table>"
        );
    }

    #[test]
    fn implicit_first_row_and_empty_rows_dropped() {
        assert_eq!(
            table("{|\n| a\n|-\n|-\n| b\n|}"),
            "<table><tr><td>a</td></tr><tr><td>b</td></tr></table>"
        );
    }

    #[test]
    fn script_attributes_are_dropped() {
        assert_eq!(
            table("{| onclick=&quot;x()&quot;\n| y\n|}"),
            "<table><tr><td>y</td></tr></table>"
        );
    }

    #[test]
    fn encoded_tabs_do_not_hide_javascript_urls() {
        assert_eq!(
            table("{|\n| title=&quot;java&#9;script:x&quot; | y\n|}"),
            "<table><tr><td>y</td></tr></table>"
        );
    }

    #[test]
    fn multiline_cells_are_laid_out() {
        assert_eq!(
            table("{|\n| first\n\nsecond\n|}"),
            "<table><tr><td><p>first</p>\n<p>second</p></td></tr></table>"
        );
    }

    #[test]
    fn separators_inside_tags_are_ignored() {
        let src = "{|\n| <a title=\"x|y\" href=\"/a\">l</a> || b\n|}";
        assert_eq!(
            table(src),
            "<table><tr><td><a title=\"x|y\" href=\"/a\">l</a></td><td>b</td></tr></table>"
        );
    }

    #[test]
    fn cell_padding_is_not_preformatted() {
        assert_eq!(
            table("{|\n|   padded\n  more\n! head\n|}"),
            "<table><tr><td><p>padded</p>\n<pre> more</pre></td><th>head</th></tr></table>"
        );
    }

    #[test]
    fn nested_tables() {
        let html = table("{|\n| outer\n{|\n| inner\n|}\n|}");
        assert_eq!(
            html,
            "<table><tr><td><p>outer</p>\n<table><tr><td>inner</td></tr></table></td></tr></table>"
        );
    }

    #[test]
    fn unterminated_table_still_closes() {
        let lines = ["{|", "| a"];
        let (html, next) = render_table(&lines, 0, false);
        assert_eq!(html, "<table><tr><td>a</td></tr></table>");
        assert_eq!(next, 2);
    }
}
