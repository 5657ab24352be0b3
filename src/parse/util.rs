//! Scanning helpers shared by the lexer, the template engine and layout.

use std::collections::HashMap;

pub fn strip_cr(s: &str) -> &str {
    s.strip_suffix('\r').unwrap_or(s)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttr {
    pub name: String,
    pub value: Option<String>,
}

/// Split an attribute string such as `style="text-align:center;" rowspan=2`
/// into name/value pairs. Bare names have no value; an unterminated quote
/// runs to the end of input.
pub fn parse_html_attrs(s: &str) -> Vec<HtmlAttr> {
    let mut attrs = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        if name_len == 0 {
            rest = rest[1..].trim_start();
            continue;
        }
        let name = rest[..name_len].to_string();
        rest = rest[name_len..].trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            attrs.push(HtmlAttr { name, value: None });
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (value, tail) = match after_eq.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                match body.find(quote) {
                    Some(close) => (&body[..close], &body[close + 1..]),
                    None => (body, ""),
                }
            }
            Some(_) => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                after_eq.split_at(end)
            }
            None => ("", ""),
        };
        let value = (!after_eq.is_empty()).then(|| value.to_string());
        attrs.push(HtmlAttr { name, value });
        rest = tail.trim_start();
    }
    attrs
}

/// Value of attribute `name` in an opening tag such as `<ref name="a">`.
pub fn tag_attribute(open_tag: &str, name: &str) -> Option<String> {
    let inner = open_tag
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    let attrs_start = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    parse_html_attrs(&inner[attrs_start..])
        .into_iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .and_then(|a| a.value)
        .map(|v| v.trim().to_string())
}

/// Text between the first `>` and the last `<` of `<tag ...>content</tag>`.
pub fn tag_content(raw: &str) -> &str {
    let Some(open_end) = raw.find('>') else {
        return "";
    };
    let Some(close_start) = raw.rfind('<') else {
        return "";
    };
    if close_start <= open_end {
        return "";
    }
    &raw[open_end + 1..close_start]
}

/// Offsets of every `</name>` in `s` for each of `names`, ascending.
/// Tag names match ASCII case-insensitively.
pub fn index_closing_tags(
    s: &str,
    names: &[&'static str],
) -> HashMap<&'static str, Vec<usize>> {
    let bytes = s.as_bytes();
    let mut found: HashMap<&'static str, Vec<usize>> = HashMap::new();
    let mut from = 0usize;
    while let Some(rel) = s[from..].find("</") {
        let at = from + rel;
        let rest = &bytes[at + 2..];
        let closed = names.iter().find(|name| {
            rest.len() > name.len()
                && rest[..name.len()].eq_ignore_ascii_case(name.as_bytes())
                && rest[name.len()] == b'>'
        });
        if let Some(name) = closed {
            found.entry(*name).or_default().push(at);
        }
        from = at + 2;
    }
    found
}

/// First offset in the ascending `offsets` at or after `from`.
pub fn next_offset(offsets: &[usize], from: usize) -> Option<usize> {
    offsets.get(offsets.partition_point(|&p| p < from)).copied()
}

/// Result of matching a run of opening braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceMatch {
    /// Byte offset just past the closing braces.
    pub end: usize,
    /// Opening braces left unmatched at the front (literal text).
    pub leftover: usize,
    /// Width of the final closing run: 3 for a parameter, 2 for a template.
    pub width: usize,
}

/// Match the run of `{` at the start of `s`.
///
/// Closing runs pair with the innermost open run, taking three braces when
/// both sides have three and two otherwise. An opening run that is only
/// partly closed leaves its unmatched braces as literal text.
pub fn match_braces(s: &str) -> Option<BraceMatch> {
    if !s.starts_with("{{") {
        return None;
    }
    scan_braces(s, true).remove(&0)
}

/// Every brace match in `s`, keyed by the byte offset of its opening run.
pub fn index_braces(s: &str) -> HashMap<usize, BraceMatch> {
    scan_braces(s, false)
}

struct OpenRun {
    pos: usize,
    remaining: usize,
    last_close: Option<(usize, usize)>,
}

fn scan_braces(s: &str, first_only: bool) -> HashMap<usize, BraceMatch> {
    let bytes = s.as_bytes();
    let mut found = HashMap::new();
    let mut stack: Vec<OpenRun> = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let run = run_len(bytes, i, b'{');
                if run >= 2 {
                    stack.push(OpenRun {
                        pos: i,
                        remaining: run,
                        last_close: None,
                    });
                }
                i += run;
            }
            b'}' => {
                let run = run_len(bytes, i, b'}');
                let mut left = run;
                while left >= 2 {
                    let Some(top) = stack.last_mut() else {
                        break;
                    };
                    let width = if top.remaining >= 3 && left >= 3 { 3 } else { 2 };
                    top.remaining -= width;
                    left -= width;
                    let end = i + (run - left);
                    top.last_close = Some((end, width));
                    if top.remaining < 2 {
                        let leftover = top.remaining;
                        let pos = top.pos;
                        stack.pop();
                        found.insert(pos, BraceMatch { end, leftover, width });
                        if first_only && pos == 0 {
                            return found;
                        }
                    }
                }
                i += run;
            }
            _ => i += 1,
        }
    }
    for open in stack {
        if let Some((end, width)) = open.last_close {
            found.insert(
                open.pos,
                BraceMatch {
                    end,
                    leftover: open.remaining,
                    width,
                },
            );
        }
    }
    found
}

/// Every `[[` with its matching `]]`, as opening offset -> offset past the close.
pub fn index_brackets(s: &str) -> HashMap<usize, usize> {
    let bytes = s.as_bytes();
    let mut found = HashMap::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut i = 0usize;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'[', b'[') => {
                stack.push(i);
                i += 2;
            }
            (b']', b']') => {
                if let Some(pos) = stack.pop() {
                    found.insert(pos, i + 2);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    found
}

fn run_len(bytes: &[u8], start: usize, b: u8) -> usize {
    bytes[start..].iter().take_while(|&&c| c == b).count()
}

/// Match `[[` at the start of `s` against its `]]`, honoring nesting.
pub fn match_brackets(s: &str) -> Option<usize> {
    match_pair(s, "[[", "]]")
}

/// Match `{|` at the start of `s` against its `|}`, honoring nesting.
pub fn match_table(s: &str) -> Option<usize> {
    match_pair(s, "{|", "|}")
}

fn match_pair(s: &str, open: &str, close: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0usize;
    let bytes = s.as_bytes();
    while i < bytes.len() {
        let rem = &s[i..];
        if rem.starts_with(open) {
            depth += 1;
            i += open.len();
            continue;
        }
        if rem.starts_with(close) {
            if depth == 0 {
                return None;
            }
            depth -= 1;
            i += close.len();
            if depth == 0 {
                return Some(i);
            }
            continue;
        }
        i += 1;
        while i < bytes.len() && !s.is_char_boundary(i) {
            i += 1;
        }
    }
    None
}

/// Split by `delim` at top level, treating balanced `{{{...}}}`, `{{...}}`,
/// `[[...]]` and `{|...|}` spans as atomic. Returns byte ranges into `s`.
pub fn split_top_level(s: &str, delim: char) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0usize;
    let mut seg_start = 0usize;
    while i < s.len() {
        let rem = &s[i..];
        if rem.starts_with("{{") {
            match match_braces(rem) {
                Some(m) => i += m.end,
                None => i += run_len(rem.as_bytes(), 0, b'{'),
            }
            continue;
        }
        if rem.starts_with("{|") {
            i += match_table(rem).unwrap_or(2);
            continue;
        }
        if rem.starts_with("[[") {
            i += match_brackets(rem).unwrap_or(2);
            continue;
        }
        let Some(ch) = rem.chars().next() else {
            break;
        };
        if ch == delim {
            out.push((seg_start, i));
            i += ch.len_utf8();
            seg_start = i;
            continue;
        }
        i += ch.len_utf8();
    }
    out.push((seg_start, s.len()));
    out
}
