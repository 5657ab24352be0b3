//! Wikitext -> unit stream lexer.
//!
//! The lexer is **flat** and **error-tolerant**: it splits source text into
//! a sequence of [`Unit`]s that cover the input without gaps. Nested markup
//! (link captions, template arguments, reference bodies) stays inside the
//! enclosing unit and is lexed again when that unit renders.
//!
//! Anything that fails to close becomes plain text, so every input lexes.

pub mod util;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Unit, UnitKind};
use crate::render::sanitize::is_allowed_tag;

use util::{BraceMatch, index_braces, index_brackets, index_closing_tags, next_offset};

/// Protocols recognized for bare URLs in running text.
const BARE_URL_PROTOCOLS: &[&str] = &[
    "http://",
    "https://",
    "ftp://",
    "mailto:",
    "news:",
    "telnet://",
    "file://",
];

const SWITCHES: &[&str] = &["__NOTOC__", "__FORCETOC__", "__TOC__"];

/// Tags whose body runs to a matching close tag and is not lexed.
const BLOCK_TAGS: &[&str] = &["nowiki", "pre", "math", "ref", "references"];

static EXTERNAL_LINK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?:[A-Za-z][A-Za-z0-9+.\-]*://|(?i:mailto|news):)").unwrap()
});

/// Lex `src` into units. Spans are byte offsets into `src`.
pub fn lex(src: &str) -> Vec<Unit> {
    let mut lexer = Lexer::new(src);
    lexer.run();
    lexer.units
}

struct Lexer<'s> {
    src: &'s str,
    units: Vec<Unit>,
    text_start: usize,
    braces: HashMap<usize, BraceMatch>,
    brackets: HashMap<usize, usize>,
    closers: HashMap<&'static str, Vec<usize>>,
    /// Offsets of every `]` and newline; an external link ends at the first.
    link_stops: Vec<usize>,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            units: Vec::new(),
            text_start: 0,
            braces: index_braces(src),
            brackets: index_brackets(src),
            closers: index_closing_tags(src, BLOCK_TAGS),
            link_stops: src
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b']' || b == b'\n')
                .map(|(i, _)| i)
                .collect(),
        }
    }

    fn run(&mut self) {
        let src = self.src;
        let mut i = 0usize;
        while i < src.len() {
            if let Some((kind, start, end)) = self.match_unit(i) {
                self.flush_text(start);
                self.units.push(Unit::new(kind, start, end));
                self.text_start = end;
                i = end;
                continue;
            }
            i += src[i..].chars().next().map_or(1, char::len_utf8);
        }
        self.flush_text(src.len());
    }

    fn flush_text(&mut self, upto: usize) {
        if upto > self.text_start {
            self.units
                .push(Unit::new(UnitKind::Text, self.text_start, upto));
        }
        self.text_start = upto;
    }

    fn at_line_start(&self, i: usize) -> bool {
        i == 0 || self.src.as_bytes()[i - 1] == b'\n'
    }

    fn match_unit(&self, i: usize) -> Option<(UnitKind, usize, usize)> {
        let rem = &self.src[i..];
        match rem.as_bytes()[0] {
            b'\n' => Some((UnitKind::Newline, i, i + 1)),
            b'=' if self.at_line_start(i) => heading_len(rem).map(|n| (UnitKind::Heading, i, i + n)),
            b'<' => self.match_tag(i),
            b'[' => self.match_bracket(i),
            b'{' => self.match_brace(i),
            b'\'' => match_quotes(rem).map(|(kind, lead, n)| (kind, i + lead, i + n)),
            b'_' => SWITCHES
                .iter()
                .find(|s| rem.starts_with(**s))
                .map(|s| (UnitKind::Switch, i, i + s.len())),
            b'h' | b'H' | b'f' | b'F' | b'm' | b'M' | b'n' | b'N' | b't' | b'T' => {
                self.match_bare_url(i)
            }
            _ => None,
        }
    }

    fn match_tag(&self, i: usize) -> Option<(UnitKind, usize, usize)> {
        let rem = &self.src[i..];
        if rem.starts_with("<!--") {
            let end = rem[4..].find("-->").map_or(rem.len(), |p| 4 + p + 3);
            return Some((UnitKind::Comment, i, i + end));
        }

        let after = rem[1..].trim_start();
        let closing = after.starts_with('/');
        let name_src = if closing { after[1..].trim_start() } else { after };
        let name_len = name_src
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(name_src.len());
        if name_len == 0 {
            return None;
        }
        let name = name_src[..name_len].to_ascii_lowercase();
        let open_end = 1 + rem[1..].find(['<', '>'])?;
        if rem.as_bytes()[open_end] != b'>' {
            return None;
        }
        let open_tag = &rem[..=open_end];
        let self_closing = open_tag[..open_end].trim_end().ends_with('/');

        if !closing {
            let block = |kind: UnitKind| -> Option<(UnitKind, usize, usize)> {
                let closers = self.closers.get(name.as_str())?;
                let close_at = next_offset(closers, i + open_end + 1)?;
                // `</` + name + `>`
                Some((kind, i, close_at + name.len() + 3))
            };
            match name.as_str() {
                "nowiki" if self_closing => return Some((UnitKind::NoWiki, i, i + open_end + 1)),
                "nowiki" => return block(UnitKind::NoWiki),
                "pre" => return block(UnitKind::Pre),
                "math" => return block(UnitKind::Math),
                "ref" if self_closing => return Some((UnitKind::Ref, i, i + open_end + 1)),
                "ref" => return block(UnitKind::Ref),
                "references" => {
                    if self_closing {
                        return Some((UnitKind::References, i, i + open_end + 1));
                    }
                    return block(UnitKind::References)
                        .or(Some((UnitKind::References, i, i + open_end + 1)));
                }
                _ => {}
            }
        }

        if is_allowed_tag(&name) {
            return Some((UnitKind::HtmlTag, i, i + open_end + 1));
        }
        None
    }

    fn match_bracket(&self, i: usize) -> Option<(UnitKind, usize, usize)> {
        let rem = &self.src[i..];
        if rem.starts_with("[[") {
            return self
                .brackets
                .get(&i)
                .map(|&end| (UnitKind::WikiLink, i, end));
        }
        if !EXTERNAL_LINK_START.is_match(rem) {
            return None;
        }
        let close = next_offset(&self.link_stops, i)?;
        if self.src.as_bytes()[close] != b']' {
            return None;
        }
        Some((UnitKind::ExternalLink, i, close + 1))
    }

    fn match_brace(&self, i: usize) -> Option<(UnitKind, usize, usize)> {
        let m = self.braces.get(&i)?;
        let kind = if m.width == 3 {
            UnitKind::Param
        } else {
            UnitKind::Template
        };
        Some((kind, i + m.leftover, m.end))
    }

    fn match_bare_url(&self, i: usize) -> Option<(UnitKind, usize, usize)> {
        let prev = self.src[..i].chars().next_back();
        if prev.is_some_and(|c| c.is_alphanumeric() || c == '/' || c == '=') {
            return None;
        }
        let rem = &self.src[i..];
        let proto = BARE_URL_PROTOCOLS.iter().find(|p| {
            rem.len() > p.len() && rem.as_bytes()[..p.len()].eq_ignore_ascii_case(p.as_bytes())
        })?;
        let end = rem
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '[' | ']' | '"' | '{' | '}' | '|'))
            .unwrap_or(rem.len());
        if end <= proto.len() {
            return None;
        }
        Some((UnitKind::BareUrl, i, i + end))
    }
}

/// Length of a heading line (`=` ... `=`), trailing whitespace excluded.
fn heading_len(rem: &str) -> Option<usize> {
    let line = &rem[..rem.find('\n').unwrap_or(rem.len())];
    let trimmed = line.trim_end();
    if trimmed.len() >= 3 && trimmed.ends_with('=') {
        Some(trimmed.len())
    } else {
        None
    }
}

/// Apostrophe runs: 2 is italic, 3 bold, 5 both. A run of 4 leaves one
/// literal apostrophe; longer runs leave the excess.
fn match_quotes(rem: &str) -> Option<(UnitKind, usize, usize)> {
    let n = rem.bytes().take_while(|&b| b == b'\'').count();
    let (lead, quotes) = match n {
        0 | 1 => return None,
        2 | 3 => (0, n),
        4 => (1, 3),
        _ => (n - 5, 5),
    };
    Some((UnitKind::Emphasis { quotes: quotes as u8 }, lead, n))
}
