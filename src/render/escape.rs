//! Escaping and URL encoding helpers.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;

/// Characters left alone by [`encode_for_url`]: alphanumerics, `-_.*` and
/// the path separators `:` and `/`.
const URL_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*')
    .remove(b':')
    .remove(b'/');

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .unwrap()
});

/// Length of a valid character entity at the start of `s`, if any.
pub fn entity_len(s: &str) -> Option<usize> {
    let m = ENTITY.find(s)?;
    let candidate = m.as_str();
    // unknown named entities decode to themselves.
    if html_escape::decode_html_entities(candidate) == candidate {
        return None;
    }
    Some(m.end())
}

/// Escape `&`, `<`, `>`, `"`, `'` and DEL, leaving existing entities intact.
///
/// Running this over its own output is a no-op.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'', '\u{7f}']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    let mut i = 0usize;
    while i < s.len() {
        let rem = &s[i..];
        let Some(ch) = rem.chars().next() else {
            break;
        };
        match ch {
            '&' => match entity_len(rem) {
                Some(n) => {
                    out.push_str(&rem[..n]);
                    i += n;
                    continue;
                }
                None => out.push_str("&amp;"),
            },
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\u{7f}' => out.push_str("&#127;"),
            _ => out.push(ch),
        }
        i += ch.len_utf8();
    }
    Cow::Owned(out)
}

/// Page name to URL path segment: spaces become underscores, everything but
/// alphanumerics, `-_.*:/` is percent-encoded.
pub fn encode_for_url(s: &str) -> String {
    utf8_percent_encode(&s.replace(' ', "_"), URL_SET).to_string()
}

/// Inverse of [`encode_for_url`]: `+` and `_` both decode to spaces.
pub fn decode_from_url(s: &str) -> String {
    let plus = s.replace('+', " ");
    percent_decode_str(&plus)
        .decode_utf8_lossy()
        .replace('_', " ")
}

/// Split trailing sentence punctuation off a URL.
pub fn split_trailing_punctuation(s: &str) -> (&str, &str) {
    let trimmed = s.trim_end_matches(['.', ';', ',', ':', '(', ')', '[', ']']);
    (trimmed, &s[trimmed.len()..])
}

/// Drop bold/italic quotes and link brackets, for anchor ids and TOC labels.
pub fn strip_markup(s: &str) -> String {
    s.replace("'''", "")
        .replace("''", "")
        .replace("[[", "")
        .replace("]]", "")
}
