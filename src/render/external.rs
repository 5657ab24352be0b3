//! External links: `[http://host/path caption]` and bare URLs in text.

use super::escape::{escape_html, split_trailing_punctuation};
use crate::context::Mode;
use crate::error::{RenderError, Result};

const PROTOCOLS: &[&str] = &[
    "http://",
    "https://",
    "ftp://",
    "mailto:",
    "news:",
    "telnet://",
    "file://",
];

pub(crate) fn render_external_link(raw: &str, mode: Mode) -> Result<String> {
    if mode < Mode::Process {
        return Ok(raw.to_string());
    }
    let inner = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    if inner.trim().is_empty() {
        return Ok(escape_html(raw).into_owned());
    }
    build_html_link(inner)
}

pub(crate) fn render_bare_url(raw: &str, mode: Mode) -> Result<String> {
    if mode < Mode::Process {
        return Ok(raw.to_string());
    }
    build_html_link(raw)
}

/// Anchor HTML for `url[ caption]`.
///
/// Without a caption, trailing sentence punctuation is moved after the
/// anchor. Fails with [`RenderError::InvalidProtocol`] for anything outside
/// the protocol whitelist.
pub fn build_html_link(raw: &str) -> Result<String> {
    let content = raw.trim();
    let split = content.find(' ').or_else(|| content.find('\t'));
    let (link, text, punctuation) = match split {
        Some(pos) if pos > 0 => (
            content[..pos].trim(),
            Some(content[pos + 1..].trim()).filter(|t| !t.is_empty()),
            "",
        ),
        _ => {
            let (link, punctuation) = split_trailing_punctuation(content);
            (link.trim(), None, punctuation)
        }
    };

    let lower = link.to_ascii_lowercase();
    let link = match lower.strip_prefix("mailto://") {
        Some(rest) => format!("mailto:{}", &link[link.len() - rest.len()..]),
        None => link.to_string(),
    };
    let lower = link.to_ascii_lowercase();
    let Some(protocol) = PROTOCOLS.iter().find(|p| lower.starts_with(**p)) else {
        return Err(RenderError::InvalidProtocol(link));
    };

    let target = link[protocol.len()..]
        .replace('<', "%3C")
        .replace('>', "%3E")
        .replace('"', "%22")
        .replace('\'', "%27");
    let href = escape_html(&format!("{protocol}{target}")).into_owned();
    let text = escape_html(text.unwrap_or(&link)).into_owned();
    Ok(format!(
        "<a class=\"externallink\" rel=\"nofollow\" title=\"{text}\" href=\"{href}\">{text}</a>{punctuation}"
    ))
}
