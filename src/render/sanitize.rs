//! Inline HTML tag sanitizer.
//!
//! Tags are normalized to `<name attr="value">` form. When any attribute
//! looks script-bearing, every attribute of that tag is dropped.

use std::sync::LazyLock;

use regex::Regex;

use super::escape::escape_html;
use crate::parse::util::parse_html_attrs;

/// Tag names the lexer treats as markup. Anything else is escaped as text.
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "audio", "b", "big", "blockquote", "br", "caption", "center", "cite", "code",
    "dd", "del", "div", "dl", "dt", "em", "font", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i",
    "img", "ins", "kbd", "li", "ol", "p", "s", "samp", "small", "source", "span", "strike",
    "strong", "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "tt", "u",
    "ul", "var", "video",
];

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^<\s*(/?)\s*([^\s/>]+)(.*?)(/?)\s*>$").unwrap());

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|[\s"'/])on[a-z]+\s*="#).unwrap());

static JAVASCRIPT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").unwrap());

pub fn is_allowed_tag(name: &str) -> bool {
    ALLOWED_TAGS.contains(&name.to_ascii_lowercase().as_str())
}

/// True if the attribute text carries an event handler or a `javascript:` URL.
///
/// Browsers drop tabs, newlines and other ASCII controls inside a URL
/// scheme, so those are removed before looking for `javascript:`.
pub fn is_script_bearing(attrs: &str) -> bool {
    let decoded = html_escape::decode_html_entities(attrs);
    if EVENT_HANDLER.is_match(&decoded) {
        return true;
    }
    let visible: String = decoded.chars().filter(|c| !c.is_ascii_control()).collect();
    JAVASCRIPT_URL.is_match(&visible)
}

/// Normalize and sanitize a single raw tag such as `<IMG  src="a.png" />`.
///
/// Text that is not a tag comes back escaped.
pub fn sanitize_tag(raw: &str, allow_javascript: bool) -> String {
    let Some(caps) = TAG.captures(raw.trim()) else {
        return escape_html(raw).into_owned();
    };
    let closing = !caps[1].is_empty();
    let keyword = caps[2].trim().to_ascii_lowercase();
    let attrs = caps[3].trim();
    let self_closing = !caps[4].is_empty();

    let mut out = String::from("<");
    if closing {
        out.push('/');
    }
    out.push_str(&keyword);
    if !closing && !attrs.is_empty() {
        if !allow_javascript && is_script_bearing(attrs) {
            tracing::warn!(tag = %keyword, attributes = %attrs, "Stripped script-bearing attributes");
        } else {
            let serialized = serialize_attrs(attrs);
            if !serialized.is_empty() {
                out.push(' ');
                out.push_str(&serialized);
            }
        }
    }
    if self_closing {
        out.push_str(" /");
    }
    out.push('>');
    out
}

/// Re-serialize attributes as `name="value"` pairs with escaped values.
pub fn serialize_attrs(attrs: &str) -> String {
    parse_html_attrs(attrs)
        .into_iter()
        .filter(|a| a.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'))
        .map(|a| match a.value {
            Some(v) => format!("{}=\"{}\"", a.name.to_ascii_lowercase(), escape_html(&v)),
            None => a.name.to_ascii_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitized attribute string for table markup (`{| class="x"`), or empty.
pub fn sanitize_attrs(attrs: &str, allow_javascript: bool) -> String {
    let decoded = html_escape::decode_html_entities(attrs.trim());
    if decoded.is_empty() {
        return String::new();
    }
    if !allow_javascript && is_script_bearing(&decoded) {
        tracing::warn!(attributes = %decoded, "Stripped script-bearing attributes");
        return String::new();
    }
    serialize_attrs(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_event_handlers_entirely() {
        let out = sanitize_tag(r#"<img onmouseover="evil()" src="a.png">"#, false);
        assert_eq!(out, "<img>");
    }

    #[test]
    fn strips_javascript_urls() {
        assert_eq!(sanitize_tag(r#"<a href="javascript:alert(1)">"#, false), "<a>");
        assert_eq!(
            sanitize_tag(r#"<a href="jav&#97;script :alert(1)">"#, false),
            "<a>"
        );
    }

    #[test]
    fn control_characters_do_not_hide_javascript_urls() {
        for href in ["java&#x09;script:alert(1)", "java&#9;script:alert(1)", "java&#10;script:x"] {
            assert_eq!(sanitize_tag(&format!("<a href=\"{href}\">"), false), "<a>", "{href}");
        }
        assert_eq!(sanitize_tag("<a href=\"java\tscript:x\">", false), "<a>");
        assert_eq!(sanitize_attrs("href=&quot;java&#9;script:x&quot;", false), "");
        assert!(!is_script_bearing("title=\"java script\""));
    }

    #[test]
    fn allow_javascript_keeps_attributes() {
        assert_eq!(
            sanitize_tag(r#"<img onmouseover="x()">"#, true),
            "<img onmouseover=\"x()\">"
        );
    }

    #[test]
    fn normalizes_case_and_spacing() {
        assert_eq!(sanitize_tag("< / DIV >", false), "</div>");
        assert_eq!(sanitize_tag("<BR/>", false), "<br />");
        assert_eq!(
            sanitize_tag("<span   CLASS='x'   title=a>", false),
            "<span class=\"x\" title=\"a\">"
        );
    }

    #[test]
    fn safe_words_starting_with_on_are_kept() {
        assert_eq!(
            sanitize_tag(r#"<span title="only once">"#, false),
            "<span title=\"only once\">"
        );
    }

    #[test]
    fn table_attributes_are_decoded_then_sanitized() {
        assert_eq!(
            sanitize_attrs("class=&quot;wikitable&quot;", false),
            "class=\"wikitable\""
        );
        assert_eq!(sanitize_attrs("onclick=&quot;x()&quot;", false), "");
    }
}
