//! Template calls `{{Name|arg|key=value}}`, page inclusions `{{:Page}}` and
//! parameters `{{{name|default}}}`.
//!
//! Arguments are bound as wikitext. The template body has every parameter
//! span substituted textually and is then rendered at [`Mode::Template`], so
//! markup inside an argument renders as part of the body.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::escape::escape_html;
use super::link::build_missing_link_html;
use super::magic;
use crate::config::RenderConfig;
use crate::context::{DocumentMetadata, Mode, RenderContext};
use crate::error::{RenderError, Result};
use crate::parse::util::{match_braces, split_top_level};
use crate::store::PageKind;

const TEMPLATE_NAMESPACE: &str = "Template";

static PARAM_NAME_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*([A-Za-z0-9_ \-]+)\s*=(.*)$").unwrap());

/// Arguments of one call, keyed by name or by 1-based position.
pub(crate) type Params = HashMap<String, String>;

/// Name of the page a `{{...}}` call refers to.
///
/// Magic words and `:`-prefixed inclusions come back as written; any other
/// name without a configured namespace gets the `Template:` prefix.
pub fn parse_template_name(config: &RenderConfig, raw: &str) -> Result<String> {
    let invalid = || RenderError::InvalidTemplate(raw.to_string());
    let inner = raw
        .trim()
        .strip_prefix("{{")
        .and_then(|r| r.strip_suffix("}}"))
        .ok_or_else(invalid)?;
    let end = split_top_level(inner, '|')
        .first()
        .map_or(inner.len(), |&(_, end)| end);
    let name = inner[..end].trim();
    if name.is_empty() || name == ":" {
        return Err(invalid());
    }
    if magic::is_magic_word(name) || name.starts_with(':') {
        return Ok(name.to_string());
    }
    if let Some((ns, _)) = name.split_once(':')
        && config.is_namespace(ns.trim())
    {
        return Ok(name.to_string());
    }
    Ok(format!("{TEMPLATE_NAMESPACE}:{name}"))
}

/// Unit text for passes too shallow to expand; escaped once text is.
fn passthrough(raw: &str, mode: Mode) -> String {
    if mode >= Mode::Process {
        escape_html(raw).into_owned()
    } else {
        raw.to_string()
    }
}

pub(crate) fn render_template(
    ctx: &mut RenderContext<'_>,
    raw: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    if mode < Mode::Preprocess {
        return Ok(raw.to_string());
    }
    let name = parse_template_name(ctx.config(), raw)?;
    if magic::is_magic_word(&name) {
        if mode < Mode::Template {
            return Ok(passthrough(raw, mode));
        }
        return Ok(escape_html(&magic::evaluate(ctx, &name)).into_owned());
    }

    let (name, inclusion) = match name.strip_prefix(':') {
        Some(page) => (page.trim().to_string(), true),
        None => (name, false),
    };
    let page = ctx.store().lookup_page(&ctx.site, &name, false)?;
    let registered = page.as_ref().map_or(name.as_str(), |p| p.name.as_str());
    doc.add_link(registered);
    doc.add_template(registered);
    if mode < Mode::Template {
        return Ok(passthrough(raw, mode));
    }

    let Some(page) = page.filter(|p| p.kind != PageKind::Redirect) else {
        tracing::debug!(template = %name, page = %ctx.page_name, "Template not found");
        return build_missing_link_html(ctx, &name);
    };

    if inclusion {
        tracing::debug!(included = %page.name, page = %ctx.page_name, "Including page");
        let outer = std::mem::replace(&mut ctx.scratch.inside_inclusion, true);
        let out = super::fragment(ctx, &page.body, Mode::Template, doc);
        ctx.scratch.inside_inclusion = outer;
        return out;
    }

    let params = parse_params(raw);
    let body = substitute_params(&page.body, &params);
    super::fragment(ctx, &body, Mode::Template, doc)
}

/// A `{{{name|default}}}` outside any template body: nothing is bound, so
/// the default renders, or the literal text when there is none.
pub(crate) fn render_param(
    ctx: &mut RenderContext<'_>,
    raw: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    if mode < Mode::Template {
        return Ok(passthrough(raw, mode));
    }
    match apply_parameter(raw, &Params::new()) {
        Some(value) => super::fragment(ctx, &value, Mode::Template, doc),
        None => Ok(escape_html(raw).into_owned()),
    }
}

/// Bind the arguments of `{{Name|...}}`. Keys and values are trimmed. An
/// argument without a key is named by its 1-based index among all
/// arguments, named ones included, so `{{T|a|k=v|b}}` binds `b` to `3`.
pub(crate) fn parse_params(raw: &str) -> Params {
    let inner = &raw[2..raw.len() - 2];
    let mut params = Params::new();
    for (index, &(start, end)) in split_top_level(inner, '|').iter().enumerate().skip(1) {
        let token = &inner[start..end];
        let (name, value) = match PARAM_NAME_VALUE.captures(token) {
            Some(caps) => (caps[1].trim().to_string(), caps[2].trim().to_string()),
            None => (index.to_string(), token.trim().to_string()),
        };
        params.insert(name, value);
    }
    params
}

/// Replace every `{{{...}}}` span in `body` with its bound value or
/// default. Spans with neither stay as written.
pub(crate) fn substitute_params(body: &str, params: &Params) -> String {
    let mut out = String::with_capacity(body.len());
    let mut i = 0usize;
    while i < body.len() {
        let rem = &body[i..];
        if rem.starts_with("{{{") {
            match match_braces(rem) {
                Some(m) if m.leftover == 0 && m.width == 3 => {
                    let span = &rem[..m.end];
                    match apply_parameter(span, params) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(span),
                    }
                    i += m.end;
                }
                // a template or extra braces around the parameter.
                Some(_) => {
                    out.push('{');
                    i += 1;
                }
                None => {
                    out.push_str(rem);
                    break;
                }
            }
            continue;
        }
        let Some(ch) = rem.chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Value for one `{{{name|default}}}` span. Nested parameters in the span
/// are substituted first, so names and defaults may themselves be
/// parameters.
pub(crate) fn apply_parameter(span: &str, params: &Params) -> Option<String> {
    let content = substitute_params(&span[3..span.len() - 3], params);
    let parts = split_top_level(&content, '|');
    let (start, end) = parts[0];
    let name = content[start..end].trim();
    if name.is_empty() {
        return None;
    }
    if let Some(value) = params.get(name) {
        return Some(value.clone());
    }
    parts.get(1).map(|&(start, _)| content[start..].to_string())
}
