//! Internal links, interwiki links and embedded media.
//!
//! `[[Target#section|caption]]` resolves against the content store: links
//! to missing pages point at the edit form and carry the `edit` class.
//! `Image:` targets embed the uploaded file (image, video or audio) and
//! `Media:` targets link straight to it.

use std::sync::LazyLock;

use regex::Regex;

use super::escape::{decode_from_url, encode_for_url, escape_html};
use crate::context::{DocumentMetadata, Mode, RenderContext};
use crate::error::{RenderError, Result};
use crate::parse::util::split_top_level;
use crate::store::{Dimensions, FileRecord, PageKind};

pub const NS_SPECIAL: &str = "Special";
pub const NS_IMAGE: &str = "Image";
pub const NS_MEDIA: &str = "Media";

/// Namespaces a link target may carry. Anything else before a `:` is part
/// of an article title and invalidates the link.
const LINK_NAMESPACES: &[&str] = &[NS_SPECIAL, NS_IMAGE, NS_MEDIA];

/// Bounding box for `thumb` images without an explicit size.
const DEFAULT_THUMB_SIZE: u32 = 180;

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Decomposed link target: `Namespace:Article#section?query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikiLink {
    pub namespace: String,
    /// Article name without the namespace, URL-decoded.
    pub article: String,
    /// Namespace and article, the page actually linked to.
    pub destination: String,
    pub section: String,
    pub query: String,
}

impl WikiLink {
    /// Link to a full page name such as `Special:Upload`, bypassing the
    /// namespace whitelist.
    pub fn to_page(destination: &str) -> Self {
        let (namespace, article) = match destination.split_once(':') {
            Some((ns, article)) if !ns.is_empty() => (ns, article),
            _ => ("", destination),
        };
        Self {
            namespace: namespace.to_string(),
            article: article.to_string(),
            destination: destination.to_string(),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.destination.is_empty() || !self.section.is_empty()
    }

    /// Link text that [`parse_wiki_link`] turns back into this link.
    pub fn to_link_text(&self) -> String {
        let mut text = self.destination.clone();
        if !self.section.is_empty() {
            text.push('#');
            text.push_str(&self.section);
        }
        text
    }
}

/// Split a raw target into namespace, article, section and query.
///
/// Returns an empty (invalid) link for unknown namespaces, a non-empty
/// query, or a `"` in the article.
pub fn parse_wiki_link(raw: &str) -> WikiLink {
    let mut processed = raw.trim();
    if processed.is_empty() {
        return WikiLink::default();
    }
    let mut query = "";
    if let Some(pos) = find_past_start(processed, '?') {
        query = processed[pos + 1..].trim();
        processed = &processed[..pos];
    }
    let mut section = "";
    if let Some(pos) = find_past_start(processed, '#') {
        section = processed[pos + 1..].trim();
        processed = &processed[..pos];
    }
    let (namespace, article) = match find_past_start(processed, ':') {
        Some(pos) => {
            let ns = processed[..pos].trim();
            match LINK_NAMESPACES.iter().find(|n| **n == ns) {
                Some(ns) => (*ns, &processed[pos + 1..]),
                None => return WikiLink::default(),
            }
        }
        None => ("", processed),
    };
    if !query.is_empty() {
        return WikiLink::default();
    }
    let article = decode_from_url(article.trim());
    if article.contains('"') {
        return WikiLink::default();
    }
    let destination = if namespace.is_empty() {
        article.clone()
    } else {
        format!("{namespace}:{article}")
    };
    WikiLink {
        namespace: namespace.to_string(),
        article,
        destination,
        section: section.to_string(),
        query: String::new(),
    }
}

fn find_past_start(s: &str, c: char) -> Option<usize> {
    s.char_indices().skip(1).find(|&(_, ch)| ch == c).map(|(i, _)| i)
}

fn topic_exists(ctx: &RenderContext<'_>, topic: &str) -> Result<bool> {
    if topic
        .split_once(':')
        .is_some_and(|(ns, _)| ns.trim() == NS_SPECIAL)
    {
        return Ok(true);
    }
    Ok(ctx.store().page_exists(&ctx.site, topic)?)
}

/// URL for a link: `{context}/{site}/{topic}[?query][#section]`, or the edit
/// URL when the topic does not exist.
pub fn build_internal_link_url(ctx: &RenderContext<'_>, link: &WikiLink) -> Result<String> {
    let topic = link.destination.as_str();
    let section = link.section.trim_start_matches('#');
    if topic.is_empty() {
        if section.is_empty() {
            return Err(RenderError::EmptyTopic);
        }
        return Ok(format!("#{}", encode_for_url(section)));
    }
    if !topic_exists(ctx, topic)? {
        return build_edit_link_url(ctx, topic, 0);
    }
    let mut url = format!(
        "{}/{}/{}",
        ctx.context_path,
        encode_for_url(&ctx.site),
        encode_for_url(topic)
    );
    if !link.query.is_empty() {
        url.push('?');
        url.push_str(&link.query);
    }
    if !section.is_empty() {
        url.push('#');
        url.push_str(&encode_for_url(section));
    }
    Ok(url)
}

/// URL of the edit form for `topic`; `section > 0` edits just that section.
pub fn build_edit_link_url(ctx: &RenderContext<'_>, topic: &str, section: usize) -> Result<String> {
    let mut query = format!("topic={}", encode_for_url(topic));
    if section > 0 {
        query.push_str(&format!("&amp;section={section}"));
    }
    let mut link = WikiLink::to_page("Special:Edit");
    link.query = query;
    build_internal_link_url(ctx, &link)
}

/// `<a>` for an internal link. `text` is already HTML; `None` shows the
/// destination. Missing targets get the `edit` class unless `style` is set.
pub fn build_internal_link_html(
    ctx: &RenderContext<'_>,
    link: &WikiLink,
    text: Option<&str>,
    style: Option<&str>,
) -> Result<String> {
    let url = build_internal_link_url(ctx, link)?;
    let class = match style {
        Some(s) => Some(s),
        None if !link.destination.is_empty() && !topic_exists(ctx, &link.destination)? => {
            Some("edit")
        }
        None => None,
    };
    Ok(anchor_html(ctx, link, &url, text, class))
}

/// Edit-class `<a>` to the edit form for `topic`, whether or not the store
/// holds a page by that name. Used for redirects that must not be followed.
pub fn build_missing_link_html(ctx: &RenderContext<'_>, topic: &str) -> Result<String> {
    let url = build_edit_link_url(ctx, topic, 0)?;
    Ok(anchor_html(ctx, &WikiLink::to_page(topic), &url, None, Some("edit")))
}

fn anchor_html(
    ctx: &RenderContext<'_>,
    link: &WikiLink,
    url: &str,
    text: Option<&str>,
    class: Option<&str>,
) -> String {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ if link.destination.is_empty() => escape_html(&format!("#{}", link.section)).into_owned(),
        _ => escape_html(&link.destination).into_owned(),
    };
    let class = class.map(|c| format!(" class=\"{c}\"")).unwrap_or_default();
    format!(
        "<a title=\"{}\" href=\"{}\"{}{}>{}</a>",
        escape_html(&plain_text(&text)),
        url,
        class,
        ctx.target_attr(),
        text
    )
}

/// `<a class="interwiki">` with `$1` in `pattern` replaced by the article.
pub fn build_interwiki_html(
    ctx: &RenderContext<'_>,
    pattern: &str,
    target: &str,
    article: &str,
    text: Option<&str>,
) -> String {
    let url = pattern.replace("$1", &encode_for_url(article.trim()));
    let text = match text {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => escape_html(target).into_owned(),
    };
    format!(
        "<a class=\"interwiki\" rel=\"nofollow\" title=\"{}\" href=\"{}\"{}>{}</a>",
        escape_html(&plain_text(&text)),
        escape_html(&url),
        ctx.target_attr(),
        text
    )
}

/// Text content of rendered HTML: tags dropped, entities decoded.
pub(crate) fn plain_text(html: &str) -> String {
    let stripped = TAGS.replace_all(html, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

pub(crate) fn render_wiki_link(
    ctx: &mut RenderContext<'_>,
    raw: &str,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    if mode < Mode::Preprocess {
        return Ok(raw.to_string());
    }
    let inner = &raw[2..raw.len() - 2];
    let parts = split_top_level(inner, '|');
    let (target_start, target_end) = parts[0];
    let mut target = inner[target_start..target_end].trim().to_string();
    if mode >= Mode::Template && target.contains("{{") {
        let expanded = super::fragment(ctx, &target, Mode::Template, doc)?;
        target = plain_text(&expanded).trim().to_string();
    }
    let caption = parts.get(1).map(|&(start, _)| &inner[start..]);
    let colon = target.starts_with(':');
    let target = target.strip_prefix(':').unwrap_or(&target).trim();

    if let Some((prefix, article)) = target.split_once(':')
        && let Some(pattern) = ctx.config().interwiki_pattern(prefix)
    {
        if mode < Mode::Process {
            return Ok(raw.to_string());
        }
        let text = caption_html(ctx, caption, mode, doc)?;
        return Ok(build_interwiki_html(ctx, pattern, target, article, text.as_deref()));
    }

    let link = match target.strip_prefix('#') {
        Some(section) => WikiLink {
            section: section.trim().to_string(),
            ..WikiLink::default()
        },
        None => parse_wiki_link(target),
    };
    if !link.is_valid() {
        if mode < Mode::Process {
            return Ok(raw.to_string());
        }
        tracing::warn!(link = %target, page = %ctx.page_name, "Invalid wiki link");
        return Ok(format!("[[{}]]", super::fragment(ctx, inner, mode, doc)?));
    }

    doc.add_link(&link.destination);
    if mode < Mode::Process {
        return Ok(raw.to_string());
    }

    match link.namespace.as_str() {
        NS_IMAGE if !colon => {
            let options: Vec<&str> = parts[1..].iter().map(|&(s, e)| &inner[s..e]).collect();
            let options = ImageOptions::parse(&options);
            render_image_link(ctx, &link, &options, mode, doc)
        }
        NS_MEDIA => {
            let text = caption_html(ctx, caption, mode, doc)?;
            render_media_link(ctx, &link, text.as_deref())
        }
        _ => {
            let text = caption_html(ctx, caption, mode, doc)?;
            build_internal_link_html(ctx, &link, text.as_deref(), None)
        }
    }
}

fn caption_html(
    ctx: &mut RenderContext<'_>,
    caption: Option<&str>,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<Option<String>> {
    caption
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| super::fragment(ctx, c, mode, doc))
        .transpose()
}

/// Options after the target of an `[[Image:...]]` link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub frame: bool,
    pub thumb: bool,
    pub align: Option<String>,
    /// Bounding box in pixels; 0 keeps the measured size.
    pub max_dimension: u32,
    /// `link=` target; an empty string suppresses the anchor.
    pub link: Option<String>,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

impl ImageOptions {
    pub fn parse(parts: &[&str]) -> Self {
        let mut opts = Self::default();
        for part in parts {
            let p = part.trim();
            let lower = p.to_ascii_lowercase();
            match lower.as_str() {
                "" => {}
                "thumb" | "thumbnail" => opts.thumb = true,
                "frame" | "framed" => opts.frame = true,
                "left" | "right" | "center" | "none" => opts.align = Some(lower),
                _ => {
                    if let Some(px) = parse_pixels(&lower) {
                        opts.max_dimension = px;
                    } else if lower.starts_with("link=") {
                        opts.link = Some(p[5..].trim().to_string());
                    } else if lower.starts_with("alt=") {
                        opts.alt = Some(p[4..].trim().to_string());
                    } else {
                        opts.caption = Some(p.to_string());
                    }
                }
            }
        }
        if opts.thumb && opts.max_dimension == 0 {
            opts.max_dimension = DEFAULT_THUMB_SIZE;
        }
        opts
    }
}

/// `200px` or `200x100px`; the larger number bounds the image.
fn parse_pixels(s: &str) -> Option<u32> {
    let digits = s.strip_suffix("px")?;
    digits
        .split('x')
        .map(|d| d.trim().parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?
        .into_iter()
        .max()
        .filter(|&d| d > 0)
}

/// Width and height to emit; 0 means unknown and is left off the tag.
fn scaled_dimensions(measured: Option<Dimensions>, max: u32) -> (u32, u32) {
    match measured {
        None => (max, 0),
        Some(d) if max == 0 || d.width == 0 || d.height == 0 => (d.width, d.height),
        Some(d) if d.width.max(d.height) <= max => (d.width, d.height),
        Some(d) if d.width >= d.height => {
            (max, (u64::from(max) * u64::from(d.height) / u64::from(d.width)) as u32)
        }
        Some(d) => (
            (u64::from(max) * u64::from(d.width) / u64::from(d.height)) as u32,
            max,
        ),
    }
}

fn media_src(ctx: &RenderContext<'_>, file: &FileRecord) -> String {
    escape_html(&format!("{}{}", ctx.context_path, file.url)).into_owned()
}

fn upload_prompt(ctx: &RenderContext<'_>, topic: &str) -> Result<String> {
    build_internal_link_html(
        ctx,
        &WikiLink::to_page("Special:Upload"),
        Some(&escape_html(topic)),
        Some("edit"),
    )
}

/// Embed an uploaded file: `<img>`, `<video>` or `<audio>`, or a plain link
/// for other file types.
pub(crate) fn render_image_link(
    ctx: &mut RenderContext<'_>,
    link: &WikiLink,
    opts: &ImageOptions,
    mode: Mode,
    doc: &mut DocumentMetadata,
) -> Result<String> {
    let topic = link.destination.as_str();
    let store = ctx.store();
    let Some(page) = store.lookup_page(&ctx.site, topic, false)? else {
        return upload_prompt(ctx, topic);
    };
    let Some(file) = store.lookup_file(&ctx.site, topic)? else {
        tracing::warn!(topic = %topic, site = %ctx.site, "Image page has no file record");
        return upload_prompt(ctx, topic);
    };
    let caption = match &opts.caption {
        Some(c) => super::fragment(ctx, c, mode, doc)?,
        None => String::new(),
    };

    if page.kind == PageKind::File {
        return Ok(file_link_html(ctx, &file, &link.article, &caption));
    }
    if file.is_video() {
        return Ok(video_html(ctx, &file));
    }
    if file.is_audio() {
        return Ok(audio_html(ctx, &file));
    }
    image_html(ctx, topic, &file, opts, &caption)
}

fn file_link_html(ctx: &RenderContext<'_>, file: &FileRecord, article: &str, caption: &str) -> String {
    let text = if caption.trim().is_empty() {
        escape_html(article).into_owned()
    } else {
        caption.to_string()
    };
    format!(
        "<a href=\"{}\"{}>{}</a>",
        media_src(ctx, file),
        ctx.target_attr(),
        text
    )
}

fn video_html(ctx: &mut RenderContext<'_>, file: &FileRecord) -> String {
    let id = ctx.next_media_id();
    let mut html = format!(
        "<div id=\"wiki_video_{id}\" class=\"wikivideo\"><video src=\"{}\"",
        media_src(ctx, file)
    );
    if let Some(d) = ctx.media().video_dimensions(&file.path) {
        html.push_str(&format!(" width=\"{}\" height=\"{}\"", d.width, d.height));
    }
    html.push_str(" controls></video></div>");
    html
}

fn audio_html(ctx: &mut RenderContext<'_>, file: &FileRecord) -> String {
    let id = ctx.next_media_id();
    format!(
        "<div id=\"wiki_audio_{id}\" class=\"wikiaudio\"><audio src=\"{}\" controls></audio></div>",
        media_src(ctx, file)
    )
}

fn image_html(
    ctx: &RenderContext<'_>,
    topic: &str,
    file: &FileRecord,
    opts: &ImageOptions,
    caption: &str,
) -> Result<String> {
    let (width, height) =
        scaled_dimensions(ctx.media().image_dimensions(&file.path), opts.max_dimension);
    let boxed = opts.frame || opts.thumb || opts.align.is_some();

    let mut html = String::new();
    if boxed {
        let mut class = String::new();
        if opts.frame || opts.thumb {
            class.push_str("imgthumb ");
        }
        class.push_str(match opts.align.as_deref() {
            Some("left") => "imgleft",
            Some("center") => "imgcenter",
            Some("none") => "imgnone",
            _ => "imgright",
        });
        html.push_str(&format!("<div class=\"{class}\">"));
    }
    if width > 0 {
        html.push_str(&format!("<div style=\"width:{}px\">", width + 2));
    }

    let href = match opts.link.as_deref() {
        Some("") => None,
        Some(target) => image_link_target(ctx, target)?,
        None => Some(build_internal_link_url(ctx, &WikiLink::to_page(topic))?),
    };
    if let Some(href) = &href {
        html.push_str(&format!(
            "<a class=\"wikiimg\" href=\"{href}\"{}>",
            ctx.target_attr()
        ));
    }

    html.push_str(&format!("<img class=\"wikiimg\" src=\"{}\"", media_src(ctx, file)));
    if width > 0 {
        html.push_str(&format!(" width=\"{width}\""));
    }
    if height > 0 {
        html.push_str(&format!(" height=\"{height}\""));
    }
    let alt = match &opts.alt {
        Some(alt) => alt.clone(),
        None => plain_text(caption),
    };
    html.push_str(&format!(" alt=\"{}\" />", escape_html(alt.trim())));
    if href.is_some() {
        html.push_str("</a>");
    }

    if !caption.trim().is_empty() {
        html.push_str(&format!("<div class=\"imgcaption\">{caption}</div>"));
    }
    if width > 0 {
        html.push_str("</div>");
    }
    if boxed {
        html.push_str("</div>");
    }
    Ok(html)
}

/// `link=` on an image: a web URL or a wiki page. Anything else drops the
/// anchor.
fn image_link_target(ctx: &RenderContext<'_>, target: &str) -> Result<Option<String>> {
    let lower = target.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(Some(escape_html(target).into_owned()));
    }
    let link = parse_wiki_link(target);
    if !link.is_valid() {
        return Ok(None);
    }
    build_internal_link_url(ctx, &link).map(Some)
}

/// `[[Media:file.ext|text]]`: a direct link to the uploaded file.
fn render_media_link(ctx: &RenderContext<'_>, link: &WikiLink, text: Option<&str>) -> Result<String> {
    let topic = format!("{NS_IMAGE}:{}", link.article);
    let Some(file) = ctx.store().lookup_file(&ctx.site, &topic)? else {
        return upload_prompt(ctx, &topic);
    };
    let text = match text {
        Some(t) => t.to_string(),
        None => escape_html(&link.article).into_owned(),
    };
    Ok(format!(
        "<a class=\"wikimedia\" title=\"{}\" href=\"{}\"{}>{}</a>",
        escape_html(&link.article),
        media_src(ctx, &file),
        ctx.target_attr(),
        text
    ))
}
