pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod parse;
pub mod render;
pub mod store;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use config::RenderConfig;
pub use context::{DocumentMetadata, Mode, RenderContext, TocEntry};
pub use error::{ConfigError, RenderError, StoreError};
pub use render::{render, render_fragment, render_metadata_only};
pub use store::{ContentStore, FsStore, ImageInspector, MediaInspector, MemoryStore};

/// Per-page settings shared by single page and bulk mode.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub mode: Mode,
    /// Locale for UI strings; the config default when `None`.
    pub locale: Option<String>,
    pub context_path: String,
    pub link_target: Option<String>,
    pub allow_section_edit: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Template,
            locale: None,
            context_path: String::new(),
            link_target: None,
            allow_section_edit: true,
        }
    }
}

/// Build a render context for one page.
pub fn page_context<'a>(
    store: &'a dyn ContentStore,
    media: &'a dyn MediaInspector,
    config: &'a RenderConfig,
    site: &str,
    page: &str,
    opts: &PageOptions,
) -> RenderContext<'a> {
    let mut ctx = RenderContext::new(store, site, page)
        .with_config(config)
        .with_media(media)
        .with_context_path(&opts.context_path)
        .with_section_edit(opts.allow_section_edit);
    if let Some(locale) = &opts.locale {
        ctx = ctx.with_locale(locale);
    }
    if let Some(target) = &opts.link_target {
        ctx = ctx.with_link_target(target);
    }
    ctx
}

/// A rendered store page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Name as stored, which may differ in case from the requested one.
    pub name: String,
    pub metadata: DocumentMetadata,
    pub toc: Vec<TocEntry>,
}

/// Single page mode: look the page up and render its body.
///
/// Returns `Ok(None)` when the store has no such page.
pub fn render_page(
    store: &dyn ContentStore,
    media: &dyn MediaInspector,
    config: &RenderConfig,
    site: &str,
    page: &str,
    opts: &PageOptions,
) -> Result<Option<RenderedPage>, RenderError> {
    if page.trim().is_empty() {
        return Err(RenderError::EmptyTopic);
    }
    let Some(found) = store.lookup_page(site, page, false)? else {
        return Ok(None);
    };
    let mut ctx = page_context(store, media, config, site, &found.name, opts);
    let doc = render(&mut ctx, &found.body, opts.mode)?;
    tracing::debug!(
        site,
        page = %found.name,
        links = doc.links.len(),
        templates = doc.templates.len(),
        "Rendered page"
    );
    Ok(Some(RenderedPage {
        toc: ctx.toc().entries().to_vec(),
        name: found.name,
        metadata: doc,
    }))
}

/// Bulk mode: render every page of the store under `out_root`, mirroring the
/// store layout (`{site}/{Namespace}/{Name}.html`).
pub fn render_all_in_dirs(
    store: &FsStore,
    media: &dyn MediaInspector,
    config: &RenderConfig,
    out_root: &Path,
    opts: &PageOptions,
) -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();

    let pages = store.pages();
    let total = pages.len();
    let pages_root = store.root().join("pages");
    let mut count = 0;

    for (site, name) in pages {
        let html_path = html_path_for(store, &pages_root, out_root, &site, &name)?;

        if let Some(parent) = html_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let page = match render_page(store, media, config, &site, &name, opts) {
            Ok(Some(page)) => page,
            Ok(None) => continue,
            Err(e) => {
                // one broken page must not stop the run.
                tracing::warn!(site = %site, page = %name, error = %e, "Failed to render page");
                continue;
            }
        };
        fs::write(&html_path, &page.metadata.content)?;

        count += 1;

        let elapsed = start_time.elapsed();
        let total_ms = elapsed.as_millis();
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        eprintln!(
            "[{:>4}/{:>4}] [{:02}:{:02}.{:03}] Rendered: {:?}",
            count, total, mins, secs, ms, html_path
        );
    }

    let total_secs = start_time.elapsed().as_secs_f64();
    let avg_str = if count > 0 {
        format!("{:.3}s", total_secs / count as f64)
    } else {
        "-".to_string()
    };

    eprintln!(
        "Done. Rendered {} pages in {:.3}s (avg {}/page).",
        count, total_secs, avg_str
    );
    Ok(())
}

fn html_path_for(
    store: &FsStore,
    pages_root: &Path,
    out_root: &Path,
    site: &str,
    name: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let source = store.page_path(site, name);
    let relative = source.strip_prefix(pages_root)?;
    let mut html_path = out_root.join(relative);
    html_path.set_extension("html");
    Ok(html_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_page_reports_missing_pages() {
        let store = MemoryStore::new().with_page("en", "Main Page", "Hello");
        let config = RenderConfig::default();
        let opts = PageOptions::default();

        let page = render_page(&store, &store::NoMedia, &config, "en", "Main Page", &opts)
            .unwrap()
            .unwrap();
        assert_eq!(page.name, "Main Page");
        assert_eq!(page.metadata.content, "<p>Hello</p>");
        assert!(page.toc.is_empty());

        let missing = render_page(&store, &store::NoMedia, &config, "en", "Nope", &opts).unwrap();
        assert!(missing.is_none());

        assert!(matches!(
            render_page(&store, &store::NoMedia, &config, "en", " ", &opts),
            Err(RenderError::EmptyTopic)
        ));
    }

    #[test]
    fn metadata_only_options_return_source() {
        let store = MemoryStore::new().with_page("en", "P", "See [[Q]].");
        let config = RenderConfig::default();
        let opts = PageOptions {
            mode: Mode::Preprocess,
            ..PageOptions::default()
        };
        let doc = render_page(&store, &store::NoMedia, &config, "en", "P", &opts)
            .unwrap()
            .unwrap()
            .metadata;
        assert_eq!(doc.content, "See [[Q]].");
        assert_eq!(doc.links, vec!["Q".to_string()]);
    }
}
