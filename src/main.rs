use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wiki2html::ast::{RenderEnvelope, RendererInfo, SCHEMA_VERSION};
use wiki2html::{FsStore, ImageInspector, Mode, PageOptions, RenderConfig};

/// Render wiki pages from a page store to HTML.
#[derive(Parser, Debug)]
#[command(name = "wiki2html", version, about)]
struct Cli {
    /// Page to render, e.g. "Main Page" or "Template:Welcome".
    #[arg(required_unless_present = "all")]
    page: Option<String>,

    /// Store root holding `pages/` and `files/`.
    #[arg(long, default_value = ".")]
    store: PathBuf,

    #[arg(long, default_value = "en")]
    site: String,

    /// YAML render configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base path every generated link starts with.
    #[arg(long, default_value = "")]
    context_path: String,

    #[arg(long)]
    locale: Option<String>,

    /// Target attribute for generated links, e.g. `_blank`.
    #[arg(long)]
    link_target: Option<String>,

    /// Processing depth: slice, preprocess, layout, process or template.
    #[arg(long, default_value_t = Mode::Template)]
    mode: Mode,

    /// Only collect links and templates.
    #[arg(long, conflicts_with = "mode")]
    metadata_only: bool,

    /// Print a JSON envelope instead of HTML.
    #[arg(long)]
    json: bool,

    /// Do not emit section edit links.
    #[arg(long)]
    no_section_edit: bool,

    /// Render every page in the store.
    #[arg(long, requires = "out", conflicts_with = "page")]
    all: bool,

    /// Output directory for `--all`.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    let store = FsStore::open(&cli.store)?;
    let media = ImageInspector;

    let opts = PageOptions {
        mode: if cli.metadata_only {
            Mode::Preprocess
        } else {
            cli.mode
        },
        locale: cli.locale.clone(),
        context_path: cli.context_path.clone(),
        link_target: cli.link_target.clone(),
        allow_section_edit: !cli.no_section_edit,
    };

    if cli.all {
        let out = cli.out.as_deref().ok_or("--all requires --out")?;
        wiki2html::render_all_in_dirs(&store, &media, &config, out, &opts)?;
        return Ok(ExitCode::SUCCESS);
    }

    let page = cli.page.as_deref().unwrap_or_default();
    let Some(rendered) = wiki2html::render_page(&store, &media, &config, &cli.site, page, &opts)?
    else {
        eprintln!("Page not found: {}:{}", cli.site, page);
        return Ok(ExitCode::from(2));
    };

    if cli.json {
        let envelope = RenderEnvelope {
            schema_version: SCHEMA_VERSION,
            renderer: RendererInfo::default(),
            site: cli.site.clone(),
            page: rendered.name,
            mode: opts.mode.to_string(),
            metadata: rendered.metadata,
            toc: rendered.toc,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        println!("{}", rendered.metadata.content);
    }
    Ok(ExitCode::SUCCESS)
}
