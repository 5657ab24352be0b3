//! AFL++ fuzz target for `wiki2html`.
//!
//! Reads one document from stdin and renders it at every mode against a
//! small in-memory store. Build and run it via `cargo-afl`:
//!
//! ```bash
//! cargo install cargo-afl
//!
//! cargo afl build --release --features afl_fuzz --bin wiki2html_afl_render
//!
//! mkdir -p fuzz/afl/out
//!
//! cargo afl fuzz \
//!   -i fuzz/afl/in \
//!   -o fuzz/afl/out \
//!   target/release/wiki2html_afl_render
//! ```
//!
//! AFL++ only treats signals as crashes, so any unwind is turned into
//! `abort()`.

use std::io::Read;

use wiki2html::ast::{RenderEnvelope, RendererInfo, SCHEMA_VERSION};
use wiki2html::parse::lex;
use wiki2html::{MemoryStore, Mode, RenderContext, RenderError, render};

const MAX_INPUT_LEN: usize = 1_000_000;

const MODES: [Mode; 5] = [
    Mode::Slice,
    Mode::Preprocess,
    Mode::Layout,
    Mode::Process,
    Mode::Template,
];

fn run_one_input(data: &[u8]) {
    if data.len() > MAX_INPUT_LEN {
        return;
    }
    let src = String::from_utf8_lossy(data).to_string();

    // the input is also reachable as a template and as an included page.
    let store = MemoryStore::new()
        .with_page("en", "Template:Fuzz", &src)
        .with_page("en", "Fuzz", &src);

    // units must tile the input exactly.
    let mut pos = 0;
    for unit in lex(&src) {
        assert_eq!(unit.span.start, pos, "gap before {unit:?}");
        assert!(unit.span.end > unit.span.start, "empty unit {unit:?}");
        pos = unit.span.end;
    }
    assert_eq!(pos, src.len());

    for mode in MODES {
        let mut ctx = RenderContext::new(&store, "en", "Fuzz");
        match render(&mut ctx, &src, mode) {
            Ok(doc) => {
                if mode < Mode::Layout {
                    assert_eq!(doc.content, src, "shallow render changed its input");
                }
                let envelope = RenderEnvelope {
                    schema_version: SCHEMA_VERSION,
                    renderer: RendererInfo::default(),
                    site: "en".to_string(),
                    page: "Fuzz".to_string(),
                    mode: mode.to_string(),
                    metadata: doc,
                    toc: ctx.toc().entries().to_vec(),
                };
                let json = serde_json::to_vec(&envelope).unwrap();
                let back: RenderEnvelope = serde_json::from_slice(&json).unwrap();
                assert_eq!(back, envelope);
            }
            // malformed templates, bad protocols and self-inclusion are
            // reported as errors; only a panic is a finding.
            Err(RenderError::InvalidTemplate(_))
            | Err(RenderError::InvalidProtocol(_))
            | Err(RenderError::EmptyTopic)
            | Err(RenderError::RecursionLimit { .. }) => {}
            Err(e) => panic!("render failed at {mode}: {e}"),
        }
    }
}

fn main() {
    let mut data = Vec::new();
    std::io::stdin().read_to_end(&mut data).unwrap();

    if std::panic::catch_unwind(|| run_one_input(&data)).is_err() {
        std::process::abort();
    }
}
