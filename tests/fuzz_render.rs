//! Lightweight fuzz-style tests; no external fuzz harness required.

use wiki2html::parse::lex;
use wiki2html::render::toc::TOC_MARKER;
use wiki2html::{MemoryStore, Mode, RenderContext, RenderError, render};

struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn gen_range(&mut self, hi: usize) -> usize {
        (self.next_u64() as usize) % hi
    }
}

/// Mostly single characters, with whole markup tokens mixed in so links,
/// templates and tags actually open and close.
fn gen_wikitext_like(rng: &mut XorShift64, len: usize) -> String {
    const DICT: &[u8] =
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 \n\t[]{}|!<>='\"/:#*;-_&";
    const TOKENS: &[&str] = &[
        "[[", "]]", "{{", "}}", "{{{", "}}}", "{|", "|}", "|-", "''", "'''", "== ", " ==",
        "<ref>", "</ref>", "<references/>", "<nowiki>", "</nowiki>", "<pre>", "</pre>",
        "<b>", "</b>", "<!--", "-->", "__TOC__", "__NOTOC__", "http://x.org/", "[http://y.org ",
        "Image:", "Media:", "Special:", "{{T|", "{{:Inc}}", "{{PAGENAME}}", "wikipedia:", "é", "→",
        "&amp;", "&#39;", "\n* ", "\n# ", "\n; ", "\n:", "\n ", "\n----",
    ];
    let mut s = String::with_capacity(len);
    while s.len() < len {
        if rng.gen_range(4) == 0 {
            s.push_str(TOKENS[rng.gen_range(TOKENS.len())]);
        } else {
            s.push(DICT[rng.gen_range(DICT.len())] as char);
        }
    }
    s
}

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_page("en", "Template:T", "<b>{{{1|none}}}</b> {{{k|}}}")
        .with_page("en", "Inc", "== Included ==\n[[Other]]")
        .with_page("en", "Other", "x")
}

fn acceptable(err: &RenderError) -> bool {
    matches!(
        err,
        RenderError::InvalidTemplate(_)
            | RenderError::InvalidProtocol(_)
            | RenderError::EmptyTopic
            | RenderError::RecursionLimit { .. }
    )
}

#[test]
fn fuzz_lex_units_tile_the_input() {
    let mut rng = XorShift64::new(0xC0FFEE);
    for _case in 0..1_000 {
        let len = rng.gen_range(2_000);
        let input = gen_wikitext_like(&mut rng, len);
        let mut pos = 0;
        for unit in lex(&input) {
            assert_eq!(unit.span.start, pos, "gap in {input:?}");
            assert!(unit.span.end > unit.span.start, "empty unit in {input:?}");
            pos = unit.span.end;
        }
        assert_eq!(pos, input.len(), "{input:?}");
    }
}

#[test]
fn fuzz_render_random_inputs_never_panic() {
    let store = store();
    let mut rng = XorShift64::new(0xBADC0DE);
    for _case in 0..500 {
        let len = rng.gen_range(1_500);
        let input = gen_wikitext_like(&mut rng, len);
        let mut ctx = RenderContext::new(&store, "en", "Fuzz");
        match render(&mut ctx, &input, Mode::Template) {
            Ok(doc) => {
                assert!(!doc.content.contains("<script"), "{input:?}");
                assert!(!doc.content.contains(TOC_MARKER), "{input:?}");
            }
            Err(e) => assert!(acceptable(&e), "{e} for {input:?}"),
        }
    }
}

#[test]
fn fuzz_shallow_modes_are_identity() {
    let store = store();
    let mut rng = XorShift64::new(0x5EED);
    for _case in 0..500 {
        let len = rng.gen_range(1_500);
        let input = gen_wikitext_like(&mut rng, len);
        for mode in [Mode::Slice, Mode::Preprocess] {
            let mut ctx = RenderContext::new(&store, "en", "Fuzz");
            match render(&mut ctx, &input, mode) {
                Ok(doc) => assert_eq!(doc.content, input),
                Err(e) => assert!(acceptable(&e), "{e} for {input:?}"),
            }
        }
    }
}
