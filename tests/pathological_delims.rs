use std::time::{Duration, Instant};

use wiki2html::{MemoryStore, Mode, RenderContext, render};

#[test]
fn pathological_open_delimiter_runs_are_treated_as_text() {
    // huge runs of opening delimiters must not trigger quadratic matching.
    let cases = [
        ("braces", "{".repeat(20_000)),
        ("brackets", "[".repeat(20_000)),
    ];

    let store = MemoryStore::new();
    for (name, src) in cases {
        let start = Instant::now();
        let mut ctx = RenderContext::new(&store, "en", "P");
        let doc = render(&mut ctx, &src, Mode::Template).unwrap();
        assert_eq!(doc.content, format!("<p>{src}</p>"), "case '{name}'");
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "case '{name}' took {:?}",
            start.elapsed()
        );
    }
}

#[test]
fn unclosed_block_tags_and_external_links_stay_linear() {
    let cases = [
        ("nowiki", "<nowiki>".repeat(20_000)),
        ("ref", "<ref>".repeat(20_000)),
        ("external", "[http://x ".repeat(20_000)),
    ];

    let store = MemoryStore::new();
    for (name, src) in cases {
        let start = Instant::now();
        let mut ctx = RenderContext::new(&store, "en", "P");
        let doc = render(&mut ctx, &src, Mode::Template).unwrap();
        assert!(doc.content.starts_with("<p>"), "case '{name}'");
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "case '{name}' took {:?}",
            start.elapsed()
        );
    }
}

#[test]
fn long_runs_of_markup_characters_render() {
    let store = MemoryStore::new();
    for src in [
        "'".repeat(10_001),
        "<".repeat(10_000),
        "}".repeat(10_000),
        "]".repeat(10_000),
        "|".repeat(10_000),
        format!("{{|\n{}", "|-\n".repeat(2_000)),
    ] {
        let mut ctx = RenderContext::new(&store, "en", "P");
        assert!(render(&mut ctx, &src, Mode::Template).is_ok());
    }
}

#[test]
fn deep_list_markers_are_clamped() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = format!("{}item\n", ":".repeat(200));
    let doc = render(&mut ctx, &src, Mode::Template).unwrap();
    assert_eq!(doc.content.matches("<dl>").count(), 32);
    assert!(doc.content.contains("item"));
}

#[test]
fn deep_template_nesting_hits_the_recursion_guard() {
    let store = MemoryStore::new().with_page("en", "Template:Wrap", "[{{{1}}}]");
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = format!("{}x{}", "{{Wrap|".repeat(100), "}}".repeat(100));
    assert!(render(&mut ctx, &src, Mode::Template).is_err());

    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = format!("{}x{}", "{{Wrap|".repeat(5), "}}".repeat(5));
    let doc = render(&mut ctx, &src, Mode::Template).unwrap();
    assert_eq!(doc.content, "<p>[[[[[x]]]]]</p>");
}
