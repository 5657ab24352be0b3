use pretty_assertions::assert_eq;
use scraper::{Html, Selector};
use wiki2html::{Mode, MemoryStore, RenderContext, TocEntry, render, render_metadata_only};

fn select(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

#[test]
fn heading_toc_entry_and_missing_link() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "Main Page");
    let doc = render(&mut ctx, "== Intro ==\nSee [[Other Page]].", Mode::Template).unwrap();

    let html = Html::parse_fragment(&doc.content);
    let heading = html.select(&select("h2#Intro")).next().expect("heading");
    assert_eq!(heading.text().collect::<String>(), "Intro");

    assert_eq!(
        ctx.toc().entries(),
        &[TocEntry {
            name: "Intro".to_string(),
            text: "Intro".to_string(),
            level: 2,
        }]
    );

    let link = html.select(&select("p a.edit")).next().expect("edit link");
    assert_eq!(
        link.value().attr("href"),
        Some("/en/Special:Edit?topic=Other_Page")
    );
    assert_eq!(link.text().collect::<String>(), "Other Page");
    assert_eq!(doc.links, vec!["Other Page".to_string()]);

    // a single heading is below the table of contents threshold.
    assert!(html.select(&select("#toc")).next().is_none());
    assert!(!doc.content.contains("__TOC__"));
}

#[test]
fn section_edit_links_point_at_their_section() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "Main Page").with_context_path("/wiki/");
    let doc = render(&mut ctx, "== One ==\n== Two ==", Mode::Template).unwrap();

    let html = Html::parse_fragment(&doc.content);
    let hrefs: Vec<&str> = html
        .select(&select("div a"))
        .filter_map(|a| a.value().attr("href"))
        .collect();
    assert_eq!(
        hrefs,
        vec![
            "/wiki/en/Special:Edit?topic=Main_Page&section=1",
            "/wiki/en/Special:Edit?topic=Main_Page&section=2",
        ]
    );
}

#[test]
fn section_edit_links_can_be_turned_off() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P").with_section_edit(false);
    let doc = render(&mut ctx, "== One ==", Mode::Template).unwrap();
    assert_eq!(doc.content, "<h2 id=\"One\">One</h2>");
}

#[test]
fn table_of_contents_appears_with_enough_headings() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P").with_section_edit(false);
    let src = "intro\n== A ==\n=== A1 ===\n== B ==\n== C ==\ntext";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();

    let html = Html::parse_fragment(&doc.content);
    let toc = html.select(&select("table#toc")).next().expect("toc");
    let targets: Vec<&str> = toc
        .select(&select("a"))
        .filter_map(|a| a.value().attr("href"))
        .collect();
    assert_eq!(targets, vec!["#A", "#A1", "#B", "#C"]);
    assert_eq!(toc.select(&select("li.toclevel-2")).count(), 1);

    // the table sits before the first heading, after the intro.
    let toc_at = doc.content.find("<table id=\"toc\">").unwrap();
    assert!(doc.content.find("<p>intro</p>").unwrap() < toc_at);
    assert!(toc_at < doc.content.find("<h2 id=\"A\">").unwrap());
}

#[test]
fn notoc_hides_table_of_contents() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = "__NOTOC__\n== A ==\n== B ==\n== C ==\n== D ==";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();
    assert!(!doc.content.contains("id=\"toc\""));
    assert_eq!(ctx.toc().len(), 4);
}

#[test]
fn escaped_toc_switch_stays_text() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P").with_section_edit(false);
    let src = "<nowiki>__TOC__</nowiki>\n== A ==\n== B ==\n== C ==\n== D ==";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();

    assert_eq!(doc.content.matches("<table id=\"toc\">").count(), 1);
    let text_at = doc.content.find("<p>__TOC__</p>").expect("literal switch");
    let toc_at = doc.content.find("<table id=\"toc\">").unwrap();
    assert!(text_at < toc_at);
    assert!(toc_at < doc.content.find("<h2 id=\"A\">").unwrap());
}

#[test]
fn control_characters_cannot_forge_the_toc_placeholder() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P").with_section_edit(false);
    let src = "a\u{7f}toc\u{7f}b\n== A ==\n== B ==\n== C ==\n== D ==";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();

    assert!(doc.content.starts_with("<p>atocb</p>\n<table id=\"toc\">"));
    assert_eq!(doc.content.matches("<table id=\"toc\">").count(), 1);
}

#[test]
fn template_argument_renders_into_body() {
    let store = MemoryStore::new().with_page("en", "Template:Welcome", "Hi {{{name|Guest}}}!");
    let mut ctx = RenderContext::new(&store, "en", "Home");
    let doc = render(&mut ctx, "{{Welcome|name=Ann}}", Mode::Template).unwrap();
    assert_eq!(doc.content, "<p>Hi Ann!</p>");
    assert_eq!(doc.templates, vec!["Template:Welcome".to_string()]);
}

#[test]
fn rendering_twice_gives_the_same_output() {
    let store = MemoryStore::new()
        .with_page("en", "Other", "x")
        .with_page("en", "Template:T", "''{{{1}}}''");
    let src = "== H ==\n* [[Other]] {{T|a}}<ref>note</ref>\n<references/>";

    let mut first_ctx = RenderContext::new(&store, "en", "P");
    let first = render(&mut first_ctx, src, Mode::Template).unwrap();
    let mut second_ctx = RenderContext::new(&store, "en", "P");
    let second = render(&mut second_ctx, src, Mode::Template).unwrap();
    assert_eq!(first, second);
}

#[test]
fn shallow_modes_return_source_unchanged() {
    let store = MemoryStore::new().with_page("en", "Template:T", "body");
    let src = "== H ==\nSee [[Other]] and {{T}} ''x''.";
    for mode in [Mode::Slice, Mode::Preprocess] {
        let mut ctx = RenderContext::new(&store, "en", "P");
        let doc = render(&mut ctx, src, mode).unwrap();
        assert_eq!(doc.content, src, "{mode}");
    }
}

#[test]
fn metadata_only_collects_links_and_templates() {
    let store = MemoryStore::new().with_page("en", "Template:T", "[[Hidden]]");
    let mut ctx = RenderContext::new(&store, "en", "P");
    let doc = render_metadata_only(&mut ctx, "[[A]] {{T}} [[B|b]] [[A]]").unwrap();
    assert_eq!(doc.links, vec!["A", "Template:T", "B"]);
    assert_eq!(doc.templates, vec!["Template:T"]);
}

#[test]
fn slice_mode_records_first_section_name() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let doc = render(&mut ctx, "text\n== First Part ==\n== Second ==", Mode::Slice).unwrap();
    assert_eq!(doc.section_name.as_deref(), Some("First_Part"));
}

#[test]
fn lists_rules_and_preformatted_text() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = "* one\n** nested\n# num\n----\n code line";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();

    let html = Html::parse_fragment(&doc.content);
    assert_eq!(html.select(&select("ul > li > ul > li")).count(), 1);
    assert_eq!(html.select(&select("ol > li")).count(), 1);
    assert_eq!(html.select(&select("hr")).count(), 1);
    let pre = html.select(&select("pre")).next().expect("pre");
    assert_eq!(pre.text().collect::<String>(), "code line");
}

#[test]
fn wiki_tables_render_with_sanitized_attributes() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = "{| class=\"wikitable\" onclick=\"x()\"\n|+ Caption\n! H1 !! H2\n|-\n| a || [[Other|b]]\n|}";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();

    let html = Html::parse_fragment(&doc.content);
    let table = html.select(&select("table")).next().expect("table");
    assert_eq!(table.value().attr("onclick"), None);
    assert_eq!(table.value().attr("class"), None);
    assert_eq!(html.select(&select("caption")).next().unwrap().text().collect::<String>(), "Caption");
    assert_eq!(html.select(&select("th")).count(), 2);
    let cells: Vec<String> = html
        .select(&select("td"))
        .map(|td| td.text().collect())
        .collect();
    assert_eq!(cells, vec!["a", "b"]);
    assert_eq!(doc.links, vec!["Other"]);
}
