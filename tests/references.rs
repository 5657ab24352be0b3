use pretty_assertions::assert_eq;
use wiki2html::{MemoryStore, Mode, RenderContext, render};

#[test]
fn references_list_renders_collected_notes() {
    let store = MemoryStore::new().with_page("en", "Other", "x");
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = "Fact<ref>Source [[Other]]</ref>.\n\n<references/>";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();
    assert_eq!(
        doc.content,
        "<p>Fact<sup id=\"_ref-1\" class=\"reference\"><a href=\"#_note-1\" title=\"\">[1]</a></sup>.</p>\n\
         <ol class=\"references\"><li id=\"_note-1\"><sup><a href=\"#_ref-1\" title=\"\">1</a></sup> \
         Source <a title=\"Other\" href=\"/en/Other\">Other</a></li></ol>"
    );
    assert_eq!(doc.links, vec!["Other"]);
}

#[test]
fn numbering_continues_across_reference_lists() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let src = "a<ref>one</ref>\n<references/>\nb<ref>two</ref>\n<references/>";
    let doc = render(&mut ctx, src, Mode::Template).unwrap();
    assert!(doc.content.contains("<li id=\"_note-1\">"));
    assert!(doc.content.contains("<li id=\"_note-2\">"));
    assert_eq!(doc.content.matches("<ol class=\"references\">").count(), 2);
}

#[test]
fn empty_reference_list_renders_nothing() {
    let store = MemoryStore::new();
    let mut ctx = RenderContext::new(&store, "en", "P");
    let doc = render(&mut ctx, "text\n<references/>", Mode::Template).unwrap();
    assert_eq!(doc.content, "<p>text</p>");
}
