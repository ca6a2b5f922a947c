use readme_pdf::html_to_pdf::{write_pdf, FontSet, HtmlToPdfError};
use readme_pdf::layout::{layout_html, page_text, FontFace};
use readme_pdf::markdown::render_markdown;
use readme_pdf::preprocess::{readme_to_pdf, render_readme};
use readme_pdf::stylist::style_document;
use tempfile::tempdir;

const SAMPLE: &str = r#"# Project

Some *emphasis* and **strong** text with `inline code`.

```rust
fn main() {
    println!("hello");
}
```

| Name | Value |
|------|-------|
| a    | 1     |

- first
- second

> quoted
"#;

fn styled(markdown: &str) -> String {
    style_document("sample", &render_markdown(markdown))
}

#[test]
fn heading_and_emphasis_render_to_pdf() {
    let html = render_markdown("# Title\n\nSome *text*.");
    assert!(html.contains("<h1>Title</h1>"));
    assert!(html.contains("<em>text</em>"));

    let bytes = readme_to_pdf("sample", "# Title\n\nSome *text*.").unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let pages = layout_html(&style_document("sample", &html));
    let text = page_text(&pages);
    assert!(text.contains("Title"));
    assert!(text.contains("Some text."));

    let runs: Vec<_> = pages.iter().flat_map(|p| &p.lines).flat_map(|l| &l.runs).collect();
    assert!(runs.iter().any(|r| r.text.contains("Title") && r.face == FontFace::Bold));
    assert!(runs.iter().any(|r| r.text == "text" && r.face == FontFace::Italic));
}

#[test]
fn same_markdown_renders_the_same_text_twice() {
    let dir = tempdir().unwrap();
    let fonts = FontSet::standard();

    let first = render_readme("sample", SAMPLE, &fonts).unwrap();
    let first_path = write_pdf(dir.path(), "sample", &first.pdf).unwrap();
    let second = render_readme("sample", SAMPLE, &fonts).unwrap();
    let second_path = write_pdf(dir.path(), "sample", &second.pdf).unwrap();

    assert_eq!(first_path, second_path);
    assert!(first.pdf.starts_with(b"%PDF"));
    assert_eq!(std::fs::read(&second_path).unwrap(), second.pdf);
    assert_eq!(first.pages, second.pages);
    assert_eq!(page_text(&first.pages), page_text(&second.pages));
    assert!(page_text(&second.pages).contains("println!"));
}

#[test]
fn accented_readme_keeps_its_text() {
    let rendered = render_readme(
        "cafe",
        "# Caf\u{e9} M\u{fc}ller\n\nNa\u{ef}ve r\u{e9}sum\u{e9}, \u{65e5}\u{672c}\u{8a9e}.",
        &FontSet::standard(),
    )
    .unwrap();
    let text = page_text(&rendered.pages);
    assert!(text.contains("Caf\u{e9} M\u{fc}ller"));
    assert!(text.contains("Na\u{ef}ve r\u{e9}sum\u{e9}, \u{65e5}\u{672c}\u{8a9e}."));
    assert!(!text.contains('?'));
    assert!(rendered.pdf.starts_with(b"%PDF"));
}

#[test]
fn definition_list_readme_keeps_terms() {
    let text = page_text(&layout_html(&styled("Term\n: Definition text\n")));
    assert_eq!(text, "Term\nDefinition text\n");
}

#[test]
fn rich_readme_keeps_all_content() {
    let text = page_text(&layout_html(&styled(SAMPLE)));
    for needle in ["Project", "emphasis", "inline code", "println!", "Value", "second", "quoted"] {
        assert!(text.contains(needle), "missing {needle:?} in:\n{text}");
    }
}

#[test]
fn long_readme_spans_several_pages() {
    let markdown = (1..=120)
        .map(|i| format!("Paragraph number {i} with a few words to fill the line.\n"))
        .collect::<Vec<_>>()
        .join("\n");
    let pages = layout_html(&styled(&markdown));
    assert!(pages.len() > 1, "expected pagination, got {} page(s)", pages.len());
    assert!(page_text(&pages).contains("Paragraph number 120"));
}

#[test]
fn empty_readme_still_yields_a_document() {
    let bytes = readme_to_pdf("empty", "").unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn output_file_is_named_after_repository() {
    let dir = tempdir().unwrap();
    let bytes = readme_to_pdf("foo", "# foo").unwrap();

    let path = write_pdf(dir.path(), "foo", &bytes).unwrap();

    assert_eq!(path, dir.path().join("foo.pdf"));
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["foo.pdf".to_string()]);
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

#[test]
fn path_like_repository_names_are_rejected() {
    let dir = tempdir().unwrap();
    let err = write_pdf(dir.path(), "../escape", b"%PDF-1.7").unwrap_err();
    assert!(matches!(err, HtmlToPdfError::InvalidName(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
