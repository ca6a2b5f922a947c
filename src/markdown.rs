//! Markdown to HTML conversion.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use pulldown_cmark_escape::FmtWriter;

/// Class on the wrapper `div` around every code block.
pub const CODE_BLOCK_CLASS: &str = "codehilite";

/// Converts README markdown to an HTML fragment.
///
/// Enables the extensions READMEs rely on: tables, footnotes,
/// strikethrough, task lists, definition lists and heading attributes. Code blocks are
/// wrapped as `<div class="codehilite"><pre><code class="language-x">` so the
/// stylist and the PDF layout can tell them apart from inline code.
///
/// Never fails; unbalanced markup degrades to plain text.
///
/// # Example
///
/// ```
/// use readme_pdf::markdown::render_markdown;
///
/// let html = render_markdown("# Hello\n\nWorld");
/// assert!(html.contains("<h1>Hello</h1>"));
/// assert!(html.contains("<p>World</p>"));
/// ```
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);

    let mut in_code_block = false;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::CodeBlock(kind)) => {
            in_code_block = true;
            Event::Html(CowStr::from(open_code_block(&kind)))
        }
        Event::End(TagEnd::CodeBlock) => {
            in_code_block = false;
            Event::Html(CowStr::Borrowed("</code></pre></div>\n"))
        }
        Event::Text(text) if in_code_block => Event::Html(CowStr::from(escape_html(&text))),
        other => other,
    });

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

fn open_code_block(kind: &CodeBlockKind<'_>) -> String {
    let lang = match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or(""),
        CodeBlockKind::Indented => "",
    };
    if lang.is_empty() {
        format!("<div class=\"{CODE_BLOCK_CLASS}\"><pre><code>")
    } else {
        format!(
            "<div class=\"{CODE_BLOCK_CLASS}\"><pre><code class=\"language-{}\">",
            escape_html(lang)
        )
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(FmtWriter(&mut out), text);
    out
}
