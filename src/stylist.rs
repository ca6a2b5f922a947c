//! Wraps a rendered README fragment in a complete, self-contained HTML document.

use crate::markdown::escape_html;

/// Presentation for exported READMEs. Embedded so documents never load anything.
pub const README_CSS: &str = r#"
body { font-family: Helvetica, sans-serif; font-size: 12px; line-height: 1.5; color: #333; }
h1, h2, h3 { color: #24292e; border-bottom: 1px solid #eaecef; padding-bottom: 0.3em; }
h1 { font-size: 2em; }
h2 { font-size: 1.5em; }
code { background-color: #f6f8fa; padding: 0.2em 0.4em; border-radius: 3px; font-family: monospace; }
pre { background-color: #f6f8fa; padding: 16px; overflow: auto; border-radius: 6px; }
blockquote { border-left: 4px solid #dfe2e5; color: #6a737d; padding: 0 1em; }
img { max-width: 100%; }
a { color: #0366d6; text-decoration: none; }
"#;

/// Places `body_html` inside the fixed README template.
pub fn style_document(title: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        css = README_CSS,
        body = body_html
    )
}
