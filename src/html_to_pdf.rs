//! Styled HTML → PDF bytes → `<dir>/<repo_name>.pdf`.
//!
//! Text is drawn with embedded TrueType fonts so accented and other non-ASCII
//! characters keep their glyphs. [`FontSet::standard`] uses the Helvetica and
//! Courier programs bundled with `printpdf` (Windows-1252 coverage); a font
//! file given with [`FontSet::from_file`] covers whatever scripts it maps.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use printpdf::{
    BuiltinFont, Color, FontId, Line, LinePoint, Mm, Op, PaintMode, ParsedFont, PdfDocument,
    PdfPage, PdfSaveOptions, Point, Polygon, PolygonRing, Pt, Rgb, TextItem, WindingOrder,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::layout::{self, Decoration, FontFace, Page, Rgb8, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};

#[derive(Debug, Error)]
pub enum HtmlToPdfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid output file name {0:?}")]
    InvalidName(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

const FACES: [FontFace; 5] = [
    FontFace::Regular,
    FontFace::Bold,
    FontFace::Italic,
    FontFace::BoldItalic,
    FontFace::Mono,
];

fn slot(face: FontFace) -> usize {
    match face {
        FontFace::Regular => 0,
        FontFace::Bold => 1,
        FontFace::Italic => 2,
        FontFace::BoldItalic => 3,
        FontFace::Mono => 4,
    }
}

/// Font programs for the faces a laid-out page uses.
///
/// Holds raw bytes only: parsed fonts are not `Send`, so parsing happens on
/// whichever thread renders the document.
#[derive(Clone)]
pub struct FontSet {
    faces: [Arc<[u8]>; 5],
}

impl FontSet {
    /// Helvetica, its bold and oblique variants, and Courier.
    pub fn standard() -> Self {
        static STANDARD: OnceLock<FontSet> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                let bytes = |font: BuiltinFont| -> Arc<[u8]> { font.get_subset_font().bytes.into() };
                FontSet {
                    faces: [
                        bytes(BuiltinFont::Helvetica),
                        bytes(BuiltinFont::HelveticaBold),
                        bytes(BuiltinFont::HelveticaOblique),
                        bytes(BuiltinFont::HelveticaBoldOblique),
                        bytes(BuiltinFont::Courier),
                    ],
                }
            })
            .clone()
    }

    /// Uses one TrueType/OpenType file for every face.
    pub fn from_file(path: &Path) -> Result<Self, HtmlToPdfError> {
        let bytes = std::fs::read(path)?;
        let mut warnings = Vec::new();
        if ParsedFont::from_bytes(&bytes, 0, &mut warnings).is_none() {
            return Err(HtmlToPdfError::Font(format!(
                "{} is not a usable TrueType or OpenType font",
                path.display()
            )));
        }
        let bytes: Arc<[u8]> = bytes.into();
        info!(path = %path.display(), size = bytes.len(), "Loaded font");
        Ok(Self {
            faces: std::array::from_fn(|_| Arc::clone(&bytes)),
        })
    }

    fn bytes(&self, face: FontFace) -> &Arc<[u8]> {
        &self.faces[slot(face)]
    }
}

impl Default for FontSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FontSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<usize> = self.faces.iter().map(|b| b.len()).collect();
        f.debug_struct("FontSet").field("sizes", &sizes).finish()
    }
}

struct EmbeddedFont {
    id: FontId,
    parsed: ParsedFont,
}

impl EmbeddedFont {
    fn has_glyph(&self, c: char) -> bool {
        self.parsed
            .lookup_glyph_index(u32::from(c))
            .is_some_and(|gid| gid != 0)
    }
}

/// Fonts registered with one document, shared between faces with the same bytes.
struct EmbeddedFonts {
    fonts: Vec<EmbeddedFont>,
    by_face: [usize; 5],
}

impl EmbeddedFonts {
    fn register(doc: &mut PdfDocument, set: &FontSet) -> Result<Self, HtmlToPdfError> {
        let mut sources: Vec<&Arc<[u8]>> = Vec::new();
        let mut fonts = Vec::new();
        let mut by_face = [0; 5];
        for face in FACES {
            let bytes = set.bytes(face);
            if let Some(index) = sources.iter().position(|known| Arc::ptr_eq(known, bytes)) {
                by_face[slot(face)] = index;
                continue;
            }
            let mut warnings = Vec::new();
            let parsed = ParsedFont::from_bytes(bytes, 0, &mut warnings)
                .ok_or_else(|| HtmlToPdfError::Font(format!("cannot parse the {face:?} font")))?;
            let id = doc.add_font(&parsed);
            by_face[slot(face)] = fonts.len();
            sources.push(bytes);
            fonts.push(EmbeddedFont { id, parsed });
        }
        debug!(count = fonts.len(), "Embedded fonts");
        Ok(Self { fonts, by_face })
    }

    fn get(&self, face: FontFace) -> &EmbeddedFont {
        &self.fonts[self.by_face[slot(face)]]
    }
}

/// Lays out `html` and renders it to an in-memory PDF.
pub fn html_to_pdf(title: &str, html: &str, fonts: &FontSet) -> Result<Vec<u8>, HtmlToPdfError> {
    let pages = layout::layout_html(html);
    debug!(title = title, pages = pages.len(), "Laid out document");
    render_pages(title, &pages, fonts)
}

/// Renders laid-out pages with `fonts` embedded.
pub fn render_pages(title: &str, pages: &[Page], fonts: &FontSet) -> Result<Vec<u8>, HtmlToPdfError> {
    let mut doc = PdfDocument::new(title);
    let embedded = EmbeddedFonts::register(&mut doc, fonts)?;

    let mut missing = 0usize;
    let pdf_pages = pages
        .iter()
        .map(|page| {
            PdfPage::new(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                page_ops(page, &embedded, &mut missing),
            )
        })
        .collect();
    if missing > 0 {
        warn!(title = title, count = missing, "Characters without a glyph were replaced");
    }

    let mut warnings = Vec::new();
    let bytes = doc
        .with_pages(pdf_pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "printpdf reported warnings while saving");
    }

    if !bytes.starts_with(b"%PDF") {
        return Err(HtmlToPdfError::Render(
            "document serialisation produced no PDF header".into(),
        ));
    }
    Ok(bytes)
}

/// Stand-in for a character the font cannot draw.
fn substitute(c: char) -> &'static str {
    match c {
        '\u{2192}' | '\u{27f6}' | '\u{21d2}' => "->",
        '\u{2190}' | '\u{27f5}' | '\u{21d0}' => "<-",
        '\u{2194}' => "<->",
        '\u{2212}' | '\u{2010}' | '\u{2011}' => "-",
        '\u{2713}' | '\u{2714}' | '\u{2705}' => "[x]",
        '\u{2717}' | '\u{2718}' | '\u{274c}' => "[ ]",
        '\u{2264}' => "<=",
        '\u{2265}' => ">=",
        _ => "?",
    }
}

/// Splits `text` into items `font` can draw.
///
/// Unmapped spaces become a horizontal offset of the width the layout
/// assumed; other unmapped characters are substituted. Returns the items
/// and how many characters were substituted.
fn text_items(text: &str, font: &EmbeddedFont, face: FontFace) -> (Vec<TextItem>, usize) {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut substituted = 0;
    for c in text.chars() {
        if font.has_glyph(c) {
            current.push(c);
        } else if c == ' ' {
            if !current.is_empty() {
                items.push(TextItem::Text(std::mem::take(&mut current)));
            }
            // TJ offsets are thousandths of an em, subtracted from the advance.
            items.push(TextItem::Offset(-layout::space_em(face) * 1000.0));
        } else {
            current.push_str(substitute(c));
            substituted += 1;
        }
    }
    if !current.is_empty() {
        items.push(TextItem::Text(current));
    }
    (items, substituted)
}

fn color(c: Rgb8) -> Color {
    Color::Rgb(Rgb {
        r: f32::from(c.0) / 255.0,
        g: f32::from(c.1) / 255.0,
        b: f32::from(c.2) / 255.0,
        icc_profile: None,
    })
}

fn point(x_mm: f32, y_mm: f32) -> LinePoint {
    LinePoint {
        p: Point::new(Mm(x_mm), Mm(y_mm)),
        bezier: false,
    }
}

fn page_ops(page: &Page, fonts: &EmbeddedFonts, missing: &mut usize) -> Vec<Op> {
    let mut ops = Vec::new();

    for deco in &page.decorations {
        match deco {
            Decoration::Fill {
                x_mm,
                y_mm,
                width_mm,
                height_mm,
                color: fill,
            } => {
                ops.push(Op::SetFillColor { col: color(*fill) });
                ops.push(Op::DrawPolygon {
                    polygon: Polygon {
                        rings: vec![PolygonRing {
                            points: vec![
                                point(*x_mm, *y_mm),
                                point(x_mm + width_mm, *y_mm),
                                point(x_mm + width_mm, y_mm + height_mm),
                                point(*x_mm, y_mm + height_mm),
                            ],
                        }],
                        mode: PaintMode::Fill,
                        winding_order: WindingOrder::NonZero,
                    },
                });
            }
            Decoration::Line {
                from,
                to,
                color: stroke,
                thickness_pt,
            } => {
                ops.push(Op::SetOutlineColor { col: color(*stroke) });
                ops.push(Op::SetOutlineThickness { pt: Pt(*thickness_pt) });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![point(from.0, from.1), point(to.0, to.1)],
                        is_closed: false,
                    },
                });
            }
        }
    }

    for line in &page.lines {
        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point::new(Mm(line.x_mm), Mm(line.baseline_mm)),
        });
        for run in &line.runs {
            let font = fonts.get(run.face);
            let (items, substituted) = text_items(&run.text, font, run.face);
            *missing += substituted;
            ops.push(Op::SetFontSize {
                size: Pt(line.size_pt),
                font: font.id.clone(),
            });
            ops.push(Op::SetFillColor { col: color(run.color) });
            ops.push(Op::WriteText {
                items,
                font: font.id.clone(),
            });
        }
        ops.push(Op::EndTextSection);
    }

    ops
}

/// Path of the PDF for `repo_name` inside `dir`.
pub fn pdf_path(dir: &Path, repo_name: &str) -> Result<PathBuf, HtmlToPdfError> {
    let valid = !repo_name.is_empty()
        && repo_name != "."
        && repo_name != ".."
        && !repo_name.contains(&['/', '\\', '\0'][..]);
    if !valid {
        return Err(HtmlToPdfError::InvalidName(repo_name.to_string()));
    }
    Ok(dir.join(format!("{repo_name}.pdf")))
}

/// Writes `bytes` to `<dir>/<repo_name>.pdf`, replacing any earlier export.
///
/// The file is written next to its destination and renamed into place, so
/// readers see either the old or the new PDF, never a truncated one.
pub fn write_pdf(dir: &Path, repo_name: &str, bytes: &[u8]) -> Result<PathBuf, HtmlToPdfError> {
    let path = pdf_path(dir, repo_name)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| HtmlToPdfError::Io(e.error))?;
    info!(path = %path.display(), size = bytes.len(), "Saved PDF");
    Ok(path)
}
