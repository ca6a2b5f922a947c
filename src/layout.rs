//! Page layout for styled README HTML.
//!
//! READMEs mix markdown with raw HTML, so the styled document is parsed into
//! a DOM with `html5ever` before layout. Layout runs in three steps:
//!
//! 1. [`parse_blocks`]: DOM walk → [`Block`]s (headings, paragraphs, code,
//!    list items, definitions, table rows, rules) made of styled [`Run`]s
//! 2. line breaking with estimated glyph widths of Helvetica and Courier
//! 3. pagination onto A4 pages, producing [`Page`]s in PDF coordinates
//!    (millimetres, origin bottom-left)
//!
//! Text stays Unicode here; [`crate::html_to_pdf`] decides what the embedded
//! fonts can show. The output is plain data, so identical HTML always lays
//! out identically.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, Attribute, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 25.4 / 72.0;

const BODY_SIZE_PT: f32 = 10.5;
const CODE_SIZE_PT: f32 = 9.0;
const LINE_SPACING: f32 = 1.45;
const INDENT_STEP_MM: f32 = 6.0;
const CODE_PADDING_MM: f32 = 3.0;

/// Colours from the README stylesheet.
pub mod palette {
    use super::Rgb8;

    pub const TEXT: Rgb8 = Rgb8(0x33, 0x33, 0x33);
    pub const HEADING: Rgb8 = Rgb8(0x24, 0x29, 0x2e);
    pub const QUOTE: Rgb8 = Rgb8(0x6a, 0x73, 0x7d);
    pub const QUOTE_BAR: Rgb8 = Rgb8(0xdf, 0xe2, 0xe5);
    pub const LINK: Rgb8 = Rgb8(0x03, 0x66, 0xd6);
    pub const RULE: Rgb8 = Rgb8(0xea, 0xec, 0xef);
    pub const CODE_BG: Rgb8 = Rgb8(0xf6, 0xf8, 0xfa);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

/// A piece of text with a single face and colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub face: FontFace,
    pub color: Rgb8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    /// `dt` of a definition list.
    Term,
    /// `dd` of a definition list, indented under its term.
    Definition,
    Code,
    ListItem,
    TableRow { header: bool },
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub quote_depth: usize,
    pub list_depth: usize,
    /// Bullet or number of the list item this block opens.
    pub marker: Option<String>,
    pub runs: Vec<Run>,
}

impl Block {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x_mm: f32,
    pub baseline_mm: f32,
    pub size_pt: f32,
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb8,
        thickness_pt: f32,
    },
    /// `y_mm` is the bottom edge.
    Fill {
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
        color: Rgb8,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Drawn before the text.
    pub decorations: Vec<Decoration>,
    pub lines: Vec<PlacedLine>,
}

/// Lays out a styled HTML document. Always yields at least one page.
pub fn layout_html(html: &str) -> Vec<Page> {
    paginate(&parse_blocks(html))
}

/// Text of every page, one laid-out line per line of output.
pub fn page_text(pages: &[Page]) -> String {
    let mut out = String::new();
    for page in pages {
        for line in &page.lines {
            for run in &line.runs {
                out.push_str(&run.text);
            }
            out.push('\n');
        }
    }
    out
}

// ---------------------------------------------------------------------------
// HTML → blocks
// ---------------------------------------------------------------------------

fn attr(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| (&*a.name.local).eq_ignore_ascii_case(name))
        .map(|a| a.value.to_string())
}

/// Drops control and zero-width characters; tabs become four spaces.
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push(c),
            '\t' => out.push_str("    "),
            '\u{a0}' => out.push(' '),
            '\u{200b}'..='\u{200d}' | '\u{2060}' | '\u{feff}' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

struct ListState {
    ordered: bool,
    next: u64,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    runs: Vec<Run>,
    kind: Option<BlockKind>,
    marker: Option<String>,
    skip: usize,
    pre: usize,
    inline_code: usize,
    bold: usize,
    italic: usize,
    link: usize,
    quote_depth: usize,
    lists: Vec<ListState>,
    table_head: bool,
    cells: usize,
    definition: usize,
}

impl BlockBuilder {
    fn default_kind(&self) -> BlockKind {
        if self.definition > 0 {
            BlockKind::Definition
        } else if self.lists.is_empty() {
            BlockKind::Paragraph
        } else {
            BlockKind::ListItem
        }
    }

    fn current_kind(&self) -> BlockKind {
        self.kind.unwrap_or_else(|| self.default_kind())
    }

    fn face(&self) -> FontFace {
        if self.pre > 0 || self.inline_code > 0 {
            return FontFace::Mono;
        }
        let bold = self.bold > 0
            || matches!(self.current_kind(), BlockKind::Heading(_) | BlockKind::Term);
        match (bold, self.italic > 0) {
            (true, true) => FontFace::BoldItalic,
            (true, false) => FontFace::Bold,
            (false, true) => FontFace::Italic,
            (false, false) => FontFace::Regular,
        }
    }

    fn color(&self) -> Rgb8 {
        if self.link > 0 {
            palette::LINK
        } else if self.quote_depth > 0 {
            palette::QUOTE
        } else if matches!(self.current_kind(), BlockKind::Heading(_)) {
            palette::HEADING
        } else {
            palette::TEXT
        }
    }

    fn push_run(&mut self, text: String, face: FontFace, color: Rgb8) {
        if text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.face == face && last.color == color => last.text.push_str(&text),
            _ => self.runs.push(Run { text, face, color }),
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip > 0 {
            return;
        }
        let decoded = normalize_text(raw);
        if self.pre > 0 {
            self.push_run(decoded, FontFace::Mono, palette::TEXT);
            return;
        }

        let mut collapsed = String::with_capacity(decoded.len());
        let mut at_space = self
            .runs
            .last()
            .map_or(true, |r| r.text.ends_with(' ') || r.text.ends_with('\n'));
        for c in decoded.chars() {
            if c.is_whitespace() {
                if !at_space {
                    collapsed.push(' ');
                    at_space = true;
                }
            } else {
                collapsed.push(c);
                at_space = false;
            }
        }
        let (face, color) = (self.face(), self.color());
        self.push_run(collapsed, face, color);
    }

    /// Inline text produced by a tag (checkbox, image alt).
    fn literal(&mut self, text: &str, face: FontFace) {
        let color = self.color();
        self.push_run(text.to_string(), face, color);
    }

    fn flush(&mut self) {
        let kind = self.current_kind();
        let mut runs = std::mem::take(&mut self.runs);

        if kind == BlockKind::Code {
            if let Some(last) = runs.last_mut() {
                let trimmed = last.text.trim_end_matches('\n').len();
                last.text.truncate(trimmed);
            }
        } else {
            if let Some(last) = runs.last_mut() {
                let trimmed = last.text.trim_end().len();
                last.text.truncate(trimmed);
            }
            if let Some(first) = runs.first_mut() {
                first.text = first.text.trim_start().to_string();
            }
        }
        runs.retain(|r| !r.text.is_empty());
        if runs.is_empty() {
            return;
        }

        self.blocks.push(Block {
            kind,
            quote_depth: self.quote_depth,
            list_depth: self.lists.len(),
            marker: self.marker.take(),
            runs,
        });
    }

    fn start_block(&mut self, kind: BlockKind) {
        self.flush();
        self.kind = Some(kind);
    }

    fn end_block(&mut self) {
        self.flush();
        self.kind = None;
    }

    fn open(&mut self, name: &str, attrs: &[Attribute]) {
        match name {
            "head" | "style" | "script" | "title" => self.skip += 1,
            _ if self.skip > 0 => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                self.start_block(BlockKind::Heading(level));
            }
            "p" => {
                let kind = self.default_kind();
                self.start_block(kind);
            }
            "pre" => {
                self.start_block(BlockKind::Code);
                self.pre += 1;
            }
            "code" if self.pre == 0 => self.inline_code += 1,
            "strong" | "b" => self.bold += 1,
            "em" | "i" => self.italic += 1,
            "a" => self.link += 1,
            "blockquote" => {
                self.end_block();
                self.quote_depth += 1;
            }
            "ul" | "ol" => {
                self.end_block();
                let next = attr(attrs, "start")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(1);
                self.lists.push(ListState {
                    ordered: name == "ol",
                    next,
                });
            }
            "li" => {
                self.flush();
                self.kind = Some(BlockKind::ListItem);
                self.marker = self.lists.last_mut().map(|list| {
                    if list.ordered {
                        let marker = format!("{}.", list.next);
                        list.next += 1;
                        marker
                    } else {
                        "-".to_string()
                    }
                });
            }
            "dl" => self.end_block(),
            "dt" => self.start_block(BlockKind::Term),
            "dd" => {
                self.start_block(BlockKind::Definition);
                self.definition += 1;
            }
            "table" => self.end_block(),
            "thead" => self.table_head = true,
            "tbody" => self.table_head = false,
            "tr" => {
                let header = self.table_head;
                self.start_block(BlockKind::TableRow { header });
                self.cells = 0;
            }
            "th" | "td" => {
                if self.cells > 0 {
                    self.literal(" | ", FontFace::Regular);
                }
                self.cells += 1;
                if name == "th" {
                    self.bold += 1;
                }
            }
            "br" => self.literal("\n", FontFace::Regular),
            "hr" => {
                self.end_block();
                self.blocks.push(Block {
                    kind: BlockKind::Rule,
                    quote_depth: self.quote_depth,
                    list_depth: self.lists.len(),
                    marker: None,
                    runs: Vec::new(),
                });
            }
            "img" => {
                let alt = attr(attrs, "alt").unwrap_or_default();
                let alt = normalize_text(alt.trim());
                if alt.is_empty() {
                    self.literal("[image]", FontFace::Italic);
                } else {
                    self.literal(&format!("[image: {alt}]"), FontFace::Italic);
                }
            }
            "input" => {
                if attr(attrs, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
                    let mark = if attr(attrs, "checked").is_some() {
                        "[x] "
                    } else {
                        "[ ] "
                    };
                    self.literal(mark, FontFace::Mono);
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "head" | "style" | "script" | "title" => self.skip = self.skip.saturating_sub(1),
            _ if self.skip > 0 => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "tr" | "table" | "dt"
            | "dl" => self.end_block(),
            "dd" => {
                self.end_block();
                self.definition = self.definition.saturating_sub(1);
            }
            "pre" => {
                self.end_block();
                self.pre = self.pre.saturating_sub(1);
            }
            "code" if self.pre == 0 => self.inline_code = self.inline_code.saturating_sub(1),
            "strong" | "b" => self.bold = self.bold.saturating_sub(1),
            "em" | "i" => self.italic = self.italic.saturating_sub(1),
            "a" => self.link = self.link.saturating_sub(1),
            "th" => self.bold = self.bold.saturating_sub(1),
            "thead" => self.table_head = false,
            "blockquote" => {
                self.end_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            "ul" | "ol" => {
                self.end_block();
                self.lists.pop();
                self.marker = None;
            }
            _ => {}
        }
    }
}

enum Visit {
    Enter(Handle),
    Leave(String),
}

/// Splits styled HTML into layout blocks, in document order.
pub fn parse_blocks(html: &str) -> Vec<Block> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());

    // Explicit stack: deeply nested raw HTML must not exhaust the call stack.
    let mut builder = BlockBuilder::default();
    let mut stack = vec![Visit::Enter(dom.document.clone())];
    while let Some(visit) = stack.pop() {
        let node = match visit {
            Visit::Leave(name) => {
                builder.close(&name);
                continue;
            }
            Visit::Enter(node) => node,
        };
        match &node.data {
            NodeData::Element { name, attrs, .. } => {
                let local = name.local.to_string();
                builder.open(&local, &attrs.borrow());
                stack.push(Visit::Leave(local));
            }
            NodeData::Text { contents } => builder.text(&contents.borrow()),
            _ => {}
        }
        for child in node.children.borrow().iter().rev() {
            stack.push(Visit::Enter(child.clone()));
        }
    }
    builder.end_block();
    builder.blocks
}

// ---------------------------------------------------------------------------
// Line breaking
// ---------------------------------------------------------------------------

/// Approximate advance width of `c` in em units for the Helvetica family.
fn glyph_em(c: char, face: FontFace) -> f32 {
    if face == FontFace::Mono {
        return if is_wide(c) { 1.2 } else { 0.6 };
    }
    let base = match c {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.24,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | '/' => 0.33,
        'm' | 'w' | 'M' | 'W' | '@' => 0.86,
        'A'..='Z' => 0.68,
        '0'..='9' => 0.556,
        c if is_wide(c) => 1.0,
        _ => 0.53,
    };
    match face {
        FontFace::Bold | FontFace::BoldItalic => base * 1.07,
        _ => base,
    }
}

/// CJK ideographs, kana, hangul and fullwidth forms take a full em.
fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA960..=0xA97F
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

/// Width of a space in em units, used when a font has no space glyph.
pub(crate) fn space_em(face: FontFace) -> f32 {
    glyph_em(' ', face)
}

fn text_width_mm(text: &str, face: FontFace, size_pt: f32) -> f32 {
    text.chars().map(|c| glyph_em(c, face)).sum::<f32>() * size_pt * PT_TO_MM
}

fn runs_width_mm(runs: &[Run], size_pt: f32) -> f32 {
    runs.iter()
        .map(|r| text_width_mm(&r.text, r.face, size_pt))
        .sum()
}

fn push_merged(line: &mut Vec<Run>, text: &str, face: FontFace, color: Rgb8) {
    match line.last_mut() {
        Some(last) if last.face == face && last.color == color => last.text.push_str(text),
        _ => line.push(Run {
            text: text.to_string(),
            face,
            color,
        }),
    }
}

fn trim_line_end(line: &mut Vec<Run>) {
    while let Some(last) = line.last_mut() {
        let trimmed = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed);
        if last.text.is_empty() {
            line.pop();
        } else {
            break;
        }
    }
}

enum Atom<'a> {
    Word(&'a str, FontFace, Rgb8),
    Space(FontFace, Rgb8),
    Break,
}

fn atoms(runs: &[Run]) -> Vec<Atom<'_>> {
    let mut out = Vec::new();
    for run in runs {
        let mut start = None;
        for (i, c) in run.text.char_indices() {
            if c == ' ' || c == '\n' {
                if let Some(s) = start.take() {
                    out.push(Atom::Word(&run.text[s..i], run.face, run.color));
                }
                out.push(if c == ' ' {
                    Atom::Space(run.face, run.color)
                } else {
                    Atom::Break
                });
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            out.push(Atom::Word(&run.text[s..], run.face, run.color));
        }
    }
    out
}

/// Greedy word wrap; words wider than a line are split by character.
fn wrap_runs(runs: &[Run], size_pt: f32, max_mm: f32) -> Vec<Vec<Run>> {
    let mut lines = Vec::new();
    let mut line: Vec<Run> = Vec::new();
    let mut width = 0.0;

    for atom in atoms(runs) {
        match atom {
            Atom::Break => {
                trim_line_end(&mut line);
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }
            Atom::Space(face, color) => {
                if line.is_empty() {
                    continue;
                }
                let w = text_width_mm(" ", face, size_pt);
                if width + w <= max_mm {
                    push_merged(&mut line, " ", face, color);
                    width += w;
                }
            }
            Atom::Word(word, face, color) => {
                let w = text_width_mm(word, face, size_pt);
                if width + w > max_mm && !line.is_empty() {
                    trim_line_end(&mut line);
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                if w <= max_mm {
                    push_merged(&mut line, word, face, color);
                    width += w;
                    continue;
                }
                for piece in split_to_width(word, face, size_pt, max_mm) {
                    if !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                    }
                    width = text_width_mm(&piece, face, size_pt);
                    push_merged(&mut line, &piece, face, color);
                }
            }
        }
    }
    trim_line_end(&mut line);
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn split_to_width(text: &str, face: FontFace, size_pt: f32, max_mm: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = glyph_em(c, face) * size_pt * PT_TO_MM;
        if width + w > max_mm && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(c);
        width += w;
    }
    if !piece.is_empty() || pieces.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Code keeps its own line breaks and indentation; long lines are split.
fn wrap_code(runs: &[Run], size_pt: f32, max_mm: f32) -> Vec<Vec<Run>> {
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    let mut lines = Vec::new();
    for source_line in text.split('\n') {
        for piece in split_to_width(source_line, FontFace::Mono, size_pt, max_mm) {
            let runs = if piece.is_empty() {
                Vec::new()
            } else {
                vec![Run {
                    text: piece,
                    face: FontFace::Mono,
                    color: palette::TEXT,
                }]
            };
            lines.push(runs);
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

struct Metrics {
    size_pt: f32,
    space_before_mm: f32,
    space_after_mm: f32,
}

fn metrics(kind: BlockKind) -> Metrics {
    let (size_pt, space_before_mm, space_after_mm) = match kind {
        BlockKind::Heading(1) => (20.0, 5.0, 3.0),
        BlockKind::Heading(2) => (16.0, 4.5, 2.5),
        BlockKind::Heading(3) => (13.5, 4.0, 2.0),
        BlockKind::Heading(4) => (12.0, 3.0, 1.5),
        BlockKind::Heading(_) => (BODY_SIZE_PT, 3.0, 1.5),
        BlockKind::Paragraph => (BODY_SIZE_PT, 0.0, 3.0),
        BlockKind::ListItem => (BODY_SIZE_PT, 0.0, 1.2),
        BlockKind::Term => (BODY_SIZE_PT, 1.5, 0.5),
        BlockKind::Definition => (BODY_SIZE_PT, 0.0, 2.0),
        BlockKind::TableRow { .. } => (BODY_SIZE_PT, 0.0, 1.0),
        BlockKind::Code => (CODE_SIZE_PT, 1.0, 4.0),
        BlockKind::Rule => (BODY_SIZE_PT, 2.0, 3.0),
    };
    Metrics {
        size_pt,
        space_before_mm,
        space_after_mm,
    }
}

fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * LINE_SPACING * PT_TO_MM
}

struct Paginator {
    pages: Vec<Page>,
    /// Distance from the top edge of the current page.
    cursor_mm: f32,
}

impl Paginator {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            cursor_mm: MARGIN_MM,
        }
    }

    fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn at_page_top(&self) -> bool {
        self.cursor_mm <= MARGIN_MM
    }

    fn advance(&mut self, mm: f32) {
        if !self.at_page_top() {
            self.cursor_mm += mm;
        }
    }

    /// Reserves `height_mm` and returns the top of the reserved band.
    fn reserve(&mut self, height_mm: f32) -> f32 {
        if self.cursor_mm + height_mm > PAGE_HEIGHT_MM - MARGIN_MM && !self.at_page_top() {
            self.pages.push(Page::default());
            self.cursor_mm = MARGIN_MM;
        }
        let top = self.cursor_mm;
        self.cursor_mm += height_mm;
        top
    }

    fn finish(self) -> Vec<Page> {
        self.pages
    }
}

fn to_pdf_y(top_mm: f32) -> f32 {
    PAGE_HEIGHT_MM - top_mm
}

fn paginate(blocks: &[Block]) -> Vec<Page> {
    let mut pager = Paginator::new();
    let content_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

    for block in blocks {
        let m = metrics(block.kind);
        let lh = line_height_mm(m.size_pt);
        let quote_indent = block.quote_depth as f32 * INDENT_STEP_MM;
        let list_indent = block.list_depth as f32 * INDENT_STEP_MM;
        let mut x = MARGIN_MM + quote_indent + list_indent;
        if block.kind == BlockKind::Definition {
            x += INDENT_STEP_MM;
        }
        if block.kind == BlockKind::Code {
            x += CODE_PADDING_MM;
        }
        let right = if block.kind == BlockKind::Code {
            PAGE_WIDTH_MM - MARGIN_MM - CODE_PADDING_MM
        } else {
            PAGE_WIDTH_MM - MARGIN_MM
        };

        pager.advance(m.space_before_mm);

        if block.kind == BlockKind::Rule {
            let top = pager.reserve(lh / 2.0);
            let y = to_pdf_y(top + lh / 4.0);
            pager.page().decorations.push(Decoration::Line {
                from: (MARGIN_MM + quote_indent, y),
                to: (PAGE_WIDTH_MM - MARGIN_MM, y),
                color: palette::RULE,
                thickness_pt: 1.5,
            });
            pager.advance(m.space_after_mm);
            continue;
        }

        let marker_width = block.marker.as_ref().map_or(0.0, |marker| {
            text_width_mm(marker, FontFace::Regular, m.size_pt)
                + text_width_mm("  ", FontFace::Regular, m.size_pt)
        });
        let text_x = x + marker_width;
        let max_width = (right - text_x).max(content_width / 4.0);

        let lines = if block.kind == BlockKind::Code {
            wrap_code(&block.runs, m.size_pt, max_width)
        } else {
            wrap_runs(&block.runs, m.size_pt, max_width)
        };

        for (i, runs) in lines.into_iter().enumerate() {
            let top = pager.reserve(lh);
            let baseline = to_pdf_y(top + lh * 0.75);
            let page = pager.page();

            if block.kind == BlockKind::Code {
                page.decorations.push(Decoration::Fill {
                    x_mm: x - CODE_PADDING_MM,
                    y_mm: to_pdf_y(top + lh),
                    width_mm: right - x + 2.0 * CODE_PADDING_MM,
                    height_mm: lh,
                    color: palette::CODE_BG,
                });
            }
            for depth in 0..block.quote_depth {
                let bar_x = MARGIN_MM + depth as f32 * INDENT_STEP_MM + 1.0;
                page.decorations.push(Decoration::Line {
                    from: (bar_x, to_pdf_y(top)),
                    to: (bar_x, to_pdf_y(top + lh)),
                    color: palette::QUOTE_BAR,
                    thickness_pt: 3.0,
                });
            }
            if i == 0 {
                if let Some(marker) = &block.marker {
                    let color = if block.quote_depth > 0 {
                        palette::QUOTE
                    } else {
                        palette::TEXT
                    };
                    page.lines.push(PlacedLine {
                        x_mm: x,
                        baseline_mm: baseline,
                        size_pt: m.size_pt,
                        runs: vec![Run {
                            text: marker.clone(),
                            face: FontFace::Regular,
                            color,
                        }],
                    });
                }
            }
            if !runs.is_empty() {
                page.lines.push(PlacedLine {
                    x_mm: text_x,
                    baseline_mm: baseline,
                    size_pt: m.size_pt,
                    runs,
                });
            }
        }

        if let BlockKind::Heading(level @ 1..=3) = block.kind {
            let top = pager.reserve(1.5);
            let y = to_pdf_y(top + 0.75);
            pager.page().decorations.push(Decoration::Line {
                from: (x, y),
                to: (right, y),
                color: palette::RULE,
                thickness_pt: if level == 1 { 1.0 } else { 0.75 },
            });
        }
        if let BlockKind::TableRow { header: true } = block.kind {
            let top = pager.reserve(1.0);
            let y = to_pdf_y(top + 0.5);
            pager.page().decorations.push(Decoration::Line {
                from: (x, y),
                to: (right, y),
                color: palette::RULE,
                thickness_pt: 0.75,
            });
        }

        pager.advance(m.space_after_mm);
    }

    pager.finish()
}
