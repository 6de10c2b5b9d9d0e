//! Paginated layout for the summary document
//!
//! Lines are classified by their leading markers, word-wrapped against a
//! fixed Helvetica width table and placed top-down on fixed-size pages.
//! Coordinates are PDF points with the origin at the bottom-left corner.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Page geometry in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSpec {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PageSpec {
    /// US Letter with 0.75in margins
    pub const LETTER: PageSpec = PageSpec {
        width: 612.0,
        height: 792.0,
        margin: 54.0,
    };

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    fn top(&self) -> f64 {
        self.height - self.margin
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::LETTER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Resource name used in page content streams
    pub fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Heading,
    Rule,
    Subheading,
    ListItem,
    Body,
    Footer,
}

impl LineStyle {
    pub fn font(&self) -> Font {
        match self {
            LineStyle::Heading | LineStyle::Subheading => Font::Bold,
            _ => Font::Regular,
        }
    }

    pub fn font_size(&self) -> f64 {
        match self {
            LineStyle::Heading => 18.0,
            LineStyle::Subheading => 12.0,
            LineStyle::Footer => 8.0,
            _ => 10.0,
        }
    }

    /// Vertical space consumed per row
    pub fn leading(&self) -> f64 {
        match self {
            LineStyle::Heading => 26.0,
            LineStyle::Subheading => 20.0,
            LineStyle::Rule => 12.0,
            LineStyle::Footer => 12.0,
            _ => 14.0,
        }
    }

    /// RGB fill colour, components in 0..=1
    pub fn color(&self) -> (f64, f64, f64) {
        match self {
            LineStyle::Heading => (0.11, 0.31, 0.63),
            LineStyle::Rule => (0.75, 0.75, 0.75),
            LineStyle::Footer => (0.45, 0.45, 0.45),
            _ => (0.0, 0.0, 0.0),
        }
    }
}

/// Classified source line before wrapping
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    Styled(LineStyle, &'a str),
    Blank,
}

/// Pick a visual treatment from the line's markers.
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix('#') {
        return LineKind::Styled(LineStyle::Heading, rest.trim_start_matches('#').trim());
    }
    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return LineKind::Styled(LineStyle::Rule, "");
    }
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if let Some(rest) = trimmed.strip_prefix("- ") {
        return LineKind::Styled(LineStyle::ListItem, rest.trim());
    }
    if trimmed.chars().any(char::is_alphabetic) && !trimmed.chars().any(char::is_lowercase) {
        return LineKind::Styled(LineStyle::Subheading, trimmed);
    }
    LineKind::Styled(LineStyle::Body, trimmed)
}

/// Helvetica advance widths (1/1000 em) for printable ASCII 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space ../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0 .. ?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @ .. O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P .. _
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // ` .. o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p .. ~
];

const FALLBACK_WIDTH: u16 = 556;

/// Bold glyphs run roughly 6% wider than regular ones.
const BOLD_FACTOR: f64 = 1.06;

fn glyph_width(c: char) -> u16 {
    match c as u32 {
        code @ 0x20..=0x7E => HELVETICA_WIDTHS[(code - 0x20) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, font: Font, size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| glyph_width(c) as u32).sum();
    let width = units as f64 * size / 1000.0;
    match font {
        Font::Regular => width,
        Font::Bold => width * BOLD_FACTOR,
    }
}

/// Greedy word wrap. A word wider than `max_width` gets a line to itself
/// and is never split.
pub fn wrap_text(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if text_width(&candidate, font, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// One drawn line. `y` is the text baseline, or the stroke position for rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub style: LineStyle,
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub number: usize,
    pub rows: Vec<Row>,
}

const LIST_INDENT: f64 = 12.0;
const BLANK_ADVANCE: f64 = 7.0;

struct Cursor<'a> {
    spec: &'a PageSpec,
    pages: Vec<Page>,
    rows: Vec<Row>,
    y: f64,
}

impl<'a> Cursor<'a> {
    fn new(spec: &'a PageSpec) -> Self {
        Self {
            spec,
            pages: Vec::new(),
            rows: Vec::new(),
            y: spec.top(),
        }
    }

    /// Start a new page when `needed` points don't fit above the bottom margin.
    fn ensure_space(&mut self, needed: f64) {
        if self.y - needed < self.spec.margin && !self.rows.is_empty() {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        let number = self.pages.len() + 1;
        self.pages.push(Page {
            number,
            rows: std::mem::take(&mut self.rows),
        });
        self.y = self.spec.top();
    }

    fn draw(&mut self, style: LineStyle, text: String, x: f64) {
        let leading = style.leading();
        self.ensure_space(leading);
        self.y -= leading;

        let y = match style {
            LineStyle::Rule => self.y + leading / 2.0,
            _ => self.y,
        };
        self.rows.push(Row { style, text, x, y });
    }

    fn advance(&mut self, amount: f64) {
        // Blank space at the top of a page is dropped
        if self.y < self.spec.top() {
            self.y = (self.y - amount).max(self.spec.margin);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.rows.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

/// Lay `document` out into pages, ending with a generation timestamp footer.
pub fn paginate(document: &str, spec: &PageSpec, generated_at: DateTime<Utc>) -> Vec<Page> {
    let mut cursor = Cursor::new(spec);
    let left = spec.margin;
    let width = spec.content_width();

    for line in document.lines() {
        match classify(line) {
            LineKind::Blank => cursor.advance(BLANK_ADVANCE),
            LineKind::Styled(LineStyle::Rule, _) => cursor.draw(LineStyle::Rule, String::new(), left),
            LineKind::Styled(LineStyle::ListItem, text) => {
                let style = LineStyle::ListItem;
                let wrapped = wrap_text(text, style.font(), style.font_size(), width - LIST_INDENT);
                for (i, row) in wrapped.into_iter().enumerate() {
                    let row = if i == 0 { format!("- {}", row) } else { row };
                    let x = if i == 0 { left } else { left + LIST_INDENT };
                    cursor.draw(style, row, x);
                }
            }
            LineKind::Styled(style, text) => {
                for row in wrap_text(text, style.font(), style.font_size(), width) {
                    cursor.draw(style, row, left);
                }
            }
        }
    }

    let stamp = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    cursor.advance(BLANK_ADVANCE);
    cursor.draw(LineStyle::Footer, format!("Generated {}", stamp), left);

    cursor.finish()
}
