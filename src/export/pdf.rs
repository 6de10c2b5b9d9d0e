//! Minimal PDF 1.4 writer
//!
//! Only what the summary needs: the two built-in Helvetica faces, filled
//! text and stroked rules. Object layout is fixed (catalog, page tree,
//! fonts, then a page/content pair per page) so output is reproducible.

use super::layout::{Font, LineStyle, Page, PageSpec};
use std::fmt::Write as _;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const REGULAR_FONT_ID: usize = 3;
const BOLD_FONT_ID: usize = 4;
const FIRST_PAGE_ID: usize = 5;

/// Serialize laid-out pages into PDF bytes.
pub fn render_pdf(pages: &[Page], spec: &PageSpec) -> Vec<u8> {
    let mut writer = PdfWriter::new();

    let page_ids: Vec<usize> = (0..pages.len()).map(|i| FIRST_PAGE_ID + i * 2).collect();

    writer.object(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID).as_bytes(),
    );

    let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
    writer.object(
        PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    );

    for (id, font) in [(REGULAR_FONT_ID, Font::Regular), (BOLD_FONT_ID, Font::Bold)] {
        writer.object(
            id,
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            )
            .as_bytes(),
        );
    }

    for (page, page_id) in pages.iter().zip(&page_ids) {
        let content_id = page_id + 1;
        writer.object(
            *page_id,
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                PAGES_ID,
                number(spec.width),
                number(spec.height),
                REGULAR_FONT_ID,
                BOLD_FONT_ID,
                content_id
            )
            .as_bytes(),
        );

        let content = content_stream(page, spec);
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(&content);
        body.extend_from_slice(b"\nendstream");
        writer.object(content_id, &body);
    }

    writer.finish(CATALOG_ID)
}

fn content_stream(page: &Page, spec: &PageSpec) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();

    for row in &page.rows {
        let (r, g, b) = row.style.color();
        match row.style {
            LineStyle::Rule => {
                let ops = format!(
                    "{} {} {} RG 0.75 w {} {} m {} {} l S\n",
                    number(r),
                    number(g),
                    number(b),
                    number(row.x),
                    number(row.y),
                    number(row.x + spec.content_width()),
                    number(row.y)
                );
                out.extend_from_slice(ops.as_bytes());
            }
            style => {
                let font = style.font();
                let ops = format!(
                    "BT /{} {} Tf {} {} {} rg {} {} Td (",
                    font.resource(),
                    number(style.font_size()),
                    number(r),
                    number(g),
                    number(b),
                    number(row.x),
                    number(row.y)
                );
                out.extend_from_slice(ops.as_bytes());
                out.extend_from_slice(&encode_text(&row.text));
                out.extend_from_slice(b") Tj ET\n");
            }
        }
    }

    out
}

/// WinAnsi-encode a string literal body. Latin-1 maps through, anything
/// else becomes `?`.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => out.push(c as u32 as u8),
            '\u{2013}' | '\u{2014}' => out.push(b'-'),
            '\u{2018}' | '\u{2019}' => out.push(b'\''),
            '\u{201C}' | '\u{201D}' => out.push(b'"'),
            '\t' => out.push(b' '),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Compact decimal: at most two places, no trailing zeros.
fn number(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

struct PdfWriter {
    buffer: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buffer,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buffer.len()));
        self.buffer
            .extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        self.buffer.extend_from_slice(body);
        self.buffer.extend_from_slice(b"\nendobj\n");
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let size = self.offsets.len() + 1;
        let xref_offset = self.buffer.len();

        let mut xref = String::new();
        let _ = write!(xref, "xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.offsets {
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, root, xref_offset
        );

        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::layout::paginate;
    use chrono::{TimeZone, Utc};

    fn render(document: &str) -> Vec<u8> {
        let when = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let spec = PageSpec::LETTER;
        render_pdf(&paginate(document, &spec, when), &spec)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_pdf_structure() {
        let bytes = render("# EXECUTIVE SUMMARY\n-----\nDEAL SNAPSHOT\n- Borrower: Acme (Texas) LLC\n");

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert!(find(&bytes, b"/BaseFont /Helvetica-Bold").is_some());
        assert!(find(&bytes, b"(- Borrower: Acme \\(Texas\\) LLC) Tj").is_some());
        assert!(find(&bytes, b"(Generated 2026-03-01T12:00:00Z) Tj").is_some());
        assert!(find(&bytes, b" l S").is_some());
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = render("Body text\n");

        let startxref = find(&bytes, b"startxref\n").unwrap();
        let tail = std::str::from_utf8(&bytes[startxref + 10..]).unwrap();
        let xref_offset: usize = tail.lines().next().unwrap().parse().unwrap();

        let xref = std::str::from_utf8(&bytes[xref_offset..]).unwrap();
        assert!(xref.starts_with("xref\n0 7\n"));

        let entries: Vec<usize> = xref
            .lines()
            .skip(3)
            .take(6)
            .map(|l| l[..10].parse().unwrap())
            .collect();
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()));
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let document = "# TITLE\nSome text that is long enough to wrap maybe.\n";
        assert_eq!(render(document), render(document));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(612.0), "612");
        assert_eq!(number(0.75), "0.75");
        assert_eq!(number(54.5), "54.5");
        assert_eq!(number(-0.001), "0");
    }

    #[test]
    fn test_encode_text_escapes_and_maps() {
        assert_eq!(encode_text("a(b)\\"), b"a\\(b\\)\\\\".to_vec());
        assert_eq!(encode_text("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_text("\u{2014}\u{4e2d}"), b"-?".to_vec());
    }
}
