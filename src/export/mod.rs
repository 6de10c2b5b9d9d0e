//! Executive Summary export
//!
//! Pure local computation: assembled text in, PDF bytes out.

use crate::error::PrepCoachError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

pub mod layout;
pub mod pdf;

pub use layout::{paginate, LineStyle, Page, PageSpec, Row};
pub use pdf::render_pdf;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Downloadable document with its metadata
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub size_bytes: usize,
}

/// Lay out and render the summary as a Letter-size PDF.
pub fn export_summary(
    summary_text: &str,
    borrower: Option<&str>,
    generated_at: DateTime<Utc>,
) -> Result<ExportArtifact> {
    if summary_text.trim().is_empty() {
        return Err(PrepCoachError::Export(
            "No summary has been generated yet".to_string(),
        ));
    }

    let spec = PageSpec::LETTER;
    let pages = paginate(summary_text, &spec, generated_at);
    let bytes = render_pdf(&pages, &spec);

    let file_name = file_name_for(borrower);
    info!(
        file_name = %file_name,
        pages = pages.len(),
        size_bytes = bytes.len(),
        "Exported executive summary"
    );

    Ok(ExportArtifact {
        file_name,
        mime_type: PDF_MIME_TYPE.to_string(),
        page_count: pages.len(),
        size_bytes: bytes.len(),
        bytes,
    })
}

fn file_name_for(borrower: Option<&str>) -> String {
    let slug = borrower.map(slugify).filter(|s| !s.is_empty());
    match slug {
        Some(slug) => format!("{}-executive-summary.pdf", slug),
        None => "executive-summary.pdf".to_string(),
    }
}

/// Lowercased ASCII filename stem, at most 50 chars
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.to_lowercase().chars().take(50) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
