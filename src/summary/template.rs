//! Fixed-order document template
//!
//! Section order: deal snapshot, financial metrics, program fit, analyst
//! notes, document checklist. Line markers here are what the exporter's
//! layout keys off: `#` heading, dashed rule, uppercase subheading, `- ` item.

use super::deal_facts;
use crate::checklist::build_document_checklist;
use crate::export::layout::{classify, LineKind};
use crate::export::LineStyle;
use crate::metrics::{self, MetricKind, ASSUMED_AMORTIZATION_YEARS, ASSUMED_INTEREST_RATE};
use crate::models::Answers;

const RULE: &str = "--------------------------------------------------";

/// Merge answers and the two narrative sections into the document text.
pub fn assemble_document(answers: &Answers, program_fit: &str, notes: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("# EXECUTIVE SUMMARY".to_string());
    lines.push(subtitle(answers));
    lines.push(RULE.to_string());
    lines.push(String::new());

    lines.push("DEAL SNAPSHOT".to_string());
    let facts = deal_facts(answers);
    if facts.is_empty() {
        lines.push("- No deal details provided".to_string());
    }
    for (label, value) in facts {
        lines.push(format!("- {}: {}", label, value));
    }
    lines.push(String::new());

    lines.push("FINANCIAL METRICS".to_string());
    for kind in MetricKind::ALL {
        match metrics::reading(kind, answers) {
            Some(reading) => {
                lines.push(format!("- {}: {}", kind.label(), reading.display));
                if let Some(advisory) = reading.advisory {
                    lines.push(format!("- Note: {}", advisory));
                }
            }
            None => lines.push(format!("- {}: Not available", kind.label())),
        }
    }
    lines.push(format!(
        "DSCR assumes a {}% interest rate and {}-year amortization.",
        (ASSUMED_INTEREST_RATE * 100.0) as u32,
        ASSUMED_AMORTIZATION_YEARS
    ));
    lines.push(String::new());

    lines.push("PROGRAM FIT".to_string());
    lines.extend(narrative_lines(program_fit));
    lines.push(String::new());

    lines.push("ANALYST NOTES".to_string());
    lines.extend(narrative_lines(notes));
    lines.push(String::new());

    lines.push("DOCUMENT CHECKLIST".to_string());
    for doc in build_document_checklist(answers) {
        lines.push(format!("- {}", doc.label));
    }

    let mut document = lines.join("\n");
    document.push('\n');
    document
}

fn subtitle(answers: &Answers) -> String {
    let parts: Vec<&str> = ["borrower_name", "property_type", "loan_purpose"]
        .iter()
        .filter_map(|id| answers.text(id))
        .collect();

    if parts.is_empty() {
        "Commercial Loan Request".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Generated text is free-form and must not introduce document structure:
/// heading markers are stripped, dash-only rules dropped, and all-caps lines
/// demoted to list items so they don't render as subheadings.
fn narrative_lines(text: &str) -> Vec<String> {
    text.trim()
        .lines()
        .filter_map(|line| {
            let line = line.trim_start_matches(|c: char| c == '#' || c.is_whitespace());
            match classify(line) {
                LineKind::Styled(LineStyle::Rule, _) => None,
                LineKind::Styled(LineStyle::Subheading, caps) => Some(format!("- {}", caps)),
                _ => Some(line.trim_end().to_string()),
            }
        })
        .collect()
}
