//! Executive Summary assembly
//!
//! Two generated narrative sections plus the structured answers become one
//! plain-text document. A missing section degrades to a placeholder; the
//! user always gets a document.

use crate::auth::UserToken;
use crate::generation::{AskRequest, TextGenerator};
use crate::metrics;
use crate::models::Answers;
use crate::questions::PREP_COACH_GRAPH;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod template;

pub use template::assemble_document;

pub const PROGRAM_FIT_PLACEHOLDER: &str = "Program fit assessment not available.";
pub const NOTES_PLACEHOLDER: &str = "Analyst notes not available.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSection {
    ProgramFit,
    AnalystNotes,
}

impl NarrativeSection {
    pub fn task_id(&self) -> &'static str {
        match self {
            NarrativeSection::ProgramFit => "program-fit",
            NarrativeSection::AnalystNotes => "analyst-notes",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            NarrativeSection::ProgramFit => PROGRAM_FIT_PLACEHOLDER,
            NarrativeSection::AnalystNotes => NOTES_PLACEHOLDER,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            NarrativeSection::ProgramFit => {
                "Assess which commercial loan programs best fit this deal and why."
            }
            NarrativeSection::AnalystNotes => {
                "Write analyst notes on this deal's strengths, risks, and mitigants."
            }
        }
    }

    /// Prompt carrying the full answer set.
    pub fn prompt(&self, answers: &Answers) -> String {
        let mut prompt = String::new();
        prompt.push_str(self.instruction());
        prompt.push_str("\n\nDEAL DATA:\n");
        for (label, value) in deal_facts(answers) {
            prompt.push_str(&format!("- {}: {}\n", label, value));
        }

        let readings = metrics::evaluate_all(answers);
        if !readings.is_empty() {
            prompt.push_str("\nCALCULATED METRICS:\n");
            for reading in readings {
                prompt.push_str(&format!("- {}: {}\n", reading.kind.label(), reading.display));
            }
        }

        prompt
    }

    pub fn request(&self, answers: &Answers) -> AskRequest {
        AskRequest::new(self.prompt(answers)).with_task(self.task_id())
    }

    /// Generated text, or the placeholder when the reply is empty or failed.
    pub fn resolve(&self, reply: &std::result::Result<String, String>) -> String {
        match reply {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => self.placeholder().to_string(),
        }
    }
}

/// Answered questions in interview order, formatted for display.
pub fn deal_facts(answers: &Answers) -> Vec<(&'static str, String)> {
    let graph = &*PREP_COACH_GRAPH;

    graph
        .get_question_flow(answers)
        .into_iter()
        .filter_map(|id| {
            let question = graph.get_question_by_id(id)?;
            let value = answers.get(id)?;
            Some((question.label, graph.format_answer_for_display(id, value)))
        })
        .collect()
}

/// Both sections' raw outcomes. Errors are carried as strings so the
/// reducer can decide how to degrade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeReplies {
    pub program_fit: std::result::Result<String, String>,
    pub notes: std::result::Result<String, String>,
}

/// Ask for both sections concurrently.
pub async fn request_narrative(
    generator: &dyn TextGenerator,
    token: &UserToken,
    answers: &Answers,
) -> NarrativeReplies {
    info!(answers = answers.len(), "Requesting narrative sections");

    let (program_fit, notes) = tokio::join!(
        generator.ask(token, NarrativeSection::ProgramFit.request(answers)),
        generator.ask(token, NarrativeSection::AnalystNotes.request(answers)),
    );

    if let Err(e) = &program_fit {
        warn!("Program fit section failed, using placeholder: {}", e);
    }
    if let Err(e) = &notes {
        warn!("Analyst notes section failed, using placeholder: {}", e);
    }

    NarrativeReplies {
        program_fit: program_fit.map_err(|e| e.to_string()),
        notes: notes.map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerValue;

    #[test]
    fn test_resolve_uses_placeholder_for_empty_or_failed() {
        let section = NarrativeSection::ProgramFit;
        assert_eq!(section.resolve(&Ok("   ".into())), PROGRAM_FIT_PLACEHOLDER);
        assert_eq!(section.resolve(&Err("timeout".into())), PROGRAM_FIT_PLACEHOLDER);
        assert_eq!(section.resolve(&Ok(" Bank loan fits. ".into())), "Bank loan fits.");
    }

    #[test]
    fn test_prompt_contains_answers_and_metrics() {
        let mut answers = Answers::new();
        answers.insert("borrower_name", AnswerValue::Text("Acme LLC".into()));
        answers.insert("property_value", AnswerValue::Number(500_000.0));
        answers.insert("loan_amount", AnswerValue::Number(400_000.0));

        let request = NarrativeSection::AnalystNotes.request(&answers);
        assert_eq!(request.task_id.as_deref(), Some("analyst-notes"));
        assert!(request.prompt.contains("Borrower: Acme LLC"));
        assert!(request.prompt.contains("Requested Loan Amount: $400,000"));
        assert!(request.prompt.contains("Loan-to-Value (LTV): 80%"));
    }

    #[test]
    fn test_deal_facts_follow_interview_order() {
        let mut answers = Answers::new();
        answers.insert("loan_amount", AnswerValue::Number(400_000.0));
        answers.insert("borrower_name", AnswerValue::Text("Acme LLC".into()));

        let facts = deal_facts(&answers);
        assert_eq!(facts[0].0, "Borrower");
        assert_eq!(facts[1].0, "Requested Loan Amount");
    }
}
