//! Question graph model
//!
//! Declares the intake interview independent of any UI: the questions, how
//! each one picks its successor, and the validation each answer must pass.
//! Navigation is forward-only; a `None` successor means intake is complete.

use crate::error::PrepCoachError;
use crate::models::{parse_amount, AnswerValue, Answers};
use crate::Result;
use std::collections::HashMap;

pub mod catalog;

pub use catalog::PREP_COACH_GRAPH;

/// Input kind, governs validation and display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Text,
    Number,
    Currency,
    Choice(&'static [&'static str]),
}

/// How a question picks the next one.
#[derive(Clone, Copy)]
pub enum NextQuestion {
    Fixed(&'static str),
    /// Branch on any prior answer. Must treat a missing answer as a
    /// deterministic default branch.
    Computed(fn(&Answers) -> Option<&'static str>),
    End,
}

impl std::fmt::Debug for NextQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextQuestion::Fixed(id) => write!(f, "Fixed({})", id),
            NextQuestion::Computed(_) => write!(f, "Computed(..)"),
            NextQuestion::End => write!(f, "End"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: &'static str,
    /// Short label used in the document snapshot
    pub label: &'static str,
    pub message: &'static str,
    pub kind: QuestionKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub optional: bool,
    pub next: NextQuestion,
}

impl Question {
    /// Validate raw user input and convert it into the stored value.
    pub fn parse_answer(&self, raw: &str) -> Result<AnswerValue> {
        let trimmed = raw.trim();

        match self.kind {
            QuestionKind::Text => {
                if trimmed.is_empty() {
                    return Err(PrepCoachError::Validation(
                        "Please enter a response.".to_string(),
                    ));
                }
                Ok(AnswerValue::Text(trimmed.to_string()))
            }
            QuestionKind::Number | QuestionKind::Currency => {
                let value = parse_amount(trimmed).ok_or_else(|| {
                    PrepCoachError::Validation("Please enter a number.".to_string())
                })?;

                if let Some(min) = self.min {
                    if value < min {
                        return Err(PrepCoachError::Validation(format!(
                            "Please enter a value of at least {}.",
                            self.format_number(min)
                        )));
                    }
                }
                if let Some(max) = self.max {
                    if value > max {
                        return Err(PrepCoachError::Validation(format!(
                            "Please enter a value no greater than {}.",
                            self.format_number(max)
                        )));
                    }
                }

                Ok(AnswerValue::Number(value))
            }
            QuestionKind::Choice(options) => {
                let lowered = trimmed.to_lowercase();

                let by_index = trimmed
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| options.get(i));

                let chosen = by_index.or_else(|| {
                    options.iter().find(|opt| opt.to_lowercase() == lowered)
                });

                chosen
                    .map(|opt| AnswerValue::Text(opt.to_string()))
                    .ok_or_else(|| {
                        PrepCoachError::Validation(format!(
                            "Please choose one of: {}.",
                            options.join(", ")
                        ))
                    })
            }
        }
    }

    /// Prompt text including the option list for choice questions.
    pub fn prompt(&self) -> String {
        let mut prompt = self.message.to_string();

        if let QuestionKind::Choice(options) = self.kind {
            for (i, opt) in options.iter().enumerate() {
                prompt.push_str(&format!("\n{}. {}", i + 1, opt));
            }
        }
        if self.optional {
            prompt.push_str("\n(Optional, you can skip this one.)");
        }

        prompt
    }

    fn format_number(&self, value: f64) -> String {
        match self.kind {
            QuestionKind::Currency => format_currency(value),
            _ => format_grouped(value),
        }
    }
}

/// The interview: questions keyed by id, a designated first question, and
/// optional section intros keyed by the question they precede.
pub struct QuestionGraph {
    first: &'static str,
    questions: Vec<Question>,
    index: HashMap<&'static str, usize>,
    intros: HashMap<&'static str, &'static str>,
}

impl QuestionGraph {
    pub fn new(
        first: &'static str,
        questions: Vec<Question>,
        intros: Vec<(&'static str, &'static str)>,
    ) -> Self {
        let index = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id, i))
            .collect();

        Self {
            first,
            questions,
            index,
            intros: intros.into_iter().collect(),
        }
    }

    pub fn first_question_id(&self) -> &'static str {
        self.first
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get_question_by_id(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    /// Like `get_question_by_id`, but an unknown id is an error. Only a
    /// miswired graph produces one.
    pub fn require(&self, id: &str) -> Result<&Question> {
        self.get_question_by_id(id)
            .ok_or_else(|| PrepCoachError::UnknownQuestion(id.to_string()))
    }

    /// Resolve the successor of `current_id` given every answer so far.
    pub fn get_next_question_id(
        &self,
        current_id: &str,
        answers: &Answers,
    ) -> Result<Option<&'static str>> {
        let question = self.require(current_id)?;

        Ok(match question.next {
            NextQuestion::Fixed(id) => Some(id),
            NextQuestion::Computed(resolve) => resolve(answers),
            NextQuestion::End => None,
        })
    }

    /// Ordered ids that would be visited given the answers so far. Only used
    /// for progress; tolerates any partial answer set.
    pub fn get_question_flow(&self, answers: &Answers) -> Vec<&'static str> {
        let mut flow = Vec::with_capacity(self.questions.len());
        let mut current = Some(self.first);

        while let Some(id) = current {
            // Guard against a miswired cycle
            if flow.contains(&id) || flow.len() >= self.questions.len() {
                break;
            }
            flow.push(id);
            current = self.get_next_question_id(id, answers).ok().flatten();
        }

        flow
    }

    pub fn section_intro(&self, id: &str) -> Option<&'static str> {
        self.intros.get(id).copied()
    }

    /// Format an answer for transcript echo. Never changes the stored value.
    pub fn format_answer_for_display(&self, id: &str, value: &AnswerValue) -> String {
        let Some(question) = self.get_question_by_id(id) else {
            return value.to_string();
        };

        match (question.kind, value.as_number()) {
            (QuestionKind::Currency, Some(n)) => format_currency(n),
            (QuestionKind::Number, Some(n)) => format_grouped(n),
            _ => value.to_string(),
        }
    }
}

/// `$1,234,567` (cents dropped when whole).
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, format_grouped(value.abs()))
}

/// Thousands separators; up to two decimals when not whole.
pub fn format_grouped(value: f64) -> String {
    let negative = value < 0.0;
    let abs = value.abs();
    let rounded = (abs * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if cents > 0 {
        grouped.push_str(&format!(".{:02}", cents));
    }
    if negative {
        grouped.insert(0, '-');
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_question(min: Option<f64>, max: Option<f64>) -> Question {
        Question {
            id: "months",
            label: "Months",
            message: "How many months?",
            kind: QuestionKind::Number,
            min,
            max,
            optional: false,
            next: NextQuestion::End,
        }
    }

    #[test]
    fn test_number_bounds() {
        let q = number_question(Some(1.0), Some(60.0));
        assert_eq!(q.parse_answer("12").unwrap(), AnswerValue::Number(12.0));
        assert!(matches!(q.parse_answer("0"), Err(PrepCoachError::Validation(_))));
        assert!(matches!(q.parse_answer("61"), Err(PrepCoachError::Validation(_))));
        assert!(matches!(q.parse_answer("soon"), Err(PrepCoachError::Validation(_))));
    }

    #[test]
    fn test_text_rejects_whitespace() {
        let q = Question {
            kind: QuestionKind::Text,
            ..number_question(None, None)
        };
        assert!(q.parse_answer("   ").is_err());
        assert_eq!(
            q.parse_answer("  Acme  ").unwrap(),
            AnswerValue::Text("Acme".into())
        );
    }

    #[test]
    fn test_choice_accepts_index_and_text() {
        let q = Question {
            kind: QuestionKind::Choice(&["Purchase", "Refinance"]),
            ..number_question(None, None)
        };
        assert_eq!(q.parse_answer("2").unwrap(), AnswerValue::Text("Refinance".into()));
        assert_eq!(q.parse_answer("purchase").unwrap(), AnswerValue::Text("Purchase".into()));
        assert!(q.parse_answer("3").is_err());
        assert!(q.parse_answer("0").is_err());
        assert!(q.parse_answer("lease").is_err());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(500_000.0), "$500,000");
        assert_eq!(format_currency(1_234.5), "$1,234.50");
        assert_eq!(format_currency(-42_000.0), "-$42,000");
        assert_eq!(format_currency(999.0), "$999");
    }

    #[test]
    fn test_graph_requires_known_ids() {
        let graph = QuestionGraph::new("months", vec![number_question(None, None)], vec![]);
        assert!(graph.get_next_question_id("months", &Answers::new()).unwrap().is_none());
        assert!(matches!(
            graph.get_next_question_id("nope", &Answers::new()),
            Err(PrepCoachError::UnknownQuestion(_))
        ));
    }
}
