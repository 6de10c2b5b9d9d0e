//! Named guided tasks offered from the greeting menu

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    LoanReadiness,
    LenderQuestions,
    DealStructure,
    DocumentPrep,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::LoanReadiness,
        TaskKind::LenderQuestions,
        TaskKind::DealStructure,
        TaskKind::DocumentPrep,
    ];

    /// Behavior profile id forwarded to text generation
    pub fn id(&self) -> &'static str {
        match self {
            TaskKind::LoanReadiness => "loan-readiness",
            TaskKind::LenderQuestions => "lender-questions",
            TaskKind::DealStructure => "deal-structure",
            TaskKind::DocumentPrep => "document-prep",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            TaskKind::LoanReadiness => "Check my loan readiness",
            TaskKind::LenderQuestions => "Practice lender questions",
            TaskKind::DealStructure => "Think through deal structure",
            TaskKind::DocumentPrep => "Prepare my document package",
        }
    }

    pub fn opening_message(&self) -> &'static str {
        match self {
            TaskKind::LoanReadiness => {
                "Let's see how ready you are to approach lenders. Tell me about the property \
                 and what you're hoping to borrow."
            }
            TaskKind::LenderQuestions => {
                "I'll play the underwriter. Give me a one-line description of your deal and \
                 I'll start with the questions a lender is likely to ask."
            }
            TaskKind::DealStructure => {
                "Let's work through structure: leverage, amortization, recourse and reserves. \
                 What does the deal look like today?"
            }
            TaskKind::DocumentPrep => {
                "Let's build your lender package. What kind of property is it, and is this a \
                 purchase or a refinance?"
            }
        }
    }
}
