//! The commercial-loan interview

use super::{NextQuestion, Question, QuestionGraph, QuestionKind};
use crate::models::Answers;
use lazy_static::lazy_static;

pub const LOAN_PURPOSES: &[&str] = &["Purchase", "Refinance", "Cash-Out Refinance", "Construction"];

pub const PROPERTY_TYPES: &[&str] = &[
    "Multifamily",
    "Retail",
    "Office",
    "Industrial",
    "Mixed-Use",
    "Hospitality",
    "Self-Storage",
    "Other",
];

pub const OCCUPANCY_STATUSES: &[&str] =
    &["Stabilized", "Value-Add / Lease-Up", "Vacant", "Owner-Occupied"];

pub const CLOSING_TIMELINES: &[&str] = &["Under 30 days", "30-60 days", "60-90 days", "Flexible"];

lazy_static! {
    pub static ref PREP_COACH_GRAPH: QuestionGraph = build_graph();
}

fn after_loan_amount(answers: &Answers) -> Option<&'static str> {
    match answers.text("loan_purpose") {
        Some("Construction") => Some("construction_budget"),
        Some("Refinance") | Some("Cash-Out Refinance") => Some("existing_debt"),
        _ => Some("occupancy_status"),
    }
}

fn after_existing_debt(answers: &Answers) -> Option<&'static str> {
    match answers.text("loan_purpose") {
        Some("Cash-Out Refinance") => Some("cash_out_use"),
        _ => Some("occupancy_status"),
    }
}

fn after_occupancy(answers: &Answers) -> Option<&'static str> {
    match answers.text("occupancy_status") {
        Some("Owner-Occupied") => Some("business_net_income"),
        Some("Vacant") => Some("liquid_assets"),
        _ => Some("gross_annual_income"),
    }
}

fn question(
    id: &'static str,
    label: &'static str,
    message: &'static str,
    kind: QuestionKind,
    next: NextQuestion,
) -> Question {
    Question {
        id,
        label,
        message,
        kind,
        min: None,
        max: None,
        optional: false,
        next,
    }
}

fn build_graph() -> QuestionGraph {
    use NextQuestion::{Computed, End, Fixed};
    use QuestionKind::{Choice, Currency, Number, Text};

    let questions = vec![
        question(
            "borrower_name",
            "Borrower",
            "Let's start with the basics. What is the borrower or entity name?",
            Text,
            Fixed("loan_purpose"),
        ),
        question(
            "loan_purpose",
            "Loan Purpose",
            "What is the purpose of the loan?",
            Choice(LOAN_PURPOSES),
            Fixed("property_type"),
        ),
        question(
            "property_type",
            "Property Type",
            "What type of property is this?",
            Choice(PROPERTY_TYPES),
            Fixed("property_address"),
        ),
        Question {
            optional: true,
            ..question(
                "property_address",
                "Property Address",
                "What is the property address?",
                Text,
                Fixed("property_value"),
            )
        },
        Question {
            min: Some(10_000.0),
            ..question(
                "property_value",
                "Property Value",
                "What is the purchase price or current estimated value of the property?",
                Currency,
                Fixed("loan_amount"),
            )
        },
        Question {
            min: Some(10_000.0),
            ..question(
                "loan_amount",
                "Requested Loan Amount",
                "How much are you looking to borrow?",
                Currency,
                Computed(after_loan_amount),
            )
        },
        Question {
            min: Some(0.0),
            ..question(
                "construction_budget",
                "Construction Budget",
                "What is the total construction budget, hard and soft costs included?",
                Currency,
                Fixed("construction_months"),
            )
        },
        Question {
            min: Some(1.0),
            max: Some(60.0),
            ..question(
                "construction_months",
                "Construction Timeline (months)",
                "How many months do you expect construction to take?",
                Number,
                Fixed("occupancy_status"),
            )
        },
        Question {
            min: Some(0.0),
            ..question(
                "existing_debt",
                "Existing Debt",
                "What is the current balance of the existing mortgage?",
                Currency,
                Computed(after_existing_debt),
            )
        },
        question(
            "cash_out_use",
            "Use of Cash-Out Proceeds",
            "How will the cash-out proceeds be used?",
            Text,
            Fixed("occupancy_status"),
        ),
        question(
            "occupancy_status",
            "Occupancy",
            "What best describes the property's current occupancy?",
            Choice(OCCUPANCY_STATUSES),
            Computed(after_occupancy),
        ),
        Question {
            min: Some(0.0),
            ..question(
                "gross_annual_income",
                "Gross Annual Income",
                "What is the property's gross annual rental income?",
                Currency,
                Fixed("operating_expenses"),
            )
        },
        Question {
            min: Some(0.0),
            ..question(
                "operating_expenses",
                "Annual Operating Expenses",
                "What are the annual operating expenses (taxes, insurance, maintenance, management)?",
                Currency,
                Fixed("liquid_assets"),
            )
        },
        question(
            "business_net_income",
            "Business Net Income",
            "What is the operating business's annual net income available for debt service?",
            Currency,
            Fixed("liquid_assets"),
        ),
        Question {
            min: Some(0.0),
            ..question(
                "liquid_assets",
                "Liquid Assets",
                "How much do the guarantors hold in liquid assets (cash, securities)?",
                Currency,
                Fixed("credit_score"),
            )
        },
        Question {
            min: Some(300.0),
            max: Some(850.0),
            optional: true,
            ..question(
                "credit_score",
                "Credit Score",
                "What is the primary guarantor's approximate credit score?",
                Number,
                Fixed("experience_years"),
            )
        },
        Question {
            min: Some(0.0),
            max: Some(60.0),
            optional: true,
            ..question(
                "experience_years",
                "Years of CRE Experience",
                "How many years of commercial real estate experience does the sponsor have?",
                Number,
                Fixed("closing_timeline"),
            )
        },
        Question {
            optional: true,
            ..question(
                "closing_timeline",
                "Target Closing",
                "When do you need to close?",
                Choice(CLOSING_TIMELINES),
                Fixed("additional_notes"),
            )
        },
        Question {
            optional: true,
            ..question(
                "additional_notes",
                "Additional Notes",
                "Anything else a lender should know about this deal?",
                Text,
                End,
            )
        },
    ];

    let intros = vec![
        (
            "loan_purpose",
            "Great. Next, a few questions about the deal itself.",
        ),
        (
            "property_value",
            "Now let's talk numbers. Lenders size loans off value first.",
        ),
        (
            "occupancy_status",
            "Next up is income. This is what drives debt service coverage.",
        ),
        (
            "liquid_assets",
            "Almost there. Lenders also look at sponsor strength.",
        ),
        (
            "additional_notes",
            "Last one before I put your summary together.",
        ),
    ];

    QuestionGraph::new("borrower_name", questions, intros)
}
