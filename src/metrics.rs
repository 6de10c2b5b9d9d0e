//! Derived metrics calculator
//!
//! Pure functions over the live answer map. `None` means "not yet
//! computable" and must never be shown as zero.

use crate::models::Answers;
use serde::{Deserialize, Serialize};

/// Fixed underwriting assumptions used for DSCR
pub const ASSUMED_INTEREST_RATE: f64 = 0.07;
pub const ASSUMED_AMORTIZATION_YEARS: u32 = 25;

pub const DSCR_WARNING_THRESHOLD: f64 = 1.20;
pub const LIQUIDITY_WARNING_PERCENT: f64 = 10.0;

const LTV_INPUTS: &[&str] = &["property_value", "loan_amount"];
const DSCR_INPUTS: &[&str] = &[
    "loan_amount",
    "occupancy_status",
    "gross_annual_income",
    "operating_expenses",
    "business_net_income",
];
const LIQUIDITY_INPUTS: &[&str] = &["liquid_assets", "loan_amount"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    LoanToValue,
    DebtServiceCoverage,
    Liquidity,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::LoanToValue,
        MetricKind::DebtServiceCoverage,
        MetricKind::Liquidity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::LoanToValue => "Loan-to-Value (LTV)",
            MetricKind::DebtServiceCoverage => "Debt Service Coverage (DSCR)",
            MetricKind::Liquidity => "Liquidity",
        }
    }

    fn inputs(&self) -> &'static [&'static str] {
        match self {
            MetricKind::LoanToValue => LTV_INPUTS,
            MetricKind::DebtServiceCoverage => DSCR_INPUTS,
            MetricKind::Liquidity => LIQUIDITY_INPUTS,
        }
    }

    pub fn compute(&self, answers: &Answers) -> Option<f64> {
        match self {
            MetricKind::LoanToValue => compute_ltv(answers),
            MetricKind::DebtServiceCoverage => compute_dscr(answers),
            MetricKind::Liquidity => compute_liquidity_percent(answers),
        }
    }
}

/// A computed metric with its display form and any advisory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricReading {
    pub kind: MetricKind,
    pub value: f64,
    pub display: String,
    pub advisory: Option<String>,
}

impl MetricReading {
    fn from_value(kind: MetricKind, value: f64) -> Self {
        let (display, advisory) = match kind {
            MetricKind::LoanToValue => (format!("{}%", value as i64), None),
            MetricKind::DebtServiceCoverage => (
                format!("{:.2}x", value),
                (value < DSCR_WARNING_THRESHOLD).then(|| {
                    "DSCR is below 1.20x, which most conventional lenders require. \
                     A bridge or asset-based program may be a better fit."
                        .to_string()
                }),
            ),
            MetricKind::Liquidity => (
                format!("{}%", value as i64),
                (value < LIQUIDITY_WARNING_PERCENT).then(|| {
                    "Liquidity is under 10% of the loan amount. Lenders typically want \
                     to see at least 10% in post-closing reserves."
                        .to_string()
                }),
            ),
        };

        Self {
            kind,
            value,
            display,
            advisory,
        }
    }

    /// Transcript text for the auto-calculated message.
    pub fn message(&self) -> String {
        let mut text = format!("Calculated {}: {}", self.kind.label(), self.display);
        if self.kind == MetricKind::DebtServiceCoverage {
            text.push_str(&format!(
                " (assumes {}% interest, {}-year amortization)",
                (ASSUMED_INTEREST_RATE * 100.0) as u32,
                ASSUMED_AMORTIZATION_YEARS
            ));
        }
        if let Some(advisory) = &self.advisory {
            text.push_str("\nNote: ");
            text.push_str(advisory);
        }
        text
    }
}

fn positive(answers: &Answers, id: &str) -> Option<f64> {
    answers.number(id).filter(|n| *n > 0.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Loan amount over property value, as a whole percentage.
pub fn compute_ltv(answers: &Answers) -> Option<f64> {
    let loan = positive(answers, "loan_amount")?;
    let value = positive(answers, "property_value")?;

    Some((loan / value * 100.0).round())
}

/// Annual payment on a level-payment loan at the fixed assumptions.
pub fn annual_debt_service(loan_amount: f64) -> f64 {
    let monthly_rate = ASSUMED_INTEREST_RATE / 12.0;
    let payments = (ASSUMED_AMORTIZATION_YEARS * 12) as i32;

    let monthly_payment =
        loan_amount * monthly_rate / (1.0 - (1.0 + monthly_rate).powi(-payments));

    monthly_payment * 12.0
}

/// Net operating income from the occupancy-stage answers.
pub fn net_operating_income(answers: &Answers) -> Option<f64> {
    if answers.text("occupancy_status") == Some("Owner-Occupied") {
        return answers.number("business_net_income");
    }

    let income = answers.number("gross_annual_income")?;
    let expenses = answers.number("operating_expenses")?;
    Some(income - expenses)
}

/// NOI over annual debt service, rounded to two decimals.
pub fn compute_dscr(answers: &Answers) -> Option<f64> {
    let loan = positive(answers, "loan_amount")?;
    let noi = net_operating_income(answers)?;

    let debt_service = annual_debt_service(loan);
    if !debt_service.is_finite() || debt_service <= 0.0 {
        return None;
    }

    Some(round_to(noi / debt_service, 2))
}

/// Liquid assets as a whole percentage of the loan amount.
pub fn compute_liquidity_percent(answers: &Answers) -> Option<f64> {
    let loan = positive(answers, "loan_amount")?;
    let liquid = answers.number("liquid_assets")?;

    Some((liquid / loan * 100.0).round())
}

pub fn reading(kind: MetricKind, answers: &Answers) -> Option<MetricReading> {
    kind.compute(answers)
        .map(|value| MetricReading::from_value(kind, value))
}

/// Every metric computable from the answers, in display order.
pub fn evaluate_all(answers: &Answers) -> Vec<MetricReading> {
    MetricKind::ALL
        .iter()
        .filter_map(|kind| reading(*kind, answers))
        .collect()
}

/// Metrics to announce right after `question_id` was answered: those that
/// depend on it and are now computable.
pub fn triggered_by(question_id: &str, answers: &Answers) -> Vec<MetricReading> {
    MetricKind::ALL
        .iter()
        .filter(|kind| kind.inputs().contains(&question_id))
        .filter_map(|kind| reading(*kind, answers))
        .collect()
}
