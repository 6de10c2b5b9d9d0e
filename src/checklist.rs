//! Document checklist builder
//!
//! Derives the supporting documents a lender will ask for from the deal
//! answers. Pure: same answers, same list.

use crate::models::Answers;
use serde::{Deserialize, Serialize};

use self::DocumentCategory::{Borrower, Income, Property, Transaction};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Borrower,
    Transaction,
    Property,
    Income,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentRequirement {
    pub key: &'static str,
    pub label: &'static str,
    pub category: DocumentCategory,
}

const fn doc(key: &'static str, label: &'static str, category: DocumentCategory) -> DocumentRequirement {
    DocumentRequirement {
        key,
        label,
        category,
    }
}

const BORROWER_DOCS: &[DocumentRequirement] = &[
    doc("pfs", "Personal financial statement for each guarantor", Borrower),
    doc("personal_returns", "Two years of personal tax returns", Borrower),
    doc("entity_docs", "Entity formation documents and operating agreement", Borrower),
    doc("credit_authorization", "Signed credit authorization", Borrower),
    doc("reo_schedule", "Schedule of real estate owned", Borrower),
];

const PURCHASE_DOCS: &[DocumentRequirement] = &[
    doc("purchase_contract", "Executed purchase and sale agreement", Transaction),
];

const REFINANCE_DOCS: &[DocumentRequirement] = &[
    doc("mortgage_statement", "Current mortgage statement", Transaction),
    doc("payoff_letter", "Payoff letter from the existing lender", Transaction),
];

const CASH_OUT_DOCS: &[DocumentRequirement] = &[
    doc("use_of_proceeds", "Use of proceeds statement", Transaction),
];

const CONSTRUCTION_DOCS: &[DocumentRequirement] = &[
    doc("construction_budget", "Detailed construction budget", Transaction),
    doc("plans_specs", "Plans and specifications", Transaction),
    doc("gc_contract", "General contractor agreement and resume", Transaction),
    doc("draw_schedule", "Construction timeline and draw schedule", Transaction),
];

const INCOME_PROPERTY_DOCS: &[DocumentRequirement] = &[
    doc("rent_roll", "Current rent roll", Property),
    doc("t12", "Trailing 12-month operating statement", Property),
];

const HOSPITALITY_DOCS: &[DocumentRequirement] = &[
    doc("str_report", "STR report", Property),
    doc("hotel_pnl", "Three years of property P&L statements", Property),
];

const STORAGE_DOCS: &[DocumentRequirement] = &[
    doc("occupancy_report", "Unit mix and occupancy report", Property),
    doc("t12", "Trailing 12-month operating statement", Property),
];

const OWNER_OCCUPIED_DOCS: &[DocumentRequirement] = &[
    doc("business_returns", "Three years of business tax returns", Income),
    doc("interim_financials", "Year-to-date business financial statements", Income),
];

const BUSINESS_PLAN_DOCS: &[DocumentRequirement] = &[
    doc("business_plan", "Business plan with leasing assumptions", Income),
    doc("capex_budget", "Capital improvement budget", Income),
];

const PROPERTY_BASICS: &[DocumentRequirement] = &[
    doc("photos", "Recent property photos", Property),
    doc("insurance", "Evidence of property insurance", Property),
];

/// Ordered, de-duplicated list of required documents.
pub fn build_document_checklist(answers: &Answers) -> Vec<DocumentRequirement> {
    let mut groups: Vec<&[DocumentRequirement]> = vec![BORROWER_DOCS];

    match answers.text("loan_purpose") {
        Some("Purchase") => groups.push(PURCHASE_DOCS),
        Some("Refinance") => groups.push(REFINANCE_DOCS),
        Some("Cash-Out Refinance") => {
            groups.push(REFINANCE_DOCS);
            groups.push(CASH_OUT_DOCS);
        }
        Some("Construction") => groups.push(CONSTRUCTION_DOCS),
        _ => {}
    }

    match answers.text("property_type") {
        Some("Hospitality") => groups.push(HOSPITALITY_DOCS),
        Some("Self-Storage") => groups.push(STORAGE_DOCS),
        Some("Multifamily") | Some("Retail") | Some("Office") | Some("Industrial")
        | Some("Mixed-Use") => groups.push(INCOME_PROPERTY_DOCS),
        _ => {}
    }

    match answers.text("occupancy_status") {
        Some("Owner-Occupied") => groups.push(OWNER_OCCUPIED_DOCS),
        Some("Vacant") | Some("Value-Add / Lease-Up") => groups.push(BUSINESS_PLAN_DOCS),
        _ => {}
    }

    groups.push(PROPERTY_BASICS);

    let mut checklist: Vec<DocumentRequirement> = Vec::new();
    for item in groups.into_iter().flatten() {
        if !checklist.iter().any(|existing| existing.key == item.key) {
            checklist.push(item.clone());
        }
    }

    checklist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerValue;

    fn with(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AnswerValue::Text(v.to_string())))
            .collect()
    }

    fn keys(list: &[DocumentRequirement]) -> Vec<&'static str> {
        list.iter().map(|d| d.key).collect()
    }

    #[test]
    fn test_base_checklist_without_answers() {
        let list = build_document_checklist(&Answers::new());
        assert_eq!(list.len(), BORROWER_DOCS.len() + PROPERTY_BASICS.len());
        assert_eq!(list[0].key, "pfs");
    }

    #[test]
    fn test_cash_out_includes_refinance_and_proceeds() {
        let list = build_document_checklist(&with(&[("loan_purpose", "Cash-Out Refinance")]));
        let keys = keys(&list);
        assert!(keys.contains(&"payoff_letter"));
        assert!(keys.contains(&"use_of_proceeds"));
        assert!(!keys.contains(&"purchase_contract"));
    }

    #[test]
    fn test_property_type_drives_property_docs() {
        let hotel = keys(&build_document_checklist(&with(&[("property_type", "Hospitality")])));
        assert!(hotel.contains(&"str_report"));
        assert!(!hotel.contains(&"rent_roll"));

        let mf = keys(&build_document_checklist(&with(&[("property_type", "Multifamily")])));
        assert!(mf.contains(&"rent_roll"));
    }

    #[test]
    fn test_no_duplicates_and_deterministic() {
        let answers = with(&[
            ("loan_purpose", "Construction"),
            ("property_type", "Self-Storage"),
            ("occupancy_status", "Vacant"),
        ]);
        let first = build_document_checklist(&answers);
        let second = build_document_checklist(&answers);
        assert_eq!(first, second);

        let k = keys(&first);
        let mut deduped = k.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), k.len());
    }
}
