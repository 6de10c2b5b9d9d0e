//! PrepCoach Intake
//!
//! Guided intake for commercial loan requests:
//! - A branching question graph collects structured deal data
//! - LTV, DSCR and liquidity are derived as answers arrive
//! - A required-documents checklist follows the deal type
//! - A reducer-driven wizard owns modes, transcript and collaborator calls
//! - Answers plus generated narrative become a paginated Executive Summary
//!
//! FLOW:
//! INPUT → WIZARD → ANSWERS → METRICS → NARRATIVE → DOCUMENT → PDF + DRAFT

pub mod api;
pub mod auth;
pub mod checklist;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod metrics;
pub mod models;
pub mod questions;
pub mod state;
pub mod summary;
pub mod transcript;
pub mod wizard;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use auth::UserToken;
pub use wizard::{CommandRunner, UserAction, WizardEvent, WizardState, WizardView};
