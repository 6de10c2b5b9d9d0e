//! Error types for the PrepCoach intake core

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for intake operations
pub type Result<T> = std::result::Result<T, PrepCoachError>;

#[derive(Error, Debug)]
pub enum PrepCoachError {

    // =============================
    // Intake Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown question id: {0}")]
    UnknownQuestion(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Text generation error: {0}")]
    TextGeneration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepCoachError {
    /// Readable message plus the next step the user can take.
    pub fn user_message(&self) -> String {
        match self {
            PrepCoachError::Validation(msg) => format!("{} Please re-enter your answer.", msg),
            PrepCoachError::Unauthenticated => {
                "Please sign in to save your progress and generate your summary.".to_string()
            }
            PrepCoachError::Persistence(_) | PrepCoachError::Database(_) => {
                "We couldn't save your draft. Your answers are safe here, please try again."
                    .to_string()
            }
            PrepCoachError::TextGeneration(_) | PrepCoachError::Http(_) => {
                "The assistant is unavailable right now. Please try again in a moment.".to_string()
            }
            PrepCoachError::SessionNotFound(_) => {
                "This session has expired. Please start a new one.".to_string()
            }
            PrepCoachError::InvalidTransition(msg) => msg.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Collaborator failures the user may retry without losing state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PrepCoachError::Persistence(_)
                | PrepCoachError::TextGeneration(_)
                | PrepCoachError::Database(_)
                | PrepCoachError::Http(_)
        )
    }
}
