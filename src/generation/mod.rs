//! Text-generation collaborator
//!
//! The wizard only ever asks a question and gets free text back. Which model
//! answers, and how, is the backend's business.

use crate::auth::UserToken;
use crate::transcript::{HistoryTurn, MAX_HISTORY_TURNS};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;
pub use gemini::GeminiClient;

/// One question for the text-generation backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AskRequest {
    pub prompt: String,
    /// Selects a specialized behavior profile on the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

impl AskRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Attach history, keeping only the newest `MAX_HISTORY_TURNS` entries.
    pub fn with_history(mut self, mut history: Vec<HistoryTurn>) -> Self {
        if history.len() > MAX_HISTORY_TURNS {
            history.drain(..history.len() - MAX_HISTORY_TURNS);
        }
        self.history = history;
        self
    }
}

/// Trait for the text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn ask(&self, token: &UserToken, request: AskRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    #[test]
    fn test_history_is_bounded() {
        let history: Vec<HistoryTurn> = (0..25)
            .map(|i| HistoryTurn {
                role: Role::User,
                content: format!("turn {}", i),
            })
            .collect();

        let request = AskRequest::new("What next?").with_history(history);
        assert_eq!(request.history.len(), MAX_HISTORY_TURNS);
        assert_eq!(request.history[0].content, "turn 5");
    }

    #[test]
    fn test_task_id_omitted_when_absent() {
        let json = serde_json::to_string(&AskRequest::new("hi")).unwrap();
        assert!(!json.contains("task_id"));

        let json = serde_json::to_string(&AskRequest::new("hi").with_task("loan-readiness")).unwrap();
        assert!(json.contains("loan-readiness"));
    }
}
