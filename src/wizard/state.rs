//! Serializable wizard session state

use super::tasks::TaskKind;
use crate::auth::UserToken;
use crate::models::Answers;
use crate::transcript::{ChatMessage, HistoryWindow, MessageKind, Transcript};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Greeting,
    Freeform,
    Task,
    Intake,
    Complete,
    Summary,
}

impl Mode {
    /// Modes that forward free text to the text-generation collaborator
    pub fn is_conversational(&self) -> bool {
        matches!(self, Mode::Freeform | Mode::Task)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Ask,
    Save,
    Narrative,
}

/// An issued command whose reply hasn't been applied yet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InFlight {
    pub request_id: u64,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    SignIn,
    SaveFailed,
    AskFailed,
    Error,
}

/// Dismissible notice shown above the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn new(kind: BannerKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardState {
    pub session_id: Uuid,
    pub mode: Mode,
    pub answers: Answers,
    pub transcript: Transcript,
    /// Question awaiting an answer while in intake
    pub current_question: Option<String>,
    pub active_task: Option<TaskKind>,
    /// Assigned by the persistence collaborator on first save
    pub submission_id: Option<Uuid>,
    pub summary_text: Option<String>,
    // Never serialized
    #[serde(skip)]
    pub token: Option<UserToken>,
    pub banner: Option<Banner>,
    pub validation_error: Option<String>,
    pub in_flight: Vec<InFlight>,
    /// A save was requested while another was outstanding
    pub save_queued: bool,
    pub next_request_id: u64,
    pub history_window: HistoryWindow,
}

pub(crate) const GREETING: &str = "Hi, I'm PrepCoach. I help you get a commercial loan request \
ready for lenders. What would you like to do?";

impl WizardState {
    pub fn new(history_window: HistoryWindow) -> Self {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::assistant(greeting_menu(), MessageKind::Greeting));

        Self {
            session_id: Uuid::new_v4(),
            mode: Mode::Greeting,
            answers: Answers::new(),
            transcript,
            current_question: None,
            active_task: None,
            submission_id: None,
            summary_text: None,
            token: None,
            banner: None,
            validation_error: None,
            in_flight: Vec::new(),
            save_queued: false,
            next_request_id: 1,
            history_window,
        }
    }

    pub fn with_token(mut self, token: Option<UserToken>) -> Self {
        self.token = token;
        self
    }

    pub fn is_in_flight(&self, kind: RequestKind) -> bool {
        self.in_flight.iter().any(|r| r.kind == kind)
    }

    /// Register a new outstanding request and return its id.
    pub(crate) fn issue(&mut self, kind: RequestKind) -> u64 {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight.push(InFlight { request_id, kind });
        request_id
    }

    /// Remove a request from the in-flight set. `None` means the reply is stale.
    pub(crate) fn settle(&mut self, request_id: u64) -> Option<InFlight> {
        let pos = self
            .in_flight
            .iter()
            .position(|r| r.request_id == request_id)?;
        Some(self.in_flight.remove(pos))
    }

    pub(crate) fn say(&mut self, message: impl Into<String>, kind: MessageKind) {
        self.transcript.push(ChatMessage::assistant(message, kind));
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new(HistoryWindow::default())
    }
}

pub(crate) fn greeting_menu() -> String {
    let mut menu = format!(
        "{}\n1. Ask a lending question\n2. Prepare my deal for lenders (guided intake)",
        GREETING
    );
    menu.push_str("\n3. Work through a guided task:");
    for task in super::tasks::TaskKind::ALL {
        menu.push_str(&format!("\n   - {} ({})", task.title(), task.id()));
    }
    menu
}
