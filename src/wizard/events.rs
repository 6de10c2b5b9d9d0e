//! Events into the reducer and commands out of it

use super::tasks::TaskKind;
use crate::auth::UserToken;
use crate::generation::AskRequest;
use crate::models::Answers;
use crate::summary::NarrativeReplies;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something the user did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserAction {
    ChooseFreeform,
    ChooseIntake,
    ChooseTask { task: TaskKind },
    Back,
    Submit { text: String },
    Skip,
    GenerateSummary,
    Save,
    DismissBanner,
}

/// Outcome of a command, tagged with the request it answers.
/// Collaborator errors arrive as strings.
#[derive(Debug, Clone, PartialEq)]
pub enum CollaboratorReply {
    AskReplied {
        request_id: u64,
        result: Result<String, String>,
    },
    SubmissionSaved {
        request_id: u64,
        result: Result<Uuid, String>,
    },
    NarrativeReady {
        request_id: u64,
        replies: NarrativeReplies,
    },
}

impl CollaboratorReply {
    pub fn request_id(&self) -> u64 {
        match self {
            CollaboratorReply::AskReplied { request_id, .. }
            | CollaboratorReply::SubmissionSaved { request_id, .. }
            | CollaboratorReply::NarrativeReady { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    User(UserAction),
    Reply(CollaboratorReply),
    /// Sign-in state changed; `None` means signed out
    SessionChanged(Option<UserToken>),
}

impl From<UserAction> for WizardEvent {
    fn from(action: UserAction) -> Self {
        WizardEvent::User(action)
    }
}

impl From<CollaboratorReply> for WizardEvent {
    fn from(reply: CollaboratorReply) -> Self {
        WizardEvent::Reply(reply)
    }
}

/// Side effect requested by the reducer, executed by `CommandRunner`
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask {
        request_id: u64,
        token: UserToken,
        request: AskRequest,
    },
    /// Create when `submission_id` is `None`, else update in place
    SaveSubmission {
        request_id: u64,
        token: UserToken,
        submission_id: Option<Uuid>,
        answers: Answers,
        summary: Option<String>,
    },
    GenerateNarrative {
        request_id: u64,
        token: UserToken,
        answers: Answers,
    },
}

impl Command {
    pub fn request_id(&self) -> u64 {
        match self {
            Command::Ask { request_id, .. }
            | Command::SaveSubmission { request_id, .. }
            | Command::GenerateNarrative { request_id, .. } => *request_id,
        }
    }
}
