//! Command execution
//!
//! The only place the wizard touches collaborators. Every outcome, success
//! or failure, becomes a reply event; errors never escape as `Err`.

use super::events::{CollaboratorReply, Command, WizardEvent};
use super::machine::apply;
use super::state::WizardState;
use crate::error::PrepCoachError;
use crate::generation::TextGenerator;
use crate::models::SubmissionPatch;
use crate::state::SubmissionStore;
use crate::summary::request_narrative;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct CommandRunner {
    store: Arc<dyn SubmissionStore>,
    generator: Arc<dyn TextGenerator>,
}

impl CommandRunner {
    pub fn new(store: Arc<dyn SubmissionStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Run one command against its collaborator.
    pub async fn execute(&self, command: Command) -> WizardEvent {
        let reply = match command {
            Command::Ask {
                request_id,
                token,
                request,
            } => {
                info!(request_id, task_id = ?request.task_id, history = request.history.len(), "Forwarding question");
                let result = self
                    .generator
                    .ask(&token, request)
                    .await
                    .map_err(|e| {
                        log_failure(request_id, "Ask", &e);
                        e.to_string()
                    });
                CollaboratorReply::AskReplied { request_id, result }
            }
            Command::SaveSubmission {
                request_id,
                token,
                submission_id,
                answers,
                summary,
            } => {
                let result = match submission_id {
                    None => {
                        self.store
                            .create_submission(&token, &answers, summary.as_deref())
                            .await
                    }
                    Some(id) => {
                        let patch = SubmissionPatch {
                            answers: Some(answers),
                            summary,
                        };
                        self.store
                            .update_submission(&token, id, patch)
                            .await
                            .map(|_| id)
                    }
                };

                match &result {
                    Ok(id) => info!(request_id, submission_id = %id, "Draft saved"),
                    Err(e) => log_failure(request_id, "Saving draft", e),
                }

                CollaboratorReply::SubmissionSaved {
                    request_id,
                    result: result.map_err(|e| e.to_string()),
                }
            }
            Command::GenerateNarrative {
                request_id,
                token,
                answers,
            } => {
                let replies = request_narrative(self.generator.as_ref(), &token, &answers).await;
                CollaboratorReply::NarrativeReady {
                    request_id,
                    replies,
                }
            }
        };

        WizardEvent::Reply(reply)
    }

    /// Execute a batch in order, returning one reply per command.
    pub async fn execute_all(&self, commands: Vec<Command>) -> Vec<WizardEvent> {
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            replies.push(self.execute(command).await);
        }
        replies
    }

    /// Apply `event` and keep executing resulting commands until the state
    /// settles.
    pub async fn drive(&self, state: &mut WizardState, event: WizardEvent) {
        let mut pending: VecDeque<Command> = apply(state, event).into();

        while let Some(command) = pending.pop_front() {
            let reply = self.execute(command).await;
            pending.extend(apply(state, reply));
        }
    }
}

// Retryable collaborator failures are routine; anything else is a bug or misconfiguration
fn log_failure(request_id: u64, what: &str, e: &PrepCoachError) {
    if e.is_recoverable() {
        warn!(request_id, "{} failed: {}", what, e);
    } else {
        error!(request_id, "{} failed: {}", what, e);
    }
}
