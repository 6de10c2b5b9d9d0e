//! Read-only projection of a session for rendering

use super::machine::progress;
use super::state::{Banner, Mode, RequestKind, WizardState};
use super::tasks::TaskKind;
use crate::checklist::{build_document_checklist, DocumentRequirement};
use crate::metrics::{self, MetricReading};
use crate::questions::{QuestionKind, PREP_COACH_GRAPH};
use crate::transcript::ChatMessage;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub kind: &'static str,
    pub options: Vec<String>,
    pub optional: bool,
}

/// Which controls are waiting on a collaborator
#[derive(Debug, Clone, Serialize)]
pub struct Busy {
    pub asking: bool,
    pub saving: bool,
    pub generating: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub session_id: Uuid,
    pub mode: Mode,
    pub active_task: Option<TaskKind>,
    pub signed_in: bool,
    pub transcript: Vec<ChatMessage>,
    pub progress: Progress,
    pub current_question: Option<QuestionView>,
    pub banner: Option<Banner>,
    pub validation_error: Option<String>,
    pub metrics: Vec<MetricReading>,
    pub checklist: Vec<DocumentRequirement>,
    pub submission_id: Option<Uuid>,
    pub summary_text: Option<String>,
    pub busy: Busy,
}

impl WizardView {
    pub fn from_state(state: &WizardState) -> Self {
        let (completed, total) = progress(state);

        let current_question = state
            .current_question
            .as_deref()
            .and_then(|id| PREP_COACH_GRAPH.get_question_by_id(id))
            .map(|q| {
                let (kind, options) = match q.kind {
                    QuestionKind::Text => ("text", Vec::new()),
                    QuestionKind::Number => ("number", Vec::new()),
                    QuestionKind::Currency => ("currency", Vec::new()),
                    QuestionKind::Choice(opts) => {
                        ("choice", opts.iter().map(|o| o.to_string()).collect())
                    }
                };
                QuestionView {
                    id: q.id.to_string(),
                    prompt: q.prompt(),
                    kind,
                    options,
                    optional: q.optional,
                }
            });

        Self {
            session_id: state.session_id,
            mode: state.mode,
            active_task: state.active_task,
            signed_in: state.token.is_some(),
            transcript: state.transcript.messages().to_vec(),
            progress: Progress { completed, total },
            current_question,
            banner: state.banner.clone(),
            validation_error: state.validation_error.clone(),
            metrics: metrics::evaluate_all(&state.answers),
            checklist: build_document_checklist(&state.answers),
            submission_id: state.submission_id,
            summary_text: state.summary_text.clone(),
            busy: Busy {
                asking: state.is_in_flight(RequestKind::Ask),
                saving: state.is_in_flight(RequestKind::Save),
                generating: state.is_in_flight(RequestKind::Narrative),
            },
        }
    }
}
