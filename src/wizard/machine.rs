//! Wizard reducer
//!
//! `reduce(state, event) -> (state, commands)` is the whole state machine.
//! It never performs I/O: anything that needs a collaborator comes back as a
//! `Command`, and the command's outcome re-enters as a `CollaboratorReply`.
//! A reply whose request is no longer in flight is dropped.

use super::events::{CollaboratorReply, Command, UserAction, WizardEvent};
use super::state::{greeting_menu, Banner, BannerKind, Mode, RequestKind, WizardState};
use super::tasks::TaskKind;
use crate::auth::{require_token, UserToken};
use crate::error::PrepCoachError;
use crate::generation::AskRequest;
use crate::metrics;
use crate::questions::PREP_COACH_GRAPH;
use crate::summary::{assemble_document, NarrativeReplies, NarrativeSection};
use crate::transcript::{ChatMessage, MessageKind};
use tracing::debug;

const FREEFORM_OPENING: &str = "Ask me anything about commercial lending: loan programs, \
ratios like LTV and DSCR, or what lenders look for. Type 'back' to return to the menu.";

const INTAKE_OPENING: &str = "Great, I'll walk you through your deal one question at a time. \
Numbers can include $ and commas. Optional questions can be skipped.";

const INTAKE_COMPLETE: &str = "That's everything I need. Your answers have been saved as a \
draft. When you're ready, generate your Executive Summary.";

const ASK_FALLBACK_REPLY: &str = "I couldn't get an answer just now. Please try again.";

/// Pure transition function.
pub fn reduce(mut state: WizardState, event: WizardEvent) -> (WizardState, Vec<Command>) {
    let commands = apply(&mut state, event);
    (state, commands)
}

/// In-place form of `reduce`.
pub fn apply(state: &mut WizardState, event: WizardEvent) -> Vec<Command> {
    match event {
        WizardEvent::User(action) => apply_action(state, action),
        WizardEvent::Reply(reply) => apply_reply(state, reply),
        WizardEvent::SessionChanged(token) => {
            if token.is_some() && matches!(&state.banner, Some(b) if b.kind == BannerKind::SignIn) {
                state.banner = None;
            }
            state.token = token;
            Vec::new()
        }
    }
}

/// (questions before the current one, questions on the projected path)
pub fn progress(state: &WizardState) -> (usize, usize) {
    let flow = PREP_COACH_GRAPH.get_question_flow(&state.answers);
    let total = flow.len();

    let done = match (&state.current_question, state.mode) {
        (Some(id), _) => flow.iter().position(|q| *q == id.as_str()).unwrap_or(0),
        (None, Mode::Complete | Mode::Summary) => total,
        (None, _) => 0,
    };

    (done, total)
}

// =============================
// User actions
// =============================

fn apply_action(state: &mut WizardState, action: UserAction) -> Vec<Command> {
    match (state.mode, action) {
        (Mode::Greeting, UserAction::ChooseFreeform) => {
            state.mode = Mode::Freeform;
            state.say(FREEFORM_OPENING, MessageKind::Notice);
            Vec::new()
        }
        (Mode::Greeting, UserAction::ChooseTask { task }) => {
            start_task(state, task);
            Vec::new()
        }
        (Mode::Greeting, UserAction::ChooseIntake) => {
            start_intake(state);
            Vec::new()
        }
        (mode, UserAction::Back) if mode.is_conversational() => {
            go_back(state);
            Vec::new()
        }
        (mode, UserAction::Submit { text }) if mode.is_conversational() => {
            submit_chat(state, text)
        }
        (Mode::Intake, UserAction::Submit { text }) => submit_answer(state, &text),
        (Mode::Intake, UserAction::Skip) => skip_question(state),
        (Mode::Complete, UserAction::GenerateSummary) => generate_summary(state),
        (Mode::Intake | Mode::Complete | Mode::Summary, UserAction::Save) => {
            request_save(state).into_iter().collect()
        }
        (_, UserAction::DismissBanner) => {
            state.banner = None;
            Vec::new()
        }
        (mode, action) => {
            debug!(session_id = %state.session_id, ?mode, ?action, "Ignoring action not allowed in mode");
            Vec::new()
        }
    }
}

fn start_task(state: &mut WizardState, task: TaskKind) {
    state.mode = Mode::Task;
    state.active_task = Some(task);
    state.say(task.opening_message(), MessageKind::Chat);
}

fn start_intake(state: &mut WizardState) {
    state.mode = Mode::Intake;
    state.say(INTAKE_OPENING, MessageKind::Notice);

    let first = PREP_COACH_GRAPH.first_question_id();
    present_question(state, first);
}

fn go_back(state: &mut WizardState) {
    // Any outstanding ask belongs to the mode being left
    state.in_flight.retain(|r| r.kind != RequestKind::Ask);
    state.mode = Mode::Greeting;
    state.active_task = None;
    state.validation_error = None;
    state.say(greeting_menu(), MessageKind::Greeting);
}

fn submit_chat(state: &mut WizardState, text: String) -> Vec<Command> {
    let text = text.trim().to_string();
    if text.is_empty() {
        state.validation_error = Some("Please enter a message.".to_string());
        return Vec::new();
    }
    if state.is_in_flight(RequestKind::Ask) {
        debug!(session_id = %state.session_id, "Ask already in flight, refusing duplicate");
        return Vec::new();
    }
    let Some(token) = signed_in(state) else {
        return Vec::new();
    };

    state.validation_error = None;

    // History is what came before this message
    let history = state.history_window.recent_turns(&state.transcript);
    state.transcript.push(ChatMessage::user(text.clone(), MessageKind::Chat));

    let mut request = AskRequest::new(text).with_history(history);
    if let Some(task) = state.active_task {
        request = request.with_task(task.id());
    }

    let request_id = state.issue(RequestKind::Ask);
    vec![Command::Ask {
        request_id,
        token,
        request,
    }]
}

fn submit_answer(state: &mut WizardState, raw: &str) -> Vec<Command> {
    let Some(question_id) = state.current_question.clone() else {
        return Vec::new();
    };
    let question = match PREP_COACH_GRAPH.require(&question_id) {
        Ok(q) => q,
        Err(e) => {
            state.banner = Some(Banner::new(BannerKind::Error, e.user_message()));
            return Vec::new();
        }
    };

    let value = match question.parse_answer(raw) {
        Ok(value) => value,
        Err(e) => {
            let message = validation_text(&e);
            state.validation_error = Some(message.clone());
            state.say(message, MessageKind::Validation);
            state.say(question.prompt(), MessageKind::Question);
            return Vec::new();
        }
    };

    state.validation_error = None;
    let display = PREP_COACH_GRAPH.format_answer_for_display(question.id, &value);
    state.transcript.push(ChatMessage::user(display, MessageKind::Answer));
    state.answers.insert(question.id, value);

    for reading in metrics::triggered_by(question.id, &state.answers) {
        state.say(reading.message(), MessageKind::Advisory);
    }

    advance(state, question.id)
}

fn skip_question(state: &mut WizardState) -> Vec<Command> {
    let Some(question_id) = state.current_question.clone() else {
        return Vec::new();
    };
    let question = match PREP_COACH_GRAPH.require(&question_id) {
        Ok(q) => q,
        Err(e) => {
            state.banner = Some(Banner::new(BannerKind::Error, e.user_message()));
            return Vec::new();
        }
    };

    if !question.optional {
        let message = "This question is required, so it can't be skipped.".to_string();
        state.validation_error = Some(message.clone());
        state.say(message, MessageKind::Validation);
        return Vec::new();
    }

    state.validation_error = None;
    state.transcript.push(ChatMessage::user("Skipped", MessageKind::Answer));
    advance(state, question.id)
}

/// Move past `from_id`: present the next question, or complete intake.
fn advance(state: &mut WizardState, from_id: &str) -> Vec<Command> {
    match PREP_COACH_GRAPH.get_next_question_id(from_id, &state.answers) {
        Ok(Some(next_id)) => {
            present_question(state, next_id);
            Vec::new()
        }
        Ok(None) => {
            debug!(session_id = %state.session_id, answers = state.answers.len(), "Intake complete");
            state.current_question = None;
            state.mode = Mode::Complete;
            state.say(INTAKE_COMPLETE, MessageKind::Notice);
            request_save(state).into_iter().collect()
        }
        Err(e) => {
            state.banner = Some(Banner::new(BannerKind::Error, e.user_message()));
            Vec::new()
        }
    }
}

fn present_question(state: &mut WizardState, id: &'static str) {
    if let Some(intro) = PREP_COACH_GRAPH.section_intro(id) {
        state.say(intro, MessageKind::Intro);
    }

    match PREP_COACH_GRAPH.require(id) {
        Ok(question) => {
            state.say(question.prompt(), MessageKind::Question);
            state.current_question = Some(id.to_string());
        }
        Err(e) => {
            state.banner = Some(Banner::new(BannerKind::Error, e.user_message()));
        }
    }
}

fn generate_summary(state: &mut WizardState) -> Vec<Command> {
    if state.is_in_flight(RequestKind::Narrative) {
        debug!(session_id = %state.session_id, "Narrative already in flight, refusing duplicate");
        return Vec::new();
    }
    let Some(token) = signed_in(state) else {
        return Vec::new();
    };

    state.say(
        "Writing your Executive Summary. This can take a few seconds.",
        MessageKind::Notice,
    );

    let request_id = state.issue(RequestKind::Narrative);
    vec![Command::GenerateNarrative {
        request_id,
        token,
        answers: state.answers.clone(),
    }]
}

/// Create-or-update the draft. Coalesces with an outstanding save.
fn request_save(state: &mut WizardState) -> Option<Command> {
    if state.is_in_flight(RequestKind::Save) {
        state.save_queued = true;
        return None;
    }
    let token = signed_in(state)?;

    let request_id = state.issue(RequestKind::Save);
    Some(Command::SaveSubmission {
        request_id,
        token,
        submission_id: state.submission_id,
        answers: state.answers.clone(),
        summary: state.summary_text.clone(),
    })
}

/// Token for a collaborator call, or a sign-in banner when there is none.
fn signed_in(state: &mut WizardState) -> Option<UserToken> {
    match require_token(state.token.as_ref()) {
        Ok(token) => Some(token.clone()),
        Err(e) => {
            state.banner = Some(Banner::new(BannerKind::SignIn, e.user_message()));
            None
        }
    }
}

fn validation_text(error: &PrepCoachError) -> String {
    match error {
        PrepCoachError::Validation(msg) => msg.clone(),
        other => other.user_message(),
    }
}

// =============================
// Collaborator replies
// =============================

fn apply_reply(state: &mut WizardState, reply: CollaboratorReply) -> Vec<Command> {
    let request_id = reply.request_id();
    if state.settle(request_id).is_none() {
        debug!(session_id = %state.session_id, request_id, "Dropping stale reply");
        return Vec::new();
    }

    match reply {
        CollaboratorReply::AskReplied { result, .. } => {
            match result {
                Ok(text) if !text.trim().is_empty() => {
                    state.say(text.trim(), MessageKind::Chat);
                }
                other => {
                    let reason = other.err().unwrap_or_else(|| "empty reply".to_string());
                    let error = PrepCoachError::TextGeneration(reason);
                    state.banner = Some(Banner::new(BannerKind::AskFailed, error.user_message()));
                    state.say(ASK_FALLBACK_REPLY, MessageKind::Notice);
                }
            }
            Vec::new()
        }
        CollaboratorReply::SubmissionSaved { result, .. } => {
            match result {
                Ok(id) => {
                    state.submission_id = Some(id);
                    if matches!(&state.banner, Some(b) if b.kind == BannerKind::SaveFailed) {
                        state.banner = None;
                    }
                }
                Err(e) => {
                    let error = PrepCoachError::Persistence(e);
                    state.banner = Some(Banner::new(BannerKind::SaveFailed, error.user_message()));
                }
            }

            if state.save_queued {
                state.save_queued = false;
                return request_save(state).into_iter().collect();
            }
            Vec::new()
        }
        CollaboratorReply::NarrativeReady { replies, .. } => finish_summary(state, replies),
    }
}

fn finish_summary(state: &mut WizardState, replies: NarrativeReplies) -> Vec<Command> {
    let program_fit = NarrativeSection::ProgramFit.resolve(&replies.program_fit);
    let notes = NarrativeSection::AnalystNotes.resolve(&replies.notes);

    if replies.program_fit.is_err() || replies.notes.is_err() {
        state.banner = Some(Banner::new(
            BannerKind::AskFailed,
            "Part of your summary couldn't be written and was replaced with a placeholder. \
             You can still download it.",
        ));
    }

    state.summary_text = Some(assemble_document(&state.answers, &program_fit, &notes));
    state.mode = Mode::Summary;
    state.say(
        "Your Executive Summary is ready. You can download it or save it to your drafts.",
        MessageKind::Notice,
    );

    request_save(state).into_iter().collect()
}
