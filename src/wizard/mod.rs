//! PrepCoach conversational wizard
//!
//! Greeting menu, free-form and task chat, the guided intake interview, and
//! summary generation, expressed as a pure reducer plus a command runner.

pub mod events;
pub mod machine;
pub mod runner;
pub mod state;
pub mod tasks;
pub mod view;

pub use events::{CollaboratorReply, Command, UserAction, WizardEvent};
pub use machine::{apply, progress, reduce};
pub use runner::CommandRunner;
pub use state::{Banner, BannerKind, InFlight, Mode, RequestKind, WizardState};
pub use tasks::TaskKind;
pub use view::WizardView;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserToken;
    use crate::error::PrepCoachError;
    use crate::generation::{AskRequest, TextGenerator};
    use crate::state::{InMemorySubmissionStore, SubmissionStore};
    use crate::summary::{NarrativeReplies, NOTES_PLACEHOLDER, PROGRAM_FIT_PLACEHOLDER};
    use crate::transcript::{HistoryWindow, MessageKind};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    const SKIP: &str = "<skip>";

    struct ScriptedGenerator {
        reply: Result<String, String>,
        calls: Mutex<Vec<AskRequest>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: Result<&str, &str>) -> Self {
            Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn ask(&self, _token: &UserToken, request: AskRequest) -> crate::Result<String> {
            self.calls.lock().unwrap().push(request);
            self.reply.clone().map_err(PrepCoachError::TextGeneration)
        }
    }

    fn token() -> UserToken {
        UserToken::new("session-token").unwrap()
    }

    fn signed_in_state() -> WizardState {
        WizardState::new(HistoryWindow::default()).with_token(Some(token()))
    }

    fn act(state: &mut WizardState, action: UserAction) -> Vec<Command> {
        apply(state, WizardEvent::User(action))
    }

    /// Feed intake answers; `SKIP` skips the current question.
    fn answer_all(state: &mut WizardState, inputs: &[&str]) -> Vec<Command> {
        let mut commands = Vec::new();
        for input in inputs {
            let action = if *input == SKIP {
                UserAction::Skip
            } else {
                UserAction::Submit {
                    text: input.to_string(),
                }
            };
            commands.extend(act(state, action));
        }
        commands
    }

    fn advisories(state: &WizardState) -> Vec<String> {
        state
            .transcript
            .messages()
            .iter()
            .filter(|m| m.kind == MessageKind::Advisory)
            .map(|m| m.message.clone())
            .collect()
    }

    const THROUGH_LOAN_AMOUNT: &[&str] = &["Acme LLC", "1", "Multifamily", SKIP, "500000", "400000"];

    const FULL_INTAKE_NO_OPTIONALS: &[&str] = &[
        "Acme LLC",
        "Purchase",
        "multifamily",
        SKIP,
        "$625,000",
        "$500,000",
        "Stabilized",
        "60000",
        "18000",
        "50000",
        SKIP,
        SKIP,
        SKIP,
        SKIP,
    ];

    #[test]
    fn test_scenario_a_ltv_advisory() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        assert_eq!(state.mode, Mode::Intake);
        assert_eq!(state.current_question.as_deref(), Some("borrower_name"));

        answer_all(&mut state, THROUGH_LOAN_AMOUNT);

        let notes = advisories(&state);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("Loan-to-Value (LTV): 80%"));
        assert_eq!(state.current_question.as_deref(), Some("occupancy_status"));
    }

    #[test]
    fn test_scenario_b_dscr_advisory() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        answer_all(
            &mut state,
            &["Acme LLC", "Purchase", "Retail", SKIP, "700000", "500000", "Stabilized", "60000", "18000"],
        );

        let dscr = advisories(&state)
            .into_iter()
            .find(|m| m.contains("DSCR"))
            .expect("DSCR advisory");
        assert!(dscr.contains("0.99x"));
        assert!(dscr.contains("Note:"));
        assert_eq!(state.current_question.as_deref(), Some("liquid_assets"));
    }

    #[tokio::test]
    async fn test_scenario_c_empty_narrative_still_yields_document() {
        let store = Arc::new(InMemorySubmissionStore::new());
        let generator = Arc::new(ScriptedGenerator::replying(Ok("")));
        let runner = CommandRunner::new(store.clone(), generator.clone());

        let mut state = signed_in_state();
        runner
            .drive(&mut state, UserAction::ChooseIntake.into())
            .await;
        for input in FULL_INTAKE_NO_OPTIONALS {
            let action = if *input == SKIP {
                UserAction::Skip
            } else {
                UserAction::Submit {
                    text: input.to_string(),
                }
            };
            runner.drive(&mut state, action.into()).await;
        }

        assert_eq!(state.mode, Mode::Complete);
        let draft_id = state.submission_id.expect("autosaved on completion");

        runner
            .drive(&mut state, UserAction::GenerateSummary.into())
            .await;

        assert_eq!(state.mode, Mode::Summary);
        let summary = state.summary_text.clone().unwrap();
        assert!(!summary.is_empty());
        assert!(summary.contains(PROGRAM_FIT_PLACEHOLDER));
        assert!(summary.contains(NOTES_PLACEHOLDER));

        // Updated in place, not re-created
        assert_eq!(state.submission_id, Some(draft_id));
        let saved = store.get_submission(&token(), draft_id).await.unwrap().unwrap();
        assert_eq!(saved.summary_text.as_deref(), Some(summary.as_str()));
        assert_eq!(store.list_submissions(&token()).await.unwrap().len(), 1);

        let tasks: Vec<Option<String>> = generator
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.task_id.clone())
            .collect();
        assert!(tasks.contains(&Some("program-fit".to_string())));
        assert!(tasks.contains(&Some("analyst-notes".to_string())));
    }

    #[test]
    fn test_skip_leaves_no_answer() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        answer_all(&mut state, &["Acme LLC", "Refinance", "Office"]);
        assert_eq!(state.current_question.as_deref(), Some("property_address"));

        act(&mut state, UserAction::Skip);
        assert!(!state.answers.contains("property_address"));
        assert_eq!(state.current_question.as_deref(), Some("property_value"));

        // Required questions can't be skipped
        act(&mut state, UserAction::Skip);
        assert!(state.validation_error.is_some());
        assert_eq!(state.current_question.as_deref(), Some("property_value"));
        assert!(!state.answers.contains("property_value"));
    }

    #[test]
    fn test_validation_blocks_advance() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);

        act(&mut state, UserAction::Submit { text: "   ".into() });
        assert!(state.validation_error.is_some());
        assert!(state.answers.is_empty());
        assert_eq!(state.current_question.as_deref(), Some("borrower_name"));

        answer_all(&mut state, &["Acme LLC", "Purchase", "Retail", SKIP]);
        act(&mut state, UserAction::Submit { text: "a lot".into() });
        assert_eq!(state.current_question.as_deref(), Some("property_value"));
        act(&mut state, UserAction::Submit { text: "5000".into() });
        assert_eq!(state.current_question.as_deref(), Some("property_value"));
        assert!(state.validation_error.as_deref().unwrap().contains("$10,000"));

        act(&mut state, UserAction::Submit { text: "900000".into() });
        assert!(state.validation_error.is_none());
        assert_eq!(state.answers.number("property_value"), Some(900_000.0));
    }

    #[test]
    fn test_unauthenticated_call_is_refused_before_it_is_made() {
        let mut state = WizardState::default();
        act(&mut state, UserAction::ChooseFreeform);

        let commands = act(&mut state, UserAction::Submit { text: "What is DSCR?".into() });
        assert!(commands.is_empty());
        assert!(state.in_flight.is_empty());
        assert_eq!(state.banner.as_ref().unwrap().kind, BannerKind::SignIn);

        apply(&mut state, WizardEvent::SessionChanged(Some(token())));
        assert!(state.banner.is_none());
        let commands = act(&mut state, UserAction::Submit { text: "What is DSCR?".into() });
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_back_makes_outstanding_reply_stale() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseFreeform);
        let commands = act(&mut state, UserAction::Submit { text: "Hello".into() });
        let request_id = commands[0].request_id();

        // Duplicate submission while in flight is refused
        assert!(act(&mut state, UserAction::Submit { text: "Again".into() }).is_empty());

        act(&mut state, UserAction::Back);
        assert_eq!(state.mode, Mode::Greeting);
        let before = state.transcript.len();

        let reply = CollaboratorReply::AskReplied {
            request_id,
            result: Ok("Late answer".into()),
        };
        let (state, commands) = reduce(state, reply.into());
        assert!(commands.is_empty());
        assert_eq!(state.transcript.len(), before);
        assert_eq!(state.mode, Mode::Greeting);
    }

    #[test]
    fn test_history_window_bounds_forwarded_turns() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseTask {
            task: TaskKind::LenderQuestions,
        });
        assert_eq!(state.mode, Mode::Task);

        for i in 0..15 {
            let commands = act(&mut state, UserAction::Submit { text: format!("Q{}", i) });
            let reply = CollaboratorReply::AskReplied {
                request_id: commands[0].request_id(),
                result: Ok(format!("A{}", i)),
            };
            apply(&mut state, reply.into());
        }

        let commands = act(&mut state, UserAction::Submit { text: "Last".into() });
        match &commands[0] {
            Command::Ask { request, .. } => {
                assert_eq!(request.history.len(), 20);
                assert_eq!(request.history.last().unwrap().content, "A14");
                assert_eq!(request.task_id.as_deref(), Some("lender-questions"));
                assert_eq!(request.prompt, "Last");
            }
            other => panic!("expected ask, got {:?}", other),
        }
        // Local transcript keeps everything
        assert!(state.transcript.len() > 30);
    }

    #[test]
    fn test_ask_failure_sets_banner_and_keeps_mode() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseFreeform);
        let commands = act(&mut state, UserAction::Submit { text: "Hi".into() });

        let reply = CollaboratorReply::AskReplied {
            request_id: commands[0].request_id(),
            result: Err("timeout".into()),
        };
        apply(&mut state, reply.into());

        assert_eq!(state.mode, Mode::Freeform);
        assert_eq!(state.banner.as_ref().unwrap().kind, BannerKind::AskFailed);
        assert!(state.in_flight.is_empty());

        act(&mut state, UserAction::DismissBanner);
        assert!(state.banner.is_none());
    }

    #[test]
    fn test_saves_coalesce_into_create_then_update() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        let commands = answer_all(&mut state, FULL_INTAKE_NO_OPTIONALS);

        assert_eq!(state.mode, Mode::Complete);
        assert_eq!(commands.len(), 1);
        let first_id = match &commands[0] {
            Command::SaveSubmission {
                request_id,
                submission_id,
                ..
            } => {
                assert!(submission_id.is_none());
                *request_id
            }
            other => panic!("expected save, got {:?}", other),
        };

        // Second save while the first is outstanding is queued
        assert!(act(&mut state, UserAction::Save).is_empty());
        assert!(state.save_queued);

        let draft = Uuid::new_v4();
        let reply = CollaboratorReply::SubmissionSaved {
            request_id: first_id,
            result: Ok(draft),
        };
        let commands = apply(&mut state, reply.into());

        assert!(!state.save_queued);
        match &commands[..] {
            [Command::SaveSubmission { submission_id, .. }] => {
                assert_eq!(*submission_id, Some(draft))
            }
            other => panic!("expected queued save, got {:?}", other),
        }
    }

    #[test]
    fn test_save_failure_is_recoverable() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        let commands = answer_all(&mut state, FULL_INTAKE_NO_OPTIONALS);

        let reply = CollaboratorReply::SubmissionSaved {
            request_id: commands[0].request_id(),
            result: Err("connection reset".into()),
        };
        apply(&mut state, reply.into());
        assert_eq!(state.mode, Mode::Complete);
        assert_eq!(state.banner.as_ref().unwrap().kind, BannerKind::SaveFailed);

        // Generating still works and retries the save afterwards
        let commands = act(&mut state, UserAction::GenerateSummary);
        let replies = NarrativeReplies {
            program_fit: Ok("SBA 504 fits.".into()),
            notes: Err("quota".into()),
        };
        let reply = CollaboratorReply::NarrativeReady {
            request_id: commands[0].request_id(),
            replies,
        };
        let commands = apply(&mut state, reply.into());

        assert_eq!(state.mode, Mode::Summary);
        let summary = state.summary_text.as_deref().unwrap();
        assert!(summary.contains("SBA 504 fits."));
        assert!(summary.contains(NOTES_PLACEHOLDER));
        assert!(matches!(
            &commands[..],
            [Command::SaveSubmission { submission_id: None, summary: Some(_), .. }]
        ));
    }

    #[test]
    fn test_progress_tracks_flow() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        let (done, total) = progress(&state);
        assert_eq!(done, 0);
        assert!(total > 10);

        answer_all(&mut state, &["Acme LLC", "Construction"]);
        assert_eq!(progress(&state).0, 2);

        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);
        answer_all(&mut state, FULL_INTAKE_NO_OPTIONALS);
        let (done, total) = progress(&state);
        assert_eq!(done, total);
    }

    #[test]
    fn test_actions_outside_their_mode_are_ignored() {
        let mut state = signed_in_state();
        assert!(act(&mut state, UserAction::GenerateSummary).is_empty());
        act(&mut state, UserAction::Skip);
        act(&mut state, UserAction::Back);
        assert_eq!(state.mode, Mode::Greeting);

        act(&mut state, UserAction::ChooseIntake);
        act(&mut state, UserAction::Back);
        assert_eq!(state.mode, Mode::Intake);
    }

    #[test]
    fn test_state_serializes_without_token() {
        let mut state = signed_in_state();
        act(&mut state, UserAction::ChooseIntake);

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("session-token"));

        let restored: WizardState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.mode, Mode::Intake);
        assert!(restored.token.is_none());
        assert_eq!(restored.current_question, state.current_question);
    }

    #[test]
    fn test_runner_reports_ask_reply() {
        let store = Arc::new(InMemorySubmissionStore::new());
        let generator = Arc::new(ScriptedGenerator::replying(Ok("DSCR is NOI over debt service.")));
        let runner = CommandRunner::new(store, generator);

        let mut state = signed_in_state();
        tokio_test::block_on(async {
            runner.drive(&mut state, UserAction::ChooseFreeform.into()).await;
            runner
                .drive(&mut state, UserAction::Submit { text: "What is DSCR?".into() }.into())
                .await;
        });

        let last = state.transcript.last().unwrap();
        assert_eq!(last.kind, MessageKind::Chat);
        assert_eq!(last.message, "DSCR is NOI over debt service.");
        assert!(state.in_flight.is_empty());
    }
}
