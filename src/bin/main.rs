use prepcoach_intake::{
    config::AppConfig,
    export::export_summary,
    generation::{GeminiClient, TextGenerator},
    state::{InMemorySubmissionStore, PgSubmissionStore, SubmissionStore},
    transcript::{HistoryWindow, MessageKind, Role},
    wizard::{progress, CommandRunner, Mode, TaskKind, UserAction, WizardState},
    UserToken,
};
use chrono::Utc;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands: 'back' (menu), 'skip' (optional question), 'generate', 'save', \
'show', 'transcript', 'export [path]', 'dismiss', 'quit'";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they don't interleave with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    info!("PrepCoach Intake starting");

    let store: Arc<dyn SubmissionStore> = match &config.database_url {
        Some(url) => Arc::new(PgSubmissionStore::connect_lazy(url)?),
        None => Arc::new(InMemorySubmissionStore::new()),
    };
    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
        config.request_timeout,
    )?);
    let runner = CommandRunner::new(store, generator);

    let token = config.user_token.clone().and_then(UserToken::new);
    if token.is_none() {
        println!("(Set PREPCOACH_USER_TOKEN to save drafts and talk to the assistant.)");
    }

    let mut state =
        WizardState::new(HistoryWindow::new(config.history_window)).with_token(token);
    let mut choosing_task = false;

    println!("{}\n", HELP);
    let mut shown = print_new_messages(&state, 0);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        let lowered = input.to_lowercase();

        if matches!(lowered.as_str(), "quit" | "exit") {
            break;
        }

        let action = if choosing_task {
            choosing_task = false;
            match pick_task(input) {
                Some(task) => UserAction::ChooseTask { task },
                None => {
                    println!("Unknown task.");
                    continue;
                }
            }
        } else {
            match (state.mode, lowered.as_str()) {
                (_, "dismiss") => UserAction::DismissBanner,
                (_, "show") => {
                    match &state.summary_text {
                        Some(summary) => println!("\n{}", summary),
                        None => println!("No summary yet."),
                    }
                    continue;
                }
                (_, "transcript") => {
                    println!("\n{}", state.transcript.get_formatted());
                    continue;
                }
                (Mode::Summary, cmd) if cmd.starts_with("export") => {
                    export_to_file(&state, input["export".len()..].trim())?;
                    continue;
                }
                (Mode::Greeting, "1") => UserAction::ChooseFreeform,
                (Mode::Greeting, "2") => UserAction::ChooseIntake,
                (Mode::Greeting, "3") => {
                    for (i, task) in TaskKind::ALL.iter().enumerate() {
                        println!("  {}. {}", i + 1, task.title());
                    }
                    choosing_task = true;
                    continue;
                }
                (Mode::Greeting, other) => match TaskKind::from_id(other) {
                    Some(task) => UserAction::ChooseTask { task },
                    None => {
                        println!("Choose 1, 2 or 3.");
                        continue;
                    }
                },
                (Mode::Freeform | Mode::Task, "back") => UserAction::Back,
                (Mode::Intake, "skip") => UserAction::Skip,
                (Mode::Complete, "generate") => UserAction::GenerateSummary,
                (_, "save") => UserAction::Save,
                (Mode::Complete | Mode::Summary, _) => {
                    println!("{}", HELP);
                    continue;
                }
                _ => UserAction::Submit {
                    text: input.to_string(),
                },
            }
        };

        let banner_before = state.banner.clone();
        runner.drive(&mut state, action.into()).await;
        shown = print_new_messages(&state, shown);

        if state.banner != banner_before {
            if let Some(banner) = &state.banner {
                println!("[!] {}", banner.message);
            }
        }
    }

    Ok(())
}

fn pick_task(input: &str) -> Option<TaskKind> {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| TaskKind::ALL.get(i).copied())
        .or_else(|| TaskKind::from_id(input))
}

/// Print transcript entries added since `shown`; returns the new count.
fn print_new_messages(state: &WizardState, shown: usize) -> usize {
    let messages = state.transcript.messages();

    for message in &messages[shown.min(messages.len())..] {
        if message.role == Role::User {
            continue;
        }
        match message.kind {
            MessageKind::Question => {
                let (done, total) = progress(state);
                println!("\n[{}/{}] {}", done + 1, total, message.message);
            }
            MessageKind::Advisory => println!("  * {}", message.message),
            MessageKind::Validation => println!("  ! {}", message.message),
            _ => println!("\n{}", message.message),
        }
    }

    messages.len()
}

fn export_to_file(state: &WizardState, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(summary) = &state.summary_text else {
        println!("Generate your summary first.");
        return Ok(());
    };

    let artifact = export_summary(summary, state.answers.text("borrower_name"), Utc::now())?;
    let target = if path.is_empty() {
        artifact.file_name.clone()
    } else {
        path.to_string()
    };

    std::fs::write(&target, &artifact.bytes)?;
    println!(
        "Saved {} ({} pages, {} bytes)",
        target, artifact.page_count, artifact.size_bytes
    );
    Ok(())
}
