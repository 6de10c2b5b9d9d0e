use prepcoach_intake::{
    api::{start_server, ApiState},
    config::AppConfig,
    generation::{GeminiClient, TextGenerator},
    state::{InMemorySubmissionStore, PgSubmissionStore, SubmissionStore},
    transcript::HistoryWindow,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Loads .env as well
    let config = AppConfig::from_env()?;

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; assistant replies will fall back to placeholders");
    }

    info!("PrepCoach Intake - API Server");
    info!("Port: {}", config.port);

    let store: Arc<dyn SubmissionStore> = match &config.database_url {
        Some(url) => {
            info!("Using Postgres submission store");
            Arc::new(PgSubmissionStore::connect_lazy(url)?)
        }
        None => {
            warn!("No POSTGRES_URL/DATABASE_URL set; drafts are kept in memory");
            Arc::new(InMemorySubmissionStore::new())
        }
    };

    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
        config.request_timeout,
    )?);

    let state = ApiState::new(store, generator, HistoryWindow::new(config.history_window))
        .with_session_ttl(config.session_ttl);

    info!("Starting API server...");
    start_server(state, config.port).await?;

    Ok(())
}
