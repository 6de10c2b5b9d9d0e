//! REST API server for PrepCoach sessions
//!
//! Each session is a `WizardState` held in process. An event request
//! applies one user action, then executes the resulting commands with the
//! session lock released, re-acquiring it only to apply the replies.
//!
//! A session belongs to the first bearer token it sees, at creation or on
//! the first event. After that every request must carry the same token;
//! other tokens get a 404 so session ids can't be probed. Sessions idle
//! longer than the TTL are pruned whenever a new one is created.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::UserToken;
use crate::error::PrepCoachError;
use crate::export::export_summary;
use crate::generation::TextGenerator;
use crate::state::SubmissionStore;
use crate::transcript::HistoryWindow;
use crate::wizard::{apply, Command, CommandRunner, UserAction, WizardEvent, WizardState, WizardView};

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

// =============================
// Response Wrapper
// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn error_response(err: PrepCoachError) -> ApiResult {
    let status = match &err {
        PrepCoachError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        PrepCoachError::Unauthenticated => StatusCode::UNAUTHORIZED,
        PrepCoachError::Validation(_) => StatusCode::BAD_REQUEST,
        PrepCoachError::InvalidTransition(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(err.user_message())))
}

// =============================
// Sessions
// =============================

struct Session {
    state: WizardState,
    /// Owner id of the token that claimed this session
    owner: Option<Uuid>,
    touched: Instant,
}

impl Session {
    fn new(state: WizardState) -> Self {
        let owner = state.token.as_ref().map(UserToken::owner_id);
        Self {
            state,
            owner,
            touched: Instant::now(),
        }
    }

    fn authorize(&self, token: Option<&UserToken>) -> crate::Result<()> {
        let Some(owner) = self.owner else {
            return Ok(());
        };
        match token {
            None => Err(PrepCoachError::Unauthenticated),
            Some(token) if token.owner_id() == owner => Ok(()),
            Some(_) => Err(PrepCoachError::SessionNotFound(self.state.session_id)),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched.elapsed() >= ttl
    }
}

type SessionMap = HashMap<Uuid, Session>;

/// Look up a session for `token` and mark it as used.
fn checkout<'a>(
    sessions: &'a mut SessionMap,
    session_id: Uuid,
    token: Option<&UserToken>,
) -> crate::Result<&'a mut Session> {
    let session = sessions
        .get_mut(&session_id)
        .ok_or(PrepCoachError::SessionNotFound(session_id))?;
    session.authorize(token)?;
    session.touched = Instant::now();
    Ok(session)
}

// =============================
// API State
// =============================

#[derive(Clone)]
pub struct ApiState {
    sessions: Arc<RwLock<SessionMap>>,
    runner: CommandRunner,
    history_window: HistoryWindow,
    session_ttl: Duration,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        generator: Arc<dyn TextGenerator>,
        history_window: HistoryWindow,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            runner: CommandRunner::new(store, generator),
            history_window,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Execute commands outside the lock until no new ones are produced.
    async fn settle(&self, session_id: Uuid, mut commands: Vec<Command>) {
        while !commands.is_empty() {
            let replies = self.runner.execute_all(std::mem::take(&mut commands)).await;

            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(&session_id) else {
                warn!(session_id = %session_id, "Session vanished while commands were running");
                return;
            };
            for reply in replies {
                commands.extend(apply(&mut session.state, reply));
            }
        }
    }

    async fn view(&self, session_id: Uuid, token: Option<&UserToken>) -> crate::Result<WizardView> {
        let mut sessions = self.sessions.write().await;
        let session = checkout(&mut sessions, session_id, token)?;
        Ok(WizardView::from_state(&session.state))
    }
}

fn prune_expired(sessions: &mut SessionMap, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_expired(ttl));
    before - sessions.len()
}

fn bearer_token(headers: &HeaderMap) -> Option<UserToken> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(UserToken::from_bearer)
}

fn view_response(result: crate::Result<WizardView>) -> ApiResult {
    match result {
        Ok(view) => (StatusCode::OK, Json(ApiResponse::success(view))),
        Err(e) => error_response(e),
    }
}

// =============================
// Health Endpoint
// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// =============================
// Session Endpoints
// =============================

async fn create_session(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult {
    let session = WizardState::new(state.history_window).with_token(bearer_token(&headers));
    let session_id = session.session_id;
    let view = WizardView::from_state(&session);

    let mut sessions = state.sessions.write().await;
    let pruned = prune_expired(&mut sessions, state.session_ttl);
    if pruned > 0 {
        debug!(pruned, "Expired sessions dropped");
    }
    sessions.insert(session_id, Session::new(session));
    drop(sessions);
    info!(session_id = %session_id, "Session created");

    (StatusCode::CREATED, Json(ApiResponse::success(view)))
}

async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    view_response(state.view(session_id, bearer_token(&headers).as_ref()).await)
}

async fn delete_session(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let token = bearer_token(&headers);
    let mut sessions = state.sessions.write().await;
    if let Err(e) = checkout(&mut sessions, session_id, token.as_ref()) {
        return error_response(e);
    }
    sessions.remove(&session_id);
    info!(session_id = %session_id, "Session closed");

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
    )
}

async fn post_event(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    Json(action): Json<UserAction>,
) -> ApiResult {
    let token = bearer_token(&headers);

    let commands = {
        let mut sessions = state.sessions.write().await;
        let session = match checkout(&mut sessions, session_id, token.as_ref()) {
            Ok(session) => session,
            Err(e) => return error_response(e),
        };

        let mut commands = Vec::new();
        // First sign-in claims an anonymous session; owners never change after that
        if session.owner.is_none() {
            if let Some(token) = &token {
                session.owner = Some(token.owner_id());
                info!(session_id = %session_id, owner = %token.owner_id(), "Session claimed");
                commands.extend(apply(
                    &mut session.state,
                    WizardEvent::SessionChanged(Some(token.clone())),
                ));
            }
        }
        commands.extend(apply(&mut session.state, WizardEvent::User(action)));
        commands
    };

    state.settle(session_id, commands).await;

    view_response(state.view(session_id, token.as_ref()).await)
}

async fn export_session(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let token = bearer_token(&headers);
    let (summary, borrower) = {
        let mut sessions = state.sessions.write().await;
        let session = match checkout(&mut sessions, session_id, token.as_ref()) {
            Ok(session) => session,
            Err(e) => return error_response(e).into_response(),
        };
        (
            session.state.summary_text.clone(),
            session.state.answers.text("borrower_name").map(str::to_string),
        )
    };

    let Some(summary) = summary else {
        return error_response(PrepCoachError::InvalidTransition(
            "Generate your Executive Summary before downloading it.".to_string(),
        ))
        .into_response();
    };

    match export_summary(&summary, borrower.as_deref(), Utc::now()) {
        Ok(artifact) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, artifact.mime_type.clone()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ),
            ],
            artifact.bytes,
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

// =============================
// Router
// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/prepcoach/sessions", post(create_session))
        .route(
            "/api/prepcoach/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route("/api/prepcoach/sessions/:id/events", post(post_event))
        .route("/api/prepcoach/sessions/:id/export", get(export_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// =============================
// Server Startup
// =============================

pub async fn start_server(state: ApiState, port: u16) -> crate::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InMemorySubmissionStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct CannedGenerator;

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn ask(
            &self,
            _token: &UserToken,
            request: crate::generation::AskRequest,
        ) -> crate::Result<String> {
            Ok(match request.task_id.as_deref() {
                Some("program-fit") => "A conventional bank loan fits.".to_string(),
                Some("analyst-notes") => "- Experienced sponsor".to_string(),
                _ => "LTV is the loan amount over property value.".to_string(),
            })
        }
    }

    fn api_state() -> ApiState {
        ApiState::new(
            Arc::new(InMemorySubmissionStore::new()),
            Arc::new(CannedGenerator),
            HistoryWindow::default(),
        )
    }

    fn app() -> Router {
        create_router(api_state())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    fn event(session_id: &str, body: serde_json::Value) -> Request<Body> {
        event_as(session_id, "test-token", body)
    }

    fn event_as(session_id: &str, token: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/prepcoach/sessions/{}/events", session_id))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/api/prepcoach/sessions")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["mode"], "greeting");
        json["data"]["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send(&app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let uri = format!("/api/prepcoach/sessions/{}", Uuid::new_v4());
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, json) = send(&app(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_freeform_round_trip() {
        let app = app();
        let id = new_session(&app).await;

        send(&app, event(&id, serde_json::json!({"type": "choose_freeform"}))).await;
        let (status, json) = send(
            &app,
            event(&id, serde_json::json!({"type": "submit", "text": "What is LTV?"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["mode"], "freeform");
        assert_eq!(json["data"]["signed_in"], true);
        let transcript = json["data"]["transcript"].as_array().unwrap();
        assert_eq!(
            transcript.last().unwrap()["message"],
            "LTV is the loan amount over property value."
        );
        assert_eq!(json["data"]["busy"]["asking"], false);
    }

    #[tokio::test]
    async fn test_intake_summary_and_export() {
        let app = app();
        let id = new_session(&app).await;

        let export_uri = format!("/api/prepcoach/sessions/{}/export", id);
        let (status, json) = send(&app, request("GET", &export_uri, Some("test-token"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json["error"].as_str().unwrap().contains("Generate"));

        send(&app, event(&id, serde_json::json!({"type": "choose_intake"}))).await;
        let inputs = [
            "Acme LLC", "Purchase", "Industrial", "", "800000", "600000", "Owner-Occupied",
            "90000", "120000", "", "", "", "",
        ];
        let mut last = serde_json::Value::Null;
        for input in inputs {
            let body = if input.is_empty() {
                serde_json::json!({"type": "skip"})
            } else {
                serde_json::json!({"type": "submit", "text": input})
            };
            last = send(&app, event(&id, body)).await.1;
        }
        assert_eq!(last["data"]["mode"], "complete");
        assert!(last["data"]["submission_id"].is_string());
        assert_eq!(last["data"]["progress"]["completed"], last["data"]["progress"]["total"]);

        let (_, json) = send(&app, event(&id, serde_json::json!({"type": "generate_summary"}))).await;
        assert_eq!(json["data"]["mode"], "summary");
        let summary = json["data"]["summary_text"].as_str().unwrap();
        assert!(summary.contains("A conventional bank loan fits."));
        assert!(summary.contains("- Experienced sponsor"));

        let response = app
            .clone()
            .oneshot(request("GET", &export_uri, Some("test-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("acme-llc-executive-summary.pdf"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[tokio::test]
    async fn test_session_is_private_to_its_owner() {
        let app = app();
        let create = request("POST", "/api/prepcoach/sessions", Some("owner-token"));
        let (status, json) = send(&app, create).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["data"]["session_id"].as_str().unwrap().to_string();
        let uri = format!("/api/prepcoach/sessions/{}", id);

        send(&app, event_as(&id, "owner-token", serde_json::json!({"type": "choose_intake"}))).await;
        let (status, _) = send(
            &app,
            event_as(&id, "owner-token", serde_json::json!({"type": "submit", "text": "Owner Secret LLC"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, request("GET", &uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!json.to_string().contains("Owner Secret LLC"));

        let (status, json) = send(&app, request("GET", &uri, Some("other-token"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!json.to_string().contains("Owner Secret LLC"));

        let (status, _) = send(
            &app,
            event_as(&id, "other-token", serde_json::json!({"type": "submit", "text": "Purchase"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let export_uri = format!("{}/export", uri);
        let (status, _) = send(&app, request("GET", &export_uri, Some("other-token"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request("DELETE", &uri, Some("other-token"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The owner's intake did not move
        let (status, json) = send(&app, request("GET", &uri, Some("owner-token"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["current_question"]["id"], "loan_purpose");
        assert!(json["data"]["transcript"].to_string().contains("Owner Secret LLC"));
    }

    #[tokio::test]
    async fn test_first_token_claims_anonymous_session() {
        let app = app();
        let id = new_session(&app).await;
        let uri = format!("/api/prepcoach/sessions/{}", id);

        let (status, _) = send(&app, request("GET", &uri, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) =
            send(&app, event_as(&id, "first-token", serde_json::json!({"type": "choose_freeform"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["signed_in"], true);

        let (status, _) =
            send(&app, event_as(&id, "second-token", serde_json::json!({"type": "back"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request("GET", &uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = send(&app, request("GET", &uri, Some("first-token"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["mode"], "freeform");
    }

    #[tokio::test]
    async fn test_idle_sessions_are_pruned_on_create() {
        let state = api_state().with_session_ttl(Duration::ZERO);
        let app = create_router(state.clone());

        let first = new_session(&app).await;
        let second = new_session(&app).await;

        let sessions = state.sessions.read().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&second.parse::<Uuid>().unwrap()));
        assert!(!sessions.contains_key(&first.parse::<Uuid>().unwrap()));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = api_state();
        let app = create_router(state.clone());
        let id = new_session(&app).await;
        let uri = format!("/api/prepcoach/sessions/{}", id);

        let (status, json) = send(&app, request("DELETE", &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["session_id"], id.as_str());
        assert!(state.sessions.read().await.is_empty());

        let (status, _) = send(&app, request("GET", &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
