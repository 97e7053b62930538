//! HTTP + WebSocket API for Moodlock
//!
//! Endpoints:
//! - POST /session/new - Create new session
//! - GET /session/{id} - Get session status
//! - POST /session/{id}/signal - Feed one raw signal
//! - POST /session/{id}/sample - Feed one synthetic sample
//! - DELETE /session/{id} - End session
//! - WS /ws/{id} - Live updates
//! - GET /health - Health check

use axum::{
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::core::{Stabilizer, SyntheticSource};
use crate::types::{
    DetectionMode, EmotionResult, FrameReport, RawSignal, Settings, StabilizerState,
};

/// One detection session: owns its stabilizer state exclusively
pub struct Session {
    pub id: String,
    pub mode: DetectionMode,
    pub stabilizer: Stabilizer,
    pub synthetic: SyntheticSource,
    pub update_tx: broadcast::Sender<FrameReport>,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    pub defaults: Settings,
    next_id: AtomicU64,
}

/// Create new session request
#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    pub mode: Option<DetectionMode>,
    pub seed: Option<u64>,
    /// Partial `StabilizerConfig`, merged over the mode preset
    pub stabilizer: Option<serde_json::Value>,
    /// Partial `SyntheticConfig`, merged over the mode preset
    pub synthetic: Option<serde_json::Value>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
    pub mode: DetectionMode,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub mode: DetectionMode,
    pub result: EmotionResult,
    pub state: StabilizerState,
    pub confidence_display: String,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

fn not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("session '{}' not found", id))
}

/// Create the API router
pub fn create_router(defaults: Settings) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        defaults,
        next_id: AtomicU64::new(1),
    });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(end_session))
        .route("/session/:id/signal", post(add_signal))
        .route("/session/:id/sample", post(add_sample))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    let base = match req.mode {
        Some(mode) => Settings::for_mode(mode),
        None => state.defaults.clone(),
    };
    let settings = base
        .with_overrides(req.stabilizer, req.synthetic)
        .and_then(|settings| settings.validate().map(|_| settings))
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let seq = state.next_id.fetch_add(1, Ordering::SeqCst);
    let session_id = generate_session_id(seq);
    let (tx, _) = broadcast::channel(100);

    let (stabilizer, synthetic) = match req.seed {
        Some(seed) => (
            Stabilizer::seeded(settings.stabilizer, seed),
            SyntheticSource::seeded(settings.synthetic, Some(seed.wrapping_add(1))),
        ),
        None => (
            Stabilizer::new(settings.stabilizer),
            SyntheticSource::seeded(settings.synthetic, None),
        ),
    };

    let session = Session {
        id: session_id.clone(),
        mode: settings.mode,
        stabilizer,
        synthetic,
        update_tx: tx,
    };

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), session);
    info!(session = %session_id, mode = ?settings.mode, "session started");

    Ok(Json(NewSessionResponse {
        session_id: session_id.clone(),
        websocket_url: format!("/ws/{}", session_id),
        mode: settings.mode,
    }))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    let result = session.stabilizer.current_result();

    Ok(Json(SessionStatusResponse {
        session_id: session.id.clone(),
        mode: session.mode,
        result,
        state: session.stabilizer.state().clone(),
        confidence_display: result.confidence_display(),
    }))
}

/// Feed one raw signal (real detector output) to the session
async fn add_signal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(signal): Json<RawSignal>,
) -> Result<Json<FrameReport>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(apply(session, &signal)))
}

/// Draw one synthetic sample and feed it to the session
async fn add_sample(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FrameReport>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    let signal = session.synthetic.next_signal(None);
    Ok(Json(apply(session, &signal)))
}

fn apply(session: &mut Session, signal: &RawSignal) -> FrameReport {
    let report = session.stabilizer.process(signal);
    // no subscribers is fine
    let _ = session.update_tx.send(report.clone());
    report
}

/// End session and discard its state
async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.remove(&id).ok_or_else(|| not_found(&id))?;
    info!(session = %id, frames = session.stabilizer.frame_counter(), "session ended");
    Ok(StatusCode::NO_CONTENT)
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    let rx = session.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Handle WebSocket connection: forward reports until either side closes
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<FrameReport>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            update = rx.recv() => {
                let report = match update {
                    Ok(report) => report,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket client lagging, frames skipped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let json = match serde_json::to_string(&report) {
                    Ok(json) => json,
                    Err(_) => continue,
                };
                if ws_tx.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Generate session ID
fn generate_session_id(seq: u64) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("session_{:x}_{}", millis, seq)
}

/// Run the API server
pub async fn run_server(addr: &str, defaults: Settings) -> std::io::Result<()> {
    let router = create_router(defaults);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Moodlock API listening");
    println!("Moodlock API running on {}", addr);
    println!("  POST   /session/new        - Create session");
    println!("  GET    /session/:id        - Get status");
    println!("  POST   /session/:id/signal - Feed raw signal");
    println!("  POST   /session/:id/sample - Feed synthetic sample");
    println!("  DELETE /session/:id        - End session");
    println!("  WS     /ws/:id             - Live updates");
    println!("  GET    /health             - Health check");
    axum::serve(listener, router).await
}
