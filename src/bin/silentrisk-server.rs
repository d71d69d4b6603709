//! silentrisk chat server.
//!
//! One shared resolution engine, one conversation state per session id:
//!
//! - `GET    /health`: server status
//! - `POST   /chat`: resolve a turn: `{session_id, text, snapshot?}`
//! - `DELETE /sessions/{id}`: forget a session
//! - `POST   /recommendations`: lifestyle advice for a snapshot
//!
//! Sessions are stored once a turn resolves a topic and swept after
//! `session_idle_secs` of inactivity.
//!
//! Build and run: `cargo run --features server --bin silentrisk-server`

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use silentrisk::config::ChatConfig;
use silentrisk::conversation::SessionStore;
use silentrisk::knowledge::TopicId;
use silentrisk::recommend::{Recommendations, recommend};
use silentrisk::resolve::{Intent, ResolutionEngine, Response, StageKind};
use silentrisk::snapshot::HealthSnapshot;

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    engine: ResolutionEngine,
    sessions: SessionStore,
    greeting: String,
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    knowledge: String,
    topics: usize,
    sessions: usize,
}

#[derive(Deserialize)]
struct ChatRequest {
    session_id: String,
    text: String,
    #[serde(default)]
    snapshot: HealthSnapshot,
}

#[derive(Serialize)]
struct ChatResponse {
    response: Response,
    topic: Option<TopicId>,
    intent: Option<Intent>,
    stage: StageKind,
    /// Present on the turn that starts a stored session.
    #[serde(skip_serializing_if = "Option::is_none")]
    greeting: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let knowledge = state.engine.knowledge();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        knowledge: knowledge.name().to_string(),
        topics: knowledge.len(),
        sessions: state.sessions.len(),
    })
}

async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    if req.session_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "session_id is required".to_string()));
    }

    let turn = state
        .sessions
        .resolve(&state.engine, &req.session_id, &req.text, &req.snapshot);
    let resolution = turn.resolution;

    tracing::debug!(
        session = %req.session_id,
        stage = %resolution.stage,
        "chat turn"
    );

    Ok(Json(ChatResponse {
        response: resolution.response,
        topic: resolution.topic,
        intent: resolution.intent,
        stage: resolution.stage,
        greeting: turn.started.then(|| state.greeting.clone()),
    }))
}

async fn end_session(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if state.sessions.end(&id) {
        Ok(Json(serde_json::json!({ "ended": id })))
    } else {
        Err((StatusCode::NOT_FOUND, format!("session \"{id}\" not found")))
    }
}

async fn recommendations(Json(snapshot): Json<HealthSnapshot>) -> Json<Recommendations> {
    Json(recommend(&snapshot))
}

// ── Main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn")),
        )
        .init();

    let bind = std::env::var("SILENTRISK_SERVER_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("SILENTRISK_SERVER_PORT").unwrap_or_else(|_| "8200".to_string());
    let addr = format!("{bind}:{port}");

    let config = ChatConfig::resolve(None).unwrap_or_else(|e| {
        tracing::error!("failed to load config: {e}");
        std::process::exit(1);
    });
    let engine = ResolutionEngine::from_config(&config).unwrap_or_else(|e| {
        tracing::error!("failed to build resolution engine: {e}");
        std::process::exit(1);
    });

    let idle = Duration::from_secs(config.session_idle_secs);
    let state = Arc::new(ServerState {
        engine,
        sessions: SessionStore::with_idle_timeout(idle),
        greeting: config.greeting,
    });

    // Background sweep of idle sessions.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let period = idle.clamp(Duration::from_secs(1), Duration::from_secs(60));
            let mut sweep_tick = tokio::time::interval(period);
            loop {
                sweep_tick.tick().await;
                state.sessions.sweep(Instant::now());
            }
        });
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/sessions/{id}", delete(end_session))
        .route("/recommendations", post(recommendations))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("silentrisk server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
