//! HTTP API gateway for namecard.
//!
//! Exposes the platform's outward-facing endpoints:
//!
//! - `POST /api/chat/sessions`               — open a chat session for a profile
//! - `POST /api/chat/sessions/{id}/messages` — enqueue one assistant turn (202)
//! - `GET  /api/chat/sessions/{id}/events`   — SSE stream of the session's events
//! - `POST /api/wechat/signature`            — JS-SDK share signature
//! - `GET  /health`                          — liveness
//!
//! Built on Axum. The turn job runs as a detached task; clients follow it
//! through the SSE stream, not the enqueue response.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use namecard_assistant::TurnRunner;
use namecard_core::error::StoreError;
use namecard_core::event::{ChatHub, channel_name};
use namecard_core::store::CardStore;
use namecard_wechat::SignatureService;

/// Shared application state for the gateway.
pub struct AppState {
    pub store: Arc<dyn CardStore>,
    pub hub: Arc<ChatHub>,
    pub runner: Arc<TurnRunner>,
    pub signer: Arc<SignatureService>,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat/sessions", post(create_session_handler))
        .route("/api/chat/sessions/{id}/messages", post(post_message_handler))
        .route("/api/chat/sessions/{id}/events", get(event_stream_handler))
        .route("/api/wechat/signature", post(signature_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Assembles the store, provider, hub, turn runner, and signature service
/// once and shares them via `Arc`.
pub async fn start(
    config: namecard_config::AppConfig,
    seed_demo: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let store = namecard_store::open_store(&config.store).await?;
    if seed_demo {
        namecard_store::seed_demo(store.as_ref()).await?;
    }

    let provider = namecard_providers::build_provider(&config)?;
    let hub = Arc::new(ChatHub::default());
    let runner = Arc::new(
        TurnRunner::new(
            provider,
            store.clone(),
            hub.clone(),
            config.provider.model.clone(),
        )
        .with_temperature(config.provider.temperature)
        .with_max_tokens(config.provider.max_tokens),
    );

    if !config.wechat_configured() {
        warn!("WeChat credentials not configured — signature requests will be rejected");
    }
    let signer = Arc::new(SignatureService::from_config(&config.wechat));

    let state = Arc::new(AppState {
        store,
        hub,
        runner,
        signer,
    });

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.store.name().to_string(),
    })
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    profile_id: i64,
}

#[derive(Serialize)]
struct SessionResponse {
    id: i64,
    profile_id: i64,
    channel: String,
}

async fn create_session_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), StatusCode> {
    match state.store.create_session(payload.profile_id).await {
        Ok(session) => Ok((
            StatusCode::CREATED,
            Json(SessionResponse {
                id: session.id,
                profile_id: session.profile_id,
                channel: channel_name(session.id),
            }),
        )),
        Err(StoreError::ProfileNotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(error = %e, "Session creation failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
struct PostMessageRequest {
    prompt: String,
}

#[derive(Serialize)]
struct AcceptedResponse {
    status: &'static str,
    channel: String,
}

/// Enqueue one assistant turn. The turn itself runs detached; its progress
/// is published on the session's event channel.
async fn post_message_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<i64>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), StatusCode> {
    if payload.prompt.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let known = state
        .store
        .session(session_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Session lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .is_some();
    if !known {
        return Err(StatusCode::NOT_FOUND);
    }

    let runner = state.runner.clone();
    let prompt = payload.prompt;
    tokio::spawn(async move {
        runner.run(session_id, &prompt).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            channel: channel_name(session_id),
        }),
    ))
}

/// Subscribe to a session's event channel over SSE.
async fn event_stream_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<i64>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    let known = state
        .store
        .session(session_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some();
    if !known {
        return Err(StatusCode::NOT_FOUND);
    }

    let rx = state.hub.subscribe(session_id);
    let stream = BroadcastStream::new(rx).filter_map(|event| match event {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(SseEvent::default().event(event.event_type()).data(data)))
        }
        // A lagged subscriber skips dropped events rather than erroring out
        Err(_) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
struct SignatureRequest {
    #[serde(default)]
    url: Option<String>,
}

async fn signature_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SignatureRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let url = payload.url.unwrap_or_default();
    if url.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": "URL parameter is required",
            })),
        );
    }

    match state.signer.sign(&url).await {
        Ok(data) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "data": data })),
        ),
        Err(e) => {
            error!(error = %e, "Signature computation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}
