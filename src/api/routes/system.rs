//! System handlers: health, OpenAPI, event streams.

use crate::api::AppState;
use crate::types::Event;
use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// GET /health - Health check with store readiness
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up; `stores` lists readiness per store")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let stores: serde_json::Map<String, serde_json::Value> = state
        .node
        .stores()
        .readiness()
        .into_iter()
        .map(|(name, ready)| (name.to_string(), json!(ready)))
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "stores": stores,
        "ai": state.node.ai().is_some(),
        "acceptingJobs": state.node.is_accepting_jobs()
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// Wire name and JSON payload of an event
fn encode_event(event: &Event) -> Option<(String, String)> {
    let value = match serde_json::to_value(event) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize event to JSON");
            return None;
        }
    };
    let name = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("event")
        .to_string();
    Some((name, value.to_string()))
}

/// GET /events - Server-sent events stream
#[utoipa::path(
    get,
    path = "/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = BroadcastStream::new(state.node.subscribe());

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => encode_event(&event)
            .map(|(name, data)| Ok(SseEvent::default().event(name).data(data))),
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("SSE client lagged, skipped {} events", skipped);
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

/// GET /ws - WebSocket stream of broadcast events
#[utoipa::path(
    get,
    path = "/ws",
    tag = "system",
    responses(
        (status = 101, description = "Switching to a WebSocket carrying JSON events")
    )
)]
pub async fn websocket(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_events(socket, state))
}

async fn forward_events(mut socket: WebSocket, state: AppState) {
    let mut events = state.node.subscribe();
    tracing::debug!("WebSocket subscriber connected");

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    let Some((_, data)) = encode_event(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(data)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("WebSocket client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // Clients only listen; anything but a close is ignored
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("WebSocket subscriber disconnected");
}
