use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use promptgate_core::{BrokerConfig, BrokerError, EditBroker, EventStream};

use crate::error::ServerError;
use crate::protocol::{CancelRequest, ConfirmRequest, ControlResponse, UpdateRequest};

struct AppState {
    broker: Arc<EditBroker>,
    start_time: Instant,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    pending_sessions: usize,
    version: &'static str,
}

/// HTTP server wrapping an [`EditBroker`].
///
/// Pipelines open sessions against [`broker`](Self::broker); editors resolve
/// them through the control endpoints and follow lifecycle events on `/ws`.
pub struct PromptServer {
    broker: Arc<EditBroker>,
}

impl PromptServer {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            broker: Arc::new(EditBroker::new(config)),
        }
    }

    pub fn with_broker(broker: Arc<EditBroker>) -> Self {
        Self { broker }
    }

    /// The broker behind this server.
    pub fn broker(&self) -> Arc<EditBroker> {
        self.broker.clone()
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            broker: self.broker.clone(),
            start_time: Instant::now(),
        });
        Router::new()
            .route("/prompt_edit/update", axum::routing::post(update_handler))
            .route("/prompt_edit/confirm", axum::routing::post(confirm_handler))
            .route("/prompt_edit/cancel", axum::routing::post(cancel_handler))
            .route("/ws", axum::routing::any(ws_handler))
            .route("/health", axum::routing::get(health_handler))
            .with_state(state)
    }

    pub async fn start(&self, host: &str, port: u16) -> Result<(), ServerError> {
        let app = self.router();
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!("Prompt edit server listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        Ok(())
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pending_sessions = state.broker.session_count().await;
    let uptime_secs = state.start_time.elapsed().as_secs();
    Json(HealthResponse {
        status: "ok",
        uptime_secs,
        pending_sessions,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateRequest>,
) -> Response {
    match state
        .broker
        .update_text(&request.session_id, request.edited_text)
        .await
    {
        Ok(()) => success(),
        Err(error) => error_response(error),
    }
}

async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfirmRequest>,
) -> Response {
    match state
        .broker
        .confirm(&request.session_id, request.edited_text)
        .await
    {
        Ok(()) => success(),
        Err(error) => error_response(error),
    }
}

async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CancelRequest>,
) -> Response {
    match state.broker.cancel(&request.session_id).await {
        Ok(()) => success(),
        Err(error) => error_response(error),
    }
}

fn success() -> Response {
    Json(ControlResponse::Success).into_response()
}

fn error_response(error: BrokerError) -> Response {
    let status = match error {
        BrokerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(ControlResponse::Error {
        message: error.to_string(),
    });
    (status, body).into_response()
}

async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    // Subscribe before the upgrade completes so a session opened right after
    // the handshake is never missed.
    let events = state.broker.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(mut socket: WebSocket, mut events: EventStream) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                let payload = serde_json::to_string(&event).unwrap_or_default();
                if socket.send(Message::text(payload)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => continue,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use promptgate_core::{EditRequest, Resolution};
    use tokio::time::{timeout, Duration};

    async fn start_test_server() -> (String, Arc<EditBroker>) {
        let server = PromptServer::new(BrokerConfig::default());
        let broker = server.broker();
        let app = server.router();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://127.0.0.1:{}", addr.port()), broker)
    }

    async fn post(base_url: &str, path: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}{}", base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        let body: serde_json::Value = resp.json().await.unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_update_then_confirm_resumes_pipeline() {
        let (base_url, broker) = start_test_server().await;
        let (id, handle) = broker
            .begin_session(EditRequest::new("14", "a cat in a hat"))
            .await
            .unwrap();

        let (status, body) = post(
            &base_url,
            "/prompt_edit/update",
            serde_json::json!({"session_id": id, "edited_text": "a cat in a top hat"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "success");

        let (status, body) = post(
            &base_url,
            "/prompt_edit/confirm",
            serde_json::json!({"session_id": id}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "success");

        let resolution = handle.block_until_resolved().await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Confirmed {
                text: "a cat in a top hat".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_confirm_carries_final_text() {
        let (base_url, broker) = start_test_server().await;
        let (id, handle) = broker
            .begin_session(EditRequest::new("3", "draft"))
            .await
            .unwrap();

        let (status, _) = post(
            &base_url,
            "/prompt_edit/confirm",
            serde_json::json!({"session_id": id, "edited_text": "final"}),
        )
        .await;
        assert_eq!(status, 200);

        let resolution = handle.block_until_resolved().await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Confirmed {
                text: "final".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_resolves_session() {
        let (base_url, broker) = start_test_server().await;
        let (id, handle) = broker
            .begin_session(EditRequest::new("3", "draft"))
            .await
            .unwrap();

        let (status, body) = post(
            &base_url,
            "/prompt_edit/cancel",
            serde_json::json!({"session_id": id}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "success");

        let resolution = handle.block_until_resolved().await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Cancelled {
                text: "draft".to_string()
            }
        );
        assert_eq!(broker.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_session_returns_404() {
        let (base_url, _broker) = start_test_server().await;

        for path in [
            "/prompt_edit/update",
            "/prompt_edit/confirm",
            "/prompt_edit/cancel",
        ] {
            let (status, body) = post(
                &base_url,
                path,
                serde_json::json!({"session_id": "nonexistent", "edited_text": "x"}),
            )
            .await;
            assert_eq!(status, 404, "{} should 404", path);
            assert_eq!(body["status"], "error");
            assert!(body["message"].as_str().unwrap().contains("not found"));
        }
    }

    #[tokio::test]
    async fn test_confirm_after_waiter_dropped_returns_500() {
        let (base_url, broker) = start_test_server().await;
        let (id, handle) = broker
            .begin_session(EditRequest::new("3", "draft"))
            .await
            .unwrap();
        drop(handle);

        let (status, body) = post(
            &base_url,
            "/prompt_edit/confirm",
            serde_json::json!({"session_id": id}),
        )
        .await;
        assert_eq!(status, 500);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let (base_url, _broker) = start_test_server().await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/prompt_edit/confirm", base_url))
            .header("content-type", "application/json")
            .body("not valid json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_health_returns_200_with_correct_fields() {
        let (base_url, _broker) = start_test_server().await;

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["uptime_secs"].is_u64());
        assert_eq!(body["pending_sessions"], 0);
        assert!(!body["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_reflects_pending_sessions() {
        let (base_url, broker) = start_test_server().await;
        let (_id, _handle) = broker
            .begin_session(EditRequest::new("1", "draft"))
            .await
            .unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["pending_sessions"], 1);
    }

    #[tokio::test]
    async fn test_ws_streams_session_events() {
        let (base_url, broker) = start_test_server().await;
        let ws_url = format!("{}/ws", base_url.replace("http://", "ws://"));
        let (mut ws, _) = tokio_tungstenite::connect_async(ws_url).await.unwrap();

        let (id, handle) = broker
            .begin_session(EditRequest::new("14", "a cat in a hat"))
            .await
            .unwrap();

        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let event: serde_json::Value =
            serde_json::from_str(frame.into_text().unwrap().as_str()).unwrap();
        assert_eq!(event["type"], "prompt_edit_session");
        assert_eq!(event["session_id"], id);
        assert_eq!(event["node_id"], "14");
        assert_eq!(event["text"], "a cat in a hat");

        broker.confirm(&id, None).await.unwrap();
        handle.block_until_resolved().await.unwrap();

        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let event: serde_json::Value =
            serde_json::from_str(frame.into_text().unwrap().as_str()).unwrap();
        assert_eq!(event["type"], "prompt_edit_closed");
        assert_eq!(event["session_id"], id);
        assert_eq!(event["outcome"], "confirmed");

        ws.close(None).await.unwrap();
    }
}
