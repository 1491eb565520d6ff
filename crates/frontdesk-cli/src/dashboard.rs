//! HTTP and WebSocket surface for the dashboard.
//!
//! `/ws` pushes the current connection status on connect, then every
//! [`DashboardEvent`] as `{"event": ..., "data": ...}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use frontdesk_worker::{ChatListEntry, Conversation, DashboardEvent, FrontdeskWorker, StatusUpdate, WorkerError};

#[derive(Clone)]
pub struct DashboardState {
    worker: Arc<FrontdeskWorker>,
}

pub fn router(worker: Arc<FrontdeskWorker>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/status", get(status))
        .route("/api/bot-status", get(bot_status).post(set_bot_status))
        .route("/api/chats", get(chats))
        .route("/api/chats/{id}", get(chat))
        .route("/api/send-message", post(send_message))
        .with_state(DashboardState { worker })
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(error: WorkerError) -> Self {
        let status = match error {
            WorkerError::ChatNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn status(State(state): State<DashboardState>) -> Json<StatusUpdate> {
    Json(state.worker.context().connection.snapshot())
}

#[derive(Debug, Deserialize)]
struct BotToggle {
    enabled: bool,
}

async fn bot_status(State(state): State<DashboardState>) -> Json<serde_json::Value> {
    Json(json!({ "enabled": state.worker.bot_enabled() }))
}

async fn set_bot_status(
    State(state): State<DashboardState>,
    Json(toggle): Json<BotToggle>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.worker.toggle_bot(toggle.enabled).await?;
    Ok(Json(json!({ "success": true, "enabled": toggle.enabled })))
}

async fn chats(State(state): State<DashboardState>) -> Result<Json<Vec<ChatListEntry>>, ApiError> {
    Ok(Json(state.worker.chats().await?))
}

async fn chat(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.worker.conversation(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    #[serde(default)]
    chat_id: String,
    #[serde(default)]
    message: String,
}

async fn send_message(
    State(state): State<DashboardState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.chat_id.is_empty() || request.message.is_empty() {
        return Err(ApiError::bad_request("Missing chatId or message"));
    }
    state
        .worker
        .send_message(&request.chat_id, &request.message)
        .await?;
    Ok(Json(json!({ "success": true })))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: DashboardState) {
    let (mut sender, mut receiver) = socket.split();
    let (current, mut events) = state.worker.subscribe();
    tracing::debug!(status = %current.status, "Dashboard connected");

    if let Some(text) = frame(&DashboardEvent::StatusUpdate(current)) {
        if sender.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(text) = frame(&event) else { continue };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dashboard client lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Dashboard disconnected");
}

fn frame(event: &DashboardEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "Could not encode dashboard event");
            None
        }
    }
}
