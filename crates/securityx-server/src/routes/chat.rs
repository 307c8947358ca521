//! Chat routes: `/api/chat*`
//!
//! `/api/chat` answers in the AI SDK data-stream framing: one text part on
//! a single line, `0:{"type":"text","text":...}\n`. The widget routes keep
//! per-user history when a session is present.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use securityx_core::models::{ChatMessage, ChatRole, NewChatMessage};
use securityx_core::responder::{GREETING, quick_reply, respond};

use crate::error::AppError;
use crate::middleware::SessionUser;
use crate::state::AppState;

/// Messages returned by the history endpoint.
const HISTORY_LIMIT: usize = 50;

const STREAM_HEADER: &str = "x-vercel-ai-data-stream";

/// Build the chat router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(chat_stream))
        .route("/history", get(history))
        .route("/messages", post(send_message))
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Serialize)]
struct TextFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// A message as the widget renders it.
#[derive(Debug, Serialize)]
pub struct WidgetMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
}

impl From<ChatMessage> for WidgetMessage {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id.to_string(),
            role: m.role,
            content: m.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<WidgetMessage>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Text of the first text part of the last message; empty if it has none.
fn last_message_text(body: &[u8]) -> Result<String, String> {
    let request: ChatRequest = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let last = request
        .messages
        .last()
        .ok_or_else(|| "no messages".to_owned())?;
    Ok(last
        .parts
        .iter()
        .find(|p| p.kind == "text")
        .and_then(|p| p.text.clone())
        .unwrap_or_default())
}

/// Render one reply as a data-stream text frame.
pub fn data_stream_frame(reply: &str) -> Result<String, serde_json::Error> {
    let part = serde_json::to_string(&TextFrame {
        kind: "text",
        text: reply,
    })?;
    Ok(format!("0:{part}\n"))
}

fn chat_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Error processing chat").into_response()
}

/// `POST /api/chat`: canned reply for the last message.
async fn chat_stream(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let text = match last_message_text(&body) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "malformed chat request");
            return chat_error();
        }
    };

    tokio::time::sleep(state.chat_delay).await;

    let reply = respond(&text);
    match data_stream_frame(reply) {
        Ok(frame) => (
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
                (
                    header::HeaderName::from_static(STREAM_HEADER),
                    HeaderValue::from_static("v1"),
                ),
            ],
            frame,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "could not encode chat reply");
            chat_error()
        }
    }
}

fn greeting() -> WidgetMessage {
    WidgetMessage {
        id: "greeting".to_owned(),
        role: ChatRole::Assistant,
        content: GREETING.to_owned(),
    }
}

/// `GET /api/chat/history`: the latest messages, or the greeting.
async fn history(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionUser>>,
) -> Json<MessagesResponse> {
    let Some(Extension(session)) = session else {
        return Json(MessagesResponse {
            messages: vec![greeting()],
        });
    };

    let messages = match state.chat.recent_messages(session.user.id, HISTORY_LIMIT).await {
        Ok(rows) if !rows.is_empty() => rows.into_iter().map(WidgetMessage::from).collect(),
        Ok(_) => vec![greeting()],
        Err(e) => {
            tracing::warn!(user_id = %session.user.id, error = %e, "chat history unavailable");
            vec![greeting()]
        }
    };
    Json(MessagesResponse { messages })
}

/// Store one message, falling back to an unsaved copy on failure.
async fn save(state: &AppState, user: Option<Uuid>, role: ChatRole, content: &str) -> WidgetMessage {
    let unsaved = || WidgetMessage {
        id: Uuid::new_v4().to_string(),
        role,
        content: content.to_owned(),
    };
    let Some(user_id) = user else {
        return unsaved();
    };

    let message = NewChatMessage {
        user_id,
        role,
        content: content.to_owned(),
    };
    match state.chat.insert_message(&message).await {
        Ok(stored) => stored.into(),
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "could not save chat message");
            unsaved()
        }
    }
}

/// `POST /api/chat/messages`: the widget's send action.
///
/// Greetings and "what is this" questions get an instant answer; anything
/// else goes through the responder with the usual delay. Both sides are
/// saved for signed-in users.
async fn send_message(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionUser>>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<MessagesResponse>, AppError> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("message is empty".to_owned()));
    }
    let user = session.map(|Extension(s)| s.user.id);

    // Low bits of a v4 UUID are random.
    let pick = usize::try_from(Uuid::new_v4().as_u128() % 4).unwrap_or(0);
    let reply = match quick_reply(text, pick) {
        Some(reply) => reply,
        None => {
            tokio::time::sleep(state.chat_delay).await;
            respond(text)
        }
    };

    let question = save(&state, user, ChatRole::User, text).await;
    let answer = save(&state, user, ChatRole::Assistant, reply).await;
    Ok(Json(MessagesResponse {
        messages: vec![question, answer],
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn frame_escapes_reply() {
        let frame = data_stream_frame("say \"hi\"\nnow").unwrap();
        assert_eq!(frame, "0:{\"type\":\"text\",\"text\":\"say \\\"hi\\\"\\nnow\"}\n");
    }

    #[test]
    fn last_message_first_text_part() {
        let body = br#"{"messages":[
            {"role":"user","parts":[{"type":"text","text":"first"}]},
            {"role":"user","parts":[{"type":"image"},{"type":"text","text":"kubernetes?"},{"type":"text","text":"x"}]}
        ]}"#;
        assert_eq!(last_message_text(body).unwrap(), "kubernetes?");
    }

    #[test]
    fn no_text_part_is_empty_and_no_messages_is_error() {
        let body = br#"{"messages":[{"role":"user","parts":[]}]}"#;
        assert_eq!(last_message_text(body).unwrap(), "");
        assert!(last_message_text(br#"{"messages":[]}"#).is_err());
        assert!(last_message_text(b"not json").is_err());
    }
}
