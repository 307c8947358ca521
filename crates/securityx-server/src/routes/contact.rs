//! Contact form route: `POST /api/contact`

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use securityx_core::validation::ContactForm;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/contact", post(send))
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: &'static str,
}

async fn send(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ContactForm>,
) -> Result<Json<ContactResponse>, AppError> {
    form.validate().into_result()?;

    state.mailer.send_contact(&form).await.map_err(|e| {
        tracing::warn!(error = %e, "contact message not delivered");
        AppError::Upstream("Failed to send message. Please try again.".to_owned())
    })?;

    Ok(Json(ContactResponse {
        success: true,
        message: "Message Sent!",
    }))
}
