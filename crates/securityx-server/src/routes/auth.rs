//! Account routes: `/api/auth/*`, `/api/profile*`, `/api/password/strength`
//!
//! Sign-up validates locally before anything reaches the auth provider, and
//! parks the profile data until the first dashboard visit. Sign-in hands the
//! session token back both in the body and as an HttpOnly cookie.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use base64::Engine;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use securityx_core::error::BackendError;
use securityx_core::models::{AuthUser, PendingAvatar, PendingProfile, Profile};
use securityx_core::password::{Strength, strength};
use securityx_core::validation::{FieldErrors, SignUpForm, validate_avatar_size};

use crate::error::AppError;
use crate::middleware::{SESSION_COOKIE, SessionUser};
use crate::state::AppState;

const DEFAULT_SESSION_SECS: u64 = 3600;

/// Routes open to anonymous callers.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/password/strength", post(password_strength))
}

/// Routes that need a session.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/me", get(me))
        .route("/api/profile", put(update_profile))
        .route("/api/profile/events", get(profile_events))
}

// ── Request / Response types ─────────────────────────────────────────

/// Avatar as sent by the sign-up page. `data` is base64, optionally as a
/// `data:` URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUpload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(flatten)]
    pub form: SignUpForm,
    #[serde(default)]
    pub avatar: Option<AvatarUpload>,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub success: bool,
    pub confirmation_required: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub user: AuthUser,
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct StrengthRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StrengthResponse {
    /// `None` for an empty password.
    pub strength: Option<StrengthView>,
}

#[derive(Debug, Serialize)]
pub struct StrengthView {
    #[serde(flatten)]
    pub strength: Strength,
    pub color: &'static str,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Split a `data:<type>;base64,<data>` URL; plain base64 passes through.
fn split_data_url(data: &str) -> (Option<&str>, &str) {
    match data
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    {
        Some((meta, payload)) => {
            let content_type = meta.split(';').next().filter(|t| !t.is_empty());
            (content_type, payload)
        }
        None => (None, data),
    }
}

/// Decode and check the avatar. Returns the field errors on failure.
fn pending_avatar(upload: AvatarUpload) -> Result<PendingAvatar, FieldErrors> {
    let (url_type, payload) = split_data_url(&upload.data);
    let content_type = upload
        .content_type
        .clone()
        .or_else(|| url_type.map(str::to_owned))
        .unwrap_or_else(|| "application/octet-stream".to_owned());

    let mut errors = FieldErrors::new();
    if !content_type.starts_with("image/") {
        errors.insert("avatar", "Please choose an image file");
        return Err(errors);
    }
    match base64::engine::general_purpose::STANDARD.decode(payload) {
        Ok(bytes) => validate_avatar_size(bytes.len())?,
        Err(_) => {
            errors.insert("avatar", "Could not read the selected file");
            return Err(errors);
        }
    }

    Ok(PendingAvatar {
        file_name: upload.file_name,
        content_type,
        data: payload.to_owned(),
    })
}

fn session_cookie(state: &AppState, token: &str, max_age: u64) -> Result<HeaderValue, AppError> {
    let secure = if state.secure_cookies { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}"
    ))
    .map_err(|e| AppError::Internal(format!("invalid session cookie: {e}")))
}

// ── Handlers ─────────────────────────────────────────────────────────

/// `POST /api/auth/sign-up`: validate, register, park profile data.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let mut errors = body.form.validate();
    let avatar = match body.avatar.map(pending_avatar) {
        Some(Ok(avatar)) => Some(avatar),
        Some(Err(avatar_errors)) => {
            errors.merge(avatar_errors);
            None
        }
        None => None,
    };
    errors.into_result()?;

    let form = body.form;
    let redirect = format!("{}/auth/sign-in", state.site_url);
    let outcome = state
        .auth
        .sign_up(&form.email, &form.password, &form.name, Some(&redirect))
        .await
        .map_err(|e| match e {
            BackendError::Auth { reason } => AppError::BadRequest(reason),
            other => AppError::from(other),
        })?;

    // Parked under the new account's id, so a rejected sign-up for an
    // existing address never reaches that account's data.
    match outcome.user_id {
        Some(user_id) => {
            let pending = PendingProfile {
                full_name: form.name,
                email: form.email,
                avatar,
            };
            if let Err(e) = state.pending.put(user_id, &pending).await {
                tracing::warn!(%user_id, error = %e, "could not park sign-up profile data");
            }
        }
        None => tracing::warn!("sign-up returned no user id, profile data not parked"),
    }

    tracing::info!(user_id = ?outcome.user_id, "sign-up accepted");
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            confirmation_required: outcome.confirmation_required,
            message: "Please check your email for verification",
        }),
    ))
}

/// `POST /api/auth/sign-in`: exchange credentials for a session cookie.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInRequest>,
) -> Result<Response, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_owned(),
        ));
    }

    let session = state
        .auth
        .sign_in(body.email.trim(), &body.password)
        .await?;
    let expires_in = session.expires_in.unwrap_or(DEFAULT_SESSION_SECS);
    let cookie = session_cookie(&state, &session.access_token, expires_in)?;

    tracing::info!(user_id = %session.user.id, "signed in");
    Ok((
        [(SET_COOKIE, cookie)],
        Json(SignInResponse {
            user: session.user,
            access_token: session.access_token,
            expires_in,
        }),
    )
        .into_response())
}

/// `POST /api/auth/sign-out`: end the session and clear the cookie.
async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Result<Response, AppError> {
    if let Err(e) = state.auth.sign_out(&session.access_token).await {
        tracing::warn!(user_id = %session.user.id, error = %e, "sign-out call failed");
    }
    state.drop_dashboard(session.user.id).await;

    let cookie = session_cookie(&state, "", 0)?;
    Ok(([(SET_COOKIE, cookie)], StatusCode::NO_CONTENT).into_response())
}

/// `GET /api/auth/me`: the caller's profile.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Json<Profile> {
    Json(state.profiles.current(&session.user).await)
}

/// `PUT /api/profile`: change the display name.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    if body.full_name.trim().chars().count() < 2 {
        let mut errors = FieldErrors::new();
        errors.insert("fullName", "Name must be at least 2 characters");
        return Err(errors.into());
    }
    let profile = state.profiles.rename(&session.user, &body.full_name).await?;
    Ok(Json(profile))
}

/// `GET /api/profile/events`: server-sent profile changes for the caller.
///
/// The subscription is released when the client disconnects or the server
/// shuts down.
async fn profile_events(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.profiles.feed().subscribe_user(session.user.id);
    let mut shutdown = state.shutdown.subscribe();
    let stream = futures_util::stream::unfold(subscription, |mut sub| async move {
        loop {
            let change = sub.recv().await?;
            match Event::default().event("profile").json_data(&change) {
                Ok(event) => return Some((Ok(event), sub)),
                Err(e) => tracing::warn!(error = %e, "could not encode profile change"),
            }
        }
    })
    .take_until(async move {
        let _ = shutdown.wait_for(|stopping| *stopping).await;
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

/// `POST /api/password/strength`: the sign-up page's strength meter.
async fn password_strength(Json(body): Json<StrengthRequest>) -> Json<StrengthResponse> {
    Json(StrengthResponse {
        strength: strength(&body.password).map(|s| StrengthView {
            color: s.label.color(),
            strength: s,
        }),
    })
}
