//! Dashboard routes: `/api/dashboard*`, `/api/integrations/*`,
//! `/api/notifications/*`, `/api/settings/*`
//!
//! All of them act on the caller's in-memory [`DashboardState`], loaded on
//! first use. Only connecting an integration is persisted.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use securityx_core::dashboard::{
    CardError, DashboardState, SecurityScore, Section, TimelineEvent, activity_timeline,
};
use securityx_core::integration::IntegrationCard;
use securityx_core::models::Profile;
use securityx_core::repository::Tier;
use securityx_core::validation::{FieldErrors, SettingsForm};

use crate::error::AppError;
use crate::middleware::SessionUser;
use crate::state::AppState;

/// Build the dashboard router. Every route requires a session.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/dashboard/section", post(navigate))
        .route("/api/integrations/{index}/toggle", post(toggle))
        .route("/api/integrations/{index}/credentials", put(set_credential))
        .route("/api/integrations/{index}/connect", post(connect))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/settings/validate", post(validate_settings))
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub profile: Profile,
    pub user_name: String,
    pub dashboard: DashboardState,
    pub unread_count: usize,
    pub security_score: SecurityScore,
    pub timeline: Vec<TimelineEvent>,
    /// Where the integration cards were loaded from on this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrations_tier: Option<Tier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateRequest {
    #[serde(default)]
    pub section: Option<Section>,
    #[serde(default)]
    pub drawer_open: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub section: Section,
    pub drawer_open: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub expanded: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub card: IntegrationCard,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub card: IntegrationCard,
    pub saved_to: Tier,
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub valid: bool,
    pub errors: FieldErrors,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// `GET /api/dashboard`: provision on first visit and return the view.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<DashboardResponse>, AppError> {
    let user_id = session.user.id;
    let provisioned = state.profiles.ensure(&session.user).await;
    let user_name = provisioned.profile.display_name().to_owned();
    let tier = state.load_dashboard(user_id).await?;

    let view = state
        .with_dashboard(user_id, |d| {
            if provisioned.created {
                d.push_notification(format!(
                    "Welcome {user_name}! Your account has been set up successfully."
                ));
            }
            d.clone()
        })
        .await?;

    Ok(Json(DashboardResponse {
        unread_count: view.unread_count(),
        profile: provisioned.profile,
        user_name,
        dashboard: view,
        security_score: SecurityScore::placeholder(),
        timeline: activity_timeline(Utc::now()),
        integrations_tier: tier,
    }))
}

/// `POST /api/dashboard/section`: open/close the drawer or navigate.
async fn navigate(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Json(body): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, AppError> {
    let response = state
        .with_dashboard(session.user.id, |d| {
            if let Some(open) = body.drawer_open {
                d.set_drawer(open);
            }
            if let Some(section) = body.section {
                d.set_section(section);
            }
            NavigateResponse {
                section: d.section,
                drawer_open: d.drawer_open,
            }
        })
        .await?;
    Ok(Json(response))
}

/// `POST /api/integrations/{index}/toggle`
async fn toggle(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Path(index): Path<usize>,
) -> Result<Json<ToggleResponse>, AppError> {
    let expanded = state
        .with_dashboard(session.user.id, |d| d.toggle_expanded(index))
        .await??;
    Ok(Json(ToggleResponse { expanded }))
}

/// `PUT /api/integrations/{index}/credentials`: one typed field value.
async fn set_credential(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Path(index): Path<usize>,
    Json(body): Json<CredentialRequest>,
) -> Result<Json<CardResponse>, AppError> {
    let card = state
        .with_dashboard(session.user.id, |d| {
            d.set_credential(index, &body.field, &body.value)?;
            Ok::<_, CardError>(d.cards[index].clone())
        })
        .await??;
    Ok(Json(CardResponse { card }))
}

/// `POST /api/integrations/{index}/connect`: connect and persist.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Path(index): Path<usize>,
) -> Result<Json<ConnectResponse>, AppError> {
    let user_id = session.user.id;
    let (card, cards, unread_count) = state
        .with_dashboard(user_id, |d| {
            let card = d.connect(index)?.clone();
            Ok::<_, CardError>((card, d.cards.clone(), d.unread_count()))
        })
        .await??;

    let saved_to = state.integrations.save(user_id, &cards, index).await?;
    tracing::info!(%user_id, integration = card.name(), ?saved_to, "integration connected");

    Ok(Json(ConnectResponse {
        card,
        saved_to,
        unread_count,
    }))
}

/// `POST /api/notifications/{id}/read`
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<UnreadResponse>, AppError> {
    let (found, unread_count) = state
        .with_dashboard(session.user.id, |d| (d.mark_read(id), d.unread_count()))
        .await?;
    if !found {
        return Err(AppError::NotFound(format!("no notification {id}")));
    }
    Ok(Json(UnreadResponse { unread_count }))
}

/// `POST /api/notifications/read-all`
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<UnreadResponse>, AppError> {
    let unread_count = state
        .with_dashboard(session.user.id, |d| {
            d.mark_all_read();
            d.unread_count()
        })
        .await?;
    Ok(Json(UnreadResponse { unread_count }))
}

/// `POST /api/settings/validate`: check the settings form. Nothing is saved.
async fn validate_settings(Json(form): Json<SettingsForm>) -> Json<SettingsResponse> {
    let errors = form.validate();
    Json(SettingsResponse {
        valid: errors.is_empty(),
        errors,
    })
}
