//! HTTP routes and the assembled application router.

pub mod auth;
pub mod chat;
pub mod contact;
pub mod dashboard;
pub mod ui;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::middleware as axum_mw;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, optional_auth_middleware};
use crate::state::AppState;

/// Sign-up bodies carry a base64 avatar of up to 5 MiB.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Build the full application: API, UI pages, and shared layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let authenticated_routes = Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    // The widget works signed out; history is kept only with a session.
    let chat_routes = chat::router().route_layer(axum_mw::from_fn_with_state(
        Arc::clone(&state),
        optional_auth_middleware,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(authenticated_routes)
        .nest("/api/chat", chat_routes)
        .merge(auth::public_router())
        .merge(contact::router())
        .route("/health", get(health))
        .merge(ui::router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
