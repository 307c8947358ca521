//! Session authentication.
//!
//! A session token arrives either as `Authorization: Bearer <token>` (API
//! clients) or in the `sx_session` cookie set at sign-in (the browser). The
//! token is resolved to a user by the auth provider on every request.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::middleware::Next;
use axum::response::Response;

use securityx_core::models::AuthUser;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sx_session";

/// The signed-in caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: AuthUser,
    pub access_token: String,
}

/// Pull the session token out of the request headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_owned());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<SessionUser, AppError> {
    let token = session_token(headers)
        .ok_or_else(|| AppError::Unauthorized("not signed in".to_owned()))?;
    let user = state.auth.get_user(&token).await.map_err(|e| {
        tracing::debug!(error = %e, "session rejected");
        AppError::Unauthorized("session expired, please sign in again".to_owned())
    })?;
    Ok(SessionUser {
        user,
        access_token: token,
    })
}

/// Require a valid session. Injects [`SessionUser`] on success.
///
/// # Errors
///
/// Returns `401` when no token is present or the provider rejects it.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = resolve(&state, req.headers()).await?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Resolve a session if one is present; anonymous requests pass through.
pub async fn optional_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if session_token(req.headers()).is_some() {
        if let Ok(session) = resolve(&state, req.headers()).await {
            req.extensions_mut().insert(session);
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("sx_session=def"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sx_session=tok123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("sx_session="));
        assert_eq!(session_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(session_token(&headers), None);
    }
}
