//! End-to-end tests for the HTTP API.
//!
//! Each test builds the full router over the in-memory backend and drives
//! it with `oneshot` requests; no socket is opened.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use securityx_core::backend::MemoryBackend;
use securityx_core::validation::ContactForm;
use securityx_server::config::ServerConfig;
use securityx_server::mail::{MailError, Mailer};
use securityx_server::routes::build_router;
use securityx_server::state::{AppState, Services};

/// Helper: a fresh app and a handle on its backend.
fn app() -> (Router, MemoryBackend) {
    let backend = MemoryBackend::new();
    let state = AppState::new(
        Services::in_memory(&backend),
        Arc::new(securityx_storage::MemoryBackend::new()),
        &ServerConfig::default(),
    );
    (build_router(Arc::new(state)), backend)
}

fn json_request(method: &str, uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn sign_up_body(email: &str) -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": email,
        "password": "Engine#1843",
        "confirmPassword": "Engine#1843",
        "agreeToTerms": true
    })
}

/// Helper: register and sign in, returning the `Cookie` header value.
async fn signed_in(app: &Router, email: &str) -> String {
    let (status, _) = send(app, json_request("POST", "/api/auth/sign-up", &sign_up_body(email), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/sign-in",
            &json!({ "email": email, "password": "Engine#1843" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_owned()
}

// ── Chat ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_stream_framing() {
    let (app, _) = app();
    let body = json!({ "messages": [
        { "role": "user", "parts": [{ "type": "text", "text": "How do I secure Kubernetes?" }] }
    ]});
    let response = app
        .oneshot(json_request("POST", "/api/chat", &body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-vercel-ai-data-stream"], "v1");
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    let frame = text.strip_prefix("0:").and_then(|t| t.strip_suffix('\n')).unwrap();
    let part: Value = serde_json::from_str(frame).unwrap();
    assert_eq!(part["type"], "text");
    assert!(
        part["text"]
            .as_str()
            .unwrap()
            .starts_with("Kubernetes Security Best Practices")
    );
}

#[tokio::test]
async fn test_chat_malformed_body_is_500() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, b"Error processing chat");
}

#[tokio::test]
async fn test_history_signed_out_is_greeting() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/api/chat/history", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["id"], "greeting");
    assert_eq!(body["messages"][0]["role"], "assistant");
}

#[tokio::test]
async fn test_widget_messages_are_kept_for_signed_in_user() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/chat/messages", &json!({ "text": "what about sql injection?" }), Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    let (_, history) = send(&app, get("/api/chat/history", Some(&cookie))).await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "what about sql injection?");
    assert_eq!(messages[1]["role"], "assistant");
}

#[tokio::test]
async fn test_empty_widget_message_rejected() {
    let (app, _) = app();
    let (status, _) = send(&app, json_request("POST", "/api/chat/messages", &json!({ "text": "   " }), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Accounts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_up_mismatch_never_reaches_provider() {
    let (app, backend) = app();
    let mut body = sign_up_body("ada@example.com");
    body["confirmPassword"] = json!("Engine#1844");

    let (status, err) = send(&app, json_request("POST", "/api/auth/sign-up", &body, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "validation");
    assert_eq!(err["fields"]["confirmPassword"], "Passwords do not match");
    assert_eq!(backend.sign_up_calls(), 0);
}

#[tokio::test]
async fn test_duplicate_sign_up_is_conflict() {
    let (app, _) = app();
    let body = sign_up_body("ada@example.com");
    let (first, _) = send(&app, json_request("POST", "/api/auth/sign-up", &body, None)).await;
    let (second, _) = send(&app, json_request("POST", "/api/auth/sign-up", &body, None)).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rejected_duplicate_sign_up_keeps_first_profile() {
    let (app, _) = app();
    let (first, _) = send(&app, json_request("POST", "/api/auth/sign-up", &sign_up_body("ada@example.com"), None)).await;
    assert_eq!(first, StatusCode::CREATED);

    let mut impostor = sign_up_body("ada@example.com");
    impostor["name"] = json!("Mallory Was Here");
    let (second, _) = send(&app, json_request("POST", "/api/auth/sign-up", &impostor, None)).await;
    assert_eq!(second, StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/sign-in",
            &json!({ "email": "ada@example.com", "password": "Engine#1843" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned();

    let (status, body) = send(&app, get("/api/dashboard", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (app, _) = app();
    send(&app, json_request("POST", "/api/auth/sign-up", &sign_up_body("ada@example.com"), None)).await;
    let (status, _) = send(
        &app,
        json_request("POST", "/api/auth/sign-in", &json!({ "email": "ada@example.com", "password": "nope" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/api/dashboard", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, get("/api/dashboard", Some("sx_session=bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_dashboard_visit_welcomes_once() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;

    let (status, first) = send(&app, get("/api/dashboard", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user_name"], "Ada Lovelace");
    assert_eq!(first["unread_count"], 1);
    assert_eq!(
        first["dashboard"]["notifications"][0]["message"],
        "Welcome Ada Lovelace! Your account has been set up successfully."
    );
    assert_eq!(first["security_score"]["score"], 87);

    let (_, second) = send(&app, get("/api/dashboard", Some(&cookie))).await;
    assert_eq!(second["dashboard"]["notifications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rename_updates_profile() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    send(&app, get("/api/dashboard", Some(&cookie))).await;

    let (status, _) = send(&app, json_request("PUT", "/api/profile", &json!({ "fullName": "A" }), Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, profile) =
        send(&app, json_request("PUT", "/api/profile", &json!({ "fullName": "Countess Ada" }), Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["full_name"], "Countess Ada");

    let (_, me) = send(&app, get("/api/auth/me", Some(&cookie))).await;
    assert_eq!(me["full_name"], "Countess Ada");
}

#[tokio::test]
async fn test_sign_out_clears_cookie() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/sign-out", &json!({}), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    let (status, _) = send(&app, get("/api/dashboard", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_navigate_to_every_section() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    for section in [
        "home",
        "vulnerabilities",
        "alerts",
        "api-keys",
        "integrations",
        "settings",
        "activity",
        "analytics",
        "reports",
    ] {
        let (_, opened) = send(
            &app,
            json_request("POST", "/api/dashboard/section", &json!({ "drawerOpen": true }), Some(&cookie)),
        )
        .await;
        assert_eq!(opened["drawer_open"], true);

        let (status, moved) = send(
            &app,
            json_request("POST", "/api/dashboard/section", &json!({ "section": section }), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "section {section}");
        assert_eq!(moved["section"], section);
        assert_eq!(moved["drawer_open"], false);
    }

    let (status, _) = send(
        &app,
        json_request("POST", "/api/dashboard/section", &json!({ "section": "billing" }), Some(&cookie)),
    )
    .await;
    assert!(status.is_client_error());
}

// ── Integrations ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_toggle_twice_collapses() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;

    let (_, open) = send(&app, json_request("POST", "/api/integrations/0/toggle", &json!({}), Some(&cookie))).await;
    assert_eq!(open["expanded"], 0);
    let (_, closed) = send(&app, json_request("POST", "/api/integrations/0/toggle", &json!({}), Some(&cookie))).await;
    assert_eq!(closed["expanded"], Value::Null);

    let (status, _) = send(&app, json_request("POST", "/api/integrations/99/toggle", &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn fill_slack(app: &Router, cookie: &str) {
    for (field, value) in [
        ("webhookUrl", "https://hooks.slack.com/services/T0"),
        ("channel", "#alerts"),
    ] {
        let (status, _) = send(
            app,
            json_request(
                "PUT",
                "/api/integrations/0/credentials",
                &json!({ "field": field, "value": value }),
                Some(cookie),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_connect_without_credentials_is_rejected() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    let (status, body) = send(&app, json_request("POST", "/api/integrations/0/connect", &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Slack is missing required credentials");
}

#[tokio::test]
async fn test_connect_saves_remotely() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    fill_slack(&app, &cookie).await;

    let (status, body) = send(&app, json_request("POST", "/api/integrations/0/connect", &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved_to"], "remote");
    assert_eq!(body["card"]["connected"], true);
}

#[tokio::test]
async fn test_connect_falls_back_to_local_when_tables_missing() {
    let (app, backend) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    backend.set_tables_offline(true);
    fill_slack(&app, &cookie).await;

    let (status, body) = send(&app, json_request("POST", "/api/integrations/0/connect", &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved_to"], "local");
    assert_eq!(body["unread_count"], 1);
}

#[tokio::test]
async fn test_notifications_read() {
    let (app, _) = app();
    let cookie = signed_in(&app, "ada@example.com").await;
    let (_, view) = send(&app, get("/api/dashboard", Some(&cookie))).await;
    let id = view["dashboard"]["notifications"][0]["id"].as_str().unwrap().to_owned();

    let uri = format!("/api/notifications/{id}/read");
    let (status, body) = send(&app, json_request("POST", &uri, &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 0);

    let unknown = format!("/api/notifications/{}/read", uuid::Uuid::new_v4());
    let (status, _) = send(&app, json_request("POST", &unknown, &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Public forms ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_contact_validation_and_delivery() {
    let (app, _) = app();
    let (status, err) = send(
        &app,
        json_request("POST", "/api/contact", &json!({ "name": "", "email": "x", "message": "" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["fields"].as_object().unwrap().len(), 3);

    let (status, ok) = send(
        &app,
        json_request(
            "POST",
            "/api/contact",
            &json!({ "name": "Grace", "email": "grace@navy.mil", "message": "Hello" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ok["message"], "Message Sent!");
}

struct FailingMailer;

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send_contact(&self, _form: &ContactForm) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_owned()))
    }
}

#[tokio::test]
async fn test_contact_delivery_failure_is_bad_gateway() {
    let backend = MemoryBackend::new();
    let mut services = Services::in_memory(&backend);
    services.mailer = Arc::new(FailingMailer);
    let state = AppState::new(
        services,
        Arc::new(securityx_storage::MemoryBackend::new()),
        &ServerConfig::default(),
    );
    let app = build_router(Arc::new(state));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/contact",
            &json!({ "name": "Grace", "email": "grace@navy.mil", "message": "Hello" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream");
    assert_eq!(body["message"], "Failed to send message. Please try again.");
}

#[tokio::test]
async fn test_password_strength_meter() {
    let (app, _) = app();
    let (_, empty) = send(&app, json_request("POST", "/api/password/strength", &json!({ "password": "" }), None)).await;
    assert_eq!(empty["strength"], Value::Null);

    let (_, strong) =
        send(&app, json_request("POST", "/api/password/strength", &json!({ "password": "Engine#1843xyz" }), None)).await;
    assert_eq!(strong["strength"]["color"], "green");
}

#[tokio::test]
async fn test_pages_and_health() {
    let (app, _) = app();
    for uri in ["/", "/auth/sign-in", "/auth/sign-up", "/dashboard"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    }
    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
