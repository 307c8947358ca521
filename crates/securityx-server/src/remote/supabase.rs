//! Supabase auth (GoTrue) and storage over HTTP.
//!
//! Every call is made once. Non-2xx answers are turned into
//! [`BackendError`]s carrying the service's own message, which the sign-up
//! and sign-in pages show verbatim.

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use securityx_core::backend::{AuthProvider, AvatarStorage};
use securityx_core::error::BackendError;
use securityx_core::models::{AuthUser, Session, SignUpOutcome};

use crate::config::SupabaseConfig;

/// Client for one Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
}

#[derive(Deserialize)]
struct UserBody {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize, Default)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

impl From<UserBody> for AuthUser {
    fn from(body: UserBody) -> Self {
        Self {
            id: body.id,
            email: body.email.unwrap_or_default(),
            full_name: body.user_metadata.full_name.filter(|n| !n.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct SessionBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: UserBody,
}

/// Sign-up answers with a session when email confirmation is off, and with
/// the bare user when it is on.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(SessionBody),
    User(UserBody),
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn text(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
    }
}

/// Turn a failed response into a [`BackendError`].
async fn error_from(resp: reqwest::Response) -> BackendError {
    let status = resp.status();
    let body: ErrorBody = resp.json().await.unwrap_or_default();
    let already_exists = body.error_code.as_deref() == Some("user_already_exists");
    let reason = body
        .text()
        .unwrap_or_else(|| format!("request failed with status {status}"));

    if already_exists || status == reqwest::StatusCode::CONFLICT {
        BackendError::Conflict { reason }
    } else if status == reqwest::StatusCode::NOT_FOUND {
        BackendError::NotFound { what: reason }
    } else if status.is_client_error() {
        BackendError::Auth { reason }
    } else {
        BackendError::Transport { reason }
    }
}

fn transport(e: &reqwest::Error) -> BackendError {
    BackendError::Transport {
        reason: e.to_string(),
    }
}

fn decode(e: &reqwest::Error) -> BackendError {
    BackendError::Decode {
        reason: e.to_string(),
    }
}

impl SupabaseClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: SupabaseConfig) -> Self {
        Self { http, config }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.url)
    }

    fn object_path(&self, path: &str) -> String {
        let encoded: Vec<_> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}",
            urlencoding::encode(&self.config.avatar_bucket),
            encoded.join("/")
        )
    }
}

#[async_trait::async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let mut url = self.auth_url("signup");
        if let Some(redirect) = redirect_to {
            url = format!("{url}?redirect_to={}", urlencoding::encode(redirect));
        }

        let resp = self
            .http
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await
            .map_err(|e| transport(&e))?;

        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }

        let outcome = match resp.json::<SignUpBody>().await.map_err(|e| decode(&e))? {
            SignUpBody::Session(session) => SignUpOutcome {
                user_id: Some(session.user.id),
                confirmation_required: false,
            },
            SignUpBody::User(user) => SignUpOutcome {
                user_id: Some(user.id),
                confirmation_required: true,
            },
        };
        tracing::info!(
            user_id = ?outcome.user_id,
            confirmation_required = outcome.confirmation_required,
            "user signed up"
        );
        Ok(outcome)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let resp = self
            .http
            .post(self.auth_url("token?grant_type=password"))
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport(&e))?;

        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }

        let body: SessionBody = resp.json().await.map_err(|e| decode(&e))?;
        Ok(Session {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
            user: body.user.into(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport(&e))?;

        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let resp = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport(&e))?;

        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }

        let body: UserBody = resp.json().await.map_err(|e| decode(&e))?;
        Ok(body.into())
    }
}

#[async_trait::async_trait]
impl AvatarStorage for SupabaseClient {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let key = self
            .config
            .service_key
            .as_deref()
            .unwrap_or(&self.config.anon_key);

        let resp = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}",
                self.config.url,
                self.object_path(path)
            ))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(key)
            .header("content-type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport(&e))?;

        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        tracing::debug!(path, "avatar uploaded");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.config.url,
            self.object_path(path)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(
            reqwest::Client::new(),
            SupabaseConfig {
                url: "https://abcd.supabase.co".to_owned(),
                anon_key: "anon".to_owned(),
                service_key: None,
                avatar_bucket: "avatars".to_owned(),
            },
        )
    }

    #[test]
    fn public_url_points_at_public_bucket() {
        let id = Uuid::nil();
        let path = securityx_core::backend::avatar_path(id, "png");
        assert_eq!(
            client().public_url(&path),
            format!("https://abcd.supabase.co/storage/v1/object/public/avatars/{id}/{id}.png")
        );
    }

    #[test]
    fn sign_up_body_distinguishes_confirmation() {
        let id = Uuid::new_v4();
        let user: SignUpBody =
            serde_json::from_value(json!({ "id": id, "email": "a@b.co" })).unwrap();
        assert!(matches!(user, SignUpBody::User(ref u) if u.id == id));

        let session: SignUpBody = serde_json::from_value(json!({
            "access_token": "t",
            "user": { "id": id, "user_metadata": { "full_name": "Ada" } },
        }))
        .unwrap();
        assert!(matches!(session, SignUpBody::Session(ref s) if s.user.id == id));
    }

    #[test]
    fn error_text_prefers_msg() {
        let body = ErrorBody {
            msg: Some("User already registered".to_owned()),
            error: Some("x".to_owned()),
            ..ErrorBody::default()
        };
        assert_eq!(body.text().as_deref(), Some("User already registered"));
    }
}
