//! Seams with the hosted backend-as-a-service.
//!
//! The hosted backend provides authentication, three tables, and a file
//! bucket. Each capability is a separate trait so the server can mix
//! adapters (e.g. hosted auth with direct Postgres rows), and so tests can
//! run the whole application against [`MemoryBackend`].
//!
//! Calls are made once. There is no retry, backoff, or cancellation.

mod memory;

pub use memory::MemoryBackend;

use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{
    AuthUser, ChatMessage, IntegrationRecord, NewChatMessage, Profile, Session, SignUpOutcome,
};

/// Email/password authentication and sessions.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Register a user. `full_name` is stored as user metadata and
    /// `redirect_to` is where the confirmation email sends them.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    /// Invalidate a session token.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Resolve a session token to its user.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;
}

/// The `users` (profile) table.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError>;

    /// Insert a new profile. Fails with [`BackendError::Conflict`] if one
    /// exists.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError>;

    /// Insert or overwrite.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), BackendError>;
}

/// The `integrations` table.
#[async_trait::async_trait]
pub trait IntegrationStore: Send + Sync + 'static {
    async fn list_integrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<IntegrationRecord>, BackendError>;

    /// Insert or overwrite on `(user_id, integration_name)`.
    async fn upsert_integration(&self, record: &IntegrationRecord) -> Result<(), BackendError>;
}

/// The `chat_messages` table.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync + 'static {
    /// The latest `limit` messages of the user, returned oldest first.
    async fn recent_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, BackendError>;

    async fn insert_message(&self, message: &NewChatMessage) -> Result<ChatMessage, BackendError>;
}

/// The avatar bucket.
#[async_trait::async_trait]
pub trait AvatarStorage: Send + Sync + 'static {
    /// Upload `bytes` at `path`, replacing any existing object when
    /// `upsert` is set.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError>;

    /// Public URL of the object at `path`. Does not check existence.
    fn public_url(&self, path: &str) -> String;
}

/// Object path of a user's avatar: `<user_id>/<user_id>.<ext>`.
#[must_use]
pub fn avatar_path(user_id: Uuid, extension: &str) -> String {
    format!("{user_id}/{user_id}.{extension}")
}
