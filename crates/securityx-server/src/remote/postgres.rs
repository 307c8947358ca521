//! Row tables in Postgres.
//!
//! Talks to the hosted project's database directly. The tables are owned by
//! the hosted project and are not created here: a missing table surfaces as
//! [`BackendError::NotReady`], which sends integration writes to the local
//! fallback.
//!
//! Feature-gated behind `postgres`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use securityx_core::backend::{ChatStore, IntegrationStore, ProfileStore};
use securityx_core::error::BackendError;
use securityx_core::models::{ChatMessage, IntegrationRecord, NewChatMessage, Profile};

const UNDEFINED_TABLE: &str = "42P01";
const UNIQUE_VIOLATION: &str = "23505";

/// `users`, `integrations` and `chat_messages` over a connection pool.
#[derive(Clone)]
pub struct PostgresRows {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRows")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

fn db_error(table: &str, err: &sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
            BackendError::NotReady {
                reason: format!("table {table} does not exist"),
            }
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            BackendError::Conflict {
                reason: db.to_string(),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => BackendError::Decode {
            reason: err.to_string(),
        },
        _ => BackendError::Transport {
            reason: err.to_string(),
        },
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IntegrationRow {
    user_id: Uuid,
    integration_name: String,
    credentials: Json<BTreeMap<String, String>>,
    connected: bool,
}

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    user_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChatRow> for ChatMessage {
    type Error = BackendError;

    fn try_from(row: ChatRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            role: row
                .role
                .parse()
                .map_err(|reason| BackendError::Decode { reason })?,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

impl PostgresRows {
    /// Connect a pool.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if no connection can be made.
    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| BackendError::Transport {
                reason: format!("postgres connect failed: {e}"),
            })?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgresRows {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, full_name, avatar_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("users", &e))?;
        Ok(row.map(Profile::from))
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        sqlx::query(
            "INSERT INTO users (id, email, full_name, avatar_url) VALUES ($1, $2, $3, $4)",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("users", &e))?;
        Ok(())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        sqlx::query(
            r"INSERT INTO users (id, email, full_name, avatar_url) VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE
              SET email = EXCLUDED.email,
                  full_name = EXCLUDED.full_name,
                  avatar_url = EXCLUDED.avatar_url",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("users", &e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IntegrationStore for PostgresRows {
    async fn list_integrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<IntegrationRecord>, BackendError> {
        let rows = sqlx::query_as::<_, IntegrationRow>(
            r"SELECT user_id, integration_name, credentials, connected
              FROM integrations WHERE user_id = $1
              ORDER BY integration_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("integrations", &e))?;

        Ok(rows
            .into_iter()
            .map(|row| IntegrationRecord {
                user_id: row.user_id,
                integration_name: row.integration_name,
                credentials: row.credentials.0,
                connected: row.connected,
            })
            .collect())
    }

    async fn upsert_integration(&self, record: &IntegrationRecord) -> Result<(), BackendError> {
        sqlx::query(
            r"INSERT INTO integrations (user_id, integration_name, credentials, connected)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (user_id, integration_name) DO UPDATE
              SET credentials = EXCLUDED.credentials,
                  connected = EXCLUDED.connected",
        )
        .bind(record.user_id)
        .bind(&record.integration_name)
        .bind(Json(&record.credentials))
        .bind(record.connected)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("integrations", &e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatStore for PostgresRows {
    async fn recent_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, BackendError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ChatRow>(
            r"SELECT id, user_id, role, content, created_at FROM (
                  SELECT id, user_id, role, content, created_at
                  FROM chat_messages WHERE user_id = $1
                  ORDER BY created_at DESC
                  LIMIT $2
              ) latest ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("chat_messages", &e))?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn insert_message(&self, message: &NewChatMessage) -> Result<ChatMessage, BackendError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r"INSERT INTO chat_messages (user_id, role, content)
              VALUES ($1, $2, $3)
              RETURNING id, user_id, role, content, created_at",
        )
        .bind(message.user_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("chat_messages", &e))?;

        row.try_into()
    }
}
