//! In-process stand-in for the hosted backend.
//!
//! Implements every backend trait over `RwLock`ed maps. The server uses it
//! when no hosted backend is configured, and the tests use it everywhere.
//! Passwords are kept as given; this is not an auth system.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthProvider, AvatarStorage, ChatStore, IntegrationStore, ProfileStore};
use crate::error::BackendError;
use crate::models::{
    AuthUser, ChatMessage, IntegrationRecord, NewChatMessage, Profile, Session, SignUpOutcome,
};

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, Profile>,
    integrations: HashMap<(Uuid, String), IntegrationRecord>,
    messages: Vec<ChatMessage>,
    objects: HashMap<String, (Vec<u8>, String)>,
}

/// Shared in-memory backend. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
    tables_offline: Arc<AtomicBool>,
    sign_up_calls: Arc<AtomicUsize>,
    public_base: Arc<str>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            tables_offline: Arc::default(),
            sign_up_calls: Arc::default(),
            public_base: Arc::from("memory://avatars"),
        }
    }

    /// Make every table operation fail with [`BackendError::NotReady`], as a
    /// freshly provisioned project without its tables would.
    pub fn set_tables_offline(&self, offline: bool) {
        self.tables_offline.store(offline, Ordering::SeqCst);
    }

    /// How many times `sign_up` has been called.
    #[must_use]
    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    /// Bytes and content type of a stored object.
    pub async fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.inner.read().await.objects.get(path).cloned()
    }

    fn tables(&self, table: &str) -> Result<(), BackendError> {
        if self.tables_offline.load(Ordering::SeqCst) {
            return Err(BackendError::NotReady {
                reason: format!("relation \"{table}\" does not exist"),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        _redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        let key = email.trim().to_lowercase();
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&key) {
            return Err(BackendError::Conflict {
                reason: "User already registered".to_owned(),
            });
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: key.clone(),
            full_name: Some(full_name.to_owned()).filter(|n| !n.is_empty()),
        };
        let id = user.id;
        inner.accounts.insert(
            key,
            Account {
                user,
                password: password.to_owned(),
            },
        );
        Ok(SignUpOutcome {
            user_id: Some(id),
            confirmation_required: false,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let key = email.trim().to_lowercase();
        let mut inner = self.inner.write().await;
        let user = match inner.accounts.get(&key) {
            Some(account) if account.password == password => account.user.clone(),
            _ => {
                return Err(BackendError::Auth {
                    reason: "Invalid login credentials".to_owned(),
                });
            }
        };
        let token = format!("mem_{}", Uuid::new_v4().as_simple());
        inner.sessions.insert(token.clone(), user.id);
        Ok(Session {
            access_token: token,
            refresh_token: None,
            expires_in: Some(3600),
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.inner.write().await.sessions.remove(access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let inner = self.inner.read().await;
        let id = inner
            .sessions
            .get(access_token)
            .ok_or_else(|| BackendError::Auth {
                reason: "invalid or expired session".to_owned(),
            })?;
        inner
            .accounts
            .values()
            .find(|a| a.user.id == *id)
            .map(|a| a.user.clone())
            .ok_or_else(|| BackendError::NotFound {
                what: format!("user {id}"),
            })
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryBackend {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
        self.tables("users")?;
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.tables("users")?;
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.id) {
            return Err(BackendError::Conflict {
                reason: format!("profile {} already exists", profile.id),
            });
        }
        inner.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.tables("users")?;
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl IntegrationStore for MemoryBackend {
    async fn list_integrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<IntegrationRecord>, BackendError> {
        self.tables("integrations")?;
        let inner = self.inner.read().await;
        let mut rows: Vec<_> = inner
            .integrations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.integration_name.cmp(&b.integration_name));
        Ok(rows)
    }

    async fn upsert_integration(&self, record: &IntegrationRecord) -> Result<(), BackendError> {
        self.tables("integrations")?;
        self.inner.write().await.integrations.insert(
            (record.user_id, record.integration_name.clone()),
            record.clone(),
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatStore for MemoryBackend {
    async fn recent_messages(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, BackendError> {
        self.tables("chat_messages")?;
        let inner = self.inner.read().await;
        let mine: Vec<_> = inner
            .messages
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        let skip = mine.len().saturating_sub(limit);
        Ok(mine.into_iter().skip(skip).collect())
    }

    async fn insert_message(&self, message: &NewChatMessage) -> Result<ChatMessage, BackendError> {
        self.tables("chat_messages")?;
        let stored = ChatMessage {
            id: Uuid::new_v4(),
            user_id: message.user_id,
            role: message.role,
            content: message.content.clone(),
            created_at: Utc::now(),
        };
        self.inner.write().await.messages.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait::async_trait]
impl AvatarStorage for MemoryBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.write().await;
        if !upsert && inner.objects.contains_key(path) {
            return Err(BackendError::Conflict {
                reason: format!("object {path} already exists"),
            });
        }
        inner
            .objects
            .insert(path.to_owned(), (bytes, content_type.to_owned()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{path}", self.public_base)
    }
}
