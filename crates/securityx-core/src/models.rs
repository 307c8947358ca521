//! Data models shared by the core and the server.
//!
//! Three row types are persisted by the hosted backend (profiles,
//! integration credentials, chat messages). The rest describe auth sessions
//! and the sign-up data parked locally until the first dashboard visit.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Rows ─────────────────────────────────────────────────────────────

/// A user profile (`users` table). One per auth user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Name to show in the UI; `User` when none was recorded.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("User")
    }
}

/// Per-user credentials for one integration (`integrations` table).
///
/// Unique on `(user_id, integration_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub user_id: Uuid,
    pub integration_name: String,
    pub credentials: BTreeMap<String, String>,
    pub connected: bool,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown chat role: {other}")),
        }
    }
}

/// A stored chat message (`chat_messages` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A chat message about to be inserted; the backend assigns id and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChatMessage {
    pub user_id: Uuid,
    pub role: ChatRole,
    pub content: String,
}

// ── Auth ─────────────────────────────────────────────────────────────

/// The user behind a valid session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    /// `full_name` from the sign-up metadata, if any.
    pub full_name: Option<String>,
}

/// Tokens returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpOutcome {
    /// Id of the created auth user, when the backend returns one.
    pub user_id: Option<Uuid>,
    /// Whether the backend requires the user to confirm their email first.
    pub confirmation_required: bool,
}

// ── Pending sign-up data ─────────────────────────────────────────────

/// Avatar picked on the sign-up form, held until the profile exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAvatar {
    pub file_name: String,
    pub content_type: String,
    /// Base64-encoded file bytes.
    pub data: String,
}

impl PendingAvatar {
    /// Lower-cased extension of the uploaded file name.
    ///
    /// Anything other than one to five ASCII letters or digits becomes
    /// `png`, so the name can never add segments to the storage path.
    #[must_use]
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| (1..=5).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
            .unwrap_or("png")
            .to_ascii_lowercase()
    }
}

/// Profile data captured at sign-up, keyed by the new user's id in the
/// local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingProfile {
    pub full_name: String,
    pub email: String,
    pub avatar: Option<PendingAvatar>,
}

impl PendingProfile {
    /// Local store key for the pending data of `user_id`.
    #[must_use]
    pub fn storage_key(user_id: Uuid) -> String {
        format!("pending_profile/{user_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_user() {
        let mut profile = Profile {
            id: Uuid::nil(),
            email: "a@b.co".to_owned(),
            full_name: None,
            avatar_url: None,
        };
        assert_eq!(profile.display_name(), "User");
        profile.full_name = Some("  ".to_owned());
        assert_eq!(profile.display_name(), "User");
        profile.full_name = Some("Ada".to_owned());
        assert_eq!(profile.display_name(), "Ada");
    }

    #[test]
    fn avatar_extension() {
        let avatar = |name: &str| PendingAvatar {
            file_name: name.to_owned(),
            content_type: "image/png".to_owned(),
            data: String::new(),
        };
        assert_eq!(avatar("me.JPG").extension(), "jpg");
        assert_eq!(avatar("archive.tar.gz").extension(), "gz");
        assert_eq!(avatar("noext").extension(), "png");
        assert_eq!(avatar("me.png/x").extension(), "png");
        assert_eq!(avatar("me.png/../../other").extension(), "png");
        assert_eq!(avatar("me.").extension(), "png");
        assert_eq!(avatar("me.verylongext").extension(), "png");
        assert_eq!(avatar("me.wébp").extension(), "png");
    }

    #[test]
    fn pending_key_uses_user_id() {
        assert_eq!(
            PendingProfile::storage_key(Uuid::nil()),
            "pending_profile/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn chat_role_wire_format() {
        assert_eq!(serde_json::to_string(&ChatRole::Assistant).ok().as_deref(), Some("\"assistant\""));
        assert_eq!("user".parse::<ChatRole>(), Ok(ChatRole::User));
        assert!("system".parse::<ChatRole>().is_err());
    }
}
