//! Profile lookup and first-visit provisioning.
//!
//! Sign-up only creates the auth user. The profile row is created the first
//! time the user opens the dashboard, from the data parked at sign-up.

use std::sync::Arc;

use base64::Engine;

use securityx_core::backend::{AvatarStorage, ProfileStore, avatar_path};
use securityx_core::models::{AuthUser, PendingAvatar, PendingProfile, Profile};
use securityx_core::realtime::{ChangeKind, ProfileChange, ProfileFeed};
use securityx_core::repository::PendingProfiles;

use crate::error::AppError;

/// Outcome of [`ProfileService::ensure`].
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub profile: Profile,
    /// True only when this call inserted the row.
    pub created: bool,
}

/// Profiles, avatars, and the change feed, used together.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    avatars: Arc<dyn AvatarStorage>,
    pending: PendingProfiles,
    feed: ProfileFeed,
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService").finish_non_exhaustive()
    }
}

/// Profile shown when no row exists (or the table is unavailable).
fn fallback_profile(user: &AuthUser) -> Profile {
    Profile {
        id: user.id,
        email: user.email.clone(),
        full_name: Some(
            user.full_name
                .clone()
                .unwrap_or_else(|| "User".to_owned()),
        ),
        avatar_url: None,
    }
}

impl ProfileService {
    #[must_use]
    pub fn new(
        store: Arc<dyn ProfileStore>,
        avatars: Arc<dyn AvatarStorage>,
        pending: PendingProfiles,
        feed: ProfileFeed,
    ) -> Self {
        Self {
            store,
            avatars,
            pending,
            feed,
        }
    }

    #[must_use]
    pub fn feed(&self) -> &ProfileFeed {
        &self.feed
    }

    /// The stored profile, or one built from the auth user.
    pub async fn current(&self, user: &AuthUser) -> Profile {
        match self.store.get_profile(user.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => fallback_profile(user),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "profile lookup failed");
                fallback_profile(user)
            }
        }
    }

    /// Return the user's profile, creating it on the first visit.
    ///
    /// Creation uses the sign-up data parked under the user's id when
    /// present: its name, and
    /// its avatar uploaded to `<user_id>/<user_id>.<ext>`. A failed upload
    /// leaves the profile without an avatar. If the insert fails the
    /// in-memory profile is still returned, with `created` unset.
    pub async fn ensure(&self, user: &AuthUser) -> Provisioned {
        match self.store.get_profile(user.id).await {
            Ok(Some(profile)) => {
                return Provisioned {
                    profile,
                    created: false,
                };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "profile table unavailable");
                return Provisioned {
                    profile: fallback_profile(user),
                    created: false,
                };
            }
        }

        let pending = match self.pending.get(user.id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "could not read pending sign-up data");
                None
            }
        };

        let mut profile = fallback_profile(user);
        if let Some(PendingProfile {
            full_name,
            email,
            avatar,
        }) = pending
        {
            if !full_name.trim().is_empty() {
                profile.full_name = Some(full_name);
            }
            if !email.trim().is_empty() {
                profile.email = email;
            }
            if let Some(avatar) = avatar {
                profile.avatar_url = self.upload_avatar(user, &avatar).await;
            }
        }

        if let Err(e) = self.store.insert_profile(&profile).await {
            tracing::error!(user_id = %user.id, error = %e, "profile insert failed");
            return Provisioned {
                profile,
                created: false,
            };
        }

        if let Err(e) = self.pending.remove(user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "could not clear pending sign-up data");
        }
        self.feed.publish(ProfileChange {
            kind: ChangeKind::Insert,
            new: profile.clone(),
        });
        tracing::info!(user_id = %user.id, "profile created");

        Provisioned {
            profile,
            created: true,
        }
    }

    /// Overwrite the display name.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the row cannot be written.
    pub async fn rename(&self, user: &AuthUser, full_name: &str) -> Result<Profile, AppError> {
        let mut profile = self.current(user).await;
        profile.full_name = Some(full_name.trim().to_owned());
        self.store.upsert_profile(&profile).await?;
        self.feed.publish(ProfileChange {
            kind: ChangeKind::Update,
            new: profile.clone(),
        });
        Ok(profile)
    }

    async fn upload_avatar(&self, user: &AuthUser, avatar: &PendingAvatar) -> Option<String> {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(&avatar.data) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "pending avatar is not valid base64");
                return None;
            }
        };
        let path = avatar_path(user.id, &avatar.extension());
        match self
            .avatars
            .upload(&path, bytes, &avatar.content_type, true)
            .await
        {
            Ok(()) => Some(self.avatars.public_url(&path)),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "avatar upload failed");
                None
            }
        }
    }
}
