//! Two-tier integration repository and the pending sign-up store.
//!
//! Integration rows live in the hosted backend. When the backend cannot
//! serve a request, the whole card list is written to (or read from) the
//! local store under `integrations/<user_id>` instead.
//!
//! Conflict policy: the remote tier is authoritative whenever it answers.
//! A local snapshot is only read when the remote read fails, and nothing
//! copies local snapshots back to the remote tier. The two can diverge;
//! no merge is attempted.

use std::sync::Arc;

use securityx_storage::StorageBackend;
use uuid::Uuid;

use crate::backend::IntegrationStore;
use crate::error::RepositoryError;
use crate::integration::{
    CardSnapshot, IntegrationCard, cards_from_records, cards_from_snapshot, default_cards,
};
use crate::models::PendingProfile;

/// Which tier served or stored the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Remote,
    Local,
}

/// Integration cards, remote first, local fallback.
#[derive(Clone)]
pub struct IntegrationRepository {
    remote: Arc<dyn IntegrationStore>,
    local: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for IntegrationRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationRepository").finish_non_exhaustive()
    }
}

fn snapshot_key(user_id: Uuid) -> String {
    format!("integrations/{user_id}")
}

impl IntegrationRepository {
    #[must_use]
    pub fn new(remote: Arc<dyn IntegrationStore>, local: Arc<dyn StorageBackend>) -> Self {
        Self { remote, local }
    }

    /// Load the user's cards.
    ///
    /// Remote rows are overlaid on the catalog. If the remote read fails,
    /// the local snapshot is used; with no snapshot, the bare catalog.
    ///
    /// # Errors
    ///
    /// Returns an error only when the remote read failed *and* the local
    /// snapshot could not be read or decoded.
    pub async fn load(
        &self,
        user_id: Uuid,
    ) -> Result<(Vec<IntegrationCard>, Tier), RepositoryError> {
        match self.remote.list_integrations(user_id).await {
            Ok(records) => Ok((cards_from_records(&records), Tier::Remote)),
            Err(e) => {
                tracing::info!(%user_id, error = %e, "integrations table unavailable, using local snapshot");
                let cards = match self.local.get(&snapshot_key(user_id)).await? {
                    Some(bytes) => {
                        let snapshot: Vec<CardSnapshot> = serde_json::from_slice(&bytes)?;
                        cards_from_snapshot(&snapshot)
                    }
                    None => default_cards(),
                };
                Ok((cards, Tier::Local))
            }
        }
    }

    /// Persist card `index` after a change.
    ///
    /// Upserts that card's row remotely. If that fails, the full card list
    /// is written to the local snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UnknownIntegration`] for a bad index, or a
    /// storage error when the remote upsert and the local write both fail.
    pub async fn save(
        &self,
        user_id: Uuid,
        cards: &[IntegrationCard],
        index: usize,
    ) -> Result<Tier, RepositoryError> {
        let card = cards
            .get(index)
            .ok_or(RepositoryError::UnknownIntegration { index })?;

        match self.remote.upsert_integration(&card.to_record(user_id)).await {
            Ok(()) => {
                tracing::debug!(%user_id, integration = card.name(), "integration saved");
                Ok(Tier::Remote)
            }
            Err(e) => {
                tracing::info!(%user_id, error = %e, "integrations table unavailable, saving local snapshot");
                let snapshot: Vec<CardSnapshot> = cards.iter().map(CardSnapshot::from).collect();
                let bytes = serde_json::to_vec(&snapshot)?;
                self.local.put(&snapshot_key(user_id), &bytes).await?;
                Ok(Tier::Local)
            }
        }
    }
}

/// Sign-up data parked in the local store until the first dashboard visit.
#[derive(Clone)]
pub struct PendingProfiles {
    local: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for PendingProfiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingProfiles").finish_non_exhaustive()
    }
}

impl PendingProfiles {
    #[must_use]
    pub fn new(local: Arc<dyn StorageBackend>) -> Self {
        Self { local }
    }

    /// Store (or replace) the pending data for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the local write fails.
    pub async fn put(&self, user_id: Uuid, pending: &PendingProfile) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(pending)?;
        self.local
            .put(&PendingProfile::storage_key(user_id), &bytes)
            .await?;
        Ok(())
    }

    /// Pending data for `user_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the local read or decoding fails.
    pub async fn get(&self, user_id: Uuid) -> Result<Option<PendingProfile>, RepositoryError> {
        match self.local.get(&PendingProfile::storage_key(user_id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Forget the pending data for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local delete fails.
    pub async fn remove(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        self.local
            .delete(&PendingProfile::storage_key(user_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use securityx_storage::MemoryBackend as LocalStore;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::dashboard::DashboardState;

    fn repo() -> (IntegrationRepository, MemoryBackend, LocalStore) {
        let remote = MemoryBackend::new();
        let local = LocalStore::new();
        let repo = IntegrationRepository::new(Arc::new(remote.clone()), Arc::new(local.clone()));
        (repo, remote, local)
    }

    fn connected_kubernetes() -> DashboardState {
        let mut state = DashboardState::new();
        state.set_credential(1, "apiServer", "https://k8s.local").unwrap();
        state.set_credential(1, "token", "eyJ").unwrap();
        state.connect(1).unwrap();
        state
    }

    #[tokio::test]
    async fn remote_roundtrip() {
        let (repo, _remote, local) = repo();
        let user = Uuid::new_v4();
        let state = connected_kubernetes();

        assert_eq!(repo.save(user, &state.cards, 1).await.unwrap(), Tier::Remote);
        assert!(local.is_empty().await);

        let (cards, tier) = repo.load(user).await.unwrap();
        assert_eq!(tier, Tier::Remote);
        assert_eq!(cards, state.cards);
    }

    #[tokio::test]
    async fn offline_remote_falls_back_to_local_snapshot() {
        let (repo, remote, local) = repo();
        let user = Uuid::new_v4();
        remote.set_tables_offline(true);

        let state = connected_kubernetes();
        assert_eq!(repo.save(user, &state.cards, 1).await.unwrap(), Tier::Local);
        assert_eq!(local.len().await, 1);

        let (cards, tier) = repo.load(user).await.unwrap();
        assert_eq!(tier, Tier::Local);
        assert!(cards[1].connected);
        assert_eq!(cards, state.cards);
    }

    #[tokio::test]
    async fn remote_wins_once_reachable_again() {
        let (repo, remote, _local) = repo();
        let user = Uuid::new_v4();

        remote.set_tables_offline(true);
        repo.save(user, &connected_kubernetes().cards, 1).await.unwrap();

        remote.set_tables_offline(false);
        let (cards, tier) = repo.load(user).await.unwrap();
        assert_eq!(tier, Tier::Remote);
        assert!(cards.iter().all(|c| !c.connected));
    }

    #[tokio::test]
    async fn no_snapshot_yields_catalog() {
        let (repo, remote, _local) = repo();
        remote.set_tables_offline(true);
        let (cards, tier) = repo.load(Uuid::new_v4()).await.unwrap();
        assert_eq!(tier, Tier::Local);
        assert_eq!(cards, default_cards());
    }

    #[tokio::test]
    async fn bad_index_is_rejected() {
        let (repo, _remote, _local) = repo();
        let err = repo.save(Uuid::new_v4(), &default_cards(), 42).await;
        assert!(matches!(err, Err(RepositoryError::UnknownIntegration { index: 42 })));
    }

    #[tokio::test]
    async fn pending_profiles_lifecycle() {
        let pending = PendingProfiles::new(Arc::new(LocalStore::new()));
        let profile = PendingProfile {
            full_name: "Ada".to_owned(),
            email: "Ada@Example.com".to_owned(),
            avatar: None,
        };
        let user = Uuid::new_v4();
        pending.put(user, &profile).await.unwrap();
        assert_eq!(pending.get(user).await.unwrap(), Some(profile));
        assert_eq!(pending.get(Uuid::new_v4()).await.unwrap(), None);
        pending.remove(user).await.unwrap();
        assert_eq!(pending.get(user).await.unwrap(), None);
    }
}
