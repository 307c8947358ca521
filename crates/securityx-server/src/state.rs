//! Shared application state for the `SecurityX` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the backend adapters, the local tier,
//! and the per-user dashboard state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use securityx_core::backend::{
    AuthProvider, AvatarStorage, ChatStore, IntegrationStore, MemoryBackend, ProfileStore,
};
use securityx_core::dashboard::DashboardState;
use securityx_core::realtime::ProfileFeed;
use securityx_core::repository::{IntegrationRepository, PendingProfiles, Tier};
use securityx_storage::StorageBackend;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::mail::{LogMailer, Mailer};
use crate::profiles::ProfileService;

/// The adapters the server talks to.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub integrations: Arc<dyn IntegrationStore>,
    pub chat: Arc<dyn ChatStore>,
    pub avatars: Arc<dyn AvatarStorage>,
    pub mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Every adapter backed by one in-memory backend; mail is logged.
    #[must_use]
    pub fn in_memory(backend: &MemoryBackend) -> Self {
        Self {
            auth: Arc::new(backend.clone()),
            profiles: Arc::new(backend.clone()),
            integrations: Arc::new(backend.clone()),
            chat: Arc::new(backend.clone()),
            avatars: Arc::new(backend.clone()),
            mailer: Arc::new(LogMailer),
        }
    }
}

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Sign-up, sign-in, and session lookup.
    pub auth: Arc<dyn AuthProvider>,
    /// Profile rows, avatar uploads, and change notifications.
    pub profiles: ProfileService,
    /// Integration cards with local fallback.
    pub integrations: IntegrationRepository,
    /// Chat history.
    pub chat: Arc<dyn ChatStore>,
    /// Sign-up data waiting for the first dashboard visit.
    pub pending: PendingProfiles,
    /// Contact form delivery.
    pub mailer: Arc<dyn Mailer>,
    /// Dashboard state per signed-in user.
    dashboards: RwLock<HashMap<Uuid, CachedDashboard>>,
    /// Dashboards untouched for this long are dropped on the next load.
    dashboard_idle: Duration,
    /// Artificial latency before a chat reply.
    pub chat_delay: Duration,
    /// Public site URL for confirmation redirects.
    pub site_url: String,
    /// Whether the session cookie is marked `Secure`.
    pub secure_cookies: bool,
    /// Flipped to `true` on shutdown; ends long-lived event streams.
    pub shutdown: watch::Sender<bool>,
}

/// A loaded dashboard and when a request last touched it.
struct CachedDashboard {
    state: DashboardState,
    last_used: Instant,
}

fn evict_idle(dashboards: &mut HashMap<Uuid, CachedDashboard>, now: Instant, idle: Duration) -> usize {
    let before = dashboards.len();
    dashboards.retain(|_, d| now.saturating_duration_since(d.last_used) < idle);
    before - dashboards.len()
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    #[must_use]
    pub fn new(services: Services, local: Arc<dyn StorageBackend>, config: &ServerConfig) -> Self {
        let pending = PendingProfiles::new(Arc::clone(&local));
        let profiles = ProfileService::new(
            services.profiles,
            services.avatars,
            pending.clone(),
            ProfileFeed::new(),
        );
        Self {
            auth: services.auth,
            profiles,
            integrations: IntegrationRepository::new(services.integrations, local),
            chat: services.chat,
            pending,
            mailer: services.mailer,
            dashboards: RwLock::new(HashMap::new()),
            dashboard_idle: config.dashboard_idle,
            chat_delay: config.chat_delay,
            site_url: config.site_url.clone(),
            secure_cookies: config.secure_cookies,
            shutdown: watch::Sender::new(false),
        }
    }

    /// Load the user's dashboard if it is not in memory yet.
    ///
    /// Returns the tier the cards came from, or `None` if the dashboard was
    /// already loaded.
    ///
    /// # Errors
    ///
    /// Fails only when neither tier can serve the integration cards.
    pub async fn load_dashboard(&self, user_id: Uuid) -> Result<Option<Tier>, AppError> {
        if let Some(entry) = self.dashboards.write().await.get_mut(&user_id) {
            entry.last_used = Instant::now();
            return Ok(None);
        }
        let (cards, tier) = self.integrations.load(user_id).await?;
        let now = Instant::now();
        let mut dashboards = self.dashboards.write().await;
        let evicted = evict_idle(&mut dashboards, now, self.dashboard_idle);
        if evicted > 0 {
            tracing::debug!(evicted, "idle dashboards dropped");
        }
        dashboards.entry(user_id).or_insert_with(|| CachedDashboard {
            state: DashboardState::with_cards(cards),
            last_used: now,
        });
        tracing::debug!(%user_id, ?tier, "dashboard loaded");
        Ok(Some(tier))
    }

    /// Run `f` against the user's dashboard, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Propagates load failures.
    pub async fn with_dashboard<R>(
        &self,
        user_id: Uuid,
        f: impl FnOnce(&mut DashboardState) -> R,
    ) -> Result<R, AppError> {
        self.load_dashboard(user_id).await?;
        let mut dashboards = self.dashboards.write().await;
        let entry = dashboards
            .get_mut(&user_id)
            .ok_or_else(|| AppError::Internal(format!("dashboard for {user_id} vanished")))?;
        entry.last_used = Instant::now();
        Ok(f(&mut entry.state))
    }

    /// Forget the user's dashboard (on sign-out).
    pub async fn drop_dashboard(&self, user_id: Uuid) {
        self.dashboards.write().await.remove(&user_id);
    }

    /// Drop every dashboard idle at `now`, returning how many went.
    pub async fn evict_idle_dashboards(&self, now: Instant) -> usize {
        evict_idle(&mut *self.dashboards.write().await, now, self.dashboard_idle)
    }

    /// Number of dashboards held in memory.
    pub async fn cached_dashboards(&self) -> usize {
        self.dashboards.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn state(idle: Duration) -> AppState {
        let config = ServerConfig {
            dashboard_idle: idle,
            ..ServerConfig::default()
        };
        AppState::new(
            Services::in_memory(&MemoryBackend::new()),
            Arc::new(securityx_storage::MemoryBackend::new()),
            &config,
        )
    }

    #[tokio::test]
    async fn idle_dashboards_are_evicted() {
        let state = state(Duration::from_secs(60));
        let user = Uuid::new_v4();
        state.with_dashboard(user, |d| d.set_drawer(true)).await.unwrap();

        let soon = Instant::now() + Duration::from_secs(30);
        assert_eq!(state.evict_idle_dashboards(soon).await, 0);
        assert_eq!(state.cached_dashboards().await, 1);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(state.evict_idle_dashboards(later).await, 1);
        assert_eq!(state.cached_dashboards().await, 0);

        // Reloading starts from a fresh view.
        let drawer = state.with_dashboard(user, |d| d.drawer_open).await.unwrap();
        assert!(!drawer);
    }

    #[tokio::test]
    async fn loading_a_dashboard_sweeps_idle_ones() {
        let state = state(Duration::ZERO);
        let first = Uuid::new_v4();
        assert!(state.load_dashboard(first).await.unwrap().is_some());
        assert!(state.load_dashboard(Uuid::new_v4()).await.unwrap().is_some());
        assert_eq!(state.cached_dashboards().await, 1);
        assert!(state.load_dashboard(first).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn loaded_dashboard_is_reused() {
        let state = state(Duration::from_secs(60));
        let user = Uuid::new_v4();
        assert!(state.load_dashboard(user).await.unwrap().is_some());
        assert!(state.load_dashboard(user).await.unwrap().is_none());
        state.drop_dashboard(user).await;
        assert_eq!(state.cached_dashboards().await, 0);
    }
}
