//! `SecurityX` server entry point.
//!
//! Picks the backend adapters from the environment, opens the local store,
//! then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use securityx_core::backend::MemoryBackend;
use securityx_storage::StorageBackend;

use securityx_server::config::{LocalStoreType, ServerConfig};
use securityx_server::mail::EmailJsMailer;
use securityx_server::remote::SupabaseClient;
use securityx_server::routes;
use securityx_server::state::{AppState, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(local_store = ?config.local_store, "SecurityX starting");

    let local = open_local_store(&config)?;
    let services = build_services(&config).await?;
    let state = Arc::new(AppState::new(services, local, &config));

    let app = routes::build_router(Arc::clone(&state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, site_url = %config.site_url, "SecurityX server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("server error")?;

    info!("SecurityX server stopped");
    Ok(())
}

fn open_local_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match &config.local_store {
        LocalStoreType::Memory => {
            info!("using in-memory local store (fallback data will not persist)");
            Ok(Arc::new(securityx_storage::MemoryBackend::new()))
        }
        #[cfg(feature = "redb-backend")]
        LocalStoreType::Redb { path } => {
            info!(path = %path, "using redb local store");
            Ok(Arc::new(
                securityx_storage::RedbBackend::open(path)
                    .context("failed to open redb local store")?,
            ))
        }
        #[cfg(not(feature = "redb-backend"))]
        LocalStoreType::Redb { .. } => {
            anyhow::bail!("redb local store requested but feature 'redb-backend' is not enabled");
        }
    }
}

/// Choose an adapter for each backend concern.
///
/// Anything not configured falls back to one shared in-memory backend, so a
/// bare `cargo run` gives a working site.
async fn build_services(config: &ServerConfig) -> anyhow::Result<Services> {
    let memory = MemoryBackend::new();
    let mut services = Services::in_memory(&memory);
    let http = reqwest::Client::new();

    if let Some(supabase) = &config.supabase {
        info!(url = %supabase.url, bucket = %supabase.avatar_bucket, "using hosted auth and storage");
        let client = SupabaseClient::new(http.clone(), supabase.clone());
        services.auth = Arc::new(client.clone());
        services.avatars = Arc::new(client);
    } else {
        warn!("SUPABASE_URL not set, accounts live in memory and vanish on restart");
    }

    match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            info!(url = %"[redacted]", "using PostgreSQL row tables");
            let rows = securityx_server::remote::PostgresRows::connect(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            services.profiles = Arc::new(rows.clone());
            services.integrations = Arc::new(rows.clone());
            services.chat = Arc::new(rows);
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            anyhow::bail!("DATABASE_URL set but feature 'postgres' is not enabled");
        }
        None => info!("DATABASE_URL not set, row tables live in memory"),
    }

    if let Some(emailjs) = &config.emailjs {
        info!(service_id = %emailjs.service_id, "contact form sends through EmailJS");
        services.mailer = Arc::new(EmailJsMailer::new(http, emailjs.clone()));
    } else {
        info!("EmailJS not configured, contact messages are logged only");
    }

    Ok(services)
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then close open event streams so
/// in-flight connections can drain.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    state.shutdown.send_replace(true);
}
