//! Server configuration for `SecurityX`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Everything the hosted services need is optional: without it the server
//! runs against in-process stand-ins.

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Where fallback snapshots and pending sign-up data are kept.
    pub local_store: LocalStoreType,
    /// Artificial latency before a chat reply is returned.
    pub chat_delay: Duration,
    /// How long an untouched dashboard stays in memory.
    pub dashboard_idle: Duration,
    /// Public base URL of the site, used in confirmation email redirects.
    pub site_url: String,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
    /// Hosted auth and file storage (None runs the in-memory backend).
    pub supabase: Option<SupabaseConfig>,
    /// Postgres connection string for the row tables.
    pub database_url: Option<String>,
    /// Contact form delivery (None logs the message instead).
    pub emailjs: Option<EmailJsConfig>,
}

/// Connection settings for the hosted auth and storage APIs.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    /// Public anon key sent as `apikey`.
    pub anon_key: String,
    /// Service role key for server-side uploads; the anon key is used when
    /// unset, which requires a bucket policy allowing it.
    pub service_key: Option<String>,
    /// Bucket holding profile pictures.
    pub avatar_bucket: String,
}

/// Settings for the email relay used by the contact form.
#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    /// Recipient of contact form messages.
    pub to_email: String,
}

/// Supported local store types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStoreType {
    /// In-memory (lost on restart).
    Memory,
    /// Redb file at `path`.
    Redb { path: String },
}

const DEFAULT_CHAT_DELAY_MS: u64 = 800;
const DEFAULT_DASHBOARD_IDLE_SECS: u64 = 30 * 60;

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0`
    /// - `SECURITYX_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `SECURITYX_LOG_LEVEL`: log filter (default: `info`)
    /// - `SECURITYX_LOCAL_STORE`: `memory` or a redb file path (default: `memory`)
    /// - `SECURITYX_CHAT_DELAY_MS`: chat reply latency (default: `800`)
    /// - `SECURITYX_DASHBOARD_IDLE_SECS`: drop dashboards idle this long (default: `1800`)
    /// - `SECURITYX_SITE_URL`: public site URL (default: `http://<bind addr>`)
    /// - `SECURITYX_SECURE_COOKIES`: set `Secure` on the session cookie (default: `false`)
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `SUPABASE_AVATAR_BUCKET` (default: `avatars`)
    /// - `SUPABASE_SERVICE_ROLE_KEY`: key for avatar uploads (default: the anon key)
    /// - `DATABASE_URL`: Postgres for the `users`, `integrations` and `chat_messages` tables
    /// - `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`, `EMAILJS_PUBLIC_KEY`, `CONTACT_TO_EMAIL`
    #[must_use]
    pub fn from_env() -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 3000));
        let bind_addr = if let Ok(addr) = std::env::var("SECURITYX_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(3000);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            default_addr
        };

        let log_level = std::env::var("SECURITYX_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        let local_store = match std::env::var("SECURITYX_LOCAL_STORE") {
            Ok(v) if !v.is_empty() && !v.eq_ignore_ascii_case("memory") => {
                LocalStoreType::Redb { path: v }
            }
            _ => LocalStoreType::Memory,
        };

        let chat_delay = Duration::from_millis(
            std::env::var("SECURITYX_CHAT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHAT_DELAY_MS),
        );

        let dashboard_idle = Duration::from_secs(
            std::env::var("SECURITYX_DASHBOARD_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DASHBOARD_IDLE_SECS),
        );

        let site_url = std::env::var("SECURITYX_SITE_URL")
            .unwrap_or_else(|_| format!("http://{bind_addr}"))
            .trim_end_matches('/')
            .to_owned();

        let secure_cookies = std::env::var("SECURITYX_SECURE_COOKIES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        // Hosted backend: enabled when both URL and key are set.
        let supabase = match (
            std::env::var("SUPABASE_URL"),
            std::env::var("SUPABASE_ANON_KEY"),
        ) {
            (Ok(url), Ok(anon_key)) if !url.is_empty() && !anon_key.is_empty() => {
                Some(SupabaseConfig {
                    url: url.trim_end_matches('/').to_owned(),
                    anon_key,
                    service_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                        .ok()
                        .filter(|v| !v.is_empty()),
                    avatar_bucket: std::env::var("SUPABASE_AVATAR_BUCKET")
                        .unwrap_or_else(|_| "avatars".to_owned()),
                })
            }
            _ => None,
        };

        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let emailjs = match (
            std::env::var("EMAILJS_SERVICE_ID"),
            std::env::var("EMAILJS_TEMPLATE_ID"),
            std::env::var("EMAILJS_PUBLIC_KEY"),
        ) {
            (Ok(service_id), Ok(template_id), Ok(public_key)) => Some(EmailJsConfig {
                service_id,
                template_id,
                public_key,
                to_email: std::env::var("CONTACT_TO_EMAIL")
                    .unwrap_or_else(|_| "contact@securityx.app".to_owned()),
            }),
            _ => None,
        };

        Self {
            bind_addr,
            log_level,
            local_store,
            chat_delay,
            dashboard_idle,
            site_url,
            secure_cookies,
            supabase,
            database_url,
            emailjs,
        }
    }
}

impl Default for ServerConfig {
    /// Development defaults: everything in memory, no artificial delay.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_owned(),
            local_store: LocalStoreType::Memory,
            chat_delay: Duration::ZERO,
            dashboard_idle: Duration::from_secs(DEFAULT_DASHBOARD_IDLE_SECS),
            site_url: "http://localhost:3000".to_owned(),
            secure_cookies: false,
            supabase: None,
            database_url: None,
            emailjs: None,
        }
    }
}
