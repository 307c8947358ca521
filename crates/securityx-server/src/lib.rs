//! `SecurityX` HTTP server.
//!
//! Wires the core library, the hosted backend adapters, and the local store
//! into a running Axum server. Serves the JSON API at `/api/*` and the web
//! pages at `/`, `/auth/*` and `/dashboard`.

pub mod config;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod profiles;
pub mod remote;
pub mod routes;
pub mod state;
