//! Core library for `SecurityX`.
//!
//! Everything here is independent of HTTP: the canned-response responder
//! behind the chat widget, the password strength indicator, form validation,
//! the integration catalog and its two-tier repository, per-user dashboard
//! view state, the realtime profile feed, and the traits at the seam with
//! the hosted auth/row/file backend.

pub mod backend;
pub mod dashboard;
pub mod error;
pub mod integration;
pub mod models;
pub mod password;
pub mod realtime;
pub mod repository;
pub mod responder;
pub mod validation;
