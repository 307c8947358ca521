//! Error types for `securityx-core`.
//!
//! Backend errors are deliberately coarse: the application never retries and
//! only distinguishes "the auth call was refused" from "the backend could
//! not serve the request".

use securityx_storage::StorageError;

/// Errors from calls into the hosted auth/row/file backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend rejected the credentials or session token.
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// The backend (or one of its tables) is not available yet.
    #[error("backend not ready: {reason}")]
    NotReady { reason: String },

    /// The requested row or object does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A unique constraint was violated (e.g. duplicate profile).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The request never got a usable answer.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The backend answered with a body we could not decode.
    #[error("unexpected response: {reason}")]
    Decode { reason: String },
}

/// Errors from the two-tier integration repository.
///
/// Only raised when *both* tiers fail; a remote failure alone is absorbed by
/// the local fallback.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The local tier failed after the remote tier was unavailable.
    #[error("local store error: {0}")]
    Storage(#[from] StorageError),

    /// A local snapshot could not be encoded or decoded.
    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The integration index is outside the catalog.
    #[error("no integration at index {index}")]
    UnknownIntegration { index: usize },
}
