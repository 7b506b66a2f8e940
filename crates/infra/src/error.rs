//! Adapter error model, shared by the document and blob stores.

use thiserror::Error;

/// Store adapter operation error.
///
/// These are **infrastructure errors** (storage, connectivity, bad stored
/// data) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed document/blob does not exist where existence was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write collided with concurrent state (e.g. a unique-key violation).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data could not be decoded into the expected record shape.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The backend failed (network, permissions, pool, lock poisoning).
    #[error("store backend failure: {0}")]
    Backend(String),

    /// Filesystem failure in the local blob backend.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}
