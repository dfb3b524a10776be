//! Registry error types.
//!
//! Every variant carries enough context to diagnose the problem without a
//! debugger. Token material never appears in an error message.

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No cluster with the given id exists.
    #[error("cluster '{id}' not found")]
    NotFound { id: String },

    /// A cluster with the given id already exists.
    #[error("cluster '{id}' already exists")]
    AlreadyExists { id: String },

    /// Failed to open or migrate the backing store.
    #[error("failed to open registry at '{location}': {reason}")]
    Open { location: String, reason: String },

    /// Failed to read from the backing store.
    #[error("failed to read cluster '{id}': {reason}")]
    Read { id: String, reason: String },

    /// Failed to write to the backing store.
    #[error("failed to write cluster '{id}': {reason}")]
    Write { id: String, reason: String },

    /// Failed to delete from the backing store.
    #[error("failed to delete cluster '{id}': {reason}")]
    Delete { id: String, reason: String },
}
